//! Randomised TTLs so entries written together do not expire together

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Floor for a TTL that would otherwise be zero
const FLOOR: Duration = Duration::from_secs(1);

/// TTL jitter source
///
/// The default draws from the thread-local RNG. Tests can pin the sequence
/// with [`Jitter::seeded`].
#[derive(Debug, Default)]
pub struct Jitter {
    rng: Option<Mutex<StdRng>>,
}

impl Jitter {
    /// Jitter backed by the thread-local RNG
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic jitter for reproducible tests
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Jitter drawing from a caller-supplied generator
    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Some(Mutex::new(rng)),
        }
    }

    /// Spread `base` uniformly over `[base * (1 - ratio), base * (1 + ratio)]`
    ///
    /// A zero `base` or non-positive `ratio` returns `base` untouched. `ratio`
    /// is clamped to 1.0. The result is raised to `minimum` when one is given,
    /// and never drops to zero.
    pub fn ttl(&self, base: Duration, ratio: f64, minimum: Option<Duration>) -> Duration {
        if base.is_zero() || ratio.is_nan() || ratio <= 0.0 {
            return base;
        }
        let ratio = ratio.min(1.0);

        let unit = self.sample();
        let base_secs = base.as_secs_f64();
        let jittered = (base_secs + unit * ratio * base_secs).max(0.0);
        // Saturate when base * (1 + ratio) leaves the Duration range
        let mut ttl = Duration::try_from_secs_f64(jittered).unwrap_or(Duration::MAX);

        if let Some(minimum) = minimum {
            if ttl < minimum {
                ttl = minimum;
            }
        }
        if ttl.is_zero() {
            ttl = FLOOR;
        }
        ttl
    }

    /// Uniform sample in `[-1.0, 1.0]`
    fn sample(&self) -> f64 {
        match &self.rng {
            Some(rng) => rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .gen_range(-1.0..=1.0),
            None => rand::thread_rng().gen_range(-1.0..=1.0),
        }
    }
}
