//! API server for Tasker

use anyhow::{Context, Result};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tasker_core::cache::{start_auto_cleanup, CacheConfig};
use tasker_core::{
    CacheStore, MemoryCache, MemoryStore, Neo4jClient, Neo4jStore, RedisCache, TaskService,
    TaskStore, UserService, UserStore,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::{AppConfig, CacheBackend, StoreBackend};

use super::middleware::{auth_middleware, AuthState};
use super::routes::{
    create_task, delete_task, get_task, health_check, list_tasks, login, profile, register,
    update_task, AppState,
};

/// Store and cache collaborators selected by configuration
#[derive(Clone)]
pub struct Backends {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub cache: Option<Arc<dyn CacheStore>>,
}

impl Backends {
    /// Connect the configured store and cache
    ///
    /// A store that cannot be reached is fatal. An unreachable Redis is only
    /// logged, since listings fall back to the store.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let (tasks, users): (Arc<dyn TaskStore>, Arc<dyn UserStore>) = match config.store {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                let store = Arc::new(MemoryStore::new());
                (store.clone() as Arc<dyn TaskStore>, store as Arc<dyn UserStore>)
            }
            StoreBackend::Neo4j => {
                info!("Connecting to Neo4j at {}", config.neo4j_uri);
                let client = Neo4jClient::new(
                    &config.neo4j_uri,
                    &config.neo4j_user,
                    &config.neo4j_password,
                    &config.neo4j_database,
                )
                .await
                .context("Failed to connect to Neo4j")?;
                client
                    .ensure_schema()
                    .await
                    .context("Failed to apply Neo4j schema")?;

                let store = Arc::new(Neo4jStore::new(client));
                (store.clone() as Arc<dyn TaskStore>, store as Arc<dyn UserStore>)
            }
        };

        let cache: Option<Arc<dyn CacheStore>> = match config.cache {
            CacheBackend::None => {
                info!("Task listing cache disabled");
                None
            }
            CacheBackend::Memory => {
                Some(memory_cache(config.cache_config()) as Arc<dyn CacheStore>)
            }
            CacheBackend::Redis => match config.redis_url() {
                None => {
                    info!("REDIS_ADDR is empty, task listing cache disabled");
                    None
                }
                Some(url) => {
                    let cache = RedisCache::new(&url, config.cache_op_timeout)?;
                    match cache.ping().await {
                        Ok(()) => info!("Connected to Redis at {}", config.redis_addr),
                        Err(e) => warn!(
                            "Redis at {} is unreachable ({}), serving listings from the store",
                            config.redis_addr, e
                        ),
                    }
                    Some(Arc::new(cache) as Arc<dyn CacheStore>)
                }
            },
        };

        Ok(Self {
            tasks,
            users,
            cache,
        })
    }
}

/// In-process cache, with its expiry sweeper when enabled
fn memory_cache(config: CacheConfig) -> Arc<MemoryCache> {
    let auto_cleanup = config.enable_auto_cleanup;
    let cache = Arc::new(MemoryCache::new(config));
    if auto_cleanup {
        tokio::spawn(start_auto_cleanup(cache.clone()));
    }
    cache
}

/// API server
pub struct ApiServer {
    config: AppConfig,
}

impl ApiServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Connect backends and assemble the shared request state
    pub async fn build_state(&self) -> Result<Arc<AppState>> {
        self.config.validate()?;
        let backends = Backends::connect(&self.config).await?;

        Ok(Arc::new(AppState {
            tasks: TaskService::new(
                backends.tasks.clone(),
                backends.cache,
                self.config.cache_config(),
            ),
            users: UserService::new(backends.users),
            auth: AuthState::new(self.config.jwt_secret()?, self.config.token_ttl_hours),
            store: backends.tasks,
        }))
    }

    /// Start the API server on the configured address
    pub async fn start(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let state = self.build_state().await?;
        let app = router(state, self.config.request_timeout);

        info!("Starting API server on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let auth_state = state.auth.clone();

    let protected = Router::new()
        .route("/api/profile", get(profile))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route_layer(from_fn_with_state(auth_state, auth_middleware));

    Router::new()
        // Public routes
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
