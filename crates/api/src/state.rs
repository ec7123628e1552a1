use std::sync::Arc;

use edupub_core::generation::ContentGenerator;
use edupub_core::store::ContentStore;
use edupub_publisher::dispatch::DispatchQueue;
use edupub_publisher::document::DocumentPublisher;
use edupub_publisher::rate_limiter::RateLimiter;

use crate::config::ServerConfig;
use crate::workflow::{BulkCoordinator, LifecycleService, PublicationAdapter};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// PostgreSQL pool, when the server runs against a database.
    pub pool: Option<edupub_db::DbPool>,
    /// Single-item lifecycle operations.
    pub lifecycle: Arc<LifecycleService>,
    /// Publish/unpublish through the outbound queue.
    pub publication: Arc<PublicationAdapter>,
    /// Multi-item operations.
    pub bulk: Arc<BulkCoordinator>,
    /// Token bucket shared by every outbound publishing call.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the workflow services around the given collaborators.
    pub fn new(
        config: ServerConfig,
        pool: Option<edupub_db::DbPool>,
        store: Arc<dyn ContentStore>,
        generator: Arc<dyn ContentGenerator>,
        publisher: Arc<dyn DocumentPublisher>,
        rate_limiter: Arc<RateLimiter>,
        queue: DispatchQueue,
    ) -> Self {
        let lifecycle = Arc::new(LifecycleService::new(Arc::clone(&store), generator));
        let publication = Arc::new(PublicationAdapter::new(
            store,
            publisher,
            queue,
            config.publish_wait_timeout(),
        ));
        let bulk = Arc::new(BulkCoordinator::new(
            Arc::clone(&lifecycle),
            Arc::clone(&publication),
        ));

        Self {
            config: Arc::new(config),
            pool,
            lifecycle,
            publication,
            bulk,
            rate_limiter,
        }
    }
}
