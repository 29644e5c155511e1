use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::facade::Facade;
use crate::optimizer::ResumeOptimizer;
use crate::storage::{Storage, StorageClient};
use crate::store::{postgres::PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub facade: Facade,
    pub optimizer: Option<ResumeOptimizer>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let pg = PgStore::connect(&config.database_url).await?;
        if let Err(e) = pg.migrate().await {
            warn!(error = %e, "migrations failed; continuing with existing schema");
        }

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        info!(endpoint = %config.storage.endpoint, bucket = %config.storage.bucket, "object storage ready");

        Ok(Self::from_parts(config, Arc::new(pg), storage))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn Store>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let optimizer = config.optimizer_url.as_deref().map(ResumeOptimizer::new);
        Self {
            facade: Facade::new(store.clone(), storage),
            config,
            store,
            optimizer,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::storage::FakeStorage;
        use crate::store::memory::MemoryStore;

        Self::fake_with(
            Arc::new(MemoryStore::new()),
            Arc::new(FakeStorage::default()),
        )
    }

    #[cfg(test)]
    pub fn fake_with(store: Arc<dyn Store>, storage: Arc<dyn StorageClient>) -> Self {
        Self::from_parts(Arc::new(AppConfig::fake()), store, storage)
    }
}
