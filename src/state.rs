use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, LogNotifier, Notifier, SeaOrmAccountService, WebhookNotifier,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub notifier: Arc<dyn Notifier>,

    pub account_service: Arc<dyn AccountService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(
                url.clone(),
                config.notifications.timeout_seconds.into(),
            )?),
            None => Arc::new(LogNotifier),
        };

        Ok(Self::with_parts(config, store, notifier))
    }

    /// Assembles state from pre-built parts; used by tests to inject a
    /// capturing notifier.
    #[must_use]
    pub fn with_parts(config: Config, store: Store, notifier: Arc<dyn Notifier>) -> Self {
        let account_service: Arc<dyn AccountService> = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            notifier.clone(),
            config.security.clone(),
            config.policy.clone(),
            config.notifications.clone(),
        ));

        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            notifier,
            account_service,
        }
    }
}
