use std::sync::Arc;

use ledger::Store;

use super::{auth::TokenSigner, config::Config, database::init_store};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub signer: TokenSigner,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let config = Config::load()?;
        let store = init_store(&config).await?;

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        let signer = TokenSigner::new(
            config.token_secret.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        Arc::new(Self {
            config,
            store,
            signer,
        })
    }
}
