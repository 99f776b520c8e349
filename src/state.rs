use std::{io, sync::Arc};

use crate::{
    config::{AppConfig, StoreBackend},
    db::{
        memory::MemoryQuoteStore,
        mongo::{create_mongo_client, MongoQuoteStore},
        ClientRecordStore,
    },
    services::{
        autosave_service::AutosaveService,
        currency_service::{
            ConversionOptions, CurrencyConverter, HttpRateProvider, RateTable, RateTableProvider,
            StaticRateProvider,
        },
        image_service::{HttpImageDiscovery, ImageDiscovery, NoImageDiscovery},
        share_link_service::{MemoryShareLinkGateway, MongoShareLinkGateway, ShareLinkGateway},
    },
};

/// Everything the handlers share, handed out through `web::Data`.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ClientRecordStore>,
    pub share_links: Arc<dyn ShareLinkGateway>,
    pub converter: Arc<CurrencyConverter>,
    pub autosave: Arc<AutosaveService>,
    pub images: Arc<dyn ImageDiscovery>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ClientRecordStore>,
        share_links: Arc<dyn ShareLinkGateway>,
        rates: Arc<dyn RateTableProvider>,
        images: Arc<dyn ImageDiscovery>,
    ) -> Self {
        let options = ConversionOptions {
            markup: config.currency_markup,
            missing_rate: config.missing_rate_policy,
        };
        let converter = Arc::new(CurrencyConverter::new(rates, config.rate_cache_ttl, options));
        let autosave = Arc::new(AutosaveService::new(
            store.clone(),
            config.autosave_delay,
            config.autosave_max_attempts,
        ));

        Self {
            config,
            store,
            share_links,
            converter,
            autosave,
            images,
        }
    }

    /// Wire up the configured backends.
    pub async fn from_config(config: AppConfig) -> io::Result<Self> {
        let (store, share_links): (Arc<dyn ClientRecordStore>, Arc<dyn ShareLinkGateway>) =
            match config.store_backend {
                StoreBackend::Mongo => {
                    let uri = config.mongo_uri.as_deref().ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidInput, "MONGODB_URI must be set")
                    })?;
                    let client = create_mongo_client(uri).await.map_err(io::Error::other)?;
                    let store: Arc<dyn ClientRecordStore> =
                        Arc::new(MongoQuoteStore::new(client.clone(), &config.mongo_database));
                    let links = Arc::new(MongoShareLinkGateway::new(
                        client,
                        &config.mongo_database,
                        store.clone(),
                    ));
                    (store, links)
                }
                StoreBackend::Memory => {
                    log::warn!("Using in-memory store, documents are lost on restart");
                    let store: Arc<dyn ClientRecordStore> = Arc::new(MemoryQuoteStore::new());
                    let links = Arc::new(MemoryShareLinkGateway::new(store.clone()));
                    (store, links)
                }
            };

        let rates: Arc<dyn RateTableProvider> = match &config.rates_app_id {
            Some(app_id) => Arc::new(
                HttpRateProvider::new(&config.rates_api_url, Some(app_id.clone()))
                    .map_err(io::Error::other)?,
            ),
            None => {
                log::warn!("RATES_APP_ID not set, conversions use an empty USD rate table");
                Arc::new(StaticRateProvider::new(RateTable::new("USD", &[])))
            }
        };

        let images: Arc<dyn ImageDiscovery> = match &config.image_discovery_url {
            Some(url) => Arc::new(HttpImageDiscovery::new(url).map_err(io::Error::other)?),
            None => Arc::new(NoImageDiscovery),
        };

        Ok(Self::new(config, store, share_links, rates, images))
    }
}
