//! Hero Board - live table of submitted numbers
//!
//! Serves a page with a number form and a table of every stored row. Rows are
//! kept in a hero table (in-process or behind a PostgREST endpoint); each
//! committed change is announced on a change feed, the page refetches the
//! table, and open browsers are told to reload it.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod hero;
pub mod io;
pub mod page;
pub mod postgrest;
pub mod realtime;
pub mod store;

pub use config::{load_config, Config};
pub use error::{HeroBoardError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::BackendConfig;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::page::HeroPage;
use crate::postgrest::PostgrestHeroStore;
use crate::realtime::{BroadcastChangeFeed, ChangeFeed};
use crate::store::{HeroStore, MemoryHeroStore};

/// Assembles a [`HeroBoard`] from configuration, with optional injected parts
pub struct HeroBoardBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    store: Option<Arc<dyn HeroStore>>,
    feed: Option<Arc<dyn ChangeFeed>>,
    cancel: Option<CancellationToken>,
}

impl HeroBoardBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            store: None,
            feed: None,
            cancel: None,
        }
    }

    /// HTTP client used by the postgrest backend
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Use this store instead of the configured backend
    pub fn with_store(mut self, store: Arc<dyn HeroStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_change_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn build(self) -> Result<HeroBoard> {
        let table = self.config.table.clone();
        let feed: Arc<dyn ChangeFeed> = match self.feed {
            Some(feed) => feed,
            None => Arc::new(BroadcastChangeFeed::default()),
        };

        let store: Arc<dyn HeroStore> = match self.store {
            Some(store) => store,
            None => match &self.config.backend {
                BackendConfig::Memory => Arc::new(MemoryHeroStore::new(&table, Arc::clone(&feed))),
                backend @ BackendConfig::Postgrest { .. } => {
                    let http: Arc<dyn HttpClient> = match self.http {
                        Some(http) => http,
                        None => Arc::new(ReqwestHttpClient::new()),
                    };
                    Arc::new(PostgrestHeroStore::new(
                        &table,
                        backend,
                        http,
                        Arc::clone(&feed),
                    )?)
                }
            },
        };

        tracing::debug!(
            "Built hero board for '{}' on {} backend",
            table,
            self.config.backend.type_name()
        );

        Ok(HeroBoard {
            page: HeroPage::new(table, store, feed),
            config: self.config,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// A built service, ready to start
#[derive(Debug)]
pub struct HeroBoard {
    config: Config,
    page: Arc<HeroPage>,
    cancel: CancellationToken,
}

impl HeroBoard {
    pub fn page(&self) -> Arc<HeroPage> {
        Arc::clone(&self.page)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Mount the page, serve the dashboard and run until cancelled
    pub async fn start(self) -> Result<()> {
        self.page.mount().await?;

        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
            }
        });

        let server = if self.config.dashboard.enabled {
            let port = self.config.dashboard.port;
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    self.page.unmount().await?;
                    return Err(HeroBoardError::Dashboard(format!(
                        "Failed to bind port {}: {}",
                        port, e
                    )));
                }
            };
            tracing::info!("Dashboard listening on http://{}", addr);

            let router = dashboard::build_router(self.page());
            let cancel_for_dashboard = self.cancel.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_dashboard.cancelled().await;
                    })
                    .await
                {
                    tracing::error!("Dashboard server failed: {}", e);
                }
                tracing::debug!("Dashboard stopped");
            }))
        } else {
            None
        };

        tracing::info!("Hero board started for '{}'", self.page.table());

        self.cancel.cancelled().await;

        self.page.unmount().await?;
        if let Some(server) = server {
            if let Err(e) = server.await {
                tracing::warn!("Dashboard task ended abnormally: {}", e);
            }
        }
        tracing::info!("Hero board stopped");

        Ok(())
    }
}
