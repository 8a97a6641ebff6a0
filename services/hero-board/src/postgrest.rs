//! Hosted hero table reached over a PostgREST endpoint

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::hero::{Hero, NewHero};
use crate::io::HttpClient;
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::store::HeroStore;

/// Client for a table exposed at `{url}/rest/v1/{table}`
pub struct PostgrestHeroStore {
    table_name: String,
    table_url: String,
    api_key: String,
    http: Arc<dyn HttpClient>,
    feed: Arc<dyn ChangeFeed>,
}

impl std::fmt::Debug for PostgrestHeroStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestHeroStore")
            .field("table_url", &self.table_url)
            .finish()
    }
}

impl PostgrestHeroStore {
    /// Build from a `postgrest` backend config whose secrets are already resolved
    pub fn new(
        table_name: &str,
        config: &BackendConfig,
        http: Arc<dyn HttpClient>,
        feed: Arc<dyn ChangeFeed>,
    ) -> crate::Result<Self> {
        let BackendConfig::Postgrest { url, api_key, .. } = config else {
            return Err(crate::HeroBoardError::Config(
                "PostgrestHeroStore requires a postgrest backend".to_string(),
            ));
        };
        let api_key = api_key.clone().ok_or_else(|| {
            crate::HeroBoardError::Config("postgrest backend has no api_key".to_string())
        })?;

        let table_url = format!("{}/rest/v1/{}", url.trim_end_matches('/'), table_name);
        tracing::debug!("Created PostgrestHeroStore at {}", table_url);

        Ok(Self {
            table_name: table_name.to_string(),
            table_url,
            api_key,
            http,
            feed,
        })
    }

    fn auth_headers(&self) -> (String, String) {
        (self.api_key.clone(), format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl HeroStore for PostgrestHeroStore {
    async fn fetch_all(&self) -> crate::Result<Vec<Hero>> {
        let url = format!("{}?select=*&order=created_at.desc", self.table_url);
        let (api_key, bearer) = self.auth_headers();
        let headers = [
            ("apikey", api_key.as_str()),
            ("Authorization", bearer.as_str()),
            ("Accept", "application/json"),
        ];

        let response = self
            .http
            .get(&url, &headers)
            .await
            .map_err(|e| crate::HeroBoardError::Fetch(e.to_string()))?;

        if !response.is_success() {
            return Err(crate::HeroBoardError::Fetch(format!(
                "{} returned status {}: {}",
                self.table_name, response.status, response.body
            )));
        }

        let heroes: Vec<Hero> = serde_json::from_str(&response.body).map_err(|e| {
            crate::HeroBoardError::Fetch(format!("Invalid rows from {}: {}", self.table_name, e))
        })?;
        tracing::debug!("Fetched {} rows from {}", heroes.len(), self.table_name);
        Ok(heroes)
    }

    async fn insert_one(&self, hero: NewHero) -> crate::Result<()> {
        let (api_key, bearer) = self.auth_headers();
        let headers = [
            ("apikey", api_key.as_str()),
            ("Authorization", bearer.as_str()),
            ("Prefer", "return=minimal"),
        ];
        let body = serde_json::json!([hero]);

        let response = self
            .http
            .post_json(&self.table_url, &headers, &body)
            .await
            .map_err(|e| crate::HeroBoardError::Insert(e.to_string()))?;

        if !response.is_success() {
            return Err(crate::HeroBoardError::Insert(format!(
                "{} returned status {}: {}",
                self.table_name, response.status, response.body
            )));
        }

        tracing::debug!(
            "Inserted number_input={} into {}",
            hero.number_input,
            self.table_name
        );
        self.feed
            .publish(ChangeEvent::new(self.table_name.clone(), ChangeKind::Insert));
        Ok(())
    }
}
