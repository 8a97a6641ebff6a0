//! Hero table storage

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::hero::{sort_newest_first, Hero, NewHero};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind};

/// Storage for the hero table
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HeroStore: Send + Sync {
    /// All rows, newest `created_at` first
    async fn fetch_all(&self) -> crate::Result<Vec<Hero>>;

    /// Insert one row; storage assigns id and created_at
    async fn insert_one(&self, hero: NewHero) -> crate::Result<()>;
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Hero>,
    last_id: i64,
}

/// In-process hero table that announces its inserts on a change feed
pub struct MemoryHeroStore {
    table_name: String,
    table: RwLock<Table>,
    feed: Arc<dyn ChangeFeed>,
}

impl std::fmt::Debug for MemoryHeroStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHeroStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl MemoryHeroStore {
    pub fn new(table_name: impl Into<String>, feed: Arc<dyn ChangeFeed>) -> Self {
        let table_name = table_name.into();
        tracing::debug!("Created MemoryHeroStore for '{}'", table_name);
        Self {
            table_name,
            table: RwLock::new(Table::default()),
            feed,
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HeroStore for MemoryHeroStore {
    async fn fetch_all(&self) -> crate::Result<Vec<Hero>> {
        let mut rows = self.table.read().await.rows.clone();
        sort_newest_first(&mut rows);
        tracing::debug!("Fetched {} rows from '{}'", rows.len(), self.table_name);
        Ok(rows)
    }

    async fn insert_one(&self, hero: NewHero) -> crate::Result<()> {
        let id = {
            let mut table = self.table.write().await;
            table.last_id += 1;
            let id = table.last_id;
            table.rows.push(Hero {
                id,
                created_at: Utc::now(),
                number_input: hero.number_input,
            });
            id
        };

        tracing::debug!(
            "Inserted row {} into '{}' (number_input={})",
            id,
            self.table_name,
            hero.number_input
        );
        self.feed
            .publish(ChangeEvent::new(self.table_name.clone(), ChangeKind::Insert));
        Ok(())
    }
}
