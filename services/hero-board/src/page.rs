//! The hero page: form input, live record list and the refetch wiring
//!
//! A [`HeroPage`] owns everything a browser view of the table needs. Rows are
//! never patched in place: every successful [`HeroPage::fetch_all`] replaces
//! the whole list, and once mounted, every change announced for the table
//! triggers another fetch.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};

use crate::hero::{Hero, NewHero};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeListener, EventFilter, SubscriptionId};
use crate::store::HeroStore;

/// Whether a fetch is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Idle,
}

/// Everything the page renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub number_input: i64,
    pub heroes: Vec<Hero>,
    pub load_state: LoadState,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            number_input: 0,
            heroes: Vec::new(),
            load_state: LoadState::Loading,
        }
    }
}

impl PageState {
    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    /// Table cells in column order: ID, Created At, Number
    pub fn table_rows(&self) -> Vec<[String; 3]> {
        self.heroes
            .iter()
            .map(|h| {
                [
                    h.id.to_string(),
                    h.created_at_display(),
                    h.number_input.to_string(),
                ]
            })
            .collect()
    }
}

/// Parse the number field the way a browser integer input is read.
///
/// Surrounding whitespace is ignored and a leading integer prefix wins
/// (`"12abc"` is 12); anything else, including overflow, reads as 0.
pub fn parse_number_input(raw: &str) -> i64 {
    let trimmed = raw.trim();
    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits_len = trimmed[sign_len..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    trimmed[..sign_len + digits_len].parse().unwrap_or(0)
}

/// The page component. Collaborators are injected at construction.
pub struct HeroPage {
    table: String,
    store: Arc<dyn HeroStore>,
    feed: Arc<dyn ChangeFeed>,
    state: RwLock<PageState>,
    subscription: Mutex<Option<SubscriptionId>>,
    revision: watch::Sender<u64>,
}

impl std::fmt::Debug for HeroPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeroPage")
            .field("table", &self.table)
            .field("revision", &*self.revision.borrow())
            .finish()
    }
}

impl HeroPage {
    pub fn new(
        table: impl Into<String>,
        store: Arc<dyn HeroStore>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            table: table.into(),
            store,
            feed,
            state: RwLock::new(PageState::default()),
            subscription: Mutex::new(None),
            revision,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> PageState {
        self.state.read().await.clone()
    }

    /// Counter bumped after every state change
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    async fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut PageState),
    {
        {
            let mut state = self.state.write().await;
            apply(&mut *state);
        }
        self.revision.send_modify(|revision| *revision += 1);
    }

    async fn set_load_state(&self, load_state: LoadState) {
        self.update(|state| state.load_state = load_state).await;
    }

    /// Replace the rows with a fresh copy of the table.
    ///
    /// Errors are logged and the previous rows stay. Loading is cleared on
    /// both paths. Overlapping calls are not serialized; the last to finish
    /// wins.
    pub async fn fetch_all(&self) {
        self.set_load_state(LoadState::Loading).await;

        match self.store.fetch_all().await {
            Ok(heroes) => {
                tracing::debug!("Fetched {} heroes from '{}'", heroes.len(), self.table);
                self.update(|state| {
                    state.heroes = heroes;
                    state.load_state = LoadState::Idle;
                })
                .await;
            }
            Err(e) => {
                tracing::error!("Error fetching heroes: {}", e);
                self.set_load_state(LoadState::Idle).await;
            }
        }
    }

    /// Store one row; the input resets to 0 only when the insert succeeds
    pub async fn insert_one(&self, value: i64) {
        match self.store.insert_one(NewHero { number_input: value }).await {
            Ok(()) => {
                tracing::debug!("Inserted number {} into '{}'", value, self.table);
                self.update(|state| state.number_input = 0).await;
            }
            Err(e) => tracing::error!("Error inserting number: {}", e),
        }
    }

    /// Take the raw text of the number field
    pub async fn set_number_input(&self, raw: &str) -> i64 {
        let value = parse_number_input(raw);
        self.update(|state| state.number_input = value).await;
        value
    }

    /// Submit the form: insert whatever the input currently holds
    pub async fn submit(&self) {
        let value = self.state.read().await.number_input;
        self.insert_one(value).await;
    }

    /// Subscribe to every change on the table, then load it.
    ///
    /// Mounting twice keeps the first subscription.
    pub async fn mount(self: &Arc<Self>) -> crate::Result<()> {
        {
            let mut subscription = self.subscription.lock().await;
            if let Some(id) = *subscription {
                tracing::warn!("Page for '{}' already mounted ({})", self.table, id);
                return Ok(());
            }

            let listener = Arc::new(RefetchOnChange {
                page: Arc::downgrade(self),
            });
            let id = self
                .feed
                .subscribe(&self.table, EventFilter::All, listener)
                .await?;
            tracing::debug!("Page for '{}' mounted ({})", self.table, id);
            *subscription = Some(id);
        }

        self.fetch_all().await;
        Ok(())
    }

    /// Close the subscription. Later changes no longer trigger fetches.
    pub async fn unmount(&self) -> crate::Result<()> {
        let id = self.subscription.lock().await.take();
        if let Some(id) = id {
            self.feed.unsubscribe(id).await?;
            tracing::debug!("Page for '{}' unmounted ({})", self.table, id);
        }
        Ok(())
    }

    pub async fn is_mounted(&self) -> bool {
        self.subscription.lock().await.is_some()
    }
}

/// Listener that refetches the page for every change it hears about
struct RefetchOnChange {
    page: Weak<HeroPage>,
}

impl ChangeListener for RefetchOnChange {
    fn on_change(&self, event: &ChangeEvent) {
        let Some(page) = self.page.upgrade() else {
            tracing::debug!("{} on '{}' after page was dropped", event.kind, event.table);
            return;
        };

        tracing::debug!("{} on '{}', refetching", event.kind, event.table);
        tokio::spawn(async move {
            page.fetch_all().await;
        });
    }
}
