//! The hero record and its insert payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used when a row is rendered for people rather than machines
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// A stored row. `id` and `created_at` are assigned by storage and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    /// Tables created by the hosted console name this column `supabase_hero_id`
    #[serde(alias = "supabase_hero_id")]
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub number_input: i64,
}

impl Hero {
    /// Creation time as shown in the table's "Created At" column
    pub fn created_at_display(&self) -> String {
        self.created_at.format(DISPLAY_FORMAT).to_string()
    }
}

/// Payload of an insert; storage fills in the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHero {
    pub number_input: i64,
}

/// Sort rows newest first, the order every fetch returns.
///
/// Rows created in the same instant fall back to id, newest id first.
pub fn sort_newest_first(heroes: &mut [Hero]) {
    heroes.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
