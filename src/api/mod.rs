pub mod sports_db_api;

use crate::models::{Event, League};
use async_trait::async_trait;

pub use sports_db_api::{Feed, SportsDbClient};

/// Where the calendar gets its events from.
///
/// Implementations never fail: anything that goes wrong while fetching comes
/// back as an empty collection or None.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Everything the aggregator should know about for one league
    async fn fetch_league_events(&self, league: &League) -> Vec<Event>;

    async fn lookup_event(&self, event_id: &str) -> Option<Event>;

    /// Cheap upcoming-only view of a league
    async fn fetch_next_preview(&self, league: &League) -> Vec<Event>;
}
