//! Fan-out over the league feeds, merge, order, and write through the cache.

use crate::api::EventSource;
use crate::cache::EventCache;
use crate::models::{Event, League};
use crate::utils::merge::{merge_events, order_by_proximity};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use futures_util::future::join_all;
use tracing::{info, warn};

pub struct Aggregator<S> {
    source: S,
    cache: EventCache,
    leagues: Vec<League>,
    /// Collection handed out by the last `get_all_events`
    events: Vec<Event>,
}

impl<S: EventSource> Aggregator<S> {
    pub fn new(source: S, cache: EventCache, leagues: Vec<League>) -> Self {
        Self {
            source,
            cache,
            leagues,
            events: Vec::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn leagues(&self) -> &[League] {
        &self.leagues
    }

    /// The in-memory collection, empty until `get_all_events` has run
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn find(&self, event_id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == event_id)
    }

    /// The authoritative, deduplicated, proximity-ordered event collection
    pub async fn get_all_events(&mut self) -> Vec<Event> {
        self.get_all_events_at(Utc::now(), Local::now().date_naive())
            .await
    }

    pub async fn get_all_events_at(&mut self, now: DateTime<Utc>, today: NaiveDate) -> Vec<Event> {
        if let Some(cached) = self.cache.load_fresh(now) {
            self.events = cached;
            return self.events.clone();
        }

        info!("Fetching events for {} leagues", self.leagues.len());
        let fetches = self
            .leagues
            .iter()
            .map(|league| self.source.fetch_league_events(league));
        let per_league = join_all(fetches).await;

        let mut events = merge_events(per_league);
        order_by_proximity(&mut events, today);
        info!("Aggregated {} unique events", events.len());

        if let Err(e) = self.cache.store(&events, now) {
            warn!("Could not persist event cache: {:#}", e);
        }

        self.events = events;
        self.events.clone()
    }

    /// Drop the in-memory collection and the stored snapshot so the next call refetches
    pub fn invalidate(&mut self) -> Result<()> {
        self.events.clear();
        self.cache.clear()
    }

    /// Demo affordance: overwrite the scores of a loaded event and re-persist the snapshot.
    ///
    /// This fabricates a result and restarts the cache's freshness window. Returns
    /// the updated event, or None (and changes nothing) if the id is not loaded.
    pub fn record_simulated_result(
        &mut self,
        event_id: &str,
        home_score: u32,
        away_score: u32,
    ) -> Option<Event> {
        self.record_simulated_result_at(event_id, home_score, away_score, Utc::now())
    }

    pub fn record_simulated_result_at(
        &mut self,
        event_id: &str,
        home_score: u32,
        away_score: u32,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        let event = self.events.iter_mut().find(|e| e.id == event_id)?;
        event.home_score = Some(home_score);
        event.away_score = Some(away_score);
        let updated = event.clone();

        info!(
            "Simulated result for {}: {} {}-{} {}",
            updated.id, updated.home_team, home_score, away_score, updated.away_team
        );
        if let Err(e) = self.cache.store(&self.events, now) {
            warn!("Could not persist simulated result: {:#}", e);
        }
        Some(updated)
    }
}
