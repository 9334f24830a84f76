pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod ledger;
pub mod models;
pub mod server;
pub mod utils;

pub use aggregator::Aggregator;
pub use api::{EventSource, SportsDbClient};
pub use cache::EventCache;
pub use config::Config;
pub use ledger::{Ledger, Placement, Settlement};
pub use models::*;
pub use utils::merge::EventFilter;

use anyhow::{Context, Result};
use chrono::{Duration, Local};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utils::data::{FileStore, SharedStore};

/// A fabricated result and the bets it settled
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedResult {
    pub event: Event,
    pub settlements: Vec<Settlement>,
}

/// Everything a front-end needs: the event collection and the wallet
pub struct SportCalendar<S = SportsDbClient> {
    aggregator: Aggregator<S>,
    ledger: Ledger,
}

impl SportCalendar<SportsDbClient> {
    /// Calendar backed by TheSportsDB and a file store in the configured data directory
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: SharedStore = Arc::new(FileStore::new(&config.data_dir));
        Self::with_source(
            SportsDbClient::new(config),
            store,
            config.cache_ttl(),
            config.leagues.clone(),
        )
    }
}

impl<S: EventSource> SportCalendar<S> {
    pub fn with_source(
        source: S,
        store: SharedStore,
        ttl: Duration,
        leagues: Vec<League>,
    ) -> Result<Self> {
        let cache = EventCache::new(store.clone(), ttl);
        let ledger = Ledger::open(store).context("Failed to open ledger")?;
        Ok(Self {
            aggregator: Aggregator::new(source, cache, leagues),
            ledger,
        })
    }

    /// Load the events and settle any bets whose results arrived while we were away
    pub async fn startup(&mut self) -> Result<(Vec<Event>, Vec<Settlement>)> {
        let events = self.get_all_events().await;
        let settlements = self.resolve_all(&events)?;
        info!(
            "Started with {} events, {} bets settled, balance {}",
            events.len(),
            settlements.len(),
            self.balance()
        );
        Ok((events, settlements))
    }

    pub async fn get_all_events(&mut self) -> Vec<Event> {
        self.aggregator.get_all_events().await
    }

    /// The collection loaded by the last `get_all_events`
    pub fn events(&self) -> &[Event] {
        self.aggregator.events()
    }

    pub async fn filter(&mut self, filter: &EventFilter) -> Vec<Event> {
        let events = self.ensure_loaded().await;
        filter.apply(&events, Local::now().date_naive())
    }

    pub fn leagues(&self) -> &[League] {
        self.aggregator.leagues()
    }

    /// Detail record for one event, straight from the feed
    pub async fn lookup_event(&self, event_id: &str) -> Option<Event> {
        self.aggregator.source().lookup_event(event_id).await
    }

    /// Upcoming events for one configured league. None if the league is unknown.
    pub async fn next_preview(&self, league_id: &str) -> Option<Vec<Event>> {
        let league = self
            .aggregator
            .leagues()
            .iter()
            .find(|l| l.id == league_id)?;
        Some(self.aggregator.source().fetch_next_preview(league).await)
    }

    pub fn balance(&self) -> i64 {
        self.ledger.balance()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn has_bet_on(&self, event_id: &str) -> bool {
        self.ledger.has_bet_on(event_id)
    }

    pub fn place_bet(
        &mut self,
        event_id: &str,
        choice: BetChoice,
        odds: Option<f64>,
    ) -> Result<Placement> {
        self.ledger
            .place_bet(event_id, choice, odds.unwrap_or(ledger::DEFAULT_ODDS))
    }

    pub fn resolve_all(&mut self, events: &[Event]) -> Result<Vec<Settlement>> {
        self.ledger.resolve_all(events)
    }

    /// Demo affordance: force a score onto a loaded event, then settle bets.
    /// None when the id is not in the collection.
    pub async fn record_simulated_result(
        &mut self,
        event_id: &str,
        home_score: u32,
        away_score: u32,
    ) -> Result<Option<SimulatedResult>> {
        self.ensure_loaded().await;
        let event = match self
            .aggregator
            .record_simulated_result(event_id, home_score, away_score)
        {
            Some(event) => event,
            None => return Ok(None),
        };

        let settlements = self.ledger.resolve_all(self.aggregator.events())?;
        Ok(Some(SimulatedResult { event, settlements }))
    }

    /// Same as `record_simulated_result` with random scores from 0 to 4
    pub async fn simulate_result(&mut self, event_id: &str) -> Result<Option<SimulatedResult>> {
        let (home, away) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..5), rng.gen_range(0..5))
        };
        self.record_simulated_result(event_id, home, away).await
    }

    pub fn invalidate(&mut self) -> Result<()> {
        self.aggregator.invalidate()
    }

    async fn ensure_loaded(&mut self) -> Vec<Event> {
        if self.aggregator.events().is_empty() {
            self.aggregator.get_all_events().await
        } else {
            self.aggregator.events().to_vec()
        }
    }
}
