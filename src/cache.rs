//! Timestamped snapshot of the merged event collection.

use crate::models::Event;
use crate::utils::data::{load_from_slot, save_to_slot, SharedStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The single slot holding the snapshot
pub const CACHE_KEY: &str = "sportcalendar_cache_v3";

/// Persisted layout: `{ "timestamp": epoch-millis, "events": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub timestamp: i64,
    pub events: Vec<Event>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    timestamp: i64,
    events: &'a [Event],
}

impl CacheSnapshot {
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Servable iff `now - timestamp < ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() - self.timestamp < ttl.num_milliseconds()
    }
}

pub struct EventCache {
    store: SharedStore,
    ttl: Duration,
}

impl EventCache {
    pub fn new(store: SharedStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored snapshot regardless of age. Unreadable snapshots count as absent.
    pub fn snapshot(&self) -> Option<CacheSnapshot> {
        match load_from_slot::<CacheSnapshot>(self.store.as_ref(), CACHE_KEY) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable event cache: {:#}", e);
                None
            }
        }
    }

    /// Cached events if the snapshot is still fresh at `now`
    pub fn load_fresh(&self, now: DateTime<Utc>) -> Option<Vec<Event>> {
        let snapshot = self.snapshot()?;
        if snapshot.is_fresh(now, self.ttl) {
            debug!("Serving {} events from cache", snapshot.events.len());
            Some(snapshot.events)
        } else {
            debug!("Event cache expired");
            None
        }
    }

    /// Replace the snapshot with `events`, stamped `now`
    pub fn store(&self, events: &[Event], now: DateTime<Utc>) -> Result<()> {
        let snapshot = SnapshotRef {
            timestamp: now.timestamp_millis(),
            events,
        };
        save_to_slot(self.store.as_ref(), CACHE_KEY, &snapshot).context("Failed to save event cache")
    }

    pub fn clear(&self) -> Result<()> {
        self.store
            .remove(CACHE_KEY)
            .context("Failed to clear event cache")
    }
}
