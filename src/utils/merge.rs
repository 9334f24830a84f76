use crate::models::{Event, Sport};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;

/// Merge per-feed result sets into one collection with a single event per id.
///
/// When an id shows up more than once the last occurrence wins, keeping the
/// slot of the first one.
pub fn merge_events<I>(feeds: I) -> Vec<Event>
where
    I: IntoIterator<Item = Vec<Event>>,
{
    let mut merged: Vec<Event> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for event in feeds.into_iter().flatten() {
        match index.get(&event.id) {
            Some(&pos) => merged[pos] = event,
            None => {
                index.insert(event.id.clone(), merged.len());
                merged.push(event);
            }
        }
    }

    merged
}

/// Sort events by how close they are to the start of `today`, nearest first.
///
/// At equal distance the future event comes before the past one. The sort is
/// stable, so sorting an already ordered collection leaves it unchanged.
pub fn order_by_proximity(events: &mut [Event], today: NaiveDate) {
    let anchor = today.and_time(NaiveTime::MIN);
    events.sort_by(|a, b| {
        let (ka, kb) = (a.kickoff(), b.kickoff());
        let da = (ka - anchor).num_milliseconds().abs();
        let db = (kb - anchor).num_milliseconds().abs();
        da.cmp(&db).then_with(|| kb.cmp(&ka))
    });
}

/// Criteria for narrowing an event collection. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub sport: Option<Sport>,
    #[serde(rename = "league")]
    pub league_id: Option<String>,
    pub date: Option<NaiveDate>,
    /// Case-insensitive match against the title and both team names
    pub team: Option<String>,
}

impl EventFilter {
    pub fn is_empty(&self) -> bool {
        self.sport.is_none()
            && self.league_id.is_none()
            && self.date.is_none()
            && self.team.as_deref().map_or(true, |t| t.trim().is_empty())
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(sport) = self.sport {
            if event.sport != sport.feed_label() {
                return false;
            }
        }
        if let Some(league_id) = &self.league_id {
            if &event.league_id != league_id {
                return false;
            }
        }
        if let Some(date) = self.date {
            if event.date != date {
                return false;
            }
        }
        if let Some(team) = &self.team {
            let needle = team.trim().to_lowercase();
            if !needle.is_empty() {
                let haystack = format!(
                    "{} {} {}",
                    event.name.as_deref().unwrap_or_default(),
                    event.home_team,
                    event.away_team
                )
                .to_lowercase();
                if !haystack.contains(&needle) {
                    return false;
                }
            }
        }
        true
    }

    /// Matching events, in proximity order
    pub fn apply(&self, events: &[Event], today: NaiveDate) -> Vec<Event> {
        let mut matched: Vec<Event> = events.iter().filter(|e| self.matches(e)).cloned().collect();
        order_by_proximity(&mut matched, today);
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::event;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_merge_dedups_last_write_wins() {
        let mut stale = event("42", "2024-05-09", Some("20:00"));
        stale.home_score = None;
        let mut fresh = event("42", "2024-05-09", Some("20:00"));
        fresh.home_score = Some(3);
        fresh.away_score = Some(0);

        let merged = merge_events(vec![
            vec![stale, event("1", "2024-05-11", None)],
            vec![event("2", "2024-05-12", None), fresh],
        ]);

        assert_eq!(merged.len(), 3);
        let survivors: Vec<&Event> = merged.iter().filter(|e| e.id == "42").collect();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].home_score, Some(3));
        assert_eq!(survivors[0].away_score, Some(0));
    }

    #[test]
    fn test_merge_empty_feeds() {
        let merged = merge_events(vec![Vec::new(), Vec::new()]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_order_by_proximity() {
        let mut events = vec![
            event("far_future", "2024-06-01", None),
            event("last_week", "2024-05-03", None),
            event("tonight", "2024-05-10", Some("20:00")),
            event("yesterday", "2024-05-09", None),
            event("tomorrow", "2024-05-11", None),
            event("today_tbd", "2024-05-10", None),
        ];

        order_by_proximity(&mut events, today());

        assert_eq!(
            ids(&events),
            vec![
                "today_tbd",
                "tonight",
                "tomorrow",
                "yesterday",
                "last_week",
                "far_future"
            ]
        );
    }

    #[test]
    fn test_order_is_idempotent() {
        let mut events = vec![
            event("a", "2024-05-12", Some("18:00")),
            event("b", "2024-05-08", Some("06:00")),
            event("c", "2024-05-12", Some("18:00")),
            event("d", "2024-05-01", None),
        ];
        order_by_proximity(&mut events, today());
        let once = events.clone();
        order_by_proximity(&mut events, today());
        assert_eq!(events, once);
        // Identical kick-offs keep their input order
        assert_eq!(ids(&events), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_filter() {
        let mut nba = event("nba", "2024-05-10", None);
        nba.sport = "Basketball".to_string();
        nba.league_id = "4387".to_string();
        nba.home_team = "Boston Celtics".to_string();
        nba.away_team = "Miami Heat".to_string();
        let events = vec![event("epl", "2024-05-11", None), nba];

        let filter = EventFilter {
            sport: Some(Sport::Basketball),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&events, today())), vec!["nba"]);

        let filter = EventFilter {
            team: Some("  CHELSEA ".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&events, today())), vec!["epl"]);

        let filter = EventFilter {
            league_id: Some("4328".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 5, 12),
            ..Default::default()
        };
        assert!(filter.apply(&events, today()).is_empty());

        assert!(EventFilter::default().is_empty());
        assert_eq!(EventFilter::default().apply(&events, today()).len(), 2);
    }
}
