use crate::api::EventSource;
use crate::config::Config;
use crate::models::{Event, League};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a preview request
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(5);

/// The per-league feeds the calendar combines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Next,
    Past,
}

impl Feed {
    fn endpoint(&self) -> &'static str {
        match self {
            Feed::Next => "eventsnextleague.php",
            Feed::Past => "eventspastleague.php",
        }
    }
}

/// Response body shared by every TheSportsDB event endpoint
#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Option<Vec<Value>>,
}

/// Event record as sent by the feed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    id_event: Option<String>,
    str_event: Option<String>,
    date_event: Option<String>,
    str_time: Option<String>,
    str_sport: Option<String>,
    str_league: Option<String>,
    id_league: Option<String>,
    str_venue: Option<String>,
    str_home_team: Option<String>,
    str_away_team: Option<String>,
    str_home_team_badge: Option<String>,
    str_away_team_badge: Option<String>,
    int_home_score: Option<Value>,
    int_away_score: Option<Value>,
    str_status: Option<String>,
}

impl RawEvent {
    /// Validate into a typed event; None when id, teams or date are unusable
    fn into_event(self) -> Option<Event> {
        let id = non_empty(self.id_event)?;
        let home_team = non_empty(self.str_home_team)?;
        let away_team = non_empty(self.str_away_team)?;
        let date = NaiveDate::parse_from_str(self.date_event?.trim(), "%Y-%m-%d").ok()?;

        Some(Event {
            id,
            name: non_empty(self.str_event),
            date,
            time: self.str_time.as_deref().and_then(parse_time),
            sport: self.str_sport.unwrap_or_default(),
            league: self.str_league.unwrap_or_default(),
            league_id: self.id_league.unwrap_or_default(),
            venue: non_empty(self.str_venue),
            home_team,
            away_team,
            home_badge: non_empty(self.str_home_team_badge),
            away_badge: non_empty(self.str_away_team_badge),
            home_score: self.int_home_score.as_ref().and_then(parse_score),
            away_score: self.int_away_score.as_ref().and_then(parse_score),
            status: non_empty(self.str_status),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Hour and minute of "15:00:00", "15:00:00+00:00", "15:00" or "9:30"
fn parse_time(raw: &str) -> Option<NaiveTime> {
    let mut parts = raw.trim().splitn(3, ':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.get(..2)?.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Scores arrive as strings, numbers or null
fn parse_score(raw: &Value) -> Option<u32> {
    match raw {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        _ => None,
    }
}

/// Parse an events body, dropping records that fail validation
pub fn parse_events_body(body: &str) -> Result<Vec<Event>> {
    let response: EventsResponse =
        serde_json::from_str(body).context("Failed to parse events response")?;

    let raw = response.events.unwrap_or_default();
    let total = raw.len();
    let events: Vec<Event> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawEvent>(value).ok())
        .filter_map(RawEvent::into_event)
        .collect();

    if events.len() < total {
        debug!("Dropped {} malformed event records", total - events.len());
    }
    Ok(events)
}

pub struct SportsDbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SportsDbClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_key, endpoint)
    }

    async fn get_events(&self, endpoint: &str, id: &str, timeout: Option<Duration>) -> Result<Vec<Event>> {
        let mut request = self.client.get(self.url(endpoint)).query(&[("id", id)]);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} for {}", endpoint, id))?;

        if !response.status().is_success() {
            anyhow::bail!("TheSportsDB returned error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read events response")?;
        parse_events_body(&body)
    }

    /// Fetch one feed for one league
    pub async fn fetch_feed(&self, feed: Feed, league_id: &str) -> Result<Vec<Event>> {
        self.get_events(feed.endpoint(), league_id, None).await
    }

    /// Upcoming and recent events for a league, empty if either feed fails
    pub async fn fetch_recent_events(&self, league: &League) -> Vec<Event> {
        let (next, past) = tokio::join!(
            self.fetch_feed(Feed::Next, &league.id),
            self.fetch_feed(Feed::Past, &league.id)
        );

        match (next, past) {
            (Ok(mut next), Ok(past)) => {
                debug!(
                    "{}: {} upcoming, {} past events",
                    league.name,
                    next.len(),
                    past.len()
                );
                next.extend(past);
                next
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to fetch league {} ({}): {:#}", league.name, league.id, e);
                Vec::new()
            }
        }
    }

    /// Full detail record for one event, None if it cannot be fetched
    pub async fn lookup(&self, event_id: &str) -> Option<Event> {
        match self.get_events("lookupevent.php", event_id, None).await {
            Ok(events) => events.into_iter().next(),
            Err(e) => {
                warn!("Failed to look up event {}: {:#}", event_id, e);
                None
            }
        }
    }

    /// Lightweight upcoming-events preview, bounded by a short timeout
    pub async fn fetch_preview(&self, league: &League) -> Vec<Event> {
        match self
            .get_events(Feed::Next.endpoint(), &league.id, Some(PREVIEW_TIMEOUT))
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!("Preview for {} failed: {:#}", league.name, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl EventSource for SportsDbClient {
    async fn fetch_league_events(&self, league: &League) -> Vec<Event> {
        self.fetch_recent_events(league).await
    }

    async fn lookup_event(&self, event_id: &str) -> Option<Event> {
        self.lookup(event_id).await
    }

    async fn fetch_next_preview(&self, league: &League) -> Vec<Event> {
        self.fetch_preview(league).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;

    const BODY: &str = r#"{
        "events": [
            {
                "idEvent": "2052711",
                "strEvent": "Arsenal vs Chelsea",
                "dateEvent": "2024-05-12",
                "strTime": "15:30:00+00:00",
                "strSport": "Soccer",
                "strLeague": "English Premier League",
                "idLeague": "4328",
                "strVenue": "Emirates Stadium",
                "strHomeTeam": "Arsenal",
                "strAwayTeam": "Chelsea",
                "strHomeTeamBadge": "https://example.com/ars.png",
                "strAwayTeamBadge": null,
                "intHomeScore": "2",
                "intAwayScore": 1,
                "strStatus": "Match Finished"
            },
            {
                "idEvent": "2052712",
                "dateEvent": "2024-05-19",
                "strTime": null,
                "strSport": "Soccer",
                "strHomeTeam": "Everton",
                "strAwayTeam": "Fulham",
                "intHomeScore": null,
                "intAwayScore": ""
            },
            { "idEvent": "broken", "strHomeTeam": "A", "strAwayTeam": "B", "dateEvent": "soon" },
            { "strHomeTeam": "No", "strAwayTeam": "Id", "dateEvent": "2024-05-19" },
            42
        ]
    }"#;

    #[test]
    fn test_parse_events_body() {
        let events = parse_events_body(BODY).unwrap();
        assert_eq!(events.len(), 2);

        let finished = &events[0];
        assert_eq!(finished.id, "2052711");
        assert_eq!(finished.title(), "Arsenal vs Chelsea");
        assert_eq!(finished.time, NaiveTime::from_hms_opt(15, 30, 0));
        assert_eq!(finished.venue.as_deref(), Some("Emirates Stadium"));
        assert_eq!(finished.home_badge.as_deref(), Some("https://example.com/ars.png"));
        assert_eq!(finished.away_badge, None);
        assert_eq!((finished.home_score, finished.away_score), (Some(2), Some(1)));
        assert!(finished.is_decided());

        let upcoming = &events[1];
        assert_eq!(upcoming.time, None);
        assert_eq!(upcoming.league, "");
        assert!(!upcoming.is_decided());
    }

    #[test]
    fn test_null_events_is_empty() {
        assert!(parse_events_body(r#"{"events": null}"#).unwrap().is_empty());
        assert!(parse_events_body(r#"{}"#).unwrap().is_empty());
        assert!(parse_events_body("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_parse_time_and_score() {
        assert_eq!(parse_time("20:45"), NaiveTime::from_hms_opt(20, 45, 0));
        assert_eq!(parse_time("9:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time("09:05:00+01:00"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_time("19:45+00:00"), NaiveTime::from_hms_opt(19, 45, 0));
        assert_eq!(parse_time("9"), None);
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("TBD"), None);
        assert_eq!(parse_score(&Value::String(" 3 ".to_string())), Some(3));
        assert_eq!(parse_score(&Value::String("abc".to_string())), None);
        assert_eq!(parse_score(&serde_json::json!(-1)), None);
    }

    #[tokio::test]
    async fn test_unreachable_feed_degrades_to_empty() {
        let config = Config {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let client = SportsDbClient::new(&config);
        let league = League::new("4328", "Premier League", Sport::Football);

        assert!(client.fetch_league_events(&league).await.is_empty());
        assert!(client.fetch_next_preview(&league).await.is_empty());
        assert!(client.lookup_event("1").await.is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_live_league() {
        let client = SportsDbClient::new(&Config::default());
        let league = League::new("4328", "Premier League", Sport::Football);
        let events = client.fetch_league_events(&league).await;
        assert!(!events.is_empty());
    }
}
