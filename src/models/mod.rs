use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A sporting fixture, as normalized from a league feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>, // Local kick-off time, None when the feed has no time yet
    pub sport: String,
    pub league: String,
    pub league_id: String,
    pub venue: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_badge: Option<String>,
    pub away_badge: Option<String>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub status: Option<String>,
}

impl Event {
    /// Kick-off as a naive local timestamp, midnight when no time is known
    pub fn kickoff(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }

    /// Both scores present
    pub fn is_decided(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// The result of a decided event, None while it is still undecided
    pub fn outcome(&self) -> Option<BetChoice> {
        let (home, away) = (self.home_score?, self.away_score?);
        Some(if home > away {
            BetChoice::Home
        } else if away > home {
            BetChoice::Away
        } else {
            BetChoice::Draw
        })
    }

    pub fn title(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{} vs {}", self.home_team, self.away_team),
        }
    }

    /// Format the event as a readable line
    pub fn format(&self) -> String {
        let time = self
            .time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "TBD".to_string());
        let score = match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => format!(" | {}-{}", h, a),
            _ => String::new(),
        };
        format!(
            "[{}] {} {} | {} | {}{}",
            self.id,
            self.date,
            time,
            self.league,
            self.title(),
            score
        )
    }
}

/// What a bet is placed on; also the outcome of a decided event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetChoice {
    Home,
    Draw,
    Away,
}

impl BetChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetChoice::Home => "home",
            BetChoice::Draw => "draw",
            BetChoice::Away => "away",
        }
    }
}

impl fmt::Display for BetChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown bet choice '{0}', expected home, draw or away")]
pub struct ParseChoiceError(String);

impl FromStr for BetChoice {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "1" => Ok(BetChoice::Home),
            "draw" | "x" => Ok(BetChoice::Draw),
            "away" | "2" => Ok(BetChoice::Away),
            _ => Err(ParseChoiceError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Open,
    Won,
    Lost,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BetStatus::Open => "open",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
        };
        f.write_str(s)
    }
}

/// A play-money wager against one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: u64,
    pub event_id: String,
    pub choice: BetChoice,
    pub amount: i64,
    pub odds: f64,
    pub status: BetStatus,
}

impl Bet {
    /// Amount credited when this bet wins
    pub fn payout(&self) -> i64 {
        (self.amount as f64 * self.odds) as i64
    }

    pub fn format(&self) -> String {
        format!(
            "#{} on event {} | {} @ {:.2} | stake {} | {}",
            self.id, self.event_id, self.choice, self.odds, self.amount, self.status
        )
    }
}

/// Sports the calendar follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Football,
    Basketball,
    Volleyball,
}

impl Sport {
    /// The sport label the feed puts on its events
    pub fn feed_label(&self) -> &'static str {
        match self {
            Sport::Football => "Soccer",
            Sport::Basketball => "Basketball",
            Sport::Volleyball => "Volleyball",
        }
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "football" | "soccer" => Ok(Sport::Football),
            "basketball" => Ok(Sport::Basketball),
            "volleyball" => Ok(Sport::Volleyball),
            other => Err(format!("Unknown sport: {}", other)),
        }
    }
}

/// A competition with its own feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
    pub sport: Sport,
}

impl League {
    pub fn new(id: &str, name: &str, sport: Sport) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sport,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_outcome() {
        assert_eq!(scored("1", 2, 1).outcome(), Some(BetChoice::Home));
        assert_eq!(scored("1", 0, 3).outcome(), Some(BetChoice::Away));
        assert_eq!(scored("1", 1, 1).outcome(), Some(BetChoice::Draw));

        let mut half = event("1", "2024-05-01", None);
        half.home_score = Some(1);
        assert!(!half.is_decided());
        assert_eq!(half.outcome(), None);
    }

    #[test]
    fn test_kickoff_defaults_to_midnight() {
        let ev = event("1", "2024-05-01", None);
        assert_eq!(ev.kickoff().to_string(), "2024-05-01 00:00:00");
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("HOME".parse::<BetChoice>().unwrap(), BetChoice::Home);
        assert_eq!("x".parse::<BetChoice>().unwrap(), BetChoice::Draw);
        assert!("banana".parse::<BetChoice>().is_err());
    }

    #[test]
    fn test_payout_truncates() {
        let bet = Bet {
            id: 1,
            event_id: "e".to_string(),
            choice: BetChoice::Home,
            amount: 10,
            odds: 2.55,
            status: BetStatus::Open,
        };
        assert_eq!(bet.payout(), 25);
    }
}
