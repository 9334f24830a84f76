use crate::models::{Bet, BetChoice, BetStatus};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct BetRow<'a> {
    id: u64,
    event_id: &'a str,
    choice: BetChoice,
    stake: i64,
    odds: f64,
    status: BetStatus,
    payout: i64,
}

/// Write the bet history as CSV, one row per bet
pub fn write_bets_csv<W: Write>(bets: &[Bet], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for bet in bets {
        let payout = match bet.status {
            BetStatus::Won => bet.payout(),
            _ => 0,
        };
        csv.serialize(BetRow {
            id: bet.id,
            event_id: &bet.event_id,
            choice: bet.choice,
            stake: bet.amount,
            odds: bet.odds,
            status: bet.status,
            payout,
        })
        .context("Failed to write bet row")?;
    }
    csv.flush().context("Failed to flush CSV")?;
    Ok(())
}

/// Save the bet history to a CSV file
pub fn save_bets_to_csv(bets: &[Bet], filename: &str) -> Result<()> {
    let file = std::fs::File::create(filename).context("Failed to create CSV file")?;
    write_bets_csv(bets, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bets_csv() {
        let bets = vec![
            Bet {
                id: 1,
                event_id: "2052711".to_string(),
                choice: BetChoice::Home,
                amount: 10,
                odds: 2.0,
                status: BetStatus::Won,
            },
            Bet {
                id: 2,
                event_id: "2052712".to_string(),
                choice: BetChoice::Draw,
                amount: 10,
                odds: 3.5,
                status: BetStatus::Open,
            },
        ];

        let mut out = Vec::new();
        write_bets_csv(&bets, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,event_id,choice,stake,odds,status,payout");
        assert_eq!(lines[1], "1,2052711,home,10,2.0,won,20");
        assert_eq!(lines[2], "2,2052712,draw,10,3.5,open,0");
    }
}
