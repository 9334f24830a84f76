//! Play-money wallet: fixed-stake bets on event outcomes, settled once a score is known.

use crate::models::{Bet, BetChoice, BetStatus, Event};
use crate::utils::data::{load_from_slot, save_to_slot, SharedStore};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};

pub const WALLET_KEY: &str = "sportcalendar_wallet";
pub const BETS_KEY: &str = "sportcalendar_bets";

/// Balance of a wallet that has never been written
pub const INITIAL_BALANCE: i64 = 100;
/// Cost of every bet
pub const STAKE: i64 = 10;
pub const DEFAULT_ODDS: f64 = 2.0;
/// Largest multiplier a bet may carry
pub const MAX_ODDS: f64 = 1000.0;

/// Odds a bet can be placed at: finite, positive and at most `MAX_ODDS`
pub fn odds_in_range(odds: f64) -> bool {
    odds.is_finite() && odds > 0.0 && odds <= MAX_ODDS
}

/// Result of a placement attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Accepted(Bet),
    /// Nothing was debited or recorded
    InsufficientFunds { balance: i64, stake: i64 },
}

/// A bet that changed state during resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub bet_id: u64,
    pub event_id: String,
    pub choice: BetChoice,
    pub outcome: BetChoice,
    pub status: BetStatus,
    /// Amount credited, 0 for lost bets
    pub payout: i64,
}

pub struct Ledger {
    store: SharedStore,
    balance: i64,
    bets: Vec<Bet>,
}

impl Ledger {
    /// Open the ledger persisted in `store`, starting from the initial balance
    /// and no bets when nothing has been written yet
    pub fn open(store: SharedStore) -> Result<Self> {
        let balance = load_from_slot::<i64>(store.as_ref(), WALLET_KEY)
            .context("Failed to load wallet balance")?
            .unwrap_or(INITIAL_BALANCE);
        let bets = load_from_slot::<Vec<Bet>>(store.as_ref(), BETS_KEY)
            .context("Failed to load bets")?
            .unwrap_or_default();

        debug!("Ledger opened: balance {}, {} bets", balance, bets.len());
        Ok(Self {
            store,
            balance,
            bets,
        })
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn open_bets(&self) -> impl Iterator<Item = &Bet> {
        self.bets.iter().filter(|b| b.status == BetStatus::Open)
    }

    /// Whether any bet references the event. The ledger itself allows
    /// several bets per event; front-ends use this to offer only one.
    pub fn has_bet_on(&self, event_id: &str) -> bool {
        self.bets.iter().any(|b| b.event_id == event_id)
    }

    /// Debit the fixed stake and record an open bet, if the balance covers it
    pub fn place_bet(&mut self, event_id: &str, choice: BetChoice, odds: f64) -> Result<Placement> {
        if !odds_in_range(odds) {
            anyhow::bail!("Odds must be between 0 and {}, got {}", MAX_ODDS, odds);
        }
        if self.balance < STAKE {
            info!(
                "Rejected bet on {}: balance {} below stake {}",
                event_id, self.balance, STAKE
            );
            return Ok(Placement::InsufficientFunds {
                balance: self.balance,
                stake: STAKE,
            });
        }

        let bet = Bet {
            id: self.next_bet_id(),
            event_id: event_id.to_string(),
            choice,
            amount: STAKE,
            odds,
            status: BetStatus::Open,
        };

        let balance = self.balance - STAKE;
        let mut bets = self.bets.clone();
        bets.push(bet.clone());
        self.commit(balance, bets)?;

        info!(
            "Placed bet #{} on {} ({} @ {:.2}), balance {}",
            bet.id, event_id, choice, odds, self.balance
        );
        Ok(Placement::Accepted(bet))
    }

    /// Settle every open bet on a decided event.
    ///
    /// Undecided events and bets that are already settled are left alone, so
    /// calling this again for the same event changes nothing.
    pub fn resolve_event(&mut self, event: &Event) -> Result<Vec<Settlement>> {
        let outcome = match event.outcome() {
            Some(outcome) => outcome,
            None => return Ok(Vec::new()),
        };

        let mut balance = self.balance;
        let mut bets = self.bets.clone();
        let mut settlements = Vec::new();

        for bet in bets
            .iter_mut()
            .filter(|b| b.status == BetStatus::Open && b.event_id == event.id)
        {
            let payout = if bet.choice == outcome {
                bet.status = BetStatus::Won;
                bet.payout()
            } else {
                bet.status = BetStatus::Lost;
                0
            };
            balance = balance.saturating_add(payout);

            settlements.push(Settlement {
                bet_id: bet.id,
                event_id: bet.event_id.clone(),
                choice: bet.choice,
                outcome,
                status: bet.status,
                payout,
            });
        }

        if settlements.is_empty() {
            return Ok(settlements);
        }

        self.commit(balance, bets)?;
        for s in &settlements {
            match s.status {
                BetStatus::Won => info!("Bet #{} on {} won {}", s.bet_id, event.title(), s.payout),
                _ => info!("Bet #{} on {} lost", s.bet_id, event.title()),
            }
        }
        Ok(settlements)
    }

    pub fn resolve_all(&mut self, events: &[Event]) -> Result<Vec<Settlement>> {
        let mut settlements = Vec::new();
        for event in events {
            settlements.extend(self.resolve_event(event)?);
        }
        Ok(settlements)
    }

    /// Persist the new state, then adopt it.
    ///
    /// The balance is written before the bet list. If the bet list cannot be
    /// written the previous balance is restored, so the two slots never
    /// disagree about a debit or a credit.
    fn commit(&mut self, balance: i64, bets: Vec<Bet>) -> Result<()> {
        let balance_moved = balance != self.balance;
        if balance_moved {
            save_to_slot(self.store.as_ref(), WALLET_KEY, &balance)
                .context("Failed to save wallet balance")?;
        }

        if let Err(e) = save_to_slot(self.store.as_ref(), BETS_KEY, &bets) {
            if balance_moved {
                if let Err(restore) = save_to_slot(self.store.as_ref(), WALLET_KEY, &self.balance) {
                    error!(
                        "Could not restore wallet balance {} after failed bet save: {:#}",
                        self.balance, restore
                    );
                }
            }
            return Err(e.context("Failed to save bets"));
        }

        self.balance = balance;
        self.bets = bets;
        Ok(())
    }

    /// Epoch millis, bumped past the newest existing id
    fn next_bet_id(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let last = self.bets.iter().map(|b| b.id).max().unwrap_or(0);
        now.max(last + 1)
    }
}
