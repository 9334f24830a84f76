use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sport_calendar::utils::export::save_bets_to_csv;
use sport_calendar::{BetChoice, Config, EventFilter, Placement, Sport, SportCalendar};

/// Sport calendar - upcoming fixtures, recent results and a play-money wallet
#[derive(Parser, Debug)]
#[command(name = "sport-calendar")]
struct Args {
    /// Ignore the cached snapshot and fetch every league again
    #[arg(long, global = true)]
    refresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List events, nearest to today first
    Events {
        #[arg(long)]
        sport: Option<Sport>,
        /// League id, e.g. 4328
        #[arg(long)]
        league: Option<String>,
        /// Only events on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Match against the title and team names
        #[arg(long)]
        team: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show the wallet balance
    Balance,
    /// List bets
    Bets {
        /// Also write the history to this CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Bet the fixed stake on an event
    Bet {
        event_id: String,
        /// home, draw or away
        choice: BetChoice,
        #[arg(long)]
        odds: Option<f64>,
    },
    /// Fabricate a final score for an event and settle its bets
    Simulate {
        event_id: String,
        #[arg(long, requires = "away")]
        home: Option<u32>,
        #[arg(long, requires = "home")]
        away: Option<u32>,
    },
    /// Settle open bets against the latest results
    Resolve,
    /// Fetch one event's detail from the feed
    Lookup { event_id: String },
    /// Quick preview of a league's upcoming events
    Next { league_id: String },
    /// List the configured leagues
    Leagues,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let mut calendar = SportCalendar::from_config(&config)?;

    if args.refresh {
        calendar.invalidate()?;
    }

    match args.command {
        Command::Events {
            sport,
            league,
            date,
            team,
            limit,
        } => {
            let (events, settlements) = calendar.startup().await?;
            for s in &settlements {
                println!("Settled bet #{}: {} (+{})", s.bet_id, s.status, s.payout);
            }

            let filter = EventFilter {
                sport,
                league_id: league,
                date,
                team,
            };
            let events = if filter.is_empty() {
                events
            } else {
                calendar.filter(&filter).await
            };

            if events.is_empty() {
                println!("No events to show.");
            } else {
                println!("{} events:\n", events.len());
                for (i, event) in events.iter().take(limit).enumerate() {
                    let marker = if calendar.has_bet_on(&event.id) { " *" } else { "" };
                    println!("{}. {}{}", i + 1, event.format(), marker);
                }
            }
        }
        Command::Balance => {
            println!("Balance: {} chips", calendar.balance());
        }
        Command::Bets { csv } => {
            let bets = calendar.ledger().bets();
            if bets.is_empty() {
                println!("No bets placed yet.");
            }
            for bet in bets {
                println!("{}", bet.format());
            }
            if let Some(path) = csv {
                save_bets_to_csv(bets, &path)?;
                println!("\nSaved bets to {}", path);
            }
        }
        Command::Bet {
            event_id,
            choice,
            odds,
        } => {
            let (events, _) = calendar.startup().await?;
            let event = events
                .iter()
                .find(|e| e.id == event_id)
                .with_context(|| format!("Event {} is not in the calendar", event_id))?;

            if event.is_decided() {
                println!("{} is already decided, betting is closed.", event.title());
            } else if calendar.has_bet_on(&event_id) {
                println!("You already have a bet on {}.", event.title());
            } else {
                match calendar.place_bet(&event_id, choice, odds)? {
                    Placement::Accepted(bet) => {
                        println!("Bet of {} chips confirmed on '{}'", bet.amount, choice);
                        println!("Balance: {} chips", calendar.balance());
                    }
                    Placement::InsufficientFunds { balance, stake } => {
                        println!(
                            "Insufficient balance: you need {} chips and have {}.",
                            stake, balance
                        );
                    }
                }
            }
        }
        Command::Simulate {
            event_id,
            home,
            away,
        } => {
            let result = match (home, away) {
                (Some(home), Some(away)) => {
                    calendar
                        .record_simulated_result(&event_id, home, away)
                        .await?
                }
                _ => calendar.simulate_result(&event_id).await?,
            };

            match result {
                Some(result) => {
                    println!("Simulated: {}", result.event.format());
                    for s in &result.settlements {
                        println!("Bet #{} {} (+{})", s.bet_id, s.status, s.payout);
                    }
                    println!("Balance: {} chips", calendar.balance());
                }
                None => println!("Event {} is not in the calendar.", event_id),
            }
        }
        Command::Resolve => {
            let (_, settlements) = calendar.startup().await?;
            if settlements.is_empty() {
                println!("Nothing to settle.");
            }
            for s in &settlements {
                println!("Bet #{} on {}: {} (+{})", s.bet_id, s.event_id, s.status, s.payout);
            }
            println!("Balance: {} chips", calendar.balance());
        }
        Command::Lookup { event_id } => match calendar.lookup_event(&event_id).await {
            Some(event) => {
                println!("{}", event.format());
                if let Some(venue) = &event.venue {
                    println!("Venue: {}", venue);
                }
                if let Some(status) = &event.status {
                    println!("Status: {}", status);
                }
            }
            None => println!("Could not load event {}.", event_id),
        },
        Command::Next { league_id } => match calendar.next_preview(&league_id).await {
            Some(events) if events.is_empty() => println!("No upcoming events."),
            Some(events) => {
                for event in events {
                    println!("{}", event.format());
                }
            }
            None => println!("League {} is not configured.", league_id),
        },
        Command::Leagues => {
            for league in calendar.leagues() {
                println!("{:>6}  {:<22} {:?}", league.id, league.name, league.sport);
            }
        }
    }

    Ok(())
}
