use anyhow::{Context, Result};
use sport_calendar::{server, Config, SportCalendar};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let mut calendar = SportCalendar::from_config(&config)?;

    println!("Fetching events...");
    let (events, settlements) = calendar.startup().await?;
    println!("Data loaded successfully");
    println!("  - {} events", events.len());
    println!("  - {} bets settled", settlements.len());
    println!("  - balance {} chips", calendar.balance());

    let app = server::router(Arc::new(RwLock::new(calendar)));

    println!("\nStarting web server at http://{}", config.web_addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&config.web_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.web_addr))?;

    axum::serve(listener, app).await?;

    Ok(())
}
