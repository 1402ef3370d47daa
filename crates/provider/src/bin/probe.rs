use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use provider::sources::chesscom::DEFAULT_BASE_URL;
use provider::{ChessComClient, OpponentResolver, RateLimiter, RatingFetcher};
use storage::models::GameMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Query the rating provider directly, without the job pipeline.
#[derive(Parser)]
#[command(name = "chess-probe")]
#[command(version)]
struct Cli {
    handle: String,

    #[arg(long, default_value = "blitz", value_parser = parse_game_mode)]
    mode: GameMode,

    /// Last day of games to consider (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Also fetch every opponent's current rating.
    #[arg(long)]
    ratings: bool,

    #[arg(long, env = "CHESS_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "PROVIDER_MIN_INTERVAL_MS", default_value_t = 250)]
    min_interval_ms: u64,

    #[arg(short, long)]
    verbose: bool,
}

fn parse_game_mode(value: &str) -> Result<GameMode, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("probe={log_level},provider={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(cli.min_interval_ms)));
    let client = ChessComClient::new(cli.base_url, limiter)?;
    let end_date = cli
        .end_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let own_rating = client.fetch_rating(&cli.handle, cli.mode).await?;
    match own_rating {
        Some(rating) => println!("{} ({}): {}", cli.handle, cli.mode, rating),
        None => println!("{} ({}): unrated", cli.handle, cli.mode),
    }

    let opponents = client
        .resolve_opponents(&cli.handle, cli.mode, end_date)
        .await?;
    println!("{} opponents up to {}", opponents.len(), end_date);

    for opponent in &opponents {
        if cli.ratings {
            match client.fetch_rating(opponent, cli.mode).await? {
                Some(rating) => println!("  {opponent:<24} {rating}"),
                None => println!("  {opponent:<24} -"),
            }
        } else {
            println!("  {opponent}");
        }
    }

    Ok(())
}
