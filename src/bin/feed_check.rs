//! Binary to run one candle feed against a live exchange and print what
//! arrives, for inspecting adapter behavior by hand.
//!
//! # Usage
//!
//! ```sh
//! cargo run --bin feed_check --features cli -- binance_spot BTC-USDT 1m
//! ```

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use candles_feed::adapters::available_exchanges;
use candles_feed::feed::CandlesFeed;
use candles_feed::feed::strategy::StrategyKind;

const RUN_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let (exchange, pair, interval) = match args.as_slice() {
        [_, exchange, pair, interval] => (exchange.clone(), pair.clone(), interval.clone()),
        _ => {
            eprintln!("usage: feed_check <exchange> <pair> <interval>");
            eprintln!("known exchanges: {}", available_exchanges().join(", "));
            return ExitCode::from(2);
        }
    };

    let feed = match CandlesFeed::new(&exchange, &pair, &interval, 50, None) {
        Ok(feed) => feed,
        Err(e) => {
            eprintln!("cannot create feed: {e}");
            return ExitCode::from(1);
        }
    };

    println!("Starting {exchange} {pair} {interval} feed…");
    if let Err(e) = feed.start(StrategyKind::Auto).await {
        eprintln!("cannot start feed: {e}");
        return ExitCode::from(1);
    }

    println!("Collecting for {RUN_SECONDS} seconds…\n");
    let deadline = tokio::time::sleep(Duration::from_secs(RUN_SECONDS));
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = ticker.tick() => {
                let candles = feed.get_candles().await;
                match candles.last() {
                    Some(last) => println!(
                        "{} candles, ready={}, last: ts={} close={}",
                        candles.len(),
                        feed.ready().await,
                        last.timestamp,
                        last.close,
                    ),
                    None => println!("no candles yet (network: {:?})", feed.check_network().await),
                }
            }
        }
    }

    println!("\nStopping…");
    feed.stop().await;
    ExitCode::SUCCESS
}
