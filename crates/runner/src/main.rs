use anyhow::Context;
use std::sync::Arc;
use tickcast_core::Config;
use tickcast_ingestion::{spawn_feed, CoinbaseFeed, TickBuffer};
use tickcast_model::build_classifier;
use tickcast_runner::{ConsoleReporter, TrainPredictLoop};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"tickcast - streaming BTC direction forecaster

USAGE:
    tickcast [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: tickcast=info)

EXAMPLES:
    # Run with defaults
    tickcast

    # Run with config file
    tickcast --config tickcast.json
"#
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            Config::from_file(&path).with_context(|| format!("failed to load config from {}", path))?
        }
        None => {
            let config = Config::default();
            config.validate().context("default configuration is invalid")?;
            config
        }
    };

    tracing::info!(
        "Buffer limit {}, start after {} prices, window {}, horizon {}",
        config.buffer.limit,
        config.buffer.start_limit,
        config.features.window,
        config.features.output
    );
    tracing::info!("Feed: {} {}", config.feed.url, config.feed.product_id);

    let buffer = Arc::new(TickBuffer::new(config.buffer.limit));
    let _feed = spawn_feed(CoinbaseFeed::new(config.feed.clone()), Arc::clone(&buffer))
        .context("failed to start feed thread")?;

    let classifier = build_classifier(&config.classifier);
    tracing::info!("Classifier: {}", classifier.name());

    let mut pipeline = TrainPredictLoop::new(buffer, classifier, ConsoleReporter, &config);
    pipeline.run()
}
