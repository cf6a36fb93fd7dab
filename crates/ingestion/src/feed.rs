//! Market data feed adapters.
//!
//! An adapter owns the transport and hands every raw inbound message to a
//! callback. Price extraction happens downstream in [`crate::parser`].

use crate::parser::ingest;
use crate::tick_buffer::TickBuffer;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tickcast_core::config::FeedConfig;
use tickcast_core::{Error, Result};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// A blocking source of raw tick messages.
pub trait FeedAdapter: Send {
    /// Deliver messages to `on_tick` until the feed ends.
    fn run(&mut self, on_tick: &mut dyn FnMut(&str)) -> Result<()>;
}

/// Run a feed on its own thread, appending parsed prices to `buffer`.
pub fn spawn_feed<F>(mut adapter: F, buffer: Arc<TickBuffer>) -> Result<JoinHandle<Result<()>>>
where
    F: FeedAdapter + 'static,
{
    let handle = thread::Builder::new()
        .name("tick-feed".to_string())
        .spawn(move || {
            let mut on_tick = |raw: &str| {
                ingest(&buffer, raw);
            };
            adapter.run(&mut on_tick)
        })?;
    Ok(handle)
}

/// Replays a fixed list of raw messages.
pub struct ReplayFeed {
    messages: Vec<String>,
    delay: Duration,
}

impl ReplayFeed {
    /// Replay `messages` back to back.
    pub fn new(messages: Vec<String>) -> Self {
        Self {
            messages,
            delay: Duration::ZERO,
        }
    }

    /// Wait `delay` between messages.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Build ticker messages for a price series.
    pub fn from_prices(product_id: &str, prices: &[f64]) -> Self {
        let messages = prices
            .iter()
            .map(|p| {
                json!({
                    "type": "ticker",
                    "product_id": product_id,
                    "price": p.to_string(),
                })
                .to_string()
            })
            .collect();
        Self::new(messages)
    }
}

impl FeedAdapter for ReplayFeed {
    fn run(&mut self, on_tick: &mut dyn FnMut(&str)) -> Result<()> {
        for msg in &self.messages {
            on_tick(msg);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
        Ok(())
    }
}

/// Coinbase exchange WebSocket feed.
///
/// Reconnects after a fixed delay whenever the session ends, so `run` only
/// returns if the async runtime cannot be created.
pub struct CoinbaseFeed {
    config: FeedConfig,
}

impl CoinbaseFeed {
    /// Create a feed for the configured product.
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    /// Subscribe request for the configured product and channel.
    pub fn subscribe_message(&self) -> String {
        json!({
            "type": "subscribe",
            "product_ids": [self.config.product_id],
            "channels": [self.config.channel],
        })
        .to_string()
    }

    /// One connection, from connect to close.
    async fn session(&self, on_tick: &mut dyn FnMut(&str)) -> Result<()> {
        let (ws_stream, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| Error::feed(format!("connect {}: {e}", self.config.url)))?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(self.subscribe_message().into()))
            .await
            .map_err(|e| Error::feed(format!("subscribe: {e}")))?;
        info!(
            "Subscribed to {} on {} ({})",
            self.config.product_id, self.config.channel, self.config.url
        );

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => on_tick(text.as_str()),
                Ok(Message::Ping(data)) => {
                    write
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| Error::feed(format!("pong: {e}")))?;
                }
                Ok(Message::Close(frame)) => {
                    info!("Feed closed by server: {:?}", frame);
                    return Ok(());
                }
                Ok(other) => debug!("Ignoring non-text frame: {:?}", other),
                Err(e) => return Err(Error::feed(e.to_string())),
            }
        }

        Ok(())
    }
}

impl FeedAdapter for CoinbaseFeed {
    fn run(&mut self, on_tick: &mut dyn FnMut(&str)) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        loop {
            match runtime.block_on(self.session(on_tick)) {
                Ok(()) => info!("Feed session ended"),
                Err(e) => warn!("Feed session failed: {}", e),
            }
            warn!("Reconnecting in {:?}", self.config.reconnect_delay());
            thread::sleep(self.config.reconnect_delay());
        }
    }
}
