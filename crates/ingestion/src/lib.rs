//! Market data ingestion for the tickcast system.
//!
//! This crate handles:
//! - The shared bounded tick buffer
//! - Price extraction from raw feed messages
//! - Feed adapters (exchange WebSocket, replay)

pub mod tick_buffer;
pub mod parser;
pub mod feed;

pub use tick_buffer::TickBuffer;
pub use parser::{ingest, parse_tick};
pub use feed::{spawn_feed, CoinbaseFeed, FeedAdapter, ReplayFeed};
