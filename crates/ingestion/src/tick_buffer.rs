//! Bounded, thread-safe buffer of recent prices.
//!
//! The feed thread appends while the train/predict loop takes snapshots.
//! Append and eviction happen under one lock, so a snapshot is always a
//! contiguous suffix of the push sequence.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tickcast_core::Price;

/// Fixed-capacity FIFO of prices shared between feed and loop.
pub struct TickBuffer {
    /// Maximum number of prices retained.
    limit: usize,
    /// Prices in arrival order, oldest first.
    prices: Mutex<VecDeque<Price>>,
}

impl TickBuffer {
    /// Create an empty buffer holding at most `limit` prices.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            prices: Mutex::new(VecDeque::with_capacity(limit + 1)),
        }
    }

    /// Append a price, evicting the oldest one if the buffer is full.
    ///
    /// Non-finite prices are dropped and `false` is returned.
    pub fn push(&self, price: Price) -> bool {
        if !price.is_finite() {
            return false;
        }

        let mut prices = self.prices.lock();
        prices.push_back(price);
        if prices.len() > self.limit {
            prices.pop_front();
        }
        true
    }

    /// Point-in-time copy of the buffered prices, oldest first.
    pub fn snapshot(&self) -> Vec<Price> {
        let prices = self.prices.lock();
        prices.iter().copied().collect()
    }

    /// Number of buffered prices.
    pub fn len(&self) -> usize {
        self.prices.lock().len()
    }

    /// Whether no price has been buffered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity.
    pub fn limit(&self) -> usize {
        self.limit
    }
}
