// Order book state for a single venue
// Tracks synthetic (replicated) volume separately from organically observed volume

use crate::error::{SimulationError, SimulationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Floating tolerance for size comparisons
pub const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The side a crossing order consumes: a bid eats asks and vice versa
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// A single price level as observed in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

/// Immutable order book observation at one timestamp
///
/// Bids are sorted by strictly decreasing price, asks by strictly increasing
/// price. No duplicate price within a side, no zero-size levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    /// Validate snapshot integrity: side ordering, duplicates, level sizes
    pub fn validate(&self) -> Result<(), String> {
        for window in self.bids.windows(2) {
            if window[1].price >= window[0].price {
                return Err(format!(
                    "bids not strictly decreasing at price {}",
                    window[1].price
                ));
            }
        }

        for window in self.asks.windows(2) {
            if window[1].price <= window[0].price {
                return Err(format!(
                    "asks not strictly increasing at price {}",
                    window[1].price
                ));
            }
        }

        for level in self.bids.iter().chain(self.asks.iter()) {
            if level.size <= 0.0 {
                return Err(format!("non-positive size at price {}", level.price));
            }
        }

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid.price >= ask.price {
                return Err(format!(
                    "crossed snapshot: best bid {} >= best ask {}",
                    bid.price, ask.price
                ));
            }
        }

        Ok(())
    }
}

/// Wrapper for f64 to use as BTreeMap key (handles NaN/Inf properly)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct OrderedFloat(pub f64);

impl Eq for OrderedFloat {}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl From<f64> for OrderedFloat {
    fn from(f: f64) -> Self {
        OrderedFloat(f)
    }
}

/// One resting level of a venue book
///
/// `added` is the portion of `size` injected by the replicator; the organic
/// (observed) portion is `size - added`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
    pub added: f64,
}

impl BookLevel {
    pub fn organic(&self) -> f64 {
        self.size - self.added
    }
}

/// Result of a level walk
#[derive(Debug, Clone)]
pub struct LevelWalk {
    /// Levels left after consumption, still in priority order
    pub remaining: Vec<PriceLevel>,
    /// Volume actually consumed; equals the requested volume on success
    pub filled: f64,
    /// Sum of price * quantity over the walk
    pub notional: f64,
}

impl LevelWalk {
    /// Volume-weighted average fill price
    pub fn vwap(&self) -> f64 {
        if self.filled > EPS {
            self.notional / self.filled
        } else {
            0.0
        }
    }
}

/// Walk `levels` (given in priority order, best first) consuming `volume`.
///
/// Fully consumed levels are dropped; the level that absorbs the remainder
/// keeps its unconsumed size. Fails with `InsufficientLiquidity` when the
/// walk would exhaust every level.
pub fn consume(levels: &[PriceLevel], volume: f64) -> SimulationResult<LevelWalk> {
    let available: f64 = levels.iter().map(|l| l.size).sum();
    if volume > available + EPS {
        return Err(SimulationError::InsufficientLiquidity {
            requested: volume,
            available,
        });
    }

    let mut remaining = Vec::with_capacity(levels.len());
    let mut left = volume;
    let mut notional = 0.0;

    for level in levels {
        if left <= EPS {
            remaining.push(*level);
            continue;
        }

        let taken = left.min(level.size);
        notional += taken * level.price;
        left -= taken;

        let residue = level.size - taken;
        if residue > EPS {
            remaining.push(PriceLevel {
                price: level.price,
                size: residue,
            });
        }
    }

    Ok(LevelWalk {
        remaining,
        filled: volume,
        notional,
    })
}

/// Mutable book state for one venue, bid and ask sides sorted by price
#[derive(Debug, Clone, Default)]
pub struct VenueBook {
    /// Bids keyed ascending; best bid is the last entry
    bids: BTreeMap<OrderedFloat, BookLevel>,
    /// Asks keyed ascending; best ask is the first entry
    asks: BTreeMap<OrderedFloat, BookLevel>,
}

impl VenueBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize from an observed snapshot; everything starts organic
    pub fn from_snapshot(snapshot: &OrderBookSnapshot) -> Self {
        let mut book = Self::new();
        for level in &snapshot.bids {
            book.bids.insert(
                OrderedFloat(level.price),
                BookLevel {
                    price: level.price,
                    size: level.size,
                    added: 0.0,
                },
            );
        }
        for level in &snapshot.asks {
            book.asks.insert(
                OrderedFloat(level.price),
                BookLevel {
                    price: level.price,
                    size: level.size,
                    added: 0.0,
                },
            );
        }
        book
    }

    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.values().next_back()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.values().next()
    }

    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    pub fn depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    fn side(&self, side: Side) -> &BTreeMap<OrderedFloat, BookLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<OrderedFloat, BookLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Levels of one side in priority order (bids descending, asks ascending)
    pub fn levels_in_priority(&self, side: Side) -> Vec<BookLevel> {
        match side {
            Side::Bid => self.bids.values().rev().copied().collect(),
            Side::Ask => self.asks.values().copied().collect(),
        }
    }

    /// Consume `volume` from one side in priority order, mutating the book.
    ///
    /// Synthetic portions of surviving levels are preserved, capped at the
    /// level's new size.
    pub fn consume_side(&mut self, side: Side, volume: f64) -> SimulationResult<LevelWalk> {
        let levels: Vec<PriceLevel> = self
            .levels_in_priority(side)
            .iter()
            .map(|l| PriceLevel {
                price: l.price,
                size: l.size,
            })
            .collect();

        let walk = consume(&levels, volume)?;

        let old = std::mem::take(self.side_mut(side));
        let book_side = self.side_mut(side);
        for level in &walk.remaining {
            let added = old
                .get(&OrderedFloat(level.price))
                .map(|l| l.added.min(level.size))
                .unwrap_or(0.0);
            book_side.insert(
                OrderedFloat(level.price),
                BookLevel {
                    price: level.price,
                    size: level.size,
                    added,
                },
            );
        }

        Ok(walk)
    }

    /// Rest synthetic volume at a price, merging with an existing level
    pub fn add_synthetic(&mut self, side: Side, price: f64, size: f64) {
        let level = self
            .side_mut(side)
            .entry(OrderedFloat(price))
            .or_insert(BookLevel {
                price,
                size: 0.0,
                added: 0.0,
            });
        level.size += size;
        level.added += size;
    }

    pub fn level_at(&self, side: Side, price: f64) -> Option<&BookLevel> {
        self.side(side).get(&OrderedFloat(price))
    }

    pub fn remove_level(&mut self, side: Side, price: f64) -> Option<BookLevel> {
        self.side_mut(side).remove(&OrderedFloat(price))
    }

    /// Replace one side wholesale; levels with non-positive size are dropped
    pub fn set_side(&mut self, side: Side, levels: Vec<BookLevel>) {
        let book_side = self.side_mut(side);
        book_side.clear();
        for level in levels {
            if level.size > EPS {
                book_side.insert(OrderedFloat(level.price), level);
            }
        }
    }

    /// Export current state as a snapshot, sides in conventional order
    pub fn to_snapshot(&self, timestamp: DateTime<Utc>) -> OrderBookSnapshot {
        OrderBookSnapshot {
            timestamp,
            bids: self
                .bids
                .values()
                .rev()
                .map(|l| PriceLevel {
                    price: l.price,
                    size: l.size,
                })
                .collect(),
            asks: self
                .asks
                .values()
                .map(|l| PriceLevel {
                    price: l.price,
                    size: l.size,
                })
                .collect(),
        }
    }

    /// Validate book integrity
    pub fn validate(&self) -> Result<(), String> {
        for level in self.bids.values().chain(self.asks.values()) {
            if level.size <= 0.0 {
                return Err(format!("non-positive size at price {}", level.price));
            }
            if level.added < -EPS || level.added > level.size + EPS {
                return Err(format!(
                    "synthetic portion {} out of range at price {}",
                    level.added, level.price
                ));
            }
        }
        Ok(())
    }
}
