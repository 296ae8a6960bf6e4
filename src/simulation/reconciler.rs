// Reconciler
// After the queue drains, marks resting levels crossed by the next observed
// snapshot as filled, merges synthetic and organic volume per price level,
// and hedges newly filled resting volume on the origin venue

use crate::error::SimulationResult;
use crate::simulation::ledger::{record_fee, FeeEvent, FillKind, Venue, VenueLedger};
use crate::simulation::order_book::{
    BookLevel, OrderBookSnapshot, OrderedFloat, Side, VenueBook, EPS,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// New resting size for one price level after observing the next snapshot.
///
/// `current` is the pre-reconciliation book size, `added` its synthetic
/// portion, `next_volume` the organic volume observed at that price in the
/// next snapshot. Four scenarios over `original = current - added`:
///
/// | scenario | condition                              | new size                    |
/// |----------|----------------------------------------|-----------------------------|
/// | a        | original == 0, next == 0, no synthetic | 0 (dropped)                 |
/// | b        | original == 0, next != 0               | current + next              |
/// | c        | original == 0, next == 0, synthetic    | added                       |
/// | d        | original != 0, next != 0               | current + (next - original) |
///
/// A vanished organic level with no replacement (original != 0, next == 0)
/// reduces to `added` by the same arithmetic.
pub fn merged_size(current: f64, added: f64, next_volume: f64) -> f64 {
    let original = current - added;

    if original.abs() <= EPS {
        if next_volume.abs() <= EPS {
            added // scenarios a (added == 0) and c
        } else {
            current + next_volume // scenario b
        }
    } else if next_volume.abs() > EPS {
        current + (next_volume - original) // scenario d
    } else {
        added
    }
}

pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile the synthetic destination book against the next observed
    /// destination snapshot and roll the origin book forward.
    ///
    /// Crossed resting levels fill first, hedged against the *current* origin
    /// depth; levels dropped by the merge fill afterwards, hedged against the
    /// *next* origin snapshot. On return `origin_book` holds the next origin
    /// snapshot minus those later hedges.
    #[allow(clippy::too_many_arguments)]
    pub fn reconcile(
        &self,
        dest_book: &mut VenueBook,
        origin_book: &mut VenueBook,
        next_dest: &OrderBookSnapshot,
        next_origin: &OrderBookSnapshot,
        dest_ledger: &mut VenueLedger,
        origin_ledger: &mut VenueLedger,
        events: &mut Vec<FeeEvent>,
    ) -> SimulationResult<()> {
        self.fill_crossed_levels(
            Side::Bid,
            dest_book,
            origin_book,
            next_dest,
            dest_ledger,
            origin_ledger,
            events,
        )?;
        self.fill_crossed_levels(
            Side::Ask,
            dest_book,
            origin_book,
            next_dest,
            dest_ledger,
            origin_ledger,
            events,
        )?;

        let mut next_origin_book = VenueBook::from_snapshot(next_origin);
        self.merge_side(
            Side::Bid,
            dest_book,
            &mut next_origin_book,
            next_dest,
            dest_ledger,
            origin_ledger,
            events,
        )?;
        self.merge_side(
            Side::Ask,
            dest_book,
            &mut next_origin_book,
            next_dest,
            dest_ledger,
            origin_ledger,
            events,
        )?;

        *origin_book = next_origin_book;
        Ok(())
    }

    /// Fill resting levels the next observed top of book has traded through:
    /// bids above the new best bid, asks below the new best ask.
    #[allow(clippy::too_many_arguments)]
    fn fill_crossed_levels(
        &self,
        side: Side,
        dest_book: &mut VenueBook,
        hedge_book: &mut VenueBook,
        next_dest: &OrderBookSnapshot,
        dest_ledger: &mut VenueLedger,
        origin_ledger: &mut VenueLedger,
        events: &mut Vec<FeeEvent>,
    ) -> SimulationResult<()> {
        let threshold = match side {
            Side::Bid => next_dest.best_bid().map(|l| l.price),
            Side::Ask => next_dest.best_ask().map(|l| l.price),
        };
        let threshold = match threshold {
            Some(price) => price,
            None => return Ok(()),
        };

        let crossed: Vec<BookLevel> = dest_book
            .levels_in_priority(side)
            .into_iter()
            .filter(|level| match side {
                Side::Bid => level.price > threshold,
                Side::Ask => level.price < threshold,
            })
            .collect();

        for level in crossed {
            debug!(
                side = ?side,
                price = level.price,
                size = level.size,
                "resting level crossed by next snapshot"
            );
            dest_book.remove_level(side, level.price);
            self.fill_resting(
                side,
                level.price,
                level.size,
                hedge_book,
                dest_ledger,
                origin_ledger,
                events,
            )?;
        }

        Ok(())
    }

    /// Merge synthetic and organic volume per price level against the next
    /// snapshot. Levels whose merged size is zero but which previously held
    /// volume are treated as fully filled and hedged.
    #[allow(clippy::too_many_arguments)]
    fn merge_side(
        &self,
        side: Side,
        dest_book: &mut VenueBook,
        next_origin_book: &mut VenueBook,
        next_dest: &OrderBookSnapshot,
        dest_ledger: &mut VenueLedger,
        origin_ledger: &mut VenueLedger,
        events: &mut Vec<FeeEvent>,
    ) -> SimulationResult<()> {
        let next_levels = match side {
            Side::Bid => &next_dest.bids,
            Side::Ask => &next_dest.asks,
        };
        let next_volumes: BTreeMap<OrderedFloat, f64> = next_levels
            .iter()
            .map(|l| (OrderedFloat(l.price), l.size))
            .collect();

        let mut prices: BTreeSet<OrderedFloat> = next_volumes.keys().copied().collect();
        for level in dest_book.levels_in_priority(side) {
            prices.insert(OrderedFloat(level.price));
        }

        let mut merged = Vec::with_capacity(prices.len());
        let mut filled = Vec::new();

        for price in prices {
            let (current, added) = dest_book
                .level_at(side, price.0)
                .map(|l| (l.size, l.added))
                .unwrap_or((0.0, 0.0));
            let next_volume = next_volumes.get(&price).copied().unwrap_or(0.0);

            let new_size = merged_size(current, added, next_volume);

            if new_size <= EPS {
                if current > EPS {
                    filled.push((price.0, current));
                }
            } else {
                merged.push(BookLevel {
                    price: price.0,
                    size: new_size,
                    added: added.min(new_size),
                });
            }
        }

        dest_book.set_side(side, merged);

        for (price, size) in filled {
            self.fill_resting(
                side,
                price,
                size,
                next_origin_book,
                dest_ledger,
                origin_ledger,
                events,
            )?;
        }

        Ok(())
    }

    /// Settle a resting level deemed filled: maker fee on destination, then
    /// an equal-size hedge against `hedge_book` depth on origin. The hedge
    /// carries no fee — it is assumed to execute at resting depth without
    /// incremental cost, unlike the taker hedge.
    #[allow(clippy::too_many_arguments)]
    fn fill_resting(
        &self,
        side: Side,
        price: f64,
        size: f64,
        hedge_book: &mut VenueBook,
        dest_ledger: &mut VenueLedger,
        origin_ledger: &mut VenueLedger,
        events: &mut Vec<FeeEvent>,
    ) -> SimulationResult<()> {
        let notional = size * price;
        let fee = dest_ledger.fee(FillKind::Maker, notional);

        match side {
            Side::Bid => dest_ledger.apply_buy(notional, size, fee)?,
            Side::Ask => dest_ledger.apply_sell(notional, size, fee)?,
        }
        record_fee(events, Venue::Destination, side, FillKind::Maker, size, price, fee);

        let hedge = hedge_book.consume_side(side, size)?;
        match side {
            Side::Bid => origin_ledger.apply_sell(hedge.notional, size, 0.0)?,
            Side::Ask => origin_ledger.apply_buy(hedge.notional, size, 0.0)?,
        }
        record_fee(
            events,
            Venue::Origin,
            side.opposite(),
            FillKind::Maker,
            size,
            hedge.vwap(),
            0.0,
        );

        Ok(())
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
