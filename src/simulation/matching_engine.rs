// Matching engine
// Classifies queued synthetic orders as taker or maker against destination
// depth and mirrors every taker fill as an equal-size hedge on the origin venue

use crate::error::SimulationResult;
use crate::simulation::ledger::{record_fee, FeeEvent, FillKind, Venue, VenueLedger};
use crate::simulation::order_book::{Side, VenueBook};
use crate::simulation::replicator::SyntheticOrder;
use tracing::debug;

/// Per-step matching counters, used for logging
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchStats {
    pub takers: usize,
    pub makers: usize,
    pub taker_volume: f64,
}

pub struct MatchingEngine;

impl MatchingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Process the queue strictly in order, one order at a time.
    ///
    /// Each order mutates books and ledgers before the next is evaluated, so
    /// earlier fills change the depth available to later ones.
    pub fn process_queue(
        &self,
        queue: &[SyntheticOrder],
        dest_book: &mut VenueBook,
        origin_book: &mut VenueBook,
        dest_ledger: &mut VenueLedger,
        origin_ledger: &mut VenueLedger,
        events: &mut Vec<FeeEvent>,
    ) -> SimulationResult<MatchStats> {
        let mut stats = MatchStats::default();

        for order in queue {
            let crosses = match order.side {
                Side::Bid => dest_book
                    .best_ask()
                    .map(|ask| order.price >= ask.price)
                    .unwrap_or(false),
                Side::Ask => dest_book
                    .best_bid()
                    .map(|bid| order.price < bid.price)
                    .unwrap_or(false),
            };

            if crosses {
                self.execute_taker(order, dest_book, origin_book, dest_ledger, origin_ledger, events)?;
                stats.takers += 1;
                stats.taker_volume += order.size;
            } else {
                dest_book.add_synthetic(order.side, order.price, order.size);
                stats.makers += 1;
            }
        }

        debug!(
            takers = stats.takers,
            makers = stats.makers,
            taker_volume = stats.taker_volume,
            "queue drained"
        );

        Ok(stats)
    }

    /// Fill a crossing order against destination depth and hedge it on origin.
    ///
    /// A taker bid eats destination asks and sells the same size into origin
    /// bids; a taker ask is the mirror image. Both legs pay the venue's taker
    /// fee as one atomic ledger update each.
    fn execute_taker(
        &self,
        order: &SyntheticOrder,
        dest_book: &mut VenueBook,
        origin_book: &mut VenueBook,
        dest_ledger: &mut VenueLedger,
        origin_ledger: &mut VenueLedger,
        events: &mut Vec<FeeEvent>,
    ) -> SimulationResult<()> {
        let fill = dest_book.consume_side(order.side.opposite(), order.size)?;
        let fee = dest_ledger.fee(FillKind::Taker, fill.notional);

        match order.side {
            Side::Bid => dest_ledger.apply_buy(fill.notional, order.size, fee)?,
            Side::Ask => dest_ledger.apply_sell(fill.notional, order.size, fee)?,
        }
        record_fee(
            events,
            Venue::Destination,
            order.side,
            FillKind::Taker,
            order.size,
            fill.vwap(),
            fee,
        );

        // hedge leg: the opposite transaction for the same size on origin
        let hedge = origin_book.consume_side(order.side, order.size)?;
        let hedge_fee = origin_ledger.fee(FillKind::Taker, hedge.notional);

        match order.side {
            Side::Bid => origin_ledger.apply_sell(hedge.notional, order.size, hedge_fee)?,
            Side::Ask => origin_ledger.apply_buy(hedge.notional, order.size, hedge_fee)?,
        }
        record_fee(
            events,
            Venue::Origin,
            order.side.opposite(),
            FillKind::Taker,
            order.size,
            hedge.vwap(),
            hedge_fee,
        );

        Ok(())
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
