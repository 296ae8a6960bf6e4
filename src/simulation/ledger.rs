// Balance and fee ledger per venue
// Every fill is one fee computation plus one atomic balance update

use crate::error::{SimulationError, SimulationResult};
use crate::simulation::order_book::{Side, EPS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Origin,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillKind {
    Maker,
    Taker,
}

/// Maker/taker fee rates as fractions of notional
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker: f64,
    pub taker: f64,
}

impl FeeSchedule {
    pub fn rate(&self, kind: FillKind) -> f64 {
        match kind {
            FillKind::Maker => self.maker,
            FillKind::Taker => self.taker,
        }
    }
}

/// One recorded fee event; appended to the run history, never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEvent {
    /// Position in the run-wide event sequence; deterministic across reruns
    pub seq: u64,
    pub venue: Venue,
    pub side: Side,
    pub kind: FillKind,
    pub volume: f64,
    pub price: f64,
    pub fee: f64,
}

/// Append a fee event, assigning the next sequence number
pub fn record_fee(
    events: &mut Vec<FeeEvent>,
    venue: Venue,
    side: Side,
    kind: FillKind,
    volume: f64,
    price: f64,
    fee: f64,
) {
    events.push(FeeEvent {
        seq: events.len() as u64,
        venue,
        side,
        kind,
        volume,
        price,
        fee,
    });
}

/// Cash and token balances for one venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueLedger {
    pub fiat: f64,
    pub token: f64,
    pub fees: FeeSchedule,
}

impl VenueLedger {
    pub fn new(fiat: f64, token: f64, fees: FeeSchedule) -> Self {
        Self { fiat, token, fees }
    }

    pub fn fee(&self, kind: FillKind, notional: f64) -> f64 {
        notional * self.fees.rate(kind)
    }

    /// Settle a buy: fiat pays notional plus fee, token is credited.
    ///
    /// Balances are untouched when the fiat balance would go negative.
    pub fn apply_buy(&mut self, notional: f64, size: f64, fee: f64) -> SimulationResult<()> {
        let required = notional + fee;
        if self.fiat - required < -EPS {
            return Err(SimulationError::InsufficientBalance {
                asset: "fiat",
                required,
                available: self.fiat,
            });
        }
        self.fiat -= required;
        self.token += size;
        Ok(())
    }

    /// Settle a sell: token is debited, fiat receives notional minus fee.
    ///
    /// Balances are untouched when the token balance would go negative.
    pub fn apply_sell(&mut self, notional: f64, size: f64, fee: f64) -> SimulationResult<()> {
        if self.token - size < -EPS {
            return Err(SimulationError::InsufficientBalance {
                asset: "token",
                required: size,
                available: self.token,
            });
        }
        self.token -= size;
        self.fiat += notional - fee;
        Ok(())
    }
}
