use bigdecimal::{BigDecimal, Zero};
use engine_core::state::models::TotalsSnapshot;

/// Running count and exact decimal sum for one break level. Negative
/// amounts land in the credit bucket as absolute values, so
/// `total == debit - credit` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    count: u64,
    total: BigDecimal,
    debit: BigDecimal,
    credit: BigDecimal,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, amount: &BigDecimal) {
        self.count += 1;
        self.total += amount;
        if *amount < BigDecimal::zero() {
            self.credit += amount.abs();
        } else {
            self.debit += amount;
        }
    }

    pub fn snapshot(&self) -> TotalsSnapshot {
        TotalsSnapshot {
            count: self.count,
            total: self.total.clone(),
            debit: self.debit.clone(),
            credit: self.credit.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn restore(snapshot: &TotalsSnapshot) -> Self {
        Self {
            count: snapshot.count,
            total: snapshot.total.clone(),
            debit: snapshot.debit.clone(),
            credit: snapshot.credit.clone(),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
