use crate::domain::Decimal;
use std::collections::VecDeque;

/// An outstanding loan; `amount` is always > 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanEntry {
    pub amount: Decimal,
    pub loan_seq: u32,
}

/// Outcome of applying a receipt to the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repayment {
    pub repaid: Decimal,
    /// Loan ids touched, oldest first.
    pub amortized: Vec<u32>,
    /// Amount left over after the queue emptied.
    pub leftover: Decimal,
}

/// FIFO of outstanding loans with a cached total.
#[derive(Debug, Clone, Default)]
pub struct LoanQueue {
    entries: VecDeque<LoanEntry>,
    total: Decimal,
}

impl LoanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of outstanding amounts.
    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoanEntry> {
        self.entries.iter()
    }

    pub fn push(&mut self, amount: Decimal, loan_seq: u32) {
        if !amount.is_positive() {
            return;
        }
        self.total += amount;
        self.entries.push_back(LoanEntry { amount, loan_seq });
    }

    /// Repay oldest loans first. A partially consumed loan stays at the
    /// front under its own id.
    pub fn repay(&mut self, amount: Decimal) -> Repayment {
        let mut remaining = amount;
        let mut out = Repayment::default();

        while remaining.is_positive() {
            let Some(front) = self.entries.front_mut() else {
                break;
            };
            out.amortized.push(front.loan_seq);
            if remaining >= front.amount {
                let paid = front.amount;
                out.repaid += paid;
                remaining -= paid;
                self.total -= paid;
                self.entries.pop_front();
            } else {
                front.amount -= remaining;
                out.repaid += remaining;
                self.total -= remaining;
                remaining = Decimal::zero();
            }
        }

        out.leftover = remaining;
        out
    }
}
