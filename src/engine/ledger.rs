use crate::domain::{
    CycleFlow, DebtCycle, Decimal, EnrichedRecord, OperationLabel, OperationRecord,
    RowStatistics, Streak,
};

use super::loan_queue::LoanQueue;

/// Counters threaded through the ledger fold.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    /// Last cycle id handed out; ids start at 1.
    pub cycle_counter: u64,
    /// Cycle currently carrying debt.
    pub open_cycle: Option<u64>,
    /// Most recent cycle to borrow; profit is attributed to it.
    pub last_cycle: Option<u64>,
    pub loan_seq: u32,
    pub borrow_streak_id: u32,
    pub receipt_streak_id: u32,
    pub borrow_streak_total: Decimal,
    pub receipt_streak_total: Decimal,
    pub cumulative_net: Decimal,
    pub queue: LoanQueue,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding debt as a non-positive number.
    pub fn running_debt(&self) -> Decimal {
        -self.queue.total()
    }
}

/// FIFO debt ledger. Feeds operations in order and accumulates enriched
/// rows and debt cycles.
pub struct DebtLedger {
    pub state: EngineState,
    flow: CycleFlow,

    // Outputs accumulated during processing.
    records: Vec<EnrichedRecord>,
    cycles: Vec<DebtCycle>,
}

impl DebtLedger {
    pub fn new() -> Self {
        Self {
            state: EngineState::new(),
            flow: CycleFlow::default(),
            records: Vec::new(),
            cycles: Vec::new(),
        }
    }

    /// Process a single operation, updating state and emitting one row.
    ///
    /// Callers must feed operations in timestamp order.
    pub fn process_operation(&mut self, op: &OperationRecord) {
        self.state.cumulative_net += op.net_result;

        let record = if op.net_result.is_negative() {
            self.handle_borrow(op)
        } else if op.net_result.is_positive() {
            self.handle_receipt(op)
        } else {
            self.handle_neutral(op)
        };

        self.records.push(record);
    }

    fn handle_borrow(&mut self, op: &OperationRecord) -> EnrichedRecord {
        let index = self.records.len();
        let amount = op.net_result.abs();

        if self.state.queue.is_empty() {
            self.open_cycle(op, index);
        }
        let cycle_id = self.state.cycle_counter;

        if self.state.receipt_streak_total.is_positive() {
            self.state.receipt_streak_id += 1;
            self.state.receipt_streak_total = Decimal::zero();
        }
        self.state.borrow_streak_total += amount;

        self.state.loan_seq += 1;
        let loan_seq = self.state.loan_seq;
        self.state.queue.push(amount, loan_seq);
        self.state.last_cycle = Some(cycle_id);

        let running_debt = self.state.running_debt();
        if let Some(cycle) = self.cycles.last_mut() {
            if running_debt < cycle.max_debt {
                cycle.max_debt = running_debt;
                cycle.bottom_index = index;
            }
        }

        self.flow.borrowed += amount;
        self.flow.loan_rows += 1;

        EnrichedRecord {
            operation: op.clone(),
            label: OperationLabel::Loan {
                cycle: cycle_id,
                loan_seq,
                streak: self.state.borrow_streak_id,
            },
            cumulative_net: self.state.cumulative_net,
            running_debt,
            amount_borrowed: amount,
            amount_received: Decimal::zero(),
            amount_repaid: Decimal::zero(),
            profit_realized: Decimal::zero(),
            cycle_id: Some(cycle_id),
            loan_seq: Some(loan_seq),
            amortized_loans: Vec::new(),
            profit_tag: None,
            streak: Streak::Borrow(self.state.borrow_streak_id),
            borrow_streak_total: self.state.borrow_streak_total,
            receipt_streak_total: self.state.receipt_streak_total,
            cycle_flow: self.flow.clone(),
            stats: RowStatistics::default(),
        }
    }

    fn handle_receipt(&mut self, op: &OperationRecord) -> EnrichedRecord {
        let index = self.records.len();
        let amount = op.net_result;

        if self.state.borrow_streak_total.is_positive() {
            self.state.borrow_streak_id += 1;
            self.state.borrow_streak_total = Decimal::zero();
        }
        self.state.receipt_streak_total += amount;

        let cycle_id = self.state.open_cycle;
        let repayment = self.state.queue.repay(amount);
        let profit = if self.state.queue.is_empty() {
            repayment.leftover
        } else {
            Decimal::zero()
        };
        let profit_tag = profit
            .is_positive()
            .then(|| self.state.last_cycle.unwrap_or(0));

        if cycle_id.is_some() {
            self.flow.repaid += repayment.repaid;
            self.flow.profit += profit;
            if !repayment.amortized.is_empty() {
                self.flow.amortization_rows += 1;
            }
            if profit.is_positive() {
                self.flow.profit_rows += 1;
            }
        }
        let cycle_flow = if cycle_id.is_some() {
            self.flow.clone()
        } else {
            CycleFlow::default()
        };

        if cycle_id.is_some() && self.state.queue.is_empty() {
            self.close_cycle(op, index);
        }

        EnrichedRecord {
            operation: op.clone(),
            label: OperationLabel::Repayment {
                cycle: cycle_id.unwrap_or(0),
                amortized: repayment.amortized.clone(),
                profit_cycle: profit_tag,
                streak: self.state.receipt_streak_id,
            },
            cumulative_net: self.state.cumulative_net,
            running_debt: self.state.running_debt(),
            amount_borrowed: Decimal::zero(),
            amount_received: amount,
            amount_repaid: repayment.repaid,
            profit_realized: profit,
            cycle_id,
            loan_seq: None,
            amortized_loans: repayment.amortized,
            profit_tag,
            streak: Streak::Receipt(self.state.receipt_streak_id),
            borrow_streak_total: self.state.borrow_streak_total,
            receipt_streak_total: self.state.receipt_streak_total,
            cycle_flow,
            stats: RowStatistics::default(),
        }
    }

    fn handle_neutral(&mut self, op: &OperationRecord) -> EnrichedRecord {
        let cycle_id = self.state.open_cycle;
        EnrichedRecord {
            operation: op.clone(),
            label: OperationLabel::Neutral,
            cumulative_net: self.state.cumulative_net,
            running_debt: self.state.running_debt(),
            amount_borrowed: Decimal::zero(),
            amount_received: Decimal::zero(),
            amount_repaid: Decimal::zero(),
            profit_realized: Decimal::zero(),
            cycle_id,
            loan_seq: None,
            amortized_loans: Vec::new(),
            profit_tag: None,
            streak: Streak::Neutral,
            borrow_streak_total: self.state.borrow_streak_total,
            receipt_streak_total: self.state.receipt_streak_total,
            cycle_flow: if cycle_id.is_some() {
                self.flow.clone()
            } else {
                CycleFlow::default()
            },
            stats: RowStatistics::default(),
        }
    }

    fn open_cycle(&mut self, op: &OperationRecord, index: usize) {
        self.state.cycle_counter += 1;
        self.state.loan_seq = 0;
        self.state.open_cycle = Some(self.state.cycle_counter);
        self.flow = CycleFlow::default();

        self.cycles.push(DebtCycle {
            cycle_id: self.state.cycle_counter,
            start_index: index,
            end_index: None,
            bottom_index: index,
            max_debt: Decimal::zero(),
            start_time: op.timestamp,
            end_time: None,
        });
    }

    fn close_cycle(&mut self, op: &OperationRecord, index: usize) {
        if let Some(cycle) = self.cycles.last_mut() {
            cycle.end_index = Some(index);
            cycle.end_time = Some(op.timestamp);
        }
        self.state.open_cycle = None;
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn cycles(&self) -> &[DebtCycle] {
        &self.cycles
    }

    /// Get the accumulated outputs.
    pub fn into_outputs(self) -> (Vec<EnrichedRecord>, Vec<DebtCycle>) {
        (self.records, self.cycles)
    }
}

impl Default for DebtLedger {
    fn default() -> Self {
        Self::new()
    }
}
