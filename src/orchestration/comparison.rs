//! Per-cycle view of how the automation behaved inside each debt cycle.

use crate::domain::{DebtCycle, Decimal};
use crate::engine::{AutomationState, AutomationStep};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleComparison {
    pub cycle_id: u64,
    pub start_index: usize,
    pub end_index: usize,
    pub closed: bool,
    pub max_debt: Decimal,
    pub row_count: usize,
    pub activated_rows: usize,
    /// Distinct states seen inside the cycle, in first-seen order.
    pub states: Vec<AutomationState>,
    /// Distinct transition kinds inside the cycle, maintain included.
    pub transitions: Vec<&'static str>,
}

impl CycleComparison {
    /// `history` is aligned with the compiled records: step `i` belongs to
    /// row `i`. Open cycles run to the end of the stream.
    pub fn from_history(cycles: &[DebtCycle], history: &[AutomationStep]) -> Vec<Self> {
        let mut out = Vec::with_capacity(cycles.len());
        for cycle in cycles {
            if cycle.start_index >= history.len() {
                continue;
            }
            let end = cycle.last_index(history.len()).min(history.len() - 1);
            let steps = &history[cycle.start_index..=end];

            let mut states = Vec::new();
            let mut transitions: Vec<&'static str> = Vec::new();
            for step in steps {
                if !states.contains(&step.state) {
                    states.push(step.state);
                }
                let kind = step.transition.kind();
                if !transitions.contains(&kind) {
                    transitions.push(kind);
                }
            }

            out.push(Self {
                cycle_id: cycle.cycle_id,
                start_index: cycle.start_index,
                end_index: end,
                closed: cycle.is_closed(),
                max_debt: cycle.max_debt,
                row_count: steps.len(),
                activated_rows: steps
                    .iter()
                    .filter(|s| s.state == AutomationState::Activated)
                    .count(),
                states,
                transitions,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;
    use crate::engine::Transition;

    fn step(sequence_index: usize, state: AutomationState, transition: Transition) -> AutomationStep {
        AutomationStep {
            sequence_index,
            state,
            transition,
            entry_debt_reference: None,
        }
    }

    #[test]
    fn test_transition_kinds_deduplicated_in_order() {
        let cycle = DebtCycle {
            cycle_id: 1,
            start_index: 0,
            end_index: Some(2),
            bottom_index: 0,
            max_debt: Decimal::from(-10),
            start_time: TimeMs::new(0),
            end_time: Some(TimeMs::new(2)),
        };
        let history = vec![
            step(0, AutomationState::Deactivated, Transition::Maintain),
            step(
                1,
                AutomationState::Activated,
                Transition::Activate {
                    threshold: Decimal::from(-5),
                    observed: Decimal::from(-10),
                },
            ),
            step(2, AutomationState::Activated, Transition::Maintain),
        ];

        let comparisons = CycleComparison::from_history(&[cycle], &history);
        assert_eq!(comparisons[0].transitions, vec!["maintain", "activate"]);
        assert_eq!(comparisons[0].activated_rows, 2);
        let json = serde_json::to_value(&comparisons[0]).unwrap();
        assert_eq!(json["transitions"], serde_json::json!(["maintain", "activate"]));
    }
}
