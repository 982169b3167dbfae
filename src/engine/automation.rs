//! Three-state automation simulator.
//!
//! Rules run in a fixed priority order each row, first match wins:
//! deactivate, pause, resume, activate. Otherwise the state is maintained.

use crate::domain::{Decimal, Diagnostic, EnrichedRecord, RuleKind};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

use super::baseline::BaselineThresholds;
use super::policy::{AutomationPolicy, PauseBase};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AutomationState {
    #[default]
    Deactivated,
    Activated,
    Paused,
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationState::Deactivated => write!(f, "deactivated"),
            AutomationState::Activated => write!(f, "activated"),
            AutomationState::Paused => write!(f, "paused"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum PauseTrigger {
    FullRecovery,
    SymmetricTarget { target: Decimal, realized: Decimal },
    EntryAmortization { required: Decimal, repaid: Decimal },
    Threshold { threshold: Decimal, observed: Decimal },
}

/// Outcome of one row's rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Transition {
    Deactivate { threshold: Decimal, observed: Decimal },
    Pause { trigger: PauseTrigger },
    Resume { threshold: Decimal, observed: Decimal },
    Activate { threshold: Decimal, observed: Decimal },
    Maintain,
    EvaluationFailed { rule: RuleKind },
}

impl Transition {
    pub fn kind(&self) -> &'static str {
        match self {
            Transition::Deactivate { .. } => "deactivate",
            Transition::Pause { .. } => "pause",
            Transition::Resume { .. } => "resume",
            Transition::Activate { .. } => "activate",
            Transition::Maintain => "maintain",
            Transition::EvaluationFailed { .. } => "evaluationFailed",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Deactivate {
                threshold,
                observed,
            } => write!(
                f,
                "deactivated: debt {} breached safety threshold {}",
                observed, threshold
            ),
            Transition::Pause { trigger } => match trigger {
                PauseTrigger::FullRecovery => write!(f, "paused: debt fully recovered"),
                PauseTrigger::SymmetricTarget { target, realized } => write!(
                    f,
                    "paused: profit {} since entry reached target {}",
                    realized, target
                ),
                PauseTrigger::EntryAmortization { required, repaid } => write!(
                    f,
                    "paused: repaid {} since entry covers {}",
                    repaid, required
                ),
                PauseTrigger::Threshold {
                    threshold,
                    observed,
                } => write!(
                    f,
                    "paused: profit cycle total {} crossed {}",
                    observed, threshold
                ),
            },
            Transition::Resume {
                threshold,
                observed,
            } => write!(
                f,
                "resumed: debt {} crossed activation threshold {}",
                observed, threshold
            ),
            Transition::Activate {
                threshold,
                observed,
            } => write!(
                f,
                "activated: debt {} crossed activation threshold {}",
                observed, threshold
            ),
            Transition::Maintain => write!(f, "maintain"),
            Transition::EvaluationFailed { rule } => {
                write!(f, "maintain: {} rule could not be evaluated", rule)
            }
        }
    }
}

/// State after one row, with the transition that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationStep {
    pub sequence_index: usize,
    pub state: AutomationState,
    pub transition: Transition,
    pub entry_debt_reference: Option<Decimal>,
}

impl AutomationStep {
    pub fn reason(&self) -> String {
        self.transition.to_string()
    }
}

impl Serialize for AutomationStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AutomationStep", 5)?;
        s.serialize_field("sequenceIndex", &self.sequence_index)?;
        s.serialize_field("state", &self.state)?;
        s.serialize_field("transition", &self.transition)?;
        s.serialize_field("reason", &self.reason())?;
        s.serialize_field("entryDebtReference", &self.entry_debt_reference)?;
        s.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineRun {
    pub current_state: AutomationState,
    pub entry_debt_reference: Option<Decimal>,
    pub history: Vec<AutomationStep>,
}

/// Thresholds resolved once against the frozen baseline. `None` marks a
/// rule whose threshold overflowed.
#[derive(Debug, Clone, Copy)]
struct ResolvedThresholds {
    activation: Option<Decimal>,
    deactivation: Option<Decimal>,
    pause: Option<Decimal>,
}

/// Flow accumulated on rows after the entry row.
#[derive(Debug, Clone, Copy, Default)]
struct SinceEntry {
    profit: Option<Decimal>,
    repaid: Option<Decimal>,
}

impl SinceEntry {
    fn zero() -> Self {
        Self {
            profit: Some(Decimal::zero()),
            repaid: Some(Decimal::zero()),
        }
    }

    fn absorb(&mut self, record: &EnrichedRecord) {
        self.profit = self
            .profit
            .and_then(|p| p.checked_add(record.profit_realized));
        self.repaid = self.repaid.and_then(|r| r.checked_add(record.amount_repaid));
    }
}

pub struct AutomationSimulator {
    policy: AutomationPolicy,
    thresholds: ResolvedThresholds,
    run: StateMachineRun,
    since_entry: SinceEntry,
    diagnostics: Vec<Diagnostic>,
}

impl AutomationSimulator {
    pub fn new(policy: AutomationPolicy, baseline: &BaselineThresholds) -> Self {
        let pause = match (
            policy.pause.base.baseline_field(),
            policy.pause.percent,
            policy.pause.comparator,
        ) {
            (Some(field), Some(percent), Some(comparator)) => {
                super::policy::offset_threshold(field.value(baseline), percent, comparator)
            }
            _ => None,
        };
        Self {
            policy,
            thresholds: ResolvedThresholds {
                activation: policy.activation.threshold(baseline),
                deactivation: policy.deactivation.threshold(baseline),
                pause,
            },
            run: StateMachineRun::default(),
            since_entry: SinceEntry::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> AutomationState {
        self.run.current_state
    }

    /// Evaluate one row and record exactly one step.
    pub fn process_record(&mut self, record: &EnrichedRecord) {
        if self.run.entry_debt_reference.is_some() {
            self.since_entry.absorb(record);
        }

        let transition = self.evaluate(record);
        let debt = record.running_debt;

        match transition {
            Transition::Deactivate { .. } => {
                self.run.current_state = AutomationState::Deactivated;
                self.run.entry_debt_reference = None;
                self.since_entry = SinceEntry::default();
            }
            Transition::Pause { .. } => {
                self.run.current_state = AutomationState::Paused;
            }
            Transition::Resume { .. } | Transition::Activate { .. } => {
                self.run.current_state = AutomationState::Activated;
                self.run.entry_debt_reference = Some(debt);
                self.since_entry = SinceEntry::zero();
            }
            Transition::EvaluationFailed { rule } => {
                tracing::warn!(
                    sequence_index = record.operation.sequence_index,
                    %rule,
                    "policy rule could not be evaluated, maintaining state"
                );
                self.diagnostics.push(Diagnostic::PolicyEvaluationFailure {
                    sequence_index: record.operation.sequence_index,
                    at: record.timestamp(),
                    rule,
                });
            }
            Transition::Maintain => {}
        }

        if !matches!(transition, Transition::Maintain) {
            tracing::debug!(
                sequence_index = record.operation.sequence_index,
                state = %self.run.current_state,
                transition = transition.kind(),
                "automation transition"
            );
        }

        self.run.history.push(AutomationStep {
            sequence_index: record.operation.sequence_index,
            state: self.run.current_state,
            transition,
            entry_debt_reference: self.run.entry_debt_reference,
        });
    }

    fn evaluate(&self, record: &EnrichedRecord) -> Transition {
        let state = self.run.current_state;
        let debt = record.running_debt;

        if matches!(state, AutomationState::Activated | AutomationState::Paused) {
            let Some(threshold) = self.thresholds.deactivation else {
                return Transition::EvaluationFailed {
                    rule: RuleKind::Deactivation,
                };
            };
            if self.policy.deactivation.comparator.breaches(debt, threshold) {
                return Transition::Deactivate {
                    threshold,
                    observed: debt,
                };
            }
        }

        if state == AutomationState::Activated {
            match self.pause_trigger(record) {
                Ok(Some(trigger)) => return Transition::Pause { trigger },
                Ok(None) => {}
                Err(rule) => return Transition::EvaluationFailed { rule },
            }
        }

        if matches!(state, AutomationState::Paused | AutomationState::Deactivated) {
            let Some(threshold) = self.thresholds.activation else {
                return Transition::EvaluationFailed {
                    rule: RuleKind::Activation,
                };
            };
            if self.policy.activation.comparator.breaches(debt, threshold) {
                return if state == AutomationState::Paused {
                    Transition::Resume {
                        threshold,
                        observed: debt,
                    }
                } else {
                    Transition::Activate {
                        threshold,
                        observed: debt,
                    }
                };
            }
        }

        Transition::Maintain
    }

    fn pause_trigger(&self, record: &EnrichedRecord) -> Result<Option<PauseTrigger>, RuleKind> {
        let tie = self.policy.target_tie_break;
        let entry = self.run.entry_debt_reference;

        match self.policy.pause.base {
            PauseBase::FullRecovery => Ok(record
                .running_debt
                .is_zero()
                .then_some(PauseTrigger::FullRecovery)),
            PauseBase::SymmetricTarget => {
                let Some(entry) = entry else {
                    return Ok(None);
                };
                let target = entry
                    .abs()
                    .checked_mul(Decimal::from(2))
                    .ok_or(RuleKind::Pause)?;
                let realized = self.since_entry.profit.ok_or(RuleKind::Pause)?;
                Ok(tie
                    .reached(realized, target)
                    .then_some(PauseTrigger::SymmetricTarget { target, realized }))
            }
            PauseBase::EntryAmortization => {
                let Some(entry) = entry else {
                    return Ok(None);
                };
                let worst = record.stats.cycle_max_debt.min(entry);
                let required = (worst - entry).abs();
                let repaid = self.since_entry.repaid.ok_or(RuleKind::Pause)?;
                Ok((repaid.is_positive() && tie.reached(repaid, required))
                    .then_some(PauseTrigger::EntryAmortization { required, repaid }))
            }
            _ => {
                let threshold = self.thresholds.pause.ok_or(RuleKind::Pause)?;
                let comparator = self.policy.pause.comparator.ok_or(RuleKind::Pause)?;
                let observed = record.stats.profit_cycle_running;
                Ok(comparator
                    .breaches(observed, threshold)
                    .then_some(PauseTrigger::Threshold {
                        threshold,
                        observed,
                    }))
            }
        }
    }

    /// Get the accumulated outputs.
    pub fn into_outputs(self) -> (StateMachineRun, Vec<Diagnostic>) {
        (self.run, self.diagnostics)
    }
}

/// Run the simulator over a full record stream.
pub fn simulate(
    records: &[EnrichedRecord],
    policy: AutomationPolicy,
    baseline: &BaselineThresholds,
) -> (StateMachineRun, Vec<Diagnostic>) {
    let mut sim = AutomationSimulator::new(policy, baseline);
    for record in records {
        sim.process_record(record);
    }
    sim.into_outputs()
}
