//! Automation policy: which baseline each rule uses and how far past it.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::baseline::BaselineThresholds;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid policy: {0}")]
    Parse(String),
    #[error("pause base {0} requires `{1}`")]
    MissingPauseField(String, &'static str),
    #[error("{0} percent must not be negative")]
    NegativePercent(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Greater,
    Less,
}

impl Comparator {
    /// Strict comparison of `observed` against `threshold`.
    pub fn breaches(&self, observed: Decimal, threshold: Decimal) -> bool {
        match self {
            Comparator::Greater => observed > threshold,
            Comparator::Less => observed < threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineField {
    MeanDebt,
    P25Debt,
    WorstDebt,
    MeanProfit,
    P75Profit,
}

impl BaselineField {
    pub fn value(&self, baseline: &BaselineThresholds) -> Decimal {
        match self {
            BaselineField::MeanDebt => baseline.mean_closed_debt_max,
            BaselineField::P25Debt => baseline.p25_closed_debt_max,
            BaselineField::WorstDebt => baseline.worst_historical_debt_max,
            BaselineField::MeanProfit => baseline.mean_closed_profit_max,
            BaselineField::P75Profit => baseline.p75_closed_profit_max,
        }
    }
}

/// `base ± |base| * percent / 100`, moving in the comparator's direction.
/// `None` on overflow.
pub fn offset_threshold(base: Decimal, percent: Decimal, comparator: Comparator) -> Option<Decimal> {
    let delta = base
        .abs()
        .checked_mul(percent)?
        .checked_div(Decimal::hundred())?;
    match comparator {
        Comparator::Greater => base.checked_add(delta),
        Comparator::Less => base.checked_add(-delta),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdRule {
    pub percent: Decimal,
    pub comparator: Comparator,
    pub base: BaselineField,
}

impl ThresholdRule {
    pub fn threshold(&self, baseline: &BaselineThresholds) -> Option<Decimal> {
        offset_threshold(self.base.value(baseline), self.percent, self.comparator)
    }
}

/// Pause base: a baseline field compared generically, or a special rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseBase {
    MeanDebt,
    P25Debt,
    WorstDebt,
    MeanProfit,
    P75Profit,
    /// Debt back to exactly zero.
    FullRecovery,
    /// Profit since entry reaches twice the entry debt.
    SymmetricTarget,
    /// Repayments since entry cover the drop from entry to the cycle bottom.
    EntryAmortization,
}

impl PauseBase {
    pub fn baseline_field(&self) -> Option<BaselineField> {
        match self {
            PauseBase::MeanDebt => Some(BaselineField::MeanDebt),
            PauseBase::P25Debt => Some(BaselineField::P25Debt),
            PauseBase::WorstDebt => Some(BaselineField::WorstDebt),
            PauseBase::MeanProfit => Some(BaselineField::MeanProfit),
            PauseBase::P75Profit => Some(BaselineField::P75Profit),
            PauseBase::FullRecovery | PauseBase::SymmetricTarget | PauseBase::EntryAmortization => {
                None
            }
        }
    }

    fn name(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PauseRule {
    #[serde(default)]
    pub percent: Option<Decimal>,
    #[serde(default)]
    pub comparator: Option<Comparator>,
    pub base: PauseBase,
}

/// How the special pause targets treat an exact hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// `>=`: reaching the target exactly pauses.
    #[default]
    Inclusive,
    /// `>`: the target must be exceeded.
    Strict,
}

impl TieBreak {
    pub fn reached(&self, value: Decimal, target: Decimal) -> bool {
        match self {
            TieBreak::Inclusive => value >= target,
            TieBreak::Strict => value > target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationPolicy {
    pub activation: ThresholdRule,
    pub pause: PauseRule,
    pub deactivation: ThresholdRule,
    #[serde(default)]
    pub target_tie_break: TieBreak,
}

impl AutomationPolicy {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: Self =
            serde_json::from_str(json).map_err(|e| PolicyError::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, PolicyError> {
        let policy: Self =
            serde_json::from_value(value).map_err(|e| PolicyError::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Checks that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.activation.percent.is_negative() {
            return Err(PolicyError::NegativePercent("activation"));
        }
        if self.deactivation.percent.is_negative() {
            return Err(PolicyError::NegativePercent("deactivation"));
        }
        if self.pause.base.baseline_field().is_some() {
            match (self.pause.percent, self.pause.comparator) {
                (None, _) => {
                    return Err(PolicyError::MissingPauseField(self.pause.base.name(), "percent"))
                }
                (_, None) => {
                    return Err(PolicyError::MissingPauseField(
                        self.pause.base.name(),
                        "comparator",
                    ))
                }
                (Some(p), Some(_)) if p.is_negative() => {
                    return Err(PolicyError::NegativePercent("pause"))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_threshold_moves_away_in_comparator_direction() {
        assert_eq!(offset_threshold(d("-200"), d("20"), Comparator::Less), Some(d("-240")));
        assert_eq!(offset_threshold(d("-200"), d("20"), Comparator::Greater), Some(d("-160")));
        assert_eq!(offset_threshold(d("100"), d("20"), Comparator::Greater), Some(d("120")));
        assert_eq!(offset_threshold(d("100"), d("20"), Comparator::Less), Some(d("80")));
    }

    #[test]
    fn test_comparisons_are_strict() {
        assert!(!Comparator::Less.breaches(d("-240"), d("-240")));
        assert!(Comparator::Less.breaches(d("-250"), d("-240")));
        assert!(!Comparator::Greater.breaches(d("5"), d("5")));
    }

    #[test]
    fn test_parse_policy() {
        let policy = AutomationPolicy::from_json(
            r#"{
                "activation": {"percent": 20, "comparator": "less", "base": "mean_debt"},
                "pause": {"base": "symmetric_target"},
                "deactivation": {"percent": 10, "comparator": "less", "base": "worst_debt"}
            }"#,
        )
        .unwrap();
        assert_eq!(policy.activation.base, BaselineField::MeanDebt);
        assert_eq!(policy.pause.base, PauseBase::SymmetricTarget);
        assert_eq!(policy.target_tie_break, TieBreak::Inclusive);
    }

    #[test]
    fn test_unknown_comparator_rejected() {
        let err = AutomationPolicy::from_json(
            r#"{
                "activation": {"percent": 20, "comparator": "sideways", "base": "mean_debt"},
                "pause": {"base": "full_recovery"},
                "deactivation": {"percent": 10, "comparator": "less", "base": "worst_debt"}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::Parse(_)));
    }

    #[test]
    fn test_generic_pause_requires_percent_and_comparator() {
        let err = AutomationPolicy::from_json(
            r#"{
                "activation": {"percent": 20, "comparator": "less", "base": "mean_debt"},
                "pause": {"base": "p75_profit", "percent": 5},
                "deactivation": {"percent": 10, "comparator": "less", "base": "worst_debt"}
            }"#,
        )
        .unwrap_err();
        match err {
            PolicyError::MissingPauseField(base, field) => {
                assert_eq!(base, "p75_profit");
                assert_eq!(field, "comparator");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_negative_percent_rejected() {
        let err = AutomationPolicy::from_json(
            r#"{
                "activation": {"percent": -1, "comparator": "less", "base": "mean_debt"},
                "pause": {"base": "full_recovery"},
                "deactivation": {"percent": 10, "comparator": "less", "base": "worst_debt"}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::NegativePercent("activation")));
    }

    #[test]
    fn test_tie_break() {
        assert!(TieBreak::Inclusive.reached(d("200"), d("200")));
        assert!(!TieBreak::Strict.reached(d("200"), d("200")));
    }
}
