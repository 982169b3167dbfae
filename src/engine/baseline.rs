use crate::domain::{Decimal, EnrichedRecord};
use serde::{Deserialize, Serialize};

use super::statistics::ClosedCycleSummary;

/// Reference points for the automation simulator, derived once from a full
/// run and never recomputed per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineThresholds {
    pub mean_closed_debt_max: Decimal,
    pub p25_closed_debt_max: Decimal,
    pub mean_closed_profit_max: Decimal,
    pub p75_closed_profit_max: Decimal,
    /// Most negative running debt anywhere in the stream.
    pub worst_historical_debt_max: Decimal,
}

impl BaselineThresholds {
    pub fn derive(records: &[EnrichedRecord], closed: &ClosedCycleSummary) -> Self {
        let worst = records
            .iter()
            .map(|r| r.running_debt)
            .fold(Decimal::zero(), Decimal::min);

        Self {
            mean_closed_debt_max: closed.debt.mean,
            p25_closed_debt_max: closed.debt.p25,
            mean_closed_profit_max: closed.profit.mean,
            p75_closed_profit_max: closed.profit.p75,
            worst_historical_debt_max: worst,
        }
    }
}
