use super::error::TaxError;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Surcharge of `rate` × tax once gross income strictly exceeds `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SurchargeBracket {
    #[schemars(with = "f64")]
    pub threshold: Decimal,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

impl SurchargeBracket {
    pub fn new(threshold: Decimal, rate: Decimal) -> Self {
        SurchargeBracket { threshold, rate }
    }
}

/// Surcharge brackets in ascending threshold order.
///
/// Flat lookup: the whole tax is charged at the rate of the highest bracket whose
/// threshold is exceeded. There is no marginal relief, so income just over a
/// threshold can leave less after tax than income just under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "Vec<SurchargeBracket>", into = "Vec<SurchargeBracket>")]
pub struct SurchargeSchedule(Vec<SurchargeBracket>);

impl SurchargeSchedule {
    pub fn new(brackets: Vec<SurchargeBracket>) -> Result<Self, TaxError> {
        let mut previous: Option<&SurchargeBracket> = None;
        for bracket in &brackets {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(TaxError::InvalidSurcharge(format!(
                    "rate {} outside 0..=1",
                    bracket.rate
                )));
            }
            if bracket.threshold < Decimal::ZERO {
                return Err(TaxError::InvalidSurcharge(format!(
                    "negative threshold {}",
                    bracket.threshold
                )));
            }
            if let Some(prev) = previous {
                if bracket.threshold <= prev.threshold {
                    return Err(TaxError::InvalidSurcharge(format!(
                        "threshold {} does not exceed {}",
                        bracket.threshold, prev.threshold
                    )));
                }
            }
            previous = Some(bracket);
        }
        Ok(SurchargeSchedule(brackets))
    }

    pub fn brackets(&self) -> &[SurchargeBracket] {
        &self.0
    }

    pub fn rate_for(&self, gross_income: Decimal) -> Decimal {
        self.0
            .iter()
            .rev()
            .find(|b| gross_income > b.threshold)
            .map_or(Decimal::ZERO, |b| b.rate)
    }
}

impl TryFrom<Vec<SurchargeBracket>> for SurchargeSchedule {
    type Error = TaxError;

    fn try_from(brackets: Vec<SurchargeBracket>) -> Result<Self, Self::Error> {
        SurchargeSchedule::new(brackets)
    }
}

impl From<SurchargeSchedule> for Vec<SurchargeBracket> {
    fn from(schedule: SurchargeSchedule) -> Self {
        schedule.0
    }
}

/// Surcharge payable on `tax` for a filer with `gross_income`
pub fn compute_surcharge(
    gross_income: Decimal,
    tax: Decimal,
    schedule: &SurchargeSchedule,
) -> Decimal {
    tax * schedule.rate_for(gross_income)
}
