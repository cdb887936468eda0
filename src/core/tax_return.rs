use super::assets::AssetHolding;
use super::capital_gains::CapitalGainEntry;
use super::compare::{compare_regimes, RegimeComparison};
use super::error::TaxError;
use super::itr::{select_itr, ItrProfile, ItrSelection};
use super::regime::{compute_regime, DeductionSet, IncomeProfile, Regime, RegimeResult, TaxCredits};
use super::rules::{AssessmentYear, RuleSet};
use itrc_derive::FieldSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    #[default]
    Draft,
    /// Both regimes computed
    Ready,
    /// Filing document generated
    Submitted,
}

/// Assessee details; each field is replaced, never accumulated
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, FieldSchema,
)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    /// Full name as on PAN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Permanent Account Number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan: Option<String>,
    /// Date of birth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    /// Aadhaar number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar: Option<String>,
    /// Postal address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// resident, non-resident or nri
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residential_status: Option<String>,
}

/// Bank account for the refund
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RefundDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifsc_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

/// The cumulative return for one assessee and assessment year.
///
/// Values are never changed in place: merges, computations and recorded sales each
/// produce a new return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxReturn {
    #[schemars(with = "String")]
    pub assessment_year: AssessmentYear,
    pub status: ReturnStatus,
    pub personal_info: PersonalInfo,
    pub income_details: IncomeProfile,
    pub deductions: DeductionSet,
    pub tax_credits: TaxCredits,
    pub chosen_regime: Regime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_calculation_new_regime: Option<RegimeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_calculation_old_regime: Option<RegimeResult>,
    pub capital_gains: Vec<CapitalGainEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub asset_holdings: Vec<AssetHolding>,
    pub refund_details: RefundDetails,
}

/// Both regimes for one return and the advice between them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxComputation {
    pub new_regime: RegimeResult,
    pub old_regime: RegimeResult,
    pub comparison: RegimeComparison,
}

impl TaxReturn {
    pub fn new(assessment_year: AssessmentYear) -> Self {
        TaxReturn {
            assessment_year,
            ..Default::default()
        }
    }

    /// Compute both regimes with `rules`
    pub fn compute(&self, rules: &RuleSet) -> Result<TaxComputation, TaxError> {
        if rules.assessment_year != self.assessment_year {
            log::warn!(
                "Return is for AY {} but rules are for AY {}",
                self.assessment_year,
                rules.assessment_year
            );
        }
        let new_regime = compute_regime(
            &self.income_details,
            None,
            &self.tax_credits,
            Regime::New,
            rules,
        )?;
        let old_regime = compute_regime(
            &self.income_details,
            Some(&self.deductions),
            &self.tax_credits,
            Regime::Old,
            rules,
        )?;
        let comparison = compare_regimes(&new_regime, &old_regime);
        Ok(TaxComputation {
            new_regime,
            old_regime,
            comparison,
        })
    }

    /// Attach both regime results, replacing any earlier ones. A draft becomes ready.
    pub fn with_computation(&self, computation: &TaxComputation) -> TaxReturn {
        let mut updated = self.clone();
        updated.tax_calculation_new_regime = Some(computation.new_regime.clone());
        updated.tax_calculation_old_regime = Some(computation.old_regime.clone());
        if updated.status == ReturnStatus::Draft {
            updated.status = ReturnStatus::Ready;
        }
        updated
    }

    /// Record a classified sale. Positive taxable gains join the capital gains
    /// income head; losses are kept on the entry only.
    pub fn with_capital_gain(&self, entry: CapitalGainEntry) -> Result<TaxReturn, TaxError> {
        let mut updated = self.clone();
        if entry.taxable_capital_gain > Decimal::ZERO {
            updated.income_details.capital_gains = updated
                .income_details
                .capital_gains
                .checked_add(entry.taxable_capital_gain)
                .ok_or_else(|| TaxError::AmountOverflow("incomeDetails.capitalGains".to_string()))?;
            updated.discard_computation();
        }
        updated.capital_gains.push(entry);
        Ok(updated)
    }

    /// Record an asset held at the end of the year
    pub fn with_asset_holding(&self, holding: AssetHolding) -> Result<TaxReturn, TaxError> {
        holding.validate()?;
        let mut updated = self.clone();
        updated.asset_holdings.push(holding);
        Ok(updated)
    }

    /// Drop both regime results after the amounts they were computed from change.
    /// A ready return goes back to draft.
    pub(crate) fn discard_computation(&mut self) {
        let had_computation =
            self.tax_calculation_new_regime.is_some() || self.tax_calculation_old_regime.is_some();
        self.tax_calculation_new_regime = None;
        self.tax_calculation_old_regime = None;
        self.status = ReturnStatus::Draft;
        if had_computation {
            log::info!("Amounts changed; discarded the attached tax computation");
        }
    }

    /// Whether the attached results were computed from the amounts now on the return
    pub fn computation_is_current(&self) -> Result<bool, TaxError> {
        let total_income = self.income_details.total()?;
        let credits = self.tax_credits.total()?;
        let deductions = self.deductions.total()?;
        let matches = |result: &RegimeResult, deductions: Option<Decimal>| {
            result.total_income == total_income
                && result.tds_credited == credits
                && result.deductions_total == deductions
        };
        Ok(match (&self.tax_calculation_new_regime, &self.tax_calculation_old_regime) {
            (Some(new_regime), Some(old_regime)) => {
                matches(new_regime, None) && matches(old_regime, Some(deductions))
            }
            _ => false,
        })
    }

    pub fn with_regime(&self, regime: Regime) -> TaxReturn {
        let mut updated = self.clone();
        updated.chosen_regime = regime;
        updated
    }

    pub fn computation(&self, regime: Regime) -> Option<&RegimeResult> {
        match regime {
            Regime::New => self.tax_calculation_new_regime.as_ref(),
            Regime::Old => self.tax_calculation_old_regime.as_ref(),
        }
    }

    /// Profile the form selector works from
    pub fn itr_profile(&self) -> ItrProfile {
        ItrProfile::from_income(&self.income_details)
    }

    pub fn select_itr(&self) -> ItrSelection {
        select_itr(&self.itr_profile())
    }
}

/// Read a return from JSON; missing sections start empty
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<TaxReturn> {
    let tax_return: TaxReturn = serde_json::from_reader(reader)?;
    Ok(tax_return)
}
