use super::assets::{foreign_assets, AssetHolding};
use super::capital_gains::{AssetType, CapitalGainEntry};
use super::error::TaxError;
use super::fields::checked_sum;
use super::itr::{ItrSelection, ItrType, Schedule};
use super::regime::{DeductionSet, IncomeProfile, Regime, RegimeResult, TaxCredits};
use super::tax_return::{RefundDetails, ReturnStatus, TaxReturn};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schedule CA: sales split by holding period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCa {
    pub short_term_capital_gains: Vec<CapitalGainEntry>,
    pub long_term_capital_gains: Vec<CapitalGainEntry>,
    #[serde(rename = "totalSTCG")]
    #[schemars(with = "f64")]
    pub total_stcg: Decimal,
    #[serde(rename = "totalLTCG")]
    #[schemars(with = "f64")]
    pub total_ltcg: Decimal,
}

impl ScheduleCa {
    pub fn build(entries: &[CapitalGainEntry]) -> Result<Self, TaxError> {
        let (long, short): (Vec<_>, Vec<_>) = entries.iter().cloned().partition(|e| e.is_long_term);
        Ok(ScheduleCa {
            total_stcg: checked_sum("totalSTCG", short.iter().map(|e| e.capital_gain))?,
            total_ltcg: checked_sum("totalLTCG", long.iter().map(|e| e.capital_gain))?,
            short_term_capital_gains: short,
            long_term_capital_gains: long,
        })
    }
}

/// Schedule FSI: gains on foreign shares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFsi {
    pub foreign_income: Vec<CapitalGainEntry>,
    #[schemars(with = "f64")]
    pub total_foreign_income: Decimal,
}

impl ScheduleFsi {
    pub fn build(entries: &[CapitalGainEntry]) -> Result<Self, TaxError> {
        let foreign_income: Vec<_> = entries
            .iter()
            .filter(|e| e.asset_type == AssetType::ForeignShare)
            .cloned()
            .collect();
        Ok(ScheduleFsi {
            total_foreign_income: checked_sum(
                "totalForeignIncome",
                foreign_income.iter().map(|e| e.capital_gain),
            )?,
            foreign_income,
        })
    }
}

/// Schedule FA: assets held outside India, at current value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFa {
    pub foreign_assets: Vec<AssetHolding>,
    #[schemars(with = "f64")]
    pub total_value: Decimal,
}

impl ScheduleFa {
    pub fn build(holdings: &[AssetHolding]) -> Result<Self, TaxError> {
        let (foreign_assets, total_value) = foreign_assets(holdings)?;
        Ok(ScheduleFa {
            foreign_assets,
            total_value,
        })
    }
}

/// Schedule BP: business income less deductions; a loss shows as negative profit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBp {
    #[schemars(with = "f64")]
    pub business_income: Decimal,
    pub deductions: DeductionSet,
    #[schemars(with = "f64")]
    pub profit: Decimal,
}

impl ScheduleBp {
    pub fn build(business_income: Decimal, deductions: &DeductionSet) -> Result<Self, TaxError> {
        Ok(ScheduleBp {
            business_income,
            deductions: deductions.clone(),
            profit: business_income - deductions.total()?,
        })
    }
}

/// Schedules with a body the engine can fill in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub struct FilingSchedules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<ScheduleCa>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fa: Option<ScheduleFa>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsi: Option<ScheduleFsi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<ScheduleBp>,
}

impl FilingSchedules {
    pub fn build(selection: &ItrSelection, tax_return: &TaxReturn) -> Result<Self, TaxError> {
        let wants = |schedule: Schedule| selection.schedules.contains(&schedule);
        Ok(FilingSchedules {
            ca: wants(Schedule::Ca)
                .then(|| ScheduleCa::build(&tax_return.capital_gains))
                .transpose()?,
            fa: wants(Schedule::Fa)
                .then(|| ScheduleFa::build(&tax_return.asset_holdings))
                .transpose()?,
            fsi: wants(Schedule::Fsi)
                .then(|| ScheduleFsi::build(&tax_return.capital_gains))
                .transpose()?,
            bp: wants(Schedule::Bp)
                .then(|| {
                    ScheduleBp::build(
                        tax_return.income_details.business_profession,
                        &tax_return.deductions,
                    )
                })
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct AssesseeInfo {
    pub pan: Option<String>,
    pub assessee_name: Option<String>,
    pub dob: Option<String>,
    pub address: Option<String>,
    pub residential_status: Option<String>,
    pub aadhaar: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilingCalculation {
    pub chosen_regime: Regime,
    /// Result for the chosen regime
    pub chosen: RegimeResult,
    pub new_regime: RegimeResult,
    pub old_regime: RegimeResult,
}

/// The JSON uploaded to the e-filing portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilingDocument {
    pub form_type: ItrType,
    pub selection_reason: String,
    pub schedules_included: Vec<Schedule>,
    pub assessee_info: AssesseeInfo,
    pub income_details: IncomeProfile,
    pub deductions: DeductionSet,
    pub tax_credits: TaxCredits,
    pub tax_calculation: FilingCalculation,
    pub schedules: FilingSchedules,
    pub refund: RefundDetails,
    pub assessment_year: String,
    pub filing_date: DateTime<FixedOffset>,
}

/// A generated document together with the return it was generated from
#[derive(Debug, Clone)]
pub struct Filing {
    pub file_name: String,
    pub document: FilingDocument,
    /// The return, now submitted
    pub tax_return: TaxReturn,
}

/// Assemble the filing document for `tax_return`.
///
/// Needs both regime computations, computed from the amounts now on the return,
/// and a PAN. The returned return is marked submitted; `tax_return` itself is
/// left as it was.
pub fn generate_filing(
    tax_return: &TaxReturn,
    filed_at: DateTime<FixedOffset>,
) -> Result<Filing, TaxError> {
    let missing = |regime: Regime| {
        TaxError::MissingComputation(format!(
            "no {} regime computation attached; compute the return first",
            regime
        ))
    };
    let new_regime = tax_return
        .computation(Regime::New)
        .ok_or_else(|| missing(Regime::New))?
        .clone();
    let old_regime = tax_return
        .computation(Regime::Old)
        .ok_or_else(|| missing(Regime::Old))?
        .clone();
    if !tax_return.computation_is_current()? {
        return Err(TaxError::MissingComputation(
            "attached computation is out of date; compute the return again".to_string(),
        ));
    }
    let pan = tax_return
        .personal_info
        .pan
        .clone()
        .ok_or_else(|| TaxError::InvalidFieldValue {
            field: "personalInfo.pan".to_string(),
            reason: "missing".to_string(),
        })?;

    let selection = tax_return.select_itr();
    let chosen = match tax_return.chosen_regime {
        Regime::New => new_regime.clone(),
        Regime::Old => old_regime.clone(),
    };
    let info = &tax_return.personal_info;

    let document = FilingDocument {
        form_type: selection.itr_type,
        selection_reason: selection.reason.clone(),
        schedules_included: selection.schedules.iter().copied().collect(),
        assessee_info: AssesseeInfo {
            pan: Some(pan.clone()),
            assessee_name: info.name.clone(),
            dob: info.dob.clone(),
            address: info.address.clone(),
            residential_status: info.residential_status.clone(),
            aadhaar: info.aadhaar.clone(),
            email: info.email.clone(),
            phone: info.phone.clone(),
        },
        income_details: tax_return.income_details.clone(),
        deductions: tax_return.deductions.clone(),
        tax_credits: tax_return.tax_credits.clone(),
        tax_calculation: FilingCalculation {
            chosen_regime: tax_return.chosen_regime,
            chosen,
            new_regime,
            old_regime,
        },
        schedules: FilingSchedules::build(&selection, tax_return)?,
        refund: tax_return.refund_details.clone(),
        assessment_year: tax_return.assessment_year.display(),
        filing_date: filed_at,
    };

    let file_name = format!(
        "{}_{}_AY{}.json",
        selection.itr_type, pan, tax_return.assessment_year
    );
    let mut submitted = tax_return.clone();
    submitted.status = ReturnStatus::Submitted;
    log::info!("Generated {} ({})", file_name, selection.reason);

    Ok(Filing {
        file_name,
        document,
        tax_return: submitted,
    })
}
