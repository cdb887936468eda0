use super::tax_return::TaxReturn;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

static PAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Problems found before filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum Issue {
    MissingPan,
    /// PAN is not five letters, four digits and a letter.
    InvalidPan { pan: String },
    NegativeTotalIncome {
        #[schemars(with = "f64")]
        total_income: Decimal,
    },
    /// Old-regime deductions claimed exceed total income.
    DeductionsExceedIncome {
        #[schemars(with = "f64")]
        deductions: Decimal,
        #[schemars(with = "f64")]
        total_income: Decimal,
    },
    /// A section's amounts add up to more than a decimal can hold.
    AmountOverflow { section: String },
    /// Neither regime has been computed yet.
    MissingComputation,
    /// Amounts changed after the attached computation was made.
    StaleComputation,
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::MissingPan
            | Issue::InvalidPan { .. }
            | Issue::NegativeTotalIncome { .. }
            | Issue::AmountOverflow { .. } => Severity::Error,
            Issue::DeductionsExceedIncome { .. }
            | Issue::MissingComputation
            | Issue::StaleComputation => Severity::Warning,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Issue::MissingPan => "PAN is required".to_string(),
            Issue::InvalidPan { pan } => format!("invalid PAN format: {pan}"),
            Issue::NegativeTotalIncome { total_income } => {
                format!("total income is negative: {total_income}")
            }
            Issue::DeductionsExceedIncome {
                deductions,
                total_income,
            } => format!("deductions {deductions} exceed total income {total_income}"),
            Issue::AmountOverflow { section } => format!("{section} amounts are too large to add up"),
            Issue::MissingComputation => "tax has not been computed".to_string(),
            Issue::StaleComputation => {
                "amounts changed since tax was computed; compute again".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

pub fn validate_return(tax_return: &TaxReturn) -> ValidationReport {
    let mut issues = Vec::new();

    match tax_return.personal_info.pan.as_deref() {
        None => issues.push(Issue::MissingPan),
        Some(pan) if !PAN.is_match(pan) => issues.push(Issue::InvalidPan {
            pan: pan.to_string(),
        }),
        Some(_) => {}
    }

    let overflow = |section: &str| Issue::AmountOverflow {
        section: section.to_string(),
    };
    let total_income = tax_return.income_details.total().ok();
    let deductions = tax_return.deductions.total().ok();
    match total_income {
        None => issues.push(overflow("incomeDetails")),
        Some(total_income) if total_income < Decimal::ZERO => {
            issues.push(Issue::NegativeTotalIncome { total_income })
        }
        Some(_) => {}
    }
    match (deductions, total_income) {
        (None, _) => issues.push(overflow("deductions")),
        (Some(deductions), Some(total_income)) if deductions > total_income => {
            issues.push(Issue::DeductionsExceedIncome {
                deductions,
                total_income,
            })
        }
        _ => {}
    }
    if tax_return.tax_credits.total().is_err() {
        issues.push(overflow("taxCredits"));
    }

    if tax_return.tax_calculation_new_regime.is_none() && tax_return.tax_calculation_old_regime.is_none() {
        issues.push(Issue::MissingComputation);
    } else if !tax_return.computation_is_current().unwrap_or(false) {
        issues.push(Issue::StaleComputation);
    }

    let (errors, warnings): (Vec<_>, Vec<_>) = issues
        .into_iter()
        .partition(|issue| issue.severity() == Severity::Error);

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
