use super::error::TaxError;
use super::fields::{self, Fields};
use super::rules::RuleSet;
use super::surcharge::compute_surcharge;
use itrc_derive::FieldSchema;
use rust_decimal::{Decimal, RoundingStrategy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Income heads of the return, in rupees
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, FieldSchema,
)]
#[serde(rename_all = "camelCase", default)]
pub struct IncomeProfile {
    /// Income from salary
    #[schemars(with = "f64")]
    pub salary: Decimal,
    /// Income from house property
    #[schemars(with = "f64")]
    pub house_property_income: Decimal,
    /// Capital gains
    #[schemars(with = "f64")]
    pub capital_gains: Decimal,
    /// Profits and gains of business or profession
    #[schemars(with = "f64")]
    pub business_profession: Decimal,
    /// Income from other sources
    #[schemars(with = "f64")]
    pub other_sources: Decimal,
    /// Agricultural income, added to the taxable base as-is
    #[schemars(with = "f64")]
    pub agricultural_income: Decimal,
}

impl IncomeProfile {
    pub fn total(&self) -> Result<Decimal, TaxError> {
        fields::total(self, "incomeDetails")
    }
}

/// Chapter VI-A deduction buckets (old regime only)
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, FieldSchema,
)]
#[serde(rename_all = "camelCase", default)]
pub struct DeductionSet {
    /// Life insurance, PPF, ELSS and similar investments
    #[serde(rename = "section80C")]
    #[schemars(with = "f64")]
    pub section_80c: Decimal,
    /// Medical insurance premiums
    #[serde(rename = "section80D")]
    #[schemars(with = "f64")]
    pub section_80d: Decimal,
    /// Interest on education loan
    #[serde(rename = "section80E")]
    #[schemars(with = "f64")]
    pub section_80e: Decimal,
    /// Donations
    #[serde(rename = "section80G")]
    #[schemars(with = "f64")]
    pub section_80g: Decimal,
    /// Pension scheme contributions
    #[serde(rename = "section80CCD")]
    #[schemars(with = "f64")]
    pub section_80ccd: Decimal,
    /// Disability
    #[serde(rename = "section80U")]
    #[schemars(with = "f64")]
    pub section_80u: Decimal,
    /// Savings account interest
    #[serde(rename = "section80TTA")]
    #[schemars(with = "f64")]
    pub section_80tta: Decimal,
    /// Deposit interest for senior citizens
    #[serde(rename = "section80TTB")]
    #[schemars(with = "f64")]
    pub section_80ttb: Decimal,
    /// Any other deduction claimed
    #[schemars(with = "f64")]
    pub other_deductions: Decimal,
}

impl DeductionSet {
    pub fn total(&self) -> Result<Decimal, TaxError> {
        fields::total(self, "deductions")
    }
}

/// Tax already paid or deducted at source
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, FieldSchema,
)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxCredits {
    /// TDS deducted by employers
    #[schemars(with = "f64")]
    pub tds_salary: Decimal,
    /// TDS on interest, rent and other sources
    #[schemars(with = "f64")]
    pub tds_other_sources: Decimal,
    /// Advance tax paid
    #[schemars(with = "f64")]
    pub advance_tax: Decimal,
    /// Self-assessment tax paid
    #[schemars(with = "f64")]
    pub self_assessment_tax: Decimal,
}

impl TaxCredits {
    pub fn total(&self) -> Result<Decimal, TaxError> {
        fields::total(self, "taxCredits")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    New,
    #[default]
    Old,
}

impl Regime {
    pub fn display(&self) -> &'static str {
        match self {
            Regime::New => "new",
            Regime::Old => "old",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Full computation for one regime. `tax`, `surcharge`, `cess`, `totalTax`,
/// `refundDue` and `taxPayable` are whole rupees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegimeResult {
    pub regime: Regime,
    #[schemars(with = "f64")]
    pub total_income: Decimal,
    /// Present for the new regime only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub standard_deduction: Option<Decimal>,
    /// Present for the old regime only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub deductions_total: Option<Decimal>,
    #[schemars(with = "f64")]
    pub gross_total_income: Decimal,
    #[schemars(with = "f64")]
    pub taxable_income: Decimal,
    #[schemars(with = "f64")]
    pub tax: Decimal,
    #[schemars(with = "f64")]
    pub surcharge: Decimal,
    #[schemars(with = "f64")]
    pub cess: Decimal,
    #[schemars(with = "f64")]
    pub total_tax: Decimal,
    #[schemars(with = "f64")]
    pub tds_credited: Decimal,
    #[schemars(with = "f64")]
    pub refund_due: Decimal,
    #[schemars(with = "f64")]
    pub tax_payable: Decimal,
}

/// Round to whole rupees, halves away from zero
pub fn round_rupees(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute one regime's liability.
///
/// Deductions only apply under the old regime; the new regime takes the flat
/// standard deduction from `rules` instead. Surcharge is looked up on total
/// income, cess is charged on unrounded (tax + surcharge), and each component is
/// rounded before being summed into `total_tax`.
pub fn compute_regime(
    income: &IncomeProfile,
    deductions: Option<&DeductionSet>,
    credits: &TaxCredits,
    regime: Regime,
    rules: &RuleSet,
) -> Result<RegimeResult, TaxError> {
    reject_negative(income)?;
    reject_negative(credits)?;
    if let Some(d) = deductions {
        reject_negative(d)?;
    }

    let total_income = income.total()?;
    let gross_total_income = total_income;

    let (standard_deduction, deductions_total, allowance) = match regime {
        Regime::New => (Some(rules.standard_deduction), None, rules.standard_deduction),
        Regime::Old => {
            let total = deductions.map_or(Ok(Decimal::ZERO), DeductionSet::total)?;
            (None, Some(total), total)
        }
    };
    let taxable_income = (gross_total_income - allowance).max(Decimal::ZERO);

    let tax = rules.slabs(regime).tax_on(taxable_income);
    let surcharge = compute_surcharge(total_income, tax, &rules.surcharge);
    let overflow = || TaxError::AmountOverflow("totalTax".to_string());
    let levied = tax.checked_add(surcharge).ok_or_else(overflow)?;
    let cess = round_rupees(levied * rules.cess_rate);
    let total_tax = fields::checked_sum("totalTax", [round_rupees(tax), round_rupees(surcharge), cess])?;

    let tds_credited = credits.total()?;
    let tax_payable = round_rupees((total_tax - tds_credited).max(Decimal::ZERO));
    let refund_due = round_rupees((tds_credited - total_tax).max(Decimal::ZERO));

    log::debug!(
        "{} regime: income={}, taxable={}, tax={}, surcharge={}, cess={}, total={}, credited={}",
        regime,
        total_income,
        taxable_income,
        tax,
        surcharge,
        cess,
        total_tax,
        tds_credited
    );

    Ok(RegimeResult {
        regime,
        total_income,
        standard_deduction,
        deductions_total,
        gross_total_income,
        taxable_income,
        tax: round_rupees(tax),
        surcharge: round_rupees(surcharge),
        cess,
        total_tax,
        tds_credited,
        refund_due,
        tax_payable,
    })
}

fn reject_negative<T: Fields<Value = Decimal>>(set: &T) -> Result<(), TaxError> {
    match fields::first_negative(set) {
        Some((field, amount)) => Err(TaxError::NegativeAmount {
            field: field.to_string(),
            amount,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::AssessmentYear;
    use rust_decimal_macros::dec;

    fn rules() -> RuleSet {
        RuleSet::for_year(AssessmentYear(2026)).unwrap()
    }

    fn salary(amount: Decimal) -> IncomeProfile {
        IncomeProfile {
            salary: amount,
            ..Default::default()
        }
    }

    #[test]
    fn new_regime_salaried_fifteen_lakh() {
        let result = compute_regime(
            &salary(dec!(1500000)),
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();

        assert_eq!(result.total_income, dec!(1500000));
        assert_eq!(result.standard_deduction, Some(dec!(75000)));
        assert_eq!(result.deductions_total, None);
        assert_eq!(result.taxable_income, dec!(1425000));
        assert_eq!(result.tax, dec!(232500));
        assert_eq!(result.surcharge, dec!(23250));
        assert_eq!(result.cess, dec!(10230));
        assert_eq!(result.total_tax, dec!(265980));
    }

    #[test]
    fn old_regime_with_deductions() {
        let deductions = DeductionSet {
            section_80c: dec!(150000),
            section_80d: dec!(25000),
            ..Default::default()
        };
        let result = compute_regime(
            &salary(dec!(1500000)),
            Some(&deductions),
            &TaxCredits::default(),
            Regime::Old,
            &rules(),
        )
        .unwrap();

        assert_eq!(result.deductions_total, Some(dec!(175000)));
        assert_eq!(result.standard_deduction, None);
        assert_eq!(result.taxable_income, dec!(1325000));
        assert_eq!(result.tax, dec!(210000));
        assert_eq!(result.surcharge, dec!(21000));
        assert_eq!(result.cess, dec!(9240));
        assert_eq!(result.total_tax, dec!(240240));
    }

    #[test]
    fn new_regime_ignores_deductions() {
        let deductions = DeductionSet {
            section_80c: dec!(150000),
            ..Default::default()
        };
        let with = compute_regime(
            &salary(dec!(1500000)),
            Some(&deductions),
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();
        let without = compute_regime(
            &salary(dec!(1500000)),
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn old_regime_without_deductions_treats_them_as_zero() {
        let result = compute_regime(
            &salary(dec!(600000)),
            None,
            &TaxCredits::default(),
            Regime::Old,
            &rules(),
        )
        .unwrap();
        assert_eq!(result.deductions_total, Some(dec!(0)));
        assert_eq!(result.taxable_income, dec!(600000));
    }

    #[test]
    fn taxable_income_floors_at_zero() {
        let result = compute_regime(
            &salary(dec!(50000)),
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();
        assert_eq!(result.taxable_income, dec!(0));
        assert_eq!(result.total_tax, dec!(0));
    }

    #[test]
    fn agricultural_income_joins_the_taxable_base() {
        let income = IncomeProfile {
            salary: dec!(1000000),
            agricultural_income: dec!(500000),
            ..Default::default()
        };
        let result = compute_regime(
            &income,
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();
        assert_eq!(result.total_income, dec!(1500000));
        assert_eq!(result.taxable_income, dec!(1425000));
    }

    #[test]
    fn credits_below_liability_leave_tax_payable() {
        let credits = TaxCredits {
            tds_salary: dec!(30000),
            ..Default::default()
        };
        let result = compute_regime(&salary(dec!(1500000)), None, &credits, Regime::New, &rules())
            .unwrap();
        assert_eq!(result.tds_credited, dec!(30000));
        assert_eq!(result.tax_payable, dec!(235980));
        assert_eq!(result.refund_due, dec!(0));
    }

    #[test]
    fn credits_above_liability_give_refund() {
        let credits = TaxCredits {
            tds_salary: dec!(200000),
            tds_other_sources: dec!(20000),
            advance_tax: dec!(15000),
            self_assessment_tax: dec!(10000),
        };
        let deductions = DeductionSet {
            section_80c: dec!(150000),
            section_80d: dec!(25000),
            ..Default::default()
        };
        let result = compute_regime(
            &salary(dec!(1500000)),
            Some(&deductions),
            &credits,
            Regime::Old,
            &rules(),
        )
        .unwrap();
        assert_eq!(result.tds_credited, dec!(245000));
        assert_eq!(result.refund_due, dec!(4760));
        assert_eq!(result.tax_payable, dec!(0));
    }

    #[test]
    fn components_rounded_before_summing() {
        // taxable 4,25,011: tax 1,250.55, no surcharge, cess 50.022
        let result = compute_regime(
            &salary(dec!(500011)),
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();
        assert_eq!(result.taxable_income, dec!(425011));
        assert_eq!(result.tax, dec!(1251));
        assert_eq!(result.cess, dec!(50));
        assert_eq!(result.total_tax, dec!(1301));
    }

    #[test]
    fn negative_bucket_rejected() {
        let income = IncomeProfile {
            salary: dec!(100000),
            other_sources: dec!(-1),
            ..Default::default()
        };
        let err = compute_regime(
            &income,
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TaxError::NegativeAmount {
                field: "otherSources".to_string(),
                amount: dec!(-1)
            }
        );
    }

    #[test]
    fn at_most_one_of_refund_or_payable() {
        for tds in [dec!(0), dec!(100000), dec!(265980), dec!(400000)] {
            let credits = TaxCredits {
                tds_salary: tds,
                ..Default::default()
            };
            let r = compute_regime(&salary(dec!(1500000)), None, &credits, Regime::New, &rules())
                .unwrap();
            assert!(r.refund_due.is_zero() || r.tax_payable.is_zero());
        }
    }

    #[test]
    fn field_schema_uses_wire_names() {
        let names: Vec<_> = DeductionSet::schema().iter().map(|f| f.name).collect();
        assert_eq!(names[0], "section80C");
        assert!(names.contains(&"section80CCD"));
        assert!(names.contains(&"otherDeductions"));
        assert!(IncomeProfile::is_known("housePropertyIncome"));
        assert!(!IncomeProfile::is_known("house_property_income"));
        assert!(TaxCredits::is_known("selfAssessmentTax"));
    }

    #[test]
    fn amounts_serialize_as_json_numbers() {
        let result = compute_regime(
            &salary(dec!(1500000)),
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["totalTax"].is_number(), "{}", json["totalTax"]);
        assert_eq!(json["totalTax"].as_i64(), Some(265980));
        assert_eq!(json["standardDeduction"].as_i64(), Some(75000));
        assert_eq!(json["regime"], "new");

        let back: RegimeResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn overflowing_income_is_an_error() {
        let income = IncomeProfile {
            salary: Decimal::MAX,
            other_sources: dec!(1),
            ..Default::default()
        };
        let err = compute_regime(
            &income,
            None,
            &TaxCredits::default(),
            Regime::New,
            &rules(),
        )
        .unwrap_err();
        assert_eq!(err, TaxError::AmountOverflow("incomeDetails".to_string()));
    }
}
