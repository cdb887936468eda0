use super::regime::{Regime, RegimeResult};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Side-by-side outcome of the two regimes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegimeComparison {
    /// Old total minus new total; positive means the new regime is cheaper
    #[schemars(with = "f64")]
    pub savings: Decimal,
    /// Savings as a percentage of the old total, two decimal places
    #[schemars(with = "f64")]
    pub savings_percentage: Decimal,
    pub recommendation: Regime,
    #[schemars(with = "f64")]
    pub new_regime_total: Decimal,
    #[schemars(with = "f64")]
    pub old_regime_total: Decimal,
}

/// Compare a new-regime result with an old-regime one. Ties recommend the old regime.
pub fn compare_regimes(new: &RegimeResult, old: &RegimeResult) -> RegimeComparison {
    let savings = old.total_tax - new.total_tax;
    let savings_percentage = if old.total_tax.is_zero() {
        Decimal::ZERO
    } else {
        (savings / old.total_tax)
            .saturating_mul(dec!(100))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };
    let recommendation = if savings > Decimal::ZERO {
        Regime::New
    } else {
        Regime::Old
    };

    RegimeComparison {
        savings,
        savings_percentage,
        recommendation,
        new_regime_total: new.total_tax,
        old_regime_total: old.total_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(regime: Regime, total_tax: Decimal) -> RegimeResult {
        RegimeResult {
            regime,
            total_income: Decimal::ZERO,
            standard_deduction: None,
            deductions_total: None,
            gross_total_income: Decimal::ZERO,
            taxable_income: Decimal::ZERO,
            tax: total_tax,
            surcharge: Decimal::ZERO,
            cess: Decimal::ZERO,
            total_tax,
            tds_credited: Decimal::ZERO,
            refund_due: Decimal::ZERO,
            tax_payable: total_tax,
        }
    }

    #[test]
    fn old_regime_cheaper() {
        let cmp = compare_regimes(
            &result(Regime::New, dec!(265980)),
            &result(Regime::Old, dec!(240240)),
        );
        assert_eq!(cmp.savings, dec!(-25740));
        assert_eq!(cmp.savings_percentage, dec!(-10.71));
        assert_eq!(cmp.recommendation, Regime::Old);
        assert_eq!(cmp.new_regime_total, dec!(265980));
        assert_eq!(cmp.old_regime_total, dec!(240240));
    }

    #[test]
    fn new_regime_cheaper() {
        let cmp = compare_regimes(
            &result(Regime::New, dec!(75000)),
            &result(Regime::Old, dec!(100000)),
        );
        assert_eq!(cmp.savings, dec!(25000));
        assert_eq!(cmp.savings_percentage, dec!(25));
        assert_eq!(cmp.recommendation, Regime::New);
    }

    #[test]
    fn tie_recommends_old() {
        let cmp = compare_regimes(
            &result(Regime::New, dec!(5000)),
            &result(Regime::Old, dec!(5000)),
        );
        assert_eq!(cmp.savings, dec!(0));
        assert_eq!(cmp.recommendation, Regime::Old);
    }

    #[test]
    fn zero_old_total_gives_zero_percentage() {
        let cmp = compare_regimes(&result(Regime::New, dec!(0)), &result(Regime::Old, dec!(0)));
        assert_eq!(cmp.savings_percentage, dec!(0));
        assert_eq!(cmp.recommendation, Regime::Old);
    }

    #[test]
    fn serializes_recommendation_lowercase() {
        let cmp = compare_regimes(
            &result(Regime::New, dec!(1)),
            &result(Regime::Old, dec!(2)),
        );
        let json = serde_json::to_value(&cmp).unwrap();
        assert_eq!(json["recommendation"], "new");
        assert!(json.get("savingsPercentage").is_some());
    }

    #[test]
    fn percentage_saturates_for_tiny_old_total() {
        let cmp = compare_regimes(
            &result(Regime::New, Decimal::MAX),
            &result(Regime::Old, Decimal::ONE),
        );
        assert_eq!(cmp.recommendation, Regime::Old);
        assert_eq!(cmp.savings_percentage, Decimal::MIN);
    }
}
