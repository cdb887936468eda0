use super::error::TaxError;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One progressive band: income up to `upper_bound` (above the previous band) is
/// taxed at `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slab {
    /// Upper bound of the band; `None` marks the open top band
    #[schemars(with = "Option<f64>")]
    pub upper_bound: Option<Decimal>,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

impl Slab {
    pub fn upto(upper_bound: Decimal, rate: Decimal) -> Self {
        Slab {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub fn above(rate: Decimal) -> Self {
        Slab {
            upper_bound: None,
            rate,
        }
    }
}

/// A validated slab table: bounds strictly increasing, rates non-decreasing,
/// only the last band open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "Vec<Slab>", into = "Vec<Slab>")]
pub struct SlabTable(Vec<Slab>);

impl SlabTable {
    pub fn new(slabs: Vec<Slab>) -> Result<Self, TaxError> {
        validate(&slabs)?;
        Ok(SlabTable(slabs))
    }

    pub fn slabs(&self) -> &[Slab] {
        &self.0
    }

    /// Progressive tax on `income`
    pub fn tax_on(&self, income: Decimal) -> Decimal {
        walk(income, &self.0)
    }
}

impl TryFrom<Vec<Slab>> for SlabTable {
    type Error = TaxError;

    fn try_from(slabs: Vec<Slab>) -> Result<Self, Self::Error> {
        SlabTable::new(slabs)
    }
}

impl From<SlabTable> for Vec<Slab> {
    fn from(table: SlabTable) -> Self {
        table.0
    }
}

/// Validate `slabs` and compute the progressive tax on `taxable_income`.
pub fn compute_tax(taxable_income: Decimal, slabs: &[Slab]) -> Result<Decimal, TaxError> {
    validate(slabs)?;
    Ok(walk(taxable_income, slabs))
}

fn walk(income: Decimal, slabs: &[Slab]) -> Decimal {
    let mut tax = Decimal::ZERO;
    let mut previous_bound = Decimal::ZERO;

    for slab in slabs {
        if income <= previous_bound {
            break;
        }
        let ceiling = slab.upper_bound.map_or(income, |bound| income.min(bound));
        let in_band = (ceiling - previous_bound).max(Decimal::ZERO);
        tax += in_band * slab.rate;
        match slab.upper_bound {
            Some(bound) => previous_bound = bound,
            None => break,
        }
    }

    tax
}

fn validate(slabs: &[Slab]) -> Result<(), TaxError> {
    let invalid = |msg: String| Err(TaxError::InvalidSlabTable(msg));

    if slabs.is_empty() {
        return invalid("table has no slabs".to_string());
    }

    let last = slabs.len() - 1;
    let mut previous_bound = Decimal::ZERO;
    let mut previous_rate = Decimal::ZERO;

    for (i, slab) in slabs.iter().enumerate() {
        if slab.rate < Decimal::ZERO || slab.rate > Decimal::ONE {
            return invalid(format!("slab {} rate {} outside 0..=1", i + 1, slab.rate));
        }
        if slab.rate < previous_rate {
            return invalid(format!(
                "slab {} rate {} is lower than the previous rate {}",
                i + 1,
                slab.rate,
                previous_rate
            ));
        }
        match (slab.upper_bound, i == last) {
            (Some(bound), false) => {
                if bound <= previous_bound {
                    return invalid(format!(
                        "slab {} upper bound {} does not exceed {}",
                        i + 1,
                        bound,
                        previous_bound
                    ));
                }
                previous_bound = bound;
            }
            (None, true) => {}
            (Some(_), true) => return invalid("last slab must be unbounded".to_string()),
            (None, false) => {
                return invalid(format!("slab {} is unbounded but is not the last", i + 1))
            }
        }
        previous_rate = slab.rate;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{AssessmentYear, RuleSet};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn new_regime() -> SlabTable {
        RuleSet::for_year(AssessmentYear(2026)).unwrap().new_regime_slabs
    }

    /// (lower, upper, rate) of every bounded band
    fn bounded_bands(table: &SlabTable) -> Vec<(Decimal, Decimal, Decimal)> {
        let mut lower = Decimal::ZERO;
        let mut bands = Vec::new();
        for slab in table.slabs() {
            if let Some(upper) = slab.upper_bound {
                bands.push((lower, upper, slab.rate));
                lower = upper;
            }
        }
        bands
    }

    /// Tax on the full width of the first `n` bands
    fn sum_of_bands(table: &SlabTable, n: usize) -> Decimal {
        bounded_bands(table)
            .iter()
            .take(n)
            .map(|(lower, upper, rate)| (upper - lower) * rate)
            .sum()
    }

    fn old_regime() -> Vec<Slab> {
        vec![
            Slab::upto(dec!(250000), dec!(0)),
            Slab::upto(dec!(500000), dec!(0.05)),
            Slab::upto(dec!(1000000), dec!(0.20)),
            Slab::above(dec!(0.30)),
        ]
    }

    #[test]
    fn zero_income_zero_tax() {
        assert_eq!(compute_tax(dec!(0), &old_regime()).unwrap(), dec!(0));
    }

    #[test]
    fn income_within_nil_band() {
        assert_eq!(compute_tax(dec!(250000), &old_regime()).unwrap(), dec!(0));
    }

    #[test]
    fn tax_at_boundaries_equals_sum_of_prior_bands() {
        let slabs = old_regime();
        assert_eq!(compute_tax(dec!(500000), &slabs).unwrap(), dec!(12500));
        assert_eq!(compute_tax(dec!(1000000), &slabs).unwrap(), dec!(112500));
    }

    #[test]
    fn new_regime_boundaries() {
        let table = new_regime();
        assert_eq!(bounded_bands(&table).len(), 6);
        let expected = [
            (dec!(400000), dec!(0)),
            (dec!(500000), dec!(5000)),
            (dec!(600000), dec!(15000)),
            (dec!(700000), dec!(30000)),
            (dec!(800000), dec!(50000)),
            (dec!(900000), dec!(75000)),
        ];
        for (i, (bound, tax)) in expected.into_iter().enumerate() {
            assert_eq!(table.tax_on(bound), tax, "at {bound}");
            assert_eq!(sum_of_bands(&table, i + 1), tax);
        }
        // 75,000 + 30% of 5,25,000
        assert_eq!(table.tax_on(dec!(1425000)), dec!(232500));
    }

    #[test]
    fn income_in_top_band() {
        // 12,500 + 1,00,000 + 30% of 3,25,000
        assert_eq!(compute_tax(dec!(1325000), &old_regime()).unwrap(), dec!(210000));
    }

    #[test]
    fn negative_income_taxes_nothing() {
        assert_eq!(compute_tax(dec!(-5000), &old_regime()).unwrap(), dec!(0));
    }

    #[test]
    fn rejects_empty_table() {
        assert!(matches!(
            compute_tax(dec!(100), &[]),
            Err(TaxError::InvalidSlabTable(_))
        ));
    }

    #[test]
    fn rejects_non_increasing_bounds() {
        let slabs = vec![
            Slab::upto(dec!(500000), dec!(0)),
            Slab::upto(dec!(500000), dec!(0.05)),
            Slab::above(dec!(0.30)),
        ];
        assert!(matches!(
            SlabTable::new(slabs),
            Err(TaxError::InvalidSlabTable(_))
        ));
    }

    #[test]
    fn rejects_decreasing_rate() {
        let slabs = vec![
            Slab::upto(dec!(250000), dec!(0.10)),
            Slab::above(dec!(0.05)),
        ];
        assert!(SlabTable::new(slabs).is_err());
    }

    #[test]
    fn rejects_bounded_last_slab() {
        let slabs = vec![Slab::upto(dec!(250000), dec!(0)), Slab::upto(dec!(500000), dec!(0.05))];
        assert!(SlabTable::new(slabs).is_err());
    }

    #[test]
    fn rejects_open_band_in_the_middle() {
        let slabs = vec![Slab::above(dec!(0)), Slab::above(dec!(0.05))];
        assert!(SlabTable::new(slabs).is_err());
    }

    #[test]
    fn table_deserializes_with_validation() {
        let json = r#"[{"upperBound": 250000, "rate": 0}, {"upperBound": null, "rate": 0.1}]"#;
        let table: SlabTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.tax_on(dec!(350000)), dec!(10000));

        let bad = r#"[{"upperBound": 250000, "rate": 0.2}, {"upperBound": null, "rate": 0.1}]"#;
        assert!(serde_json::from_str::<SlabTable>(bad).is_err());
    }

    proptest! {
        #[test]
        fn tax_is_monotone_in_income(a in 0u64..20_000_000, b in 0u64..20_000_000) {
            let table = SlabTable::new(old_regime()).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.tax_on(Decimal::from(lo)) <= table.tax_on(Decimal::from(hi)));
        }

        #[test]
        fn new_regime_boundary_tax_is_sum_of_prior_bands(band in 0usize..6) {
            let table = new_regime();
            let (_, upper, _) = bounded_bands(&table)[band];
            prop_assert_eq!(table.tax_on(upper), sum_of_bands(&table, band + 1));
        }

        #[test]
        fn new_regime_tax_inside_a_band(band in 0usize..6, offset in 0u64..=100_000) {
            let table = new_regime();
            let (lower, _, rate) = bounded_bands(&table)[band];
            let income = lower + Decimal::from(offset);
            prop_assert_eq!(
                table.tax_on(income),
                sum_of_bands(&table, band) + Decimal::from(offset) * rate
            );
        }

        #[test]
        fn tax_never_exceeds_top_rate(income in 0u64..50_000_000) {
            let table = SlabTable::new(old_regime()).unwrap();
            let income = Decimal::from(income);
            prop_assert!(table.tax_on(income) <= income * dec!(0.30));
        }
    }
}
