use super::error::TaxError;
use super::regime::Regime;
use super::slab::{Slab, SlabTable};
use super::surcharge::{SurchargeBracket, SurchargeSchedule};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;

/// Indian assessment year (1 April to 31 March, following the financial year).
/// The value is the calendar year the assessment year ends in, so
/// `AssessmentYear(2026)` is AY 2025-26 for income earned in FY 2024-25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssessmentYear(pub i32);

impl AssessmentYear {
    /// Display as "2025-26"
    pub fn display(&self) -> String {
        format!("{}-{:02}", self.0 - 1, self.0 % 100)
    }

    /// The financial year the income was earned in, e.g. "2024-25"
    pub fn financial_year(&self) -> String {
        format!("{}-{:02}", self.0 - 2, (self.0 - 1) % 100)
    }
}

impl Default for AssessmentYear {
    fn default() -> Self {
        AssessmentYear(2026)
    }
}

impl std::fmt::Display for AssessmentYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for AssessmentYear {
    type Err = TaxError;

    /// Parses "2025-26"; the short year must follow the long one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TaxError::InvalidFieldValue {
            field: "assessmentYear".to_string(),
            reason: format!("expected YYYY-YY, got '{s}'"),
        };
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start: i32 = start.parse().map_err(|_| invalid())?;
        let end: i32 = end.parse().map_err(|_| invalid())?;
        if end != (start + 1) % 100 {
            return Err(invalid());
        }
        Ok(AssessmentYear(start + 1))
    }
}

impl TryFrom<String> for AssessmentYear {
    type Error = TaxError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AssessmentYear> for String {
    fn from(year: AssessmentYear) -> Self {
        year.display()
    }
}

/// Holding-period, indexation and withholding constants for capital gains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGainsRules {
    /// Holdings longer than this many days are long-term
    pub long_term_after_days: i64,
    /// Cost inflation factor used when the caller does not supply one
    #[schemars(with = "f64")]
    pub default_indexation_factor: Decimal,
    /// Advisory tax collected at source on crypto sales
    #[schemars(with = "f64")]
    pub crypto_withholding_rate: Decimal,
    /// Advisory remittance withholding on foreign share sales
    #[schemars(with = "f64")]
    pub foreign_share_withholding_rate: Decimal,
}

impl Default for CapitalGainsRules {
    fn default() -> Self {
        CapitalGainsRules {
            long_term_after_days: 365,
            default_indexation_factor: dec!(1.08),
            crypto_withholding_rate: dec!(0.01),
            foreign_share_withholding_rate: dec!(0.05),
        }
    }
}

/// Every numeric constant the engine uses for one assessment year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[schemars(with = "String")]
    pub assessment_year: AssessmentYear,
    pub new_regime_slabs: SlabTable,
    pub old_regime_slabs: SlabTable,
    /// Flat deduction allowed under the new regime
    #[schemars(with = "f64")]
    pub standard_deduction: Decimal,
    /// Health and education cess on (tax + surcharge)
    #[schemars(with = "f64")]
    pub cess_rate: Decimal,
    pub surcharge: SurchargeSchedule,
    #[serde(default)]
    pub capital_gains: CapitalGainsRules,
}

impl RuleSet {
    /// Built-in rules for a supported assessment year
    pub fn for_year(year: AssessmentYear) -> Result<Self, TaxError> {
        match year.0 {
            2026 => ay_2025_26(),
            _ => Err(TaxError::UnsupportedYear(year.display())),
        }
    }

    pub fn slabs(&self, regime: Regime) -> &SlabTable {
        match regime {
            Regime::New => &self.new_regime_slabs,
            Regime::Old => &self.old_regime_slabs,
        }
    }

    /// Checks the scalar constants; tables validate themselves on construction.
    pub fn validate(&self) -> Result<(), TaxError> {
        let config = |msg: String| Err(TaxError::InvalidRules(msg));
        if self.standard_deduction < Decimal::ZERO {
            return config(format!("negative standard deduction {}", self.standard_deduction));
        }
        if self.cess_rate < Decimal::ZERO || self.cess_rate > Decimal::ONE {
            return config(format!("cess rate {} outside 0..=1", self.cess_rate));
        }
        let cg = &self.capital_gains;
        if cg.long_term_after_days < 0 {
            return config(format!("negative holding threshold {}", cg.long_term_after_days));
        }
        if cg.default_indexation_factor <= Decimal::ZERO {
            return config(format!(
                "indexation factor {} must be positive",
                cg.default_indexation_factor
            ));
        }
        for (name, rate) in [
            ("crypto withholding", cg.crypto_withholding_rate),
            ("foreign share withholding", cg.foreign_share_withholding_rate),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return config(format!("{name} rate {rate} outside 0..=1"));
            }
        }
        Ok(())
    }
}

fn ay_2025_26() -> Result<RuleSet, TaxError> {
    Ok(RuleSet {
        assessment_year: AssessmentYear(2026),
        new_regime_slabs: SlabTable::new(vec![
            Slab::upto(dec!(400000), dec!(0)),
            Slab::upto(dec!(500000), dec!(0.05)),
            Slab::upto(dec!(600000), dec!(0.10)),
            Slab::upto(dec!(700000), dec!(0.15)),
            Slab::upto(dec!(800000), dec!(0.20)),
            Slab::upto(dec!(900000), dec!(0.25)),
            Slab::above(dec!(0.30)),
        ])?,
        old_regime_slabs: SlabTable::new(vec![
            Slab::upto(dec!(250000), dec!(0)),
            Slab::upto(dec!(500000), dec!(0.05)),
            Slab::upto(dec!(1000000), dec!(0.20)),
            Slab::above(dec!(0.30)),
        ])?,
        standard_deduction: dec!(75000),
        cess_rate: dec!(0.04),
        surcharge: SurchargeSchedule::new(vec![
            SurchargeBracket::new(dec!(1000000), dec!(0.10)),
            SurchargeBracket::new(dec!(5000000), dec!(0.15)),
            SurchargeBracket::new(dec!(20000000), dec!(0.25)),
            SurchargeBracket::new(dec!(50000000), dec!(0.37)),
        ])?,
        capital_gains: CapitalGainsRules::default(),
    })
}

/// Read a rule set from JSON, e.g. to try next year's slabs before they are built in
pub fn load_rules<R: Read>(reader: R) -> anyhow::Result<RuleSet> {
    let rules: RuleSet = serde_json::from_reader(reader)?;
    rules.validate()?;
    log::debug!("Loaded rules for AY {}", rules.assessment_year);
    Ok(rules)
}
