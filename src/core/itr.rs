use super::regime::IncomeProfile;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum ItrType {
    /// Sahaj
    #[serde(rename = "ITR-1")]
    Itr1,
    #[serde(rename = "ITR-2")]
    Itr2,
    #[serde(rename = "ITR-3")]
    Itr3,
    /// Sugam
    #[serde(rename = "ITR-4")]
    Itr4,
}

impl ItrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItrType::Itr1 => "ITR-1",
            ItrType::Itr2 => "ITR-2",
            ItrType::Itr3 => "ITR-3",
            ItrType::Itr4 => "ITR-4",
        }
    }
}

impl std::fmt::Display for ItrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schedules attached to a return form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Schedule {
    /// Salary
    Sa,
    /// Capital gains
    Ca,
    /// Foreign assets
    Fa,
    /// Foreign source income
    Fsi,
    /// Business or profession
    Bp,
    /// Income chargeable at special rates
    Si,
}

impl Schedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schedule::Sa => "SA",
            Schedule::Ca => "CA",
            Schedule::Fa => "FA",
            Schedule::Fsi => "FSI",
            Schedule::Bp => "BP",
            Schedule::Si => "SI",
        }
    }
}

/// The facts form selection looks at. Absent fields read as false or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ItrProfile {
    pub has_salary: bool,
    pub has_business_income: bool,
    pub has_capital_gains: bool,
    pub has_agricultural_business: bool,
    /// Total income excluding agricultural income
    #[schemars(with = "f64")]
    pub total_income: Decimal,
    #[schemars(with = "f64")]
    pub agricultural_income: Decimal,
    #[schemars(with = "f64")]
    pub business_income: Decimal,
    #[schemars(with = "f64")]
    pub capital_gains: Decimal,
}

impl ItrProfile {
    pub fn from_income(income: &IncomeProfile) -> Self {
        ItrProfile {
            has_salary: income.salary > Decimal::ZERO,
            has_business_income: income.business_profession > Decimal::ZERO,
            has_capital_gains: income.capital_gains > Decimal::ZERO,
            has_agricultural_business: income.agricultural_income > Decimal::ZERO,
            // saturating
            total_income: [
                income.house_property_income,
                income.capital_gains,
                income.business_profession,
                income.other_sources,
            ]
            .into_iter()
            .fold(income.salary, Decimal::saturating_add),
            agricultural_income: income.agricultural_income,
            business_income: income.business_profession,
            capital_gains: income.capital_gains,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItrSelection {
    pub itr_type: ItrType,
    pub reason: String,
    pub schedules: BTreeSet<Schedule>,
}

/// One entry of the selection cascade
pub struct SelectionRule {
    pub itr_type: ItrType,
    pub reason: &'static str,
    pub schedules: &'static [Schedule],
    pub applies: fn(&ItrProfile) -> bool,
}

impl SelectionRule {
    fn selection(&self) -> ItrSelection {
        ItrSelection {
            itr_type: self.itr_type,
            reason: self.reason.to_string(),
            schedules: self.schedules.iter().copied().collect(),
        }
    }
}

const SALARY_ONLY_INCOME_LIMIT: Decimal = dec!(5000000);
const SALARY_ONLY_AGRICULTURAL_LIMIT: Decimal = dec!(5000);
const PRESUMPTIVE_BUSINESS_LIMIT: Decimal = dec!(2000000000);

/// Evaluated top to bottom; the first rule that applies wins.
pub const SELECTION_RULES: &[SelectionRule] = &[
    SelectionRule {
        itr_type: ItrType::Itr1,
        reason: "Salaried individual with no capital gains or business",
        schedules: &[Schedule::Sa, Schedule::Ca],
        applies: |p| {
            p.has_salary
                && !p.has_capital_gains
                && !p.has_business_income
                && p.total_income < SALARY_ONLY_INCOME_LIMIT
                && p.agricultural_income < SALARY_ONLY_AGRICULTURAL_LIMIT
        },
    },
    SelectionRule {
        itr_type: ItrType::Itr2,
        reason: "Capital gains or high income salaried",
        schedules: &[Schedule::Sa, Schedule::Ca, Schedule::Fa, Schedule::Fsi],
        applies: |p| p.has_capital_gains || (p.has_salary && p.total_income > SALARY_ONLY_INCOME_LIMIT),
    },
    SelectionRule {
        itr_type: ItrType::Itr3,
        reason: "Business/professional income",
        schedules: &[Schedule::Bp, Schedule::Fa, Schedule::Fsi],
        applies: |p| p.has_business_income && !p.has_agricultural_business,
    },
    SelectionRule {
        itr_type: ItrType::Itr4,
        reason: "Presumptive income scheme eligible",
        schedules: &[Schedule::Sa, Schedule::Si],
        applies: |p| p.business_income < PRESUMPTIVE_BUSINESS_LIMIT && !p.has_agricultural_business,
    },
];

static DEFAULT_RULE: SelectionRule = SelectionRule {
    itr_type: ItrType::Itr2,
    reason: "complex income profile",
    schedules: &[Schedule::Sa, Schedule::Ca, Schedule::Fa, Schedule::Fsi],
    applies: |_| true,
};

pub fn select_itr(profile: &ItrProfile) -> ItrSelection {
    let rule = SELECTION_RULES
        .iter()
        .find(|rule| (rule.applies)(profile))
        .unwrap_or(&DEFAULT_RULE);
    log::debug!("Selected {}: {}", rule.itr_type, rule.reason);
    rule.selection()
}
