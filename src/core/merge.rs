//! Folding extracted document values into the cumulative return.
//!
//! Personal details are replaced, last write wins. Every numeric bucket is added,
//! so the order in which documents arrive does not matter, while merging the same
//! document twice counts it twice.

use super::error::TaxError;
use super::fields::{self, Fields};
use super::regime::{DeductionSet, IncomeProfile, TaxCredits};
use super::tax_return::{PersonalInfo, TaxReturn};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    PersonalInfo,
    IncomeDetails,
    Deductions,
    TaxCredits,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::PersonalInfo,
        Section::IncomeDetails,
        Section::Deductions,
        Section::TaxCredits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PersonalInfo => "personalInfo",
            Section::IncomeDetails => "incomeDetails",
            Section::Deductions => "deductions",
            Section::TaxCredits => "taxCredits",
        }
    }

    pub fn fields(&self) -> &'static [fields::FieldSpec] {
        match self {
            Section::PersonalInfo => PersonalInfo::schema(),
            Section::IncomeDetails => IncomeProfile::schema(),
            Section::Deductions => DeductionSet::schema(),
            Section::TaxCredits => TaxCredits::schema(),
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Section {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .iter()
            .find(|section| section.as_str() == s)
            .copied()
            .ok_or_else(|| TaxError::UnknownMergeKey {
                section: "fragment".to_string(),
                key: s.to_string(),
            })
    }
}

/// What to do with keys outside the whitelist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    #[default]
    Reject,
    /// Drop the key and log a warning
    Ignore,
}

/// Raw values scraped from one document. Any section may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFieldMap {
    /// Name of the originating document, e.g. "form16"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<PersonalInfo>")]
    pub personal_info: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<IncomeProfile>")]
    pub income_details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<DeductionSet>")]
    pub deductions: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<TaxCredits>")]
    pub tax_credits: Option<Map<String, Value>>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

impl ExtractedFieldMap {
    fn section(&self, section: Section) -> Option<&Map<String, Value>> {
        match section {
            Section::PersonalInfo => self.personal_info.as_ref(),
            Section::IncomeDetails => self.income_details.as_ref(),
            Section::Deductions => self.deductions.as_ref(),
            Section::TaxCredits => self.tax_credits.as_ref(),
        }
    }
}

pub fn read_field_map<R: Read>(reader: R) -> anyhow::Result<ExtractedFieldMap> {
    let map: ExtractedFieldMap = serde_json::from_reader(reader)?;
    Ok(map)
}

/// A whitelisted, typed field map ready to merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub personal_info: PersonalInfo,
    pub income_details: IncomeProfile,
    pub deductions: DeductionSet,
    pub tax_credits: TaxCredits,
}

impl Fragment {
    pub fn parse(map: &ExtractedFieldMap, policy: MergePolicy) -> Result<Fragment, TaxError> {
        for key in map.extra.keys() {
            unknown_key(policy, "fragment", key)?;
        }

        let mut fragment = Fragment::default();
        for section in Section::ALL {
            let Some(values) = map.section(section) else {
                continue;
            };
            for (key, value) in values {
                fragment.set(section, key, value, policy)?;
            }
        }
        Ok(fragment)
    }

    fn set(
        &mut self,
        section: Section,
        key: &str,
        value: &Value,
        policy: MergePolicy,
    ) -> Result<(), TaxError> {
        match section {
            Section::PersonalInfo => {
                let key = personal_alias(key);
                match self.personal_info.field_mut(key) {
                    Some(slot) => {
                        if let Some(text) = parse_text(section, key, value)? {
                            *slot = Some(text);
                        }
                        Ok(())
                    }
                    None => unknown_key(policy, section.as_str(), key),
                }
            }
            Section::IncomeDetails => set_amount(&mut self.income_details, section, key, value, policy),
            Section::Deductions => set_amount(&mut self.deductions, section, key, value, policy),
            Section::TaxCredits => set_amount(&mut self.tax_credits, section, key, value, policy),
        }
    }

    /// Combine two fragments as if `other` were merged after `self`
    pub fn combine(&self, other: &Fragment) -> Result<Fragment, TaxError> {
        Ok(Fragment {
            personal_info: overlay(&self.personal_info, &other.personal_info),
            income_details: fields::add(&self.income_details, &other.income_details, "incomeDetails")?,
            deductions: fields::add(&self.deductions, &other.deductions, "deductions")?,
            tax_credits: fields::add(&self.tax_credits, &other.tax_credits, "taxCredits")?,
        })
    }

    /// Whether any amount is non-zero
    pub fn has_amounts(&self) -> bool {
        self.income_details != IncomeProfile::default()
            || self.deductions != DeductionSet::default()
            || self.tax_credits != TaxCredits::default()
    }
}

/// Fold `fragment` into `existing`, returning the merged return.
///
/// A fragment carrying amounts discards any attached computation and puts the
/// return back to draft.
pub fn merge(existing: &TaxReturn, fragment: &Fragment) -> Result<TaxReturn, TaxError> {
    let mut merged = existing.clone();
    merged.personal_info = overlay(&existing.personal_info, &fragment.personal_info);
    merged.income_details = fields::add(&existing.income_details, &fragment.income_details, "incomeDetails")?;
    merged.deductions = fields::add(&existing.deductions, &fragment.deductions, "deductions")?;
    merged.tax_credits = fields::add(&existing.tax_credits, &fragment.tax_credits, "taxCredits")?;
    if fragment.has_amounts() {
        merged.discard_computation();
    }
    Ok(merged)
}

/// Parse `map` under `policy` and fold it into `existing`
pub fn merge_extracted(
    existing: &TaxReturn,
    map: &ExtractedFieldMap,
    policy: MergePolicy,
) -> Result<TaxReturn, TaxError> {
    let fragment = Fragment::parse(map, policy)?;
    log::info!(
        "Merging fields from {}",
        map.source.as_deref().unwrap_or("unnamed document")
    );
    merge(existing, &fragment)
}

impl TaxReturn {
    /// Replace a single field outright. `null` clears a personal detail or zeroes
    /// an amount. Unknown keys always fail here. Changing an amount discards any
    /// attached computation.
    pub fn with_field(&self, section: Section, key: &str, value: &Value) -> Result<TaxReturn, TaxError> {
        let mut updated = self.clone();
        let unknown = || TaxError::UnknownMergeKey {
            section: section.as_str().to_string(),
            key: key.to_string(),
        };
        match section {
            Section::PersonalInfo => {
                let key = personal_alias(key);
                let text = parse_text(section, key, value)?;
                let slot = updated.personal_info.field_mut(key).ok_or_else(unknown)?;
                *slot = text;
            }
            Section::IncomeDetails | Section::Deductions | Section::TaxCredits => {
                let amount = parse_amount(section, key, value)?.unwrap_or_default();
                let slot = match section {
                    Section::IncomeDetails => updated.income_details.field_mut(key),
                    Section::Deductions => updated.deductions.field_mut(key),
                    _ => updated.tax_credits.field_mut(key),
                }
                .ok_or_else(unknown)?;
                if *slot != amount {
                    *slot = amount;
                    updated.discard_computation();
                }
            }
        }
        Ok(updated)
    }
}

fn set_amount<T: Fields<Value = Decimal>>(
    set: &mut T,
    section: Section,
    key: &str,
    value: &Value,
    policy: MergePolicy,
) -> Result<(), TaxError> {
    if !T::is_known(key) {
        return unknown_key(policy, section.as_str(), key);
    }
    if let (Some(amount), Some(slot)) = (parse_amount(section, key, value)?, set.field_mut(key)) {
        *slot = slot
            .checked_add(amount)
            .ok_or_else(|| TaxError::AmountOverflow(format!("{}.{}", section, key)))?;
    }
    Ok(())
}

fn overlay(base: &PersonalInfo, update: &PersonalInfo) -> PersonalInfo {
    let mut out = base.clone();
    for spec in PersonalInfo::schema() {
        if let (Some(Some(value)), Some(slot)) = (update.field(spec.name), out.field_mut(spec.name)) {
            *slot = Some(value.clone());
        }
    }
    out
}

/// Document extractors name some fields differently
fn personal_alias(key: &str) -> &str {
    match key {
        "employeeName" => "name",
        other => other,
    }
}

fn unknown_key(policy: MergePolicy, section: &str, key: &str) -> Result<(), TaxError> {
    match policy {
        MergePolicy::Reject => Err(TaxError::UnknownMergeKey {
            section: section.to_string(),
            key: key.to_string(),
        }),
        MergePolicy::Ignore => {
            log::warn!("Ignoring unknown field '{}' in {}", key, section);
            Ok(())
        }
    }
}

fn invalid(section: Section, key: &str, reason: String) -> TaxError {
    TaxError::InvalidFieldValue {
        field: format!("{}.{}", section, key),
        reason,
    }
}

/// `None` for null or blank strings
fn parse_text(section: Section, key: &str, value: &Value) -> Result<Option<String>, TaxError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(invalid(section, key, format!("expected text, got {}", other))),
    }
}

/// `None` for null or blank strings. Strings may carry a currency prefix
/// (`₹`, `Rs.`, `Rs`, `INR`, any case) and Indian digit grouping, e.g. "₹ 1,50,000".
fn parse_amount(section: Section, key: &str, value: &Value) -> Result<Option<Decimal>, TaxError> {
    let amount = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let cleaned: String = strip_currency(s.trim())
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            parse_decimal(&cleaned)
        }
        other => return Err(invalid(section, key, format!("expected an amount, got {}", other))),
    };
    let amount = amount.ok_or_else(|| invalid(section, key, format!("not a number: {}", value)))?;
    if amount < Decimal::ZERO {
        return Err(TaxError::NegativeAmount {
            field: format!("{}.{}", section, key),
            amount,
        });
    }
    Ok(Some(amount))
}

fn strip_currency(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix('₹') {
        return rest;
    }
    for prefix in ["rs.", "inr", "rs"] {
        if let Some(head) = s.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return &s[prefix.len()..];
            }
        }
    }
    s
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tax_return::ReturnStatus;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn field_map(value: Value) -> ExtractedFieldMap {
        serde_json::from_value(value).unwrap()
    }

    fn fragment(value: Value) -> Fragment {
        Fragment::parse(&field_map(value), MergePolicy::Reject).unwrap()
    }

    #[test]
    fn numeric_buckets_are_added() {
        let mut existing = TaxReturn::default();
        existing.income_details.salary = dec!(800000);
        existing.tax_credits.tds_salary = dec!(40000);

        let merged = merge(
            &existing,
            &fragment(json!({
                "incomeDetails": {"salary": 700000, "otherSources": "12,500"},
                "taxCredits": {"tdsSalary": 35000}
            })),
        )
        .unwrap();
        assert_eq!(merged.income_details.salary, dec!(1500000));
        assert_eq!(merged.income_details.other_sources, dec!(12500));
        assert_eq!(merged.tax_credits.tds_salary, dec!(75000));
        assert_eq!(existing.income_details.salary, dec!(800000));
    }

    #[test]
    fn personal_info_last_write_wins() {
        let mut existing = TaxReturn::default();
        existing.personal_info.name = Some("A Rao".to_string());
        existing.personal_info.email = Some("a@example.com".to_string());

        let merged = merge(
            &existing,
            &fragment(json!({"personalInfo": {"name": "Asha Rao", "pan": "ABCDE1234F", "email": ""}})),
        )
        .unwrap();
        assert_eq!(merged.personal_info.name.as_deref(), Some("Asha Rao"));
        assert_eq!(merged.personal_info.pan.as_deref(), Some("ABCDE1234F"));
        assert_eq!(merged.personal_info.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn employee_name_is_an_alias_for_name() {
        let merged = merge(
            &TaxReturn::default(),
            &fragment(json!({"personalInfo": {"employeeName": "Asha Rao"}})),
        )
        .unwrap();
        assert_eq!(merged.personal_info.name.as_deref(), Some("Asha Rao"));
    }

    #[test]
    fn merging_twice_doubles() {
        let b = fragment(json!({"incomeDetails": {"salary": 100000}}));
        let once = merge(&TaxReturn::default(), &b).unwrap();
        let twice = merge(&once, &b).unwrap();
        assert_eq!(twice.income_details.salary, dec!(200000));
    }

    #[test]
    fn unknown_key_rejected_by_default() {
        let map = field_map(json!({"incomeDetails": {"bonus": 5000}}));
        let err = Fragment::parse(&map, MergePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            TaxError::UnknownMergeKey {
                section: "incomeDetails".to_string(),
                key: "bonus".to_string()
            }
        );
    }

    #[test]
    fn unknown_key_ignored_under_ignore_policy() {
        let map = field_map(json!({
            "incomeDetails": {"bonus": 5000, "salary": 10},
            "employerTan": "BLRA12345B"
        }));
        let fragment = Fragment::parse(&map, MergePolicy::Ignore).unwrap();
        assert_eq!(fragment.income_details.salary, dec!(10));
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        let map = field_map(json!({"employerTan": "BLRA12345B"}));
        let err = Fragment::parse(&map, MergePolicy::Reject).unwrap_err();
        assert!(matches!(err, TaxError::UnknownMergeKey { ref section, .. } if section == "fragment"));
    }

    #[test]
    fn source_key_is_accepted() {
        let map = field_map(json!({"source": "form16", "deductions": {"section80C": 150000}}));
        let merged = merge_extracted(&TaxReturn::default(), &map, MergePolicy::Reject).unwrap();
        assert_eq!(merged.deductions.section_80c, dec!(150000));
    }

    #[test]
    fn null_and_blank_amounts_are_absent() {
        let f = fragment(json!({"incomeDetails": {"salary": null, "otherSources": "  "}}));
        assert_eq!(f.income_details, IncomeProfile::default());
    }

    #[test]
    fn rupee_formatted_strings_parse() {
        let f = fragment(json!({"deductions": {"section80C": "₹ 1,50,000", "section80D": "Rs. 25,000.50"}}));
        assert_eq!(f.deductions.section_80c, dec!(150000));
        assert_eq!(f.deductions.section_80d, dec!(25000.50));
    }

    #[test]
    fn currency_prefixes_are_case_insensitive() {
        let f = fragment(json!({
            "incomeDetails": {
                "salary": "Rs 25,000",
                "otherSources": "INR 1,200",
                "housePropertyIncome": "rs.300",
                "capitalGains": "inr 40"
            },
            "taxCredits": {"tdsSalary": "RS 7"}
        }));
        assert_eq!(f.income_details.salary, dec!(25000));
        assert_eq!(f.income_details.other_sources, dec!(1200));
        assert_eq!(f.income_details.house_property_income, dec!(300));
        assert_eq!(f.income_details.capital_gains, dec!(40));
        assert_eq!(f.tax_credits.tds_salary, dec!(7));

        let map = field_map(json!({"incomeDetails": {"salary": "USD 10"}}));
        assert!(Fragment::parse(&map, MergePolicy::Reject).is_err());
    }

    #[test]
    fn repeated_merge_beyond_decimal_range_is_an_error() {
        let huge = fragment(json!({"incomeDetails": {"salary": "79228162514264337593543950335"}}));
        let once = merge(&TaxReturn::default(), &huge).unwrap();
        assert_eq!(once.income_details.salary, Decimal::MAX);
        let err = merge(&once, &huge).unwrap_err();
        assert_eq!(err, TaxError::AmountOverflow("incomeDetails.salary".to_string()));
        assert_eq!(err.kind(), crate::core::error::ErrorKind::InvalidInput);
        assert!(huge.combine(&huge).is_err());

        let map = field_map(json!({"incomeDetails": {"salary": "79228162514264337593543950335", "otherSources": 1}}));
        let merged = merge_extracted(&TaxReturn::default(), &map, MergePolicy::Reject).unwrap();
        assert!(merged.compute(&crate::core::rules::RuleSet::for_year(merged.assessment_year).unwrap()).is_err());
    }

    #[test]
    fn duplicate_key_in_one_section_overflowing_is_an_error() {
        let mut set = IncomeProfile {
            salary: Decimal::MAX,
            ..Default::default()
        };
        let err = set_amount(&mut set, Section::IncomeDetails, "salary", &json!(1), MergePolicy::Reject).unwrap_err();
        assert_eq!(err, TaxError::AmountOverflow("incomeDetails.salary".to_string()));
    }

    fn computed_fifteen_lakh() -> TaxReturn {
        let mut r = TaxReturn::default();
        r.income_details.salary = dec!(1500000);
        let rules = crate::core::rules::RuleSet::for_year(r.assessment_year).unwrap();
        let computation = r.compute(&rules).unwrap();
        r.with_computation(&computation)
    }

    #[test]
    fn merging_amounts_discards_computation() {
        let ready = computed_fifteen_lakh();
        assert_eq!(ready.status, ReturnStatus::Ready);

        let merged = merge(&ready, &fragment(json!({"incomeDetails": {"salary": 1500000}}))).unwrap();
        assert_eq!(merged.income_details.salary, dec!(3000000));
        assert_eq!(merged.status, ReturnStatus::Draft);
        assert!(merged.tax_calculation_new_regime.is_none());
        assert!(merged.tax_calculation_old_regime.is_none());

        let renamed = merge(&ready, &fragment(json!({"personalInfo": {"name": "Asha Rao"}}))).unwrap();
        assert_eq!(renamed.status, ReturnStatus::Ready);
        assert!(renamed.tax_calculation_new_regime.is_some());
    }

    #[test]
    fn with_field_amount_change_discards_computation() {
        let ready = computed_fifteen_lakh();
        let same = ready
            .with_field(Section::IncomeDetails, "salary", &json!(1500000))
            .unwrap();
        assert_eq!(same.status, ReturnStatus::Ready);

        let changed = ready
            .with_field(Section::TaxCredits, "tdsSalary", &json!("Rs 1,00,000"))
            .unwrap();
        assert_eq!(changed.status, ReturnStatus::Draft);
        assert!(changed.tax_calculation_old_regime.is_none());
    }

    #[test]
    fn bad_values_rejected() {
        for value in [json!(true), json!([1]), json!({"a": 1}), json!("twelve")] {
            let map = field_map(json!({"incomeDetails": {"salary": value}}));
            let err = Fragment::parse(&map, MergePolicy::Reject).unwrap_err();
            assert!(matches!(err, TaxError::InvalidFieldValue { .. }), "{err:?}");
        }
    }

    #[test]
    fn negative_amount_rejected() {
        let map = field_map(json!({"taxCredits": {"advanceTax": -100}}));
        let err = Fragment::parse(&map, MergePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            TaxError::NegativeAmount {
                field: "taxCredits.advanceTax".to_string(),
                amount: dec!(-100)
            }
        );
    }

    #[test]
    fn combine_then_merge_equals_sequential_merge() {
        let a = {
            let mut r = TaxReturn::default();
            r.income_details.salary = dec!(1000);
            r.personal_info.name = Some("A".to_string());
            r
        };
        let b = fragment(json!({"personalInfo": {"name": "B"}, "incomeDetails": {"salary": 10}}));
        let c = fragment(json!({"personalInfo": {"pan": "ABCDE1234F"}, "incomeDetails": {"salary": 5}}));
        let sequential = merge(&merge(&a, &b).unwrap(), &c).unwrap();
        assert_eq!(sequential, merge(&a, &b.combine(&c).unwrap()).unwrap());
    }

    #[test]
    fn with_field_replaces_instead_of_adding() {
        let mut r = TaxReturn::default();
        r.income_details.salary = dec!(500000);
        let updated = r
            .with_field(Section::IncomeDetails, "salary", &json!("6,00,000"))
            .unwrap();
        assert_eq!(updated.income_details.salary, dec!(600000));

        let cleared = updated
            .with_field(Section::PersonalInfo, "employeeName", &json!("Asha"))
            .unwrap()
            .with_field(Section::PersonalInfo, "name", &Value::Null)
            .unwrap();
        assert_eq!(cleared.personal_info.name, None);

        assert!(r.with_field(Section::Deductions, "section80Z", &json!(1)).is_err());
    }

    #[test]
    fn section_names_parse() {
        assert_eq!("taxCredits".parse::<Section>().unwrap(), Section::TaxCredits);
        assert!("refundDetails".parse::<Section>().is_err());
    }

    fn amounts() -> impl Strategy<Value = (u32, u32, u32)> {
        (0u32..5_000_000, 0u32..5_000_000, 0u32..500_000)
    }

    fn numeric_fragment((salary, other, tds): (u32, u32, u32)) -> Fragment {
        fragment(json!({
            "incomeDetails": {"salary": salary, "otherSources": other},
            "deductions": {"section80C": tds / 2},
            "taxCredits": {"tdsSalary": tds}
        }))
    }

    proptest! {
        #[test]
        fn numeric_merge_is_order_independent(a in amounts(), b in amounts(), c in amounts()) {
            let (a, b, c) = (numeric_fragment(a), numeric_fragment(b), numeric_fragment(c));
            let base = TaxReturn::default();
            let abc = merge(&merge(&merge(&base, &a).unwrap(), &b).unwrap(), &c).unwrap();
            let cba = merge(&merge(&merge(&base, &c).unwrap(), &b).unwrap(), &a).unwrap();
            prop_assert_eq!(&abc, &cba);
            let grouped = merge(&merge(&base, &a).unwrap(), &b.combine(&c).unwrap()).unwrap();
            prop_assert_eq!(&abc, &grouped);
        }
    }
}
