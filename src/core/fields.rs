//! Named field sets backing the merge whitelist.
//!
//! Structs deriving `FieldSchema` expose their wire names and by-name accessors
//! through [`Fields`], so the merge code never has to match on key strings itself.

use super::error::TaxError;
use rust_decimal::Decimal;

/// One known field of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait Fields {
    type Value;

    /// Every known field, in declaration order
    fn schema() -> &'static [FieldSpec];

    fn field(&self, name: &str) -> Option<&Self::Value>;

    fn field_mut(&mut self, name: &str) -> Option<&mut Self::Value>;

    fn is_known(name: &str) -> bool {
        Self::schema().iter().any(|f| f.name == name)
    }
}

/// Sum that fails instead of overflowing; `label` names the total in the error
pub fn checked_sum<I>(label: &str, amounts: I) -> Result<Decimal, TaxError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| TaxError::AmountOverflow(label.to_string()))
}

/// Sum of every bucket in a numeric field set
pub fn total<T: Fields<Value = Decimal>>(set: &T, label: &str) -> Result<Decimal, TaxError> {
    checked_sum(
        label,
        T::schema().iter().filter_map(|spec| set.field(spec.name)).copied(),
    )
}

/// Bucket-wise addition: `a + b` for every known field
pub fn add<T: Fields<Value = Decimal> + Clone>(a: &T, b: &T, label: &str) -> Result<T, TaxError> {
    let mut out = a.clone();
    for spec in T::schema() {
        let incoming = b.field(spec.name).copied().unwrap_or(Decimal::ZERO);
        if let Some(slot) = out.field_mut(spec.name) {
            *slot = slot
                .checked_add(incoming)
                .ok_or_else(|| TaxError::AmountOverflow(format!("{}.{}", label, spec.name)))?;
        }
    }
    Ok(out)
}

/// First bucket holding a negative amount, if any
pub fn first_negative<T: Fields<Value = Decimal>>(set: &T) -> Option<(&'static str, Decimal)> {
    T::schema().iter().find_map(|spec| {
        set.field(spec.name)
            .filter(|v| **v < Decimal::ZERO)
            .map(|v| (spec.name, *v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn checked_sum_adds() {
        assert_eq!(checked_sum("x", [dec!(1), dec!(2.5)]).unwrap(), dec!(3.5));
        assert_eq!(checked_sum("x", []).unwrap(), dec!(0));
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let err = checked_sum("deductions", [Decimal::MAX, dec!(1)]).unwrap_err();
        assert_eq!(err, TaxError::AmountOverflow("deductions".to_string()));
    }
}
