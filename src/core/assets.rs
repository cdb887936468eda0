//! Assets held at the end of the year, reported rather than taxed.

use super::error::TaxError;
use super::fields;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum HoldingType {
    RealEstate,
    Vehicle,
    MutualFund,
    Crypto,
    Gold,
    BankDeposit,
    Jewelry,
    Other,
}

impl HoldingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingType::RealEstate => "real-estate",
            HoldingType::Vehicle => "vehicle",
            HoldingType::MutualFund => "mutual-fund",
            HoldingType::Crypto => "crypto",
            HoldingType::Gold => "gold",
            HoldingType::BankDeposit => "bank-deposit",
            HoldingType::Jewelry => "jewelry",
            HoldingType::Other => "other",
        }
    }
}

impl std::fmt::Display for HoldingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One asset owned by the assessee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetHolding {
    pub asset_type: HoldingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub acquisition_cost: Decimal,
    /// Value at the end of the year, in rupees
    #[serde(default)]
    #[schemars(with = "f64")]
    pub current_value: Decimal,
    /// Country or city where the asset is held
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Held outside India; reported on Schedule FA
    #[serde(default, rename = "scheduleFA")]
    pub schedule_fa: bool,
    /// Earns income outside India
    #[serde(default, rename = "scheduleFSI")]
    pub schedule_fsi: bool,
}

impl AssetHolding {
    pub fn validate(&self) -> Result<(), TaxError> {
        for (field, amount) in [
            ("acquisitionCost", self.acquisition_cost),
            ("currentValue", self.current_value),
        ] {
            if amount < Decimal::ZERO {
                return Err(TaxError::NegativeAmount {
                    field: field.to_string(),
                    amount,
                });
            }
        }
        Ok(())
    }
}

/// Holdings flagged for Schedule FA and their total current value
pub fn foreign_assets(holdings: &[AssetHolding]) -> Result<(Vec<AssetHolding>, Decimal), TaxError> {
    let foreign: Vec<_> = holdings.iter().filter(|h| h.schedule_fa).cloned().collect();
    let total = fields::checked_sum("foreignAssets", foreign.iter().map(|h| h.current_value))?;
    Ok((foreign, total))
}

/// Read holdings from a JSON array
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Vec<AssetHolding>> {
    let holdings: Vec<AssetHolding> = serde_json::from_reader(reader)?;
    Ok(holdings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn holding(value: serde_json::Value) -> AssetHolding {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reads_camel_case_holding() {
        let h = holding(json!({
            "assetType": "real-estate",
            "description": "Flat in Dubai",
            "acquisitionDate": "2019-04-01",
            "acquisitionCost": 4500000,
            "currentValue": "6200000",
            "location": "Dubai",
            "scheduleFA": true
        }));
        assert_eq!(h.asset_type, HoldingType::RealEstate);
        assert_eq!(h.acquisition_date, NaiveDate::from_ymd_opt(2019, 4, 1));
        assert_eq!(h.current_value, dec!(6200000));
        assert!(h.schedule_fa);
        assert!(!h.schedule_fsi);
        assert!(h.validate().is_ok());

        let back = serde_json::to_value(&h).unwrap();
        assert_eq!(back["assetType"], "real-estate");
        assert_eq!(back["scheduleFA"], true);
        assert!(back["currentValue"].is_number());
    }

    #[test]
    fn every_holding_type_parses() {
        for name in [
            "real-estate",
            "vehicle",
            "mutual-fund",
            "crypto",
            "gold",
            "bank-deposit",
            "jewelry",
            "other",
        ] {
            let h = holding(json!({"assetType": name}));
            assert_eq!(h.asset_type.as_str(), name);
        }
        let err = serde_json::from_value::<AssetHolding>(json!({"assetType": "listed-share"}));
        assert!(err.is_err());
    }

    #[test]
    fn negative_value_rejected() {
        let h = holding(json!({"assetType": "gold", "currentValue": -1}));
        assert_eq!(
            h.validate(),
            Err(TaxError::NegativeAmount {
                field: "currentValue".to_string(),
                amount: dec!(-1)
            })
        );
    }

    #[test]
    fn foreign_assets_keep_flagged_holdings() {
        let holdings = vec![
            holding(json!({"assetType": "real-estate", "currentValue": 6200000, "scheduleFA": true})),
            holding(json!({"assetType": "bank-deposit", "currentValue": 300000, "scheduleFA": true, "scheduleFSI": true})),
            holding(json!({"assetType": "gold", "currentValue": 900000})),
        ];
        let (foreign, total) = foreign_assets(&holdings).unwrap();
        assert_eq!(foreign.len(), 2);
        assert_eq!(total, dec!(6500000));

        let (none, zero) = foreign_assets(&[]).unwrap();
        assert!(none.is_empty());
        assert_eq!(zero, dec!(0));
    }
}
