use super::error::TaxError;
use super::rules::CapitalGainsRules;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    /// Shares listed on an Indian exchange
    #[serde(alias = "indian-share")]
    ListedShare,
    #[serde(alias = "foreign-listed-share")]
    ForeignShare,
    MutualFund,
    Crypto,
    Property,
    Bond,
    Other,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::ListedShare => "listed-share",
            AssetType::ForeignShare => "foreign-share",
            AssetType::MutualFund => "mutual-fund",
            AssetType::Crypto => "crypto",
            AssetType::Property => "property",
            AssetType::Bond => "bond",
            AssetType::Other => "other",
        }
    }

    /// Long-term gains on these are taxed without indexation
    pub fn skips_indexation(&self) -> bool {
        matches!(self, AssetType::ListedShare | AssetType::MutualFund)
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listed-share" | "indian-share" => Ok(AssetType::ListedShare),
            "foreign-share" | "foreign-listed-share" => Ok(AssetType::ForeignShare),
            "mutual-fund" => Ok(AssetType::MutualFund),
            "crypto" => Ok(AssetType::Crypto),
            "property" => Ok(AssetType::Property),
            "bond" => Ok(AssetType::Bond),
            "other" => Ok(AssetType::Other),
            _ => Err(TaxError::UnknownAssetType(s.to_string())),
        }
    }
}

/// How the cost and proceeds of a sale were given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Consideration {
    /// Rupee totals
    #[serde(rename_all = "camelCase")]
    Local {
        #[schemars(with = "f64")]
        acquisition_cost: Decimal,
        #[schemars(with = "f64")]
        sale_proceeds: Decimal,
    },
    /// Per-unit prices in a foreign currency with the rupee rate on each date
    #[serde(rename_all = "camelCase")]
    Foreign {
        #[schemars(with = "f64")]
        quantity: Decimal,
        #[schemars(with = "f64")]
        buy_price: Decimal,
        #[schemars(with = "f64")]
        buy_exchange_rate: Decimal,
        #[schemars(with = "f64")]
        sell_price: Decimal,
        #[schemars(with = "f64")]
        sell_exchange_rate: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
}

impl Consideration {
    /// (acquisition cost, sale proceeds) in rupees
    pub fn local_amounts(&self) -> Result<(Decimal, Decimal), TaxError> {
        match self {
            Consideration::Local {
                acquisition_cost,
                sale_proceeds,
            } => Ok((*acquisition_cost, *sale_proceeds)),
            Consideration::Foreign {
                quantity,
                buy_price,
                buy_exchange_rate,
                sell_price,
                sell_exchange_rate,
                ..
            } => Ok((
                converted("acquisitionCost", *quantity, *buy_price, *buy_exchange_rate)?,
                converted("saleProceeds", *quantity, *sell_price, *sell_exchange_rate)?,
            )),
        }
    }

    fn validate(&self) -> Result<(), TaxError> {
        match self {
            Consideration::Local {
                acquisition_cost,
                sale_proceeds,
            } => {
                non_negative("acquisitionCost", *acquisition_cost)?;
                non_negative("saleProceeds", *sale_proceeds)
            }
            Consideration::Foreign {
                quantity,
                buy_price,
                buy_exchange_rate,
                sell_price,
                sell_exchange_rate,
                ..
            } => {
                non_negative("quantity", *quantity)?;
                non_negative("buyPrice", *buy_price)?;
                non_negative("sellPrice", *sell_price)?;
                positive_rate("buy", *buy_exchange_rate)?;
                positive_rate("sell", *sell_exchange_rate)
            }
        }
    }
}

/// One sale as supplied by the caller, in JSON or as a CSV row.
///
/// Either `acquisitionCost` and `saleProceeds` are given, or all of `quantity`,
/// `buyPrice`, `buyExchangeRate`, `sellPrice` and `sellExchangeRate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGainInput {
    pub asset_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    pub acquisition_date: String,
    pub sale_date: String,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub acquisition_cost: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub sale_proceeds: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub buy_price: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub buy_exchange_rate: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub sell_price: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub sell_exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Section 54/54F style exemption claimed against this gain
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub exempted_amount: Option<Decimal>,
    /// Cost inflation factor for indexed long-term gains
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub indexation_factor: Option<Decimal>,
}

impl CapitalGainInput {
    fn consideration(&self) -> Result<Consideration, TaxError> {
        let foreign = [
            self.quantity,
            self.buy_price,
            self.buy_exchange_rate,
            self.sell_price,
            self.sell_exchange_rate,
        ];
        if foreign.iter().any(Option::is_some) {
            let require = |value: Option<Decimal>, field: &str| {
                value.ok_or_else(|| TaxError::InvalidFieldValue {
                    field: field.to_string(),
                    reason: "required for a foreign-currency sale".to_string(),
                })
            };
            return Ok(Consideration::Foreign {
                quantity: require(self.quantity, "quantity")?,
                buy_price: require(self.buy_price, "buyPrice")?,
                buy_exchange_rate: require(self.buy_exchange_rate, "buyExchangeRate")?,
                sell_price: require(self.sell_price, "sellPrice")?,
                sell_exchange_rate: require(self.sell_exchange_rate, "sellExchangeRate")?,
                currency: self.currency.clone(),
            });
        }
        match (self.acquisition_cost, self.sale_proceeds) {
            (Some(acquisition_cost), Some(sale_proceeds)) => Ok(Consideration::Local {
                acquisition_cost,
                sale_proceeds,
            }),
            (None, _) => Err(TaxError::InvalidFieldValue {
                field: "acquisitionCost".to_string(),
                reason: "missing".to_string(),
            }),
            (_, None) => Err(TaxError::InvalidFieldValue {
                field: "saleProceeds".to_string(),
                reason: "missing".to_string(),
            }),
        }
    }
}

/// A classified sale. Amounts are rupees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGainEntry {
    pub asset_type: AssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub acquisition_date: DateTime<FixedOffset>,
    pub sale_date: DateTime<FixedOffset>,
    pub consideration: Consideration,
    pub holding_period_days: i64,
    pub is_long_term: bool,
    #[schemars(with = "f64")]
    pub acquisition_cost: Decimal,
    #[schemars(with = "f64")]
    pub sale_proceeds: Decimal,
    /// Gain after indexation; negative for a loss
    #[schemars(with = "f64")]
    pub capital_gain: Decimal,
    #[schemars(with = "f64")]
    pub indexation_benefit: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub exempted_amount: Decimal,
    #[schemars(with = "f64")]
    pub taxable_capital_gain: Decimal,
    /// Advisory tax collected at source; not credited anywhere
    #[schemars(with = "f64")]
    pub withholding_estimate: Decimal,
}

impl CapitalGainEntry {
    /// Classify a sale: holding period, gain and advisory withholding.
    pub fn from_input(
        input: &CapitalGainInput,
        rules: &CapitalGainsRules,
    ) -> Result<Self, TaxError> {
        let asset_type: AssetType = input.asset_type.parse()?;
        let acquisition_date = parse_date(&input.acquisition_date)?;
        let sale_date = parse_date(&input.sale_date)?;
        let holding_period_days = holding_period_days(acquisition_date, sale_date)?;
        let is_long_term = holding_period_days > rules.long_term_after_days;

        let consideration = input.consideration()?;
        consideration.validate()?;
        let (acquisition_cost, sale_proceeds) = consideration.local_amounts()?;

        let factor = input
            .indexation_factor
            .unwrap_or(rules.default_indexation_factor);
        if factor <= Decimal::ZERO {
            return Err(TaxError::InvalidFieldValue {
                field: "indexationFactor".to_string(),
                reason: format!("{factor} must be positive"),
            });
        }
        let exempted_amount = input.exempted_amount.unwrap_or_default();
        non_negative("exemptedAmount", exempted_amount)?;

        let (capital_gain, indexation_benefit) = compute_gain(
            asset_type,
            is_long_term,
            acquisition_cost,
            sale_proceeds,
            factor,
        )?;
        let taxable_capital_gain = if capital_gain > Decimal::ZERO {
            (capital_gain - exempted_amount).max(Decimal::ZERO)
        } else {
            capital_gain
        };
        let withholding_estimate = estimate_withholding(sale_proceeds, asset_type, rules);

        log::debug!(
            "{} {}: held {} days ({}), gain {}",
            asset_type,
            input.symbol.as_deref().unwrap_or("-"),
            holding_period_days,
            if is_long_term { "long-term" } else { "short-term" },
            capital_gain
        );

        Ok(CapitalGainEntry {
            asset_type,
            description: input.description.clone(),
            symbol: input.symbol.clone(),
            acquisition_date,
            sale_date,
            consideration,
            holding_period_days,
            is_long_term,
            acquisition_cost,
            sale_proceeds,
            capital_gain,
            indexation_benefit,
            exempted_amount,
            taxable_capital_gain,
            withholding_estimate,
        })
    }

    pub fn is_loss(&self) -> bool {
        self.capital_gain < Decimal::ZERO
    }
}

/// Whole days between acquisition and sale, rounded down
pub fn holding_period_days(
    acquisition: DateTime<FixedOffset>,
    sale: DateTime<FixedOffset>,
) -> Result<i64, TaxError> {
    if sale < acquisition {
        return Err(TaxError::SaleBeforeAcquisition {
            acquisition: acquisition.to_rfc3339(),
            sale: sale.to_rfc3339(),
        });
    }
    Ok((sale - acquisition).num_days())
}

/// Returns (capital gain, indexation benefit).
///
/// Long-term gains on assets other than listed shares and mutual funds use the
/// indexed cost and never go below zero. Everything else is a plain difference.
pub fn compute_gain(
    asset_type: AssetType,
    is_long_term: bool,
    acquisition_cost: Decimal,
    sale_proceeds: Decimal,
    indexation_factor: Decimal,
) -> Result<(Decimal, Decimal), TaxError> {
    if is_long_term && !asset_type.skips_indexation() {
        let indexed_cost = acquisition_cost
            .checked_mul(indexation_factor)
            .ok_or_else(|| TaxError::AmountOverflow("indexedCost".to_string()))?;
        let gain = (sale_proceeds - indexed_cost).max(Decimal::ZERO);
        Ok((gain, indexed_cost - acquisition_cost))
    } else {
        Ok((sale_proceeds - acquisition_cost, Decimal::ZERO))
    }
}

/// Advisory tax collected at source on a sale
pub fn estimate_withholding(
    sale_amount: Decimal,
    asset_type: AssetType,
    rules: &CapitalGainsRules,
) -> Decimal {
    match asset_type {
        AssetType::Crypto => sale_amount * rules.crypto_withholding_rate,
        AssetType::ForeignShare => sale_amount * rules.foreign_share_withholding_rate,
        _ => Decimal::ZERO,
    }
}

/// Parse an RFC 3339 timestamp or a plain date/time; plain values are taken as UTC
pub fn parse_date(s: &str) -> Result<DateTime<FixedOffset>, TaxError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset());
    }
    Err(TaxError::InvalidDate(s.to_string()))
}

/// quantity * price * rate, in rupees
fn converted(field: &str, quantity: Decimal, price: Decimal, rate: Decimal) -> Result<Decimal, TaxError> {
    quantity
        .checked_mul(price)
        .and_then(|amount| amount.checked_mul(rate))
        .ok_or_else(|| TaxError::AmountOverflow(field.to_string()))
}

fn non_negative(field: &str, amount: Decimal) -> Result<(), TaxError> {
    if amount < Decimal::ZERO {
        return Err(TaxError::NegativeAmount {
            field: field.to_string(),
            amount,
        });
    }
    Ok(())
}

fn positive_rate(side: &'static str, rate: Decimal) -> Result<(), TaxError> {
    if rate <= Decimal::ZERO {
        return Err(TaxError::InvalidExchangeRate { side, rate });
    }
    Ok(())
}

/// Totals over a batch of classified sales
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGainsSummary {
    pub entries: usize,
    /// Taxable short-term gains
    #[schemars(with = "f64")]
    pub short_term_gains: Decimal,
    /// Taxable long-term gains
    #[schemars(with = "f64")]
    pub long_term_gains: Decimal,
    /// Losses, as a positive amount, available to carry forward
    #[schemars(with = "f64")]
    pub losses: Decimal,
    #[schemars(with = "f64")]
    pub foreign_share_gains: Decimal,
    #[schemars(with = "f64")]
    pub withholding_estimate: Decimal,
}

impl CapitalGainsSummary {
    pub fn from_entries(entries: &[CapitalGainEntry]) -> Result<Self, TaxError> {
        let mut summary = CapitalGainsSummary {
            entries: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            if entry.is_loss() {
                accumulate(&mut summary.losses, -entry.capital_gain, "losses")?;
            } else if entry.is_long_term {
                accumulate(&mut summary.long_term_gains, entry.taxable_capital_gain, "longTermGains")?;
            } else {
                accumulate(&mut summary.short_term_gains, entry.taxable_capital_gain, "shortTermGains")?;
            }
            if entry.asset_type == AssetType::ForeignShare {
                accumulate(&mut summary.foreign_share_gains, entry.capital_gain, "foreignShareGains")?;
            }
            accumulate(&mut summary.withholding_estimate, entry.withholding_estimate, "withholdingEstimate")?;
        }
        Ok(summary)
    }

    /// What the batch adds to the capital gains income head
    pub fn taxable_total(&self) -> Result<Decimal, TaxError> {
        self.short_term_gains
            .checked_add(self.long_term_gains)
            .ok_or_else(|| TaxError::AmountOverflow("capitalGains".to_string()))
    }
}

fn accumulate(total: &mut Decimal, amount: Decimal, field: &str) -> Result<(), TaxError> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| TaxError::AmountOverflow(field.to_string()))?;
    Ok(())
}

/// Read sales from CSV with camelCase headers matching [`CapitalGainInput`]
pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Vec<CapitalGainInput>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let records: Result<Vec<CapitalGainInput>, _> = rdr.deserialize().collect();
    Ok(records?)
}

/// Read sales from a JSON array
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Vec<CapitalGainInput>> {
    let inputs: Vec<CapitalGainInput> = serde_json::from_reader(reader)?;
    Ok(inputs)
}
