use rust_decimal::Decimal;

/// Broad classification of engine failures, for callers mapping errors to
/// user-facing messages or status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InvalidConfig,
    UnknownMergeKey,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaxError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("sale date {sale} is before acquisition date {acquisition}")]
    SaleBeforeAcquisition { acquisition: String, sale: String },
    #[error("unknown asset type: {0}")]
    UnknownAssetType(String),
    #[error("negative amount for {field}: {amount}")]
    NegativeAmount { field: String, amount: Decimal },
    #[error("invalid value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
    #[error("exchange rate must be positive for {side}: {rate}")]
    InvalidExchangeRate { side: &'static str, rate: Decimal },
    #[error("amount overflows in {0}")]
    AmountOverflow(String),
    #[error("{0}")]
    MissingComputation(String),
    #[error("invalid slab table: {0}")]
    InvalidSlabTable(String),
    #[error("invalid surcharge brackets: {0}")]
    InvalidSurcharge(String),
    #[error("invalid rules: {0}")]
    InvalidRules(String),
    #[error("no built-in rules for assessment year {0}")]
    UnsupportedYear(String),
    #[error("unknown field '{key}' in {section}")]
    UnknownMergeKey { section: String, key: String },
}

impl TaxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaxError::InvalidDate(_)
            | TaxError::SaleBeforeAcquisition { .. }
            | TaxError::UnknownAssetType(_)
            | TaxError::NegativeAmount { .. }
            | TaxError::InvalidFieldValue { .. }
            | TaxError::InvalidExchangeRate { .. }
            | TaxError::AmountOverflow(_)
            | TaxError::MissingComputation(_) => ErrorKind::InvalidInput,
            TaxError::InvalidSlabTable(_)
            | TaxError::InvalidSurcharge(_)
            | TaxError::InvalidRules(_)
            | TaxError::UnsupportedYear(_) => ErrorKind::InvalidConfig,
            TaxError::UnknownMergeKey { .. } => ErrorKind::UnknownMergeKey,
        }
    }
}
