pub mod assets;
pub mod capital_gains;
pub mod compare;
pub mod error;
pub mod fields;
pub mod filing;
pub mod itr;
pub mod merge;
pub mod regime;
pub mod rules;
pub mod slab;
pub mod surcharge;
pub mod tax_return;
pub mod validation;

// Flat public surface for domain types and functions.
pub use assets::{foreign_assets, AssetHolding, HoldingType};
pub use capital_gains::{
    estimate_withholding, holding_period_days, parse_date, AssetType, CapitalGainEntry,
    CapitalGainInput, CapitalGainsSummary, Consideration,
};
pub use compare::{compare_regimes, RegimeComparison};
pub use error::{ErrorKind, TaxError};
pub use fields::{FieldSpec, Fields};
pub use filing::{
    generate_filing, Filing, FilingDocument, ScheduleBp, ScheduleCa, ScheduleFa, ScheduleFsi,
};
pub use itr::{select_itr, ItrProfile, ItrSelection, ItrType, Schedule};
pub use merge::{merge, merge_extracted, ExtractedFieldMap, Fragment, MergePolicy, Section};
pub use regime::{
    compute_regime, round_rupees, DeductionSet, IncomeProfile, Regime, RegimeResult, TaxCredits,
};
pub use rules::{load_rules, AssessmentYear, CapitalGainsRules, RuleSet};
pub use slab::{compute_tax, Slab, SlabTable};
pub use surcharge::{compute_surcharge, SurchargeBracket, SurchargeSchedule};
pub use tax_return::{PersonalInfo, RefundDetails, ReturnStatus, TaxComputation, TaxReturn};
pub use validation::{validate_return, Issue, Severity, ValidationReport};
