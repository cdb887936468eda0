//! Indian income tax return engine: slab taxation under both regimes, capital
//! gains classification, return form selection and merging of values extracted
//! from tax documents.

pub mod core;
