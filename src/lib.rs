//! Crop rotation planning: constraint-pruned search over multi-year
//! sequences, yield and economic estimation, sustainability and risk
//! scoring, and side-by-side plan comparison.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logic;
pub mod models;

pub use config::Config;
pub use db::Database;
pub use engine::{
    FieldLookup, GenerateRequest, InMemoryFields, RiskAssessment, RotationEngine, SequenceScore,
};
pub use error::{Result, RotaplanError};
