//! AML and affordability risk analysis for categorized bank-statement
//! transactions.
//!
//! ```no_run
//! use statement_risk::{analyze_risks, Transaction};
//!
//! let txns: Vec<Transaction> = serde_json::from_str("[]").unwrap();
//! let report = analyze_risks(&txns);
//! for (month, score) in &report.monthly {
//!     println!("{month}: {} ({})", score.score, score.severity);
//! }
//! ```

pub mod analyzer;
pub mod cli;
pub mod error;
pub mod fmt;
pub mod importer;
pub mod keywords;
pub mod models;
mod monthly;
pub mod reports;
pub mod settings;

pub use analyzer::{analyze_risks, RiskAnalyzer};
pub use error::{Result, RiskError};
pub use models::{MonthlyRiskScore, RiskReport, Severity, StatementPayload, Transaction, TransactionRisk};
pub use settings::{Settings, Thresholds};
