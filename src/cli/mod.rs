pub mod analyze;
pub mod config;
pub mod flagged;
pub mod summary;

use std::path::Path;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use comfy_table::Cell;

use crate::analyzer::RiskAnalyzer;
use crate::error::{Result, RiskError};
use crate::importer::load_statement;
use crate::models::{RiskReport, Severity, StatementPayload};
use crate::settings::load_settings;

#[derive(Parser)]
#[command(
    name = "statement-risk",
    version,
    about = "AML and affordability risk analysis for bank-statement transactions."
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a statement and print per-transaction flags and monthly scores.
    Analyze {
        /// Statement file (.json payload or array, or .csv)
        file: String,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Only show one month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Input format key (json, csv); detected from the extension by default
        #[arg(long = "input-format")]
        input_format: Option<String>,
    },
    /// List flagged transactions.
    Flagged {
        /// Statement file (.json payload or array, or .csv)
        file: String,
        /// Minimum severity to list: low, medium, high
        #[arg(long = "min-severity")]
        min_severity: Option<Severity>,
        /// Input format key (json, csv)
        #[arg(long = "input-format")]
        input_format: Option<String>,
    },
    /// Monthly money in/out alongside each month's risk score.
    Summary {
        /// Statement file (.json payload or array, or .csv)
        file: String,
        /// Input format key (json, csv)
        #[arg(long = "input-format")]
        input_format: Option<String>,
    },
    /// Show the settings file location and effective thresholds.
    Config {
        /// Write the default settings file if none exists
        #[arg(long)]
        init: bool,
    },
}

pub(crate) fn parse_month_opt(month: &Option<String>) -> Result<Option<String>> {
    let Some(m) = month else {
        return Ok(None);
    };
    let valid = chrono::NaiveDate::parse_from_str(&format!("{m}-01"), "%Y-%m-%d").is_ok();
    if !valid || m.len() != 7 {
        return Err(RiskError::Other(format!("--month must be YYYY-MM, got '{m}'")));
    }
    Ok(Some(m.clone()))
}

/// Load a statement and analyze it with the user's settings.
pub(crate) fn load_and_analyze(
    file: &str,
    input_format: Option<&str>,
) -> Result<(StatementPayload, RiskReport)> {
    let payload = load_statement(Path::new(file), input_format)?;
    let analyzer = RiskAnalyzer::from_settings(&load_settings());
    let report = analyzer.analyze(&payload.transactions);
    Ok((payload, report))
}

pub(crate) fn severity_cell(severity: Severity) -> Cell {
    let label = severity.as_str();
    Cell::new(match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.cyan().to_string(),
        Severity::None => label.dimmed().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_opt() {
        assert_eq!(parse_month_opt(&None).unwrap(), None);
        assert_eq!(
            parse_month_opt(&Some("2024-03".to_string())).unwrap(),
            Some("2024-03".to_string())
        );
        assert!(parse_month_opt(&Some("2024-13".to_string())).is_err());
        assert!(parse_month_opt(&Some("March".to_string())).is_err());
        assert!(parse_month_opt(&Some("2024-3".to_string())).is_err());
    }

    #[test]
    fn test_cli_parses_min_severity() {
        let cli = Cli::try_parse_from(["statement-risk", "flagged", "s.json", "--min-severity", "high"]).unwrap();
        match cli.command {
            Commands::Flagged { min_severity, .. } => assert_eq!(min_severity, Some(Severity::High)),
            _ => panic!("expected flagged command"),
        }
    }

    #[test]
    fn test_cli_verbose_is_global() {
        let cli = Cli::try_parse_from(["statement-risk", "summary", "s.csv", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
