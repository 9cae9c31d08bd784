use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One statement line as returned by the extraction service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub raw_description: String,
    #[serde(default)]
    pub money_in: Option<f64>,
    #[serde(default)]
    pub money_out: Option<f64>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub subsubcategory: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Transaction {
    /// Inbound amount, zero when absent or non-positive.
    pub fn amount_in(&self) -> f64 {
        self.money_in.filter(|v| *v > 0.0).unwrap_or(0.0)
    }

    /// Outbound amount, zero when absent or non-positive.
    pub fn amount_out(&self) -> f64 {
        self.money_out.filter(|v| *v > 0.0).unwrap_or(0.0)
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }
}

/// Response body of the statement-extraction service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementPayload {
    #[serde(default)]
    pub bank: String,
    pub transactions: Vec<Transaction>,
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parse the date formats seen on extracted statements. ISO datetimes are
/// reduced to their date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() > 10 && raw.is_char_boundary(10) {
        let (head, tail) = raw.split_at(10);
        if tail.starts_with('T') || tail.starts_with(' ') {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
}

/// Canonical `YYYY-MM` bucket for a date.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Ordinal risk level. Ordering is `None < Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// One tier up, saturating at `High`.
    pub fn escalate(self) -> Self {
        match self {
            Self::None => Self::Low,
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            Self::High
        } else if score >= 40 {
            Self::Medium
        } else if score > 0 {
            Self::Low
        } else {
            Self::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Urgency prefix used on reason strings.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::High => "🔴",
            Self::Medium => "🟠",
            Self::Low => "🟡",
            Self::None => "⚪",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRisk {
    pub flagged: bool,
    pub severity: Severity,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRiskScore {
    pub month_key: String,
    pub score: u8,
    pub severity: Severity,
    pub evidence: Vec<String>,
}

/// Output of one analysis run: per-transaction flags keyed by input index
/// and per-month scores keyed by `YYYY-MM`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    #[serde(rename = "txRisks")]
    pub tx_risks: BTreeMap<usize, TransactionRisk>,
    pub monthly: BTreeMap<String, MonthlyRiskScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_and_uk_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15"), Some(expected));
        assert_eq!(parse_date("15/03/2024"), Some(expected));
        assert_eq!(parse_date("15-03-2024"), Some(expected));
        assert_eq!(parse_date("15 Mar 2024"), Some(expected));
        assert_eq!(parse_date("March 15, 2024"), Some(expected));
        assert_eq!(parse_date("2024-03-15T09:30:00Z"), Some(expected));
        assert_eq!(parse_date(" 2024-03-15 "), Some(expected));
    }

    #[test]
    fn test_parse_invalid_dates() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_month_key_format() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(month_key(d), "2024-03");
    }

    #[test]
    fn test_severity_ordering_and_escalation() {
        assert!(Severity::None < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(Severity::None.escalate(), Severity::Low);
        assert_eq!(Severity::Medium.escalate(), Severity::High);
        assert_eq!(Severity::High.escalate(), Severity::High);
    }

    #[test]
    fn test_severity_from_score_thresholds() {
        assert_eq!(Severity::from_score(0), Severity::None);
        assert_eq!(Severity::from_score(1), Severity::Low);
        assert_eq!(Severity::from_score(39), Severity::Low);
        assert_eq!(Severity::from_score(40), Severity::Medium);
        assert_eq!(Severity::from_score(69), Severity::Medium);
        assert_eq!(Severity::from_score(70), Severity::High);
        assert_eq!(Severity::from_score(100), Severity::High);
    }

    #[test]
    fn test_transaction_ignores_extra_fields() {
        let json = r#"{
            "date": "2024-03-01",
            "description": "ACME LTD SALARY",
            "money_in": 2000.0,
            "money_out": null,
            "balance": 2500.0,
            "currency": "GBP",
            "category": "Income Categories",
            "subcategory": "Salary (PAYE)"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount_in(), 2000.0);
        assert_eq!(tx.amount_out(), 0.0);
        assert!(tx.subsubcategory.is_none());
        assert!(tx.raw_description.is_empty());
    }

    #[test]
    fn test_report_field_names() {
        let mut report = RiskReport::default();
        report.monthly.insert(
            "2024-03".to_string(),
            MonthlyRiskScore {
                month_key: "2024-03".to_string(),
                ..Default::default()
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("txRisks").is_some());
        assert_eq!(json["monthly"]["2024-03"]["monthKey"], "2024-03");
        assert_eq!(json["monthly"]["2024-03"]["severity"], "None");
    }
}
