use std::collections::BTreeMap;

use crate::models::{month_key, RiskReport, Severity, Transaction};

// ---------------------------------------------------------------------------
// Monthly summary (affordability view)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub month: String,
    pub money_in: f64,
    pub money_out: f64,
    pub net: f64,
    /// Last balance seen for the month, in input order.
    pub closing_balance: Option<f64>,
    pub transactions: usize,
    pub flagged: usize,
    pub score: u8,
    pub severity: Severity,
}

/// Per-month totals for every transaction that made it into `report`.
pub fn monthly_summaries(transactions: &[Transaction], report: &RiskReport) -> Vec<MonthSummary> {
    let mut months: BTreeMap<String, MonthSummary> = BTreeMap::new();

    for (index, risk) in &report.tx_risks {
        let Some(tx) = transactions.get(*index) else {
            continue;
        };
        let Some(date) = tx.parsed_date() else {
            continue;
        };
        let key = month_key(date);
        let entry = months.entry(key.clone()).or_insert_with(|| MonthSummary {
            month: key,
            money_in: 0.0,
            money_out: 0.0,
            net: 0.0,
            closing_balance: None,
            transactions: 0,
            flagged: 0,
            score: 0,
            severity: Severity::None,
        });
        entry.money_in += tx.amount_in();
        entry.money_out += tx.amount_out();
        entry.net = entry.money_in - entry.money_out;
        if tx.balance.is_some() {
            entry.closing_balance = tx.balance;
        }
        entry.transactions += 1;
        if risk.flagged {
            entry.flagged += 1;
        }
    }

    for (key, summary) in months.iter_mut() {
        if let Some(score) = report.monthly.get(key) {
            summary.score = score.score;
            summary.severity = score.severity;
        }
    }

    months.into_values().collect()
}

// ---------------------------------------------------------------------------
// Flagged
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedItem {
    pub index: usize,
    pub date: String,
    pub description: String,
    /// Signed: inbound positive, outbound negative.
    pub amount: f64,
    pub severity: Severity,
    pub reasons: Vec<String>,
}

/// Flagged transactions at or above `min_severity` (any flag when `None`),
/// in input order.
pub fn flagged_transactions(
    transactions: &[Transaction],
    report: &RiskReport,
    min_severity: Option<Severity>,
) -> Vec<FlaggedItem> {
    let floor = min_severity.unwrap_or(Severity::Low).max(Severity::Low);
    report
        .tx_risks
        .iter()
        .filter(|(_, risk)| risk.severity >= floor)
        .filter_map(|(index, risk)| {
            let tx = transactions.get(*index)?;
            Some(FlaggedItem {
                index: *index,
                date: tx.date.clone(),
                description: tx.description.clone(),
                amount: tx.amount_in() - tx.amount_out(),
                severity: risk.severity,
                reasons: risk.reasons.clone(),
            })
        })
        .collect()
}

/// Restrict a report to a single `YYYY-MM` month.
pub fn filter_month(transactions: &[Transaction], report: &RiskReport, month: &str) -> RiskReport {
    let tx_risks = report
        .tx_risks
        .iter()
        .filter(|(index, _)| {
            transactions
                .get(**index)
                .and_then(|tx| tx.parsed_date())
                .is_some_and(|d| month_key(d) == month)
        })
        .map(|(i, r)| (*i, r.clone()))
        .collect();
    let monthly = report
        .monthly
        .iter()
        .filter(|(key, _)| key.as_str() == month)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    RiskReport { tx_risks, monthly }
}
