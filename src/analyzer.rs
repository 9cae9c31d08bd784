//! Single-pass AML risk analysis over an ordered list of statement
//! transactions.
//!
//! Transactions are evaluated in the order given. Frequency checks ("the
//! fourth gambling payment this month") only see transactions up to and
//! including the current one, so a spree escalates as it continues rather
//! than every member being judged by the month's final total.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::fmt::{money, pct};
use crate::keywords::{Classifier, Fact, TransactionFacts};
use crate::models::{month_key, RiskReport, Severity, Transaction, TransactionRisk};
use crate::monthly::{score_month, DayTotals, MonthState};
use crate::settings::{Settings, Thresholds};

/// Severity and reasons accumulated for one transaction. Severity only
/// moves upward.
#[derive(Debug, Default)]
struct Assessment {
    severity: Severity,
    reasons: Vec<String>,
}

impl Assessment {
    /// Raise to at least `floor`.
    fn raise(&mut self, floor: Severity, reason: String) {
        self.severity = self.severity.max(floor);
        self.reasons.push(format!("{} {reason}", floor.marker()));
    }

    /// Move one tier up.
    fn escalate(&mut self, reason: String) {
        self.severity = self.severity.escalate();
        self.reasons.push(format!("{} {reason}", self.severity.marker()));
    }

    /// At least Low; a Low rating becomes Medium.
    fn nudge(&mut self, reason: String) {
        let to = match self.severity {
            Severity::None => Severity::Low,
            Severity::Low => Severity::Medium,
            other => other,
        };
        self.raise(to, reason);
    }

    /// Raise to `floor`, or one tier past it when already there.
    fn raise_or_escalate(&mut self, floor: Severity, reason: String) {
        if self.severity >= floor {
            self.escalate(reason);
        } else {
            self.raise(floor, reason);
        }
    }

    fn note(&mut self, reason: String) {
        self.reasons.push(format!("{} {reason}", self.severity.marker()));
    }

    fn into_risk(self) -> TransactionRisk {
        TransactionRisk {
            flagged: self.severity != Severity::None,
            severity: self.severity,
            reasons: self.reasons,
        }
    }
}

/// `part` is at least `percent`% of `whole`.
fn share_at_least(part: f64, whole: f64, percent: f64) -> bool {
    part * 100.0 >= percent * whole
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub struct RiskAnalyzer {
    classifier: Classifier,
    thresholds: Thresholds,
}

impl RiskAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            classifier: Classifier::new(),
            thresholds,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            classifier: Classifier::with_rules(&settings.keyword_rules),
            thresholds: settings.thresholds.clone(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Score every transaction with a valid date and every month they fall
    /// in. Transactions whose date does not parse are skipped with a warning
    /// and appear in neither map.
    pub fn analyze(&self, transactions: &[Transaction]) -> RiskReport {
        let mut months: BTreeMap<String, MonthState> = BTreeMap::new();
        let mut known_payees: HashSet<String> = HashSet::new();
        let mut tx_risks = BTreeMap::new();
        let mut skipped = 0usize;

        for (index, tx) in transactions.iter().enumerate() {
            let Some(date) = tx.parsed_date() else {
                warn!(index, date = %tx.date, "skipping transaction with invalid date");
                skipped += 1;
                continue;
            };
            let month = months
                .entry(month_key(date))
                .or_insert_with(|| MonthState::new(date));
            let facts = self.classifier.classify(tx);
            let risk = self.evaluate(tx, date, &facts, month, &mut known_payees);
            if risk.flagged {
                debug!(index, severity = %risk.severity, reasons = risk.reasons.len(), "transaction flagged");
            }
            month.severities.push(risk.severity);
            tx_risks.insert(index, risk);
        }

        let monthly: BTreeMap<_, _> = months
            .iter()
            .map(|(key, month)| (key.clone(), score_month(key, month, &self.thresholds)))
            .collect();

        info!(
            transactions = transactions.len(),
            skipped,
            flagged = tx_risks.values().filter(|r| r.flagged).count(),
            months = monthly.len(),
            "risk analysis complete"
        );

        RiskReport { tx_risks, monthly }
    }

    fn evaluate(
        &self,
        tx: &Transaction,
        date: NaiveDate,
        facts: &TransactionFacts,
        month: &mut MonthState,
        known_payees: &mut HashSet<String>,
    ) -> TransactionRisk {
        let amount_in = tx.amount_in();
        let amount_out = tx.amount_out();

        let day = month.days.entry(date).or_default();
        day.money_in += amount_in;
        day.money_out += amount_out;
        if tx.balance.is_some() {
            day.closing_balance = tx.balance;
        }
        let day = *day;

        if amount_in > 0.0 && facts.has(Fact::Salary) {
            month.salary_dates.push(date);
        }

        let mut a = Assessment::default();
        let is_cash_deposit = amount_in > 0.0 && facts.has(Fact::CashDeposit);
        let is_crypto = amount_out > 0.0 && facts.has(Fact::Crypto);

        if amount_out > 0.0 && facts.has(Fact::PaydayLoan) {
            a.raise(
                Severity::High,
                format!("High-cost credit: payment of {} to payday lender", money(amount_out)),
            );
        }
        if amount_out > 0.0 && facts.has(Fact::Gambling) {
            self.check_gambling(&mut a, amount_out, date, month);
        }
        if is_cash_deposit {
            self.check_cash_deposit(&mut a, amount_in, facts, month);
        }
        if is_crypto {
            self.check_crypto(&mut a, amount_out, facts);
        }
        if amount_out > 0.0 && facts.has(Fact::Transfer) && !is_crypto {
            self.check_transfer(&mut a, tx, amount_out, facts, month, known_payees);
        }
        if amount_out > 0.0 && facts.has(Fact::Luxury) {
            self.check_luxury(&mut a, amount_out, facts, month);
        }
        if amount_in > 0.0 || amount_out > 0.0 {
            self.check_pass_through(&mut a, &day, amount_in - amount_out);
        }

        if amount_in > 0.0 && !is_cash_deposit {
            month.income += amount_in;
        }

        a.into_risk()
    }

    fn check_gambling(&self, a: &mut Assessment, amount: f64, date: NaiveDate, month: &mut MonthState) {
        month.gambling_out += amount;
        month.gambling_count += 1;
        let count = month.gambling_count;
        let income = month.income;

        if income <= 0.0 {
            a.raise(
                Severity::High,
                format!("Gambling spend of {} with no income recorded this month", money(amount)),
            );
        } else {
            let share = pct(amount / income * 100.0);
            if share_at_least(amount, income, 15.0) {
                a.raise(
                    Severity::High,
                    format!("Gambling spend of {} is {share} of income (over 15%)", money(amount)),
                );
            } else if share_at_least(amount, income, 10.0) {
                a.raise(
                    Severity::Medium,
                    format!("Gambling spend of {} is {share} of income (over 10%)", money(amount)),
                );
            } else if share_at_least(amount, income, 5.0) {
                a.raise(
                    Severity::Low,
                    format!("Gambling spend of {} is {share} of income (over 5%)", money(amount)),
                );
            } else {
                a.raise(
                    Severity::Low,
                    format!("Gambling transaction of {} ({share} of income)", money(amount)),
                );
            }
        }

        if count > 4 {
            a.raise(
                Severity::High,
                format!("{} this month", plural(count, "gambling transaction")),
            );
        } else if count > 3 {
            a.escalate(format!("{} this month", plural(count, "gambling transaction")));
        }

        let window = self.thresholds.salary_burst_days;
        if let Some(salary) = month.salary_dates.iter().find(|s| {
            let days = (date - **s).num_days();
            (0..=window).contains(&days)
        }) {
            a.escalate(format!(
                "Salary burst: gambling within {window} days of salary credit on {salary}"
            ));
        }
    }

    fn check_cash_deposit(
        &self,
        a: &mut Assessment,
        amount: f64,
        facts: &TransactionFacts,
        month: &mut MonthState,
    ) {
        let t = &self.thresholds;
        month.cash_deposits.push(amount);
        let count = month.cash_deposits.len();

        if amount >= t.large_cash_deposit {
            a.raise(
                Severity::High,
                format!("Large cash deposit of {} (at least {})", money(amount), money(t.large_cash_deposit)),
            );
        }
        if month.income > 0.0 && share_at_least(amount, month.income, t.cash_income_pct) {
            a.raise(
                Severity::Medium,
                format!(
                    "Cash deposit of {} is {} of income this month",
                    money(amount),
                    pct(amount / month.income * 100.0)
                ),
            );
        }
        if amount >= t.structuring_floor && amount <= t.structuring_ceiling {
            a.raise(
                Severity::High,
                format!(
                    "Structuring risk: cash deposit of {} between {} and {}",
                    money(amount),
                    money(t.structuring_floor),
                    money(t.structuring_ceiling)
                ),
            );
        } else if amount >= t.near_threshold_floor && amount < t.structuring_floor {
            a.raise_or_escalate(
                Severity::Medium,
                format!(
                    "Near-threshold cash deposit of {} between {} and {}",
                    money(amount),
                    money(t.near_threshold_floor),
                    money(t.structuring_floor)
                ),
            );
        }

        if count > 3 {
            a.raise(Severity::High, format!("{} this month", plural(count, "cash deposit")));
        } else if count > 2 {
            a.raise(Severity::Medium, format!("{} this month", plural(count, "cash deposit")));
        }

        if amount >= t.unexplained_cash_deposit && !facts.has(Fact::CashExplained) {
            a.raise(
                Severity::Low,
                format!("Unexplained cash deposit of {}", money(amount)),
            );
        }
    }

    fn check_crypto(&self, a: &mut Assessment, amount: f64, facts: &TransactionFacts) {
        let t = &self.thresholds;
        let platform = facts.keyword(Fact::Crypto).unwrap_or("crypto exchange");

        if amount >= t.crypto_high {
            a.raise(
                Severity::High,
                format!("Large transfer of {} to crypto platform {platform}", money(amount)),
            );
        } else if amount >= t.crypto_medium {
            a.raise(
                Severity::Medium,
                format!("Transfer of {} to crypto platform {platform}", money(amount)),
            );
        } else {
            a.raise(
                Severity::Low,
                format!("Payment of {} to crypto platform {platform}", money(amount)),
            );
        }

        if facts.has(Fact::TradingPlatform) {
            a.note(format!("{platform} is a trading platform; funds may be held as investments"));
        }
        if amount >= t.crypto_very_high {
            a.raise(
                Severity::High,
                format!("Crypto transfer of {} exceeds {}", money(amount), money(t.crypto_very_high)),
            );
        }
    }

    fn check_transfer(
        &self,
        a: &mut Assessment,
        tx: &Transaction,
        amount: f64,
        facts: &TransactionFacts,
        month: &mut MonthState,
        known_payees: &mut HashSet<String>,
    ) {
        let t = &self.thresholds;
        let payee = tx.description.trim().to_string();
        let to_payee = month.transfers_by_payee.entry(payee.clone()).or_insert(0);
        *to_payee += 1;
        let to_payee = *to_payee;
        month.transfer_out += amount;

        if facts.has(Fact::International) && amount >= t.international_transfer {
            a.raise(
                Severity::High,
                format!("International transfer of {}", money(amount)),
            );
            if let Some(place) = facts.keyword(Fact::HighRiskJurisdiction) {
                a.escalate(format!("Destination matches high-risk jurisdiction ({place})"));
            }
        }

        if !known_payees.contains(&payee) && amount >= t.new_payee {
            let floor = if amount >= t.new_payee_high {
                Severity::High
            } else {
                Severity::Medium
            };
            a.raise(floor, format!("Transfer of {} to new payee", money(amount)));
        }

        if amount >= t.round_amount && amount % 1_000.0 == 0.0 {
            a.nudge(format!("Round-number transfer of {}", money(amount)));
        }

        if to_payee > 3 && amount >= t.repeated_payee_amount {
            a.raise(
                Severity::High,
                format!("{} to the same payee this month", plural(to_payee, "transfer")),
            );
        }

        if amount >= t.unexplained_transfer && !facts.has(Fact::TransferPurpose) {
            a.nudge(format!("Transfer of {} with no stated purpose", money(amount)));
        }

        known_payees.insert(payee);
    }

    fn check_luxury(&self, a: &mut Assessment, amount: f64, facts: &TransactionFacts, month: &MonthState) {
        let t = &self.thresholds;
        if amount <= t.luxury_purchase {
            return;
        }
        let brand = facts.keyword(Fact::Luxury).unwrap_or("luxury brand");
        if month.income <= 0.0 || amount * 100.0 > t.luxury_income_pct * month.income {
            let share = if month.income > 0.0 {
                format!("{} of income", pct(amount / month.income * 100.0))
            } else {
                "no income recorded".to_string()
            };
            a.raise(
                Severity::High,
                format!("Lifestyle mismatch: {} at {brand} ({share})", money(amount)),
            );
        } else {
            // Affordable luxury still counts toward the month, at the lowest tier.
            a.raise(
                Severity::Low,
                format!("Luxury purchase of {} at {brand}", money(amount)),
            );
        }
    }

    /// `net` is the current transaction's own in minus out.
    fn check_pass_through(&self, a: &mut Assessment, day: &DayTotals, net: f64) {
        let t = &self.thresholds;
        if day.is_pass_through(t) && net.abs() < t.pass_through_difference {
            a.raise(
                Severity::High,
                format!(
                    "Pass-through: {} in and {} out on the same day",
                    money(day.money_in),
                    money(day.money_out)
                ),
            );
        }
    }
}

impl Default for RiskAnalyzer {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

/// Analyze with the default thresholds and keyword table.
pub fn analyze_risks(transactions: &[Transaction]) -> RiskReport {
    RiskAnalyzer::default().analyze(transactions)
}
