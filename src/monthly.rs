use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::fmt::{money, pct};
use crate::models::{MonthlyRiskScore, Severity};
use crate::settings::Thresholds;

const HIGH_TX_POINTS: u32 = 40;
const MEDIUM_TX_POINTS: u32 = 20;
const LOW_TX_POINTS: u32 = 8;
const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct DayTotals {
    pub money_in: f64,
    pub money_out: f64,
    /// Balance after the day's last transaction that carried one.
    pub closing_balance: Option<f64>,
}

impl DayTotals {
    /// Same-day inflow and outflow of similar size over a minimum total.
    pub fn is_pass_through(&self, t: &Thresholds) -> bool {
        if self.money_in <= 0.0 || self.money_out <= 0.0 {
            return false;
        }
        let lo = self.money_in.min(self.money_out);
        let hi = self.money_in.max(self.money_out);
        lo >= t.pass_through_ratio * hi && self.money_in + self.money_out >= t.pass_through_total
    }

    pub fn is_overdrawn(&self) -> bool {
        self.closing_balance.is_some_and(|b| b < 0.0)
    }
}

/// Running aggregates for one calendar month, filled in input order.
#[derive(Debug, Clone)]
pub(crate) struct MonthState {
    pub days_in_month: u32,
    /// Inbound amounts other than cash deposits.
    pub income: f64,
    pub gambling_out: f64,
    pub gambling_count: usize,
    pub cash_deposits: Vec<f64>,
    pub transfer_out: f64,
    pub transfers_by_payee: HashMap<String, usize>,
    pub salary_dates: Vec<NaiveDate>,
    pub days: BTreeMap<NaiveDate, DayTotals>,
    /// Final severity of each member transaction.
    pub severities: Vec<Severity>,
}

impl MonthState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            days_in_month: days_in_month(date),
            income: 0.0,
            gambling_out: 0.0,
            gambling_count: 0,
            cash_deposits: Vec::new(),
            transfer_out: 0.0,
            transfers_by_payee: HashMap::new(),
            salary_dates: Vec::new(),
            days: BTreeMap::new(),
            severities: Vec::new(),
        }
    }

    fn count(&self, severity: Severity) -> u32 {
        self.severities.iter().filter(|s| **s == severity).count() as u32
    }
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Additive score for a completed month, capped at 100.
pub(crate) fn score_month(month_key: &str, month: &MonthState, t: &Thresholds) -> MonthlyRiskScore {
    let mut score = 0u32;
    let mut evidence = Vec::new();

    for (severity, points) in [
        (Severity::High, HIGH_TX_POINTS),
        (Severity::Medium, MEDIUM_TX_POINTS),
        (Severity::Low, LOW_TX_POINTS),
    ] {
        let n = month.count(severity);
        if n > 0 {
            score += n * points;
            evidence.push(format!(
                "{n} {}-risk transaction{} (+{})",
                severity.as_str().to_lowercase(),
                if n == 1 { "" } else { "s" },
                n * points
            ));
        }
    }

    if month.gambling_out > 0.0 {
        if month.income <= 0.0 {
            score += 50;
            evidence.push(format!(
                "Gambling of {} with no income this month (+50)",
                money(month.gambling_out)
            ));
        } else {
            let share = month.gambling_out / month.income * 100.0;
            if month.gambling_out * 100.0 >= 20.0 * month.income {
                score += 50;
                evidence.push(format!("Gambling is {} of income (+50)", pct(share)));
            } else if month.gambling_out * 100.0 >= 10.0 * month.income {
                score += 25;
                evidence.push(format!("Gambling is {} of income (+25)", pct(share)));
            }
        }
    }

    if let Some(max) = month
        .cash_deposits
        .iter()
        .copied()
        .filter(|a| *a >= t.structuring_floor)
        .reduce(f64::max)
    {
        score += 45;
        evidence.push(format!(
            "Cash deposit of {} at or above {} (+45)",
            money(max),
            money(t.structuring_floor)
        ));
    }

    let near = month
        .cash_deposits
        .iter()
        .filter(|a| **a >= t.near_threshold_floor && **a < t.structuring_floor)
        .count();
    if near >= 3 {
        score += 30;
        evidence.push(format!(
            "{near} cash deposits between {} and {} (+30)",
            money(t.near_threshold_floor),
            money(t.structuring_floor)
        ));
    }

    if month.transfer_out >= t.monthly_transfer_volume {
        score += 20;
        evidence.push(format!(
            "Outbound transfers total {} (+20)",
            money(month.transfer_out)
        ));
    }

    let negative_days = month.days.values().filter(|d| d.is_overdrawn()).count();
    let overdrawn = negative_days as f64 / f64::from(month.days_in_month);
    if overdrawn > 0.5 {
        score += 35;
        evidence.push(format!(
            "Overdrawn on {negative_days} of {} days (+35)",
            month.days_in_month
        ));
    } else if overdrawn > 0.25 {
        score += 15;
        evidence.push(format!(
            "Overdrawn on {negative_days} of {} days (+15)",
            month.days_in_month
        ));
    }

    let pass_days = month.days.values().filter(|d| d.is_pass_through(t)).count();
    if pass_days >= 3 {
        score += 25;
        evidence.push(format!("{pass_days} pass-through days (+25)"));
    }

    if score > MAX_SCORE {
        debug!(month = month_key, raw = score, "capping monthly score");
    }
    let score = score.min(MAX_SCORE) as u8;
    debug!(month = month_key, score, components = evidence.len(), "scored month");

    MonthlyRiskScore {
        month_key: month_key.to_string(),
        score,
        severity: Severity::from_score(score),
        evidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn empty_month() -> MonthState {
        MonthState::new(date(2024, 4, 1))
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2023, 2, 10)), 28);
        assert_eq!(days_in_month(date(2024, 4, 30)), 30);
        assert_eq!(days_in_month(date(2024, 12, 31)), 31);
    }

    #[test]
    fn test_quiet_month_scores_zero() {
        let s = score_month("2024-04", &empty_month(), &Thresholds::default());
        assert_eq!(s.month_key, "2024-04");
        assert_eq!(s.score, 0);
        assert_eq!(s.severity, Severity::None);
        assert!(s.evidence.is_empty());
    }

    #[test]
    fn test_severity_points() {
        let mut m = empty_month();
        m.severities = vec![Severity::Medium, Severity::Low, Severity::None, Severity::Low];
        let s = score_month("2024-04", &m, &Thresholds::default());
        assert_eq!(s.score, 36);
        assert_eq!(s.severity, Severity::Low);
        assert_eq!(s.evidence.len(), 2);
    }

    #[test]
    fn test_gambling_share_bands() {
        let t = Thresholds::default();
        let mut m = empty_month();
        m.income = 1_000.0;
        m.gambling_out = 200.0;
        assert_eq!(score_month("2024-04", &m, &t).score, 50);
        m.gambling_out = 100.0;
        assert_eq!(score_month("2024-04", &m, &t).score, 25);
        m.gambling_out = 99.0;
        assert_eq!(score_month("2024-04", &m, &t).score, 0);
    }

    #[test]
    fn test_cash_deposit_components() {
        let t = Thresholds::default();
        let mut m = empty_month();
        m.cash_deposits = vec![8_600.0, 8_700.0, 8_999.0];
        let s = score_month("2024-04", &m, &t);
        assert_eq!(s.score, 30);
        m.cash_deposits.push(9_000.0);
        let s = score_month("2024-04", &m, &t);
        assert_eq!(s.score, 75);
        assert_eq!(s.severity, Severity::High);
    }

    #[test]
    fn test_overdraft_fraction() {
        let t = Thresholds::default();
        let mut m = empty_month();
        let overdrawn = DayTotals {
            closing_balance: Some(-20.0),
            ..Default::default()
        };
        // 8 of 30 days is just over a quarter
        m.days = (1..=8).map(|d| (date(2024, 4, d), overdrawn)).collect();
        assert_eq!(score_month("2024-04", &m, &t).score, 15);
        m.days = (1..=15).map(|d| (date(2024, 4, d), overdrawn)).collect();
        assert_eq!(score_month("2024-04", &m, &t).score, 15);
        m.days = (1..=16).map(|d| (date(2024, 4, d), overdrawn)).collect();
        assert_eq!(score_month("2024-04", &m, &t).score, 35);
    }

    #[test]
    fn test_days_without_negative_close_are_not_overdrawn() {
        let t = Thresholds::default();
        let mut m = empty_month();
        for d in 1..=20 {
            m.days.insert(
                date(2024, 4, d),
                DayTotals {
                    money_in: 100.0,
                    money_out: 10.0,
                    closing_balance: Some(90.0),
                },
            );
        }
        m.days.insert(date(2024, 4, 21), DayTotals::default());
        assert_eq!(score_month("2024-04", &m, &t).score, 0);
    }

    #[test]
    fn test_pass_through_days() {
        let t = Thresholds::default();
        let mut m = empty_month();
        for d in 1..=3 {
            m.days.insert(
                date(2024, 4, d),
                DayTotals {
                    money_in: 1_000.0,
                    money_out: 800.0,
                    closing_balance: None,
                },
            );
        }
        assert_eq!(score_month("2024-04", &m, &t).score, 25);
        m.days.insert(
            date(2024, 4, 3),
            DayTotals {
                money_in: 1_000.0,
                money_out: 600.0,
                closing_balance: None,
            },
        );
        assert_eq!(score_month("2024-04", &m, &t).score, 0);
    }

    #[test]
    fn test_score_is_capped() {
        let t = Thresholds::default();
        let mut m = empty_month();
        m.severities = vec![Severity::High; 5];
        m.transfer_out = 6_000.0;
        let s = score_month("2024-04", &m, &t);
        assert_eq!(s.score, 100);
        assert_eq!(s.severity, Severity::High);
    }
}
