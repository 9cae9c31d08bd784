use comfy_table::{Cell, Table};

use crate::cli::{load_and_analyze, parse_month_opt, severity_cell, OutputFormat};
use crate::error::Result;
use crate::fmt::money;
use crate::reports::filter_month;

pub fn run(
    file: &str,
    format: OutputFormat,
    month: Option<String>,
    input_format: Option<&str>,
) -> Result<()> {
    let month = parse_month_opt(&month)?;
    let (payload, mut report) = load_and_analyze(file, input_format)?;
    if let Some(m) = &month {
        report = filter_month(&payload.transactions, &report, m);
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Description", "In", "Out", "Severity", "Reasons"]);
    for (index, risk) in report.tx_risks.iter().filter(|(_, r)| r.flagged) {
        let tx = &payload.transactions[*index];
        let amount = |v: f64| if v > 0.0 { money(v) } else { String::new() };
        table.add_row(vec![
            Cell::new(index),
            Cell::new(&tx.date),
            Cell::new(&tx.description),
            Cell::new(amount(tx.amount_in())),
            Cell::new(amount(tx.amount_out())),
            severity_cell(risk.severity),
            Cell::new(risk.reasons.join("\n")),
        ]);
    }
    let flagged = report.tx_risks.values().filter(|r| r.flagged).count();
    if payload.bank.is_empty() {
        println!("Flagged transactions: {flagged} of {}", report.tx_risks.len());
    } else {
        println!(
            "{}: flagged transactions {flagged} of {}",
            payload.bank,
            report.tx_risks.len()
        );
    }
    if flagged > 0 {
        println!("{table}");
    }

    let mut mtable = Table::new();
    mtable.set_header(vec!["Month", "Score", "Severity", "Evidence"]);
    for score in report.monthly.values() {
        mtable.add_row(vec![
            Cell::new(&score.month_key),
            Cell::new(score.score),
            severity_cell(score.severity),
            Cell::new(score.evidence.join("\n")),
        ]);
    }
    println!("\nMonthly Risk\n{mtable}");
    Ok(())
}
