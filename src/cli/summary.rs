use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{load_and_analyze, severity_cell};
use crate::error::Result;
use crate::fmt::money;
use crate::reports::monthly_summaries;

pub fn run(file: &str, input_format: Option<&str>) -> Result<()> {
    let (payload, report) = load_and_analyze(file, input_format)?;
    let months = monthly_summaries(&payload.transactions, &report);

    let mut table = Table::new();
    table.set_header(vec![
        "Month", "Money In", "Money Out", "Net", "Closing", "Txns", "Flagged", "Score", "Risk",
    ]);
    for m in &months {
        let net_str = if m.net >= 0.0 {
            money(m.net).green().to_string()
        } else {
            money(m.net).red().to_string()
        };
        table.add_row(vec![
            Cell::new(&m.month),
            Cell::new(money(m.money_in)),
            Cell::new(money(m.money_out)),
            Cell::new(net_str),
            Cell::new(m.closing_balance.map(money).unwrap_or_default()),
            Cell::new(m.transactions),
            Cell::new(m.flagged),
            Cell::new(m.score),
            severity_cell(m.severity),
        ]);
    }
    println!("Statement Summary\n{table}");
    Ok(())
}
