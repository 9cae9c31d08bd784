use comfy_table::{Cell, Table};

use crate::cli::{load_and_analyze, severity_cell};
use crate::error::Result;
use crate::fmt::money;
use crate::models::Severity;
use crate::reports::flagged_transactions;

pub fn run(file: &str, min_severity: Option<Severity>, input_format: Option<&str>) -> Result<()> {
    let (payload, report) = load_and_analyze(file, input_format)?;
    let items = flagged_transactions(&payload.transactions, &report, min_severity);

    if items.is_empty() {
        println!("No flagged transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Description", "Amount", "Severity", "Reasons"]);
    for item in &items {
        table.add_row(vec![
            Cell::new(item.index),
            Cell::new(&item.date),
            Cell::new(&item.description),
            Cell::new(money(item.amount)),
            severity_cell(item.severity),
            Cell::new(item.reasons.join("\n")),
        ]);
    }
    println!("Flagged Transactions ({})\n{table}", items.len());
    Ok(())
}
