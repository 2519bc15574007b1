use std::path::Path;

use crate::{
    changes::{AllocationChanges, ChangeKind},
    consolidate::ConsolidatedPortfolio,
    scan::FundIndex,
    Result,
};

pub const DEFAULT_ABS_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_PCT_THRESHOLD: f64 = 5.0;

pub fn print_fund_index(index: &FundIndex) {
    println!("\n=== AVAILABLE FUNDS ===\n");
    for (fund, files) in index.iter() {
        let months: Vec<String> = files.iter().map(|f| f.month.to_string()).collect();
        println!("{fund} ({} months): {}", months.len(), months.join(", "));
    }
}

/// Prints the first `max_rows` rows of the consolidated table, columns padded to fit.
pub fn print_consolidated(portfolio: &ConsolidatedPortfolio, max_rows: usize) {
    println!(
        "\n=== CONSOLIDATED HOLDINGS FOR {} ({} instruments) ===\n",
        portfolio.fund,
        portfolio.rows.len()
    );
    let headers = portfolio.headers();
    let records: Vec<Vec<String>> = portfolio.records().take(max_rows).collect();
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            records
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(&headers));
    for r in &records {
        println!("{}", line(r));
    }
}

fn format_units(v: f64) -> String {
    let digits = format!("{:.0}", v.abs());
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if v < 0. && digits != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Prints instruments whose quantity moved by more than the thresholds in any period.
pub fn print_significant_changes(
    changes: &AllocationChanges,
    abs_threshold: f64,
    pct_threshold: f64,
) {
    if changes.is_empty() {
        println!("\nNo changes to display: at least two months are needed.");
        return;
    }
    println!("\n=== SIGNIFICANT CHANGES IN HOLDINGS ===");

    let sections = [
        (
            ChangeKind::Absolute,
            abs_threshold,
            format!("Absolute changes (>{abs_threshold} units)"),
        ),
        (
            ChangeKind::Percentage,
            pct_threshold,
            format!("Percentage changes (>{pct_threshold}%)"),
        ),
    ];
    for (kind, threshold, title) in sections {
        let significant = changes.significant(threshold, kind);
        if significant.is_empty() {
            continue;
        }
        println!("\n{title}:");
        println!("{}", "-".repeat(40));
        for instrument in significant {
            println!("\nInstrument: {}", instrument.name);
            println!("Industry: {}", instrument.industry.as_deref().unwrap_or("-"));
            for (period, change) in changes.periods.iter().zip(&instrument.changes) {
                let Some(v) = change.get(kind).filter(|v| v.abs() > threshold) else {
                    continue;
                };
                match kind {
                    ChangeKind::Absolute => println!("  {period}: {} units", format_units(v)),
                    ChangeKind::Percentage => println!("  {period}: {v:.2}%"),
                }
            }
        }
    }
}

/// Writes the consolidated wide table as CSV.
pub fn write_consolidated_csv<P: AsRef<Path>>(
    portfolio: &ConsolidatedPortfolio,
    file_path: P,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(&file_path)?;
    wtr.write_record(portfolio.headers())?;
    for record in portfolio.records() {
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    log::info!(
        "consolidated holdings written as CSV to {}",
        file_path.as_ref().to_string_lossy()
    );
    Ok(())
}
