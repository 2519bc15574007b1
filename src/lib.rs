//! Consolidates mutual-fund monthly portfolio disclosures.
//!
//! Disclosures are Excel workbooks named `"<fund> - Monthly Portfolio <Month Year>.xlsx"`.
//! For one fund and a selection of months the crate:
//!
//! - reads each workbook, locating the header row and keeping instruments whose ISIN
//!   starts with [`loader::ISIN_PREFIX`],
//! - outer-joins the months on ISIN into a [`consolidate::ConsolidatedPortfolio`],
//! - computes month-over-month quantity changes,
//! - prints, exports and charts the result.

use anyhow::Error;

pub mod changes;
pub mod charts;
pub mod consolidate;
pub mod filename;
pub mod loader;
pub mod month;
pub mod report;
pub mod scan;
pub mod select;

use changes::{calculate_changes, span_change, AllocationChanges};
use consolidate::{consolidate, ConsolidatedPortfolio};
use scan::FundIndex;
use select::MonthSelection;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything computed for one fund over the selected months.
#[derive(Debug)]
pub struct FundAnalysis {
    pub portfolio: ConsolidatedPortfolio,
    /// Between consecutive months.
    pub changes: AllocationChanges,
    /// Between the first and the last month.
    pub span: AllocationChanges,
}

/// Loads the selected months of `fund` and derives its consolidated view and changes.
///
/// Files that fail to load are skipped; it is an error only when none loads.
pub fn analyze_fund(
    index: &FundIndex,
    fund: &str,
    selection: MonthSelection,
) -> Result<FundAnalysis> {
    let files = index
        .files(fund)
        .ok_or_else(|| Error::msg(format!("unknown fund {fund:?}")))?;
    let months = selection.apply(&index.months(fund))?;
    let selected: Vec<_> = files
        .iter()
        .filter(|f| months.contains(&f.month))
        .cloned()
        .collect();
    log::info!(
        "loading {} months of {fund}: {}",
        selected.len(),
        months
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let monthly = loader::load_fund_months(&selected);
    if monthly.is_empty() {
        return Err(Error::msg(format!(
            "no data could be loaded for {fund} in the selected period"
        )));
    }
    let portfolio = consolidate(fund, &monthly);
    let changes = calculate_changes(&portfolio);
    let span = span_change(&portfolio);
    Ok(FundAnalysis {
        portfolio,
        changes,
        span,
    })
}
