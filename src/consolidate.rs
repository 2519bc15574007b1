use std::collections::BTreeMap;

use crate::{loader::MonthlyPortfolio, month::MonthYear};

/// What a fund held of one instrument in one month.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub quantity: Option<f64>,
    pub market_value: Option<f64>,
    pub nav_percent: Option<f64>,
}

/// One instrument across all consolidated months.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRow {
    pub isin: String,
    pub name: String,
    pub industry: Option<String>,
    /// Indexed like [`ConsolidatedPortfolio::months`]; `None` where the instrument was not held.
    pub positions: Vec<Option<Position>>,
}

impl ConsolidatedRow {
    pub fn quantity(&self, month_idx: usize) -> Option<f64> {
        self.positions.get(month_idx).copied().flatten()?.quantity
    }

    pub fn market_value(&self, month_idx: usize) -> Option<f64> {
        self.positions.get(month_idx).copied().flatten()?.market_value
    }

    pub fn nav_percent(&self, month_idx: usize) -> Option<f64> {
        self.positions.get(month_idx).copied().flatten()?.nav_percent
    }

    pub fn industry_or_default(&self) -> &str {
        self.industry.as_deref().unwrap_or("Unclassified")
    }
}

/// Holdings of a fund across months, outer-joined on ISIN.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedPortfolio {
    pub fund: String,
    pub months: Vec<MonthYear>,
    pub rows: Vec<ConsolidatedRow>,
}

impl ConsolidatedPortfolio {
    pub fn row(&self, isin: &str) -> Option<&ConsolidatedRow> {
        self.rows.iter().find(|r| r.isin == isin)
    }

    /// Header of the wide table: identity columns, then quantities, market values and
    /// NAV% per month.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            "ISIN".to_string(),
            "Instrument".to_string(),
            "Industry".to_string(),
        ];
        headers.extend(self.months.iter().map(|m| format!("Quantity {m}")));
        headers.extend(self.months.iter().map(|m| format!("Market value {m}")));
        headers.extend(self.months.iter().map(|m| format!("NAV% {m}")));
        headers
    }

    /// Rows of the wide table, missing values rendered empty.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        let fmt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        self.rows.iter().map(move |row| {
            let mut record = vec![
                row.isin.clone(),
                row.name.clone(),
                row.industry.clone().unwrap_or_default(),
            ];
            record.extend((0..self.months.len()).map(|i| fmt(row.quantity(i))));
            record.extend((0..self.months.len()).map(|i| fmt(row.market_value(i))));
            record.extend((0..self.months.len()).map(|i| fmt(row.nav_percent(i))));
            record
        })
    }
}

/// Merges monthly disclosures of one fund into a single wide portfolio.
///
/// Every ISIN seen in any month appears once. Name and industry are taken from the
/// earliest month carrying them; within a month, a repeated ISIN keeps its first line.
pub fn consolidate(fund: &str, monthly: &[MonthlyPortfolio]) -> ConsolidatedPortfolio {
    let mut ordered: Vec<&MonthlyPortfolio> = monthly.iter().collect();
    ordered.sort_by_key(|p| p.month);
    ordered.dedup_by_key(|p| p.month);

    let n_months = ordered.len();
    let mut rows: BTreeMap<&str, ConsolidatedRow> = BTreeMap::new();
    for (idx, portfolio) in ordered.iter().enumerate() {
        for h in &portfolio.holdings {
            let row = rows.entry(h.isin.as_str()).or_insert_with(|| ConsolidatedRow {
                isin: h.isin.clone(),
                name: String::new(),
                industry: None,
                positions: vec![None; n_months],
            });
            if row.positions[idx].is_some() {
                continue;
            }
            if row.name.is_empty() {
                row.name.clone_from(&h.name);
            }
            if row.industry.is_none() {
                row.industry.clone_from(&h.industry);
            }
            row.positions[idx] = Some(Position {
                quantity: h.quantity,
                market_value: h.market_value,
                nav_percent: h.nav_percent,
            });
        }
    }

    ConsolidatedPortfolio {
        fund: fund.to_string(),
        months: ordered.iter().map(|p| p.month).collect(),
        rows: rows.into_values().collect(),
    }
}
