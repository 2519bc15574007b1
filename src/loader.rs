use std::path::Path;

use anyhow::{Context, Error};
use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::{month::MonthYear, scan::PortfolioFile, Result};

/// Prefix every retained identifier starts with.
pub const ISIN_PREFIX: &str = "INE";

/// One instrument line of a monthly disclosure.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub isin: String,
    pub name: String,
    pub industry: Option<String>,
    pub quantity: Option<f64>,
    /// Market value in Rs. lakhs.
    pub market_value: Option<f64>,
    pub nav_percent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MonthlyPortfolio {
    pub fund: String,
    pub month: MonthYear,
    pub holdings: Vec<Holding>,
}

#[derive(Debug, PartialEq, Eq)]
struct ColumnIndices {
    name: usize,
    isin: usize,
    industry: Option<usize>,
    quantity: Option<usize>,
    market_value: Option<usize>,
    nav_percent: Option<usize>,
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Numeric cells pass through; text is stripped of separators and `%` before parsing.
fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '%') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Index of the first row holding an `ISIN` header cell.
pub fn find_header_row(range: &Range<Data>) -> Option<usize> {
    range
        .rows()
        .position(|row| row.iter().any(|c| cell_text(c) == "ISIN"))
}

fn get_column_indices(headers: &[Data]) -> Result<ColumnIndices> {
    let mut name = None;
    let mut isin = None;
    let mut industry = None;
    let mut quantity = None;
    let mut market_value = None;
    let mut nav_percent = None;
    for (pos, h) in headers.iter().enumerate() {
        let h = cell_text(h);
        match h.as_str() {
            "Name of the Instrument" => name = name.or(Some(pos)),
            "ISIN" => isin = isin.or(Some(pos)),
            "Rating / Industry^" | "Rating / Industry" => industry = industry.or(Some(pos)),
            "Quantity" => quantity = quantity.or(Some(pos)),
            "% to NAV" => nav_percent = nav_percent.or(Some(pos)),
            h if h.starts_with("Market value") => market_value = market_value.or(Some(pos)),
            _ => {}
        }
    }
    Ok(ColumnIndices {
        name: name.context("failed to find instrument name header")?,
        isin: isin.context("failed to find ISIN header")?,
        industry,
        quantity,
        market_value,
        nav_percent,
    })
}

fn column(row: &[Data], idx: Option<usize>) -> Option<&Data> {
    idx.and_then(|i| row.get(i))
}

/// Extracts the holdings below the header row of a disclosure sheet.
pub fn parse_holdings(range: &Range<Data>) -> Result<Vec<Holding>> {
    let header_row = find_header_row(range).context("failed to find header row")?;
    let mut rows = range.rows().skip(header_row);
    let headers = rows.next().context("failed to extract headers")?;
    let cols = get_column_indices(headers)?;

    let holdings = rows
        .filter_map(|row| {
            let isin = row.get(cols.isin).map(cell_text)?;
            if !isin.starts_with(ISIN_PREFIX) {
                return None;
            }
            let name = row.get(cols.name).map(cell_text)?;
            if name.is_empty() {
                return None;
            }
            let industry = column(row, cols.industry)
                .map(cell_text)
                .filter(|s| !s.is_empty());
            Some(Holding {
                isin,
                name,
                industry,
                quantity: column(row, cols.quantity).and_then(cell_number),
                market_value: column(row, cols.market_value).and_then(cell_number),
                nav_percent: column(row, cols.nav_percent).and_then(cell_number),
            })
        })
        .collect();
    Ok(holdings)
}

/// Reads the first worksheet of a disclosure workbook.
pub fn load_portfolio<P: AsRef<Path>>(
    file_path: P,
    fund: &str,
    month: MonthYear,
) -> Result<MonthlyPortfolio> {
    let file_path = file_path.as_ref();
    let mut workbook = open_workbook_auto(file_path)
        .with_context(|| format!("failed to open {}", file_path.display()))?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Err(Error::msg("workbook has no worksheet"));
    };
    let range = range.map_err(|e| Error::msg(e.to_string()))?;
    let holdings = parse_holdings(&range)
        .with_context(|| format!("failed to parse {}", file_path.display()))?;
    log::info!(
        "loaded {} holdings from {}",
        holdings.len(),
        file_path.display()
    );
    Ok(MonthlyPortfolio {
        fund: fund.to_string(),
        month,
        holdings,
    })
}

/// Loads every file given, skipping (with a warning) those that fail.
pub fn load_fund_months(files: &[PortfolioFile]) -> Vec<MonthlyPortfolio> {
    files
        .iter()
        .filter_map(|f| match load_portfolio(&f.path, &f.fund, f.month) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("skipping {} {}: {e:#}", f.fund, f.month);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use time::Month;

    use super::*;

    fn sheet(rows: &[&[Data]]) -> Range<Data> {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn disclosure() -> Range<Data> {
        sheet(&[
            &[s("ZN250 Fund"), Data::Empty],
            &[s("Monthly Portfolio Statement as on September 30, 2024")],
            &[
                s("Name of the Instrument"),
                s(" ISIN "),
                s("Rating / Industry^"),
                s("Quantity"),
                s("Market value(Rs. in Lakhs)"),
                s("% to NAV"),
            ],
            &[s("Equity & Equity related")],
            &[
                s("HDFC Bank Limited"),
                s("INE040A01034"),
                s("Banks"),
                Data::Float(1200.0),
                Data::Float(2050.5),
                s("4.12%"),
            ],
            &[
                s("Infosys Limited"),
                s("INE009A01021"),
                s("IT - Software"),
                s("1,500"),
                Data::Float(2800.0),
                Data::Float(5.6),
            ],
            &[s("Sub Total"), Data::Empty, Data::Empty, Data::Empty, Data::Float(4850.5)],
            &[
                s("Foreign Stock"),
                s("US0378331005"),
                s("Technology"),
                Data::Int(10),
            ],
            &[
                Data::Empty,
                s("INE000000000"),
                s("Unnamed"),
                Data::Int(1),
            ],
            &[
                s("Odd Quantity Ltd"),
                s("INE111A01011"),
                Data::Empty,
                s("n/a"),
                Data::Empty,
                Data::Empty,
            ],
        ])
    }

    #[test]
    fn finds_header_row_anywhere() {
        assert_eq!(find_header_row(&disclosure()), Some(2));
        assert_eq!(find_header_row(&sheet(&[&[s("no header")]])), None);
    }

    #[test]
    fn keeps_only_prefixed_identifiers() {
        let holdings = parse_holdings(&disclosure()).unwrap();
        let isins: Vec<&str> = holdings.iter().map(|h| h.isin.as_str()).collect();
        assert_eq!(isins, ["INE040A01034", "INE009A01021", "INE111A01011"]);
        assert!(holdings.iter().all(|h| h.isin.starts_with(ISIN_PREFIX)));
    }

    #[test]
    fn converts_numbers_and_coerces_failures() {
        let holdings = parse_holdings(&disclosure()).unwrap();
        assert_eq!(holdings[0].quantity, Some(1200.0));
        assert_eq!(holdings[0].nav_percent, Some(4.12));
        assert_eq!(holdings[1].quantity, Some(1500.0));
        assert_eq!(holdings[1].market_value, Some(2800.0));
        assert_eq!(holdings[2].quantity, None);
        assert_eq!(holdings[2].industry, None);
    }

    #[test]
    fn missing_isin_column_is_an_error() {
        let range = sheet(&[&[s("Name of the Instrument"), s("Quantity")]]);
        assert!(parse_holdings(&range).is_err());

        let range = sheet(&[&[s("ISIN"), s("Quantity")]]);
        assert!(parse_holdings(&range).is_err());
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let files = [PortfolioFile {
            fund: "ZN250".to_string(),
            month: MonthYear::new(Month::September, 2024),
            path: PathBuf::from("/nonexistent/ZN250 - Monthly Portfolio September 2024.xlsx"),
        }];
        assert!(load_fund_months(&files).is_empty());
    }
}
