use std::fmt;

use crate::{
    consolidate::{ConsolidatedPortfolio, ConsolidatedRow},
    month::MonthYear,
};

/// Two months between which quantities are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: MonthYear,
    pub to: MonthYear,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.from, self.to)
    }
}

impl Period {
    /// File-name friendly form, e.g. `September2024_to_October2024`.
    pub fn slug(&self) -> String {
        format!("{}_to_{}", self.from.compact(), self.to.compact())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Change in units held.
    Absolute,
    /// Change relative to the earlier quantity, in percent.
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Change {
    pub absolute: Option<f64>,
    pub percentage: Option<f64>,
}

impl Change {
    pub fn between(from: Option<f64>, to: Option<f64>) -> Self {
        let (Some(from), Some(to)) = (from, to) else {
            return Self::default();
        };
        let absolute = to - from;
        let percentage = (from != 0.).then(|| absolute / from * 100.);
        Self {
            absolute: Some(absolute),
            percentage,
        }
    }

    pub fn get(&self, kind: ChangeKind) -> Option<f64> {
        match kind {
            ChangeKind::Absolute => self.absolute,
            ChangeKind::Percentage => self.percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentChanges {
    pub isin: String,
    pub name: String,
    pub industry: Option<String>,
    /// Indexed like [`AllocationChanges::periods`].
    pub changes: Vec<Change>,
}

impl InstrumentChanges {
    fn from_row(row: &ConsolidatedRow, changes: Vec<Change>) -> Self {
        Self {
            isin: row.isin.clone(),
            name: row.name.clone(),
            industry: row.industry.clone(),
            changes,
        }
    }

    /// Sum of the absolute quantity changes over every period.
    pub fn total_absolute(&self) -> f64 {
        self.changes
            .iter()
            .filter_map(|c| c.absolute)
            .map(f64::abs)
            .sum()
    }

    fn exceeds(&self, threshold: f64, kind: ChangeKind) -> bool {
        self.changes
            .iter()
            .filter_map(|c| c.get(kind))
            .any(|v| v.abs() > threshold)
    }
}

/// Month-over-month quantity changes of every instrument in a consolidated portfolio.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllocationChanges {
    pub periods: Vec<Period>,
    pub instruments: Vec<InstrumentChanges>,
}

impl AllocationChanges {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Instruments with at least one period whose change of `kind` is beyond `threshold`.
    pub fn significant(&self, threshold: f64, kind: ChangeKind) -> Vec<&InstrumentChanges> {
        self.instruments
            .iter()
            .filter(|i| i.exceeds(threshold, kind))
            .collect()
    }
}

/// Changes between each pair of consecutive months.
pub fn calculate_changes(portfolio: &ConsolidatedPortfolio) -> AllocationChanges {
    if portfolio.months.len() < 2 {
        return AllocationChanges::default();
    }
    let periods = portfolio
        .months
        .windows(2)
        .map(|w| Period {
            from: w[0],
            to: w[1],
        })
        .collect();
    let instruments = portfolio
        .rows
        .iter()
        .map(|row| {
            let changes = (0..portfolio.months.len() - 1)
                .map(|i| Change::between(row.quantity(i), row.quantity(i + 1)))
                .collect();
            InstrumentChanges::from_row(row, changes)
        })
        .collect();
    AllocationChanges {
        periods,
        instruments,
    }
}

/// Changes between the first and the last month, as a single period.
pub fn span_change(portfolio: &ConsolidatedPortfolio) -> AllocationChanges {
    let (Some(first), Some(last)) = (portfolio.months.first(), portfolio.months.last()) else {
        return AllocationChanges::default();
    };
    if first == last {
        return AllocationChanges::default();
    }
    let last_idx = portfolio.months.len() - 1;
    let instruments = portfolio
        .rows
        .iter()
        .map(|row| {
            let change = Change::between(row.quantity(0), row.quantity(last_idx));
            InstrumentChanges::from_row(row, vec![change])
        })
        .collect();
    AllocationChanges {
        periods: vec![Period {
            from: *first,
            to: *last,
        }],
        instruments,
    }
}

#[cfg(test)]
mod tests {
    use time::Month;

    use super::*;
    use crate::consolidate::{
        consolidate,
        tests::{holding, month},
    };

    fn portfolio() -> ConsolidatedPortfolio {
        consolidate(
            "ZN250",
            &[
                month(
                    Month::September,
                    2024,
                    vec![
                        holding("INE001A01036", "HDFC", "Banks", 1000.0, 5.0),
                        holding("INE002A01018", "Reliance", "Petroleum", 0.0, 0.0),
                        holding("INE003A01024", "Infosys", "IT", 200.0, 1.0),
                    ],
                ),
                month(
                    Month::October,
                    2024,
                    vec![
                        holding("INE001A01036", "HDFC", "Banks", 3000.0, 6.0),
                        holding("INE002A01018", "Reliance", "Petroleum", 40.0, 1.0),
                        holding("INE003A01024", "Infosys", "IT", 204.0, 1.0),
                    ],
                ),
                month(
                    Month::November,
                    2024,
                    vec![
                        holding("INE001A01036", "HDFC", "Banks", 2500.0, 5.5),
                        holding("INE004A01011", "TCS", "IT", 10.0, 0.5),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn consecutive_period_changes() {
        let changes = calculate_changes(&portfolio());
        assert_eq!(changes.periods.len(), 2);
        assert_eq!(
            changes.periods[0].to_string(),
            "September 2024 to October 2024"
        );
        assert_eq!(changes.periods[1].slug(), "October2024_to_November2024");

        let hdfc = &changes.instruments[0];
        assert_eq!(hdfc.changes[0].absolute, Some(2000.0));
        assert_eq!(hdfc.changes[0].percentage, Some(200.0));
        assert_eq!(hdfc.changes[1].absolute, Some(-500.0));
        assert_eq!(hdfc.total_absolute(), 2500.0);
    }

    #[test]
    fn missing_or_zero_base_has_no_percentage() {
        let changes = calculate_changes(&portfolio());
        let reliance = &changes.instruments[1];
        assert_eq!(reliance.changes[0].absolute, Some(40.0));
        assert_eq!(reliance.changes[0].percentage, None);
        assert_eq!(reliance.changes[1], Change::default());

        let tcs = &changes.instruments[3];
        assert_eq!(tcs.changes, [Change::default(), Change::default()]);
    }

    #[test]
    fn significance_filter() {
        let changes = calculate_changes(&portfolio());
        let abs: Vec<&str> = changes
            .significant(1000.0, ChangeKind::Absolute)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(abs, ["HDFC"]);

        let pct: Vec<&str> = changes
            .significant(5.0, ChangeKind::Percentage)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(pct, ["HDFC"]);

        let pct: Vec<&str> = changes
            .significant(1.0, ChangeKind::Percentage)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(pct, ["HDFC", "Infosys"]);
    }

    #[test]
    fn span_covers_first_to_last() {
        let span = span_change(&portfolio());
        assert_eq!(span.periods.len(), 1);
        assert_eq!(span.periods[0].slug(), "September2024_to_November2024");
        assert_eq!(span.instruments[0].changes[0].absolute, Some(1500.0));
        assert_eq!(span.instruments[2].changes[0], Change::default());
    }

    #[test]
    fn single_month_has_no_changes() {
        let single = consolidate(
            "ZN250",
            &[month(
                Month::May,
                2024,
                vec![holding("INE001A01036", "HDFC", "Banks", 1.0, 1.0)],
            )],
        );
        assert!(calculate_changes(&single).is_empty());
        assert!(span_change(&single).is_empty());
    }
}
