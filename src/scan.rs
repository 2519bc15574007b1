use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{filename::parse_file_name, month::MonthYear, Result};

/// A disclosure file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioFile {
    pub fund: String,
    pub month: MonthYear,
    pub path: PathBuf,
}

/// Funds found in a data directory, each with its files in chronological order.
#[derive(Debug, Default)]
pub struct FundIndex {
    funds: BTreeMap<String, Vec<PortfolioFile>>,
}

impl FundIndex {
    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    pub fn fund_names(&self) -> Vec<&str> {
        self.funds.keys().map(String::as_str).collect()
    }

    pub fn files(&self, fund: &str) -> Option<&[PortfolioFile]> {
        self.funds.get(fund).map(Vec::as_slice)
    }

    pub fn months(&self, fund: &str) -> Vec<MonthYear> {
        self.files(fund)
            .map(|files| files.iter().map(|f| f.month).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PortfolioFile])> {
        self.funds.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Adds a file; when the fund already has a file for that month, the `.xlsx` one is kept.
    fn insert(&mut self, file: PortfolioFile) {
        let files = self.funds.entry(file.fund.clone()).or_default();
        match files.binary_search_by(|f| f.month.cmp(&file.month)) {
            Ok(pos) => {
                if is_xlsx(&file.path) && !is_xlsx(&files[pos].path) {
                    files[pos] = file;
                }
            }
            Err(pos) => files.insert(pos, file),
        }
    }
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Maps every fund in `dir` to the months it has disclosures for.
pub fn scan_directory<P: AsRef<Path>>(dir: P) -> Result<FundIndex> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read data directory {}", dir.display()))?;

    let mut index = FundIndex::default();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        // Follows symlinks, so linked workbooks are indexed too.
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match parse_file_name(name) {
            Some((fund, month)) => index.insert(PortfolioFile {
                fund,
                month,
                path,
            }),
            None => log::debug!("skipping {name}: not a monthly portfolio file"),
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use time::Month;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn groups_and_sorts_months() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ZN250 - Monthly Portfolio November 2024.xlsx");
        touch(dir.path(), "ZN250 - Monthly Portfolio September 2024.xlsx");
        touch(dir.path(), "ZN250 - Monthly Portfolio January 2025.xlsx");
        touch(dir.path(), "Axis Bluechip Fund - Monthly Portfolio January 2021.xlsx");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "ZN250 - Monthly Portfolio Sometime 2024.xlsx");

        let index = scan_directory(dir.path()).unwrap();
        assert_eq!(index.fund_names(), ["Axis Bluechip Fund", "ZN250"]);
        assert_eq!(
            index.months("ZN250"),
            [
                MonthYear::new(Month::September, 2024),
                MonthYear::new(Month::November, 2024),
                MonthYear::new(Month::January, 2025),
            ]
        );
        assert!(index.months("Unknown").is_empty());
    }

    #[test]
    fn prefers_xlsx_for_same_month() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "F - Monthly Portfolio May 2023.xls");
        touch(dir.path(), "F - Monthly Portfolio May 2023.xlsx");

        let index = scan_directory(dir.path()).unwrap();
        let files = index.files("F").unwrap();
        assert_eq!(files.len(), 1);
        assert!(is_xlsx(&files[0].path));
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_workbooks() {
        let store = tempfile::tempdir().unwrap();
        touch(store.path(), "archive.xlsx");
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("F - Monthly Portfolio June 2023.xlsx")).unwrap();
        std::os::unix::fs::symlink(
            store.path().join("archive.xlsx"),
            dir.path().join("F - Monthly Portfolio July 2023.xlsx"),
        )
        .unwrap();

        let index = scan_directory(dir.path()).unwrap();
        assert_eq!(index.months("F"), [MonthYear::new(Month::July, 2023)]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_directory(dir.path().join("absent")).is_err());
    }
}
