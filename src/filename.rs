use crate::month::MonthYear;

const SEPARATOR: &str = " - Monthly Portfolio ";

/// Extensions accepted for disclosure files, in order of preference.
pub const EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Splits `"<fund> - Monthly Portfolio <Month Year>.xlsx"` into its fund and month.
pub fn parse_file_name(name: &str) -> Option<(String, MonthYear)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)) {
        return None;
    }
    let (fund, month) = stem.split_once(SEPARATOR)?;
    let fund = fund.trim();
    if fund.is_empty() {
        return None;
    }
    let month = MonthYear::parse(month).ok()?;
    Some((fund.to_string(), month))
}

pub fn file_name_for(fund: &str, month: &MonthYear) -> String {
    format!("{fund}{SEPARATOR}{month}.xlsx")
}
