use anyhow::Error;

use crate::{month::MonthYear, Result};

const MAX_SUGGESTIONS: usize = 5;
const MIN_SIMILARITY: f64 = 0.5;

/// Finds the funds a user query most likely refers to, best match first.
///
/// An exact (case-insensitive) name wins outright, then substring matches, then
/// names whose similarity to the query is at least [`MIN_SIMILARITY`].
pub fn match_funds<'a>(query: &str, funds: &[&'a str]) -> Vec<&'a str> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    if let Some(exact) = funds.iter().find(|f| f.to_lowercase() == query) {
        return vec![*exact];
    }
    let containing: Vec<&str> = funds
        .iter()
        .filter(|f| f.to_lowercase().contains(&query))
        .copied()
        .collect();
    if !containing.is_empty() {
        return containing;
    }

    let mut scored: Vec<(f64, &str)> = funds
        .iter()
        .map(|f| (similarity(&query, &f.to_lowercase()), *f))
        .filter(|(score, _)| *score >= MIN_SIMILARITY)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, f)| f)
        .collect()
}

/// Resolves a query to exactly one fund name.
pub fn resolve_fund<'a>(query: &str, funds: &[&'a str]) -> Result<&'a str> {
    match match_funds(query, funds).as_slice() {
        [] => Err(Error::msg(format!("no fund matches {query:?}"))),
        [one] => Ok(*one),
        many => Err(Error::msg(format!(
            "{query:?} is ambiguous, did you mean one of: {}",
            many.join(", ")
        ))),
    }
}

/// `2 * LCS / (len(a) + len(b))`, in `[0, 1]`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    2. * prev[b.len()] as f64 / (a.len() + b.len()) as f64
}

/// Which of a fund's available months to work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthSelection {
    All,
    /// The most recent `n` months.
    Last(usize),
    /// Every available month from `from` to `to`, both included.
    Range { from: MonthYear, to: MonthYear },
}

impl MonthSelection {
    /// Applies the selection to chronologically sorted months.
    pub fn apply(&self, available: &[MonthYear]) -> Result<Vec<MonthYear>> {
        match *self {
            Self::All => Ok(available.to_vec()),
            Self::Last(0) => Err(Error::msg("number of months must be positive")),
            Self::Last(n) => Ok(available[available.len().saturating_sub(n)..].to_vec()),
            Self::Range { from, to } => {
                if from > to {
                    return Err(Error::msg(format!("{from} is after {to}")));
                }
                for m in [from, to] {
                    if !available.contains(&m) {
                        return Err(Error::msg(format!("no disclosure available for {m}")));
                    }
                }
                Ok(available
                    .iter()
                    .filter(|m| (from..=to).contains(*m))
                    .copied()
                    .collect())
            }
        }
    }
}
