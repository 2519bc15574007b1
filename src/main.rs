use std::path::PathBuf;

use anyhow::Error;
use clap::{Parser, Subcommand};

use fundtrack::{
    analyze_fund, charts,
    month::MonthYear,
    report::{self, DEFAULT_ABS_THRESHOLD, DEFAULT_PCT_THRESHOLD},
    scan::scan_directory,
    select::{resolve_fund, MonthSelection},
    Result,
};

/// Tracks allocation changes across mutual-fund monthly portfolio disclosures
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Directory holding the "<fund> - Monthly Portfolio <Month Year>.xlsx" files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory charts are written to
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the funds found and the months available for each
    List,
    /// Consolidate a fund's holdings over a range of months
    Report {
        /// Fund name, or a part of it
        #[arg(long)]
        fund: String,

        /// Only the most recent N months
        #[arg(long, conflicts_with_all = ["from", "to"])]
        last: Option<usize>,

        /// First month of the range, e.g. "September 2024"
        #[arg(long, requires = "to")]
        from: Option<MonthYear>,

        /// Last month of the range, included
        #[arg(long, requires = "from")]
        to: Option<MonthYear>,

        /// Rows of the consolidated table to print
        #[arg(long, default_value_t = 10)]
        rows: usize,

        /// Minimum change in units reported as significant
        #[arg(long, default_value_t = DEFAULT_ABS_THRESHOLD)]
        abs_threshold: f64,

        /// Minimum change in percent reported as significant
        #[arg(long, default_value_t = DEFAULT_PCT_THRESHOLD)]
        pct_threshold: f64,

        /// Also write the consolidated table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Skip chart generation
        #[arg(long)]
        no_charts: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let index = scan_directory(&args.data_dir)?;
    if index.is_empty() {
        return Err(Error::msg(format!(
            "no monthly portfolio files found in {}",
            args.data_dir.display()
        )));
    }

    match args.command {
        Command::List => report::print_fund_index(&index),
        Command::Report {
            fund,
            last,
            from,
            to,
            rows,
            abs_threshold,
            pct_threshold,
            csv,
            no_charts,
        } => {
            let fund = resolve_fund(&fund, &index.fund_names())?;
            let selection = match (last, from, to) {
                (Some(n), _, _) => MonthSelection::Last(n),
                (None, Some(from), Some(to)) => MonthSelection::Range { from, to },
                _ => MonthSelection::All,
            };
            let analysis = analyze_fund(&index, fund, selection)?;

            report::print_consolidated(&analysis.portfolio, rows);
            report::print_significant_changes(&analysis.changes, abs_threshold, pct_threshold);
            if let Some(path) = csv {
                report::write_consolidated_csv(&analysis.portfolio, path)?;
            }
            if !no_charts {
                let written = charts::create_all_charts(
                    &analysis.portfolio,
                    &analysis.changes,
                    &analysis.span,
                    &args.output_dir,
                )?;
                println!(
                    "\n{} charts have been saved to {}",
                    written.len(),
                    args.output_dir.display()
                );
            }
        }
    }

    Ok(())
}
