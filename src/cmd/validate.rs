//! Validate command - pre-filing checks on a return

use crate::cmd::{read_return, write_json};
use clap::Args;
use itrc::core::{validate_return, ValidationReport};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Return JSON file (or "-" for stdin)
    #[arg(short = 'r', long = "return")]
    tax_return: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl ValidateCommand {
    /// Returns whether the return is valid
    pub fn exec(&self) -> anyhow::Result<bool> {
        let tax_return = read_return(&self.tax_return)?;
        let report = validate_return(&tax_return);

        if self.json {
            write_json(&report, None)?;
        } else {
            print_report(&report);
        }
        Ok(report.is_valid)
    }
}

fn print_report(report: &ValidationReport) {
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("No issues found");
        return;
    }
    for issue in &report.errors {
        println!("error: {}", issue.message());
    }
    for issue in &report.warnings {
        println!("warning: {}", issue.message());
    }
    println!();
    println!(
        "{} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    );
}
