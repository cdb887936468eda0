//! Select command - pick the return form and schedules for a return

use crate::cmd::{format_inr, read_return, write_json};
use clap::Args;
use itrc::core::{ItrProfile, ItrSelection};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SelectCommand {
    /// Return JSON file (or "-" for stdin)
    #[arg(short = 'r', long = "return")]
    tax_return: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectOutput {
    #[serde(flatten)]
    selection: ItrSelection,
    income_profile: ItrProfile,
}

impl SelectCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let tax_return = read_return(&self.tax_return)?;
        let profile = tax_return.itr_profile();
        let selection = itrc::core::select_itr(&profile);

        if self.json {
            return write_json(
                &SelectOutput {
                    selection,
                    income_profile: profile,
                },
                None,
            );
        }

        let schedules: Vec<_> = selection.schedules.iter().map(|s| s.as_str()).collect();
        println!();
        println!("{}: {}", selection.itr_type, selection.reason);
        println!("  Schedules: {}", schedules.join(", "));
        println!(
            "  Total income: {} | Business: {} | Capital gains: {} | Agricultural: {}",
            format_inr(profile.total_income),
            format_inr(profile.business_income),
            format_inr(profile.capital_gains),
            format_inr(profile.agricultural_income)
        );
        println!();
        Ok(())
    }
}
