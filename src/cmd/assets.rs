//! Assets command - list holdings and the Schedule FA total

use crate::cmd::{format_inr, open_input, read_return, write_json};
use clap::Args;
use itrc::core::{assets, AssetHolding, ScheduleFa};
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct AssetsCommand {
    /// JSON array of holdings (or "-" for stdin)
    #[arg(short, long)]
    assets: PathBuf,

    /// Record the holdings on this return and print the updated return as JSON
    #[arg(short = 'r', long = "return")]
    tax_return: Option<PathBuf>,

    /// Output Schedule FA as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl AssetsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let holdings = assets::read_json(open_input(&self.assets)?)?;
        for (i, holding) in holdings.iter().enumerate() {
            holding
                .validate()
                .map_err(|err| anyhow::anyhow!("holding {}: {}", i + 1, err))?;
        }

        if let Some(path) = &self.tax_return {
            let updated = holdings
                .iter()
                .cloned()
                .try_fold(read_return(path)?, |r, holding| r.with_asset_holding(holding))?;
            return write_json(&updated, None);
        }

        let schedule = ScheduleFa::build(&holdings)?;
        if self.json {
            write_json(&schedule, None)
        } else {
            print_table(&holdings, &schedule);
            Ok(())
        }
    }
}

fn print_table(holdings: &[AssetHolding], schedule: &ScheduleFa) {
    if holdings.is_empty() {
        println!("No holdings found");
        return;
    }

    let rows: Vec<HoldingRow> = holdings
        .iter()
        .map(|h| HoldingRow {
            asset_type: h.asset_type.to_string(),
            description: h.description.clone().unwrap_or_default(),
            location: h.location.clone().unwrap_or_default(),
            cost: format_inr(h.acquisition_cost),
            value: format_inr(h.current_value),
            schedules: match (h.schedule_fa, h.schedule_fsi) {
                (true, true) => "FA, FSI",
                (true, false) => "FA",
                (false, true) => "FSI",
                (false, false) => "",
            }
            .to_string(),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    println!();
    println!(
        "SCHEDULE FA: {} foreign asset(s), total value {}",
        schedule.foreign_assets.len(),
        format_inr(schedule.total_value)
    );
    println!();
}

#[derive(Debug, Clone, Tabled)]
struct HoldingRow {
    #[tabled(rename = "Asset")]
    asset_type: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Schedules")]
    schedules: String,
}
