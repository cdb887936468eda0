//! Gains command - classify capital gain entries and summarise them

use crate::cmd::{format_inr, open_input, read_return, write_json, RulesArgs};
use clap::Args;
use itrc::core::{capital_gains, CapitalGainEntry, CapitalGainsSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct GainsCommand {
    /// CSV or JSON file of sales (or "-" for CSV on stdin)
    #[arg(short, long)]
    entries: PathBuf,

    /// Cost inflation factor for indexed long-term gains (default from rules)
    #[arg(long)]
    indexation_factor: Option<Decimal>,

    /// Record the entries on this return and print the updated return as JSON
    #[arg(short = 'r', long = "return")]
    tax_return: Option<PathBuf>,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GainsOutput {
    entries: Vec<CapitalGainEntry>,
    summary: CapitalGainsSummary,
}

impl GainsCommand {
    pub fn exec(&self, rules: &RulesArgs) -> anyhow::Result<()> {
        let mut cg_rules = rules.load()?.capital_gains;
        if let Some(factor) = self.indexation_factor {
            cg_rules.default_indexation_factor = factor;
        }

        let reader = open_input(&self.entries)?;
        let is_json = self
            .entries
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let inputs = if is_json {
            capital_gains::read_json(reader)?
        } else {
            capital_gains::read_csv(reader)?
        };

        let entries = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                CapitalGainEntry::from_input(input, &cg_rules)
                    .map_err(|err| anyhow::anyhow!("entry {}: {}", i + 1, err))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if let Some(path) = &self.tax_return {
            let updated = entries
                .iter()
                .cloned()
                .try_fold(read_return(path)?, |r, entry| r.with_capital_gain(entry))?;
            return write_json(&updated, None);
        }

        let summary = CapitalGainsSummary::from_entries(&entries)?;
        if self.json {
            write_json(&GainsOutput { entries, summary }, None)
        } else {
            print_table(&entries, &summary);
            Ok(())
        }
    }
}

fn print_table(entries: &[CapitalGainEntry], summary: &CapitalGainsSummary) {
    if entries.is_empty() {
        println!("No entries found");
        return;
    }

    let rows: Vec<GainRow> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| GainRow {
            row: i + 1,
            asset_type: e.asset_type.to_string(),
            symbol: e.symbol.clone().unwrap_or_default(),
            sale_date: e.sale_date.format("%Y-%m-%d").to_string(),
            held: e.holding_period_days,
            term: if e.is_long_term { "LTCG" } else { "STCG" }.to_string(),
            cost: format_inr(e.acquisition_cost),
            proceeds: format_inr(e.sale_proceeds),
            gain: format_inr(e.capital_gain),
            taxable: format_inr(e.taxable_capital_gain),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    println!();
    println!("CAPITAL GAINS SUMMARY");
    println!(
        "  Short-term: {} | Long-term: {} | Losses: {}",
        format_inr(summary.short_term_gains),
        format_inr(summary.long_term_gains),
        format_inr(summary.losses)
    );
    println!(
        "  Foreign shares: {} | Withholding (advisory): {}",
        format_inr(summary.foreign_share_gains),
        format_inr(summary.withholding_estimate)
    );
    println!();
}

#[derive(Debug, Clone, Tabled)]
struct GainRow {
    #[tabled(rename = "#")]
    row: usize,
    #[tabled(rename = "Asset")]
    asset_type: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Sold")]
    sale_date: String,
    #[tabled(rename = "Days")]
    held: i64,
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Gain/Loss")]
    gain: String,
    #[tabled(rename = "Taxable")]
    taxable: String,
}
