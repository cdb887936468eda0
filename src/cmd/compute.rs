//! Compute command - both regimes side by side with a recommendation

use crate::cmd::{format_inr, format_percent, read_return, write_json, RulesArgs};
use clap::Args;
use itrc::core::{RegimeResult, TaxComputation};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ComputeCommand {
    /// Return JSON file (or "-" for stdin)
    #[arg(short = 'r', long = "return")]
    tax_return: PathBuf,

    /// Write the return with both computations attached to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl ComputeCommand {
    pub fn exec(&self, rules: &RulesArgs) -> anyhow::Result<()> {
        let rules = rules.load()?;
        let tax_return = read_return(&self.tax_return)?;
        let computation = tax_return.compute(&rules)?;

        if let Some(output) = &self.output {
            write_json(&tax_return.with_computation(&computation), Some(output))?;
        }

        if self.json {
            write_json(&computation, None)
        } else {
            print_table(&computation, &rules.assessment_year.display());
            Ok(())
        }
    }
}

fn print_table(computation: &TaxComputation, year: &str) {
    let new = &computation.new_regime;
    let old = &computation.old_regime;
    let line = |item: &str, value: fn(&RegimeResult) -> Option<Decimal>| ComputeRow {
        item: item.to_string(),
        new_regime: value(new).map_or("-".to_string(), format_inr),
        old_regime: value(old).map_or("-".to_string(), format_inr),
    };

    let rows = vec![
        line("Total income", |r| Some(r.total_income)),
        line("Standard deduction", |r| r.standard_deduction),
        line("Deductions", |r| r.deductions_total),
        line("Taxable income", |r| Some(r.taxable_income)),
        line("Tax", |r| Some(r.tax)),
        line("Surcharge", |r| Some(r.surcharge)),
        line("Cess", |r| Some(r.cess)),
        line("Total tax", |r| Some(r.total_tax)),
        line("Tax credited", |r| Some(r.tds_credited)),
        line("Tax payable", |r| Some(r.tax_payable)),
        line("Refund due", |r| Some(r.refund_due)),
    ];

    println!();
    println!("TAX COMPUTATION (AY {})", year);
    println!();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    let cmp = &computation.comparison;
    println!();
    println!(
        "Recommended: {} regime (savings {}, {})",
        cmp.recommendation,
        format_inr(cmp.savings.abs()),
        format_percent(cmp.savings_percentage.abs())
    );
    println!();
}

#[derive(Debug, Clone, Tabled)]
struct ComputeRow {
    #[tabled(rename = "")]
    item: String,
    #[tabled(rename = "New regime")]
    new_regime: String,
    #[tabled(rename = "Old regime")]
    old_regime: String,
}
