pub mod assets;
pub mod compute;
pub mod gains;
pub mod generate;
pub mod merge;
pub mod schema;
pub mod select;
pub mod validate;

use clap::Args;
use itrc::core::{load_rules, tax_return, AssessmentYear, RuleSet, TaxReturn};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Where the tax tables come from
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// JSON rules file to use instead of the built-in tables
    #[arg(long, global = true, env = "ITRC_RULES")]
    rules: Option<PathBuf>,

    /// Assessment year of the built-in tables (e.g., 2025-26)
    #[arg(long, global = true, default_value = "2025-26")]
    year: AssessmentYear,
}

impl RulesArgs {
    pub fn load(&self) -> anyhow::Result<RuleSet> {
        match &self.rules {
            Some(path) => {
                log::info!("Loading rules from {}", path.display());
                load_rules(BufReader::new(File::open(path)?))
            }
            None => Ok(RuleSet::for_year(self.year)?),
        }
    }
}

/// Open a file for reading (or stdin with "-")
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path.as_os_str() != "-" {
        let file = File::open(path)
            .map_err(|err| anyhow::anyhow!("Cannot open {}: {}", path.display(), err))?;
        return Ok(Box::new(BufReader::new(file)));
    }

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(Box::new(io::Cursor::new(buffer)))
}

/// Read a return (JSON) from a file or stdin
pub fn read_return(path: &Path) -> anyhow::Result<TaxReturn> {
    tax_return::read_json(open_input(path)?)
}

pub fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Rupees with Indian digit grouping, e.g. ₹12,34,567
pub fn format_inr(amount: Decimal) -> String {
    let sign = if amount < Decimal::ZERO { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, paise) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = if whole.len() <= 3 {
        whole.to_string()
    } else {
        let (head, tail) = whole.split_at(whole.len() - 3);
        let mut groups = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (front, back) = rest.split_at(rest.len() - 2);
            groups.push(back);
            rest = front;
        }
        groups.push(rest);
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    if paise == "00" {
        format!("{sign}₹{grouped}")
    } else {
        format!("{sign}₹{grouped}.{paise}")
    }
}

pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", value)
}
