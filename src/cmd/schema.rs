//! Schema command - print expected input formats

use clap::Args;
use itrc::core::merge::Section;
use itrc::core::{ExtractedFieldMap, RuleSet, TaxReturn};
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to describe
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for an extracted field map (merge input)
    JsonSchema,
    /// JSON Schema for a return file
    Return,
    /// JSON Schema for a rules file
    Rules,
    /// Known field names per section
    Fields,
    /// CSV header row for capital gain entries
    CsvHeader,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.format {
            SchemaFormat::JsonSchema => schema_for!(ExtractedFieldMap),
            SchemaFormat::Return => schema_for!(TaxReturn),
            SchemaFormat::Rules => schema_for!(RuleSet),
            SchemaFormat::Fields => {
                print_fields();
                return Ok(());
            }
            SchemaFormat::CsvHeader => {
                println!("{}", CSV_COLUMNS.join(","));
                return Ok(());
            }
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}

fn print_fields() {
    for section in Section::ALL {
        println!("{}", section);
        for field in section.fields() {
            println!("  {:22} {}", field.name, field.description);
        }
        println!();
    }
    println!("personalInfo also accepts employeeName as an alias for name.");
    println!("Amounts may be numbers or strings such as \"₹ 1,50,000\".");
}

const CSV_COLUMNS: &[&str] = &[
    "assetType",
    "description",
    "symbol",
    "acquisitionDate",
    "saleDate",
    "acquisitionCost",
    "saleProceeds",
    "quantity",
    "buyPrice",
    "buyExchangeRate",
    "sellPrice",
    "sellExchangeRate",
    "currency",
    "exemptedAmount",
    "indexationFactor",
];
