//! Merge command - fold extracted document values into a return

use crate::cmd::{open_input, read_return, write_json, RulesArgs};
use clap::Args;
use itrc::core::{merge, merge_extracted, MergePolicy, TaxReturn};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MergeCommand {
    /// Existing return JSON (or "-" for stdin); starts from an empty return if omitted
    #[arg(short = 'r', long = "return")]
    tax_return: Option<PathBuf>,

    /// Extracted field map JSON, merged in the order given
    #[arg(short, long = "fragment", required = true, num_args = 1..)]
    fragments: Vec<PathBuf>,

    /// Skip unknown fields with a warning instead of failing
    #[arg(long)]
    ignore_unknown: bool,

    /// Write the merged return to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl MergeCommand {
    pub fn exec(&self, rules: &RulesArgs) -> anyhow::Result<()> {
        let policy = if self.ignore_unknown {
            MergePolicy::Ignore
        } else {
            MergePolicy::Reject
        };

        let mut merged = match &self.tax_return {
            Some(path) => read_return(path)?,
            None => TaxReturn::new(rules.load()?.assessment_year),
        };

        for path in &self.fragments {
            let map = merge::read_field_map(open_input(path)?)
                .map_err(|err| anyhow::anyhow!("{}: {}", path.display(), err))?;
            merged = merge_extracted(&merged, &map, policy)
                .map_err(|err| anyhow::anyhow!("{}: {}", path.display(), err))?;
        }

        write_json(&merged, self.output.as_deref())
    }
}
