//! Generate command - build the filing document for upload

use crate::cmd::{read_return, write_json, RulesArgs};
use clap::Args;
use itrc::core::generate_filing;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Return JSON file (or "-" for stdin)
    #[arg(short = 'r', long = "return")]
    tax_return: PathBuf,

    /// Compute both regimes first instead of using the attached computations
    #[arg(long)]
    compute: bool,

    /// Directory to write the document to, named <ITR>_<PAN>_AY<year>.json
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Also write the submitted return to this file
    #[arg(long)]
    save_return: Option<PathBuf>,
}

impl GenerateCommand {
    pub fn exec(&self, rules: &RulesArgs) -> anyhow::Result<()> {
        let mut tax_return = read_return(&self.tax_return)?;
        if self.compute {
            let computation = tax_return.compute(&rules.load()?)?;
            tax_return = tax_return.with_computation(&computation);
        }

        let filed_at = chrono::Utc::now().fixed_offset();
        let filing = generate_filing(&tax_return, filed_at)?;

        if let Some(path) = &self.save_return {
            write_json(&filing.tax_return, Some(path))?;
        }

        match &self.out_dir {
            Some(dir) => {
                let path = dir.join(&filing.file_name);
                write_json(&filing.document, Some(&path))?;
                println!("{}", path.display());
                Ok(())
            }
            None => write_json(&filing.document, None),
        }
    }
}
