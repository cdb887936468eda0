use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod cmd;

/// Indian income tax return calculator
#[derive(Parser, Debug)]
#[command(name = "itrc", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    rules: cmd::RulesArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute tax under both regimes and recommend one
    Compute(cmd::compute::ComputeCommand),
    /// Merge extracted document values into a return
    Merge(cmd::merge::MergeCommand),
    /// Classify capital gain entries
    Gains(cmd::gains::GainsCommand),
    /// List asset holdings and the Schedule FA total
    Assets(cmd::assets::AssetsCommand),
    /// Select the ITR form and schedules
    Select(cmd::select::SelectCommand),
    /// Check a return before filing
    Validate(cmd::validate::ValidateCommand),
    /// Generate the filing document
    Generate(cmd::generate::GenerateCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Compute(c) => c.exec(&cli.rules).map(|_| true),
        Command::Merge(c) => c.exec(&cli.rules).map(|_| true),
        Command::Gains(c) => c.exec(&cli.rules).map(|_| true),
        Command::Assets(c) => c.exec().map(|_| true),
        Command::Select(c) => c.exec().map(|_| true),
        Command::Validate(c) => c.exec(),
        Command::Generate(c) => c.exec(&cli.rules).map(|_| true),
        Command::Schema(c) => c.exec().map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}
