pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::list::ListArgs;

#[derive(Debug, Parser)]
#[command(
    name = "baja",
    about = "Equipment decommission operator CLI",
    long_about = "Operate the decommission request store: migrations, demo catalog, config inspection, and request listings.",
    after_help = "Examples:\n  baja migrate\n  baja seed\n  baja list --state pending --page-size 10"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo equipment catalog so requests can be created right away")]
    Seed {
        #[arg(long, help = "Remove the demo equipment instead of loading it")]
        clean: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "List decommission requests with filters, ordering, and paging")]
    List(ListArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { clean } => commands::seed::run(clean),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::List(args) => commands::list::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
