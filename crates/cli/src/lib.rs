pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "recommender",
    about = "Product recommender operator CLI",
    long_about = "Apply migrations, load the demo catalog, inspect configuration, check readiness, and run one-shot recommendations.",
    after_help = "Examples:\n  recommender doctor --json\n  recommender seed\n  recommender recommend demo-banana-chips --n 3 --method content"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo catalog, orders and interactions")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, schema state and catalog readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Build the engine once and print recommendations for a product as JSON")]
    Recommend {
        #[arg(help = "Product id to anchor recommendations on")]
        product: String,
        #[arg(long, help = "Number of recommendations (defaults to engine.default_count)")]
        n: Option<usize>,
        #[arg(
            long,
            default_value = "hybrid",
            help = "content, collaborative, matrix_factorization or hybrid"
        )]
        method: String,
        #[arg(long, help = "Allow recommendations outside the product's category")]
        no_category_filter: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Recommend { product, n, method, no_category_filter } => {
            commands::recommend::run(commands::recommend::RecommendArgs {
                product_id: product,
                count: n,
                method,
                category_filter: !no_category_filter,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
