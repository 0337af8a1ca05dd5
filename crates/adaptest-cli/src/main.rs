//! adaptest CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "adaptest", version, about = "Computerized adaptive testing engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated adaptive session against an item bank
    Simulate {
        /// Path to a .toml item bank
        #[arg(long)]
        bank: PathBuf,

        /// True ability of the simulated learner
        #[arg(long, default_value = "0.0")]
        true_theta: f64,

        /// RNG seed for a reproducible simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Only administer items from this topic
        #[arg(long)]
        topic: Option<String>,

        /// Name of the simulated learner
        #[arg(long, default_value = "Simulated Learner")]
        learner: String,

        /// Override the default maximum item count
        #[arg(long)]
        max_items: Option<usize>,

        /// Override the default target standard error
        #[arg(long)]
        target_se: Option<f64>,

        /// Output format: table, json, markdown
        #[arg(long, default_value = "table")]
        format: String,

        /// Write the session report JSON here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the final session snapshot JSON here
        #[arg(long)]
        save_snapshot: Option<PathBuf>,

        /// Persist the final snapshot into this session store directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Validate item bank TOML files
    Validate {
        /// Path to an item bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Render the report for a stored session snapshot
    Report {
        /// Path to a session snapshot JSON
        #[arg(long)]
        snapshot: PathBuf,

        /// Path to the item bank the session ran against
        #[arg(long)]
        bank: PathBuf,

        /// Output format: table, json, markdown
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List sessions in the snapshot store
    Sessions {
        /// Session store directory (defaults to the platform data dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adaptest=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            bank,
            true_theta,
            seed,
            topic,
            learner,
            max_items,
            target_se,
            format,
            output,
            save_snapshot,
            data_dir,
        } => commands::simulate::execute(
            bank,
            true_theta,
            seed,
            topic,
            learner,
            max_items,
            target_se,
            format,
            output,
            save_snapshot,
            data_dir,
        ),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Report {
            snapshot,
            bank,
            format,
        } => commands::report::execute(snapshot, bank, format),
        Commands::Sessions { data_dir, format } => commands::sessions::execute(data_dir, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
