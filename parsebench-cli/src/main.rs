// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Parsebench CLI
//!
//! Command-line interface for benchmarking parser implementations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// Parsebench - benchmark interchangeable parsers over a corpus
#[derive(Parser)]
#[command(name = "parsebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "parsebench.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every parser over the corpus and write a report
    Run {
        /// Directory the report is written to
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Report file name
        #[arg(long, default_value = parsebench_benchmark::DEFAULT_REPORT_FILE)]
        file_name: String,

        /// Name the report after the current time instead
        #[arg(long, conflicts_with = "file_name")]
        timestamped: bool,

        /// Override the configured number of measured iterations
        #[arg(short, long)]
        iterations: Option<u64>,

        /// Only run these parsers (repeatable)
        #[arg(short, long = "parser")]
        parsers: Vec<String>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// List configured parsers
    List,

    /// Send one input to one parser and print the outcome
    Probe {
        /// Parser name
        name: String,

        /// Source text; read from stdin when omitted
        #[arg(long)]
        input: Option<String>,
    },

    /// Print the summary of a saved report
    Show {
        /// Path to the report JSON file
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            output,
            file_name,
            timestamped,
            iterations,
            parsers,
        } => {
            let options = commands::run::RunOptions {
                output,
                file_name,
                timestamped,
                iterations,
                parsers,
            };
            commands::run::execute(&cli.config, options).await
        }
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::List => commands::list::execute(&cli.config).await,
        Commands::Probe { name, input } => commands::probe::execute(&cli.config, &name, input).await,
        Commands::Show { report } => commands::show::execute(&report).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "parsebench",
            "-c",
            "bench.yaml",
            "run",
            "--iterations",
            "5",
            "--parser",
            "qasm_ts",
            "--parser",
            "rust",
        ])
        .unwrap();

        assert_eq!(cli.config, "bench.yaml");
        match cli.command {
            Commands::Run {
                file_name,
                timestamped,
                iterations,
                parsers,
                ..
            } => {
                assert_eq!(file_name, "benchmark_results.json");
                assert!(!timestamped);
                assert_eq!(iterations, Some(5));
                assert_eq!(parsers, vec!["qasm_ts", "rust"]);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_timestamped_conflicts_with_file_name() {
        let result = Cli::try_parse_from([
            "parsebench",
            "run",
            "--timestamped",
            "--file-name",
            "out.json",
        ]);
        assert!(result.is_err());
    }
}
