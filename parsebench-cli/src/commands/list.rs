// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `parsebench list` command - List parsers from configuration.

use parsebench_core::ConfigLoader;

use super::program_of;

pub async fn execute(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;

    println!("╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                            CONFIGURED PARSERS                                ║");
    println!("╠═══════════════════════╦════════════╦═════════════════════════════════════════╣");
    println!("║ Name                  ║ Kind       ║ Program                                 ║");
    println!("╠═══════════════════════╬════════════╬═════════════════════════════════════════╣");

    for parser in &config.parsers {
        println!(
            "║ {:<21} ║ {:<10} ║ {:<39} ║",
            parser.name.as_str(),
            parser.kind.name(),
            program_of(parser).as_str()
        );
    }

    println!("╚═══════════════════════╩════════════╩═════════════════════════════════════════╝");
    println!();
    println!("Total: {} parser(s)", config.parsers.len());

    Ok(())
}
