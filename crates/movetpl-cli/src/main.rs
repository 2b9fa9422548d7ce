//! movetpl command-line tool
//!
//! Inspects compiled Move modules and derives new modules from templates by
//! renaming identifiers and swapping constant values.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod plan;

use commands::{apply, assemble, constants, inspect, patch_constant, rename, roundtrip, version};

#[derive(Parser)]
#[command(name = "movetpl")]
#[command(about = "Move bytecode template patcher", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// When to use colors: auto, always, never
    #[arg(long, global = true, value_name = "WHEN")]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the library version
    Version,

    /// Summarize a module
    Inspect {
        /// Compiled module
        module: PathBuf,
        /// Dump the whole module as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the constant pool
    Constants {
        /// Compiled module
        module: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename identifiers
    Rename {
        /// Compiled module
        module: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Rename as Old=New (repeatable)
        #[arg(short, long = "map", value_name = "OLD=NEW", value_parser = rename::parse_mapping, required = true)]
        mappings: Vec<(String, String)>,
    },

    /// Replace one constant value
    PatchConstant {
        /// Compiled module
        module: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Constant type, such as U8 or Vector(U8)
        #[arg(long = "type", value_name = "TAG")]
        type_tag: String,
        /// Current value bytes, hex encoded
        #[arg(long, value_name = "HEX", value_parser = patch_constant::parse_hex)]
        expected: patch_constant::HexBytes,
        /// Replacement value bytes, hex encoded
        #[arg(long, value_name = "HEX", value_parser = patch_constant::parse_hex)]
        new: patch_constant::HexBytes,
    },

    /// Apply a TOML patch plan
    Apply {
        /// Compiled module
        module: PathBuf,
        /// Patch plan
        #[arg(short, long)]
        plan: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check that a module re-encodes to identical bytes
    Roundtrip {
        /// Compiled module
        module: PathBuf,
    },

    /// Rebuild a module from a JSON dump
    Assemble {
        /// JSON produced by `inspect --json`
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env("MOVETPL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let color = output::resolve_color_choice(cli.color.as_deref());

    match cli.command {
        Commands::Version => version::execute(),
        Commands::Inspect { module, json } => inspect::execute(&module, json, color),
        Commands::Constants { module, json } => constants::execute(&module, json, color),
        Commands::Rename {
            module,
            output,
            mappings,
        } => rename::execute(&module, &output, &mappings),
        Commands::PatchConstant {
            module,
            output,
            type_tag,
            expected,
            new,
        } => patch_constant::execute(&module, &output, &type_tag, &expected.0, &new.0),
        Commands::Apply {
            module,
            plan,
            output,
        } => apply::execute(&module, &plan, &output),
        Commands::Roundtrip { module } => roundtrip::execute(&module, color),
        Commands::Assemble { input, output } => assemble::execute(&input, &output),
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
    fn test_parse_patch_constant_args() {
        let cli = Cli::try_parse_from([
            "movetpl",
            "patch-constant",
            "coin.mv",
            "-o",
            "out.mv",
            "--type",
            "U8",
            "--expected",
            "06",
            "--new",
            "0x03",
        ])
        .unwrap();
        match cli.command {
            Commands::PatchConstant {
                type_tag,
                expected,
                new,
                ..
            } => {
                assert_eq!(type_tag, "U8");
                assert_eq!(expected.0, vec![6]);
                assert_eq!(new.0, vec![3]);
            }
            _ => panic!("expected patch-constant"),
        }
    }

    #[test]
    fn test_parse_rename_args() {
        let cli = Cli::try_parse_from([
            "movetpl", "-vv", "rename", "coin.mv", "-o", "out.mv", "--map", "TEMPLATE=MCN",
            "--map", "template=mcn",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Rename { mappings, .. } => assert_eq!(
                mappings,
                [
                    ("TEMPLATE".to_string(), "MCN".to_string()),
                    ("template".to_string(), "mcn".to_string()),
                ]
            ),
            _ => panic!("expected rename"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_hex() {
        let result = Cli::try_parse_from([
            "movetpl",
            "patch-constant",
            "coin.mv",
            "-o",
            "out.mv",
            "--type",
            "U8",
            "--expected",
            "6",
            "--new",
            "03",
        ]);
        assert!(result.is_err());
    }
}
