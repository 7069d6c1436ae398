//! CLI argument parsing for the mailsift-worker binary.

use clap::{Parser, Subcommand};

use crate::types::DuplicateHandling;

#[derive(Parser)]
#[command(name = "mailsift-worker", about = "Bulk subscriber import and validation worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a CSV file, printing live progress and the final summary
    Run {
        /// Path to the CSV file to import
        file: String,
        /// Source column holding email addresses (auto-detected if omitted)
        #[arg(long)]
        email_column: Option<String>,
        /// Confidence score below which records are classified risky
        #[arg(long)]
        threshold: Option<u8>,
        /// Records per processing batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Duplicate policy: skip, update or replace
        #[arg(long, default_value = "skip")]
        duplicates: String,
        /// Where to write the CSV report (default: <file>.report.csv)
        #[arg(long)]
        report: Option<String>,
    },
    /// Print the auto-detected column mapping for a CSV file and exit
    Inspect {
        /// Path to the CSV file to inspect
        file: String,
    },
}

/// Parse the `--duplicates` flag into a policy.
pub fn parse_duplicate_handling(raw: &str) -> Result<DuplicateHandling, String> {
    match raw {
        "skip" => Ok(DuplicateHandling::Skip),
        "update" => Ok(DuplicateHandling::Update),
        "replace" => Ok(DuplicateHandling::Replace),
        other => Err(format!(
            "unknown duplicate policy '{}' (expected: skip, update, replace)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_run_command_parses_with_defaults() {
        let cli = Cli::parse_from(["mailsift-worker", "run", "subscribers.csv"]);
        match cli.command {
            Command::Run {
                file,
                email_column,
                duplicates,
                ..
            } => {
                assert_eq!(file, "subscribers.csv");
                assert!(email_column.is_none());
                assert_eq!(duplicates, "skip");
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_run_command_parses_overrides() {
        let cli = Cli::parse_from([
            "mailsift-worker",
            "run",
            "subscribers.csv",
            "--email-column",
            "E-Mail",
            "--threshold",
            "60",
            "--batch-size",
            "200",
            "--duplicates",
            "update",
        ]);
        match cli.command {
            Command::Run {
                email_column,
                threshold,
                batch_size,
                duplicates,
                ..
            } => {
                assert_eq!(email_column.as_deref(), Some("E-Mail"));
                assert_eq!(threshold, Some(60));
                assert_eq!(batch_size, Some(200));
                assert_eq!(duplicates, "update");
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_inspect_command_parses() {
        let cli = Cli::parse_from(["mailsift-worker", "inspect", "subscribers.csv"]);
        assert!(matches!(cli.command, Command::Inspect { .. }));
    }

    #[test]
    fn test_parse_duplicate_handling() {
        assert_eq!(parse_duplicate_handling("skip"), Ok(DuplicateHandling::Skip));
        assert_eq!(
            parse_duplicate_handling("replace"),
            Ok(DuplicateHandling::Replace)
        );
        assert!(parse_duplicate_handling("merge").is_err());
    }
}
