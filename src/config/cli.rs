use crate::config::secrets::DEFAULT_SECRETS_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "doc-analyst")]
#[command(about = "Financial document authenticity analysis")]
pub struct Cli {
    /// Settings file (defaults to ./doc-analyst.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = DEFAULT_SECRETS_FILE)]
    pub secrets: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines (serve only)")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the full analysis on one document
    Analyze {
        file: PathBuf,

        /// bank_statement, tax_return_w2, tax_return_1099, pay_stub, investment_statement, other
        #[arg(short = 't', long, default_value = "bank_statement")]
        document_type: String,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        user_id: Option<String>,

        /// Write the JSON report; without a path it goes to `export_dir`
        #[arg(long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },

    /// Print file info and metadata signals without calling the model
    Inspect { file: PathBuf },

    /// Start the web server
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },

    /// Inspect the audit trail
    Audit {
        #[command(subcommand)]
        action: AuditCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum AuditCommand {
    Recent {
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },
    /// Check required fields and retention windows
    Check,
    /// Write the audit trail as CSV
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_analyze_with_globals() {
        let cli = Cli::try_parse_from([
            "doc-analyst",
            "analyze",
            "statement.pdf",
            "--document-type",
            "pay_stub",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.secrets, PathBuf::from("secrets.toml"));
        match cli.command {
            Command::Analyze {
                file,
                document_type,
                export,
                ..
            } => {
                assert_eq!(file, PathBuf::from("statement.pdf"));
                assert_eq!(document_type, "pay_stub");
                assert!(export.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_export_path_is_optional() {
        let cli = Cli::try_parse_from(["doc-analyst", "analyze", "a.png", "--export"]).unwrap();
        assert!(matches!(cli.command, Command::Analyze { export: Some(None), .. }));

        let cli =
            Cli::try_parse_from(["doc-analyst", "analyze", "a.png", "--export", "out.json"]).unwrap();
        match cli.command {
            Command::Analyze {
                export: Some(Some(path)),
                ..
            } => assert_eq!(path, PathBuf::from("out.json")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parses_audit_subcommands() {
        let cli = Cli::try_parse_from(["doc-analyst", "audit", "recent", "--limit", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Audit {
                action: AuditCommand::Recent { limit: 5 }
            }
        ));
        assert!(Cli::try_parse_from(["doc-analyst", "audit", "export"]).is_err());
    }
}
