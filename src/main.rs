use chrono::Utc;
use clap::Parser;
use doc_analyst::config::cli::{AuditCommand, Command};
use doc_analyst::config::secrets::resolve_api_key;
use doc_analyst::core::audit::{check_retention_compliance, export_csv, AuditLog};
use doc_analyst::core::export::{write_report, ExportReport};
use doc_analyst::core::retention::DocumentStore;
use doc_analyst::core::summary::file_info_summary;
use doc_analyst::domain::model::{AnalysisOutcome, DocumentType, Upload};
use doc_analyst::server::{run_server, AppState};
use doc_analyst::utils::error::{AnalystError, ErrorSeverity};
use doc_analyst::utils::{logger, validation::Validate};
use doc_analyst::{AnalysisEngine, Cli, DocumentPipeline, LocalStorage, OpenAiClient, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Serve { .. }) {
        logger::init_server_logger(cli.verbose, cli.json_logs);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting doc-analyst {}", env!("CARGO_PKG_VERSION"));

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Analyze {
            file,
            document_type,
            api_key,
            user_id,
            export,
        } => {
            analyze(
                &settings,
                &cli.secrets,
                &file,
                &document_type,
                api_key.as_deref(),
                user_id,
                export,
            )
            .await
        }
        Command::Inspect { file } => inspect(&settings, &file).await,
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.bind_addr.clone());
            serve(settings, cli.secrets, &addr).await
        }
        Command::Audit { action } => audit(&settings, action).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("{}", e.user_friendly_message());
        eprintln!("Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_settings(path: Option<&Path>) -> doc_analyst::Result<Settings> {
    let settings = Settings::load(path)?;
    settings.validate()?;
    Ok(settings)
}

async fn open_audit_log(settings: &Settings) -> doc_analyst::Result<AuditLog<LocalStorage>> {
    AuditLog::open(LocalStorage::new("."), settings.audit_log_path.clone()).await
}

async fn read_document(path: &Path) -> doc_analyst::Result<(String, Vec<u8>)> {
    let data = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((filename, data))
}

async fn analyze(
    settings: &Settings,
    secrets: &Path,
    file: &Path,
    document_type: &str,
    api_key: Option<&str>,
    user_id: Option<String>,
    export: Option<Option<PathBuf>>,
) -> doc_analyst::Result<()> {
    let document_type: DocumentType = document_type.parse()?;
    let (filename, data) = read_document(file).await?;
    let api_key = resolve_api_key(api_key, secrets)?;

    let model = Arc::new(OpenAiClient::new(settings, api_key)?);
    let store = Arc::new(DocumentStore::new(settings.retention_policy()));
    let audit = Arc::new(open_audit_log(settings).await?);
    let engine = AnalysisEngine::new(DocumentPipeline::new(
        model,
        store.clone(),
        audit.clone(),
        settings.max_file_size_bytes,
    ));

    let outcome = engine
        .run(Upload {
            filename,
            data,
            document_type,
            user_id,
        })
        .await?;

    // A CLI run holds the upload only until the verdict is printed.
    if let Some(document) = store.remove(&outcome.file_hash).await {
        audit
            .log_document_deletion(&document.file_hash, &document.filename)
            .await;
    }

    print_outcome(&outcome);

    if let Some(path) = export {
        let report = ExportReport::new(outcome);
        let written = match path {
            Some(path) => {
                let path = path.to_string_lossy().into_owned();
                write_report(&LocalStorage::new("."), &report, Some(path.as_str())).await?
            }
            None => {
                let storage = LocalStorage::new(&settings.export_dir);
                let name = write_report(&storage, &report, None).await?;
                Path::new(&settings.export_dir).join(name).display().to_string()
            }
        };
        println!("Report saved to: {}", written);
    }

    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let report = &outcome.report;
    println!("Document: {} ({})", outcome.filename, outcome.document_type);
    println!("Authenticity score: {}/100", report.authenticity_score);
    println!("Recommendation: {}", report.recommendation);
    if !report.summary.is_empty() {
        println!("\n{}", report.summary);
    }

    let sections = [
        ("Red flags", report.red_flags.iter().chain(&outcome.signals.red_flags)),
        (
            "Positive signals",
            report
                .positive_signals
                .iter()
                .chain(&outcome.signals.positive_signals),
        ),
    ];
    for (title, items) in sections {
        println!("\n{}:", title);
        for item in items {
            println!("  • {}", item);
        }
    }

    println!("\nFollow-up questions:");
    for (i, question) in report.follow_up_questions.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
}

async fn inspect(settings: &Settings, file: &Path) -> doc_analyst::Result<()> {
    let (filename, data) = read_document(file).await?;
    println!(
        "{}",
        file_info_summary(&data, &filename, settings.max_file_size_bytes)
    );
    Ok(())
}

async fn serve(settings: Settings, secrets: PathBuf, addr: &str) -> doc_analyst::Result<()> {
    let audit = open_audit_log(&settings).await?;
    let state = AppState::new(settings, audit, secrets);

    if let Err(e) = run_server(state, addr).await {
        tracing::error!("Server failed: {:#}", e);
        eprintln!("Server failed: {:#}", e);
        std::process::exit(3);
    }
    Ok(())
}

async fn audit(settings: &Settings, action: AuditCommand) -> doc_analyst::Result<()> {
    let log = open_audit_log(settings).await?;

    match action {
        AuditCommand::Recent { limit } => {
            let events = log.recent_events(limit).await;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        AuditCommand::Check => {
            let events = log.all_events().await;
            let report =
                check_retention_compliance(&events, &settings.retention_policy(), Utc::now());
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.compliant {
                return Err(AnalystError::ValidationError {
                    message: format!("{} compliance issue(s) found", report.issues.len()),
                });
            }
        }
        AuditCommand::Export { output } => {
            let events = log.all_events().await;
            tokio::fs::write(&output, export_csv(&events)?).await?;
            println!("Exported {} audit entries to {}", events.len(), output.display());
        }
    }

    Ok(())
}
