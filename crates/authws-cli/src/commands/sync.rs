//! Synchronisation command.

use std::path::Path;

use authws_federation::{ReconciliationPlan, SyncEngine, SyncReport, TraceLevel, TraceLog};
use authws_storage::JsonDirectoryFile;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::SyncArgs;
use crate::config::OutputFormat;
use crate::output::{info, output, output_single, success, trace, warning};
use crate::CliConfig;

/// A planned action for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PlanRow {
    /// Action kind.
    pub action: &'static str,
    /// Local identity ID, if any.
    #[tabled(display_with = "display_id")]
    pub id: Option<i64>,
    /// External ID.
    pub idnumber: String,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
}

fn display_id(id: &Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

/// Flattens a plan into display rows.
#[must_use]
pub fn plan_rows(plan: &ReconciliationPlan) -> Vec<PlanRow> {
    let creates = plan.to_create.iter().map(|c| PlanRow {
        action: "create",
        id: None,
        idnumber: c.idnumber.clone(),
        username: c.local_username(),
        email: c.email.clone(),
    });
    let updates = plan.to_update.iter().map(|u| PlanRow {
        action: "update",
        id: Some(u.local.id),
        idnumber: u.candidate.idnumber.clone(),
        username: u.candidate.local_username(),
        email: u.candidate.email.clone(),
    });
    let suspends = plan.to_suspend.iter().map(|l| PlanRow {
        action: "suspend",
        id: Some(l.id),
        idnumber: l.idnumber.clone(),
        username: l.username.clone(),
        email: l.email.clone(),
    });
    creates.chain(updates).chain(suspends).collect()
}

/// Runs the sync command.
pub async fn run_sync(
    args: SyncArgs,
    config: &CliConfig,
    directory_arg: Option<&Path>,
    output_format: OutputFormat,
) -> crate::CliResult<()> {
    let ws = config.ws()?;
    let transport = super::transport(ws)?;
    let engine = SyncEngine::new(ws.clone(), transport);

    let file = JsonDirectoryFile::new(config.effective_directory(directory_arg));
    let directory = file.load()?;

    let mut log = TraceLog::new();
    let result = if args.dry_run {
        engine
            .plan_only(&directory, &mut log)
            .await
            .map(|(plan, report)| (Some(plan), report))
    } else {
        engine
            .run(&directory, &directory, &mut log)
            .await
            .map(|report| (None, report))
    };

    if matches!(output_format, OutputFormat::Table) {
        trace(&log, TraceLevel::Info);
    }
    if let Some(path) = &args.trace {
        std::fs::write(path, serde_json::to_string_pretty(&log)?)?;
    }

    let (plan, report) = result?;

    if let Some(plan) = plan {
        output(&plan_rows(&plan), output_format)?;
    } else {
        file.save(&directory)?;
        tracing::debug!(path = %file.path().display(), "Directory file saved");
    }
    report_summary(&report, output_format)
}

fn report_summary(report: &SyncReport, output_format: OutputFormat) -> crate::CliResult<()> {
    match output_format {
        OutputFormat::Table => {
            println!();
            info(&format!(
                "{} fetched, {} rejected, {} duplicates, {} staged",
                report.fetched, report.rejected, report.duplicates, report.staged
            ));
            for err in &report.errors {
                let who = err.username.as_deref().unwrap_or(&err.external_id);
                warning(&format!("{who}: {}", err.message));
            }
            if report.has_errors() {
                warning(&report.status);
            } else {
                success(&report.status);
            }
            Ok(())
        }
        _ => output_single(report, output_format),
    }
}
