//! FILENAME: app/report-service/src/scheduled.rs
//! PURPOSE: Renders scheduled cross-tab reports into email payloads.
//! CONTEXT: Uses the same engine entry point as the report builder, so a
//! scheduled report always matches what the builder shows. Delivery is
//! handled elsewhere.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::generate_cross_tab;
use crate::config::ScheduledReport;
use crate::types::CrossTabResponse;
use crate::{log_error, log_info, AppState};

/// Everything a mailer needs to send one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub report_name: String,
    pub subject: String,
    pub recipients: Vec<String>,
    /// RFC 3339, UTC
    pub generated_at: String,
    pub result: CrossTabResponse,
}

/// Builds the payload for one scheduled report
pub fn render_scheduled_report(
    state: &AppState,
    report: &ScheduledReport,
    now: DateTime<Utc>,
) -> Result<ReportPayload, String> {
    let result = generate_cross_tab(state, report.request.clone())?;

    let subject = format!(
        "{}: {} by {} ({})",
        report.name,
        result.metadata.row_field.title(),
        result.metadata.column_field.title(),
        now.format("%Y-%m-%d")
    );

    Ok(ReportPayload {
        report_name: report.name.clone(),
        subject,
        recipients: report.recipients.clone(),
        generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        result,
    })
}

/// Renders every configured report due at `now`, in configured order.
/// A failing report does not stop the others.
pub fn render_due_reports(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<Vec<Result<ReportPayload, String>>, String> {
    let reports = state
        .scheduled_reports
        .lock()
        .map_err(|e| format!("Lock error: {}", e))?
        .clone();

    let due: Vec<&ScheduledReport> = reports.iter().filter(|r| r.frequency.is_due(now)).collect();
    log_info!(
        "SCHEDULE",
        "{} of {} scheduled reports due at {}",
        due.len(),
        reports.len(),
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    Ok(due
        .into_iter()
        .map(|report| {
            render_scheduled_report(state, report, now).map_err(|e| {
                log_error!(
                    "SCHEDULE",
                    "report '{}' ({}) failed: {}",
                    report.name,
                    report.frequency.as_str(),
                    e
                );
                format!("{}: {}", report.name, e)
            })
        })
        .collect())
}
