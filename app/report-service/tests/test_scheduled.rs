//! FILENAME: tests/test_scheduled.rs
//! Integration tests for config loading and scheduled report rendering.

mod common;

use std::io::Write;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::*;
use report_service::{
    create_app_state_from_config, generate_cross_tab, render_due_reports,
    render_scheduled_report, ReportFrequency, ScheduledReport, ServiceConfig,
};

fn report(name: &str, frequency: ReportFrequency) -> ScheduledReport {
    ScheduledReport {
        name: name.to_string(),
        request: request(GENDER, DISABILITY),
        recipients: vec!["ops@example.org".to_string()],
        frequency,
    }
}

#[test]
fn test_render_scheduled_report_payload() {
    let harness = TestHarness::with_survey_data();
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 6, 30, 0).unwrap();

    let payload =
        render_scheduled_report(&harness.state, &report("Weekly split", ReportFrequency::Weekly), now)
            .unwrap();

    assert_eq!(payload.report_name, "Weekly split");
    assert_eq!(payload.subject, "Weekly split: Gender by Disability Type (2024-07-01)");
    assert_eq!(payload.recipients, vec!["ops@example.org"]);
    assert_eq!(payload.generated_at, "2024-07-01T06:30:00Z");
    assert_eq!(payload.result.grand_total, 7.0);
}

#[test]
fn test_scheduled_and_interactive_results_match() {
    let harness = TestHarness::with_survey_data();
    let mut scheduled = report("Pune talukas", ReportFrequency::Daily);
    scheduled.request = request(LOCATION, GENDER);
    scheduled.request.filters.push(location_filter(&["Pune"]));
    scheduled.request.aggregation_type = Some("percent_row".to_string());

    let now = Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap();
    let payload = render_scheduled_report(&harness.state, &scheduled, now).unwrap();
    let interactive = generate_cross_tab(&harness.state, scheduled.request.clone()).unwrap();

    assert_eq!(payload.result, interactive);
}

#[test]
fn test_due_reports_by_frequency() {
    let harness = TestHarness::with_survey_data();
    harness.state.scheduled_reports.lock().unwrap().extend([
        report("daily", ReportFrequency::Daily),
        report("weekly", ReportFrequency::Weekly),
        report("monthly", ReportFrequency::Monthly),
    ]);

    // 2024-07-01 is a Monday and the first of the month
    let monday_first = Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap();
    let due = render_due_reports(&harness.state, monday_first).unwrap();
    let names: Vec<String> = due
        .iter()
        .map(|r| r.as_ref().unwrap().report_name.clone())
        .collect();
    assert_eq!(names, vec!["daily", "weekly", "monthly"]);

    let tuesday = Utc.with_ymd_and_hms(2024, 7, 2, 6, 0, 0).unwrap();
    let due = render_due_reports(&harness.state, tuesday).unwrap();
    assert_eq!(due.len(), 1);
}

#[test]
fn test_failing_report_does_not_block_others() {
    let harness = TestHarness::with_survey_data();
    let mut broken = report("broken", ReportFrequency::Daily);
    broken.request.column_field_id = 99;
    harness
        .state
        .scheduled_reports
        .lock()
        .unwrap()
        .extend([broken, report("daily", ReportFrequency::Daily)]);

    let now = Utc.with_ymd_and_hms(2024, 7, 2, 6, 0, 0).unwrap();
    let due = render_due_reports(&harness.state, now).unwrap();

    assert_eq!(due.len(), 2);
    let err = due[0].as_ref().unwrap_err();
    assert!(err.starts_with("broken:"), "{}", err);
    assert!(due[1].is_ok());
}

#[test]
fn test_state_from_config_file_logs_unified_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs").join("report.log");

    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"{{
            "logFile": {log},
            "engine": {{"drillDownLimit": 25}},
            "scheduledReports": [{{
                "name": "Monthly split",
                "request": {{"rowFieldId": 1, "columnFieldId": 2}},
                "recipients": ["board@example.org"],
                "frequency": "monthly"
            }}]
        }}"#,
        log = serde_json::to_string(&log_path).unwrap()
    )
    .unwrap();

    let config = ServiceConfig::load(config_file.path()).unwrap();
    let state = create_app_state_from_config(Arc::new(survey_store()), &config).unwrap();

    assert_eq!(state.settings().unwrap().drill_down_limit, 25);
    assert_eq!(state.scheduled_reports.lock().unwrap().len(), 1);

    generate_cross_tab(&state, request(GENDER, DISABILITY)).unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert!(lines.iter().any(|l| l.contains("|I|SYS|Creating AppState")));
    assert!(lines.iter().any(|l| l.contains("|D|CROSSTAB|ENTER generate_cross_tab")));
    for line in &lines {
        let seq = line.split('|').next().unwrap();
        assert!(seq.parse::<u64>().is_ok(), "{}", line);
    }
}
