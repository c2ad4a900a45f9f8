//! FILENAME: app/report-service/src/config.rs
//! PURPOSE: Service configuration loaded from a JSON file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc, Weekday};
use crosstab_engine::EngineSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CrossTabRequestDto;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How often a scheduled report is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFrequency {
    #[default]
    Daily,
    /// Mondays
    Weekly,
    /// The first of the month
    Monthly,
}

impl ReportFrequency {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            ReportFrequency::Daily => true,
            ReportFrequency::Weekly => now.weekday() == Weekday::Mon,
            ReportFrequency::Monthly => now.day() == 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFrequency::Daily => "daily",
            ReportFrequency::Weekly => "weekly",
            ReportFrequency::Monthly => "monthly",
        }
    }
}

/// A cross-tab emailed on a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReport {
    pub name: String,
    pub request: CrossTabRequestDto,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub frequency: ReportFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Unified log file; console only when absent
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub scheduled_reports: Vec<ScheduledReport>,
}

impl ServiceConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
