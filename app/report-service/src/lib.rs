//! FILENAME: app/report-service/src/lib.rs
//! PURPOSE: Report service state and the callers of the cross-tab engine.
//! CONTEXT: The interactive report builder (`commands`) and the scheduled
//! email renderer (`scheduled`) both go through `compute_cross_tab_with`.

use std::sync::{Arc, Mutex};

use crosstab_engine::{EngineSettings, FieldCatalog, MemoryStore, RecordStore};

pub mod commands;
pub mod config;
pub mod logging;
pub mod scheduled;
pub mod types;
pub mod utils;

pub use commands::{drill_down_cross_tab, generate_cross_tab};
pub use config::{ConfigError, ReportFrequency, ScheduledReport, ServiceConfig};
pub use scheduled::{render_due_reports, render_scheduled_report, ReportPayload};
pub use types::*;

/// Shared state handed to every command
pub struct AppState {
    pub catalog: Arc<dyn FieldCatalog>,
    pub store: Arc<dyn RecordStore>,
    pub settings: Mutex<EngineSettings>,
    pub scheduled_reports: Mutex<Vec<ScheduledReport>>,
}

impl AppState {
    /// State over one backend serving as both catalog and record store
    pub fn with_store<S>(store: Arc<S>, settings: EngineSettings) -> Self
    where
        S: FieldCatalog + RecordStore + 'static,
    {
        AppState {
            catalog: store.clone(),
            store,
            settings: Mutex::new(settings),
            scheduled_reports: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current engine settings
    pub fn settings(&self) -> Result<EngineSettings, String> {
        self.settings
            .lock()
            .map(|guard| guard.clone())
            .map_err(|e| format!("Lock error: {}", e))
    }
}

/// Creates state over an empty in-memory store
pub fn create_app_state() -> AppState {
    log_info!("SYS", "Creating AppState");
    AppState::with_store(Arc::new(MemoryStore::new()), EngineSettings::default())
}

/// Creates state from a loaded config, installing the unified logger
pub fn create_app_state_from_config<S>(store: Arc<S>, config: &ServiceConfig) -> Result<AppState, String>
where
    S: FieldCatalog + RecordStore + 'static,
{
    logging::init_logging(config.log_file.as_deref(), log::LevelFilter::Debug)?;
    log_info!(
        "SYS",
        "Creating AppState scheduled_reports={} drill_down_limit={}",
        config.scheduled_reports.len(),
        config.engine.drill_down_limit
    );
    let state = AppState::with_store(store, config.engine.clone());
    state
        .scheduled_reports
        .lock()
        .map_err(|e| format!("Lock error: {}", e))?
        .extend(config.scheduled_reports.iter().cloned());
    Ok(state)
}
