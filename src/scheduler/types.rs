use crate::config::Config;
use crate::model::{Schedule, ScheduleId, Shift, ShiftId, StaffId};
use crate::stats::DayWindow;
use crate::strategy::StrategyKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("data integrity: {0}")]
    DataIntegrity(&'static str),
    #[error("{} of requested {requested} shifts created: {source}", .shifts.len())]
    PartialPopulation {
        shifts: Vec<Shift>,
        requested: usize,
        source: Box<SchedError>,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchedError {
    pub(crate) fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        SchedError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        SchedError::InvalidInput(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        SchedError::InvalidState(msg.into())
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        SchedError::Unauthorized(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedError::NotFound { .. } => ErrorKind::NotFound,
            SchedError::Unauthorized(_) => ErrorKind::Unauthorized,
            SchedError::InvalidState(_) => ErrorKind::InvalidState,
            SchedError::InvalidInput(_) => ErrorKind::InvalidInput,
            SchedError::DataIntegrity(_) => ErrorKind::DataIntegrity,
            SchedError::PartialPopulation { .. } => ErrorKind::Partial,
            SchedError::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Code machine stable associé à chaque erreur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    InvalidInput,
    DataIntegrity,
    Partial,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::DataIntegrity => "data_integrity",
            ErrorKind::Partial => "partial",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paramètres d'un remplissage automatique de planning
#[derive(Debug, Clone)]
pub struct AutoPopulate {
    pub schedule_id: ScheduleId,
    pub strategy: StrategyKind,
    pub eligible: Vec<StaffId>,
    pub day_count: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    pub day_window: DayWindow,
    /// Premier jour ; à défaut, la date courante de l'horloge.
    pub base_date: Option<NaiveDate>,
}

impl AutoPopulate {
    pub fn new(schedule_id: ScheduleId, strategy: StrategyKind, eligible: Vec<StaffId>) -> Self {
        Self::from_config(&Config::default(), schedule_id, strategy, eligible)
    }

    pub fn from_config(
        config: &Config,
        schedule_id: ScheduleId,
        strategy: StrategyKind,
        eligible: Vec<StaffId>,
    ) -> Self {
        Self {
            schedule_id,
            strategy,
            eligible,
            day_count: config.default_days,
            start_hour: config.shift_start_hour,
            end_hour: config.shift_end_hour,
            day_window: config.day_window,
            base_date: None,
        }
    }

    pub fn days(mut self, day_count: u32) -> Self {
        self.day_count = day_count;
        self
    }

    pub fn hours(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.start_hour = start_hour;
        self.end_hour = end_hour;
        self
    }

    pub fn starting(mut self, base_date: NaiveDate) -> Self {
        self.base_date = Some(base_date);
        self
    }

    pub fn day_window(mut self, window: DayWindow) -> Self {
        self.day_window = window;
        self
    }
}

/// Résultat d'un remplissage : créneaux créés, dans l'ordre des jours.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationOutcome {
    pub shifts: Vec<Shift>,
    pub count: usize,
}

/// Accusé de suppression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: ShiftId,
    pub deleted: bool,
}

/// Réponse à une demande d'échange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAction {
    Accept,
    Decline,
}

impl FromStr for SwapAction {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" | "approve" => Ok(SwapAction::Accept),
            "decline" | "deny" => Ok(SwapAction::Decline),
            other => Err(SchedError::invalid_input(format!(
                "unknown swap action: {other} (expected accept or decline)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub schedule: Schedule,
    pub shift_count: usize,
    pub scheduled_hours: f64,
    pub worked_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffBreakdown {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub shifts: usize,
    pub scheduled_hours: f64,
    pub worked_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportLine {
    pub shift: Shift,
    pub staff_name: String,
}

/// Rapport sur une fenêtre [from, to) de débuts de créneaux.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_shifts: usize,
    pub scheduled_hours: f64,
    pub worked_hours: f64,
    pub average_hours: f64,
    pub per_staff: Vec<StaffBreakdown>,
    pub lines: Vec<ReportLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRow {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub scheduled: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub missed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub total_staff: usize,
    pub shifts_this_week: usize,
    pub pending_swaps: usize,
}
