use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! strong_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

strong_id!(
    /// Identifiant fort pour un membre du personnel (ou un administrateur)
    StaffId
);
strong_id!(
    /// Identifiant fort pour Shift
    ShiftId
);
strong_id!(
    /// Identifiant fort pour Schedule
    ScheduleId
);
strong_id!(
    /// Identifiant fort pour SwapRequest
    SwapRequestId
);

/// Rôle d'une identité : seul `Staff` peut porter des créneaux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Staff,
    Admin,
}

impl StaffRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StaffRole::Staff => "staff",
            StaffRole::Admin => "admin",
        }
    }
}

/// Identité connue du sous-système d'authentification (lue seulement par le moteur).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: StaffRole,
}

fn default_role() -> StaffRole {
    StaffRole::Staff
}

impl Staff {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: StaffId::random(),
            name: name.into(),
            role: StaffRole::Staff,
        }
    }

    pub fn admin<N: Into<String>>(name: N) -> Self {
        Self {
            role: StaffRole::Admin,
            ..Self::new(name)
        }
    }

    pub fn with_id(mut self, id: StaffId) -> Self {
        self.id = id;
        self
    }
}

/// État dérivé d'un créneau à partir de ses horodatages de pointage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    Scheduled,
    ClockedIn,
    ClockedOut,
}

impl fmt::Display for ShiftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShiftState::Scheduled => "scheduled",
            ShiftState::ClockedIn => "clocked_in",
            ShiftState::ClockedOut => "clocked_out",
        })
    }
}

/// Créneau de travail (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub staff_id: StaffId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<ScheduleId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub clock_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
}

impl Shift {
    /// Crée un shift en validant que `end > start`.
    pub fn new(
        staff_id: StaffId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        schedule_id: Option<ScheduleId>,
    ) -> Result<Self, String> {
        if end <= start {
            return Err("end must be strictly after start".to_string());
        }
        Ok(Self {
            id: ShiftId::random(),
            staff_id,
            schedule_id,
            start,
            end,
            clock_in: None,
            clock_out: None,
        })
    }

    pub fn state(&self) -> ShiftState {
        match (self.clock_in, self.clock_out) {
            (None, None) => ShiftState::Scheduled,
            (Some(_), None) => ShiftState::ClockedIn,
            // un clock-out sans clock-in n'est pas atteignable par le moteur ; on le traite comme terminal
            (_, Some(_)) => ShiftState::ClockedOut,
        }
    }

    /// Un créneau pointé (entrée ou sortie) ne peut plus être modifié ni supprimé.
    pub fn is_frozen(&self) -> bool {
        self.clock_in.is_some() || self.clock_out.is_some()
    }

    /// Durée planifiée, à la seconde.
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    pub fn scheduled_hours(&self) -> f64 {
        seconds_to_hours(self.duration_seconds())
    }

    /// Durée effectivement pointée, si entrée et sortie sont connues.
    pub fn worked_seconds(&self) -> Option<i64> {
        match (self.clock_in, self.clock_out) {
            (Some(i), Some(o)) => Some((o - i).num_seconds()),
            _ => None,
        }
    }

    pub fn worked_hours(&self) -> Option<f64> {
        self.worked_seconds().map(seconds_to_hours)
    }
}

pub(crate) fn seconds_to_hours(seconds: i64) -> f64 {
    seconds as f64 / 3600.0
}

/// Mode de génération d'un planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum GenerationMethod {
    Manual,
    Auto { strategy: StrategyKind },
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMethod::Manual => f.write_str("manual"),
            GenerationMethod::Auto { strategy } => write!(f, "auto({strategy})"),
        }
    }
}

/// Planning nommé regroupant des créneaux ; compteurs et totaux sont dérivés.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: StaffId,
    #[serde(flatten)]
    pub method: GenerationMethod,
}

impl Schedule {
    pub fn new<N: Into<String>>(name: N, created_by: StaffId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ScheduleId::random(),
            name: name.into(),
            created_at,
            created_by,
            method: GenerationMethod::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Approved,
    Denied,
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Approved => "approved",
            SwapStatus::Denied => "denied",
        })
    }
}

/// Demande de transfert d'un créneau entre deux membres du personnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: SwapRequestId,
    pub shift_id: ShiftId,
    pub requesting_staff_id: StaffId,
    pub requested_staff_id: StaffId,
    #[serde(default)]
    pub reason: String,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SwapRequest {
    pub fn new<R: Into<String>>(
        shift_id: ShiftId,
        requesting_staff_id: StaffId,
        requested_staff_id: StaffId,
        reason: R,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SwapRequestId::random(),
            shift_id,
            requesting_staff_id,
            requested_staff_id,
            reason: reason.into(),
            status: SwapStatus::Pending,
            created_at,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SwapStatus::Pending
    }
}

/// Jeu de données complet (personnel, plannings, créneaux, échanges)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Roster {
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub shifts: Vec<Shift>,
    #[serde(default)]
    pub swap_requests: Vec<SwapRequest>,
}

impl Roster {
    pub fn find_staff<'a>(&'a self, id: &StaffId) -> Option<&'a Staff> {
        self.staff.iter().find(|p| &p.id == id)
    }
    pub fn find_schedule<'a>(&'a self, id: &ScheduleId) -> Option<&'a Schedule> {
        self.schedules.iter().find(|s| &s.id == id)
    }
    pub fn find_shift<'a>(&'a self, id: &ShiftId) -> Option<&'a Shift> {
        self.shifts.iter().find(|s| &s.id == id)
    }
    pub fn find_shift_mut(&mut self, id: &ShiftId) -> Option<&mut Shift> {
        self.shifts.iter_mut().find(|s| &s.id == id)
    }
    pub fn find_swap_request<'a>(&'a self, id: &SwapRequestId) -> Option<&'a SwapRequest> {
        self.swap_requests.iter().find(|r| &r.id == id)
    }
    pub fn staff_name(&self, id: &StaffId) -> Option<&str> {
        self.find_staff(id).map(|p| p.name.as_str())
    }
}
