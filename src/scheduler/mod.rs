mod lifecycle;
mod locks;
mod populate;
mod report;
mod swap;
mod types;
mod util;

pub use types::{
    AttendanceRow, AutoPopulate, Dashboard, Deleted, ErrorKind, PopulationOutcome, ReportLine,
    SchedError, ScheduleSummary, ShiftReport, StaffBreakdown, SwapAction,
};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::model::{
    Schedule, ScheduleId, Shift, ShiftId, StaffId, SwapRequest, SwapRequestId,
};
use crate::store::{ShiftStore, StaffDirectory};
use chrono::{DateTime, Utc};
use locks::LockTable;
use std::sync::Arc;
use tracing::info;

/// Ce dont le moteur a besoin côté données : annuaire + persistance.
pub trait Backend: ShiftStore + StaffDirectory {}

impl<T: ShiftStore + StaffDirectory + ?Sized> Backend for T {}

/// Scheduler : point d'entrée du moteur, partageable entre threads (`Arc<Scheduler<_>>`).
///
/// Les identités agissantes sont toujours passées explicitement.
#[derive(Debug)]
pub struct Scheduler<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: Config,
    shift_locks: LockTable<ShiftId>,
    staff_locks: LockTable<StaffId>,
}

impl<S: Backend> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config: Config::default(),
            shift_locks: LockTable::default(),
            staff_locks: LockTable::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Crée un planning vide (méthode `manual` tant qu'aucun remplissage auto n'a eu lieu).
    pub fn create_schedule(&self, creator: &StaffId, name: &str) -> Result<Schedule, SchedError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SchedError::invalid_input("schedule name cannot be empty"));
        }
        if !self.store.staff_exists(creator)? {
            return Err(SchedError::not_found("staff", creator));
        }
        let schedule = Schedule::new(name, creator.clone(), self.clock.now());
        self.store.insert_schedule(schedule.clone())?;
        info!(schedule = %schedule.id, creator = %creator, "schedule created");
        Ok(schedule)
    }

    /// Remplit un planning jour par jour avec la stratégie choisie.
    pub fn auto_populate_schedule(&self, req: AutoPopulate) -> Result<PopulationOutcome, SchedError> {
        populate::auto_populate(self, req)
    }

    pub fn manual_assign(
        &self,
        admin: &StaffId,
        staff: &StaffId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        schedule: Option<&ScheduleId>,
    ) -> Result<Shift, SchedError> {
        lifecycle::manual_assign(self, admin, staff, start, end, schedule)
    }

    pub fn clock_in(&self, staff: &StaffId, shift: &ShiftId) -> Result<Shift, SchedError> {
        lifecycle::clock_in(self, staff, shift)
    }

    pub fn clock_out(&self, staff: &StaffId, shift: &ShiftId) -> Result<Shift, SchedError> {
        lifecycle::clock_out(self, staff, shift)
    }

    pub fn update_shift(
        &self,
        shift: &ShiftId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Shift, SchedError> {
        lifecycle::update_shift(self, shift, start, end)
    }

    pub fn delete_shift(&self, shift: &ShiftId) -> Result<Deleted, SchedError> {
        lifecycle::delete_shift(self, shift)
    }

    pub fn create_swap_request(
        &self,
        requester: &StaffId,
        shift: &ShiftId,
        requested: &StaffId,
        reason: &str,
    ) -> Result<SwapRequest, SchedError> {
        swap::create(self, requester, shift, requested, reason)
    }

    pub fn respond_to_swap(
        &self,
        request: &SwapRequestId,
        responder: &StaffId,
        action: SwapAction,
    ) -> Result<SwapRequest, SchedError> {
        swap::respond(self, request, responder, action)
    }

    pub fn approve_swap(&self, admin: &StaffId, request: &SwapRequestId) -> Result<SwapRequest, SchedError> {
        swap::decide(self, admin, request, SwapAction::Accept)
    }

    pub fn deny_swap(&self, admin: &StaffId, request: &SwapRequestId) -> Result<SwapRequest, SchedError> {
        swap::decide(self, admin, request, SwapAction::Decline)
    }

    pub fn view_shift(&self, shift: &ShiftId) -> Result<Shift, SchedError> {
        report::view_shift(self, shift)
    }

    pub fn staff_shifts(&self, staff: &StaffId) -> Result<Vec<Shift>, SchedError> {
        report::staff_shifts(self, staff)
    }

    pub fn schedule_shifts(&self, schedule: &ScheduleId) -> Result<Vec<Shift>, SchedError> {
        report::schedule_shifts(self, schedule)
    }

    pub fn schedule_summary(&self, schedule: &ScheduleId) -> Result<ScheduleSummary, SchedError> {
        report::schedule_summary(self, schedule)
    }

    pub fn combined_roster(&self, viewer: &StaffId) -> Result<Vec<Shift>, SchedError> {
        report::combined_roster(self, viewer)
    }

    pub fn shift_report(
        &self,
        admin: &StaffId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        staff: Option<&StaffId>,
    ) -> Result<ShiftReport, SchedError> {
        report::shift_report(self, admin, from, to, staff)
    }

    pub fn staff_attendance(
        &self,
        admin: &StaffId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRow>, SchedError> {
        report::staff_attendance(self, admin, from, to)
    }

    pub fn pending_swap_requests(&self, admin: &StaffId) -> Result<Vec<SwapRequest>, SchedError> {
        report::pending_swap_requests(self, admin)
    }

    pub fn swap_requests_for(&self, staff: &StaffId) -> Result<Vec<SwapRequest>, SchedError> {
        report::swap_requests_for(self, staff)
    }

    pub fn dashboard(&self, admin: &StaffId) -> Result<Dashboard, SchedError> {
        report::dashboard(self, admin)
    }

    pub(crate) fn require_admin(&self, admin: &StaffId) -> Result<(), SchedError> {
        if self.store.is_admin(admin)? {
            Ok(())
        } else {
            Err(SchedError::unauthorized(format!("{admin} is not an administrator")))
        }
    }
}
