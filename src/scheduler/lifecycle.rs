use super::{locks::SlotGuard, util, Backend, Deleted, SchedError, Scheduler};
use crate::model::{ScheduleId, Shift, ShiftId, ShiftState, StaffId, StaffRole};
use chrono::{DateTime, Utc};
use tracing::info;

pub(super) fn manual_assign<S: Backend>(
    scheduler: &Scheduler<S>,
    admin: &StaffId,
    staff: &StaffId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    schedule: Option<&ScheduleId>,
) -> Result<Shift, SchedError> {
    let store = &scheduler.store;
    scheduler.require_admin(admin)?;
    match store.staff_role(staff)? {
        Some(StaffRole::Staff) => {}
        Some(StaffRole::Admin) => {
            return Err(SchedError::unauthorized("only staff can be assigned to a shift"))
        }
        None => return Err(SchedError::not_found("staff", staff)),
    }
    util::ensure_ordered(start, end)?;
    if let Some(id) = schedule {
        if store.get_schedule(id)?.is_none() {
            return Err(SchedError::not_found("schedule", id));
        }
    }

    let _held = scheduler.staff_locks.lock(staff)?;
    let shift = Shift::new(staff.clone(), start, end, schedule.cloned())
        .map_err(SchedError::InvalidInput)?;
    store.insert_shift(shift.clone())?;
    info!(shift = %shift.id, staff = %staff, admin = %admin, "shift assigned manually");
    Ok(shift)
}

/// Charge un créneau appartenant à `staff` ; le verrou du créneau doit être tenu.
fn owned_shift<S: Backend>(
    scheduler: &Scheduler<S>,
    staff: &StaffId,
    id: &ShiftId,
) -> Result<Shift, SchedError> {
    let shift = scheduler
        .store
        .get_shift(id)?
        .ok_or_else(|| SchedError::not_found("shift", id))?;
    if &shift.staff_id != staff {
        return Err(SchedError::unauthorized(format!(
            "shift {id} is not assigned to {staff}"
        )));
    }
    Ok(shift)
}

pub(super) fn clock_in<S: Backend>(
    scheduler: &Scheduler<S>,
    staff: &StaffId,
    id: &ShiftId,
) -> Result<Shift, SchedError> {
    let _held = scheduler.shift_locks.lock(id)?;
    let mut shift = owned_shift(scheduler, staff, id)?;
    if let Some(at) = shift.clock_in {
        return Err(SchedError::invalid_state(format!(
            "shift {id} already clocked in at {}",
            at.to_rfc3339()
        )));
    }
    shift.clock_in = Some(scheduler.clock.now());
    scheduler.store.update_shift(&shift)?;
    info!(shift = %id, staff = %staff, "clocked in");
    Ok(shift)
}

pub(super) fn clock_out<S: Backend>(
    scheduler: &Scheduler<S>,
    staff: &StaffId,
    id: &ShiftId,
) -> Result<Shift, SchedError> {
    let _held = scheduler.shift_locks.lock(id)?;
    let mut shift = owned_shift(scheduler, staff, id)?;
    match shift.state() {
        ShiftState::Scheduled => {
            return Err(SchedError::invalid_state(format!("shift {id} is not clocked in")))
        }
        ShiftState::ClockedOut => {
            return Err(SchedError::invalid_state(format!("shift {id} already clocked out")))
        }
        ShiftState::ClockedIn => {}
    }
    shift.clock_out = Some(scheduler.clock.now());
    scheduler.store.update_shift(&shift)?;
    info!(shift = %id, staff = %staff, "clocked out");
    Ok(shift)
}

fn ensure_not_frozen(shift: &Shift, action: &str) -> Result<(), SchedError> {
    if shift.is_frozen() {
        return Err(SchedError::invalid_state(format!(
            "cannot {action} shift {} once it is {}",
            shift.id,
            shift.state()
        )));
    }
    Ok(())
}

/// Verrous du titulaire puis du créneau, comme tout écrivain des créneaux d'un membre.
/// Un échange peut changer le titulaire entre la lecture et le verrouillage : on relit.
fn lock_with_owner<'a, S: Backend>(
    scheduler: &'a Scheduler<S>,
    id: &ShiftId,
) -> Result<(SlotGuard<'a, StaffId>, SlotGuard<'a, ShiftId>, Shift), SchedError> {
    let load = || -> Result<Shift, SchedError> {
        scheduler
            .store
            .get_shift(id)?
            .ok_or_else(|| SchedError::not_found("shift", id))
    };
    let mut owner = load()?.staff_id;
    loop {
        let staff_guard = scheduler.staff_locks.lock(&owner)?;
        let shift_guard = scheduler.shift_locks.lock(id)?;
        let shift = load()?;
        if shift.staff_id == owner {
            return Ok((staff_guard, shift_guard, shift));
        }
        owner = shift.staff_id;
    }
}

pub(super) fn update_shift<S: Backend>(
    scheduler: &Scheduler<S>,
    id: &ShiftId,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Shift, SchedError> {
    let (_staff, _held, mut shift) = lock_with_owner(scheduler, id)?;
    ensure_not_frozen(&shift, "update")?;
    if start.is_none() && end.is_none() {
        return Ok(shift);
    }

    let new_start = start.unwrap_or(shift.start);
    let new_end = end.unwrap_or(shift.end);
    util::ensure_ordered(new_start, new_end)?;
    shift.start = new_start;
    shift.end = new_end;
    scheduler.store.update_shift(&shift)?;
    info!(shift = %id, start = %new_start, end = %new_end, "shift updated");
    Ok(shift)
}

pub(super) fn delete_shift<S: Backend>(
    scheduler: &Scheduler<S>,
    id: &ShiftId,
) -> Result<Deleted, SchedError> {
    let (_staff, _held, shift) = lock_with_owner(scheduler, id)?;
    ensure_not_frozen(&shift, "delete")?;
    if !scheduler.store.delete_shift(id)? {
        return Err(SchedError::not_found("shift", id));
    }
    info!(shift = %id, "shift deleted");
    Ok(Deleted {
        id: id.clone(),
        deleted: true,
    })
}
