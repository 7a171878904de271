use super::{
    util, AttendanceRow, Backend, Dashboard, ReportLine, SchedError, ScheduleSummary, Scheduler,
    ShiftReport, StaffBreakdown,
};
use crate::model::{seconds_to_hours, ScheduleId, Shift, ShiftId, ShiftState, StaffId, StaffRole, SwapRequest};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;

pub(super) fn view_shift<S: Backend>(scheduler: &Scheduler<S>, id: &ShiftId) -> Result<Shift, SchedError> {
    scheduler
        .store
        .get_shift(id)?
        .ok_or_else(|| SchedError::not_found("shift", id))
}

/// Créneaux d'un membre, les plus récents d'abord.
pub(super) fn staff_shifts<S: Backend>(
    scheduler: &Scheduler<S>,
    staff: &StaffId,
) -> Result<Vec<Shift>, SchedError> {
    if !scheduler.store.staff_exists(staff)? {
        return Err(SchedError::not_found("staff", staff));
    }
    let mut shifts = scheduler.store.shifts_for_staff(staff)?;
    shifts.sort_by_key(|s| Reverse(s.start));
    Ok(shifts)
}

pub(super) fn schedule_shifts<S: Backend>(
    scheduler: &Scheduler<S>,
    schedule: &ScheduleId,
) -> Result<Vec<Shift>, SchedError> {
    if scheduler.store.get_schedule(schedule)?.is_none() {
        return Err(SchedError::not_found("schedule", schedule));
    }
    let mut shifts = scheduler.store.shifts_for_schedule(schedule)?;
    shifts.sort_by_key(|s| s.start);
    Ok(shifts)
}

pub(super) fn schedule_summary<S: Backend>(
    scheduler: &Scheduler<S>,
    id: &ScheduleId,
) -> Result<ScheduleSummary, SchedError> {
    let schedule = scheduler
        .store
        .get_schedule(id)?
        .ok_or_else(|| SchedError::not_found("schedule", id))?;
    let shifts = scheduler.store.shifts_for_schedule(id)?;
    let (scheduled, worked) = totals(&shifts);
    Ok(ScheduleSummary {
        schedule,
        shift_count: shifts.len(),
        scheduled_hours: seconds_to_hours(scheduled),
        worked_hours: seconds_to_hours(worked),
    })
}

/// Planning commun : tous les créneaux par ordre chronologique, réservé au personnel.
pub(super) fn combined_roster<S: Backend>(
    scheduler: &Scheduler<S>,
    viewer: &StaffId,
) -> Result<Vec<Shift>, SchedError> {
    if !scheduler.store.is_staff(viewer)? {
        return Err(SchedError::unauthorized("only staff can view the roster"));
    }
    let mut shifts = scheduler.store.all_shifts()?;
    shifts.sort_by_key(|s| s.start);
    Ok(shifts)
}

fn totals<'a>(shifts: impl IntoIterator<Item = &'a Shift>) -> (i64, i64) {
    shifts.into_iter().fold((0, 0), |(scheduled, worked), s| {
        (scheduled + s.duration_seconds(), worked + s.worked_seconds().unwrap_or(0))
    })
}

fn ensure_window(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<(), SchedError> {
    if to <= from {
        return Err(SchedError::invalid_input("report window end must be after its start"));
    }
    Ok(())
}

fn display_name<S: Backend>(store: &S, id: &StaffId) -> Result<String, SchedError> {
    Ok(store.staff_name(id)?.unwrap_or_else(|| id.to_string()))
}

pub(super) fn shift_report<S: Backend>(
    scheduler: &Scheduler<S>,
    admin: &StaffId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    staff: Option<&StaffId>,
) -> Result<ShiftReport, SchedError> {
    scheduler.require_admin(admin)?;
    ensure_window(from, to)?;
    let store = &scheduler.store;
    if let Some(id) = staff {
        if !store.staff_exists(id)? {
            return Err(SchedError::not_found("staff", id));
        }
    }

    let mut shifts: Vec<Shift> = store
        .shifts_in_window(from, to)?
        .into_iter()
        .filter(|s| staff.map_or(true, |id| &s.staff_id == id))
        .collect();
    shifts.sort_by_key(|s| s.start);

    let mut names = BTreeMap::new();
    let per_staff = {
        let mut grouped: BTreeMap<&StaffId, Vec<&Shift>> = BTreeMap::new();
        for s in &shifts {
            grouped.entry(&s.staff_id).or_default().push(s);
        }
        let mut per_staff = Vec::with_capacity(grouped.len());
        for (id, list) in grouped {
            let name = display_name(store, id)?;
            let (scheduled, worked) = totals(list.iter().copied());
            per_staff.push(StaffBreakdown {
                staff_id: id.clone(),
                staff_name: name.clone(),
                shifts: list.len(),
                scheduled_hours: seconds_to_hours(scheduled),
                worked_hours: seconds_to_hours(worked),
            });
            names.insert(id.clone(), name);
        }
        per_staff
    };

    let (scheduled, worked) = totals(&shifts);
    let total_shifts = shifts.len();
    let average_hours = if total_shifts == 0 {
        0.0
    } else {
        seconds_to_hours(scheduled) / total_shifts as f64
    };
    let lines = shifts
        .into_iter()
        .map(|shift| ReportLine {
            staff_name: names[&shift.staff_id].clone(),
            shift,
        })
        .collect();

    Ok(ShiftReport {
        from,
        to,
        total_shifts,
        scheduled_hours: seconds_to_hours(scheduled),
        worked_hours: seconds_to_hours(worked),
        average_hours,
        per_staff,
        lines,
    })
}

/// Présence par membre du personnel sur [from, to). « Manqué » : terminé avant
/// maintenant sans pointage d'entrée.
pub(super) fn staff_attendance<S: Backend>(
    scheduler: &Scheduler<S>,
    admin: &StaffId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<AttendanceRow>, SchedError> {
    scheduler.require_admin(admin)?;
    ensure_window(from, to)?;
    let store = &scheduler.store;
    let now = scheduler.clock.now();
    let shifts = store.shifts_in_window(from, to)?;

    let mut rows = Vec::new();
    for member in store.list_staff()?.into_iter().filter(|p| p.role == StaffRole::Staff) {
        let mut row = AttendanceRow {
            staff_id: member.id.clone(),
            staff_name: member.name,
            scheduled: 0,
            completed: 0,
            in_progress: 0,
            missed: 0,
        };
        for s in shifts.iter().filter(|s| s.staff_id == member.id) {
            row.scheduled += 1;
            match s.state() {
                ShiftState::ClockedOut => row.completed += 1,
                ShiftState::ClockedIn => row.in_progress += 1,
                ShiftState::Scheduled if s.end <= now => row.missed += 1,
                ShiftState::Scheduled => {}
            }
        }
        rows.push(row);
    }
    rows.sort_by(|a, b| a.staff_name.cmp(&b.staff_name));
    Ok(rows)
}

pub(super) fn pending_swap_requests<S: Backend>(
    scheduler: &Scheduler<S>,
    admin: &StaffId,
) -> Result<Vec<SwapRequest>, SchedError> {
    scheduler.require_admin(admin)?;
    let mut pending: Vec<SwapRequest> = scheduler
        .store
        .swap_requests()?
        .into_iter()
        .filter(SwapRequest::is_pending)
        .collect();
    pending.sort_by_key(|r| r.created_at);
    Ok(pending)
}

/// Demandes émises ou reçues par un membre.
pub(super) fn swap_requests_for<S: Backend>(
    scheduler: &Scheduler<S>,
    staff: &StaffId,
) -> Result<Vec<SwapRequest>, SchedError> {
    if !scheduler.store.staff_exists(staff)? {
        return Err(SchedError::not_found("staff", staff));
    }
    let mut mine: Vec<SwapRequest> = scheduler
        .store
        .swap_requests()?
        .into_iter()
        .filter(|r| &r.requesting_staff_id == staff || &r.requested_staff_id == staff)
        .collect();
    mine.sort_by_key(|r| Reverse(r.created_at));
    Ok(mine)
}

pub(super) fn dashboard<S: Backend>(scheduler: &Scheduler<S>, admin: &StaffId) -> Result<Dashboard, SchedError> {
    scheduler.require_admin(admin)?;
    let store = &scheduler.store;
    let (from, to) = util::week_bounds(scheduler.clock.now());
    Ok(Dashboard {
        total_staff: store
            .list_staff()?
            .iter()
            .filter(|p| p.role == StaffRole::Staff)
            .count(),
        shifts_this_week: store.shifts_in_window(from, to)?.len(),
        pending_swaps: store.swap_requests()?.iter().filter(|r| r.is_pending()).count(),
    })
}
