//! Remplissage automatique « glouton séquentiel » d'un planning.
//!
//! Chaque jour est traité dans l'ordre : verrou sur l'ensemble éligible, statistiques
//! recalculées (elles voient les créneaux des jours précédents), choix, écriture.
//! Un échec en cours de boucle ne défait pas les jours déjà écrits.

use super::{util, AutoPopulate, Backend, PopulationOutcome, SchedError, Scheduler};
use crate::config::validate_shift_hours;
use crate::model::{GenerationMethod, Shift, StaffId, StaffRole};
use crate::stats::{self, DayWindow};
use crate::strategy::{SlotContext, StaffStats, StrategyKind};
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

struct DaySlot {
    day: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

pub(super) fn auto_populate<S: Backend>(
    scheduler: &Scheduler<S>,
    req: AutoPopulate,
) -> Result<PopulationOutcome, SchedError> {
    let store = &scheduler.store;

    let mut schedule = store
        .get_schedule(&req.schedule_id)?
        .ok_or_else(|| SchedError::not_found("schedule", &req.schedule_id))?;
    let pool = candidate_pool(store, &req.eligible)?;
    if req.day_count == 0 {
        return Err(SchedError::invalid_input("day count must be at least 1"));
    }
    validate_shift_hours(req.start_hour, req.end_hour)?;
    req.day_window.validate()?;

    // toutes les bornes sont calculées avant la première écriture
    let base = req.base_date.unwrap_or_else(|| scheduler.clock.today());
    let slots = (0..req.day_count)
        .map(|offset| {
            let day = base
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or_else(|| SchedError::invalid_input("date overflow"))?;
            let (start, end) = util::shift_bounds(day, req.start_hour, req.end_hour)?;
            Ok(DaySlot { day, start, end })
        })
        .collect::<Result<Vec<_>, SchedError>>()?;

    // estampillé à la première écriture réussie, jamais sur un échec immédiat
    let mut stamp = schedule.method == GenerationMethod::Manual
        && store.shifts_for_schedule(&schedule.id)?.is_empty();

    let requested = slots.len();
    let mut created = Vec::with_capacity(requested);
    for slot in slots {
        let step = populate_day(scheduler, &req, &pool, &slot).and_then(|shift| {
            created.push(shift);
            if stamp {
                schedule.method = GenerationMethod::Auto {
                    strategy: req.strategy,
                };
                store.update_schedule(&schedule)?;
                stamp = false;
            }
            Ok(())
        });
        if let Err(err) = step {
            warn!(
                schedule = %req.schedule_id,
                created = created.len(),
                requested,
                error = %err,
                "auto-population stopped"
            );
            return Err(SchedError::PartialPopulation {
                shifts: created,
                requested,
                source: Box::new(err),
            });
        }
    }

    info!(
        schedule = %req.schedule_id,
        strategy = %req.strategy,
        count = created.len(),
        "schedule auto-populated"
    );
    Ok(PopulationOutcome {
        count: created.len(),
        shifts: created,
    })
}

/// Ensemble éligible dédoublonné, ordre conservé, restreint au personnel connu.
fn candidate_pool<S: Backend>(store: &S, eligible: &[StaffId]) -> Result<Vec<StaffId>, SchedError> {
    let mut seen = HashSet::new();
    let unique: Vec<&StaffId> = eligible.iter().filter(|id| seen.insert(*id)).collect();
    if unique.is_empty() {
        return Err(SchedError::invalid_input("eligible staff set is empty"));
    }

    let mut pool = Vec::with_capacity(unique.len());
    for id in unique {
        match store.staff_role(id)? {
            Some(StaffRole::Staff) => pool.push(id.clone()),
            Some(StaffRole::Admin) => warn!(staff = %id, "administrator dropped from eligible set"),
            None => warn!(staff = %id, "unknown staff id dropped from eligible set"),
        }
    }
    if pool.is_empty() {
        return Err(SchedError::invalid_input("no eligible id resolves to a known staff member"));
    }
    Ok(pool)
}

fn populate_day<S: Backend>(
    scheduler: &Scheduler<S>,
    req: &AutoPopulate,
    pool: &[StaffId],
    slot: &DaySlot,
) -> Result<Shift, SchedError> {
    let _held = scheduler.staff_locks.lock_all(pool)?;

    let stats = gather(&scheduler.store, req.strategy, pool, req.day_window)?;
    let context = SlotContext {
        day: slot.day,
        is_day: req.day_window.is_day_shift(slot.start),
    };
    let winner = req.strategy.score(pool, &stats, &context)?;

    let shift = Shift::new(winner, slot.start, slot.end, Some(req.schedule_id.clone()))
        .map_err(SchedError::InvalidInput)?;
    scheduler.store.insert_shift(shift.clone())?;
    debug!(
        shift = %shift.id,
        staff = %shift.staff_id,
        day = %slot.day,
        "shift auto-assigned"
    );
    Ok(shift)
}

fn gather<S: Backend>(
    store: &S,
    strategy: StrategyKind,
    pool: &[StaffId],
    window: DayWindow,
) -> Result<StaffStats, SchedError> {
    Ok(match strategy {
        StrategyKind::Even => StaffStats::Load(stats::load_stats(store, pool)?),
        StrategyKind::MinDays => StaffStats::DaysWorked(stats::days_worked(store, pool)?),
        StrategyKind::Balanced => StaffStats::DayNight(stats::day_night_stats(store, pool, window)?),
    })
}
