//! Agrégats par membre du personnel consommés par les stratégies.
//!
//! Lecture seule. Un identifiant inconnu de l'annuaire est simplement absent de la
//! table retournée : l'absence signifie « pas de données », pas une erreur.

use crate::model::{seconds_to_hours, Shift, StaffId};
use crate::scheduler::SchedError;
use crate::store::{ShiftStore, StaffDirectory};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Fenêtre horaire [start_hour, end_hour) qui classe un créneau en « jour ».
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 18,
        }
    }
}

impl DayWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, SchedError> {
        let window = Self {
            start_hour,
            end_hour,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), SchedError> {
        if self.end_hour > 24 || self.start_hour >= self.end_hour {
            return Err(SchedError::invalid_input(format!(
                "day window [{}, {}) must satisfy start < end <= 24",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn is_day_shift(&self, start: DateTime<Utc>) -> bool {
        self.contains_hour(start.hour())
    }
}

/// Charge : nombre de créneaux et durée planifiée cumulée.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub shifts_assigned: u32,
    pub seconds_assigned: i64,
}

impl LoadStats {
    pub fn from_shifts<'a>(shifts: impl IntoIterator<Item = &'a Shift>) -> Self {
        shifts.into_iter().fold(Self::default(), |mut acc, s| {
            acc.shifts_assigned += 1;
            acc.seconds_assigned += s.duration_seconds();
            acc
        })
    }

    pub fn hours_assigned(&self) -> f64 {
        seconds_to_hours(self.seconds_assigned)
    }
}

/// Répartition jour/nuit et durée planifiée totale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayNightStats {
    pub day_count: u32,
    pub night_count: u32,
    pub total_seconds: i64,
}

impl DayNightStats {
    pub fn from_shifts<'a>(shifts: impl IntoIterator<Item = &'a Shift>, window: DayWindow) -> Self {
        shifts.into_iter().fold(Self::default(), |mut acc, s| {
            if window.is_day_shift(s.start) {
                acc.day_count += 1;
            } else {
                acc.night_count += 1;
            }
            acc.total_seconds += s.duration_seconds();
            acc
        })
    }

    pub fn total_hours(&self) -> f64 {
        seconds_to_hours(self.total_seconds)
    }
}

/// Jours calendaires distincts (date de début) travaillés.
pub type DaysWorked = BTreeSet<NaiveDate>;

pub fn days_from_shifts<'a>(shifts: impl IntoIterator<Item = &'a Shift>) -> DaysWorked {
    shifts.into_iter().map(|s| s.start.date_naive()).collect()
}

fn collect<S, T>(
    store: &S,
    staff: &[StaffId],
    summarise: impl Fn(&[Shift]) -> T,
) -> anyhow::Result<HashMap<StaffId, T>>
where
    S: ShiftStore + StaffDirectory + ?Sized,
{
    let mut out = HashMap::with_capacity(staff.len());
    for id in staff {
        if !store.staff_exists(id)? {
            debug!(staff = %id, "unknown staff id omitted from stats");
            continue;
        }
        let shifts = store.shifts_for_staff(id)?;
        out.insert(id.clone(), summarise(&shifts));
    }
    Ok(out)
}

pub fn load_stats<S>(store: &S, staff: &[StaffId]) -> anyhow::Result<HashMap<StaffId, LoadStats>>
where
    S: ShiftStore + StaffDirectory + ?Sized,
{
    collect(store, staff, |shifts| LoadStats::from_shifts(shifts))
}

pub fn days_worked<S>(store: &S, staff: &[StaffId]) -> anyhow::Result<HashMap<StaffId, DaysWorked>>
where
    S: ShiftStore + StaffDirectory + ?Sized,
{
    collect(store, staff, |shifts| days_from_shifts(shifts))
}

pub fn day_night_stats<S>(
    store: &S,
    staff: &[StaffId],
    window: DayWindow,
) -> anyhow::Result<HashMap<StaffId, DayNightStats>>
where
    S: ShiftStore + StaffDirectory + ?Sized,
{
    collect(store, staff, |shifts| DayNightStats::from_shifts(shifts, window))
}
