//! Accès aux données consommé par le moteur.
//!
//! Le moteur ne connaît que ces deux traits ; `MemoryStore` les implémente sur un
//! [`Roster`] partagé, que [`crate::storage::JsonStorage`] sait charger et sauver.

use crate::model::{
    Roster, Schedule, ScheduleId, Shift, ShiftId, Staff, StaffId, StaffRole, SwapRequest,
    SwapRequestId,
};
use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Annuaire des identités (sous-système externe d'authentification).
pub trait StaffDirectory {
    fn staff_role(&self, id: &StaffId) -> anyhow::Result<Option<StaffRole>>;
    fn staff_name(&self, id: &StaffId) -> anyhow::Result<Option<String>>;
    fn list_staff(&self) -> anyhow::Result<Vec<Staff>>;

    fn staff_exists(&self, id: &StaffId) -> anyhow::Result<bool> {
        Ok(self.staff_role(id)?.is_some())
    }
    fn is_admin(&self, id: &StaffId) -> anyhow::Result<bool> {
        Ok(self.staff_role(id)? == Some(StaffRole::Admin))
    }
    fn is_staff(&self, id: &StaffId) -> anyhow::Result<bool> {
        Ok(self.staff_role(id)? == Some(StaffRole::Staff))
    }
}

/// Persistance des créneaux, plannings et demandes d'échange, indexée par id.
pub trait ShiftStore {
    fn insert_schedule(&self, schedule: Schedule) -> anyhow::Result<()>;
    fn get_schedule(&self, id: &ScheduleId) -> anyhow::Result<Option<Schedule>>;
    fn update_schedule(&self, schedule: &Schedule) -> anyhow::Result<()>;

    fn insert_shift(&self, shift: Shift) -> anyhow::Result<()>;
    fn get_shift(&self, id: &ShiftId) -> anyhow::Result<Option<Shift>>;
    fn update_shift(&self, shift: &Shift) -> anyhow::Result<()>;
    /// Retourne `false` si le créneau n'existait pas.
    fn delete_shift(&self, id: &ShiftId) -> anyhow::Result<bool>;
    fn shifts_for_staff(&self, staff: &StaffId) -> anyhow::Result<Vec<Shift>>;
    fn shifts_for_schedule(&self, schedule: &ScheduleId) -> anyhow::Result<Vec<Shift>>;
    /// Créneaux dont le début tombe dans [from, to).
    fn shifts_in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> anyhow::Result<Vec<Shift>>;
    fn all_shifts(&self) -> anyhow::Result<Vec<Shift>>;

    fn insert_swap_request(&self, request: SwapRequest) -> anyhow::Result<()>;
    fn get_swap_request(&self, id: &SwapRequestId) -> anyhow::Result<Option<SwapRequest>>;
    fn update_swap_request(&self, request: &SwapRequest) -> anyhow::Result<()>;
    fn swap_requests(&self) -> anyhow::Result<Vec<SwapRequest>>;
}

/// Stockage en mémoire, partageable entre threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roster: RwLock<Roster>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roster(roster: Roster) -> Self {
        Self {
            roster: RwLock::new(roster),
        }
    }

    /// Copie cohérente de l'état courant (pour sauvegarde).
    pub fn snapshot(&self) -> anyhow::Result<Roster> {
        Ok(self.read()?.clone())
    }

    pub fn add_staff(&self, staff: Staff) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        if roster.find_staff(&staff.id).is_some() {
            bail!("staff id already exists: {}", staff.id);
        }
        roster.staff.push(staff);
        Ok(())
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, Roster>> {
        self.roster.read().map_err(|_| anyhow!("roster lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, Roster>> {
        self.roster.write().map_err(|_| anyhow!("roster lock poisoned"))
    }
}

impl StaffDirectory for MemoryStore {
    fn staff_role(&self, id: &StaffId) -> anyhow::Result<Option<StaffRole>> {
        Ok(self.read()?.find_staff(id).map(|p| p.role))
    }

    fn staff_name(&self, id: &StaffId) -> anyhow::Result<Option<String>> {
        Ok(self.read()?.staff_name(id).map(str::to_owned))
    }

    fn list_staff(&self) -> anyhow::Result<Vec<Staff>> {
        Ok(self.read()?.staff.clone())
    }
}

impl ShiftStore for MemoryStore {
    fn insert_schedule(&self, schedule: Schedule) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        if roster.find_schedule(&schedule.id).is_some() {
            bail!("schedule id already exists: {}", schedule.id);
        }
        roster.schedules.push(schedule);
        Ok(())
    }

    fn get_schedule(&self, id: &ScheduleId) -> anyhow::Result<Option<Schedule>> {
        Ok(self.read()?.find_schedule(id).cloned())
    }

    fn update_schedule(&self, schedule: &Schedule) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        let slot = roster
            .schedules
            .iter_mut()
            .find(|s| s.id == schedule.id)
            .ok_or_else(|| anyhow!("unknown schedule: {}", schedule.id))?;
        *slot = schedule.clone();
        Ok(())
    }

    fn insert_shift(&self, shift: Shift) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        if roster.find_shift(&shift.id).is_some() {
            bail!("shift id already exists: {}", shift.id);
        }
        roster.shifts.push(shift);
        Ok(())
    }

    fn get_shift(&self, id: &ShiftId) -> anyhow::Result<Option<Shift>> {
        Ok(self.read()?.find_shift(id).cloned())
    }

    fn update_shift(&self, shift: &Shift) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        let slot = roster
            .find_shift_mut(&shift.id)
            .ok_or_else(|| anyhow!("unknown shift: {}", shift.id))?;
        *slot = shift.clone();
        Ok(())
    }

    fn delete_shift(&self, id: &ShiftId) -> anyhow::Result<bool> {
        let mut roster = self.write()?;
        let before = roster.shifts.len();
        roster.shifts.retain(|s| &s.id != id);
        Ok(roster.shifts.len() != before)
    }

    fn shifts_for_staff(&self, staff: &StaffId) -> anyhow::Result<Vec<Shift>> {
        Ok(self
            .read()?
            .shifts
            .iter()
            .filter(|s| &s.staff_id == staff)
            .cloned()
            .collect())
    }

    fn shifts_for_schedule(&self, schedule: &ScheduleId) -> anyhow::Result<Vec<Shift>> {
        Ok(self
            .read()?
            .shifts
            .iter()
            .filter(|s| s.schedule_id.as_ref() == Some(schedule))
            .cloned()
            .collect())
    }

    fn shifts_in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> anyhow::Result<Vec<Shift>> {
        Ok(self
            .read()?
            .shifts
            .iter()
            .filter(|s| s.start >= from && s.start < to)
            .cloned()
            .collect())
    }

    fn all_shifts(&self) -> anyhow::Result<Vec<Shift>> {
        Ok(self.read()?.shifts.clone())
    }

    fn insert_swap_request(&self, request: SwapRequest) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        if roster.find_swap_request(&request.id).is_some() {
            bail!("swap request id already exists: {}", request.id);
        }
        roster.swap_requests.push(request);
        Ok(())
    }

    fn get_swap_request(&self, id: &SwapRequestId) -> anyhow::Result<Option<SwapRequest>> {
        Ok(self.read()?.find_swap_request(id).cloned())
    }

    fn update_swap_request(&self, request: &SwapRequest) -> anyhow::Result<()> {
        let mut roster = self.write()?;
        let slot = roster
            .swap_requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| anyhow!("unknown swap request: {}", request.id))?;
        *slot = request.clone();
        Ok(())
    }

    fn swap_requests(&self) -> anyhow::Result<Vec<SwapRequest>> {
        Ok(self.read()?.swap_requests.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_query_is_half_open() {
        let store = MemoryStore::new();
        let alice = Staff::new("Alice");
        store.add_staff(alice.clone()).unwrap();
        for day in 1..=3 {
            let start = Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap();
            let end = Utc.with_ymd_and_hms(2025, 3, day, 17, 0, 0).unwrap();
            store.insert_shift(Shift::new(alice.id.clone(), start, end, None).unwrap()).unwrap();
        }
        let from = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        assert_eq!(store.shifts_in_window(from, to).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_staff_is_rejected() {
        let store = MemoryStore::new();
        let alice = Staff::new("Alice");
        store.add_staff(alice.clone()).unwrap();
        assert!(store.add_staff(alice).is_err());
        assert_eq!(store.list_staff().unwrap().len(), 1);
    }

    #[test]
    fn delete_reports_missing_rows() {
        let store = MemoryStore::new();
        assert!(!store.delete_shift(&ShiftId::new("nope")).unwrap());
    }
}
