#![forbid(unsafe_code)]
use anyhow::bail;
use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use proptest::prelude::*;
use rota::{
    AutoPopulate, ErrorKind, FixedClock, GenerationMethod, MemoryStore, SchedError, Schedule,
    ScheduleId, Scheduler, Shift, ShiftId, ShiftStore, Staff, StaffDirectory, StaffId, StaffRole,
    StrategyKind, SwapRequest, SwapRequestId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()))
}

fn seeded(n: usize) -> (MemoryStore, StaffId, Vec<StaffId>) {
    let store = MemoryStore::new();
    let admin = StaffId::new("boss");
    store
        .add_staff(Staff::admin("Boss").with_id(admin.clone()))
        .unwrap();
    let ids: Vec<StaffId> = (0..n).map(|i| StaffId::new(format!("s{i}"))).collect();
    for id in &ids {
        store
            .add_staff(Staff::new(id.to_string()).with_id(id.clone()))
            .unwrap();
    }
    (store, admin, ids)
}

/// Délègue à `MemoryStore` mais refuse toute insertion de créneau au-delà de `limit`.
#[derive(Debug)]
struct FailingStore {
    inner: MemoryStore,
    inserted: AtomicUsize,
    limit: usize,
}

impl StaffDirectory for FailingStore {
    fn staff_role(&self, id: &StaffId) -> anyhow::Result<Option<StaffRole>> {
        self.inner.staff_role(id)
    }
    fn staff_name(&self, id: &StaffId) -> anyhow::Result<Option<String>> {
        self.inner.staff_name(id)
    }
    fn list_staff(&self) -> anyhow::Result<Vec<Staff>> {
        self.inner.list_staff()
    }
}

impl ShiftStore for FailingStore {
    fn insert_schedule(&self, schedule: Schedule) -> anyhow::Result<()> {
        self.inner.insert_schedule(schedule)
    }
    fn get_schedule(&self, id: &ScheduleId) -> anyhow::Result<Option<Schedule>> {
        self.inner.get_schedule(id)
    }
    fn update_schedule(&self, schedule: &Schedule) -> anyhow::Result<()> {
        self.inner.update_schedule(schedule)
    }
    fn insert_shift(&self, shift: Shift) -> anyhow::Result<()> {
        if self.inserted.fetch_add(1, Ordering::SeqCst) >= self.limit {
            bail!("disk full");
        }
        self.inner.insert_shift(shift)
    }
    fn get_shift(&self, id: &ShiftId) -> anyhow::Result<Option<Shift>> {
        self.inner.get_shift(id)
    }
    fn update_shift(&self, shift: &Shift) -> anyhow::Result<()> {
        self.inner.update_shift(shift)
    }
    fn delete_shift(&self, id: &ShiftId) -> anyhow::Result<bool> {
        self.inner.delete_shift(id)
    }
    fn shifts_for_staff(&self, staff: &StaffId) -> anyhow::Result<Vec<Shift>> {
        self.inner.shifts_for_staff(staff)
    }
    fn shifts_for_schedule(&self, schedule: &ScheduleId) -> anyhow::Result<Vec<Shift>> {
        self.inner.shifts_for_schedule(schedule)
    }
    fn shifts_in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> anyhow::Result<Vec<Shift>> {
        self.inner.shifts_in_window(from, to)
    }
    fn all_shifts(&self) -> anyhow::Result<Vec<Shift>> {
        self.inner.all_shifts()
    }
    fn insert_swap_request(&self, request: SwapRequest) -> anyhow::Result<()> {
        self.inner.insert_swap_request(request)
    }
    fn get_swap_request(&self, id: &SwapRequestId) -> anyhow::Result<Option<SwapRequest>> {
        self.inner.get_swap_request(id)
    }
    fn update_swap_request(&self, request: &SwapRequest) -> anyhow::Result<()> {
        self.inner.update_swap_request(request)
    }
    fn swap_requests(&self) -> anyhow::Result<Vec<SwapRequest>> {
        self.inner.swap_requests()
    }
}

#[test]
fn failure_mid_loop_keeps_committed_days() {
    let (inner, admin, staff) = seeded(2);
    let store = FailingStore {
        inner,
        inserted: AtomicUsize::new(0),
        limit: 3,
    };
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "fragile").unwrap();

    let err = s
        .auto_populate_schedule(
            AutoPopulate::new(schedule.id.clone(), StrategyKind::Even, staff)
                .days(5)
                .starting(day(6)),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Partial);
    match err {
        SchedError::PartialPopulation {
            shifts,
            requested,
            source,
        } => {
            assert_eq!(shifts.len(), 3);
            assert_eq!(requested, 5);
            assert_eq!(source.kind(), ErrorKind::Internal);
        }
        other => panic!("unexpected error: {other}"),
    }
    // pas de compensation : les trois premiers jours restent écrits
    assert_eq!(s.schedule_shifts(&schedule.id).unwrap().len(), 3);
}

#[test]
fn failed_first_day_leaves_schedule_manual() {
    let (inner, admin, staff) = seeded(2);
    let store = FailingStore {
        inner,
        inserted: AtomicUsize::new(0),
        limit: 0,
    };
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "mort-né").unwrap();

    let err = s
        .auto_populate_schedule(AutoPopulate::new(schedule.id.clone(), StrategyKind::MinDays, staff).days(3))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Partial);

    let summary = s.schedule_summary(&schedule.id).unwrap();
    assert_eq!(summary.shift_count, 0);
    assert_eq!(summary.schedule.method, GenerationMethod::Manual);
}

#[test]
fn validation_failures_write_nothing() {
    let (store, admin, staff) = seeded(2);
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "vide").unwrap();
    let base = || AutoPopulate::new(schedule.id.clone(), StrategyKind::Even, staff.clone());

    let cases = vec![
        (
            AutoPopulate::new(ScheduleId::new("nope"), StrategyKind::Even, staff.clone()),
            ErrorKind::NotFound,
        ),
        (
            AutoPopulate::new(schedule.id.clone(), StrategyKind::Even, vec![]),
            ErrorKind::InvalidInput,
        ),
        (
            AutoPopulate::new(
                schedule.id.clone(),
                StrategyKind::Even,
                vec![admin.clone(), StaffId::new("ghost")],
            ),
            ErrorKind::InvalidInput,
        ),
        (base().days(0), ErrorKind::InvalidInput),
        (base().hours(9, 9), ErrorKind::InvalidInput),
        (base().hours(0, 24), ErrorKind::InvalidInput),
    ];
    for (req, expected) in cases {
        let err = s.auto_populate_schedule(req).unwrap_err();
        assert_eq!(err.kind(), expected, "{err}");
    }

    assert!(s.store().all_shifts().unwrap().is_empty());
    let untouched = s.store().get_schedule(&schedule.id).unwrap().unwrap();
    assert_eq!(untouched.method, GenerationMethod::Manual);
}

#[test]
fn unknown_strategy_name_is_rejected() {
    let err = "round_robin".parse::<StrategyKind>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!("min_days".parse::<StrategyKind>().unwrap(), StrategyKind::MinDays);
}

#[test]
fn eligible_set_is_filtered_and_deduplicated() {
    let (store, admin, staff) = seeded(2);
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "filtre").unwrap();

    let eligible = vec![
        staff[0].clone(),
        admin.clone(),
        StaffId::new("ghost"),
        staff[0].clone(),
        staff[1].clone(),
    ];
    let outcome = s
        .auto_populate_schedule(
            AutoPopulate::new(schedule.id, StrategyKind::Even, eligible)
                .days(4)
                .starting(day(1)),
        )
        .unwrap();

    let owners: Vec<&StaffId> = outcome.shifts.iter().map(|s| &s.staff_id).collect();
    assert_eq!(owners, vec![&staff[0], &staff[1], &staff[0], &staff[1]]);
}

#[test]
fn first_auto_population_stamps_the_schedule() {
    let (store, admin, staff) = seeded(2);
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "auto").unwrap();
    assert_eq!(schedule.method, GenerationMethod::Manual);

    s.auto_populate_schedule(
        AutoPopulate::new(schedule.id.clone(), StrategyKind::Balanced, staff.clone()).days(2),
    )
    .unwrap();
    s.auto_populate_schedule(AutoPopulate::new(schedule.id.clone(), StrategyKind::Even, staff).days(2))
        .unwrap();

    let summary = s.schedule_summary(&schedule.id).unwrap();
    assert_eq!(
        summary.schedule.method,
        GenerationMethod::Auto {
            strategy: StrategyKind::Balanced
        }
    );
    assert_eq!(summary.shift_count, 4);
    assert_eq!(summary.schedule.method.to_string(), "auto(balanced)");
}

#[test]
fn overnight_shifts_roll_into_next_day() {
    let (store, admin, staff) = seeded(1);
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "nuits").unwrap();

    let outcome = s
        .auto_populate_schedule(
            AutoPopulate::new(schedule.id, StrategyKind::Even, staff)
                .days(1)
                .hours(22, 6)
                .starting(day(31)),
        )
        .unwrap();

    let shift = &outcome.shifts[0];
    assert_eq!(shift.start, Utc.with_ymd_and_hms(2025, 1, 31, 22, 0, 0).unwrap());
    assert_eq!(shift.end, Utc.with_ymd_and_hms(2025, 2, 1, 6, 0, 0).unwrap());
    assert_eq!(shift.duration_seconds(), 8 * 3600);
}

#[test]
fn balanced_gives_night_to_whoever_worked_days() {
    let (store, admin, staff) = seeded(2);
    let s = Scheduler::new(store).with_clock(clock());
    for d in [2, 3] {
        let start = Utc.with_ymd_and_hms(2025, 1, d, 9, 0, 0).unwrap();
        s.manual_assign(&admin, &staff[1], start, start.with_hour(17).unwrap(), None)
            .unwrap();
    }
    let schedule = s.create_schedule(&admin, "équilibre").unwrap();

    let outcome = s
        .auto_populate_schedule(
            AutoPopulate::new(schedule.id, StrategyKind::Balanced, staff.clone())
                .days(1)
                .hours(20, 4)
                .starting(day(4)),
        )
        .unwrap();

    assert_eq!(outcome.shifts[0].staff_id, staff[1]);
}

#[test]
fn base_date_defaults_to_clock_today() {
    let (store, admin, staff) = seeded(1);
    let s = Scheduler::new(store).with_clock(clock());
    let schedule = s.create_schedule(&admin, "aujourd'hui").unwrap();

    let outcome = s
        .auto_populate_schedule(AutoPopulate::new(schedule.id, StrategyKind::MinDays, staff).days(1))
        .unwrap();
    assert_eq!(outcome.shifts[0].start, Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn even_keeps_counts_within_one(n in 1usize..6, days in 1u32..20) {
        let (store, admin, staff) = seeded(n);
        let s = Scheduler::new(store).with_clock(clock());
        let schedule = s.create_schedule(&admin, "prop").unwrap();

        let outcome = s
            .auto_populate_schedule(AutoPopulate::new(schedule.id, StrategyKind::Even, staff.clone()).days(days))
            .unwrap();
        prop_assert_eq!(outcome.count, days as usize);

        let mut per_staff: HashMap<&StaffId, usize> = staff.iter().map(|id| (id, 0)).collect();
        for shift in &outcome.shifts {
            *per_staff.get_mut(&shift.staff_id).unwrap() += 1;
        }
        let max = per_staff.values().max().copied().unwrap();
        let min = per_staff.values().min().copied().unwrap();
        prop_assert!(max - min <= 1);
    }
}
