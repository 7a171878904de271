#![forbid(unsafe_code)]
//! Rota — moteur d'affectation de créneaux et de suivi de leur exécution.
//!
//! - Stratégies pures (répartition égale, jours minimaux, équilibre jour/nuit).
//! - Remplissage glouton séquentiel d'un planning, jour après jour.
//! - Cycle de vie d'un créneau (pointage entrée/sortie) et échanges entre membres.
//! - Tout en UTC ; le stockage est derrière les traits de [`store`].

pub mod clock;
pub mod config;
pub mod io;
pub mod model;
pub mod scheduler;
pub mod stats;
pub mod storage;
pub mod store;
pub mod strategy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use model::{
    GenerationMethod, Roster, Schedule, ScheduleId, Shift, ShiftId, ShiftState, Staff, StaffId,
    StaffRole, SwapRequest, SwapRequestId, SwapStatus,
};
pub use scheduler::{
    AutoPopulate, Backend, Deleted, ErrorKind, PopulationOutcome, SchedError, Scheduler,
    ShiftReport, SwapAction,
};
pub use stats::{DayNightStats, DayWindow, LoadStats};
pub use storage::{JsonStorage, Storage};
pub use store::{MemoryStore, ShiftStore, StaffDirectory};
pub use strategy::{SlotContext, StaffStats, StrategyKind};
