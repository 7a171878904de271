//! Stratégies d'affectation : fonctions pures sur des agrégats déjà calculés.
//!
//! Aucune stratégie n'accède au stockage ; c'est l'orchestrateur qui collecte les
//! statistiques (voir [`crate::stats`]) puis demande un gagnant.
//!
//! Toutes les stratégies parcourent l'ensemble éligible dans l'ordre fourni, traitent
//! une entrée absente comme nulle, et départagent les ex æquo en faveur du premier
//! candidat.

use crate::model::StaffId;
use crate::scheduler::SchedError;
use crate::stats::{DayNightStats, DaysWorked, LoadStats};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Répartit le nombre de créneaux (puis les heures) le plus uniformément possible.
    Even,
    /// Regroupe les créneaux sur le moins de jours distincts par personne.
    MinDays,
    /// Équilibre jour/nuit par personne, la charge horaire départage.
    Balanced,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::Even, StrategyKind::MinDays, StrategyKind::Balanced];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Even => "even",
            StrategyKind::MinDays => "min_days",
            StrategyKind::Balanced => "balanced",
        }
    }

    /// Choisit le gagnant pour un créneau. Les statistiques doivent être du type
    /// attendu par la stratégie.
    pub fn score(
        self,
        eligible: &[StaffId],
        stats: &StaffStats,
        slot: &SlotContext,
    ) -> Result<StaffId, SchedError> {
        match (self, stats) {
            (StrategyKind::Even, StaffStats::Load(load)) => even_distribution(eligible, load),
            (StrategyKind::MinDays, StaffStats::DaysWorked(days)) => {
                min_days_per_week(eligible, days, slot.day)
            }
            (StrategyKind::Balanced, StaffStats::DayNight(dn)) => {
                balanced_day_night(eligible, dn, slot.is_day)
            }
            _ => Err(SchedError::DataIntegrity("stats do not match the selected strategy")),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "even" => Ok(StrategyKind::Even),
            "min_days" => Ok(StrategyKind::MinDays),
            "balanced" => Ok(StrategyKind::Balanced),
            other => Err(SchedError::invalid_input(format!(
                "unknown strategy: {other} (expected even, min_days or balanced)"
            ))),
        }
    }
}

/// Statistiques agrégées, une variante par stratégie.
#[derive(Debug, Clone)]
pub enum StaffStats {
    Load(HashMap<StaffId, LoadStats>),
    DaysWorked(HashMap<StaffId, DaysWorked>),
    DayNight(HashMap<StaffId, DayNightStats>),
}

/// Contexte du créneau à pourvoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotContext {
    pub day: NaiveDate,
    pub is_day: bool,
}

fn pick_min<K: Ord>(
    eligible: &[StaffId],
    stats_len: usize,
    score: impl Fn(&StaffId) -> K,
) -> Result<StaffId, SchedError> {
    if stats_len == 0 {
        return Err(SchedError::DataIntegrity("no staff stats provided"));
    }
    // min_by_key garde le premier minimum : ordre de l'ensemble éligible
    eligible
        .iter()
        .min_by_key(|id| score(*id))
        .cloned()
        .ok_or(SchedError::DataIntegrity("no eligible staff to score"))
}

/// Minimise `(shifts_assigned, seconds_assigned)`.
pub fn even_distribution(
    eligible: &[StaffId],
    stats: &HashMap<StaffId, LoadStats>,
) -> Result<StaffId, SchedError> {
    pick_min(eligible, stats.len(), |id| {
        let s = stats.get(id).copied().unwrap_or_default();
        (s.shifts_assigned, s.seconds_assigned)
    })
}

/// Minimise `(0 si déjà présent ce jour-là sinon 1, nombre de jours travaillés)`.
pub fn min_days_per_week(
    eligible: &[StaffId],
    stats: &HashMap<StaffId, DaysWorked>,
    target_day: NaiveDate,
) -> Result<StaffId, SchedError> {
    pick_min(eligible, stats.len(), |id| match stats.get(id) {
        Some(days) => (u8::from(!days.contains(&target_day)), days.len()),
        None => (1, 0),
    })
}

/// Minimise `(écart du type de créneau demandé, durée totale)`.
pub fn balanced_day_night(
    eligible: &[StaffId],
    stats: &HashMap<StaffId, DayNightStats>,
    is_day: bool,
) -> Result<StaffId, SchedError> {
    pick_min(eligible, stats.len(), |id| {
        let s = stats.get(id).copied().unwrap_or_default();
        let (day, night) = (i64::from(s.day_count), i64::from(s.night_count));
        let balance = if is_day { day - night } else { night - day };
        (balance, s.total_seconds)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ErrorKind;
    use std::collections::BTreeSet;

    fn ids(names: &[&str]) -> Vec<StaffId> {
        names.iter().map(StaffId::new).collect()
    }

    fn load(shifts: u32, hours: i64) -> LoadStats {
        LoadStats {
            shifts_assigned: shifts,
            seconds_assigned: hours * 3600,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn even_prefers_fewest_shifts_then_hours() {
        let staff = ids(&["a", "b", "c"]);
        let stats = HashMap::from([
            (staff[0].clone(), load(2, 8)),
            (staff[1].clone(), load(1, 10)),
            (staff[2].clone(), load(1, 4)),
        ]);
        assert_eq!(even_distribution(&staff, &stats).unwrap(), staff[2]);
    }

    #[test]
    fn even_ties_go_to_first_eligible() {
        let staff = ids(&["b", "a"]);
        let stats = HashMap::from([(staff[0].clone(), load(0, 0)), (staff[1].clone(), load(0, 0))]);
        assert_eq!(even_distribution(&staff, &stats).unwrap().as_str(), "b");
    }

    #[test]
    fn empty_stats_is_a_data_integrity_error() {
        let staff = ids(&["a"]);
        let err = even_distribution(&staff, &HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        let err = min_days_per_week(&staff, &HashMap::new(), date("2025-01-01")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        let err = balanced_day_night(&staff, &HashMap::new(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn min_days_clusters_on_existing_day() {
        let staff = ids(&["a", "b"]);
        let stats = HashMap::from([
            (staff[0].clone(), BTreeSet::from([date("2025-01-01")])),
            (staff[1].clone(), BTreeSet::new()),
        ]);
        let winner = min_days_per_week(&staff, &stats, date("2025-01-01")).unwrap();
        assert_eq!(winner, staff[0]);

        // nouveau jour pour tous : le moins de jours travaillés gagne
        let winner = min_days_per_week(&staff, &stats, date("2025-01-02")).unwrap();
        assert_eq!(winner, staff[1]);
    }

    #[test]
    fn missing_entries_count_as_empty() {
        let staff = ids(&["a", "ghost"]);
        let days = HashMap::from([(staff[0].clone(), BTreeSet::from([date("2025-01-03")]))]);
        assert_eq!(min_days_per_week(&staff, &days, date("2025-01-01")).unwrap(), staff[1]);

        let dn = HashMap::from([(
            staff[0].clone(),
            DayNightStats {
                day_count: 1,
                night_count: 0,
                total_seconds: 8 * 3600,
            },
        )]);
        assert_eq!(balanced_day_night(&staff, &dn, true).unwrap(), staff[1]);
    }

    #[test]
    fn balanced_prefers_under_represented_type() {
        let staff = ids(&["day_heavy", "night_heavy"]);
        let dn = HashMap::from([
            (
                staff[0].clone(),
                DayNightStats {
                    day_count: 3,
                    night_count: 0,
                    total_seconds: 24 * 3600,
                },
            ),
            (
                staff[1].clone(),
                DayNightStats {
                    day_count: 0,
                    night_count: 2,
                    total_seconds: 16 * 3600,
                },
            ),
        ]);
        assert_eq!(balanced_day_night(&staff, &dn, true).unwrap(), staff[1]);
        assert_eq!(balanced_day_night(&staff, &dn, false).unwrap(), staff[0]);
    }

    #[test]
    fn mismatched_stats_are_rejected() {
        let staff = ids(&["a"]);
        let stats = StaffStats::Load(HashMap::from([(staff[0].clone(), load(0, 0))]));
        let slot = SlotContext {
            day: date("2025-01-01"),
            is_day: true,
        };
        assert_eq!(StrategyKind::Even.score(&staff, &stats, &slot).unwrap(), staff[0]);
        let err = StrategyKind::Balanced.score(&staff, &stats, &slot).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn names_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        let err = "random".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
