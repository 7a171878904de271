//! Persistance fichier du [`Roster`] : enveloppe JSON versionnée, écriture atomique.

use crate::model::Roster;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const FORMAT_VERSION: u32 = 1;

pub trait Storage {
    fn load(&self) -> anyhow::Result<Roster>;
    /// Remplace le contenu du support en une seule opération.
    fn save(&self, roster: &Roster) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    roster: &'a Roster,
}

#[derive(Deserialize)]
struct OwnedEnvelope {
    version: u32,
    roster: Roster,
}

#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            bail!("{} is a directory, expected a roster file", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Comme `load`, mais un fichier absent donne un roster vide.
    pub fn load_or_default(&self) -> anyhow::Result<Roster> {
        if !self.path.exists() {
            return Ok(Roster::default());
        }
        self.load()
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Roster> {
        let shown = self.path.display();
        let data = fs::read(&self.path).with_context(|| format!("reading {shown}"))?;
        let file: OwnedEnvelope =
            serde_json::from_slice(&data).with_context(|| format!("parsing {shown}"))?;
        if file.version != FORMAT_VERSION {
            bail!(
                "{shown}: unsupported roster format version {} (expected {FORMAT_VERSION})",
                file.version
            );
        }
        check_integrity(&file.roster).with_context(|| format!("validating {shown}"))?;
        Ok(file.roster)
    }

    fn save(&self, roster: &Roster) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(&Envelope {
            version: FORMAT_VERSION,
            roster,
        })?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir).context("creating temp file")?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Identifiants uniques, créneaux bien bornés, références vers des entités connues.
fn check_integrity(roster: &Roster) -> anyhow::Result<()> {
    let mut staff = HashSet::new();
    for p in &roster.staff {
        if !staff.insert(&p.id) {
            bail!("duplicate staff id {}", p.id);
        }
    }
    let schedules: HashSet<_> = roster.schedules.iter().map(|s| &s.id).collect();
    if schedules.len() != roster.schedules.len() {
        bail!("duplicate schedule id");
    }

    let mut shifts = HashSet::new();
    for s in &roster.shifts {
        if !shifts.insert(&s.id) {
            bail!("duplicate shift id {}", s.id);
        }
        if s.end <= s.start {
            bail!("shift {} ends before it starts", s.id);
        }
        if !staff.contains(&s.staff_id) {
            bail!("shift {} references unknown staff {}", s.id, s.staff_id);
        }
        if let Some(id) = &s.schedule_id {
            if !schedules.contains(id) {
                bail!("shift {} references unknown schedule {id}", s.id);
            }
        }
    }
    // une demande peut survivre à la suppression de son créneau
    for r in &roster.swap_requests {
        if !staff.contains(&r.requesting_staff_id) || !staff.contains(&r.requested_staff_id) {
            bail!("swap request {} references unknown staff", r.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Shift, Staff, StaffId};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn night_roster() -> (Roster, Shift) {
        let alice = Staff::new("Alice");
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 5, 2, 6, 0, 0).unwrap();
        let mut shift = Shift::new(alice.id.clone(), start, end, None).unwrap();
        shift.clock_in = Some(start);
        let roster = Roster {
            staff: vec![alice],
            shifts: vec![shift.clone()],
            ..Roster::default()
        };
        (roster, shift)
    }

    #[test]
    fn save_then_load_keeps_everything() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::open(dir.path().join("data/roster.json")).unwrap();
        assert!(storage.load_or_default().unwrap().shifts.is_empty());

        let (roster, shift) = night_roster();
        storage.save(&roster).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.staff.len(), 1);
        assert_eq!(loaded.shifts, vec![shift]);
    }

    #[test]
    fn unknown_version_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roster.json");
        fs::write(&path, r#"{ "version": 9, "roster": {} }"#).unwrap();
        let err = JsonStorage::open(&path).unwrap().load().unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }

    #[test]
    fn dangling_staff_reference_is_refused() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::open(dir.path().join("roster.json")).unwrap();
        let (mut roster, _) = night_roster();
        roster.shifts[0].staff_id = StaffId::new("ghost");
        storage.save(&roster).unwrap();

        let err = storage.load().unwrap_err();
        assert!(format!("{err:#}").contains("unknown staff ghost"));
    }
}
