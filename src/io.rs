use crate::model::{Roster, Staff, StaffId, StaffRole};
use crate::scheduler::ShiftReport;
use anyhow::{bail, Context};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// Import du personnel depuis CSV: header `id,name[,role]` (id vide = généré)
pub fn import_staff_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Staff>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        if name.is_empty() {
            bail!("invalid staff row (empty name)");
        }
        let mut staff = Staff::new(name);
        if !id.is_empty() {
            staff.id = StaffId::new(id);
        }
        if let Some(role) = rec.get(2) {
            let role = role.trim();
            if !role.is_empty() {
                staff.role = parse_role(role).with_context(|| format!("invalid role for {name}"))?;
            }
        }
        out.push(staff);
    }
    Ok(out)
}

fn parse_role(s: &str) -> anyhow::Result<StaffRole> {
    match s.to_ascii_lowercase().as_str() {
        "staff" | "employee" => Ok(StaffRole::Staff),
        "admin" | "administrator" => Ok(StaffRole::Admin),
        _ => bail!(
            "expected {} or {}",
            StaffRole::Staff.as_str(),
            StaffRole::Admin.as_str()
        ),
    }
}

/// Export JSON du roster (jolie mise en forme)
pub fn export_roster_json<P: AsRef<Path>>(path: P, roster: &Roster) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(roster)?;
    fs::write(path, s)?;
    Ok(())
}

fn hours(h: f64) -> String {
    format!("{h:.2}")
}

/// Export CSV des shifts:
/// header `id,staff_id,staff_name,schedule_id,start,end,clock_in,clock_out,state,scheduled_hours`
pub fn export_shifts_csv<P: AsRef<Path>>(path: P, roster: &Roster) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "id",
        "staff_id",
        "staff_name",
        "schedule_id",
        "start",
        "end",
        "clock_in",
        "clock_out",
        "state",
        "scheduled_hours",
    ])?;
    let mut shifts: Vec<_> = roster.shifts.iter().collect();
    shifts.sort_by_key(|s| s.start);
    for s in shifts {
        let name = roster.staff_name(&s.staff_id).unwrap_or("");
        let schedule = s.schedule_id.as_ref().map(|id| id.as_str()).unwrap_or("");
        let clock_in = s.clock_in.map(|t| t.to_rfc3339()).unwrap_or_default();
        let clock_out = s.clock_out.map(|t| t.to_rfc3339()).unwrap_or_default();
        w.write_record([
            s.id.as_str(),
            s.staff_id.as_str(),
            name,
            schedule,
            s.start.to_rfc3339().as_str(),
            s.end.to_rfc3339().as_str(),
            clock_in.as_str(),
            clock_out.as_str(),
            s.state().to_string().as_str(),
            hours(s.scheduled_hours()).as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV du rapport, une ligne par membre:
/// header `staff_id,staff_name,shifts,scheduled_hours,worked_hours`
pub fn export_report_csv<P: AsRef<Path>>(path: P, report: &ShiftReport) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["staff_id", "staff_name", "shifts", "scheduled_hours", "worked_hours"])?;
    let mut count = itoa::Buffer::new();
    for row in &report.per_staff {
        w.write_record([
            row.staff_id.as_str(),
            row.staff_name.as_str(),
            count.format(row.shifts),
            hours(row.scheduled_hours).as_str(),
            hours(row.worked_hours).as_str(),
        ])?;
    }
    w.write_record([
        "",
        "TOTAL",
        count.format(report.total_shifts),
        hours(report.scheduled_hours).as_str(),
        hours(report.worked_hours).as_str(),
    ])?;
    w.flush()?;
    Ok(())
}
