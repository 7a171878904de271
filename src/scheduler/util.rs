use super::SchedError;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Bornes UTC d'un créneau pour un jour donné. `end_hour <= start_hour` déborde sur le
/// lendemain, `end_hour == 24` vaut minuit du lendemain.
pub(super) fn shift_bounds(
    day: NaiveDate,
    start_hour: u32,
    end_hour: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SchedError> {
    let at = |date: NaiveDate, hour: u32| {
        NaiveTime::from_hms_opt(hour, 0, 0)
            .map(|t| Utc.from_utc_datetime(&date.and_time(t)))
            .ok_or_else(|| SchedError::invalid_input(format!("invalid hour of day: {hour}")))
    };
    let next_day = || {
        day.checked_add_days(Days::new(1))
            .ok_or_else(|| SchedError::invalid_input("date overflow"))
    };

    let start = at(day, start_hour)?;
    let end = if end_hour == 24 {
        at(next_day()?, 0)?
    } else if end_hour <= start_hour {
        at(next_day()?, end_hour)?
    } else {
        at(day, end_hour)?
    };
    Ok((start, end))
}

pub(super) fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), SchedError> {
    if end <= start {
        return Err(SchedError::invalid_input(format!(
            "start {} must be before end {}",
            start.to_rfc3339(),
            end.to_rfc3339()
        )));
    }
    Ok(())
}

/// Semaine ISO (lundi 00:00 → lundi suivant) contenant `now`.
pub(super) fn week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let start = Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN));
    (start, start + Duration::days(7))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    }

    #[test]
    fn same_day_bounds() {
        let (s, e) = shift_bounds(day(), 9, 17).unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap());
        assert_eq!(e, Utc.with_ymd_and_hms(2025, 1, 31, 17, 0, 0).unwrap());
    }

    #[test]
    fn overnight_rolls_into_next_month() {
        let (s, e) = shift_bounds(day(), 22, 6).unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2025, 1, 31, 22, 0, 0).unwrap());
        assert_eq!(e, Utc.with_ymd_and_hms(2025, 2, 1, 6, 0, 0).unwrap());

        let (_, e) = shift_bounds(day(), 18, 24).unwrap();
        assert_eq!(e, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-01-31 est un vendredi
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 15, 0, 0).unwrap();
        let (from, to) = week_bounds(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 27, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap());
    }
}
