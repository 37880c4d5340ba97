//! Month calendar grouping.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::entities::AppointmentDetails;

/// UTC bounds `[first day of month, first day of next month)`.
pub fn month_bounds(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    Some((
        first.and_hms_opt(0, 0, 0)?.and_utc(),
        next.and_hms_opt(0, 0, 0)?.and_utc(),
    ))
}

/// Group appointments by UTC day (`YYYY-MM-DD`), days ascending and each
/// day ordered by start time.
pub fn group_by_day(appointments: Vec<AppointmentDetails>) -> BTreeMap<String, Vec<AppointmentDetails>> {
    let mut days: BTreeMap<String, Vec<AppointmentDetails>> = BTreeMap::new();

    for details in appointments {
        let key = details.appointment.scheduled_at.format("%Y-%m-%d").to_string();
        days.entry(key).or_default().push(details);
    }

    for list in days.values_mut() {
        list.sort_by_key(|d| d.appointment.scheduled_at);
    }

    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Appointment;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn details(id: i64, day: u32, hour: u32) -> AppointmentDetails {
        AppointmentDetails {
            appointment: Appointment {
                id,
                scheduled_at: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
                ..Default::default()
            },
            client_name: String::new(),
            pet_name: String::new(),
            service_name: String::new(),
            staff_name: None,
        }
    }

    #[test]
    fn test_month_bounds() {
        let (from, to) = month_bounds(2024, 12).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        assert!(month_bounds(2024, 13).is_none());
        assert!(month_bounds(2024, 0).is_none());
    }

    #[test]
    fn test_group_by_day_orders_days_and_times() {
        let grouped = group_by_day(vec![details(1, 12, 15), details(2, 3, 9), details(3, 12, 8)]);

        let keys: Vec<&str> = grouped.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2024-03-03", "2024-03-12"]);

        let ids: Vec<i64> = grouped["2024-03-12"].iter().map(|d| d.appointment.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_day(Vec::new()).is_empty());
    }
}
