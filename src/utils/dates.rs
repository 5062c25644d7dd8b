use chrono::{Datelike, Duration, NaiveDate, Utc};

const WEEKDAYS_FR: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// "Vendredi 10 janvier 2025". Values that do not parse as an ISO date are
/// returned unchanged.
pub fn format_long_fr(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => {
            let weekday = WEEKDAYS_FR[d.weekday().num_days_from_monday() as usize];
            let month = MONTHS_FR[(d.month() - 1) as usize];
            format!("{} {} {} {}", ucfirst(weekday), d.day(), month, d.year())
        }
        Err(_) => raw.to_string(),
    }
}

pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// "YYYYMMDD" compact form used by iCalendar DATE values.
pub fn compact(d: NaiveDate) -> String {
    d.format("%Y%m%d").to_string()
}

/// All-day DTEND is exclusive, so the last covered day plus one.
pub fn exclusive_end(end: NaiveDate) -> NaiveDate {
    end + Duration::days(1)
}

/// Storage timestamp, "YYYY-MM-DD HH:MM:SS" in UTC.
pub fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// iCalendar DTSTAMP in UTC.
pub fn dtstamp_utc() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_french_date() {
        assert_eq!(format_long_fr("2025-01-10"), "Vendredi 10 janvier 2025");
        assert_eq!(format_long_fr("2025-08-01"), "Vendredi 1 août 2025");
    }

    #[test]
    fn unparsable_input_is_returned_as_is() {
        assert_eq!(format_long_fr("next week"), "next week");
        assert_eq!(format_long_fr(""), "");
    }

    #[test]
    fn exclusive_end_crosses_month_boundary() {
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(compact(exclusive_end(end)), "20250201");
    }
}
