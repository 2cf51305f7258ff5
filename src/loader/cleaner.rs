use chrono::{DateTime, NaiveDate, NaiveDateTime};

// ── Missing markers ───────────────────────────────────────────────────────────

const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Whether a raw field counts as an absent value.
pub fn is_missing(s: &str) -> bool {
    MISSING_MARKERS.contains(&s.trim())
}

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a numeric field. Thousands separators and units are not stripped:
/// "1,234" stays text so that a column is only numeric when every value
/// is plainly a number.
/// "12.5" → 12.5 | "-3e2" → -300.0 | "12 mL" → None
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if is_missing(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Parse dates and date-times: ISO, RFC 3339, slash and dot separated,
/// "Feb 20, 2024". Month-first wins over day-first for ambiguous slashes.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Header cleanup: blank names become "Unnamed: i", repeats get ".1", ".2"…
pub fn normalise_headers<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (i, h) in raw.into_iter().enumerate() {
        let base = match h.trim() {
            "" => format!("Unnamed: {}", i),
            s => s.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        names.push(name);
    }
    names
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number(" 7 "), Some(7.0));
        assert_eq!(parse_number("-3e2"), Some(-300.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("1,234"), None);
        assert_eq!(parse_number("12 mL"), None);
    }

    #[test]
    fn test_parse_datetime() {
        let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_datetime("2024-01-02"), Some(jan2));
        assert_eq!(parse_datetime("2024/01/02"), Some(jan2));
        assert_eq!(parse_datetime("01/02/2024"), Some(jan2));
        assert_eq!(parse_datetime("Jan 02, 2024"), Some(jan2));
        assert_eq!(
            parse_datetime("2024-01-02 10:30"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(10, 30, 0)
        );
        assert_eq!(
            parse_datetime("2024-01-02T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(10, 30, 0)
        );
        assert_eq!(parse_datetime("25/12/2024").map(|d| d.date()), NaiveDate::from_ymd_opt(2024, 12, 25));
        assert_eq!(parse_datetime("acid"), None);
        assert_eq!(parse_datetime("12"), None);
    }

    #[test]
    fn test_normalise_headers() {
        assert_eq!(normalise_headers(["x", "", "x", "x"]), vec!["x", "Unnamed: 1", "x.1", "x.2"]);
        assert_eq!(normalise_headers([" a ", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("  NA "));
        assert!(!is_missing("0"));
    }
}
