use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

/// Renders an instant as `YYYY-MM-DD 오전|오후 hh:mm` in the zone it carries.
pub(crate) fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    let hours24 = at.hour();
    let meridiem = if hours24 >= 12 { "오후" } else { "오전" };
    let hours12 = if hours24 % 12 == 0 { 12 } else { hours24 % 12 };
    format!(
        "{:04}-{:02}-{:02} {} {:02}:{:02}",
        at.year(),
        at.month(),
        at.day(),
        meridiem,
        hours12,
        at.minute()
    )
}

/// Store timestamps are UTC; the feed shows them in the local zone. A message
/// whose timestamp is still pending is shown as "now".
pub(crate) fn format_message_time(at: Option<&DateTime<Utc>>) -> String {
    match at {
        Some(at) => format_timestamp(&at.with_timezone(&Local)),
        None => format_timestamp(&Local::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .expect("kst offset")
            .with_ymd_and_hms(2024, 3, 7, h, m, 0)
            .single()
            .expect("valid instant")
    }

    #[test]
    fn morning_uses_am_marker() {
        assert_eq!(format_timestamp(&at(9, 5)), "2024-03-07 오전 09:05");
    }

    #[test]
    fn afternoon_uses_pm_marker_and_twelve_hour_clock() {
        assert_eq!(format_timestamp(&at(15, 42)), "2024-03-07 오후 03:42");
    }

    #[test]
    fn midnight_and_noon_render_as_twelve() {
        assert_eq!(format_timestamp(&at(0, 0)), "2024-03-07 오전 12:00");
        assert_eq!(format_timestamp(&at(12, 30)), "2024-03-07 오후 12:30");
    }

    #[test]
    fn pending_timestamp_still_formats() {
        let rendered = format_message_time(None);
        assert_eq!(rendered.chars().count(), "2024-03-07 오전 09:05".chars().count());
    }
}
