use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use time::{Date, Month, OffsetDateTime, UtcOffset};

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let seconds = utc.unix_timestamp();
    let nanos: u32 = utc.nanosecond();
    let datetime_utc = DateTime::<Utc>::from_timestamp(seconds, nanos)
        .or_else(|| DateTime::<Utc>::from_timestamp(seconds, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

pub fn localized_date(time: OffsetDateTime, tz: Tz) -> Date {
    let localized = localized_datetime(time, tz);
    let month = Month::try_from(localized.month() as u8).unwrap_or(Month::January);
    let day = u8::try_from(localized.day()).unwrap_or(1);
    Date::from_calendar_date(localized.year(), month, day).unwrap_or(Date::MIN)
}

/// Hour of day (0-23) of `time` as observed in `tz`.
pub fn local_hour(time: OffsetDateTime, tz: Tz) -> u32 {
    localized_datetime(time, tz).hour()
}

pub fn is_weekend(time: OffsetDateTime, tz: Tz) -> bool {
    matches!(
        localized_datetime(time, tz).weekday(),
        Weekday::Sat | Weekday::Sun
    )
}
