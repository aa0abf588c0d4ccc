use std::time::{SystemTime, UNIX_EPOCH};

/// Broken-down UTC timestamp with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub micros: u32,
}

pub fn utc_now() -> DateTime {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    from_unix(elapsed.as_secs(), elapsed.subsec_micros())
}

pub fn from_unix(secs: u64, micros: u32) -> DateTime {
    let days = secs / 86_400;
    let time_of_day = secs % 86_400;

    let mut year = 1970u64;
    let mut remaining = days;
    loop {
        let year_len = if is_leap_year(year) { 366 } else { 365 };
        if remaining < year_len {
            break;
        }
        remaining -= year_len;
        year += 1;
    }

    let month_days: [u64; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1u32;
    for len in month_days {
        if remaining < len {
            break;
        }
        remaining -= len;
        month += 1;
    }

    DateTime {
        year,
        month,
        day: remaining as u32 + 1,
        hour: (time_of_day / 3600) as u32,
        minute: (time_of_day % 3600 / 60) as u32,
        second: (time_of_day % 60) as u32,
        micros,
    }
}

fn is_leap_year(year: u64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}
