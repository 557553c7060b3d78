//! Gregorian → Vietnamese lunar calendar conversion.
//!
//! Uses the public-domain astronomical approximation popularised for the
//! Vietnamese calendar: locate the new moon that starts the lunar month
//! containing the date, then number that month from the Sun's longitude at the
//! new moon. All arithmetic is done in Julian Day Numbers at a fixed time-zone
//! offset (UTC+7 by default).
//!
//! # Functions
//!
//! - [`jd_from_date`] — calendar date → Julian Day Number
//! - [`new_moon_day`] — day number of the k-th new moon after the 1900 epoch
//! - [`sun_longitude`] — apparent solar longitude (degrees) at an instant
//! - [`lunar_month_from_longitude`] — month number from the new-moon longitude
//! - [`solar_to_lunar`] — the full conversion
//!
//! # Simplifications
//!
//! Leap months are not detected: a leap month carries the number of the month
//! whose 30° solar sector it falls in. The lunar year is reported as the
//! Gregorian year of the input date, so the days between 1 January and Tết
//! keep the new year's number.

use std::f64::consts::PI;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::Result;
use crate::model::parse_iso_date;

/// UTC offset of Vietnam (Indochina Time), in hours.
pub const VIETNAM_UTC_OFFSET_HOURS: f64 = 7.0;

/// Traditional month names: tháng Giêng (1) … tháng Chạp (12).
pub const MONTH_NAMES: [&str; 12] = [
    "Giêng", "Hai", "Ba", "Tư", "Năm", "Sáu", "Bảy", "Tám", "Chín", "Mười", "Một", "Chạp",
];

/// Mean synodic month, in days.
const SYNODIC_MONTH: f64 = 29.530588853;

/// Julian day of the new moon of 1 January 1900, the k = 0 epoch.
const LUNATION_EPOCH: f64 = 2415021.076998695;

/// First Julian Day Number of the Gregorian calendar (15 October 1582).
const GREGORIAN_REFORM_JDN: i64 = 2299161;

/// Solar longitude where month sector 1 starts (Đại Hàn, 300°).
const FIRST_MONTH_SECTOR_START: f64 = 300.0;

const DEG: f64 = PI / 180.0;

// ── Options ─────────────────────────────────────────────────────────────────

/// Options for [`solar_to_lunar_with_options`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LunarOptions {
    /// Time-zone offset, in hours, at which days begin and end.
    pub utc_offset_hours: f64,
}

impl Default for LunarOptions {
    fn default() -> Self {
        Self {
            utc_offset_hours: VIETNAM_UTC_OFFSET_HOURS,
        }
    }
}

// ── LunarDate ───────────────────────────────────────────────────────────────

/// A date in the Vietnamese lunar calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarDate {
    /// Day within the lunar month (1–30).
    pub day: u32,
    /// Month number (1–12).
    pub month: u32,
    /// Traditional month name, e.g. "Giêng".
    pub month_name: &'static str,
    pub year: i32,
}

impl LunarDate {
    /// Whether this date falls on the given lunar day and month.
    pub fn matches(&self, day: u32, month: u32) -> bool {
        self.day == day && self.month == month
    }
}

impl fmt::Display for LunarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tháng {} năm {}", self.day, self.month_name, self.year)
    }
}

// ── Conversion ──────────────────────────────────────────────────────────────

/// Convert a Gregorian date to its lunar date at UTC+7.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use giapha_engine::lunar::solar_to_lunar;
///
/// // Tết Nguyên Đán 2024
/// let tet = solar_to_lunar(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
/// assert_eq!((tet.day, tet.month), (1, 1));
/// assert_eq!(tet.month_name, "Giêng");
/// ```
pub fn solar_to_lunar(date: NaiveDate) -> LunarDate {
    solar_to_lunar_with_options(date, &LunarOptions::default())
}

/// Convert a Gregorian date to its lunar date with explicit options.
pub fn solar_to_lunar_with_options(date: NaiveDate, options: &LunarOptions) -> LunarDate {
    let tz = options.utc_offset_hours;
    let jdn = jd_from_date(date.day(), date.month(), date.year());

    // Try the lunation after the estimate first, then step back until the new
    // moon is on or before the date (one step almost always suffices).
    let mut k = ((jdn as f64 - LUNATION_EPOCH) / SYNODIC_MONTH).floor() as i64 + 1;
    let mut month_start = new_moon_day(k, tz);
    while month_start > jdn {
        k -= 1;
        month_start = new_moon_day(k, tz);
    }

    let day = (jdn - month_start + 1) as u32;
    // Longitude at local midnight starting the new-moon day.
    let longitude = sun_longitude(month_start as f64 - 0.5 - tz / 24.0);
    let month = lunar_month_from_longitude(longitude);

    LunarDate {
        day,
        month,
        month_name: MONTH_NAMES[(month - 1) as usize],
        year: date.year(),
    }
}

/// Convert an ISO date string (`YYYY-MM-DD`) to its lunar date at UTC+7.
///
/// # Errors
///
/// Returns [`crate::GiaphaError::InvalidDate`] if the string is not a valid
/// calendar date.
pub fn solar_to_lunar_iso(date: &str) -> Result<LunarDate> {
    Ok(solar_to_lunar(parse_iso_date(date)?))
}

/// The traditional name of lunar month `month` (1–12).
pub fn month_name(month: u32) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTH_NAMES[(month - 1) as usize]),
        _ => None,
    }
}

// ── Astronomical helpers ────────────────────────────────────────────────────

/// Julian Day Number of a calendar date.
///
/// Proleptic Gregorian dates are used from 15 October 1582 on; earlier day
/// numbers are recomputed with the Julian calendar formula.
pub fn jd_from_date(day: u32, month: u32, year: i32) -> i64 {
    let (day, month, year) = (day as i64, month as i64, year as i64);
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    let jd = day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;
    if jd < GREGORIAN_REFORM_JDN {
        day + (153 * m + 2) / 5 + 365 * y + y / 4 - 32083
    } else {
        jd
    }
}

/// Local day number of the `k`-th new moon after the 1900 epoch.
///
/// Mean new moon corrected by the leading periodic terms in the Sun's mean
/// anomaly (M), the Moon's mean anomaly (M′) and the Moon's argument of
/// latitude (F), minus ΔT, then shifted to the time zone and floored.
pub fn new_moon_day(k: i64, utc_offset_hours: f64) -> i64 {
    let k = k as f64;
    let t = k / 1236.85;
    let t2 = t * t;
    let t3 = t2 * t;

    let mut jd = 2415020.75933 + 29.53058868 * k + 0.0001178 * t2 - 0.000000155 * t3;
    jd += 0.00033 * ((166.56 + 132.87 * t - 0.009173 * t2) * DEG).sin();

    let m = (357.52910 + 35999.05030 * t - 0.0000333 * t2 - 0.00000347 * t3) * DEG;
    let mpr = (306.0253 + 385.81691806 * k + 0.0107306 * t2 + 0.00001236 * t3) * DEG;
    let f = (21.2964 + 390.67050646 * k - 0.0016528 * t2 - 0.00000239 * t3) * DEG;

    let mut c1 = (0.1734 - 0.000393 * t) * m.sin() + 0.0021 * (2.0 * m).sin();
    c1 = c1 - 0.4068 * mpr.sin() + 0.0161 * (2.0 * mpr).sin();
    c1 -= 0.0004 * (3.0 * mpr).sin();
    c1 = c1 + 0.0104 * (2.0 * f).sin() - 0.0051 * (m + mpr).sin();
    c1 = c1 - 0.0074 * (m - mpr).sin() + 0.0004 * (2.0 * f + m).sin();
    c1 = c1 - 0.0004 * (2.0 * f - m).sin() - 0.0006 * (2.0 * f + mpr).sin();
    c1 = c1 + 0.0010 * (2.0 * f - mpr).sin() + 0.0005 * (2.0 * mpr + m).sin();

    let delta_t = if t < -11.0 {
        0.001 + 0.000839 * t + 0.0002261 * t2 - 0.00000845 * t3 - 0.000000081 * t * t3
    } else {
        -0.000278 + 0.000265 * t + 0.000262 * t2
    };

    (jd + c1 - delta_t + 0.5 + utc_offset_hours / 24.0).floor() as i64
}

/// Apparent solar longitude, in degrees within `[0, 360)`, at Julian day `jd`.
pub fn sun_longitude(jd: f64) -> f64 {
    let t = (jd - 2451545.0) / 36525.0;
    let t2 = t * t;
    let m = 357.52910 + 35999.05030 * t - 0.0000333 * t2 - 0.00000047 * t * t2;
    let l0 = 280.46646 + 36000.76983 * t + 0.0003032 * t2;
    let dl = (1.914600 - 0.004817 * t - 0.000014 * t2) * (DEG * m).sin()
        + (0.019993 - 0.000101 * t) * (DEG * 2.0 * m).sin()
        + 0.000290 * (DEG * 3.0 * m).sin();
    let l = l0 + dl;
    l - 360.0 * (l / 360.0).floor()
}

/// Lunar month number (1–12) for a month whose new moon sees the Sun at
/// `longitude` degrees.
///
/// Sectors are 30° wide and counted from 300°: a month starting with the Sun
/// in [300°, 330°) holds the 330° major term and is month 1.
pub fn lunar_month_from_longitude(longitude: f64) -> u32 {
    let offset = (longitude - FIRST_MONTH_SECTOR_START).rem_euclid(360.0);
    let sector = (offset / 30.0).floor() as i64 + 1;
    sector.clamp(1, 12) as u32
}

// ── Tests ───────────────────────────────────────────────────────────────────
