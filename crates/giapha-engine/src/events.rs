//! Event reminders: which family events fall on today or tomorrow.
//!
//! An event can be dated on the solar calendar, on the lunar calendar, or
//! both. Death anniversaries (giỗ) are typically lunar and repeat every year;
//! the lunar side is matched against the conversion of today and tomorrow.
//!
//! All functions take the reference day explicitly. [`upcoming_events_at`]
//! derives it from an instant in the configured time zone.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::lunar::{self, LunarDate, LunarOptions};
use crate::model::{FamilyEvent, Repeat};

// ── Upcoming predicate ──────────────────────────────────────────────────────

/// Events due today or tomorrow, in input order, using UTC+7 lunar days.
pub fn check_upcoming_events(events: &[FamilyEvent], today: NaiveDate) -> Vec<&FamilyEvent> {
    check_upcoming_events_with_options(events, today, &LunarOptions::default())
}

/// Events due today or tomorrow, in input order.
pub fn check_upcoming_events_with_options<'a>(
    events: &'a [FamilyEvent],
    today: NaiveDate,
    options: &LunarOptions,
) -> Vec<&'a FamilyEvent> {
    let window = ReminderWindow::new(today, options);
    events.iter().filter(|ev| window.is_due(ev)).collect()
}

/// Whether a single event is due today or tomorrow.
pub fn is_event_upcoming(event: &FamilyEvent, today: NaiveDate) -> bool {
    ReminderWindow::new(today, &LunarOptions::default()).is_due(event)
}

/// Events due around the instant `now`, with "today" taken in the
/// configured time zone.
///
/// # Errors
///
/// Returns [`crate::GiaphaError::InvalidTimezone`] if the configured zone is
/// not a valid IANA name.
pub fn upcoming_events_at<'a>(
    events: &'a [FamilyEvent],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<Vec<&'a FamilyEvent>> {
    let today = config.local_date(now)?;
    let due = check_upcoming_events_with_options(events, today, &config.lunar_options());
    debug!(%today, total = events.len(), due = due.len(), "checked upcoming events");
    Ok(due)
}

/// Today and tomorrow, on both calendars.
struct ReminderWindow {
    today: NaiveDate,
    tomorrow: Option<NaiveDate>,
    today_lunar: LunarDate,
    tomorrow_lunar: Option<LunarDate>,
}

impl ReminderWindow {
    fn new(today: NaiveDate, options: &LunarOptions) -> Self {
        let tomorrow = today.succ_opt();
        Self {
            today,
            tomorrow,
            today_lunar: lunar::solar_to_lunar_with_options(today, options),
            tomorrow_lunar: tomorrow.map(|d| lunar::solar_to_lunar_with_options(d, options)),
        }
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> {
        std::iter::once(self.today).chain(self.tomorrow)
    }

    fn is_due(&self, event: &FamilyEvent) -> bool {
        if !event.notify_enabled {
            return false;
        }
        self.solar_match(event) || self.lunar_match(event)
    }

    fn solar_match(&self, event: &FamilyEvent) -> bool {
        let Some(date) = event.solar() else {
            return false;
        };
        match event.repeat {
            Repeat::Yearly => self
                .days()
                .any(|d| d.month() == date.month() && d.day() == date.day()),
            Repeat::Once => self.days().any(|d| d == date),
        }
    }

    fn lunar_match(&self, event: &FamilyEvent) -> bool {
        let (Some(day), Some(month)) = (event.lunar_day, event.lunar_month) else {
            return false;
        };
        self.today_lunar.matches(day, month)
            || self
                .tomorrow_lunar
                .is_some_and(|lunar| lunar.matches(day, month))
    }
}

// ── Categories ──────────────────────────────────────────────────────────────

/// Where an event's solar anniversary falls relative to today, this year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Today,
    /// Within the "soon" window ahead.
    Soon,
    /// Already passed this year.
    Past,
    /// Later this year, beyond the "soon" window.
    Future,
    /// No solar date.
    Undated,
}

/// Categorize an event by its solar month/day projected onto today's year.
///
/// A 29 February anniversary counts as 1 March in common years.
pub fn categorize(event: &FamilyEvent, today: NaiveDate, soon_days: i64) -> EventCategory {
    let Some(date) = event.solar() else {
        return EventCategory::Undated;
    };
    let Some(this_year) = anniversary_in(today.year(), date) else {
        return EventCategory::Undated;
    };
    match (this_year - today).num_days() {
        0 => EventCategory::Today,
        diff if diff < 0 => EventCategory::Past,
        diff if diff <= soon_days => EventCategory::Soon,
        _ => EventCategory::Future,
    }
}

fn anniversary_in(year: i32, date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// An event list split the way the reminder panel shows it.
#[derive(Debug, Default, Serialize)]
pub struct EventGroups<'a> {
    pub today: Vec<&'a FamilyEvent>,
    pub soon: Vec<&'a FamilyEvent>,
    /// Past, later-this-year and undated events.
    pub other: Vec<&'a FamilyEvent>,
}

pub fn partition_by_category(
    events: &[FamilyEvent],
    today: NaiveDate,
    soon_days: i64,
) -> EventGroups<'_> {
    let mut groups = EventGroups::default();
    for ev in events {
        match categorize(ev, today, soon_days) {
            EventCategory::Today => groups.today.push(ev),
            EventCategory::Soon => groups.soon.push(ev),
            _ => groups.other.push(ev),
        }
    }
    groups
}

// ── FamilyEvent helpers ─────────────────────────────────────────────────────

impl FamilyEvent {
    /// Fill the lunar day/month from the solar date, as the event form does
    /// when a solar date is picked. Returns the conversion, or `None` when
    /// there is no valid solar date (lunar fields are then left untouched).
    pub fn fill_lunar_from_solar(&mut self) -> Option<LunarDate> {
        let lunar = lunar::solar_to_lunar(self.solar()?);
        self.lunar_day = Some(lunar.day);
        self.lunar_month = Some(lunar.month);
        Some(lunar)
    }

    /// Traditional name of the event's lunar month, if it has a valid one.
    pub fn lunar_month_name(&self) -> Option<&'static str> {
        self.lunar_month.and_then(lunar::month_name)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Sunday 18 October 2026: lunar 9/9; tomorrow is lunar 10/9.
    fn today() -> NaiveDate {
        ymd(2026, 10, 18)
    }

    fn event(id: &str) -> FamilyEvent {
        FamilyEvent::new(id, "tree-1", format!("event {id}"))
    }

    fn ids<'a>(events: &[&'a FamilyEvent]) -> Vec<&'a str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    // ── Solar matching ──────────────────────────────────────────────────

    #[test]
    fn test_yearly_solar_tomorrow_is_upcoming() {
        let events = vec![event("a").with_solar_date(ymd(1990, 10, 19))];
        assert_eq!(ids(&check_upcoming_events(&events, today())), vec!["a"]);
    }

    #[test]
    fn test_notify_disabled_is_excluded() {
        let events = vec![event("a")
            .with_solar_date(ymd(1990, 10, 19))
            .with_notify(false)];
        assert!(check_upcoming_events(&events, today()).is_empty());
    }

    #[test]
    fn test_yearly_solar_today_is_upcoming() {
        let events = vec![event("a").with_solar_date(ymd(1975, 10, 18))];
        assert_eq!(check_upcoming_events(&events, today()).len(), 1);
    }

    #[test]
    fn test_yearly_solar_other_day_is_not_upcoming() {
        let events = vec![event("a").with_solar_date(ymd(1990, 10, 20))];
        assert!(check_upcoming_events(&events, today()).is_empty());
    }

    #[test]
    fn test_once_requires_exact_date() {
        let events = vec![
            event("past-year")
                .with_solar_date(ymd(2025, 10, 19))
                .with_repeat(Repeat::Once),
            event("tomorrow")
                .with_solar_date(ymd(2026, 10, 19))
                .with_repeat(Repeat::Once),
            event("today")
                .with_solar_date(ymd(2026, 10, 18))
                .with_repeat(Repeat::Once),
        ];
        assert_eq!(
            ids(&check_upcoming_events(&events, today())),
            vec!["tomorrow", "today"]
        );
    }

    #[test]
    fn test_year_end_rollover() {
        let events = vec![event("new-year").with_solar_date(ymd(2000, 1, 1))];
        assert_eq!(check_upcoming_events(&events, ymd(2026, 12, 31)).len(), 1);
    }

    // ── Lunar matching ──────────────────────────────────────────────────

    #[test]
    fn test_lunar_today_and_tomorrow_match() {
        let events = vec![
            event("today").with_lunar(9, 9),
            event("tomorrow").with_lunar(10, 9),
            event("later").with_lunar(11, 9),
        ];
        assert_eq!(
            ids(&check_upcoming_events(&events, today())),
            vec!["today", "tomorrow"]
        );
    }

    #[test]
    fn test_lunar_checked_even_when_solar_misses() {
        let events = vec![event("a")
            .with_solar_date(ymd(1990, 3, 3))
            .with_lunar(10, 9)];
        assert_eq!(check_upcoming_events(&events, today()).len(), 1);
    }

    #[test]
    fn test_partial_lunar_date_never_matches() {
        let mut ev = event("a");
        ev.lunar_day = Some(9);
        let events = vec![ev];
        assert!(check_upcoming_events(&events, today()).is_empty());
    }

    #[test]
    fn test_lunar_tet_from_solar_calendar() {
        // The day before Tết 2025 (28 January) sees mùng 1 tháng Giêng tomorrow.
        let events = vec![event("tet").with_lunar(1, 1)];
        assert!(is_event_upcoming(&events[0], ymd(2025, 1, 28)));
        assert!(is_event_upcoming(&events[0], ymd(2025, 1, 29)));
        assert!(!is_event_upcoming(&events[0], ymd(2025, 1, 30)));
    }

    #[test]
    fn test_order_preserved() {
        let events = vec![
            event("3").with_lunar(9, 9),
            event("1").with_solar_date(ymd(2001, 10, 19)),
            event("skip"),
            event("2").with_lunar(10, 9),
        ];
        assert_eq!(
            ids(&check_upcoming_events(&events, today())),
            vec!["3", "1", "2"]
        );
    }

    #[test]
    fn test_upcoming_at_uses_configured_timezone() {
        // 18:00 UTC on the 17th is already the 18th in Hanoi.
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 18, 0, 0).unwrap();
        let events = vec![event("a").with_solar_date(ymd(1990, 10, 19))];

        let vn = EngineConfig::default();
        assert_eq!(upcoming_events_at(&events, now, &vn).unwrap().len(), 1);

        let utc = EngineConfig::default().with_timezone("UTC");
        assert!(upcoming_events_at(&events, now, &utc).unwrap().is_empty());
    }

    #[test]
    fn test_upcoming_at_invalid_timezone() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 18, 0, 0).unwrap();
        let config = EngineConfig::default().with_timezone("Mars/Olympus");
        let err = upcoming_events_at(&[], now, &config).unwrap_err().to_string();
        assert!(err.contains("Invalid timezone"), "got: {err}");
    }

    // ── Categories ──────────────────────────────────────────────────────

    #[test]
    fn test_categorize() {
        let t = today();
        assert_eq!(
            categorize(&event("a").with_solar_date(ymd(1950, 10, 18)), t, 30),
            EventCategory::Today
        );
        assert_eq!(
            categorize(&event("a").with_solar_date(ymd(1950, 11, 17)), t, 30),
            EventCategory::Soon
        );
        assert_eq!(
            categorize(&event("a").with_solar_date(ymd(1950, 11, 18)), t, 30),
            EventCategory::Future
        );
        assert_eq!(
            categorize(&event("a").with_solar_date(ymd(1950, 1, 1)), t, 30),
            EventCategory::Past
        );
        assert_eq!(categorize(&event("a"), t, 30), EventCategory::Undated);
    }

    #[test]
    fn test_categorize_leap_day_in_common_year() {
        let ev = event("a").with_solar_date(ymd(2000, 2, 29));
        assert_eq!(categorize(&ev, ymd(2027, 3, 1), 30), EventCategory::Today);
    }

    #[test]
    fn test_partition_by_category() {
        let events = vec![
            event("today").with_solar_date(ymd(1950, 10, 18)),
            event("undated").with_lunar(1, 1),
            event("soon").with_solar_date(ymd(1950, 10, 25)),
            event("past").with_solar_date(ymd(1950, 2, 2)),
        ];
        let groups = partition_by_category(&events, today(), 30);
        assert_eq!(ids(&groups.today), vec!["today"]);
        assert_eq!(ids(&groups.soon), vec!["soon"]);
        assert_eq!(ids(&groups.other), vec!["undated", "past"]);
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    #[test]
    fn test_fill_lunar_from_solar() {
        let mut ev = event("a").with_solar_date(ymd(2024, 2, 10));
        let lunar = ev.fill_lunar_from_solar().unwrap();
        assert_eq!((lunar.day, lunar.month), (1, 1));
        assert_eq!(ev.lunar_day, Some(1));
        assert_eq!(ev.lunar_month, Some(1));
        assert_eq!(ev.lunar_month_name(), Some("Giêng"));
    }

    #[test]
    fn test_fill_lunar_without_solar_leaves_fields() {
        let mut ev = event("a").with_lunar(5, 7);
        assert!(ev.fill_lunar_from_solar().is_none());
        assert_eq!((ev.lunar_day, ev.lunar_month), (Some(5), Some(7)));
    }

    #[test]
    fn test_lunar_month_name_out_of_range() {
        assert_eq!(event("a").with_lunar(1, 13).lunar_month_name(), None);
    }
}
