//! Range selectors and their resolution into concrete instant windows.
//!
//! All arithmetic happens on local wall-clock time (`NaiveDateTime`): day
//! boundaries are the local 00:00:00.000 and 23:59:59.999 of a calendar day.

use chrono::{Datelike, Days, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Calendar dates picked for a `Custom` range. Either side may still be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CustomRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CustomRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    AllTime,
    Today,
    Yesterday,
    Last5Days,
    Last7Days,
    Last15Days,
    Last30Days,
    OneMonth,
    Last3Months,
    ThisMonth,
    LastMonth,
    Custom(CustomRange),
    /// A token this build does not know. Resolves like `AllTime`.
    Unrecognized(String),
}

impl Selector {
    /// Maps a dashboard token to a selector. `custom` is only attached to
    /// the `Custom` token.
    pub fn parse(token: &str, custom: CustomRange) -> Self {
        match token.trim() {
            "AllTime" => Selector::AllTime,
            "Today" => Selector::Today,
            "Yesterday" => Selector::Yesterday,
            "Last5Days" => Selector::Last5Days,
            "Last7Days" => Selector::Last7Days,
            "Last15Days" => Selector::Last15Days,
            "Last30Days" => Selector::Last30Days,
            "OneMonth" => Selector::OneMonth,
            "Last3Months" => Selector::Last3Months,
            "ThisMonth" => Selector::ThisMonth,
            "LastMonth" => Selector::LastMonth,
            "Custom" => Selector::Custom(custom),
            other => Selector::Unrecognized(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Selector::AllTime => "AllTime",
            Selector::Today => "Today",
            Selector::Yesterday => "Yesterday",
            Selector::Last5Days => "Last5Days",
            Selector::Last7Days => "Last7Days",
            Selector::Last15Days => "Last15Days",
            Selector::Last30Days => "Last30Days",
            Selector::OneMonth => "OneMonth",
            Selector::Last3Months => "Last3Months",
            Selector::ThisMonth => "ThisMonth",
            Selector::LastMonth => "LastMonth",
            Selector::Custom(_) => "Custom",
            Selector::Unrecognized(token) => token,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Outcome of resolving a selector against a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRange {
    PassThrough,
    Bounded {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl ResolvedRange {
    /// `None` timestamps (missing or unparseable dates) only pass a
    /// pass-through range.
    pub fn contains(&self, timestamp: Option<NaiveDateTime>) -> bool {
        match self {
            ResolvedRange::PassThrough => true,
            ResolvedRange::Bounded { start, end } => {
                timestamp.is_some_and(|ts| *start <= ts && ts <= *end)
            }
        }
    }

    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match self {
            ResolvedRange::PassThrough => None,
            ResolvedRange::Bounded { start, end } => Some((*start, *end)),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, ResolvedRange::PassThrough)
    }
}

/// Source of the reference "now" used for relative ranges.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::milliseconds(86_399_999)
}

/// Moves `date` back by `months`, keeping the day of month. Days past the end
/// of a shorter target month spill into the month after it (Mar 31 minus one
/// month is Mar 3 in a non-leap year). `None` when the result leaves the
/// representable calendar.
pub fn months_back(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 - months as i32;
    let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);

    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_days(Days::new(u64::from(date.day0())))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn whole_days(first: NaiveDate, last: NaiveDate) -> ResolvedRange {
    ResolvedRange::Bounded {
        start: start_of_day(first),
        end: end_of_day(last),
    }
}

/// Window for a relative selector, `None` when it would step outside the
/// calendar chrono can represent.
fn bounded(selector: &Selector, now: NaiveDateTime) -> Option<ResolvedRange> {
    let today = now.date();
    let trailing_days =
        |days: u64| Some(whole_days(today.checked_sub_days(Days::new(days))?, today));
    let trailing_months = |months: u32| Some(whole_days(months_back(today, months)?, today));

    match selector {
        Selector::Today => Some(whole_days(today, today)),
        Selector::Yesterday => {
            let yesterday = today.checked_sub_days(Days::new(1))?;
            Some(whole_days(yesterday, yesterday))
        }
        Selector::Last5Days => trailing_days(5),
        Selector::Last7Days => trailing_days(7),
        Selector::Last15Days => trailing_days(15),
        Selector::Last30Days => trailing_days(30),
        Selector::OneMonth => trailing_months(1),
        Selector::Last3Months => trailing_months(3),
        Selector::ThisMonth => Some(ResolvedRange::Bounded {
            start: start_of_day(first_of_month(today)),
            end: now,
        }),
        Selector::LastMonth => {
            let last_day = first_of_month(today).checked_sub_days(Days::new(1))?;
            Some(whole_days(first_of_month(last_day), last_day))
        }
        Selector::Custom(CustomRange {
            start: Some(start),
            end: Some(end),
        }) => Some(whole_days(*start.min(end), *start.max(end))),
        Selector::AllTime | Selector::Custom(_) | Selector::Unrecognized(_) => {
            Some(ResolvedRange::PassThrough)
        }
    }
}

/// Resolves `selector` into a window around `now`. Never emits `start > end`.
pub fn resolve(selector: &Selector, now: NaiveDateTime) -> ResolvedRange {
    if let Selector::Unrecognized(token) = selector {
        warn!(
            action = "resolve",
            component = "range_selector",
            token = token.as_str(),
            "Unknown range selector, including every record"
        );
    }

    bounded(selector, now).unwrap_or_else(|| {
        warn!(
            action = "resolve",
            component = "range_selector",
            selector = selector.token(),
            now = %now,
            "Range falls outside the supported calendar, including every record"
        );
        ResolvedRange::PassThrough
    })
}

/// Resolves against the clock's current instant.
pub fn resolve_with(selector: &Selector, clock: &impl Clock) -> ResolvedRange {
    resolve(selector, clock.now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, ms: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_milli_opt(h, min, s, ms).unwrap()
    }

    const ALL: [Selector; 11] = [
        Selector::AllTime,
        Selector::Today,
        Selector::Yesterday,
        Selector::Last5Days,
        Selector::Last7Days,
        Selector::Last15Days,
        Selector::Last30Days,
        Selector::OneMonth,
        Selector::Last3Months,
        Selector::ThisMonth,
        Selector::LastMonth,
    ];

    #[test]
    fn today_spans_the_whole_day() {
        let now = at(2024, 6, 15, 9, 30, 0, 0);
        assert_eq!(
            resolve(&Selector::Today, now),
            ResolvedRange::Bounded {
                start: at(2024, 6, 15, 0, 0, 0, 0),
                end: at(2024, 6, 15, 23, 59, 59, 999),
            }
        );
    }

    #[test]
    fn last_five_days_covers_six_calendar_days() {
        let now = at(2024, 6, 15, 12, 0, 0, 0);
        let (start, end) = resolve(&Selector::Last5Days, now).bounds().unwrap();
        assert_eq!(start, at(2024, 6, 10, 0, 0, 0, 0));
        assert_eq!(end, at(2024, 6, 15, 23, 59, 59, 999));
        assert_eq!((end.date() - start.date()).num_days() + 1, 6);
    }

    #[test]
    fn trailing_day_ranges_start_n_days_back() {
        let now = at(2024, 6, 15, 12, 0, 0, 0);
        let cases = [
            (Selector::Last7Days, at(2024, 6, 8, 0, 0, 0, 0)),
            (Selector::Last15Days, at(2024, 5, 31, 0, 0, 0, 0)),
            (Selector::Last30Days, at(2024, 5, 16, 0, 0, 0, 0)),
        ];
        for (selector, expected) in cases {
            let (start, end) = resolve(&selector, now).bounds().unwrap();
            assert_eq!(start, expected, "{}", selector);
            assert_eq!(end, at(2024, 6, 15, 23, 59, 59, 999), "{}", selector);
        }
    }

    #[test]
    fn last_three_months_holds_day_of_month() {
        let now = at(2024, 6, 15, 12, 0, 0, 0);
        let (start, end) = resolve(&Selector::Last3Months, now).bounds().unwrap();
        assert_eq!(start, at(2024, 3, 15, 0, 0, 0, 0));
        assert_eq!(end, at(2024, 6, 15, 23, 59, 59, 999));

        let now = at(2023, 5, 31, 12, 0, 0, 0);
        let (start, _) = resolve(&Selector::Last3Months, now).bounds().unwrap();
        assert_eq!(start, at(2023, 3, 3, 0, 0, 0, 0));
    }

    #[test]
    fn calendar_edges_fall_back_to_pass_through() {
        let earliest = NaiveDate::MIN.and_time(NaiveTime::MIN);
        for selector in [
            Selector::Yesterday,
            Selector::Last5Days,
            Selector::Last30Days,
            Selector::OneMonth,
            Selector::Last3Months,
            Selector::LastMonth,
        ] {
            assert!(resolve(&selector, earliest).is_pass_through(), "{}", selector);
        }
        assert_eq!(
            resolve(&Selector::Today, earliest).bounds(),
            Some((earliest, end_of_day(NaiveDate::MIN)))
        );
        assert_eq!(
            resolve(&Selector::ThisMonth, earliest).bounds(),
            Some((earliest, earliest))
        );

        let latest = NaiveDate::MAX.and_hms_opt(23, 0, 0).unwrap();
        for selector in ALL.iter() {
            if let Some((start, end)) = resolve(selector, latest).bounds() {
                assert!(start <= end, "{} inverted at {}", selector, latest);
            }
        }
    }

    #[test]
    fn one_month_holds_day_of_month() {
        let now = at(2024, 6, 15, 12, 0, 0, 0);
        let (start, _) = resolve(&Selector::OneMonth, now).bounds().unwrap();
        assert_eq!(start, at(2024, 5, 15, 0, 0, 0, 0));
    }

    #[test]
    fn month_arithmetic_overflows_forward() {
        assert_eq!(months_back(date(2023, 3, 31), 1), Some(date(2023, 3, 3)));
        assert_eq!(months_back(date(2024, 3, 31), 1), Some(date(2024, 3, 2)));
        assert_eq!(months_back(date(2024, 1, 15), 1), Some(date(2023, 12, 15)));
        assert_eq!(months_back(date(2024, 2, 10), 3), Some(date(2023, 11, 10)));
        assert_eq!(months_back(NaiveDate::MIN, 1), None);
    }

    #[test]
    fn yesterday_is_previous_calendar_day() {
        let now = at(2024, 3, 1, 0, 0, 1, 0);
        let (start, end) = resolve(&Selector::Yesterday, now).bounds().unwrap();
        assert_eq!(start, at(2024, 2, 29, 0, 0, 0, 0));
        assert_eq!(end, at(2024, 2, 29, 23, 59, 59, 999));
    }

    #[test]
    fn this_month_ends_at_now() {
        let now = at(2024, 6, 15, 8, 45, 0, 0);
        let (start, end) = resolve(&Selector::ThisMonth, now).bounds().unwrap();
        assert_eq!(start, at(2024, 6, 1, 0, 0, 0, 0));
        assert_eq!(end, now);
    }

    #[test]
    fn last_month_crosses_year_boundary() {
        let now = at(2024, 1, 10, 12, 0, 0, 0);
        let (start, end) = resolve(&Selector::LastMonth, now).bounds().unwrap();
        assert_eq!(start, at(2023, 12, 1, 0, 0, 0, 0));
        assert_eq!(end, at(2023, 12, 31, 23, 59, 59, 999));
    }

    #[test]
    fn custom_needs_both_bounds() {
        let now = at(2024, 6, 15, 12, 0, 0, 0);
        let half = Selector::Custom(CustomRange::new(Some(date(2024, 3, 1)), None));
        assert!(resolve(&half, now).is_pass_through());
        assert!(resolve(&Selector::Custom(CustomRange::default()), now).is_pass_through());
    }

    #[test]
    fn inverted_custom_bounds_are_swapped() {
        let now = at(2024, 6, 15, 12, 0, 0, 0);
        let selector = Selector::Custom(CustomRange::new(
            Some(date(2024, 3, 10)),
            Some(date(2024, 3, 1)),
        ));
        let (start, end) = resolve(&selector, now).bounds().unwrap();
        assert_eq!(start, at(2024, 3, 1, 0, 0, 0, 0));
        assert_eq!(end, at(2024, 3, 10, 23, 59, 59, 999));
    }

    #[test]
    fn every_bounded_selector_is_ordered() {
        let instants = [
            at(2024, 1, 1, 0, 0, 0, 0),
            at(2024, 3, 31, 23, 59, 59, 999),
            at(2023, 12, 31, 12, 0, 0, 0),
            at(2024, 2, 29, 6, 0, 0, 0),
        ];
        for now in instants {
            for selector in ALL.iter() {
                if let Some((start, end)) = resolve(selector, now).bounds() {
                    assert!(start <= end, "{} inverted at {}", selector, now);
                }
            }
        }
    }

    #[test]
    fn unknown_tokens_resolve_to_pass_through() {
        let selector = Selector::parse("Bogus", CustomRange::default());
        assert_eq!(selector, Selector::Unrecognized("Bogus".to_string()));
        assert!(resolve(&selector, at(2024, 6, 15, 0, 0, 0, 0)).is_pass_through());
    }

    #[test]
    fn tokens_round_trip_through_parse() {
        for selector in ALL.iter() {
            assert_eq!(&Selector::parse(selector.token(), CustomRange::default()), selector);
        }
    }

    #[test]
    fn fixed_clock_drives_resolution() {
        let clock = FixedClock(at(2024, 6, 15, 10, 0, 0, 0));
        assert_eq!(
            resolve_with(&Selector::Today, &clock),
            resolve(&Selector::Today, clock.0)
        );
    }
}
