//! B3 Calendar Adapter
//!
//! Implements the `TradingCalendar` port with the BVMF (B3/Bovespa) session
//! rules: weekends, national holidays, Easter-derived closures and the
//! exchange's own year-end and São Paulo municipal closures.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::domain::ports::TradingCalendar;

/// Exchange names accepted for this calendar.
pub const B3_EXCHANGE_NAMES: [&str; 2] = ["BVMF", "XBSP"];

/// Last year the exchange closed for São Paulo municipal holidays
/// (Jan 25 and Jul 9).
const LAST_MUNICIPAL_CLOSURE_YEAR: i32 = 2021;

/// Black Consciousness Day (Nov 20) closed the exchange through this year...
const BLACK_CONSCIOUSNESS_UNTIL: i32 = 2019;
/// ...and again from this year on, as a national holiday.
const BLACK_CONSCIOUSNESS_FROM: i32 = 2024;

/// BVMF trading calendar.
#[derive(Debug, Clone)]
pub struct B3Calendar {
    name: String,
}

impl B3Calendar {
    /// Create the calendar under its canonical name.
    pub fn new() -> Self {
        Self::with_name("BVMF")
    }

    /// Create the calendar under one of its accepted aliases.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Whether `name` identifies this exchange.
    pub fn supports(name: &str) -> bool {
        B3_EXCHANGE_NAMES
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Holidays and exchange closures falling on `date`, ignoring weekends.
    pub fn holiday_name(&self, date: NaiveDate) -> Option<&'static str> {
        let year = date.year();

        let fixed = match (date.month(), date.day()) {
            (1, 1) => Some("New Year's Day"),
            (1, 25) if year <= LAST_MUNICIPAL_CLOSURE_YEAR => Some("São Paulo Anniversary"),
            (4, 21) => Some("Tiradentes"),
            (5, 1) => Some("Labour Day"),
            (7, 9) if year <= LAST_MUNICIPAL_CLOSURE_YEAR => Some("Constitutionalist Revolution"),
            (9, 7) => Some("Independence Day"),
            (10, 12) => Some("Our Lady of Aparecida"),
            (11, 2) => Some("All Souls' Day"),
            (11, 15) => Some("Proclamation of the Republic"),
            (11, 20)
                if year <= BLACK_CONSCIOUSNESS_UNTIL || year >= BLACK_CONSCIOUSNESS_FROM =>
            {
                Some("Black Consciousness Day")
            }
            (12, 24) => Some("Christmas Eve"),
            (12, 25) => Some("Christmas Day"),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        if date == last_weekday_of_year(year) {
            return Some("Last Business Day of the Year");
        }

        let easter = easter_sunday(year)?;
        match (date - easter).num_days() {
            -48 => Some("Carnival Monday"),
            -47 => Some("Carnival Tuesday"),
            -2 => Some("Good Friday"),
            60 => Some("Corpus Christi"),
            _ => None,
        }
    }
}

impl Default for B3Calendar {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingCalendar for B3Calendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_session(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && self.holiday_name(date).is_none()
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn last_weekday_of_year(year: i32) -> NaiveDate {
    let mut day = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
    while is_weekend(day) {
        day -= Duration::days(1);
    }
    day
}

/// Western (Gregorian) Easter Sunday, via the anonymous Gregorian algorithm.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
