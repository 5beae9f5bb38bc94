use chrono::{Days, NaiveDate};

/// Day-month-year layout several providers expect in their queries.
pub const DAY_MONTH_YEAR: &str = "%d/%m/%Y";

/// Inclusive calendar range walked one day at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every date from `start` through `end`. Empty when `end` precedes `start`.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            dates.push(cursor);
            match cursor.checked_add_days(Days::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        dates
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Renders a date in ISO `YYYY-MM-DD` form.
pub fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a `DD/MM/YYYY` date as sent back by some providers.
pub fn parse_day_month_year(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_MONTH_YEAR).ok()
}
