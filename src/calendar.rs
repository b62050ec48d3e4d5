use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

/// A log day in ISO `yyyy-mm-dd` form. Ordering matches the lexicographic
/// order of the ISO string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogDate(Date);

impl LogDate {
    pub fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub fn date(self) -> Date {
        self.0
    }
}

impl fmt::Display for LogDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for LogDate {
    type Err = ParseDateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.len() != 10 {
            return Err(ParseDateError::new(raw, "expected yyyy-mm-dd"));
        }
        Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
            .map(LogDate)
            .map_err(|err| ParseDateError::new(raw, err.to_string()))
    }
}

impl Serialize for LogDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDateError {
    pub value: String,
    pub message: String,
}

impl ParseDateError {
    fn new(value: &str, message: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseDateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date '{}': {}", self.value, self.message)
    }
}

impl Error for ParseDateError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSelection {
    pub date: LogDate,
    pub today: LogDate,
}

impl fmt::Display for InvalidSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "you cannot select a future date ({} is after {})",
            self.date, self.today
        )
    }
}

impl Error for InvalidSelection {}

/// Today's date in the local timezone, or UTC when the local offset is unknown.
pub fn today_local() -> LogDate {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    LogDate(now.date())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayTab {
    Workout,
    Cardio,
    Meals,
    Water,
    Profile,
}

impl DayTab {
    pub const ALL: [DayTab; 5] = [
        DayTab::Workout,
        DayTab::Cardio,
        DayTab::Meals,
        DayTab::Water,
        DayTab::Profile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DayTab::Workout => "Workout",
            DayTab::Cardio => "Cardio",
            DayTab::Meals => "Meals",
            DayTab::Water => "Water",
            DayTab::Profile => "Profile",
        }
    }
}

/// Fixed `(date, user)` context handed to every tab of a selected day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayContext {
    date: LogDate,
    user_id: String,
}

impl DayContext {
    pub fn date(&self) -> LogDate {
        self.date
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn tabs(&self) -> &'static [DayTab] {
        &DayTab::ALL
    }
}

pub fn select_date(
    date: LogDate,
    today: LogDate,
    user_id: &str,
) -> Result<DayContext, InvalidSelection> {
    if date > today {
        return Err(InvalidSelection { date, today });
    }
    Ok(DayContext {
        date,
        user_id: user_id.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: LogDate,
    pub is_today: bool,
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u8,
    /// Blank cells before the first day in a Sunday-first week grid.
    pub leading_blanks: u8,
    pub days: Vec<DayCell>,
}

pub fn month_view(year: i32, month: Month, today: LogDate) -> Result<MonthView, ParseDateError> {
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|err| ParseDateError::new(&format!("{year}-{:02}", u8::from(month)), err.to_string()))?;
    let length = time::util::days_in_year_month(year, month);
    let mut days = Vec::with_capacity(usize::from(length));
    let mut current = first;
    for _ in 0..length {
        let date = LogDate(current);
        days.push(DayCell {
            date,
            is_today: date == today,
            selectable: date <= today,
        });
        match current.next_day() {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(MonthView {
        year,
        month: u8::from(month),
        leading_blanks: first.weekday().number_days_from_sunday(),
        days,
    })
}

/// Parses `yyyy-mm` into a year and month.
pub fn parse_month(raw: &str) -> Result<(i32, Month), ParseDateError> {
    let trimmed = raw.trim();
    let (year, month) = trimmed
        .split_once('-')
        .ok_or_else(|| ParseDateError::new(raw, "expected yyyy-mm"))?;
    if year.len() != 4 || month.len() != 2 {
        return Err(ParseDateError::new(raw, "expected yyyy-mm"));
    }
    let year = year
        .parse::<i32>()
        .map_err(|_| ParseDateError::new(raw, "year is not a number"))?;
    let month = month
        .parse::<u8>()
        .ok()
        .and_then(|value| Month::try_from(value).ok())
        .ok_or_else(|| ParseDateError::new(raw, "month must be 01-12"))?;
    Ok((year, month))
}
