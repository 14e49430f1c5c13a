//! Date and weather context shared by every persona generated for one poll or batch.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::application::ports::{CalendarProvider, WeatherProvider};
use crate::util::timezone::now_in;

/// Weather code reported when no forecast is available.
pub const UNKNOWN_WEATHER_CODE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateContext {
    /// Short display date, e.g. `Oct 16 Fri`.
    pub date_str: String,
    pub time_str: String,
    pub weekday: String,
    pub hour: u32,
    pub is_weekend: bool,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_year: u32,
    pub days_in_year: u32,
    /// Named observance falling on this date; empty when none.
    pub festival: String,
    pub daily_word: String,
    pub upcoming_holiday: String,
    pub days_until_holiday: u32,
}

impl DateContext {
    /// Calendar fields derived from the clock alone; festival and holiday fields are empty.
    pub fn bare(now: DateTime<Tz>) -> Self {
        let days_in_year = if now.date_naive().leap_year() { 366 } else { 365 };
        Self {
            date_str: now.format("%b %-d %a").to_string(),
            time_str: now.format("%H:%M:%S").to_string(),
            weekday: now.format("%A").to_string(),
            hour: now.hour(),
            is_weekend: now.weekday().number_from_monday() >= 6,
            year: now.year(),
            month: now.month(),
            day: now.day(),
            day_of_year: now.ordinal(),
            days_in_year,
            festival: String::new(),
            daily_word: String::new(),
            upcoming_holiday: String::new(),
            days_until_holiday: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherContext {
    pub temperature_c: Option<i32>,
    pub weather_code: i32,
    /// Display form, e.g. `14°C`.
    pub weather_str: String,
}

impl WeatherContext {
    pub fn new(temperature_c: i32, weather_code: i32) -> Self {
        Self {
            temperature_c: Some(temperature_c),
            weather_code,
            weather_str: format!("{temperature_c}°C"),
        }
    }

    pub fn unknown() -> Self {
        Self {
            temperature_c: None,
            weather_code: UNKNOWN_WEATHER_CODE,
            weather_str: "--°C".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedContext {
    pub date: DateContext,
    pub weather: WeatherContext,
}

/// Fetches calendar and weather concurrently, substituting placeholders for whichever fails.
pub struct ContextGatherer {
    calendar: Arc<dyn CalendarProvider>,
    weather: Arc<dyn WeatherProvider>,
    timezone: Tz,
}

impl ContextGatherer {
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        weather: Arc<dyn WeatherProvider>,
        timezone: Tz,
    ) -> Self {
        Self {
            calendar,
            weather,
            timezone,
        }
    }

    pub async fn gather(&self, city: Option<&str>) -> SharedContext {
        let (date, weather) =
            tokio::join!(self.calendar.date_context(), self.weather.weather(city));

        let date = date.unwrap_or_else(|error| {
            warn!(
                target = "inkcast::context",
                error = %error,
                "calendar unavailable; using bare date"
            );
            DateContext::bare(now_in(self.timezone))
        });
        let weather = weather.unwrap_or_else(|error| {
            warn!(
                target = "inkcast::context",
                city = city.unwrap_or(""),
                error = %error,
                "weather unavailable; using placeholder"
            );
            WeatherContext::unknown()
        });

        SharedContext { date, weather }
    }
}
