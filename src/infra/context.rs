//! Calendar and weather providers.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::application::context::{DateContext, WeatherContext};
use crate::application::ports::{CalendarProvider, ContextError, WeatherProvider};
use crate::infra::error::InfraError;
use crate::infra::http_client;
use crate::util::timezone::now_in;

/// Fixed-date observances, keyed by (month, day).
const FESTIVALS: &[((u32, u32), &str)] = &[
    ((1, 1), "New Year's Day"),
    ((2, 14), "Valentine's Day"),
    ((3, 8), "International Women's Day"),
    ((3, 14), "Pi Day"),
    ((4, 1), "April Fools' Day"),
    ((4, 22), "Earth Day"),
    ((5, 1), "Labour Day"),
    ((6, 1), "Children's Day"),
    ((9, 10), "Teachers' Day"),
    ((10, 31), "Halloween"),
    ((12, 24), "Christmas Eve"),
    ((12, 25), "Christmas Day"),
    ((12, 31), "New Year's Eve"),
];

const DAILY_WORDS: &[&str] = &[
    "Still water runs deep.",
    "Slow is smooth, smooth is fast.",
    "The obstacle is the way.",
    "Less, but better.",
    "Begin anywhere.",
    "This too shall pass.",
    "Measure twice, cut once.",
    "Fortune favours the prepared mind.",
    "Well begun is half done.",
    "Know thyself.",
    "Festina lente.",
    "Nothing in excess.",
];

/// Date context from the system clock in a configured zone, with an optional
/// upcoming-holiday lookup.
pub struct SystemCalendar {
    timezone: Tz,
    holidays: Option<HolidayLookup>,
}

struct HolidayLookup {
    client: Client,
    url: Url,
}

/// `{"code": 200, "data": {"date": "2025-10-01", "name": "National Day", "days": 7}}`
#[derive(Debug, Deserialize)]
struct HolidayEnvelope {
    code: i64,
    data: Option<HolidayData>,
}

#[derive(Debug, Deserialize)]
struct HolidayData {
    #[serde(default)]
    date: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UpcomingHoliday {
    name: String,
    days_until: u32,
}

impl SystemCalendar {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            holidays: None,
        }
    }

    pub fn with_holidays(mut self, url: Url, timeout: Duration) -> Result<Self, InfraError> {
        self.holidays = Some(HolidayLookup {
            client: http_client(timeout)?,
            url,
        });
        Ok(self)
    }

    /// Calendar fields for `now` without any network lookups.
    fn local_context(now: DateTime<Tz>) -> DateContext {
        let mut context = DateContext::bare(now);
        context.festival = festival(context.month, context.day)
            .unwrap_or_default()
            .to_string();
        let index = context.day_of_year as usize % DAILY_WORDS.len();
        context.daily_word = DAILY_WORDS[index].to_string();
        context
    }

    async fn upcoming_holiday(&self, today: NaiveDate) -> Option<UpcomingHoliday> {
        let lookup = self.holidays.as_ref()?;
        match fetch_holiday(lookup, today).await {
            Ok(holiday) => holiday,
            Err(error) => {
                debug!(
                    target = "inkcast::context",
                    error = %error,
                    "holiday lookup failed"
                );
                None
            }
        }
    }
}

async fn fetch_holiday(
    lookup: &HolidayLookup,
    today: NaiveDate,
) -> Result<Option<UpcomingHoliday>, ContextError> {
    let envelope: HolidayEnvelope = lookup
        .client
        .get(lookup.url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| ContextError::Request(err.to_string()))?
        .json()
        .await
        .map_err(|err| ContextError::Malformed(err.to_string()))?;

    if envelope.code != 200 {
        return Ok(None);
    }
    let Some(data) = envelope.data else {
        return Ok(None);
    };
    if data.date.is_empty() {
        return Ok(None);
    }

    let date = NaiveDate::parse_from_str(&data.date, "%Y-%m-%d")
        .map_err(|err| ContextError::Malformed(format!("holiday date `{}`: {err}", data.date)))?;
    let days_until = (date - today).num_days().max(0);
    Ok(Some(UpcomingHoliday {
        name: data.name,
        days_until: u32::try_from(days_until).unwrap_or(u32::MAX),
    }))
}

fn festival(month: u32, day: u32) -> Option<&'static str> {
    FESTIVALS
        .iter()
        .find(|(date, _)| *date == (month, day))
        .map(|(_, name)| *name)
}

#[async_trait]
impl CalendarProvider for SystemCalendar {
    async fn date_context(&self) -> Result<DateContext, ContextError> {
        let now = now_in(self.timezone);
        let mut context = Self::local_context(now);
        if let Some(holiday) = self.upcoming_holiday(now.date_naive()).await {
            context.upcoming_holiday = holiday.name;
            context.days_until_holiday = holiday.days_until;
        }
        Ok(context)
    }
}

/// Known city coordinates (latitude, longitude).
const CITY_COORDINATES: &[(&str, (f64, f64))] = &[
    ("Beijing", (39.90, 116.40)),
    ("Shanghai", (31.23, 121.47)),
    ("Shenzhen", (22.54, 114.06)),
    ("Hangzhou", (30.27, 120.15)),
    ("Hong Kong", (22.32, 114.17)),
    ("Tokyo", (35.68, 139.69)),
    ("Singapore", (1.35, 103.82)),
    ("London", (51.51, -0.13)),
    ("Paris", (48.86, 2.35)),
    ("Berlin", (52.52, 13.40)),
    ("Lisbon", (38.72, -9.14)),
    ("New York", (40.71, -74.01)),
    ("San Francisco", (37.77, -122.42)),
    ("Sydney", (-33.87, 151.21)),
];

const DEFAULT_COORDINATES: (f64, f64) = (39.90, 116.40);

/// Exact (case-insensitive) match first, then substring containment either way.
fn resolve_city(city: Option<&str>) -> (f64, f64) {
    let Some(city) = city.map(str::trim).filter(|city| !city.is_empty()) else {
        return DEFAULT_COORDINATES;
    };
    let wanted = city.to_lowercase();

    CITY_COORDINATES
        .iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .or_else(|| {
            CITY_COORDINATES.iter().find(|(name, _)| {
                let name = name.to_lowercase();
                name.contains(&wanted) || wanted.contains(&name)
            })
        })
        .map(|(_, coordinates)| *coordinates)
        .unwrap_or(DEFAULT_COORDINATES)
}

/// Current conditions from an Open-Meteo compatible forecast endpoint.
pub struct OpenMeteoWeather {
    client: Client,
    url: Url,
    default_city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    weather_code: i32,
}

impl OpenMeteoWeather {
    pub fn new(
        url: Url,
        timeout: Duration,
        default_city: Option<String>,
    ) -> Result<Self, InfraError> {
        Ok(Self {
            client: http_client(timeout)?,
            url,
            default_city,
        })
    }

    fn forecast_url(&self, city: Option<&str>) -> Url {
        let (latitude, longitude) = resolve_city(city.or(self.default_city.as_deref()));
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("current", "temperature_2m,weather_code")
            .append_pair("timezone", "auto");
        url
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    async fn weather(&self, city: Option<&str>) -> Result<WeatherContext, ContextError> {
        let forecast: ForecastResponse = self
            .client
            .get(self.forecast_url(city))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ContextError::Request(err.to_string()))?
            .json()
            .await
            .map_err(|err| ContextError::Malformed(err.to_string()))?;

        let temperature = forecast.current.temperature_2m.round() as i32;
        Ok(WeatherContext::new(temperature, forecast.current.weather_code))
    }
}
