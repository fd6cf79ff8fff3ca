use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// City used whenever no (or an empty) city name has been stored.
pub const DEFAULT_CITY: &str = "Tampere";

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const RADAR_BASE_URL: &str = "https://openweathermap.org/weathermap";
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// User settings persisted by [`crate::PreferenceStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub city_name: String,
    #[serde(default)]
    pub is_dark_theme: bool,
    #[serde(default)]
    pub fetch_by_location: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            city_name: DEFAULT_CITY.to_string(),
            is_dark_theme: false,
            fetch_by_location: false,
        }
    }
}

impl Preferences {
    pub fn new(city_name: impl Into<String>, is_dark_theme: bool, fetch_by_location: bool) -> Self {
        Self {
            city_name: city_name.into(),
            is_dark_theme,
            fetch_by_location,
        }
    }

    /// Replace an empty city name with [`DEFAULT_CITY`].
    pub fn normalized(mut self) -> Self {
        if self.city_name.is_empty() {
            self.city_name = DEFAULT_CITY.to_string();
        }
        self
    }
}

/// A device position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// `(0.0, 0.0)`: no location fix obtained yet.
    pub const SENTINEL: Coordinates = Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::SENTINEL
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// 5 day / 3 hour forecast as returned by the OpenWeather `/forecast` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// Status code; the provider sends it as a string (`"200"`).
    pub cod: String,
    #[serde(default)]
    pub message: i64,
    #[serde(default)]
    pub cnt: u32,
    pub list: Vec<ForecastEntry>,
    pub city: City,
}

impl ForecastResponse {
    /// The entry closest to now, shown as the main card.
    pub fn current(&self) -> Option<&ForecastEntry> {
        self.list.first()
    }

    /// Radar map centred on the forecast city.
    pub fn radar_url(&self) -> String {
        format!(
            "{RADAR_BASE_URL}?basemap=map&cities=false&layer=radar&lat={}&lon={}&zoom=10",
            self.city.coord.lat, self.city.coord.lon
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub coord: Coord,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub population: i64,
    /// Shift in seconds from UTC.
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl From<Coord> for Coordinates {
    fn from(c: Coord) -> Self {
        Coordinates::new(c.lat, c.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainData,
    pub weather: Vec<WeatherCondition>,
    #[serde(default)]
    pub clouds: Clouds,
    pub wind: Wind,
    #[serde(default)]
    pub visibility: i32,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub sys: Sys,
    pub dt_txt: String,
}

impl ForecastEntry {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }

    /// Primary condition; the provider lists the most significant one first.
    pub fn condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }

    pub fn icon(&self) -> Option<&str> {
        self.condition().map(|w| w.icon.as_str())
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon().map(icon_url)
    }

    /// `"DD.MM"` taken from `dt_txt`, falling back to `dt`.
    pub fn date_label(&self) -> String {
        self.timestamp().format("%d.%m").to_string()
    }

    /// `"HH:MM"` taken from `dt_txt`, falling back to `dt`.
    pub fn time_label(&self) -> String {
        self.timestamp().format("%H:%M").to_string()
    }

    fn timestamp(&self) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&self.dt_txt, DT_TXT_FORMAT)
            .ok()
            .or_else(|| self.observed_at().map(|t| t.naive_utc()))
            .unwrap_or_default()
    }
}

/// Temperatures are in degrees Celsius when requested with `units=metric`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainData {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    #[serde(default)]
    pub sea_level: i32,
    #[serde(default)]
    pub grnd_level: i32,
    pub humidity: i32,
    #[serde(default)]
    pub temp_kf: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: i32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: i32,
    #[serde(default)]
    pub gust: f64,
}

/// Part of day: `"d"` or `"n"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default)]
    pub pod: String,
}

pub fn icon_url(icon: &str) -> String {
    format!("{ICON_BASE_URL}/{icon}@2x.png")
}
