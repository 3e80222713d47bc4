use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::normalize::{is_zero_f64, is_zero_i64};

/// A coordinate query, kept as the caller's decimal-degree strings so
/// providers receive exactly the precision that was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub latitude: String,
    pub longitude: String,
}

impl WeatherQuery {
    /// Build a query without validation.
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self { latitude: latitude.into(), longitude: longitude.into() }
    }

    /// Build a query, checking that both coordinates are finite numbers in range.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, QueryError> {
        let latitude = latitude.trim();
        let longitude = longitude.trim();

        check_coordinate("latitude", latitude, 90.0)?;
        check_coordinate("longitude", longitude, 180.0)?;

        Ok(Self::new(latitude, longitude))
    }
}

fn check_coordinate(name: &'static str, raw: &str, limit: f64) -> Result<(), QueryError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| QueryError::NotANumber { name, value: raw.to_string() })?;

    if !value.is_finite() || value.abs() > limit {
        return Err(QueryError::OutOfRange { name, value: raw.to_string(), limit });
    }

    Ok(())
}

/// The canonical report every provider adapter produces.
///
/// Fields a provider does not report stay at their zero value and are
/// omitted from the JSON form. Zero numerics mean "unknown", except `code`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherReport {
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub latitude: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub longitude: f64,
    #[serde(skip_serializing_if = "WeatherDataPoint::is_empty")]
    pub currently: WeatherDataPoint,
    #[serde(skip_serializing_if = "WeatherDataBlock::is_empty")]
    pub daily: WeatherDataBlock,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<WeatherAlert>,
    #[serde(skip_serializing_if = "is_zero_i64")]
    pub api_calls: i64,
    #[serde(skip_serializing_if = "is_zero_i64")]
    pub code: i64,
    /// Build identifier stamped by the entry point. Adapters leave it empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// A reading for a point in time (current conditions) or for a whole day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherDataPoint {
    /// Unix epoch seconds.
    #[serde(skip_serializing_if = "is_zero_i64")]
    pub time: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    /// Inches per hour.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub precip_intensity: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub precip_intensity_max: f64,
    /// 0–1.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub precip_probability: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub precip_type: String,
    /// Inches.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub precip_accumulation: f64,
    /// Degrees Fahrenheit. For daily points this is the day's low.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub temperature: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub temperature_max: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub apparent_temperature: f64,
    /// Miles per hour.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub wind_speed: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub wind_gust: f64,
    /// Degrees.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub wind_bearing: f64,
    /// 0–1.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub cloud_cover: f64,
    /// 0–1.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub humidity: f64,
    /// Hectopascals.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub pressure: f64,
    /// Miles.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub visibility: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub ozone: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub uv_index: f64,
}

impl WeatherDataPoint {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A chronological series of data points, as supplied by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherDataBlock {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<WeatherDataPoint>,
}

impl WeatherDataBlock {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.icon.is_empty() && self.data.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherAlert {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub severity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Issued, Unix epoch seconds.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub time: f64,
    /// Unix epoch seconds.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub expires: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
}
