use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    QueryContext,
    error::ProviderError,
    model::{WeatherAlert, WeatherDataBlock, WeatherDataPoint, WeatherQuery, WeatherReport},
    normalize::{percent_to_fraction, rfc3339_to_epoch},
    provider::{missing_key, read_success_body, send_error, with_cancellation},
};

use super::{ProviderId, WeatherProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

/// Days of forecast requested; the free plan caps this at 3.
const FORECAST_DAYS: &str = "3";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_forecast(
        &self,
        api_key: &str,
        query: &WeatherQuery,
    ) -> Result<WeatherReport, ProviderError> {
        let url = format!("{}/v1/forecast.json", self.base_url.trim_end_matches('/'));
        let location = format!("{},{}", query.latitude, query.longitude);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", api_key),
                ("q", location.as_str()),
                ("days", FORECAST_DAYS),
                ("alerts", "yes"),
                ("aqi", "no"),
            ])
            .send()
            .await
            .map_err(|e| send_error(ProviderId::WeatherApi, e))?;

        let body = read_success_body(ProviderId::WeatherApi, res).await?;

        let parsed: WaForecastResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::Decode(format!("Failed to parse WeatherAPI forecast JSON: {e}"))
        })?;

        Ok(parsed.into_report())
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn get_report(
        &self,
        ctx: &QueryContext,
        query: &WeatherQuery,
    ) -> Result<WeatherReport, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| missing_key(ProviderId::WeatherApi))?;

        with_cancellation(ctx, self.fetch_forecast(api_key, query)).await
    }
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    #[serde(default)]
    forecast: WaForecast,
    #[serde(default)]
    alerts: WaAlerts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaLocation {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCurrent {
    last_updated_epoch: i64,
    temp_f: f64,
    feelslike_f: f64,
    pressure_mb: f64,
    humidity: f64,
    cloud: f64,
    uv: f64,
    vis_miles: f64,
    wind_mph: f64,
    gust_mph: f64,
    wind_degree: f64,
    precip_in: f64,
    condition: WaCondition,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaForecastDay {
    date_epoch: i64,
    day: WaDay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaDay {
    maxtemp_f: f64,
    mintemp_f: f64,
    maxwind_mph: f64,
    totalprecip_in: f64,
    avgvis_miles: f64,
    avghumidity: f64,
    daily_chance_of_rain: f64,
    daily_chance_of_snow: f64,
    uv: f64,
    condition: WaCondition,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaAlerts {
    alert: Vec<WaAlert>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaAlert {
    headline: String,
    severity: String,
    areas: String,
    event: String,
    desc: String,
    effective: String,
    expires: String,
}

impl WaForecastResponse {
    fn into_report(self) -> WeatherReport {
        WeatherReport {
            latitude: self.location.lat,
            longitude: self.location.lon,
            currently: self.current.into_point(),
            daily: WeatherDataBlock {
                data: self.forecast.forecastday.into_iter().map(WaForecastDay::into_point).collect(),
                ..Default::default()
            },
            alerts: self.alerts.alert.into_iter().map(WaAlert::into_alert).collect(),
            ..Default::default()
        }
    }
}

impl WaCurrent {
    fn into_point(self) -> WeatherDataPoint {
        WeatherDataPoint {
            time: self.last_updated_epoch,
            summary: self.condition.text,
            icon: icon_url(&self.condition.icon),
            precip_intensity: self.precip_in,
            temperature: self.temp_f,
            apparent_temperature: self.feelslike_f,
            wind_speed: self.wind_mph,
            wind_gust: self.gust_mph,
            wind_bearing: self.wind_degree,
            cloud_cover: percent_to_fraction(self.cloud),
            humidity: percent_to_fraction(self.humidity),
            pressure: self.pressure_mb,
            visibility: self.vis_miles,
            uv_index: self.uv,
            ..Default::default()
        }
    }
}

impl WaForecastDay {
    fn into_point(self) -> WeatherDataPoint {
        let day = self.day;
        let rain = day.daily_chance_of_rain;
        let snow = day.daily_chance_of_snow;

        let precip_type = if snow > 0.0 && snow >= rain {
            "snow"
        } else if rain > 0.0 {
            "rain"
        } else {
            ""
        };

        WeatherDataPoint {
            time: self.date_epoch,
            summary: day.condition.text,
            icon: icon_url(&day.condition.icon),
            precip_probability: percent_to_fraction(rain.max(snow)),
            precip_type: precip_type.to_string(),
            precip_accumulation: day.totalprecip_in,
            temperature: day.mintemp_f,
            temperature_max: day.maxtemp_f,
            wind_speed: day.maxwind_mph,
            humidity: percent_to_fraction(day.avghumidity),
            visibility: day.avgvis_miles,
            uv_index: day.uv,
            ..Default::default()
        }
    }
}

impl WaAlert {
    fn into_alert(self) -> WeatherAlert {
        let title = if self.headline.is_empty() { self.event } else { self.headline };

        WeatherAlert {
            title,
            regions: self
                .areas
                .split(';')
                .map(str::trim)
                .filter(|area| !area.is_empty())
                .map(str::to_owned)
                .collect(),
            severity: self.severity,
            description: self.desc,
            time: rfc3339_to_epoch(&self.effective),
            expires: rfc3339_to_epoch(&self.expires),
            uri: String::new(),
        }
    }
}

/// WeatherAPI returns protocol-relative icon URLs.
fn icon_url(raw: &str) -> String {
    if raw.starts_with("//") { format!("https:{raw}") } else { raw.to_string() }
}
