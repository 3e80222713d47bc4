use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    QueryContext,
    error::ProviderError,
    model::{WeatherAlert, WeatherDataBlock, WeatherDataPoint, WeatherQuery, WeatherReport},
    normalize::{fraction, meters_to_miles, mm_to_inches, percent_to_fraction, text},
    provider::{missing_key, read_success_body, send_error, with_cancellation},
};

use super::{ProviderId, WeatherProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_one_call(
        &self,
        api_key: &str,
        query: &WeatherQuery,
    ) -> Result<WeatherReport, ProviderError> {
        let url = format!("{}/data/2.5/onecall", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", query.latitude.as_str()),
                ("lon", query.longitude.as_str()),
                ("exclude", "minutely,hourly"),
                ("units", "imperial"),
                ("appid", api_key),
            ])
            .send()
            .await
            .map_err(|e| send_error(ProviderId::OpenWeather, e))?;

        let body = read_success_body(ProviderId::OpenWeather, res).await?;

        let parsed: OwOneCallResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::Decode(format!("Failed to parse OpenWeather One Call JSON: {e}"))
        })?;

        Ok(parsed.into_report())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
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
            .ok_or_else(|| missing_key(ProviderId::OpenWeather))?;

        with_cancellation(ctx, self.fetch_one_call(api_key, query)).await
    }
}

// One Call response, requested with `units=imperial`: temperatures in °F and
// wind in mph. Pressure is hPa, visibility metres and precipitation mm
// regardless of units.

#[derive(Debug, Deserialize)]
struct OwOneCallResponse {
    lat: f64,
    lon: f64,
    current: OwCurrent,
    #[serde(default)]
    daily: Vec<OwDaily>,
    #[serde(default)]
    alerts: Vec<OwAlert>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCondition {
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwLastHour {
    #[serde(rename = "1h")]
    one_hour: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCurrent {
    dt: i64,
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: f64,
    uvi: f64,
    clouds: f64,
    visibility: f64,
    wind_speed: f64,
    wind_gust: f64,
    wind_deg: f64,
    // Last-hour totals. Mapped to `precip_intensity` (in/h); `precip_accumulation`
    // is reserved for the daily totals.
    rain: Option<OwLastHour>,
    snow: Option<OwLastHour>,
    weather: Vec<OwCondition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwDailyTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwDailyFeelsLike {
    day: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwDaily {
    dt: i64,
    temp: OwDailyTemp,
    feels_like: OwDailyFeelsLike,
    pressure: f64,
    humidity: f64,
    wind_speed: f64,
    wind_deg: f64,
    wind_gust: f64,
    weather: Vec<OwCondition>,
    clouds: f64,
    pop: f64,
    rain: f64,
    snow: f64,
    uvi: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwAlert {
    sender_name: String,
    event: String,
    start: f64,
    end: f64,
    description: String,
    tags: Vec<String>,
}

impl OwOneCallResponse {
    fn into_report(self) -> WeatherReport {
        WeatherReport {
            latitude: self.lat,
            longitude: self.lon,
            currently: self.current.into_point(),
            daily: WeatherDataBlock {
                data: self.daily.into_iter().map(OwDaily::into_point).collect(),
                ..Default::default()
            },
            alerts: self.alerts.into_iter().map(OwAlert::into_alert).collect(),
            ..Default::default()
        }
    }
}

impl OwCurrent {
    fn into_point(self) -> WeatherDataPoint {
        let (summary, icon) = first_condition(&self.weather);
        let rain = self.rain.map_or(0.0, |r| r.one_hour);
        let snow = self.snow.map_or(0.0, |s| s.one_hour);

        WeatherDataPoint {
            time: self.dt,
            summary,
            icon,
            precip_intensity: mm_to_inches(rain + snow),
            precip_type: precip_type(rain, snow),
            temperature: self.temp,
            apparent_temperature: self.feels_like,
            wind_speed: self.wind_speed,
            wind_gust: self.wind_gust,
            wind_bearing: self.wind_deg,
            cloud_cover: percent_to_fraction(self.clouds),
            humidity: percent_to_fraction(self.humidity),
            pressure: self.pressure,
            visibility: meters_to_miles(self.visibility),
            uv_index: self.uvi,
            ..Default::default()
        }
    }
}

impl OwDaily {
    fn into_point(self) -> WeatherDataPoint {
        let (summary, icon) = first_condition(&self.weather);

        WeatherDataPoint {
            time: self.dt,
            summary,
            icon,
            precip_probability: fraction(self.pop),
            precip_type: precip_type(self.rain, self.snow),
            precip_accumulation: mm_to_inches(self.rain + self.snow),
            temperature: self.temp.min,
            temperature_max: self.temp.max,
            apparent_temperature: self.feels_like.day,
            wind_speed: self.wind_speed,
            wind_gust: self.wind_gust,
            wind_bearing: self.wind_deg,
            cloud_cover: percent_to_fraction(self.clouds),
            humidity: percent_to_fraction(self.humidity),
            pressure: self.pressure,
            uv_index: self.uvi,
            ..Default::default()
        }
    }
}

impl OwAlert {
    fn into_alert(self) -> WeatherAlert {
        let regions = if self.sender_name.is_empty() { Vec::new() } else { vec![self.sender_name] };

        WeatherAlert {
            title: self.event,
            regions,
            severity: text(self.tags.first().map(String::as_str)),
            description: self.description,
            time: self.start,
            expires: self.end,
            uri: String::new(),
        }
    }
}

fn first_condition(weather: &[OwCondition]) -> (String, String) {
    weather
        .first()
        .map(|w| (w.description.clone(), w.icon.clone()))
        .unwrap_or_default()
}

fn precip_type(rain: f64, snow: f64) -> String {
    if snow > 0.0 {
        "snow".to_string()
    } else if rain > 0.0 {
        "rain".to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "lat": 34.0164,
        "lon": -83.9069,
        "timezone": "America/New_York",
        "timezone_offset": -14400,
        "current": {
            "dt": 1717243200,
            "sunrise": 1717236000,
            "sunset": 1717287000,
            "temp": 72.0,
            "feels_like": 73.4,
            "pressure": 1015,
            "humidity": 45,
            "dew_point": 55.1,
            "uvi": 6.1,
            "clouds": 20,
            "visibility": 10000,
            "wind_speed": 5.75,
            "wind_deg": 230,
            "rain": { "1h": 2.54 },
            "weather": [
                { "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }
            ]
        },
        "daily": [
            {
                "dt": 1717261200,
                "temp": { "day": 80.1, "min": 63.2, "max": 84.7, "night": 66.0, "eve": 79.0, "morn": 64.0 },
                "feels_like": { "day": 81.0, "night": 66.0, "eve": 79.0, "morn": 64.0 },
                "pressure": 1014,
                "humidity": 60,
                "dew_point": 60.0,
                "wind_speed": 8.1,
                "wind_deg": 200,
                "wind_gust": 15.2,
                "weather": [
                    { "id": 501, "main": "Rain", "description": "moderate rain", "icon": "10d" }
                ],
                "clouds": 75,
                "pop": 0.87,
                "rain": 12.7,
                "uvi": 8.2
            },
            {
                "dt": 1717347600,
                "temp": { "day": 82.0, "min": 65.0, "max": 86.0 },
                "feels_like": { "day": 83.0 },
                "pressure": 1012,
                "humidity": 50,
                "wind_speed": 6.0,
                "wind_deg": 180,
                "weather": [],
                "clouds": 10,
                "pop": 0,
                "uvi": 9.0
            }
        ],
        "alerts": [
            {
                "sender_name": "NWS Peachtree City (Northern and Central Georgia)",
                "event": "Heat Advisory",
                "start": 1717250000,
                "end": 1717290000,
                "description": "Heat index values up to 105 expected.",
                "tags": ["Extreme temperature value"]
            }
        ]
    }"#;

    fn normalize(body: &str) -> WeatherReport {
        serde_json::from_str::<OwOneCallResponse>(body).unwrap().into_report()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn maps_current_conditions() {
        let report = normalize(FIXTURE);

        assert_eq!(report.latitude, 34.0164);
        assert_eq!(report.longitude, -83.9069);

        let c = &report.currently;
        assert_eq!(c.time, 1717243200);
        assert_eq!(c.summary, "light rain");
        assert_eq!(c.icon, "10d");
        assert_eq!(c.temperature, 72.0);
        assert_eq!(c.apparent_temperature, 73.4);
        assert_eq!(c.pressure, 1015.0);
        assert!(close(c.humidity, 0.45));
        assert!(close(c.cloud_cover, 0.2));
        assert!(close(c.visibility, 6.213_711_922_373_339));
        assert!(close(c.precip_intensity, 0.1));
        assert_eq!(c.precip_accumulation, 0.0);
        assert_eq!(c.precip_type, "rain");
        assert_eq!(c.wind_bearing, 230.0);
        assert_eq!(c.uv_index, 6.1);
        assert_eq!(c.ozone, 0.0);
    }

    #[test]
    fn maps_daily_points_in_order() {
        let report = normalize(FIXTURE);
        let days = &report.daily.data;

        assert_eq!(days.len(), 2);
        assert!(days[0].time < days[1].time);

        let first = &days[0];
        assert_eq!(first.temperature, 63.2);
        assert_eq!(first.temperature_max, 84.7);
        assert_eq!(first.apparent_temperature, 81.0);
        assert!(close(first.humidity, 0.6));
        assert!(close(first.cloud_cover, 0.75));
        assert_eq!(first.precip_probability, 0.87);
        assert!(close(first.precip_accumulation, 0.5));
        assert_eq!(first.precip_type, "rain");
        assert_eq!(first.wind_gust, 15.2);
        assert_eq!(first.summary, "moderate rain");

        let second = &days[1];
        assert_eq!(second.summary, "");
        assert_eq!(second.icon, "");
        assert_eq!(second.precip_type, "");
        assert_eq!(second.precip_accumulation, 0.0);
    }

    #[test]
    fn maps_alerts() {
        let report = normalize(FIXTURE);

        assert_eq!(
            report.alerts,
            vec![WeatherAlert {
                title: "Heat Advisory".into(),
                regions: vec!["NWS Peachtree City (Northern and Central Georgia)".into()],
                severity: "Extreme temperature value".into(),
                description: "Heat index values up to 105 expected.".into(),
                time: 1717250000.0,
                expires: 1717290000.0,
                uri: String::new(),
            }]
        );
    }

    #[test]
    fn absent_daily_and_alerts_become_empty() {
        let report = normalize(r#"{ "lat": 1.0, "lon": 2.0, "current": { "temp": 50.0 } }"#);

        assert_eq!(report.currently.temperature, 50.0);
        assert!(report.daily.data.is_empty());
        assert!(report.alerts.is_empty());
        assert_eq!(report.version, "");
    }

    #[test]
    fn normalization_is_deterministic() {
        assert_eq!(normalize(FIXTURE), normalize(FIXTURE));
    }

    #[test]
    fn body_without_current_is_rejected() {
        let res = serde_json::from_str::<OwOneCallResponse>(r#"{ "cod": 401, "message": "x" }"#);
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn missing_key_is_a_config_error() {
        let provider = OpenWeatherProvider::new(None).with_base_url("http://127.0.0.1:9");
        let query = WeatherQuery::new("34.016410", "-83.906870");

        let err = provider.get_report(&QueryContext::background(), &query).await.unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));

        let provider = OpenWeatherProvider::new(Some(String::new()));
        let err = provider.get_report(&QueryContext::background(), &query).await.unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_sending() {
        let provider =
            OpenWeatherProvider::new(Some("KEY".into())).with_base_url("http://127.0.0.1:9");
        let (ctx, handle) = QueryContext::new();
        handle.cancel();

        let err = provider
            .get_report(&ctx, &WeatherQuery::new("34.016410", "-83.906870"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let provider =
            OpenWeatherProvider::new(Some("SECRET".into())).with_base_url("http://127.0.0.1:9");

        let err = provider
            .get_report(&QueryContext::background(), &WeatherQuery::new("1", "2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(!err.to_string().contains("SECRET"));
    }
}
