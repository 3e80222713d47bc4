use std::{fmt::Write as _, time::Duration};

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_core::{
    Config, ProviderId, QueryContext, WeatherQuery, WeatherReport, first_report,
    providers_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather report from the first provider to answer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Fetch the weather report for a coordinate.
    Report {
        /// Latitude in decimal degrees, e.g. 34.016410.
        #[arg(allow_negative_numbers = true)]
        lat: String,

        /// Longitude in decimal degrees, e.g. -83.906870.
        #[arg(allow_negative_numbers = true)]
        long: String,

        /// Provider to race; repeat for several. Defaults to the configured set.
        #[arg(long = "provider", short = 'p')]
        providers: Vec<String>,

        /// Give up after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Pretty-print the JSON report.
        #[arg(long)]
        pretty: bool,

        /// Print a short summary instead of JSON.
        #[arg(long, conflicts_with = "pretty")]
        human: bool,
    },

    /// List known providers and whether an API key is available.
    Providers,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Report { lat, long, providers, timeout, pretty, human } => {
                let config = Config::load()?;
                let ids = if providers.is_empty() {
                    config.enabled_provider_ids()?
                } else {
                    parse_provider_ids(&providers)?
                };
                let timeout = timeout.map(Duration::from_secs).unwrap_or_else(|| config.timeout());

                let report = fetch_report(&config, &ids, &lat, &long, timeout).await?;

                if human {
                    print!("{}", render_human(&report)?);
                } else if pretty {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{}", serde_json::to_string(&report)?);
                }
                Ok(())
            }
            Command::Providers => {
                let config = Config::load()?;
                for id in ProviderId::all() {
                    let status = if config.is_provider_configured(*id) {
                        "configured"
                    } else {
                        "missing API key"
                    };
                    println!("{id:<12} {status}");
                }
                Ok(())
            }
        }
    }
}

fn configure(provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn fetch_report(
    config: &Config,
    ids: &[ProviderId],
    lat: &str,
    long: &str,
    timeout: Duration,
) -> Result<WeatherReport> {
    let query = WeatherQuery::parse(lat, long)?;
    let providers = providers_from_config(ids, config);
    let ctx = QueryContext::background().with_timeout(timeout);

    tracing::debug!(providers = ids.len(), ?timeout, "starting weather report race");

    let mut report = first_report(&ctx, &providers, &query).await?;
    report.version = build_version();
    Ok(report)
}

fn parse_provider_ids(names: &[String]) -> Result<Vec<ProviderId>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = ProviderId::try_from(name.as_str())?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// `<package version>.<commit id>`; the commit comes from `WEATHER_COMMIT_ID` at build time.
fn build_version() -> String {
    format!("{}.{}", env!("CARGO_PKG_VERSION"), option_env!("WEATHER_COMMIT_ID").unwrap_or("dev"))
}

fn format_time(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

fn render_human(report: &WeatherReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let now = &report.currently;

    writeln!(out, "Weather at {:.4}, {:.4}", report.latitude, report.longitude)?;
    if now.time != 0 {
        writeln!(out, "  as of {}", format_time(now.time))?;
    }
    if !now.summary.is_empty() {
        writeln!(out, "  {}", now.summary)?;
    }
    writeln!(
        out,
        "  {:.1}°F (feels like {:.1}°F), humidity {:.0}%, wind {:.1} mph",
        now.temperature,
        now.apparent_temperature,
        now.humidity * 100.0,
        now.wind_speed,
    )?;

    for day in &report.daily.data {
        writeln!(
            out,
            "  {}: {:.0}–{:.0}°F, {:.0}% chance of precipitation",
            format_time(day.time),
            day.temperature,
            day.temperature_max,
            day.precip_probability * 100.0,
        )?;
    }

    for alert in &report.alerts {
        writeln!(out, "  ALERT: {}", alert.title)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::{WeatherAlert, WeatherDataBlock, WeatherDataPoint};

    #[test]
    fn report_accepts_negative_longitude() {
        let cli = Cli::try_parse_from([
            "weather", "report", "34.016410", "-83.906870", "-p", "openweather", "--timeout", "3",
        ])
        .unwrap();

        match cli.command {
            Command::Report { lat, long, providers, timeout, pretty, human } => {
                assert_eq!(lat, "34.016410");
                assert_eq!(long, "-83.906870");
                assert_eq!(providers, vec!["openweather".to_string()]);
                assert_eq!(timeout, Some(3));
                assert!(!pretty);
                assert!(!human);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn pretty_and_human_conflict() {
        let res = Cli::try_parse_from(["weather", "report", "1", "2", "--pretty", "--human"]);
        assert!(res.is_err());
    }

    #[test]
    fn provider_ids_are_deduplicated() {
        let ids = parse_provider_ids(&[
            "weatherapi".into(),
            "openweather".into(),
            "WeatherAPI".into(),
        ])
        .unwrap();
        assert_eq!(ids, vec![ProviderId::WeatherApi, ProviderId::OpenWeather]);

        assert!(parse_provider_ids(&["darksky".into()]).is_err());
    }

    #[test]
    fn version_has_package_and_commit_parts() {
        let version = build_version();
        assert!(version.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(version.len() > env!("CARGO_PKG_VERSION").len() + 1);
    }

    #[tokio::test]
    async fn invalid_coordinates_fail_before_any_provider_runs() {
        let err = fetch_report(
            &Config::default(),
            ProviderId::all(),
            "ninety",
            "0",
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn human_output_lists_conditions_days_and_alerts() {
        let report = WeatherReport {
            latitude: 34.0164,
            longitude: -83.9069,
            currently: WeatherDataPoint {
                time: 1_717_243_200,
                summary: "light rain".into(),
                temperature: 72.0,
                apparent_temperature: 73.4,
                humidity: 0.45,
                wind_speed: 5.8,
                ..Default::default()
            },
            daily: WeatherDataBlock {
                data: vec![WeatherDataPoint {
                    time: 1_717_200_000,
                    temperature: 63.2,
                    temperature_max: 84.7,
                    precip_probability: 0.87,
                    ..Default::default()
                }],
                ..Default::default()
            },
            alerts: vec![WeatherAlert { title: "Heat Advisory".into(), ..Default::default() }],
            ..Default::default()
        };

        let text = render_human(&report).unwrap();
        assert!(text.contains("Weather at 34.0164, -83.9069"));
        assert!(text.contains("as of 2024-06-01 12:00 UTC"));
        assert!(text.contains("72.0°F (feels like 73.4°F), humidity 45%"));
        assert!(text.contains("2024-06-01 00:00 UTC: 63–85°F, 87% chance"));
        assert!(text.contains("ALERT: Heat Advisory"));
    }

    #[test]
    fn human_output_for_a_bare_report_has_only_current_lines() {
        let text = render_human(&WeatherReport::default()).unwrap();

        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Weather at 0.0000, 0.0000\n"));
        assert!(!text.contains("ALERT"));
        assert!(!text.contains("as of"));
    }
}
