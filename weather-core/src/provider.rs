use crate::{
    Config, QueryContext, WeatherQuery, WeatherReport,
    error::ProviderError,
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, future::Future, sync::Arc};

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    /// Environment variable that overrides the configured API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::WeatherApi => "WEATHERAPI_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// A weather source that maps its own response schema into a [`WeatherReport`].
///
/// Implementations must fail (never panic) on missing credentials, must not
/// return a partial report on failure, and must stop with
/// [`ProviderError::Cancelled`] once the context is cancelled.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn get_report(
        &self,
        ctx: &QueryContext,
        query: &WeatherQuery,
    ) -> Result<WeatherReport, ProviderError>;
}

/// Construct a provider from config and explicit ProviderId.
///
/// A missing API key is not an error here: the provider reports it as a
/// configuration failure when called, so the race can still use its siblings.
pub fn provider_from_config(id: ProviderId, config: &Config) -> Arc<dyn WeatherProvider> {
    let api_key = config.provider_api_key(id);
    let base_url = config.provider_base_url(id);

    match id {
        ProviderId::OpenWeather => {
            let mut provider = OpenWeatherProvider::new(api_key);
            if let Some(url) = base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderId::WeatherApi => {
            let mut provider = WeatherApiProvider::new(api_key);
            if let Some(url) = base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
    }
}

/// Construct the set of providers to race, in the given order.
pub fn providers_from_config(ids: &[ProviderId], config: &Config) -> Vec<Arc<dyn WeatherProvider>> {
    ids.iter().map(|id| provider_from_config(*id, config)).collect()
}

/// Runs a provider call unless the context is, or becomes, cancelled first.
pub(crate) async fn with_cancellation<F, T>(ctx: &QueryContext, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    if ctx.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ProviderError::Cancelled),
        res = call => res,
    }
}

/// Reads the body of a response, turning non-success statuses into transport errors.
pub(crate) async fn read_success_body(
    provider: ProviderId,
    res: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = res.status();
    let body = res.text().await.map_err(|e| {
        ProviderError::Transport(format!(
            "Failed to read {provider} response body: {}",
            e.without_url()
        ))
    })?;

    if !status.is_success() {
        return Err(ProviderError::Transport(format!(
            "{provider} request failed with status {}: {}",
            status,
            truncate_body(&body),
        )));
    }

    Ok(body)
}

pub(crate) fn send_error(provider: ProviderId, err: reqwest::Error) -> ProviderError {
    // The URL carries the API key in its query string.
    ProviderError::Transport(format!(
        "Failed to send request to {provider}: {}",
        err.without_url()
    ))
}

pub(crate) fn missing_key(provider: ProviderId) -> ProviderError {
    ProviderError::Config(format!(
        "No API key configured for provider '{provider}'.\n\
         Hint: set {} or run `weather configure {provider}`.",
        provider.api_key_env()
    ))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
