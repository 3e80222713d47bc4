//! First-success race over a set of weather providers.
//!
//! Every provider is queried concurrently. The first successful report is
//! returned as-is; later successes and all failures are discarded. Failures
//! only become visible when no provider succeeds, either because all of them
//! failed or because the context was cancelled first.

use std::{collections::HashMap, sync::Arc};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    QueryContext, WeatherProvider, WeatherQuery, WeatherReport,
    error::{ErrorKind, ProviderFailure, RaceError},
};

/// Queries every provider concurrently and returns the first successful report.
///
/// Providers still running when a winner is found keep running in the
/// background; their results are dropped. The race itself has no timeout:
/// bound it with a deadline on `ctx`.
pub async fn first_report(
    ctx: &QueryContext,
    providers: &[Arc<dyn WeatherProvider>],
    query: &WeatherQuery,
) -> Result<WeatherReport, RaceError> {
    if providers.is_empty() {
        return Err(RaceError::NoProviders);
    }

    let mut set = JoinSet::new();
    let mut ids = HashMap::with_capacity(providers.len());

    for provider in providers {
        let id = provider.id();
        let provider = Arc::clone(provider);
        let ctx = ctx.clone();
        let query = query.clone();

        debug!(provider = %id, lat = %query.latitude, long = %query.longitude, "querying provider");
        let handle = set.spawn(async move { (id, provider.get_report(&ctx, &query).await) });
        // Only needed to name a provider whose task panicked.
        ids.insert(handle.id(), id);
    }

    let mut failures = Vec::new();

    loop {
        tokio::select! {
            biased;
            joined = set.join_next_with_id() => {
                let Some(joined) = joined else {
                    // Providers that saw the deadline fail as cancelled.
                    if ctx.is_cancelled() {
                        warn!(failed = failures.len(), "race cancelled before any provider succeeded");
                        return Err(RaceError::Cancelled { failures });
                    }
                    warn!(failed = failures.len(), "every weather provider failed");
                    return Err(RaceError::AllFailed { failures });
                };

                match joined {
                    Ok((_, (provider, Ok(report)))) => {
                        info!(provider = %provider, "provider won the race");
                        set.detach_all();
                        return Ok(report);
                    }
                    Ok((_, (provider, Err(err)))) => {
                        warn!(provider = %provider, kind = %err.kind(), error = %err, "provider failed");
                        failures.push(ProviderFailure {
                            provider,
                            kind: err.kind(),
                            message: err.to_string(),
                        });
                    }
                    Err(join_err) => {
                        if let Some(&provider) = ids.get(&join_err.id()) {
                            warn!(provider = %provider, error = %join_err, "provider task aborted");
                            failures.push(ProviderFailure {
                                provider,
                                kind: ErrorKind::Panicked,
                                message: join_err.to_string(),
                            });
                        }
                    }
                }
            }
            _ = ctx.cancelled() => {
                warn!(failed = failures.len(), pending = set.len(), "race cancelled before any provider succeeded");
                set.detach_all();
                return Err(RaceError::Cancelled { failures });
            }
        }
    }
}
