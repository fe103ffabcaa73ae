use crate::domain::Signal;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("no endpoint configured for {signal}: set a base endpoint or a {signal} endpoint")]
    Missing { signal: Signal },
    #[error("invalid {signal} endpoint '{url}': {reason}")]
    InvalidUrl {
        signal: Signal,
        url: String,
        reason: String,
    },
}

/// Computes the destination for `signal`.
///
/// A non-empty override is used verbatim; otherwise the signal path is
/// appended to the base URL.
pub fn resolve(
    signal: Signal,
    base: Option<&str>,
    override_url: Option<&str>,
) -> Result<Url, EndpointError> {
    let raw = match (non_empty(override_url), non_empty(base)) {
        (Some(url), _) => url.to_string(),
        (None, Some(base)) => format!("{}/{}", base.trim_end_matches('/'), signal.path()),
        (None, None) => return Err(EndpointError::Missing { signal }),
    };

    let url = Url::parse(&raw).map_err(|e| EndpointError::InvalidUrl {
        signal,
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(EndpointError::InvalidUrl {
            signal,
            url: raw,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolved destinations, one per enabled signal.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    traces: Option<Url>,
    metrics: Option<Url>,
    logs: Option<Url>,
}

impl Endpoints {
    pub fn get(&self, signal: Signal) -> Option<&Url> {
        match signal {
            Signal::Traces => self.traces.as_ref(),
            Signal::Metrics => self.metrics.as_ref(),
            Signal::Logs => self.logs.as_ref(),
        }
    }

    pub fn set(&mut self, signal: Signal, url: Url) {
        let slot = match signal {
            Signal::Traces => &mut self.traces,
            Signal::Metrics => &mut self.metrics,
            Signal::Logs => &mut self.logs,
        };
        *slot = Some(url);
    }
}
