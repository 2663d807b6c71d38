use crate::{LambdaqlError, Result};
use std::env;

/// Which event shape the function is deployed behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Raw API Gateway proxy events.
    Proxy,
    /// Any event `lambda_http` understands (REST, HTTP API, ALB, function URLs).
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Deployment settings read from the function's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaConfig {
    pub event_source: EventSource,
    pub introspection: bool,
    pub log_format: LogFormat,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            event_source: EventSource::Proxy,
            introspection: true,
            log_format: LogFormat::Json,
        }
    }
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let event_source = match lookup("LAMBDAQL_EVENT_SOURCE").as_deref() {
            None | Some("proxy") => EventSource::Proxy,
            Some("http") => EventSource::Http,
            Some(other) => {
                return Err(LambdaqlError::Config(format!(
                    "LAMBDAQL_EVENT_SOURCE must be 'proxy' or 'http', got '{other}'"
                )))
            }
        };

        let introspection = lookup("LAMBDAQL_INTROSPECTION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.introspection);

        let log_format = match lookup("LAMBDAQL_LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("text") => LogFormat::Text,
            Some(other) => {
                return Err(LambdaqlError::Config(format!(
                    "LAMBDAQL_LOG_FORMAT must be 'json' or 'text', got '{other}'"
                )))
            }
        };

        Ok(Self {
            event_source,
            introspection,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_environment_uses_defaults() {
        let config = LambdaConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LambdaConfig::default());
    }

    #[test]
    fn reads_every_setting() {
        let config = LambdaConfig::from_lookup(lookup(&[
            ("LAMBDAQL_EVENT_SOURCE", "http"),
            ("LAMBDAQL_INTROSPECTION", "false"),
            ("LAMBDAQL_LOG_FORMAT", "text"),
        ]))
        .unwrap();
        assert_eq!(config.event_source, EventSource::Http);
        assert!(!config.introspection);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn rejects_unknown_event_source() {
        let err = LambdaConfig::from_lookup(lookup(&[("LAMBDAQL_EVENT_SOURCE", "sqs")])).unwrap_err();
        assert!(matches!(err, LambdaqlError::Config(_)));
    }
}
