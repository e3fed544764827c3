use std::env;

#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) format: LogFormat,
    /// Filter used when `RUST_LOG` is not set.
    pub(crate) default_filter: &'static str,
    /// Warnings captured during config parsing so they can be logged after tracing is initialized.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    fn from_lookup(component: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let component = component.trim().to_string();
        let mut warnings = Vec::new();

        let service_name = lookup("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = lookup("STAGE")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "local".to_string());

        let default_filter = if environment == "local" { "debug" } else { "info" };

        let format = match lookup("LOG_FORMAT") {
            Some(raw) if !raw.trim().is_empty() => match parse_format(&raw) {
                Some(format) => format,
                None => {
                    warnings.push(format!(
                        "LOG_FORMAT is invalid (value: {raw}); defaulting to text"
                    ));
                    LogFormat::Text
                }
            },
            _ => LogFormat::Text,
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            format,
            default_filter,
            warnings,
        }
    }
}

fn parse_format(input: &str) -> Option<LogFormat> {
    match input.trim().to_ascii_lowercase().as_str() {
        "text" | "pretty" | "plain" => Some(LogFormat::Text),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(component: &str, vars: &[(&str, &str)]) -> ObservabilityConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ObservabilityConfig::from_lookup(component, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_debug_text() {
        let config = config_with("backend", &[]);
        assert_eq!(config.service_context.service_name, "backend");
        assert_eq!(config.service_context.environment, "local");
        assert_eq!(config.default_filter, "debug");
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn production_stage_logs_at_info() {
        let config = config_with("backend", &[("STAGE", "Production"), ("LOG_FORMAT", "json")]);
        assert_eq!(config.service_context.environment, "production");
        assert_eq!(config.default_filter, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn invalid_format_is_reported_not_fatal() {
        let config = config_with("backend", &[("LOG_FORMAT", "xml")]);
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("LOG_FORMAT"));
    }
}
