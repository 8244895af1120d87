use super::{Config, ConfigError};
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(webhook) = &self.slack_webhook {
            Url::parse(webhook).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid Slack webhook URL: {e}"))
            })?;
        }

        if self.pagerduty_routing_key.is_some() {
            Url::parse(&self.pagerduty_endpoint).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid PagerDuty endpoint '{}': {}",
                    self.pagerduty_endpoint, e
                ))
            })?;
        }

        if let Some(explorer) = &self.explorer_url {
            Url::parse(explorer).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid block explorer URL '{explorer}': {e}"
                ))
            })?;
        }

        if self.drain_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Drain timeout must be greater than 0".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "HTTP timeout must be greater than 0".to_string(),
            ));
        }

        self.retry_config
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        Ok(())
    }
}
