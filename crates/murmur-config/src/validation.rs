// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checks that run after the config has deserialized: bind host shape,
//! log level names, the database path, and the relay and auth limits.

use crate::diagnostic::ConfigError;
use crate::model::MurmurConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Run every check and report all failures together.
pub fn validate_config(config: &MurmurConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level `{}` must be one of: {}",
                config.server.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.presence.outbox_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "presence.outbox_capacity must be at least 1".to_string(),
        });
    }

    if config.relay.max_message_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.max_message_bytes must be at least 1".to_string(),
        });
    }

    if config.relay.history_limit == Some(0) {
        errors.push(ConfigError::Validation {
            message: "relay.history_limit must be at least 1 when set".to_string(),
        });
    }

    if config.auth.session_ttl_hours == 0 {
        errors.push(ConfigError::Validation {
            message: "auth.session_ttl_hours must be at least 1".to_string(),
        });
    }

    if config.auth.min_password_len < 4 {
        errors.push(ConfigError::Validation {
            message: format!(
                "auth.min_password_len must be at least 4, got {}",
                config.auth.min_password_len
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
