//! Endpoint configuration.
//!
//! Configuration is plain data, loadable from YAML:
//!
//! ```yaml
//! capacity: 16
//! max_passes: 254
//! location: "lab bench"
//! resources:
//!   - uri: event/lamp
//!     max_len: 32
//!     attr: title="Lamp";rt="light"
//!     echo_puts: true
//! ```

use std::path::Path;
use std::time::Duration;

use chariot_protocol::{DEFAULT_MAX_LINE_LEN, DEFAULT_MAX_MOTES, MAX_RECORD_LEN};
use serde::{Deserialize, Serialize};

use crate::clock::WaitPolicy;
use crate::error::{EndpointError, EndpointResult};
use crate::registry::MAX_CAPACITY;

// ============================================================================
// Configuration Types
// ============================================================================

/// Configuration for an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    /// Maximum number of registered resources.
    pub capacity: usize,
    /// Maximum line length of the serial link.
    pub max_line_len: usize,
    /// Delay between transport polls while awaiting a response.
    pub poll_interval_ms: u64,
    /// Consecutive idle polls before a response wait times out.
    pub max_passes: u32,
    /// Idle polls allowed while waiting for the peer to come online.
    pub startup_max_passes: u32,
    /// Grace period before publishing a put-handler result.
    pub settle_delay_ms: u64,
    /// Bound on the mote directory size.
    pub max_motes: usize,
    /// Location announced to the peer at startup.
    pub location: Option<String>,
    /// Resources created at startup.
    pub resources: Vec<ResourceConfig>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            capacity: 16,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            poll_interval_ms: 10,
            max_passes: 254,
            startup_max_passes: 3000,
            settle_delay_ms: 250,
            max_motes: DEFAULT_MAX_MOTES,
            location: None,
            resources: Vec::new(),
        }
    }
}

/// A resource declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Resource path.
    pub uri: String,
    /// Event buffer length.
    pub max_len: usize,
    /// Descriptor sent to the peer.
    pub attr: String,
    /// Publish every PUT payload back as the resource value.
    #[serde(default)]
    pub echo_puts: bool,
}

impl EndpointConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(text: &str) -> EndpointResult<Self> {
        let config: EndpointConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> EndpointResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check the configuration for values the endpoint cannot work with.
    pub fn validate(&self) -> EndpointResult<()> {
        if !(1..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(EndpointError::Config(format!(
                "capacity must be within 1..={MAX_CAPACITY}, got {}",
                self.capacity
            )));
        }
        if !(2..=MAX_RECORD_LEN).contains(&self.max_line_len) {
            return Err(EndpointError::Config(format!(
                "max_line_len must be within 2..={MAX_RECORD_LEN}, got {}",
                self.max_line_len
            )));
        }
        if self.max_passes == 0 || self.startup_max_passes == 0 {
            return Err(EndpointError::Config("pass limits must be at least 1".into()));
        }
        if self.max_motes == 0 {
            return Err(EndpointError::Config("max_motes must be at least 1".into()));
        }
        if self.resources.len() > self.capacity {
            return Err(EndpointError::Config(format!(
                "{} resources declared for capacity {}",
                self.resources.len(),
                self.capacity
            )));
        }
        Ok(())
    }

    /// Polling policy for response waits.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_passes: self.max_passes,
        }
    }

    /// Polling policy for the startup banner.
    pub fn startup_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_passes: self.startup_max_passes,
        }
    }

    /// Grace period before publishing a put-handler result.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EndpointConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wait_policy().max_passes, 254);
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_yaml() {
        let config = EndpointConfig::from_yaml_str(
            r#"
capacity: 4
location: lab bench
resources:
  - uri: event/lamp
    max_len: 32
    attr: title="Lamp"
    echo_puts: true
  - uri: event/door
    max_len: 24
    attr: rt="contact"
"#,
        )
        .unwrap();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.max_passes, 254);
        assert_eq!(config.location.as_deref(), Some("lab bench"));
        assert_eq!(config.resources.len(), 2);
        assert!(config.resources[0].echo_puts);
        assert!(!config.resources[1].echo_puts);
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(matches!(
            EndpointConfig::from_yaml_str("capacty: 4\n"),
            Err(EndpointError::Yaml(_))
        ));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        assert!(matches!(
            EndpointConfig::from_yaml_str("capacity: 0\n"),
            Err(EndpointError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_capacity_beyond_handle_range() {
        assert!(matches!(
            EndpointConfig::from_yaml_str("capacity: 18446744073709551615\n"),
            Err(EndpointError::Config(_))
        ));
        assert!(matches!(
            EndpointConfig::from_yaml_str("capacity: 70000\n"),
            Err(EndpointError::Config(_))
        ));
        assert!(EndpointConfig::from_yaml_str("capacity: 65535\n").is_ok());
    }

    #[test]
    fn test_rejects_oversize_line() {
        let config = EndpointConfig {
            max_line_len: MAX_RECORD_LEN + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
