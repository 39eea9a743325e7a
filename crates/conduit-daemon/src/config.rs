//! Configuration loading and validation

use conduit_core::cluster::{self, id};
use conduit_core::{AttributeId, AttributeValue, ClusterId};
use conduit_transport::{SimulatedConfig, DEFAULT_REPORT_BUFFER, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Device {ieee}: cluster 0x{cluster:04x} has no channel support")]
    UnknownCluster { ieee: String, cluster: ClusterId },

    #[error("Device {ieee}: invalid attribute key '{key}' (expected \"0xCCCC/name\")")]
    InvalidAttributeKey { ieee: String, key: String },

    #[error("Device {ieee}: cluster 0x{cluster:04x} has no attribute '{attribute}'")]
    UnknownAttribute {
        ieee: String,
        cluster: ClusterId,
        attribute: String,
    },

    #[error("Device {ieee}: attribute '{key}' targets a cluster the device does not expose")]
    ClusterNotExposed { ieee: String, key: String },

    #[error("Device {0} is declared more than once")]
    DuplicateDevice(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default = "default_devices", rename = "device")]
    pub devices: Vec<DeviceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            devices: default_devices(),
        }
    }
}

impl Config {
    /// Check every device entry against the known cluster tables
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.ieee.as_str()) {
                return Err(ConfigError::DuplicateDevice(device.ieee.clone()));
            }
            for &cluster_id in &device.clusters {
                if cluster::lookup(cluster_id).is_none() {
                    return Err(ConfigError::UnknownCluster {
                        ieee: device.ieee.clone(),
                        cluster: cluster_id,
                    });
                }
            }
            device.initial_values()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Capacity of each simulated device's report feed
    #[serde(default = "default_report_buffer")]
    pub report_buffer: usize,
    /// Give up on a device request after this many milliseconds
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,
    /// Artificial round-trip latency of simulated devices
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            report_buffer: default_report_buffer(),
            response_timeout_ms: default_response_timeout(),
            latency_ms: 0,
        }
    }
}

impl DaemonConfig {
    pub fn to_simulated_config(&self) -> SimulatedConfig {
        SimulatedConfig {
            latency_ms: self.latency_ms,
            timeout_ms: self.response_timeout_ms,
            report_buffer: self.report_buffer,
        }
    }
}

fn default_report_buffer() -> usize {
    DEFAULT_REPORT_BUFFER
}

fn default_response_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// One simulated device and the clusters it exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub ieee: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: u8,
    pub clusters: Vec<ClusterId>,
    /// Initial attribute values keyed by "0xCCCC/name" or "0xCCCC/0xAAAA"
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl DeviceConfig {
    /// Resolve attribute keys to (cluster, attribute id, value)
    pub fn initial_values(&self) -> Result<Vec<(ClusterId, AttributeId, AttributeValue)>, ConfigError> {
        let mut values = Vec::with_capacity(self.attributes.len());
        for (key, value) in &self.attributes {
            let (cluster_id, attribute_id) = self.parse_key(key)?;
            values.push((cluster_id, attribute_id, value.clone()));
        }
        Ok(values)
    }

    fn parse_key(&self, key: &str) -> Result<(ClusterId, AttributeId), ConfigError> {
        let invalid = || ConfigError::InvalidAttributeKey {
            ieee: self.ieee.clone(),
            key: key.to_string(),
        };

        let (cluster, attribute) = key.split_once('/').ok_or_else(invalid)?;
        let cluster_id = parse_hex(cluster).ok_or_else(invalid)?;
        if !self.clusters.contains(&cluster_id) {
            return Err(ConfigError::ClusterNotExposed {
                ieee: self.ieee.clone(),
                key: key.to_string(),
            });
        }

        let def = cluster::lookup(cluster_id).ok_or_else(|| ConfigError::UnknownCluster {
            ieee: self.ieee.clone(),
            cluster: cluster_id,
        })?;

        if let Some(attribute_id) = parse_hex(attribute) {
            return Ok((cluster_id, attribute_id));
        }

        def.table()
            .id_of(attribute)
            .map(|attribute_id| (cluster_id, attribute_id))
            .ok_or_else(|| ConfigError::UnknownAttribute {
                ieee: self.ieee.clone(),
                cluster: cluster_id,
                attribute: attribute.to_string(),
            })
    }
}

fn parse_hex(s: &str) -> Option<u16> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u16::from_str_radix(digits, 16).ok()
}

fn default_endpoint() -> u8 {
    1
}

/// One thermostat with a fan, populated with plausible readings
fn default_devices() -> Vec<DeviceConfig> {
    let attributes = [
        ("0x0201/local_temp", AttributeValue::Int(2150)),
        ("0x0201/occupied_cooling_setpoint", AttributeValue::Int(2600)),
        ("0x0201/occupied_heating_setpoint", AttributeValue::Int(2000)),
        ("0x0201/min_heat_setpoint_limit", AttributeValue::Int(700)),
        ("0x0201/max_heat_setpoint_limit", AttributeValue::Int(3000)),
        ("0x0201/min_cool_setpoint_limit", AttributeValue::Int(1600)),
        ("0x0201/max_cool_setpoint_limit", AttributeValue::Int(3200)),
        ("0x0201/ctrl_seqe_of_oper", AttributeValue::Int(4)),
        ("0x0201/system_mode", AttributeValue::Int(4)),
        ("0x0201/running_state", AttributeValue::Int(0)),
        ("0x0201/temp_setpoint_hold", AttributeValue::Int(0)),
        ("0x0202/fan_mode", AttributeValue::Int(5)),
        ("0x0202/fan_mode_sequence", AttributeValue::Int(2)),
    ];

    vec![DeviceConfig {
        ieee: "00:0d:6f:00:0a:90:69:e7".to_string(),
        endpoint: default_endpoint(),
        clusters: vec![id::THERMOSTAT, id::FAN],
        attributes: attributes
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    }]
}

/// Load configuration from file, falling back to defaults when it is absent
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_demo_device() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("conduit.toml")).unwrap();

        assert_eq!(config.daemon.response_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].clusters, vec![id::THERMOSTAT, id::FAN]);
        assert_eq!(config.devices[0].initial_values().unwrap().len(), 13);
    }

    #[test]
    fn test_load_devices_and_attributes() {
        let file = write_config(
            r#"
[daemon]
response_timeout_ms = 250
latency_ms = 5

[[device]]
ieee = "00:12:4b:00:01:02:03:04"
endpoint = 2
clusters = [0x0201, 0x0200]

[device.attributes]
"0x0201/occupied_heating_setpoint" = 1900
"0x0201/0x001c" = 3
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.daemon.response_timeout_ms, 250);
        assert_eq!(config.daemon.report_buffer, DEFAULT_REPORT_BUFFER);

        let device = &config.devices[0];
        assert_eq!(device.endpoint, 2);
        let mut values = device.initial_values().unwrap();
        values.sort_by_key(|(cluster, attribute, _)| (*cluster, *attribute));
        assert_eq!(
            values,
            vec![
                (id::THERMOSTAT, 0x0012, AttributeValue::Int(1900)),
                (id::THERMOSTAT, 0x001c, AttributeValue::Int(3)),
            ]
        );
    }

    #[test]
    fn test_endpoint_defaults_to_one() {
        let file = write_config(
            r#"
[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0202]
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.devices[0].endpoint, 1);
        assert!(config.devices[0].attributes.is_empty());
    }

    #[test]
    fn test_rejects_unknown_attribute_name() {
        let file = write_config(
            r#"
[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0201]

[device.attributes]
"0x0201/not_an_attribute" = 1
"#,
        );

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAttribute { cluster: 0x0201, .. }));
    }

    #[test]
    fn test_rejects_malformed_key() {
        let file = write_config(
            r#"
[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0201]

[device.attributes]
"thermostat.local_temp" = 1
"#,
        );

        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::InvalidAttributeKey { .. }
        ));
    }

    #[test]
    fn test_rejects_attribute_for_missing_cluster() {
        let file = write_config(
            r#"
[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0202]

[device.attributes]
"0x0201/local_temp" = 2000
"#,
        );

        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ClusterNotExposed { .. }
        ));
    }

    #[test]
    fn test_rejects_unsupported_cluster() {
        let file = write_config(
            r#"
[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0006]
"#,
        );

        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::UnknownCluster { cluster: 0x0006, .. }
        ));
    }

    #[test]
    fn test_rejects_duplicate_device() {
        let file = write_config(
            r#"
[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0202]

[[device]]
ieee = "00:12:4b:00:01:02:03:04"
clusters = [0x0201]
"#,
        );

        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::DuplicateDevice(_)
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let file = write_config("[[device]\nieee = ");
        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::Parse(_)));
    }
}
