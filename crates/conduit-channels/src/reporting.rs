//! One-shot reporting configuration of a bound cluster

use conduit_core::{AttributeId, ReportPolicy, ReportingRequest};
use conduit_transport::TransportError;
use tracing::{debug, warn};

use crate::binding::ClusterBinding;

/// A reporting declaration resolved against the cluster's attribute table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedReport {
    pub attribute: &'static str,
    pub attribute_id: AttributeId,
    pub policy: ReportPolicy,
}

/// What a configuration pass achieved
#[derive(Debug, Clone, Default)]
pub struct ReportingOutcome {
    /// Whether the device acknowledged the bind request
    pub bound: bool,
    pub configured: Vec<&'static str>,
    pub failed: Vec<(&'static str, TransportError)>,
}

impl ReportingOutcome {
    pub fn is_complete(&self) -> bool {
        self.bound && self.failed.is_empty()
    }
}

/// Sends bind and configure-reporting requests for one cluster
pub struct ReportingConfigurator<'a> {
    binding: &'a ClusterBinding,
}

impl<'a> ReportingConfigurator<'a> {
    pub fn new(binding: &'a ClusterBinding) -> Self {
        Self { binding }
    }

    /// Bind the cluster, then request reporting for each entry in order
    ///
    /// Failures are logged per request and never stop the remaining ones.
    pub async fn configure(&self, entries: &[ResolvedReport]) -> ReportingOutcome {
        let transport = self.binding.transport();
        let endpoint = self.binding.endpoint();
        let cluster_id = self.binding.cluster_id();
        let mut outcome = ReportingOutcome::default();

        match transport.bind(endpoint, cluster_id).await {
            Ok(()) => {
                outcome.bound = true;
                debug!(channel = %self.binding.unique_id(), "Bound cluster");
            }
            Err(e) => {
                warn!(
                    channel = %self.binding.unique_id(),
                    cluster = %self.binding.cluster_name(),
                    error = %e,
                    "Failed to bind cluster"
                );
            }
        }

        for entry in entries {
            let request = ReportingRequest::new(entry.attribute_id, entry.policy);
            match transport.configure_reporting(endpoint, cluster_id, request).await {
                Ok(()) => {
                    debug!(
                        channel = %self.binding.unique_id(),
                        attribute = entry.attribute,
                        min = request.min_interval,
                        max = request.max_interval,
                        change = request.reportable_change,
                        "Configured attribute reporting"
                    );
                    outcome.configured.push(entry.attribute);
                }
                Err(e) => {
                    warn!(
                        channel = %self.binding.unique_id(),
                        attribute = entry.attribute,
                        error = %e,
                        "Failed to configure attribute reporting"
                    );
                    outcome.failed.push((entry.attribute, e));
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::cluster::id;
    use conduit_core::AttributeValue;
    use conduit_transport::{SimulatedConfig, SimulatedDevice};
    use std::sync::Arc;

    fn thermostat() -> (Arc<SimulatedDevice>, ClusterBinding) {
        let device = Arc::new(SimulatedDevice::new("00:11", SimulatedConfig::default()));
        device.add_cluster(1, id::THERMOSTAT, [(0x0000, AttributeValue::Int(2000))]);
        let binding = ClusterBinding::known(device.clone(), 1, id::THERMOSTAT).unwrap();
        (device, binding)
    }

    fn entries() -> Vec<ResolvedReport> {
        vec![
            ResolvedReport {
                attribute: "local_temp",
                attribute_id: 0x0000,
                policy: ReportPolicy::Default,
            },
            ResolvedReport {
                attribute: "occupied_heating_setpoint",
                attribute_id: 0x0012,
                policy: ReportPolicy::Immediate,
            },
            ResolvedReport {
                attribute: "system_mode",
                attribute_id: 0x001c,
                policy: ReportPolicy::Immediate,
            },
        ]
    }

    #[tokio::test]
    async fn test_configures_each_entry() {
        let (device, binding) = thermostat();
        let outcome = ReportingConfigurator::new(&binding).configure(&entries()).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.configured, vec!["local_temp", "occupied_heating_setpoint", "system_mode"]);
        assert!(device.is_bound(1, id::THERMOSTAT));
        assert_eq!(
            device.reporting_config(1, id::THERMOSTAT, 0x0012),
            Some(ReportingRequest::new(0x0012, ReportPolicy::Immediate))
        );
        assert_eq!(device.reporting_config(1, id::THERMOSTAT, 0x0000).unwrap().min_interval, 30);
    }

    #[tokio::test]
    async fn test_failed_entry_does_not_abort_batch() {
        let (device, binding) = thermostat();
        device.fail_reporting_of(0x0012);

        let outcome = ReportingConfigurator::new(&binding).configure(&entries()).await;

        assert_eq!(outcome.configured, vec!["local_temp", "system_mode"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "occupied_heating_setpoint");
        assert_eq!(device.stats().reporting, 3);
    }

    #[tokio::test]
    async fn test_bind_failure_still_configures() {
        let (device, binding) = thermostat();
        device.fail_bind(true);

        let outcome = ReportingConfigurator::new(&binding).configure(&entries()).await;
        assert!(!outcome.bound);
        assert_eq!(outcome.configured.len(), 3);
    }

    #[tokio::test]
    async fn test_repeat_configuration_is_accepted() {
        let (device, binding) = thermostat();
        let configurator = ReportingConfigurator::new(&binding);
        configurator.configure(&entries()).await;
        let again = configurator.configure(&entries()).await;

        assert!(again.is_complete());
        assert_eq!(device.stats().reporting, 6);
    }
}
