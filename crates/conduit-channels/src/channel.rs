//! Shared channel behavior: lifecycle, write isolation, report publishing

use async_trait::async_trait;
use conduit_core::{AttributeName, AttributeValue, ReportConfig};
use conduit_transport::AttributeReport;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::accessor::AttributeAccessor;
use crate::binding::ClusterBinding;
use crate::dispatch::{Dispatcher, Signal, SignalPayload};
use crate::error::{AccessError, ConfigurationError};
use crate::reporting::{ReportingConfigurator, ReportingOutcome, ResolvedReport};

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChannelStatus {
    /// Created, reporting not yet configured
    Unbound,
    Configured,
    Initialized,
}

/// Result of priming cached attribute values
#[derive(Debug, Clone, Default)]
pub struct InitOutcome {
    pub primed: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigureOutcome {
    pub reporting: ReportingOutcome,
    pub init: InitOutcome,
}

/// State and behavior common to every channel variant
#[derive(Debug)]
pub struct ChannelCore {
    name: &'static str,
    binding: ClusterBinding,
    accessor: AttributeAccessor,
    dispatcher: Dispatcher,
    reports: Vec<ResolvedReport>,
    init_attributes: Vec<&'static str>,
    config_errors: Vec<ConfigurationError>,
    status: RwLock<ChannelStatus>,
    // Dropped with the core, which ends background tasks holding a receiver
    shutdown: watch::Sender<()>,
}

impl ChannelCore {
    /// Resolve a variant's declarations against the bound cluster
    ///
    /// Declarations naming attributes the cluster lacks are logged and left
    /// out; the channel itself is still created.
    pub fn new(
        name: &'static str,
        binding: ClusterBinding,
        dispatcher: Dispatcher,
        report_config: &'static [ReportConfig],
        init_attributes: &'static [&'static str],
    ) -> Self {
        let mut config_errors = Vec::new();
        let mut missing = |attribute: &str| {
            let err = ConfigurationError {
                channel: binding.unique_id().to_string(),
                cluster: binding.cluster_name().to_string(),
                attribute: attribute.to_string(),
            };
            warn!(channel = %binding.unique_id(), error = %err, "Dropping channel declaration");
            config_errors.push(err);
        };

        let mut reports = Vec::with_capacity(report_config.len());
        for entry in report_config {
            match binding.attributes().id_of(entry.attribute) {
                Some(attribute_id) => reports.push(ResolvedReport {
                    attribute: entry.attribute,
                    attribute_id,
                    policy: entry.policy,
                }),
                None => missing(entry.attribute),
            }
        }

        let mut init = Vec::with_capacity(init_attributes.len());
        for &attribute in init_attributes {
            if binding.attributes().contains(attribute) {
                init.push(attribute);
            } else {
                missing(attribute);
            }
        }

        Self {
            name,
            accessor: AttributeAccessor::new(binding.clone()),
            binding,
            dispatcher,
            reports,
            init_attributes: init,
            config_errors,
            status: RwLock::new(ChannelStatus::Unbound),
            shutdown: watch::channel(()).0,
        }
    }

    /// Variant name, e.g. "thermostat"
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn unique_id(&self) -> &str {
        self.binding.unique_id()
    }

    pub fn binding(&self) -> &ClusterBinding {
        &self.binding
    }

    pub fn accessor(&self) -> &AttributeAccessor {
        &self.accessor
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn reports(&self) -> &[ResolvedReport] {
        &self.reports
    }

    pub fn init_attributes(&self) -> &[&'static str] {
        &self.init_attributes
    }

    pub fn config_errors(&self) -> &[ConfigurationError] {
        &self.config_errors
    }

    /// Resolves with an error once this channel is dropped
    pub fn shutdown_signal(&self) -> watch::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.read()
    }

    /// Move the status forward; never back
    fn advance_status(&self, status: ChannelStatus) {
        let mut current = self.status.write();
        *current = (*current).max(status);
    }

    /// Bind and request reporting for every resolved declaration
    pub async fn configure_reporting(&self) -> ReportingOutcome {
        let outcome = ReportingConfigurator::new(&self.binding).configure(&self.reports).await;
        self.advance_status(ChannelStatus::Configured);
        info!(
            channel = %self.unique_id(),
            kind = self.name,
            configured = outcome.configured.len(),
            failed = outcome.failed.len(),
            "Channel configured"
        );
        outcome
    }

    /// Prime the cache with every init attribute
    ///
    /// A failed read is logged and skipped. Only a configured channel
    /// becomes `Initialized`.
    pub async fn initialize(&self, from_cache: bool) -> InitOutcome {
        let mut outcome = InitOutcome::default();
        for &attribute in &self.init_attributes {
            match self.accessor.read(attribute, from_cache).await {
                Ok(_) => outcome.primed.push(attribute),
                Err(e) => {
                    warn!(
                        channel = %self.unique_id(),
                        attribute = attribute,
                        error = %e,
                        "Failed to read attribute during initialization"
                    );
                    outcome.failed.push(attribute);
                }
            }
        }

        // A channel whose reporting was never configured stays Unbound
        {
            let mut status = self.status.write();
            if *status >= ChannelStatus::Configured {
                *status = ChannelStatus::Initialized;
            }
        }
        debug!(
            channel = %self.unique_id(),
            from_cache = from_cache,
            primed = outcome.primed.len(),
            failed = outcome.failed.len(),
            "Channel initialized"
        );
        outcome
    }

    /// Read one attribute; errors reach the caller
    pub async fn get_attribute_value(&self, attribute: &str, from_cache: bool) -> Result<AttributeValue, AccessError> {
        self.accessor.read(attribute, from_cache).await
    }

    /// Write one attribute, swallowing delivery failures
    ///
    /// Returns whether the device accepted the value. A failure leaves one
    /// log record naming the channel and attribute.
    pub async fn write_isolated(&self, attribute: &'static str, value: AttributeValue, action: &str) -> bool {
        match self.accessor.write(&[(attribute, value)]).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    channel = %self.unique_id(),
                    attribute = attribute,
                    error = %e,
                    "Could not set {}",
                    action
                );
                false
            }
        }
    }

    /// Publish on one of this channel's signals
    pub fn publish(&self, signal: Signal, attribute: AttributeName, value: AttributeValue) -> usize {
        self.dispatcher
            .publish(self.unique_id(), signal, SignalPayload { attribute, value })
    }

    /// Default report handling: resolve the id and publish `AttributeUpdated`
    pub fn publish_attribute(&self, report: &AttributeReport) -> AttributeName {
        let name = self.binding.attributes().resolve(report.attribute_id);
        debug!(
            channel = %self.unique_id(),
            cluster = %self.binding.cluster_name(),
            attribute = %name,
            value = %report.value,
            "Attribute report"
        );
        self.publish(Signal::AttributeUpdated, name.clone(), report.value.clone());
        name
    }
}

/// A cluster-specific channel built on [`ChannelCore`]
#[async_trait]
pub trait ClusterChannel: Send + Sync {
    /// Short variant name used in logs
    const NAME: &'static str;
    /// Attributes the device is asked to report, in request order
    const REPORT_CONFIG: &'static [ReportConfig];
    /// Attributes primed by `initialize`
    const INIT_ATTRIBUTES: &'static [&'static str];

    fn core(&self) -> &ChannelCore;

    /// Configure reporting, then prime the cache with live reads
    async fn configure(&self) -> ConfigureOutcome {
        let reporting = self.core().configure_reporting().await;
        let init = self.initialize(false).await;
        ConfigureOutcome { reporting, init }
    }

    async fn initialize(&self, from_cache: bool) -> InitOutcome {
        self.core().initialize(from_cache).await
    }

    fn handle_report(&self, report: &AttributeReport) {
        self.core().publish_attribute(report);
    }
}

/// Build the shared core for a variant from its declarations
pub fn core_for<C: ClusterChannel>(binding: ClusterBinding, dispatcher: Dispatcher) -> ChannelCore {
    ChannelCore::new(C::NAME, binding, dispatcher, C::REPORT_CONFIG, C::INIT_ATTRIBUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hvac::ThermostatChannel;
    use crate::testing::{bind, hvac_device};
    use conduit_core::cluster::id;

    #[tokio::test]
    async fn test_write_isolated_reports_acceptance() {
        let device = hvac_device();
        let channel = ThermostatChannel::new(bind(&device, id::THERMOSTAT), Dispatcher::default());
        let core = channel.core();

        assert!(core.write_isolated("system_mode", AttributeValue::UInt(1), "system mode").await);
        device.fail_writes(true);
        assert!(!core.write_isolated("system_mode", AttributeValue::UInt(3), "system mode").await);
        assert_eq!(core.accessor().cached("system_mode"), Some(AttributeValue::UInt(1)));
    }

    #[tokio::test]
    async fn test_write_isolated_unknown_attribute_sends_nothing() {
        let device = hvac_device();
        let channel = ThermostatChannel::new(bind(&device, id::THERMOSTAT), Dispatcher::default());

        assert!(!channel.core().write_isolated("fan_mode", AttributeValue::UInt(1), "speed").await);
        assert_eq!(device.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_get_attribute_value_propagates_errors() {
        let device = hvac_device();
        let channel = ThermostatChannel::new(bind(&device, id::THERMOSTAT), Dispatcher::default());
        device.fail_read_of(0x0000);

        let err = channel.core().get_attribute_value("local_temp", false).await.unwrap_err();
        assert!(matches!(err, AccessError::Transport { .. }));
        assert!(channel.core().accessor().cached("local_temp").is_none());
    }

    #[tokio::test]
    async fn test_status_progression() {
        let device = hvac_device();
        let channel = ThermostatChannel::new(bind(&device, id::THERMOSTAT), Dispatcher::default());
        let core = channel.core();

        assert_eq!(core.status(), ChannelStatus::Unbound);
        core.configure_reporting().await;
        assert_eq!(core.status(), ChannelStatus::Configured);
        assert!(device.is_bound(1, id::THERMOSTAT));
        core.initialize(false).await;
        assert_eq!(core.status(), ChannelStatus::Initialized);
    }

    #[tokio::test]
    async fn test_status_never_regresses() {
        let device = hvac_device();
        let channel = ThermostatChannel::new(bind(&device, id::THERMOSTAT), Dispatcher::default());

        channel.initialize(false).await;
        assert_eq!(channel.core().status(), ChannelStatus::Unbound);
        assert!(!device.is_bound(1, id::THERMOSTAT));
        assert_eq!(device.stats().reporting, 0);

        channel.configure().await;
        assert_eq!(channel.core().status(), ChannelStatus::Initialized);

        channel.core().configure_reporting().await;
        assert_eq!(channel.core().status(), ChannelStatus::Initialized);
        channel.configure().await;
        assert_eq!(channel.core().status(), ChannelStatus::Initialized);
        channel.initialize(true).await;
        assert_eq!(channel.core().status(), ChannelStatus::Initialized);
    }

    #[test]
    fn test_declarations_resolve_in_order() {
        let device = hvac_device();
        let channel = ThermostatChannel::new(bind(&device, id::THERMOSTAT), Dispatcher::default());
        let ids: Vec<_> = channel.core().reports().iter().map(|r| r.attribute_id).collect();

        assert_eq!(ids, vec![0x0000, 0x0011, 0x0012, 0x001c, 0x0029, 0x0023]);
        assert_eq!(channel.core().init_attributes().len(), 11);
    }
}
