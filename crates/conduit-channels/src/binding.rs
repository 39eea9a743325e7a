//! Binding of one cluster on one remote device

use conduit_core::{cluster, AttributeCache, AttributeTable, CacheSource, ClusterAddress, ClusterId};
use conduit_transport::{AttributeReport, ClusterTransport};
use std::sync::Arc;

/// Immutable handle to a cluster on a device
///
/// Clones share the attribute cache and the transport.
#[derive(Clone)]
pub struct ClusterBinding {
    address: ClusterAddress,
    unique_id: Arc<str>,
    cluster_name: Arc<str>,
    attributes: Arc<AttributeTable>,
    cache: Arc<AttributeCache>,
    transport: Arc<dyn ClusterTransport>,
}

impl ClusterBinding {
    pub fn new(
        transport: Arc<dyn ClusterTransport>,
        endpoint: u8,
        cluster_id: ClusterId,
        cluster_name: impl Into<Arc<str>>,
        attributes: AttributeTable,
    ) -> Self {
        let address = ClusterAddress::new(transport.ieee(), endpoint, cluster_id);
        Self {
            unique_id: address.unique_id().into(),
            address,
            cluster_name: cluster_name.into(),
            attributes: Arc::new(attributes),
            cache: Arc::new(AttributeCache::new()),
            transport,
        }
    }

    /// Bind a cluster whose attribute table is known to `conduit_core::cluster`
    pub fn known(transport: Arc<dyn ClusterTransport>, endpoint: u8, cluster_id: ClusterId) -> Option<Self> {
        let def = cluster::lookup(cluster_id)?;
        Some(Self::new(transport, endpoint, cluster_id, def.name, def.table()))
    }

    pub fn address(&self) -> &ClusterAddress {
        &self.address
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn endpoint(&self) -> u8 {
        self.address.endpoint
    }

    pub fn cluster_id(&self) -> ClusterId {
        self.address.cluster_id
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<dyn ClusterTransport> {
        &self.transport
    }

    /// Whether a report from the device feed targets this cluster
    pub fn owns(&self, report: &AttributeReport) -> bool {
        report.endpoint == self.address.endpoint && report.cluster_id == self.address.cluster_id
    }

    /// Record a report for this cluster in the cache
    ///
    /// Returns false, leaving the cache alone, when the report belongs to
    /// another cluster.
    pub fn apply_report(&self, report: &AttributeReport) -> bool {
        if !self.owns(report) {
            return false;
        }
        self.cache
            .insert(report.attribute_id, report.value.clone(), CacheSource::Report);
        true
    }
}

impl std::fmt::Debug for ClusterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterBinding")
            .field("unique_id", &self.unique_id)
            .field("cluster_name", &self.cluster_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::cluster::id;
    use conduit_core::AttributeValue;
    use conduit_transport::{SimulatedConfig, SimulatedDevice};

    #[test]
    fn test_known_binding() {
        let device = Arc::new(SimulatedDevice::new("00:0d:6f:00:0a:90:69:e7", SimulatedConfig::default()));
        let binding = ClusterBinding::known(device, 1, id::THERMOSTAT).unwrap();
        assert_eq!(binding.unique_id(), "00:0d:6f:00:0a:90:69:e7:1:0x0201");
        assert_eq!(
            binding.address(),
            &ClusterAddress::new("00:0d:6f:00:0a:90:69:e7", 1, id::THERMOSTAT)
        );
        assert_eq!(binding.cluster_name(), "Thermostat");
        assert_eq!(binding.attributes().id_of("system_mode"), Some(0x001c));
    }

    #[test]
    fn test_unknown_cluster_has_no_binding() {
        let device = Arc::new(SimulatedDevice::new("aa", SimulatedConfig::default()));
        assert!(ClusterBinding::known(device, 1, 0x0006).is_none());
    }

    #[test]
    fn test_apply_report_filters_cluster() {
        let device = Arc::new(SimulatedDevice::new("aa", SimulatedConfig::default()));
        let binding = ClusterBinding::known(device, 1, id::FAN).unwrap();

        let other = AttributeReport::new(2, id::FAN, 0x0000, AttributeValue::UInt(1));
        assert!(!binding.apply_report(&other));
        assert!(binding.cache().is_empty());

        let ours = AttributeReport::new(1, id::FAN, 0x0000, AttributeValue::UInt(3));
        assert!(binding.apply_report(&ours));
        assert_eq!(binding.cache().get(0x0000), Some(AttributeValue::UInt(3)));
    }
}
