//! In-memory device that speaks the cluster transport interface
//!
//! Used by the daemon to bring channels up without radio hardware, and by
//! tests to inject delivery failures and count live round trips.

use async_trait::async_trait;
use conduit_core::{AttributeId, AttributeValue, ClusterId, ReportingRequest};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use crate::transport::{AttributeReport, ClusterTransport, TransportError};

/// Default response timeout for simulated requests
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Capacity of the report broadcast feed
pub const DEFAULT_REPORT_BUFFER: usize = 100;

#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Artificial round-trip latency
    pub latency_ms: u64,
    /// Give up on a request after this long
    pub timeout_ms: u64,
    pub report_buffer: usize,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            report_buffer: DEFAULT_REPORT_BUFFER,
        }
    }
}

/// Count of round trips served, per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub binds: usize,
    pub reads: usize,
    pub writes: usize,
    pub reporting: usize,
}

#[derive(Debug, Default)]
struct Faults {
    unresponsive: bool,
    bind: bool,
    writes: bool,
    reads: HashSet<AttributeId>,
    all_reads: bool,
    reporting: HashSet<AttributeId>,
}

type ClusterKey = (u8, ClusterId);

/// A fake remote device with an attribute store per endpoint/cluster
pub struct SimulatedDevice {
    ieee: String,
    config: SimulatedConfig,
    clusters: RwLock<HashMap<ClusterKey, HashMap<AttributeId, AttributeValue>>>,
    reporting: RwLock<HashMap<(u8, ClusterId, AttributeId), ReportingRequest>>,
    bound: RwLock<HashSet<ClusterKey>>,
    faults: RwLock<Faults>,
    stats: Mutex<OperationStats>,
    report_tx: broadcast::Sender<AttributeReport>,
}

impl SimulatedDevice {
    pub fn new(ieee: impl Into<String>, config: SimulatedConfig) -> Self {
        let (report_tx, _) = broadcast::channel(config.report_buffer.max(1));
        Self {
            ieee: ieee.into(),
            config,
            clusters: RwLock::new(HashMap::new()),
            reporting: RwLock::new(HashMap::new()),
            bound: RwLock::new(HashSet::new()),
            faults: RwLock::new(Faults::default()),
            stats: Mutex::new(OperationStats::default()),
            report_tx,
        }
    }

    /// Expose a cluster on an endpoint with its initial attribute values
    pub fn add_cluster<I>(&self, endpoint: u8, cluster_id: ClusterId, attributes: I)
    where
        I: IntoIterator<Item = (AttributeId, AttributeValue)>,
    {
        self.clusters
            .write()
            .entry((endpoint, cluster_id))
            .or_default()
            .extend(attributes);
    }

    /// Change a value on the device without emitting a report
    pub fn set_attribute(&self, endpoint: u8, cluster_id: ClusterId, attribute_id: AttributeId, value: AttributeValue) {
        self.clusters
            .write()
            .entry((endpoint, cluster_id))
            .or_default()
            .insert(attribute_id, value);
    }

    /// Current value stored on the device
    pub fn attribute(&self, endpoint: u8, cluster_id: ClusterId, attribute_id: AttributeId) -> Option<AttributeValue> {
        self.clusters
            .read()
            .get(&(endpoint, cluster_id))
            .and_then(|attrs| attrs.get(&attribute_id).cloned())
    }

    /// Change a value on the device and push it as an unsolicited report
    ///
    /// Returns the number of feed subscribers the report reached.
    pub fn inject_report(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        attribute_id: AttributeId,
        value: AttributeValue,
    ) -> usize {
        self.set_attribute(endpoint, cluster_id, attribute_id, value.clone());
        let report = AttributeReport::new(endpoint, cluster_id, attribute_id, value);
        self.report_tx.send(report).unwrap_or(0)
    }

    /// Reporting configuration the device accepted for an attribute
    pub fn reporting_config(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        attribute_id: AttributeId,
    ) -> Option<ReportingRequest> {
        self.reporting
            .read()
            .get(&(endpoint, cluster_id, attribute_id))
            .copied()
    }

    pub fn is_bound(&self, endpoint: u8, cluster_id: ClusterId) -> bool {
        self.bound.read().contains(&(endpoint, cluster_id))
    }

    pub fn stats(&self) -> OperationStats {
        *self.stats.lock()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = OperationStats::default();
    }

    /// Stop answering requests; every call times out
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.faults.write().unresponsive = unresponsive;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.write().writes = fail;
    }

    pub fn fail_bind(&self, fail: bool) {
        self.faults.write().bind = fail;
    }

    pub fn fail_all_reads(&self, fail: bool) {
        self.faults.write().all_reads = fail;
    }

    pub fn fail_read_of(&self, attribute_id: AttributeId) {
        self.faults.write().reads.insert(attribute_id);
    }

    pub fn fail_reporting_of(&self, attribute_id: AttributeId) {
        self.faults.write().reporting.insert(attribute_id);
    }

    pub fn clear_faults(&self) {
        *self.faults.write() = Faults::default();
    }

    /// Wait out latency, or time out when the device is unresponsive
    async fn round_trip(&self) -> Result<(), TransportError> {
        let unresponsive = self.faults.read().unresponsive;
        let latency = Duration::from_millis(self.config.latency_ms);
        let wait = async move {
            if unresponsive {
                std::future::pending::<()>().await;
            }
            if !latency.is_zero() {
                sleep(latency).await;
            }
        };

        timeout(Duration::from_millis(self.config.timeout_ms), wait)
            .await
            .map_err(|_| TransportError::Timeout(self.config.timeout_ms))
    }

    fn ensure_cluster(&self, endpoint: u8, cluster_id: ClusterId) -> Result<(), TransportError> {
        if self.clusters.read().contains_key(&(endpoint, cluster_id)) {
            Ok(())
        } else {
            Err(TransportError::UnsupportedCluster(cluster_id))
        }
    }
}

#[async_trait]
impl ClusterTransport for SimulatedDevice {
    fn ieee(&self) -> &str {
        &self.ieee
    }

    async fn bind(&self, endpoint: u8, cluster_id: ClusterId) -> Result<(), TransportError> {
        self.round_trip().await?;
        self.stats.lock().binds += 1;
        self.ensure_cluster(endpoint, cluster_id)?;

        if self.faults.read().bind {
            return Err(TransportError::DeliveryFailed("bind request not acknowledged".to_string()));
        }

        self.bound.write().insert((endpoint, cluster_id));
        debug!(ieee = %self.ieee, endpoint = endpoint, cluster = cluster_id, "Cluster bound");
        Ok(())
    }

    async fn read_attribute(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        attribute_id: AttributeId,
    ) -> Result<AttributeValue, TransportError> {
        self.round_trip().await?;
        self.stats.lock().reads += 1;
        self.ensure_cluster(endpoint, cluster_id)?;

        {
            let faults = self.faults.read();
            if faults.all_reads || faults.reads.contains(&attribute_id) {
                return Err(TransportError::DeliveryFailed(format!(
                    "read of 0x{:04x} not answered",
                    attribute_id
                )));
            }
        }

        let value = self
            .attribute(endpoint, cluster_id, attribute_id)
            .ok_or(TransportError::UnsupportedAttribute(attribute_id))?;

        trace!(ieee = %self.ieee, cluster = cluster_id, attribute = attribute_id, value = %value, "Served read");
        Ok(value)
    }

    async fn write_attributes(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        values: &[(AttributeId, AttributeValue)],
    ) -> Result<(), TransportError> {
        self.round_trip().await?;
        self.stats.lock().writes += 1;
        self.ensure_cluster(endpoint, cluster_id)?;

        if self.faults.read().writes {
            return Err(TransportError::DeliveryFailed("write request not acknowledged".to_string()));
        }

        {
            let mut clusters = self.clusters.write();
            let attrs = clusters.entry((endpoint, cluster_id)).or_default();
            if let Some((id, _)) = values.iter().find(|(id, _)| !attrs.contains_key(id)) {
                return Err(TransportError::UnsupportedAttribute(*id));
            }
            for (id, value) in values {
                attrs.insert(*id, value.clone());
            }
        }

        // Attributes with reporting configured announce the change
        let reporting = self.reporting.read();
        for (id, value) in values {
            if reporting.contains_key(&(endpoint, cluster_id, *id)) {
                let _ = self
                    .report_tx
                    .send(AttributeReport::new(endpoint, cluster_id, *id, value.clone()));
            }
        }

        Ok(())
    }

    async fn configure_reporting(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        request: ReportingRequest,
    ) -> Result<(), TransportError> {
        self.round_trip().await?;
        self.stats.lock().reporting += 1;
        self.ensure_cluster(endpoint, cluster_id)?;

        if self.faults.read().reporting.contains(&request.attribute_id) {
            return Err(TransportError::Status(0x8c));
        }

        self.reporting
            .write()
            .insert((endpoint, cluster_id, request.attribute_id), request);
        Ok(())
    }

    fn subscribe_reports(&self) -> broadcast::Receiver<AttributeReport> {
        self.report_tx.subscribe()
    }
}
