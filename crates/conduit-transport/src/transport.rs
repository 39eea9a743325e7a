//! Transport interface consumed by cluster channels

use async_trait::async_trait;
use conduit_core::{AttributeId, AttributeValue, ClusterId, ReportingRequest};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No response within {0} ms")]
    Timeout(u64),
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Unsupported cluster 0x{0:04x}")]
    UnsupportedCluster(ClusterId),
    #[error("Unsupported attribute 0x{0:04x}")]
    UnsupportedAttribute(AttributeId),
    #[error("Device returned status 0x{0:02x}")]
    Status(u8),
}

/// Unsolicited attribute report pushed by a device
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeReport {
    pub endpoint: u8,
    pub cluster_id: ClusterId,
    pub attribute_id: AttributeId,
    pub value: AttributeValue,
}

impl AttributeReport {
    pub fn new(endpoint: u8, cluster_id: ClusterId, attribute_id: AttributeId, value: AttributeValue) -> Self {
        Self {
            endpoint,
            cluster_id,
            attribute_id,
            value,
        }
    }
}

/// Attribute-level access to one remote device
///
/// Every async method is a network round trip; implementations own their
/// timeouts and never retry.
#[async_trait]
pub trait ClusterTransport: Send + Sync {
    /// IEEE address of the device behind this transport
    fn ieee(&self) -> &str;

    /// Ask the device to deliver reports for a cluster to us
    async fn bind(&self, endpoint: u8, cluster_id: ClusterId) -> Result<(), TransportError>;

    async fn read_attribute(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        attribute_id: AttributeId,
    ) -> Result<AttributeValue, TransportError>;

    /// Write all values in one request; either all are accepted or the call fails
    async fn write_attributes(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        values: &[(AttributeId, AttributeValue)],
    ) -> Result<(), TransportError>;

    async fn configure_reporting(
        &self,
        endpoint: u8,
        cluster_id: ClusterId,
        request: ReportingRequest,
    ) -> Result<(), TransportError>;

    /// Feed of unsolicited reports for every cluster on the device
    fn subscribe_reports(&self) -> broadcast::Receiver<AttributeReport>;
}
