//! Error types for channel operations

use conduit_core::ClusterId;
use conduit_transport::TransportError;
use thiserror::Error;

/// A read could not complete
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Attribute '{attribute}' is not defined on cluster {cluster}")]
    UnknownAttribute { cluster: String, attribute: String },
    #[error("Reading '{attribute}' failed: {source}")]
    Transport {
        attribute: String,
        #[source]
        source: TransportError,
    },
}

/// A write could not be delivered
///
/// Never escapes a channel setter; it is logged and dropped there.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Attribute '{attribute}' is not defined on cluster {cluster}")]
    UnknownAttribute { cluster: String, attribute: String },
    #[error("Writing {attributes:?} failed: {source}")]
    Failed {
        attributes: Vec<String>,
        #[source]
        source: TransportError,
    },
}

/// A channel declares an attribute its cluster does not define
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Channel {channel} references attribute '{attribute}' missing from cluster {cluster}")]
pub struct ConfigurationError {
    pub channel: String,
    pub cluster: String,
    pub attribute: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No channel registered for cluster 0x{0:04x}")]
    Unregistered(ClusterId),
    #[error("Binding {unique_id} is for cluster 0x{actual:04x}, not 0x{requested:04x}")]
    ClusterMismatch {
        unique_id: String,
        requested: ClusterId,
        actual: ClusterId,
    },
}
