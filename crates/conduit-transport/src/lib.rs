//! Conduit Transport - Device transport interface for cluster channels
//!
//! This crate defines the attribute-level transport that channels talk to,
//! and a simulated in-memory device implementing it.

pub mod simulated;
pub mod transport;

pub use simulated::{OperationStats, SimulatedConfig, SimulatedDevice, DEFAULT_REPORT_BUFFER, DEFAULT_TIMEOUT_MS};
pub use transport::{AttributeReport, ClusterTransport, TransportError};
