//! Conduit Core - Attribute types, cluster tables, and attribute cache
//!
//! This crate provides the foundational types for the Conduit system:
//! - Attribute values and the name/id table of a cluster
//! - HVAC cluster definitions (thermostat, fan, pump, ...)
//! - Reporting policies and the requests they translate into
//! - The per-cluster cache of last known attribute values

pub mod attribute;
pub mod cache;
pub mod cluster;
pub mod report;

pub use attribute::{AttributeId, AttributeName, AttributeTable, AttributeValue};
pub use cache::{AttributeCache, CacheSource, CachedAttribute};
pub use cluster::{ClusterAddress, ClusterDef, ClusterId};
pub use report::{ReportConfig, ReportPolicy, ReportingRequest};
