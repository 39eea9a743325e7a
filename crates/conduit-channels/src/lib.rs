//! Conduit Channels - Per-cluster adapters between devices and applications
//!
//! A channel is bound to one cluster on one device. It:
//! - Configures the device to push reports for the attributes it cares about
//! - Primes the attribute cache from cached or live reads
//! - Turns numeric attribute reports into named events on the dispatch bus
//! - Exposes setters that never fail on a lost write

pub mod accessor;
pub mod binding;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod hvac;
pub mod registry;
pub mod reporting;

#[cfg(test)]
mod testing;

pub use accessor::AttributeAccessor;
pub use binding::ClusterBinding;
pub use channel::{ChannelCore, ChannelStatus, ClusterChannel, ConfigureOutcome, InitOutcome};
pub use dispatch::{Dispatcher, Signal, SignalKey, SignalPayload};
pub use error::{AccessError, ConfigurationError, DeliveryError, RegistryError};
pub use hvac::{DehumidificationChannel, FanChannel, PumpChannel, ThermostatChannel, UserInterfaceChannel};
pub use registry::{Channel, ChannelConstructor, ChannelRegistry};
pub use reporting::{ReportingConfigurator, ReportingOutcome, ResolvedReport};
