//! Cluster id to channel variant mapping
//!
//! The registry is filled once at start-up through explicit `register` calls
//! (or [`ChannelRegistry::hvac`]) and then used to turn cluster bindings into
//! channels during device bring-up.

use conduit_core::cluster::id;
use conduit_core::ClusterId;
use conduit_transport::AttributeReport;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binding::ClusterBinding;
use crate::channel::{ChannelCore, ChannelStatus, ClusterChannel, ConfigureOutcome, InitOutcome};
use crate::dispatch::Dispatcher;
use crate::error::RegistryError;
use crate::hvac::{DehumidificationChannel, FanChannel, PumpChannel, ThermostatChannel, UserInterfaceChannel};

/// Any channel the registry can create
#[derive(Debug)]
pub enum Channel {
    Thermostat(ThermostatChannel),
    Fan(FanChannel),
    Pump(PumpChannel),
    Dehumidification(DehumidificationChannel),
    UserInterface(UserInterfaceChannel),
}

impl Channel {
    pub fn core(&self) -> &ChannelCore {
        match self {
            Channel::Thermostat(c) => c.core(),
            Channel::Fan(c) => c.core(),
            Channel::Pump(c) => c.core(),
            Channel::Dehumidification(c) => c.core(),
            Channel::UserInterface(c) => c.core(),
        }
    }

    pub fn unique_id(&self) -> &str {
        self.core().unique_id()
    }

    pub fn name(&self) -> &'static str {
        self.core().name()
    }

    pub fn status(&self) -> ChannelStatus {
        self.core().status()
    }

    pub fn as_thermostat(&self) -> Option<&ThermostatChannel> {
        match self {
            Channel::Thermostat(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_fan(&self) -> Option<&FanChannel> {
        match self {
            Channel::Fan(c) => Some(c),
            _ => None,
        }
    }

    /// Configure reporting, then run `initialize(false)`
    pub async fn configure(&self) -> ConfigureOutcome {
        match self {
            Channel::Thermostat(c) => c.configure().await,
            Channel::Fan(c) => c.configure().await,
            Channel::Pump(c) => c.configure().await,
            Channel::Dehumidification(c) => c.configure().await,
            Channel::UserInterface(c) => c.configure().await,
        }
    }

    /// Re-prime cached values without touching reporting configuration
    pub async fn initialize(&self, from_cache: bool) -> InitOutcome {
        match self {
            Channel::Thermostat(c) => c.initialize(from_cache).await,
            Channel::Fan(c) => c.initialize(from_cache).await,
            Channel::Pump(c) => c.initialize(from_cache).await,
            Channel::Dehumidification(c) => c.initialize(from_cache).await,
            Channel::UserInterface(c) => c.initialize(from_cache).await,
        }
    }

    pub fn handle_report(&self, report: &AttributeReport) {
        match self {
            Channel::Thermostat(c) => c.handle_report(report),
            Channel::Fan(c) => c.handle_report(report),
            Channel::Pump(c) => c.handle_report(report),
            Channel::Dehumidification(c) => c.handle_report(report),
            Channel::UserInterface(c) => c.handle_report(report),
        }
    }

    /// Consume the device's report feed on a background task
    ///
    /// Reports for this cluster are cached and passed to the variant's report
    /// handler. The task ends as soon as the channel is dropped or the feed
    /// closes.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.core().binding().transport().subscribe_reports();
        let mut shutdown = self.core().shutdown_signal();
        let channel: Weak<Self> = Arc::downgrade(self);
        let unique_id = self.unique_id().to_string();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    // Nothing is ever sent; this only resolves when the core drops
                    _ = shutdown.changed() => break,
                    received = rx.recv() => received,
                };

                match received {
                    Ok(report) => {
                        let Some(channel) = channel.upgrade() else {
                            break;
                        };
                        if channel.core().binding().apply_report(&report) {
                            channel.handle_report(&report);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %unique_id, skipped = skipped, "Report feed lagged, reports dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(channel = %unique_id, "Report listener stopped");
        })
    }
}

/// Builds a channel for a binding
pub type ChannelConstructor = fn(ClusterBinding, Dispatcher) -> Channel;

pub struct ChannelRegistry {
    dispatcher: Dispatcher,
    constructors: HashMap<ClusterId, ChannelConstructor>,
    climate: HashSet<ClusterId>,
}

impl ChannelRegistry {
    /// Empty registry publishing on `dispatcher`
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            constructors: HashMap::new(),
            climate: HashSet::new(),
        }
    }

    /// Registry with every HVAC channel variant
    pub fn hvac(dispatcher: Dispatcher) -> Self {
        let mut registry = Self::new(dispatcher);
        registry.register(id::PUMP, |b, d| Channel::Pump(PumpChannel::new(b, d)));
        registry.register(id::THERMOSTAT, |b, d| Channel::Thermostat(ThermostatChannel::new(b, d)));
        registry.register(id::FAN, |b, d| Channel::Fan(FanChannel::new(b, d)));
        registry.register(id::DEHUMIDIFICATION, |b, d| {
            Channel::Dehumidification(DehumidificationChannel::new(b, d))
        });
        registry.register(id::USER_INTERFACE, |b, d| {
            Channel::UserInterface(UserInterfaceChannel::new(b, d))
        });
        registry.mark_climate(id::THERMOSTAT);
        registry.mark_climate(id::FAN);
        registry
    }

    /// Register a constructor, returning the one it replaces
    pub fn register(&mut self, cluster_id: ClusterId, constructor: ChannelConstructor) -> Option<ChannelConstructor> {
        debug!(cluster = cluster_id, "Registered channel constructor");
        self.constructors.insert(cluster_id, constructor)
    }

    /// Flag a cluster as driving a climate entity
    pub fn mark_climate(&mut self, cluster_id: ClusterId) {
        self.climate.insert(cluster_id);
    }

    pub fn is_registered(&self, cluster_id: ClusterId) -> bool {
        self.constructors.contains_key(&cluster_id)
    }

    pub fn is_climate(&self, cluster_id: ClusterId) -> bool {
        self.climate.contains(&cluster_id)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Create the channel registered for `cluster_id`
    pub fn create(&self, cluster_id: ClusterId, binding: ClusterBinding) -> Result<Arc<Channel>, RegistryError> {
        let constructor = self
            .constructors
            .get(&cluster_id)
            .ok_or(RegistryError::Unregistered(cluster_id))?;

        if binding.cluster_id() != cluster_id {
            return Err(RegistryError::ClusterMismatch {
                unique_id: binding.unique_id().to_string(),
                requested: cluster_id,
                actual: binding.cluster_id(),
            });
        }

        let channel = constructor(binding, self.dispatcher.clone());
        info!(channel = %channel.unique_id(), kind = channel.name(), "Created channel");
        Ok(Arc::new(channel))
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut clusters: Vec<_> = self.constructors.keys().copied().collect();
        clusters.sort_unstable();
        f.debug_struct("ChannelRegistry")
            .field("clusters", &clusters)
            .finish_non_exhaustive()
    }
}
