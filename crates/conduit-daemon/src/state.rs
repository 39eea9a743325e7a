//! Device bring-up and channel lifecycle

use anyhow::Result;
use conduit_channels::{Channel, ChannelRegistry, ClusterBinding, Dispatcher, Signal};
use conduit_core::{AttributeValue, ClusterId};
use conduit_transport::SimulatedDevice;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Event bus every channel publishes on
    pub dispatcher: Dispatcher,
    pub registry: ChannelRegistry,
    /// Simulated devices, in configuration order
    pub devices: Vec<Arc<SimulatedDevice>>,
    /// Channels created for every supported cluster
    pub channels: Vec<Arc<Channel>>,
}

/// Cached state of one channel, as printed by `--once`
#[derive(Debug, Serialize)]
pub struct ChannelSnapshot {
    pub kind: &'static str,
    pub cluster: String,
    pub status: String,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AppState {
    /// Create devices and one channel per configured cluster
    pub fn new(config: &Config) -> Self {
        let dispatcher = Dispatcher::default();
        let registry = ChannelRegistry::hvac(dispatcher.clone());
        let mut devices = Vec::with_capacity(config.devices.len());
        let mut channels = Vec::new();

        for device_config in &config.devices {
            let device = Arc::new(SimulatedDevice::new(
                device_config.ieee.clone(),
                config.daemon.to_simulated_config(),
            ));

            let mut initial: HashMap<ClusterId, Vec<_>> = HashMap::new();
            // Keys were checked by load_config
            for (cluster_id, attribute_id, value) in device_config.initial_values().unwrap_or_default() {
                initial.entry(cluster_id).or_default().push((attribute_id, value));
            }

            for &cluster_id in &device_config.clusters {
                device.add_cluster(
                    device_config.endpoint,
                    cluster_id,
                    initial.remove(&cluster_id).unwrap_or_default(),
                );

                let Some(binding) = ClusterBinding::known(device.clone(), device_config.endpoint, cluster_id) else {
                    warn!(device = %device_config.ieee, cluster = cluster_id, "No attribute table for cluster, skipping");
                    continue;
                };

                match registry.create(cluster_id, binding) {
                    Ok(channel) => channels.push(channel),
                    Err(e) => warn!(device = %device_config.ieee, error = %e, "Failed to create channel"),
                }
            }

            debug!(
                device = %device_config.ieee,
                endpoint = device_config.endpoint,
                clusters = device_config.clusters.len(),
                "Simulated device ready"
            );
            devices.push(device);
        }

        info!(devices = devices.len(), channels = channels.len(), "Devices brought up");

        Self {
            dispatcher,
            registry,
            devices,
            channels,
        }
    }

    /// Start report listeners for every channel
    pub fn start_listeners(&self) -> Vec<JoinHandle<()>> {
        self.channels.iter().map(|channel| channel.listen()).collect()
    }

    /// Log every event published by the channels
    pub fn watch_events(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for channel in &self.channels {
            let mut signals = vec![Signal::AttributeUpdated];
            if channel.as_fan().is_some() {
                signals.push(Signal::SetFan);
            }

            for signal in signals {
                let mut rx = self.dispatcher.subscribe(channel.unique_id(), signal);
                let unique_id = channel.unique_id().to_string();
                handles.push(tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(payload) => info!(
                                channel = %unique_id,
                                signal = signal.as_str(),
                                attribute = %payload.attribute,
                                value = %payload.value,
                                "Channel event"
                            ),
                            Err(RecvError::Lagged(skipped)) => {
                                warn!(channel = %unique_id, skipped = skipped, "Event watcher lagged");
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }));
            }
        }
        handles
    }

    /// Configure every channel concurrently and wait for all of them
    pub async fn configure_all(&self) -> Result<()> {
        let handles: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = channel.clone();
                tokio::spawn(async move {
                    let outcome = channel.configure().await;
                    (channel, outcome)
                })
            })
            .collect();

        for handle in handles {
            let (channel, outcome) = handle.await?;
            info!(
                channel = %channel.unique_id(),
                kind = channel.name(),
                climate = self.registry.is_climate(channel.core().binding().cluster_id()),
                reporting_failed = outcome.reporting.failed.len(),
                primed = outcome.init.primed.len(),
                init_failed = outcome.init.failed.len(),
                "Channel ready"
            );
        }
        Ok(())
    }

    /// Cached attribute values of every channel, keyed by unique id
    pub fn snapshot(&self) -> BTreeMap<String, ChannelSnapshot> {
        self.channels
            .iter()
            .map(|channel| {
                let binding = channel.core().binding();
                let attributes = binding
                    .cache()
                    .snapshot()
                    .into_iter()
                    .map(|(attribute_id, value)| (binding.attributes().resolve(attribute_id).to_string(), value))
                    .collect();
                let snapshot = ChannelSnapshot {
                    kind: channel.name(),
                    cluster: binding.cluster_name().to_string(),
                    status: format!("{:?}", channel.status()).to_lowercase(),
                    attributes,
                };
                (channel.unique_id().to_string(), snapshot)
            })
            .collect()
    }
}
