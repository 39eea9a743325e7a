//! Shared fixtures for channel tests

use conduit_core::cluster::id;
use conduit_core::{AttributeValue, ClusterId};
use conduit_transport::{SimulatedConfig, SimulatedDevice};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::binding::ClusterBinding;
use crate::dispatch::SignalPayload;

pub const IEEE: &str = "00:0d:6f:00:0a:90:69:e7";

/// Device exposing every HVAC cluster on endpoint 1
pub fn hvac_device() -> Arc<SimulatedDevice> {
    let device = Arc::new(SimulatedDevice::new(IEEE, SimulatedConfig::default()));
    device.add_cluster(
        1,
        id::THERMOSTAT,
        [
            (0x0000, AttributeValue::Int(2150)),
            (0x0011, AttributeValue::Int(2600)),
            (0x0012, AttributeValue::Int(2000)),
            (0x0015, AttributeValue::Int(700)),
            (0x0016, AttributeValue::Int(3000)),
            (0x0017, AttributeValue::Int(1600)),
            (0x0018, AttributeValue::Int(3200)),
            (0x001b, AttributeValue::UInt(4)),
            (0x001c, AttributeValue::UInt(4)),
            (0x0029, AttributeValue::UInt(0)),
            (0x0023, AttributeValue::UInt(0)),
        ],
    );
    device.add_cluster(1, id::FAN, [(0x0000, AttributeValue::UInt(1)), (0x0001, AttributeValue::UInt(2))]);
    device.add_cluster(1, id::PUMP, [(0x0010, AttributeValue::UInt(0))]);
    device.add_cluster(1, id::DEHUMIDIFICATION, [(0x0000, AttributeValue::UInt(45))]);
    device.add_cluster(1, id::USER_INTERFACE, [(0x0000, AttributeValue::UInt(0))]);
    device
}

pub fn bind(device: &Arc<SimulatedDevice>, cluster_id: ClusterId) -> ClusterBinding {
    ClusterBinding::known(device.clone(), 1, cluster_id).expect("known cluster")
}

/// Next payload, failing the test if none arrives promptly
pub async fn next(rx: &mut broadcast::Receiver<SignalPayload>) -> SignalPayload {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("no event within 1s")
        .expect("bus closed")
}

/// Assert no further payload arrives within a short window
pub async fn assert_quiet(rx: &mut broadcast::Receiver<SignalPayload>) {
    let extra = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(extra.is_err(), "unexpected extra event: {:?}", extra);
}

/// Check captured log lines hold exactly one write failure for `attribute`
/// on channel `unique_id`
pub fn one_write_failure(lines: &[&str], unique_id: &str, attribute: &str) -> Result<(), String> {
    let failures: Vec<_> = lines
        .iter()
        .filter(|line| line.contains("Could not set") && line.contains(unique_id))
        .collect();
    match failures.as_slice() {
        [line] if line.contains("attribute=") && line.contains(attribute) => Ok(()),
        [line] => Err(format!("failure line does not name {}: {}", attribute, line)),
        other => Err(format!("expected one failure line, got {}", other.len())),
    }
}
