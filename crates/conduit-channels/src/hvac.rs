//! HVAC channel variants

use async_trait::async_trait;
use conduit_core::{AttributeName, AttributeValue, ReportConfig, ReportPolicy};
use conduit_transport::AttributeReport;
use tracing::debug;

use crate::binding::ClusterBinding;
use crate::channel::{core_for, ChannelCore, ClusterChannel};
use crate::dispatch::{Dispatcher, Signal};
use crate::error::AccessError;

pub const FAN_MODE: &str = "fan_mode";

/// Thermostat cluster channel
#[derive(Debug)]
pub struct ThermostatChannel {
    core: ChannelCore,
}

impl ThermostatChannel {
    pub fn new(binding: ClusterBinding, dispatcher: Dispatcher) -> Self {
        Self {
            core: core_for::<Self>(binding, dispatcher),
        }
    }

    pub async fn set_hold_mode(&self, value: impl Into<AttributeValue>) {
        self.core
            .write_isolated("temp_setpoint_hold", value.into(), "hold mode")
            .await;
    }

    pub async fn set_cooling_setpoint(&self, value: impl Into<AttributeValue>) {
        self.core
            .write_isolated("occupied_cooling_setpoint", value.into(), "cooling setpoint")
            .await;
    }

    pub async fn set_heating_setpoint(&self, value: impl Into<AttributeValue>) {
        self.core
            .write_isolated("occupied_heating_setpoint", value.into(), "heating setpoint")
            .await;
    }

    pub async fn set_system_mode(&self, value: impl Into<AttributeValue>) {
        self.core
            .write_isolated("system_mode", value.into(), "system mode")
            .await;
    }
}

#[async_trait]
impl ClusterChannel for ThermostatChannel {
    const NAME: &'static str = "thermostat";

    const REPORT_CONFIG: &'static [ReportConfig] = &[
        ReportConfig::new("local_temp", ReportPolicy::Default),
        ReportConfig::new("occupied_cooling_setpoint", ReportPolicy::Immediate),
        ReportConfig::new("occupied_heating_setpoint", ReportPolicy::Immediate),
        ReportConfig::new("system_mode", ReportPolicy::Immediate),
        ReportConfig::new("running_state", ReportPolicy::Immediate),
        ReportConfig::new("temp_setpoint_hold", ReportPolicy::Immediate),
    ];

    const INIT_ATTRIBUTES: &'static [&'static str] = &[
        "local_temp",
        "occupied_cooling_setpoint",
        "occupied_heating_setpoint",
        "min_heat_setpoint_limit",
        "max_heat_setpoint_limit",
        "min_cool_setpoint_limit",
        "max_cool_setpoint_limit",
        "ctrl_seqe_of_oper",
        "system_mode",
        "running_state",
        "temp_setpoint_hold",
    ];

    fn core(&self) -> &ChannelCore {
        &self.core
    }
}

/// Fan control cluster channel
///
/// Besides `AttributeUpdated`, fan mode changes are also published on the
/// narrower `SetFan` signal.
#[derive(Debug)]
pub struct FanChannel {
    core: ChannelCore,
}

impl FanChannel {
    pub fn new(binding: ClusterBinding, dispatcher: Dispatcher) -> Self {
        Self {
            core: core_for::<Self>(binding, dispatcher),
        }
    }

    pub async fn set_speed(&self, value: impl Into<AttributeValue>) {
        self.core.write_isolated(FAN_MODE, value.into(), "speed").await;
    }

    /// Re-publish the last known fan mode on `SetFan`
    pub async fn update(&self) -> Result<AttributeValue, AccessError> {
        let value = self.core.get_attribute_value(FAN_MODE, true).await?;
        self.core.publish(
            Signal::SetFan,
            AttributeName::Known(FAN_MODE.to_string()),
            value.clone(),
        );
        Ok(value)
    }
}

#[async_trait]
impl ClusterChannel for FanChannel {
    const NAME: &'static str = "fan";

    const REPORT_CONFIG: &'static [ReportConfig] = &[ReportConfig::new(FAN_MODE, ReportPolicy::Operational)];

    const INIT_ATTRIBUTES: &'static [&'static str] = &[FAN_MODE, "fan_mode_sequence"];

    fn core(&self) -> &ChannelCore {
        &self.core
    }

    fn handle_report(&self, report: &AttributeReport) {
        let name = self.core.publish_attribute(report);
        if name.is(FAN_MODE) {
            debug!(channel = %self.core.unique_id(), value = %report.value, "Fan speed changed");
            self.core.publish(Signal::SetFan, name, report.value.clone());
        }
    }
}

/// Pump configuration and control channel (reports forwarded only)
#[derive(Debug)]
pub struct PumpChannel {
    core: ChannelCore,
}

impl PumpChannel {
    pub fn new(binding: ClusterBinding, dispatcher: Dispatcher) -> Self {
        Self {
            core: core_for::<Self>(binding, dispatcher),
        }
    }
}

#[async_trait]
impl ClusterChannel for PumpChannel {
    const NAME: &'static str = "pump";
    const REPORT_CONFIG: &'static [ReportConfig] = &[];
    const INIT_ATTRIBUTES: &'static [&'static str] = &[];

    fn core(&self) -> &ChannelCore {
        &self.core
    }
}

/// Dehumidification control channel (reports forwarded only)
#[derive(Debug)]
pub struct DehumidificationChannel {
    core: ChannelCore,
}

impl DehumidificationChannel {
    pub fn new(binding: ClusterBinding, dispatcher: Dispatcher) -> Self {
        Self {
            core: core_for::<Self>(binding, dispatcher),
        }
    }
}

#[async_trait]
impl ClusterChannel for DehumidificationChannel {
    const NAME: &'static str = "dehumidification";
    const REPORT_CONFIG: &'static [ReportConfig] = &[];
    const INIT_ATTRIBUTES: &'static [&'static str] = &[];

    fn core(&self) -> &ChannelCore {
        &self.core
    }
}

/// Thermostat user interface configuration channel (reports forwarded only)
#[derive(Debug)]
pub struct UserInterfaceChannel {
    core: ChannelCore,
}

impl UserInterfaceChannel {
    pub fn new(binding: ClusterBinding, dispatcher: Dispatcher) -> Self {
        Self {
            core: core_for::<Self>(binding, dispatcher),
        }
    }
}

#[async_trait]
impl ClusterChannel for UserInterfaceChannel {
    const NAME: &'static str = "user_interface";
    const REPORT_CONFIG: &'static [ReportConfig] = &[];
    const INIT_ATTRIBUTES: &'static [&'static str] = &[];

    fn core(&self) -> &ChannelCore {
        &self.core
    }
}
