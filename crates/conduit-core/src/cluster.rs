//! Cluster addressing and the HVAC cluster attribute tables

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeId, AttributeTable};

/// Numeric cluster identifier
pub type ClusterId = u16;

/// Location of one cluster on one remote device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterAddress {
    /// Device IEEE address (e.g. "00:0d:6f:00:0a:90:69:e7")
    pub ieee: String,
    /// Endpoint the cluster lives on
    pub endpoint: u8,
    pub cluster_id: ClusterId,
}

impl ClusterAddress {
    pub fn new(ieee: impl Into<String>, endpoint: u8, cluster_id: ClusterId) -> Self {
        Self {
            ieee: ieee.into(),
            endpoint,
            cluster_id,
        }
    }

    /// Device-scoped id, stable for the lifetime of the binding
    pub fn unique_id(&self) -> String {
        format!("{}:{}:0x{:04x}", self.ieee, self.endpoint, self.cluster_id)
    }
}

impl std::fmt::Display for ClusterAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unique_id())
    }
}

/// HVAC cluster ids
pub mod id {
    use super::ClusterId;

    pub const PUMP: ClusterId = 0x0200;
    pub const THERMOSTAT: ClusterId = 0x0201;
    pub const FAN: ClusterId = 0x0202;
    pub const DEHUMIDIFICATION: ClusterId = 0x0203;
    pub const USER_INTERFACE: ClusterId = 0x0204;
}

const PUMP_ATTRIBUTES: &[(AttributeId, &str)] = &[
    (0x0000, "max_pressure"),
    (0x0001, "max_speed"),
    (0x0002, "max_flow"),
    (0x0003, "min_const_pressure"),
    (0x0004, "max_const_pressure"),
    (0x0005, "min_comp_pressure"),
    (0x0006, "max_comp_pressure"),
    (0x0007, "min_const_speed"),
    (0x0008, "max_const_speed"),
    (0x0009, "min_const_flow"),
    (0x000a, "max_const_flow"),
    (0x000b, "min_const_temp"),
    (0x000c, "max_const_temp"),
    (0x0010, "pump_status"),
    (0x0011, "effective_operation_mode"),
    (0x0012, "effective_control_mode"),
    (0x0013, "capacity"),
    (0x0014, "speed"),
    (0x0015, "lifetime_running_hours"),
    (0x0016, "power"),
    (0x0017, "lifetime_energy_consumed"),
    (0x0020, "operation_mode"),
    (0x0021, "control_mode"),
    (0x0022, "alarm_mask"),
];

const THERMOSTAT_ATTRIBUTES: &[(AttributeId, &str)] = &[
    (0x0000, "local_temp"),
    (0x0001, "outdoor_temp"),
    (0x0002, "occupancy"),
    (0x0003, "abs_min_heat_setpoint_limit"),
    (0x0004, "abs_max_heat_setpoint_limit"),
    (0x0005, "abs_min_cool_setpoint_limit"),
    (0x0006, "abs_max_cool_setpoint_limit"),
    (0x0007, "pi_cooling_demand"),
    (0x0008, "pi_heating_demand"),
    (0x0009, "system_type_config"),
    (0x0010, "local_temperature_calibration"),
    (0x0011, "occupied_cooling_setpoint"),
    (0x0012, "occupied_heating_setpoint"),
    (0x0013, "unoccupied_cooling_setpoint"),
    (0x0014, "unoccupied_heating_setpoint"),
    (0x0015, "min_heat_setpoint_limit"),
    (0x0016, "max_heat_setpoint_limit"),
    (0x0017, "min_cool_setpoint_limit"),
    (0x0018, "max_cool_setpoint_limit"),
    (0x0019, "min_setpoint_dead_band"),
    (0x001a, "remote_sensing"),
    (0x001b, "ctrl_seqe_of_oper"),
    (0x001c, "system_mode"),
    (0x001d, "alarm_mask"),
    (0x001e, "running_mode"),
    (0x0020, "start_of_week"),
    (0x0021, "number_of_weekly_transitions"),
    (0x0022, "number_of_daily_transitions"),
    (0x0023, "temp_setpoint_hold"),
    (0x0024, "temp_setpoint_hold_duration"),
    (0x0025, "programing_oper_mode"),
    (0x0029, "running_state"),
    (0x0030, "setpoint_change_source"),
    (0x0031, "setpoint_change_amount"),
    (0x0032, "setpoint_change_source_time_stamp"),
];

const FAN_ATTRIBUTES: &[(AttributeId, &str)] = &[
    (0x0000, "fan_mode"),
    (0x0001, "fan_mode_sequence"),
];

const DEHUMIDIFICATION_ATTRIBUTES: &[(AttributeId, &str)] = &[
    (0x0000, "relative_humidity"),
    (0x0001, "dehumidification_cooling"),
    (0x0010, "rh_dehumidification_setpoint"),
    (0x0011, "relative_humidity_mode"),
    (0x0012, "dehumidification_lockout"),
    (0x0013, "dehumidification_hysteresis"),
    (0x0014, "dehumidification_max_cool"),
    (0x0015, "relative_humidity_display"),
];

const USER_INTERFACE_ATTRIBUTES: &[(AttributeId, &str)] = &[
    (0x0000, "temp_display_mode"),
    (0x0001, "keypad_lockout"),
    (0x0002, "programming_visibility"),
];

/// Static description of a known cluster
#[derive(Debug, Clone, Copy)]
pub struct ClusterDef {
    pub id: ClusterId,
    pub name: &'static str,
    pub attributes: &'static [(AttributeId, &'static str)],
}

impl ClusterDef {
    pub fn table(&self) -> AttributeTable {
        AttributeTable::from_static(self.attributes)
    }
}

const HVAC_CLUSTERS: &[ClusterDef] = &[
    ClusterDef {
        id: id::PUMP,
        name: "Pump Configuration and Control",
        attributes: PUMP_ATTRIBUTES,
    },
    ClusterDef {
        id: id::THERMOSTAT,
        name: "Thermostat",
        attributes: THERMOSTAT_ATTRIBUTES,
    },
    ClusterDef {
        id: id::FAN,
        name: "Fan Control",
        attributes: FAN_ATTRIBUTES,
    },
    ClusterDef {
        id: id::DEHUMIDIFICATION,
        name: "Dehumidification Control",
        attributes: DEHUMIDIFICATION_ATTRIBUTES,
    },
    ClusterDef {
        id: id::USER_INTERFACE,
        name: "Thermostat User Interface Configuration",
        attributes: USER_INTERFACE_ATTRIBUTES,
    },
];

/// Look up a known cluster definition by id
pub fn lookup(cluster_id: ClusterId) -> Option<&'static ClusterDef> {
    HVAC_CLUSTERS.iter().find(|def| def.id == cluster_id)
}

/// All known cluster definitions
pub fn known_clusters() -> &'static [ClusterDef] {
    HVAC_CLUSTERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_format() {
        let addr = ClusterAddress::new("00:0d:6f:00:0a:90:69:e7", 1, id::THERMOSTAT);
        assert_eq!(addr.unique_id(), "00:0d:6f:00:0a:90:69:e7:1:0x0201");
    }

    #[test]
    fn test_thermostat_table() {
        let table = lookup(id::THERMOSTAT).unwrap().table();
        assert_eq!(table.id_of("occupied_heating_setpoint"), Some(0x0012));
        assert_eq!(table.id_of("running_state"), Some(0x0029));
        assert_eq!(table.name_of(0x001c), Some("system_mode"));
    }

    #[test]
    fn test_tables_have_unique_ids_and_names() {
        for def in known_clusters() {
            let table = def.table();
            assert_eq!(table.len(), def.attributes.len(), "duplicate entry in {}", def.name);
        }
    }

    #[test]
    fn test_lookup_unknown_cluster() {
        assert!(lookup(0x0006).is_none());
    }
}
