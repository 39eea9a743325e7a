//! Reporting policies and their concrete interval/threshold triples

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeId;

/// Longest interval between reports, in seconds
pub const REPORT_MAX_INTERVAL: u16 = 900;
pub const REPORT_MAX_INTERVAL_BATTERY_SAVE: u16 = 10800;
/// Shortest interval between reports, in seconds
pub const REPORT_MIN_INTERVAL: u16 = 30;
pub const REPORT_MIN_INTERVAL_ASAP: u16 = 1;
pub const REPORT_MIN_INTERVAL_IMMEDIATE: u16 = 0;
pub const REPORT_MIN_INTERVAL_OPERATIONAL: u16 = 5;
pub const REPORT_MIN_INTERVAL_BATTERY_SAVE: u16 = 3600;
/// Smallest change that triggers a report
pub const REPORT_CHANGE: u32 = 1;

/// How eagerly the remote device should push an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPolicy {
    /// Periodic low-rate reporting
    Default,
    /// Report as soon as possible, capped at one per second
    Asap,
    /// Infrequent reporting for battery powered devices
    BatterySave,
    /// No minimum delay; setpoints, modes, and other safety-relevant values
    Immediate,
    /// Change-triggered reporting for high-churn operational state
    Operational,
}

impl ReportPolicy {
    /// `(min_interval, max_interval, reportable_change)`
    pub fn intervals(self) -> (u16, u16, u32) {
        match self {
            Self::Default => (REPORT_MIN_INTERVAL, REPORT_MAX_INTERVAL, REPORT_CHANGE),
            Self::Asap => (REPORT_MIN_INTERVAL_ASAP, REPORT_MAX_INTERVAL, REPORT_CHANGE),
            Self::BatterySave => (
                REPORT_MIN_INTERVAL_BATTERY_SAVE,
                REPORT_MAX_INTERVAL_BATTERY_SAVE,
                REPORT_CHANGE,
            ),
            Self::Immediate => (REPORT_MIN_INTERVAL_IMMEDIATE, REPORT_MAX_INTERVAL, REPORT_CHANGE),
            Self::Operational => (REPORT_MIN_INTERVAL_OPERATIONAL, REPORT_MAX_INTERVAL, REPORT_CHANGE),
        }
    }
}

/// Static reporting declaration of a channel variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    pub attribute: &'static str,
    pub policy: ReportPolicy,
}

impl ReportConfig {
    pub const fn new(attribute: &'static str, policy: ReportPolicy) -> Self {
        Self { attribute, policy }
    }
}

/// A single configure-reporting request as sent to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingRequest {
    pub attribute_id: AttributeId,
    pub min_interval: u16,
    pub max_interval: u16,
    pub reportable_change: u32,
}

impl ReportingRequest {
    pub fn new(attribute_id: AttributeId, policy: ReportPolicy) -> Self {
        let (min_interval, max_interval, reportable_change) = policy.intervals();
        Self {
            attribute_id,
            min_interval,
            max_interval,
            reportable_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_intervals() {
        assert_eq!(ReportPolicy::Default.intervals(), (30, 900, 1));
        assert_eq!(ReportPolicy::Asap.intervals(), (1, 900, 1));
        assert_eq!(ReportPolicy::Immediate.intervals(), (0, 900, 1));
        assert_eq!(ReportPolicy::Operational.intervals(), (5, 900, 1));
        assert_eq!(ReportPolicy::BatterySave.intervals(), (3600, 10800, 1));
    }

    #[test]
    fn test_request_from_policy() {
        let req = ReportingRequest::new(0x0012, ReportPolicy::Immediate);
        assert_eq!(req.attribute_id, 0x0012);
        assert_eq!(req.min_interval, 0);
        assert_eq!(req.max_interval, 900);
    }
}
