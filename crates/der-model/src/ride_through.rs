//! Voltage and frequency ride-through flags.
//!
//! Policies are level-triggered: flags depend only on the present time,
//! voltage and frequency, never on previous evaluations.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideThroughFlags {
    pub voltage_trip: bool,
    pub voltage_reconnect: bool,
    pub frequency_trip: bool,
    pub frequency_reconnect: bool,
}

impl RideThroughFlags {
    pub fn disconnect_required(&self) -> bool {
        (self.voltage_trip && !self.voltage_reconnect)
            || (self.frequency_trip && !self.frequency_reconnect)
    }
}

pub trait RideThroughPolicy {
    /// `voltage` is the PCC RMS voltage relative to rated, `frequency` the
    /// grid frequency relative to nominal.
    fn trip_flags(&self, t: f64, voltage: f64, frequency: f64) -> RideThroughFlags;
}

/// Never trips.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRideThrough;

impl RideThroughPolicy for NoRideThrough {
    fn trip_flags(&self, _t: f64, _voltage: f64, _frequency: f64) -> RideThroughFlags {
        RideThroughFlags::default()
    }
}

/// Returns the same flags at every evaluation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedFlags(pub RideThroughFlags);

impl RideThroughPolicy for FixedFlags {
    fn trip_flags(&self, _t: f64, _voltage: f64, _frequency: f64) -> RideThroughFlags {
        self.0
    }
}

/// Closed interval `[low, high]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.low && v <= self.high
    }
}

/// Trip outside the trip band, allow reconnection inside the reconnect band.
/// Disabled until `t_stable` so start-up transients do not trip the unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRideThrough {
    pub t_stable: f64,
    pub voltage_trip: Band,
    pub voltage_reconnect: Band,
    pub frequency_trip: Band,
    pub frequency_reconnect: Band,
}

impl Default for ThresholdRideThrough {
    fn default() -> Self {
        Self {
            t_stable: 1.0,
            voltage_trip: Band {
                low: 0.5,
                high: 1.2,
            },
            voltage_reconnect: Band {
                low: 0.88,
                high: 1.1,
            },
            frequency_trip: Band {
                low: 57.0 / 60.0,
                high: 61.8 / 60.0,
            },
            frequency_reconnect: Band {
                low: 59.3 / 60.0,
                high: 60.5 / 60.0,
            },
        }
    }
}

impl RideThroughPolicy for ThresholdRideThrough {
    fn trip_flags(&self, t: f64, voltage: f64, frequency: f64) -> RideThroughFlags {
        if t < self.t_stable {
            return RideThroughFlags::default();
        }
        RideThroughFlags {
            voltage_trip: !self.voltage_trip.contains(voltage),
            voltage_reconnect: self.voltage_reconnect.contains(voltage),
            frequency_trip: !self.frequency_trip.contains(frequency),
            frequency_reconnect: self.frequency_reconnect.contains(frequency),
        }
    }
}
