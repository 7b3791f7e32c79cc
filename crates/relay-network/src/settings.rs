//! Network tuning knobs

use serde::{Deserialize, Serialize};

/// How two antenna ranges combine into a link range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RangeModel {
    /// Link range is the shorter of the two ranges
    #[default]
    Standard,
    /// Shorter range plus the geometric mean, capped at 100x the shorter range
    Additive,
}

impl RangeModel {
    /// Combine two ranges (metres) into the maximum link distance.
    pub fn combine(self, a: f64, b: f64) -> f64 {
        let shorter = a.min(b);
        if shorter <= 0.0 {
            return 0.0;
        }
        match self {
            RangeModel::Standard => shorter,
            RangeModel::Additive => (shorter + (a * b).sqrt()).min(100.0 * shorter),
        }
    }
}

/// Relay network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Number of graph-refresh ticks over which every node is revisited once
    pub refresh_window: usize,
    /// When false every route reports zero delay
    pub signal_delay_enabled: bool,
    /// Propagation speed used for route delay (m/s)
    pub speed_of_light_m_s: f64,
    pub range_model: RangeModel,
    /// Scale applied to every omni range
    pub omni_multiplier: f64,
    /// Scale applied to every dish range
    pub dish_multiplier: f64,
    /// Capacity of the topology event ring
    pub event_capacity: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            refresh_window: 50,
            signal_delay_enabled: true,
            speed_of_light_m_s: 3.0e8,
            range_model: RangeModel::Standard,
            omni_multiplier: 1.0,
            dish_multiplier: 1.0,
            event_capacity: 1024,
        }
    }
}

impl NetworkSettings {
    /// One-way delay in seconds for a path of `length_m` metres.
    pub fn delay_for(&self, length_m: f64) -> f64 {
        if !self.signal_delay_enabled {
            return 0.0;
        }
        length_m / self.speed_of_light_m_s
    }
}
