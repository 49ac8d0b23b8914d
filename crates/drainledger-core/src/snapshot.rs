//! Raw usage snapshot model.
//!
//! A snapshot is the engine's only view of the device: monotonic usage
//! counters captured at a known clock anchor. Every duration is in
//! microseconds. Counters carry baselines recorded at the last unplug and
//! the last full charge, so one snapshot answers queries for all three
//! accounting periods without reprocessing.
//!
//! Snapshots are plain serde data. How they are captured and transported is
//! a collaborator concern (see [`crate::provider`]); the engine only reads
//! them.

use serde::{Deserialize, Serialize};

use crate::uid::Uid;

/// Number of discrete screen brightness bins reported by snapshots.
pub const NUM_BRIGHTNESS_BINS: usize = 5;

/// Number of cellular signal strength bins reported by snapshots.
pub const NUM_SIGNAL_STRENGTH_BINS: usize = 5;

/// Reserved sensor handle for the GPS receiver, which is priced from its
/// own profile constant rather than the sensor map.
pub const GPS_SENSOR_HANDLE: i32 = -10_000;

/// The accounting period a query is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingPeriod {
    /// Everything accumulated since boot.
    SinceBoot,
    /// Since the charger was last disconnected.
    SinceUnplugged,
    /// Since the battery was last fully charged.
    #[default]
    SinceCharged,
}

impl std::fmt::Display for AccountingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SinceBoot => write!(f, "since_boot"),
            Self::SinceUnplugged => write!(f, "since_unplugged"),
            Self::SinceCharged => write!(f, "since_charged"),
        }
    }
}

impl std::str::FromStr for AccountingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boot" | "since_boot" => Ok(Self::SinceBoot),
            "unplugged" | "since_unplugged" => Ok(Self::SinceUnplugged),
            "charged" | "since_charged" => Ok(Self::SinceCharged),
            other => Err(format!("unknown accounting period: {other}")),
        }
    }
}

/// A monotonic counter with baselines at the last unplug and last full
/// charge. Unit-agnostic: snapshots use it for both durations (µs) and
/// packet counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoped {
    pub total: u64,
    pub at_unplug: u64,
    pub at_charge: u64,
}

impl Scoped {
    /// A counter whose whole accumulation happened in the current period
    /// (both baselines zero). The common case in fixtures.
    pub fn new(total: u64) -> Self {
        Scoped { total, at_unplug: 0, at_charge: 0 }
    }

    pub fn with_baselines(total: u64, at_unplug: u64, at_charge: u64) -> Self {
        Scoped { total, at_unplug, at_charge }
    }

    /// Value accumulated within `period`. Saturates rather than trusting a
    /// baseline that ran ahead of its counter.
    pub fn since(&self, period: AccountingPeriod) -> u64 {
        match period {
            AccountingPeriod::SinceBoot => self.total,
            AccountingPeriod::SinceUnplugged => self.total.saturating_sub(self.at_unplug),
            AccountingPeriod::SinceCharged => self.total.saturating_sub(self.at_charge),
        }
    }
}

/// Idle/receive/transmit activity of a radio controller, as reported by the
/// hardware. All durations in µs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerActivity {
    pub idle_time_us: Scoped,
    pub rx_time_us: Scoped,
    pub tx_time_us: Scoped,
}

/// One sensor's accumulated active time for a uid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorUsage {
    pub handle: i32,
    pub time_us: Scoped,
}

/// Per-identity usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UidUsage {
    pub uid: Uid,
    /// Human-readable label for reports, when the capturer knows one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// CPU time spent at each speed step, aligned with the profile's
    /// per-step draw table.
    pub cpu_step_times_us: Vec<Scoped>,
    pub cpu_foreground_time_us: Scoped,
    pub wakelock_partial_time_us: Scoped,
    pub mobile_rx_packets: Scoped,
    pub mobile_tx_packets: Scoped,
    pub mobile_active_time_us: Scoped,
    pub wifi_running_time_us: Scoped,
    pub wifi_scan_time_us: Scoped,
    pub wifi_controller: ControllerActivity,
    pub bluetooth_controller: ControllerActivity,
    pub sensors: Vec<SensorUsage>,
    pub camera_time_us: Scoped,
    pub flashlight_time_us: Scoped,
}

/// A full usage snapshot: device-wide counters plus per-uid entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageSnapshot {
    /// Elapsed-realtime clock anchor at capture, µs.
    pub captured_realtime_us: u64,
    /// Uptime clock anchor at capture, µs.
    pub captured_uptime_us: u64,
    /// Whether the device was discharging at capture. While on battery the
    /// on-battery accumulators keep running, so clock queries extend them
    /// to the caller's anchors.
    pub on_battery: bool,

    pub battery_realtime_us: Scoped,
    pub battery_uptime_us: Scoped,

    pub screen_on_time_us: Scoped,
    pub screen_brightness_time_us: [Scoped; NUM_BRIGHTNESS_BINS],
    pub phone_on_time_us: Scoped,
    pub phone_signal_strength_time_us: [Scoped; NUM_SIGNAL_STRENGTH_BINS],
    pub phone_signal_scanning_time_us: Scoped,
    pub mobile_radio_active_time_us: Scoped,
    /// Device-wide mobile packet counts, including uid-untracked traffic.
    pub mobile_rx_packets: Scoped,
    pub mobile_tx_packets: Scoped,
    pub global_wifi_running_time_us: Scoped,
    pub bluetooth_on_time_us: Scoped,
    pub wifi_controller: ControllerActivity,
    pub bluetooth_controller: ControllerActivity,

    /// Capability flags: whether the capturer obtained per-uid controller
    /// activity from the hardware. Trusted only when the profile also
    /// carries nonzero controller coefficients.
    pub has_wifi_activity_reporting: bool,
    pub has_bluetooth_activity_reporting: bool,

    /// State-of-charge drop since the last full charge, as a percentage
    /// range. The capturer reports a range because charge sampling is
    /// coarse; the low bound is also the reconciliation gate input.
    pub discharge_lower_pct: u32,
    pub discharge_upper_pct: u32,

    /// Capturer's estimate of time to empty, when it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_time_remaining_us: Option<u64>,
    /// Capturer's estimate of time to full, when it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_time_remaining_us: Option<u64>,

    pub uids: Vec<UidUsage>,
}

impl UsageSnapshot {
    /// On-battery elapsed realtime as of `now_realtime_us`, extending the
    /// accumulator while still discharging.
    pub fn battery_realtime_at(&self, now_realtime_us: u64) -> u64 {
        self.battery_realtime_us.total + self.running_extension(now_realtime_us)
    }

    /// On-battery uptime as of `now_uptime_us`.
    pub fn battery_uptime_at(&self, now_uptime_us: u64) -> u64 {
        let ext = if self.on_battery {
            now_uptime_us.saturating_sub(self.captured_uptime_us)
        } else {
            0
        };
        self.battery_uptime_us.total + ext
    }

    /// Period-scoped on-battery realtime as of `now_realtime_us`.
    pub fn scoped_battery_realtime_at(&self, now_realtime_us: u64, period: AccountingPeriod) -> u64 {
        self.battery_realtime_us.since(period) + self.running_extension(now_realtime_us)
    }

    /// Period-scoped on-battery uptime as of `now_uptime_us`.
    pub fn scoped_battery_uptime_at(&self, now_uptime_us: u64, period: AccountingPeriod) -> u64 {
        let ext = if self.on_battery {
            now_uptime_us.saturating_sub(self.captured_uptime_us)
        } else {
            0
        };
        self.battery_uptime_us.since(period) + ext
    }

    fn running_extension(&self, now_realtime_us: u64) -> u64 {
        if self.on_battery {
            now_realtime_us.saturating_sub(self.captured_realtime_us)
        } else {
            0
        }
    }

    pub fn uid(&self, uid: Uid) -> Option<&UidUsage> {
        self.uids.iter().find(|u| u.uid == uid)
    }
}
