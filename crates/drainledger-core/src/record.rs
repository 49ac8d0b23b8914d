//! Consumer records: the unit ledger entries of a refresh cycle.
//!
//! A record is either one application's accumulated draw or one synthetic
//! category (rollup, time-based category, or reconciliation correction).
//! Records live for exactly one cycle; the next refresh replaces them
//! wholesale.

use serde::Serialize;

use crate::uid::{Uid, UserId};

/// Category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum DrainKind {
    /// One application identity.
    #[default]
    App,
    /// Wifi subsystem rollup: controller remainder plus the wifi share of
    /// identities bucketed to the wifi control process.
    Wifi,
    /// Bluetooth subsystem rollup.
    Bluetooth,
    /// Per-user rollup of a non-selected user's applications.
    User,
    /// Call radio on-time.
    Phone,
    /// Screen on-time across brightness bins.
    Screen,
    /// Awake-but-screen-off supervisory time.
    Idle,
    /// Cellular radio remainder not attributable to any identity.
    Cell,
    /// Reconciliation entry: measured discharge the model did not explain.
    Unaccounted,
    /// Reconciliation entry: modeled draw above the measured upper bound.
    Overcounted,
}

impl DrainKind {
    /// Whether this entry was synthesized by discharge-bound
    /// reconciliation rather than by a model.
    pub fn is_correction(self) -> bool {
        matches!(self, DrainKind::Unaccounted | DrainKind::Overcounted)
    }
}

impl std::fmt::Display for DrainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Wifi => write!(f, "wifi"),
            Self::Bluetooth => write!(f, "bluetooth"),
            Self::User => write!(f, "user"),
            Self::Phone => write!(f, "phone"),
            Self::Screen => write!(f, "screen"),
            Self::Idle => write!(f, "idle"),
            Self::Cell => write!(f, "cell"),
            Self::Unaccounted => write!(f, "unaccounted"),
            Self::Overcounted => write!(f, "overcounted"),
        }
    }
}

/// Estimator slots, in the fixed order the engine invokes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Cpu,
    Wakelock,
    MobileRadio,
    Wifi,
    Bluetooth,
    Sensors,
    Camera,
    Flashlight,
}

impl Subsystem {
    pub const ALL: [Subsystem; 8] = [
        Subsystem::Cpu,
        Subsystem::Wakelock,
        Subsystem::MobileRadio,
        Subsystem::Wifi,
        Subsystem::Bluetooth,
        Subsystem::Sensors,
        Subsystem::Camera,
        Subsystem::Flashlight,
    ];
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Wakelock => write!(f, "wakelock"),
            Self::MobileRadio => write!(f, "mobile_radio"),
            Self::Wifi => write!(f, "wifi"),
            Self::Bluetooth => write!(f, "bluetooth"),
            Self::Sensors => write!(f, "sensors"),
            Self::Camera => write!(f, "camera"),
            Self::Flashlight => write!(f, "flashlight"),
        }
    }
}

/// One estimator's share for a single consumer or for a subsystem-wide
/// remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contribution {
    pub power_mah: f64,
    /// Active time backing the estimate, ms.
    pub time_ms: u64,
    /// Packet counts, set only by the mobile radio estimator.
    pub rx_packets: u64,
    pub tx_packets: u64,
}

impl Contribution {
    pub fn zero() -> Self {
        Contribution::default()
    }

    pub fn new(power_mah: f64, time_ms: u64) -> Self {
        Contribution { power_mah, time_ms, rx_packets: 0, tx_packets: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.power_mah == 0.0 && self.time_ms == 0 && self.rx_packets == 0 && self.tx_packets == 0
    }
}

/// One ledger entry. Power in mAh, times in ms.
///
/// The total is never stored: [`DrainRecord::total_power_mah`] sums the
/// live contribution fields on every call, so it cannot drift from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrainRecord {
    pub kind: DrainKind,
    /// Owning identity; present only for `App` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    /// Grouped user; present only for `User` rollups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub cpu_power_mah: f64,
    pub cpu_time_ms: u64,
    pub wakelock_power_mah: f64,
    pub wakelock_time_ms: u64,
    pub mobile_radio_power_mah: f64,
    pub mobile_active_time_ms: u64,
    pub mobile_rx_packets: u64,
    pub mobile_tx_packets: u64,
    pub wifi_power_mah: f64,
    pub wifi_running_time_ms: u64,
    pub bluetooth_power_mah: f64,
    pub bluetooth_running_time_ms: u64,
    pub sensor_power_mah: f64,
    pub camera_power_mah: f64,
    pub flashlight_power_mah: f64,

    /// Direct power for time-based categories and corrections; zero for
    /// app records, whose power lives in the subsystem fields.
    pub usage_power_mah: f64,
    /// Aggregate attributable time. For apps this is cpu + wakelock +
    /// mobile-active time; for time-based categories the explicit
    /// duration.
    pub usage_time_ms: u64,

    /// Mobile radio active time per packet, defined only when the record
    /// moved at least one packet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_ms_per_packet: Option<f64>,
}

impl DrainRecord {
    /// A fresh application record.
    pub fn app(uid: Uid, label: Option<String>) -> Self {
        DrainRecord { kind: DrainKind::App, uid: Some(uid), label, ..Default::default() }
    }

    /// A fresh synthetic category record.
    pub fn category(kind: DrainKind) -> Self {
        DrainRecord { kind, ..Default::default() }
    }

    /// A fresh per-user rollup record.
    pub fn user_rollup(user: UserId) -> Self {
        DrainRecord { kind: DrainKind::User, user: Some(user), ..Default::default() }
    }

    /// A reconciliation correction carrying `amount_mah`.
    pub fn correction(kind: DrainKind, amount_mah: f64) -> Self {
        DrainRecord { kind, usage_power_mah: amount_mah, ..Default::default() }
    }

    /// Sum of every contribution currently held. Never negative as long as
    /// contributions are non-negative, which estimators guarantee.
    pub fn total_power_mah(&self) -> f64 {
        self.usage_power_mah
            + self.cpu_power_mah
            + self.wakelock_power_mah
            + self.mobile_radio_power_mah
            + self.wifi_power_mah
            + self.bluetooth_power_mah
            + self.sensor_power_mah
            + self.camera_power_mah
            + self.flashlight_power_mah
    }

    /// One subsystem's current power share.
    pub fn subsystem_power_mah(&self, subsystem: Subsystem) -> f64 {
        match subsystem {
            Subsystem::Cpu => self.cpu_power_mah,
            Subsystem::Wakelock => self.wakelock_power_mah,
            Subsystem::MobileRadio => self.mobile_radio_power_mah,
            Subsystem::Wifi => self.wifi_power_mah,
            Subsystem::Bluetooth => self.bluetooth_power_mah,
            Subsystem::Sensors => self.sensor_power_mah,
            Subsystem::Camera => self.camera_power_mah,
            Subsystem::Flashlight => self.flashlight_power_mah,
        }
    }

    /// Fold an estimator contribution into this record.
    pub fn apply(&mut self, subsystem: Subsystem, c: &Contribution) {
        match subsystem {
            Subsystem::Cpu => {
                self.cpu_power_mah += c.power_mah;
                self.cpu_time_ms += c.time_ms;
            }
            Subsystem::Wakelock => {
                self.wakelock_power_mah += c.power_mah;
                self.wakelock_time_ms += c.time_ms;
            }
            Subsystem::MobileRadio => {
                self.mobile_radio_power_mah += c.power_mah;
                self.mobile_active_time_ms += c.time_ms;
                self.mobile_rx_packets += c.rx_packets;
                self.mobile_tx_packets += c.tx_packets;
            }
            Subsystem::Wifi => {
                self.wifi_power_mah += c.power_mah;
                self.wifi_running_time_ms += c.time_ms;
            }
            Subsystem::Bluetooth => {
                self.bluetooth_power_mah += c.power_mah;
                self.bluetooth_running_time_ms += c.time_ms;
            }
            Subsystem::Sensors => self.sensor_power_mah += c.power_mah,
            Subsystem::Camera => self.camera_power_mah += c.power_mah,
            Subsystem::Flashlight => self.flashlight_power_mah += c.power_mah,
        }
    }

    /// Fold one subsystem's share of `other` into this record. Used by the
    /// wifi/bluetooth rollups, which aggregate only their own subsystem.
    pub fn fold_subsystem(&mut self, subsystem: Subsystem, other: &DrainRecord) {
        match subsystem {
            Subsystem::Cpu => {
                self.cpu_power_mah += other.cpu_power_mah;
                self.cpu_time_ms += other.cpu_time_ms;
            }
            Subsystem::Wakelock => {
                self.wakelock_power_mah += other.wakelock_power_mah;
                self.wakelock_time_ms += other.wakelock_time_ms;
            }
            Subsystem::MobileRadio => {
                self.mobile_radio_power_mah += other.mobile_radio_power_mah;
                self.mobile_active_time_ms += other.mobile_active_time_ms;
                self.mobile_rx_packets += other.mobile_rx_packets;
                self.mobile_tx_packets += other.mobile_tx_packets;
            }
            Subsystem::Wifi => {
                self.wifi_power_mah += other.wifi_power_mah;
                self.wifi_running_time_ms += other.wifi_running_time_ms;
            }
            Subsystem::Bluetooth => {
                self.bluetooth_power_mah += other.bluetooth_power_mah;
                self.bluetooth_running_time_ms += other.bluetooth_running_time_ms;
            }
            Subsystem::Sensors => self.sensor_power_mah += other.sensor_power_mah,
            Subsystem::Camera => self.camera_power_mah += other.camera_power_mah,
            Subsystem::Flashlight => self.flashlight_power_mah += other.flashlight_power_mah,
        }
    }

    /// Fold every contribution of `other` into this record. Used by the
    /// per-user rollups, which aggregate across all subsystems.
    pub fn absorb(&mut self, other: &DrainRecord) {
        for subsystem in Subsystem::ALL {
            self.fold_subsystem(subsystem, other);
        }
        self.usage_power_mah += other.usage_power_mah;
        self.usage_time_ms += other.usage_time_ms;
    }

    /// Derive the app-record aggregate time once all estimators have run.
    pub fn derive_app_usage_time(&mut self) {
        self.usage_time_ms = self.cpu_time_ms + self.wakelock_time_ms + self.mobile_active_time_ms;
    }

    /// Derive the signaling-overhead ratio; defined only when the record
    /// moved packets.
    pub fn compute_mobile_ms_per_packet(&mut self) {
        let packets = self.mobile_rx_packets + self.mobile_tx_packets;
        self.mobile_ms_per_packet = if packets > 0 {
            Some(self.mobile_active_time_ms as f64 / packets as f64)
        } else {
            None
        };
    }
}
