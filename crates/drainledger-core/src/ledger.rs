//! The published result of one attribution cycle.

use serde::{Serialize, Serializer};

use crate::record::DrainRecord;
use crate::snapshot::AccountingPeriod;
use crate::window::CycleWindow;

/// One complete attribution cycle: the ranked records, the reconciliation
/// scalars, and an echo of the window they were computed over.
///
/// Record totals are derived at serialization time, so a ledger document
/// can never disagree with its own per-subsystem fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    pub period: AccountingPeriod,
    /// Ranked records, corrections included, descending by total power.
    #[serde(serialize_with = "serialize_records")]
    pub consumers: Vec<DrainRecord>,
    /// Application records ranked by signaling overhead, worst first.
    #[serde(serialize_with = "serialize_records")]
    pub signaling: Vec<DrainRecord>,
    pub total_power_mah: f64,
    pub computed_power_mah: f64,
    pub max_power_mah: f64,
    pub max_real_power_mah: f64,
    pub min_drained_power_mah: f64,
    pub max_drained_power_mah: f64,
    pub window: CycleWindow,
}

impl Ledger {
    /// The ledger published when no snapshot is available.
    pub fn empty(period: AccountingPeriod) -> Self {
        Ledger {
            period,
            window: CycleWindow::zero(period),
            ..Ledger::default()
        }
    }

    /// The largest ranked record, if any.
    pub fn top(&self) -> Option<&DrainRecord> {
        self.consumers.first()
    }

    /// Wall-clock span the cycle accounted for, in microseconds.
    pub fn stats_period_us(&self) -> u64 {
        self.window.type_battery_realtime_us
    }

    pub fn battery_time_remaining_us(&self) -> Option<u64> {
        self.window.battery_time_remaining_us
    }

    pub fn charge_time_remaining_us(&self) -> Option<u64> {
        self.window.charge_time_remaining_us
    }
}

#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a DrainRecord,
    total_power_mah: f64,
}

fn serialize_records<S>(records: &[DrainRecord], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(records.iter().map(|record| RecordView {
        record,
        total_power_mah: record.total_power_mah(),
    }))
}

/// Render a charge amount with precision that follows its magnitude, down
/// to eight decimals for sub-microamp-hour noise.
pub fn format_mah(power_mah: f64) -> String {
    if power_mah == 0.0 {
        return "0".to_string();
    }
    let decimals = if power_mah < 0.000_01 {
        8
    } else if power_mah < 0.000_1 {
        7
    } else if power_mah < 0.001 {
        6
    } else if power_mah < 0.01 {
        5
    } else if power_mah < 0.1 {
        4
    } else if power_mah < 1.0 {
        3
    } else if power_mah < 10.0 {
        2
    } else if power_mah < 100.0 {
        1
    } else {
        0
    };
    format!("{power_mah:.decimals$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Contribution, DrainKind, Subsystem};
    use crate::uid::Uid;

    #[test]
    fn empty_ledger_is_all_zeros() {
        let ledger = Ledger::empty(AccountingPeriod::SinceUnplugged);
        assert_eq!(ledger.period, AccountingPeriod::SinceUnplugged);
        assert!(ledger.consumers.is_empty());
        assert!(ledger.signaling.is_empty());
        assert_eq!(ledger.total_power_mah, 0.0);
        assert_eq!(ledger.stats_period_us(), 0);
        assert!(ledger.top().is_none());
    }

    #[test]
    fn serialized_records_carry_their_derived_total() {
        let mut record = DrainRecord::app(Uid(10_001), Some("maps".into()));
        record.apply(Subsystem::Cpu, &Contribution::new(1.5, 0));
        record.apply(Subsystem::Wifi, &Contribution::new(0.5, 0));
        let mut ledger = Ledger::empty(AccountingPeriod::SinceCharged);
        ledger.consumers.push(record);

        let doc: serde_json::Value = serde_json::to_value(&ledger).unwrap();
        let consumer = &doc["consumers"][0];
        assert_eq!(consumer["kind"], "app");
        assert_eq!(consumer["label"], "maps");
        assert_eq!(consumer["total_power_mah"], 2.0);
        assert_eq!(doc["period"], "since_charged");
    }

    #[test]
    fn corrections_serialize_with_their_amount() {
        let mut ledger = Ledger::empty(AccountingPeriod::SinceCharged);
        ledger
            .consumers
            .push(DrainRecord::correction(DrainKind::Unaccounted, 3.25));

        let doc: serde_json::Value = serde_json::to_value(&ledger).unwrap();
        assert_eq!(doc["consumers"][0]["kind"], "unaccounted");
        assert_eq!(doc["consumers"][0]["total_power_mah"], 3.25);
    }

    #[test]
    fn format_mah_scales_precision_with_magnitude() {
        assert_eq!(format_mah(0.0), "0");
        assert_eq!(format_mah(123.4), "123");
        assert_eq!(format_mah(12.34), "12.3");
        assert_eq!(format_mah(5.0), "5.00");
        assert_eq!(format_mah(0.5), "0.500");
        assert_eq!(format_mah(0.05), "0.0500");
        assert_eq!(format_mah(0.005), "0.00500");
        assert_eq!(format_mah(0.000_5), "0.000500");
        assert_eq!(format_mah(0.000_05), "0.0000500");
        assert_eq!(format_mah(0.000_005), "0.00000500");
    }
}
