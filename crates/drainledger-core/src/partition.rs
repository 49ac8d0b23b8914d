//! Partitioner: splits per-application records into mutually exclusive
//! buckets.
//!
//! The dispatch order is load-bearing: service identity checks run before
//! the user check, so the wifi control process is never user-bucketed even
//! when its user is outside the filter.

use std::collections::BTreeMap;

use crate::record::{DrainKind, DrainRecord};
use crate::uid::{Uid, UserFilter, UserId};

/// The bucketed application records of one cycle. Every kept record sits
/// in exactly one bucket.
#[derive(Debug, Default)]
pub struct Partition {
    /// Records ranked individually in the final ledger.
    pub default_list: Vec<DrainRecord>,
    /// Records owned by the wifi control process, absorbed by the wifi
    /// rollup.
    pub wifi: Vec<DrainRecord>,
    /// Records owned by the bluetooth service, absorbed by the bluetooth
    /// rollup.
    pub bluetooth: Vec<DrainRecord>,
    /// Records grouped under users outside the caller's filter.
    pub by_user: BTreeMap<UserId, Vec<DrainRecord>>,
}

impl Partition {
    pub fn new() -> Self {
        Partition::default()
    }

    /// Bucket one application record. Powerless records are dropped unless
    /// they belong to the system identity, which is always kept.
    pub fn place(&mut self, record: DrainRecord, filter: &UserFilter) {
        debug_assert_eq!(record.kind, DrainKind::App);
        let Some(uid) = record.uid else {
            return;
        };
        if record.total_power_mah() == 0.0 && uid != Uid::SYSTEM {
            return;
        }

        if uid == Uid::WIFI {
            self.wifi.push(record);
        } else if uid == Uid::BLUETOOTH {
            self.bluetooth.push(record);
        } else if !filter.includes(uid.user_id()) && uid.is_application() {
            self.by_user.entry(uid.user_id()).or_default().push(record);
        } else {
            self.default_list.push(record);
        }
    }

    /// The system identity's record, wherever it landed. Target of the
    /// supervisory wakelock remainder.
    pub fn system_record_mut(&mut self) -> Option<&mut DrainRecord> {
        let is_system = |r: &DrainRecord| r.uid == Some(Uid::SYSTEM);
        if let Some(i) = self.default_list.iter().position(is_system) {
            return self.default_list.get_mut(i);
        }
        if let Some(i) = self.wifi.iter().position(is_system) {
            return self.wifi.get_mut(i);
        }
        if let Some(i) = self.bluetooth.iter().position(is_system) {
            return self.bluetooth.get_mut(i);
        }
        let found = self
            .by_user
            .iter()
            .find_map(|(user, records)| records.iter().position(is_system).map(|i| (*user, i)));
        if let Some((user, i)) = found {
            return self.by_user.get_mut(&user).and_then(|records| records.get_mut(i));
        }
        None
    }

    /// Total records kept across all buckets.
    pub fn len(&self) -> usize {
        self.default_list.len()
            + self.wifi.len()
            + self.bluetooth.len()
            + self.by_user.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
