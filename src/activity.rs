//! Activity counting and top-K selection

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-address count of appearances in ERC20 transfer calls.
///
/// Only ever grows through [`ActivityCounter::increment`]; the aggregator
/// owns it exclusively while blocks are being merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCounter {
    counts: HashMap<Address, u64>,
}

impl ActivityCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count for `address`, starting it at 1 if unseen.
    pub fn increment(&mut self, address: Address) {
        *self.counts.entry(address).or_insert(0) += 1;
    }

    /// Add one block's worth of addresses.
    pub fn record<I>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = Address>,
    {
        for address in addresses {
            self.increment(address);
        }
    }

    pub fn get(&self, address: &Address) -> u64 {
        self.counts.get(address).copied().unwrap_or(0)
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of increments applied.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, u64)> {
        self.counts.iter().map(|(addr, count)| (addr, *count))
    }
}

impl FromIterator<Address> for ActivityCounter {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        let mut counter = Self::new();
        counter.record(iter);
        counter
    }
}

/// One row of the ranked output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrActivity {
    pub address: Address,
    pub activity: u64,
}

/// The `k` most active addresses, highest activity first.
///
/// Equal activity is ordered by ascending address so the output does not
/// depend on the order in which blocks finished.
pub fn select_top_k(counter: &ActivityCounter, k: usize) -> Vec<AddrActivity> {
    if k == 0 {
        return Vec::new();
    }

    let mut activities: Vec<AddrActivity> = counter
        .iter()
        .map(|(address, activity)| AddrActivity {
            address: address.clone(),
            activity,
        })
        .collect();

    activities.sort_unstable_by(|a, b| {
        b.activity
            .cmp(&a.activity)
            .then_with(|| a.address.cmp(&b.address))
    });
    activities.truncate(k);
    activities
}
