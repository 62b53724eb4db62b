//! The set of speakers the bridge currently knows.
//!
//! Each discovery cycle produces a new immutable [`Snapshot`] that replaces
//! the previous one in a single swap. Readers clone the `Arc` and keep
//! working on that snapshot even if a newer one lands meanwhile.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use raumfeld_discovery::Device;

/// One discovery cycle's speakers, keyed by id
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    devices: BTreeMap<String, Arc<Device>>,
}

impl Snapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Device>> {
        self.devices.get(id)
    }

    /// Speakers ordered by id
    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether publishing definitions for `other` would differ from ours
    fn same_definitions(&self, other: &Snapshot) -> bool {
        self.devices.len() == other.devices.len()
            && self
                .devices
                .iter()
                .zip(other.devices.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && a.name == b.name)
    }
}

/// Registry of speakers, replaced wholesale on every discovery cycle
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    current: RwLock<Arc<Snapshot>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Look up one speaker in the current snapshot
    pub fn get(&self, id: &str) -> Option<Arc<Device>> {
        self.snapshot().get(id).cloned()
    }

    /// Install `devices` as the new snapshot.
    ///
    /// Returns the snapshot and whether the published definitions change
    /// (ids or names differ from the previous one). A later duplicate id
    /// replaces an earlier one.
    pub fn replace(&self, devices: Vec<Device>) -> (Arc<Snapshot>, bool) {
        let mut current = self.current.write();

        let snapshot = Arc::new(Snapshot {
            generation: current.generation + 1,
            devices: devices
                .into_iter()
                .map(|device| (device.id.clone(), Arc::new(device)))
                .collect(),
        });
        let changed = !current.same_definitions(&snapshot);

        *current = snapshot.clone();
        tracing::debug!(
            generation = snapshot.generation,
            speakers = snapshot.len(),
            changed,
            "registry replaced"
        );
        (snapshot, changed)
    }
}
