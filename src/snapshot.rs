//! Persistence of parameter values in a single snapshot file:
//! `[hash u32][record; RECORD_SIZE] x N`, one record per persistent parameter in descriptor order.
//!
//! On boot the header is compared against the hash of the compiled-in schema. A missing or stale
//! file is rebuilt from defaults, guarded by the inverted hash until all records are written.
//! Any storage failure during this sequence disables persistence until the next boot, parameters
//! keep working from RAM.

use crate::error::{Error, StorageError};
use crate::log::{debug, error, trace, warning};
use crate::platform::BlobStorage;
use crate::schema::ParameterDescriptor;
use crate::value::{ParameterValue, RECORD_SIZE, max_len};
use alloc::vec;
use alloc::vec::Vec;

pub const SNAPSHOT_FILE: &str = "/lfs/pr";

const HEADER_SIZE: usize = 4;

#[derive(strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotState {
    /// No snapshot on storage, a fresh one is being built.
    NoFile,
    /// Reading and checking the header.
    Validating,
    /// The header matches, records are loaded into the parameters.
    Valid,
    /// The header didn't match, the file was deleted and a fresh one is being built.
    Stale,
    /// Init has finished.
    Ready,
}

pub(crate) struct Snapshot {
    hash: u32,
    state: SnapshotState,
    /// Set on the first storage failure, persistence is skipped from then on.
    access_failed: bool,
    /// Slot of every persistent parameter, indexed by parameter id.
    slots: Vec<Option<usize>>,
    next_slot: usize,
}

impl Snapshot {
    pub(crate) fn new(parameter_count: usize) -> Self {
        Self {
            hash: 0,
            state: SnapshotState::NoFile,
            access_failed: false,
            slots: vec![None; parameter_count],
            next_slot: 0,
        }
    }

    pub(crate) fn state(&self) -> SnapshotState {
        self.state
    }

    pub(crate) fn access_failed(&self) -> bool {
        self.access_failed
    }

    pub(crate) fn slot(&self, id: u32) -> Option<usize> {
        self.slots.get(id as usize).copied().flatten()
    }

    fn building(&self) -> bool {
        matches!(self.state, SnapshotState::NoFile | SnapshotState::Stale)
    }

    fn fail(&mut self, what: &str, e: StorageError) {
        error!("snapshot: {} failed: {:?}", what, e);
        self.access_failed = true;
    }

    /// Opens the snapshot: validates an existing file or starts a fresh one.
    pub(crate) fn begin<S: BlobStorage>(&mut self, storage: &mut S, hash: u32) {
        self.hash = hash;
        self.access_failed = false;
        self.next_slot = 0;
        self.slots.iter_mut().for_each(|slot| *slot = None);

        match storage.exists(SNAPSHOT_FILE) {
            Ok(true) => {
                debug!("snapshot: found, validating against {:#x}", hash);
                self.state = SnapshotState::Validating;
                self.validate(storage);
            }
            Ok(false) => self.state = SnapshotState::NoFile,
            Err(e) => {
                self.state = SnapshotState::NoFile;
                return self.fail("lookup", e);
            }
        }

        if self.building() && !self.access_failed {
            warning!("snapshot: no valid snapshot, creating a new one");
            // the inverted hash marks the file as incomplete until `finish`
            if let Err(e) = storage.write(SNAPSHOT_FILE, &(!hash).to_le_bytes()) {
                self.fail("create", e);
            }
        }
    }

    fn validate<S: BlobStorage>(&mut self, storage: &mut S) {
        let mut header = [0u8; HEADER_SIZE];
        self.state = match storage.read(SNAPSHOT_FILE, 0, &mut header) {
            Ok(HEADER_SIZE) if u32::from_le_bytes(header) == self.hash => SnapshotState::Valid,
            Ok(HEADER_SIZE) => {
                warning!(
                    "snapshot: stored hash {:#x} does not match computed hash {:#x}",
                    u32::from_le_bytes(header),
                    self.hash
                );
                SnapshotState::Stale
            }
            Ok(read) => {
                error!("snapshot: header read returned {} bytes", read);
                SnapshotState::Stale
            }
            Err(e) => {
                error!("snapshot: header read failed: {:?}", e);
                SnapshotState::Stale
            }
        };

        if self.state == SnapshotState::Stale {
            if let Err(e) = storage.erase(SNAPSHOT_FILE) {
                self.fail("erase of stale file", e);
            }
        }
    }

    /// Assigns the next slot to a persistent parameter and either loads its record (valid file)
    /// or appends the current value (fresh file).
    pub(crate) fn reconcile<S: BlobStorage>(
        &mut self,
        storage: &mut S,
        desc: &ParameterDescriptor,
        value: &mut ParameterValue,
    ) {
        if self.access_failed {
            return;
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        if let Some(entry) = self.slots.get_mut(desc.id as usize) {
            *entry = Some(slot);
        }
        let offset = HEADER_SIZE + slot * RECORD_SIZE;

        if self.state == SnapshotState::Valid {
            trace!("snapshot: loading parameter {} from slot {}", desc.id, slot);
            let mut record = [0u8; RECORD_SIZE];
            match storage.read(SNAPSHOT_FILE, offset, &mut record) {
                Ok(RECORD_SIZE) => {}
                Ok(read) => {
                    error!("snapshot: short read of parameter {}: {} bytes", desc.id, read);
                    self.access_failed = true;
                    return;
                }
                Err(e) => return self.fail("record read", e),
            }

            match ParameterValue::from_record(&record) {
                Ok(mut loaded) if loaded.id == desc.id && loaded.type_tag() == desc.type_tag => {
                    loaded.payload.clamp(max_len(desc));
                    *value = loaded;
                }
                _ => {
                    error!("snapshot: record of parameter {} is corrupt", desc.id);
                    self.access_failed = true;
                }
            }
        } else {
            trace!("snapshot: storing parameter {} in slot {}", desc.id, slot);
            if let Err(e) = storage.write_at(SNAPSHOT_FILE, offset, &value.to_record()) {
                self.fail("record append", e);
            }
        }
    }

    /// Marks a freshly built file as valid. After a failure the file is removed so the next boot
    /// doesn't pick up a half written snapshot.
    pub(crate) fn finish<S: BlobStorage>(&mut self, storage: &mut S) {
        if !self.access_failed && self.building() {
            debug!("snapshot: marking fresh snapshot as valid");
            if let Err(e) = storage.write_at(SNAPSHOT_FILE, 0, &self.hash.to_le_bytes()) {
                self.fail("header write", e);
            }
        }

        if self.access_failed {
            warning!("snapshot: persistence disabled until reboot");
            if let Err(e) = storage.erase(SNAPSHOT_FILE) {
                error!("snapshot: erase after failure failed: {:?}", e);
            }
        }
        self.state = SnapshotState::Ready;
    }

    /// Rewrites the record of one persistent parameter in place. Does nothing when persistence is
    /// disabled or the parameter has no slot.
    pub(crate) fn write_slot<S: BlobStorage>(
        &mut self,
        storage: &mut S,
        value: &ParameterValue,
    ) -> Result<(), Error> {
        if self.access_failed {
            return Ok(());
        }
        let Some(slot) = self.slot(value.id) else {
            return Ok(());
        };

        trace!("snapshot: writing parameter {} to slot {}", value.id, slot);
        storage
            .write_at(SNAPSHOT_FILE, HEADER_SIZE + slot * RECORD_SIZE, &value.to_record())
            .map_err(|e| {
                error!("snapshot: write of parameter {} failed: {:?}", value.id, e);
                Error::WriteFailed
            })
    }
}
