//! Traits of the collaborators the repository consumes. Flash block access for the OTA region
//! uses [`embedded_storage::nor_flash::NorFlash`] directly.

use crate::error::{Error, StorageError};

/// Named blob storage, usually a small file system (littlefs) mounted on the internal flash.
///
/// See `tests/common.rs` for an in-memory implementation.
pub trait BlobStorage {
    /// Whether a blob with the given name exists.
    fn exists(&mut self, name: &str) -> Result<bool, StorageError>;

    /// Size of the blob in bytes. Returns `StorageError::NotFound` for missing blobs.
    fn size(&mut self, name: &str) -> Result<usize, StorageError>;

    /// Reads up to `buf.len()` bytes starting at `offset` and returns the number of bytes read.
    /// Reading at or past the end returns `Ok(0)`.
    fn read(&mut self, name: &str, offset: usize, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Replaces the whole blob, creating it if necessary.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Overwrites `data.len()` bytes at `offset` of an existing blob. Writing at the end of the
    /// blob appends. Offsets past the end are rejected with `StorageError::Io`.
    fn write_at(&mut self, name: &str, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Deletes the blob. Deleting a missing blob is not an error.
    fn erase(&mut self, name: &str) -> Result<(), StorageError>;
}

impl<T: BlobStorage> BlobStorage for &mut T {
    fn exists(&mut self, name: &str) -> Result<bool, StorageError> {
        (*self).exists(name)
    }

    fn size(&mut self, name: &str) -> Result<usize, StorageError> {
        (*self).size(name)
    }

    fn read(&mut self, name: &str, offset: usize, buf: &mut [u8]) -> Result<usize, StorageError> {
        (*self).read(name, offset, buf)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        (*self).write(name, data)
    }

    fn write_at(&mut self, name: &str, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        (*self).write_at(name, offset, data)
    }

    fn erase(&mut self, name: &str) -> Result<(), StorageError> {
        (*self).erase(name)
    }
}

/// Services of the remote protocol which expose a catalog.
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ServiceId {
    ParameterRepo = 1,
    Files = 2,
    Commands = 3,
}

/// Decides which catalog entries the connected peer may see. Consulted by every count and
/// discovery operation.
pub trait AccessControl {
    fn access_granted(&self, service: ServiceId, id: u32) -> bool;
}

impl<F: Fn(ServiceId, u32) -> bool> AccessControl for F {
    fn access_granted(&self, service: ServiceId, id: u32) -> bool {
        self(service, id)
    }
}

/// Grants access to everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn access_granted(&self, _service: ServiceId, _id: u32) -> bool {
        true
    }
}

/// Pushes unsolicited updates to the connected peer. Returns an error if nobody is subscribed,
/// which callers treat as non-fatal.
pub trait Notifier {
    fn notify(&mut self, bytes: &[u8]) -> Result<(), Error>;
}

impl<T: Notifier> Notifier for &mut T {
    fn notify(&mut self, bytes: &[u8]) -> Result<(), Error> {
        (*self).notify(bytes)
    }
}

#[inline(always)]
pub(crate) const fn align_ceil(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size.saturating_add(alignment - 1) & !(alignment - 1)
    } else {
        size.saturating_add(alignment - 1) / alignment * alignment
    }
}

#[inline(always)]
pub(crate) const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}
