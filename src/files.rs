use crate::discovery::{self, CatalogEntry, Cursor};
use crate::error::{Error, StorageError};
use crate::log::{debug, error, trace, warning};
use crate::ota::OtaRegion;
use crate::platform::{AccessControl, BlobStorage, ServiceId};
use crate::schema::{AccessLevel, StorageClass};
use alloc::vec;
use alloc::vec::Vec;
use embedded_storage::nor_flash::NorFlash;

pub const IO_TXT_FILE: &str = "/lfs/io.txt";

/// Capacity of the io.txt buffer.
pub const MAX_IO_TXT_LEN: usize = 2048;

/// Largest read served in one request, bound by the transport packet size.
pub const FILE_PACKET_SIZE: usize = 128;

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum FileId {
    /// Firmware image, streamed into the OTA flash region.
    OtaBin = 0,
    /// Free text kept in a blob on the file system.
    IoTxt = 1,
    /// Constant image compiled into the firmware.
    ReachLogoPng = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub access: AccessLevel,
    pub storage: StorageClass,
    /// Whether the peer has to send a checksum with every write. None of the files do.
    pub require_checksum: bool,
    pub max_size: u32,
    pub current_size: u32,
}

impl CatalogEntry for FileDescriptor {
    fn id(&self) -> u32 {
        self.id
    }
}

/// Serves the file catalog: the OTA image on raw flash `F`, io.txt on blob storage `S` and a
/// constant logo.
pub struct FileStore<S: BlobStorage, F: NorFlash> {
    storage: S,
    ota: OtaRegion<F>,
    descriptors: Vec<FileDescriptor>,
    io_txt: Vec<u8>,
    /// io.txt was prepared for a write which isn't committed yet.
    io_txt_pending: bool,
    io_txt_default: &'static [u8],
    logo: &'static [u8],
}

impl<S: BlobStorage, F: NorFlash> FileStore<S, F> {
    /// `io_txt_default` is restored by [`FileStore::reset`] and written when io.txt is missing.
    pub fn new(storage: S, ota: OtaRegion<F>, io_txt_default: &'static [u8], logo: &'static [u8]) -> Self {
        let io_txt_default = &io_txt_default[..io_txt_default.len().min(MAX_IO_TXT_LEN)];
        let descriptors = vec![
            FileDescriptor {
                id: FileId::OtaBin as u32,
                name: "ota.bin",
                access: AccessLevel::Write,
                storage: StorageClass::Persistent,
                require_checksum: false,
                max_size: ota.max_image_size() as u32,
                current_size: 0,
            },
            FileDescriptor {
                id: FileId::IoTxt as u32,
                name: "io.txt",
                access: AccessLevel::ReadWrite,
                storage: StorageClass::Persistent,
                require_checksum: false,
                max_size: MAX_IO_TXT_LEN as u32,
                current_size: io_txt_default.len() as u32,
            },
            FileDescriptor {
                id: FileId::ReachLogoPng as u32,
                name: "reach_logo.png",
                access: AccessLevel::Read,
                storage: StorageClass::Persistent,
                require_checksum: false,
                max_size: logo.len() as u32,
                current_size: logo.len() as u32,
            },
        ];

        Self {
            storage,
            ota,
            descriptors,
            io_txt: Vec::from(io_txt_default),
            io_txt_pending: false,
            io_txt_default,
            logo,
        }
    }

    /// Loads io.txt from storage, creating it with the default content if it doesn't exist.
    pub fn init(&mut self) {
        match self.storage.exists(IO_TXT_FILE) {
            Ok(true) => match self.load_io_txt() {
                Ok(()) => debug!("files: loaded io.txt, {} bytes", self.io_txt.len()),
                Err(e) => error!("files: io.txt read failed: {:?}", e),
            },
            Ok(false) => {
                debug!("files: creating io.txt");
                if let Err(e) = self.storage.write(IO_TXT_FILE, self.io_txt_default) {
                    error!("files: io.txt write failed: {:?}", e);
                }
                self.io_txt = Vec::from(self.io_txt_default);
            }
            Err(e) => {
                error!("files: io.txt access failed: {:?}", e);
                self.io_txt = Vec::from(self.io_txt_default);
            }
        }
        self.set_io_txt_size();
    }

    fn load_io_txt(&mut self) -> Result<(), StorageError> {
        let size = self.storage.size(IO_TXT_FILE)?;
        if size > MAX_IO_TXT_LEN {
            warning!("files: io.txt has {} bytes, keeping {}", size, MAX_IO_TXT_LEN);
        }
        let mut buf = vec![0; size.min(MAX_IO_TXT_LEN)];
        let read = self.storage.read(IO_TXT_FILE, 0, &mut buf)?;
        buf.truncate(read);
        self.io_txt = buf;
        Ok(())
    }

    fn set_io_txt_size(&mut self) {
        self.descriptors[FileId::IoTxt as usize].current_size = self.io_txt.len() as u32;
    }

    fn file_id(&self, fid: u32) -> Result<FileId, Error> {
        FileId::from_repr(fid).ok_or(Error::InvalidId)
    }

    pub fn storage(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn ota(&mut self) -> &mut OtaRegion<F> {
        &mut self.ota
    }

    pub fn description(&self, fid: u32) -> Result<&FileDescriptor, Error> {
        let fid = self.file_id(fid)?;
        Ok(&self.descriptors[fid as usize])
    }

    /// Number of files the peer may see.
    pub fn count(&self, access: &impl AccessControl) -> usize {
        discovery::count(&self.descriptors, ServiceId::Files, access)
    }

    pub fn discover_reset(&self, fid: u32) -> Cursor {
        Cursor::reset(&self.descriptors, fid)
    }

    pub fn discover_next(
        &self,
        cursor: &mut Cursor,
        access: &impl AccessControl,
    ) -> Result<&FileDescriptor, Error> {
        cursor.next(&self.descriptors, ServiceId::Files, access)
    }

    /// Reads up to `bytes_requested` bytes at `offset`. Near the end of the file fewer bytes are
    /// returned.
    pub fn read(&mut self, fid: u32, offset: i32, bytes_requested: usize) -> Result<Vec<u8>, Error> {
        let fid = self.file_id(fid)?;
        if bytes_requested > FILE_PACKET_SIZE {
            warning!("files: read of {} bytes exceeds the packet size", bytes_requested);
            return Err(Error::BufferTooSmall);
        }

        let content: &[u8] = match fid {
            FileId::IoTxt => {
                if offset < 0 || offset as usize >= self.io_txt.len() {
                    return Err(Error::NoData);
                }
                if offset == 0 && !self.io_txt_pending {
                    // picks up the stored content in case an earlier write didn't make it
                    if let Err(e) = self.load_io_txt() {
                        error!("files: io.txt refresh failed: {:?}", e);
                    }
                }
                &self.io_txt
            }
            FileId::ReachLogoPng => self.logo,
            FileId::OtaBin => {
                warning!("files: {} can't be read", fid as u32);
                return Err(Error::BadFile);
            }
        };

        if offset < 0 || offset as usize >= content.len() {
            return Err(Error::NoData);
        }
        let offset = offset as usize;
        let end = content.len().min(offset + bytes_requested);
        trace!("files: read {}..{} of {}", offset, end, fid as u32);
        Ok(Vec::from(&content[offset..end]))
    }

    /// Starts a transfer of `total` bytes. Only complete transfers starting at 0 are supported.
    pub fn prepare_write(&mut self, fid: u32, offset: usize, total: usize) -> Result<(), Error> {
        match FileId::from_repr(fid) {
            Some(FileId::OtaBin) => {
                if offset != 0 {
                    return Err(Error::InvalidParameter);
                }
                if total > self.ota.max_image_size() {
                    error!(
                        "files: OTA image of {} bytes exceeds the region of {} bytes",
                        total,
                        self.ota.max_image_size()
                    );
                    return Err(Error::BufferTooSmall);
                }
                self.ota.erase().map_err(|e| {
                    error!("files: OTA erase failed: {:?}", e);
                    Error::WriteFailed
                })
            }
            Some(FileId::IoTxt) => {
                if offset != 0 {
                    return Err(Error::InvalidParameter);
                }
                if total > MAX_IO_TXT_LEN {
                    return Err(Error::BufferTooSmall);
                }
                self.io_txt = vec![0; total];
                self.io_txt_pending = true;
                self.set_io_txt_size();
                Ok(())
            }
            _ => Err(Error::BadFile),
        }
    }

    pub fn write(&mut self, fid: u32, offset: usize, data: &[u8]) -> Result<(), Error> {
        match FileId::from_repr(fid) {
            Some(FileId::OtaBin) => self.ota.write(offset, data).map_err(|e| {
                error!("files: OTA write at {:#x} failed: {:?}", offset, e);
                match e {
                    Error::FlashError => Error::WriteFailed,
                    e => e,
                }
            }),
            Some(FileId::IoTxt) => {
                let end = offset
                    .checked_add(data.len())
                    .filter(|&end| end <= self.io_txt.len())
                    .ok_or(Error::InvalidParameter)?;
                self.io_txt[offset..end].copy_from_slice(data);
                Ok(())
            }
            _ => Err(Error::BadFile),
        }
    }

    /// Commits a transfer: the OTA image gets its trailer, io.txt is written to storage.
    pub fn transfer_complete(&mut self, fid: u32) -> Result<(), Error> {
        match FileId::from_repr(fid) {
            Some(FileId::OtaBin) => {
                self.ota.flush().map_err(|e| {
                    error!("files: OTA flush failed: {:?}", e);
                    Error::WriteFailed
                })?;
                self.ota.mark_valid().map_err(|e| {
                    error!("files: OTA trailer write failed: {:?}", e);
                    Error::WriteFailed
                })
            }
            Some(FileId::IoTxt) => {
                if let Err(e) = self.storage.write(IO_TXT_FILE, &self.io_txt) {
                    error!("files: io.txt write failed: {:?}", e);
                }
                self.io_txt_pending = false;
                self.set_io_txt_size();
                Ok(())
            }
            _ => Err(Error::BadFile),
        }
    }

    /// Empties io.txt. Files without erase support are left untouched.
    pub fn erase(&mut self, fid: u32) -> Result<(), Error> {
        if self.file_id(fid)? == FileId::IoTxt {
            if let Err(e) = self.storage.erase(IO_TXT_FILE) {
                error!("files: io.txt erase failed: {:?}", e);
            }
            self.io_txt.clear();
            self.io_txt_pending = false;
            self.set_io_txt_size();
        }
        Ok(())
    }

    /// Restores io.txt to its default content.
    pub fn reset(&mut self) {
        if let Err(e) = self.storage.write(IO_TXT_FILE, self.io_txt_default) {
            error!("files: io.txt write failed: {:?}", e);
        }
        self.io_txt = Vec::from(self.io_txt_default);
        self.io_txt_pending = false;
        self.set_io_txt_size();
    }

    /// Erases the trailer of the OTA image so the bootloader ignores it.
    pub fn invalidate_ota(&mut self) -> Result<(), Error> {
        self.ota.invalidate()
    }
}
