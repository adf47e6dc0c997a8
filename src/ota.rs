//! Streaming writes of a firmware image into a raw flash region.
//!
//! Chunks arrive at arbitrary offsets and sizes, flash takes only aligned writes. A RAM window of
//! [`OTA_WINDOW_SIZE`] bytes collects chunks and goes to flash when it is full or the stream jumps
//! past it. Offsets have to be non-decreasing, data before the current window is already on flash
//! and can't be rewritten.

use crate::error::Error;
use crate::log::{debug, trace, warning};
use crate::platform::{align_ceil, align_floor};
use alloc::vec;
use alloc::vec::Vec;
use embedded_storage::nor_flash::NorFlash;

pub const OTA_WINDOW_SIZE: usize = 4096;
pub const OTA_WRITE_ALIGN: usize = 4;

/// Marks the image in the region as complete. Written to the last 16 bytes of the region, checked
/// by the bootloader.
pub const OTA_TRAILER: [u8; 16] = [
    0x77, 0xc2, 0x95, 0xf3, 0x60, 0xd2, 0xef, 0x7f, 0x35, 0x52, 0x50, 0x0f, 0x2c, 0xb6, 0x79, 0x80,
];

/// The flash region receiving the OTA image.
pub struct OtaRegion<F: NorFlash> {
    flash: F,
    offset: u32,
    size: u32,
    cache: WriteCache,
}

impl<F: NorFlash> OtaRegion<F> {
    /// The region has to start and end on erase block boundaries and leave room for the trailer.
    pub fn new(flash: F, offset: u32, size: u32) -> Result<Self, Error> {
        if offset as usize % F::ERASE_SIZE != 0 {
            return Err(Error::InvalidRegionOffset);
        }
        if size == 0
            || size as usize % F::ERASE_SIZE != 0
            || (size as usize) <= OTA_TRAILER.len()
            || OTA_WRITE_ALIGN % F::WRITE_SIZE != 0
        {
            return Err(Error::InvalidRegionSize);
        }
        if offset as usize + size as usize > flash.capacity() {
            return Err(Error::InvalidRegionSize);
        }

        Ok(Self {
            flash,
            offset,
            size,
            cache: WriteCache::new(),
        })
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Largest image which fits in front of the trailer.
    pub fn max_image_size(&self) -> usize {
        self.size as usize - OTA_TRAILER.len()
    }

    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Erases the whole region and resets the window to the start of the region.
    pub fn erase(&mut self) -> Result<(), Error> {
        debug!("ota: erasing {} bytes at {:#x}", self.size, self.offset);
        self.cache.reset();
        self.flash
            .erase(self.offset, self.offset + self.size)
            .map_err(|_| Error::FlashError)
    }

    /// Buffers `data` destined for `offset` within the region.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Error> {
        if offset
            .checked_add(data.len())
            .is_none_or(|end| end > self.max_image_size())
        {
            warning!("ota: write of {} bytes at {} exceeds region", data.len(), offset);
            return Err(Error::BufferTooSmall);
        }

        // every chunk plus the alignment slack of a re-based window has to fit in the window
        for (index, chunk) in data.chunks(OTA_WINDOW_SIZE - OTA_WRITE_ALIGN).enumerate() {
            let chunk_offset = offset + index * (OTA_WINDOW_SIZE - OTA_WRITE_ALIGN);
            self.cache
                .write(&mut self.flash, self.offset, chunk_offset, chunk)?;
        }
        Ok(())
    }

    /// Writes the buffered remainder to flash.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.cache.flush(&mut self.flash, self.offset)
    }

    /// Writes the trailer, the image counts as valid from here on.
    pub fn mark_valid(&mut self) -> Result<(), Error> {
        let at = self.offset + self.size - OTA_TRAILER.len() as u32;
        debug!("ota: writing trailer at {:#x}", at);
        self.flash
            .write(at, &OTA_TRAILER)
            .map_err(|_| Error::FlashError)
    }

    /// Erases the erase block holding the trailer.
    pub fn invalidate(&mut self) -> Result<(), Error> {
        let end = self.offset as usize + self.size as usize;
        let from = align_floor(end - OTA_TRAILER.len(), F::ERASE_SIZE);
        debug!("ota: invalidating image, erasing {:#x}..{:#x}", from, end);
        self.flash
            .erase(from as u32, end as u32)
            .map_err(|_| Error::FlashError)
    }
}

/// The RAM window. `start` is the region offset of `buf[0]`, `valid` the number of buffered bytes
/// counted from `start`.
struct WriteCache {
    buf: Vec<u8>,
    start: usize,
    valid: usize,
}

impl WriteCache {
    fn new() -> Self {
        Self {
            buf: vec![0; OTA_WINDOW_SIZE],
            start: 0,
            valid: 0,
        }
    }

    fn reset(&mut self) {
        self.buf.fill(0);
        self.start = 0;
        self.valid = 0;
    }

    fn copy(&mut self, offset: usize, data: &[u8]) {
        let at = offset - self.start;
        self.buf[at..at + data.len()].copy_from_slice(data);
        self.valid = self.valid.max(at + data.len());
    }

    /// `data` is at most `OTA_WINDOW_SIZE - OTA_WRITE_ALIGN` bytes.
    fn write<F: NorFlash>(
        &mut self,
        flash: &mut F,
        base: u32,
        mut offset: usize,
        mut data: &[u8],
    ) -> Result<(), Error> {
        if offset < self.start {
            let flushed = self.start - offset;
            if flushed >= data.len() {
                warning!("ota: write at {} lies before the window at {}", offset, self.start);
                return Err(Error::InvalidParameter);
            }
            trace!("ota: dropping {} bytes already on flash", flushed);
            data = &data[flushed..];
            offset = self.start;
        }

        let end = offset + data.len() - self.start;
        if end < OTA_WINDOW_SIZE {
            self.copy(offset, data);
        } else if offset - self.start > OTA_WINDOW_SIZE {
            self.flush(flash, base)?;
            self.start = align_floor(offset, OTA_WRITE_ALIGN);
            self.copy(offset, data);
        } else {
            let head = self.start + OTA_WINDOW_SIZE - offset;
            self.copy(offset, &data[..head]);
            self.flush(flash, base)?;
            self.start += OTA_WINDOW_SIZE;
            let tail = &data[head..];
            if !tail.is_empty() {
                self.copy(self.start, tail);
            }
        }
        Ok(())
    }

    fn flush<F: NorFlash>(&mut self, flash: &mut F, base: u32) -> Result<(), Error> {
        if self.valid == 0 {
            return Ok(());
        }

        let len = align_ceil(self.valid, OTA_WRITE_ALIGN);
        trace!("ota: flushing {} bytes at {}", len, self.start);
        flash
            .write(base + self.start as u32, &self.buf[..len])
            .map_err(|_| Error::FlashError)?;

        self.buf.fill(0);
        self.valid = 0;
        Ok(())
    }
}
