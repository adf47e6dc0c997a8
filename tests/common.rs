#![allow(dead_code)]

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use reach_param_repo::commands::System;
use reach_param_repo::demo::Board;
use reach_param_repo::{BlobStorage, Clock, Error, Notifier, StorageError};
use std::collections::BTreeMap;

pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const WORD_SIZE: usize = 4;

/// RAM file system. Every call counts as one operation; once `fail_after_operation` operations
/// were executed, all further calls fail with `StorageError::Io(-5)`.
#[derive(Default)]
pub struct MemStorage {
    pub files: BTreeMap<String, Vec<u8>>,
    pub fail_after_operation: usize,
    pub operations: Vec<BlobOperation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum BlobOperation {
    Exists { name: String },
    Size { name: String },
    Read { name: String, offset: usize, len: usize },
    Write { name: String, len: usize },
    WriteAt { name: String, offset: usize, len: usize },
    Erase { name: String },
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn file(&self, name: &str) -> Option<&Vec<u8>> {
        self.files.get(name)
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, BlobOperation::Write { .. } | BlobOperation::WriteAt { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn record(&mut self, op: BlobOperation) -> Result<(), StorageError> {
        println!("    storage: {:?} #{:>2}", op, self.operations.len());
        if self.operations.len() >= self.fail_after_operation {
            println!("    storage: FAULT");
            return Err(StorageError::Io(-5));
        }
        self.operations.push(op);
        Ok(())
    }
}

impl BlobStorage for MemStorage {
    fn exists(&mut self, name: &str) -> Result<bool, StorageError> {
        self.record(BlobOperation::Exists { name: name.into() })?;
        Ok(self.files.contains_key(name))
    }

    fn size(&mut self, name: &str) -> Result<usize, StorageError> {
        self.record(BlobOperation::Size { name: name.into() })?;
        self.files.get(name).map(Vec::len).ok_or(StorageError::NotFound)
    }

    fn read(&mut self, name: &str, offset: usize, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.record(BlobOperation::Read {
            name: name.into(),
            offset,
            len: buf.len(),
        })?;
        let file = self.files.get(name).ok_or(StorageError::NotFound)?;
        if offset >= file.len() {
            return Ok(0);
        }
        let len = buf.len().min(file.len() - offset);
        buf[..len].copy_from_slice(&file[offset..offset + len]);
        Ok(len)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        self.record(BlobOperation::Write {
            name: name.into(),
            len: data.len(),
        })?;
        self.files.insert(name.into(), data.to_vec());
        Ok(())
    }

    fn write_at(&mut self, name: &str, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.record(BlobOperation::WriteAt {
            name: name.into(),
            offset,
            len: data.len(),
        })?;
        let file = self.files.get_mut(name).ok_or(StorageError::NotFound)?;
        if offset > file.len() {
            return Err(StorageError::Io(-22));
        }
        let end = offset + data.len();
        if end > file.len() {
            file.resize(end, 0);
        }
        file[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, name: &str) -> Result<(), StorageError> {
        self.record(BlobOperation::Erase { name: name.into() })?;
        self.files.remove(name);
        Ok(())
    }
}

/// NOR flash in RAM with the geometry of the OTA partition. Bits can only be cleared by writes,
/// alignment violations panic. Fault injection works like [`MemStorage`].
#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<FlashOperation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum FlashOperation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { from: u32, to: u32 },
}

impl Flash {
    pub fn new(sectors: usize) -> Self {
        Self::new_with_fault(sectors, usize::MAX)
    }

    pub fn new_with_fault(sectors: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xff; FLASH_SECTOR_SIZE * sectors],
            fail_after_operation,
            operations: Vec::new(),
        }
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, FlashOperation::Erase { .. }))
            .count()
    }

    /// `(offset, len)` of every write, in order.
    pub fn writes(&self) -> Vec<(u32, usize)> {
        self.operations
            .iter()
            .filter_map(|op| match *op {
                FlashOperation::Write { offset, len } => Some((offset, len)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, op: FlashOperation) -> Result<(), FlashError> {
        println!("    flash: {:?} #{:>2}", op, self.operations.len());
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        self.operations.push(op);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.record(FlashOperation::Read {
            offset,
            len: bytes.len(),
        })?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.buf[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;
    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from <= to, "erase {from:#x}..{to:#x} is reversed");
        assert!(from.is_multiple_of(Self::ERASE_SIZE as u32));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as u32));

        self.record(FlashOperation::Erase { from, to })?;
        self.buf[from as usize..to as usize].fill(0xff);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(!bytes.is_empty());
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as u32));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE));

        self.record(FlashOperation::Write {
            offset,
            len: bytes.len(),
        })?;
        let start = offset as usize;
        // programming clears bits, a second write without erase corrupts the data
        for (cell, byte) in self.buf[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= byte;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FakeBoard {
    pub address: [u8; 6],
    pub uptime_ms: i64,
    pub button_pressed: bool,
    pub identify_led_on: bool,
    pub rgb_led_state: u8,
    pub identify_enabled: bool,
    pub identify_interval: Option<f32>,
    pub advertised_name: Option<String>,
}

impl Board for FakeBoard {
    fn device_address(&self) -> [u8; 6] {
        self.address
    }

    fn uptime_ms(&self) -> i64 {
        self.uptime_ms
    }

    fn button_pressed(&self) -> bool {
        self.button_pressed
    }

    fn identify_led_on(&self) -> bool {
        self.identify_led_on
    }

    fn rgb_led_state(&self) -> u8 {
        self.rgb_led_state
    }

    fn set_rgb_led_state(&mut self, state: u8) {
        self.rgb_led_state = state;
    }

    fn identify_enabled(&self) -> bool {
        self.identify_enabled
    }

    fn enable_identify(&mut self, enable: bool) {
        self.identify_enabled = enable;
    }

    fn set_identify_interval(&mut self, seconds: f32) {
        self.identify_interval = Some(seconds);
    }

    fn set_advertised_name(&mut self, name: &str) {
        self.advertised_name = Some(name.into());
    }
}

/// Collects pushed notifications. Without a subscriber every push fails.
#[derive(Default)]
pub struct RecordingNotifier {
    pub subscribed: bool,
    pub sent: Vec<Vec<u8>>,
}

impl RecordingNotifier {
    pub fn subscribed() -> Self {
        Self {
            subscribed: true,
            sent: Vec::new(),
        }
    }

    /// Parameter ids of the pushed records, in order.
    pub fn ids(&self) -> Vec<u32> {
        self.sent
            .iter()
            .map(|record| u32::from_le_bytes([record[0], record[1], record[2], record[3]]))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if !self.subscribed {
            return Err(Error::NoData);
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSystem {
    pub reboots: usize,
}

impl System for FakeSystem {
    fn reboot(&mut self) {
        self.reboots += 1;
    }
}

#[derive(Default)]
pub struct FakeClock {
    pub seconds: i64,
}

impl Clock for FakeClock {
    fn now_utc(&mut self) -> i64 {
        self.seconds
    }

    fn set_utc(&mut self, seconds: i64) {
        self.seconds = seconds;
    }
}
