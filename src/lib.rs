#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

extern crate alloc;
#[cfg(feature = "debug-logs")]
extern crate std;

mod log;

pub mod commands;
pub mod demo;
pub mod discovery;
pub mod error;
pub mod files;
pub mod hooks;
pub mod notify;
pub mod ota;
pub mod params;
pub mod platform;
pub mod schema;
pub mod snapshot;
pub mod time;
pub mod value;

pub use error::{Error, StorageError};
pub use files::{FileDescriptor, FileId, FileStore};
pub use hooks::ParameterHook;
pub use notify::{NotificationConfig, NotificationMonitor};
pub use ota::OtaRegion;
pub use params::ParameterStore;
pub use platform::{AccessControl, AllowAll, BlobStorage, Notifier, ServiceId};
pub use schema::{ParameterDescriptor, Schema, TypeTag};
pub use time::{Clock, TimeReport};
pub use value::{ParameterValue, Payload};
