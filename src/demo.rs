//! The parameter set, files and board bindings of the demo firmware.

use crate::error::Error;
use crate::hooks::ParameterHook;
use crate::log::debug;
use crate::notify::NotificationConfig;
use crate::params::ParameterStore;
use crate::platform::BlobStorage;
use crate::schema::{
    AccessLevel, DefaultValue, ExtendedInfo, Label, ParameterDescriptor, Schema, StorageClass,
    TypeMetadata, TypeTag,
};
use crate::value::{ParameterValue, Payload};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

/// Names of this length or longer don't fit in the advertisement.
pub const MAX_ADVERTISED_NAME_LEN: usize = 20;

/// Advertised while the user device name is empty.
pub const DEFAULT_DEVICE_NAME: &str = "Reach Demo";

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ParamId {
    UserDeviceName = 0,
    TimezoneEnabled = 1,
    TimezoneOffset = 2,
    BtDeviceAddress = 3,
    Uptime = 4,
    ButtonPressed = 5,
    IdentifyLed = 6,
    RgbLedState = 7,
    RgbLedColor = 8,
    Identify = 9,
    IdentifyInterval = 10,
}

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ExtendedInfoId {
    IdentifyLed = 0,
    RgbLedState = 1,
    RgbLedColor = 2,
}

pub const PARAMETERS: [ParameterDescriptor; 11] = [
    ParameterDescriptor {
        id: ParamId::UserDeviceName as u32,
        name: "User Device Name",
        description: Some("The advertised BLE name"),
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Persistent,
        type_tag: TypeTag::String,
        metadata: TypeMetadata {
            max_size: Some(29),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::TimezoneEnabled as u32,
        name: "Timezone Enabled",
        description: None,
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Persistent,
        type_tag: TypeTag::Bool,
        metadata: TypeMetadata {
            default_value: Some(DefaultValue::Bool(true)),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::TimezoneOffset as u32,
        name: "Timezone Offset",
        description: None,
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Persistent,
        type_tag: TypeTag::Int32,
        metadata: TypeMetadata {
            unit: Some("seconds"),
            range_min: Some(-43200.0),
            range_max: Some(43200.0),
            default_value: Some(DefaultValue::Int32(0)),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::BtDeviceAddress as u32,
        name: "BT Device Address",
        description: None,
        access: AccessLevel::Read,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::ByteArray,
        metadata: TypeMetadata {
            max_size: Some(6),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::Uptime as u32,
        name: "Uptime",
        description: None,
        access: AccessLevel::Read,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::Int64,
        metadata: TypeMetadata {
            unit: Some("milliseconds"),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::ButtonPressed as u32,
        name: "Button Pressed",
        description: None,
        access: AccessLevel::Read,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::Bool,
        metadata: TypeMetadata::NONE,
    },
    ParameterDescriptor {
        id: ParamId::IdentifyLed as u32,
        name: "Identify LED",
        description: None,
        access: AccessLevel::Read,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::Bool,
        metadata: TypeMetadata {
            extended_info_id: Some(ExtendedInfoId::IdentifyLed as u32),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::RgbLedState as u32,
        name: "RGB LED State",
        description: Some("Reset on disconnection"),
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::Bitfield,
        metadata: TypeMetadata {
            bits_available: Some(3),
            extended_info_id: Some(ExtendedInfoId::RgbLedState as u32),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::RgbLedColor as u32,
        name: "RGB LED Color",
        description: Some("Reset on disconnection"),
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::Enum,
        metadata: TypeMetadata {
            range_min: Some(0.0),
            range_max: Some(7.0),
            extended_info_id: Some(ExtendedInfoId::RgbLedColor as u32),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::Identify as u32,
        name: "Identify",
        description: Some("Turn on to blink the green LED"),
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Volatile,
        type_tag: TypeTag::Bool,
        metadata: TypeMetadata {
            default_value: Some(DefaultValue::Bool(false)),
            ..TypeMetadata::NONE
        },
    },
    ParameterDescriptor {
        id: ParamId::IdentifyInterval as u32,
        name: "Identify Interval",
        description: None,
        access: AccessLevel::ReadWrite,
        storage: StorageClass::Persistent,
        type_tag: TypeTag::Float32,
        metadata: TypeMetadata {
            range_min: Some(0.01),
            range_max: Some(60.0),
            default_value: Some(DefaultValue::Float32(1.0)),
            ..TypeMetadata::NONE
        },
    },
];

pub const EXTENDED_INFO: [ExtendedInfo; 3] = [
    ExtendedInfo {
        id: ExtendedInfoId::IdentifyLed as u32,
        parameter_id: ParamId::IdentifyLed as u32,
        type_tag: TypeTag::Bool,
        labels: &[
            Label { value: 0, name: "Off" },
            Label { value: 1, name: "Illuminated" },
        ],
    },
    ExtendedInfo {
        id: ExtendedInfoId::RgbLedState as u32,
        parameter_id: ParamId::RgbLedState as u32,
        type_tag: TypeTag::Bitfield,
        labels: &[
            Label { value: 0, name: "Red" },
            Label { value: 1, name: "Green" },
            Label { value: 2, name: "Blue" },
        ],
    },
    ExtendedInfo {
        id: ExtendedInfoId::RgbLedColor as u32,
        parameter_id: ParamId::RgbLedColor as u32,
        type_tag: TypeTag::Enum,
        labels: &[
            Label { value: 0, name: "Off" },
            Label { value: 1, name: "Red" },
            Label { value: 2, name: "Green" },
            Label { value: 3, name: "Yellow" },
            Label { value: 4, name: "Blue" },
            Label { value: 5, name: "Magenta" },
            Label { value: 6, name: "Cyan" },
            Label { value: 7, name: "White" },
        ],
    },
];

pub const SCHEMA: Schema = Schema::new(&PARAMETERS, &EXTENDED_INFO);

pub const NOTIFICATIONS: [NotificationConfig; 8] = [
    notification(ParamId::TimezoneEnabled, 1000),
    notification(ParamId::TimezoneOffset, 1000),
    notification(ParamId::Uptime, 100),
    notification(ParamId::ButtonPressed, 100),
    notification(ParamId::IdentifyLed, 100),
    notification(ParamId::RgbLedState, 1000),
    notification(ParamId::RgbLedColor, 1000),
    notification(ParamId::Identify, 1000),
];

const fn notification(id: ParamId, minimum_period_ms: u32) -> NotificationConfig {
    NotificationConfig {
        parameter_id: id as u32,
        minimum_period_ms,
        minimum_delta: 1.0,
    }
}

pub const DEFAULT_IO_TXT: &[u8] =
    b"Reach demo io.txt\nThis file is stored on the device and can be rewritten over Reach.\n";

/// 1x1 transparent PNG.
pub const REACH_LOGO_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

/// The hardware and radio state behind the demo parameters.
pub trait Board {
    /// Bluetooth address, least significant byte first.
    fn device_address(&self) -> [u8; 6];
    fn uptime_ms(&self) -> i64;
    fn button_pressed(&self) -> bool;
    fn identify_led_on(&self) -> bool;
    /// Bit 0 red, bit 1 green, bit 2 blue.
    fn rgb_led_state(&self) -> u8;
    fn set_rgb_led_state(&mut self, state: u8);
    fn identify_enabled(&self) -> bool;
    fn enable_identify(&mut self, enable: bool);
    fn set_identify_interval(&mut self, seconds: f32);
    fn set_advertised_name(&mut self, name: &str);
}

/// Connects the demo parameters to a [`Board`].
pub struct BoardHook<B: Board> {
    board: Rc<RefCell<B>>,
}

impl<B: Board> Clone for BoardHook<B> {
    fn clone(&self) -> Self {
        Self {
            board: self.board.clone(),
        }
    }
}

impl<B: Board> BoardHook<B> {
    pub fn new(board: Rc<RefCell<B>>) -> Self {
        Self { board }
    }
}

impl<B: Board> ParameterHook for BoardHook<B> {
    fn on_init(&mut self, value: &mut ParameterValue) {
        match ParamId::from_repr(value.id) {
            Some(ParamId::IdentifyInterval) => {
                if let Payload::Float32(seconds) = value.payload {
                    self.board.borrow_mut().set_identify_interval(seconds);
                }
            }
            Some(ParamId::UserDeviceName) => {
                if let Payload::String(name) = &value.payload {
                    if !name.is_empty() {
                        self.board.borrow_mut().set_advertised_name(name);
                    }
                }
            }
            _ => self.on_read(value),
        }
    }

    fn on_read(&mut self, value: &mut ParameterValue) {
        let board = self.board.borrow();
        let payload = match ParamId::from_repr(value.id) {
            Some(ParamId::BtDeviceAddress) => {
                // most significant byte first, the way addresses are usually displayed
                Payload::Bytes(board.device_address().iter().rev().copied().collect::<Vec<_>>())
            }
            Some(ParamId::Uptime) => Payload::Int64(board.uptime_ms()),
            Some(ParamId::ButtonPressed) => Payload::Bool(board.button_pressed()),
            Some(ParamId::IdentifyLed) => Payload::Bool(board.identify_led_on()),
            Some(ParamId::RgbLedColor) => Payload::Enum(board.rgb_led_state() as u32),
            Some(ParamId::RgbLedState) => Payload::Bitfield(board.rgb_led_state() as u32),
            Some(ParamId::Identify) => Payload::Bool(board.identify_enabled()),
            _ => return,
        };
        value.payload = payload;
    }

    fn validate(&mut self, value: &ParameterValue) -> Result<(), Error> {
        match &value.payload {
            Payload::String(name)
                if value.id == ParamId::UserDeviceName as u32
                    && name.len() >= MAX_ADVERTISED_NAME_LEN =>
            {
                debug!("demo: device name of {} bytes is too long", name.len());
                Err(Error::WriteFailed)
            }
            _ => Ok(()),
        }
    }

    fn on_write(&mut self, value: &ParameterValue) {
        let mut board = self.board.borrow_mut();
        match (ParamId::from_repr(value.id), &value.payload) {
            (Some(ParamId::UserDeviceName), Payload::String(name)) if name.is_empty() => {
                board.set_advertised_name(DEFAULT_DEVICE_NAME)
            }
            (Some(ParamId::UserDeviceName), Payload::String(name)) => {
                board.set_advertised_name(name)
            }
            (Some(ParamId::RgbLedState), Payload::Bitfield(state))
            | (Some(ParamId::RgbLedColor), Payload::Enum(state)) => {
                board.set_rgb_led_state(*state as u8)
            }
            (Some(ParamId::Identify), Payload::Bool(enable)) => board.enable_identify(*enable),
            (Some(ParamId::IdentifyInterval), Payload::Float32(seconds)) => {
                board.set_identify_interval(*seconds)
            }
            _ => {}
        }
    }
}

/// Registers a [`BoardHook`] for every demo parameter.
pub fn register_board_hooks<S: BlobStorage, B: Board + 'static>(
    store: &mut ParameterStore<S>,
    board: Rc<RefCell<B>>,
) -> Result<(), Error> {
    let hook = BoardHook::new(board);
    for desc in PARAMETERS.iter() {
        store.register_hook(desc.id, hook.clone())?;
    }
    Ok(())
}
