//! Compiled-in descriptions of every parameter and extended info entry, and the hashes derived
//! from them.
//!
//! The persistence hash is a plain XOR over the 32-bit words of each persistent descriptor's
//! image. It detects schema drift between firmware versions, nothing more: two different tables
//! whose words happen to cancel out produce the same hash.

use crate::error::Error;
use crate::platform::{AccessControl, ServiceId};

/// Bytes reserved for a numeric default value in the descriptor image.
const DEFAULT_FIELD_LEN: usize = 32;

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TypeTag {
    UInt32 = 0,
    Int32 = 1,
    Float32 = 2,
    UInt64 = 3,
    Int64 = 4,
    Float64 = 5,
    Bool = 6,
    String = 7,
    Enum = 8,
    Bitfield = 9,
    ByteArray = 10,
}

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccessLevel {
    Read = 1,
    Write = 2,
    ReadWrite = 3,
}

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageClass {
    /// Lives in RAM only, reset to its default on every boot.
    Volatile = 0,
    /// Kept in the snapshot file and restored on boot.
    Persistent = 1,
}

/// Default value of a parameter. The variant has to match the descriptor's [`TypeTag`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DefaultValue {
    UInt32(u32),
    Int32(i32),
    Float32(f32),
    UInt64(u64),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(&'static str),
    Enum(u32),
    Bitfield(u32),
    Bytes(&'static [u8]),
}

impl DefaultValue {
    fn tag(&self) -> u8 {
        match self {
            DefaultValue::UInt32(_) => TypeTag::UInt32 as u8,
            DefaultValue::Int32(_) => TypeTag::Int32 as u8,
            DefaultValue::Float32(_) => TypeTag::Float32 as u8,
            DefaultValue::UInt64(_) => TypeTag::UInt64 as u8,
            DefaultValue::Int64(_) => TypeTag::Int64 as u8,
            DefaultValue::Float64(_) => TypeTag::Float64 as u8,
            DefaultValue::Bool(_) => TypeTag::Bool as u8,
            DefaultValue::String(_) => TypeTag::String as u8,
            DefaultValue::Enum(_) => TypeTag::Enum as u8,
            DefaultValue::Bitfield(_) => TypeTag::Bitfield as u8,
            DefaultValue::Bytes(_) => TypeTag::ByteArray as u8,
        }
    }

    fn write_image(&self, hasher: &mut XorHasher) {
        hasher.write_field(&[self.tag()], 4);
        match *self {
            DefaultValue::UInt32(v) | DefaultValue::Enum(v) | DefaultValue::Bitfield(v) => {
                hasher.write_field(&v.to_le_bytes(), DEFAULT_FIELD_LEN)
            }
            DefaultValue::Int32(v) => hasher.write_field(&v.to_le_bytes(), DEFAULT_FIELD_LEN),
            DefaultValue::Float32(v) => hasher.write_field(&v.to_le_bytes(), DEFAULT_FIELD_LEN),
            DefaultValue::UInt64(v) => hasher.write_field(&v.to_le_bytes(), DEFAULT_FIELD_LEN),
            DefaultValue::Int64(v) => hasher.write_field(&v.to_le_bytes(), DEFAULT_FIELD_LEN),
            DefaultValue::Float64(v) => hasher.write_field(&v.to_le_bytes(), DEFAULT_FIELD_LEN),
            DefaultValue::Bool(v) => hasher.write_field(&[v as u8], DEFAULT_FIELD_LEN),
            DefaultValue::String(s) => hasher.write_text(s.as_bytes()),
            DefaultValue::Bytes(b) => hasher.write_text(b),
        }
    }
}

/// Type specific details of a parameter. Unused fields stay `None`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TypeMetadata {
    pub unit: Option<&'static str>,
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub default_value: Option<DefaultValue>,
    /// Maximum length of string and byte array payloads.
    pub max_size: Option<u32>,
    /// Number of meaningful bits of a bitfield.
    pub bits_available: Option<u32>,
    /// Id of the [`ExtendedInfo`] entry labelling enum values or bitfield bits.
    pub extended_info_id: Option<u32>,
}

impl TypeMetadata {
    pub const NONE: TypeMetadata = TypeMetadata {
        unit: None,
        range_min: None,
        range_max: None,
        default_value: None,
        max_size: None,
        bits_available: None,
        extended_info_id: None,
    };

    fn write_image(&self, hasher: &mut XorHasher) {
        match self.unit {
            Some(unit) => {
                hasher.write_field(&[1], 4);
                hasher.write_text(unit.as_bytes());
            }
            None => hasher.write_field(&[], 8),
        }
        for bound in [self.range_min, self.range_max] {
            match bound {
                Some(bound) => {
                    hasher.write_field(&[1], 4);
                    hasher.write_field(&bound.to_le_bytes(), 8);
                }
                None => hasher.write_field(&[], 12),
            }
        }
        match &self.default_value {
            Some(default) => {
                hasher.write_field(&[1], 4);
                default.write_image(hasher);
            }
            None => hasher.write_field(&[], 8 + DEFAULT_FIELD_LEN),
        }
        for word in [self.max_size, self.bits_available, self.extended_info_id] {
            match word {
                Some(word) => {
                    hasher.write_field(&[1], 4);
                    hasher.write_field(&word.to_le_bytes(), 4);
                }
                None => hasher.write_field(&[], 8),
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Dense id, equal to the descriptor's index in the table.
    pub id: u32,
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub access: AccessLevel,
    pub storage: StorageClass,
    pub type_tag: TypeTag,
    pub metadata: TypeMetadata,
}

impl ParameterDescriptor {
    pub fn is_persistent(&self) -> bool {
        self.storage == StorageClass::Persistent
    }

    /// Fixed layout image of the full descriptor, folded into `hasher`. Every field takes part so
    /// renaming a parameter or touching any metadata changes the hash.
    fn write_image(&self, hasher: &mut XorHasher) {
        hasher.write_field(&self.id.to_le_bytes(), 4);
        hasher.write_text(self.name.as_bytes());
        match self.description {
            Some(description) => {
                hasher.write_field(&[1], 4);
                hasher.write_text(description.as_bytes());
            }
            None => hasher.write_field(&[], 8),
        }
        hasher.write_field(
            &[self.access as u8, self.storage as u8, self.type_tag as u8],
            4,
        );
        self.metadata.write_image(hasher);
    }
}

/// A human readable name for one enum value or bitfield bit position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Label {
    pub value: u32,
    pub name: &'static str,
}

/// Labels of one enum or bitfield parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExtendedInfo {
    pub id: u32,
    pub parameter_id: u32,
    pub type_tag: TypeTag,
    pub labels: &'static [Label],
}

/// The complete, immutable catalog of parameters and their extended info.
#[derive(Debug, Copy, Clone)]
pub struct Schema {
    pub parameters: &'static [ParameterDescriptor],
    pub extended_info: &'static [ExtendedInfo],
}

impl Schema {
    pub const fn new(
        parameters: &'static [ParameterDescriptor],
        extended_info: &'static [ExtendedInfo],
    ) -> Self {
        Self {
            parameters,
            extended_info,
        }
    }

    /// Looks up a descriptor by id. Ids double as indices, a table entry with a different id
    /// counts as missing.
    pub fn parameter(&self, id: u32) -> Result<&'static ParameterDescriptor, Error> {
        self.parameters
            .get(id as usize)
            .filter(|desc| desc.id == id)
            .ok_or(Error::InvalidId)
    }

    pub fn extended_info(&self, id: u32) -> Result<&'static ExtendedInfo, Error> {
        self.extended_info
            .iter()
            .find(|info| info.id == id)
            .ok_or(Error::InvalidId)
    }

    /// Display name of `value` in the extended info entry `id`.
    pub fn label(&self, id: u32, value: u32) -> Option<&'static str> {
        self.extended_info(id)
            .ok()?
            .labels
            .iter()
            .find(|label| label.value == value)
            .map(|label| label.name)
    }

    pub fn hash_of_persistent_parameters(&self) -> u32 {
        hash_of_persistent_parameters(self.parameters)
    }

    pub fn access_filtered_hash(&self, access: &impl AccessControl) -> u32 {
        access_filtered_hash(self.parameters, self.extended_info, access)
    }
}

/// Hash over all persistent descriptors, stored as header of the snapshot file.
pub fn hash_of_persistent_parameters(parameters: &[ParameterDescriptor]) -> u32 {
    let mut hasher = XorHasher::default();
    parameters
        .iter()
        .filter(|desc| desc.is_persistent())
        .for_each(|desc| desc.write_image(&mut hasher));
    hasher.finish()
}

/// Hash over the descriptors visible to the current peer plus all extended info labels. Only used
/// to negotiate the schema version with the remote side.
pub fn access_filtered_hash(
    parameters: &[ParameterDescriptor],
    extended_info: &[ExtendedInfo],
    access: &impl AccessControl,
) -> u32 {
    let mut hasher = XorHasher::default();
    parameters
        .iter()
        .filter(|desc| access.access_granted(ServiceId::ParameterRepo, desc.id))
        .for_each(|desc| desc.write_image(&mut hasher));

    for info in extended_info {
        hasher.write_field(&info.id.to_le_bytes(), 4);
        hasher.write_field(&info.parameter_id.to_le_bytes(), 4);
        hasher.write_field(&[info.type_tag as u8], 4);
        hasher.write_field(&(info.labels.len() as u32).to_le_bytes(), 4);
        for label in info.labels {
            hasher.write_field(&label.value.to_le_bytes(), 4);
            hasher.write_text(label.name.as_bytes());
        }
    }
    hasher.finish()
}

/// XORs little endian 32-bit words. Every field is zero padded to a multiple of 4 bytes, so the
/// word boundaries match a fixed struct layout. Text is folded in full behind its length word.
#[derive(Default)]
struct XorHasher {
    hash: u32,
}

impl XorHasher {
    fn write_field(&mut self, bytes: &[u8], width: usize) {
        debug_assert!(width.is_multiple_of(4) && bytes.len() <= width);
        self.fold(bytes);
        // the padding is all zeros and doesn't change the hash
    }

    fn write_text(&mut self, bytes: &[u8]) {
        self.fold(&(bytes.len() as u32).to_le_bytes());
        self.fold(bytes);
    }

    fn fold(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.hash ^= u32::from_le_bytes(word);
        }
    }

    fn finish(&self) -> u32 {
        self.hash
    }
}
