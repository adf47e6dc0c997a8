use crate::error::Error;
use crate::schema::{DefaultValue, ParameterDescriptor, TypeTag};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

/// Capacity of string and byte array payloads, independent of the descriptor's `max_size`.
pub const MAX_PAYLOAD_LEN: usize = 32;

const RECORD_HEADER_SIZE: usize = 12;

/// Size of one parameter record in the snapshot file:
/// `[id u32][timestamp u32][type u8][len u8][0xFFFF][payload; MAX_PAYLOAD_LEN]`, little endian.
pub const RECORD_SIZE: usize = RECORD_HEADER_SIZE + MAX_PAYLOAD_LEN;

/// Typed content of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    UInt32(u32),
    Int32(i32),
    Float32(f32),
    UInt64(u64),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    Enum(u32),
    Bitfield(u32),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Payload::UInt32(_) => TypeTag::UInt32,
            Payload::Int32(_) => TypeTag::Int32,
            Payload::Float32(_) => TypeTag::Float32,
            Payload::UInt64(_) => TypeTag::UInt64,
            Payload::Int64(_) => TypeTag::Int64,
            Payload::Float64(_) => TypeTag::Float64,
            Payload::Bool(_) => TypeTag::Bool,
            Payload::String(_) => TypeTag::String,
            Payload::Enum(_) => TypeTag::Enum,
            Payload::Bitfield(_) => TypeTag::Bitfield,
            Payload::Bytes(_) => TypeTag::ByteArray,
        }
    }

    /// Zero or empty value of the given type.
    pub fn zero(type_tag: TypeTag) -> Self {
        match type_tag {
            TypeTag::UInt32 => Payload::UInt32(0),
            TypeTag::Int32 => Payload::Int32(0),
            TypeTag::Float32 => Payload::Float32(0.0),
            TypeTag::UInt64 => Payload::UInt64(0),
            TypeTag::Int64 => Payload::Int64(0),
            TypeTag::Float64 => Payload::Float64(0.0),
            TypeTag::Bool => Payload::Bool(false),
            TypeTag::String => Payload::String(String::new()),
            TypeTag::Enum => Payload::Enum(0),
            TypeTag::Bitfield => Payload::Bitfield(0),
            TypeTag::ByteArray => Payload::Bytes(Vec::new()),
        }
    }

    /// The descriptor's default, or zero if there is none. A byte array without default is
    /// `max_size` zero bytes long.
    pub fn default_for(desc: &ParameterDescriptor) -> Self {
        let default = desc
            .metadata
            .default_value
            .map(Payload::from)
            .filter(|payload| payload.type_tag() == desc.type_tag);

        match default {
            Some(mut payload) => {
                payload.clamp(max_len(desc));
                payload
            }
            None if desc.type_tag == TypeTag::ByteArray => Payload::Bytes(vec![0; max_len(desc)]),
            None => Payload::zero(desc.type_tag),
        }
    }

    /// Cuts string and byte payloads to `max` bytes. Strings are cut on a char boundary.
    pub fn clamp(&mut self, max: usize) -> bool {
        match self {
            Payload::String(s) if s.len() > max => {
                let mut end = max;
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                s.truncate(end);
                true
            }
            Payload::Bytes(b) if b.len() > max => {
                b.truncate(max);
                true
            }
            _ => false,
        }
    }

    /// Numeric view used for change detection. `None` for strings and byte arrays.
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match *self {
            Payload::UInt32(v) | Payload::Enum(v) | Payload::Bitfield(v) => Some(v as f64),
            Payload::Int32(v) => Some(v as f64),
            Payload::Float32(v) => Some(v as f64),
            Payload::UInt64(v) => Some(v as f64),
            Payload::Int64(v) => Some(v as f64),
            Payload::Float64(v) => Some(v),
            Payload::Bool(v) => Some(v as u8 as f64),
            Payload::String(_) | Payload::Bytes(_) => None,
        }
    }
}

impl From<DefaultValue> for Payload {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::UInt32(v) => Payload::UInt32(v),
            DefaultValue::Int32(v) => Payload::Int32(v),
            DefaultValue::Float32(v) => Payload::Float32(v),
            DefaultValue::UInt64(v) => Payload::UInt64(v),
            DefaultValue::Int64(v) => Payload::Int64(v),
            DefaultValue::Float64(v) => Payload::Float64(v),
            DefaultValue::Bool(v) => Payload::Bool(v),
            DefaultValue::String(v) => Payload::String(String::from(v)),
            DefaultValue::Enum(v) => Payload::Enum(v),
            DefaultValue::Bitfield(v) => Payload::Bitfield(v),
            DefaultValue::Bytes(v) => Payload::Bytes(Vec::from(v)),
        }
    }
}

/// Maximum payload length of strings and byte arrays of the given parameter.
pub(crate) fn max_len(desc: &ParameterDescriptor) -> usize {
    desc.metadata
        .max_size
        .map_or(MAX_PAYLOAD_LEN, |size| (size as usize).min(MAX_PAYLOAD_LEN))
}

/// Current value of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    pub id: u32,
    /// Uptime in milliseconds at the last write.
    pub timestamp: u32,
    pub payload: Payload,
}

impl ParameterValue {
    pub fn new(id: u32, timestamp: u32, payload: Payload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.payload.type_tag()
    }

    /// Serializes the value into a fixed size snapshot record.
    pub fn to_record(&self) -> [u8; RECORD_SIZE] {
        let mut record = [0u8; RECORD_SIZE];
        record[0..4].copy_from_slice(&self.id.to_le_bytes());
        record[4..8].copy_from_slice(&self.timestamp.to_le_bytes());
        record[8] = self.type_tag() as u8;
        record[10..12].copy_from_slice(&[0xFF, 0xFF]);

        let data = &mut record[RECORD_HEADER_SIZE..];
        let len = match &self.payload {
            Payload::UInt32(v) | Payload::Enum(v) | Payload::Bitfield(v) => {
                put(data, &v.to_le_bytes())
            }
            Payload::Int32(v) => put(data, &v.to_le_bytes()),
            Payload::Float32(v) => put(data, &v.to_le_bytes()),
            Payload::UInt64(v) => put(data, &v.to_le_bytes()),
            Payload::Int64(v) => put(data, &v.to_le_bytes()),
            Payload::Float64(v) => put(data, &v.to_le_bytes()),
            Payload::Bool(v) => put(data, &[*v as u8]),
            Payload::String(s) => put(data, s.as_bytes()),
            Payload::Bytes(b) => put(data, b),
        };
        record[9] = len as u8;
        record
    }

    /// Parses a snapshot record. Rejects unknown type tags, lengths beyond the payload capacity and
    /// strings which are not valid UTF-8.
    pub fn from_record(record: &[u8]) -> Result<Self, Error> {
        if record.len() < RECORD_SIZE {
            return Err(Error::InvalidParameter);
        }
        let id = u32::from_le_bytes(word(&record[0..4]));
        let timestamp = u32::from_le_bytes(word(&record[4..8]));
        let type_tag = TypeTag::from_repr(record[8]).ok_or(Error::InvalidParameter)?;
        let len = record[9] as usize;
        if len > MAX_PAYLOAD_LEN {
            return Err(Error::InvalidParameter);
        }
        let data = &record[RECORD_HEADER_SIZE..RECORD_SIZE];
        let mut wide = [0u8; 8];
        wide.copy_from_slice(&data[..8]);

        let payload = match type_tag {
            TypeTag::UInt32 => Payload::UInt32(u32::from_le_bytes(word(data))),
            TypeTag::Int32 => Payload::Int32(i32::from_le_bytes(word(data))),
            TypeTag::Float32 => Payload::Float32(f32::from_le_bytes(word(data))),
            TypeTag::UInt64 => Payload::UInt64(u64::from_le_bytes(wide)),
            TypeTag::Int64 => Payload::Int64(i64::from_le_bytes(wide)),
            TypeTag::Float64 => Payload::Float64(f64::from_le_bytes(wide)),
            TypeTag::Bool => Payload::Bool(data[0] != 0),
            TypeTag::String => Payload::String(String::from(
                core::str::from_utf8(&data[..len]).map_err(|_| Error::InvalidParameter)?,
            )),
            TypeTag::Enum => Payload::Enum(u32::from_le_bytes(word(data))),
            TypeTag::Bitfield => Payload::Bitfield(u32::from_le_bytes(word(data))),
            TypeTag::ByteArray => Payload::Bytes(Vec::from(&data[..len])),
        };

        Ok(Self {
            id,
            timestamp,
            payload,
        })
    }
}

fn put(dst: &mut [u8], src: &[u8]) -> usize {
    let len = src.len().min(dst.len());
    dst[..len].copy_from_slice(&src[..len]);
    len
}

fn word(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}
