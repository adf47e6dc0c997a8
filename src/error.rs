use thiserror::Error;

/// Errors returned to the protocol layer, which maps them to wire level error codes.
#[derive(Error, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Unknown parameter, extended info, file or command id.
    #[error("invalid id")]
    InvalidId,

    /// A discovery cursor is exhausted or a read started past the end of a file.
    #[error("no data")]
    NoData,

    /// The file does not support the requested operation.
    #[error("bad file")]
    BadFile,

    /// The request exceeds the transport packet limit or the capacity of the backing storage.
    #[error("buffer too small")]
    BufferTooSmall,

    /// Malformed offset/size combination or a value of the wrong type.
    #[error("invalid parameter")]
    InvalidParameter,

    /// The backing storage rejected the write or the application refused the value.
    #[error("write failed")]
    WriteFailed,

    /// The OTA region has to start on an erase block boundary of the flash.
    #[error("invalid region offset")]
    InvalidRegionOffset,

    /// The OTA region size has to be a multiple of the flash erase size.
    #[error("invalid region size")]
    InvalidRegionSize,

    /// The internal error value is returned from the provided `NorFlash` implementation.
    #[error("internal flash error")]
    FlashError,
}

/// Status of a [`crate::platform::BlobStorage`] operation.
#[derive(Error, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The named blob does not exist. Callers usually treat this as "empty".
    #[error("not found")]
    NotFound,

    /// Any other failure reported by the file system, carrying its (negative) status code.
    #[error("storage i/o error {0}")]
    Io(i32),
}
