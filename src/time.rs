//! Wall clock service backed by the `TimezoneEnabled` and `TimezoneOffset` parameters of the
//! demo schema.

use crate::demo::ParamId;
use crate::error::Error;
use crate::log::debug;
use crate::params::ParameterStore;
use crate::platform::BlobStorage;
use crate::value::{ParameterValue, Payload};

/// Real time clock of the device.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now_utc(&mut self) -> i64;

    fn set_utc(&mut self, seconds: i64);
}

impl<T: Clock> Clock for &mut T {
    fn now_utc(&mut self) -> i64 {
        (*self).now_utc()
    }

    fn set_utc(&mut self, seconds: i64) {
        (*self).set_utc(seconds)
    }
}

/// Answer to a time request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeReport {
    pub seconds_utc: i64,
    /// The configured offset in seconds, present when the timezone is enabled.
    pub timezone: Option<i32>,
}

/// Reads the clock. With the timezone disabled the offset is already applied to `seconds_utc`,
/// with it enabled the peer receives the offset and applies it itself.
pub fn time_get<S: BlobStorage>(
    params: &mut ParameterStore<S>,
    clock: &mut impl Clock,
) -> Result<TimeReport, Error> {
    let enabled = match params.read(ParamId::TimezoneEnabled as u32)?.payload {
        Payload::Bool(enabled) => enabled,
        _ => false,
    };
    let offset = match params.read(ParamId::TimezoneOffset as u32)?.payload {
        Payload::Int32(offset) => offset,
        _ => 0,
    };

    let now = clock.now_utc();
    Ok(if enabled {
        TimeReport {
            seconds_utc: now,
            timezone: Some(offset),
        }
    } else {
        TimeReport {
            seconds_utc: now + i64::from(offset),
            timezone: None,
        }
    })
}

/// Sets the clock. A given timezone is written to the `TimezoneOffset` parameter, so it goes
/// through the usual validation and is persisted.
pub fn time_set<S: BlobStorage>(
    params: &mut ParameterStore<S>,
    clock: &mut impl Clock,
    seconds_utc: i64,
    timezone: Option<i32>,
    timestamp: u32,
) -> Result<(), Error> {
    debug!("time: set to {}", seconds_utc);
    clock.set_utc(seconds_utc);
    match timezone {
        Some(offset) => params.write(ParameterValue::new(
            ParamId::TimezoneOffset as u32,
            timestamp,
            Payload::Int32(offset),
        )),
        None => Ok(()),
    }
}
