use crate::discovery::{self, CatalogEntry, Cursor};
use crate::error::Error;
use crate::files::FileStore;
use crate::log::{debug, error};
use crate::params::ParameterStore;
use crate::platform::{AccessControl, BlobStorage, ServiceId};
use embedded_storage::nor_flash::NorFlash;

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum CommandId {
    Reboot = 0,
    ResetDefaults = 1,
    InvalidateOtaImage = 2,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub id: u32,
    pub name: &'static str,
}

impl CatalogEntry for CommandDescriptor {
    fn id(&self) -> u32 {
        self.id
    }
}

pub const COMMANDS: [CommandDescriptor; 3] = [
    CommandDescriptor {
        id: CommandId::Reboot as u32,
        name: "Reboot",
    },
    CommandDescriptor {
        id: CommandId::ResetDefaults as u32,
        name: "Reset Defaults",
    },
    CommandDescriptor {
        id: CommandId::InvalidateOtaImage as u32,
        name: "Invalidate OTA Image",
    },
];

/// Process level services of the device.
pub trait System {
    /// Restarts the device. Doesn't return on hardware.
    fn reboot(&mut self);
}

impl<T: System> System for &mut T {
    fn reboot(&mut self) {
        (*self).reboot()
    }
}

/// Number of commands the peer may see.
pub fn count(access: &impl AccessControl) -> usize {
    discovery::count(&COMMANDS, ServiceId::Commands, access)
}

pub fn discover_reset(cid: u32) -> Cursor {
    Cursor::reset(&COMMANDS, cid)
}

pub fn discover_next(
    cursor: &mut Cursor,
    access: &impl AccessControl,
) -> Result<&'static CommandDescriptor, Error> {
    cursor.next(&COMMANDS, ServiceId::Commands, access)
}

/// Runs command `cid`. Unknown commands fail with `InvalidParameter`, failed ones with `NoData`.
pub fn execute<P, S, F>(
    cid: u32,
    params: &mut ParameterStore<P>,
    files: &mut FileStore<S, F>,
    system: &mut impl System,
    timestamp: u32,
) -> Result<(), Error>
where
    P: BlobStorage,
    S: BlobStorage,
    F: NorFlash,
{
    let command = CommandId::from_repr(cid).ok_or(Error::InvalidParameter)?;
    debug!("commands: executing {}", cid);

    let result = match command {
        CommandId::Reboot => {
            system.reboot();
            Ok(())
        }
        CommandId::ResetDefaults => {
            let result = params.reset_all_persistent_to_default(timestamp);
            files.reset();
            result
        }
        CommandId::InvalidateOtaImage => files.invalidate_ota(),
    };

    result.map_err(|e| {
        error!("commands: {} failed: {:?}", cid, e);
        Error::NoData
    })
}
