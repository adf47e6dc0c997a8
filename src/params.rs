use crate::discovery::{self, Cursor, ExtendedInfoCursor, ExtendedInfoPage};
use crate::error::Error;
use crate::hooks::{NoopHook, ParameterHook};
use crate::log::{debug, error, trace, warning};
use crate::platform::{AccessControl, BlobStorage, ServiceId};
use crate::schema::{ParameterDescriptor, Schema};
use crate::snapshot::{Snapshot, SnapshotState};
use crate::value::{ParameterValue, Payload, max_len};
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Typed parameter values backed by a snapshot file on `S`.
///
/// Values start out as their defaults. [`ParameterStore::init`] reconciles them with the
/// snapshot and has to run once, after all hooks are registered and before the store serves
/// requests.
pub struct ParameterStore<S: BlobStorage> {
    schema: Schema,
    storage: S,
    values: Vec<ParameterValue>,
    hooks: Vec<Box<dyn ParameterHook>>,
    snapshot: Snapshot,
}

impl<S: BlobStorage> ParameterStore<S> {
    pub fn new(schema: Schema, storage: S) -> Self {
        let values = schema
            .parameters
            .iter()
            .map(|desc| ParameterValue::new(desc.id, 0, Payload::default_for(desc)))
            .collect();
        let hooks = schema
            .parameters
            .iter()
            .map(|_| Box::new(NoopHook) as Box<dyn ParameterHook>)
            .collect();

        Self {
            schema,
            storage,
            values,
            hooks,
            snapshot: Snapshot::new(schema.parameters.len()),
        }
    }

    /// Replaces the hook of parameter `id`.
    pub fn register_hook(&mut self, id: u32, hook: impl ParameterHook + 'static) -> Result<(), Error> {
        self.schema.parameter(id)?;
        self.hooks[id as usize] = Box::new(hook);
        Ok(())
    }

    /// Loads every parameter: default, then the snapshot record if persistent, then the init hook.
    /// Storage failures don't fail init, they disable persistence (see
    /// [`ParameterStore::persistence_failed`]).
    pub fn init(&mut self) {
        let hash = self.schema.hash_of_persistent_parameters();
        debug!("params: init, schema hash {:#x}", hash);
        self.snapshot.begin(&mut self.storage, hash);

        let parameters = self.schema.parameters;
        for (index, desc) in parameters.iter().enumerate() {
            let value = &mut self.values[index];
            *value = ParameterValue::new(desc.id, 0, Payload::default_for(desc));
            if desc.is_persistent() {
                self.snapshot.reconcile(&mut self.storage, desc, value);
            }
            self.hooks[index].on_init(value);
        }

        self.snapshot.finish(&mut self.storage);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn storage(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn snapshot_state(&self) -> SnapshotState {
        self.snapshot.state()
    }

    /// Whether persistence was disabled by a storage failure during init.
    pub fn persistence_failed(&self) -> bool {
        self.snapshot.access_failed()
    }

    /// Slot of a persistent parameter in the snapshot file, assigned during init.
    pub fn snapshot_slot(&self, id: u32) -> Option<usize> {
        self.snapshot.slot(id)
    }

    /// Refreshes the value through its hook and returns it.
    pub fn read(&mut self, id: u32) -> Result<&ParameterValue, Error> {
        self.schema.parameter(id)?;
        let index = id as usize;
        self.hooks[index].on_read(&mut self.values[index]);
        Ok(&self.values[index])
    }

    /// Validates, persists and applies a new value. Nothing changes if any step fails. Strings and
    /// byte arrays longer than allowed are truncated.
    pub fn write(&mut self, mut value: ParameterValue) -> Result<(), Error> {
        let desc = self.schema.parameter(value.id)?;
        if value.type_tag() != desc.type_tag {
            warning!(
                "params: write of {} with type {}, expected {}",
                desc.id,
                value.type_tag() as u8,
                desc.type_tag as u8
            );
            return Err(Error::InvalidParameter);
        }

        let index = desc.id as usize;
        self.hooks[index].validate(&value)?;

        if value.payload.clamp(max_len(desc)) {
            debug!("params: truncated value of {} to {} bytes", desc.id, max_len(desc));
        }

        if desc.is_persistent() {
            self.snapshot.write_slot(&mut self.storage, &value)?;
        }

        trace!("params: write {} at {}", desc.id, value.timestamp);
        self.hooks[index].on_write(&value);
        self.values[index] = value;
        Ok(())
    }

    /// Restores the default of one parameter. With `persist` the default goes through
    /// [`ParameterStore::write`] and takes `timestamp`, otherwise only memory changes and the
    /// current timestamp is kept.
    pub fn reset_to_default(&mut self, id: u32, persist: bool, timestamp: u32) -> Result<(), Error> {
        let desc = self.schema.parameter(id)?;
        let payload = Payload::default_for(desc);
        if persist {
            self.write(ParameterValue::new(id, timestamp, payload))
        } else {
            self.values[id as usize].payload = payload;
            Ok(())
        }
    }

    /// Resets every persistent parameter. Keeps going after a failure and returns the last one.
    pub fn reset_all_persistent_to_default(&mut self, timestamp: u32) -> Result<(), Error> {
        let parameters = self.schema.parameters;
        let mut result = Ok(());
        for desc in parameters.iter().filter(|desc| desc.is_persistent()) {
            if let Err(e) = self.reset_to_default(desc.id, true, timestamp) {
                error!("params: reset of {} failed: {:?}", desc.id, e);
                result = Err(e);
            }
        }
        result
    }

    /// Number of parameters the peer may see.
    pub fn count(&self, access: &impl AccessControl) -> usize {
        discovery::count(self.schema.parameters, ServiceId::ParameterRepo, access)
    }

    pub fn discover_reset(&self, id: u32) -> Cursor {
        Cursor::reset(self.schema.parameters, id)
    }

    pub fn discover_next(
        &self,
        cursor: &mut Cursor,
        access: &impl AccessControl,
    ) -> Result<&'static ParameterDescriptor, Error> {
        cursor.next(self.schema.parameters, ServiceId::ParameterRepo, access)
    }

    /// Number of label pages of entry `id`, or of all entries with `None`.
    pub fn extended_info_count(&self, id: Option<u32>) -> usize {
        discovery::extended_info_count(self.schema.extended_info, id)
    }

    pub fn extended_info_discover_reset(&self, id: Option<u32>) -> ExtendedInfoCursor {
        ExtendedInfoCursor::reset(self.schema.extended_info, id)
    }

    pub fn extended_info_discover_next(
        &self,
        cursor: &mut ExtendedInfoCursor,
    ) -> Result<ExtendedInfoPage<'static>, Error> {
        cursor.next(self.schema.extended_info)
    }

    pub fn label(&self, extended_info_id: u32, value: u32) -> Option<&'static str> {
        self.schema.label(extended_info_id, value)
    }
}
