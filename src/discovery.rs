//! Cursors for paging through catalogs over a transport with small messages. Every cursor owns
//! its position, so two discovery sessions can't disturb each other.

use crate::error::Error;
use crate::platform::{AccessControl, ServiceId};
use crate::schema::{ExtendedInfo, Label, TypeTag};

/// Labels per extended info page.
pub const LABELS_PER_PAGE: usize = 8;

/// An entry of a catalog which can be discovered.
pub trait CatalogEntry {
    fn id(&self) -> u32;
}

/// Position in a catalog. `None` means the start id was unknown or the catalog is exhausted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cursor {
    position: Option<usize>,
}

impl Cursor {
    /// Places the cursor on the entry with `id`.
    pub fn reset<T: CatalogEntry>(entries: &[T], id: u32) -> Self {
        Self {
            position: entries.iter().position(|entry| entry.id() == id),
        }
    }

    /// Returns the entry under the cursor and advances, skipping entries the peer may not see.
    pub fn next<'a, T: CatalogEntry>(
        &mut self,
        entries: &'a [T],
        service: ServiceId,
        access: &impl AccessControl,
    ) -> Result<&'a T, Error> {
        let Some(mut position) = self.position else {
            return Err(Error::NoData);
        };

        while let Some(entry) = entries.get(position) {
            position += 1;
            if access.access_granted(service, entry.id()) {
                self.position = Some(position);
                return Ok(entry);
            }
        }

        self.position = None;
        Err(Error::NoData)
    }
}

/// Number of access granted entries.
pub fn count<T: CatalogEntry>(
    entries: &[T],
    service: ServiceId,
    access: &impl AccessControl,
) -> usize {
    entries
        .iter()
        .filter(|entry| access.access_granted(service, entry.id()))
        .count()
}

/// Up to [`LABELS_PER_PAGE`] labels of one extended info entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExtendedInfoPage<'a> {
    pub id: u32,
    pub type_tag: TypeTag,
    pub labels: &'a [Label],
}

/// Pages through the labels of one extended info entry, or of all entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExtendedInfoCursor {
    single: bool,
    entry: Option<usize>,
    label: usize,
}

impl ExtendedInfoCursor {
    /// `None` walks all entries, `Some(id)` only the entry `id`.
    pub fn reset(entries: &[ExtendedInfo], id: Option<u32>) -> Self {
        let entry = match id {
            None => (!entries.is_empty()).then_some(0),
            Some(id) => entries.iter().position(|info| info.id == id),
        };
        Self {
            single: id.is_some(),
            entry,
            label: 0,
        }
    }

    pub fn next<'a>(&mut self, entries: &'a [ExtendedInfo]) -> Result<ExtendedInfoPage<'a>, Error> {
        let info = self
            .entry
            .and_then(|index| entries.get(index))
            .ok_or(Error::InvalidId)?;

        let start = self.label.min(info.labels.len());
        let end = (start + LABELS_PER_PAGE).min(info.labels.len());
        let page = ExtendedInfoPage {
            id: info.id,
            type_tag: info.type_tag,
            labels: &info.labels[start..end],
        };

        self.label = end;
        if self.label >= info.labels.len() {
            self.label = 0;
            self.entry = match self.entry {
                Some(index) if !self.single && index + 1 < entries.len() => Some(index + 1),
                _ => None,
            };
        }
        Ok(page)
    }
}

/// Number of pages needed for one entry, or for all entries with `None`.
pub fn extended_info_count(entries: &[ExtendedInfo], id: Option<u32>) -> usize {
    let pages = |info: &ExtendedInfo| info.labels.len().div_ceil(LABELS_PER_PAGE);
    match id {
        None => entries.iter().map(pages).sum(),
        Some(id) => entries
            .iter()
            .find(|info| info.id == id)
            .map_or(0, pages),
    }
}

impl CatalogEntry for crate::schema::ParameterDescriptor {
    fn id(&self) -> u32 {
        self.id
    }
}
