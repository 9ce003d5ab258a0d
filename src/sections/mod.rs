//! Decoders for the six offset-addressed manifest sections.
//!
//! Every decoder expects a cursor already positioned at its section's offset and reads exactly
//! the number of records the header declares. Records are keyed by their numeric ID; records
//! that reference each other do so through these maps, so decoding order matters:
//! STRINGS first, then DIRS/FILES/REGHIVES, then LINKS.

mod directories;
mod files;
mod links;
mod reg_hives;
mod reg_keys;
mod spec_list;
mod strings;

pub use directories::{Directories, decode_directories};
pub use files::{FileFlags, FileRecord, Files, decode_files};
pub use links::{LinkRecord, LinkType, Links, decode_links};
pub use reg_hives::{RegistryHive, RegistryHives, RootHive, decode_registry_hives};
pub use reg_keys::{
    RegValueType, RegistryKeyEntry, RegistryKeyFlags, RegistryKeys, decode_registry_keys,
};
pub use strings::{StringTable, decode_strings};

use crate::err::{MsceError, Result, Section};
use crate::manifest::DecoderSettings;

use indexmap::IndexMap;

/// Insert a freshly decoded record, enforcing ID uniqueness unless the settings allow
/// last-write-wins.
pub(crate) fn insert_record<T>(
    map: &mut IndexMap<u16, T>,
    section: Section,
    id: u16,
    offset: u64,
    value: T,
    settings: &DecoderSettings,
) -> Result<()> {
    if !settings.allows_duplicate_ids() && map.contains_key(&id) {
        return Err(MsceError::DuplicateId {
            section,
            id,
            offset,
        });
    }
    map.insert(id, value);
    Ok(())
}
