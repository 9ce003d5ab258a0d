use crate::err::{DecodeWarning, Result, Section};
use crate::header::SectionEntry;
use crate::manifest::DecoderSettings;
use crate::sections::spec_list::{read_bounded_list, resolve_all};
use crate::sections::{StringTable, insert_record};
use crate::utils::ByteCursor;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::Serialize;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RootHive {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    /// Any other code, preserved as read.
    Unknown(u16),
}

impl From<u16> for RootHive {
    fn from(code: u16) -> Self {
        match code {
            0 => RootHive::ClassesRoot,
            1 => RootHive::CurrentUser,
            2 => RootHive::LocalMachine,
            3 => RootHive::Users,
            other => RootHive::Unknown(other),
        }
    }
}

impl fmt::Display for RootHive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootHive::ClassesRoot => f.write_str("HKEY_CLASSES_ROOT"),
            RootHive::CurrentUser => f.write_str("HKEY_CURRENT_USER"),
            RootHive::LocalMachine => f.write_str("HKEY_LOCAL_MACHINE"),
            RootHive::Users => f.write_str("HKEY_USERS"),
            RootHive::Unknown(code) => write!(f, "{code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryHive {
    pub id: u16,
    pub root: RootHive,
    /// Key path fragments, in order.
    pub spec: Vec<String>,
}

pub type RegistryHives = IndexMap<u16, RegistryHive>;

/// Decode the REGHIVES section.
///
/// Record layout: `(id: u16, root: u16, reserved: u16, spec_len: u16)` followed by a bounded
/// spec list of string IDs. Unknown root codes are kept and reported through `warnings`.
pub fn decode_registry_hives(
    cursor: &mut ByteCursor<'_>,
    entry: SectionEntry,
    strings: &StringTable,
    settings: &DecoderSettings,
    warnings: &mut Vec<DecodeWarning>,
) -> Result<RegistryHives> {
    debug!(
        "Decoding {} registry hives at offset 0x{:08X}",
        entry.count, entry.offset
    );

    let mut hives = IndexMap::with_capacity(usize::from(entry.count));
    for _ in 0..entry.count {
        let offset = cursor.position();
        let id = cursor.u16_named("REGHIVES.id")?;
        let root_offset = cursor.position();
        let root = RootHive::from(cursor.u16_named("REGHIVES.root")?);
        let _reserved = cursor.u16_named("REGHIVES.reserved")?;
        let spec_length = cursor.u16_named("REGHIVES.spec_length")?;

        let refs = read_bounded_list(cursor, spec_length, "REGHIVES.spec")?;
        let spec = resolve_all(&refs, strings, Section::RegistryHives)?
            .into_iter()
            .map(str::to_owned)
            .collect();

        if let RootHive::Unknown(value) = root {
            let warning = DecodeWarning::UnknownRootHive {
                hive_id: id,
                value,
                offset: root_offset,
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        let hive = RegistryHive { id, root, spec };
        trace!("REGHIVES[{id}] = {hive:?}");
        insert_record(&mut hives, Section::RegistryHives, id, offset, hive, settings)?;
    }

    Ok(hives)
}
