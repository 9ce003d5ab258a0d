use crate::err::{Result, Section};
use crate::header::SectionEntry;
use crate::manifest::DecoderSettings;
use crate::placeholder::substitute;
use crate::sections::spec_list::{read_sentinel_list, resolve_all};
use crate::sections::{StringTable, insert_record};
use crate::utils::ByteCursor;

use indexmap::IndexMap;
use log::{debug, trace};

/// Destination directory ID → fully expanded path.
pub type Directories = IndexMap<u16, String>;

/// Decode the DIRS section.
///
/// Each record is `(id: u16, reserved: u16)` followed by a `0`-terminated list of string IDs.
/// The referenced texts are concatenated and then run through placeholder expansion.
pub fn decode_directories(
    cursor: &mut ByteCursor<'_>,
    entry: SectionEntry,
    strings: &StringTable,
    settings: &DecoderSettings,
) -> Result<Directories> {
    debug!(
        "Decoding {} directories at offset 0x{:08X}",
        entry.count, entry.offset
    );

    let mut dirs = IndexMap::with_capacity(usize::from(entry.count));
    for _ in 0..entry.count {
        let offset = cursor.position();
        let id = cursor.u16_named("DIRS.id")?;
        let _reserved = cursor.u16_named("DIRS.reserved")?;

        let refs = read_sentinel_list(cursor, "DIRS.path")?;
        let raw_path = resolve_all(&refs, strings, Section::Directories)?.concat();
        let path = substitute(&raw_path, settings.placeholder_table());

        trace!("DIRS[{id}] = {path:?} (raw {raw_path:?})");
        insert_record(&mut dirs, Section::Directories, id, offset, path, settings)?;
    }

    Ok(dirs)
}
