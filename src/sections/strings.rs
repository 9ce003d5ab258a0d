use crate::err::{MsceError, Result, Section};
use crate::header::SectionEntry;
use crate::manifest::DecoderSettings;
use crate::sections::insert_record;
use crate::utils::ByteCursor;

use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;

/// The STRINGS section: string ID → ASCII text.
///
/// Every other section refers to text by ID through this table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StringTable(IndexMap<u16, String>);

impl StringTable {
    pub fn get(&self, id: u16) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    /// Look `id` up on behalf of `section`; a miss is `UnknownStringId` at `offset`.
    pub fn resolve(&self, id: u16, section: Section, offset: u64) -> Result<&str> {
        self.get(id)
            .ok_or(MsceError::UnknownStringId {
                section,
                id,
                offset,
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in on-disk order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.0.iter().map(|(&id, text)| (id, text.as_str()))
    }
}

impl FromIterator<(u16, String)> for StringTable {
    fn from_iter<I: IntoIterator<Item = (u16, String)>>(iter: I) -> Self {
        StringTable(iter.into_iter().collect())
    }
}

/// Decode `entry.count` `(id: u16, length: u16, text: [u8; length])` triples.
///
/// `cursor` must already be positioned at the start of the section.
pub fn decode_strings(
    cursor: &mut ByteCursor<'_>,
    entry: SectionEntry,
    settings: &DecoderSettings,
) -> Result<StringTable> {
    debug!(
        "Decoding {} strings at offset 0x{:08X}",
        entry.count, entry.offset
    );

    let mut table = IndexMap::with_capacity(usize::from(entry.count));
    for _ in 0..entry.count {
        let offset = cursor.position();
        let id = cursor.u16_named("STRINGS.id")?;
        let text = cursor.len_prefixed_ascii("STRINGS.text")?;
        trace!("STRINGS[{id}] = {text:?}");
        insert_record(&mut table, Section::Strings, id, offset, text, settings)?;
    }

    Ok(StringTable(table))
}
