use crate::err::{DecodeWarning, MsceError, Result, Section};
use crate::header::SectionEntry;
use crate::manifest::DecoderSettings;
use crate::placeholder::substitute;
use crate::sections::spec_list::{read_bounded_list, resolve_all};
use crate::sections::{Directories, Files, StringTable, insert_record};
use crate::utils::ByteCursor;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::Serialize;

/// What a link's `target_id` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkType {
    Directory,
    File,
    /// Any other code, preserved as read. The target is left unresolved.
    Unknown(u16),
}

impl From<u16> for LinkType {
    fn from(code: u16) -> Self {
        match code {
            0 => LinkType::Directory,
            1 => LinkType::File,
            other => LinkType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub id: u16,
    pub base_directory_id: u16,
    /// `%CE{base_directory_id}%` run through placeholder expansion.
    pub base_directory: String,
    pub link_type: LinkType,
    pub target_id: u16,
    /// Directory path or file destination path; `None` for an unknown link type.
    pub target_path: Option<String>,
    pub spec: Vec<String>,
}

pub type Links = IndexMap<u16, LinkRecord>;

/// Decode the LINKS section.
///
/// Record layout: `(id: u16, reserved: u16, base_dir_id: u16, target_id: u16, link_type: u16,
/// spec_len: u16)` followed by a bounded spec list of string IDs.
///
/// The base directory is *not* looked up in `dirs`: it is the synthesized token
/// `%CE{base_dir_id}%`, so only the built-in device folders expand and any other ID stays as
/// the literal token. Installers built against this format depend on that behaviour.
pub fn decode_links(
    cursor: &mut ByteCursor<'_>,
    entry: SectionEntry,
    strings: &StringTable,
    dirs: &Directories,
    files: &Files,
    settings: &DecoderSettings,
    warnings: &mut Vec<DecodeWarning>,
) -> Result<Links> {
    debug!(
        "Decoding {} links at offset 0x{:08X}",
        entry.count, entry.offset
    );

    let mut links = IndexMap::with_capacity(usize::from(entry.count));
    for _ in 0..entry.count {
        let offset = cursor.position();
        let id = cursor.u16_named("LINKS.id")?;
        let _reserved = cursor.u16_named("LINKS.reserved")?;
        let base_directory_id = cursor.u16_named("LINKS.base_dir_id")?;
        let base_directory = substitute(
            &format!("%CE{base_directory_id}%"),
            settings.placeholder_table(),
        );

        let target_offset = cursor.position();
        let target_id = cursor.u16_named("LINKS.target_id")?;
        let type_offset = cursor.position();
        let link_type = LinkType::from(cursor.u16_named("LINKS.link_type")?);

        let target_path = match link_type {
            LinkType::Directory => Some(
                dirs.get(&target_id)
                    .cloned()
                    .ok_or(MsceError::UnknownDirectoryId {
                        id: target_id,
                        offset: target_offset,
                    })?,
            ),
            LinkType::File => Some(
                files
                    .get(&target_id)
                    .map(|f| f.destination_path.clone())
                    .ok_or(MsceError::UnknownFileId {
                        id: target_id,
                        offset: target_offset,
                    })?,
            ),
            LinkType::Unknown(value) => {
                let warning = DecodeWarning::UnknownLinkType {
                    link_id: id,
                    value,
                    offset: type_offset,
                };
                warn!("{warning}");
                warnings.push(warning);
                None
            }
        };

        let spec_length = cursor.u16_named("LINKS.spec_length")?;
        let refs = read_bounded_list(cursor, spec_length, "LINKS.spec")?;
        let spec = resolve_all(&refs, strings, Section::Links)?
            .into_iter()
            .map(str::to_owned)
            .collect();

        let link = LinkRecord {
            id,
            base_directory_id,
            base_directory,
            link_type,
            target_id,
            target_path,
            spec,
        };
        trace!("LINKS[{id}] = {link:?}");
        insert_record(&mut links, Section::Links, id, offset, link, settings)?;
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::ErrorKind;
    use crate::sections::{FileFlags, FileRecord};
    use pretty_assertions::assert_eq;

    fn strings() -> StringTable {
        [(3u16, "Demo".to_owned()), (4, "Shortcut".to_owned())]
            .into_iter()
            .collect()
    }

    fn dirs() -> Directories {
        [(1u16, "\\Program Files\\Demo".to_owned())]
            .into_iter()
            .collect()
    }

    fn files() -> Files {
        [(
            2u16,
            FileRecord {
                id: 2,
                destination_directory_id: 1,
                flags: FileFlags::empty(),
                destination_path: "\\APP.EXE".to_owned(),
            },
        )]
        .into_iter()
        .collect()
    }

    fn record(id: u16, base: u16, target: u16, link_type: u16, spec_len: u16, ids: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        for word in [id, 0, base, target, link_type, spec_len] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for sid in ids {
            out.extend_from_slice(&sid.to_le_bytes());
        }
        out
    }

    fn decode(data: &[u8], count: u16) -> (Result<Links>, Vec<DecodeWarning>) {
        let mut warnings = vec![];
        let result = decode_links(
            &mut ByteCursor::new(data),
            SectionEntry { count, offset: 0 },
            &strings(),
            &dirs(),
            &files(),
            &DecoderSettings::default(),
            &mut warnings,
        );
        (result, warnings)
    }

    #[test]
    fn test_file_link_resolves_destination_path() {
        let data = record(1, 11, 2, 1, 3, &[4, 0]);
        let (links, warnings) = decode(&data, 1);
        let links = links.unwrap();

        assert_eq!(
            links[&1],
            LinkRecord {
                id: 1,
                base_directory_id: 11,
                base_directory: "\\Windows\\Programs".to_owned(),
                link_type: LinkType::File,
                target_id: 2,
                target_path: Some("\\APP.EXE".to_owned()),
                spec: vec!["Shortcut".to_owned()],
            }
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_directory_link() {
        let data = record(1, 4, 1, 0, 4, &[3, 4, 0]);
        let (links, _) = decode(&data, 1);
        let link = &links.unwrap()[&1];

        assert_eq!(link.target_path.as_deref(), Some("\\Program Files\\Demo"));
        assert_eq!(link.base_directory, "\\Windows\\StartUp");
        assert_eq!(link.spec, vec!["Demo", "Shortcut"]);
    }

    #[test]
    fn test_base_directory_outside_builtin_tokens_stays_literal() {
        // ID 1 exists in DIRS, but the base directory never consults it.
        let data = record(1, 42, 2, 1, 2, &[0]);
        let (links, _) = decode(&data, 1);
        assert_eq!(links.unwrap()[&1].base_directory, "%CE42%");
    }

    #[test]
    fn test_sentinel_ends_spec_long_before_declared_length() {
        let mut data = record(1, 11, 2, 1, 10, &[4, 0]);
        data.extend(record(2, 4, 1, 0, 10, &[3, 0]));
        let mut cursor = ByteCursor::new(&data);
        let mut warnings = vec![];

        let links = decode_links(
            &mut cursor,
            SectionEntry {
                count: 2,
                offset: 0,
            },
            &strings(),
            &dirs(),
            &files(),
            &DecoderSettings::default(),
            &mut warnings,
        )
        .unwrap();

        assert_eq!(links[&1].spec, vec!["Shortcut"]);
        assert_eq!(links[&2].spec, vec!["Demo"]);
        assert_eq!(links[&2].target_path.as_deref(), Some("\\Program Files\\Demo"));
        assert_eq!(cursor.pos(), data.len());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_link_type_is_not_fatal() {
        let mut data = record(1, 2, 999, 7, 3, &[3, 0]);
        data.extend(record(2, 2, 2, 1, 2, &[0]));
        let (links, warnings) = decode(&data, 2);
        let links = links.unwrap();

        assert_eq!(links[&1].link_type, LinkType::Unknown(7));
        assert_eq!(links[&1].target_path, None);
        assert_eq!(links[&1].spec, vec!["Demo"]);
        assert_eq!(links[&2].target_path.as_deref(), Some("\\APP.EXE"));
        assert_eq!(
            warnings,
            vec![DecodeWarning::UnknownLinkType {
                link_id: 1,
                value: 7,
                offset: 8
            }]
        );
    }

    #[test]
    fn test_unknown_targets() {
        let data = record(1, 2, 9, 0, 2, &[0]);
        let err = decode(&data, 1).0.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDirectoryId);
        assert_eq!(err.offset(), 6);

        let data = record(1, 2, 9, 1, 2, &[0]);
        let err = decode(&data, 1).0.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFileId);
        assert_eq!(err.offset(), 6);
    }

    #[test]
    fn test_unknown_spec_string() {
        let data = record(1, 2, 2, 1, 3, &[77, 0]);
        let err = decode(&data, 1).0.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStringId);
        assert_eq!(err.offset(), 12);
    }
}
