use crate::err::{Result, Section};
use crate::header::SectionEntry;
use crate::manifest::DecoderSettings;
use crate::sections::insert_record;
use crate::utils::ByteCursor;

use bitflags::bitflags;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;

bitflags! {
    /// Per-file copy behaviour. Bits without a name are retained as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct FileFlags: u32 {
        const WARN_IF_SKIPPED = 1 << 0;
        const DO_NOT_SKIP = 1 << 1;
        const DO_NOT_OVERWRITE_IF_EXISTS = 1 << 4;
        const COPY_ONLY_IF_TARGET_EXISTS = 1 << 10;
        const SELF_REGISTER = 1 << 28;
        const DO_NOT_OVERWRITE_IF_NEWER = 1 << 29;
        const ALWAYS_OVERWRITE = 1 << 30;
        const SHARED_REFERENCE_COUNTED = 1 << 31;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: u16,
    /// Present in the wire record; nothing downstream resolves it.
    pub destination_directory_id: u16,
    pub flags: FileFlags,
    /// Stored verbatim: no string-table lookup and no placeholder expansion.
    pub destination_path: String,
}

impl FileRecord {
    pub fn warn_if_skipped(&self) -> bool {
        self.flags.contains(FileFlags::WARN_IF_SKIPPED)
    }

    pub fn do_not_skip(&self) -> bool {
        self.flags.contains(FileFlags::DO_NOT_SKIP)
    }

    pub fn do_not_overwrite_if_exists(&self) -> bool {
        self.flags.contains(FileFlags::DO_NOT_OVERWRITE_IF_EXISTS)
    }

    pub fn copy_only_if_target_exists(&self) -> bool {
        self.flags.contains(FileFlags::COPY_ONLY_IF_TARGET_EXISTS)
    }

    pub fn self_register(&self) -> bool {
        self.flags.contains(FileFlags::SELF_REGISTER)
    }

    pub fn do_not_overwrite_if_newer(&self) -> bool {
        self.flags.contains(FileFlags::DO_NOT_OVERWRITE_IF_NEWER)
    }

    pub fn always_overwrite(&self) -> bool {
        self.flags.contains(FileFlags::ALWAYS_OVERWRITE)
    }

    pub fn shared_reference_counted(&self) -> bool {
        self.flags.contains(FileFlags::SHARED_REFERENCE_COUNTED)
    }

    /// Flag bits that have no name.
    pub fn unknown_flag_bits(&self) -> u32 {
        self.flags.bits() & !FileFlags::all().bits()
    }
}

pub type Files = IndexMap<u16, FileRecord>;

/// Decode the FILES section.
///
/// Record layout: `(id: u16, dest_dir_id: u16, reserved: u16, flags: u32, path_len: u16,
/// path: [u8; path_len])`.
pub fn decode_files(
    cursor: &mut ByteCursor<'_>,
    entry: SectionEntry,
    settings: &DecoderSettings,
) -> Result<Files> {
    debug!(
        "Decoding {} files at offset 0x{:08X}",
        entry.count, entry.offset
    );

    let mut files = IndexMap::with_capacity(usize::from(entry.count));
    for _ in 0..entry.count {
        let offset = cursor.position();
        let id = cursor.u16_named("FILES.id")?;
        let destination_directory_id = cursor.u16_named("FILES.dest_dir_id")?;
        let _reserved = cursor.u16_named("FILES.reserved")?;
        let flags = FileFlags::from_bits_retain(cursor.u32_named("FILES.flags")?);
        let destination_path = cursor.len_prefixed_ascii("FILES.destination_path")?;

        let record = FileRecord {
            id,
            destination_directory_id,
            flags,
            destination_path,
        };
        trace!("FILES[{id}] = {record:?}");
        insert_record(&mut files, Section::Files, id, offset, record, settings)?;
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::ErrorKind;
    use pretty_assertions::assert_eq;

    fn record(id: u16, dir: u16, flags: u32, path: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&dir.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&(path.len() as u16).to_le_bytes());
        out.extend_from_slice(path.as_bytes());
        out
    }

    fn entry(count: u16) -> SectionEntry {
        SectionEntry { count, offset: 0 }
    }

    #[test]
    fn test_decodes_file_records() {
        let mut data = record(1, 2, 0x0000_0002, "\\APP.EXE");
        data.extend(record(2, 2, 0xC000_0001, "%CE2%\\lib.dll"));

        let files =
            decode_files(&mut ByteCursor::new(&data), entry(2), &DecoderSettings::default())
                .unwrap();

        assert_eq!(
            files[&1],
            FileRecord {
                id: 1,
                destination_directory_id: 2,
                flags: FileFlags::DO_NOT_SKIP,
                destination_path: "\\APP.EXE".to_owned(),
            }
        );
        // Paths are not placeholder-expanded.
        assert_eq!(files[&2].destination_path, "%CE2%\\lib.dll");
    }

    #[test]
    fn test_each_flag_is_an_independent_bit_test() {
        let data = record(1, 0, 0xC000_0401, "x");
        let files =
            decode_files(&mut ByteCursor::new(&data), entry(1), &DecoderSettings::default())
                .unwrap();
        let f = &files[&1];

        assert!(f.warn_if_skipped());
        assert!(!f.do_not_skip());
        assert!(!f.do_not_overwrite_if_exists());
        assert!(f.copy_only_if_target_exists());
        assert!(!f.self_register());
        assert!(!f.do_not_overwrite_if_newer());
        assert!(f.always_overwrite());
        assert!(f.shared_reference_counted());
    }

    #[test]
    fn test_unknown_bits_are_preserved() {
        let data = record(1, 0, 0x0000_0108, "x");
        let files =
            decode_files(&mut ByteCursor::new(&data), entry(1), &DecoderSettings::default())
                .unwrap();

        assert_eq!(files[&1].flags.bits(), 0x0000_0108);
        assert_eq!(files[&1].unknown_flag_bits(), 0x0000_0108);
        assert!(files[&1].flags.iter_names().next().is_none());
    }

    #[test]
    fn test_truncated_path() {
        let mut data = record(1, 0, 0, "\\APP.EXE");
        data.pop();
        let err = decode_files(&mut ByteCursor::new(&data), entry(1), &DecoderSettings::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        assert_eq!(err.offset(), 12);
    }
}
