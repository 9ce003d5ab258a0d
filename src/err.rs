use serde::Serialize;
use thiserror::Error;

use std::fmt;

pub type Result<T> = std::result::Result<T, MsceError>;

/// A section of the manifest, as named by the header's count/offset tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Header,
    Strings,
    Directories,
    Files,
    RegistryHives,
    RegistryKeys,
    Links,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Header => "HEADER",
            Section::Strings => "STRINGS",
            Section::Directories => "DIRS",
            Section::Files => "FILES",
            Section::RegistryHives => "REGHIVES",
            Section::RegistryKeys => "REGKEYS",
            Section::Links => "LINKS",
        };
        f.write_str(name)
    }
}

/// Every way decoding a manifest can fail.
///
/// All variants carry the absolute byte offset at which the problem was detected
/// (see [`MsceError::offset`]). Decoding is fail-fast: the first error aborts the whole decode.
#[derive(Debug, Error)]
pub enum MsceError {
    #[error("invalid signature at offset {offset}: expected `MSCE`, found `{found:02X?}`")]
    InvalidSignature { offset: u64, found: [u8; 4] },

    #[error("buffer too small for {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("offset {offset} out of bounds for {what} (len={len})")]
    OffsetOutOfBounds {
        what: &'static str,
        offset: u64,
        len: usize,
    },

    #[error("offset {offset}: invalid STRING `{id}` requested by the {section} section")]
    UnknownStringId { section: Section, id: u16, offset: u64 },

    #[error("offset {offset}: {what} is not terminated before the end of the buffer")]
    UnterminatedList { what: &'static str, offset: u64 },

    #[error("offset {offset}: invalid DIR `{id}` requested by the LINKS section")]
    UnknownDirectoryId { id: u16, offset: u64 },

    #[error("offset {offset}: invalid FILE `{id}` requested by the LINKS section")]
    UnknownFileId { id: u16, offset: u64 },

    #[error("offset {offset}: duplicate id `{id}` in the {section} section")]
    DuplicateId { section: Section, id: u16, offset: u64 },

    #[error("offset {offset}: reading the {section} section is not supported ({count} records declared)")]
    UnsupportedSection {
        section: Section,
        count: u16,
        offset: u64,
    },
}

/// A fieldless mirror of [`MsceError`], for callers that only care about what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidSignature,
    OutOfBounds,
    UnknownStringId,
    UnterminatedList,
    UnknownDirectoryId,
    UnknownFileId,
    DuplicateId,
    UnsupportedSection,
}

impl MsceError {
    /// Absolute byte offset (relative to the start of the manifest) where decoding failed.
    pub fn offset(&self) -> u64 {
        match self {
            MsceError::InvalidSignature { offset, .. }
            | MsceError::Truncated { offset, .. }
            | MsceError::OffsetOutOfBounds { offset, .. }
            | MsceError::UnknownStringId { offset, .. }
            | MsceError::UnterminatedList { offset, .. }
            | MsceError::UnknownDirectoryId { offset, .. }
            | MsceError::UnknownFileId { offset, .. }
            | MsceError::DuplicateId { offset, .. }
            | MsceError::UnsupportedSection { offset, .. } => *offset,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MsceError::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            MsceError::Truncated { .. } | MsceError::OffsetOutOfBounds { .. } => {
                ErrorKind::OutOfBounds
            }
            MsceError::UnknownStringId { .. } => ErrorKind::UnknownStringId,
            MsceError::UnterminatedList { .. } => ErrorKind::UnterminatedList,
            MsceError::UnknownDirectoryId { .. } => ErrorKind::UnknownDirectoryId,
            MsceError::UnknownFileId { .. } => ErrorKind::UnknownFileId,
            MsceError::DuplicateId { .. } => ErrorKind::DuplicateId,
            MsceError::UnsupportedSection { .. } => ErrorKind::UnsupportedSection,
        }
    }
}

/// Problems that are reported but do not stop decoding.
///
/// Unknown enum codes are preserved verbatim on the decoded records; these warnings only
/// point at them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    UnknownArchitecture { value: u32, offset: u64 },
    UnknownRootHive { hive_id: u16, value: u16, offset: u64 },
    UnknownLinkType { link_id: u16, value: u16, offset: u64 },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::UnknownArchitecture { value, offset } => {
                write!(f, "offset {offset}: unknown target architecture `{value}`")
            }
            DecodeWarning::UnknownRootHive {
                hive_id,
                value,
                offset,
            } => write!(
                f,
                "offset {offset}: unknown root hive `{value}` for REGHIVE `{hive_id}`"
            ),
            DecodeWarning::UnknownLinkType {
                link_id,
                value,
                offset,
            } => write!(
                f,
                "offset {offset}: invalid LINK type `{value}` for LINK `{link_id}`"
            ),
        }
    }
}
