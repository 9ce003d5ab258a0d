//! The REGKEYS section.
//!
//! The record framing of this section is not understood well enough to decode reliably: the
//! length/termination fields appear to be miscounted relative to the rest of the format. Rather
//! than guess, [`decode_registry_keys`] always reports `UnsupportedSection` and reads nothing.
//! The record types below describe the logical shape a future decoder would produce.

use crate::err::{MsceError, Section};
use crate::header::SectionEntry;

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct RegistryKeyFlags: u32 {
        const TYPE_MULTI_SZ = 0x0001_0000;
        const TYPE_BINARY = 0x0000_0001;
        const TYPE_DWORD = Self::TYPE_MULTI_SZ.bits() | Self::TYPE_BINARY.bits();
        const NO_CLOBBER = 0x0000_0002;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegValueType {
    Dword,
    Sz,
    MultiSz,
    Binary,
}

impl RegistryKeyFlags {
    /// The value type encoded in the two type bits (`TYPE_SZ` is both bits clear).
    pub fn value_type(self) -> RegValueType {
        let multi_sz = self.contains(RegistryKeyFlags::TYPE_MULTI_SZ);
        let binary = self.contains(RegistryKeyFlags::TYPE_BINARY);
        match (multi_sz, binary) {
            (true, true) => RegValueType::Dword,
            (true, false) => RegValueType::MultiSz,
            (false, true) => RegValueType::Binary,
            (false, false) => RegValueType::Sz,
        }
    }

    pub fn no_clobber(self) -> bool {
        self.contains(RegistryKeyFlags::NO_CLOBBER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryKeyEntry {
    pub id: u16,
    pub hive_id: u16,
    pub name: String,
    pub flags: RegistryKeyFlags,
    pub data: Vec<u8>,
}

/// Outcome of the REGKEYS section on a decoded manifest.
///
/// Only the skipped state exists until the record framing is understood; its declared extent
/// is kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistryKeys {
    Unsupported { declared_count: u16, offset: u32 },
}

/// Attempt the REGKEYS section. There is no decoder yet, so this always hands back the
/// `UnsupportedSection` error, without touching the buffer, whatever the declared count
/// (including zero).
pub fn decode_registry_keys(entry: SectionEntry) -> MsceError {
    MsceError::UnsupportedSection {
        section: Section::RegistryKeys,
        count: entry.count,
        offset: u64::from(entry.offset),
    }
}
