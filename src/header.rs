use crate::err::{MsceError, Result, Section};
use crate::utils::ByteCursor;

use log::debug;
use serde::Serialize;

use std::fmt;

pub const MSCE_SIGNATURE: [u8; 4] = *b"MSCE";
/// Size of the fixed-layout header, including the trailing padding.
pub const MSCE_HEADER_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestHeader {
    /// Size of the whole manifest, as declared by the header.
    pub total_size: u32,
    /// The three reserved words (offsets 4, 12 and 16). Kept only so the header re-encodes
    /// byte-for-byte.
    pub reserved: [u32; 3],
    pub architecture: Architecture,
    pub min_version: OsVersion,
    pub max_version: OsVersion,
    pub sections: SectionTable,
    pub app_name: StringSpan,
    pub provider: StringSpan,
    /// Trailing 8 bytes of the header, skipped and never interpreted.
    pub padding: [u8; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Location of one section: how many records it declares and where they start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SectionEntry {
    pub count: u16,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SectionTable {
    pub strings: SectionEntry,
    pub directories: SectionEntry,
    pub files: SectionEntry,
    pub registry_hives: SectionEntry,
    pub registry_keys: SectionEntry,
    pub links: SectionEntry,
}

impl SectionTable {
    pub fn entry(&self, section: Section) -> Option<SectionEntry> {
        match section {
            Section::Header => None,
            Section::Strings => Some(self.strings),
            Section::Directories => Some(self.directories),
            Section::Files => Some(self.files),
            Section::RegistryHives => Some(self.registry_hives),
            Section::RegistryKeys => Some(self.registry_keys),
            Section::Links => Some(self.links),
        }
    }

    fn entries_mut(&mut self) -> [&mut SectionEntry; 6] {
        [
            &mut self.strings,
            &mut self.directories,
            &mut self.files,
            &mut self.registry_hives,
            &mut self.registry_keys,
            &mut self.links,
        ]
    }

    fn entries(&self) -> [&SectionEntry; 6] {
        [
            &self.strings,
            &self.directories,
            &self.files,
            &self.registry_hives,
            &self.registry_keys,
            &self.links,
        ]
    }
}

/// Byte span (relative to the start of the manifest) of an inline header string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StringSpan {
    pub offset: u16,
    pub length: u16,
}

/// Target CPU of the installer package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Architecture {
    Unspecified,
    ShxSh3,
    ShxSh4,
    I386,
    I486,
    Pentium,
    PowerPc601,
    PowerPc603,
    PowerPc604,
    PowerPc620,
    Motorola821,
    Arm720,
    Arm820,
    Arm920,
    StrongArm,
    MipsR4000,
    HitachiSh3,
    HitachiSh3e,
    HitachiSh4,
    Alpha21064,
    Arm7tdmi,
    Unknown(u32),
}

impl From<u32> for Architecture {
    fn from(code: u32) -> Self {
        match code {
            0 => Architecture::Unspecified,
            103 => Architecture::ShxSh3,
            104 => Architecture::ShxSh4,
            386 => Architecture::I386,
            486 => Architecture::I486,
            586 => Architecture::Pentium,
            601 => Architecture::PowerPc601,
            603 => Architecture::PowerPc603,
            604 => Architecture::PowerPc604,
            620 => Architecture::PowerPc620,
            821 => Architecture::Motorola821,
            1824 => Architecture::Arm720,
            2080 => Architecture::Arm820,
            2336 => Architecture::Arm920,
            2577 => Architecture::StrongArm,
            4000 => Architecture::MipsR4000,
            10003 => Architecture::HitachiSh3,
            10004 => Architecture::HitachiSh3e,
            10005 => Architecture::HitachiSh4,
            21064 => Architecture::Alpha21064,
            70001 => Architecture::Arm7tdmi,
            other => Architecture::Unknown(other),
        }
    }
}

impl Architecture {
    pub fn code(self) -> u32 {
        match self {
            Architecture::Unspecified => 0,
            Architecture::ShxSh3 => 103,
            Architecture::ShxSh4 => 104,
            Architecture::I386 => 386,
            Architecture::I486 => 486,
            Architecture::Pentium => 586,
            Architecture::PowerPc601 => 601,
            Architecture::PowerPc603 => 603,
            Architecture::PowerPc604 => 604,
            Architecture::PowerPc620 => 620,
            Architecture::Motorola821 => 821,
            Architecture::Arm720 => 1824,
            Architecture::Arm820 => 2080,
            Architecture::Arm920 => 2336,
            Architecture::StrongArm => 2577,
            Architecture::MipsR4000 => 4000,
            Architecture::HitachiSh3 => 10003,
            Architecture::HitachiSh3e => 10004,
            Architecture::HitachiSh4 => 10005,
            Architecture::Alpha21064 => 21064,
            Architecture::Arm7tdmi => 70001,
            Architecture::Unknown(code) => code,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Architecture::Unknown(_))
    }
}

impl ManifestHeader {
    /// Decode the fixed-layout header. `cursor` must be positioned at the start of the manifest.
    ///
    /// On a signature mismatch nothing past the signature is read and the cursor is left where
    /// it was.
    pub fn from_cursor(cursor: &mut ByteCursor<'_>) -> Result<ManifestHeader> {
        let start = cursor.position();
        let mut probe = *cursor;
        let signature = probe.array::<4>("MSCE signature")?;
        if signature != MSCE_SIGNATURE {
            return Err(MsceError::InvalidSignature {
                offset: start,
                found: signature,
            });
        }
        *cursor = probe;

        let reserved0 = cursor.u32_named("MSCE.reserved")?;
        let total_size = cursor.u32_named("MSCE.total_size")?;
        let reserved1 = cursor.u32_named("MSCE.reserved")?;
        let reserved2 = cursor.u32_named("MSCE.reserved")?;
        let architecture = Architecture::from(cursor.u32_named("MSCE.architecture")?);

        // The version words are interleaved: majors and minors first, builds last.
        let min_major = cursor.u32_named("MSCE.min_version.major")?;
        let min_minor = cursor.u32_named("MSCE.min_version.minor")?;
        let max_major = cursor.u32_named("MSCE.max_version.major")?;
        let max_minor = cursor.u32_named("MSCE.max_version.minor")?;
        let min_build = cursor.u32_named("MSCE.min_version.build")?;
        let max_build = cursor.u32_named("MSCE.max_version.build")?;

        let mut sections = SectionTable::default();
        for entry in sections.entries_mut() {
            entry.count = cursor.u16_named("MSCE.section.count")?;
        }
        for entry in sections.entries_mut() {
            entry.offset = cursor.u32_named("MSCE.section.offset")?;
        }

        let app_name = StringSpan {
            offset: cursor.u16_named("MSCE.app_name.offset")?,
            length: cursor.u16_named("MSCE.app_name.length")?,
        };
        let provider = StringSpan {
            offset: cursor.u16_named("MSCE.provider.offset")?,
            length: cursor.u16_named("MSCE.provider.length")?,
        };

        let padding = cursor.array::<8>("MSCE.padding")?;

        let header = ManifestHeader {
            total_size,
            reserved: [reserved0, reserved1, reserved2],
            architecture,
            min_version: OsVersion {
                major: min_major,
                minor: min_minor,
                build: min_build,
            },
            max_version: OsVersion {
                major: max_major,
                minor: max_minor,
                build: max_build,
            },
            sections,
            app_name,
            provider,
            padding,
        };

        debug!("MSCE header: {:#?}", header);
        Ok(header)
    }

    /// Resolve the app-name and provider strings from their declared spans.
    ///
    /// The spans are independent of the section offsets and may overlap any section.
    pub fn read_app_strings(&self, cursor: &mut ByteCursor<'_>) -> Result<(String, String)> {
        cursor.seek(u64::from(self.app_name.offset), "MSCE.app_name")?;
        let app_name = cursor.fixed_ascii(usize::from(self.app_name.length), "MSCE.app_name")?;

        cursor.seek(u64::from(self.provider.offset), "MSCE.provider")?;
        let provider = cursor.fixed_ascii(usize::from(self.provider.length), "MSCE.provider")?;

        Ok((app_name, provider))
    }

    /// Re-encode the header exactly as it was laid out on disk.
    pub fn to_bytes(&self) -> [u8; MSCE_HEADER_SIZE] {
        let mut out = Vec::with_capacity(MSCE_HEADER_SIZE);
        out.extend_from_slice(&MSCE_SIGNATURE);
        out.extend_from_slice(&self.reserved[0].to_le_bytes());
        out.extend_from_slice(&self.total_size.to_le_bytes());
        out.extend_from_slice(&self.reserved[1].to_le_bytes());
        out.extend_from_slice(&self.reserved[2].to_le_bytes());
        out.extend_from_slice(&self.architecture.code().to_le_bytes());
        for word in [
            self.min_version.major,
            self.min_version.minor,
            self.max_version.major,
            self.max_version.minor,
            self.min_version.build,
            self.max_version.build,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for entry in self.sections.entries() {
            out.extend_from_slice(&entry.count.to_le_bytes());
        }
        for entry in self.sections.entries() {
            out.extend_from_slice(&entry.offset.to_le_bytes());
        }
        for half in [
            self.app_name.offset,
            self.app_name.length,
            self.provider.offset,
            self.provider.length,
        ] {
            out.extend_from_slice(&half.to_le_bytes());
        }
        out.extend_from_slice(&self.padding);

        let mut bytes = [0u8; MSCE_HEADER_SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }
}
