use crate::err::{DecodeWarning, Result};
use crate::header::{ManifestHeader, SectionEntry};
use crate::placeholder::PlaceholderTable;
use crate::sections::{
    Directories, Files, Links, RegistryHives, RegistryKeys, StringTable, decode_directories,
    decode_files, decode_links, decode_registry_hives, decode_registry_keys, decode_strings,
};
use crate::utils::ByteCursor;

use log::{debug, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderSettings {
    placeholders: PlaceholderTable,
    allow_duplicate_ids: bool,
    parallel: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        DecoderSettings {
            placeholders: PlaceholderTable::ce_directories(),
            allow_duplicate_ids: false,
            parallel: false,
        }
    }
}

impl DecoderSettings {
    pub fn new() -> Self {
        DecoderSettings::default()
    }

    /// Sets the table used to expand `%TOKEN%`s in directory paths and link base directories.
    pub fn placeholders(mut self, placeholders: PlaceholderTable) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// When set, a repeated ID inside a section overwrites the earlier record instead of
    /// failing with `DuplicateId`.
    pub fn allow_duplicate_ids(mut self, allow_duplicate_ids: bool) -> Self {
        self.allow_duplicate_ids = allow_duplicate_ids;
        self
    }

    /// Decode DIRS, FILES and REGHIVES concurrently once STRINGS is available.
    /// Has no effect unless the crate is built with the `multithreading` feature.
    pub fn parallel(mut self, parallel: bool) -> Self {
        if parallel && !cfg!(feature = "multithreading") {
            warn!(
                "Parallel decoding requested, but the library was compiled without the `multithreading` feature"
            );
        }
        self.parallel = parallel;
        self
    }

    pub fn placeholder_table(&self) -> &PlaceholderTable {
        &self.placeholders
    }

    pub fn allows_duplicate_ids(&self) -> bool {
        self.allow_duplicate_ids
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

/// A fully decoded setup manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupManifest {
    pub header: ManifestHeader,
    pub app_name: String,
    pub provider: String,
    pub strings: StringTable,
    pub directories: Directories,
    pub files: Files,
    pub registry_hives: RegistryHives,
    pub registry_keys: RegistryKeys,
    pub links: Links,
    /// Non-fatal findings, in the order they were encountered.
    pub warnings: Vec<DecodeWarning>,
}

/// Outputs of the sections that only depend on the string table.
struct IndependentSections {
    directories: Directories,
    files: Files,
    registry_hives: RegistryHives,
    hive_warnings: Vec<DecodeWarning>,
}

fn section_cursor<'a>(
    data: &'a [u8],
    entry: SectionEntry,
    what: &'static str,
) -> Result<ByteCursor<'a>> {
    let mut cursor = ByteCursor::new(data);
    // Empty sections are never read, so their (often zero or stale) offset is not checked.
    if entry.count > 0 {
        cursor.seek(u64::from(entry.offset), what)?;
    }
    Ok(cursor)
}

impl SetupManifest {
    /// Decode a manifest held entirely in memory.
    pub fn parse(data: &[u8]) -> Result<SetupManifest> {
        Self::parse_with_settings(data, &DecoderSettings::default())
    }

    pub fn parse_with_settings(data: &[u8], settings: &DecoderSettings) -> Result<SetupManifest> {
        let mut cursor = ByteCursor::new(data);
        let header = ManifestHeader::from_cursor(&mut cursor)?;

        let mut warnings = Vec::new();
        if !header.architecture.is_known() {
            let warning = DecodeWarning::UnknownArchitecture {
                value: header.architecture.code(),
                offset: 20,
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        let (app_name, provider) = header.read_app_strings(&mut cursor)?;
        info!("Decoding manifest for {app_name:?} by {provider:?}");

        let sections = header.sections;
        let strings = decode_strings(
            &mut section_cursor(data, sections.strings, "STRINGS offset")?,
            sections.strings,
            settings,
        )?;

        let independent = if settings.is_parallel() {
            Self::decode_independent_parallel(data, &header, &strings, settings)?
        } else {
            Self::decode_independent(data, &header, &strings, settings)?
        };
        warnings.extend(independent.hive_warnings);

        let unsupported = decode_registry_keys(sections.registry_keys);
        warn!("While reading REGKEYS: {unsupported}");
        let registry_keys = RegistryKeys::Unsupported {
            declared_count: sections.registry_keys.count,
            offset: sections.registry_keys.offset,
        };

        let links = decode_links(
            &mut section_cursor(data, sections.links, "LINKS offset")?,
            sections.links,
            &strings,
            &independent.directories,
            &independent.files,
            settings,
            &mut warnings,
        )?;

        debug!(
            "Decoded {} strings, {} dirs, {} files, {} hives, {} links ({} warnings)",
            strings.len(),
            independent.directories.len(),
            independent.files.len(),
            independent.registry_hives.len(),
            links.len(),
            warnings.len()
        );

        Ok(SetupManifest {
            header,
            app_name,
            provider,
            strings,
            directories: independent.directories,
            files: independent.files,
            registry_hives: independent.registry_hives,
            registry_keys,
            links,
            warnings,
        })
    }

    fn decode_independent(
        data: &[u8],
        header: &ManifestHeader,
        strings: &StringTable,
        settings: &DecoderSettings,
    ) -> Result<IndependentSections> {
        let sections = header.sections;
        let directories = decode_directories(
            &mut section_cursor(data, sections.directories, "DIRS offset")?,
            sections.directories,
            strings,
            settings,
        )?;
        let files = decode_files(
            &mut section_cursor(data, sections.files, "FILES offset")?,
            sections.files,
            settings,
        )?;
        let mut hive_warnings = Vec::new();
        let registry_hives = decode_registry_hives(
            &mut section_cursor(data, sections.registry_hives, "REGHIVES offset")?,
            sections.registry_hives,
            strings,
            settings,
            &mut hive_warnings,
        )?;

        Ok(IndependentSections {
            directories,
            files,
            registry_hives,
            hive_warnings,
        })
    }

    #[cfg(feature = "multithreading")]
    fn decode_independent_parallel(
        data: &[u8],
        header: &ManifestHeader,
        strings: &StringTable,
        settings: &DecoderSettings,
    ) -> Result<IndependentSections> {
        let sections = header.sections;

        let (directories, (files, hives)) = rayon::join(
            || -> Result<Directories> {
                decode_directories(
                    &mut section_cursor(data, sections.directories, "DIRS offset")?,
                    sections.directories,
                    strings,
                    settings,
                )
            },
            || {
                rayon::join(
                    || -> Result<Files> {
                        decode_files(
                            &mut section_cursor(data, sections.files, "FILES offset")?,
                            sections.files,
                            settings,
                        )
                    },
                    || -> Result<(RegistryHives, Vec<DecodeWarning>)> {
                        let mut hive_warnings = Vec::new();
                        let hives = decode_registry_hives(
                            &mut section_cursor(
                                data,
                                sections.registry_hives,
                                "REGHIVES offset",
                            )?,
                            sections.registry_hives,
                            strings,
                            settings,
                            &mut hive_warnings,
                        )?;
                        Ok((hives, hive_warnings))
                    },
                )
            },
        );

        // Report errors in the same order a sequential decode would hit them.
        let directories = directories?;
        let files = files?;
        let (registry_hives, hive_warnings) = hives?;

        Ok(IndependentSections {
            directories,
            files,
            registry_hives,
            hive_warnings,
        })
    }

    #[cfg(not(feature = "multithreading"))]
    fn decode_independent_parallel(
        data: &[u8],
        header: &ManifestHeader,
        strings: &StringTable,
        settings: &DecoderSettings,
    ) -> Result<IndependentSections> {
        Self::decode_independent(data, header, strings, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_env_logger_initialized;
    use crate::err::ErrorKind;
    use crate::header::{Architecture, OsVersion, SectionTable, StringSpan};
    use pretty_assertions::assert_eq;

    fn header(sections: SectionTable) -> ManifestHeader {
        ManifestHeader {
            total_size: 0,
            reserved: [0; 3],
            architecture: Architecture::Arm920,
            min_version: OsVersion {
                major: 4,
                minor: 0,
                build: 0,
            },
            max_version: OsVersion {
                major: 5,
                minor: 0,
                build: 0,
            },
            sections,
            app_name: StringSpan {
                offset: 100,
                length: 3,
            },
            provider: StringSpan {
                offset: 103,
                length: 0,
            },
            padding: [0; 8],
        }
    }

    fn manifest_bytes(sections: SectionTable, body: &[u8]) -> Vec<u8> {
        let mut data = header(sections).to_bytes().to_vec();
        data.extend_from_slice(b"App");
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_default_settings() {
        let settings = DecoderSettings::default();
        assert_eq!(settings.placeholder_table(), &PlaceholderTable::ce_directories());
        assert!(!settings.allows_duplicate_ids());
        assert!(!settings.is_parallel());
    }

    #[test]
    fn test_header_only_manifest() {
        ensure_env_logger_initialized();
        let sections = SectionTable {
            files: SectionEntry {
                count: 0,
                offset: 0xFFFF_FFFF,
            },
            ..SectionTable::default()
        };
        let data = manifest_bytes(sections, &[]);

        let manifest = SetupManifest::parse(&data).unwrap();
        assert_eq!(manifest.app_name, "App");
        assert_eq!(manifest.provider, "");
        assert!(manifest.strings.is_empty());
        assert!(manifest.files.is_empty());
        assert_eq!(
            manifest.registry_keys,
            RegistryKeys::Unsupported {
                declared_count: 0,
                offset: 0
            }
        );
        assert!(manifest.warnings.is_empty());
    }

    #[test]
    fn test_sections_are_addressed_by_offset() {
        ensure_env_logger_initialized();
        // FILES is laid out before STRINGS; only the header offsets say where each one lives.
        let mut body = Vec::new();
        let files_offset = 103u32;
        for word in [1u16, 0, 0] {
            body.extend_from_slice(&word.to_le_bytes());
        }
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(b"\\a");

        let strings_offset = files_offset + body.len() as u32;
        body.extend_from_slice(&7u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.push(b'x');

        let sections = SectionTable {
            strings: SectionEntry {
                count: 1,
                offset: strings_offset,
            },
            files: SectionEntry {
                count: 1,
                offset: files_offset,
            },
            ..SectionTable::default()
        };
        let data = manifest_bytes(sections, &body);

        let manifest = SetupManifest::parse(&data).unwrap();
        assert_eq!(manifest.strings.get(7), Some("x"));
        assert_eq!(manifest.files[&1].destination_path, "\\a");
    }

    #[test]
    fn test_registry_keys_are_never_read() {
        ensure_env_logger_initialized();
        // The declared REGKEYS offset points far past the buffer; decoding still succeeds.
        let sections = SectionTable {
            registry_keys: SectionEntry {
                count: 3,
                offset: 0x7FFF_0000,
            },
            ..SectionTable::default()
        };
        let data = manifest_bytes(sections, &[]);

        let manifest = SetupManifest::parse(&data).unwrap();
        assert_eq!(
            manifest.registry_keys,
            RegistryKeys::Unsupported {
                declared_count: 3,
                offset: 0x7FFF_0000
            }
        );
    }

    #[test]
    fn test_links_fail_on_truncated_record() {
        let sections = SectionTable {
            links: SectionEntry {
                count: 1,
                offset: 103,
            },
            ..SectionTable::default()
        };
        let data = manifest_bytes(sections, &[1, 0, 0, 0]);

        let err = SetupManifest::parse(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        assert_eq!(err.offset(), 107);
    }
}
