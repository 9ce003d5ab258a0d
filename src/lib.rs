//! Decoder for the Windows CE setup manifest (`MSCE`, usually shipped as `*.000` inside
//! installer CABs).
//!
//! The manifest enumerates, by numeric ID, the strings, directories, files, registry hives,
//! registry keys and shortcuts an installer creates. [`SetupManifest::parse`] walks an
//! in-memory buffer and returns every section as an ID-keyed map; records that refer to each
//! other are resolved by lookup.
//!
//! ```no_run
//! let data = std::fs::read("setup.000").unwrap();
//! let manifest = msce::SetupManifest::parse(&data).unwrap();
//! for (id, link) in &manifest.links {
//!     println!("{id}: {} -> {:?}", link.base_directory, link.target_path);
//! }
//! ```

pub mod err;
mod header;
mod manifest;
mod placeholder;
pub mod sections;
mod utils;

pub use err::{DecodeWarning, ErrorKind, MsceError, Section};
pub use header::{
    Architecture, MSCE_HEADER_SIZE, MSCE_SIGNATURE, ManifestHeader, OsVersion, SectionEntry,
    SectionTable, StringSpan,
};
pub use manifest::{DecoderSettings, SetupManifest};
pub use placeholder::{PlaceholderTable, substitute};
pub use sections::{
    Directories, FileFlags, FileRecord, Files, LinkRecord, LinkType, Links, RegValueType,
    RegistryHive, RegistryHives, RegistryKeyEntry, RegistryKeyFlags, RegistryKeys, RootHive,
    StringTable,
};
pub use utils::{ByteCursor, DosNameError, decode_ascii, to_dos_8_3_name};

#[cfg(test)]
static LOGGER_INIT: std::sync::Once = std::sync::Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .is_test(true)
            .init();
    });
}
