//! Readers for the variable-length lists of string-table IDs used by several sections.
//!
//! Two framings exist:
//! - DIRS: a bare list terminated by a `0` ID.
//! - REGHIVES / LINKS: a `u16` declared length followed by a list that stops at a `0` ID or
//!   once `declared length - 1` IDs have been read, whichever comes first. The ID read at the
//!   limit is consumed but not kept.

use crate::err::{MsceError, Result, Section};
use crate::sections::StringTable;
use crate::utils::ByteCursor;

/// A string-table reference, together with the offset it was read from (for error reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StringRef {
    pub id: u16,
    pub offset: u64,
}

/// Read IDs up to (and consuming) a `0` sentinel.
///
/// Running off the end of the buffer before the sentinel is `UnterminatedList`, reported at the
/// offset where the list started.
pub(crate) fn read_sentinel_list(
    cursor: &mut ByteCursor<'_>,
    what: &'static str,
) -> Result<Vec<StringRef>> {
    let start = cursor.position();
    let mut refs = Vec::new();
    loop {
        let offset = cursor.position();
        let id = cursor
            .u16_named(what)
            .map_err(|_| MsceError::UnterminatedList {
                what,
                offset: start,
            })?;
        if id == 0 {
            return Ok(refs);
        }
        refs.push(StringRef { id, offset });
    }
}

/// Read a declared-length spec list (see the module docs for the stopping rules).
///
/// At least one ID is always consumed, even for a declared length of `0` or `1`.
pub(crate) fn read_bounded_list(
    cursor: &mut ByteCursor<'_>,
    spec_length: u16,
    what: &'static str,
) -> Result<Vec<StringRef>> {
    let limit = i32::from(spec_length) - 1;
    let mut refs = Vec::with_capacity(usize::from(spec_length.saturating_sub(1)));
    let mut read = 0i32;
    loop {
        let offset = cursor.position();
        let id = cursor.u16_named(what)?;
        read += 1;
        if read >= limit || id == 0 {
            return Ok(refs);
        }
        refs.push(StringRef { id, offset });
    }
}

/// Resolve every reference against the string table; the first miss fails the decode.
pub(crate) fn resolve_all<'s>(
    refs: &[StringRef],
    strings: &'s StringTable,
    section: Section,
) -> Result<Vec<&'s str>> {
    refs.iter()
        .map(|r| strings.resolve(r.id, section, r.offset))
        .collect()
}
