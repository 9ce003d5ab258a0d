//! Little-endian reads at absolute positions of the manifest buffer.
//!
//! `read_array` answers `None` when the bytes are not there; the `*_r` functions turn that
//! into `MsceError::Truncated` naming the field being read. `ByteCursor` is built on them.

use crate::err::MsceError;

/// `N` bytes starting at `offset`, if all of them are in `buf`.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

fn truncated(what: &'static str, offset: usize, need: usize, len: usize) -> MsceError {
    MsceError::Truncated {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

/// `len` bytes starting at `offset`. A range whose end overflows `usize` is reported the same
/// way as one running past the buffer.
pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], MsceError> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| truncated(what, offset, len, buf.len()))
}

pub(crate) fn read_array_r<const N: usize>(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<[u8; N], MsceError> {
    read_array::<N>(buf, offset).ok_or_else(|| truncated(what, offset, N, buf.len()))
}

pub(crate) fn read_u16_le_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u16, MsceError> {
    read_array_r::<2>(buf, offset, what).map(u16::from_le_bytes)
}

pub(crate) fn read_u32_le_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u32, MsceError> {
    read_array_r::<4>(buf, offset, what).map(u32::from_le_bytes)
}
