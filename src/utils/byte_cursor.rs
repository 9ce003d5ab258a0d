use crate::err::{MsceError, Result};
use crate::utils::{bytes, decode_ascii};

/// A lightweight cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`. Manifest sections are addressed
/// by absolute offsets taken from the header, so [`ByteCursor::seek`] is a first-class,
/// bounds-checked operation rather than a side effect of reading.
///
/// All reads are little-endian and advance the cursor on success. A failed read leaves the
/// position untouched.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Reposition the cursor to an absolute offset.
    ///
    /// `pos == len` (EOF) is allowed; anything past it is rejected since the offsets come
    /// straight from untrusted header fields.
    pub fn seek(&mut self, pos: u64, what: &'static str) -> Result<()> {
        let len = self.buf.len();
        let pos_usize = usize::try_from(pos)
            .ok()
            .filter(|&p| p <= len)
            .ok_or(MsceError::OffsetOutOfBounds {
                what,
                offset: pos,
                len,
            })?;
        self.pos = pos_usize;
        Ok(())
    }

    #[inline]
    pub fn take_bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    /// Skip `n` bytes without interpreting them.
    #[inline]
    pub fn skip(&mut self, n: usize, what: &'static str) -> Result<()> {
        self.take_bytes(n, what).map(|_| ())
    }

    #[inline]
    pub fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let v = bytes::read_array_r::<N>(self.buf, self.pos, what)?;
        self.pos += N;
        Ok(v)
    }

    #[inline]
    pub fn u16_named(&mut self, what: &'static str) -> Result<u16> {
        let v = bytes::read_u16_le_r(self.buf, self.pos, what)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub fn u32_named(&mut self, what: &'static str) -> Result<u32> {
        let v = bytes::read_u32_le_r(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    /// Read exactly `len` bytes and decode them as ASCII (see [`decode_ascii`]).
    pub fn fixed_ascii(&mut self, len: usize, what: &'static str) -> Result<String> {
        let bytes = self.take_bytes(len, what)?;
        Ok(decode_ascii(bytes))
    }

    /// Read a `u16` length prefix followed by that many ASCII bytes.
    pub fn len_prefixed_ascii(&mut self, what: &'static str) -> Result<String> {
        let len = self.u16_named(what)?;
        self.fixed_ascii(usize::from(len), what)
    }
}
