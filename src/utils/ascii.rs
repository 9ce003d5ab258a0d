/// Decode bytes as 7-bit ASCII.
///
/// Bytes outside the ASCII range decode as `?`, the same replacement the installer tooling
/// applies, so a decoded string is always plain ASCII.
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect()
}
