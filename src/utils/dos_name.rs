use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DosNameError {
    #[error("filename cannot be empty")]
    Empty,
}

fn is_dos_char(c: char) -> bool {
    c.is_ascii_uppercase()
        || c.is_ascii_digit()
        || matches!(
            c,
            '$' | '%' | '\'' | '-' | '_' | '@' | '~' | '`' | '!' | '(' | ')' | '{' | '}' | '^'
                | '#' | '&'
        )
}

fn sanitize(part: &str, max_len: usize) -> String {
    part.chars()
        .flat_map(char::to_uppercase)
        .map(|c| if is_dos_char(c) { c } else { '_' })
        .take(max_len)
        .collect()
}

/// Shorten a destination path to a DOS `8.3` file name.
///
/// Only the last path component is kept (`\` and `/` both separate). The name is
/// upper-cased, characters DOS does not allow become `_`, and base/extension are truncated
/// to 8 and 3 characters. A dot-file such as `.profile` has an empty base and yields `.PRO`.
pub fn to_dos_8_3_name(filename: &str) -> Result<String, DosNameError> {
    if filename.trim().is_empty() {
        return Err(DosNameError::Empty);
    }

    let name = filename
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(filename);

    // Everything after the last dot is the extension, even for `.profile` (empty base).
    let (base, extension) = match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => (name, ""),
    };

    let base = sanitize(base, 8);
    let extension = sanitize(extension, 3);

    if extension.is_empty() {
        Ok(base)
    } else {
        Ok(format!("{base}.{extension}"))
    }
}
