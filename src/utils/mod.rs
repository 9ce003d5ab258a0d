mod ascii;
mod byte_cursor;
pub(crate) mod bytes;
mod dos_name;

pub use self::ascii::decode_ascii;
pub use self::byte_cursor::ByteCursor;
pub use self::dos_name::{DosNameError, to_dos_8_3_name};
