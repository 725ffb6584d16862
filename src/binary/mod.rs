//! Binary window & converter primitives (component A) plus the declarative
//! field accessor framework (component B).

mod convert;
mod field;
mod window;

pub use convert::{ByteOrder, CString, Converter, RawBytes, TextEncoding, Uint};
pub use field::BinaryField;
pub use window::{ByteSource, Window};
