//! Value objects of the verification domain.

pub mod code_digits;

pub use code_digits::{CodeDigits, CODE_LENGTH};
