//! Foundation types for the Algol 68 front end.
//!
//! This module provides the primitives used throughout every later phase:
//! - [`Name`], [`Interner`] — interned spellings with pointer-equality identity
//! - [`TextSize`], [`TextRange`] — byte offsets into a source buffer
//! - [`LineCol`], [`LineIndex`] — line/column conversion for diagnostics
//!
//! Has no dependency on any other module in this crate.

mod intern;
mod line_index;
mod stropping;

pub use intern::{Interner, Name};
pub use line_index::{LineCol, LineIndex};
pub use stropping::Stropping;

pub use text_size::{TextRange, TextSize};
