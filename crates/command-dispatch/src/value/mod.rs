//! Value kinds, typed command values and the text codec.

#![allow(missing_docs)]

mod codec;
mod kind;
mod types;

pub use codec::decode;
pub use kind::*;
pub use types::*;
