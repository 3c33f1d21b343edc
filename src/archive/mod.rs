//! Archive handling
//!
//! - `naming`: destination and name resolution
//! - `zip_codec`: zip packing and zip-slip safe unpacking
//! - `copy`: moving final output out of the working directory
//! - `lifecycle`: the [`Archive`] state machine tying them together

pub mod copy;
pub mod lifecycle;
pub mod naming;
pub mod zip_codec;

pub use lifecycle::{Archive, Stage};
