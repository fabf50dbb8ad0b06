//! GLB container parser
//!
//! - `read` - Header and chunk-table decoding
//! - `tests` - Container state-machine test suite

mod read;

#[cfg(test)]
mod tests;

pub use read::{is_glb, parse_glb};
