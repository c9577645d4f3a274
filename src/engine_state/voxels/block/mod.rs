//! # Block Module
//!
//! Block type definitions, the dense per-type property table and the six face
//! directions.

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;
