//! # Voxel World Core
//!
//! This module contains the voxel data model and everything that produces or
//! stores it.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Block types, their property table, and face directions
//! * **Chunk**: Coordinates, dense voxel buffers, column maps and the buffer pool
//! * **Noise field**: Seeded simplex noise with fractal composition
//! * **Generation**: The deterministic per-chunk terrain generator
//! * **Cache**: Hot and cold storage for finished chunks
//!
//! ## Data Flow
//!
//! 1. A worker runs the generator for a coordinate, filling a pooled buffer
//! 2. The control thread meshes the result and stores it in the hot tier
//! 3. Chunks leaving the load radius are demoted to the cold tier
//! 4. Cold overflow discards the oldest record; its buffer returns to the pool
//!
//! ## Thread Safety
//!
//! Generators are owned one per worker and share nothing mutable. Buffers move
//! between threads by value. The cache is touched only by the control thread.

pub mod block;
pub mod cache;
pub mod chunk;
pub mod generation;
pub mod noise_field;
