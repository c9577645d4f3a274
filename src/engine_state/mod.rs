//! # Engine State Module
//!
//! The runtime of the voxel world: everything between "the viewer moved" and
//! "these meshes should be on screen".
//!
//! ## Key Components
//!
//! * `chunk_manager` - Keeps the loaded set centred on the viewer
//! * `rendering` - Mesh generation and the renderer boundary
//! * `task_management` - Worker pool, priority queue and retry policy
//! * `voxels` - Voxel data, terrain generation and the chunk cache
//!
//! ## Architecture
//!
//! The `ChunkManager` is the central coordinator. It owns the scheduler, the
//! cache and the renderer, and it is the only thing that mutates them. Workers
//! own their generator and exchange tasks and results with it over channels.
//!
//! ## Performance Considerations
//!
//! * Generation runs on a fixed worker pool, meshing on the control thread
//! * Voxel buffers are recycled through a pool instead of reallocated
//! * Greedy meshing keeps vertex counts low
//! * Chunk loading and unloading follow the viewer with hysteresis

pub mod chunk_manager;
pub mod rendering;
pub mod task_management;
pub mod voxels;
