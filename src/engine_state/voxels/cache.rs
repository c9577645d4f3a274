//! # Chunk Cache
//!
//! Two-tier storage for finished chunks:
//!
//! - **hot**: chunks in the active set, currently handed to the renderer
//! - **cold**: recently unloaded chunks, kept for a fast reload and evicted in
//!   insertion order once the tier is full
//!
//! A coordinate lives in at most one tier. Looking into the cold tier never
//! refreshes an entry, so eviction order is strictly the order entries were
//! demoted.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;

use crate::engine_state::rendering::ChunkMesh;

use super::{
    chunk::{ChunkCoordinate, ColumnMap, VoxelBuffer},
    generation::GeneratedChunk,
};

/// Everything kept for one finished chunk.
#[derive(Clone, Debug)]
pub struct ChunkRecord {
    /// Which chunk this is.
    pub coordinate: ChunkCoordinate,
    /// Block IDs, retained for remeshing.
    pub voxels: VoxelBuffer,
    /// Surface height per column.
    pub height_map: ColumnMap,
    /// Biome value per column.
    pub biome_map: ColumnMap,
    /// The mesh handed to the renderer.
    pub mesh: ChunkMesh,
    /// How long generation took on the worker.
    pub generation_time: Duration,
}

impl ChunkRecord {
    /// Bundles a generated chunk with its mesh.
    pub fn new(chunk: GeneratedChunk, mesh: ChunkMesh) -> Self {
        ChunkRecord {
            coordinate: chunk.coordinate,
            voxels: chunk.voxels,
            height_map: chunk.height_map,
            biome_map: chunk.biome_map,
            mesh,
            generation_time: chunk.elapsed,
        }
    }
}

/// Hot map plus bounded cold LRU.
pub struct ChunkCache {
    hot: HashMap<ChunkCoordinate, ChunkRecord>,
    cold: LruCache<ChunkCoordinate, ChunkRecord>,
}

impl ChunkCache {
    /// Creates empty tiers; the cold tier holds at most `cold_capacity` records.
    pub fn new(cold_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cold_capacity).unwrap_or(NonZeroUsize::MIN);
        ChunkCache {
            hot: HashMap::new(),
            cold: LruCache::new(capacity),
        }
    }

    /// Inserts a record into the hot tier, dropping any cold copy.
    pub fn insert_hot(&mut self, record: ChunkRecord) {
        self.cold.pop(&record.coordinate);
        self.hot.insert(record.coordinate, record);
    }

    /// Moves a cold record back to the hot tier.
    ///
    /// # Returns
    /// The promoted record, or `None` if `coordinate` is not cold.
    pub fn promote(&mut self, coordinate: ChunkCoordinate) -> Option<&ChunkRecord> {
        let record = self.cold.pop(&coordinate)?;
        self.hot.insert(coordinate, record);
        self.hot.get(&coordinate)
    }

    /// Moves a hot record to the cold tier.
    ///
    /// # Returns
    /// The record evicted from the cold tier to make room, if any. Its data is
    /// gone from the cache for good.
    pub fn demote(&mut self, coordinate: ChunkCoordinate) -> Option<ChunkRecord> {
        let record = self.hot.remove(&coordinate)?;
        self.insert_cold(record)
    }

    /// Inserts a record straight into the cold tier.
    ///
    /// # Returns
    /// The oldest cold record if the tier overflowed.
    pub fn insert_cold(&mut self, record: ChunkRecord) -> Option<ChunkRecord> {
        let coordinate = record.coordinate;
        self.hot.remove(&coordinate);
        // `push` also hands back the replaced value when the key was present
        match self.cold.push(coordinate, record) {
            Some((key, old)) if key != coordinate => Some(old),
            _ => None,
        }
    }

    /// Hot record for `coordinate`.
    pub fn hot(&self, coordinate: ChunkCoordinate) -> Option<&ChunkRecord> {
        self.hot.get(&coordinate)
    }

    /// Cold record for `coordinate`, without refreshing its position.
    pub fn cold(&self, coordinate: ChunkCoordinate) -> Option<&ChunkRecord> {
        self.cold.peek(&coordinate)
    }

    /// Whether `coordinate` is in the hot tier.
    pub fn is_hot(&self, coordinate: ChunkCoordinate) -> bool {
        self.hot.contains_key(&coordinate)
    }

    /// Whether `coordinate` is in the cold tier.
    pub fn is_cold(&self, coordinate: ChunkCoordinate) -> bool {
        self.cold.contains(&coordinate)
    }

    /// Coordinates of every hot record, in no particular order.
    pub fn hot_coordinates(&self) -> Vec<ChunkCoordinate> {
        self.hot.keys().copied().collect()
    }

    /// Every hot record.
    pub fn hot_records(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.hot.values()
    }

    /// Number of hot records.
    pub fn hot_len(&self) -> usize {
        self.hot.len()
    }

    /// Number of cold records.
    pub fn cold_len(&self) -> usize {
        self.cold.len()
    }

    /// Capacity of the cold tier.
    pub fn cold_capacity(&self) -> usize {
        self.cold.cap().get()
    }

    /// Empties both tiers, returning every record.
    pub fn clear(&mut self) -> Vec<ChunkRecord> {
        let mut records: Vec<ChunkRecord> = self.hot.drain().map(|(_, record)| record).collect();
        while let Some((_, record)) = self.cold.pop_lru() {
            records.push(record);
        }
        records
    }
}
