//! Greedy meshing implementation for voxel rendering.
//!
//! This module implements the greedy meshing algorithm which combines adjacent coplanar
//! faces with the same block type into larger quads, significantly reducing the number of
//! vertices needed to render a chunk.
//!
//! For every side the chunk is swept layer by layer along the side's normal axis.
//! Each layer produces a 2-D mask over the side's `(u, v)` plane holding the block
//! type of every visible face, which is then consumed rectangle by rectangle.

use cgmath::Point3;

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, block_type::BlockType},
    chunk::{chunk_iteration::ChunkBlockIterator, VoxelBuffer},
};

use super::{face::Face, occupancy::Occupancy};

/// Greedy-merged visible faces of `voxels` on `side`.
///
/// # Arguments
/// * `voxels` - The chunk to mesh
/// * `occupancy` - Solidity bitmap of the same chunk
/// * `side` - The block side to generate faces for
///
/// # Returns
/// Maximal rectangles in row-major scan order; together they cover exactly the
/// visible faces [`naive_faces`] would emit.
pub fn greedy_faces(voxels: &VoxelBuffer, occupancy: &Occupancy, side: BlockSide) -> Vec<Face> {
    let extent = voxels.dimensions().extent();
    let d = side.normal_axis();
    let (u_axis, v_axis) = side.plane_axes();
    let (du, dv) = (extent[u_axis], extent[v_axis]);

    let mut faces = Vec::new();
    let mut mask = vec![BlockType::AIR; du * dv];

    for layer in 0..extent[d] {
        fill_mask(&mut mask, voxels, occupancy, side, layer);

        for v in 0..dv {
            let mut u = 0;
            while u < du {
                let block = mask[u + v * du];
                if block.is_empty() {
                    u += 1;
                    continue;
                }

                let mut width = 1;
                while u + width < du && mask[u + width + v * du] == block {
                    width += 1;
                }

                let mut height = 1;
                'grow: while v + height < dv {
                    let row = (v + height) * du;
                    for k in u..u + width {
                        if mask[k + row] != block {
                            break 'grow;
                        }
                    }
                    height += 1;
                }

                for dy in 0..height {
                    let row = (v + dy) * du;
                    mask[row + u..row + u + width].fill(BlockType::AIR);
                }

                let mut origin = [0; 3];
                origin[d] = layer;
                origin[u_axis] = u;
                origin[v_axis] = v;
                faces.push(Face::new(side, block, Point3::from(origin), width, height));

                u += width;
            }
        }
    }

    faces
}

/// Writes the visible block type (or `AIR`) of every cell of `layer`.
fn fill_mask(
    mask: &mut [BlockType],
    voxels: &VoxelBuffer,
    occupancy: &Occupancy,
    side: BlockSide,
    layer: usize,
) {
    let extent = voxels.dimensions().extent();
    let d = side.normal_axis();
    let (u_axis, v_axis) = side.plane_axes();
    let du = extent[u_axis];

    for v in 0..extent[v_axis] {
        for u in 0..du {
            let mut position = [0; 3];
            position[d] = layer;
            position[u_axis] = u;
            position[v_axis] = v;
            let [x, y, z] = position;

            mask[u + v * du] = if occupancy.is_solid(x, y, z) && occupancy.is_face_exposed(x, y, z, side) {
                voxels.get(x, y, z)
            } else {
                BlockType::AIR
            };
        }
    }
}

/// One unit face per visible voxel face on `side`, in storage order.
///
/// This is the correctness baseline the greedy path is checked against.
pub fn naive_faces(voxels: &VoxelBuffer, occupancy: &Occupancy, side: BlockSide) -> Vec<Face> {
    ChunkBlockIterator::new(voxels)
        .filter(|(p, _)| occupancy.is_face_exposed(p.x, p.y, p.z, side))
        .map(|(p, block)| Face::unit(side, block, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::ChunkDimensions;

    #[test]
    fn flat_slab_merges_into_one_quad_per_side() {
        let mut voxels = VoxelBuffer::new(ChunkDimensions::new(4, 4));
        for z in 0..4 {
            for x in 0..4 {
                voxels.set(x, 0, z, BlockType::STONE);
            }
        }
        let occupancy = Occupancy::new(&voxels);

        let top = greedy_faces(&voxels, &occupancy, BlockSide::TOP);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].area(), 16);
        assert_eq!(greedy_faces(&voxels, &occupancy, BlockSide::FRONT).len(), 1);
        assert_eq!(naive_faces(&voxels, &occupancy, BlockSide::TOP).len(), 16);
    }

    #[test]
    fn different_types_do_not_merge() {
        let mut voxels = VoxelBuffer::new(ChunkDimensions::new(4, 4));
        voxels.set(0, 0, 0, BlockType::STONE);
        voxels.set(1, 0, 0, BlockType::DIRT);
        let occupancy = Occupancy::new(&voxels);

        let faces = greedy_faces(&voxels, &occupancy, BlockSide::BOTTOM);
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|f| f.area() == 1));
    }

    #[test]
    fn hidden_faces_are_skipped() {
        let mut voxels = VoxelBuffer::new(ChunkDimensions::new(4, 4));
        voxels.set(1, 1, 1, BlockType::SAND);
        voxels.set(1, 2, 1, BlockType::SAND);
        let occupancy = Occupancy::new(&voxels);

        let top = greedy_faces(&voxels, &occupancy, BlockSide::TOP);
        assert_eq!(top, vec![Face::unit(BlockSide::TOP, BlockType::SAND, Point3::new(1, 2, 1))]);
        // The column merges vertically on the side faces
        let right = greedy_faces(&voxels, &occupancy, BlockSide::RIGHT);
        assert_eq!(right.len(), 1);
        assert_eq!(right[0].area(), 2);
    }
}
