use cgmath::Point3;

use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};

/// A rectangle of coplanar, same-type visible block faces.
///
/// The rectangle lies on one layer along the side's normal axis and spans
/// `width` cells along the side's `u` axis and `height` cells along its `v`
/// axis (see [`BlockSide::plane_axes`]). A naive face is simply `1 × 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    /// Which side of the blocks this face covers
    pub block_side: BlockSide,
    /// The block type shared by every covered cell
    pub block_type: BlockType,
    /// Voxel position of the covered cell with the smallest `u` and `v`
    pub origin: Point3<usize>,
    /// Extent along the `u` axis, in cells
    pub width: usize,
    /// Extent along the `v` axis, in cells
    pub height: usize,
}

impl Face {
    /// Creates a face.
    ///
    /// # Arguments
    /// * `block_side` - The side the face covers
    /// * `block_type` - Block type of every covered cell
    /// * `origin` - Voxel position of the lowest `(u, v)` cell
    /// * `width`, `height` - Extent along `u` and `v`
    pub fn new(
        block_side: BlockSide,
        block_type: BlockType,
        origin: Point3<usize>,
        width: usize,
        height: usize,
    ) -> Self {
        Face {
            block_side,
            block_type,
            origin,
            width,
            height,
        }
    }

    /// A single-cell face on `block_side` of the voxel at `position`.
    pub fn unit(block_side: BlockSide, block_type: BlockType, position: Point3<usize>) -> Self {
        Face::new(block_side, block_type, position, 1, 1)
    }

    /// The four corners of the quad as `[ll, lr, ul, ur]`.
    ///
    /// `lr` lies along `u` from `ll` and `ul` along `v`. The plane sits on the
    /// outer boundary of the covered voxels.
    pub fn corners(&self) -> [Point3<usize>; 4] {
        let d = self.block_side.normal_axis();
        let (u, v) = self.block_side.plane_axes();

        let mut ll = [self.origin.x, self.origin.y, self.origin.z];
        if self.block_side.is_positive() {
            ll[d] += 1;
        }
        let mut lr = ll;
        lr[u] += self.width;
        let mut ul = ll;
        ul[v] += self.height;
        let mut ur = lr;
        ur[v] += self.height;

        [ll, lr, ul, ur].map(Point3::from)
    }

    /// Number of unit cells the face covers.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Voxel positions of every unit cell the face covers.
    pub fn unit_cells(&self) -> impl Iterator<Item = Point3<usize>> + '_ {
        let (u, v) = self.block_side.plane_axes();
        (0..self.height).flat_map(move |dv| {
            (0..self.width).map(move |du| {
                let mut cell = [self.origin.x, self.origin.y, self.origin.z];
                cell[u] += du;
                cell[v] += dv;
                Point3::from(cell)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_face_sits_above_its_voxels() {
        let face = Face::new(BlockSide::TOP, BlockType::GRASS, Point3::new(1, 2, 3), 2, 3);
        // TOP: u = Z, v = X
        let [ll, lr, ul, ur] = face.corners();
        assert_eq!(ll, Point3::new(1, 3, 3));
        assert_eq!(lr, Point3::new(1, 3, 5));
        assert_eq!(ul, Point3::new(4, 3, 3));
        assert_eq!(ur, Point3::new(4, 3, 5));
    }

    #[test]
    fn negative_faces_stay_on_the_lower_boundary() {
        let face = Face::unit(BlockSide::LEFT, BlockType::STONE, Point3::new(4, 0, 0));
        assert!(face.corners().iter().all(|c| c.x == 4));
    }

    #[test]
    fn unit_cells_cover_the_rectangle() {
        let face = Face::new(BlockSide::FRONT, BlockType::DIRT, Point3::new(0, 0, 7), 3, 2);
        let cells: Vec<_> = face.unit_cells().collect();
        assert_eq!(cells.len(), face.area());
        assert!(cells.contains(&Point3::new(2, 1, 7)));
        assert!(cells.iter().all(|c| c.z == 7));
    }
}
