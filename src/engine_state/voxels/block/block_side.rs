//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the axis conventions
//! the mesher uses to sweep each of them.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// The axis the face normal lies on: 0 = X, 1 = Y, 2 = Z.
    pub fn normal_axis(self) -> usize {
        match self {
            BlockSide::LEFT | BlockSide::RIGHT => 0,
            BlockSide::BOTTOM | BlockSide::TOP => 1,
            BlockSide::FRONT | BlockSide::BACK => 2,
        }
    }

    /// Whether the normal points along the positive direction of its axis.
    pub fn is_positive(self) -> bool {
        matches!(self, BlockSide::RIGHT | BlockSide::TOP | BlockSide::FRONT)
    }

    /// The two in-plane axes `(u, v)`, ordered so that `u × v` points along the
    /// positive normal axis.
    pub fn plane_axes(self) -> (usize, usize) {
        let d = self.normal_axis();
        ((d + 1) % 3, (d + 2) % 3)
    }

    /// Unit offset to the neighbouring voxel this face looks at.
    pub fn offset(self) -> [i32; 3] {
        let mut offset = [0; 3];
        offset[self.normal_axis()] = if self.is_positive() { 1 } else { -1 };
        offset
    }

    /// The outward unit normal.
    pub fn normal(self) -> Vector3<f32> {
        let [x, y, z] = self.offset();
        Vector3::new(x as f32, y as f32, z as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn plane_axes_are_right_handed() {
        for side in BlockSide::all() {
            let (u, v) = side.plane_axes();
            let mut eu = Vector3::new(0.0f32, 0.0, 0.0);
            let mut ev = Vector3::new(0.0f32, 0.0, 0.0);
            eu[u] = 1.0;
            ev[v] = 1.0;
            let mut positive = Vector3::new(0.0f32, 0.0, 0.0);
            positive[side.normal_axis()] = 1.0;
            assert_eq!(eu.cross(ev), positive);
        }
    }

    #[test]
    fn normals_are_unit_and_opposed() {
        assert_eq!(BlockSide::TOP.normal(), -BlockSide::BOTTOM.normal());
        assert_eq!(BlockSide::RIGHT.normal(), -BlockSide::LEFT.normal());
        assert_eq!(BlockSide::FRONT.normal(), -BlockSide::BACK.normal());
        for side in BlockSide::all() {
            assert_eq!(side.normal().magnitude(), 1.0);
        }
    }
}
