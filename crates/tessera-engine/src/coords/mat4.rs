use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

/// Column-major 4x4 matrix, laid out the way WGSL's `mat4x4<f32>` expects.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Orthographic projection mapping the box to clip space (`z` into `-1..1`).
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;
        Mat4 {
            cols: [
                [2.0 / rl, 0.0, 0.0, 0.0],
                [0.0, 2.0 / tb, 0.0, 0.0],
                [0.0, 0.0, -2.0 / fnr, 0.0],
                [-(right + left) / rl, -(top + bottom) / tb, -(far + near) / fnr, 1.0],
            ],
        }
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [x, y, z, 1.0];
        m
    }

    /// Applies the matrix to a point (`w = 1`).
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.cols[0][row] * p[0]
                + self.cols[1][row] * p[1]
                + self.cols[2][row] * p[2]
                + self.cols[3][row];
        }
        out
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4 { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ortho_maps_box_corners_to_clip_corners() {
        let proj = Mat4::orthographic(0.0, 960.0, 0.0, 720.0, -1.0, 1.0);
        assert_eq!(proj.transform_point([0.0, 0.0, 0.0]), [-1.0, -1.0, 0.0, 1.0]);
        assert_eq!(proj.transform_point([960.0, 720.0, 0.0]), [1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn product_applies_right_operand_first() {
        let mvp = Mat4::translation(-100.0, 0.0, 0.0) * Mat4::translation(400.0, 200.0, 0.0);
        assert_eq!(mvp.transform_point([1.0, 2.0, 0.0]), [301.0, 202.0, 0.0, 1.0]);
    }

    #[test]
    fn identity_is_neutral() {
        let t = Mat4::translation(3.0, 4.0, 5.0);
        assert_eq!(Mat4::IDENTITY * t, t);
        assert_eq!(t * Mat4::IDENTITY, t);
    }
}
