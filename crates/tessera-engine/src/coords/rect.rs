use super::Vec2;

/// Axis-aligned rectangle: `origin` is the minimum corner.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Corners counter-clockwise starting at `origin`: min, (+x), max, (+y).
    #[inline]
    pub fn corners(self) -> [Vec2; 4] {
        let min = self.origin;
        let max = self.max();
        [
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_wind_counter_clockwise_from_origin() {
        let c = Rect::new(100.0, 100.0, 100.0, 50.0).corners();
        assert_eq!(c[0], Vec2::new(100.0, 100.0));
        assert_eq!(c[1], Vec2::new(200.0, 100.0));
        assert_eq!(c[2], Vec2::new(200.0, 150.0));
        assert_eq!(c[3], Vec2::new(100.0, 150.0));
    }

    #[test]
    fn is_empty_zero_size() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(Rect::new(0.0, 0.0, 5.0, 0.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
