//! Collision engine - stateless overlap tests between circles, rectangles
//! and the world border

use super::geometry::{Rect, Vec2};

/// Side of a rectangle struck by a circle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// Which side of a rectangle was struck, and the coordinate of that edge
/// (y for top/bottom, x for left/right)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderHit {
    pub side: Side,
    pub coordinate: f32,
}

/// Rectangle corner closest to an approaching circle; picks the push-back
/// direction for crate collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    BottomRight,
}

/// Collision engine for shape overlap queries
pub struct CollisionEngine;

impl CollisionEngine {
    /// True iff the distance between the centres is less than the sum of the radii
    #[inline]
    pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
        let combined = radius_a + radius_b;
        a.distance_squared(b) < combined * combined
    }

    /// Clamped-point test: the circle touches the rectangle when the closest
    /// point of the rectangle lies within the radius
    #[inline]
    pub fn circle_intersects_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
        let closest = rect.clamp_point(center);
        center.distance_squared(closest) <= radius * radius
    }

    /// Determine which side of `rect` a circle centred at `dest` strikes.
    ///
    /// Returns `None` when the circle does not overlap the rectangle. Otherwise
    /// the side whose edge midpoint is nearest to `dest` wins; ties resolve in
    /// top, bottom, left, right order.
    pub fn circle_vs_rect_border_side(dest: Vec2, radius: f32, rect: &Rect) -> Option<BorderHit> {
        if !Self::circle_intersects_rect(dest, radius, rect) {
            return None;
        }

        let candidates = [
            (Side::Top, dest.distance_squared(rect.top_mid())),
            (Side::Bottom, dest.distance_squared(rect.bottom_mid())),
            (Side::Left, dest.distance_squared(rect.left_mid())),
            (Side::Right, dest.distance_squared(rect.right_mid())),
        ];
        debug_assert!(
            candidates.iter().all(|(_, d)| d.is_finite()),
            "crate side classification on non-finite input: dest={dest:?} rect={rect:?}"
        );

        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 < best.1 {
                best = *candidate;
            }
        }

        let coordinate = match best.0 {
            Side::Top => rect.origin.y,
            Side::Bottom => rect.origin.y + rect.height,
            Side::Left => rect.origin.x,
            Side::Right => rect.origin.x + rect.width,
        };

        Some(BorderHit {
            side: best.0,
            coordinate,
        })
    }

    /// Corner of `rect` (top-left or bottom-right) nearest to `point`
    pub fn nearest_corner(point: Vec2, rect: &Rect) -> Corner {
        let to_top_left = point.distance_squared(rect.top_left());
        let to_bottom_right = point.distance_squared(rect.bottom_right());
        if to_top_left < to_bottom_right {
            Corner::TopLeft
        } else {
            Corner::BottomRight
        }
    }

    /// True iff `pos` lies within `tolerance` of any world boundary (or outside the world)
    #[inline]
    pub fn point_near_world_border(pos: Vec2, tolerance: f32, width: f32, height: f32) -> bool {
        pos.x < tolerance
            || pos.x > width - tolerance
            || pos.y < tolerance
            || pos.y > height - tolerance
    }

    /// True iff `pos` lies outside the world rectangle
    #[inline]
    pub fn point_outside_world(pos: Vec2, width: f32, height: f32) -> bool {
        pos.x < 0.0 || pos.x > width || pos.y < 0.0 || pos.y > height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn touching_circles_do_not_overlap() {
        assert!(!CollisionEngine::circles_overlap(
            Vec2::ZERO,
            10.0,
            Vec2::new(20.0, 0.0),
            10.0
        ));
        assert!(CollisionEngine::circles_overlap(
            Vec2::ZERO,
            10.0,
            Vec2::new(19.9, 0.0),
            10.0
        ));
    }

    #[test]
    fn rect_side_detection() {
        let crate_rect = Rect::new(100.0, 100.0, 220.0, 220.0);

        let top = CollisionEngine::circle_vs_rect_border_side(Vec2::new(210.0, 80.0), 30.0, &crate_rect)
            .expect("overlaps top");
        assert_eq!(top.side, Side::Top);
        assert_eq!(top.coordinate, 100.0);

        let bottom =
            CollisionEngine::circle_vs_rect_border_side(Vec2::new(210.0, 340.0), 30.0, &crate_rect)
                .expect("overlaps bottom");
        assert_eq!(bottom.side, Side::Bottom);
        assert_eq!(bottom.coordinate, 320.0);

        let left = CollisionEngine::circle_vs_rect_border_side(Vec2::new(75.0, 210.0), 30.0, &crate_rect)
            .expect("overlaps left");
        assert_eq!(left.side, Side::Left);
        assert_eq!(left.coordinate, 100.0);

        let right =
            CollisionEngine::circle_vs_rect_border_side(Vec2::new(345.0, 210.0), 30.0, &crate_rect)
                .expect("overlaps right");
        assert_eq!(right.side, Side::Right);
        assert_eq!(right.coordinate, 320.0);
    }

    #[test]
    fn rect_side_none_when_clear() {
        let crate_rect = Rect::new(100.0, 100.0, 220.0, 220.0);
        assert!(
            CollisionEngine::circle_vs_rect_border_side(Vec2::new(50.0, 50.0), 30.0, &crate_rect)
                .is_none()
        );
    }

    #[test]
    fn rect_side_ties_prefer_top() {
        // Centre of a square is equidistant from every edge midpoint
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        let hit = CollisionEngine::circle_vs_rect_border_side(Vec2::new(50.0, 50.0), 1.0, &r)
            .expect("inside");
        assert_eq!(hit.side, Side::Top);

        // Equidistant from left and bottom midpoints only: bottom comes first
        let hit = CollisionEngine::circle_vs_rect_border_side(Vec2::new(10.0, 90.0), 1.0, &r)
            .expect("inside");
        assert_eq!(hit.side, Side::Bottom);
    }

    #[test]
    fn nearest_corner_classification() {
        let r = Rect::new(100.0, 100.0, 220.0, 220.0);
        assert_eq!(CollisionEngine::nearest_corner(Vec2::new(90.0, 150.0), &r), Corner::TopLeft);
        assert_eq!(
            CollisionEngine::nearest_corner(Vec2::new(330.0, 250.0), &r),
            Corner::BottomRight
        );
    }

    #[test]
    fn world_border_tolerance() {
        assert!(CollisionEngine::point_near_world_border(Vec2::new(29.0, 500.0), 30.0, 1000.0, 1000.0));
        assert!(CollisionEngine::point_near_world_border(Vec2::new(500.0, 971.0), 30.0, 1000.0, 1000.0));
        assert!(!CollisionEngine::point_near_world_border(Vec2::new(30.0, 970.0), 30.0, 1000.0, 1000.0));
        assert!(CollisionEngine::point_outside_world(Vec2::new(-0.5, 10.0), 100.0, 100.0));
        assert!(!CollisionEngine::point_outside_world(Vec2::new(100.0, 0.0), 100.0, 100.0));
    }

    proptest! {
        #[test]
        fn circle_overlap_is_symmetric(
            ax in -1000.0f32..1000.0, ay in -1000.0f32..1000.0,
            bx in -1000.0f32..1000.0, by in -1000.0f32..1000.0,
            ra in 0.0f32..200.0, rb in 0.0f32..200.0,
        ) {
            let a = Vec2::new(ax, ay);
            let b = Vec2::new(bx, by);
            prop_assert_eq!(
                CollisionEngine::circles_overlap(a, ra, b, rb),
                CollisionEngine::circles_overlap(b, rb, a, ra)
            );
        }

        #[test]
        fn side_reported_only_on_overlap(
            x in -200.0f32..600.0, y in -200.0f32..600.0, radius in 1.0f32..80.0,
        ) {
            let r = Rect::new(100.0, 100.0, 220.0, 220.0);
            let p = Vec2::new(x, y);
            let hit = CollisionEngine::circle_vs_rect_border_side(p, radius, &r);
            prop_assert_eq!(hit.is_some(), CollisionEngine::circle_intersects_rect(p, radius, &r));
        }

        #[test]
        fn interior_points_are_not_near_border(
            x in 30.0f32..=970.0, y in 30.0f32..=970.0,
        ) {
            prop_assert!(!CollisionEngine::point_near_world_border(Vec2::new(x, y), 30.0, 1000.0, 1000.0));
        }
    }
}
