// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convex hull of a 2D point set (Andrew's monotone chain).
//!
//! Points are ordered by x, then y. The lower chain is built left to right
//! between the run of minimum-x points and the run of maximum-x points, the
//! upper chain right to left. Points on a chain's supporting line are
//! skipped, and a stack point is popped unless the candidate makes a strict
//! left turn, so collinear boundary points never become hull vertices.
//!
//! Ordering is by x first and only then by y. A scan ordered by y with runs of
//! equal y taken by x can leave a point just inside a steep edge on the ring as
//! a reflex vertex; sorting on x keeps every returned vertex a strict left turn.

use nalgebra::Point2;

/// Twice the signed area of `(p0, p1, p2)`.
///
/// `> 0` when `p2` is left of the directed line `p0 → p1`, `< 0` when it is
/// right of it, `0` when the three points are collinear.
#[inline]
pub fn is_left(p0: &Point2<f64>, p1: &Point2<f64>, p2: &Point2<f64>) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

/// Computes the convex hull of `points`.
///
/// Returns indices into `points` listing the boundary counter-clockwise,
/// starting at the lowest of the leftmost points. The ring is implicitly
/// closed: the first index is not repeated at the end. When every point
/// shares one x coordinate the result is the one or two extreme-y points.
///
/// # Example
///
/// ```
/// use surfmesh_geometry::{convex_hull, Point2};
///
/// let points = [
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 1.0), // interior
///     Point2::new(2.0, 0.0),
///     Point2::new(2.0, 2.0),
///     Point2::new(0.0, 2.0),
/// ];
/// assert_eq!(convex_hull(&points), vec![0, 2, 3, 4]);
/// ```
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        points[i]
            .x
            .total_cmp(&points[j].x)
            .then(points[i].y.total_cmp(&points[j].y))
    });
    let mut hull = chain_hull(points, &order);

    // Coincident points can leave zero-length edges in the ring.
    hull.dedup_by(|a, b| points[*a] == points[*b]);
    while hull.len() > 1 && points[hull[0]] == points[hull[hull.len() - 1]] {
        hull.pop();
    }
    hull
}

/// Monotone chain over `order`, a permutation of point indices sorted by
/// (x, y).
fn chain_hull(points: &[Point2<f64>], order: &[usize]) -> Vec<usize> {
    let n = order.len();
    let p = |k: usize| &points[order[k]];
    let mut hull: Vec<usize> = Vec::with_capacity(n + 1);

    // Run of points sharing the minimum x.
    let min_min = 0;
    let x_min = p(0).x;
    let mut k = 1;
    while k < n && p(k).x == x_min {
        k += 1;
    }
    let min_max = k - 1;

    if min_max == n - 1 {
        hull.push(order[min_min]);
        if p(min_max).y != p(min_min).y {
            hull.push(order[min_max]);
        }
        return hull;
    }

    // Run of points sharing the maximum x.
    let max_max = n - 1;
    let x_max = p(max_max).x;
    let mut k = max_max;
    while k > 0 && p(k - 1).x == x_max {
        k -= 1;
    }
    let max_min = k;

    // Lower chain.
    hull.push(order[min_min]);
    for i in (min_max + 1)..=max_min {
        if i < max_min && is_left(p(min_min), p(max_min), p(i)) >= 0.0 {
            continue;
        }
        while hull.len() >= 2 {
            let top = hull.len() - 1;
            if is_left(&points[hull[top - 1]], &points[hull[top]], p(i)) > 0.0 {
                break;
            }
            hull.pop();
        }
        hull.push(order[i]);
    }

    // Upper chain, stacked above the lower one.
    if max_max != max_min {
        hull.push(order[max_max]);
    }
    let bottom = hull.len() - 1;
    for i in (min_max..max_min).rev() {
        if i > min_max && is_left(p(max_max), p(min_max), p(i)) >= 0.0 {
            continue;
        }
        while hull.len() - 1 > bottom {
            let top = hull.len() - 1;
            if is_left(&points[hull[top - 1]], &points[hull[top]], p(i)) > 0.0 {
                break;
            }
            hull.pop();
        }
        hull.push(order[i]);
    }
    if min_max != min_min {
        hull.push(order[min_min]);
    }
    hull
}
