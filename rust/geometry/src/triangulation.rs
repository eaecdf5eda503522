// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point set triangulation
//!
//! Radial sweep Delaunay triangulation. Points are inserted in order of their
//! distance from the bounding-box centre, so each one falls outside the hull
//! of the points before it and is joined to every hull edge it can see. New
//! edges are then legalized by flipping until each quad passes the in-circle
//! test. The triangles always cover the convex hull of the input.

use nalgebra::Point2;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::hull::is_left;
use crate::types::Triangle;

/// Link value for points not on the sweep front.
const OFF_FRONT: usize = usize::MAX;

/// In-circle predicate.
///
/// Positive when `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `(a, b, c)`, negative when outside, zero when
/// the four points are cocircular.
#[inline]
pub fn in_circle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> f64 {
    let adx = a.x - d.x;
    let ady = a.y - d.y;
    let bdx = b.x - d.x;
    let bdy = b.y - d.y;
    let cdx = c.x - d.x;
    let cdy = c.y - d.y;

    let ab_det = adx * bdy - bdx * ady;
    let bc_det = bdx * cdy - cdx * bdy;
    let ca_det = cdx * ady - adx * cdy;

    let a_lift = adx * adx + ady * ady;
    let b_lift = bdx * bdx + bdy * bdy;
    let c_lift = cdx * cdx + cdy * cdy;

    a_lift * bc_det + b_lift * ca_det + c_lift * ab_det
}

/// Key identifying a coordinate pair exactly (`-0.0` and `0.0` coincide).
#[inline]
pub fn point_key(p: &Point2<f64>) -> (u64, u64) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// Delaunay-triangulates `points`.
///
/// Returns counter-clockwise triangles indexing into `points` that together
/// cover the convex hull of the input. Exact duplicate points are ignored
/// (the first occurrence is used). Fewer than three distinct points, or an
/// all-collinear set, yields no triangles.
///
/// # Example
///
/// ```
/// use surfmesh_geometry::{triangulate, Point2};
///
/// let square = [
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(1.0, 1.0),
///     Point2::new(0.0, 1.0),
/// ];
/// assert_eq!(triangulate(&square).len(), 2);
/// ```
pub fn triangulate(points: &[Point2<f64>]) -> Vec<Triangle> {
    let mut seen = FxHashSet::default();
    let mut order: Vec<usize> = (0..points.len())
        .filter(|&i| seen.insert(point_key(&points[i])))
        .collect();
    if order.len() < 3 {
        return Vec::new();
    }

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &i in &order {
        x_min = x_min.min(points[i].x);
        x_max = x_max.max(points[i].x);
        y_min = y_min.min(points[i].y);
        y_max = y_max.max(points[i].y);
    }
    let span = (x_max - x_min).max(y_max - y_min);
    if !(span > 0.0) || !span.is_finite() {
        return Vec::new();
    }
    let centre = Point2::new(0.5 * (x_min + x_max), 0.5 * (y_min + y_max));
    let radius = |i: usize| (points[i] - centre).norm_squared();
    order.sort_by(|&i, &j| {
        radius(i)
            .total_cmp(&radius(j))
            .then(points[i].x.total_cmp(&points[j].x))
            .then(points[i].y.total_cmp(&points[j].y))
    });

    // Seed: the leading run of collinear points, fanned to the first point
    // off their line.
    let (p0, p1) = (points[order[0]], points[order[1]]);
    let Some(k) = (2..order.len()).find(|&k| is_left(&p0, &p1, &points[order[k]]) != 0.0) else {
        return Vec::new();
    };
    let along = p1 - p0;
    order[..k].sort_by(|&i, &j| {
        along
            .dot(&(points[i] - p0))
            .total_cmp(&along.dot(&(points[j] - p0)))
    });
    let (base, top) = (&order[..k], order[k]);

    let mut sweep = Sweep::new(points);
    let left = is_left(&points[base[0]], &points[base[k - 1]], &points[top]) > 0.0;
    for pair in base.windows(2) {
        if left {
            sweep.push([pair[0], pair[1], top]);
        } else {
            sweep.push([pair[1], pair[0], top]);
        }
    }
    let ring: Vec<usize> = if left {
        base.iter().copied().chain([top]).collect()
    } else {
        [base[0], top]
            .into_iter()
            .chain(base[1..].iter().rev().copied())
            .collect()
    };
    sweep.link(&ring);

    let mut last = top;
    for &p in &order[k + 1..] {
        // A point that sees no front edge lies on the hull up to rounding.
        if sweep.attach(last, p) {
            last = p;
        }
    }

    let every_edge: Vec<(usize, usize)> = sweep
        .triangles
        .iter()
        .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
        .filter(|&(a, b)| a < b)
        .collect();
    sweep.legalize(every_edge);

    sweep
        .triangles
        .into_iter()
        .map(|[a, b, c]| Triangle::new(a, b, c))
        .collect()
}

/// Triangles under construction plus the counter-clockwise hull ("front")
/// of the points inserted so far.
struct Sweep<'a> {
    points: &'a [Point2<f64>],
    triangles: Vec<[usize; 3]>,
    /// Directed edge to the triangle holding it counter-clockwise.
    edges: FxHashMap<(usize, usize), usize>,
    next: Vec<usize>,
    prev: Vec<usize>,
    /// Rounding in `in_circle` can make a pair of quads flip back and forth.
    flips_left: usize,
}

impl<'a> Sweep<'a> {
    fn new(points: &'a [Point2<f64>]) -> Self {
        let n = points.len();
        Self {
            points,
            triangles: Vec::with_capacity(2 * n),
            edges: FxHashMap::default(),
            next: vec![OFF_FRONT; n],
            prev: vec![OFF_FRONT; n],
            flips_left: n.saturating_mul(n).max(64),
        }
    }

    fn push(&mut self, tri: [usize; 3]) {
        self.triangles.push(tri);
        self.index(self.triangles.len() - 1);
    }

    fn set(&mut self, t: usize, tri: [usize; 3]) {
        self.triangles[t] = tri;
        self.index(t);
    }

    fn index(&mut self, t: usize) {
        let [a, b, c] = self.triangles[t];
        for edge in [(a, b), (b, c), (c, a)] {
            self.edges.insert(edge, t);
        }
    }

    fn link(&mut self, ring: &[usize]) {
        for (k, &v) in ring.iter().enumerate() {
            let w = ring[(k + 1) % ring.len()];
            self.next[v] = w;
            self.prev[w] = v;
        }
    }

    /// Whether `p` lies strictly right of the front edge `u -> v`.
    fn sees(&self, u: usize, v: usize, p: usize) -> bool {
        is_left(&self.points[u], &self.points[v], &self.points[p]) < 0.0
    }

    /// Joins `p` to the run of front edges it sees, searching from `start`.
    /// Returns false when no edge is visible.
    fn attach(&mut self, start: usize, p: usize) -> bool {
        let mut u = start;
        while !self.sees(u, self.next[u], p) {
            u = self.next[u];
            if u == start {
                return false;
            }
        }

        let (mut first, mut last) = (u, self.next[u]);
        while self.prev[first] != last && self.sees(self.prev[first], first, p) {
            first = self.prev[first];
        }
        while self.next[last] != first && self.sees(last, self.next[last], p) {
            last = self.next[last];
        }

        let mut fresh: SmallVec<[(usize, usize); 8]> = SmallVec::new();
        let mut u = first;
        while u != last {
            let v = self.next[u];
            self.push([v, u, p]);
            fresh.push((v, u));
            if u != first {
                self.next[u] = OFF_FRONT;
                self.prev[u] = OFF_FRONT;
            }
            u = v;
        }
        self.next[first] = p;
        self.prev[p] = first;
        self.next[p] = last;
        self.prev[last] = p;

        self.legalize(fresh);
        true
    }

    /// Flips edges off `stack` whose opposite vertex falls inside the
    /// neighbouring circumcircle, re-checking the quad's outer edges after
    /// each flip. Hull edges have no twin and are skipped.
    fn legalize(&mut self, edges: impl IntoIterator<Item = (usize, usize)>) {
        let points = self.points;
        let mut stack: Vec<(usize, usize)> = edges.into_iter().collect();
        while let Some((a, b)) = stack.pop() {
            let (Some(&t1), Some(&t2)) = (self.edges.get(&(a, b)), self.edges.get(&(b, a))) else {
                continue;
            };
            let c = opposite(self.triangles[t1], a, b);
            let d = opposite(self.triangles[t2], a, b);
            let [pa, pb, pc, pd] = [a, b, c, d].map(|i| &points[i]);
            if in_circle(pa, pb, pc, pd) <= 0.0
                || is_left(pa, pd, pc) <= 0.0
                || is_left(pd, pb, pc) <= 0.0
                || self.flips_left == 0
            {
                continue;
            }
            self.flips_left -= 1;

            self.edges.remove(&(a, b));
            self.edges.remove(&(b, a));
            self.set(t1, [a, d, c]);
            self.set(t2, [d, b, c]);
            stack.extend([(a, d), (d, b), (b, c), (c, a)]);
        }
    }
}

/// The corner of `tri` that is neither `a` nor `b`.
fn opposite(tri: [usize; 3], a: usize, b: usize) -> usize {
    tri.into_iter().find(|&v| v != a && v != b).unwrap_or(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::convex_hull;
    use approx::assert_relative_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    fn total_area(points: &[Point2<f64>], triangles: &[Triangle]) -> f64 {
        triangles.iter().map(|t| t.signed_area(points)).sum()
    }

    fn assert_delaunay(points: &[Point2<f64>], triangles: &[Triangle]) {
        for t in triangles {
            let (a, b, c) = (&points[t.a], &points[t.b], &points[t.c]);
            assert!(t.signed_area(points) > 0.0, "{:?} is not counter-clockwise", t);
            for (i, q) in points.iter().enumerate() {
                if t.indices().contains(&i) {
                    continue;
                }
                assert!(
                    in_circle(a, b, c, q) <= 1e-9,
                    "point {} lies inside the circumcircle of {:?}",
                    i,
                    t
                );
            }
        }
    }

    #[test]
    fn in_circle_sign() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(2.0, 0.0);
        let c = Point2::new(0.0, 2.0);
        assert!(in_circle(&a, &b, &c, &Point2::new(1.0, 1.0)) > 0.0);
        assert!(in_circle(&a, &b, &c, &Point2::new(5.0, 5.0)) < 0.0);
        assert_eq!(in_circle(&a, &b, &c, &Point2::new(2.0, 2.0)), 0.0);
    }

    #[test]
    fn grid_covers_its_rectangle() {
        let points = pts(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (2.0, 1.0),
        ]);
        let triangles = triangulate(&points);
        assert_eq!(triangles.len(), 4);
        assert_relative_eq!(total_area(&points, &triangles), 2.0, epsilon = 1e-12);
        assert_delaunay(&points, &triangles);
    }

    #[test]
    fn scattered_points_form_a_delaunay_triangulation() {
        let points = pts(&[
            (0.0, 0.0),
            (4.0, 0.5),
            (5.0, 4.0),
            (1.0, 5.0),
            (2.0, 2.0),
            (3.5, 2.5),
            (-1.0, 3.0),
        ]);
        let triangles = triangulate(&points);
        // 7 points, 5 of them on the hull: 2n - 2 - h triangles.
        assert_eq!(triangles.len(), 2 * 7 - 2 - 5);
        assert_delaunay(&points, &triangles);
    }

    #[test]
    fn duplicates_use_first_occurrence() {
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        let triangles = triangulate(&points);
        assert_eq!(triangles.len(), 1);
        assert!(!triangles[0].indices().contains(&2));
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        assert!(triangulate(&[]).is_empty());
        assert!(triangulate(&pts(&[(0.0, 0.0), (1.0, 1.0)])).is_empty());
        assert!(triangulate(&pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)])).is_empty());
        assert!(triangulate(&pts(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)])).is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let points = pts(&[(0.0, 0.0), (3.0, 1.0), (1.0, 3.0), (2.0, 2.5), (0.5, 1.5)]);
        assert_eq!(triangulate(&points), triangulate(&points));
    }

    /// Deterministic LCG so the clouds are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        /// Uniform in `[0, 1)`.
        fn unit(&mut self) -> f64 {
            self.next() as f64 / (1u64 << 31) as f64
        }
    }

    fn hull_area(points: &[Point2<f64>]) -> f64 {
        let hull = convex_hull(points);
        let n = hull.len();
        (0..n)
            .map(|i| {
                let (p, q) = (&points[hull[i]], &points[hull[(i + 1) % n]]);
                p.x * q.y - q.x * p.y
            })
            .sum::<f64>()
            * 0.5
    }

    fn assert_covers_hull(points: &[Point2<f64>]) {
        let triangles = triangulate(points);
        for t in &triangles {
            assert!(t.signed_area(points) > 0.0, "{:?} is not counter-clockwise", t);
        }
        assert_relative_eq!(
            total_area(points, &triangles),
            hull_area(points),
            max_relative = 1e-9
        );
    }

    #[test]
    fn integer_clouds_cover_their_hull() {
        let mut rng = Lcg(0x2545_f491_4f6c_dd1d);
        for _ in 0..200 {
            let points: Vec<Point2<f64>> = (0..25)
                .map(|_| Point2::new((rng.next() % 21) as f64, (rng.next() % 21) as f64))
                .collect();
            let triangles = triangulate(&points);
            assert_delaunay(&points, &triangles);
            assert_covers_hull(&points);
        }
    }

    #[test]
    fn stretched_arcs_cover_their_hull() {
        // Jittered points on a half circle, then squashed or stretched along x:
        // long hull edges with wide circumcircles.
        let mut rng = Lcg(0x9e37_79b9_7f4a_7c15);
        for round in 0..1500 {
            let count = 4 + (rng.next() % 30) as usize;
            let aspect = if round % 2 == 0 {
                1.0
            } else {
                10f64.powf(4.0 * rng.unit())
            };
            let points: Vec<Point2<f64>> = (0..count)
                .map(|_| {
                    let angle = std::f64::consts::PI * rng.unit();
                    let r = 1.0 + 0.01 * rng.unit();
                    Point2::new(aspect * r * angle.cos(), r * angle.sin())
                })
                .collect();
            assert_covers_hull(&points);
        }
    }

    #[test]
    fn large_grid_triangulates_fully() {
        let side = 100;
        let points: Vec<Point2<f64>> = (0..side * side)
            .map(|k| Point2::new((k % side) as f64, (k / side) as f64))
            .collect();
        let triangles = triangulate(&points);
        let cells = (side - 1) * (side - 1);
        assert_eq!(triangles.len(), 2 * cells);
        assert_relative_eq!(total_area(&points, &triangles), cells as f64, epsilon = 1e-6);
    }
}
