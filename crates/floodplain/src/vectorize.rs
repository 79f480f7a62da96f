//! Connected-region polygonization of a boolean raster mask.
//!
//! Each 4-connected group of `true` cells becomes one polygon whose edges
//! follow cell borders. Boundaries are traced as directed unit edges with the
//! region on the right-hand side in pixel space (row index growing
//! downwards). At a vertex where two regions touch diagonally the tracer
//! turns right, so the regions stay separate.

use std::collections::{HashMap, VecDeque};

use geo::{Coord, LineString, Orient, Polygon};
use geo::orient::Direction;
use surge_common::GeoTransform;

type Vertex = (i64, i64);

/// Directed unit edge along a cell border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn dir(&self) -> Vertex {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Polygonize `mask` (row-major, `width` x `height`) into geographic
/// polygons using `transform`. Exterior rings are counter-clockwise and
/// holes clockwise in the output coordinate system.
pub fn polygonize(
    mask: &[bool],
    width: usize,
    height: usize,
    transform: &GeoTransform,
) -> Vec<Polygon<f64>> {
    if mask.len() != width * height {
        return Vec::new();
    }

    label_components(mask, width, height)
        .into_iter()
        .filter_map(|cells| component_polygon(&cells, mask, width, height, transform))
        .collect()
}

/// 4-connected component labelling; returns the cells of each component.
fn label_components(mask: &[bool], width: usize, height: usize) -> Vec<Vec<(usize, usize)>> {
    let mut seen = vec![false; mask.len()];
    let mut components = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        let mut cells = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(idx) = queue.pop_front() {
            let (col, row) = (idx % width, idx / width);
            cells.push((col, row));

            let mut visit = |c: usize, r: usize| {
                let n = r * width + c;
                if mask[n] && !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            };
            if col > 0 {
                visit(col - 1, row);
            }
            if col + 1 < width {
                visit(col + 1, row);
            }
            if row > 0 {
                visit(col, row - 1);
            }
            if row + 1 < height {
                visit(col, row + 1);
            }
        }
        components.push(cells);
    }

    components
}

fn component_polygon(
    cells: &[(usize, usize)],
    mask: &[bool],
    width: usize,
    height: usize,
    transform: &GeoTransform,
) -> Option<Polygon<f64>> {
    let inside = |c: i64, r: i64| -> bool {
        c >= 0
            && r >= 0
            && (c as usize) < width
            && (r as usize) < height
            && mask[r as usize * width + c as usize]
    };

    let mut edges = Vec::new();
    for &(col, row) in cells {
        let (c, r) = (col as i64, row as i64);
        if !inside(c, r - 1) {
            edges.push(Edge { from: (c, r), to: (c + 1, r) });
        }
        if !inside(c + 1, r) {
            edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1) });
        }
        if !inside(c, r + 1) {
            edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1) });
        }
        if !inside(c - 1, r) {
            edges.push(Edge { from: (c, r + 1), to: (c, r) });
        }
    }

    let mut rings: Vec<(f64, Vec<Vertex>)> = trace_rings(&edges)
        .into_iter()
        .map(|ring| (signed_area(&ring), ring))
        .collect();
    rings.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut iter = rings.into_iter();
    let (exterior_area, exterior) = iter.next()?;
    if exterior_area <= 0.0 {
        return None;
    }
    let holes: Vec<LineString<f64>> = iter
        .filter(|(area, _)| *area < 0.0)
        .map(|(_, ring)| to_geo_ring(&ring, transform))
        .collect();

    let polygon = Polygon::new(to_geo_ring(&exterior, transform), holes);
    Some(polygon.orient(Direction::Default))
}

/// Chain directed edges into closed rings of corner vertices.
fn trace_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].from];
        let mut current = start;

        loop {
            let here = edges[current].to;
            let dir = edges[current].dir();
            let candidates: Vec<usize> = outgoing
                .get(&here)
                .map(|v| {
                    v.iter()
                        .copied()
                        .filter(|&i| !used[i] || i == start)
                        .collect()
                })
                .unwrap_or_default();

            let next = match pick_next(edges, &candidates, dir) {
                Some(n) => n,
                None => break,
            };
            if next == start {
                break;
            }
            used[next] = true;
            ring.push(edges[next].from);
            current = next;
        }

        let ring = simplify_collinear(ring);
        if ring.len() >= 3 {
            rings.push(ring);
        }
    }

    rings
}

/// Right turn first, then straight on, then left.
fn pick_next(edges: &[Edge], candidates: &[usize], dir: Vertex) -> Option<usize> {
    let right = (-dir.1, dir.0);
    let left = (dir.1, -dir.0);
    [right, dir, left]
        .into_iter()
        .find_map(|want| candidates.iter().copied().find(|&i| edges[i].dir() == want))
}

/// Drop vertices lying on a straight run between their neighbours.
fn simplify_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 3 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let d1 = (cur.0 - prev.0, cur.1 - prev.1);
            let d2 = (next.0 - cur.0, next.1 - cur.1);
            d1.0 * d2.1 - d1.1 * d2.0 != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Shoelace area in pixel space; positive for region boundaries, negative
/// for holes.
fn signed_area(ring: &[Vertex]) -> f64 {
    let n = ring.len();
    let twice: i64 = (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    twice as f64 / 2.0
}

fn to_geo_ring(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(c, r)| {
            let (x, y) = transform.pixel_to_geo(c as f64, r as f64);
            Coord { x, y }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn unit() -> GeoTransform {
        GeoTransform::new(0.0, 0.0, 1.0, -1.0)
    }

    fn mask(rows: &[&str]) -> (Vec<bool>, usize, usize) {
        let width = rows[0].len();
        let cells = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        (cells, width, rows.len())
    }

    #[test]
    fn test_single_cell() {
        let (m, w, h) = mask(&["...", ".#.", "..."]);
        let polys = polygonize(&m, w, h, &unit());
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].unsigned_area(), 1.0);
        assert_eq!(polys[0].exterior().0.len(), 5);
    }

    #[test]
    fn test_exterior_is_counter_clockwise() {
        let (m, w, h) = mask(&["##", "##"]);
        let polys = polygonize(&m, w, h, &unit());
        assert!(polys[0].signed_area() > 0.0);
    }

    #[test]
    fn test_l_shape_simplified() {
        let (m, w, h) = mask(&["#..", "#..", "###"]);
        let polys = polygonize(&m, w, h, &unit());
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].unsigned_area(), 5.0);
        // six corners plus the closing point
        assert_eq!(polys[0].exterior().0.len(), 7);
    }

    #[test]
    fn test_hole() {
        let (m, w, h) = mask(&["###", "#.#", "###"]);
        let polys = polygonize(&m, w, h, &unit());
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].interiors().len(), 1);
        assert_eq!(polys[0].unsigned_area(), 8.0);
    }

    #[test]
    fn test_diagonal_cells_are_separate() {
        let (m, w, h) = mask(&["#.", ".#"]);
        let polys = polygonize(&m, w, h, &unit());
        assert_eq!(polys.len(), 2);
        assert!(polys.iter().all(|p| p.unsigned_area() == 1.0));
    }

    #[test]
    fn test_empty_and_mismatched() {
        let (m, w, h) = mask(&["...", "..."]);
        assert!(polygonize(&m, w, h, &unit()).is_empty());
        assert!(polygonize(&[true], 2, 2, &unit()).is_empty());
    }
}
