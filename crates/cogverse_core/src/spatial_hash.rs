use cogverse_data::Vec2;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[derive(Clone, Debug, Default)]
/// Uniform grid index over a slice of positions.
///
/// Implements a grid-based spatial hash using offset-indexed entry lists
/// (the "compressed sparse rows" layout): `cell_offsets[i]..cell_offsets[i+1]`
/// selects the entries stored in cell `i`. Entries are written in slice order,
/// so for a given input every query visits candidates in the same order.
///
/// Cells are stretched so that a whole number of them tiles each axis; every
/// cell is at least `cell_size` wide. When `wrap` is set the grid is a torus:
/// queries near an edge continue on the opposite edge and distances use the
/// shortest wrapped offset.
///
/// # Examples
/// ```
/// use cogverse_core::spatial_hash::SpatialHash;
/// use cogverse_data::Vec2;
///
/// let mut spatial = SpatialHash::new(10.0, 100.0, 100.0, true);
/// spatial.build_parallel(&[Vec2::new(1.0, 50.0), Vec2::new(99.0, 50.0)]);
///
/// let mut nearby = Vec::new();
/// spatial.query_into(Vec2::new(0.5, 50.0), 3.0, &mut nearby);
/// assert_eq!(nearby, vec![0, 1]);
/// ```
pub struct SpatialHash {
    pub cell_width: f64,
    pub cell_height: f64,
    pub width: f64,
    pub height: f64,
    pub cols: usize,
    pub rows: usize,
    pub wrap: bool,
    pub cell_offsets: Vec<usize>,
    pub entry_indices: Vec<usize>,
    positions: Vec<Vec2>,
}

impl SpatialHash {
    /// Creates an empty spatial hash.
    ///
    /// # Parameters
    /// - `cell_size`: Minimum width/height of each grid cell in world units
    /// - `width`, `height`: World dimensions in world units
    /// - `wrap`: Whether queries wrap around the world edges
    pub fn new(cell_size: f64, width: f64, height: f64, wrap: bool) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        let cols = ((width / cell_size).floor() as usize).max(1);
        let rows = ((height / cell_size).floor() as usize).max(1);
        Self {
            cell_width: width / cols as f64,
            cell_height: height / rows as f64,
            width,
            height,
            cols,
            rows,
            wrap,
            cell_offsets: vec![0; cols * rows + 1],
            entry_indices: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Computes the cell index for a world coordinate.
    ///
    /// Coordinates on the far edge (`x == width`) fall into the last cell.
    /// Non-finite or out-of-bounds coordinates return `None`.
    #[inline]
    pub fn get_cell_idx(&self, x: f64, y: f64) -> Option<usize> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        if x < 0.0 || y < 0.0 || x > self.width || y > self.height {
            return None;
        }
        let cx = ((x / self.cell_width) as usize).min(self.cols - 1);
        let cy = ((y / self.cell_height) as usize).min(self.rows - 1);
        Some(cy * self.cols + cx)
    }

    /// Rebuilds the index over `positions`. Entry `i` refers to `positions[i]`.
    pub fn build_parallel(&mut self, positions: &[Vec2]) {
        let cell_count = self.cols * self.rows;

        let atomic_counts: Vec<AtomicUsize> =
            (0..cell_count).map(|_| AtomicUsize::new(0)).collect();
        positions.par_iter().for_each(|p| {
            if let Some(idx) = self.get_cell_idx(p.x, p.y) {
                atomic_counts[idx].fetch_add(1, AtomicOrdering::Relaxed);
            }
        });
        let counts: Vec<usize> = atomic_counts.into_iter().map(|a| a.into_inner()).collect();

        self.cell_offsets.resize(cell_count + 1, 0);
        let mut total = 0;
        for (i, &count) in counts.iter().enumerate() {
            self.cell_offsets[i] = total;
            total += count;
        }
        self.cell_offsets[cell_count] = total;

        self.entry_indices.clear();
        self.entry_indices.resize(total, 0);
        let mut cursor = self.cell_offsets[..cell_count].to_vec();
        for (entry, p) in positions.iter().enumerate() {
            if let Some(cell) = self.get_cell_idx(p.x, p.y) {
                self.entry_indices[cursor[cell]] = entry;
                cursor[cell] += 1;
            }
        }

        self.positions.clear();
        self.positions.extend_from_slice(positions);
    }

    /// Offset from `from` to `to`, taking the short way around a torus.
    #[inline]
    pub fn delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        let mut d = to - from;
        if self.wrap {
            d.x -= self.width * (d.x / self.width).round();
            d.y -= self.height * (d.y / self.height).round();
        }
        d
    }

    fn cell_span(&self, lo: f64, hi: f64, cell: f64, count: usize) -> Vec<usize> {
        let min_c = (lo / cell).floor() as i64;
        let max_c = (hi / cell).floor() as i64;
        if self.wrap {
            if max_c - min_c + 1 >= count as i64 {
                return (0..count).collect();
            }
            (min_c..=max_c)
                .map(|c| c.rem_euclid(count as i64) as usize)
                .collect()
        } else {
            let last = count as i64 - 1;
            let from = min_c.clamp(0, last);
            let to = max_c.clamp(0, last);
            (from..=to).map(|c| c as usize).collect()
        }
    }

    /// Visits every entry within `radius` of `center`.
    pub fn query_callback<F>(&self, center: Vec2, radius: f64, mut callback: F)
    where
        F: FnMut(usize),
    {
        if self.positions.is_empty() || !center.is_finite() || !(radius >= 0.0) {
            return;
        }
        let r_sq = radius * radius;
        let xs = self.cell_span(
            center.x - radius,
            center.x + radius,
            self.cell_width,
            self.cols,
        );
        let ys = self.cell_span(
            center.y - radius,
            center.y + radius,
            self.cell_height,
            self.rows,
        );

        for &cy in &ys {
            for &cx in &xs {
                let cell_idx = cy * self.cols + cx;
                let start = self.cell_offsets[cell_idx];
                let end = self.cell_offsets[cell_idx + 1];
                for &entry in &self.entry_indices[start..end] {
                    if self.delta(center, self.positions[entry]).length_squared() <= r_sq {
                        callback(entry);
                    }
                }
            }
        }
    }

    /// Collects every entry within `radius` of `center`, in ascending order.
    #[inline]
    pub fn query_into(&self, center: Vec2, radius: f64, result: &mut Vec<usize>) {
        result.clear();
        self.query_callback(center, radius, |entry| result.push(entry));
        result.sort_unstable();
        result.dedup();
    }

    pub fn count_nearby(&self, center: Vec2, radius: f64) -> usize {
        let mut count = 0;
        self.query_callback(center, radius, |_| count += 1);
        count
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_spatial_hash_query_finds_nearby() {
        let mut sh = SpatialHash::new(5.0, 20.0, 20.0, false);
        sh.build_parallel(&[
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(10.0, 10.0),
        ]);

        let mut found = Vec::new();
        sh.query_into(Vec2::new(1.5, 1.5), 2.0, &mut found);
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_spatial_hash_filters_by_distance_not_cell() {
        let mut sh = SpatialHash::new(10.0, 20.0, 20.0, false);
        sh.build_parallel(&[Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0)]);
        assert_eq!(sh.count_nearby(Vec2::new(1.0, 1.0), 2.0), 1);
    }

    #[test]
    fn test_spatial_hash_wraps_across_edges() {
        let mut sh = SpatialHash::new(5.0, 20.0, 20.0, true);
        sh.build_parallel(&[Vec2::new(19.5, 10.0), Vec2::new(10.0, 0.2)]);

        let mut found = Vec::new();
        sh.query_into(Vec2::new(0.5, 10.0), 1.5, &mut found);
        assert_eq!(found, vec![0]);

        sh.query_into(Vec2::new(10.0, 19.9), 1.0, &mut found);
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_seam_is_found_when_cell_size_does_not_divide_the_world() {
        let mut sh = SpatialHash::new(3.0, 100.0, 100.0, true);
        assert_eq!(sh.cols, 33);
        sh.build_parallel(&[Vec2::new(98.0, 50.0), Vec2::new(50.0, 99.5)]);

        let mut found = Vec::new();
        sh.query_into(Vec2::new(0.5, 50.0), 3.0, &mut found);
        assert_eq!(found, vec![0]);

        sh.query_into(Vec2::new(50.0, 1.0), 2.0, &mut found);
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_stretched_cells_cover_every_coordinate() {
        let mut sh = SpatialHash::new(0.75, 10.0, 10.0, true);
        let positions: Vec<Vec2> = (0..40)
            .map(|i| Vec2::new(f64::from(i) * 0.25, 9.95 - f64::from(i) * 0.245))
            .collect();
        sh.build_parallel(&positions);
        for (i, p) in positions.iter().enumerate() {
            let mut found = Vec::new();
            sh.query_into(*p, 0.0, &mut found);
            assert!(found.contains(&i), "entry {i} at {p:?} not found");
        }
        let wrapped = Vec2::new(9.9, 0.1);
        let expected = positions
            .iter()
            .filter(|p| sh.delta(wrapped, **p).length() <= 0.75)
            .count();
        assert_eq!(sh.count_nearby(wrapped, 0.75), expected);
    }

    #[test]
    fn test_spatial_hash_no_wrap_without_torus() {
        let mut sh = SpatialHash::new(5.0, 20.0, 20.0, false);
        sh.build_parallel(&[Vec2::new(19.5, 10.0)]);
        assert_eq!(sh.count_nearby(Vec2::new(0.5, 10.0), 1.5), 0);
    }

    #[test]
    fn test_large_radius_does_not_duplicate_on_torus() {
        let mut sh = SpatialHash::new(5.0, 20.0, 20.0, true);
        sh.build_parallel(&[Vec2::new(3.0, 3.0), Vec2::new(17.0, 17.0)]);
        let mut found = Vec::new();
        sh.query_into(Vec2::new(10.0, 10.0), 100.0, &mut found);
        assert_eq!(found, vec![0, 1]);
        assert_eq!(sh.count_nearby(Vec2::new(10.0, 10.0), 100.0), 2);
    }

    #[test]
    fn test_far_edge_coordinate_is_indexed() {
        let sh = SpatialHash::new(5.0, 20.0, 20.0, false);
        assert_eq!(sh.get_cell_idx(20.0, 20.0), Some(15));
        assert_eq!(sh.get_cell_idx(-0.1, 3.0), None);
        assert_eq!(sh.get_cell_idx(f64::NAN, 3.0), None);
    }

    #[test]
    fn test_rebuild_clears_previous_entries() {
        let mut sh = SpatialHash::new(5.0, 20.0, 20.0, false);
        sh.build_parallel(&[Vec2::new(1.0, 1.0)]);
        sh.build_parallel(&[]);
        assert_eq!(sh.count_nearby(Vec2::new(1.0, 1.0), 10.0), 0);
        assert!(sh.is_empty());
    }
}
