//! Continent bookkeeping: per-plate segment descriptors and the scanline
//! flood fill that discovers them.
//!
//! A continent is a 4-connected region of cells whose crust reaches
//! [`CONT_BASE`]. Each plate keeps one [`SegmentData`] per continent it has
//! seen; the table is a cache, cleared wholesale and rebuilt lazily.

use smallvec::SmallVec;

use crate::fields::HeightMap;

/// Identifier of a continent within one plate's segment table.
pub type ContinentId = u32;

/// Sentinel marking a cell that belongs to no continent.
pub const INVALID_CONTINENT: ContinentId = ContinentId::MAX;

/// Minimum crust height for a cell to count as continental.
pub const CONT_BASE: f32 = 1.0;

/// Descriptor of one continent: local bounding box, area, collision count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentData {
    /// Leftmost local x of the bounding box, inclusive.
    pub x0: u32,
    /// Topmost local y of the bounding box, inclusive.
    pub y0: u32,
    /// Rightmost local x of the bounding box, inclusive.
    pub x1: u32,
    /// Bottommost local y of the bounding box, inclusive.
    pub y1: u32,
    /// Number of cells in the continent; 0 marks a tombstone.
    pub area: u32,
    /// Collisions recorded against this continent during its lifecycle.
    pub coll_count: u32,
}

impl SegmentData {
    /// A fresh descriptor whose box covers the single cell `(x, y)`.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x0: x, y0: y, x1: x, y1: y, area: 0, coll_count: 0 }
    }

    /// Grow the bounding box monotonically to include `(x, y)`.
    pub fn enlarge_to_contain(&mut self, x: u32, y: u32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    /// Translate the box when the owning raster grows leftward or upward.
    pub fn shift(&mut self, dx: u32, dy: u32) {
        self.x0 += dx;
        self.x1 += dx;
        self.y0 += dy;
        self.y1 += dy;
    }

    /// True when the continent has been aggregated away.
    pub fn is_empty(&self) -> bool {
        self.area == 0
    }

    /// True when the local cell lies inside the bounding box.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// Horizontal spans pending or completed on one raster row.
type SpanList = SmallVec<[(u32, u32); 2]>;

/// Identify the continent containing local cell `(x, y)`, flooding a new
/// segment when the cell belongs to none.
///
/// Scanline fill, 4-connected, over cells with height at least `CONT_BASE`.
/// `wrap_x`/`wrap_y` enable wrapping on an axis when the raster spans the
/// whole world on it. The origin cell is claimed unconditionally so that an
/// isolated (or sub-continental) cell still gets a one-cell segment.
pub(crate) fn create_segment(
    heights: &HeightMap,
    segments: &mut [ContinentId],
    table: &mut Vec<SegmentData>,
    wrap_x: bool,
    wrap_y: bool,
    x: u32,
    y: u32,
) -> ContinentId {
    let width = heights.width();
    let height = heights.height();
    let origin = (y * width + x) as usize;
    let id = table.len() as ContinentId;

    if segments[origin] < id {
        return segments[origin];
    }

    // The cell may sit right next to a continent discovered earlier; adopt
    // that segment instead of flooding a duplicate.
    if let Some(nbour) = adjacent_segment(heights, segments, id, x, y) {
        segments[origin] = nbour;
        let data = &mut table[nbour as usize];
        data.area += 1;
        data.enlarge_to_contain(x, y);
        return nbour;
    }

    let mut data = SegmentData::new(x, y);
    let mut todo: Vec<SpanList> = vec![SpanList::new(); height as usize];
    let mut done: Vec<SpanList> = vec![SpanList::new(); height as usize];

    segments[origin] = id;
    todo[y as usize].push((x, x));

    loop {
        let mut lines_processed = 0u32;
        for line in 0..height {
            let Some((span_start, span_end)) =
                next_span(&mut todo[line as usize], &done[line as usize])
            else {
                continue;
            };

            let row_above = if line > 0 { line - 1 } else { height - 1 };
            let row_below = if line < height - 1 { line + 1 } else { 0 };
            let line_here = (line * width) as usize;
            let line_above = (row_above * width) as usize;
            let line_below = (row_below * width) as usize;

            let mut start = span_start;
            let mut end = span_end;

            // Extend across qualifying cells to the left and right.
            while start > 0 {
                let i = line_here + start as usize - 1;
                if segments[i] <= id || heights[i] < CONT_BASE {
                    break;
                }
                start -= 1;
                segments[i] = id;
            }
            while end < width - 1 {
                let i = line_here + end as usize + 1;
                if segments[i] <= id || heights[i] < CONT_BASE {
                    break;
                }
                end += 1;
                segments[i] = id;
            }

            // Jump the seam when the raster spans the whole world on x.
            if wrap_x && start == 0 {
                let i = line_here + width as usize - 1;
                if segments[i] > id && heights[i] >= CONT_BASE {
                    segments[i] = id;
                    todo[line as usize].push((width - 1, width - 1));
                }
            }
            if wrap_x && end == width - 1 {
                let i = line_here;
                if segments[i] > id && heights[i] >= CONT_BASE {
                    segments[i] = id;
                    todo[line as usize].push((0, 0));
                }
            }

            data.area += 1 + end - start;
            if line < data.y0 {
                data.y0 = line;
            }
            if line > data.y1 {
                data.y1 = line;
            }
            if start < data.x0 {
                data.x0 = start;
            }
            if end > data.x1 {
                data.x1 = end;
            }

            if line > 0 || wrap_y {
                claim_runs(heights, segments, id, &mut todo[row_above as usize], line_above, start, end, width);
            }
            if line < height - 1 || wrap_y {
                claim_runs(heights, segments, id, &mut todo[row_below as usize], line_below, start, end, width);
            }

            done[line as usize].push((start, end));
            lines_processed += 1;
        }
        if lines_processed == 0 {
            break;
        }
    }

    table.push(data);
    id
}

/// Pop the next still-unscanned span off a row's worklist.
///
/// Completed spans on the row are subtracted first; a span that they swallow
/// entirely is dropped and the next one tried.
fn next_span(todo: &mut SpanList, done: &SpanList) -> Option<(u32, u32)> {
    while let Some((s, e)) = todo.pop() {
        let mut start = s as i64;
        let mut end = e as i64;
        for &(ds, de) in done.iter() {
            let (ds, de) = (ds as i64, de as i64);
            if start >= ds && start <= de {
                start = de + 1;
            }
            if end >= ds && end <= de {
                end = ds - 1;
            }
        }
        if start <= end {
            return Some((start as u32, end as u32));
        }
    }
    None
}

/// Claim every qualifying run of cells on a neighbouring row within
/// `[start, end]` and queue each run as a pending span there.
#[allow(clippy::too_many_arguments)]
fn claim_runs(
    heights: &HeightMap,
    segments: &mut [ContinentId],
    id: ContinentId,
    todo: &mut SpanList,
    row_base: usize,
    start: u32,
    end: u32,
    width: u32,
) {
    let mut j = start;
    while j <= end {
        let i = row_base + j as usize;
        if segments[i] > id && heights[i] >= CONT_BASE {
            let run_start = j;
            segments[i] = id;
            // Runs may continue past `end`, up to the row edge.
            while j + 1 < width {
                let k = row_base + j as usize + 1;
                if segments[k] <= id || heights[k] < CONT_BASE {
                    break;
                }
                j += 1;
                segments[k] = id;
            }
            todo.push((run_start, j));
        }
        j += 1;
    }
}

/// First 4-neighbour of `(x, y)` that already carries a segment, if any.
/// Neighbours qualify only when continental; raster edges do not wrap here.
fn adjacent_segment(
    heights: &HeightMap,
    segments: &[ContinentId],
    id: ContinentId,
    x: u32,
    y: u32,
) -> Option<ContinentId> {
    let width = heights.width();
    let height = heights.height();
    let origin = (y * width + x) as usize;
    let stride = width as usize;

    let mut candidates: SmallVec<[usize; 4]> = SmallVec::new();
    if x > 0 {
        candidates.push(origin - 1);
    }
    if x < width - 1 {
        candidates.push(origin + 1);
    }
    if y > 0 {
        candidates.push(origin - stride);
    }
    if y < height - 1 {
        candidates.push(origin + stride);
    }
    candidates
        .into_iter()
        .find(|&i| heights[i] >= CONT_BASE && segments[i] < id)
        .map(|i| segments[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32, cells: &[f32]) -> HeightMap {
        HeightMap::from_vec(width, height, cells.to_vec())
    }

    #[test]
    fn descriptor_box_and_tombstone() {
        let mut d = SegmentData::new(3, 4);
        assert!(d.is_empty());
        d.enlarge_to_contain(1, 6);
        d.enlarge_to_contain(5, 2);
        assert_eq!((d.x0, d.y0, d.x1, d.y1), (1, 2, 5, 6));
        assert!(d.contains(3, 4));
        assert!(!d.contains(0, 4));
        d.shift(2, 1);
        assert_eq!((d.x0, d.y0, d.x1, d.y1), (3, 3, 7, 7));
    }

    #[test]
    fn flood_fill_claims_a_plus_shape() {
        #[rustfmt::skip]
        let h = raster(4, 4, &[
            0.0, 2.0, 0.0, 0.0,
            2.0, 2.0, 2.0, 0.0,
            0.0, 2.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
        ]);
        let mut segments = vec![INVALID_CONTINENT; 16];
        let mut table = Vec::new();
        let id = create_segment(&h, &mut segments, &mut table, false, false, 1, 1);
        assert_eq!(id, 0);
        assert_eq!(table[0].area, 5);
        assert_eq!((table[0].x0, table[0].y0, table[0].x1, table[0].y1), (0, 0, 2, 2));
        for (i, &s) in segments.iter().enumerate() {
            if h[i] >= CONT_BASE {
                assert_eq!(s, id, "continental cell {i} unclaimed");
            } else {
                assert_eq!(s, INVALID_CONTINENT, "ocean cell {i} claimed");
            }
        }
    }

    #[test]
    fn flood_fill_is_idempotent() {
        let h = raster(3, 1, &[2.0, 2.0, 0.0]);
        let mut segments = vec![INVALID_CONTINENT; 3];
        let mut table = Vec::new();
        let a = create_segment(&h, &mut segments, &mut table, false, false, 0, 0);
        let b = create_segment(&h, &mut segments, &mut table, false, false, 0, 0);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].area, 2);
    }

    #[test]
    fn touching_cell_adopts_the_neighbouring_segment() {
        let h = raster(3, 1, &[2.0, 2.0, 2.0]);
        let mut segments = vec![INVALID_CONTINENT; 3];
        let mut table = Vec::new();
        let a = create_segment(&h, &mut segments, &mut table, false, false, 0, 0);
        // All three cells were flooded, so this exercises the early return;
        // un-claim the last one to force the adoption path.
        segments[2] = INVALID_CONTINENT;
        table[0].area -= 1;
        let b = create_segment(&h, &mut segments, &mut table, false, false, 2, 0);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].area, 3);
    }

    #[test]
    fn world_wide_row_wraps_across_the_seam() {
        let h = raster(4, 2, &[2.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
        let mut segments = vec![INVALID_CONTINENT; 8];
        let mut table = Vec::new();
        let id = create_segment(&h, &mut segments, &mut table, true, true, 0, 0);
        assert_eq!(table[id as usize].area, 2);
        assert_eq!(segments[0], id);
        assert_eq!(segments[3], id);
    }

    #[test]
    fn empty_origin_gets_a_one_cell_segment() {
        let h = raster(3, 3, &[0.0; 9]);
        let mut segments = vec![INVALID_CONTINENT; 9];
        let mut table = Vec::new();
        let id = create_segment(&h, &mut segments, &mut table, false, false, 1, 1);
        assert_eq!(table[id as usize].area, 1);
        assert_eq!(segments[4], id);
    }
}
