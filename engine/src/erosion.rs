//! Hydraulic erosion: river-flow lowering from the tops, then a single-pass
//! redistribution of crust toward lower neighbours.
//!
//! Both phases work on the 4-neighbourhood of a cell. A direction is valid
//! when the cell is not on that raster edge, or when the raster spans the
//! whole world on that axis and the edge wraps.

use rand::rngs::StdRng;
use rand::RngCore;

use crate::fields::HeightMap;

/// Share of the gap toward the lower bound that one river visit removes.
const FLOW_RATE: f32 = 0.2;

/// Mass and centroid of a raster rescanned after an erosion pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErodedState {
    /// Total crust mass.
    pub mass: f32,
    /// Mass-weighted centroid x, normalized when mass is positive.
    pub cx: f32,
    /// Mass-weighted centroid y, normalized when mass is positive.
    pub cy: f32,
}

/// One direction of a cell's 4-neighbourhood.
#[derive(Clone, Copy)]
struct Neighbour {
    /// Raster index; meaningful only when `valid`.
    index: usize,
    /// Whether the edge/wrap mask admits this direction.
    valid: bool,
}

/// West, east, north, south neighbours of `(x, y)`.
fn neighbourhood(
    width: usize,
    height: usize,
    wrap_x: bool,
    wrap_y: bool,
    x: usize,
    y: usize,
) -> [Neighbour; 4] {
    let wx = if x > 0 { x - 1 } else { width - 1 };
    let ex = if x < width - 1 { x + 1 } else { 0 };
    let ny = if y > 0 { y - 1 } else { height - 1 };
    let sy = if y < height - 1 { y + 1 } else { 0 };
    [
        Neighbour { index: y * width + wx, valid: x > 0 || wrap_x },
        Neighbour { index: y * width + ex, valid: x < width - 1 || wrap_x },
        Neighbour { index: ny * width + x, valid: y > 0 || wrap_y },
        Neighbour { index: sy * width + x, valid: y < height - 1 || wrap_y },
    ]
}

/// Heights of the strictly lower neighbours of `index`, in w/e/n/s order.
/// Invalid directions, equal-or-higher neighbours, and empty neighbours all
/// read as zero.
fn lower_crusts(
    heights: &HeightMap,
    wrap_x: bool,
    wrap_y: bool,
    x: usize,
    y: usize,
    index: usize,
) -> [f32; 4] {
    let nbs =
        neighbourhood(heights.width() as usize, heights.height() as usize, wrap_x, wrap_y, x, y);
    let mut crusts = [0.0f32; 4];
    for (k, nb) in nbs.iter().enumerate() {
        if nb.valid && heights[nb.index] < heights[index] {
            crusts[k] = heights[nb.index];
        }
    }
    crusts
}

/// Erode `heights` in place and return the rescanned mass and centroid.
///
/// Phase one seeds a river at every top (a cell at or above `lower_bound`
/// whose four neighbours all carry crust and sit strictly lower) and follows
/// the steepest descent, shaving [`FLOW_RATE`] of the gap above `lower_bound`
/// at each visited cell. Phase two roughens the result with up to ten percent
/// noise, then levels every cell at or above `lower_bound` into its lower
/// neighbours; that redistribution conserves mass cell-locally.
pub fn erode(
    heights: &mut HeightMap,
    wrap_x: bool,
    wrap_y: bool,
    lower_bound: f32,
    rng: &mut StdRng,
) -> ErodedState {
    let width = heights.width() as usize;
    let height = heights.height() as usize;
    let len = width * height;
    let mut tmp: Vec<f32> = heights.as_slice().to_vec();

    // Tops: river sources, where all four neighbours are lower and carrying
    // crust. Cells on an unwrapped edge never qualify.
    let mut sources: Vec<usize> = Vec::new();
    let mut sinks: Vec<usize> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let index = y * width + x;
            if heights[index] < lower_bound {
                continue;
            }
            let crusts = lower_crusts(heights, wrap_x, wrap_y, x, y, index);
            if crusts[0] * crusts[1] * crusts[2] * crusts[3] == 0.0 {
                continue;
            }
            sources.push(index);
        }
    }

    let mut visited = vec![false; len];
    while !sources.is_empty() {
        while let Some(index) = sources.pop() {
            let y = index / width;
            let x = index - y * width;
            if heights[index] < lower_bound {
                continue;
            }
            let mut crusts = lower_crusts(heights, wrap_x, wrap_y, x, y, index);
            if crusts.iter().sum::<f32>() == 0.0 {
                continue; // lowest spot of its neighbourhood, flow ends
            }
            // Missing directions read as the cell itself so they cannot win
            // the steepest-descent pick below.
            for c in &mut crusts {
                if *c == 0.0 {
                    *c = heights[index];
                }
            }
            let mut lowest = crusts[0];
            let mut dest = index as i64 - 1;
            if crusts[1] < lowest {
                lowest = crusts[1];
                dest = index as i64 + 1;
            }
            if crusts[2] < lowest {
                lowest = crusts[2];
                dest = index as i64 - width as i64;
            }
            if crusts[3] < lowest {
                dest = index as i64 + width as i64;
            }
            if dest >= 0 && (dest as usize) < len && !visited[dest as usize] {
                sinks.push(dest as usize);
                visited[dest as usize] = true;
            }
            tmp[index] -= (tmp[index] - lower_bound) * FLOW_RATE;
        }
        std::mem::swap(&mut sources, &mut sinks);
    }

    // Up to ten percent of roughening noise before the levelling pass.
    for t in tmp.iter_mut() {
        let alpha = 0.2 * (rng.next_u32() as f32 / u32::MAX as f32);
        *t += 0.1 * *t - alpha * *t;
    }
    heights.replace(tmp);

    let mut spread = vec![0.0f32; len];
    let mut state = ErodedState { mass: 0.0, cx: 0.0, cy: 0.0 };

    for y in 0..height {
        for x in 0..width {
            let index = y * width + x;
            let h = heights[index];
            state.mass += h;
            // Accumulate: neighbours processed earlier may have deposited
            // into this cell already.
            spread[index] += h;
            state.cx += x as f32 * h;
            state.cy += y as f32 * h;

            if h < lower_bound {
                continue;
            }

            let nbs = neighbourhood(width, height, wrap_x, wrap_y, x, y);
            let mut lower = [false; 4];
            let mut diffs = [0.0f32; 4];
            let mut count = 0u32;
            let mut min_diff = f32::MAX;
            for (k, nb) in nbs.iter().enumerate() {
                if nb.valid && heights[nb.index] < h {
                    lower[k] = true;
                    diffs[k] = h - heights[nb.index];
                    min_diff = min_diff.min(diffs[k]);
                    count += 1;
                }
            }
            if count == 0 {
                continue; // already the lowest spot around
            }

            let mut diff_sum = 0.0f32;
            for k in 0..4 {
                if lower[k] {
                    diff_sum += diffs[k] - min_diff;
                }
            }
            debug_assert!(diff_sum >= 0.0);

            if diff_sum < min_diff {
                // Not enough room below to level with the tallest lower
                // neighbour: equalize the whole neighbourhood instead.
                for k in 0..4 {
                    if lower[k] {
                        spread[nbs[k].index] += diffs[k] - min_diff;
                    }
                }
                spread[index] -= min_diff;
                let rem = (min_diff - diff_sum) / (1 + count) as f32;
                for k in 0..4 {
                    if lower[k] {
                        spread[nbs[k].index] += rem;
                    }
                }
                spread[index] += rem;
            } else {
                // Drop to the height of the tallest lower neighbour and
                // share the removed crust in proportion to each drop.
                let unit = min_diff / diff_sum;
                spread[index] -= min_diff;
                for k in 0..4 {
                    if lower[k] {
                        spread[nbs[k].index] += unit * (diffs[k] - min_diff);
                    }
                }
            }
        }
    }

    heights.replace(spread);

    if state.mass > 0.0 {
        state.cx /= state.mass;
        state.cy /= state.mass;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn total(heights: &HeightMap) -> f32 {
        heights.as_slice().iter().sum()
    }

    #[test]
    fn isolated_peak_spreads_onto_empty_neighbours() {
        #[rustfmt::skip]
        let mut h = HeightMap::from_vec(3, 3, vec![
            0.0, 0.0, 0.0,
            0.0, 10.0, 0.0,
            0.0, 0.0, 0.0,
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let state = erode(&mut h, false, false, 0.0, &mut rng);

        assert!(h.get(1, 1) < 10.0, "peak kept its crust: {}", h.get(1, 1));
        for &(x, y) in &[(1, 0), (0, 1), (2, 1), (1, 2)] {
            assert!(h.get(x, y) > 0.0, "neighbour ({x}, {y}) stayed empty");
        }
        // Corners are not 4-connected to the peak.
        assert_eq!(h.get(0, 0), 0.0);
        let sum = total(&h);
        assert!((state.mass - sum).abs() <= 1e-4 * sum.max(1.0));
        assert!((state.cx - 1.0).abs() < 1e-4);
        assert!((state.cy - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rivers_shave_an_interior_top() {
        // A 3x3 hill with crust everywhere, so the centre is a genuine top.
        #[rustfmt::skip]
        let mut h = HeightMap::from_vec(3, 3, vec![
            1.0, 2.0, 1.0,
            2.0, 8.0, 2.0,
            1.0, 2.0, 1.0,
        ]);
        let before_peak = h.get(1, 1);
        let mut rng = StdRng::seed_from_u64(11);
        let state = erode(&mut h, false, false, 1.0, &mut rng);

        assert!(h.get(1, 1) < before_peak);
        let sum = total(&h);
        assert!((state.mass - sum).abs() <= 1e-4 * sum.max(1.0));
        for &v in h.as_slice() {
            assert!(v >= 0.0);
        }
    }

    #[test]
    fn mass_bookkeeping_matches_the_raster() {
        let mut h = HeightMap::from_vec(4, 4, (0..16).map(|i| i as f32 * 0.5).collect());
        let mut rng = StdRng::seed_from_u64(3);
        let state = erode(&mut h, true, true, 1.0, &mut rng);
        let sum = total(&h);
        assert!((state.mass - sum).abs() <= 1e-4 * sum.max(1.0));
    }

    #[test]
    fn deterministic_under_a_fixed_seed() {
        let cells: Vec<f32> = (0..64).map(|i| ((i * 37) % 11) as f32).collect();
        let mut a = HeightMap::from_vec(8, 8, cells.clone());
        let mut b = HeightMap::from_vec(8, 8, cells);
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let sa = erode(&mut a, true, true, 2.0, &mut rng_a);
        let sb = erode(&mut b, true, true, 2.0, &mut rng_b);
        assert_eq!(a, b);
        assert_eq!(sa, sb);
    }

    #[test]
    fn edge_directions_respect_the_wrap_mask() {
        let nbs = neighbourhood(4, 4, false, true, 0, 0);
        assert!(!nbs[0].valid); // west edge, no x wrap
        assert!(nbs[1].valid);
        assert!(nbs[2].valid); // north wraps to the last row
        assert_eq!(nbs[2].index, 3 * 4);
        assert!(nbs[3].valid);
    }
}
