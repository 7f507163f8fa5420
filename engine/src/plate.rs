//! A single lithospheric plate: local crust and age rasters, kinematic
//! state, and the crust-exchange operations driven by the world stepper.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::erosion;
use crate::fields::{AgeMap, HeightMap};
use crate::grid::{WorldDimension, WorldRect};
use crate::segment::{self, ContinentId, SegmentData, INVALID_CONTINENT};

/// Initial scalar speed of every plate, cells per step.
const INITIAL_SPEED: f32 = 1.0;
/// Weight converting deformed crust mass into lost velocity.
const DEFORMATION_WEIGHT: f32 = 2.0;
/// Raster growth quantum per side, in cells.
const GROWTH_QUANTUM: i64 = 8;

/// Errors surfaced by plate construction and crust placement.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlateError {
    /// The initial height buffer length does not match width x height.
    #[error("height buffer holds {0} cells, expected {1}")]
    HeightmapSize(usize, usize),
    /// Plate dimensions must be positive.
    #[error("plate dimensions must be positive, got {0}x{1}")]
    BadDimensions(u32, u32),
    /// A crust write outside the raster found no legal growth direction.
    #[error("no direction to grow the raster toward ({0}, {1})")]
    NoGrowthDirection(u32, u32),
}

/// A rigid plate drifting over the toroidal world.
///
/// The plate owns a local height/age raster covering the torus wedge
/// `[left, left + width) x [top, top + height)`. The raster only grows,
/// in multiples of [`GROWTH_QUANTUM`] cells per side.
pub struct Plate {
    rng: StdRng,
    world: WorldDimension,
    width: u32,
    height: u32,
    // World coordinates of the raster origin; fractional while drifting.
    left: f32,
    top: f32,
    mass: f32,
    // Mass-weighted centroid in plate-local coordinates.
    cx: f32,
    cy: f32,
    // Unit direction of travel and scalar speed.
    vx: f32,
    vy: f32,
    velocity: f32,
    // Pending impulse, integrated on the next step.
    dx: f32,
    dy: f32,
    // Sense of the circular drift component, +1 or -1.
    rot_dir: f32,
    map: HeightMap,
    age_map: AgeMap,
    segments: Vec<ContinentId>,
    seg_data: Vec<SegmentData>,
}

impl Plate {
    /// Create a plate from an initial crust patch.
    ///
    /// `heights` is a row-major `width x height` buffer of crust thickness
    /// whose origin lands at world `(x, y)`. Cells carrying crust start at
    /// age `plate_age`; empty cells stay at age 0. The drift direction is
    /// drawn uniformly from the seeded generator and the initial speed is
    /// [`INITIAL_SPEED`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: u64,
        heights: &[f32],
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        plate_age: u32,
        world: WorldDimension,
    ) -> Result<Self, PlateError> {
        if width == 0 || height == 0 {
            return Err(PlateError::BadDimensions(width, height));
        }
        let cells = (width as usize) * (height as usize);
        if heights.len() != cells {
            return Err(PlateError::HeightmapSize(heights.len(), cells));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let angle = 2.0 * std::f32::consts::PI * (rng.next_u32() as f32 / u32::MAX as f32);
        let rot_dir = if rng.next_u32() & 1 == 1 { 1.0 } else { -1.0 };

        let mut plate = Self {
            rng,
            world,
            width,
            height,
            left: x as f32,
            top: y as f32,
            mass: 0.0,
            cx: 0.0,
            cy: 0.0,
            vx: angle.cos() * INITIAL_SPEED,
            vy: angle.sin() * INITIAL_SPEED,
            velocity: 1.0,
            dx: 0.0,
            dy: 0.0,
            rot_dir,
            map: HeightMap::from_vec(width, height, heights.to_vec()),
            age_map: AgeMap::new(width, height),
            segments: vec![INVALID_CONTINENT; cells],
            seg_data: Vec::new(),
        };

        // TODO: date pre-existing oceanic crust by simulated drift instead
        // of one shared age for the whole patch.
        let mut k = 0usize;
        for yy in 0..height {
            for xx in 0..width {
                let h = plate.map[k];
                plate.mass += h;
                plate.cx += xx as f32 * h;
                plate.cy += yy as f32 * h;
                if h > 0.0 {
                    plate.age_map[k] = plate_age;
                }
                k += 1;
            }
        }
        if plate.mass > 0.0 {
            plate.cx /= plate.mass;
            plate.cy /= plate.mass;
        }
        Ok(plate)
    }

    /// Total crust mass.
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Linear momentum magnitude, mass times speed.
    pub fn momentum(&self) -> f32 {
        self.mass * self.velocity
    }

    /// Scalar speed in cells per step.
    pub fn speed(&self) -> f32 {
        self.velocity
    }

    /// X component of the unit direction of travel.
    pub fn velocity_x(&self) -> f32 {
        self.vx
    }

    /// Y component of the unit direction of travel.
    pub fn velocity_y(&self) -> f32 {
        self.vy
    }

    /// Raster width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Integer world x of the raster origin.
    pub fn left(&self) -> u32 {
        self.left as u32
    }

    /// Integer world y of the raster origin.
    pub fn top(&self) -> u32 {
        self.top as u32
    }

    /// True when every bit of crust has been transferred away.
    pub fn is_empty(&self) -> bool {
        self.mass <= 0.0
    }

    fn world_rect(&self) -> WorldRect {
        WorldRect::new(self.world, self.left as u32, self.top as u32, self.width, self.height)
    }

    fn map_index(&self, x: u32, y: u32) -> Option<(u32, u32, usize)> {
        self.world_rect().map_index(x, y)
    }

    fn wraps_x(&self) -> bool {
        self.width == self.world.width
    }

    fn wraps_y(&self) -> bool {
        self.height == self.world.height
    }

    /// True when the world coordinate falls inside the plate's raster.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.map_index(x, y).is_some()
    }

    /// Crust height at a world coordinate, or 0 outside the raster.
    pub fn crust_at(&self, x: u32, y: u32) -> f32 {
        self.map_index(x, y).map_or(0.0, |(_, _, i)| self.map[i])
    }

    /// Crust age at a world coordinate, or 0 outside the raster.
    pub fn timestamp_at(&self, x: u32, y: u32) -> u32 {
        self.map_index(x, y).map_or(0, |(_, _, i)| self.age_map[i])
    }

    /// Borrow the height and age rasters.
    pub fn rasters(&self) -> (&HeightMap, &AgeMap) {
        (&self.map, &self.age_map)
    }

    /// Place `z` crust of age `t` at world `(x, y)`.
    ///
    /// Negative `z` is clamped to zero. A write outside the raster grows it
    /// toward the target in multiples of [`GROWTH_QUANTUM`] cells per side,
    /// never beyond the world. When crust already exists the cell's age
    /// becomes the mass-weighted blend of the old and supplied ages.
    pub fn set_crust(&mut self, x: u32, y: u32, z: f32, t: u32) -> Result<(), PlateError> {
        let z = z.max(0.0);

        let index = match self.map_index(x, y) {
            Some((_, _, i)) => i,
            None if z <= 0.0 => return Ok(()), // nothing to place, nowhere to grow for
            None => self.grow_to_include(x, y)?,
        };

        let old_h = self.map[index];
        if z > 0.0 {
            let age = if old_h > 0.0 {
                ((old_h * self.age_map[index] as f32 + z * t as f32) / (old_h + z)) as u32
            } else {
                t
            };
            self.age_map[index] = age;
        }

        self.mass -= old_h;
        self.map[index] = z;
        self.mass += z;
        Ok(())
    }

    /// Grow the raster so that world `(x, y)` falls inside it and return the
    /// raster index of that cell.
    fn grow_to_include(&mut self, x: u32, y: u32) -> Result<usize, PlateError> {
        let ww = self.world.width as i64;
        let wh = self.world.height as i64;
        // Same truncation as indexing uses.
        let ilft = self.left as i64;
        let itop = self.top as i64;
        let irgt = ilft + self.width as i64 - 1;
        let ibtm = itop + self.height as i64 - 1;
        let xn = self.world.wrap_x(x) as i64;
        let yn = self.world.wrap_y(y) as i64;

        // Distance from each plate edge to the point. Left/top measure
        // without wrapping; right/bottom wrap a full period when the point
        // sits on the low side of the raster. Negative distances mean the
        // point approaches from the other side.
        let big = i64::MAX;
        let lft = if ilft - xn >= 0 { ilft - xn } else { big };
        let rgt = {
            let d = if xn < ilft { ww + xn - irgt } else { xn - irgt };
            if d >= 0 {
                d
            } else {
                big
            }
        };
        let top = if itop - yn >= 0 { itop - yn } else { big };
        let btm = {
            let d = if yn < itop { wh + yn - ibtm } else { yn - ibtm };
            if d >= 0 {
                d
            } else {
                big
            }
        };

        // Keep the shorter valid distance per axis; a distance reaching a
        // full world side is no distance at all.
        let d_lft = if lft < rgt && lft < ww { lft } else { 0 };
        let d_rgt = if rgt <= lft && rgt < ww { rgt } else { 0 };
        let d_top = if top < btm && top < wh { top } else { 0 };
        let d_btm = if btm <= top && btm < wh { btm } else { 0 };

        fn quantize(d: i64) -> i64 {
            if d > 0 {
                (d / GROWTH_QUANTUM + 1) * GROWTH_QUANTUM
            } else {
                0
            }
        }
        let mut d_lft = quantize(d_lft);
        let mut d_rgt = quantize(d_rgt);
        let mut d_top = quantize(d_top);
        let mut d_btm = quantize(d_btm);

        // Never outgrow the world.
        if self.width as i64 + d_lft + d_rgt > ww {
            d_lft = 0;
            d_rgt = ww - self.width as i64;
        }
        if self.height as i64 + d_top + d_btm > wh {
            d_top = 0;
            d_btm = wh - self.height as i64;
        }
        if d_lft + d_rgt + d_top + d_btm == 0 {
            return Err(PlateError::NoGrowthDirection(x, y));
        }

        let old_width = self.width as usize;
        let old_height = self.height as usize;
        let new_width = (self.width as i64 + d_lft + d_rgt) as u32;
        let new_height = (self.height as i64 + d_top + d_btm) as u32;

        self.left -= d_lft as f32;
        if self.left < 0.0 {
            self.left += self.world.width as f32;
        }
        self.top -= d_top as f32;
        if self.top < 0.0 {
            self.top += self.world.height as f32;
        }
        self.width = new_width;
        self.height = new_height;

        tracing::debug!(
            width = new_width,
            height = new_height,
            left = self.left,
            top = self.top,
            "raster grown"
        );

        let mut map = HeightMap::new(new_width, new_height);
        let mut age_map = AgeMap::new(new_width, new_height);
        let mut segments =
            vec![INVALID_CONTINENT; (new_width as usize) * (new_height as usize)];

        for j in 0..old_height {
            let dst = (d_top as usize + j) * new_width as usize + d_lft as usize;
            let src = j * old_width;
            map.as_mut_slice()[dst..dst + old_width]
                .copy_from_slice(&self.map.as_slice()[src..src + old_width]);
            age_map.as_mut_slice()[dst..dst + old_width]
                .copy_from_slice(&self.age_map.as_slice()[src..src + old_width]);
            segments[dst..dst + old_width].copy_from_slice(&self.segments[src..src + old_width]);
        }
        self.map = map;
        self.age_map = age_map;
        self.segments = segments;

        for seg in &mut self.seg_data {
            seg.shift(d_lft as u32, d_top as u32);
        }

        match self.map_index(x, y) {
            Some((_, _, i)) => Ok(i),
            None => Err(PlateError::NoGrowthDirection(x, y)),
        }
    }

    /// Continent id of the cell at world `(wx, wy)`, segmenting lazily.
    fn continent_at(&mut self, wx: u32, wy: u32) -> ContinentId {
        let Some((lx, ly, index)) = self.map_index(wx, wy) else {
            debug_assert!(false, "continent lookup outside plate at ({wx}, {wy})");
            return INVALID_CONTINENT;
        };
        let seg = self.segments[index];
        if (seg as usize) < self.seg_data.len() {
            return seg;
        }
        segment::create_segment(
            &self.map,
            &mut self.segments,
            &mut self.seg_data,
            self.width == self.world.width,
            self.height == self.world.height,
            lx,
            ly,
        )
    }

    /// Record a collision against the continent at world `(wx, wy)` and
    /// return that continent's area.
    pub fn add_collision(&mut self, wx: u32, wy: u32) -> u32 {
        let seg = self.continent_at(wx, wy);
        let data = &mut self.seg_data[seg as usize];
        data.coll_count += 1;
        data.area
    }

    /// Receive crust at world `(x, y)` and attach the cell to continent
    /// `active` on this plate. Used while another plate's continent is
    /// aggregated onto this one.
    pub fn add_crust_by_collision(
        &mut self,
        x: u32,
        y: u32,
        z: f32,
        t: u32,
        active: ContinentId,
    ) -> Result<(), PlateError> {
        self.set_crust(x, y, self.crust_at(x, y) + z, t)?;

        let Some((lx, ly, index)) = self.map_index(x, y) else {
            return Ok(()); // nothing was placed
        };
        self.segments[index] = active;
        let data = &mut self.seg_data[active as usize];
        data.area += 1;
        data.enlarge_to_contain(lx, ly);
        Ok(())
    }

    /// Deposit subducted crust inland of world `(x, y)`.
    ///
    /// The deposit slides away from the relative motion `(dx, dy)` of the
    /// subducting plate, jittered by a cubed-uniform offset. It lands only
    /// where crust already exists; a target outside the local raster is
    /// dropped. The receiving cell's age becomes the mass-weighted blend.
    pub fn add_crust_by_subduction(&mut self, x: u32, y: u32, z: f32, t: u32, dx: f32, dy: f32) {
        let Some((lx, ly, _)) = self.map_index(x, y) else {
            debug_assert!(false, "subduction point outside plate at ({x}, {y})");
            return;
        };

        // Keep only the part of the relative motion that runs against this
        // plate's own drift, so deposits head inland rather than back to
        // the trench.
        let (mut dx, mut dy) = (dx, dy);
        if self.vx * dx + self.vy * dy > 0.0 {
            dx -= self.vx;
            dy -= self.vy;
        }

        let r = self.rng.next_u32() as f32 / u32::MAX as f32;
        let sign = if self.rng.next_u32() & 1 == 1 { 1.0 } else { -1.0 };
        let offset = r * r * r * sign;
        let dx = 10.0 * dx + 3.0 * offset;
        let dy = 10.0 * dy + 3.0 * offset;

        let mut tx = (lx as f32 + dx) as i64;
        let mut ty = (ly as f32 + dy) as i64;
        if self.wraps_x() {
            tx = tx.rem_euclid(self.width as i64);
        }
        if self.wraps_y() {
            ty = ty.rem_euclid(self.height as i64);
        }
        if tx < 0 || tx >= self.width as i64 || ty < 0 || ty >= self.height as i64 {
            return; // deposit fell off the local raster
        }

        let index = (ty * self.width as i64 + tx) as usize;
        if self.map[index] > 0.0 {
            let age = (self.map[index] * self.age_map[index] as f32 + z * t as f32)
                / (self.map[index] + z);
            self.age_map[index] = age as u32;
            self.map[index] += z;
            self.mass += z;
        }
    }

    /// Exchange a collision impulse with `other` at world `(wx, wy)`.
    ///
    /// `coll_mass` is the mass of the colliding crust on the giving side.
    /// Restitution is zero; the giver reacts against the colliding crust
    /// alone while the receiver also carries its own inertia. Separating
    /// plates and degenerate normals leave both plates untouched.
    pub fn collide(&mut self, other: &mut Plate, wx: u32, wy: u32, coll_mass: f32) {
        let Some((apx, apy, _)) = self.map_index(wx, wy) else {
            debug_assert!(false, "collision point outside plate at ({wx}, {wy})");
            return;
        };
        let Some((bpx, bpy, _)) = other.map_index(wx, wy) else {
            debug_assert!(false, "collision point outside the other plate at ({wx}, {wy})");
            return;
        };

        // Contact normal as the sum of the vectors centroid(A)->P and
        // P->centroid(B); built from local coordinates it stays sane for
        // plates that wrap over the seam.
        let ap_dx = (apx as i32 - self.cx as i32) as f32;
        let ap_dy = (apy as i32 - self.cy as i32) as f32;
        let bp_dx = (bpx as i32 - other.cx as i32) as f32;
        let bp_dy = (bpy as i32 - other.cy as i32) as f32;
        let nx = ap_dx - bp_dx;
        let ny = ap_dy - bp_dy;

        if nx * nx + ny * ny <= 0.0 {
            return; // degenerate normal
        }
        let n_len = (nx * nx + ny * ny).sqrt();
        let nx = nx / n_len;
        let ny = ny / n_len;

        let rel_vx = self.vx - other.vx;
        let rel_vy = self.vy - other.vy;
        let rel_dot_n = rel_vx * nx + rel_vy * ny;
        if rel_dot_n <= 0.0 {
            return; // already separating
        }

        let denom = 1.0 / self.mass + 1.0 / coll_mass;
        let j = -rel_dot_n / denom;

        self.dx += nx * j / self.mass;
        self.dy += ny * j / self.mass;
        other.dx -= nx * j / (coll_mass + other.mass);
        other.dy -= ny * j / (coll_mass + other.mass);
    }

    /// Transfer the whole continent under world `(wx, wy)` onto `other` and
    /// return the mass moved.
    ///
    /// Continents collide at several points per tick; once one transfer has
    /// emptied the continent, later calls for the same continent hit its
    /// tombstone and move nothing.
    pub fn aggregate_crust(
        &mut self,
        other: &mut Plate,
        wx: u32,
        wy: u32,
    ) -> Result<f32, PlateError> {
        let Some((lx, ly, _)) = self.map_index(wx, wy) else {
            debug_assert!(false, "aggregation point outside plate at ({wx}, {wy})");
            return Ok(0.0);
        };
        let seg_id = self.continent_at(wx, wy);
        if self.seg_data[seg_id as usize].is_empty() {
            return Ok(0.0);
        }

        let active = other.select_collision_segment(wx, wy);

        // A full world period up front keeps the per-cell subtraction below
        // out of unsigned underflow.
        let wx = self.world.wrap_x(wx) + self.world.width;
        let wy = self.world.wrap_y(wy) + self.world.height;

        let old_mass = self.mass;
        let bounds = self.seg_data[seg_id as usize].clone();
        for y in bounds.y0..=bounds.y1 {
            for x in bounds.x0..=bounds.x1 {
                let i = (y * self.width + x) as usize;
                if self.segments[i] == seg_id && self.map[i] > 0.0 {
                    other.add_crust_by_collision(
                        wx + x - lx,
                        wy + y - ly,
                        self.map[i],
                        self.age_map[i],
                        active,
                    )?;
                    self.mass -= self.map[i];
                    self.map[i] = 0.0;
                }
            }
        }

        self.seg_data[seg_id as usize].area = 0; // tombstone
        let moved = old_mass - self.mass;
        tracing::debug!(mass = moved, "continent aggregated");
        Ok(moved)
    }

    /// Continent id on this plate at world `(wx, wy)`, the destination for
    /// an incoming aggregation. Segments lazily.
    pub fn select_collision_segment(&mut self, wx: u32, wy: u32) -> ContinentId {
        self.continent_at(wx, wy)
    }

    /// Area in cells of the continent at world `(wx, wy)`. The cell must
    /// already belong to a segmented continent.
    pub fn continent_area(&self, wx: u32, wy: u32) -> u32 {
        let Some((_, _, index)) = self.map_index(wx, wy) else {
            debug_assert!(false, "continent lookup outside plate at ({wx}, {wy})");
            return 0;
        };
        let seg = self.segments[index];
        assert!((seg as usize) < self.seg_data.len(), "cell belongs to no continent");
        self.seg_data[seg as usize].area
    }

    /// Collision count and count-to-area ratio of the continent at
    /// world `(wx, wy)`.
    pub fn collision_info(&mut self, wx: u32, wy: u32) -> (u32, f32) {
        let seg = self.continent_at(wx, wy);
        let data = &self.seg_data[seg as usize];
        (data.coll_count, data.coll_count as f32 / (1 + data.area) as f32)
    }

    /// Bleed speed for the kinetic energy spent deforming `deformed` units
    /// of crust. Speed never drops below zero.
    pub fn apply_friction(&mut self, deformed: f32) {
        if self.mass > 0.0 {
            let vel_dec = DEFORMATION_WEIGHT * deformed / self.mass;
            self.velocity -= vel_dec.min(self.velocity);
        }
    }

    /// Advance the plate one tick.
    ///
    /// Pending impulses fold into the direction, which is renormalized; the
    /// length change feeds the scalar speed, floored at zero. A circular
    /// drift whose angle grows with the square of the speed then bends the
    /// direction, and the origin translates on the torus. Rasters and mass
    /// are untouched.
    pub fn step(&mut self) {
        self.vx += self.dx;
        self.vy += self.dy;
        self.dx = 0.0;
        self.dy = 0.0;

        let len = (self.vx * self.vx + self.vy * self.vy).sqrt();
        if len > 0.0 {
            self.vx /= len;
            self.vy /= len;
        }
        self.velocity = (self.velocity + (len - 1.0)).max(0.0);

        // Circular motion with the turn radius pinned to the world scale.
        let world_avg_side = self.world.average_side() as f32;
        let alpha = self.rot_dir * self.velocity / (world_avg_side * 0.33);
        let (sin, cos) = (alpha * self.velocity).sin_cos();
        let vx = self.vx * cos - self.vy * sin;
        let vy = self.vy * cos + self.vx * sin;
        self.vx = vx;
        self.vy = vy;

        debug_assert!(self.world.contains(self.left, self.top));

        let ww = self.world.width as f32;
        let wh = self.world.height as f32;
        self.left += self.vx * self.velocity;
        if self.left < 0.0 {
            self.left += ww;
        }
        if self.left >= ww {
            self.left -= ww;
        }
        self.top += self.vy * self.velocity;
        if self.top < 0.0 {
            self.top += wh;
        }
        if self.top >= wh {
            self.top -= wh;
        }

        debug_assert!(self.world.contains(self.left, self.top));
    }

    /// Run one erosion pass over the raster and refresh mass and centroid
    /// from the result.
    pub fn erode(&mut self, lower_bound: f32) {
        let eroded = erosion::erode(
            &mut self.map,
            self.width == self.world.width,
            self.height == self.world.height,
            lower_bound,
            &mut self.rng,
        );
        self.mass = eroded.mass;
        self.cx = eroded.cx;
        self.cy = eroded.cy;
    }

    /// Forget all segmentation. The table rebuilds lazily afterwards.
    pub fn reset_segments(&mut self) {
        self.segments.fill(INVALID_CONTINENT);
        self.seg_data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(w: u32, h: u32) -> WorldDimension {
        WorldDimension::new(w, h)
    }

    fn plate(seed: u64, heights: &[f32], w: u32, h: u32, x: u32, y: u32, wd: WorldDimension) -> Plate {
        match Plate::new(seed, heights, w, h, x, y, 0, wd) {
            Ok(p) => p,
            Err(e) => panic!("plate construction failed: {e}"),
        }
    }

    #[test]
    fn construction_accumulates_mass_and_centroid() {
        #[rustfmt::skip]
        let buffer = [
            0.0, 0.0, 0.0, 0.0,
            0.0, 2.0, 2.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
        ];
        let p = match Plate::new(77, &buffer, 4, 4, 0, 0, 100, world(4, 4)) {
            Ok(p) => p,
            Err(e) => panic!("plate construction failed: {e}"),
        };
        assert_eq!(p.mass(), 4.0);
        assert!((p.cx - 1.5).abs() < 1e-6);
        assert!((p.cy - 1.0).abs() < 1e-6);
        assert_eq!(p.timestamp_at(1, 1), 100);
        assert_eq!(p.timestamp_at(2, 1), 100);
        assert_eq!(p.timestamp_at(0, 0), 0);
        let norm = (p.vx * p.vx + p.vy * p.vy).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn step_translates_along_the_direction() {
        let mut p = plate(1, &[1.0; 16], 4, 4, 0, 0, world(4, 4));
        p.vx = 1.0;
        p.vy = 0.0;
        p.velocity = 1.0;
        p.rot_dir = 0.0;
        p.dx = 0.0;
        p.dy = 0.0;
        p.step();
        assert_eq!(p.left(), 1);
        assert_eq!(p.top(), 0);
        let norm = (p.vx * p.vx + p.vy * p.vy).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn step_wraps_the_origin() {
        let mut p = plate(2, &[1.0; 16], 4, 4, 3, 0, world(4, 4));
        p.vx = 1.0;
        p.vy = 0.0;
        p.velocity = 2.0;
        p.rot_dir = 0.0;
        p.step();
        assert_eq!(p.left(), 1);
    }

    #[test]
    fn braking_impulse_floors_speed_at_zero() {
        let mut p = plate(3, &[1.0; 16], 4, 4, 0, 0, world(4, 4));
        p.vx = 1.0;
        p.vy = 0.0;
        p.velocity = 0.3;
        p.rot_dir = 0.0;
        p.dx = -0.5; // direction shrinks to length 0.5
        p.dy = 0.0;
        p.step();
        assert_eq!(p.speed(), 0.0);
        let norm = (p.vx * p.vx + p.vy * p.vy).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn collision_impulse_matches_the_two_ball_example() {
        let wd = world(10, 10);
        let mut a = plate(4, &[0.1; 100], 10, 10, 0, 0, wd);
        let mut b = plate(5, &[1.0; 100], 10, 10, 0, 0, wd);
        a.mass = 10.0;
        a.cx = 3.0;
        a.cy = 5.0;
        a.vx = 1.0;
        a.vy = 0.0;
        b.mass = 100.0;
        b.cx = 7.0;
        b.cy = 5.0;
        b.vx = 0.0;
        b.vy = -1.0;

        a.collide(&mut b, 5, 5, 100.0);

        // n = (1, 0), rel v = (1, 1), J = -1 / (1/10 + 1/100) = -100/11.
        assert!((a.dx - (-10.0 / 11.0)).abs() < 1e-5, "a.dx = {}", a.dx);
        assert!(a.dy.abs() < 1e-6);
        assert!((b.dx - (100.0 / 11.0 / 200.0)).abs() < 1e-5, "b.dx = {}", b.dx);
        assert!(b.dy.abs() < 1e-6);
    }

    #[test]
    fn separating_plates_exchange_nothing() {
        let wd = world(10, 10);
        let mut a = plate(6, &[1.0; 100], 10, 10, 0, 0, wd);
        let mut b = plate(7, &[1.0; 100], 10, 10, 0, 0, wd);
        a.cx = 3.0;
        a.cy = 5.0;
        a.vx = -1.0; // moving away from B
        a.vy = 0.0;
        b.cx = 7.0;
        b.cy = 5.0;
        b.vx = 1.0;
        b.vy = 0.0;
        a.collide(&mut b, 5, 5, 10.0);
        assert_eq!((a.dx, a.dy, b.dx, b.dy), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn friction_never_reverses_the_plate() {
        let mut p = plate(8, &[1.0; 4], 2, 2, 0, 0, world(8, 8));
        assert_eq!(p.mass(), 4.0);
        p.apply_friction(1.0); // vel -= 2 * 1 / 4
        assert!((p.speed() - 0.5).abs() < 1e-6);
        p.apply_friction(10.0);
        assert_eq!(p.speed(), 0.0);
        assert!(p.momentum() >= 0.0);
    }
}
