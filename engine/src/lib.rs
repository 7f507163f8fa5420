//! Toroidal plate-tectonics simulation core.
//!
//! A world heightmap is decomposed into rigid plates, each carrying its own
//! crust and age rasters. Plates drift and spin on the torus, exchange
//! impulses when they collide, transfer whole continents, deposit subducted
//! crust inland, and erode along steepest-descent river paths. The
//! world-level stepper that detects per-cell overlaps and schedules these
//! calls lives outside this crate.
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

/// Hydraulic erosion over a plate raster.
pub mod erosion;
/// Fixed-size height and age rasters.
pub mod fields;
/// World dimensions and seam-aware index arithmetic.
pub mod grid;
/// Plate state, kinematics, and crust exchange.
pub mod plate;
/// Continent descriptors and flood-fill segmentation.
pub mod segment;

/// Returns the engine version string from Cargo metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn version_is_semver_like() {
        assert!(version().split('.').count() >= 3);
    }
}
