use engine::grid::WorldDimension;
use engine::plate::Plate;

#[test]
fn crust_reads_are_periodic() {
    let wd = WorldDimension::new(8, 8);
    let cells: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let p = Plate::new(5, &cells, 4, 4, 6, 6, 0, wd).unwrap();
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(p.crust_at(x + 8, y + 8), p.crust_at(x, y), "at ({x}, {y})");
            assert_eq!(p.timestamp_at(x + 8, y + 8), p.timestamp_at(x, y));
        }
    }
}

#[test]
fn a_plate_across_the_seam_is_addressable() {
    let wd = WorldDimension::new(8, 8);
    let mut cells = vec![0.0; 16];
    cells[3 * 4 + 3] = 9.0; // local (3, 3)
    let p = Plate::new(5, &cells, 4, 4, 6, 6, 0, wd).unwrap();
    // The raster covers x in {6, 7, 0, 1} and y in {6, 7, 0, 1};
    // local (3, 3) lands at world (1, 1).
    assert_eq!(p.crust_at(1, 1), 9.0);
    assert!(p.contains(6, 6));
    assert!(p.contains(0, 0));
    assert!(p.contains(1, 7));
    assert!(!p.contains(4, 4));
    assert!(!p.contains(2, 0));
    assert_eq!(p.crust_at(4, 4), 0.0);
}
