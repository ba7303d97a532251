use approx::assert_abs_diff_eq;
use flashpoints::core::{make_pixel, rect_dims, PixelParams};
use geo::Centroid;

const SCANS: [f64; 5] = [0.32, 0.39, 0.5, 1.0, 4.8];
const TRACKS: [f64; 5] = [0.36, 0.37, 0.5, 1.0, 2.0];
const CENTERS: [(f64, f64); 4] = [(0.0, 0.0), (50.45, 30.52), (46.48, 30.72), (-33.9, 151.2)];

#[test]
fn test_unrotated_dims_equal_track_and_scan() {
    let params = PixelParams {
        angle_deg: 0.0,
        km_per_degree_lat: 1.0,
        km_per_degree_lng: 1.0,
    };

    for &scan in &SCANS {
        for &track in &TRACKS {
            let p = make_pixel(scan, track, 0.0, 0.0, &params).unwrap();
            assert_eq!(rect_dims(&p), (track, scan), "scan={} track={}", scan, track);
        }
    }
}

#[test]
fn test_centroid_lands_on_detection() {
    let params = PixelParams::default();

    for &(lat, lon) in &CENTERS {
        for &scan in &SCANS {
            for &track in &TRACKS {
                let p = make_pixel(scan, track, lat, lon, &params).unwrap();
                let c = p.centroid().unwrap();
                assert_abs_diff_eq!(c.x(), lon, epsilon = 1e-9);
                assert_abs_diff_eq!(c.y(), lat, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_rotation_changes_orientation_not_area() {
    use geo::Area;

    let flat = PixelParams {
        angle_deg: 0.0,
        ..PixelParams::default()
    };
    let tilted = PixelParams {
        angle_deg: 30.0,
        km_per_degree_lat: 75.0,
        km_per_degree_lng: 75.0,
    };
    let flat_same_scale = PixelParams {
        km_per_degree_lat: 75.0,
        ..flat.clone()
    };

    let a = make_pixel(0.5, 1.0, 48.0, 35.0, &flat_same_scale).unwrap();
    let b = make_pixel(0.5, 1.0, 48.0, 35.0, &tilted).unwrap();
    assert_abs_diff_eq!(a.unsigned_area(), b.unsigned_area(), epsilon = 1e-15);
    assert_ne!(a, b);
}
