//! Flashpoints: labeled thermal-anomaly datasets for conflict monitoring
//!
//! This library correlates FIRMS fire detections with ACLED conflict events,
//! attributes each event to its smallest enclosing administrative boundary and
//! emits a positive/negative labeled dataset for model training.

pub mod types;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AdminBoundary, AdminLevel, Confidence, ConflictEvent, ContextualizedEvent, Dated, Detection,
    FlashError, FlashResult, LabeledSample, PixelDetection, SampleClass,
};

pub use crate::core::{
    AdminHierarchy, BoundaryLayer, Contextualizer, DetectionLabeler, Pipeline, PipelineConfig,
};

#[cfg(feature = "python")]
mod python {
    use crate::core::pixel::{make_pixel as build_pixel, rect_dims as dims, PixelParams};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    /// Footprint corners of a FIRMS detection as (lon, lat) pairs
    #[pyfunction]
    #[pyo3(signature = (scan, track, lat, lon, angle=-90.0, km_per_dd_lat=111.0, km_per_dd_lng=75.0))]
    fn make_pixel(
        scan: f64,
        track: f64,
        lat: f64,
        lon: f64,
        angle: f64,
        km_per_dd_lat: f64,
        km_per_dd_lng: f64,
    ) -> PyResult<Vec<(f64, f64)>> {
        let params = PixelParams {
            angle_deg: angle,
            km_per_degree_lat: km_per_dd_lat,
            km_per_degree_lng: km_per_dd_lng,
        };
        params
            .validate()
            .map_err(|e| PyValueError::new_err(format!("{}", e)))?;

        let pixel = build_pixel(scan, track, lat, lon, &params)
            .map_err(|e| PyValueError::new_err(format!("{}", e)))?;

        Ok(pixel.exterior().coords().map(|c| (c.x, c.y)).collect())
    }

    /// Axis-aligned (x, y) extents of a rectangle given its ring
    #[pyfunction]
    fn rect_dims(coords: Vec<(f64, f64)>) -> PyResult<(f64, f64)> {
        if coords.len() < 4 {
            return Err(PyValueError::new_err("A rectangle needs at least four corners"));
        }
        let ring: Vec<geo::Coord<f64>> = coords.iter().map(|&(x, y)| geo::Coord { x, y }).collect();
        Ok(dims(&geo::Polygon::new(geo::LineString::from(ring), Vec::new())))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(make_pixel, m)?)?;
        m.add_function(wrap_pyfunction!(rect_dims, m)?)?;
        Ok(())
    }
}
