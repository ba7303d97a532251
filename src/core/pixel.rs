use crate::types::{Detection, FlashError, FlashResult, PixelDetection};
use geo::{polygon, AffineOps, AffineTransform, Coord, Point, Polygon, Rotate};
use serde::{Deserialize, Serialize};

/// Footprint construction parameters.
///
/// A fixed km-per-degree scale is applied regardless of latitude, so longitude
/// distances can be off by 5% or more away from the latitude the defaults were
/// picked for (central Ukraine). Elevation is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelParams {
    /// Rotation, degrees counter-clockwise from east
    pub angle_deg: f64,
    pub km_per_degree_lat: f64,
    pub km_per_degree_lng: f64,
}

impl Default for PixelParams {
    fn default() -> Self {
        Self {
            angle_deg: -90.0,           // Track assumed north/south for all passes
            km_per_degree_lat: 111.0,
            km_per_degree_lng: 75.0,    // ~48-50 deg N
        }
    }
}

impl PixelParams {
    pub fn validate(&self) -> FlashResult<()> {
        if !(self.km_per_degree_lat > 0.0 && self.km_per_degree_lng > 0.0) {
            return Err(FlashError::Config(format!(
                "km-per-degree factors must be positive (lat {}, lng {})",
                self.km_per_degree_lat, self.km_per_degree_lng
            )));
        }
        if !self.angle_deg.is_finite() {
            return Err(FlashError::Config("Pixel angle must be finite".to_string()));
        }
        Ok(())
    }
}

/// Axis-aligned extents of a rectangle from its first and third corners.
///
/// Only meaningful while the rectangle's sides run parallel to the axes.
/// Returns `(x_extent, y_extent)`.
pub fn rect_dims(rect: &Polygon<f64>) -> (f64, f64) {
    let coords: Vec<Coord<f64>> = rect.exterior().coords().copied().collect();
    if coords.len() < 3 {
        return (0.0, 0.0);
    }
    (coords[0].x - coords[2].x, coords[0].y - coords[2].y)
}

/// Build the ground footprint of a FIRMS detection in decimal degrees.
///
/// All work happens in a 2D cartesian plane: a unit square centered on the
/// origin is stretched to `track` x `scan` kilometers, rotated, scaled into
/// degrees and finally moved onto `(lon, lat)`. Scan and track must be in km.
pub fn make_pixel(
    scan: f64,
    track: f64,
    lat: f64,
    lon: f64,
    params: &PixelParams,
) -> FlashResult<Polygon<f64>> {
    if !(scan > 0.0 && track > 0.0) || !lat.is_finite() || !lon.is_finite() {
        return Err(FlashError::InvalidInput(format!(
            "Cannot build pixel for scan={} track={} at ({}, {})",
            scan, track, lat, lon
        )));
    }

    let origin = Coord { x: 0.0, y: 0.0 };
    let unit = polygon![
        (x: 0.5, y: 0.5),
        (x: 0.5, y: -0.5),
        (x: -0.5, y: -0.5),
        (x: -0.5, y: 0.5)
    ];

    let pixel = unit.affine_transform(&AffineTransform::scale(track, scan, origin));
    let dims = rect_dims(&pixel);
    if dims != (track, scan) {
        return Err(FlashError::PixelGeometry(format!(
            "Scaled pixel is {:?}, expected ({}, {})",
            dims, track, scan
        )));
    }

    let pixel = pixel.rotate_around_point(params.angle_deg, Point::from(origin));

    let to_degrees = AffineTransform::scale(
        1.0 / params.km_per_degree_lng,
        1.0 / params.km_per_degree_lat,
        origin,
    );
    let pixel = pixel.affine_transform(&to_degrees);

    Ok(pixel.affine_transform(&AffineTransform::translate(lon, lat)))
}

fn attach_footprint(detection: Detection, params: &PixelParams) -> FlashResult<PixelDetection> {
    let acquired_at = detection.acq_datetime()?;
    let footprint = make_pixel(
        detection.scan,
        detection.track,
        detection.latitude,
        detection.longitude,
        params,
    )?;
    Ok(PixelDetection {
        detection,
        footprint,
        acquired_at,
    })
}

/// Attach a footprint polygon and parsed acquisition time to every detection.
///
/// Any detection with unusable geometry or an unparsable `acq_time` fails the
/// whole batch before labeling starts.
pub fn build_pixels(
    detections: Vec<Detection>,
    params: &PixelParams,
) -> FlashResult<Vec<PixelDetection>> {
    params.validate()?;
    log::info!("Building FIRMS pixel geometry for {} detections", detections.len());
    log::debug!("Pixel parameters: {:?}", params);

    #[cfg(feature = "parallel")]
    let pixels = {
        use rayon::prelude::*;
        detections
            .into_par_iter()
            .map(|d| attach_footprint(d, params))
            .collect::<FlashResult<Vec<_>>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let pixels = detections
        .into_iter()
        .map(|d| attach_footprint(d, params))
        .collect::<FlashResult<Vec<_>>>()?;

    log::info!("Built {} pixel footprints", pixels.len());
    Ok(pixels)
}
