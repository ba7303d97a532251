use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use geo::{MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Detection confidence, normalized across VIIRS and MODIS products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "l")]
    Low,
    #[serde(rename = "n")]
    Nominal,
    #[serde(rename = "h")]
    High,
}

impl Confidence {
    /// Map a MODIS percentage confidence (0-100) onto the VIIRS classes
    pub fn from_percent(percent: f64) -> Self {
        if percent > 66.0 {
            Confidence::High
        } else if percent > 33.0 {
            Confidence::Nominal
        } else {
            Confidence::Low
        }
    }

    /// Parse a VIIRS class code (`l`, `n`, `h`) or its long name
    pub fn from_code(code: &str) -> FlashResult<Self> {
        match code.trim().to_lowercase().as_str() {
            "l" | "low" => Ok(Confidence::Low),
            "n" | "nominal" => Ok(Confidence::Nominal),
            "h" | "high" => Ok(Confidence::High),
            other => Err(FlashError::InvalidInput(format!(
                "Unknown confidence code: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "l"),
            Confidence::Nominal => write!(f, "n"),
            Confidence::High => write!(f, "h"),
        }
    }
}

/// A single thermal anomaly as reported by a FIRMS sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub latitude: f64,
    pub longitude: f64,
    pub scan: f64,                // km, cross-track pixel size
    pub track: f64,               // km, along-track pixel size
    pub acq_date: NaiveDate,
    pub acq_time: String,         // HHMM, leading zeros may be missing
    pub brightness: f64,
    pub confidence: Confidence,
    pub satellite: String,
    pub instrument: String,
    pub bright_t31: f64,
    pub frp: f64,
    pub daynight: String,
}

impl Detection {
    /// Combine the acquisition date with the zero-padded HHMM acquisition time
    pub fn acq_datetime(&self) -> FlashResult<NaiveDateTime> {
        let padded = format!("{:0>4}", self.acq_time.trim());
        let time = NaiveTime::parse_from_str(&padded, "%H%M").map_err(|e| {
            FlashError::InvalidInput(format!(
                "Invalid acquisition time '{}': {}",
                self.acq_time, e
            ))
        })?;
        Ok(self.acq_date.and_time(time))
    }

    /// Reported center of the pixel
    pub fn center(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// A detection with its reconstructed ground footprint (EPSG:4326)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelDetection {
    pub detection: Detection,
    pub footprint: Polygon<f64>,
    /// Parsed from `acq_date` and `acq_time` when the footprint is attached
    pub acquired_at: NaiveDateTime,
}

/// A reported armed-conflict event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub event_id_cnty: String,
    pub event_date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub disorder_type: String,
    pub event_type: String,
    pub sub_event_type: String,
    pub location: String,
    pub geo_precision: u8,
}

impl ConflictEvent {
    pub fn location_point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Level of an administrative boundary in the reference hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminLevel {
    /// Urban/city divisions (ADM4), the most granular
    Urban,
    /// Sub-regional divisions (ADM3, hromada)
    Regional,
    /// Country outline (ADM0)
    National,
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminLevel::Urban => write!(f, "urban"),
            AdminLevel::Regional => write!(f, "regional"),
            AdminLevel::National => write!(f, "national"),
        }
    }
}

/// A named administrative polygon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBoundary {
    pub name_en: String,
    pub name_ua: String,
    pub pcode: String,
    pub level: AdminLevel,
    pub geometry: MultiPolygon<f64>,
}

/// An event attributed to its smallest enclosing administrative boundary.
///
/// The boundary polygon replaces the event point as the active geometry; the
/// original coordinates survive on `event` for the `a_lat`/`a_lng` columns.
#[derive(Debug, Clone)]
pub struct ContextualizedEvent {
    pub event: ConflictEvent,
    pub boundary: Arc<AdminBoundary>,
}

impl ContextualizedEvent {
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.boundary.geometry
    }
}

/// Records that carry an observation date
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Detection {
    fn date(&self) -> NaiveDate {
        self.acq_date
    }
}

impl Dated for PixelDetection {
    fn date(&self) -> NaiveDate {
        self.detection.acq_date
    }
}

impl Dated for ConflictEvent {
    fn date(&self) -> NaiveDate {
        self.event_date
    }
}

impl Dated for ContextualizedEvent {
    fn date(&self) -> NaiveDate {
        self.event.event_date
    }
}

/// Class of a labeled sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleClass {
    Positive,
    Negative,
}

/// Final output row with disambiguated column names.
///
/// `f_` fields come from the detection, `a_` from the conflict event and `h_`
/// from the administrative boundary. Event and boundary fields are absent on
/// negative rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub class: SampleClass,
    pub date: NaiveDate,

    // Detection
    pub f_lat: f64,
    pub f_lng: f64,
    pub f_bright: f64,
    pub f_scan: f64,
    pub f_track: f64,
    pub f_acqtime: String,
    pub f_sat: String,
    pub f_inst: String,
    pub f_conf: Confidence,
    pub f_bright31: f64,
    pub f_frp: f64,
    pub f_daynight: String,
    pub f_datetime: NaiveDateTime,
    pub f_pixel: Polygon<f64>,

    // Conflict event
    pub a_event_id: Option<String>,
    pub a_type: Option<String>,
    pub a_event: Option<String>,
    pub a_subevent: Option<String>,
    pub a_location: Option<String>,
    pub a_lat: Option<f64>,
    pub a_lng: Option<f64>,
    pub a_geoprec: Option<u8>,

    // Administrative boundary
    pub h_adm_en: Option<String>,
    pub h_adm_ua: Option<String>,
    pub h_adm_pcode: Option<String>,
    pub h_adm_level: Option<AdminLevel>,
    /// Active geometry
    pub h_adm_shape: Option<MultiPolygon<f64>>,
}

/// Error types for dataset construction
#[derive(Debug, thiserror::Error)]
pub enum FlashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pixel geometry error: {0}")]
    PixelGeometry(String),

    #[error("Join cardinality violated at {stage}: expected {expected} rows, got {actual}")]
    JoinCardinality {
        stage: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot sample {requested} negatives from a pool of {available}")]
    Sampling { requested: usize, available: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for dataset operations
pub type FlashResult<T> = Result<T, FlashError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(acq_time: &str) -> Detection {
        Detection {
            latitude: 50.45,
            longitude: 30.52,
            scan: 0.39,
            track: 0.36,
            acq_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            acq_time: acq_time.to_string(),
            brightness: 330.2,
            confidence: Confidence::Nominal,
            satellite: "N".to_string(),
            instrument: "VIIRS".to_string(),
            bright_t31: 285.1,
            frp: 4.2,
            daynight: "N".to_string(),
        }
    }

    #[test]
    fn test_modis_confidence_thresholds() {
        assert_eq!(Confidence::from_percent(0.0), Confidence::Low);
        assert_eq!(Confidence::from_percent(33.0), Confidence::Low);
        assert_eq!(Confidence::from_percent(34.0), Confidence::Nominal);
        assert_eq!(Confidence::from_percent(66.0), Confidence::Nominal);
        assert_eq!(Confidence::from_percent(67.0), Confidence::High);
    }

    #[test]
    fn test_confidence_codes() {
        assert_eq!(Confidence::from_code("h").unwrap(), Confidence::High);
        assert_eq!(Confidence::from_code(" Nominal ").unwrap(), Confidence::Nominal);
        assert!(Confidence::from_code("x").is_err());
        assert_eq!(format!("{}", Confidence::Low), "l");
    }

    #[test]
    fn test_acq_datetime_pads_short_times() {
        let dt = detection("42").acq_datetime().unwrap();
        assert_eq!(dt.to_string(), "2022-03-01 00:42:00");

        let dt = detection("1137").acq_datetime().unwrap();
        assert_eq!(dt.to_string(), "2022-03-01 11:37:00");

        assert!(detection("2599").acq_datetime().is_err());
    }
}
