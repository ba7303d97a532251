use crate::types::{
    ContextualizedEvent, Dated, FlashError, FlashResult, LabeledSample, PixelDetection,
    SampleClass,
};
use chrono::NaiveDate;
use geo::{Intersects, MultiPolygon};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How detections are matched to events for the positive class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateJoin {
    /// Same calendar day, no spatial test
    #[default]
    DateOnly,
    /// Same calendar day and the footprint intersects the event's boundary
    DateAndIntersects,
}

/// Active geometry for negative rows, which have no matched boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NegativeGeometry {
    /// No geometry
    #[default]
    Empty,
    /// The detection footprint
    Footprint,
}

fn default_quiescent_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 2, 1).unwrap_or_default()
}

/// Labeling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelerConfig {
    /// Negatives are drawn from detections strictly before this date
    #[serde(default = "default_quiescent_cutoff")]
    pub quiescent_cutoff: NaiveDate,
    /// Seed for the negative draw; `None` draws from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub join: DateJoin,
    #[serde(default)]
    pub negative_geometry: NegativeGeometry,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            quiescent_cutoff: default_quiescent_cutoff(), // Month before the 2022 invasion
            seed: None,
            join: DateJoin::default(),
            negative_geometry: NegativeGeometry::default(),
        }
    }
}

/// A joined row before column projection
#[derive(Debug, Clone)]
pub struct LabeledRow<'a> {
    pub class: SampleClass,
    pub detection: &'a PixelDetection,
    pub event: Option<&'a ContextualizedEvent>,
    pub geometry: Option<MultiPolygon<f64>>,
}

impl<'a> LabeledRow<'a> {
    /// Project onto the prefixed output schema
    pub fn project(&self) -> LabeledSample {
        let d = &self.detection.detection;
        let event = self.event.map(|c| &c.event);
        let boundary = self.event.map(|c| c.boundary.as_ref());

        LabeledSample {
            class: self.class,
            date: d.acq_date,

            f_lat: d.latitude,
            f_lng: d.longitude,
            f_bright: d.brightness,
            f_scan: d.scan,
            f_track: d.track,
            f_acqtime: d.acq_time.clone(),
            f_sat: d.satellite.clone(),
            f_inst: d.instrument.clone(),
            f_conf: d.confidence,
            f_bright31: d.bright_t31,
            f_frp: d.frp,
            f_daynight: d.daynight.clone(),
            f_datetime: self.detection.acquired_at,
            f_pixel: self.detection.footprint.clone(),

            a_event_id: event.map(|e| e.event_id_cnty.clone()),
            a_type: event.map(|e| e.disorder_type.clone()),
            a_event: event.map(|e| e.event_type.clone()),
            a_subevent: event.map(|e| e.sub_event_type.clone()),
            a_location: event.map(|e| e.location.clone()),
            a_lat: event.map(|e| e.latitude),
            a_lng: event.map(|e| e.longitude),
            a_geoprec: event.map(|e| e.geo_precision),

            h_adm_en: boundary.map(|b| b.name_en.clone()),
            h_adm_ua: boundary.map(|b| b.name_ua.clone()),
            h_adm_pcode: boundary.map(|b| b.pcode.clone()),
            h_adm_level: boundary.map(|b| b.level),
            h_adm_shape: self.geometry.clone(),
        }
    }
}

/// Positive rows followed by negative rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabeledDataset {
    pub samples: Vec<LabeledSample>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn positives(&self) -> impl Iterator<Item = &LabeledSample> {
        self.samples.iter().filter(|s| s.class == SampleClass::Positive)
    }

    pub fn negatives(&self) -> impl Iterator<Item = &LabeledSample> {
        self.samples.iter().filter(|s| s.class == SampleClass::Negative)
    }

    pub fn to_json(&self) -> FlashResult<String> {
        Ok(serde_json::to_string_pretty(&self.samples)?)
    }
}

/// Builds the positive/negative labeled dataset
pub struct DetectionLabeler {
    config: LabelerConfig,
}

impl DetectionLabeler {
    pub fn new() -> Self {
        Self {
            config: LabelerConfig::default(),
        }
    }

    pub fn with_config(config: LabelerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelerConfig {
        &self.config
    }

    /// Find detections with battlefield events on the same day (positive
    /// class) and pair them with an equal number of quiescent-period
    /// detections (negative class).
    pub fn label(
        &self,
        detections: &[PixelDetection],
        events: &[ContextualizedEvent],
    ) -> FlashResult<LabeledDataset> {
        log::info!("Intersecting event data with FIRMS thermal anomalies (positive class)...");
        let positives = self.positive_rows(detections, events);
        log::info!("Found {} positive rows", positives.len());

        log::info!(
            "Sampling from quiescent period (prior to {}) (negative class)...",
            self.config.quiescent_cutoff
        );
        let negatives = self.negative_rows(detections, positives.len())?;

        log::info!("Joining classes and renaming columns...");
        let samples = positives
            .iter()
            .chain(negatives.iter())
            .map(LabeledRow::project)
            .collect();

        Ok(LabeledDataset { samples })
    }

    fn positive_rows<'a>(
        &self,
        detections: &'a [PixelDetection],
        events: &'a [ContextualizedEvent],
    ) -> Vec<LabeledRow<'a>> {
        let mut by_date: HashMap<NaiveDate, Vec<&ContextualizedEvent>> = HashMap::new();
        for event in events {
            by_date.entry(event.date()).or_default().push(event);
        }

        let mut rows = Vec::new();
        for detection in detections {
            let Some(same_day) = by_date.get(&detection.date()) else {
                continue;
            };
            for &event in same_day {
                if self.config.join == DateJoin::DateAndIntersects
                    && !event.geometry().intersects(&detection.footprint)
                {
                    continue;
                }
                rows.push(LabeledRow {
                    class: SampleClass::Positive,
                    detection,
                    event: Some(event),
                    geometry: Some(event.geometry().clone()),
                });
            }
        }
        rows
    }

    fn negative_rows<'a>(
        &self,
        detections: &'a [PixelDetection],
        count: usize,
    ) -> FlashResult<Vec<LabeledRow<'a>>> {
        if count == 0 {
            log::warn!("Positive class is empty, no negatives sampled");
            return Ok(Vec::new());
        }

        let pool: Vec<&PixelDetection> = detections
            .iter()
            .filter(|d| d.date() < self.config.quiescent_cutoff)
            .collect();

        if pool.len() < count {
            return Err(FlashError::Sampling {
                requested: count,
                available: pool.len(),
            });
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut picks = rand::seq::index::sample(&mut rng, pool.len(), count).into_vec();
        picks.sort_unstable();

        log::debug!("Drew {} negatives from a pool of {}", count, pool.len());

        Ok(picks
            .into_iter()
            .map(|i| {
                let detection = pool[i];
                let geometry = match self.config.negative_geometry {
                    NegativeGeometry::Empty => None,
                    NegativeGeometry::Footprint => {
                        Some(MultiPolygon::new(vec![detection.footprint.clone()]))
                    }
                };
                LabeledRow {
                    class: SampleClass::Negative,
                    detection,
                    event: None,
                    geometry,
                }
            })
            .collect())
    }
}

impl Default for DetectionLabeler {
    fn default() -> Self {
        Self::new()
    }
}
