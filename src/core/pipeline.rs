use crate::core::contextualize::{ContextConfig, ContextReport, Contextualizer};
use crate::core::label::{DetectionLabeler, LabeledDataset, LabelerConfig};
use crate::core::pixel::{build_pixels, PixelParams};
use crate::core::provenance::ProvenanceRecorder;
use crate::core::spatial::{restrict_to_region, AdminHierarchy};
use crate::core::temporal::{reduce_to_common_window, DateWindow};
use crate::types::{ConflictEvent, Detection, FlashError, FlashResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Complete dataset build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub processing_id: String,
    pub pixel: PixelParams,
    pub context: ContextConfig,
    pub labeler: LabelerConfig,
    /// Drop detections outside the national outline when one is available
    pub restrict_to_national: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processing_id: "flashpoints".to_string(),
            pixel: PixelParams::default(),
            context: ContextConfig::default(),
            labeler: LabelerConfig::default(),
            restrict_to_national: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> FlashResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FlashError::Config(format!("Invalid pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> FlashResult<Self> {
        log::info!("Loading pipeline config from {}", path.as_ref().display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> FlashResult<()> {
        self.pixel.validate()
    }
}

/// Everything a dataset build produces
#[derive(Debug)]
pub struct PipelineOutput {
    pub dataset: LabeledDataset,
    pub window: Option<DateWindow>,
    pub context_report: ContextReport,
    pub provenance: ProvenanceRecorder,
}

/// Runs the full build: time alignment, contextualization, pixel geometry and
/// labeling
pub struct Pipeline<'a> {
    hierarchy: &'a AdminHierarchy,
    config: PipelineConfig,
}

fn params_of<T: Serialize>(value: &T) -> BTreeMap<String, serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        Ok(other) => BTreeMap::from([("value".to_string(), other)]),
        Err(_) => BTreeMap::new(),
    }
}

impl<'a> Pipeline<'a> {
    pub fn new(hierarchy: &'a AdminHierarchy, config: PipelineConfig) -> Self {
        Self { hierarchy, config }
    }

    pub fn run(
        &self,
        detections: Vec<Detection>,
        events: Vec<ConflictEvent>,
    ) -> FlashResult<PipelineOutput> {
        self.config.validate()?;
        let mut provenance = ProvenanceRecorder::new(self.config.processing_id.clone());

        let detections = match (&self.hierarchy.national, self.config.restrict_to_national) {
            (Some(national), true) => {
                let started = Utc::now();
                let total = detections.len();
                let kept = restrict_to_region(detections, national, self.config.context.predicate);
                provenance.record_step(
                    "restrict_to_national",
                    started,
                    (total, kept.len(), total - kept.len()),
                    params_of(&self.config.context),
                    Vec::new(),
                );
                kept
            }
            _ => detections,
        };

        let started = Utc::now();
        let total = detections.len() + events.len();
        let reduced = reduce_to_common_window(detections, events);
        let retained = reduced.first.len() + reduced.second.len();
        let mut warnings = Vec::new();
        if reduced.window.is_none() {
            warnings.push("detections and events share no dates".to_string());
        }
        provenance.record_step(
            "temporal_window",
            started,
            (total, retained, total - retained),
            params_of(&reduced.window),
            warnings,
        );
        let window = reduced.window;

        let started = Utc::now();
        let contextualizer = Contextualizer::with_config(self.hierarchy, self.config.context.clone());
        let context = contextualizer.contextualize(reduced.second)?;
        let mut warnings = Vec::new();
        if context.report.dropped > 0 {
            warnings.push(format!(
                "{} events without an enclosing boundary",
                context.report.dropped
            ));
        }
        provenance.record_step(
            "contextualize",
            started,
            (context.report.input, context.events.len(), context.report.dropped),
            params_of(&self.config.context),
            warnings,
        );

        let started = Utc::now();
        let pixel_input = reduced.first.len();
        let pixels = build_pixels(reduced.first, &self.config.pixel)?;
        provenance.record_step(
            "build_pixels",
            started,
            (pixel_input, pixels.len(), 0),
            params_of(&self.config.pixel),
            Vec::new(),
        );

        let started = Utc::now();
        let labeler = DetectionLabeler::with_config(self.config.labeler.clone());
        let dataset = labeler.label(&pixels, &context.events)?;
        let positive_rows = dataset.positives().count();
        let negative_rows = dataset.negatives().count();
        let mut warnings = Vec::new();
        if dataset.is_empty() {
            warnings.push("positive class is empty".to_string());
        }
        let mut parameters = params_of(&self.config.labeler);
        parameters.insert("positive_rows".to_string(), positive_rows.into());
        parameters.insert("negative_rows".to_string(), negative_rows.into());
        // Output counts rows, and one detection can fan out to several
        // same-day events. Labeling selects detections, it never drops them.
        provenance.record_step(
            "label",
            started,
            (pixels.len(), dataset.len(), 0),
            parameters,
            warnings,
        );

        log::info!(
            "Flashpoints dataset created: {} positive, {} negative rows",
            positive_rows,
            negative_rows
        );

        Ok(PipelineOutput {
            dataset,
            window,
            context_report: context.report,
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_partial_json() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "processing_id": "ua-2022",
                "pixel": { "angle_deg": 0.0, "km_per_degree_lat": 111.0, "km_per_degree_lng": 71.0 },
                "labeler": { "seed": 11 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.processing_id, "ua-2022");
        assert_eq!(config.pixel.km_per_degree_lng, 71.0);
        assert_eq!(config.labeler.seed, Some(11));
        assert!(config.restrict_to_national);
    }

    #[test]
    fn test_config_rejects_bad_scale() {
        let result = PipelineConfig::from_json_str(
            r#"{ "pixel": { "angle_deg": -90.0, "km_per_degree_lat": -1.0, "km_per_degree_lng": 75.0 } }"#,
        );
        assert!(matches!(result, Err(FlashError::Config(_))));
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(FlashError::Config(_))
        ));
    }
}
