/*!
 * Processing provenance for labeled dataset builds
 *
 * Records, per pipeline stage:
 * - record counts in and out, and how many records were dropped
 * - the parameters the stage ran with
 * - warnings raised along the way (empty windows, unattributable events)
 *
 * together with the lineage of every output column back to its source field.
 */

use crate::types::{FlashError, FlashResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Origin of an output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSource {
    Detection,
    Event,
    Boundary,
}

/// Maps one output column back to the field it was projected from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLineage {
    pub column: String,
    pub source: ColumnSource,
    pub source_field: String,
}

const LINEAGE: &[(&str, ColumnSource, &str)] = &[
    ("date", ColumnSource::Detection, "ACQ_DATE"),
    ("f_lat", ColumnSource::Detection, "LATITUDE"),
    ("f_lng", ColumnSource::Detection, "LONGITUDE"),
    ("f_bright", ColumnSource::Detection, "BRIGHTNESS"),
    ("f_scan", ColumnSource::Detection, "SCAN"),
    ("f_track", ColumnSource::Detection, "TRACK"),
    ("f_acqtime", ColumnSource::Detection, "ACQ_TIME"),
    ("f_sat", ColumnSource::Detection, "SATELLITE"),
    ("f_inst", ColumnSource::Detection, "INSTRUMENT"),
    ("f_conf", ColumnSource::Detection, "CONFIDENCE"),
    ("f_bright31", ColumnSource::Detection, "BRIGHT_T31"),
    ("f_frp", ColumnSource::Detection, "FRP"),
    ("f_daynight", ColumnSource::Detection, "DAYNIGHT"),
    ("f_datetime", ColumnSource::Detection, "ACQ_DATE+ACQ_TIME"),
    ("f_pixel", ColumnSource::Detection, "SCAN+TRACK+LATITUDE+LONGITUDE"),
    ("a_event_id", ColumnSource::Event, "event_id_cnty"),
    ("a_type", ColumnSource::Event, "disorder_type"),
    ("a_event", ColumnSource::Event, "event_type"),
    ("a_subevent", ColumnSource::Event, "sub_event_type"),
    ("a_location", ColumnSource::Event, "location"),
    ("a_lat", ColumnSource::Event, "latitude"),
    ("a_lng", ColumnSource::Event, "longitude"),
    ("a_geoprec", ColumnSource::Event, "geo_precision"),
    ("h_adm_en", ColumnSource::Boundary, "ADM*_EN"),
    ("h_adm_ua", ColumnSource::Boundary, "ADM*_UA"),
    ("h_adm_pcode", ColumnSource::Boundary, "ADM*_PCODE"),
    ("h_adm_level", ColumnSource::Boundary, "layer"),
    ("h_adm_shape", ColumnSource::Boundary, "geometry"),
];

/// Lineage of every column in a labeled sample, in schema order
pub fn column_lineage() -> Vec<ColumnLineage> {
    LINEAGE
        .iter()
        .map(|&(column, source, field)| ColumnLineage {
            column: column.to_string(),
            source,
            source_field: field.to_string(),
        })
        .collect()
}

/// One executed pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub step_number: u32,
    pub step_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub input_count: usize,
    pub output_count: usize,
    pub dropped_count: usize,
    pub parameters_used: BTreeMap<String, serde_json::Value>,
    pub warnings: Vec<String>,
}

impl ProcessingStep {
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Provenance document for one dataset build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub processing_id: String,
    pub processing_timestamp: DateTime<Utc>,
    pub processor_version: String,
    pub processing_history: Vec<ProcessingStep>,
    pub columns: Vec<ColumnLineage>,
}

/// Accumulates processing steps during a pipeline run
#[derive(Debug, Clone)]
pub struct ProvenanceRecorder {
    metadata: ProcessingMetadata,
    step_counter: u32,
}

impl ProvenanceRecorder {
    pub fn new(processing_id: impl Into<String>) -> Self {
        Self {
            metadata: ProcessingMetadata {
                processing_id: processing_id.into(),
                processing_timestamp: Utc::now(),
                processor_version: env!("CARGO_PKG_VERSION").to_string(),
                processing_history: Vec::new(),
                columns: column_lineage(),
            },
            step_counter: 0,
        }
    }

    /// Record a finished stage that started at `start_time`
    pub fn record_step(
        &mut self,
        step_name: &str,
        start_time: DateTime<Utc>,
        counts: (usize, usize, usize),
        parameters: BTreeMap<String, serde_json::Value>,
        warnings: Vec<String>,
    ) {
        self.step_counter += 1;
        let (input_count, output_count, dropped_count) = counts;

        for warning in &warnings {
            log::warn!("{}: {}", step_name, warning);
        }

        self.metadata.processing_history.push(ProcessingStep {
            step_number: self.step_counter,
            step_name: step_name.to_string(),
            start_time,
            end_time: Utc::now(),
            input_count,
            output_count,
            dropped_count,
            parameters_used: parameters,
            warnings,
        });
        log::info!("Recorded processing step {}: {}", self.step_counter, step_name);
    }

    pub fn steps(&self) -> &[ProcessingStep] {
        &self.metadata.processing_history
    }

    pub fn step(&self, step_name: &str) -> Option<&ProcessingStep> {
        self.metadata
            .processing_history
            .iter()
            .find(|s| s.step_name == step_name)
    }

    pub fn metadata(&self) -> &ProcessingMetadata {
        &self.metadata
    }

    pub fn export_json(&self) -> FlashResult<String> {
        Ok(serde_json::to_string_pretty(&self.metadata)?)
    }

    /// Save the provenance document; only `json` is supported
    pub fn save_to_file<P: AsRef<Path>>(&self, output_path: P, format: &str) -> FlashResult<()> {
        let content = match format.to_lowercase().as_str() {
            "json" => self.export_json()?,
            _ => {
                return Err(FlashError::Config(format!(
                    "Unsupported metadata format: {}",
                    format
                )))
            }
        };

        std::fs::write(output_path.as_ref(), content)?;
        log::info!("Metadata saved to: {}", output_path.as_ref().display());
        Ok(())
    }

    /// Human-readable summary of the run
    pub fn generate_processing_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== DATASET BUILD SUMMARY ===\n\n");
        summary.push_str(&format!("Processing ID: {}\n", self.metadata.processing_id));
        summary.push_str(&format!(
            "Timestamp: {}\n",
            self.metadata.processing_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        summary.push_str(&format!("Processor Version: {}\n\n", self.metadata.processor_version));

        summary.push_str("PROCESSING STEPS:\n");
        for step in &self.metadata.processing_history {
            summary.push_str(&format!(
                "  {}. {}: {} -> {} ({} dropped)\n",
                step.step_number, step.step_name, step.input_count, step.output_count, step.dropped_count
            ));
            summary.push_str(&format!("     Duration: {:.2}s\n", step.duration_secs()));
            if !step.warnings.is_empty() {
                summary.push_str(&format!("     Warnings: {}\n", step.warnings.join(", ")));
            }
        }

        summary
    }
}
