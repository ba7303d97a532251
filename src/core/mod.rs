//! Core dataset construction modules

pub mod pixel;
pub mod temporal;
pub mod spatial;
pub mod contextualize;
pub mod label;
pub mod provenance;
pub mod pipeline;

// Re-export main types
pub use pixel::{build_pixels, make_pixel, rect_dims, PixelParams};
pub use temporal::{common_window, reduce_to_common_window, DateWindow, WindowedCollections};
pub use spatial::{restrict_to_region, AdminHierarchy, BoundaryLayer, SpatialPredicate};
pub use contextualize::{ContextConfig, ContextReport, Contextualization, Contextualizer};
pub use label::{DateJoin, DetectionLabeler, LabeledDataset, LabeledRow, LabelerConfig, NegativeGeometry};
pub use provenance::{column_lineage, ColumnLineage, ColumnSource, ProcessingMetadata, ProvenanceRecorder};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
