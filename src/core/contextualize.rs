use crate::core::spatial::{AdminHierarchy, BoundaryLayer, SpatialPredicate};
use crate::types::{AdminBoundary, ConflictEvent, ContextualizedEvent, FlashError, FlashResult};
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Administrative contextualization settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    pub predicate: SpatialPredicate,
}

/// Per-level match counts of a contextualization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextReport {
    pub input: usize,
    pub urban: usize,
    pub regional: usize,
    pub dropped: usize,
}

/// Events enriched with their smallest enclosing boundary
#[derive(Debug, Clone)]
pub struct Contextualization {
    /// Urban matches first, then regional
    pub events: Vec<ContextualizedEvent>,
    /// Events no boundary level could claim
    pub dropped: Vec<ConflictEvent>,
    pub report: ContextReport,
}

/// Attributes conflict events to the finest administrative boundary enclosing them
pub struct Contextualizer<'a> {
    hierarchy: &'a AdminHierarchy,
    config: ContextConfig,
}

impl<'a> Contextualizer<'a> {
    pub fn new(hierarchy: &'a AdminHierarchy) -> Self {
        Self {
            hierarchy,
            config: ContextConfig::default(),
        }
    }

    pub fn with_config(hierarchy: &'a AdminHierarchy, config: ContextConfig) -> Self {
        Self { hierarchy, config }
    }

    /// Identify the smallest administrative division bounding each event.
    ///
    /// Urban boundaries are tried first; only events they do not claim are
    /// offered to the regional layer. Events outside both are dropped and
    /// counted. Overlapping reference polygons surface as a
    /// [`FlashError::JoinCardinality`] rather than duplicated events.
    pub fn contextualize(&self, events: Vec<ConflictEvent>) -> FlashResult<Contextualization> {
        let input = events.len();
        let predicate = self.config.predicate;
        log::info!("Contextualizing {} events ({:?})", input, predicate);

        log::info!("Correlating events to city-level boundaries...");
        let (urban_events, residual) = partition_by_layer(events, &self.hierarchy.urban, predicate);

        log::info!("Correlating events to suburban and rural boundaries...");
        let (regional_events, dropped) =
            partition_by_layer(residual, &self.hierarchy.regional, predicate);

        if !dropped.is_empty() {
            log::warn!(
                "Dropping {} events with no enclosing administrative boundary",
                dropped.len()
            );
        }

        log::info!("Joining urban and rural events to associated administrative boundaries...");
        let urban = join_boundaries_to_events(&self.hierarchy.urban, urban_events, predicate)?;
        let regional = join_boundaries_to_events(&self.hierarchy.regional, regional_events, predicate)?;

        let report = ContextReport {
            input,
            urban: urban.len(),
            regional: regional.len(),
            dropped: dropped.len(),
        };

        let mut contextualized = urban;
        contextualized.extend(regional);

        if contextualized.len() != input - dropped.len() {
            return Err(FlashError::JoinCardinality {
                stage: "event concatenation".to_string(),
                expected: input - dropped.len(),
                actual: contextualized.len(),
            });
        }

        log::info!(
            "Spatial join on events complete: {} urban, {} regional, {} dropped",
            report.urban,
            report.regional,
            report.dropped
        );

        Ok(Contextualization {
            events: contextualized,
            dropped,
            report,
        })
    }
}

/// Split events into those `layer` claims and the residual
fn partition_by_layer(
    events: Vec<ConflictEvent>,
    layer: &BoundaryLayer,
    predicate: SpatialPredicate,
) -> (Vec<ConflictEvent>, Vec<ConflictEvent>) {
    let (matched, residual): (Vec<_>, Vec<_>) = events
        .into_iter()
        .partition(|e| layer.covers(&e.location_point(), predicate));

    log::debug!(
        "{} layer matched {} events, {} left over",
        layer.level(),
        matched.len(),
        residual.len()
    );
    (matched, residual)
}

/// Inner join from the boundary side onto a matched event subset.
///
/// The result must be one-to-one with `events`: each event joined to exactly
/// one boundary. The event point is replaced by the boundary as geometry.
fn join_boundaries_to_events(
    layer: &BoundaryLayer,
    events: Vec<ConflictEvent>,
    predicate: SpatialPredicate,
) -> FlashResult<Vec<ContextualizedEvent>> {
    let stage = format!("{} boundary join", layer.level());

    let points = RTree::bulk_load(
        events
            .iter()
            .enumerate()
            .map(|(i, e)| GeomWithData::new([e.longitude, e.latitude], i))
            .collect(),
    );

    let mut assigned: Vec<Option<&Arc<AdminBoundary>>> = vec![None; events.len()];
    let mut rows = 0usize;

    for boundary in layer.boundaries() {
        let Some(bbox) = geo::BoundingRect::bounding_rect(&boundary.geometry) else {
            continue;
        };
        let envelope = AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]);

        for candidate in points.locate_in_envelope_intersecting(&envelope) {
            let event = &events[candidate.data];
            if !predicate.evaluate(&boundary.geometry, &event.location_point()) {
                continue;
            }
            rows += 1;
            if let Some(previous) = assigned[candidate.data] {
                log::error!(
                    "Event {} falls in both {} and {}",
                    event.event_id_cnty,
                    previous.pcode,
                    boundary.pcode
                );
            }
            assigned[candidate.data] = Some(boundary);
        }
    }

    if rows != events.len() {
        return Err(FlashError::JoinCardinality {
            stage,
            expected: events.len(),
            actual: rows,
        });
    }

    let joined = assigned.iter().filter(|b| b.is_some()).count();
    if joined != events.len() {
        return Err(FlashError::JoinCardinality {
            stage,
            expected: events.len(),
            actual: joined,
        });
    }

    Ok(events
        .into_iter()
        .zip(assigned)
        .filter_map(|(event, boundary)| {
            boundary.map(|b| ContextualizedEvent {
                event,
                boundary: Arc::clone(b),
            })
        })
        .collect())
}
