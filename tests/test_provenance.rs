use flashpoints::core::{column_lineage, ColumnSource, ProcessingMetadata, ProvenanceRecorder};
use std::collections::BTreeMap;

#[test]
fn test_save_and_reload_json() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("provenance.json");

    let mut recorder = ProvenanceRecorder::new("ua-build");
    recorder.record_step(
        "temporal_window",
        chrono::Utc::now(),
        (120, 100, 20),
        BTreeMap::new(),
        Vec::new(),
    );
    recorder.save_to_file(&path, "JSON").expect("Failed to save provenance");

    let text = std::fs::read_to_string(&path).unwrap();
    let metadata: ProcessingMetadata = serde_json::from_str(&text).unwrap();

    assert_eq!(metadata.processing_id, "ua-build");
    assert_eq!(metadata.processing_history.len(), 1);
    assert_eq!(metadata.processing_history[0].dropped_count, 20);
    assert_eq!(metadata.columns, column_lineage());
}

#[test]
fn test_lineage_covers_boundary_columns() {
    let boundary: Vec<String> = column_lineage()
        .into_iter()
        .filter(|c| c.source == ColumnSource::Boundary)
        .map(|c| c.column)
        .collect();

    assert!(boundary.contains(&"h_adm_en".to_string()));
    assert!(boundary.contains(&"h_adm_ua".to_string()));
    assert!(boundary.contains(&"h_adm_shape".to_string()));
}
