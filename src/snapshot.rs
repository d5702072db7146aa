//! JSON boundary with the data layer.
//!
//! Markers and stored polygons arrive as JSON arrays; save reports leave as
//! JSON. Editor scripts are a list of [`ScriptStep`]s used by the CLI to
//! replay an editing session offline.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::cluster::PointMarker;
use crate::editor::Editor;
use crate::error::MapError;
use crate::polygon::{AreaId, SaveReport, StoredPolygon};

/// Decode a marker snapshot.
///
/// # Errors
///
/// Returns [`MapError::Snapshot`] when `json` is not an array of markers.
pub fn decode_markers(json: &str) -> Result<Vec<PointMarker>, MapError> {
    Ok(serde_json::from_str(json)?)
}

/// Decode the stored polygons of one field map.
///
/// # Errors
///
/// Returns [`MapError::Snapshot`] when `json` is not an array of stored polygons.
pub fn decode_polygons(json: &str) -> Result<Vec<StoredPolygon>, MapError> {
    Ok(serde_json::from_str(json)?)
}

/// Encode a save report for the persistence layer.
///
/// # Errors
///
/// Returns [`MapError::Snapshot`] if serialization fails.
pub fn encode_report(report: &SaveReport) -> Result<String, MapError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// One step of an editor script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    StartPolygon,
    Click { x: f64, y: f64 },
    AddVertex { x: f64, y: f64 },
    Preview { x: f64, y: f64 },
    TryClose,
    Confirm,
    Reject,
    AttachArea { id: AreaId, name: String },
    ClosePanel,
    Cancel,
    Delete { index: usize },
    DragVertex { polygon: usize, vertex: usize, x: f64, y: f64 },
    Undo,
    Redo,
}

/// Decode an editor script.
///
/// # Errors
///
/// Returns [`MapError::Snapshot`] when `json` is not an array of steps.
pub fn decode_script(json: &str) -> Result<Vec<ScriptStep>, MapError> {
    Ok(serde_json::from_str(json)?)
}

/// Counts from a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub ignored: usize,
}

/// Run `steps` against `editor`. Steps that do not apply are counted, not fatal.
pub fn replay(editor: &mut Editor, steps: &[ScriptStep]) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (index, step) in steps.iter().enumerate() {
        if apply_step(editor, step) {
            summary.applied += 1;
        } else {
            summary.ignored += 1;
            tracing::debug!(index, ?step, "script step ignored");
        }
    }
    summary
}

fn apply_step(editor: &mut Editor, step: &ScriptStep) -> bool {
    match step {
        ScriptStep::StartPolygon => editor.start_polygon().is_some(),
        ScriptStep::Click { x, y } => editor.click(Point::new(*x, *y)),
        ScriptStep::AddVertex { x, y } => editor.add_vertex(Point::new(*x, *y)),
        ScriptStep::Preview { x, y } => editor.update_preview_vertex(Point::new(*x, *y)),
        ScriptStep::TryClose => editor.try_close_polygon(),
        ScriptStep::Confirm => editor.confirm_placement(),
        ScriptStep::Reject => editor.reject_placement(),
        ScriptStep::AttachArea { id, name } => editor.attach_area(*id, name.as_str()),
        ScriptStep::ClosePanel => editor.close_area_panel(),
        ScriptStep::Cancel => editor.cancel(),
        ScriptStep::Delete { index } => editor.delete_polygon(*index),
        ScriptStep::DragVertex { polygon, vertex, x, y } => editor.drag_vertex(*polygon, *vertex, Point::new(*x, *y)),
        ScriptStep::Undo => editor.undo(),
        ScriptStep::Redo => editor.redo(),
    }
}
