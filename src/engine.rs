//! One map session: viewport, markers, clustering, and the polygon editor.
//!
//! `EngineCore` turns raw host input (pointer, wheel, touch, keys) into state
//! changes and hands back a list of [`Action`]s for the host to act on. It
//! holds no browser types, so everything here runs in plain unit tests; the
//! wasm facade lives in [`crate::bindings`].

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::Serialize;

use crate::camera::{Camera, ImageFit, Point, Size, screen_dist_to_logical, to_logical};
use crate::cluster::{ClusterGroup, MarkerId, PointMarker, compute_clusters, declustering_zoom};
use crate::config::MapConfig;
use crate::consts::CLICK_SLOP_PX;
use crate::editor::{EditContext, Editor, EditorMode};
use crate::error::MapError;
use crate::input::{Button, Gesture, Key, MapMode, Modifiers, TouchPoint, WheelDelta};
use crate::polygon::{AreaId, Polygon, PolygonId, SaveReport, StoredPolygon};
use crate::viewport::{ViewportController, ViewportState};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    RenderNeeded,
    SetCursor { cursor: String },
    MarkerSelected { id: MarkerId, payload: serde_json::Value },
    ClusterExpanding { members: usize, zoom: f64 },
    PlacementPromptOpened { polygon: PolygonId },
    AreaPanelOpened { polygon: PolygonId },
    AreaPanelClosed { polygon: PolygonId },
    PolygonCompleted { polygon: PolygonId, area_id: AreaId },
    PolygonRemoved { polygon: PolygonId },
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// Non-blocking message for the operator.
    Notice { message: String },
    ImageUnavailable { code: String, message: String },
}

/// Everything the host needs to draw one frame, derived from one committed camera.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub camera: Camera,
    pub fit: ImageFit,
    /// Visual scale applied to every marker.
    pub marker_scale: f64,
    pub clusters: Vec<ClusterGroup>,
    pub polygons: Vec<Polygon>,
    pub editor: EditorMode,
    pub can_undo: bool,
    pub can_redo: bool,
    pub animating: bool,
}

/// Core engine state: all logic that doesn't depend on the browser.
#[derive(Debug, Clone)]
pub struct EngineCore {
    pub viewport: ViewportController,
    pub markers: Vec<PointMarker>,
    pub editor: Editor,
    pub mode: MapMode,
    pub gesture: Gesture,
    /// Touches currently down, as last reported by the host.
    pub touches: Vec<TouchPoint>,
    cursor: &'static str,
    config: MapConfig,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        Self {
            viewport: ViewportController::new(&config),
            markers: Vec::new(),
            editor: Editor::new(),
            mode: MapMode::Browse,
            gesture: Gesture::Idle,
            touches: Vec::new(),
            cursor: "default",
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    // --- Layout ---

    /// Container resized (CSS pixels).
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport.resize(width, height);
        self.gesture = Gesture::Idle;
        vec![Action::RenderNeeded]
    }

    /// Base image loaded; its logical extent is `width` x `height`.
    pub fn set_image_size(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport.set_image(Size::new(width, height));
        vec![Action::RenderNeeded]
    }

    /// Base image failed to load. Geometry stays inspectable on a fallback canvas.
    pub fn image_failed(&mut self, reason: &str) -> Vec<Action> {
        let err = MapError::ImageUnavailable(reason.to_owned());
        tracing::warn!(error = %err, code = err.error_code(), "falling back to empty canvas");
        self.viewport.image_failed();
        vec![Action::ImageUnavailable { code: err.error_code().to_owned(), message: err.to_string() }, Action::RenderNeeded]
    }

    /// Switch between marker browsing and polygon editing.
    ///
    /// Leaving edit mode abandons any sketch in progress.
    pub fn set_mode(&mut self, mode: MapMode) -> Vec<Action> {
        if mode == self.mode {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if mode == MapMode::Browse {
            self.abort_gesture();
            while self.editor.mode() != EditorMode::Idle {
                let active = self.active_polygon_id();
                if !self.editor.cancel() {
                    break;
                }
                if let (Some(polygon), EditorMode::Idle) = (active, self.editor.mode()) {
                    actions.push(Action::PolygonRemoved { polygon });
                }
            }
        }
        self.mode = mode;
        tracing::info!(mode = ?mode, "map mode changed");
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Markers ---

    /// Replace the marker set.
    pub fn load_markers(&mut self, markers: Vec<PointMarker>) -> Vec<Action> {
        tracing::info!(count = markers.len(), "markers loaded");
        self.markers = markers;
        vec![Action::RenderNeeded]
    }

    /// Move one marker to a new logical position. Returns whether it exists.
    pub fn move_marker(&mut self, id: MarkerId, to: Point) -> bool {
        if !to.x.is_finite() || !to.y.is_finite() {
            return false;
        }
        match self.markers.iter_mut().find(|m| m.id == id) {
            Some(marker) => {
                marker.x = to.x;
                marker.y = to.y;
                true
            }
            None => false,
        }
    }

    /// Cluster groups for the current committed zoom.
    #[must_use]
    pub fn clusters(&self) -> Vec<ClusterGroup> {
        compute_clusters(&self.markers, self.viewport.marker_scale())
    }

    /// Snapshot for drawing; camera, marker scale, and clusters agree.
    #[must_use]
    pub fn frame(&self) -> RenderFrame {
        RenderFrame {
            camera: self.viewport.camera(),
            fit: self.viewport.fit(),
            marker_scale: self.viewport.marker_scale(),
            clusters: self.clusters(),
            polygons: self.editor.polygons().to_vec(),
            editor: self.editor.mode(),
            can_undo: self.editor.can_undo(),
            can_redo: self.editor.can_redo(),
            animating: self.viewport.is_animating(),
        }
    }

    /// Animate toward a zoom at which `group` falls apart.
    pub fn expand_cluster(&mut self, group: &ClusterGroup) -> Vec<Action> {
        let ClusterGroup::Merged { members, centroid, .. } = group else {
            return Vec::new();
        };
        let (_, max_scale) = self.viewport.scale_bounds();
        let zoom = match declustering_zoom(group, self.viewport.marker_constant(), self.config.decluster_headroom) {
            Some(zoom) if zoom <= max_scale => zoom,
            Some(zoom) => {
                tracing::warn!(needed = zoom, max_scale, "cluster stays merged at max scale");
                max_scale
            }
            None => {
                tracing::warn!(members = members.len(), "stacked markers cannot be separated");
                max_scale
            }
        };
        let world = self.viewport.fit().logical_to_fitted(*centroid);
        self.viewport.zoom_to(world, zoom);
        vec![Action::ClusterExpanding { members: members.len(), zoom }, Action::RenderNeeded]
    }

    // --- Polygon editing ---

    /// Replace the working polygon set (entering edit mode for a field map).
    pub fn load_polygons(&mut self, stored: &[StoredPolygon]) -> Vec<Action> {
        self.abort_gesture();
        self.editor.load_polygons(stored);
        vec![self.history_action(), Action::RenderNeeded]
    }

    pub fn start_polygon(&mut self) -> Vec<Action> {
        if self.mode != MapMode::Edit || self.editor.start_polygon().is_none() {
            return Vec::new();
        }
        let mut actions = self.cursor_actions("crosshair");
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn confirm_placement(&mut self) -> Vec<Action> {
        if !self.editor.confirm_placement() {
            return Vec::new();
        }
        match self.active_polygon_id() {
            Some(polygon) => vec![Action::AreaPanelOpened { polygon }, Action::RenderNeeded],
            None => vec![Action::RenderNeeded],
        }
    }

    pub fn reject_placement(&mut self) -> Vec<Action> {
        let active = self.active_polygon_id();
        if !self.editor.reject_placement() {
            return Vec::new();
        }
        self.removed(active)
    }

    pub fn attach_area(&mut self, id: AreaId, name: &str) -> Vec<Action> {
        let active = self.active_polygon_id();
        if !self.editor.attach_area(id, name) {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if let Some(polygon) = active {
            actions.push(Action::AreaPanelClosed { polygon });
            actions.push(Action::PolygonCompleted { polygon, area_id: id });
        }
        actions.push(self.history_action());
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn close_area_panel(&mut self) -> Vec<Action> {
        let active = self.active_polygon_id();
        if !self.editor.close_area_panel() {
            return Vec::new();
        }
        match active {
            Some(polygon) => vec![Action::AreaPanelClosed { polygon }, Action::RenderNeeded],
            None => vec![Action::RenderNeeded],
        }
    }

    pub fn delete_polygon(&mut self, index: usize) -> Vec<Action> {
        let id = self.editor.polygons().get(index).map(|p| p.id);
        if !self.editor.delete_polygon(index) {
            return Vec::new();
        }
        self.removed(id)
    }

    pub fn undo(&mut self) -> Vec<Action> {
        if !self.editor.undo() {
            return Vec::new();
        }
        vec![self.history_action(), Action::RenderNeeded]
    }

    pub fn redo(&mut self) -> Vec<Action> {
        if !self.editor.redo() {
            return Vec::new();
        }
        vec![self.history_action(), Action::RenderNeeded]
    }

    /// Open a host bracket; edits until [`resume_history`](Self::resume_history) collapse into one entry.
    pub fn pause_history(&mut self) -> Vec<Action> {
        self.editor.pause();
        vec![self.history_action()]
    }

    pub fn resume_history(&mut self) -> Vec<Action> {
        if self.editor.resume() {
            tracing::debug!("host bracket recorded");
        }
        vec![self.history_action()]
    }

    /// Polygons ready for persistence. Excluded ones come back as notices.
    pub fn save(&mut self) -> (SaveReport, Vec<Action>) {
        let report = self.editor.save();
        let actions = report
            .excluded
            .iter()
            .map(|e| Action::Notice { message: format!("polygon {} not saved: {:?}", e.id, e.reason) })
            .collect();
        (report, actions)
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary || self.touches.len() >= 2 {
            return Vec::new();
        }
        self.sync_hit_radii();
        self.viewport.begin_pan(screen);
        let grab = match self.mode {
            MapMode::Edit => self.editor.vertex_hit(self.logical_at(screen)),
            MapMode::Browse => None,
        };
        self.gesture = match grab {
            Some(at) => Gesture::PressedOnVertex { origin: screen, polygon: at.polygon, vertex: at.vertex },
            None => Gesture::Pressed { origin: screen },
        };
        Vec::new()
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        self.sync_hit_radii();
        match self.gesture {
            Gesture::DraggingVertex { polygon, vertex } => {
                if self.editor.drag_vertex(polygon, vertex, self.logical_at(screen)) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            Gesture::PressedOnVertex { origin, polygon, vertex } => {
                if origin.distance(screen) <= CLICK_SLOP_PX {
                    return Vec::new();
                }
                if !self.editor.begin_vertex_drag(polygon, vertex) {
                    return self.start_panning(screen);
                }
                self.viewport.end_pan();
                self.gesture = Gesture::DraggingVertex { polygon, vertex };
                let mut actions = self.cursor_actions("grabbing");
                if self.editor.drag_vertex(polygon, vertex, self.logical_at(screen)) {
                    actions.push(Action::RenderNeeded);
                }
                actions
            }
            Gesture::Pressed { origin } => {
                if origin.distance(screen) <= CLICK_SLOP_PX {
                    return Vec::new();
                }
                self.start_panning(screen)
            }
            Gesture::Panning => {
                if self.viewport.pan_to(screen) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            Gesture::Idle => self.hover(screen),
        }
    }

    pub fn on_pointer_up(&mut self, screen: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        self.sync_hit_radii();
        match std::mem::take(&mut self.gesture) {
            Gesture::DraggingVertex { .. } => {
                self.editor.end_vertex_drag();
                let mut actions = vec![self.history_action(), Action::RenderNeeded];
                actions.extend(self.hover(screen));
                actions
            }
            Gesture::Pressed { .. } | Gesture::PressedOnVertex { .. } => {
                self.viewport.end_pan();
                self.click(screen)
            }
            Gesture::Panning => {
                self.viewport.end_pan();
                self.hover(screen)
            }
            Gesture::Idle => Vec::new(),
        }
    }

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if self.viewport.on_wheel(screen, delta.dy) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Touches went down; `touches` lists every contact now on the surface.
    pub fn on_touch_start(&mut self, touches: &[TouchPoint]) -> Vec<Action> {
        self.touches = touches.to_vec();
        match touches {
            [a, b, ..] => {
                self.abort_gesture();
                self.viewport.begin_pinch(a.point(), b.point());
                Vec::new()
            }
            [only] => self.on_pointer_down(only.point(), Button::Primary, Modifiers::default()),
            [] => Vec::new(),
        }
    }

    pub fn on_touch_move(&mut self, touches: &[TouchPoint]) -> Vec<Action> {
        self.touches = touches.to_vec();
        match touches {
            [a, b, ..] => {
                if self.viewport.pinch_to(a.point(), b.point()) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            [only] if !self.is_pinching() => self.on_pointer_move(only.point(), Modifiers::default()),
            _ => Vec::new(),
        }
    }

    /// Touches lifted; `remaining` lists the contacts still down.
    pub fn on_touch_end(&mut self, remaining: &[TouchPoint]) -> Vec<Action> {
        let last = self.touches.first().map(|t| t.point());
        self.touches = remaining.to_vec();
        if self.is_pinching() {
            if remaining.len() < 2 {
                self.viewport.end_pinch();
            }
            return Vec::new();
        }
        match (remaining, last) {
            ([], Some(at)) => self.on_pointer_up(at, Button::Primary, Modifiers::default()),
            _ => Vec::new(),
        }
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() && key.is("z") {
            return if modifiers.shift { self.redo() } else { self.undo() };
        }
        if modifiers.command() && key.is("y") {
            return self.redo();
        }
        if key.is("Enter") {
            return self.confirm_placement();
        }
        if key.is("Escape") {
            if self.viewport.cancel_animation() {
                return vec![Action::RenderNeeded];
            }
            return match self.editor.mode() {
                EditorMode::AttachingArea(_) => self.close_area_panel(),
                EditorMode::AwaitingConfirm(_) => self.reject_placement(),
                EditorMode::Adding(_) => {
                    let active = self.active_polygon_id();
                    if self.editor.cancel() { self.removed(active) } else { Vec::new() }
                }
                EditorMode::Idle => Vec::new(),
            };
        }
        Vec::new()
    }

    /// Advance animations by `dt_ms`.
    pub fn tick(&mut self, dt_ms: f64) -> Vec<Action> {
        if self.viewport.tick(dt_ms) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    // --- Internals ---

    fn logical_at(&self, screen: Point) -> Point {
        to_logical(screen, &self.viewport.fit(), &self.viewport.camera())
    }

    /// Convert the pixel hit radii to logical units at the current zoom.
    fn sync_hit_radii(&mut self) {
        let fit = self.viewport.fit();
        let camera = self.viewport.camera();
        self.editor.set_context(EditContext {
            close_radius: screen_dist_to_logical(self.config.close_hit_radius_px, &fit, &camera),
            vertex_radius: screen_dist_to_logical(self.config.vertex_hit_radius_px, &fit, &camera),
        });
    }

    /// The press left the click slop without grabbing anything: drag the map.
    fn start_panning(&mut self, screen: Point) -> Vec<Action> {
        self.gesture = Gesture::Panning;
        let mut actions = self.cursor_actions("grabbing");
        if self.viewport.pan_to(screen) {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    fn is_pinching(&self) -> bool {
        matches!(self.viewport.state(), ViewportState::PinchZooming { .. })
    }

    /// Drop whatever the pointer was doing without treating it as a click.
    fn abort_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::DraggingVertex { .. } => {
                self.editor.end_vertex_drag();
            }
            Gesture::Pressed { .. } | Gesture::PressedOnVertex { .. } | Gesture::Panning => self.viewport.end_pan(),
            Gesture::Idle => {}
        }
    }

    fn click(&mut self, screen: Point) -> Vec<Action> {
        let logical = self.logical_at(screen);
        match self.mode {
            MapMode::Edit => {
                if !matches!(self.editor.mode(), EditorMode::Adding(_)) || !self.editor.click(logical) {
                    return Vec::new();
                }
                match (self.editor.mode(), self.active_polygon_id()) {
                    (EditorMode::AwaitingConfirm(_), Some(polygon)) => {
                        vec![Action::PlacementPromptOpened { polygon }, Action::RenderNeeded]
                    }
                    _ => vec![Action::RenderNeeded],
                }
            }
            MapMode::Browse => {
                let scale = self.viewport.marker_scale();
                let hit = self.clusters().into_iter().rev().find(|g| g.hit_bounds(scale).contains(logical));
                match hit {
                    Some(ClusterGroup::Single { marker }) => {
                        tracing::debug!(marker = %marker.id, "marker selected");
                        vec![Action::MarkerSelected { id: marker.id, payload: marker.payload }]
                    }
                    Some(group) => self.expand_cluster(&group),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Preview and cursor feedback while no button is held.
    fn hover(&mut self, screen: Point) -> Vec<Action> {
        let logical = self.logical_at(screen);
        let mut actions = Vec::new();
        let cursor = match self.mode {
            MapMode::Edit => {
                if matches!(self.editor.mode(), EditorMode::Adding(_)) && self.editor.update_preview_vertex(logical) {
                    actions.push(Action::RenderNeeded);
                }
                if self.editor.vertex_hit(logical).is_some() {
                    "grab"
                } else if matches!(self.editor.mode(), EditorMode::Adding(_)) {
                    "crosshair"
                } else {
                    "default"
                }
            }
            MapMode::Browse => {
                let scale = self.viewport.marker_scale();
                if self.clusters().iter().any(|g| g.hit_bounds(scale).contains(logical)) { "pointer" } else { "default" }
            }
        };
        actions.extend(self.cursor_actions(cursor));
        actions
    }

    fn cursor_actions(&mut self, cursor: &'static str) -> Vec<Action> {
        if self.cursor == cursor {
            return Vec::new();
        }
        self.cursor = cursor;
        vec![Action::SetCursor { cursor: cursor.to_owned() }]
    }

    fn active_polygon_id(&self) -> Option<PolygonId> {
        self.editor.mode().active().and_then(|i| self.editor.polygons().get(i)).map(|p| p.id)
    }

    fn removed(&mut self, polygon: Option<PolygonId>) -> Vec<Action> {
        let mut actions: Vec<Action> = polygon.into_iter().map(|polygon| Action::PolygonRemoved { polygon }).collect();
        actions.push(self.history_action());
        actions.extend(self.cursor_actions("default"));
        actions.push(Action::RenderNeeded);
        actions
    }

    fn history_action(&self) -> Action {
        Action::HistoryChanged { can_undo: self.editor.can_undo(), can_redo: self.editor.can_redo() }
    }
}
