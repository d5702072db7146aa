//! Polygon editor: a pure reducer plus the wrapper that drives history.
//!
//! [`reduce`] maps `(EditorState, EditorAction)` to a [`Transition`] without
//! side effects. The transition says how history should treat it: most
//! actions just replace the polygon set, while starting a sketch opens a
//! history bracket and finishing or abandoning it closes the bracket. That
//! way a whole sketch (every vertex click and every preview move) becomes a
//! single undo entry, or none if it was abandoned.
//!
//! ```text
//! Idle ──start──▶ Adding ──close──▶ AwaitingConfirm ──confirm──▶ AttachingArea ──attach──▶ Idle
//!                   │                     │    ▲                        │
//!                 cancel               reject  └──────close panel───────┘
//!                   ▼                     ▼
//!                  Idle                  Idle
//! ```

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::consts::{CLOSE_HIT_RADIUS_PX, VERTEX_HIT_RADIUS_PX};
use crate::history::History;
use crate::polygon::{AreaId, AreaLink, Polygon, PolygonId, SaveReport, StoredPolygon, save_polygons};

/// What the editor is doing, and with which polygon (by index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "polygon", rename_all = "snake_case")]
pub enum EditorMode {
    #[default]
    Idle,
    /// Capturing vertices of a new polygon.
    Adding(usize),
    /// Loop closed; waiting for the operator to accept or reject the placement.
    AwaitingConfirm(usize),
    /// Placement accepted; the area panel is open.
    AttachingArea(usize),
}

impl EditorMode {
    /// Index of the polygon the mode is about, if any.
    #[must_use]
    pub fn active(self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Adding(i) | Self::AwaitingConfirm(i) | Self::AttachingArea(i) => Some(i),
        }
    }
}

/// One vertex of one polygon in the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRef {
    pub polygon: usize,
    pub vertex: usize,
}

/// Complete editor session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    pub polygons: Vec<Polygon>,
    pub mode: EditorMode,
    /// Vertex being dragged, if a drag bracket is open.
    pub drag: Option<VertexRef>,
}

/// Hit radii in logical units for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditContext {
    /// Radius around the first vertex that closes the loop.
    pub close_radius: f64,
    /// Radius for grabbing a finished polygon's vertex.
    pub vertex_radius: f64,
}

impl Default for EditContext {
    /// The pixel radii at one logical unit per pixel.
    fn default() -> Self {
        Self { close_radius: CLOSE_HIT_RADIUS_PX, vertex_radius: VERTEX_HIT_RADIUS_PX }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    StartPolygon { id: PolygonId },
    /// Append a vertex unconditionally.
    AddVertex(Point),
    UpdatePreview(Point),
    /// Close the loop if `Point` lands on the first vertex.
    TryClose(Point),
    /// A capture click: closes, appends, or is ignored.
    Click(Point),
    ConfirmPlacement,
    RejectPlacement,
    AttachArea(AreaLink),
    CloseAreaPanel,
    DeletePolygon(usize),
    BeginVertexDrag(VertexRef),
    DragVertex(VertexRef, Point),
    EndVertexDrag,
    /// Escape: back out of whatever is in progress.
    Cancel,
}

/// How history should treat a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEffect {
    /// Commit the new polygon set; records an entry unless a bracket is open.
    Commit,
    /// Open a bracket, then commit.
    Pause,
    /// Commit, then close the bracket.
    Resume,
}

/// Result of reducing one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EditorState,
    pub effect: HistoryEffect,
    /// `false` when the action does not apply in the current state; `state` is then unchanged.
    pub handled: bool,
}

impl Transition {
    fn commit(state: EditorState) -> Self {
        Self { state, effect: HistoryEffect::Commit, handled: true }
    }

    fn with(state: EditorState, effect: HistoryEffect) -> Self {
        Self { state, effect, handled: true }
    }

    fn ignored(state: EditorState) -> Self {
        Self { state, effect: HistoryEffect::Commit, handled: false }
    }
}

fn finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Pure editor transition.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn reduce(mut state: EditorState, action: &EditorAction, ctx: &EditContext) -> Transition {
    match (*action).clone() {
        EditorAction::StartPolygon { id } => {
            if state.mode != EditorMode::Idle || state.drag.is_some() {
                return Transition::ignored(state);
            }
            state.polygons.push(Polygon::new(id));
            state.mode = EditorMode::Adding(state.polygons.len() - 1);
            Transition::with(state, HistoryEffect::Pause)
        }

        EditorAction::AddVertex(p) => {
            let EditorMode::Adding(i) = state.mode else {
                return Transition::ignored(state);
            };
            if !finite(p) {
                return Transition::ignored(state);
            }
            let Some(polygon) = state.polygons.get_mut(i) else {
                return Transition::ignored(state);
            };
            polygon.push_vertex(p);
            Transition::commit(state)
        }

        EditorAction::UpdatePreview(p) => {
            let EditorMode::Adding(i) = state.mode else {
                return Transition::ignored(state);
            };
            match state.polygons.get_mut(i) {
                Some(polygon) if finite(p) => {
                    polygon.set_preview(p);
                    Transition::commit(state)
                }
                _ => Transition::ignored(state),
            }
        }

        EditorAction::TryClose(p) => {
            if close_active(&mut state, p, ctx) {
                Transition::commit(state)
            } else {
                Transition::ignored(state)
            }
        }

        EditorAction::Click(p) => {
            let EditorMode::Adding(i) = state.mode else {
                return Transition::ignored(state);
            };
            if !finite(p) {
                return Transition::ignored(state);
            }
            if close_active(&mut state, p, ctx) {
                return Transition::commit(state);
            }
            let Some(polygon) = state.polygons.get_mut(i) else {
                return Transition::ignored(state);
            };
            // Landing on an existing vertex without closing the loop is a no-op.
            if polygon.vertex_at(p, ctx.close_radius).is_some() {
                return Transition::ignored(state);
            }
            polygon.push_vertex(p);
            Transition::commit(state)
        }

        EditorAction::ConfirmPlacement => match state.mode {
            EditorMode::AwaitingConfirm(i) => {
                state.mode = EditorMode::AttachingArea(i);
                Transition::commit(state)
            }
            _ => Transition::ignored(state),
        },

        EditorAction::RejectPlacement => match state.mode {
            EditorMode::AwaitingConfirm(i) => abandon(state, i),
            _ => Transition::ignored(state),
        },

        EditorAction::AttachArea(link) => {
            let EditorMode::AttachingArea(i) = state.mode else {
                return Transition::ignored(state);
            };
            let Some(polygon) = state.polygons.get_mut(i) else {
                return Transition::ignored(state);
            };
            polygon.strip_preview();
            polygon.area = Some(link);
            state.mode = EditorMode::Idle;
            Transition::with(state, HistoryEffect::Resume)
        }

        EditorAction::CloseAreaPanel => match state.mode {
            EditorMode::AttachingArea(i) => {
                state.mode = EditorMode::AwaitingConfirm(i);
                Transition::commit(state)
            }
            _ => Transition::ignored(state),
        },

        EditorAction::DeletePolygon(index) => {
            if index >= state.polygons.len() || state.drag.is_some() {
                return Transition::ignored(state);
            }
            match state.mode.active() {
                Some(active) if active == index => abandon(state, index),
                // Another polygon would fold into the open sketch's history entry.
                Some(_) => Transition::ignored(state),
                None => {
                    state.polygons.remove(index);
                    Transition::commit(state)
                }
            }
        }

        EditorAction::BeginVertexDrag(at) => {
            if state.mode != EditorMode::Idle || state.drag.is_some() || !draggable(&state, at) {
                return Transition::ignored(state);
            }
            state.drag = Some(at);
            Transition::with(state, HistoryEffect::Pause)
        }

        EditorAction::DragVertex(at, p) => {
            if state.mode != EditorMode::Idle
                || !finite(p)
                || !draggable(&state, at)
                || state.drag.is_some_and(|d| d != at)
            {
                return Transition::ignored(state);
            }
            let moved = state.polygons.get_mut(at.polygon).is_some_and(|polygon| polygon.move_vertex(at.vertex, p));
            if moved { Transition::commit(state) } else { Transition::ignored(state) }
        }

        EditorAction::EndVertexDrag => {
            if state.drag.take().is_none() {
                return Transition::ignored(state);
            }
            Transition::with(state, HistoryEffect::Resume)
        }

        EditorAction::Cancel => match state.mode {
            EditorMode::Adding(i) | EditorMode::AwaitingConfirm(i) => abandon(state, i),
            EditorMode::AttachingArea(i) => {
                state.mode = EditorMode::AwaitingConfirm(i);
                Transition::commit(state)
            }
            EditorMode::Idle => Transition::ignored(state),
        },
    }
}

/// Finish the polygon being sketched if `p` lands on its first vertex and the
/// outline is closable. Leaves `state` untouched otherwise.
fn close_active(state: &mut EditorState, p: Point, ctx: &EditContext) -> bool {
    let EditorMode::Adding(i) = state.mode else {
        return false;
    };
    let Some(polygon) = state.polygons.get_mut(i) else {
        return false;
    };
    if !finite(p) || !polygon.hits_first_vertex(p, ctx.close_radius) || !polygon.is_closable() {
        return false;
    }
    polygon.strip_preview();
    polygon.is_finished = true;
    state.mode = EditorMode::AwaitingConfirm(i);
    true
}

/// Drop the sketch at `index` and close its history bracket.
fn abandon(mut state: EditorState, index: usize) -> Transition {
    if index < state.polygons.len() {
        state.polygons.remove(index);
    }
    state.mode = EditorMode::Idle;
    Transition::with(state, HistoryEffect::Resume)
}

fn draggable(state: &EditorState, at: VertexRef) -> bool {
    state.polygons.get(at.polygon).is_some_and(|p| p.is_finished && at.vertex < p.vertices.len())
}

// =============================================================================
// Editor
// =============================================================================

/// Editor session: reducer state plus undo/redo over the polygon set.
#[derive(Debug, Clone)]
pub struct Editor {
    history: History<Vec<Polygon>>,
    mode: EditorMode,
    drag: Option<VertexRef>,
    /// Last previewed pointer position.
    pointer: Option<Point>,
    ctx: EditContext,
    /// Open brackets opened through [`Editor::pause`].
    host_pauses: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: History::new(Vec::new()),
            mode: EditorMode::Idle,
            drag: None,
            pointer: None,
            ctx: EditContext::default(),
            host_pauses: 0,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn polygons(&self) -> &[Polygon] {
        self.history.present()
    }

    #[must_use]
    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    #[must_use]
    pub fn dragging(&self) -> Option<VertexRef> {
        self.drag
    }

    #[must_use]
    pub fn history(&self) -> &History<Vec<Polygon>> {
        &self.history
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        EditorState { polygons: self.history.present().clone(), mode: self.mode, drag: self.drag }
    }

    #[must_use]
    pub fn context(&self) -> EditContext {
        self.ctx
    }

    /// Hit radii in logical units; the engine refreshes these as the zoom changes.
    pub fn set_context(&mut self, ctx: EditContext) {
        self.ctx = ctx;
    }

    /// Grabbable vertex of a finished polygon near `p`; earlier polygons win.
    #[must_use]
    pub fn vertex_hit(&self, p: Point) -> Option<VertexRef> {
        self.polygons().iter().enumerate().filter(|(_, polygon)| polygon.is_finished).find_map(|(i, polygon)| {
            polygon.vertex_at(p, self.ctx.vertex_radius).map(|vertex| VertexRef { polygon: i, vertex })
        })
    }

    // --- Operations ---

    /// Run `action` through the reducer and apply its history effect.
    pub fn apply(&mut self, action: &EditorAction) -> bool {
        let before = self.mode;
        let transition = reduce(self.state(), action, &self.ctx);
        if !transition.handled {
            return false;
        }
        let Transition { state, effect, .. } = transition;
        match effect {
            HistoryEffect::Commit => self.history.set(state.polygons),
            HistoryEffect::Pause => {
                self.history.pause();
                self.history.set(state.polygons);
            }
            HistoryEffect::Resume => {
                self.history.set(state.polygons);
                self.history.resume();
            }
        }
        self.mode = state.mode;
        self.drag = state.drag;
        if self.mode != before {
            tracing::debug!(from = ?before, to = ?self.mode, "editor mode changed");
        }
        true
    }

    /// Begin a new sketch. Returns its id, or `None` if another edit is in progress.
    pub fn start_polygon(&mut self) -> Option<PolygonId> {
        let id = Uuid::new_v4();
        self.apply(&EditorAction::StartPolygon { id }).then_some(id)
    }

    pub fn add_vertex(&mut self, p: Point) -> bool {
        self.apply(&EditorAction::AddVertex(p))
    }

    pub fn update_preview_vertex(&mut self, p: Point) -> bool {
        let applied = self.apply(&EditorAction::UpdatePreview(p));
        if applied {
            self.pointer = Some(p);
        }
        applied
    }

    /// Close the sketch if the last previewed pointer position is on its first vertex.
    pub fn try_close_polygon(&mut self) -> bool {
        match self.pointer {
            Some(p) => self.apply(&EditorAction::TryClose(p)),
            None => false,
        }
    }

    /// Capture click in logical space.
    pub fn click(&mut self, p: Point) -> bool {
        self.pointer = Some(p);
        self.apply(&EditorAction::Click(p))
    }

    pub fn confirm_placement(&mut self) -> bool {
        self.apply(&EditorAction::ConfirmPlacement)
    }

    pub fn reject_placement(&mut self) -> bool {
        self.apply(&EditorAction::RejectPlacement)
    }

    pub fn attach_area(&mut self, id: AreaId, name: impl Into<String>) -> bool {
        self.apply(&EditorAction::AttachArea(AreaLink { id, name: name.into() }))
    }

    pub fn close_area_panel(&mut self) -> bool {
        self.apply(&EditorAction::CloseAreaPanel)
    }

    pub fn cancel(&mut self) -> bool {
        self.apply(&EditorAction::Cancel)
    }

    pub fn delete_polygon(&mut self, index: usize) -> bool {
        self.apply(&EditorAction::DeletePolygon(index))
    }

    pub fn begin_vertex_drag(&mut self, polygon: usize, vertex: usize) -> bool {
        self.apply(&EditorAction::BeginVertexDrag(VertexRef { polygon, vertex }))
    }

    /// Move one vertex. Outside a drag bracket this is its own undo step.
    /// Refused while a sketch, prompt, or panel is open.
    pub fn drag_vertex(&mut self, polygon: usize, vertex: usize, p: Point) -> bool {
        self.apply(&EditorAction::DragVertex(VertexRef { polygon, vertex }, p))
    }

    pub fn end_vertex_drag(&mut self) -> bool {
        self.apply(&EditorAction::EndVertexDrag)
    }

    // --- History ---

    /// Open a bracket for a bulk change driven by the host. Everything up to
    /// the matching [`resume`](Self::resume) records at most one entry.
    pub fn pause(&mut self) {
        self.host_pauses += 1;
        self.history.pause();
    }

    /// Close a bracket opened with [`pause`](Self::pause). Returns whether an
    /// entry was recorded. Never closes a bracket the editor opened itself.
    pub fn resume(&mut self) -> bool {
        if self.host_pauses == 0 {
            return false;
        }
        self.host_pauses -= 1;
        self.history.resume()
    }

    /// Undo is only offered with no panel, prompt, or sketch open.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.mode == EditorMode::Idle && self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.mode == EditorMode::Idle && self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.can_undo() && self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.can_redo() && self.history.redo()
    }

    // --- Persistence boundary ---

    /// Replace the working set with polygons from the data layer. Not undoable.
    pub fn load_polygons(&mut self, stored: &[StoredPolygon]) {
        let polygons: Vec<Polygon> = stored.iter().map(Polygon::from_stored).collect();
        tracing::info!(count = polygons.len(), "polygons loaded");
        self.history.reset(polygons);
        self.mode = EditorMode::Idle;
        self.drag = None;
        self.pointer = None;
        self.host_pauses = 0;
    }

    /// Finished, area-linked polygons for persistence, plus what was left out.
    #[must_use]
    pub fn save(&self) -> SaveReport {
        let report = save_polygons(self.polygons());
        tracing::info!(saved = report.polygons.len(), excluded = report.excluded.len(), "save report produced");
        report
    }
}
