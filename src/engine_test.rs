#![allow(clippy::float_cmp)]

use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::camera::to_viewport;
use crate::polygon::AreaLink;

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// 800x600 tablet viewport over a 100x100 logical image (6 px per logical unit).
fn core() -> EngineCore {
    let mut core = EngineCore::default();
    core.set_viewport(800.0, 600.0);
    core.set_image_size(100.0, 100.0);
    core
}

fn screen_of(core: &EngineCore, x: f64, y: f64) -> Point {
    to_viewport(pt(x, y), &core.viewport.fit(), &core.viewport.camera())
}

fn click_logical(core: &mut EngineCore, x: f64, y: f64) -> Vec<Action> {
    let at = screen_of(core, x, y);
    let mut actions = core.on_pointer_down(at, Button::Primary, Modifiers::default());
    actions.extend(core.on_pointer_up(at, Button::Primary, Modifiers::default()));
    actions
}

fn marker(x: f64, y: f64, size: f64) -> PointMarker {
    PointMarker { id: Uuid::new_v4(), x, y, width: size, height: size, payload: json!({ "company": "acme" }) }
}

fn stored_square() -> StoredPolygon {
    StoredPolygon {
        id: Uuid::new_v4(),
        area: Some(AreaLink { id: 1, name: "South".into() }),
        points: vec![pt(10.0, 10.0), pt(90.0, 10.0), pt(90.0, 90.0), pt(10.0, 90.0)],
    }
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Modifiers::default() }
}

/// Edit mode with a triangle sketched and closed, placement prompt open.
fn closed_triangle() -> EngineCore {
    let mut core = core();
    core.set_mode(MapMode::Edit);
    core.start_polygon();
    click_logical(&mut core, 0.0, 0.0);
    click_logical(&mut core, 10.0, 0.0);
    click_logical(&mut core, 10.0, 10.0);
    let actions = click_logical(&mut core, 0.3, 0.2);
    assert!(matches!(actions[0], Action::PlacementPromptOpened { .. }));
    core
}

// =============================================================
// Polygon editing
// =============================================================

#[test]
fn pointer_clicks_sketch_and_close_triangle() {
    let core = closed_triangle();
    assert_eq!(core.editor.mode(), EditorMode::AwaitingConfirm(0));
    let polygon = &core.editor.polygons()[0];
    assert_eq!(polygon.vertices.len(), 3);
    assert!(polygon.is_finished);
    assert!(approx_eq(polygon.vertices[1].x, 10.0));
    assert!(approx_eq(polygon.vertices[1].y, 0.0));
}

#[test]
fn enter_then_attach_completes_polygon() {
    let mut core = closed_triangle();
    let id = core.editor.polygons()[0].id;

    let actions = core.on_key_down(&Key("Enter".into()), Modifiers::default());
    assert_eq!(actions[0], Action::AreaPanelOpened { polygon: id });

    let actions = core.attach_area(9, "Block 9");
    assert!(actions.contains(&Action::PolygonCompleted { polygon: id, area_id: 9 }));
    assert!(actions.contains(&Action::HistoryChanged { can_undo: true, can_redo: false }));

    let (report, notices) = core.save();
    assert_eq!(report.polygons.len(), 1);
    assert_eq!(report.polygons[0].area_id, 9);
    assert!(notices.is_empty());
}

#[test]
fn escape_rejects_placement() {
    let mut core = closed_triangle();
    let id = core.editor.polygons()[0].id;
    let actions = core.on_key_down(&Key("Escape".into()), Modifiers::default());
    assert_eq!(actions[0], Action::PolygonRemoved { polygon: id });
    assert!(core.editor.polygons().is_empty());
    assert!(!core.editor.can_undo());
}

#[test]
fn escape_in_area_panel_closes_panel_only() {
    let mut core = closed_triangle();
    core.confirm_placement();
    core.on_key_down(&Key("Escape".into()), Modifiers::default());
    assert_eq!(core.editor.mode(), EditorMode::AwaitingConfirm(0));
    assert_eq!(core.editor.polygons().len(), 1);
}

#[test]
fn hover_while_adding_moves_preview() {
    let mut core = core();
    core.set_mode(MapMode::Edit);
    core.start_polygon();
    click_logical(&mut core, 20.0, 20.0);
    let at = screen_of(&core, 40.0, 30.0);
    let actions = core.on_pointer_move(at, Modifiers::default());
    assert!(actions.contains(&Action::RenderNeeded));
    let preview = core.editor.polygons()[0].preview();
    assert!(preview.is_some_and(|p| approx_eq(p.x, 40.0) && approx_eq(p.y, 30.0)));
    assert_eq!(core.editor.history().undo_count(), 0);
}

#[test]
fn ctrl_z_and_ctrl_shift_z_undo_and_redo() {
    let mut core = closed_triangle();
    core.confirm_placement();
    core.attach_area(1, "A");

    core.on_key_down(&Key("z".into()), ctrl());
    assert!(core.editor.polygons().is_empty());

    core.on_key_down(&Key("Z".into()), Modifiers { shift: true, ..ctrl() });
    assert_eq!(core.editor.polygons().len(), 1);

    core.on_key_down(&Key("z".into()), ctrl());
    core.on_key_down(&Key("y".into()), Modifiers { meta: true, ..Modifiers::default() });
    assert_eq!(core.editor.polygons().len(), 1);
}

#[test]
fn undo_shortcut_is_ignored_while_prompt_open() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    core.delete_polygon(0);
    core.set_mode(MapMode::Edit);
    core.start_polygon();
    assert!(core.on_key_down(&Key("z".into()), ctrl()).is_empty());
}

#[test]
fn dragging_vertex_moves_it_and_records_once() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    core.set_mode(MapMode::Edit);

    let grab = screen_of(&core, 10.0, 10.0);
    let origin = pt(grab.x + 2.0, grab.y);
    assert!(core.on_pointer_down(origin, Button::Primary, Modifiers::default()).is_empty());
    assert_eq!(core.gesture, Gesture::PressedOnVertex { origin, polygon: 0, vertex: 0 });

    for step in 1..=5 {
        let to = screen_of(&core, 10.0 + f64::from(step) * 2.0, 10.0 + f64::from(step) * 2.0);
        let actions = core.on_pointer_move(to, Modifiers::default());
        if step == 1 {
            assert!(actions.contains(&Action::SetCursor { cursor: "grabbing".into() }));
        }
        assert_eq!(core.gesture, Gesture::DraggingVertex { polygon: 0, vertex: 0 });
    }
    let end = screen_of(&core, 20.0, 20.0);
    let actions = core.on_pointer_up(end, Button::Primary, Modifiers::default());
    assert!(actions.contains(&Action::HistoryChanged { can_undo: true, can_redo: false }));

    let moved = core.editor.polygons()[0].vertices[0];
    assert!(approx_eq(moved.x, 20.0) && approx_eq(moved.y, 20.0));
    assert_eq!(core.editor.history().undo_count(), 1);
}

#[test]
fn press_on_vertex_within_slop_moves_nothing() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    core.set_mode(MapMode::Edit);
    let grab = screen_of(&core, 90.0, 10.0);
    core.on_pointer_down(grab, Button::Primary, Modifiers::default());
    assert!(core.on_pointer_move(pt(grab.x + 2.0, grab.y), Modifiers::default()).is_empty());
    core.on_pointer_up(pt(grab.x + 2.0, grab.y), Button::Primary, Modifiers::default());
    assert_eq!(core.editor.polygons()[0].vertices[1], pt(90.0, 10.0));
    assert_eq!(core.editor.history().undo_count(), 0);
    assert_eq!(core.gesture, Gesture::Idle);
}

#[test]
fn click_on_neighbour_corner_while_sketching_adds_vertex() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    core.set_mode(MapMode::Edit);
    core.start_polygon();
    click_logical(&mut core, 50.0, 5.0);
    click_logical(&mut core, 90.0, 10.0);

    let sketch = &core.editor.polygons()[1];
    assert_eq!(sketch.vertices.len(), 2);
    assert!(approx_eq(sketch.vertices[1].x, 90.0) && approx_eq(sketch.vertices[1].y, 10.0));
    assert_eq!(core.editor.polygons()[0].vertices[1], pt(90.0, 10.0));
    assert_eq!(core.editor.mode(), EditorMode::Adding(1));
}

#[test]
fn dragging_from_vertex_while_sketching_pans_instead() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    core.set_mode(MapMode::Edit);
    core.viewport.set_camera(Camera { pan_x: -400.0, pan_y: -300.0, zoom: 2.0 });
    core.start_polygon();

    let grab = screen_of(&core, 90.0, 10.0);
    let pan_before = core.viewport.camera().pan_x;
    core.on_pointer_down(grab, Button::Primary, Modifiers::default());
    core.on_pointer_move(pt(grab.x - 20.0, grab.y), Modifiers::default());
    assert_eq!(core.gesture, Gesture::Panning);
    core.on_pointer_up(pt(grab.x - 20.0, grab.y), Button::Primary, Modifiers::default());

    assert!(approx_eq(core.viewport.camera().pan_x, pan_before - 20.0));
    assert_eq!(core.editor.polygons()[0].vertices[1], pt(90.0, 10.0));
    assert!(core.editor.polygons()[1].vertices.is_empty());
}

#[test]
fn host_bracket_folds_two_drags_into_one_entry() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    core.set_mode(MapMode::Edit);
    assert_eq!(core.pause_history(), vec![Action::HistoryChanged { can_undo: false, can_redo: false }]);

    for (from, to) in [((10.0, 10.0), (5.0, 5.0)), ((90.0, 90.0), (95.0, 95.0))] {
        let down = screen_of(&core, from.0, from.1);
        let up = screen_of(&core, to.0, to.1);
        core.on_pointer_down(down, Button::Primary, Modifiers::default());
        core.on_pointer_move(up, Modifiers::default());
        core.on_pointer_up(up, Button::Primary, Modifiers::default());
    }
    assert_eq!(core.editor.history().undo_count(), 0);

    assert_eq!(core.resume_history(), vec![Action::HistoryChanged { can_undo: true, can_redo: false }]);
    assert_eq!(core.editor.history().undo_count(), 1);
    core.undo();
    assert_eq!(core.editor.polygons()[0].vertices, stored_square().points);
}

#[test]
fn wheel_during_drag_keeps_the_drag_alive() {
    let mut core = core();
    core.viewport.set_camera(Camera { pan_x: -400.0, pan_y: -300.0, zoom: 2.0 });
    core.on_pointer_down(pt(400.0, 300.0), Button::Primary, Modifiers::default());
    core.on_pointer_move(pt(420.0, 310.0), Modifiers::default());
    assert_eq!(core.gesture, Gesture::Panning);

    let actions = core.on_wheel(pt(420.0, 310.0), WheelDelta { dx: 0.0, dy: -120.0 }, Modifiers::default());
    assert_eq!(actions, vec![Action::RenderNeeded]);
    core.tick(1_000.0);
    let before = core.viewport.camera();
    let actions = core.on_pointer_move(pt(440.0, 320.0), Modifiers::default());
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(approx_eq(core.viewport.camera().pan_x, before.pan_x + 20.0));
}

#[test]
fn vertex_drag_is_browse_mode_pan_instead() {
    let mut core = core();
    core.load_polygons(&[stored_square()]);
    let grab = screen_of(&core, 10.0, 10.0);
    core.on_pointer_down(grab, Button::Primary, Modifiers::default());
    assert_eq!(core.gesture, Gesture::Pressed { origin: grab });
}

#[test]
fn leaving_edit_mode_abandons_sketch() {
    let mut core = closed_triangle();
    core.confirm_placement();
    let actions = core.set_mode(MapMode::Browse);
    assert!(actions.iter().any(|a| matches!(a, Action::PolygonRemoved { .. })));
    assert!(core.editor.polygons().is_empty());
    assert_eq!(core.editor.mode(), EditorMode::Idle);
}

#[test]
fn hit_radius_tracks_zoom() {
    let mut core = core();
    core.on_pointer_move(pt(400.0, 300.0), Modifiers::default());
    let at_one = core.editor.context().close_radius;
    assert!(approx_eq(at_one, 10.0 / 6.0));

    core.viewport.set_camera(Camera { pan_x: -400.0, pan_y: -300.0, zoom: 2.0 });
    core.on_pointer_move(pt(400.0, 300.0), Modifiers::default());
    assert!(approx_eq(core.editor.context().close_radius, at_one / 2.0));
}

#[test]
fn save_surfaces_exclusions_as_notices() {
    let mut core = core();
    let orphan = StoredPolygon { area: None, ..stored_square() };
    core.load_polygons(&[stored_square(), orphan.clone()]);
    let (report, notices) = core.save();
    assert_eq!(report.polygons.len(), 1);
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(notices.len(), 1);
    assert!(matches!(&notices[0], Action::Notice { message } if message.contains(&orphan.id.to_string())));
}

// =============================================================
// Markers and clusters
// =============================================================

#[test]
fn clicking_single_marker_selects_it() {
    let mut core = core();
    let m = marker(50.0, 50.0, 38.0);
    core.load_markers(vec![m.clone()]);
    let actions = click_logical(&mut core, 50.5, 49.5);
    assert_eq!(actions, vec![Action::MarkerSelected { id: m.id, payload: m.payload }]);
}

#[test]
fn clicking_empty_space_selects_nothing() {
    let mut core = core();
    core.load_markers(vec![marker(50.0, 50.0, 38.0)]);
    assert!(click_logical(&mut core, 5.0, 5.0).is_empty());
}

#[test]
fn clicking_merged_cluster_zooms_until_it_splits() {
    let mut core = core();
    core.load_markers(vec![marker(50.0, 50.0, 38.0), marker(52.0, 50.0, 38.0)]);
    assert_eq!(core.clusters().len(), 1);

    let actions = click_logical(&mut core, 51.0, 50.0);
    let Action::ClusterExpanding { members, zoom } = actions[0] else {
        panic!("expected cluster expansion, got {actions:?}");
    };
    assert_eq!(members, 2);
    assert!(approx_eq(zoom, 5.25));

    core.tick(10_000.0);
    assert!(approx_eq(core.viewport.camera().zoom, 5.25));
    let clusters = core.clusters();
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|g| !g.is_merged()));
}

#[test]
fn stacked_markers_expand_to_max_scale() {
    let mut core = core();
    core.load_markers(vec![marker(50.0, 50.0, 38.0), marker(50.0, 50.0, 38.0)]);
    let group = core.clusters().remove(0);
    let actions = core.expand_cluster(&group);
    assert_eq!(actions[0], Action::ClusterExpanding { members: 2, zoom: 10.0 });
}

#[test]
fn escape_cancels_cluster_animation() {
    let mut core = core();
    core.load_markers(vec![marker(50.0, 50.0, 38.0), marker(52.0, 50.0, 38.0)]);
    let before = core.viewport.camera();
    click_logical(&mut core, 51.0, 50.0);
    core.tick(40.0);
    assert!(core.viewport.is_animating());

    assert_eq!(core.on_key_down(&Key("Escape".into()), Modifiers::default()), vec![Action::RenderNeeded]);
    assert_eq!(core.viewport.camera(), before);
    assert!(!core.viewport.is_animating());
}

#[test]
fn move_marker_updates_position() {
    let mut core = core();
    let m = marker(10.0, 10.0, 5.0);
    core.load_markers(vec![m.clone()]);
    assert!(core.move_marker(m.id, pt(70.0, 20.0)));
    assert_eq!(core.markers[0].position(), pt(70.0, 20.0));
    assert!(!core.move_marker(Uuid::new_v4(), pt(1.0, 1.0)));
    assert!(!core.move_marker(m.id, pt(f64::NAN, 1.0)));
}

#[test]
fn frame_is_consistent_with_viewport() {
    let mut core = core();
    core.load_markers(vec![marker(20.0, 20.0, 38.0), marker(80.0, 80.0, 38.0)]);
    core.load_polygons(&[stored_square()]);
    let frame = core.frame();
    assert_eq!(frame.camera, core.viewport.camera());
    assert!(approx_eq(frame.marker_scale, core.viewport.marker_scale()));
    assert_eq!(frame.clusters.len(), 2);
    assert_eq!(frame.polygons.len(), 1);
    assert_eq!(frame.editor, EditorMode::Idle);
    assert!(!frame.animating);
}

// =============================================================
// Viewport input
// =============================================================

#[test]
fn wheel_zooms_and_tick_settles() {
    let mut core = core();
    let actions = core.on_wheel(pt(400.0, 300.0), WheelDelta { dx: 0.0, dy: -120.0 }, Modifiers::default());
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert_eq!(core.tick(1_000.0), vec![Action::RenderNeeded]);
    assert!(approx_eq(core.viewport.camera().zoom, 1.1));
    assert!(core.tick(16.0).is_empty());
}

#[test]
fn drag_past_slop_pans_when_zoomed() {
    let mut core = core();
    core.viewport.set_camera(Camera { pan_x: -400.0, pan_y: -300.0, zoom: 2.0 });
    core.on_pointer_down(pt(400.0, 300.0), Button::Primary, Modifiers::default());
    assert!(core.on_pointer_move(pt(402.0, 300.0), Modifiers::default()).is_empty());
    let actions = core.on_pointer_move(pt(420.0, 310.0), Modifiers::default());
    assert!(actions.contains(&Action::RenderNeeded));
    assert_eq!(core.gesture, Gesture::Panning);
    core.on_pointer_up(pt(420.0, 310.0), Button::Primary, Modifiers::default());
    assert_eq!(core.viewport.camera(), Camera { pan_x: -380.0, pan_y: -290.0, zoom: 2.0 });
    assert_eq!(core.gesture, Gesture::Idle);
}

#[test]
fn drag_release_is_not_a_click() {
    let mut core = core();
    core.load_markers(vec![marker(50.0, 50.0, 38.0)]);
    let at = screen_of(&core, 50.0, 50.0);
    core.on_pointer_down(at, Button::Primary, Modifiers::default());
    core.on_pointer_move(pt(at.x + 30.0, at.y), Modifiers::default());
    let actions = core.on_pointer_up(pt(at.x + 30.0, at.y), Button::Primary, Modifiers::default());
    assert!(!actions.iter().any(|a| matches!(a, Action::MarkerSelected { .. })));
}

#[test]
fn secondary_button_is_ignored() {
    let mut core = core();
    assert!(core.on_pointer_down(pt(1.0, 1.0), Button::Secondary, Modifiers::default()).is_empty());
    assert_eq!(core.gesture, Gesture::Idle);
}

#[test]
fn two_finger_pinch_zooms() {
    let mut core = core();
    let a = TouchPoint { id: 1, x: 300.0, y: 300.0 };
    let b = TouchPoint { id: 2, x: 500.0, y: 300.0 };
    core.on_touch_start(&[a, b]);
    let spread = [TouchPoint { x: 200.0, ..a }, TouchPoint { x: 600.0, ..b }];
    assert_eq!(core.on_touch_move(&spread), vec![Action::RenderNeeded]);
    assert!(approx_eq(core.viewport.camera().zoom, 2.0));

    core.on_touch_end(&[spread[0]]);
    assert_eq!(core.viewport.state(), ViewportState::Idle);
    assert!(core.on_touch_move(&[spread[0]]).is_empty());
}

#[test]
fn single_touch_tap_selects_marker() {
    let mut core = core();
    let m = marker(50.0, 50.0, 38.0);
    core.load_markers(vec![m.clone()]);
    let at = screen_of(&core, 50.0, 50.0);
    core.on_touch_start(&[TouchPoint { id: 0, x: at.x, y: at.y }]);
    let actions = core.on_touch_end(&[]);
    assert!(actions.contains(&Action::MarkerSelected { id: m.id, payload: m.payload }));
}

#[test]
fn image_failure_reports_recoverable_condition() {
    let mut core = core();
    let actions = core.image_failed("404 Not Found");
    let Action::ImageUnavailable { code, message } = &actions[0] else {
        panic!("expected image failure, got {actions:?}");
    };
    assert_eq!(code, "E_IMAGE_UNAVAILABLE");
    assert!(message.contains("404"));
    assert!(!core.viewport.has_image());
    assert!(core.viewport.camera().zoom.is_finite());
}

#[test]
fn actions_serialize_with_type_tag() {
    let value = serde_json::to_value(Action::SetCursor { cursor: "grab".into() }).unwrap();
    assert_eq!(value, json!({ "type": "set_cursor", "cursor": "grab" }));
    let value = serde_json::to_value(Action::RenderNeeded).unwrap();
    assert_eq!(value, json!({ "type": "render_needed" }));
}
