//! Browser facade over [`EngineCore`].
//!
//! Every method takes plain numbers or JSON strings and returns the resulting
//! [`Action`](crate::engine::Action) list as a JSON string, so the host only
//! needs `JSON.parse` on its side. Modifier keys travel as a bitmask:
//! 1 = shift, 2 = ctrl, 4 = alt, 8 = meta.

#[cfg(test)]
#[path = "bindings_test.rs"]
mod bindings_test;

use serde::Serialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use crate::camera::Point;
use crate::config::MapConfig;
use crate::engine::{Action, EngineCore};
use crate::input::{Button, Key, MapMode, Modifiers, TouchPoint, WheelDelta};
use crate::polygon::SaveReport;
use crate::snapshot::{decode_markers, decode_polygons};

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    Ok(serde_json::to_string(value)?)
}

fn modifiers(bits: u8) -> Modifiers {
    Modifiers { shift: bits & 1 != 0, ctrl: bits & 2 != 0, alt: bits & 4 != 0, meta: bits & 8 != 0 }
}

#[derive(Serialize)]
struct SaveOutput {
    report: SaveReport,
    actions: Vec<Action>,
}

/// One map surface, owned by the JavaScript host.
#[wasm_bindgen]
pub struct MapEngine {
    core: EngineCore,
}

impl Default for MapEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl MapEngine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        Self { core: EngineCore::default() }
    }

    /// Engine with tunables from a JSON-encoded config.
    ///
    /// # Errors
    ///
    /// Fails when the config does not decode or is inconsistent.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<MapEngine, JsError> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(Self { core: EngineCore::new(config) })
    }

    // --- Layout / data ---

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Result<String, JsError> {
        to_json(&self.core.set_viewport(width, height))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = setImageSize)]
    pub fn set_image_size(&mut self, width: f64, height: f64) -> Result<String, JsError> {
        to_json(&self.core.set_image_size(width, height))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = imageFailed)]
    pub fn image_failed(&mut self, reason: &str) -> Result<String, JsError> {
        to_json(&self.core.image_failed(reason))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = setEditMode)]
    pub fn set_edit_mode(&mut self, edit: bool) -> Result<String, JsError> {
        let mode = if edit { MapMode::Edit } else { MapMode::Browse };
        to_json(&self.core.set_mode(mode))
    }

    /// # Errors
    ///
    /// Fails when `json` is not an array of markers.
    #[wasm_bindgen(js_name = loadMarkers)]
    pub fn load_markers(&mut self, json: &str) -> Result<String, JsError> {
        let markers = decode_markers(json)?;
        to_json(&self.core.load_markers(markers))
    }

    /// # Errors
    ///
    /// Fails when `id` is not a UUID.
    #[wasm_bindgen(js_name = moveMarker)]
    pub fn move_marker(&mut self, id: &str, x: f64, y: f64) -> Result<bool, JsError> {
        let id = Uuid::parse_str(id)?;
        Ok(self.core.move_marker(id, Point::new(x, y)))
    }

    /// # Errors
    ///
    /// Fails when `json` is not an array of stored polygons.
    #[wasm_bindgen(js_name = loadPolygons)]
    pub fn load_polygons(&mut self, json: &str) -> Result<String, JsError> {
        let polygons = decode_polygons(json)?;
        to_json(&self.core.load_polygons(&polygons))
    }

    /// Current render frame.
    ///
    /// # Errors
    ///
    /// Fails only if the frame cannot be encoded.
    pub fn frame(&self) -> Result<String, JsError> {
        to_json(&self.core.frame())
    }

    // --- Input ---

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64, button: i16, mods: u8) -> Result<String, JsError> {
        to_json(&self.core.on_pointer_down(Point::new(x, y), Button::from_dom(button), modifiers(mods)))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64, mods: u8) -> Result<String, JsError> {
        to_json(&self.core.on_pointer_move(Point::new(x, y), modifiers(mods)))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f64, y: f64, button: i16, mods: u8) -> Result<String, JsError> {
        to_json(&self.core.on_pointer_up(Point::new(x, y), Button::from_dom(button), modifiers(mods)))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    pub fn wheel(&mut self, x: f64, y: f64, dx: f64, dy: f64, mods: u8) -> Result<String, JsError> {
        to_json(&self.core.on_wheel(Point::new(x, y), WheelDelta { dx, dy }, modifiers(mods)))
    }

    /// `touches` is a JSON array of `{id, x, y}` for every contact now down.
    ///
    /// # Errors
    ///
    /// Fails when `touches` does not decode.
    #[wasm_bindgen(js_name = touchStart)]
    pub fn touch_start(&mut self, touches: &str) -> Result<String, JsError> {
        let touches: Vec<TouchPoint> = serde_json::from_str(touches)?;
        to_json(&self.core.on_touch_start(&touches))
    }

    /// # Errors
    ///
    /// Fails when `touches` does not decode.
    #[wasm_bindgen(js_name = touchMove)]
    pub fn touch_move(&mut self, touches: &str) -> Result<String, JsError> {
        let touches: Vec<TouchPoint> = serde_json::from_str(touches)?;
        to_json(&self.core.on_touch_move(&touches))
    }

    /// # Errors
    ///
    /// Fails when `remaining` does not decode.
    #[wasm_bindgen(js_name = touchEnd)]
    pub fn touch_end(&mut self, remaining: &str) -> Result<String, JsError> {
        let remaining: Vec<TouchPoint> = serde_json::from_str(remaining)?;
        to_json(&self.core.on_touch_end(&remaining))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str, mods: u8) -> Result<String, JsError> {
        to_json(&self.core.on_key_down(&Key(key.to_owned()), modifiers(mods)))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    pub fn tick(&mut self, dt_ms: f64) -> Result<String, JsError> {
        to_json(&self.core.tick(dt_ms))
    }

    // --- Editing ---

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = startPolygon)]
    pub fn start_polygon(&mut self) -> Result<String, JsError> {
        to_json(&self.core.start_polygon())
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = confirmPlacement)]
    pub fn confirm_placement(&mut self) -> Result<String, JsError> {
        to_json(&self.core.confirm_placement())
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = rejectPlacement)]
    pub fn reject_placement(&mut self) -> Result<String, JsError> {
        to_json(&self.core.reject_placement())
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = attachArea)]
    pub fn attach_area(&mut self, area_id: i64, name: &str) -> Result<String, JsError> {
        to_json(&self.core.attach_area(area_id, name))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = closeAreaPanel)]
    pub fn close_area_panel(&mut self) -> Result<String, JsError> {
        to_json(&self.core.close_area_panel())
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = deletePolygon)]
    pub fn delete_polygon(&mut self, index: usize) -> Result<String, JsError> {
        to_json(&self.core.delete_polygon(index))
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    pub fn undo(&mut self) -> Result<String, JsError> {
        to_json(&self.core.undo())
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    pub fn redo(&mut self) -> Result<String, JsError> {
        to_json(&self.core.redo())
    }

    /// Open a history bracket around a bulk change.
    ///
    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = pauseHistory)]
    pub fn pause_history(&mut self) -> Result<String, JsError> {
        to_json(&self.core.pause_history())
    }

    /// # Errors
    ///
    /// Fails only if the resulting actions cannot be encoded.
    #[wasm_bindgen(js_name = resumeHistory)]
    pub fn resume_history(&mut self) -> Result<String, JsError> {
        to_json(&self.core.resume_history())
    }

    #[wasm_bindgen(js_name = canUndo)]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.core.editor.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.core.editor.can_redo()
    }

    /// `{ report, actions }`: the polygons to persist plus notices for the excluded ones.
    ///
    /// # Errors
    ///
    /// Fails only if the output cannot be encoded.
    pub fn save(&mut self) -> Result<String, JsError> {
        let (report, actions) = self.core.save();
        to_json(&SaveOutput { report, actions })
    }
}
