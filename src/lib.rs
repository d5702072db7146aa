//! Map interaction engine for the licensing dashboard.
//!
//! Compiled to WebAssembly for the browser and to a native library for the
//! offline CLI. It clusters point markers so they stay legible at any zoom,
//! runs pan/zoom/pinch on the map surface, and lets operators outline license
//! areas as polygons with full undo/redo. The host layer wires DOM events in
//! and persists the resulting [`engine::Action`]s and save reports; nothing
//! here performs I/O.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Session engine [`engine::EngineCore`]: input in, actions and render frames out |
//! | [`bindings`] | `wasm-bindgen` facade for the browser host |
//! | [`camera`] | Logical / fitted / viewport coordinate spaces and transforms |
//! | [`cluster`] | Marker clustering and declustering zoom |
//! | [`viewport`] | Pan/zoom controller and its gesture state machine |
//! | [`input`] | Input event types and the pointer gesture |
//! | [`polygon`] | License-area polygons, geometry, and save filtering |
//! | [`editor`] | Polygon editor reducer and history-driving wrapper |
//! | [`history`] | Snapshot undo/redo with pause/resume brackets |
//! | [`snapshot`] | JSON boundary with the data layer; editor scripts |
//! | [`config`] | Tunables, device classes, environment loading |
//! | [`error`] | Boundary errors |
//! | [`consts`] | Shared numeric defaults |

pub mod bindings;
pub mod camera;
pub mod cluster;
pub mod config;
pub mod consts;
pub mod editor;
pub mod engine;
pub mod error;
pub mod history;
pub mod input;
pub mod polygon;
pub mod snapshot;
pub mod viewport;
