// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene model for SCg diagrams.
//!
//! This crate provides the editable core behind an SCg viewer:
//! - Typed nodes, content links and edges, where edges may connect edges
//! - Lazily recomputed geometry with dirty propagation along adjacency
//! - Fixed-point materialization of structures described in any order
//! - GWF document loading
//! - Force-directed layout with edge-to-edge joints
//!
//! ## Architecture
//!
//! The [`Scene`] owns every object in an arena and hands out [`ObjectId`]s.
//! Objects refer to each other only by id. Moving an object marks it and
//! everything attached to it as stale; [`Scene::update_object`] pulls the
//! geometry back up to date. Rendering is left to subscribers of
//! [`SceneEvent`] and sizing of link content to a [`ContentProvider`].

pub mod content;
pub mod layout;
pub mod loader;
pub mod math;
pub mod object;
pub mod sc_type;
pub mod scene;
pub mod structure;

pub use content::{Content, ContentProvider, LinkContent, MeasuredContentProvider};
pub use layout::{ForceLayout, ForceSettings, Layout};
pub use loader::{GwfError, GwfLoader};
pub use math::{Rect, Vector2};
pub use object::{ObjectId, ObjectKind, ObjectView, SceneObject};
pub use sc_type::{ScAddr, ScType};
pub use scene::{Scene, SceneError, SceneEvent};
pub use structure::{ObjectInfo, StructBuilder, StructError};
