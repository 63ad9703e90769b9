// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene objects: nodes, links and edges.
//!
//! Objects never own each other. An edge refers to its endpoints and every
//! object refers to its incident edges by [`ObjectId`]; the [`Scene`] owns all
//! of them and resolves those ids.
//!
//! Geometry is cached. Mutations only raise the *need update* flag, and the
//! scene recomputes derived geometry on demand (see [`Scene::update_object`]).
//!
//! [`Scene`]: crate::scene::Scene
//! [`Scene::update_object`]: crate::scene::Scene::update_object

use crate::content::LinkContent;
use crate::math::{point_on_path, Rect, RelPos, Vector2};
use crate::sc_type::{ScAddr, ScType};
use crate::scene::SceneError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance between a node center and the point where lines stop
pub const NODE_BOUNDARY_OFFSET: f32 = 10.0;
/// Distance between a link center and the point where lines stop
pub const LINK_BOUNDARY_OFFSET: f32 = 15.0;
/// Side of the square used for links without content
pub const DEFAULT_LINK_SIZE: f32 = 20.0;

/// Identifier of an object inside a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    pub(crate) fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    /// Raw id value (starts at 1)
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Object kind, without its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Node
    Node,
    /// Link with content
    Link,
    /// Edge between two objects
    Edge,
}

/// Position and scale of a point-like object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointShape {
    /// Center position
    pub pos: Vector2,
    /// Uniform scale
    pub scale: f32,
}

impl Default for PointShape {
    fn default() -> Self {
        Self {
            pos: Vector2::ZERO,
            scale: 1.0,
        }
    }
}

/// Link state: a point plus content bounds
#[derive(Debug)]
pub struct LinkShape {
    point: PointShape,
    bounds: Rect,
    content: Option<Box<dyn LinkContent>>,
}

impl LinkShape {
    /// Content bounds (valid after an update)
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Attached content, if any
    pub fn content(&self) -> Option<&dyn LinkContent> {
        self.content.as_deref()
    }

    fn content_size(&self) -> Vector2 {
        self.content
            .as_ref()
            .map_or(Vector2::splat(DEFAULT_LINK_SIZE), |c| c.size())
    }
}

/// Edge state: a polyline plus its endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeShape {
    points: Vec<Vector2>,
    source: ObjectId,
    target: ObjectId,
    source_rel_pos: f32,
    target_rel_pos: f32,
}

impl EdgeShape {
    /// Path points; first and last are derived from the endpoints
    pub fn points(&self) -> &[Vector2] {
        &self.points
    }

    /// Source object
    pub fn source(&self) -> ObjectId {
        self.source
    }

    /// Target object
    pub fn target(&self) -> ObjectId {
        self.target
    }

    /// Relative position on the source (only meaningful for edge sources)
    pub fn source_rel_pos(&self) -> f32 {
        self.source_rel_pos
    }

    /// Relative position on the target (only meaningful for edge targets)
    pub fn target_rel_pos(&self) -> f32 {
        self.target_rel_pos
    }

    /// Point in the middle of the first segment
    pub fn mid_point(&self) -> Vector2 {
        point_on_path(&self.points, RelPos::MIDDLE)
    }

    pub(crate) fn set_rel_pos(&mut self, source: f32, target: f32) {
        self.source_rel_pos = source;
        self.target_rel_pos = target;
    }

    /// Replace interior control points, keeping the derived ends
    pub(crate) fn set_interior(&mut self, interior: &[Vector2]) {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        self.points.clear();
        self.points.push(first);
        self.points.extend_from_slice(interior);
        self.points.push(last);
    }

    /// Drop all interior control points; returns `false` if there were none
    pub(crate) fn make_simple(&mut self) -> bool {
        if self.points.len() <= 2 {
            return false;
        }
        let last = self.points[self.points.len() - 1];
        self.points.truncate(1);
        self.points.push(last);
        true
    }

    pub(crate) fn take_points(&mut self) -> Vec<Vector2> {
        std::mem::take(&mut self.points)
    }

    pub(crate) fn restore_points(&mut self, points: Vec<Vector2>) {
        self.points = points;
    }
}

/// Recompute the derived ends of an edge path.
///
/// The source end is computed twice: its boundary offset depends on the
/// direction towards the next point, which may be the target end that is
/// only finalized in between.
pub(crate) fn relax_endpoints(
    points: &mut [Vector2],
    source: &SceneObject,
    source_rel_pos: f32,
    target: &SceneObject,
    target_rel_pos: f32,
) {
    let last = points.len() - 1;
    points[0] = source.calc_connection_point(source_rel_pos, points[1]);
    points[last] = target.calc_connection_point(target_rel_pos, points[last - 1]);
    points[0] = source.calc_connection_point(source_rel_pos, points[1]);
}

/// Type specific object state
#[derive(Debug)]
pub enum Shape {
    /// Node
    Node(PointShape),
    /// Link
    Link(LinkShape),
    /// Edge
    Edge(EdgeShape),
}

/// An object in the scene
#[derive(Debug)]
pub struct SceneObject {
    id: ObjectId,
    text: String,
    sc_type: ScType,
    addr: Option<ScAddr>,
    adjacent: Vec<ObjectId>,
    need_update: bool,
    need_view_update: bool,
    shape: Shape,
}

impl SceneObject {
    fn with_shape(
        id: ObjectId,
        sc_type: ScType,
        text: String,
        addr: Option<ScAddr>,
        shape: Shape,
    ) -> Self {
        Self {
            id,
            text,
            sc_type,
            addr,
            adjacent: Vec::new(),
            need_update: true,
            need_view_update: true,
            shape,
        }
    }

    pub(crate) fn new_node(
        id: ObjectId,
        sc_type: ScType,
        text: String,
        addr: Option<ScAddr>,
    ) -> Result<Self, SceneError> {
        if !sc_type.is_node() {
            return Err(SceneError::InvalidType {
                expected: ObjectKind::Node,
                actual: sc_type,
            });
        }
        Ok(Self::with_shape(id, sc_type, text, addr, Shape::Node(PointShape::default())))
    }

    pub(crate) fn new_link(
        id: ObjectId,
        sc_type: ScType,
        text: String,
        addr: Option<ScAddr>,
        content: Option<Box<dyn LinkContent>>,
    ) -> Result<Self, SceneError> {
        if !sc_type.is_link() {
            return Err(SceneError::InvalidType {
                expected: ObjectKind::Link,
                actual: sc_type,
            });
        }
        let shape = LinkShape {
            point: PointShape::default(),
            bounds: Rect::default(),
            content,
        };
        Ok(Self::with_shape(id, sc_type, text, addr, Shape::Link(shape)))
    }

    pub(crate) fn new_edge(
        id: ObjectId,
        sc_type: ScType,
        text: String,
        addr: Option<ScAddr>,
        source: &SceneObject,
        target: &SceneObject,
    ) -> Result<Self, SceneError> {
        if !sc_type.is_edge() {
            return Err(SceneError::InvalidType {
                expected: ObjectKind::Edge,
                actual: sc_type,
            });
        }
        let shape = EdgeShape {
            points: vec![source.center(), target.center()],
            source: source.id,
            target: target.id,
            source_rel_pos: 0.0,
            target_rel_pos: 0.0,
        };
        Ok(Self::with_shape(id, sc_type, text, addr, Shape::Edge(shape)))
    }

    /// Object id
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Display text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Element type
    pub fn sc_type(&self) -> ScType {
        self.sc_type
    }

    /// External key, if the object was created from a structure
    pub fn addr(&self) -> Option<ScAddr> {
        self.addr
    }

    /// Object kind
    pub fn kind(&self) -> ObjectKind {
        match self.shape {
            Shape::Node(_) => ObjectKind::Node,
            Shape::Link(_) => ObjectKind::Link,
            Shape::Edge(_) => ObjectKind::Edge,
        }
    }

    /// Type specific state
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Edges incident to this object
    pub fn adjacent(&self) -> &[ObjectId] {
        &self.adjacent
    }

    /// Number of incident edges
    pub fn adjacent_count(&self) -> usize {
        self.adjacent.len()
    }

    /// Whether derived geometry is stale
    pub fn is_need_update(&self) -> bool {
        self.need_update
    }

    /// Whether the object changed since it was last drawn
    pub fn is_need_view_update(&self) -> bool {
        self.need_view_update
    }

    /// Position of point objects
    pub fn position(&self) -> Option<Vector2> {
        self.point().map(|p| p.pos)
    }

    /// Scale of point objects
    pub fn scale(&self) -> Option<f32> {
        self.point().map(|p| p.scale)
    }

    /// Edge state, if this is an edge
    pub fn as_edge(&self) -> Option<&EdgeShape> {
        match &self.shape {
            Shape::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    /// Link state, if this is a link
    pub fn as_link(&self) -> Option<&LinkShape> {
        match &self.shape {
            Shape::Link(link) => Some(link),
            _ => None,
        }
    }

    fn point(&self) -> Option<&PointShape> {
        match &self.shape {
            Shape::Node(point) => Some(point),
            Shape::Link(link) => Some(&link.point),
            Shape::Edge(_) => None,
        }
    }

    /// Anchor used by adjacent objects
    pub fn center(&self) -> Vector2 {
        match &self.shape {
            Shape::Node(point) => point.pos,
            Shape::Link(link) => link.point.pos,
            Shape::Edge(edge) => edge.points[0],
        }
    }

    /// Point where a line coming from `from` should touch this object.
    ///
    /// `rel_pos` is only used by edges, where it selects a point on the path.
    /// Nodes and links stop the line a fixed distance before their center.
    pub fn calc_connection_point(&self, rel_pos: f32, from: Vector2) -> Vector2 {
        match &self.shape {
            Shape::Node(point) => boundary_point(point.pos, from, NODE_BOUNDARY_OFFSET),
            Shape::Link(link) => boundary_point(link.point.pos, from, LINK_BOUNDARY_OFFSET),
            Shape::Edge(edge) => point_on_path(&edge.points, rel_pos),
        }
    }

    /// Render-facing snapshot of this object
    pub fn view(&self) -> ObjectView {
        let geometry = match &self.shape {
            Shape::Node(point) => Geometry::Point {
                pos: point.pos,
                scale: point.scale,
            },
            Shape::Link(link) => Geometry::Link {
                pos: link.point.pos,
                scale: link.point.scale,
                bounds: link.bounds,
            },
            Shape::Edge(edge) => Geometry::Path {
                points: edge.points.clone(),
                source: edge.source,
                target: edge.target,
            },
        };
        ObjectView {
            id: self.id,
            addr: self.addr,
            sc_type: self.sc_type,
            text: self.text.clone(),
            geometry,
            need_view_update: self.need_view_update,
        }
    }

    pub(crate) fn add_adjacent(&mut self, id: ObjectId) {
        if !self.adjacent.contains(&id) {
            self.adjacent.push(id);
        }
    }

    pub(crate) fn request_update(&mut self) {
        self.need_update = true;
    }

    pub(crate) fn request_view_update(&mut self) {
        self.need_view_update = true;
    }

    pub(crate) fn view_updated(&mut self) {
        self.need_view_update = false;
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
        self.request_view_update();
    }

    /// Returns `false` if this is not a point object
    pub(crate) fn set_position(&mut self, pos: Vector2) -> bool {
        let Some(point) = self.point_mut() else {
            return false;
        };
        point.pos = pos;
        true
    }

    /// Returns `false` if this is not a point object
    pub(crate) fn set_scale(&mut self, scale: f32) -> bool {
        let Some(point) = self.point_mut() else {
            return false;
        };
        point.scale = scale;
        true
    }

    pub(crate) fn set_content(&mut self, content: Box<dyn LinkContent>) -> bool {
        match &mut self.shape {
            Shape::Link(link) => {
                link.content = Some(content);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn edge_mut(&mut self) -> Option<&mut EdgeShape> {
        match &mut self.shape {
            Shape::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    fn point_mut(&mut self) -> Option<&mut PointShape> {
        match &mut self.shape {
            Shape::Node(point) => Some(point),
            Shape::Link(link) => Some(&mut link.point),
            Shape::Edge(_) => None,
        }
    }

    /// Recompute state that depends only on this object
    pub(crate) fn update_local(&mut self) {
        if let Shape::Link(link) = &mut self.shape {
            let size = link.content_size() * link.point.scale;
            link.bounds = Rect::from_center(link.point.pos, size);
        }
    }

    pub(crate) fn finish_update(&mut self) {
        self.need_update = false;
        self.need_view_update = true;
    }
}

/// Point `offset` units before `center` on the line from `from`.
///
/// Coincident points use +X as the line direction.
fn boundary_point(center: Vector2, from: Vector2, offset: f32) -> Vector2 {
    let dv = center - from;
    let len = dv.len();
    from + dv.normalize_or(Vector2::UNIT_X) * (len - offset)
}

/// Geometry handed to the render collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    /// Node
    Point {
        /// Center
        pos: Vector2,
        /// Scale
        scale: f32,
    },
    /// Link
    Link {
        /// Center
        pos: Vector2,
        /// Scale
        scale: f32,
        /// Content bounds
        bounds: Rect,
    },
    /// Edge
    Path {
        /// Path points
        points: Vec<Vector2>,
        /// Source object
        source: ObjectId,
        /// Target object
        target: ObjectId,
    },
}

/// Everything a renderer reads from an object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectView {
    /// Object id
    pub id: ObjectId,
    /// External key
    pub addr: Option<ScAddr>,
    /// Element type
    pub sc_type: ScType,
    /// Display text
    pub text: String,
    /// Current geometry
    pub geometry: Geometry,
    /// Whether the object must be redrawn
    pub need_view_update: bool,
}
