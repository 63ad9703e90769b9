// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene: owner of every object in a diagram.

use crate::content::{Content, ContentProvider, MeasuredContentProvider};
use crate::math::Vector2;
use crate::object::{
    relax_endpoints, EdgeShape, ObjectId, ObjectKind, ObjectView, SceneObject, Shape,
};
use crate::sc_type::{ScAddr, ScType};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::mpsc;

/// Default size of the area the scene is shown in
pub const DEFAULT_VIEW_SIZE: Vector2 = Vector2::new(800.0, 600.0);

/// Notification sent to scene subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// A new object was added
    ObjectCreated(ObjectId),
    /// Content of a link changed
    ContentChanged(ObjectId),
    /// Objects changed and should be redrawn
    ViewUpdate,
}

/// A diagram scene.
///
/// Objects live in an arena indexed by [`ObjectId`] and are never removed;
/// clearing a diagram means dropping the scene.
#[derive(Debug)]
pub struct Scene {
    objects: Vec<SceneObject>,
    /// Objects created from a structure, by external key
    addr_index: IndexMap<ScAddr, ObjectId>,
    content_provider: Box<dyn ContentProvider>,
    view_size: Vector2,
    subscribers: Vec<mpsc::Sender<SceneEvent>>,
}

impl Scene {
    /// Create an empty scene with the default content provider
    pub fn new() -> Self {
        Self::with_content_provider(Box::new(MeasuredContentProvider::default()))
    }

    /// Create an empty scene that sizes link content with `provider`
    pub fn with_content_provider(provider: Box<dyn ContentProvider>) -> Self {
        Self {
            objects: Vec::new(),
            addr_index: IndexMap::new(),
            content_provider: provider,
            view_size: DEFAULT_VIEW_SIZE,
            subscribers: Vec::new(),
        }
    }

    fn next_id(&self) -> ObjectId {
        ObjectId::from_index(self.objects.len())
    }

    fn check_addr(&self, addr: Option<ScAddr>) -> Result<(), SceneError> {
        match addr {
            Some(addr) if self.addr_index.contains_key(&addr) => {
                Err(SceneError::DuplicateAddr(addr))
            }
            _ => Ok(()),
        }
    }

    fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id();
        if let Some(addr) = object.addr() {
            self.addr_index.insert(addr, id);
        }
        self.objects.push(object);
        self.emit(SceneEvent::ObjectCreated(id));
        id
    }

    /// Create a node
    pub fn create_node(
        &mut self,
        sc_type: ScType,
        text: impl Into<String>,
        addr: Option<ScAddr>,
    ) -> Result<ObjectId, SceneError> {
        self.check_addr(addr)?;
        let node = SceneObject::new_node(self.next_id(), sc_type, text.into(), addr)?;
        Ok(self.insert(node))
    }

    /// Create a link, sizing its content through the content provider
    pub fn create_link(
        &mut self,
        sc_type: ScType,
        text: impl Into<String>,
        addr: Option<ScAddr>,
        content: Option<&Content>,
    ) -> Result<ObjectId, SceneError> {
        self.check_addr(addr)?;
        let content = content.map(|c| self.content_provider.provide(c));
        let link = SceneObject::new_link(self.next_id(), sc_type, text.into(), addr, content)?;
        Ok(self.insert(link))
    }

    /// Create an edge between two existing objects
    pub fn create_edge(
        &mut self,
        sc_type: ScType,
        source: ObjectId,
        target: ObjectId,
        text: impl Into<String>,
        addr: Option<ScAddr>,
    ) -> Result<ObjectId, SceneError> {
        self.check_addr(addr)?;
        let edge = SceneObject::new_edge(
            self.next_id(),
            sc_type,
            text.into(),
            addr,
            self.get(source)?,
            self.get(target)?,
        )?;
        let id = edge.id();
        self.get_mut(source)?.add_adjacent(id);
        self.get_mut(target)?.add_adjacent(id);
        Ok(self.insert(edge))
    }

    fn get(&self, id: ObjectId) -> Result<&SceneObject, SceneError> {
        self.objects
            .get(id.index())
            .ok_or(SceneError::ObjectNotFound(id))
    }

    fn get_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject, SceneError> {
        self.objects
            .get_mut(id.index())
            .ok_or(SceneError::ObjectNotFound(id))
    }

    /// Get an object by id
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.index())
    }

    /// Get an object by its external key
    pub fn object_by_addr(&self, addr: ScAddr) -> Option<&SceneObject> {
        self.id_by_addr(addr).and_then(|id| self.object(id))
    }

    /// Get an object id by its external key
    pub fn id_by_addr(&self, addr: ScAddr) -> Option<ObjectId> {
        self.addr_index.get(&addr).copied()
    }

    /// All objects in creation order
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// All object ids in creation order
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().map(SceneObject::id)
    }

    fn objects_of(&self, kind: ObjectKind) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(move |o| o.kind() == kind)
    }

    /// All nodes
    pub fn nodes(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects_of(ObjectKind::Node)
    }

    /// All links
    pub fn links(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects_of(ObjectKind::Link)
    }

    /// All edges
    pub fn edges(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects_of(ObjectKind::Edge)
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the scene has no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Size of the area the scene is shown in
    pub fn view_size(&self) -> Vector2 {
        self.view_size
    }

    /// Set the size of the area the scene is shown in
    pub fn set_view_size(&mut self, size: Vector2) {
        self.view_size = size;
    }

    /// Mark an object and everything transitively adjacent to it as stale
    pub fn request_update(&mut self, id: ObjectId) -> Result<(), SceneError> {
        self.get(id)?;
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let object = &mut self.objects[current.index()];
            object.request_update();
            stack.extend(object.adjacent().iter().copied());
        }
        Ok(())
    }

    /// Move a node or link
    pub fn set_position(&mut self, id: ObjectId, pos: Vector2) -> Result<(), SceneError> {
        if !self.get_mut(id)?.set_position(pos) {
            return Err(SceneError::NotAPointObject(id));
        }
        self.request_update(id)
    }

    /// Scale a node or link
    pub fn set_scale(&mut self, id: ObjectId, scale: f32) -> Result<(), SceneError> {
        if !self.get_mut(id)?.set_scale(scale) {
            return Err(SceneError::NotAPointObject(id));
        }
        self.request_update(id)
    }

    /// Change the display text
    pub fn set_text(&mut self, id: ObjectId, text: impl Into<String>) -> Result<(), SceneError> {
        self.get_mut(id)?.set_text(text.into());
        Ok(())
    }

    /// Replace the content of a link
    pub fn set_link_content(&mut self, id: ObjectId, content: &Content) -> Result<(), SceneError> {
        let content = self.content_provider.provide(content);
        if !self.get_mut(id)?.set_content(content) {
            return Err(SceneError::NotALink(id));
        }
        self.request_update(id)?;
        self.emit(SceneEvent::ContentChanged(id));
        Ok(())
    }

    /// Set where an edge attaches to its source and target
    pub fn set_edge_rel_pos(
        &mut self,
        id: ObjectId,
        source_rel_pos: f32,
        target_rel_pos: f32,
    ) -> Result<(), SceneError> {
        self.edge_mut(id)?.set_rel_pos(source_rel_pos, target_rel_pos);
        self.request_update(id)
    }

    /// Replace the interior control points of an edge
    pub fn set_edge_points(
        &mut self,
        id: ObjectId,
        interior: &[Vector2],
    ) -> Result<(), SceneError> {
        self.edge_mut(id)?.set_interior(interior);
        self.request_update(id)
    }

    /// Drop the interior control points of an edge
    pub fn make_edge_simple(&mut self, id: ObjectId) -> Result<(), SceneError> {
        if self.edge_mut(id)?.make_simple() {
            self.request_update(id)?;
        }
        Ok(())
    }

    fn edge_mut(&mut self, id: ObjectId) -> Result<&mut EdgeShape, SceneError> {
        self.get_mut(id)?
            .edge_mut()
            .ok_or(SceneError::NotAnEdge(id))
    }

    /// Bring an object's derived geometry up to date.
    ///
    /// Does nothing if the object is not stale. Edges pull their endpoints
    /// up to date first, however deep the chain of edges on edges.
    pub fn update_object(&mut self, id: ObjectId) -> Result<(), SceneError> {
        self.get(id)?;
        // An edge is pushed back as ready once its endpoints are queued above it
        let mut stack = vec![(id, false)];
        while let Some((current, ready)) = stack.pop() {
            let object = self.get(current)?;
            if !object.is_need_update() {
                continue;
            }
            let endpoints = match object.shape() {
                Shape::Edge(edge) if !ready => Some((edge.source(), edge.target())),
                _ => None,
            };
            match endpoints {
                Some((source, target)) => {
                    stack.push((current, true));
                    stack.push((target, false));
                    stack.push((source, false));
                }
                None => self.refresh(current)?,
            }
        }
        Ok(())
    }

    /// Recompute one object whose endpoints are already up to date
    fn refresh(&mut self, id: ObjectId) -> Result<(), SceneError> {
        if let Shape::Edge(edge) = self.get(id)?.shape() {
            let (source, target) = (edge.source(), edge.target());
            let (source_rel_pos, target_rel_pos) = (edge.source_rel_pos(), edge.target_rel_pos());
            let mut points = self.edge_mut(id)?.take_points();
            relax_endpoints(
                &mut points,
                self.get(source)?,
                source_rel_pos,
                self.get(target)?,
                target_rel_pos,
            );
            self.edge_mut(id)?.restore_points(points);
        }

        let object = self.get_mut(id)?;
        object.update_local();
        object.finish_update();
        Ok(())
    }

    /// Bring every object up to date
    pub fn update_all(&mut self) -> Result<(), SceneError> {
        for index in 0..self.objects.len() {
            self.update_object(ObjectId::from_index(index))?;
        }
        Ok(())
    }

    /// Acknowledge that an object was drawn
    pub fn view_updated(&mut self, id: ObjectId) -> Result<(), SceneError> {
        self.get_mut(id)?.view_updated();
        Ok(())
    }

    /// Objects that changed since they were last drawn
    pub fn pending_views(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| o.is_need_view_update())
    }

    /// Snapshots of every object for rendering
    pub fn views(&self) -> Vec<ObjectView> {
        self.objects.iter().map(SceneObject::view).collect()
    }

    /// Ask subscribers to redraw
    pub fn view_update(&mut self) {
        self.emit(SceneEvent::ViewUpdate);
    }

    /// Subscribe to scene notifications
    pub fn subscribe(&mut self) -> mpsc::Receiver<SceneEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    fn emit(&mut self, event: SceneEvent) {
        // Dropped receivers unsubscribe
        self.subscribers.retain(|s| s.send(event).is_ok());
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Error when building or editing a scene
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Element type does not match the object kind being created
    #[error("Invalid type for {expected:?}: {actual:?}")]
    InvalidType {
        /// Kind that was being created
        expected: ObjectKind,
        /// Type that was supplied
        actual: ScType,
    },

    /// Object not found
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// External key is already used by another object
    #[error("Duplicate external key: {0}")]
    DuplicateAddr(ScAddr),

    /// Operation needs an edge
    #[error("Object is not an edge: {0}")]
    NotAnEdge(ObjectId),

    /// Operation needs a link
    #[error("Object is not a link: {0}")]
    NotALink(ObjectId),

    /// Operation needs a node or link
    #[error("Object is not a node or link: {0}")]
    NotAPointObject(ObjectId),
}
