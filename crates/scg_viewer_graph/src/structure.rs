// SPDX-License-Identifier: MIT OR Apache-2.0
//! Materializing element descriptions into a scene.
//!
//! Descriptions arrive in any order, and an edge may reference endpoints
//! (including other edges) that have not been created yet. [`StructBuilder`]
//! resolves them with repeated passes until a pass makes no progress.

use crate::content::Content;
use crate::object::ObjectId;
use crate::sc_type::{ScAddr, ScType};
use crate::scene::{Scene, SceneError};
use serde::{Deserialize, Serialize};

/// Description of one element of a structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// External key
    pub addr: ScAddr,
    /// Element type
    pub sc_type: ScType,
    /// Source key (edges only)
    pub src: Option<ScAddr>,
    /// Target key (edges only)
    pub trg: Option<ScAddr>,
    /// Display text
    pub alias: Option<String>,
    /// Link content
    pub content: Option<Content>,
}

impl ObjectInfo {
    /// Describe a node
    pub fn node(addr: ScAddr, sc_type: ScType) -> Self {
        Self {
            addr,
            sc_type,
            src: None,
            trg: None,
            alias: None,
            content: None,
        }
    }

    /// Describe a link
    pub fn link(addr: ScAddr, sc_type: ScType, content: Option<Content>) -> Self {
        Self {
            content,
            ..Self::node(addr, sc_type)
        }
    }

    /// Describe an edge
    pub fn edge(addr: ScAddr, sc_type: ScType, src: ScAddr, trg: ScAddr) -> Self {
        Self {
            src: Some(src),
            trg: Some(trg),
            ..Self::node(addr, sc_type)
        }
    }

    /// Set the display text
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Queue of descriptions waiting to be materialized
#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    queue: Vec<ObjectInfo>,
}

impl StructBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a description
    pub fn add_object(&mut self, info: ObjectInfo) {
        self.queue.push(info);
    }

    /// Queue several descriptions
    pub fn extend(&mut self, infos: impl IntoIterator<Item = ObjectInfo>) {
        self.queue.extend(infos);
    }

    /// Descriptions not yet materialized
    pub fn pending(&self) -> &[ObjectInfo] {
        &self.queue
    }

    /// Drop every queued description
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Materialize everything that can be resolved.
    ///
    /// Descriptions whose key already exists in the scene are skipped, so
    /// re-submitting a fragment is harmless. Returns the created objects in
    /// creation order. If some edges can never get both endpoints, they stay
    /// queued and [`StructError::Unresolved`] is returned; whatever was
    /// created before that remains in the scene. A description the scene
    /// rejects aborts the update and drops the queue.
    pub fn update(&mut self, scene: &mut Scene) -> Result<Vec<ObjectId>, StructError> {
        let mut queue = std::mem::take(&mut self.queue);
        let mut created = Vec::new();
        let mut pass = 0usize;

        loop {
            pass += 1;
            let mut deferred = Vec::new();
            let before = created.len();

            for info in queue {
                if scene.id_by_addr(info.addr).is_some() {
                    continue;
                }
                match materialize(scene, &info) {
                    Ok(Some(id)) => created.push(id),
                    Ok(None) => deferred.push(info),
                    Err(e) => return Err(e.into()),
                }
            }

            queue = deferred;
            tracing::trace!(
                "Structure pass {}: {} created, {} deferred",
                pass,
                created.len() - before,
                queue.len()
            );
            if created.len() == before || queue.is_empty() {
                break;
            }
        }

        tracing::debug!(
            "Structure resolved in {} passes: {} created, {} unresolved",
            pass,
            created.len(),
            queue.len()
        );

        if queue.is_empty() {
            return Ok(created);
        }

        let unresolved = queue.iter().map(|info| info.addr).collect();
        self.queue = queue;
        Err(StructError::Unresolved { unresolved })
    }
}

/// Create the object for `info`, or `None` if an edge endpoint is missing
fn materialize(scene: &mut Scene, info: &ObjectInfo) -> Result<Option<ObjectId>, SceneError> {
    let text = info.alias.clone().unwrap_or_default();
    let addr = Some(info.addr);

    if info.sc_type.is_edge() {
        let endpoints = info
            .src
            .and_then(|src| scene.id_by_addr(src))
            .zip(info.trg.and_then(|trg| scene.id_by_addr(trg)));
        return match endpoints {
            Some((source, target)) => scene
                .create_edge(info.sc_type, source, target, text, addr)
                .map(Some),
            None => Ok(None),
        };
    }

    if info.sc_type.is_link() {
        return scene
            .create_link(info.sc_type, text, addr, info.content.as_ref())
            .map(Some);
    }

    scene.create_node(info.sc_type, text, addr).map(Some)
}

/// Error while materializing a structure
#[derive(Debug, thiserror::Error)]
pub enum StructError {
    /// Some descriptions could not be resolved
    #[error("Unable to resolve {} elements: {unresolved:?}", .unresolved.len())]
    Unresolved {
        /// Keys of the unresolved descriptions
        unresolved: Vec<ScAddr>,
    },

    /// Scene rejected a description
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn adjacency(scene: &Scene) -> Vec<(ScAddr, Vec<ScAddr>)> {
        let mut result: Vec<_> = scene
            .objects()
            .map(|o| {
                let mut adj: Vec<_> = o
                    .adjacent()
                    .iter()
                    .filter_map(|id| scene.object(*id).and_then(|a| a.addr()))
                    .collect();
                adj.sort();
                (o.addr().unwrap(), adj)
            })
            .collect();
        result.sort();
        result
    }

    fn endpoints(scene: &Scene, addr: u64) -> (ScAddr, ScAddr) {
        let edge = scene.object_by_addr(ScAddr(addr)).unwrap().as_edge().unwrap();
        (
            scene.object(edge.source()).unwrap().addr().unwrap(),
            scene.object(edge.target()).unwrap().addr().unwrap(),
        )
    }

    /// Nodes 0, 1, 4, 6, link 7 and edges between them, including an edge
    /// that targets another edge
    fn sample() -> Vec<ObjectInfo> {
        vec![
            ObjectInfo::edge(ScAddr(3), ScType::EDGE_DCOMMON_CONST, ScAddr(0), ScAddr(1)),
            ObjectInfo::node(ScAddr(0), ScType::NODE_CONST).with_alias("node 0"),
            ObjectInfo::node(ScAddr(1), ScType::NODE_CONST).with_alias("node 1"),
            ObjectInfo::node(ScAddr(4), ScType::NODE_CONST),
            ObjectInfo::edge(ScAddr(5), ScType::EDGE_ACCESS_CONST_POS_PERM, ScAddr(4), ScAddr(0)),
            ObjectInfo::node(ScAddr(6), ScType::NODE_CONST),
            ObjectInfo::link(
                ScAddr(7),
                ScType::LINK_CONST,
                Some(Content::from_text("t<b>e</b>st")),
            ),
            ObjectInfo::edge(ScAddr(8), ScType::EDGE_DCOMMON_CONST, ScAddr(6), ScAddr(7)),
            ObjectInfo::edge(ScAddr(9), ScType::EDGE_ACCESS_CONST_POS_PERM, ScAddr(4), ScAddr(6)),
            ObjectInfo::edge(ScAddr(10), ScType::EDGE_ACCESS_CONST_POS_PERM, ScAddr(9), ScAddr(3)),
        ]
    }

    #[test]
    fn test_edge_before_endpoints() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.add_object(ObjectInfo::edge(
            ScAddr(2),
            ScType::EDGE_ACCESS_CONST_POS_PERM,
            ScAddr(0),
            ScAddr(1),
        ));
        builder.add_object(ObjectInfo::node(ScAddr(1), ScType::NODE_CONST));
        builder.add_object(ObjectInfo::node(ScAddr(0), ScType::NODE_CONST));

        let created = builder.update(&mut scene).unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(scene.nodes().count(), 2);
        assert_eq!(scene.edges().count(), 1);
        assert_eq!(endpoints(&scene, 2), (ScAddr(0), ScAddr(1)));
        assert!(builder.pending().is_empty());
    }

    #[test]
    fn test_full_sample() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.extend(sample());
        builder.update(&mut scene).unwrap();

        assert_eq!(scene.nodes().count(), 4);
        assert_eq!(scene.links().count(), 1);
        assert_eq!(scene.edges().count(), 5);
        assert_eq!(endpoints(&scene, 10), (ScAddr(9), ScAddr(3)));
        assert_eq!(scene.object_by_addr(ScAddr(0)).unwrap().text(), "node 0");
        assert!(scene
            .object_by_addr(ScAddr(7))
            .unwrap()
            .as_link()
            .unwrap()
            .content()
            .is_some());
    }

    #[test]
    fn test_missing_endpoint_keeps_partial_result() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.add_object(ObjectInfo::node(ScAddr(0), ScType::NODE_CONST));
        builder.add_object(ObjectInfo::edge(
            ScAddr(2),
            ScType::EDGE_UCOMMON,
            ScAddr(42),
            ScAddr(0),
        ));
        builder.add_object(ObjectInfo::link(ScAddr(1), ScType::LINK, None));

        match builder.update(&mut scene) {
            Err(StructError::Unresolved { unresolved }) => assert_eq!(unresolved, vec![ScAddr(2)]),
            other => panic!("expected unresolved error, got {other:?}"),
        }
        assert_eq!(scene.len(), 2);
        assert!(scene.object_by_addr(ScAddr(0)).is_some());
        assert!(scene.object_by_addr(ScAddr(1)).is_some());
        assert_eq!(builder.pending().len(), 1);

        // A later fragment completes the pending edge
        builder.add_object(ObjectInfo::node(ScAddr(42), ScType::NODE_VAR));
        let created = builder.update(&mut scene).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(endpoints(&scene, 2), (ScAddr(42), ScAddr(0)));
    }

    #[test]
    fn test_edge_without_endpoint_keys() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.add_object(ObjectInfo::node(ScAddr(5), ScType::EDGE_ACCESS));
        assert!(matches!(
            builder.update(&mut scene),
            Err(StructError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_resubmission_is_idempotent() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.extend(sample());
        builder.update(&mut scene).unwrap();
        let count = scene.len();

        builder.extend(sample());
        let created = builder.update(&mut scene).unwrap();
        assert!(created.is_empty());
        assert_eq!(scene.len(), count);
    }

    #[test]
    fn test_untyped_description_is_fatal() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.add_object(ObjectInfo::node(ScAddr(1), ScType::CONST));
        assert!(matches!(
            builder.update(&mut scene),
            Err(StructError::Scene(SceneError::InvalidType { .. }))
        ));
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let mut scene = Scene::new();
        let mut builder = StructBuilder::new();
        builder.add_object(ObjectInfo::edge(ScAddr(1), ScType::EDGE_UCOMMON, ScAddr(2), ScAddr(2)));
        builder.add_object(ObjectInfo::edge(ScAddr(2), ScType::EDGE_UCOMMON, ScAddr(1), ScAddr(1)));
        match builder.update(&mut scene) {
            Err(StructError::Unresolved { unresolved }) => assert_eq!(unresolved.len(), 2),
            other => panic!("expected unresolved error, got {other:?}"),
        }
        assert!(scene.is_empty());
    }

    proptest! {
        #[test]
        fn prop_order_independent(order in Just(sample()).prop_shuffle()) {
            let mut reference = Scene::new();
            let mut builder = StructBuilder::new();
            builder.extend(sample());
            builder.update(&mut reference).unwrap();

            let mut scene = Scene::new();
            let mut builder = StructBuilder::new();
            builder.extend(order);
            builder.update(&mut scene).unwrap();

            prop_assert_eq!(scene.len(), reference.len());
            prop_assert_eq!(adjacency(&scene), adjacency(&reference));
            for edge in [3u64, 5, 8, 9, 10] {
                prop_assert_eq!(endpoints(&scene, edge), endpoints(&reference, edge));
            }
        }
    }
}
