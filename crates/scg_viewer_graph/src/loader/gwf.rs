// SPDX-License-Identifier: MIT OR Apache-2.0
//! GWF document loader.
//!
//! A GWF file keeps its elements in a `staticSector`: `node` entries carry a
//! position and optional content, `arc` and `pair` entries connect two other
//! entries by id. Entries may appear in any order and edges may connect
//! edges, so the elements are materialized through a [`StructBuilder`] and
//! positioned afterwards.

use crate::content::{Content, ContentProvider};
use crate::math::Vector2;
use crate::sc_type::{ScAddr, ScType};
use crate::scene::{Scene, SceneError};
use crate::structure::{ObjectInfo, StructBuilder, StructError};
use serde::Deserialize;
use std::collections::HashSet;

/// Content type code of a node without content
const CONTENT_NONE: u8 = 0;

#[derive(Debug, Deserialize)]
struct GwfDocument {
    #[serde(rename = "staticSector", default)]
    static_sector: StaticSector,
}

#[derive(Debug, Default, Deserialize)]
struct StaticSector {
    #[serde(rename = "node", default)]
    nodes: Vec<GwfNode>,
    #[serde(rename = "arc", default)]
    arcs: Vec<GwfEdge>,
    #[serde(rename = "pair", default)]
    pairs: Vec<GwfEdge>,
}

#[derive(Debug, Deserialize)]
struct GwfNode {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type", default)]
    type_name: String,
    #[serde(rename = "@idtf", default)]
    idtf: String,
    #[serde(rename = "@x", default)]
    x: f32,
    #[serde(rename = "@y", default)]
    y: f32,
    content: Option<GwfContent>,
}

#[derive(Debug, Deserialize)]
struct GwfContent {
    #[serde(rename = "@type", default)]
    content_type: u8,
    #[serde(rename = "@mime_type", default)]
    mime_type: String,
    #[serde(rename = "$text", default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct GwfEdge {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type", default)]
    type_name: String,
    #[serde(rename = "@idtf", default)]
    idtf: String,
    #[serde(rename = "@id_b")]
    id_b: String,
    #[serde(rename = "@id_e")]
    id_e: String,
    #[serde(rename = "@dotBBalance", default)]
    dot_b_balance: f32,
    #[serde(rename = "@dotEBalance", default)]
    dot_e_balance: f32,
    points: Option<GwfPoints>,
}

#[derive(Debug, Default, Deserialize)]
struct GwfPoints {
    #[serde(rename = "point", default)]
    points: Vec<GwfPoint>,
}

#[derive(Debug, Deserialize)]
struct GwfPoint {
    #[serde(rename = "@x")]
    x: f32,
    #[serde(rename = "@y")]
    y: f32,
}

/// Geometry read from the document, applied once objects exist
#[derive(Debug)]
enum Placement {
    Point(Vector2),
    Edge {
        source_rel_pos: f32,
        target_rel_pos: f32,
        interior: Vec<Vector2>,
    },
}

/// Map a document type name to an element type
fn lookup_type(name: &str) -> Option<ScType> {
    let sc_type = match name {
        "node/-/not_define" => ScType::NODE,
        "node/const/general_node" | "node/const/general" => ScType::NODE_CONST,
        "node/var/general_node" | "node/const/var" => ScType::NODE_VAR,
        "node/const/relation" => ScType::NODE_CONST_NOROLE,
        "node/var/relation" => ScType::NODE_VAR_NOROLE,
        "node/const/attribute" => ScType::NODE_CONST_ROLE,
        "node/var/attribute" => ScType::NODE_VAR_ROLE,
        "node/const/nopredmet" => ScType::NODE_CONST_STRUCT,
        "node/var/nopredmet" => ScType::NODE_VAR_STRUCT,
        "node/const/predmet" => ScType::NODE_CONST_ABSTRACT,
        "node/var/predmet" => ScType::NODE_VAR_ABSTRACT,
        "node/const/group" => ScType::NODE_CONST_CLASS,
        "node/var/group" => ScType::NODE_VAR_CLASS,
        "node/const/asymmetry" | "node/const/symmetry" | "node/const/tuple" => {
            ScType::NODE_CONST_TUPLE
        }
        "node/var/asymmetry" | "node/var/symmetry" | "node/var/tuple" => ScType::NODE_VAR_TUPLE,
        "node/const/material" => ScType::NODE_CONST_MATERIAL,
        "node/var/material" => ScType::NODE_VAR_MATERIAL,

        "arc/-/-" => ScType::EDGE_ACCESS,
        "pair/orient" => ScType::EDGE_DCOMMON,
        "pair/noorient" => ScType::EDGE_UCOMMON,
        "pair/const/synonym" | "pair/const/noorient" => ScType::EDGE_UCOMMON_CONST,
        "pair/var/synonym" | "pair/var/noorient" => ScType::EDGE_UCOMMON_VAR,
        "pair/const/orient" => ScType::EDGE_DCOMMON_CONST,
        "pair/var/orient" => ScType::EDGE_DCOMMON_VAR,
        "arc/const/fuz" => ScType::EDGE_ACCESS_CONST_FUZ_PERM,
        "arc/var/fuz" => ScType::EDGE_ACCESS_VAR_FUZ_PERM,
        "arc/const/fuz/temp" => ScType::EDGE_ACCESS_CONST_FUZ_TEMP,
        "arc/var/fuz/temp" => ScType::EDGE_ACCESS_VAR_FUZ_TEMP,
        "arc/const/neg" => ScType::EDGE_ACCESS_CONST_NEG_PERM,
        "arc/var/neg" => ScType::EDGE_ACCESS_VAR_NEG_PERM,
        "arc/const/neg/temp" => ScType::EDGE_ACCESS_CONST_NEG_TEMP,
        "arc/var/neg/temp" => ScType::EDGE_ACCESS_VAR_NEG_TEMP,
        "arc/const/pos" => ScType::EDGE_ACCESS_CONST_POS_PERM,
        "arc/var/pos" => ScType::EDGE_ACCESS_VAR_POS_PERM,
        "arc/const/pos/temp" => ScType::EDGE_ACCESS_CONST_POS_TEMP,
        "arc/var/pos/temp" => ScType::EDGE_ACCESS_VAR_POS_TEMP,
        _ => return None,
    };
    Some(sc_type)
}

fn resolve_type(name: &str, fallback: ScType, is_kind: fn(ScType) -> bool) -> ScType {
    match lookup_type(name) {
        Some(sc_type) if is_kind(sc_type) => sc_type,
        _ => {
            tracing::warn!("Unknown element type '{}', using {:?}", name, fallback);
            fallback
        }
    }
}

/// Element type for a node entry; unknown names become a generic node
pub fn resolve_node_type(name: &str) -> ScType {
    resolve_type(name, ScType::NODE, ScType::is_node)
}

/// Element type for an arc or pair entry; unknown names become an
/// undirected common edge
pub fn resolve_edge_type(name: &str) -> ScType {
    resolve_type(name, ScType::EDGE_UCOMMON, ScType::is_edge)
}

fn parse_id(id: &str) -> Result<ScAddr, GwfError> {
    id.trim()
        .parse::<u64>()
        .map(ScAddr)
        .map_err(|_| GwfError::InvalidId(id.to_string()))
}

/// Loader for GWF documents
#[derive(Debug, Clone, Copy, Default)]
pub struct GwfLoader;

impl GwfLoader {
    /// Create a loader
    pub fn new() -> Self {
        Self
    }

    /// Load a document into a new scene using the default content provider
    pub fn load(&self, data: &str) -> Result<Scene, GwfError> {
        let mut scene = Scene::new();
        self.load_into(data, &mut scene)?;
        Ok(scene)
    }

    /// Load a document into a new scene that sizes content with `provider`
    pub fn load_with_provider(
        &self,
        data: &str,
        provider: Box<dyn ContentProvider>,
    ) -> Result<Scene, GwfError> {
        let mut scene = Scene::with_content_provider(provider);
        self.load_into(data, &mut scene)?;
        Ok(scene)
    }

    /// Load a document into an existing scene.
    ///
    /// Document ids become the external keys of the created objects and
    /// must not already be used in the scene. On error the scene may hold
    /// the objects created before the failure.
    pub fn load_into(&self, data: &str, scene: &mut Scene) -> Result<(), GwfError> {
        let document: GwfDocument = quick_xml::de::from_str(data)?;
        let sector = document.static_sector;
        tracing::debug!(
            "Parsed GWF: {} nodes, {} arcs, {} pairs",
            sector.nodes.len(),
            sector.arcs.len(),
            sector.pairs.len()
        );

        let mut seen = HashSet::new();
        let mut builder = StructBuilder::new();
        let mut placements = Vec::new();

        for node in &sector.nodes {
            let addr = parse_id(&node.id)?;
            if !seen.insert(addr) || scene.id_by_addr(addr).is_some() {
                return Err(GwfError::DuplicateId(addr));
            }

            let node_type = resolve_node_type(&node.type_name);
            let info = match &node.content {
                Some(content) if content.content_type != CONTENT_NONE => {
                    let link_type = if node_type.is_var() {
                        ScType::LINK_VAR
                    } else {
                        ScType::LINK_CONST
                    };
                    let payload = Content::new(content.data.trim(), content.mime_type.clone());
                    ObjectInfo::link(addr, link_type, Some(payload))
                }
                _ => ObjectInfo::node(addr, node_type),
            };
            builder.add_object(info.with_alias(node.idtf.clone()));
            placements.push((addr, Placement::Point(Vector2::new(node.x, node.y))));
        }

        for edge in sector.arcs.iter().chain(&sector.pairs) {
            let addr = parse_id(&edge.id)?;
            if !seen.insert(addr) || scene.id_by_addr(addr).is_some() {
                return Err(GwfError::DuplicateId(addr));
            }

            let info = ObjectInfo::edge(
                addr,
                resolve_edge_type(&edge.type_name),
                parse_id(&edge.id_b)?,
                parse_id(&edge.id_e)?,
            );
            builder.add_object(info.with_alias(edge.idtf.clone()));

            let interior = edge
                .points
                .iter()
                .flat_map(|p| &p.points)
                .map(|p| Vector2::new(p.x, p.y))
                .collect();
            placements.push((
                addr,
                Placement::Edge {
                    source_rel_pos: edge.dot_b_balance,
                    target_rel_pos: edge.dot_e_balance,
                    interior,
                },
            ));
        }

        builder.update(scene)?;

        for (addr, placement) in placements {
            let Some(id) = scene.id_by_addr(addr) else {
                continue;
            };
            match placement {
                Placement::Point(pos) => scene.set_position(id, pos)?,
                Placement::Edge {
                    source_rel_pos,
                    target_rel_pos,
                    interior,
                } => {
                    scene.set_edge_rel_pos(id, source_rel_pos, target_rel_pos)?;
                    scene.set_edge_points(id, &interior)?;
                }
            }
        }

        scene.update_all()?;
        tracing::info!("Loaded GWF document with {} objects", scene.len());
        Ok(())
    }
}

/// Error while loading a GWF document
#[derive(Debug, thiserror::Error)]
pub enum GwfError {
    /// Document is not well-formed GWF
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Element id is not numeric
    #[error("Invalid element id: {0:?}")]
    InvalidId(String),

    /// Two entries share an id
    #[error("Element with id {0} already parsed")]
    DuplicateId(ScAddr),

    /// Some edges reference entries that do not exist
    #[error(transparent)]
    Structure(#[from] StructError),

    /// Scene rejected an operation
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    // 2x3 transparent PNG
    const PNG_2X3: &str = "iVBORw0KGgoAAAANSUhEUgAAAAIAAAADCAYAAAC56t6BAAAAC0lEQVR4nGNgwAkAABsAAco8Sg0AAAAASUVORK5CYII=";

    fn document(sector: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<GWF version="2.0">
    <staticSector>
{sector}
    </staticSector>
</GWF>"#
        )
    }

    fn node(id: u64, type_name: &str, x: f32, y: f32) -> String {
        format!(
            r#"<node type="{type_name}" idtf="n{id}" shapeColor="0" id="{id}" parent="0" left="0" top="0" right="20" bottom="20" textColor="164" x="{x}" y="{y}" haveBus="false" idtf_pos="0">
    <content type="0" mime_type="" file_name=""/>
</node>"#
        )
    }

    fn arc(tag: &str, id: u64, type_name: &str, b: u64, e: u64) -> String {
        format!(
            r#"<{tag} type="{type_name}" idtf="" shapeColor="0" id="{id}" parent="0" id_b="{b}" id_e="{e}" b_x="0" b_y="0" e_x="0" e_y="0" dotBBalance="0" dotEBalance="0">
    <points/>
</{tag}>"#
        )
    }

    #[test]
    fn test_node_without_content() {
        let data = document(&node(5, "node/const/general_node", 10.0, 20.0));
        let scene = GwfLoader::new().load(&data).unwrap();

        assert_eq!(scene.len(), 1);
        let object = scene.object_by_addr(ScAddr(5)).unwrap();
        assert_eq!(object.kind(), ObjectKind::Node);
        assert_eq!(object.sc_type(), ScType::NODE_CONST);
        assert_eq!(object.position(), Some(Vector2::new(10.0, 20.0)));
        assert_eq!(object.text(), "n5");
    }

    #[test]
    fn test_node_with_content_becomes_link() {
        let data = document(&format!(
            r#"<node type="node/const/general_node" idtf="" id="5" x="10" y="20">
    <content type="4" mime_type="image/png" file_name="dot.png">{PNG_2X3}</content>
</node>"#
        ));
        let scene = GwfLoader::new().load(&data).unwrap();

        assert_eq!(scene.nodes().count(), 0);
        let object = scene.object_by_addr(ScAddr(5)).unwrap();
        assert_eq!(object.sc_type(), ScType::LINK_CONST);
        assert_eq!(object.position(), Some(Vector2::new(10.0, 20.0)));

        let link = object.as_link().unwrap();
        assert_eq!(link.bounds().size, Vector2::new(3.0, 4.0));
        assert_eq!(link.bounds().center(), Vector2::new(10.0, 20.0));
    }

    #[test]
    fn test_var_content_node_becomes_var_link() {
        let data = document(
            r#"<node type="node/var/general_node" idtf="" id="1" x="0" y="0">
    <content type="1" mime_type="content_string" file_name="">dGV4dA==</content>
</node>"#,
        );
        let scene = GwfLoader::new().load(&data).unwrap();
        assert_eq!(
            scene.object_by_addr(ScAddr(1)).unwrap().sc_type(),
            ScType::LINK_VAR
        );
    }

    #[test]
    fn test_unknown_types_fall_back() {
        let data = document(&[
            node(1, "node/const/unknown", 0.0, 0.0),
            node(2, "arc/const/pos", 50.0, 0.0),
            arc("arc", 3, "arc/const/whatever", 1, 2),
        ]
        .join("\n"));
        let scene = GwfLoader::new().load(&data).unwrap();

        assert_eq!(scene.object_by_addr(ScAddr(1)).unwrap().sc_type(), ScType::NODE);
        assert_eq!(scene.object_by_addr(ScAddr(2)).unwrap().sc_type(), ScType::NODE);
        assert_eq!(
            scene.object_by_addr(ScAddr(3)).unwrap().sc_type(),
            ScType::EDGE_UCOMMON
        );
    }

    #[test]
    fn test_type_table() {
        assert_eq!(resolve_node_type("node/const/var"), ScType::NODE_VAR);
        assert_eq!(resolve_node_type("node/var/symmetry"), ScType::NODE_VAR_TUPLE);
        assert_eq!(resolve_node_type("node/const/group"), ScType::NODE_CONST_CLASS);
        assert_eq!(resolve_edge_type("pair/const/synonym"), ScType::EDGE_UCOMMON_CONST);
        assert_eq!(resolve_edge_type("arc/var/neg/temp"), ScType::EDGE_ACCESS_VAR_NEG_TEMP);
        assert_eq!(resolve_edge_type("arc/-/-"), ScType::EDGE_ACCESS);
    }

    #[test]
    fn test_edges_out_of_order() {
        // Edge 11 targets edge 10, which is listed after it
        let data = document(&[
            arc("pair", 11, "pair/const/orient", 3, 10),
            node(1, "node/const/general_node", 0.0, 0.0),
            arc("arc", 10, "arc/const/pos", 1, 2),
            node(2, "node/const/general_node", 100.0, 0.0),
            node(3, "node/const/general_node", 50.0, 100.0),
        ]
        .join("\n"));
        let scene = GwfLoader::new().load(&data).unwrap();

        assert_eq!(scene.nodes().count(), 3);
        assert_eq!(scene.edges().count(), 2);

        let target = scene.id_by_addr(ScAddr(10)).unwrap();
        let edge = scene.object_by_addr(ScAddr(11)).unwrap().as_edge().unwrap();
        assert_eq!(edge.target(), target);
        assert!(scene.objects().all(|o| !o.is_need_update()));
        // The edge-to-edge arrow ends on the target edge's line
        let end = *edge.points().last().unwrap();
        assert!(end.y.abs() < 1.0e-3);
    }

    #[test]
    fn test_edge_geometry() {
        let data = document(&[
            node(1, "node/const/general_node", 0.0, 0.0),
            node(2, "node/const/general_node", 100.0, 0.0),
            r#"<arc type="arc/const/pos" idtf="" id="3" id_b="1" id_e="2" dotBBalance="0.25" dotEBalance="0.75">
    <points>
        <point x="50" y="50"/>
    </points>
</arc>"#
                .to_string(),
        ]
        .join("\n"));
        let scene = GwfLoader::new().load(&data).unwrap();

        let edge = scene.object_by_addr(ScAddr(3)).unwrap().as_edge().unwrap();
        assert_eq!(edge.source_rel_pos(), 0.25);
        assert_eq!(edge.target_rel_pos(), 0.75);
        assert_eq!(edge.points().len(), 3);
        assert_eq!(edge.points()[1], Vector2::new(50.0, 50.0));
    }

    #[test]
    fn test_duplicate_id() {
        let data = document(&[
            node(1, "node/const/general_node", 0.0, 0.0),
            node(2, "node/const/general_node", 0.0, 0.0),
            arc("arc", 1, "arc/const/pos", 1, 2),
        ]
        .join("\n"));
        assert!(matches!(
            GwfLoader::new().load(&data),
            Err(GwfError::DuplicateId(ScAddr(1)))
        ));
    }

    #[test]
    fn test_id_already_in_scene() {
        let mut scene = Scene::new();
        let id = scene.create_node(ScType::NODE_CONST, "mine", Some(ScAddr(1))).unwrap();
        scene.set_position(id, Vector2::new(500.0, 500.0)).unwrap();
        scene.update_all().unwrap();

        let data = document(&node(1, "node/const/general_node", 10.0, 20.0));
        assert!(matches!(
            GwfLoader::new().load_into(&data, &mut scene),
            Err(GwfError::DuplicateId(ScAddr(1)))
        ));

        let object = scene.object(id).unwrap();
        assert_eq!(object.position(), Some(Vector2::new(500.0, 500.0)));
        assert_eq!(object.text(), "mine");
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_edge_id_already_in_scene() {
        let mut scene = Scene::new();
        scene.create_node(ScType::NODE_CONST, "", Some(ScAddr(3))).unwrap();

        let data = document(&[
            node(1, "node/const/general_node", 0.0, 0.0),
            node(2, "node/const/general_node", 100.0, 0.0),
            arc("arc", 3, "arc/const/pos", 1, 2),
        ]
        .join("\n"));
        assert!(matches!(
            GwfLoader::new().load_into(&data, &mut scene),
            Err(GwfError::DuplicateId(ScAddr(3)))
        ));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_missing_endpoint() {
        let data = document(&[
            node(1, "node/const/general_node", 0.0, 0.0),
            arc("arc", 2, "arc/const/pos", 1, 99),
        ]
        .join("\n"));
        let mut scene = Scene::new();
        let result = GwfLoader::new().load_into(&data, &mut scene);

        match result {
            Err(GwfError::Structure(StructError::Unresolved { unresolved })) => {
                assert_eq!(unresolved, vec![ScAddr(2)]);
            }
            other => panic!("expected unresolved error, got {other:?}"),
        }
        assert!(scene.object_by_addr(ScAddr(1)).is_some());
    }

    #[test]
    fn test_invalid_id() {
        let data = document(
            &node(1, "node/const/general_node", 0.0, 0.0).replace("id=\"1\"", "id=\"abc\""),
        );
        assert!(matches!(
            GwfLoader::new().load(&data),
            Err(GwfError::InvalidId(id)) if id == "abc"
        ));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            GwfLoader::new().load("<GWF><staticSector><node id=\"1\""),
            Err(GwfError::Xml(_))
        ));
    }
}
