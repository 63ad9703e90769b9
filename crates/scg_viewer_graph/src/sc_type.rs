// SPDX-License-Identifier: MIT OR Apache-2.0
//! Element type classification.
//!
//! An [`ScType`] combines orthogonal facets: the element kind (node, link or
//! one of the edge kinds), constancy, and either a node sub-kind or an edge
//! valence/permanence. Node sub-kind bits reuse the numeric range of the edge
//! valence bits, so sub-kind predicates always check the kind bit as well.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Type tag of a graph element
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ScType: u16 {
        /// Node kind
        const NODE = 0x0001;
        /// Link (content carrying node) kind
        const LINK = 0x0002;
        /// Undirected common edge kind
        const EDGE_UCOMMON = 0x0004;
        /// Directed common edge kind
        const EDGE_DCOMMON = 0x0008;
        /// Access edge kind
        const EDGE_ACCESS = 0x0010;

        /// Constant element
        const CONST = 0x0020;
        /// Variable element
        const VAR = 0x0040;

        /// Positive access edge
        const EDGE_POS = 0x0080;
        /// Negative access edge
        const EDGE_NEG = 0x0100;
        /// Fuzzy access edge
        const EDGE_FUZ = 0x0200;
        /// Temporary access edge
        const EDGE_TEMP = 0x0400;
        /// Permanent access edge
        const EDGE_PERM = 0x0800;

        /// Tuple node
        const NODE_TUPLE = 0x0080;
        /// Structure node
        const NODE_STRUCT = 0x0100;
        /// Role relation node
        const NODE_ROLE = 0x0200;
        /// Non-role relation node
        const NODE_NOROLE = 0x0400;
        /// Class node
        const NODE_CLASS = 0x0800;
        /// Abstract node
        const NODE_ABSTRACT = 0x1000;
        /// Material node
        const NODE_MATERIAL = 0x2000;
    }
}

const fn compose(a: ScType, b: ScType) -> ScType {
    ScType::from_bits_retain(a.bits() | b.bits())
}

impl ScType {
    /// Mask of every edge kind bit
    pub const EDGE_MASK: ScType = compose(
        compose(ScType::EDGE_UCOMMON, ScType::EDGE_DCOMMON),
        ScType::EDGE_ACCESS,
    );
    /// Mask of the constancy bits
    pub const CONSTANCY_MASK: ScType = compose(ScType::CONST, ScType::VAR);

    /// Constant node
    pub const NODE_CONST: ScType = compose(ScType::NODE, ScType::CONST);
    /// Variable node
    pub const NODE_VAR: ScType = compose(ScType::NODE, ScType::VAR);
    /// Constant tuple node
    pub const NODE_CONST_TUPLE: ScType = compose(ScType::NODE_CONST, ScType::NODE_TUPLE);
    /// Constant structure node
    pub const NODE_CONST_STRUCT: ScType = compose(ScType::NODE_CONST, ScType::NODE_STRUCT);
    /// Constant role relation node
    pub const NODE_CONST_ROLE: ScType = compose(ScType::NODE_CONST, ScType::NODE_ROLE);
    /// Constant non-role relation node
    pub const NODE_CONST_NOROLE: ScType = compose(ScType::NODE_CONST, ScType::NODE_NOROLE);
    /// Constant class node
    pub const NODE_CONST_CLASS: ScType = compose(ScType::NODE_CONST, ScType::NODE_CLASS);
    /// Constant abstract node
    pub const NODE_CONST_ABSTRACT: ScType = compose(ScType::NODE_CONST, ScType::NODE_ABSTRACT);
    /// Constant material node
    pub const NODE_CONST_MATERIAL: ScType = compose(ScType::NODE_CONST, ScType::NODE_MATERIAL);
    /// Variable tuple node
    pub const NODE_VAR_TUPLE: ScType = compose(ScType::NODE_VAR, ScType::NODE_TUPLE);
    /// Variable structure node
    pub const NODE_VAR_STRUCT: ScType = compose(ScType::NODE_VAR, ScType::NODE_STRUCT);
    /// Variable role relation node
    pub const NODE_VAR_ROLE: ScType = compose(ScType::NODE_VAR, ScType::NODE_ROLE);
    /// Variable non-role relation node
    pub const NODE_VAR_NOROLE: ScType = compose(ScType::NODE_VAR, ScType::NODE_NOROLE);
    /// Variable class node
    pub const NODE_VAR_CLASS: ScType = compose(ScType::NODE_VAR, ScType::NODE_CLASS);
    /// Variable abstract node
    pub const NODE_VAR_ABSTRACT: ScType = compose(ScType::NODE_VAR, ScType::NODE_ABSTRACT);
    /// Variable material node
    pub const NODE_VAR_MATERIAL: ScType = compose(ScType::NODE_VAR, ScType::NODE_MATERIAL);

    /// Constant link
    pub const LINK_CONST: ScType = compose(ScType::LINK, ScType::CONST);
    /// Variable link
    pub const LINK_VAR: ScType = compose(ScType::LINK, ScType::VAR);

    /// Constant undirected common edge
    pub const EDGE_UCOMMON_CONST: ScType = compose(ScType::EDGE_UCOMMON, ScType::CONST);
    /// Variable undirected common edge
    pub const EDGE_UCOMMON_VAR: ScType = compose(ScType::EDGE_UCOMMON, ScType::VAR);
    /// Constant directed common edge
    pub const EDGE_DCOMMON_CONST: ScType = compose(ScType::EDGE_DCOMMON, ScType::CONST);
    /// Variable directed common edge
    pub const EDGE_DCOMMON_VAR: ScType = compose(ScType::EDGE_DCOMMON, ScType::VAR);

    /// Constant access edge
    pub const EDGE_ACCESS_CONST: ScType = compose(ScType::EDGE_ACCESS, ScType::CONST);
    /// Variable access edge
    pub const EDGE_ACCESS_VAR: ScType = compose(ScType::EDGE_ACCESS, ScType::VAR);

    /// Constant positive permanent access edge
    pub const EDGE_ACCESS_CONST_POS_PERM: ScType =
        compose(compose(ScType::EDGE_ACCESS_CONST, ScType::EDGE_POS), ScType::EDGE_PERM);
    /// Constant negative permanent access edge
    pub const EDGE_ACCESS_CONST_NEG_PERM: ScType =
        compose(compose(ScType::EDGE_ACCESS_CONST, ScType::EDGE_NEG), ScType::EDGE_PERM);
    /// Constant fuzzy permanent access edge
    pub const EDGE_ACCESS_CONST_FUZ_PERM: ScType =
        compose(compose(ScType::EDGE_ACCESS_CONST, ScType::EDGE_FUZ), ScType::EDGE_PERM);
    /// Constant positive temporary access edge
    pub const EDGE_ACCESS_CONST_POS_TEMP: ScType =
        compose(compose(ScType::EDGE_ACCESS_CONST, ScType::EDGE_POS), ScType::EDGE_TEMP);
    /// Constant negative temporary access edge
    pub const EDGE_ACCESS_CONST_NEG_TEMP: ScType =
        compose(compose(ScType::EDGE_ACCESS_CONST, ScType::EDGE_NEG), ScType::EDGE_TEMP);
    /// Constant fuzzy temporary access edge
    pub const EDGE_ACCESS_CONST_FUZ_TEMP: ScType =
        compose(compose(ScType::EDGE_ACCESS_CONST, ScType::EDGE_FUZ), ScType::EDGE_TEMP);
    /// Variable positive permanent access edge
    pub const EDGE_ACCESS_VAR_POS_PERM: ScType =
        compose(compose(ScType::EDGE_ACCESS_VAR, ScType::EDGE_POS), ScType::EDGE_PERM);
    /// Variable negative permanent access edge
    pub const EDGE_ACCESS_VAR_NEG_PERM: ScType =
        compose(compose(ScType::EDGE_ACCESS_VAR, ScType::EDGE_NEG), ScType::EDGE_PERM);
    /// Variable fuzzy permanent access edge
    pub const EDGE_ACCESS_VAR_FUZ_PERM: ScType =
        compose(compose(ScType::EDGE_ACCESS_VAR, ScType::EDGE_FUZ), ScType::EDGE_PERM);
    /// Variable positive temporary access edge
    pub const EDGE_ACCESS_VAR_POS_TEMP: ScType =
        compose(compose(ScType::EDGE_ACCESS_VAR, ScType::EDGE_POS), ScType::EDGE_TEMP);
    /// Variable negative temporary access edge
    pub const EDGE_ACCESS_VAR_NEG_TEMP: ScType =
        compose(compose(ScType::EDGE_ACCESS_VAR, ScType::EDGE_NEG), ScType::EDGE_TEMP);
    /// Variable fuzzy temporary access edge
    pub const EDGE_ACCESS_VAR_FUZ_TEMP: ScType =
        compose(compose(ScType::EDGE_ACCESS_VAR, ScType::EDGE_FUZ), ScType::EDGE_TEMP);

    /// Check if this is a node type
    pub fn is_node(self) -> bool {
        self.contains(Self::NODE)
    }

    /// Check if this is a link type
    pub fn is_link(self) -> bool {
        self.contains(Self::LINK)
    }

    /// Check if this is any edge type
    pub fn is_edge(self) -> bool {
        self.intersects(Self::EDGE_MASK)
    }

    /// Check if this is an access edge
    pub fn is_access(self) -> bool {
        self.contains(Self::EDGE_ACCESS)
    }

    /// Check if this is a common (undirected or directed) edge
    pub fn is_common(self) -> bool {
        self.intersects(compose(Self::EDGE_UCOMMON, Self::EDGE_DCOMMON))
    }

    /// Check if the edge is oriented (access edges and directed common edges)
    pub fn has_direction(self) -> bool {
        self.intersects(compose(Self::EDGE_DCOMMON, Self::EDGE_ACCESS))
    }

    /// Check if the type carries a constancy facet
    pub fn has_constancy(self) -> bool {
        self.intersects(Self::CONSTANCY_MASK)
    }

    /// Check if the element is constant
    pub fn is_const(self) -> bool {
        self.contains(Self::CONST)
    }

    /// Check if the element is variable
    pub fn is_var(self) -> bool {
        self.contains(Self::VAR)
    }

    fn edge_has(self, flag: ScType) -> bool {
        self.is_edge() && self.contains(flag)
    }

    fn node_has(self, flag: ScType) -> bool {
        self.is_node() && self.contains(flag)
    }

    /// Positive access edge
    pub fn is_pos(self) -> bool {
        self.edge_has(Self::EDGE_POS)
    }

    /// Negative access edge
    pub fn is_neg(self) -> bool {
        self.edge_has(Self::EDGE_NEG)
    }

    /// Fuzzy access edge
    pub fn is_fuz(self) -> bool {
        self.edge_has(Self::EDGE_FUZ)
    }

    /// Permanent access edge
    pub fn is_perm(self) -> bool {
        self.edge_has(Self::EDGE_PERM)
    }

    /// Temporary access edge
    pub fn is_temp(self) -> bool {
        self.edge_has(Self::EDGE_TEMP)
    }

    /// Tuple node
    pub fn is_tuple(self) -> bool {
        self.node_has(Self::NODE_TUPLE)
    }

    /// Structure node
    pub fn is_struct(self) -> bool {
        self.node_has(Self::NODE_STRUCT)
    }

    /// Role relation node
    pub fn is_role(self) -> bool {
        self.node_has(Self::NODE_ROLE)
    }

    /// Non-role relation node
    pub fn is_no_role(self) -> bool {
        self.node_has(Self::NODE_NOROLE)
    }

    /// Class node
    pub fn is_class(self) -> bool {
        self.node_has(Self::NODE_CLASS)
    }

    /// Abstract node
    pub fn is_abstract(self) -> bool {
        self.node_has(Self::NODE_ABSTRACT)
    }

    /// Material node
    pub fn is_material(self) -> bool {
        self.node_has(Self::NODE_MATERIAL)
    }
}

/// External stable key of an element (address in the knowledge base)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScAddr(pub u64);

impl fmt::Display for ScAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
