// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The DMR: a protocol-neutral schema tree for one dataset.
//!
//! Nodes live in a flat arena and refer to each other by `NodeId`. The
//! root is always node 0 and is the Dataset. Shared dimensions are nodes
//! of their own and variables point at them, so two variables declared
//! against the same dimension share it by identity.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::index::checked_element_count;
use crate::config_err;
use crate::value::AtomicType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One entry in a variable's dimension list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimRef {
    /// A named dimension declared in an enclosing group.
    Shared(NodeId),
    /// An inline size with no name.
    Anonymous(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dataset {
        children: Vec<NodeId>,
    },
    Group {
        children: Vec<NodeId>,
    },
    Dimension {
        size: usize,
    },
    Atomic {
        base_type: AtomicType,
        dims: Vec<DimRef>,
    },
    Structure {
        fields: Vec<NodeId>,
        dims: Vec<DimRef>,
    },
    Sequence {
        fields: Vec<NodeId>,
        dims: Vec<DimRef>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Dataset { .. } => "Dataset",
            NodeKind::Group { .. } => "Group",
            NodeKind::Dimension { .. } => "Dimension",
            NodeKind::Atomic { .. } => "Atomic",
            NodeKind::Structure { .. } => "Structure",
            NodeKind::Sequence { .. } => "Sequence",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DapNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl DapNode {
    pub fn is_group(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Dataset { .. } | NodeKind::Group { .. }
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Atomic { .. } | NodeKind::Structure { .. } | NodeKind::Sequence { .. }
        )
    }

    pub fn is_compound(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Structure { .. } | NodeKind::Sequence { .. }
        )
    }

    /// Group children or compound members, in declaration order.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Dataset { children } | NodeKind::Group { children } => children,
            NodeKind::Structure { fields, .. } | NodeKind::Sequence { fields, .. } => fields,
            NodeKind::Dimension { .. } | NodeKind::Atomic { .. } => &[],
        }
    }

    pub fn dims(&self) -> &[DimRef] {
        match &self.kind {
            NodeKind::Atomic { dims, .. }
            | NodeKind::Structure { dims, .. }
            | NodeKind::Sequence { dims, .. } => dims,
            _ => &[],
        }
    }

    pub fn rank(&self) -> usize {
        self.dims().len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dmr {
    nodes: Vec<DapNode>,
}

impl Dmr {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn name(&self) -> &str {
        self.nodes.first().map_or("", |node| node.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&DapNode> {
        self.nodes.get(id.index())
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued for this DMR.
    pub fn node(&self, id: NodeId) -> &DapNode {
        &self.nodes[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Sizes of a variable's dimensions, resolving shared dimensions.
    pub fn shape(&self, id: NodeId) -> Vec<usize> {
        self.node(id)
            .dims()
            .iter()
            .map(|dim| self.dim_size(*dim))
            .collect()
    }

    pub fn dim_size(&self, dim: DimRef) -> usize {
        match dim {
            DimRef::Anonymous(size) => size,
            DimRef::Shared(id) => match self.node(id).kind {
                NodeKind::Dimension { size } => size,
                // validate() guarantees shared refs name dimensions
                _ => 0,
            },
        }
    }

    /// The Dataset or Group that (transitively) contains a node.
    pub fn enclosing_group(&self, id: NodeId) -> Option<NodeId> {
        let mut curr = self.get(id)?.parent;
        for _ in 0..self.nodes.len() {
            let p = curr?;
            let node = self.get(p)?;
            if node.is_group() {
                return Some(p);
            }
            curr = node.parent;
        }
        None
    }

    /// Fully qualified name: groups are separated by `/`, compound
    /// members by `.`. The dataset itself is `/`.
    pub fn fqn(&self, id: NodeId) -> String {
        let mut parts: Vec<(&str, bool)> = Vec::new();
        let mut curr = Some(id);
        // bounded so a malformed (cyclic) parent chain cannot spin forever
        for _ in 0..self.nodes.len() {
            let Some(node) = curr.filter(|c| *c != self.root()).and_then(|c| self.get(c)) else {
                break;
            };
            let in_compound = node
                .parent
                .and_then(|p| self.get(p))
                .is_some_and(|p| p.is_compound());
            parts.push((node.name.as_str(), in_compound));
            curr = node.parent;
        }

        if parts.is_empty() {
            return "/".to_owned();
        }
        let mut fqn = String::new();
        for (name, in_compound) in parts.into_iter().rev() {
            fqn.push(if in_compound { '.' } else { '/' });
            fqn.push_str(name);
        }
        fqn
    }

    /// Linear scan; use `fqn_table` for repeated lookups.
    pub fn find(&self, fqn: &str) -> Option<NodeId> {
        self.ids().find(|id| self.fqn(*id) == fqn)
    }

    /// Every node keyed by its fully qualified name, built in one pass.
    pub fn fqn_table(&self) -> HashMap<String, NodeId> {
        let mut table: HashMap<String, NodeId> = HashMap::with_capacity(self.nodes.len());
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![(self.root(), "/".to_owned())];
        while let Some((id, fqn)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.get(id) else {
                continue;
            };
            let sep = if node.is_compound() { '.' } else { '/' };
            for child in node.children() {
                let Some(c) = self.get(*child) else {
                    continue;
                };
                let mut child_fqn = if id == self.root() {
                    String::new()
                } else {
                    fqn.clone()
                };
                child_fqn.push(sep);
                child_fqn.push_str(&c.name);
                stack.push((*child, child_fqn));
            }
            table.insert(fqn, id);
        }
        table
    }

    /// Variables declared directly in groups, in the order the compiler
    /// visits them: a group's own variables, then its subgroups.
    pub fn top_level_variables(&self) -> Vec<NodeId> {
        let mut vars = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(group) = stack.pop() {
            let children = self.node(group).children();
            vars.extend(
                children
                    .iter()
                    .copied()
                    .filter(|c| self.node(*c).is_variable()),
            );
            // reversed so subgroups pop in declaration order
            stack.extend(
                children
                    .iter()
                    .rev()
                    .copied()
                    .filter(|c| self.node(*c).is_group()),
            );
        }
        vars
    }

    /// Checks the structural invariants the compiler relies on. `DmrBuilder`
    /// calls this; DMRs that arrive through serde should too.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.nodes.first() else {
            return config_err!(DoesNotExist, "DMR has no dataset node".to_owned());
        };
        if !matches!(root.kind, NodeKind::Dataset { .. }) || root.parent.is_some() {
            return config_err!(
                NotAContainer,
                "node 0 must be a parentless Dataset".to_owned()
            );
        }

        for id in self.ids() {
            self.validate_node(id)
                .map_err(|err| err.at(&self.fqn(id)))?;
        }
        self.check_reachable()
    }

    // Per-node checks guarantee each node sits in exactly its parent's
    // child list, so anything missed here belongs to a parent cycle.
    fn check_reachable(&self) -> Result<()> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            stack.extend(self.node(id).children().iter().copied());
        }
        match seen.iter().position(|reached| !reached) {
            Some(i) => config_err!(
                DoesNotExist,
                format!("node {} is not reachable from the dataset", NodeId(i as u32))
            ),
            None => Ok(()),
        }
    }

    fn check_shape(&self, var: NodeId) -> Result<()> {
        let shape = self.shape(var);
        if checked_element_count(&shape).is_none() {
            return config_err!(
                ShapeOverflow,
                format!("shape {shape:?} has more than usize::MAX elements")
            );
        }
        Ok(())
    }

    fn validate_node(&self, id: NodeId) -> Result<()> {
        let node = self.node(id);
        if id != self.root() {
            check_name(&node.name)?;
            if matches!(node.kind, NodeKind::Dataset { .. }) {
                return config_err!(NotAContainer, "nested Dataset".to_owned());
            }
            let Some(parent) = node.parent.and_then(|p| self.get(p)) else {
                return config_err!(DoesNotExist, "dangling parent".to_owned());
            };
            if !parent.children().contains(&id) {
                return config_err!(
                    DoesNotExist,
                    "node missing from its parent's children".to_owned()
                );
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for child in node.children() {
            let Some(c) = self.get(*child) else {
                return config_err!(DoesNotExist, format!("unknown child {child}"));
            };
            if c.parent != Some(id) {
                return config_err!(DoesNotExist, format!("child {child} has another parent"));
            }
            if node.is_compound() && !c.is_variable() {
                return config_err!(
                    NotAContainer,
                    format!("{} may not be a member of a compound", c.kind.name())
                );
            }
            if !seen.insert(c.name.as_str()) {
                return config_err!(DuplicateName, format!("'{}' declared twice", c.name));
            }
        }

        if node.is_compound() && node.children().is_empty() {
            return config_err!(
                EmptyCompound,
                format!("{} declares no members", node.kind.name())
            );
        }

        for dim in node.dims() {
            self.check_dim_ref(id, *dim)?;
        }
        if node.is_variable() {
            self.check_shape(id)?;
        }
        Ok(())
    }

    fn check_dim_ref(&self, var: NodeId, dim: DimRef) -> Result<()> {
        let DimRef::Shared(dim_id) = dim else {
            return Ok(());
        };
        let Some(dim_node) = self.get(dim_id) else {
            return config_err!(BadDimensionRef, format!("unknown dimension {dim_id}"));
        };
        if !matches!(dim_node.kind, NodeKind::Dimension { .. }) {
            return config_err!(
                BadDimensionRef,
                format!("'{}' is a {}, not a Dimension", dim_node.name, dim_node.kind.name())
            );
        }

        // in scope when declared in the variable's group or an ancestor of it
        let mut scope = self.enclosing_group(var);
        for _ in 0..self.nodes.len() {
            let Some(group) = scope else {
                break;
            };
            if dim_node.parent == Some(group) {
                return Ok(());
            }
            scope = self.get(group).and_then(|g| g.parent);
        }
        config_err!(
            BadDimensionRef,
            format!("dimension '{}' is not in scope", self.fqn(dim_id))
        )
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return config_err!(BadName, "empty name".to_owned());
    }
    if name.contains(['/', '.']) {
        return config_err!(BadName, format!("'{name}' contains a path separator"));
    }
    Ok(())
}

/// Incrementally builds a validated `Dmr`.
pub struct DmrBuilder {
    nodes: Vec<DapNode>,
}

impl DmrBuilder {
    pub fn new(dataset: &str) -> Self {
        DmrBuilder {
            nodes: vec![DapNode {
                name: dataset.to_owned(),
                parent: None,
                kind: NodeKind::Dataset { children: vec![] },
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn group(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.require_group(parent)?;
        self.push(parent, name, NodeKind::Group { children: vec![] })
    }

    pub fn dimension(&mut self, parent: NodeId, name: &str, size: usize) -> Result<NodeId> {
        self.require_group(parent)?;
        self.push(parent, name, NodeKind::Dimension { size })
    }

    pub fn atomic(
        &mut self,
        parent: NodeId,
        name: &str,
        base_type: AtomicType,
        dims: &[DimRef],
    ) -> Result<NodeId> {
        self.push_variable(
            parent,
            name,
            NodeKind::Atomic {
                base_type,
                dims: dims.to_vec(),
            },
        )
    }

    pub fn structure(&mut self, parent: NodeId, name: &str, dims: &[DimRef]) -> Result<NodeId> {
        self.push_variable(
            parent,
            name,
            NodeKind::Structure {
                fields: vec![],
                dims: dims.to_vec(),
            },
        )
    }

    pub fn sequence(&mut self, parent: NodeId, name: &str, dims: &[DimRef]) -> Result<NodeId> {
        self.push_variable(
            parent,
            name,
            NodeKind::Sequence {
                fields: vec![],
                dims: dims.to_vec(),
            },
        )
    }

    pub fn build(self) -> Result<Dmr> {
        let dmr = Dmr { nodes: self.nodes };
        dmr.validate()?;
        Ok(dmr)
    }

    fn require_group(&self, parent: NodeId) -> Result<()> {
        match self.nodes.get(parent.index()) {
            Some(node) if node.is_group() => Ok(()),
            Some(node) => config_err!(
                NotAContainer,
                format!("'{}' ({}) cannot hold groups or dimensions", node.name, node.kind.name())
            ),
            None => config_err!(DoesNotExist, format!("unknown parent {parent}")),
        }
    }

    fn push_variable(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId> {
        match self.nodes.get(parent.index()) {
            Some(node) if node.is_group() || node.is_compound() => {}
            Some(node) => {
                return config_err!(
                    NotAContainer,
                    format!("'{}' ({}) cannot hold variables", node.name, node.kind.name())
                );
            }
            None => return config_err!(DoesNotExist, format!("unknown parent {parent}")),
        }
        let id = self.push(parent, name, kind)?;

        // scope checks need the node linked into the tree
        let dmr = Dmr {
            nodes: std::mem::take(&mut self.nodes),
        };
        let checked: Result<()> = dmr
            .node(id)
            .dims()
            .iter()
            .try_for_each(|dim| dmr.check_dim_ref(id, *dim))
            .and_then(|()| dmr.check_shape(id));
        self.nodes = dmr.nodes;
        if let Err(err) = checked {
            self.unlink_last(parent);
            return Err(err);
        }
        Ok(id)
    }

    fn push(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId> {
        check_name(name)?;
        let parent_node = &self.nodes[parent.index()];
        if parent_node
            .children()
            .iter()
            .any(|c| self.nodes[c.index()].name == name)
        {
            return config_err!(
                DuplicateName,
                format!("'{}' already declares '{}'", parent_node.name, name)
            );
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(DapNode {
            name: name.to_owned(),
            parent: Some(parent),
            kind,
        });
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Dataset { children } | NodeKind::Group { children } => children.push(id),
            NodeKind::Structure { fields, .. } | NodeKind::Sequence { fields, .. } => {
                fields.push(id)
            }
            NodeKind::Dimension { .. } | NodeKind::Atomic { .. } => unreachable!(),
        }
        Ok(id)
    }

    fn unlink_last(&mut self, parent: NodeId) {
        self.nodes.pop();
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Dataset { children } | NodeKind::Group { children } => {
                children.pop();
            }
            NodeKind::Structure { fields, .. } | NodeKind::Sequence { fields, .. } => {
                fields.pop();
            }
            NodeKind::Dimension { .. } | NodeKind::Atomic { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ErrorCode, ErrorKind};
    use crate::value::AtomicType::*;

    fn sample() -> (Dmr, NodeId, NodeId, NodeId) {
        let mut b = DmrBuilder::new("sample");
        let root = b.root();
        let n = b.dimension(root, "n", 5).unwrap();
        let a = b.atomic(root, "a", Int32, &[DimRef::Shared(n)]).unwrap();
        let g = b.group(root, "g").unwrap();
        let s = b
            .structure(g, "s", &[DimRef::Shared(n), DimRef::Anonymous(2)])
            .unwrap();
        b.atomic(s, "x", Float64, &[]).unwrap();
        (b.build().unwrap(), n, a, s)
    }

    #[test]
    fn test_fqn() {
        let (dmr, n, a, s) = sample();
        assert_eq!("/", dmr.fqn(dmr.root()));
        assert_eq!("/n", dmr.fqn(n));
        assert_eq!("/a", dmr.fqn(a));
        assert_eq!("/g/s", dmr.fqn(s));
        let x = dmr.node(s).children()[0];
        assert_eq!("/g/s.x", dmr.fqn(x));
        assert_eq!(Some(x), dmr.find("/g/s.x"));
        assert_eq!(None, dmr.find("/g/s.y"));
    }

    #[test]
    fn test_shape() {
        let (dmr, _, a, s) = sample();
        assert_eq!(vec![5], dmr.shape(a));
        assert_eq!(vec![5, 2], dmr.shape(s));
        assert_eq!(Vec::<usize>::new(), dmr.shape(dmr.node(s).children()[0]));
    }

    #[test]
    fn test_top_level_variables() {
        let mut b = DmrBuilder::new("order");
        let root = b.root();
        let g1 = b.group(root, "g1").unwrap();
        let v1 = b.atomic(root, "v1", Int8, &[]).unwrap();
        let inner = b.atomic(g1, "inner", Int8, &[]).unwrap();
        let g2 = b.group(root, "g2").unwrap();
        let deep = b.atomic(g2, "deep", Int8, &[]).unwrap();
        let v2 = b.atomic(root, "v2", Int8, &[]).unwrap();
        let dmr = b.build().unwrap();
        assert_eq!(vec![v1, v2, inner, deep], dmr.top_level_variables());
    }

    #[test]
    fn test_duplicate_name() {
        let mut b = DmrBuilder::new("dup");
        let root = b.root();
        b.atomic(root, "a", Int32, &[]).unwrap();
        let err = b.atomic(root, "a", Int64, &[]).unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind);
        assert_eq!(ErrorCode::DuplicateName, err.code);
    }

    #[test]
    fn test_bad_names() {
        let mut b = DmrBuilder::new("names");
        let root = b.root();
        assert_eq!(
            ErrorCode::BadName,
            b.atomic(root, "", Int32, &[]).unwrap_err().code
        );
        assert_eq!(
            ErrorCode::BadName,
            b.atomic(root, "a.b", Int32, &[]).unwrap_err().code
        );
        assert_eq!(
            ErrorCode::BadName,
            b.group(root, "a/b").unwrap_err().code
        );
    }

    #[test]
    fn test_not_a_container() {
        let mut b = DmrBuilder::new("containers");
        let root = b.root();
        let a = b.atomic(root, "a", Int32, &[]).unwrap();
        assert_eq!(
            ErrorCode::NotAContainer,
            b.atomic(a, "b", Int32, &[]).unwrap_err().code
        );
        let s = b.structure(root, "s", &[]).unwrap();
        assert_eq!(
            ErrorCode::NotAContainer,
            b.dimension(s, "d", 3).unwrap_err().code
        );
        assert_eq!(ErrorCode::NotAContainer, b.group(s, "g").unwrap_err().code);
    }

    #[test]
    fn test_dimension_scope() {
        let mut b = DmrBuilder::new("scope");
        let root = b.root();
        let g = b.group(root, "g").unwrap();
        let inner = b.dimension(g, "inner", 3).unwrap();
        let outer = b.dimension(root, "outer", 4).unwrap();

        // outer dimension visible from a nested group
        b.atomic(g, "ok", Int32, &[DimRef::Shared(outer), DimRef::Shared(inner)])
            .unwrap();

        // inner dimension not visible from the root
        let err = b
            .atomic(root, "bad", Int32, &[DimRef::Shared(inner)])
            .unwrap_err();
        assert_eq!(ErrorCode::BadDimensionRef, err.code);

        // a failed declaration leaves no trace
        b.atomic(root, "bad", Int32, &[DimRef::Shared(outer)]).unwrap();

        // a variable is not a dimension
        let v = b.atomic(root, "v", Int32, &[]).unwrap();
        let err = b.atomic(root, "w", Int32, &[DimRef::Shared(v)]).unwrap_err();
        assert_eq!(ErrorCode::BadDimensionRef, err.code);

        b.build().unwrap();
    }

    #[test]
    fn test_empty_compound() {
        let mut b = DmrBuilder::new("empty");
        let root = b.root();
        b.sequence(root, "seq", &[]).unwrap();
        let err = b.build().unwrap_err();
        assert_eq!(ErrorCode::EmptyCompound, err.code);
        assert_eq!(Some("/seq".to_string()), err.path);
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let (dmr, _, _, _) = sample();
        let json = serde_json::to_string(&dmr).unwrap();
        let back: Dmr = serde_json::from_str(&json).unwrap();
        assert_eq!(dmr, back);
        back.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_dangling_child() {
        let json = r#"{"nodes": [
            {"name": "ds", "parent": null, "kind": {"dataset": {"children": [1]}}}
        ]}"#;
        let dmr: Dmr = serde_json::from_str(json).unwrap();
        assert_eq!(ErrorCode::DoesNotExist, dmr.validate().unwrap_err().code);
    }

    #[test]
    fn test_validate_rejects_parent_cycle() {
        let json = r#"{"nodes": [
            {"name": "ds", "parent": null, "kind": {"dataset": {"children": []}}},
            {"name": "a", "parent": 2, "kind": {"group": {"children": [2]}}},
            {"name": "b", "parent": 1, "kind": {"group": {"children": [1]}}}
        ]}"#;
        let dmr: Dmr = serde_json::from_str(json).unwrap();
        let err = dmr.validate().unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind);
        assert_eq!(ErrorCode::DoesNotExist, err.code);
    }

    #[test]
    fn test_oversized_shape_is_rejected() {
        let mut b = DmrBuilder::new("huge");
        let root = b.root();
        let n = b.dimension(root, "n", usize::MAX).unwrap();
        let err = b
            .atomic(root, "a", Int32, &[DimRef::Shared(n), DimRef::Anonymous(2)])
            .unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind);
        assert_eq!(ErrorCode::ShapeOverflow, err.code);
        // the failed variable was unlinked
        b.atomic(root, "a", Int32, &[DimRef::Shared(n)]).unwrap();
        b.build().unwrap();

        let json = r#"{"nodes": [
            {"name": "ds", "parent": null, "kind": {"dataset": {"children": [1]}}},
            {"name": "a", "parent": 0, "kind": {"atomic": {"base_type": "int8",
                "dims": [{"anonymous": 18446744073709551615}, {"anonymous": 2}]}}}
        ]}"#;
        let dmr: Dmr = serde_json::from_str(json).unwrap();
        let err = dmr.validate().unwrap_err();
        assert_eq!(ErrorCode::ShapeOverflow, err.code);
        assert_eq!(Some("/a".to_owned()), err.path);
    }

    #[test]
    fn test_fqn_table() {
        let (dmr, n, a, s) = sample();
        let table = dmr.fqn_table();
        assert_eq!(dmr.len(), table.len());
        for id in dmr.ids() {
            assert_eq!(Some(&id), table.get(&dmr.fqn(id)));
        }
        assert_eq!(Some(&n), table.get("/n"));
        assert_eq!(Some(&a), table.get("/a"));
        assert_eq!(Some(&s), table.get("/g/s"));
    }
}
