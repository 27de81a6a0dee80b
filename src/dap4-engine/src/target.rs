// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The compiled, consumer-facing model.
//!
//! Same shape as the DMR it was compiled from, but every variable carries
//! its resolved shape, and shared dimensions are referenced by `TargetId`
//! so two variables over the same dimension point at the same node.

use std::fmt;

use dap4_core::AtomicType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32);

impl TargetId {
    pub(crate) fn from_index(i: usize) -> Self {
        TargetId(i as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetDim {
    Shared(TargetId),
    Anonymous(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Atomic(AtomicType),
    Structure { members: Vec<TargetId> },
    Sequence { members: Vec<TargetId> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetVariable {
    pub kind: VariableKind,
    pub dims: Vec<TargetDim>,
    pub shape: Vec<usize>,
}

impl TargetVariable {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn element_count(&self) -> usize {
        dap4_core::element_count(&self.shape)
    }

    pub fn members(&self) -> &[TargetId] {
        match &self.kind {
            VariableKind::Atomic(_) => &[],
            VariableKind::Structure { members } | VariableKind::Sequence { members } => members,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Dataset { children: Vec<TargetId> },
    Group { children: Vec<TargetId> },
    Dimension { size: usize },
    Variable(TargetVariable),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetNode {
    pub name: String,
    pub fqn: String,
    pub parent: Option<TargetId>,
    pub kind: TargetKind,
}

impl TargetNode {
    pub fn variable(&self) -> Option<&TargetVariable> {
        match &self.kind {
            TargetKind::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn children(&self) -> &[TargetId] {
        match &self.kind {
            TargetKind::Dataset { children } | TargetKind::Group { children } => children,
            TargetKind::Variable(var) => var.members(),
            TargetKind::Dimension { .. } => &[],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetModel {
    nodes: Vec<TargetNode>,
}

impl TargetModel {
    pub(crate) fn push(&mut self, node: TargetNode) -> TargetId {
        let id = TargetId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Replaces a container's child or member list.
    pub(crate) fn set_children(&mut self, id: TargetId, ids: Vec<TargetId>) {
        match &mut self.nodes[id.index()].kind {
            TargetKind::Dataset { children } | TargetKind::Group { children } => *children = ids,
            TargetKind::Variable(TargetVariable {
                kind:
                    VariableKind::Structure { members } | VariableKind::Sequence { members },
                ..
            }) => *members = ids,
            TargetKind::Dimension { .. } | TargetKind::Variable(_) => {}
        }
    }

    pub fn root(&self) -> TargetId {
        TargetId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: TargetId) -> Option<&TargetNode> {
        self.nodes.get(id.index())
    }

    pub fn ids(&self) -> impl Iterator<Item = TargetId> + '_ {
        (0..self.nodes.len() as u32).map(TargetId)
    }

    pub fn variable(&self, id: TargetId) -> Option<&TargetVariable> {
        self.get(id).and_then(TargetNode::variable)
    }

    pub fn find(&self, fqn: &str) -> Option<TargetId> {
        self.ids().find(|id| self.nodes[id.index()].fqn == fqn)
    }

    /// Size of one of a variable's dimensions, following shared refs.
    pub fn dim_size(&self, dim: TargetDim) -> Option<usize> {
        match dim {
            TargetDim::Anonymous(size) => Some(size),
            TargetDim::Shared(id) => match self.get(id)?.kind {
                TargetKind::Dimension { size } => Some(size),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_children() {
        let mut model = TargetModel::default();
        let root = model.push(TargetNode {
            name: "ds".to_owned(),
            fqn: "/".to_owned(),
            parent: None,
            kind: TargetKind::Dataset { children: vec![] },
        });
        let d = model.push(TargetNode {
            name: "d".to_owned(),
            fqn: "/d".to_owned(),
            parent: Some(root),
            kind: TargetKind::Dimension { size: 4 },
        });
        let v = model.push(TargetNode {
            name: "v".to_owned(),
            fqn: "/v".to_owned(),
            parent: Some(root),
            kind: TargetKind::Variable(TargetVariable {
                kind: VariableKind::Atomic(AtomicType::Int16),
                dims: vec![TargetDim::Shared(d), TargetDim::Anonymous(2)],
                shape: vec![4, 2],
            }),
        });
        model.set_children(root, vec![v, d]);

        assert_eq!(&[v, d], model.get(root).unwrap().children());
        assert_eq!(Some(v), model.find("/v"));
        let var = model.variable(v).unwrap();
        assert_eq!(2, var.rank());
        assert_eq!(8, var.element_count());
        assert_eq!(Some(4), model.dim_size(var.dims[0]));
        assert_eq!(None, model.dim_size(TargetDim::Shared(v)));
        assert!(model.variable(d).is_none());
    }
}
