// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use dap4_core::{DimRef, Dmr, NodeId, NodeKind, Result, data_err, state_err};

use crate::nodemap::NodeMap;
use crate::target::{
    TargetDim, TargetId, TargetKind, TargetModel, TargetNode, TargetVariable, VariableKind,
};

/// Translates a DMR into a target model, recording every pairing.
pub(super) fn compile_schema(dmr: &Dmr) -> Result<(TargetModel, NodeMap)> {
    // DMRs from outside the builder may be malformed
    dmr.validate()?;

    let mut compiler = SchemaCompiler {
        dmr,
        target: TargetModel::default(),
        nodemap: NodeMap::new(),
    };
    compiler.compile_group(dmr.root(), None)?;

    if compiler.nodemap.len() != dmr.len() {
        return data_err!(
            MissingNode,
            format!(
                "compiled {} of {} schema nodes",
                compiler.nodemap.len(),
                dmr.len()
            )
        );
    }
    Ok((compiler.target, compiler.nodemap))
}

struct SchemaCompiler<'a> {
    dmr: &'a Dmr,
    target: TargetModel,
    nodemap: NodeMap,
}

impl SchemaCompiler<'_> {
    // Dimensions first, so every variable below this group can resolve
    // them; then variables; then subgroups.
    fn compile_group(&mut self, group: NodeId, parent: Option<TargetId>) -> Result<TargetId> {
        let dmr = self.dmr;
        let node = dmr.node(group);
        let kind = match node.kind {
            NodeKind::Dataset { .. } => TargetKind::Dataset { children: vec![] },
            _ => TargetKind::Group { children: vec![] },
        };
        let id = self.alloc(group, parent, kind)?;
        let children = node.children();

        for child in children {
            if let NodeKind::Dimension { size } = dmr.node(*child).kind {
                self.alloc(*child, Some(id), TargetKind::Dimension { size })?;
            }
        }
        for child in children {
            if dmr.node(*child).is_variable() {
                self.compile_variable(*child, id)?;
            }
        }
        for child in children {
            if dmr.node(*child).is_group() {
                self.compile_group(*child, Some(id))?;
            }
        }

        let ordered = self.targets_of(children)?;
        self.target.set_children(id, ordered);
        Ok(id)
    }

    fn compile_variable(&mut self, var: NodeId, parent: TargetId) -> Result<TargetId> {
        let dmr = self.dmr;
        let node = dmr.node(var);
        let dims = node
            .dims()
            .iter()
            .map(|dim| self.translate_dim(*dim))
            .collect::<Result<Vec<_>>>()
            .map_err(|err| err.at(&dmr.fqn(var)))?;
        let kind = match node.kind {
            NodeKind::Atomic { base_type, .. } => VariableKind::Atomic(base_type),
            NodeKind::Structure { .. } => VariableKind::Structure { members: vec![] },
            NodeKind::Sequence { .. } => VariableKind::Sequence { members: vec![] },
            ref other => {
                let err: Result<TargetId> =
                    data_err!(TypeMismatch, format!("{} is not a variable", other.name()));
                return err.map_err(|err| err.at(&dmr.fqn(var)));
            }
        };
        let variable = TargetVariable {
            kind,
            dims,
            shape: dmr.shape(var),
        };
        let id = self.alloc(var, Some(parent), TargetKind::Variable(variable))?;

        for member in node.children() {
            self.compile_variable(*member, id)?;
        }
        let members = self.targets_of(node.children())?;
        self.target.set_children(id, members);
        Ok(id)
    }

    fn translate_dim(&self, dim: DimRef) -> Result<TargetDim> {
        match dim {
            DimRef::Anonymous(size) => Ok(TargetDim::Anonymous(size)),
            DimRef::Shared(id) => match self.nodemap.target_of(id) {
                Some(target) => Ok(TargetDim::Shared(target)),
                None => data_err!(
                    MissingNode,
                    format!("dimension {} used before it was compiled", self.dmr.fqn(id))
                ),
            },
        }
    }

    fn targets_of(&self, ids: &[NodeId]) -> Result<Vec<TargetId>> {
        ids.iter()
            .map(|id| match self.nodemap.target_of(*id) {
                Some(target) => Ok(target),
                None => data_err!(MissingNode, format!("{} was not compiled", self.dmr.fqn(*id))),
            })
            .collect()
    }

    fn alloc(&mut self, schema: NodeId, parent: Option<TargetId>, kind: TargetKind) -> Result<TargetId> {
        let fqn = self.dmr.fqn(schema);
        let id = self.target.push(TargetNode {
            name: self.dmr.node(schema).name.clone(),
            fqn,
            parent,
            kind,
        });
        if !self.nodemap.insert(schema, id) {
            return state_err!(
                IllegalState,
                format!("{} compiled twice", self.dmr.fqn(schema))
            );
        }
        log::trace!("{} -> {}", self.dmr.fqn(schema), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use dap4_core::{AtomicType, DmrBuilder};

    use super::*;

    #[test]
    fn test_declaration_order_restored() {
        let mut b = DmrBuilder::new("order");
        let root = b.root();
        let v = b.atomic(root, "v", AtomicType::Int8, &[]).unwrap();
        let g = b.group(root, "g").unwrap();
        let d = b.dimension(root, "d", 2).unwrap();
        let inner = b.atomic(g, "inner", AtomicType::Int8, &[DimRef::Shared(d)]).unwrap();
        let dmr = b.build().unwrap();

        let (target, nodemap) = compile_schema(&dmr).unwrap();
        assert_eq!(dmr.len(), target.len());
        assert_eq!(dmr.len(), nodemap.len());

        let root_t = target.root();
        let expected: Vec<_> = [v, g, d]
            .iter()
            .map(|id| nodemap.target_of(*id).unwrap())
            .collect();
        assert_eq!(expected.as_slice(), target.get(root_t).unwrap().children());

        // the dimension was allocated before the variables that use it
        let d_t = nodemap.target_of(d).unwrap();
        assert!(d_t < nodemap.target_of(v).unwrap());
        let inner_t = target.variable(nodemap.target_of(inner).unwrap()).unwrap();
        assert_eq!(vec![TargetDim::Shared(d_t)], inner_t.dims);
        assert_eq!(vec![2], inner_t.shape);
    }

    #[test]
    fn test_members_and_fqns() {
        let mut b = DmrBuilder::new("members");
        let root = b.root();
        let s = b.structure(root, "s", &[DimRef::Anonymous(3)]).unwrap();
        let x = b.atomic(s, "x", AtomicType::Float32, &[]).unwrap();
        let q = b.sequence(s, "q", &[]).unwrap();
        b.atomic(q, "y", AtomicType::Int64, &[]).unwrap();
        let dmr = b.build().unwrap();

        let (target, nodemap) = compile_schema(&dmr).unwrap();
        let s_t = nodemap.target_of(s).unwrap();
        let var = target.variable(s_t).unwrap();
        assert_eq!(vec![3], var.shape);
        assert_eq!(
            &[nodemap.target_of(x).unwrap(), nodemap.target_of(q).unwrap()],
            var.members()
        );
        assert_eq!(Some(nodemap.target_of(x).unwrap()), target.find("/s.x"));
        assert_eq!(Some(nodemap.target_of(q).unwrap()), target.find("/s.q"));
        assert!(target.find("/s.q.y").is_some());
        assert_eq!(Some(s), nodemap.schema_of(s_t));
    }
}
