// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use dap4_core::{Dmr, NodeId, Odometer, Result, data_err, element_count};

use crate::array::{
    AtomicArray, SequenceArray, SequenceData, StructureArray, StructureData, TargetArray,
    TargetArrayMap,
};
use crate::config::CompilerConfig;
use crate::data::{DataAtomic, DataId, DataNode, DataTree, MAX_RESERVE};
use crate::dsp::Dsp;
use crate::factory::DataObjectFactory;
use crate::nodemap::NodeMap;
use crate::target::{TargetId, TargetModel, TargetVariable, VariableKind};

/// Reads every top-level variable of the data tree into a target array.
pub(super) fn compile_values<F: DataObjectFactory>(
    dsp: &dyn Dsp,
    factory: &F,
    config: &CompilerConfig,
    target: &TargetModel,
    nodemap: &NodeMap,
) -> Result<TargetArrayMap> {
    let dmr = dsp.dmr();
    let tree = dsp.data_dataset()?;

    let dataset = tree.dataset()?;
    if dataset.template != dmr.root() {
        return data_err!(
            ExpectedDataset,
            format!("data root was built from {}", dmr.fqn(dataset.template))
        );
    }
    let variables = dataset.variables.clone();

    let mut compiler = ValueCompiler {
        dsp,
        dmr,
        factory,
        config,
        target,
        nodemap,
        tree,
    };

    let mut arrays = TargetArrayMap::default();
    for var in variables {
        let template = compiler.template(var)?;
        let path = dmr.fqn(template);
        let id = compiler.resolve(template).map_err(|err| err.at(&path))?;
        let array = compiler.compile_variable(var).map_err(|err| err.at(&path))?;
        log::debug!("compiled {} as {}", path, array.summary());
        if !arrays.insert(id, array) {
            return data_err!(
                TypeMismatch,
                format!("{path} appears twice in the data tree")
            );
        }
    }
    Ok(arrays)
}

struct ValueCompiler<'a, F> {
    dsp: &'a dyn Dsp,
    dmr: &'a Dmr,
    factory: &'a F,
    config: &'a CompilerConfig,
    target: &'a TargetModel,
    nodemap: &'a NodeMap,
    tree: DataTree,
}

impl<F: DataObjectFactory> ValueCompiler<'_, F> {
    fn template(&self, data: DataId) -> Result<NodeId> {
        match self.tree.get(data) {
            Some(node) => Ok(node.template()),
            None => data_err!(MissingNode, format!("no data node {data}")),
        }
    }

    fn resolve(&self, template: NodeId) -> Result<TargetId> {
        match self.nodemap.target_of(template) {
            Some(id) => Ok(id),
            None => data_err!(MissingNode, "no target node for schema node".to_owned()),
        }
    }

    fn variable(&self, template: NodeId) -> Result<&TargetVariable> {
        let id = self.resolve(template)?;
        match self.target.variable(id) {
            Some(var) => Ok(var),
            None => data_err!(TypeMismatch, "target node is not a variable".to_owned()),
        }
    }

    fn member_names(&self, var: &TargetVariable) -> Vec<String> {
        var.members()
            .iter()
            .filter_map(|id| self.target.get(*id))
            .map(|node| node.name.clone())
            .collect()
    }

    // Recursion depth follows schema nesting; array elements and records
    // are walked with loops.
    fn compile_variable(&mut self, data: DataId) -> Result<TargetArray> {
        let node = match self.tree.get(data) {
            Some(node) => node.clone(),
            None => return data_err!(MissingNode, format!("no data node {data}")),
        };
        let template = node.template();
        let kind = self.variable(template)?.kind.clone();
        let array = match (node, kind) {
            (DataNode::Atomic(atomic), VariableKind::Atomic(_)) => {
                TargetArray::Atomic(self.compile_atomic(&atomic)?)
            }
            (DataNode::CompoundArray(array), VariableKind::Structure { .. }) => {
                TargetArray::Structure(self.compile_structures(template, &array.elements)?)
            }
            (DataNode::CompoundArray(array), VariableKind::Sequence { .. }) => {
                TargetArray::Sequence(self.compile_sequences(template, &array.elements)?)
            }
            (node, _) => {
                return data_err!(
                    TypeMismatch,
                    format!("{} data for a variable of another kind", node.kind_name())
                );
            }
        };
        Ok(array)
    }

    fn compile_atomic(&self, atomic: &DataAtomic) -> Result<AtomicArray> {
        let var = self.variable(atomic.template)?;
        let VariableKind::Atomic(base_type) = var.kind else {
            return data_err!(TypeMismatch, "not an atomic variable".to_owned());
        };
        let shape = var.shape.clone();

        // the odometer walks offsets in storage order, so values append
        let mut values = Vec::with_capacity(element_count(&shape).min(MAX_RESERVE));
        for idx in Odometer::new(&shape) {
            let offset = idx.linear_offset();
            debug_assert_eq!(offset, values.len());
            let value = self.dsp.read_atomic(atomic.handle, offset)?;
            if value.atomic_type() != base_type {
                return data_err!(
                    TypeMismatch,
                    format!("{} value at {} of a {} variable", value.atomic_type(), idx, base_type)
                );
            }
            values.push(value);
        }
        AtomicArray::new(base_type, shape, values)
    }

    fn compile_structures(&mut self, template: NodeId, elements: &[DataId]) -> Result<StructureArray> {
        let var = self.variable(template)?;
        let shape = var.shape.clone();
        let members = self.member_names(var);

        let mut instances = Vec::with_capacity(elements.len());
        for (offset, element) in elements.iter().enumerate() {
            let fields = match self.element(*element, offset)? {
                DataNode::Structure(s) => s.fields.clone(),
                other => {
                    return data_err!(
                        TypeMismatch,
                        format!("element {} is a {}", offset, other.kind_name())
                    );
                }
            };
            instances.push(self.compile_instance(&fields)?);
        }
        StructureArray::new(shape, members, instances)
    }

    fn compile_sequences(&mut self, template: NodeId, elements: &[DataId]) -> Result<SequenceArray> {
        let var = self.variable(template)?;
        let shape = var.shape.clone();
        let members = self.member_names(var);

        let mut sequences = Vec::with_capacity(elements.len());
        for (offset, element) in elements.iter().enumerate() {
            let node = self.element(*element, offset)?;
            if !matches!(node, DataNode::Sequence(_)) {
                return data_err!(
                    TypeMismatch,
                    format!("element {} is a {}", offset, node.kind_name())
                );
            }
            let len = self.tree.enumerate_records(
                self.dsp,
                self.factory,
                *element,
                self.config.preallocate_records,
            )?;
            let rows = self.tree.sequence(*element)?.records.clone();

            let mut records = Vec::with_capacity(len);
            for row in rows {
                let fields = self.tree.fields(row)?.to_vec();
                records.push(self.compile_instance(&fields)?);
            }
            sequences.push(SequenceData::new(records));
        }
        SequenceArray::new(shape, members, sequences)
    }

    /// The instance at `offset` of a compound array, checked to know its
    /// own position.
    fn element(&self, element: DataId, offset: usize) -> Result<&DataNode> {
        let Some(node) = self.tree.get(element) else {
            return data_err!(MissingNode, format!("element {offset}"));
        };
        let position = match node {
            DataNode::Structure(s) => s.position,
            DataNode::Sequence(s) => s.position,
            other => {
                return data_err!(
                    TypeMismatch,
                    format!("element {} is a {}", offset, other.kind_name())
                );
            }
        };
        if position != offset {
            return data_err!(
                ShapeMismatch,
                format!("element {offset} was built for position {position}")
            );
        }
        Ok(node)
    }

    fn compile_instance(&mut self, fields: &[DataId]) -> Result<StructureData> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let template = self.template(*field)?;
            let array = self
                .compile_variable(*field)
                .map_err(|err| err.at(&self.dmr.fqn(template)))?;
            values.push(array);
        }
        Ok(StructureData::new(values))
    }
}
