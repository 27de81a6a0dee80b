// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Construction of data-tree nodes.
//!
//! Every data instance is created through a `DataObjectFactory`, which
//! checks it against its schema template before it enters the tree. A
//! data source that needs different instances can supply its own factory;
//! `DataFactory` is the stock one.

use dap4_core::{Dmr, NodeId, NodeKind, Result, data_err, element_count};

use crate::data::{
    DataAtomic, DataCompoundArray, DataDataset, DataId, DataRecord, DataSequence,
    DataStructure, DataTree,
};
use crate::dsp::{Dsp, Handle};

pub trait DataObjectFactory {
    fn new_dataset<D: Dsp + ?Sized>(&self, dsp: &D, template: NodeId) -> Result<DataDataset>;

    fn new_atomic_variable<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        template: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataAtomic>;

    /// An empty array of structure or sequence instances; the caller
    /// fills in `elements`.
    fn new_compound_array<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        template: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataCompoundArray>;

    fn new_structure<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        position: usize,
        handle: Handle,
    ) -> Result<DataStructure>;

    fn new_sequence<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        position: usize,
        handle: Handle,
    ) -> Result<DataSequence>;

    fn new_record<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        row: usize,
        handle: Handle,
    ) -> Result<DataRecord>;
}

impl<T: DataObjectFactory + ?Sized> DataObjectFactory for &T {
    fn new_dataset<D: Dsp + ?Sized>(&self, dsp: &D, template: NodeId) -> Result<DataDataset> {
        (**self).new_dataset(dsp, template)
    }

    fn new_atomic_variable<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        template: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataAtomic> {
        (**self).new_atomic_variable(dsp, template, parent, handle)
    }

    fn new_compound_array<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        template: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataCompoundArray> {
        (**self).new_compound_array(dsp, template, parent, handle)
    }

    fn new_structure<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        position: usize,
        handle: Handle,
    ) -> Result<DataStructure> {
        (**self).new_structure(dsp, tree, template, parent, position, handle)
    }

    fn new_sequence<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        position: usize,
        handle: Handle,
    ) -> Result<DataSequence> {
        (**self).new_sequence(dsp, tree, template, parent, position, handle)
    }

    fn new_record<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        row: usize,
        handle: Handle,
    ) -> Result<DataRecord> {
        (**self).new_record(dsp, tree, template, parent, row, handle)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct DataFactory;

impl DataObjectFactory for DataFactory {
    fn new_dataset<D: Dsp + ?Sized>(&self, dsp: &D, template: NodeId) -> Result<DataDataset> {
        let dmr = dsp.dmr();
        match dmr.get(template).map(|n| &n.kind) {
            Some(NodeKind::Dataset { .. }) => Ok(DataDataset {
                template,
                variables: vec![],
            }),
            Some(other) => data_err!(
                ExpectedDataset,
                format!("template is a {}", other.name())
            ),
            None => data_err!(ExpectedDataset, format!("unknown template {template}")),
        }
    }

    fn new_atomic_variable<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        template: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataAtomic> {
        let dmr = dsp.dmr();
        let inner = || -> Result<DataAtomic> {
            let Some(NodeKind::Atomic { base_type, .. }) = dmr.get(template).map(|n| &n.kind)
            else {
                return data_err!(TypeMismatch, "template is not an atomic variable".to_owned());
            };
            let info = dsp.describe(handle)?;
            if info.base_type != *base_type {
                return data_err!(
                    TypeMismatch,
                    format!("declared {}, source holds {}", base_type, info.base_type)
                );
            }
            let expected = element_count(&dmr.shape(template));
            if info.count != expected {
                return data_err!(
                    ShapeMismatch,
                    format!("declared {} values, source holds {}", expected, info.count)
                );
            }
            Ok(DataAtomic {
                template,
                parent,
                handle,
                count: info.count,
            })
        };
        inner().map_err(|err| at(dmr, template, err))
    }

    fn new_compound_array<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        template: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataCompoundArray> {
        let dmr = dsp.dmr();
        match dmr.get(template) {
            Some(node) if node.is_compound() => {
                let len = element_count(&dmr.shape(template));
                Ok(DataCompoundArray {
                    template,
                    parent,
                    handle,
                    len,
                    // grown as the source yields elements
                    elements: Vec::new(),
                })
            }
            _ => data_err!(
                TypeMismatch,
                "template is not a structure or sequence".to_owned()
            )
            .map_err(|err| at(dmr, template, err)),
        }
    }

    fn new_structure<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        position: usize,
        handle: Handle,
    ) -> Result<DataStructure> {
        let dmr = dsp.dmr();
        check_element(dmr, tree, template, parent, position, true)
            .map_err(|err| at(dmr, template, err))?;
        Ok(DataStructure {
            template,
            parent,
            position,
            handle,
            fields: vec![],
        })
    }

    fn new_sequence<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        position: usize,
        handle: Handle,
    ) -> Result<DataSequence> {
        let dmr = dsp.dmr();
        check_element(dmr, tree, template, parent, position, false)
            .map_err(|err| at(dmr, template, err))?;
        Ok(DataSequence {
            template,
            parent,
            position,
            handle,
            records: vec![],
            len: None,
        })
    }

    fn new_record<D: Dsp + ?Sized>(
        &self,
        dsp: &D,
        tree: &DataTree,
        template: NodeId,
        parent: DataId,
        row: usize,
        handle: Handle,
    ) -> Result<DataRecord> {
        let dmr = dsp.dmr();
        let check = || -> Result<()> {
            let seq = tree.sequence(parent)?;
            if seq.template != template {
                return data_err!(
                    TypeMismatch,
                    "record template differs from its sequence's".to_owned()
                );
            }
            if let Some(len) = seq.len
                && row >= len
            {
                return data_err!(IndexOutOfRange, format!("row {row} of {len}"));
            }
            Ok(())
        };
        check().map_err(|err| at(dmr, template, err))?;
        Ok(DataRecord {
            template,
            parent,
            row,
            handle,
            fields: vec![],
        })
    }
}

fn check_element(
    dmr: &Dmr,
    tree: &DataTree,
    template: NodeId,
    parent: DataId,
    position: usize,
    structure: bool,
) -> Result<()> {
    let kind_ok = match dmr.get(template).map(|n| &n.kind) {
        Some(NodeKind::Structure { .. }) => structure,
        Some(NodeKind::Sequence { .. }) => !structure,
        _ => false,
    };
    if !kind_ok {
        let expected = if structure { "Structure" } else { "Sequence" };
        return data_err!(TypeMismatch, format!("template is not a {expected}"));
    }

    let array = tree.compound_array(parent)?;
    if array.template != template {
        return data_err!(
            TypeMismatch,
            "element template differs from its array's".to_owned()
        );
    }
    if position >= array.len {
        return data_err!(
            IndexOutOfRange,
            format!("position {} of {}", position, array.len)
        );
    }
    Ok(())
}

fn at(dmr: &Dmr, template: NodeId, err: dap4_core::Error) -> dap4_core::Error {
    if dmr.get(template).is_some() {
        err.at(&dmr.fqn(template))
    } else {
        err
    }
}
