// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The data tree: one node per materialized data instance.
//!
//! The tree mirrors the DMR, but compound variables fan out into one
//! node per array element and sequences into one node per record. Like
//! the DMR it is a flat arena addressed by `DataId`, with the dataset at
//! position 0. Everything except sequence records is built up front;
//! records are appended as a sequence is enumerated.

use std::fmt;

use dap4_core::{Dmr, ErrorCode, NodeId, NodeKind, Result, data_err};

use crate::dsp::{Dsp, Handle};
use crate::factory::DataObjectFactory;

/// Upper bound on buffer space reserved from sizes a source or schema
/// declares before any element has been read.
pub(crate) const MAX_RESERVE: usize = 1 << 16;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(u32);

impl DataId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataDataset {
    pub template: NodeId,
    /// Top-level variables, in `Dmr::top_level_variables` order.
    pub variables: Vec<DataId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataAtomic {
    pub template: NodeId,
    pub parent: Option<DataId>,
    pub handle: Handle,
    /// Number of values behind the handle, as reported by the source.
    pub count: usize,
}

/// An array of structure or sequence instances, one per element of the
/// variable's shape, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataCompoundArray {
    pub template: NodeId,
    pub parent: Option<DataId>,
    pub handle: Handle,
    pub len: usize,
    pub elements: Vec<DataId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStructure {
    pub template: NodeId,
    /// The owning compound array.
    pub parent: DataId,
    pub position: usize,
    pub handle: Handle,
    pub fields: Vec<DataId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSequence {
    pub template: NodeId,
    /// The owning compound array.
    pub parent: DataId,
    pub position: usize,
    pub handle: Handle,
    /// Records read so far.
    pub records: Vec<DataId>,
    /// Set once the source has signalled the end of the sequence.
    pub len: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRecord {
    pub template: NodeId,
    /// The owning sequence instance.
    pub parent: DataId,
    pub row: usize,
    pub handle: Handle,
    pub fields: Vec<DataId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataNode {
    Dataset(DataDataset),
    Atomic(DataAtomic),
    CompoundArray(DataCompoundArray),
    Structure(DataStructure),
    Sequence(DataSequence),
    Record(DataRecord),
}

impl DataNode {
    /// The schema node this instance was created from.
    pub fn template(&self) -> NodeId {
        match self {
            DataNode::Dataset(n) => n.template,
            DataNode::Atomic(n) => n.template,
            DataNode::CompoundArray(n) => n.template,
            DataNode::Structure(n) => n.template,
            DataNode::Sequence(n) => n.template,
            DataNode::Record(n) => n.template,
        }
    }

    pub fn parent(&self) -> Option<DataId> {
        match self {
            DataNode::Dataset(_) => None,
            DataNode::Atomic(n) => n.parent,
            DataNode::CompoundArray(n) => n.parent,
            DataNode::Structure(n) => Some(n.parent),
            DataNode::Sequence(n) => Some(n.parent),
            DataNode::Record(n) => Some(n.parent),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DataNode::Dataset(_) => "Dataset",
            DataNode::Atomic(_) => "Atomic",
            DataNode::CompoundArray(_) => "CompoundArray",
            DataNode::Structure(_) => "Structure",
            DataNode::Sequence(_) => "Sequence",
            DataNode::Record(_) => "Record",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataTree {
    nodes: Vec<DataNode>,
}

impl DataTree {
    /// Walks the DMR and asks the data source for every instance except
    /// sequence records, creating each through `factory`.
    pub fn build<D, F>(dsp: &D, factory: &F) -> Result<DataTree>
    where
        D: Dsp + ?Sized,
        F: DataObjectFactory,
    {
        let dmr = dsp.dmr();
        let dataset = factory.new_dataset(dsp, dmr.root())?;
        let mut tree = DataTree {
            nodes: vec![DataNode::Dataset(dataset)],
        };
        let root = tree.root();

        for var in dmr.top_level_variables() {
            let handle = dsp.variable(var).map_err(|err| err.at(&dmr.fqn(var)))?;
            let id = tree.build_variable(dsp, factory, var, Some(root), handle)?;
            if let DataNode::Dataset(dataset) = &mut tree.nodes[0] {
                dataset.variables.push(id);
            }
        }

        log::trace!(
            "built data tree for '{}' with {} nodes",
            dmr.name(),
            tree.len()
        );
        Ok(tree)
    }

    pub fn root(&self) -> DataId {
        DataId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: DataId) -> Option<&DataNode> {
        self.nodes.get(id.index())
    }

    pub fn dataset(&self) -> Result<&DataDataset> {
        match self.nodes.first() {
            Some(DataNode::Dataset(dataset)) => Ok(dataset),
            Some(other) => data_err!(
                ExpectedDataset,
                format!("data root is a {}", other.kind_name())
            ),
            None => data_err!(ExpectedDataset, "empty data tree".to_owned()),
        }
    }

    pub fn compound_array(&self, id: DataId) -> Result<&DataCompoundArray> {
        match self.lookup(id)? {
            DataNode::CompoundArray(array) => Ok(array),
            other => mismatch(id, "CompoundArray", other),
        }
    }

    pub fn sequence(&self, id: DataId) -> Result<&DataSequence> {
        match self.lookup(id)? {
            DataNode::Sequence(seq) => Ok(seq),
            other => mismatch(id, "Sequence", other),
        }
    }

    /// Member instances of a structure instance or a record.
    pub fn fields(&self, id: DataId) -> Result<&[DataId]> {
        match self.lookup(id)? {
            DataNode::Structure(s) => Ok(&s.fields),
            DataNode::Record(r) => Ok(&r.fields),
            other => mismatch(id, "Structure or Record", other),
        }
    }

    /// The instance at `offset` of a compound array.
    pub fn element(&self, array: DataId, offset: usize) -> Result<DataId> {
        let array = self.compound_array(array)?;
        match array.elements.get(offset) {
            Some(id) => Ok(*id),
            None => data_err!(
                IndexOutOfRange,
                format!("element {} of {}", offset, array.len)
            ),
        }
    }

    /// A record that has already been read. Once the sequence is exhausted
    /// any row at or past its length is out of range.
    pub fn record(&self, seq: DataId, row: usize) -> Result<DataId> {
        let seq = self.sequence(seq)?;
        match seq.records.get(row) {
            Some(id) => Ok(*id),
            None => match seq.len {
                Some(len) => data_err!(IndexOutOfRange, format!("row {row} of {len}")),
                None => data_err!(
                    IndexOutOfRange,
                    format!("row {row} not yet read ({} so far)", seq.records.len())
                ),
            },
        }
    }

    /// Reads the next record of a sequence instance, or returns None and
    /// fixes the sequence's length once the source signals the end.
    pub fn next_record<D, F>(&mut self, dsp: &D, factory: &F, seq: DataId) -> Result<Option<DataId>>
    where
        D: Dsp + ?Sized,
        F: DataObjectFactory,
    {
        let (template, handle, row) = {
            let s = self.sequence(seq)?;
            if s.len.is_some() {
                return Ok(None);
            }
            (s.template, s.handle, s.records.len())
        };
        let dmr = dsp.dmr();

        let Some(record_handle) = dsp
            .record(handle, row)
            .map_err(|err| err.at(&dmr.fqn(template)))?
        else {
            if let DataNode::Sequence(s) = &mut self.nodes[seq.index()] {
                s.len = Some(row);
            }
            return Ok(None);
        };

        let record = factory.new_record(dsp, self, template, seq, row, record_handle)?;
        let id = self.push(DataNode::Record(record));
        self.build_fields(dsp, factory, template, id, record_handle)?;
        if let DataNode::Sequence(s) = &mut self.nodes[seq.index()] {
            s.records.push(id);
        }
        Ok(Some(id))
    }

    /// Reads a sequence instance to its end and returns its length.
    /// Calling it again is cheap.
    pub fn enumerate_records<D, F>(
        &mut self,
        dsp: &D,
        factory: &F,
        seq: DataId,
        preallocate: bool,
    ) -> Result<usize>
    where
        D: Dsp + ?Sized,
        F: DataObjectFactory,
    {
        let handle = {
            let s = self.sequence(seq)?;
            if let Some(len) = s.len {
                return Ok(len);
            }
            s.handle
        };
        if preallocate
            && let Some(hint) = dsp.record_count_hint(handle)
            && let DataNode::Sequence(s) = &mut self.nodes[seq.index()]
        {
            s.records
                .reserve(hint.saturating_sub(s.records.len()).min(MAX_RESERVE));
        }

        while self.next_record(dsp, factory, seq)?.is_some() {}

        let len = self.sequence(seq)?.records.len();
        log::trace!("sequence {seq} has {len} records");
        Ok(len)
    }

    fn lookup(&self, id: DataId) -> Result<&DataNode> {
        match self.nodes.get(id.index()) {
            Some(node) => Ok(node),
            None => data_err!(MissingNode, format!("no data node {id}")),
        }
    }

    fn push(&mut self, node: DataNode) -> DataId {
        let id = DataId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn build_variable<D, F>(
        &mut self,
        dsp: &D,
        factory: &F,
        var: NodeId,
        parent: Option<DataId>,
        handle: Handle,
    ) -> Result<DataId>
    where
        D: Dsp + ?Sized,
        F: DataObjectFactory,
    {
        let dmr = dsp.dmr();
        match dmr.node(var).kind {
            NodeKind::Atomic { .. } => {
                let atomic = factory.new_atomic_variable(dsp, var, parent, handle)?;
                Ok(self.push(DataNode::Atomic(atomic)))
            }
            NodeKind::Structure { .. } | NodeKind::Sequence { .. } => {
                let array = factory.new_compound_array(dsp, var, parent, handle)?;
                let len = array.len;
                let id = self.push(DataNode::CompoundArray(array));
                for offset in 0..len {
                    let element = self.build_element(dsp, factory, dmr, var, id, offset, handle)?;
                    if let DataNode::CompoundArray(array) = &mut self.nodes[id.index()] {
                        array.elements.push(element);
                    }
                }
                check_exhausted(dsp.element(handle, len), len, "elements")
                    .map_err(|err| err.at(&dmr.fqn(var)))?;
                Ok(id)
            }
            ref other => {
                let err: Result<DataId> =
                    data_err!(TypeMismatch, format!("{} is not a variable", other.name()));
                err.map_err(|err| err.at(&dmr.fqn(var)))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_element<D, F>(
        &mut self,
        dsp: &D,
        factory: &F,
        dmr: &Dmr,
        var: NodeId,
        array: DataId,
        offset: usize,
        array_handle: Handle,
    ) -> Result<DataId>
    where
        D: Dsp + ?Sized,
        F: DataObjectFactory,
    {
        let handle = dsp
            .element(array_handle, offset)
            .map_err(|err| err.at(&dmr.fqn(var)))?;
        if matches!(dmr.node(var).kind, NodeKind::Structure { .. }) {
            let instance = factory.new_structure(dsp, self, var, array, offset, handle)?;
            let id = self.push(DataNode::Structure(instance));
            self.build_fields(dsp, factory, var, id, handle)?;
            Ok(id)
        } else {
            let instance = factory.new_sequence(dsp, self, var, array, offset, handle)?;
            Ok(self.push(DataNode::Sequence(instance)))
        }
    }

    fn build_fields<D, F>(
        &mut self,
        dsp: &D,
        factory: &F,
        var: NodeId,
        instance: DataId,
        handle: Handle,
    ) -> Result<()>
    where
        D: Dsp + ?Sized,
        F: DataObjectFactory,
    {
        let dmr = dsp.dmr();
        let members = dmr.node(var).children();
        for (i, field) in members.iter().enumerate() {
            let field_handle = dsp
                .field(handle, i)
                .map_err(|err| err.at(&dmr.fqn(*field)))?;
            let child = self.build_variable(dsp, factory, *field, Some(instance), field_handle)?;
            match &mut self.nodes[instance.index()] {
                DataNode::Structure(s) => s.fields.push(child),
                DataNode::Record(r) => r.fields.push(child),
                _ => {}
            }
        }
        check_exhausted(dsp.field(handle, members.len()), members.len(), "members")
            .map_err(|err| err.at(&dmr.fqn(var)))
    }
}

/// A source must refuse the position just past what the schema declares;
/// holding more than that is a shape error, not something to drop.
fn check_exhausted(past_end: Result<Handle>, declared: usize, what: &str) -> Result<()> {
    match past_end {
        Ok(_) => data_err!(
            ShapeMismatch,
            format!("source holds more than the {declared} declared {what}")
        ),
        Err(err) if err.code == ErrorCode::IndexOutOfRange => Ok(()),
        Err(err) => Err(err),
    }
}

fn mismatch<T>(id: DataId, expected: &str, found: &DataNode) -> Result<T> {
    data_err!(
        TypeMismatch,
        format!("{id} is a {}, expected {expected}", found.kind_name())
    )
}
