// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Materialized values for compiled variables.
//!
//! Every array is stored flat in row-major order, so element `i` of the
//! storage is the position `Index::offset_to_index(i, shape)`. Structure
//! arrays store one `StructureData` per element holding each member's
//! values; sequence arrays store one `SequenceData` per element holding
//! its records.

use std::collections::HashMap;

use dap4_core::{AtomicType, Index, Odometer, Result, Value, arg_err, data_err, element_count};

use crate::target::TargetId;

/// A `start:stride:stop` projection of one dimension. `stop` is
/// inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: usize,
    pub stride: usize,
    pub stop: usize,
}

impl Slice {
    pub fn new(start: usize, stride: usize, stop: usize) -> Self {
        Slice {
            start,
            stride,
            stop,
        }
    }

    /// The whole of a dimension of `size`.
    pub fn all(size: usize) -> Self {
        Slice::new(0, 1, size.saturating_sub(1))
    }

    /// Number of positions selected; 0 for a malformed slice.
    pub fn count(&self) -> usize {
        if self.stride == 0 || self.start > self.stop {
            return 0;
        }
        (self.stop - self.start) / self.stride + 1
    }

    fn validate(&self, size: usize) -> Result<()> {
        if self.stride == 0 {
            return arg_err!(InvalidArgument, "slice stride must be positive".to_owned());
        }
        if self.start > self.stop {
            return arg_err!(
                InvalidArgument,
                format!("slice start {} past stop {}", self.start, self.stop)
            );
        }
        if self.stop >= size {
            return data_err!(
                IndexOutOfRange,
                format!("slice stop {} past dimension of {}", self.stop, size)
            );
        }
        Ok(())
    }
}

fn check_shape(index: &Index, shape: &[usize]) -> Result<usize> {
    if index.dimsizes() != shape {
        return arg_err!(
            InvalidArgument,
            format!("index {index} does not address shape {shape:?}")
        );
    }
    if !index.in_bounds() {
        return data_err!(IndexOutOfRange, format!("{index}"));
    }
    Ok(index.linear_offset())
}

fn dimension(shape: &[usize], i: usize) -> Result<usize> {
    match shape.get(i) {
        Some(size) => Ok(*size),
        None => arg_err!(
            InvalidArgument,
            format!("dimension {} out of range for rank {}", i, shape.len())
        ),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicArray {
    base_type: AtomicType,
    shape: Vec<usize>,
    values: Vec<Value>,
}

impl AtomicArray {
    pub fn new(base_type: AtomicType, shape: Vec<usize>, values: Vec<Value>) -> Result<Self> {
        let expected = element_count(&shape);
        if values.len() != expected {
            return data_err!(
                ShapeMismatch,
                format!("{} values for shape {:?}", values.len(), shape)
            );
        }
        if let Some(v) = values.iter().find(|v| v.atomic_type() != base_type) {
            return data_err!(
                TypeMismatch,
                format!("{} value in a {} array", v.atomic_type(), base_type)
            );
        }
        Ok(AtomicArray {
            base_type,
            shape,
            values,
        })
    }

    pub fn base_type(&self) -> AtomicType {
        self.base_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn dimension(&self, i: usize) -> Result<usize> {
        dimension(&self.shape, i)
    }

    pub fn get(&self, index: &Index) -> Result<&Value> {
        let offset = check_shape(index, &self.shape)?;
        Ok(&self.values[offset])
    }

    pub fn get_offset(&self, offset: usize) -> Result<&Value> {
        match self.values.get(offset) {
            Some(v) => Ok(v),
            None => data_err!(
                IndexOutOfRange,
                format!("offset {} of {}", offset, self.values.len())
            ),
        }
    }

    /// Drops every dimension of size 1. Rank-1 arrays are returned as is,
    /// and an array made entirely of size-1 dimensions keeps one.
    pub fn squeeze(&self) -> AtomicArray {
        if self.rank() <= 1 {
            return self.clone();
        }
        let mut shape: Vec<usize> = self.shape.iter().copied().filter(|d| *d != 1).collect();
        if shape.is_empty() {
            shape.push(1);
        }
        AtomicArray {
            base_type: self.base_type,
            shape,
            values: self.values.clone(),
        }
    }

    /// Projects each dimension through a slice; the result has one
    /// dimension per slice, sized by the slice's count.
    pub fn section(&self, slices: &[Slice]) -> Result<AtomicArray> {
        if slices.len() != self.rank() {
            return arg_err!(
                InvalidArgument,
                format!("{} slices for rank {}", slices.len(), self.rank())
            );
        }
        for (slice, size) in slices.iter().zip(self.shape.iter()) {
            slice.validate(*size)?;
        }

        let shape: Vec<usize> = slices.iter().map(Slice::count).collect();
        let mut values = Vec::with_capacity(element_count(&shape));
        let mut source = vec![0; self.rank()];
        for idx in Odometer::new(&shape) {
            for (d, slice) in slices.iter().enumerate() {
                source[d] = slice.start + idx.indices()[d] * slice.stride;
            }
            let offset = Index::from_parts(&source, &self.shape)?.linear_offset();
            values.push(self.values[offset].clone());
        }

        Ok(AtomicArray {
            base_type: self.base_type,
            shape,
            values,
        })
    }
}

/// Member values of one structure instance or record, in declaration
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructureData {
    fields: Vec<TargetArray>,
}

impl StructureData {
    pub fn new(fields: Vec<TargetArray>) -> Self {
        StructureData { fields }
    }

    pub fn fields(&self) -> &[TargetArray] {
        &self.fields
    }

    pub fn field(&self, i: usize) -> Option<&TargetArray> {
        self.fields.get(i)
    }
}

fn member_index(members: &[String], name: &str) -> Result<usize> {
    match members.iter().position(|m| m == name) {
        Some(i) => Ok(i),
        None => arg_err!(DoesNotExist, format!("no member '{name}'")),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructureArray {
    shape: Vec<usize>,
    members: Vec<String>,
    elements: Vec<StructureData>,
}

impl StructureArray {
    pub fn new(shape: Vec<usize>, members: Vec<String>, elements: Vec<StructureData>) -> Result<Self> {
        if elements.len() != element_count(&shape) {
            return data_err!(
                ShapeMismatch,
                format!("{} instances for shape {:?}", elements.len(), shape)
            );
        }
        if let Some(e) = elements.iter().find(|e| e.fields.len() != members.len()) {
            return data_err!(
                ShapeMismatch,
                format!("instance has {} of {} members", e.fields.len(), members.len())
            );
        }
        Ok(StructureArray {
            shape,
            members,
            elements,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn element(&self, offset: usize) -> Result<&StructureData> {
        match self.elements.get(offset) {
            Some(e) => Ok(e),
            None => data_err!(
                IndexOutOfRange,
                format!("offset {} of {}", offset, self.elements.len())
            ),
        }
    }

    pub fn element_at(&self, index: &Index) -> Result<&StructureData> {
        let offset = check_shape(index, &self.shape)?;
        self.element(offset)
    }

    /// The values of member `name` in the instance at `offset`.
    pub fn member(&self, offset: usize, name: &str) -> Result<&TargetArray> {
        let i = member_index(&self.members, name)?;
        Ok(&self.element(offset)?.fields[i])
    }

    pub fn member_at(&self, index: &Index, name: &str) -> Result<&TargetArray> {
        let offset = check_shape(index, &self.shape)?;
        self.member(offset, name)
    }
}

/// The records of one sequence instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceData {
    records: Vec<StructureData>,
}

impl SequenceData {
    pub fn new(records: Vec<StructureData>) -> Self {
        SequenceData { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StructureData] {
        &self.records
    }

    pub fn record(&self, row: usize) -> Result<&StructureData> {
        match self.records.get(row) {
            Some(r) => Ok(r),
            None => data_err!(
                IndexOutOfRange,
                format!("row {} of {}", row, self.records.len())
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceArray {
    shape: Vec<usize>,
    members: Vec<String>,
    elements: Vec<SequenceData>,
}

impl SequenceArray {
    pub fn new(shape: Vec<usize>, members: Vec<String>, elements: Vec<SequenceData>) -> Result<Self> {
        if elements.len() != element_count(&shape) {
            return data_err!(
                ShapeMismatch,
                format!("{} sequences for shape {:?}", elements.len(), shape)
            );
        }
        Ok(SequenceArray {
            shape,
            members,
            elements,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn element(&self, offset: usize) -> Result<&SequenceData> {
        match self.elements.get(offset) {
            Some(e) => Ok(e),
            None => data_err!(
                IndexOutOfRange,
                format!("offset {} of {}", offset, self.elements.len())
            ),
        }
    }

    pub fn element_at(&self, index: &Index) -> Result<&SequenceData> {
        let offset = check_shape(index, &self.shape)?;
        self.element(offset)
    }

    /// Member `name` of record `row` of the sequence at `offset`.
    pub fn member(&self, offset: usize, row: usize, name: &str) -> Result<&TargetArray> {
        let i = member_index(&self.members, name)?;
        Ok(&self.element(offset)?.record(row)?.fields[i])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetArray {
    Atomic(AtomicArray),
    Structure(StructureArray),
    Sequence(SequenceArray),
}

impl TargetArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            TargetArray::Atomic(a) => a.shape(),
            TargetArray::Structure(s) => s.shape(),
            TargetArray::Sequence(s) => s.shape(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements; for sequence arrays, the number of sequences
    /// rather than records.
    pub fn len(&self) -> usize {
        match self {
            TargetArray::Atomic(a) => a.len(),
            TargetArray::Structure(s) => s.len(),
            TargetArray::Sequence(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self, i: usize) -> Result<usize> {
        dimension(self.shape(), i)
    }

    pub fn as_atomic(&self) -> Option<&AtomicArray> {
        match self {
            TargetArray::Atomic(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&StructureArray> {
        match self {
            TargetArray::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SequenceArray> {
        match self {
            TargetArray::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn summary(&self) -> String {
        match self {
            TargetArray::Atomic(a) => format!("{}{:?}", a.base_type(), a.shape()),
            TargetArray::Structure(s) => format!("structure{:?} x{}", s.shape(), s.members().len()),
            TargetArray::Sequence(s) => {
                let rows: usize = s.elements.iter().map(SequenceData::len).sum();
                format!("sequence{:?} ({} records)", s.shape(), rows)
            }
        }
    }
}

/// Compiled values for each top-level variable, keyed by its target node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetArrayMap {
    arrays: HashMap<TargetId, TargetArray>,
}

impl TargetArrayMap {
    /// Returns false if `id` already has an array.
    pub(crate) fn insert(&mut self, id: TargetId, array: TargetArray) -> bool {
        if self.arrays.contains_key(&id) {
            return false;
        }
        self.arrays.insert(id, array);
        true
    }

    pub fn get(&self, id: TargetId) -> Option<&TargetArray> {
        self.arrays.get(&id)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn ids(&self) -> Vec<TargetId> {
        let mut ids: Vec<_> = self.arrays.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
