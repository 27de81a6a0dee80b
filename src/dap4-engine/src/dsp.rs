// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The data source provider (DSP) seam.
//!
//! A DSP owns a dataset's DMR and whatever storage backs its values. The
//! compiler only ever talks to it through opaque `Handle`s: one per
//! top-level variable, and from there one per compound-array element,
//! structure member, and sequence record.

use std::fmt;

use serde::{Deserialize, Serialize};

use dap4_core::{AtomicType, Dmr, NodeId, Result, Value};

use crate::data::DataTree;
use crate::factory::DataFactory;

/// Opaque reference to something a DSP can read. Only the issuing DSP
/// can interpret it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// What a DSP reports about an atomic handle, so the factory can check
/// it against the declared type and shape before any value is read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HandleInfo {
    pub base_type: AtomicType,
    pub count: usize,
}

pub trait Dsp {
    /// The dataset's schema.
    fn dmr(&self) -> &Dmr;

    /// The root data instance. The default builds the whole tree (minus
    /// sequence records, which are read on demand) through `DataFactory`.
    fn data_dataset(&self) -> Result<DataTree> {
        DataTree::build(self, &DataFactory)
    }

    /// Backing handle for a variable declared directly in a group.
    fn variable(&self, var: NodeId) -> Result<Handle>;

    fn describe(&self, atomic: Handle) -> Result<HandleInfo>;

    /// One atomic value at a row-major linear offset.
    fn read_atomic(&self, atomic: Handle, offset: usize) -> Result<Value>;

    /// The structure or sequence instance at a compound-array offset.
    fn element(&self, array: Handle, offset: usize) -> Result<Handle>;

    /// Member `index` (declaration order) of a structure instance or record.
    fn field(&self, instance: Handle, index: usize) -> Result<Handle>;

    /// The record at `row`, or None once the sequence is exhausted.
    fn record(&self, sequence: Handle, row: usize) -> Result<Option<Handle>>;

    /// Number of records, if the source happens to know it up front. Only
    /// used to size buffers; enumeration always runs to the end signal.
    fn record_count_hint(&self, _sequence: Handle) -> Option<usize> {
        None
    }
}
