// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A data source backed by values held in memory.
//!
//! Each top-level variable is given a `Source` tree whose nesting mirrors
//! its schema: atomic values, then arrays of instances, instance members,
//! and sequence records. Sources are flattened into a slot arena and
//! handles are slot indices.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use dap4_core::{AtomicType, Dmr, NodeId, Result, Value, arg_err, data_err};

use crate::dsp::{Dsp, Handle, HandleInfo};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Atomic {
        base_type: AtomicType,
        values: Vec<Value>,
    },
    /// Row-major elements of a structure or sequence variable.
    Array(Vec<Source>),
    /// Members of one structure instance or record, in declaration order.
    Instance(Vec<Source>),
    /// Records of one sequence instance.
    Records(Vec<Source>),
}

#[derive(Clone, Debug)]
enum Slot {
    Atomic {
        base_type: AtomicType,
        values: Vec<Value>,
    },
    Array(Vec<Handle>),
    Instance(Vec<Handle>),
    Records(Vec<Handle>),
}

impl Slot {
    fn kind_name(&self) -> &'static str {
        match self {
            Slot::Atomic { .. } => "atomic",
            Slot::Array(_) => "array",
            Slot::Instance(_) => "instance",
            Slot::Records(_) => "records",
        }
    }
}

/// On-disk form of a `MemoryDsp`: a DMR plus a source per top-level
/// variable, keyed by fully qualified name.
#[derive(Serialize, Deserialize)]
struct MemoryDataset {
    dmr: Dmr,
    variables: BTreeMap<String, Source>,
}

#[derive(Clone, Debug)]
pub struct MemoryDsp {
    dmr: Dmr,
    slots: Vec<Slot>,
    variables: HashMap<NodeId, Handle>,
    count_hints: bool,
}

impl MemoryDsp {
    pub fn new(dmr: Dmr) -> Self {
        MemoryDsp {
            dmr,
            slots: vec![],
            variables: HashMap::new(),
            count_hints: true,
        }
    }

    /// Whether `record_count_hint` reports sequence lengths.
    pub fn with_count_hints(mut self, enabled: bool) -> Self {
        self.count_hints = enabled;
        self
    }

    /// Loads a DMR and its values from JSON, validating the DMR.
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: MemoryDataset = match serde_json::from_str(json) {
            Ok(dataset) => dataset,
            Err(err) => return arg_err!(InvalidArgument, format!("dataset json: {err}")),
        };
        dataset.dmr.validate()?;

        let fqns = dataset.dmr.fqn_table();
        let mut dsp = MemoryDsp::new(dataset.dmr);
        for (fqn, source) in dataset.variables {
            let Some(&var) = fqns.get(&fqn) else {
                return arg_err!(DoesNotExist, format!("no variable '{fqn}'"));
            };
            dsp.insert(var, source)?;
        }
        Ok(dsp)
    }

    /// Backs a top-level variable with `source`. Sources are not checked
    /// against the schema here; that happens when the data tree is built.
    pub fn insert(&mut self, var: NodeId, source: Source) -> Result<Handle> {
        let top_level = self.dmr.get(var).is_some_and(|node| {
            node.is_variable()
                && node
                    .parent
                    .and_then(|p| self.dmr.get(p))
                    .is_some_and(|p| p.is_group())
        });
        if !top_level {
            return arg_err!(
                InvalidArgument,
                format!("{var} is not a variable declared in a group")
            );
        }
        let handle = self.alloc(source);
        self.variables.insert(var, handle);
        Ok(handle)
    }

    fn alloc(&mut self, source: Source) -> Handle {
        let slot = match source {
            Source::Atomic { base_type, values } => Slot::Atomic { base_type, values },
            Source::Array(items) => Slot::Array(self.alloc_all(items)),
            Source::Instance(items) => Slot::Instance(self.alloc_all(items)),
            Source::Records(items) => Slot::Records(self.alloc_all(items)),
        };
        let handle = Handle(self.slots.len() as u64);
        self.slots.push(slot);
        handle
    }

    fn alloc_all(&mut self, items: Vec<Source>) -> Vec<Handle> {
        items.into_iter().map(|item| self.alloc(item)).collect()
    }

    fn slot(&self, handle: Handle) -> Result<&Slot> {
        match self.slots.get(handle.0 as usize) {
            Some(slot) => Ok(slot),
            None => data_err!(MissingNode, format!("unknown handle {handle}")),
        }
    }

    fn children(&self, handle: Handle, want: &str) -> Result<&[Handle]> {
        let slot = self.slot(handle)?;
        match (slot, want) {
            (Slot::Array(items), "array")
            | (Slot::Instance(items), "instance")
            | (Slot::Records(items), "records") => Ok(items),
            _ => data_err!(
                TypeMismatch,
                format!("{} holds {}, not {}", handle, slot.kind_name(), want)
            ),
        }
    }
}

fn nth(items: &[Handle], i: usize, what: &str) -> Result<Handle> {
    match items.get(i) {
        Some(h) => Ok(*h),
        None => data_err!(
            IndexOutOfRange,
            format!("{} {} of {}", what, i, items.len())
        ),
    }
}

impl Dsp for MemoryDsp {
    fn dmr(&self) -> &Dmr {
        &self.dmr
    }

    fn variable(&self, var: NodeId) -> Result<Handle> {
        match self.variables.get(&var) {
            Some(handle) => Ok(*handle),
            None => data_err!(MissingNode, "variable has no data".to_owned()),
        }
    }

    fn describe(&self, atomic: Handle) -> Result<HandleInfo> {
        match self.slot(atomic)? {
            Slot::Atomic { base_type, values } => Ok(HandleInfo {
                base_type: *base_type,
                count: values.len(),
            }),
            other => data_err!(
                TypeMismatch,
                format!("{} holds {}, not atomic values", atomic, other.kind_name())
            ),
        }
    }

    fn read_atomic(&self, atomic: Handle, offset: usize) -> Result<Value> {
        match self.slot(atomic)? {
            Slot::Atomic { values, .. } => match values.get(offset) {
                Some(v) => Ok(v.clone()),
                None => data_err!(
                    IndexOutOfRange,
                    format!("value {} of {}", offset, values.len())
                ),
            },
            other => data_err!(
                TypeMismatch,
                format!("{} holds {}, not atomic values", atomic, other.kind_name())
            ),
        }
    }

    fn element(&self, array: Handle, offset: usize) -> Result<Handle> {
        nth(self.children(array, "array")?, offset, "element")
    }

    fn field(&self, instance: Handle, index: usize) -> Result<Handle> {
        nth(self.children(instance, "instance")?, index, "member")
    }

    fn record(&self, sequence: Handle, row: usize) -> Result<Option<Handle>> {
        Ok(self.children(sequence, "records")?.get(row).copied())
    }

    fn record_count_hint(&self, sequence: Handle) -> Option<usize> {
        if !self.count_hints {
            return None;
        }
        self.children(sequence, "records").ok().map(<[Handle]>::len)
    }
}
