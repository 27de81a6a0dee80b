// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Builders for in-memory test datasets.
//!
//! `TestDataset` pairs a `DmrBuilder` with the sources for each top-level
//! variable, and the free functions below build those sources tersely.
//! These panic on malformed input; they are for tests and benchmarks.

use dap4_core::{AtomicType, DmrBuilder, NodeId, Value};

use crate::compiler::{Compiled, ModelCompiler};
use crate::memory::{MemoryDsp, Source};

pub struct TestDataset {
    schema: DmrBuilder,
    data: Vec<(NodeId, Source)>,
}

impl TestDataset {
    pub fn new(name: &str) -> Self {
        TestDataset {
            schema: DmrBuilder::new(name),
            data: vec![],
        }
    }

    pub fn root(&self) -> NodeId {
        self.schema.root()
    }

    pub fn schema(&mut self) -> &mut DmrBuilder {
        &mut self.schema
    }

    /// Backs top-level variable `var` with `source`.
    pub fn data(&mut self, var: NodeId, source: Source) -> &mut Self {
        self.data.push((var, source));
        self
    }

    pub fn build(self) -> MemoryDsp {
        let dmr = self.schema.build().expect("test schema should validate");
        let mut dsp = MemoryDsp::new(dmr);
        for (var, source) in self.data {
            dsp.insert(var, source).expect("test data for a top-level variable");
        }
        dsp
    }
}

/// Runs both compiler phases, panicking on failure.
pub fn compile(dsp: &MemoryDsp) -> Compiled {
    let mut compiler = ModelCompiler::new(dsp);
    if let Err(err) = compiler.compile() {
        panic!("compilation failed: {err}");
    }
    compiler
        .into_compiled()
        .expect("compiled model after a successful compile")
}

pub fn atomic(base_type: AtomicType, values: Vec<Value>) -> Source {
    Source::Atomic { base_type, values }
}

pub fn int32s(values: impl IntoIterator<Item = i32>) -> Source {
    atomic(AtomicType::Int32, values.into_iter().map(Value::from).collect())
}

pub fn float64s(values: impl IntoIterator<Item = f64>) -> Source {
    atomic(
        AtomicType::Float64,
        values.into_iter().map(Value::from).collect(),
    )
}

pub fn strings<'a>(values: impl IntoIterator<Item = &'a str>) -> Source {
    atomic(AtomicType::String, values.into_iter().map(Value::from).collect())
}

pub fn array(elements: Vec<Source>) -> Source {
    Source::Array(elements)
}

pub fn instance(fields: Vec<Source>) -> Source {
    Source::Instance(fields)
}

pub fn records(rows: Vec<Source>) -> Source {
    Source::Records(rows)
}
