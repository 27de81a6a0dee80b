// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Two-phase compilation of a data source into a `Compiled` model.
//!
//! `compile_schema` translates the DMR into a `TargetModel` and fills the
//! `NodeMap`. `compile_data` then walks the data tree and materializes one
//! `TargetArray` per top-level variable. Either phase failing discards
//! everything built so far and leaves the compiler in `Failed`.

mod schema;
mod values;

use dap4_core::{Result, state_err};

use crate::array::{TargetArray, TargetArrayMap};
use crate::config::CompilerConfig;
use crate::dsp::Dsp;
use crate::factory::{DataFactory, DataObjectFactory};
use crate::nodemap::NodeMap;
use crate::target::TargetModel;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompilerState {
    Uninitialized,
    SchemaCompiled,
    DataCompiled,
    Failed,
}

pub struct ModelCompiler<'a, F: DataObjectFactory = DataFactory> {
    dsp: &'a dyn Dsp,
    factory: F,
    config: CompilerConfig,
    state: CompilerState,
    target: Option<TargetModel>,
    nodemap: Option<NodeMap>,
    arrays: Option<TargetArrayMap>,
}

impl<'a> ModelCompiler<'a> {
    pub fn new(dsp: &'a dyn Dsp) -> Self {
        ModelCompiler::with_config(dsp, CompilerConfig::default())
    }

    pub fn with_config(dsp: &'a dyn Dsp, config: CompilerConfig) -> Self {
        ModelCompiler::with_factory(dsp, config, DataFactory)
    }
}

impl<'a, F: DataObjectFactory> ModelCompiler<'a, F> {
    pub fn with_factory(dsp: &'a dyn Dsp, config: CompilerConfig, factory: F) -> Self {
        ModelCompiler {
            dsp,
            factory,
            config,
            state: CompilerState::Uninitialized,
            target: None,
            nodemap: None,
            arrays: None,
        }
    }

    pub fn state(&self) -> CompilerState {
        self.state
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Runs both phases.
    pub fn compile(&mut self) -> Result<()> {
        self.compile_schema()?;
        self.compile_data()
    }

    pub fn compile_schema(&mut self) -> Result<()> {
        if self.state != CompilerState::Uninitialized {
            return state_err!(
                IllegalState,
                format!("compile_schema in state {:?}", self.state)
            );
        }

        let dmr = self.dsp.dmr();
        log::debug!("compiling schema of '{}' ({} nodes)", dmr.name(), dmr.len());
        match schema::compile_schema(dmr) {
            Ok((target, nodemap)) => {
                self.target = Some(target);
                self.nodemap = Some(nodemap);
                self.state = CompilerState::SchemaCompiled;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn compile_data(&mut self) -> Result<()> {
        if self.state != CompilerState::SchemaCompiled {
            return state_err!(
                IllegalState,
                format!("compile_data in state {:?}", self.state)
            );
        }
        let (Some(target), Some(nodemap)) = (&self.target, &self.nodemap) else {
            return state_err!(IllegalState, "schema results missing".to_owned());
        };

        let result =
            values::compile_values(self.dsp, &self.factory, &self.config, target, nodemap);
        match result {
            Ok(arrays) => {
                self.arrays = Some(arrays);
                self.state = CompilerState::DataCompiled;
                if self.config.debug {
                    self.dump();
                }
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn target(&self) -> Option<&TargetModel> {
        self.target.as_ref()
    }

    pub fn node_map(&self) -> Option<&NodeMap> {
        self.nodemap.as_ref()
    }

    pub fn array_map(&self) -> Option<&TargetArrayMap> {
        self.arrays.as_ref()
    }

    /// Hands over the results of a successful `compile_data`.
    pub fn into_compiled(self) -> Result<Compiled> {
        match (self.state, self.target, self.nodemap, self.arrays) {
            (CompilerState::DataCompiled, Some(target), Some(nodemap), Some(arrays)) => {
                Ok(Compiled {
                    target,
                    nodemap,
                    arrays,
                })
            }
            (state, ..) => state_err!(
                IllegalState,
                format!("nothing to hand over in state {state:?}")
            ),
        }
    }

    fn fail(&mut self, err: dap4_core::Error) -> dap4_core::Error {
        log::debug!("compilation failed: {err}");
        self.state = CompilerState::Failed;
        self.target = None;
        self.nodemap = None;
        self.arrays = None;
        err
    }

    fn dump(&self) {
        let (Some(target), Some(nodemap), Some(arrays)) = (&self.target, &self.nodemap, &self.arrays)
        else {
            return;
        };
        let dmr = self.dsp.dmr();
        for (schema, id) in nodemap.pairs() {
            let fqn = target.get(id).map(|n| n.fqn.as_str()).unwrap_or("?");
            log::debug!("nodemap: {} {} -> {} {}", schema, dmr.fqn(schema), id, fqn);
        }
        for id in arrays.ids() {
            if let (Some(node), Some(array)) = (target.get(id), arrays.get(id)) {
                log::debug!("array: {} = {}", node.fqn, array.summary());
            }
        }
    }
}

/// The output of a successful compilation. Read-only, so it can be
/// shared across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compiled {
    pub target: TargetModel,
    pub nodemap: NodeMap,
    pub arrays: TargetArrayMap,
}

impl Compiled {
    /// The array compiled for the top-level variable named `fqn`.
    pub fn array(&self, fqn: &str) -> Option<&TargetArray> {
        self.target.find(fqn).and_then(|id| self.arrays.get(id))
    }
}
