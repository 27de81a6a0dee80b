// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod array;
pub mod compiler;
pub mod config;
pub mod data;
pub mod dsp;
pub mod factory;
pub mod memory;
pub mod nodemap;
pub mod target;
#[doc(hidden)]
pub mod test_common;

pub use self::array::{
    AtomicArray, SequenceArray, SequenceData, Slice, StructureArray, StructureData, TargetArray,
    TargetArrayMap,
};
pub use self::compiler::{Compiled, CompilerState, ModelCompiler};
pub use self::config::CompilerConfig;
pub use self::data::{DataId, DataNode, DataTree};
pub use self::dsp::{Dsp, Handle, HandleInfo};
pub use self::factory::{DataFactory, DataObjectFactory};
pub use self::memory::{MemoryDsp, Source};
pub use self::nodemap::NodeMap;
pub use self::target::{
    TargetDim, TargetId, TargetKind, TargetModel, TargetNode, TargetVariable, VariableKind,
};

pub use dap4_core::{
    AtomicType, DimRef, Dmr, DmrBuilder, Error, ErrorCode, ErrorKind, Index, NodeId, Odometer,
    Result, Value, element_count,
};
