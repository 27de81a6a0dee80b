// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod dmr;
pub mod index;
pub mod value;

pub use common::{Error, ErrorCode, ErrorKind, Result};
pub use dmr::{DapNode, DimRef, Dmr, DmrBuilder, NodeId, NodeKind};
pub use index::{Index, Odometer, checked_element_count, element_count};
pub use value::{AtomicType, Value};
