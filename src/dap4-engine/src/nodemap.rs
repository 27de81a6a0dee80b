// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use dap4_core::NodeId;

use crate::target::TargetId;

/// Bidirectional map between schema nodes and the target nodes compiled
/// from them. Every schema node maps to exactly one target node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeMap {
    to_target: HashMap<NodeId, TargetId>,
    to_schema: HashMap<TargetId, NodeId>,
}

impl NodeMap {
    pub fn new() -> Self {
        NodeMap::default()
    }

    /// Records a pair, refusing to remap either side.
    pub(crate) fn insert(&mut self, schema: NodeId, target: TargetId) -> bool {
        if self.to_target.contains_key(&schema) || self.to_schema.contains_key(&target) {
            return false;
        }
        self.to_target.insert(schema, target);
        self.to_schema.insert(target, schema);
        true
    }

    pub fn target_of(&self, schema: NodeId) -> Option<TargetId> {
        self.to_target.get(&schema).copied()
    }

    pub fn schema_of(&self, target: TargetId) -> Option<NodeId> {
        self.to_schema.get(&target).copied()
    }

    pub fn len(&self) -> usize {
        self.to_target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_target.is_empty()
    }

    /// Pairs ordered by schema node.
    pub fn pairs(&self) -> Vec<(NodeId, TargetId)> {
        let mut pairs: Vec<_> = self.to_target.iter().map(|(s, t)| (*s, *t)).collect();
        pairs.sort_unstable();
        pairs
    }
}
