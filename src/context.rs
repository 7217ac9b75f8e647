//! Execution context: the symbol table of matrix variables seen by
//! instructions, plus the lineage edges they record.

/*
 * File: /src/context.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Execution context with cached broadcasts and lineage
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::dataset::{BlockDataset, PartitionedBroadcast};
use crate::matrix::{MatrixBlock, MatrixMetadata};

/// A matrix variable bound in the context.
#[derive(Debug, Clone)]
pub struct MatrixVariable {
    pub metadata: MatrixMetadata,
    pub data: Arc<BlockDataset<MatrixBlock>>,
    broadcast: Option<PartitionedBroadcast<MatrixBlock>>,
}

impl MatrixVariable {
    pub fn new(metadata: MatrixMetadata, data: BlockDataset<MatrixBlock>) -> Self {
        Self {
            metadata,
            data: Arc::new(data),
            broadcast: None,
        }
    }
}

/// `output` was computed from `input`; `broadcast` marks inputs consumed
/// through a broadcast table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageEdge {
    pub output: String,
    pub input: String,
    pub broadcast: bool,
}

#[derive(Debug, Default)]
pub struct ExecutionContext {
    variables: HashMap<String, MatrixVariable>,
    lineage: Vec<LineageEdge>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any previous binding and its broadcast.
    pub fn set_matrix(
        &mut self,
        name: &str,
        metadata: MatrixMetadata,
        data: BlockDataset<MatrixBlock>,
    ) {
        self.variables
            .insert(name.to_string(), MatrixVariable::new(metadata, data));
    }

    pub fn get_matrix(&self, name: &str) -> Option<&MatrixVariable> {
        self.variables.get(name)
    }

    pub fn get_metadata(&self, name: &str) -> Option<&MatrixMetadata> {
        self.variables.get(name).map(|v| &v.metadata)
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<MatrixVariable> {
        self.variables.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Broadcast table of `name`, created on first use and shared by later
    /// callers.
    pub fn get_broadcast(&mut self, name: &str) -> Option<PartitionedBroadcast<MatrixBlock>> {
        let variable = self.variables.get_mut(name)?;
        if variable.broadcast.is_none() {
            debug!("Creating broadcast for '{}' ({} blocks)", name, variable.data.len());
            variable.broadcast = Some(variable.data.as_ref().clone().broadcast());
        }
        variable.broadcast.clone()
    }

    pub fn add_lineage(&mut self, output: &str, input: &str, broadcast: bool) {
        self.lineage.push(LineageEdge {
            output: output.to_string(),
            input: input.to_string(),
            broadcast,
        });
    }

    /// Inputs recorded for `output`, in insertion order.
    pub fn lineage_of(&self, output: &str) -> Vec<&LineageEdge> {
        self.lineage.iter().filter(|e| e.output == output).collect()
    }
}
