//! Textual cumulative-offset instructions.
//!
//! Format: `opcode,data,aggregates,output,init,broadcast`, e.g.
//! `cumulative-offset-plus,X,Xagg,Y,0,true`.

/*
 * File: /src/cumulative/instruction.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Instruction parsing, printing and execution
 */

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use log::info;

use crate::context::ExecutionContext;
use crate::cumulative::offset::CumulativeOffsetEngine;
use crate::cumulative::types::{CumulativeError, CumulativeOp, InstructionError};

const NUM_FIELDS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeOffsetInstruction {
    engine: CumulativeOffsetEngine,
    input1: String,
    input2: String,
    output: String,
}

impl CumulativeOffsetInstruction {
    pub fn parse(instruction: &str) -> Result<Self, InstructionError> {
        let parts: Vec<&str> = instruction.split(',').map(str::trim).collect();
        if parts.len() != NUM_FIELDS {
            return Err(InstructionError::FieldCount {
                expected: NUM_FIELDS,
                actual: parts.len(),
            });
        }
        let op = CumulativeOp::from_opcode(parts[0])
            .map_err(|_| InstructionError::UnknownOpcode(parts[0].to_string()))?;
        let init = parts[4]
            .parse::<f64>()
            .map_err(|_| InstructionError::InvalidNumber(parts[4].to_string()))?;
        let broadcast = match parts[5].to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(InstructionError::InvalidBoolean(parts[5].to_string())),
        };
        Ok(Self {
            engine: CumulativeOffsetEngine::with_op(op, init, broadcast),
            input1: parts[1].to_string(),
            input2: parts[2].to_string(),
            output: parts[3].to_string(),
        })
    }

    pub fn engine(&self) -> &CumulativeOffsetEngine {
        &self.engine
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Applies the offsets of `input2` to `input1` and binds the result to
    /// `output`, recording lineage on both inputs.
    pub fn process(&self, ec: &mut ExecutionContext) -> Result<(), CumulativeError> {
        let start = Instant::now();
        let data_var = ec
            .get_matrix(&self.input1)
            .cloned()
            .ok_or_else(|| CumulativeError::UnknownVariable(self.input1.clone()))?;
        let agg_metadata = ec
            .get_metadata(&self.input2)
            .cloned()
            .ok_or_else(|| CumulativeError::UnknownVariable(self.input2.clone()))?;

        let out = if self.engine.is_broadcast() {
            let agg = ec
                .get_broadcast(&self.input2)
                .ok_or_else(|| CumulativeError::UnknownVariable(self.input2.clone()))?;
            self.engine.apply_broadcast(&data_var.data, &agg, &agg_metadata)?
        } else {
            let agg_var = ec
                .get_matrix(&self.input2)
                .ok_or_else(|| CumulativeError::UnknownVariable(self.input2.clone()))?;
            self.engine.apply_shuffle(&data_var.data, &agg_var.data, &agg_metadata)?
        };

        let out_metadata = self.engine.output_metadata(&data_var.metadata)?;
        ec.set_matrix(&self.output, out_metadata, out);
        ec.add_lineage(&self.output, &self.input1, false);
        ec.add_lineage(&self.output, &self.input2, self.engine.is_broadcast());
        info!("{} done in {:?}", self, start.elapsed());
        Ok(())
    }
}

impl FromStr for CumulativeOffsetInstruction {
    type Err = InstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CumulativeOffsetInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.engine.op(),
            self.input1,
            self.input2,
            self.output,
            self.engine.init_value(),
            self.engine.is_broadcast()
        )
    }
}
