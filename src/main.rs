/*
 * File: /main.rs
 * Created Date: Tuesday November 21st 2023
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026 6:40:02 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Demo run: partition a random matrix, then cumsum it
 */

use std::env;
use std::error::Error;
use std::process;
use std::time::Instant;

use log::{error, info, LevelFilter};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fast_partition::cumulative::{build_offset_aggregates, local_block_aggregates};
use fast_partition::partitioner::read_partition;
use fast_partition::{
    init_logger, timestamp, BlockDataset, CumulativeOffsetInstruction, DataPartitioner,
    ExecutionContext, LocalBlockStore, MatrixMetadata, MatrixObject, PartitionFormat,
    PartitionerConfig,
};

const ROWS: usize = 5000;
const COLS: usize = 300;
const BLOCK: i32 = 1000;

fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.random_range(0.0..1.0))
}

fn run(config: PartitionerConfig) -> Result<(), Box<dyn Error>> {
    let method = "fast_partition";
    let matrix = random_matrix(ROWS, COLS, 42);
    let blocks = BlockDataset::from_matrix(&matrix, BLOCK, BLOCK);
    let metadata =
        MatrixMetadata::new(ROWS as i64, COLS as i64, BLOCK, BLOCK, blocks.non_zeros())?;
    info!("[method: {}] [{}] Generated {}x{} matrix", method, timestamp(), ROWS, COLS);

    // partitioning
    let store = LocalBlockStore::new(&config.storage_root)?;
    let partitioner = DataPartitioner::new(PartitionFormat::RowWise, config, store)?;
    let mut input = MatrixObject::in_memory("X", "demo/X", metadata.clone(), blocks.clone());
    let start = Instant::now();
    let partitioned = partitioner.create_partitioned_matrix_default(&mut input)?;
    info!(
        "[method: {}] [{}] '{}' stored as {:?} in {:.1}s",
        method,
        timestamp(),
        partitioned.var_name(),
        partitioned.partition_format(),
        start.elapsed().as_secs_f32()
    );
    if partitioned.is_partitioned() {
        let first = read_partition(partitioner.store(), &partitioned, 1)?;
        info!("[method: {}] [{}] Partition 1 is {:?}", method, timestamp(), first.dim());
    }

    // cumulative sum, both offset paths
    let mut ec = ExecutionContext::new();
    let inst = CumulativeOffsetInstruction::parse("cumulative-offset-plus,X,Xagg,Y,0,true")?;
    let local = local_block_aggregates(inst.engine().op(), &blocks)?;
    let (agg_metadata, agg) =
        build_offset_aggregates(inst.engine().op(), &local, &metadata, 0.0, BLOCK)?;
    ec.set_matrix("X", metadata.clone(), blocks);
    ec.set_matrix("Xagg", agg_metadata, agg);

    let start = Instant::now();
    inst.process(&mut ec)?;
    CumulativeOffsetInstruction::parse("cumulative-offset-plus,X,Xagg,Z,0,false")?.process(&mut ec)?;
    info!(
        "[method: {}] [{}] Cumulative sums done in {:.1}s",
        method,
        timestamp(),
        start.elapsed().as_secs_f32()
    );

    let y = ec.get_matrix("Y").ok_or("missing output Y")?;
    let z = ec.get_matrix("Z").ok_or("missing output Z")?;
    let y = y.data.to_matrix(metadata.rows, metadata.cols, BLOCK, BLOCK)?;
    let z = z.data.to_matrix(metadata.rows, metadata.cols, BLOCK, BLOCK)?;
    let column_sum: f64 = matrix.column(0).sum();
    info!(
        "[method: {}] [{}] Last row, column 0: {:.6} (expected {:.6}), paths agree: {}",
        method,
        timestamp(),
        y[(ROWS - 1, 0)],
        column_sum,
        y == z
    );
    Ok(())
}

fn main() {
    if let Err(e) = init_logger(LevelFilter::Info) {
        eprintln!("Logger setup failed: {}", e);
    }
    let config = PartitionerConfig::new(env::args()).unwrap_or_else(|err| {
        eprintln!("Problem parsing arguments: {}", err);
        eprintln!("Usage: fast_partition <storage-root> [in-memory-threshold] [sparsity-threshold]");
        process::exit(1);
    });
    if let Err(e) = run(config) {
        error!("Run failed: {}", e);
        process::exit(1);
    }
}
