//! the clip engines
//!
//! Callers depend on [`ClipEngine`]; the two implementations differ only in
//! how blocks are scheduled. [`SequentialEngine`] processes one block to
//! completion before reading the next, which is what bounds peak memory.
//! [`ShardedEngine`] fans disjoint block subsets out over a thread pool and
//! merges the per-worker results by block index, so worker completion order
//! can never change the output.

use crate::clip::{clip_block, BlockStats};
use crate::config::ClipConfig;
use crate::prefilter;
use crate::prelude::*;
use crate::progress::ProgressMonitor;
use crate::read::DatasetReader;
use crate::write::{write_legacy_vtk, CaseWriter, FieldSpec, WriteMode};
use crate::Error;

use rayon::prelude::*;

use std::io::BufWriter;
use std::time::{Duration, Instant};

/// one clip-and-export run: read the case, clip every block, write the
/// result set
pub trait ClipEngine {
    fn run(
        &self,
        case_path: &Path,
        config: &ClipConfig,
        out_dir: &Path,
        basename: &str,
    ) -> Result<ClipSummary, Error>;
}

/// what a run did, including the per-block anomalies that do not abort it
#[derive(Debug, Clone, Default)]
pub struct ClipSummary {
    pub blocks_in: usize,
    pub blocks_out: usize,
    /// blocks discarded by the bounds prefilter
    pub blocks_prefiltered: usize,
    /// blocks that survived prefiltering but kept no cells
    pub empty_blocks: Vec<usize>,
    pub points_in: usize,
    pub points_out: usize,
    pub cells_in: usize,
    pub cells_out: usize,
    pub crossing_cells: usize,
    /// fraction of the region's bounding box covered by the mesh bounds
    pub region_overlap: Option<f32>,
    pub elapsed: Duration,
}

impl ClipSummary {
    /// the region excluded the entire dataset. The output is still a valid
    /// (empty) case; whether that is a failure is the caller's call
    pub fn is_empty(&self) -> bool {
        self.blocks_out == 0
    }

    fn absorb(&mut self, stats: &BlockStats) {
        self.crossing_cells += stats.crossing_cells;
        if stats.cells_out > 0 {
            self.blocks_out += 1;
            self.points_out += stats.points_out;
            self.cells_out += stats.cells_out;
        } else {
            self.empty_blocks.push(stats.block_id);
        }
    }
}

/// in-process, block-at-a-time engine
pub struct SequentialEngine;

impl ClipEngine for SequentialEngine {
    fn run(
        &self,
        case_path: &Path,
        config: &ClipConfig,
        out_dir: &Path,
        basename: &str,
    ) -> Result<ClipSummary, Error> {
        let region = config.region()?;
        region.validate()?;

        let reader = DatasetReader::open(case_path)?;
        let specs = FieldSpec::from_variables(&reader.case().variables);

        if config.ascii {
            run_sequential::<Ascii>(&reader, &region, config, out_dir, basename, specs)
        } else {
            run_sequential::<Binary>(&reader, &region, config, out_dir, basename, specs)
        }
    }
}

fn run_sequential<F: Format>(
    reader: &DatasetReader,
    region: &ClipRegion,
    config: &ClipConfig,
    out_dir: &Path,
    basename: &str,
    specs: Vec<FieldSpec>,
) -> Result<ClipSummary, Error> {
    let started = Instant::now();
    let mode = config.mode();

    let mut writer = CaseWriter::<F>::create(out_dir, basename, specs, config.write_mode())?;
    let mut summary = ClipSummary::default();
    let mut mesh_bounds: Option<crate::mesh::Bounds> = None;
    let mut monitor = ProgressMonitor::new(None);
    let mut secondary = Vec::new();

    for data in reader.blocks()? {
        let data = data?;
        let block_id = data.block.id;

        summary.blocks_in += 1;
        summary.points_in += data.block.point_count();
        summary.cells_in += data.block.cell_count();
        mesh_bounds = match (mesh_bounds, data.block.bounds()) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };

        if config.use_prefilter && !prefilter::retain_block(&data.block, region) {
            summary.blocks_prefiltered += 1;
            monitor.block_completed(block_id);
            continue;
        }

        let outcome = clip_block(&data, region, mode);
        summary.absorb(&outcome.stats);

        if let Some(clipped) = outcome.data {
            if config.export_secondary_format {
                secondary.push(clipped.clone());
            }
            writer.write_block(clipped)?;
        }

        // the input block and its outcome drop here, before the next block
        // is read
        monitor.block_completed(block_id);
    }

    writer.finish()?;
    write_secondary(config, out_dir, basename, &secondary)?;

    summary.region_overlap = region
        .bounding_box()
        .zip(mesh_bounds)
        .map(|(region_box, mesh)| region_box.overlap_fraction(&mesh));
    summary.elapsed = started.elapsed();
    monitor.finish();

    if summary.is_empty() {
        tracing::warn!("the clip region excludes the entire dataset");
    }

    Ok(summary)
}

/// per-block result produced inside a shard worker
enum BlockResult {
    Prefiltered,
    Clipped(BlockStats, Option<BlockData>),
}

/// engine that shards blocks over a thread pool.
///
/// Workers share no mutable state: each owns its subset of blocks and
/// returns its results; the only synchronization point is the merge, which
/// sorts by block index and is therefore idempotent and independent of
/// completion order.
pub struct ShardedEngine {
    pub workers: usize,
}

impl ShardedEngine {
    pub fn new(workers: usize) -> Self {
        ShardedEngine {
            workers: workers.max(1),
        }
    }
}

impl ClipEngine for ShardedEngine {
    fn run(
        &self,
        case_path: &Path,
        config: &ClipConfig,
        out_dir: &Path,
        basename: &str,
    ) -> Result<ClipSummary, Error> {
        let region = config.region()?;
        region.validate()?;

        let reader = DatasetReader::open(case_path)?;
        let specs = FieldSpec::from_variables(&reader.case().variables);

        if config.ascii {
            self.run_sharded::<Ascii>(&reader, &region, config, out_dir, basename, specs)
        } else {
            self.run_sharded::<Binary>(&reader, &region, config, out_dir, basename, specs)
        }
    }
}

impl ShardedEngine {
    fn run_sharded<F: Format>(
        &self,
        reader: &DatasetReader,
        region: &ClipRegion,
        config: &ClipConfig,
        out_dir: &Path,
        basename: &str,
        specs: Vec<FieldSpec>,
    ) -> Result<ClipSummary, Error> {
        let started = Instant::now();
        let mode = config.mode();
        let use_prefilter = config.use_prefilter;

        let mut summary = ClipSummary::default();
        let mut mesh_bounds: Option<crate::mesh::Bounds> = None;

        // the sharded engine trades the streaming memory bound for
        // wall-clock time, so the whole dataset is read up front
        let mut blocks = Vec::new();
        for data in reader.blocks()? {
            let data = data?;
            summary.blocks_in += 1;
            summary.points_in += data.block.point_count();
            summary.cells_in += data.block.cell_count();
            mesh_bounds = match (mesh_bounds, data.block.bounds()) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                (a, b) => a.or(b),
            };
            blocks.push(data);
        }

        // disjoint shards, round robin by block index
        let workers = self.workers.max(1);
        let mut shards: Vec<Vec<(usize, BlockData)>> = (0..workers).map(|_| Vec::new()).collect();
        for (index, data) in blocks.into_iter().enumerate() {
            shards[index % workers].push((index, data));
        }

        let mut results: Vec<(usize, BlockResult)> = shards
            .into_par_iter()
            .flat_map_iter(|shard| {
                shard.into_iter().map(|(index, data)| {
                    if use_prefilter && !prefilter::retain_block(&data.block, region) {
                        return (index, BlockResult::Prefiltered);
                    }
                    let outcome = clip_block(&data, region, mode);
                    (index, BlockResult::Clipped(outcome.stats, outcome.data))
                })
            })
            .collect();

        // the merge: block-index order, duplicates collapsed, so the result
        // is the same no matter how the workers interleaved
        results.sort_by_key(|(index, _)| *index);
        results.dedup_by_key(|(index, _)| *index);

        let mut writer = CaseWriter::<F>::create(out_dir, basename, specs, WriteMode::Buffered)?;
        let mut monitor = ProgressMonitor::new(Some(results.len()));
        let mut secondary = Vec::new();

        for (_, result) in results {
            match result {
                BlockResult::Prefiltered => summary.blocks_prefiltered += 1,
                BlockResult::Clipped(stats, data) => {
                    summary.absorb(&stats);
                    if let Some(clipped) = data {
                        if config.export_secondary_format {
                            secondary.push(clipped.clone());
                        }
                        monitor.block_completed(clipped.block.id);
                        writer.write_block(clipped)?;
                        continue;
                    }
                    monitor.block_completed(stats.block_id);
                }
            }
        }

        writer.finish()?;
        write_secondary(config, out_dir, basename, &secondary)?;

        summary.region_overlap = region
            .bounding_box()
            .zip(mesh_bounds)
            .map(|(region_box, mesh)| region_box.overlap_fraction(&mesh));
        summary.elapsed = started.elapsed();
        monitor.finish();

        Ok(summary)
    }
}

fn write_secondary(
    config: &ClipConfig,
    out_dir: &Path,
    basename: &str,
    blocks: &[BlockData],
) -> Result<(), Error> {
    if !config.export_secondary_format {
        return Ok(());
    }

    let path = out_dir.join(format!("{basename}.vtk"));
    let file = std::fs::File::create(&path)?;
    write_legacy_vtk(BufWriter::new(file), blocks)?;
    Ok(())
}
