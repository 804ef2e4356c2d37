#![doc = include_str!("../README.md")]

pub mod case;
pub mod clip;
pub mod config;
pub mod engine;
pub mod field;
pub mod mesh;
pub mod prefilter;
pub mod prelude;
pub mod progress;
pub mod read;
pub mod region;
pub mod write;

pub use case::{CaseFile, VariableDecl};
pub use clip::{clip_block, ClipMode, ClipOutcome};
pub use config::ClipConfig;
pub use engine::{ClipEngine, ClipSummary, SequentialEngine, ShardedEngine};
pub use field::{Association, Field};
pub use mesh::{Block, BlockData, Bounds, Cell, Dataset, ElementKind};
pub use read::DatasetReader;
pub use region::{Classification, ClipRegion, InvalidRegion};
pub use write::{CaseWriter, Format};

pub use nalgebra;
pub use ndarray;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Error while reading the input case: {0}")]
    Read(#[from] read::ReadError),
    #[error("Error while writing the clipped case: {0}")]
    Write(#[from] write::WriteError),
    #[error("The clip region is invalid: {0}")]
    Region(#[from] region::InvalidRegion),
    #[error("Could not assemble a clip configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// C Binary (big endian) encoding marker type
#[derive(Debug, Clone, PartialEq)]
pub struct Binary;

/// ascii encoding marker type
#[derive(Debug, Clone, PartialEq)]
pub struct Ascii;
