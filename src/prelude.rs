//! Common traits and types that are useful for working with `enclip`
#![allow(unused_imports)]

pub use crate::field::{Association, Field};
pub use crate::mesh::{Block, BlockData, Bounds, Cell, Dataset, ElementKind};
pub use crate::region::{Classification, ClipRegion};
pub use crate::write::Format;

pub(crate) use crate::{Ascii, Binary};
pub(crate) use crate::Error;

pub(crate) use derive_more::{Constructor, Display, From};
pub(crate) use nalgebra::{Point3, Vector3};
pub(crate) use ndarray::Array2;
pub(crate) use smallvec::SmallVec;

pub(crate) use std::io::{BufRead, Write};
pub(crate) use std::path::{Path, PathBuf};
