//! named per-node / per-element data attached to a part

use crate::prelude::*;

/// whether a variable's values live on points or on cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    Node,
    Element,
}

impl Association {
    /// the wording used in case manifests (`scalar per node: ...`)
    pub fn manifest_label(&self) -> &'static str {
        match self {
            Association::Node => "node",
            Association::Element => "element",
        }
    }

    /// the filename infix used for output variable files
    pub fn file_infix(&self) -> &'static str {
        match self {
            Association::Node => "_n.",
            Association::Element => "_e.",
        }
    }
}

/// one variable on one part.
///
/// `values` has one row per entity (point or cell, matching `association`)
/// and one column per component: 1 for scalars, 3 for vectors. Rows are in
/// the same order as the owning block's points/cells and are never reordered
/// independently of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub association: Association,
    pub values: Array2<f32>,
}

impl Field {
    pub fn new(name: &str, association: Association, values: Array2<f32>) -> Self {
        Self {
            name: name.to_string(),
            association,
            values,
        }
    }

    /// a per-node scalar from a flat value list
    pub fn scalar_per_node(name: &str, data: Vec<f32>) -> Self {
        let n = data.len();
        Self::new(
            name,
            Association::Node,
            Array2::from_shape_vec((n, 1), data).unwrap(),
        )
    }

    /// a per-node vector from component-interleaved values
    /// `[x0, y0, z0, x1, y1, z1, ...]`
    pub fn vector_per_node(name: &str, data: Vec<f32>) -> Self {
        assert_eq!(data.len() % 3, 0, "vector data must have 3*n entries");
        let n = data.len() / 3;
        Self::new(
            name,
            Association::Node,
            Array2::from_shape_vec((n, 3), data).unwrap(),
        )
    }

    pub fn scalar_per_element(name: &str, data: Vec<f32>) -> Self {
        let n = data.len();
        Self::new(
            name,
            Association::Element,
            Array2::from_shape_vec((n, 1), data).unwrap(),
        )
    }

    pub fn entity_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn components(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_vector(&self) -> bool {
        self.components() == 3
    }
}

/// Guess SI units for common CFD variable names.
///
/// Returns `(ENS_UNITS_LABEL, ENS_UNITS_DIMS)` for the metadata side-file;
/// unknown variables get empty tags. The names matched here are the usual
/// solver export names (pressure, velocity, turbulence quantities, ...).
pub fn units_for(name: &str) -> (&'static str, &'static str) {
    let lower = name.to_ascii_lowercase();

    if lower.contains("pressure") {
        ("Pa", "M/LTT")
    } else if lower.contains("velocity") {
        ("m s^-1", "L/T")
    } else if lower.contains("turb_kinetic_energy") {
        ("m^2 s^-2", "LL/TT")
    } else if lower.contains("turb_diss") {
        ("m^2 s^-3", "LL/TTT")
    } else if lower.contains("temperature") {
        ("K", "Θ")
    } else if lower.contains("density") {
        ("kg m^-3", "M/LLL")
    } else {
        ("", "")
    }
}
