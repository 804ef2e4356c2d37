//! part-at-a-time readers for EnSight Gold variable files
//!
//! Variable files do not repeat entity counts; those come from the geometry
//! part read just before, which is why `next_part` takes the [`Block`].

use crate::case::VariableDecl;
use crate::prelude::*;

use super::error::{PartMismatch, VariableError};
use super::{is_c_binary, AsciiSource, BinarySource};

use ndarray::Array2;

pub(crate) enum VariableReader {
    Ascii(AsciiSource),
    Binary(BinarySource),
}

impl VariableReader {
    pub(crate) fn open(decl: &VariableDecl) -> Result<VariableReader, VariableError> {
        if is_c_binary(&decl.path)? {
            let mut source = BinarySource::open(&decl.path)?;
            source.expect_keyword::<VariableError>("C Binary")?;
            Ok(VariableReader::Binary(source))
        } else {
            let mut source = AsciiSource::open(&decl.path)?;
            // free-form description line
            source.expect_line::<VariableError>("the description header")?;
            Ok(VariableReader::Ascii(source))
        }
    }

    pub(crate) fn next_part(
        &mut self,
        decl: &VariableDecl,
        block: &Block,
    ) -> Result<Field, VariableError> {
        let values = match self {
            VariableReader::Ascii(source) => next_part_ascii(source, decl, block)?,
            VariableReader::Binary(source) => next_part_binary(source, decl, block)?,
        };

        Ok(Field::new(&decl.name, decl.association, values))
    }
}

/// component-major values (all of component 0, then 1, then 2) rearranged
/// into one row per entity
fn into_rows(buffer: Vec<f32>, entities: usize, components: usize) -> Array2<f32> {
    let mut values = Array2::zeros((entities, components));
    for c in 0..components {
        for i in 0..entities {
            values[[i, c]] = buffer[c * entities + i];
        }
    }
    values
}

fn next_part_ascii(
    source: &mut AsciiSource,
    decl: &VariableDecl,
    block: &Block,
) -> Result<Array2<f32>, VariableError> {
    source.expect_keyword::<VariableError>("part")?;
    let part = source.read_usize::<VariableError>("the part number")?;
    if part != block.id {
        return Err(PartMismatch::new(decl.name.clone(), block.id, part).into());
    }

    match decl.association {
        Association::Node => {
            source.expect_keyword::<VariableError>("coordinates")?;
            let n = block.point_count();
            let buffer =
                source.read_f32s::<VariableError>(n * decl.components, "variable values")?;
            source.expect_drained::<VariableError>("variable values")?;
            Ok(into_rows(buffer, n, decl.components))
        }
        Association::Element => {
            let mut values = Array2::zeros((block.cell_count(), decl.components));

            for (kind, range) in block.element_runs() {
                let label = source.expect_line::<VariableError>("an element section")?;
                if label != kind.label() {
                    return Err(super::BadHeader::new(
                        kind.label().to_string(),
                        label,
                        source.path().to_path_buf(),
                    )
                    .into());
                }

                let count = range.len();
                let buffer =
                    source.read_f32s::<VariableError>(count * decl.components, "variable values")?;
                source.expect_drained::<VariableError>("variable values")?;

                let section = into_rows(buffer, count, decl.components);
                for (offset, cell) in range.enumerate() {
                    for c in 0..decl.components {
                        values[[cell, c]] = section[[offset, c]];
                    }
                }
            }

            Ok(values)
        }
    }
}

fn next_part_binary(
    source: &mut BinarySource,
    decl: &VariableDecl,
    block: &Block,
) -> Result<Array2<f32>, VariableError> {
    source.expect_keyword::<VariableError>("part")?;
    let part = source.read_i32::<VariableError>("the part number")? as usize;
    if part != block.id {
        return Err(PartMismatch::new(decl.name.clone(), block.id, part).into());
    }

    match decl.association {
        Association::Node => {
            source.expect_keyword::<VariableError>("coordinates")?;
            let n = block.point_count();
            let buffer =
                source.read_f32s::<VariableError>(n * decl.components, "variable values")?;
            Ok(into_rows(buffer, n, decl.components))
        }
        Association::Element => {
            let mut values = Array2::zeros((block.cell_count(), decl.components));

            for (kind, range) in block.element_runs() {
                source.expect_keyword_label(kind.label())?;

                let count = range.len();
                let buffer =
                    source.read_f32s::<VariableError>(count * decl.components, "variable values")?;

                let section = into_rows(buffer, count, decl.components);
                for (offset, cell) in range.enumerate() {
                    for c in 0..decl.components {
                        values[[cell, c]] = section[[offset, c]];
                    }
                }
            }

            Ok(values)
        }
    }
}

impl BinarySource {
    /// element labels are not `'static`, so the keyword check is done here
    fn expect_keyword_label(&mut self, label: &str) -> Result<(), VariableError> {
        let record = self.expect_record::<VariableError>("an element section")?;
        if record == label {
            Ok(())
        } else {
            Err(super::BadHeader::new(
                label.to_string(),
                record,
                self.path().to_path_buf(),
            )
            .into())
        }
    }
}
