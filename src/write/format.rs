//! the two EnSight Gold encodings behind one trait
//!
//! [`Ascii`] and [`Binary`](crate::Binary) are zero-sized markers selecting
//! the encoding at the type level; everything the writer emits goes through
//! the four primitives here. ASCII uses the fixed `e12.5` / `i10` column
//! layout; C Binary uses 80-byte character records and big endian values.

use crate::{Ascii, Binary};

use num_traits::ToBytes;
use std::io::Write;

/// encoding seam for the case writer
pub trait Format {
    fn is_binary() -> bool;

    /// readers sniff the encoding from the first bytes of a file, so
    /// binary files must lead with this record; ascii files have none
    fn leading_record() -> Option<&'static str>;

    /// a keyword or description line
    fn write_line<W: Write>(writer: &mut W, text: &str) -> std::io::Result<()>;

    /// a part number or entity count
    fn write_int<W: Write>(writer: &mut W, value: i32) -> std::io::Result<()>;

    /// a stream of coordinate / variable values
    fn write_f32s<W: Write>(
        writer: &mut W,
        values: impl Iterator<Item = f32>,
    ) -> std::io::Result<()>;

    /// one cell's connectivity ids
    fn write_connectivity<W: Write>(
        writer: &mut W,
        nodes: impl Iterator<Item = i32>,
    ) -> std::io::Result<()>;
}

impl Format for Ascii {
    fn is_binary() -> bool {
        false
    }

    fn leading_record() -> Option<&'static str> {
        None
    }

    fn write_line<W: Write>(writer: &mut W, text: &str) -> std::io::Result<()> {
        writeln!(writer, "{text}")
    }

    fn write_int<W: Write>(writer: &mut W, value: i32) -> std::io::Result<()> {
        writeln!(writer, "{value:>10}")
    }

    fn write_f32s<W: Write>(
        writer: &mut W,
        values: impl Iterator<Item = f32>,
    ) -> std::io::Result<()> {
        for value in values {
            writeln!(writer, "{value:>12.5e}")?;
        }
        Ok(())
    }

    fn write_connectivity<W: Write>(
        writer: &mut W,
        nodes: impl Iterator<Item = i32>,
    ) -> std::io::Result<()> {
        for id in nodes {
            write!(writer, "{id:>10}")?;
        }
        writeln!(writer)
    }
}

/// a value in big endian byte order
fn write_be<W: Write, T: ToBytes>(writer: &mut W, value: T) -> std::io::Result<()> {
    writer.write_all(value.to_be_bytes().as_ref())
}

impl Format for Binary {
    fn is_binary() -> bool {
        true
    }

    fn leading_record() -> Option<&'static str> {
        Some("C Binary")
    }

    fn write_line<W: Write>(writer: &mut W, text: &str) -> std::io::Result<()> {
        let mut record = [b' '; 80];
        let bytes = text.as_bytes();
        let n = bytes.len().min(80);
        record[..n].copy_from_slice(&bytes[..n]);
        writer.write_all(&record)
    }

    fn write_int<W: Write>(writer: &mut W, value: i32) -> std::io::Result<()> {
        write_be(writer, value)
    }

    fn write_f32s<W: Write>(
        writer: &mut W,
        values: impl Iterator<Item = f32>,
    ) -> std::io::Result<()> {
        for value in values {
            write_be(writer, value)?;
        }
        Ok(())
    }

    fn write_connectivity<W: Write>(
        writer: &mut W,
        nodes: impl Iterator<Item = i32>,
    ) -> std::io::Result<()> {
        for id in nodes {
            write_be(writer, id)?;
        }
        Ok(())
    }
}
