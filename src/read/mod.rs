//! reading EnSight Gold file sets
//!
//! The reader is a cursor: [`BlockCursor`] hands back one part at a time
//! with its variables attached, which is what the streaming path iterates.
//! [`DatasetReader::load`] collects the cursor when the whole dataset is
//! wanted up front.
//!
//! Both the ASCII and the C Binary (big endian) encodings are handled; the
//! encoding is sniffed from the leading `C Binary` record the way EnSight
//! itself does it.

mod error;
mod geometry;
mod variable;

pub use error::{
    BadHeader, BadNumber, ConnectivityOutOfRange, GeometryError, InputNotFound, PartMismatch,
    ReadError, UnexpectedEnd, UnknownElement, VariableError,
};

use crate::case::{CaseFile, VariableDecl};
use crate::prelude::*;

use geometry::GeometryReader;
use variable::VariableReader;

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};

/// reads one EnSight Gold case: manifest, geometry, and every declared
/// variable
#[derive(Debug)]
pub struct DatasetReader {
    case: CaseFile,
}

impl DatasetReader {
    /// Parse the manifest at `path` and verify that every referenced file
    /// exists. No data files are opened yet.
    pub fn open(path: &Path) -> Result<DatasetReader, ReadError> {
        if !path.is_file() {
            return Err(InputNotFound::new(path.to_path_buf()).into());
        }

        let content = std::fs::read_to_string(path)?;
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let case = CaseFile::parse_str(&content, directory)?;

        if !case.geometry.is_file() {
            return Err(InputNotFound::new(case.geometry.clone()).into());
        }
        for decl in &case.variables {
            if !decl.path.is_file() {
                return Err(InputNotFound::new(decl.path.clone()).into());
            }
        }

        Ok(DatasetReader { case })
    }

    pub fn case(&self) -> &CaseFile {
        &self.case
    }

    /// a cursor producing one part at a time, for the streaming path
    pub fn blocks(&self) -> Result<BlockCursor, ReadError> {
        let geo = GeometryReader::open(&self.case.geometry)?;

        let mut vars = Vec::with_capacity(self.case.variables.len());
        for decl in &self.case.variables {
            vars.push((decl.clone(), VariableReader::open(decl)?));
        }

        Ok(BlockCursor { geo, vars })
    }

    /// read the whole dataset up front
    pub fn load(&self) -> Result<Dataset, ReadError> {
        let mut blocks = Vec::new();
        for block in self.blocks()? {
            blocks.push(block?);
        }
        Ok(Dataset { blocks })
    }
}

/// block-at-a-time iterator over a case. Geometry and every variable file
/// advance in lockstep, one part per step
pub struct BlockCursor {
    geo: GeometryReader,
    vars: Vec<(VariableDecl, VariableReader)>,
}

impl BlockCursor {
    fn next_block(&mut self) -> Result<Option<BlockData>, ReadError> {
        let block = match self.geo.next_part()? {
            Some(block) => block,
            None => return Ok(None),
        };

        let mut fields = Vec::with_capacity(self.vars.len());
        for (decl, reader) in &mut self.vars {
            fields.push(reader.next_part(decl, &block)?);
        }

        Ok(Some(BlockData { block, fields }))
    }
}

impl Iterator for BlockCursor {
    type Item = Result<BlockData, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

/// an EnSight binary file leads with a `C Binary` record; anything else is
/// ascii
pub(crate) fn is_c_binary(path: &Path) -> std::io::Result<bool> {
    let file = File::open(path)?;
    let mut probe = Vec::with_capacity(8);
    file.take(8).read_to_end(&mut probe)?;
    Ok(probe.starts_with(b"C Binary"))
}

/// line/token scanner over an ascii EnSight file.
///
/// Keyword lines (`part`, `coordinates`, element labels) are consumed as
/// whole lines; numeric payloads are consumed as whitespace tokens so that
/// both one-value-per-line and wrapped layouts parse.
pub(crate) struct AsciiSource {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    peeked: Option<String>,
    tokens: VecDeque<String>,
}

impl AsciiSource {
    pub(crate) fn open(path: &Path) -> std::io::Result<AsciiSource> {
        let file = File::open(path)?;
        Ok(AsciiSource {
            path: path.to_path_buf(),
            lines: std::io::BufRead::lines(BufReader::new(file)),
            peeked: None,
            tokens: VecDeque::new(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// next non-blank line, trimmed
    pub(crate) fn next_line(&mut self) -> std::io::Result<Option<String>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        for line in self.lines.by_ref() {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
        Ok(None)
    }

    pub(crate) fn peek_line(&mut self) -> std::io::Result<Option<&str>> {
        if self.peeked.is_none() {
            self.peeked = self.next_line()?;
        }
        Ok(self.peeked.as_deref())
    }

    /// a line that must exist, with `what` naming it for the error
    pub(crate) fn expect_line<E>(&mut self, what: &'static str) -> Result<String, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => Err(UnexpectedEnd::new(what, self.path.clone()).into()),
        }
    }

    /// a line that must equal `keyword`
    pub(crate) fn expect_keyword<E>(&mut self, keyword: &'static str) -> Result<(), E>
    where
        E: From<UnexpectedEnd> + From<BadHeader> + From<std::io::Error>,
    {
        let line = self.expect_line::<E>(keyword)?;
        if line == keyword {
            Ok(())
        } else {
            Err(BadHeader::new(keyword.to_string(), line, self.path.clone()).into())
        }
    }

    fn next_token<E>(&mut self, what: &'static str) -> Result<String, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        while self.tokens.is_empty() {
            match self.next_line()? {
                Some(line) => {
                    self.tokens
                        .extend(line.split_whitespace().map(str::to_string));
                }
                None => return Err(UnexpectedEnd::new(what, self.path.clone()).into()),
            }
        }
        Ok(self.tokens.pop_front().unwrap())
    }

    pub(crate) fn read_f32s<E>(&mut self, n: usize, what: &'static str) -> Result<Vec<f32>, E>
    where
        E: From<UnexpectedEnd> + From<BadNumber> + From<std::io::Error>,
    {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let token = self.next_token::<E>(what)?;
            let value = token
                .parse::<f32>()
                .map_err(|_| BadNumber::new(what, token))?;
            out.push(value);
        }
        Ok(out)
    }

    pub(crate) fn read_i32s<E>(&mut self, n: usize, what: &'static str) -> Result<Vec<i32>, E>
    where
        E: From<UnexpectedEnd> + From<BadNumber> + From<std::io::Error>,
    {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let token = self.next_token::<E>(what)?;
            let value = token
                .parse::<i32>()
                .map_err(|_| BadNumber::new(what, token))?;
            out.push(value);
        }
        Ok(out)
    }

    pub(crate) fn read_usize<E>(&mut self, what: &'static str) -> Result<usize, E>
    where
        E: From<UnexpectedEnd> + From<BadNumber> + From<std::io::Error>,
    {
        let line = match self.next_line()? {
            Some(line) => line,
            None => return Err(UnexpectedEnd::new(what, self.path.clone()).into()),
        };
        line.trim()
            .parse::<usize>()
            .map_err(|_| BadNumber::new(what, line).into())
    }

    /// numeric payloads must end exactly where the next keyword begins
    pub(crate) fn expect_drained<E>(&mut self, what: &'static str) -> Result<(), E>
    where
        E: From<BadNumber>,
    {
        if let Some(stray) = self.tokens.pop_front() {
            Err(BadNumber::new(what, stray).into())
        } else {
            Ok(())
        }
    }
}

/// record/value reader over a C Binary EnSight file: 80-byte character
/// records and big endian i32 / f32 payloads
pub(crate) struct BinarySource {
    path: PathBuf,
    reader: BufReader<File>,
    peeked: Option<String>,
}

impl BinarySource {
    pub(crate) fn open(path: &Path) -> std::io::Result<BinarySource> {
        let file = File::open(path)?;
        Ok(BinarySource {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            peeked: None,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// next 80-byte character record, trailing padding removed. `None` at a
    /// clean end of file; a short record is an error
    pub(crate) fn next_record<E>(&mut self, what: &'static str) -> Result<Option<String>, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }

        let mut buffer = [0u8; 80];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = self.reader.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        match filled {
            0 => Ok(None),
            80 => {
                let text = String::from_utf8_lossy(&buffer);
                Ok(Some(text.trim_end_matches(['\0', ' ']).to_string()))
            }
            _ => Err(UnexpectedEnd::new(what, self.path.clone()).into()),
        }
    }

    pub(crate) fn peek_record<E>(&mut self, what: &'static str) -> Result<Option<&str>, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        if self.peeked.is_none() {
            self.peeked = self.next_record::<E>(what)?;
        }
        Ok(self.peeked.as_deref())
    }

    pub(crate) fn expect_record<E>(&mut self, what: &'static str) -> Result<String, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        match self.next_record::<E>(what)? {
            Some(record) => Ok(record),
            None => Err(UnexpectedEnd::new(what, self.path.clone()).into()),
        }
    }

    pub(crate) fn expect_keyword<E>(&mut self, keyword: &'static str) -> Result<(), E>
    where
        E: From<UnexpectedEnd> + From<BadHeader> + From<std::io::Error>,
    {
        let record = self.expect_record::<E>(keyword)?;
        if record == keyword {
            Ok(())
        } else {
            Err(BadHeader::new(keyword.to_string(), record, self.path.clone()).into())
        }
    }

    fn fill<E>(&mut self, buffer: &mut [u8], what: &'static str) -> Result<(), E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        let mut filled = 0;
        while filled < buffer.len() {
            let n = self.reader.read(&mut buffer[filled..])?;
            if n == 0 {
                return Err(UnexpectedEnd::new(what, self.path.clone()).into());
            }
            filled += n;
        }
        Ok(())
    }

    pub(crate) fn read_i32<E>(&mut self, what: &'static str) -> Result<i32, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        let mut buffer = [0u8; 4];
        self.fill::<E>(&mut buffer, what)?;
        Ok(i32::from_be_bytes(buffer))
    }

    pub(crate) fn read_f32s<E>(&mut self, n: usize, what: &'static str) -> Result<Vec<f32>, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        let mut bytes = vec![0u8; 4 * n];
        self.fill::<E>(&mut bytes, what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    pub(crate) fn read_i32s<E>(&mut self, n: usize, what: &'static str) -> Result<Vec<i32>, E>
    where
        E: From<UnexpectedEnd> + From<std::io::Error>,
    {
        let mut bytes = vec![0u8; 4 * n];
        self.fill::<E>(&mut bytes, what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}
