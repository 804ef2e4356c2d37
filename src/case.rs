//! case manifest model and parser
//!
//! A case manifest is the small text file tying one dataset together: it
//! names the geometry file and declares every variable with its association
//! and component count. Manifests that this crate cannot faithfully process
//! are rejected with a specific error instead of being best-effort parsed;
//! silently ignoring a directive here means silently dropping data later.

use crate::prelude::*;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, space0, space1};
use nom::combinator::value;
use nom::IResult;

/// a parsed case manifest
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFile {
    /// directory the manifest lives in; referenced files resolve against it
    pub directory: PathBuf,
    /// path of the geometry (model) file
    pub geometry: PathBuf,
    /// declared variables, in manifest order
    pub variables: Vec<VariableDecl>,
}

/// one `VARIABLE` line of the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub association: Association,
    /// 1 for scalars, 3 for vectors
    pub components: usize,
    /// path of the variable file
    pub path: PathBuf,
}

/// the ways a case manifest can be unusable
#[derive(Debug, thiserror::Error, From)]
pub enum ManifestError {
    #[error("{0}")]
    MissingSection(MissingSection),
    #[error("{0}")]
    UnsupportedFormat(UnsupportedFormat),
    #[error("{0}")]
    UnsupportedSection(UnsupportedSection),
    #[error("{0}")]
    UnsupportedDirective(UnsupportedDirective),
    #[error("{0}")]
    QuotedFilename(QuotedFilename),
    #[error("{0}")]
    MalformedLine(MalformedLine),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "mandatory `{section}` section is missing from the manifest")]
pub struct MissingSection {
    section: &'static str,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "case type must be `ensight gold`, got `{found}`")]
pub struct UnsupportedFormat {
    found: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "unsupported `{section}` section on line {line}")]
pub struct UnsupportedSection {
    section: String,
    line: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "unsupported directive `{directive}` on line {line}")]
pub struct UnsupportedDirective {
    directive: String,
    line: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(
    fmt = "quoted filename {filename} on line {line}: EnSight readers do not unquote paths, remove the quotes"
)]
pub struct QuotedFilename {
    filename: String,
    line: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "could not parse manifest line {line}: `{content}`")]
pub struct MalformedLine {
    content: String,
    line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Format,
    Geometry,
    Variable,
    Time,
}

impl CaseFile {
    /// Parse a manifest from its text. `directory` is the location of the
    /// manifest file; referenced paths are resolved against it.
    pub fn parse_str(content: &str, directory: &Path) -> Result<CaseFile, ManifestError> {
        let mut section = Section::None;

        let mut saw_format = false;
        let mut saw_variable_section = false;
        let mut format_ok = false;
        let mut geometry: Option<PathBuf> = None;
        let mut variables = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = section_header(line) {
                section = match header {
                    "FORMAT" => {
                        saw_format = true;
                        Section::Format
                    }
                    "GEOMETRY" => Section::Geometry,
                    "VARIABLE" => {
                        saw_variable_section = true;
                        Section::Variable
                    }
                    "TIME" => Section::Time,
                    // MATERIAL, SCRIPTS, BLOCK_CONTINUED and friends carry
                    // information we cannot carry through a clip
                    other => {
                        return Err(UnsupportedSection::new(other.to_string(), line_no).into())
                    }
                };
                continue;
            }

            match section {
                Section::None => {
                    return Err(MalformedLine::new(line.to_string(), line_no).into());
                }
                Section::Format => {
                    if let Some(kind) = line.strip_prefix("type:") {
                        let kind = kind.trim();
                        if kind == "ensight gold" {
                            format_ok = true;
                        } else {
                            return Err(UnsupportedFormat::new(kind.to_string()).into());
                        }
                    } else {
                        return Err(MalformedLine::new(line.to_string(), line_no).into());
                    }
                }
                Section::Geometry => {
                    if let Some(rest) = line.strip_prefix("model:") {
                        let file = filename_from(rest, line_no)?;
                        geometry = Some(directory.join(file));
                    } else {
                        // `measured:`, `match:`, `boundary:` reference extra
                        // geometry this crate does not clip
                        return Err(
                            UnsupportedDirective::new(line.to_string(), line_no).into()
                        );
                    }
                }
                Section::Variable => {
                    let decl = variable_line(line, line_no, directory)?;
                    variables.push(decl);
                }
                Section::Time => {
                    check_time_line(line, line_no)?;
                }
            }
        }

        if !saw_format || !format_ok {
            return Err(MissingSection::new("FORMAT").into());
        }
        let geometry = match geometry {
            Some(geometry) => geometry,
            None => return Err(MissingSection::new("GEOMETRY").into()),
        };
        if !saw_variable_section {
            return Err(MissingSection::new("VARIABLE").into());
        }

        Ok(CaseFile {
            directory: directory.to_path_buf(),
            geometry,
            variables,
        })
    }
}

/// section headers are a single all-caps word on their own line
fn section_header(line: &str) -> Option<&str> {
    let is_header = !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_');
    is_header.then_some(line)
}

/// nom parser for the typed head of a variable line:
/// `scalar per node:` / `vector per element:` and so on
fn variable_kind(input: &str) -> IResult<&str, (usize, Association)> {
    let (input, components) = alt((value(1usize, tag("scalar")), value(3usize, tag("vector"))))(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("per")(input)?;
    let (input, _) = space1(input)?;
    let (input, association) = alt((
        value(Association::Node, tag("node")),
        value(Association::Element, tag("element")),
    ))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char(':')(input)?;
    Ok((input, (components, association)))
}

fn variable_line(
    line: &str,
    line_no: usize,
    directory: &Path,
) -> Result<VariableDecl, ManifestError> {
    // anything that is not a plain scalar/vector per node/element is a
    // directive we cannot carry: tensors, complex variables, measured data,
    // per-case constants
    let (rest, (components, association)) = variable_kind(line)
        .map_err(|_| UnsupportedDirective::new(line.to_string(), line_no))?;

    let mut tokens = rest.split_whitespace().peekable();

    // optional time set / file set references come first
    while matches!(tokens.peek(), Some(t) if t.parse::<usize>().is_ok()) {
        tokens.next();
    }

    let name = tokens
        .next()
        .ok_or_else(|| MalformedLine::new(line.to_string(), line_no))?
        .to_string();
    let file = tokens.collect::<Vec<_>>().join(" ");
    if file.is_empty() {
        return Err(MalformedLine::new(line.to_string(), line_no).into());
    }

    reject_quotes(&name, line_no)?;
    let file = check_filename(&file, line_no)?;

    Ok(VariableDecl {
        name,
        association,
        components,
        path: directory.join(file),
    })
}

/// the filename tail of a `model:` line, skipping time/file set references
fn filename_from(rest: &str, line_no: usize) -> Result<String, ManifestError> {
    let mut tokens = rest.split_whitespace().peekable();

    while matches!(tokens.peek(), Some(t) if t.parse::<usize>().is_ok()) {
        tokens.next();
    }

    let file = tokens.collect::<Vec<_>>().join(" ");
    if file.is_empty() {
        return Err(MalformedLine::new(rest.trim().to_string(), line_no).into());
    }

    check_filename(&file, line_no)
}

fn check_filename(file: &str, line_no: usize) -> Result<String, ManifestError> {
    reject_quotes(file, line_no)?;
    Ok(file.to_string())
}

fn reject_quotes(token: &str, line_no: usize) -> Result<(), ManifestError> {
    if token.starts_with('"') || token.ends_with('"') {
        Err(QuotedFilename::new(token.to_string(), line_no).into())
    } else {
        Ok(())
    }
}

/// Only trivial single-step `TIME` sections pass; a transient case needs
/// every step clipped and this crate processes one.
fn check_time_line(line: &str, line_no: usize) -> Result<(), ManifestError> {
    if let Some(steps) = line.strip_prefix("number of steps:") {
        let steps = steps.trim();
        if steps != "1" {
            return Err(UnsupportedDirective::new(line.to_string(), line_no).into());
        }
        return Ok(());
    }

    const KNOWN: &[&str] = &[
        "time set:",
        "filename start number:",
        "filename increment:",
        "time values:",
    ];
    let known = KNOWN.iter().any(|prefix| line.starts_with(prefix))
        || line.split_whitespace().all(|t| t.parse::<f64>().is_ok());

    if known {
        Ok(())
    } else {
        Err(MalformedLine::new(line.to_string(), line_no).into())
    }
}
