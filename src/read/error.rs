use crate::prelude::*;

/// any failure while opening or reading the input file set
#[derive(Debug, thiserror::Error, From)]
pub enum ReadError {
    #[error("{0}")]
    InputNotFound(InputNotFound),
    #[error("malformed case manifest: {0}")]
    MalformedManifest(crate::case::ManifestError),
    #[error("error reading geometry: {0}")]
    Geometry(GeometryError),
    #[error("error reading a variable file: {0}")]
    Variable(VariableError),
    #[error("An io error occured: `{0}`")]
    Io(std::io::Error),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "input file not found: `{path:?}`")]
pub struct InputNotFound {
    pub(crate) path: PathBuf,
}

/// failures while reading the geometry (model) file
#[derive(Debug, thiserror::Error, From)]
pub enum GeometryError {
    #[error("{0}")]
    UnexpectedEnd(UnexpectedEnd),
    #[error("{0}")]
    BadHeader(BadHeader),
    #[error("{0}")]
    UnknownElement(UnknownElement),
    #[error("{0}")]
    BadNumber(BadNumber),
    #[error("{0}")]
    ConnectivityOutOfRange(ConnectivityOutOfRange),
    #[error("An io error occured: `{0}`")]
    Io(std::io::Error),
}

/// failures while reading one variable file, with the variable name attached
#[derive(Debug, thiserror::Error, From)]
pub enum VariableError {
    #[error("{0}")]
    UnexpectedEnd(UnexpectedEnd),
    #[error("{0}")]
    BadHeader(BadHeader),
    #[error("{0}")]
    BadNumber(BadNumber),
    #[error("{0}")]
    PartMismatch(PartMismatch),
    #[error("An io error occured: `{0}`")]
    Io(std::io::Error),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "`{path:?}` ended while reading {what}")]
pub struct UnexpectedEnd {
    what: &'static str,
    path: PathBuf,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "expected `{expected}` in `{path:?}`, found `{found}`")]
pub struct BadHeader {
    expected: String,
    found: String,
    path: PathBuf,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "unknown element section `{label}` in part {part}")]
pub struct UnknownElement {
    label: String,
    part: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "could not parse {what}: `{content}`")]
pub struct BadNumber {
    what: &'static str,
    content: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(
    fmt = "cell {cell} of part {part} references point {id} but the part has {points} points"
)]
pub struct ConnectivityOutOfRange {
    part: usize,
    cell: usize,
    id: u32,
    points: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(
    fmt = "variable `{name}` lists part {found} where the geometry has part {expected}"
)]
pub struct PartMismatch {
    name: String,
    expected: usize,
    found: usize,
}
