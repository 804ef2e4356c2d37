//! the clip run configuration surface
//!
//! One flat struct covering the three region types plus the run flags,
//! deserializable from a TOML file. Only the parameters of the selected
//! region kind are required; the engines validate the assembled region
//! before touching any data.

use crate::clip::ClipMode;
use crate::mesh::Bounds;
use crate::prelude::*;
use crate::region::ClipRegion;
use crate::write::WriteMode;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Box,
    Plane,
    Sphere,
}

/// recognized clip options
///
/// ```toml
/// kind = "box"
/// bounds = [-5.0, 5.0, -5.0, 5.0, -5.0, 5.0]
/// crinkle = true
/// streaming = true
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClipConfig {
    pub kind: RegionKind,

    /// box: `[xmin, xmax, ymin, ymax, zmin, zmax]`
    pub bounds: Option<[f32; 6]>,

    /// plane: a point on the plane
    pub origin: Option<[f32; 3]>,
    /// plane: the kept side points along the normal
    pub normal: Option<[f32; 3]>,
    /// plane: keep the opposite side instead
    #[serde(default)]
    pub invert: bool,

    /// sphere
    pub center: Option<[f32; 3]>,
    /// sphere
    pub radius: Option<f32>,

    /// discard whole blocks by bounds overlap before exact classification
    #[serde(default = "default_true")]
    pub use_prefilter: bool,
    /// keep boundary cells whole instead of splitting them
    #[serde(default)]
    pub crinkle: bool,
    /// additionally dump the merged clip result as a legacy VTK grid
    #[serde(default)]
    pub export_secondary_format: bool,
    /// write each block as soon as it is clipped instead of buffering the
    /// whole result
    #[serde(default)]
    pub streaming: bool,
    /// emit ascii EnSight Gold instead of C Binary
    #[serde(default)]
    pub ascii: bool,
}

fn default_true() -> bool {
    true
}

/// configuration that cannot be turned into a clip run
#[derive(Debug, thiserror::Error, From)]
pub enum ConfigError {
    #[error("could not read the configuration file: {0}")]
    Io(std::io::Error),
    #[error("could not parse the configuration file: {0}")]
    Parse(toml::de::Error),
    #[error("{0}")]
    MissingParameter(MissingParameter),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "clip kind `{kind}` needs the `{parameter}` option")]
pub struct MissingParameter {
    kind: &'static str,
    parameter: &'static str,
}

impl ClipConfig {
    pub fn from_path(path: &Path) -> Result<ClipConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Assemble the region this configuration describes. The parameters are
    /// taken as given; run [`ClipRegion::validate`] before using it.
    pub fn region(&self) -> Result<ClipRegion, ConfigError> {
        let missing = |parameter| MissingParameter::new(self.kind_label(), parameter);

        let region = match self.kind {
            RegionKind::Box => {
                let b = self.bounds.ok_or_else(|| missing("bounds"))?;
                ClipRegion::from_bounds(Bounds::new(
                    Point3::new(b[0], b[2], b[4]),
                    Point3::new(b[1], b[3], b[5]),
                ))
            }
            RegionKind::Plane => {
                let origin = self.origin.ok_or_else(|| missing("origin"))?;
                let normal = self.normal.ok_or_else(|| missing("normal"))?;
                ClipRegion::plane(
                    Point3::from(origin),
                    Vector3::from(normal),
                    self.invert,
                )
            }
            RegionKind::Sphere => {
                let center = self.center.ok_or_else(|| missing("center"))?;
                let radius = self.radius.ok_or_else(|| missing("radius"))?;
                ClipRegion::sphere(Point3::from(center), radius)
            }
        };

        Ok(region)
    }

    pub fn mode(&self) -> ClipMode {
        if self.crinkle {
            ClipMode::Crinkle
        } else {
            ClipMode::Exact
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.streaming {
            WriteMode::Streaming
        } else {
            WriteMode::Buffered
        }
    }

    fn kind_label(&self) -> &'static str {
        match self.kind {
            RegionKind::Box => "box",
            RegionKind::Plane => "plane",
            RegionKind::Sphere => "sphere",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::InvalidRegion;

    #[test]
    fn box_config_from_toml() {
        let config: ClipConfig = toml::from_str(
            r#"
            kind = "box"
            bounds = [-1.0, 1.0, -2.0, 2.0, -3.0, 3.0]
            crinkle = true
        "#,
        )
        .unwrap();

        assert!(config.use_prefilter);
        assert!(config.crinkle);
        assert!(!config.streaming);

        let region = config.region().unwrap();
        assert!(region.validate().is_ok());
        match region {
            ClipRegion::Box(b) => {
                assert_eq!(b.bounds.min, Point3::new(-1.0, -2.0, -3.0));
                assert_eq!(b.bounds.max, Point3::new(1.0, 2.0, 3.0));
            }
            _ => panic!("expected a box"),
        }
    }

    #[test]
    fn plane_needs_origin_and_normal() {
        let config: ClipConfig = toml::from_str(
            r#"
            kind = "plane"
            origin = [0.0, 0.0, 0.0]
        "#,
        )
        .unwrap();

        let err = config.region().unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(_)));
    }

    #[test]
    fn invalid_sphere_fails_validation() {
        let config: ClipConfig = toml::from_str(
            r#"
            kind = "sphere"
            center = [0.0, 0.0, 0.0]
            radius = 0.0
        "#,
        )
        .unwrap();

        let region = config.region().unwrap();
        assert_eq!(
            region.validate(),
            Err(InvalidRegion::NonPositiveRadius { radius: 0.0 })
        );
    }
}
