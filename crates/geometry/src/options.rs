use foundation::math::{DEFAULT_MERCATOR_SCALE, MercatorProjection};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXTRUDE_DEPTH: f64 = 1.0;
pub const DEFAULT_LINE_OFFSET: f64 = 0.01;

/// Fully resolved settings for one generation run.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub mercator_scale: f64,
    pub mercator_translate: [f64; 2],
    pub extrude_depth: f64,
    /// Height of the outline above the top of the filled mesh.
    pub line_offset: f64,
    pub need_shape_geometry: bool,
    pub need_line_geometry: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            mercator_scale: DEFAULT_MERCATOR_SCALE,
            mercator_translate: [0.0, 0.0],
            extrude_depth: DEFAULT_EXTRUDE_DEPTH,
            line_offset: DEFAULT_LINE_OFFSET,
            need_shape_geometry: true,
            need_line_geometry: true,
        }
    }
}

/// Caller-supplied subset of [`GenerationOptions`]. Unknown keys in a config
/// document are ignored.
#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptionsPatch {
    pub mercator_scale: Option<f64>,
    pub mercator_translate: Option<[f64; 2]>,
    pub extrude_depth: Option<f64>,
    pub line_offset: Option<f64>,
    pub need_shape_geometry: Option<bool>,
    pub need_line_geometry: Option<bool>,
}

#[derive(Debug)]
pub enum OptionsError {
    Json(serde_json::Error),
    NonFinite(&'static str),
    InvalidScale(f64),
    NegativeDepth(f64),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::Json(e) => write!(f, "invalid options document: {e}"),
            OptionsError::NonFinite(field) => write!(f, "option {field} must be finite"),
            OptionsError::InvalidScale(s) => {
                write!(f, "option mercatorScale must be positive, got {s}")
            }
            OptionsError::NegativeDepth(d) => {
                write!(f, "option extrudeDepth must not be negative, got {d}")
            }
        }
    }
}

impl std::error::Error for OptionsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OptionsError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl GenerationOptionsPatch {
    pub fn from_json_str(payload: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(payload).map_err(OptionsError::Json)
    }

    /// Fields set in `other` win over fields set in `self`.
    pub fn overlay(self, other: Self) -> Self {
        Self {
            mercator_scale: other.mercator_scale.or(self.mercator_scale),
            mercator_translate: other.mercator_translate.or(self.mercator_translate),
            extrude_depth: other.extrude_depth.or(self.extrude_depth),
            line_offset: other.line_offset.or(self.line_offset),
            need_shape_geometry: other.need_shape_geometry.or(self.need_shape_geometry),
            need_line_geometry: other.need_line_geometry.or(self.need_line_geometry),
        }
    }

    pub fn resolve(self) -> GenerationOptions {
        let d = GenerationOptions::default();
        GenerationOptions {
            mercator_scale: self.mercator_scale.unwrap_or(d.mercator_scale),
            mercator_translate: self.mercator_translate.unwrap_or(d.mercator_translate),
            extrude_depth: self.extrude_depth.unwrap_or(d.extrude_depth),
            line_offset: self.line_offset.unwrap_or(d.line_offset),
            need_shape_geometry: self.need_shape_geometry.unwrap_or(d.need_shape_geometry),
            need_line_geometry: self.need_line_geometry.unwrap_or(d.need_line_geometry),
        }
    }
}

impl GenerationOptions {
    /// z of every outline vertex.
    pub fn line_height(&self) -> f64 {
        self.extrude_depth + self.line_offset
    }

    pub fn projection(&self, center: [f64; 2]) -> MercatorProjection {
        MercatorProjection::new(center, self.mercator_scale, self.mercator_translate)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        let finite = [
            ("mercatorScale", self.mercator_scale),
            ("mercatorTranslate", self.mercator_translate[0]),
            ("mercatorTranslate", self.mercator_translate[1]),
            ("extrudeDepth", self.extrude_depth),
            ("lineOffset", self.line_offset),
        ];
        if let Some((field, _)) = finite.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(OptionsError::NonFinite(field));
        }
        if self.mercator_scale <= 0.0 {
            return Err(OptionsError::InvalidScale(self.mercator_scale));
        }
        if self.extrude_depth < 0.0 {
            return Err(OptionsError::NegativeDepth(self.extrude_depth));
        }
        Ok(())
    }
}
