use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

pub const DEFAULT_LINK_ENDPOINT: &str =
    "https://pcloud-upload-link.harold-b89.workers.dev/upload-link";
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.pcloud.com/uploadtolink";
pub const DEFAULT_UPLOAD_FOLDER: &str = "rivvon";

/// Tallest slit-scan buffer accepted from a config file.
pub const MAX_SLITSCAN_HEIGHT: u32 = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RivvonConfig {
    pub version: u32,
    #[serde(default)]
    pub ribbon: RibbonSection,
    #[serde(default)]
    pub slitscan: SlitScanSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub upload: UploadSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RibbonSection {
    pub width: f32,
    pub drawing_width: f32,
    pub drawing_samples: usize,
    pub wave: WaveSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveSection {
    pub amplitude: f32,
    pub frequency: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlitScanSection {
    pub height: u32,
    pub resolutions: Vec<CaptureSize>,
    pub facing: Facing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    Environment,
    User,
}

/// A `WIDTHxHEIGHT` capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct CaptureSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderSection {
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub link_endpoint: String,
    pub upload_endpoint: String,
    pub folder: String,
}

impl Default for RivvonConfig {
    fn default() -> Self {
        Self {
            version: 1,
            ribbon: RibbonSection::default(),
            slitscan: SlitScanSection::default(),
            render: RenderSection::default(),
            upload: UploadSection::default(),
        }
    }
}

impl Default for RibbonSection {
    fn default() -> Self {
        Self {
            width: 1.2,
            drawing_width: 1.2,
            drawing_samples: 150,
            wave: WaveSection::default(),
        }
    }
}

impl Default for WaveSection {
    fn default() -> Self {
        Self {
            amplitude: 0.2,
            frequency: 2.0,
            speed: 2.0,
        }
    }
}

impl Default for SlitScanSection {
    fn default() -> Self {
        Self {
            height: 512,
            resolutions: vec![
                CaptureSize::new(160, 120),
                CaptureSize::new(320, 240),
                CaptureSize::new(640, 480),
            ],
            facing: Facing::Environment,
        }
    }
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            duration: None,
        }
    }
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            link_endpoint: DEFAULT_LINK_ENDPOINT.to_string(),
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            folder: DEFAULT_UPLOAD_FOLDER.to_string(),
        }
    }
}

impl CaptureSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for CaptureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<String> for CaptureSize {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let (width, height) = raw
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid capture size '{raw}'; expected WIDTHxHEIGHT"))?;
        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid capture width in '{raw}': {err}"))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid capture height in '{raw}': {err}"))?;
        if width == 0 || height == 0 {
            return Err(format!("capture size '{raw}' must be non-zero"));
        }
        Ok(Self { width, height })
    }
}

fn default_fps() -> f32 {
    60.0
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl RivvonConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RivvonConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Render ticks implied by `render.duration` at `render.fps`.
    pub fn tick_budget(&self) -> Option<u64> {
        self.render
            .duration
            .map(|duration| (duration.as_secs_f64() * self.render.fps as f64).ceil() as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let ribbon = &self.ribbon;
        if !(ribbon.width.is_finite() && ribbon.width > 0.0) {
            return Err(ConfigError::Invalid("ribbon.width must be > 0".into()));
        }
        if !(ribbon.drawing_width.is_finite() && ribbon.drawing_width > 0.0) {
            return Err(ConfigError::Invalid(
                "ribbon.drawing_width must be > 0".into(),
            ));
        }
        if ribbon.drawing_samples < 2 {
            return Err(ConfigError::Invalid(
                "ribbon.drawing_samples must be at least 2".into(),
            ));
        }
        let wave = ribbon.wave;
        for (name, value) in [
            ("amplitude", wave.amplitude),
            ("frequency", wave.frequency),
            ("speed", wave.speed),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "ribbon.wave.{name} must be a finite number"
                )));
            }
        }

        if !(1..=MAX_SLITSCAN_HEIGHT).contains(&self.slitscan.height) {
            return Err(ConfigError::Invalid(format!(
                "slitscan.height must be between 1 and {MAX_SLITSCAN_HEIGHT}"
            )));
        }

        if !(self.render.fps.is_finite() && self.render.fps > 0.0) {
            return Err(ConfigError::Invalid("render.fps must be > 0".into()));
        }
        if self.render.duration.is_some_and(|duration| duration.is_zero()) {
            return Err(ConfigError::Invalid(
                "render.duration must be greater than zero".into(),
            ));
        }

        for (name, endpoint) in [
            ("link_endpoint", &self.upload.link_endpoint),
            ("upload_endpoint", &self.upload.upload_endpoint),
        ] {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!(
                    "upload.{name} '{endpoint}' must be an http(s) URL"
                )));
            }
        }
        if self.upload.folder.trim().is_empty() {
            return Err(ConfigError::Invalid("upload.folder may not be empty".into()));
        }

        Ok(())
    }
}
