use std::path::{Path, PathBuf};

use serde::Deserialize;

use dvd_framework::paint::Color;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Demo settings, optionally loaded from a TOML file.
///
/// Every key is optional; a missing key keeps its default. The window is
/// always 800×600 and not part of the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    pub window: WindowSection,
    pub logo: LogoSection,
    pub confetti: ConfettiSection,
    pub overlay: OverlaySection,

    /// Fixed RNG seed for reproducible confetti; entropy when absent.
    pub seed: Option<u64>,

    /// Directory searched for `<name>.wgsl` before the built-in shaders.
    pub shader_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: String,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self { title: "dvd".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogoSection {
    /// Center, in pixels from the top-left corner.
    pub position: [f32; 2],
    pub size: [f32; 2],
    /// Pixels per second.
    pub velocity: [f32; 2],
    /// sRGB bytes.
    pub color: [u8; 3],
}

impl Default for LogoSection {
    fn default() -> Self {
        Self {
            position: [400.0, 300.0],
            size: [120.0, 60.0],
            velocity: [180.0, 135.0],
            color: [70, 130, 255],
        }
    }
}

impl LogoSection {
    pub fn color(&self) -> Color {
        let [r, g, b] = self.color;
        Color::from_srgb_u8(r, g, b, 255)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfettiSection {
    pub lifetime_secs: f32,
    /// Trailing part of the lifetime over which a piece fades out.
    pub fade_secs: f32,
    pub max_pieces: usize,
    pub per_corner_hit: usize,
    pub per_click: usize,
    pub size: [f32; 2],
    /// Speed range in pixels per second.
    pub speed: [f32; 2],
}

impl Default for ConfettiSection {
    fn default() -> Self {
        Self {
            lifetime_secs: 4.0,
            fade_secs: 1.0,
            max_pieces: 256,
            per_corner_hit: 1,
            per_click: 12,
            size: [10.0, 6.0],
            speed: [80.0, 260.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlaySection {
    /// TTF/OTF file for the counters; a system font is used when absent.
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
}

impl Default for OverlaySection {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 22.0,
        }
    }
}

impl DemoConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn finite(v: &[f32]) -> bool {
            v.iter().all(|x| x.is_finite())
        }

        if !finite(&self.logo.position) || !finite(&self.logo.velocity) {
            return Err(ConfigError::Invalid("logo position and velocity must be finite".into()));
        }
        if !finite(&self.logo.size) || self.logo.size.iter().any(|&s| s < 0.0) {
            return Err(ConfigError::Invalid("logo size must be finite and non-negative".into()));
        }

        let c = &self.confetti;
        if !(c.lifetime_secs.is_finite() && c.lifetime_secs > 0.0) {
            return Err(ConfigError::Invalid("confetti.lifetime_secs must be positive".into()));
        }
        if !(c.fade_secs.is_finite() && (0.0..=c.lifetime_secs).contains(&c.fade_secs)) {
            return Err(ConfigError::Invalid(
                "confetti.fade_secs must lie between 0 and lifetime_secs".into(),
            ));
        }
        if c.max_pieces == 0 {
            return Err(ConfigError::Invalid("confetti.max_pieces must be at least 1".into()));
        }
        if c.per_corner_hit == 0 {
            return Err(ConfigError::Invalid("confetti.per_corner_hit must be at least 1".into()));
        }
        if !finite(&c.size) || c.size.iter().any(|&s| s < 0.0) {
            return Err(ConfigError::Invalid("confetti.size must be finite and non-negative".into()));
        }
        if !finite(&c.speed) || c.speed[0] < 0.0 || c.speed[0] > c.speed[1] {
            return Err(ConfigError::Invalid("confetti.speed must be an ordered [min, max] range".into()));
        }

        if !(self.overlay.font_size.is_finite() && self.overlay.font_size > 0.0) {
            return Err(ConfigError::Invalid("overlay.font_size must be positive".into()));
        }
        Ok(())
    }
}
