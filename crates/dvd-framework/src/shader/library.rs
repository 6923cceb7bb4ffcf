use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors produced while resolving or validating a shader program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("unknown shader `{0}`")]
    Unknown(String),

    #[error("failed to read shader `{name}` from {path}: {source}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader `{name}` failed to parse:\n{message}")]
    Parse { name: String, message: String },

    #[error("shader `{name}` failed validation: {message}")]
    Validation { name: String, message: String },
}

/// A named, validated WGSL program.
///
/// Cheap to clone; the source is shared.
#[derive(Debug, Clone)]
pub struct Shader {
    name: Arc<str>,
    source: Arc<str>,
}

impl Shader {
    /// Parses and validates `source`.
    pub fn compile(name: &str, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
            name: name.to_string(),
            message: e.emit_to_string(source),
        })?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .map_err(|e| ShaderError::Validation {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            name: name.into(),
            source: source.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Creates the GPU module for this program.
    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.name()),
            source: wgpu::ShaderSource::Wgsl(self.source().into()),
        })
    }
}

/// Loads shader programs by name.
///
/// Lookup order for `load(name)`:
/// 1) `<override_dir>/<name>.wgsl` when an override directory is set and the file exists
/// 2) sources registered with [`ShaderLibrary::register`]
/// 3) built-in programs (`shape`, `text`)
///
/// Successful loads are cached; a failed load is not cached and is reported every time.
pub struct ShaderLibrary {
    override_dir: Option<PathBuf>,
    sources: HashMap<String, Arc<str>>,
    loaded: HashMap<String, Shader>,
}

impl ShaderLibrary {
    /// Solid instanced rectangles.
    pub const SHAPE: &'static str = "shape";
    /// Glyph quads sampled from the text atlas.
    pub const TEXT: &'static str = "text";

    pub fn new() -> Self {
        let mut sources = HashMap::new();
        sources.insert(Self::SHAPE.to_string(), Arc::from(include_str!("wgsl/shape.wgsl")));
        sources.insert(Self::TEXT.to_string(), Arc::from(include_str!("wgsl/text.wgsl")));

        Self {
            override_dir: None,
            sources,
            loaded: HashMap::new(),
        }
    }

    /// Looks for `<dir>/<name>.wgsl` before falling back to registered sources.
    pub fn with_override_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.override_dir = Some(dir.into());
        self
    }

    /// Registers (or replaces) an in-memory source under `name`.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<Arc<str>>) {
        let name = name.into();
        self.loaded.remove(&name);
        self.sources.insert(name, source.into());
    }

    /// Resolves, validates and caches the program called `name`.
    pub fn load(&mut self, name: &str) -> Result<Shader, ShaderError> {
        if let Some(shader) = self.loaded.get(name) {
            return Ok(shader.clone());
        }

        let source = self.resolve_source(name)?;
        let shader = Shader::compile(name, &source)?;
        log::debug!("shader `{name}` loaded ({} bytes)", source.len());

        self.loaded.insert(name.to_string(), shader.clone());
        Ok(shader)
    }

    fn resolve_source(&self, name: &str) -> Result<Arc<str>, ShaderError> {
        if let Some(dir) = &self.override_dir {
            let path = override_path(dir, name);
            if path.is_file() {
                let text = std::fs::read_to_string(&path).map_err(|source| ShaderError::Io {
                    name: name.to_string(),
                    path: path.clone(),
                    source,
                })?;
                log::info!("using shader override {}", path.display());
                return Ok(text.into());
            }
        }

        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| ShaderError::Unknown(name.to_string()))
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn override_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.wgsl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_programs_validate() {
        let mut lib = ShaderLibrary::new();
        assert_eq!(lib.load(ShaderLibrary::SHAPE).unwrap().name(), "shape");
        assert_eq!(lib.load(ShaderLibrary::TEXT).unwrap().name(), "text");
    }

    #[test]
    fn unknown_name_is_reported() {
        let mut lib = ShaderLibrary::new();
        let err = lib.load("sparkles").unwrap_err();
        assert!(matches!(err, ShaderError::Unknown(ref n) if n == "sparkles"));
    }

    #[test]
    fn syntax_error_fails_to_parse() {
        let mut lib = ShaderLibrary::new();
        lib.register("broken", "@vertex fn vs_main( -> {");
        let err = lib.load("broken").unwrap_err();
        assert!(matches!(err, ShaderError::Parse { .. }));
    }

    #[test]
    fn registered_source_replaces_cached_program() {
        let mut lib = ShaderLibrary::new();
        lib.load(ShaderLibrary::SHAPE).unwrap();

        lib.register(ShaderLibrary::SHAPE, "this is not wgsl");
        assert!(lib.load(ShaderLibrary::SHAPE).is_err());
    }

    #[test]
    fn override_dir_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shape.wgsl"), "fn broken( {").unwrap();

        let mut lib = ShaderLibrary::new().with_override_dir(dir.path());
        let err = lib.load(ShaderLibrary::SHAPE).unwrap_err();
        assert!(matches!(err, ShaderError::Parse { .. }));

        // Programs without an override file still resolve to the built-in.
        assert!(lib.load(ShaderLibrary::TEXT).is_ok());
    }
}
