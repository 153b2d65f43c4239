use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::backend::{GpuContext, RawId, ShaderStage, UniformValue};
use crate::error::Error;

const SHADER_HEADER: &str = "#version 330\n";

/// A compiled shader stage.
///
/// Clones share the backend object; it is released when the last clone is
/// dropped. The default value is the null shader.
#[derive(Clone, Default)]
pub struct Shader {
    inner: Option<Rc<ShaderInner>>,
}

struct ShaderInner {
    gpu: GpuContext,
    id: RawId,
}

impl Drop for ShaderInner {
    fn drop(&mut self) {
        self.gpu.delete_shader(self.id);
    }
}

impl Shader {
    /// Compile a shader from source text. A `#version` header is prepended,
    /// so sources start directly with their declarations.
    ///
    /// Compilation is synchronous; failure returns
    /// [`Error::ResourceCreation`] carrying the compiler log.
    pub fn from_source(gpu: &GpuContext, source: &str, stage: ShaderStage) -> Result<Shader, Error> {
        let mut text = String::with_capacity(SHADER_HEADER.len() + source.len());
        text.push_str(SHADER_HEADER);
        text.push_str(source);
        let id = gpu.create_shader(stage, &text)?;
        Ok(Shader {
            inner: Some(Rc::new(ShaderInner {
                gpu: gpu.clone(),
                id,
            })),
        })
    }

    pub fn from_file(
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        stage: ShaderStage,
    ) -> Result<Shader, Error> {
        let source = std::fs::read_to_string(path)?;
        Shader::from_source(gpu, &source, stage)
    }

    /// The backend id, `0` for the null shader.
    pub fn id(&self) -> RawId {
        self.inner.as_ref().map_or(0, |inner| inner.id)
    }
}

impl PartialEq for Shader {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Shader {}

/// A set of shader stages linked into a GPU pipeline, plus a cache of
/// resolved uniform locations.
///
/// Clones share the program and the cache. Equality is identity of the
/// shared block, which is what the render-state cache compares.
#[derive(Clone, Default)]
pub struct ShaderProgram {
    inner: Option<Rc<ProgramInner>>,
}

struct ProgramInner {
    gpu: GpuContext,
    id: RawId,
    uniforms: RefCell<HashMap<String, i32>>,
}

impl Drop for ProgramInner {
    fn drop(&mut self) {
        self.gpu.delete_program(self.id);
    }
}

/// Sentinel location for uniforms that do not exist in the program; setting
/// it is silently ignored by the backend.
const MISSING_UNIFORM: i32 = -1;

impl ShaderProgram {
    /// Allocate an unlinked program. Attach stages with
    /// [`add_shader`](Self::add_shader), then [`link`](Self::link).
    pub fn new(gpu: &GpuContext) -> ShaderProgram {
        ShaderProgram {
            inner: Some(Rc::new(ProgramInner {
                gpu: gpu.clone(),
                id: gpu.create_program(),
                uniforms: RefCell::new(HashMap::new()),
            })),
        }
    }

    /// Compile and link a vertex/fragment pair in one step, checking the
    /// link status.
    pub fn from_sources(
        gpu: &GpuContext,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ShaderProgram, Error> {
        let vertex = Shader::from_source(gpu, vertex_source, ShaderStage::Vertex)?;
        let fragment = Shader::from_source(gpu, fragment_source, ShaderStage::Fragment)?;
        let program = ShaderProgram::new(gpu);
        program.add_shader(&vertex);
        program.add_shader(&fragment);
        program.link();
        program.link_status()?;
        Ok(program)
    }

    pub fn add_shader(&self, shader: &Shader) {
        if let Some(inner) = &self.inner {
            inner.gpu.attach_shader(inner.id, shader.id());
        }
    }

    /// Link the attached stages. Success is not reported here; query
    /// [`link_status`](Self::link_status) separately.
    pub fn link(&self) {
        if let Some(inner) = &self.inner {
            inner.gpu.link_program(inner.id);
        }
    }

    /// Blocking link-status query; on failure the linker log is returned in
    /// [`Error::ResourceCreation`].
    pub fn link_status(&self) -> Result<(), Error> {
        let Some(inner) = &self.inner else {
            return Err(Error::resource("shader program", "null program"));
        };
        inner
            .gpu
            .link_status(inner.id)
            .map_err(|log| Error::resource("shader program", log))
    }

    /// Resolve a uniform location, caching the answer. An unknown name is
    /// logged once and resolves to a sentinel that later set-calls ignore.
    pub fn uniform(&self, name: &str) -> i32 {
        let Some(inner) = &self.inner else {
            return MISSING_UNIFORM;
        };
        if let Some(&location) = inner.uniforms.borrow().get(name) {
            return location;
        }
        let location = match inner.gpu.uniform_location(inner.id, name) {
            Some(location) => location,
            None => {
                tracing::error!(name, program = inner.id, "uniform not found in program");
                MISSING_UNIFORM
            }
        };
        inner.uniforms.borrow_mut().insert(name.to_string(), location);
        location
    }

    /// Set a uniform of this program. The program must be the active one.
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.gpu.set_uniform(self.uniform(name), &value.into());
    }

    /// Make this program the active one. Subsequent draws and uniform sets
    /// apply to it.
    pub fn activate(&self) {
        if let Some(inner) = &self.inner {
            inner.gpu.use_program(inner.id);
        }
    }

    /// The backend id, `0` for the null program.
    pub fn id(&self) -> RawId {
        self.inner.as_ref().map_or(0, |inner| inner.id)
    }
}

impl PartialEq for ShaderProgram {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for ShaderProgram {}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram").field("id", &self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;

    #[test]
    fn compile_failure_carries_the_log() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();
        *backend.fail_next_shader.borrow_mut() = Some("0:1: syntax error".to_string());

        let result = Shader::from_source(&gpu, "not glsl", ShaderStage::Fragment);
        match result {
            Err(Error::ResourceCreation { kind, log }) => {
                assert_eq!(kind, "shader");
                assert!(log.contains("syntax error"));
            }
            Err(e) => panic!("wrong error: {e:?}"),
            Ok(_) => panic!("compilation should have failed"),
        }
    }

    #[test]
    fn shader_released_exactly_once() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();

        let shader = Shader::from_source(&gpu, "void main() {}", ShaderStage::Vertex).unwrap();
        let copy = shader.clone();
        drop(shader);
        assert_eq!(backend.deleted_shaders.get(), 0);
        drop(copy);
        assert_eq!(backend.deleted_shaders.get(), 1);
    }

    #[test]
    fn null_handles_are_inert() {
        let backend = RecordingBackend::new();
        let _gpu = backend.gpu();

        let shader = Shader::default();
        let program = ShaderProgram::default();
        program.add_shader(&shader);
        program.link();
        program.activate();
        program.set_uniform("color", 1.0f32);
        assert_eq!(program.uniform("color"), -1);
        assert!(program.link_status().is_err());

        assert_eq!(backend.created_shaders.get(), 0);
        assert_eq!(backend.created_programs.get(), 0);
        assert!(backend.program_binds.borrow().is_empty());
        assert!(backend.uniform_sets.borrow().is_empty());
    }

    #[test]
    fn uniform_locations_are_cached() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();

        let program = ShaderProgram::new(&gpu);
        let first = program.uniform("projection");
        let second = program.uniform("projection");
        assert_eq!(first, second);
        assert_eq!(
            backend
                .location_lookups
                .borrow()
                .iter()
                .filter(|n| *n == "projection")
                .count(),
            1,
            "second lookup must come from the cache"
        );
    }

    #[test]
    fn unknown_uniform_resolves_to_ignored_sentinel() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();

        let program = ShaderProgram::new(&gpu);
        assert_eq!(program.uniform("unknown_light"), -1);
        // Setting through the sentinel must not reach the backend.
        program.set_uniform("unknown_light", 3.0f32);
        assert!(backend.uniform_sets.borrow().is_empty());
    }

    #[test]
    fn program_equality_is_shared_identity() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();

        let a = ShaderProgram::new(&gpu);
        let b = ShaderProgram::new(&gpu);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(ShaderProgram::default(), ShaderProgram::default());
        assert_ne!(a, ShaderProgram::default());
    }
}
