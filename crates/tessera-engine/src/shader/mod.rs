//! Shader programs.
//!
//! - `source`: splitting a two-stage shader file into stage texts
//! - `reflect`: uniform-block layout shared by every device backend
//! - `Shader`: compiled program with a memoized name → location cache

mod reflect;
mod source;

pub use reflect::{UniformBlock, UniformField, UniformKind};
pub use source::{ShaderSource, ShaderSourceError};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::coords::Mat4;
use crate::device::{
    Device, DeviceError, GpuResult, ProgramId, ShaderStage, SharedContext, UniformLocation,
    UniformValue,
};

/// A linked vertex + fragment program.
///
/// Construction never fails: a stage that does not compile (or a program that
/// does not link) is logged with the full diagnostic and leaves the shader
/// invalid. Binding an invalid shader is an error, and so is setting a
/// uniform on it.
///
/// Uniform lookups are cached per name, misses included, so each name costs
/// one device query for the lifetime of the program.
pub struct Shader<D: Device> {
    ctx: SharedContext<D>,
    program: Option<ProgramId>,
    origin: String,
    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
}

impl<D: Device> Shader<D> {
    pub fn new(ctx: &SharedContext<D>, source: &ShaderSource) -> Self {
        let origin = source.origin();
        let program = link(ctx, source);
        match program {
            Some(p) => log::debug!("shader {origin}: linked as {p}"),
            None => log::error!("shader {origin}: program is invalid"),
        }
        Self {
            ctx: Rc::clone(ctx),
            program,
            origin,
            locations: RefCell::new(HashMap::new()),
        }
    }

    /// Reads and splits a shader file, then builds it.
    pub fn from_path(
        ctx: &SharedContext<D>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ShaderSourceError> {
        let source = ShaderSource::from_path(path)?;
        Ok(Self::new(ctx, &source))
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.program.is_some()
    }

    #[inline]
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Where the shader text came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Makes this the active program.
    #[track_caller]
    pub fn bind(&self) -> GpuResult<()> {
        let program = self.valid_program("use_program")?;
        self.ctx.use_program(Some(program));
        Ok(())
    }

    pub fn unbind(&self) {
        self.ctx.use_program(None);
    }

    #[track_caller]
    pub fn set_uniform_1i(&self, name: &str, value: i32) -> GpuResult<()> {
        self.set(name, UniformValue::Int(value))
    }

    /// Sets an `int[]` uniform (e.g. a sampler-slot array).
    #[track_caller]
    pub fn set_uniform_1iv(&self, name: &str, values: &[i32]) -> GpuResult<()> {
        self.set(name, UniformValue::IntArray(values.to_vec()))
    }

    #[track_caller]
    pub fn set_uniform_4f(&self, name: &str, v0: f32, v1: f32, v2: f32, v3: f32) -> GpuResult<()> {
        self.set(name, UniformValue::Vec4([v0, v1, v2, v3]))
    }

    #[track_caller]
    pub fn set_uniform_mat4f(&self, name: &str, matrix: &Mat4) -> GpuResult<()> {
        self.set(name, UniformValue::Mat4(*matrix))
    }

    /// Number of names resolved so far (found or not).
    pub fn cached_locations(&self) -> usize {
        self.locations.borrow().len()
    }

    #[track_caller]
    fn set(&self, name: &str, value: UniformValue) -> GpuResult<()> {
        let program = self.valid_program("set_uniform")?;
        match self.uniform_location(program, name)? {
            Some(location) => self.ctx.set_uniform(program, location, &value),
            None => Ok(()),
        }
    }

    #[track_caller]
    fn uniform_location(
        &self,
        program: ProgramId,
        name: &str,
    ) -> GpuResult<Option<UniformLocation>> {
        if let Some(cached) = self.locations.borrow().get(name) {
            return Ok(*cached);
        }
        let location = self.ctx.uniform_location(program, name)?;
        if location.is_none() {
            log::warn!("shader {}: uniform `{name}` does not exist", self.origin);
        }
        self.locations.borrow_mut().insert(name.to_owned(), location);
        Ok(location)
    }

    #[track_caller]
    fn valid_program(&self, call: &'static str) -> GpuResult<ProgramId> {
        self.program.ok_or_else(|| {
            self.ctx.reject(
                call,
                DeviceError::InvalidOperation(format!("shader {} is invalid", self.origin)),
            )
        })
    }
}

impl<D: Device> Drop for Shader<D> {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            // Failures are logged by the context.
            let _ = self.ctx.destroy_program(program);
        }
    }
}

/// Compiles both stages and links them; stage objects never outlive this call.
fn link<D: Device>(ctx: &SharedContext<D>, source: &ShaderSource) -> Option<ProgramId> {
    let vs = ctx.compile_shader(ShaderStage::Vertex, &source.vertex);
    let fs = ctx.compile_shader(ShaderStage::Fragment, &source.fragment);

    let (vs, fs) = match (vs, fs) {
        (Ok(vs), Ok(fs)) => (vs, fs),
        (Ok(stage), Err(_)) | (Err(_), Ok(stage)) => {
            let _ = ctx.destroy_shader(stage);
            return None;
        }
        (Err(_), Err(_)) => return None,
    };

    let program = ctx.link_program(vs, fs).ok();
    let _ = ctx.destroy_shader(vs);
    let _ = ctx.destroy_shader(fs);
    program
}
