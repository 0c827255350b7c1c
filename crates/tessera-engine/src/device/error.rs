use std::panic::Location;

use super::types::ShaderStage;

/// Fault reported by a device backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("{kind} #{id} does not exist")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("range {offset}..{end} exceeds the {size} bytes reserved for buffer #{id}")]
    OutOfBounds {
        id: u32,
        offset: u64,
        end: u64,
        size: u64,
    },

    #[error("device rejected an allocation of {0} bytes")]
    OutOfMemory(u64),

    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("program failed to link: {0}")]
    Link(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("backend: {0}")]
    Backend(String),
}

impl DeviceError {
    pub(crate) fn unknown(kind: &'static str, id: u32) -> Self {
        DeviceError::UnknownHandle { kind, id }
    }

    /// End of the write `offset..offset + len` into a buffer of `size` bytes,
    /// or `OutOfBounds` when it does not fit (including when the end overflows).
    pub(crate) fn check_range(id: u32, offset: u64, len: usize, size: u64) -> DeviceResult<u64> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= size => Ok(end),
            end => Err(DeviceError::OutOfBounds {
                id,
                offset,
                end: end.unwrap_or(u64::MAX),
                size,
            }),
        }
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// A failed GPU call, attributed to the exact call site that issued it.
#[derive(Debug, thiserror::Error)]
#[error("{call} failed at {location}: {source}")]
pub struct GpuError {
    pub call: &'static str,
    pub location: &'static Location<'static>,
    #[source]
    pub source: DeviceError,
}

impl GpuError {
    /// Returns the backend fault.
    pub fn device_error(&self) -> &DeviceError {
        &self.source
    }
}

pub type GpuResult<T> = Result<T, GpuError>;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
