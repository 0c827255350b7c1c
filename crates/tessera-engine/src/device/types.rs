use std::fmt;

use crate::coords::Mat4;

/// Number of texture units a draw call can sample from.
pub const MAX_TEXTURE_UNITS: usize = 8;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw, non-zero backend handle.
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            pub(crate) const KIND: &'static str = $kind;
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} #{}", $kind, self.0)
            }
        }
    };
}

handle!(
    /// GPU buffer handle (vertex or index storage).
    BufferId,
    "buffer"
);
handle!(
    /// Vertex-array (attribute binding state) handle.
    VertexArrayId,
    "vertex array"
);
handle!(
    /// Compiled shader stage handle.
    ShaderId,
    "shader"
);
handle!(
    /// Linked program handle.
    ProgramId,
    "program"
);
handle!(
    /// 2D texture handle.
    TextureId,
    "texture"
);

/// Buffer usage hint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Uploaded once.
    Static,
    /// Rewritten every frame through sub-range updates.
    Dynamic,
}

/// Binding point a buffer can be attached to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute source.
    Array,
    /// Index source for indexed draws.
    ElementArray,
}

/// Element type of one vertex attribute component.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    UInt,
    UByte,
}

impl ComponentType {
    /// Size of one component in bytes.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::Float => 4,
            ComponentType::UInt => 4,
            ComponentType::UByte => 1,
        }
    }
}

/// Full description of one attribute slot, as handed to the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributePointer {
    pub component_type: ComponentType,
    pub count: u32,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// WGSL attribute marking this stage's entry point.
    pub(crate) const fn entry_attribute(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "@vertex",
            ShaderStage::Fragment => "@fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Resolved uniform slot inside a program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

impl UniformLocation {
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Value written by one uniform-set call.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    IntArray(Vec<i32>),
    Vec4([f32; 4]),
    Mat4(Mat4),
}

impl UniformValue {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Int(_) => "int",
            UniformValue::IntArray(_) => "int[]",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat4(_) => "mat4",
        }
    }
}

/// RGBA8 2D texture description. Sampling is always linear with edge clamping.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
}

/// Snapshot of everything one indexed draw reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub vertex_array: VertexArrayId,
    pub index_buffer: BufferId,
    pub program: ProgramId,
    pub index_count: u32,
    pub textures: [Option<TextureId>; MAX_TEXTURE_UNITS],
}
