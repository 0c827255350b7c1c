//! Uniform-block reflection for WGSL stage sources.
//!
//! Uniforms live in one `struct Uniforms { ... }` bound at group 0, binding 0.
//! Field offsets follow the WGSL layout rules for the uniform address space, so
//! the byte image built here can be uploaded as-is.

use crate::device::{DeviceError, DeviceResult, UniformValue};

const BLOCK_STRUCT: &str = "struct Uniforms";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    UInt,
    Float,
    Vec2,
    Vec4,
    IVec4,
    Mat4,
}

impl UniformKind {
    fn parse(ty: &str) -> Option<Self> {
        Some(match ty {
            "i32" => UniformKind::Int,
            "u32" => UniformKind::UInt,
            "f32" => UniformKind::Float,
            "vec2<f32>" | "vec2f" => UniformKind::Vec2,
            "vec4<f32>" | "vec4f" => UniformKind::Vec4,
            "vec4<i32>" | "vec4i" => UniformKind::IVec4,
            "mat4x4<f32>" | "mat4x4f" => UniformKind::Mat4,
            _ => return None,
        })
    }

    const fn align(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::UInt | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec4 | UniformKind::IVec4 | UniformKind::Mat4 => 16,
        }
    }

    const fn size(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::UInt | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec4 | UniformKind::IVec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }
}

/// One member of the uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
    /// Element count for `array<T, N>` members.
    pub len: Option<u32>,
    pub stride: u32,
}

impl UniformField {
    /// Bytes this member occupies in the block.
    pub fn extent(&self) -> std::ops::Range<u32> {
        let size = match self.len {
            Some(n) => self.stride * n,
            None => self.kind.size(),
        };
        self.offset..self.offset + size
    }
}

/// Reflected uniform block of a stage or a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformBlock {
    fields: Vec<UniformField>,
    size: u32,
}

impl UniformBlock {
    /// Reflects the `Uniforms` struct of a stage source. A source without one
    /// yields an empty block.
    pub fn parse(source: &str) -> Result<Self, String> {
        let source = strip_line_comments(source);
        let Some(rest) = block_body_start(&source) else {
            return Ok(Self::default());
        };
        let open = rest
            .find('{')
            .ok_or_else(|| "`struct Uniforms` has no body".to_string())?;
        let close = rest[open..]
            .find('}')
            .ok_or_else(|| "`struct Uniforms` body is not closed".to_string())?;
        let body = &rest[open + 1..open + close];

        let mut fields = Vec::new();
        let mut cursor = 0u32;
        let mut block_align = 16u32;

        for member in split_members(body) {
            let (name, ty) = member
                .split_once(':')
                .ok_or_else(|| format!("malformed uniform member `{member}`"))?;
            let name = name.trim();
            if name.starts_with('@') {
                return Err(format!("layout attributes are not supported on `{name}`"));
            }
            let ty: String = ty.chars().filter(|c| !c.is_whitespace()).collect();

            let (kind, len, align, size, stride) = match parse_array(&ty) {
                Some((elem, n)) => {
                    let kind = UniformKind::parse(elem)
                        .ok_or_else(|| format!("unsupported uniform type `{elem}`"))?;
                    let stride = round_up(kind.align(), kind.size());
                    if stride % 16 != 0 {
                        return Err(format!(
                            "uniform array `{name}` has a {stride}-byte stride; \
                             uniform arrays need a multiple of 16"
                        ));
                    }
                    (kind, Some(n), kind.align().max(16), stride * n, stride)
                }
                None => {
                    let kind = UniformKind::parse(&ty)
                        .ok_or_else(|| format!("unsupported uniform type `{ty}`"))?;
                    (kind, None, kind.align(), kind.size(), kind.size())
                }
            };

            let offset = round_up(align, cursor);
            cursor = offset + size;
            block_align = block_align.max(align);
            fields.push(UniformField {
                name: name.to_string(),
                kind,
                offset,
                len,
                stride,
            });
        }

        Ok(Self {
            fields,
            size: round_up(block_align, cursor),
        })
    }

    /// Byte size of the block, padded to its alignment.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Index of the member called `name`.
    pub fn position(&self, name: &str) -> Option<u32> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| i as u32)
    }

    pub fn field(&self, index: u32) -> Option<&UniformField> {
        self.fields.get(index as usize)
    }

    /// Combines the blocks of two stages sharing one uniform buffer.
    ///
    /// A member declared by both stages must have the same type and offset,
    /// and members declared by only one stage must not share bytes with any
    /// other member.
    pub fn link(&self, other: &UniformBlock) -> Result<UniformBlock, String> {
        let mut fields = self.fields.clone();
        for theirs in &other.fields {
            match fields.iter().find(|f| f.name == theirs.name) {
                Some(ours) if ours != theirs => {
                    return Err(format!(
                        "stages disagree on the layout of uniform `{}`",
                        theirs.name
                    ));
                }
                Some(_) => {}
                None => {
                    let bytes = theirs.extent();
                    if let Some(ours) = fields.iter().find(|f| {
                        let r = f.extent();
                        r.start < bytes.end && bytes.start < r.end
                    }) {
                        return Err(format!(
                            "uniform `{}` overlaps `{}` at bytes {}..{}; \
                             declare the same `Uniforms` struct in both stages",
                            theirs.name, ours.name, bytes.start, bytes.end
                        ));
                    }
                    fields.push(theirs.clone());
                }
            }
        }
        Ok(UniformBlock {
            fields,
            size: self.size.max(other.size),
        })
    }

    /// Writes `value` into `storage` (the block's byte image) at member `index`.
    pub fn write(&self, storage: &mut [u8], index: u32, value: &UniformValue) -> DeviceResult<()> {
        let field = self.field(index).ok_or_else(|| {
            DeviceError::InvalidOperation(format!("uniform location {index} does not exist"))
        })?;
        let mismatch = || {
            DeviceError::InvalidOperation(format!(
                "uniform `{}` is {:?}{}, cannot set {}",
                field.name,
                field.kind,
                if field.len.is_some() { "[]" } else { "" },
                value.type_name()
            ))
        };

        match (value, field.kind, field.len) {
            (UniformValue::Int(v), UniformKind::Int, None) => {
                put(storage, field.offset, bytemuck::bytes_of(v))
            }
            (UniformValue::IntArray(values), UniformKind::Int | UniformKind::IVec4, len) => {
                let capacity = len.unwrap_or(1);
                if values.len() as u32 > capacity {
                    return Err(DeviceError::InvalidValue(format!(
                        "{} values for uniform `{}` holding {capacity}",
                        values.len(),
                        field.name
                    )));
                }
                if len.is_none() && field.kind != UniformKind::Int {
                    return Err(mismatch());
                }
                for (i, v) in values.iter().enumerate() {
                    put(storage, field.offset + i as u32 * field.stride, bytemuck::bytes_of(v))?;
                }
                Ok(())
            }
            (UniformValue::Vec4(v), UniformKind::Vec4, None) => {
                put(storage, field.offset, bytemuck::cast_slice(v))
            }
            (UniformValue::Mat4(m), UniformKind::Mat4, None) => {
                put(storage, field.offset, bytemuck::bytes_of(m))
            }
            _ => Err(mismatch()),
        }
    }
}

fn put(storage: &mut [u8], offset: u32, bytes: &[u8]) -> DeviceResult<()> {
    let start = offset as usize;
    let end = start + bytes.len();
    let total = storage.len();
    let dst = storage.get_mut(start..end).ok_or_else(|| {
        DeviceError::InvalidValue(format!(
            "uniform write {start}..{end} exceeds a {total}-byte block"
        ))
    })?;
    dst.copy_from_slice(bytes);
    Ok(())
}

#[inline]
fn round_up(align: u32, value: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Text following the `struct Uniforms` name, if the source declares it.
/// Longer names that merely start with `Uniforms` do not count.
fn block_body_start(source: &str) -> Option<&str> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    source.match_indices(BLOCK_STRUCT).find_map(|(at, _)| {
        let before = source[..at].chars().next_back();
        let rest = &source[at + BLOCK_STRUCT.len()..];
        let after = rest.chars().next();
        (!before.is_some_and(is_ident) && !after.is_some_and(is_ident)).then_some(rest)
    })
}

fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits struct members on commas outside of `<...>`.
fn split_members(body: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                members.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    members.push(&body[start..]);
    members
        .into_iter()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect()
}

/// `array<T,N>` → `(T, N)`. Expects whitespace already removed.
fn parse_array(ty: &str) -> Option<(&str, u32)> {
    let inner = ty.strip_prefix("array<")?.strip_suffix('>')?;
    let (elem, len) = inner.rsplit_once(',')?;
    Some((elem, len.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTURED: &str = r#"
struct Uniforms {
    u_MVP: mat4x4<f32>,
    u_Color: vec4<f32>, // tint
    u_Texture: i32,
    u_Textures: array<vec4<i32>, 2>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
"#;

    #[test]
    fn offsets_follow_uniform_layout() {
        let block = UniformBlock::parse(TEXTURED).unwrap();
        let offsets: Vec<_> = block.fields().iter().map(|f| (f.name.as_str(), f.offset)).collect();
        assert_eq!(
            offsets,
            vec![("u_MVP", 0), ("u_Color", 64), ("u_Texture", 80), ("u_Textures", 96)]
        );
        assert_eq!(block.size(), 128);
    }

    #[test]
    fn source_without_block_is_empty() {
        let block = UniformBlock::parse("@fragment fn fs_main() {}").unwrap();
        assert!(block.is_empty());
        assert_eq!(block.size(), 0);
    }

    #[test]
    fn scalar_array_is_rejected() {
        let err = UniformBlock::parse("struct Uniforms { slots: array<i32, 4>, }").unwrap_err();
        assert!(err.contains("multiple of 16"), "{err}");
    }

    #[test]
    fn link_rejects_conflicting_members() {
        let a = UniformBlock::parse("struct Uniforms { u_Color: vec4<f32>, }").unwrap();
        let b = UniformBlock::parse("struct Uniforms { u_Color: mat4x4<f32>, }").unwrap();
        assert!(a.link(&b).is_err());
    }

    #[test]
    fn link_merges_disjoint_members() {
        let a = UniformBlock::parse("struct Uniforms { u_MVP: mat4x4<f32>, }").unwrap();
        let b = UniformBlock::parse(TEXTURED).unwrap();
        let linked = a.link(&b).unwrap();
        assert_eq!(linked.fields().len(), 4);
        assert_eq!(linked.size(), 128);
    }

    #[test]
    fn link_rejects_members_sharing_bytes() {
        let vs = UniformBlock::parse("struct Uniforms { u_MVP: mat4x4<f32>, }").unwrap();
        let fs = UniformBlock::parse("struct Uniforms { u_Color: vec4<f32>, }").unwrap();
        let err = vs.link(&fs).unwrap_err();
        assert!(err.contains("`u_Color` overlaps `u_MVP`"), "{err}");
    }

    #[test]
    fn similarly_named_structs_are_not_the_block() {
        let source = "struct UniformsExtra { a: f32, }\nstruct Uniforms { u_Color: vec4<f32>, }";
        let block = UniformBlock::parse(source).unwrap();
        assert_eq!(block.fields().len(), 1);
        assert_eq!(block.fields()[0].name, "u_Color");

        let only_lookalike = UniformBlock::parse("struct UniformsExtra { a: f32, }").unwrap();
        assert!(only_lookalike.is_empty());
    }

    #[test]
    fn int_array_uses_element_stride() {
        let block = UniformBlock::parse(TEXTURED).unwrap();
        let mut bytes = vec![0u8; block.size() as usize];
        let at = block.position("u_Textures").unwrap();
        block
            .write(&mut bytes, at, &UniformValue::IntArray(vec![0, 1]))
            .unwrap();
        assert_eq!(&bytes[96..100], &0i32.to_le_bytes());
        assert_eq!(&bytes[112..116], &1i32.to_le_bytes());
    }

    #[test]
    fn type_mismatch_is_invalid_operation() {
        let block = UniformBlock::parse(TEXTURED).unwrap();
        let mut bytes = vec![0u8; block.size() as usize];
        let at = block.position("u_Color").unwrap();
        let err = block.write(&mut bytes, at, &UniformValue::Int(3)).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidOperation(_)));
    }
}
