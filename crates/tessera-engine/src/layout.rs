use crate::device::{AttributePointer, ComponentType};

/// One per-vertex attribute and where it sits inside the vertex record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub component_type: ComponentType,
    pub count: u32,
    pub normalized: bool,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

impl VertexAttribute {
    #[inline]
    pub fn size(&self) -> u32 {
        self.count * self.component_type.size()
    }
}

/// Ordered description of a vertex record.
///
/// Push order is slot order: attribute `i` is read through slot `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `count` components of `component_type`.
    ///
    /// Byte components are normalized to `0..1`; the others are read as-is.
    pub fn push(&mut self, component_type: ComponentType, count: u32) -> &mut Self {
        let attr = VertexAttribute {
            component_type,
            count,
            normalized: component_type == ComponentType::UByte,
            offset: self.stride,
        };
        self.stride += attr.size();
        self.attributes.push(attr);
        self
    }

    pub fn push_f32(&mut self, count: u32) -> &mut Self {
        self.push(ComponentType::Float, count)
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Size of one vertex record in bytes.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Device-level description of attribute `index`.
    pub fn pointer(&self, index: usize) -> Option<AttributePointer> {
        self.attributes.get(index).map(|a| AttributePointer {
            component_type: a.component_type,
            count: a.count,
            normalized: a.normalized,
            stride: self.stride,
            offset: a.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textured_quad_layout() {
        let mut layout = VertexLayout::new();
        layout
            .push(ComponentType::Float, 2)
            .push(ComponentType::Float, 4)
            .push(ComponentType::Float, 2)
            .push(ComponentType::Float, 1);

        assert_eq!(layout.stride(), 36);
        let offsets: Vec<_> = layout.attributes().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 24, 32]);
    }

    #[test]
    fn offsets_are_prefix_sums_for_mixed_types() {
        let mut layout = VertexLayout::new();
        layout
            .push(ComponentType::UByte, 4)
            .push(ComponentType::UInt, 1)
            .push(ComponentType::Float, 3);

        let sizes = [4u32, 4, 12];
        let mut expected = 0;
        for (attr, size) in layout.attributes().iter().zip(sizes) {
            assert_eq!(attr.offset, expected);
            expected += size;
        }
        assert_eq!(layout.stride(), sizes.iter().sum::<u32>());
    }

    #[test]
    fn only_bytes_are_normalized() {
        let mut layout = VertexLayout::new();
        layout.push(ComponentType::UByte, 4).push_f32(2);
        assert!(layout.attributes()[0].normalized);
        assert!(!layout.attributes()[1].normalized);
    }

    #[test]
    fn pointer_carries_full_stride() {
        let mut layout = VertexLayout::new();
        layout.push_f32(2).push_f32(2);
        let ptr = layout.pointer(1).unwrap();
        assert_eq!((ptr.stride, ptr.offset, ptr.count), (16, 8, 2));
        assert!(layout.pointer(2).is_none());
    }
}
