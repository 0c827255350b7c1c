use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::device::{Device, GpuError, GpuResult, SharedContext, TextureDesc, TextureId};

/// Options applied when loading a texture from an image file.
#[derive(Debug, Clone)]
pub struct TextureOptions {
    /// Flip rows on load so the first row in memory is the bottom of the image.
    pub flip_vertically: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            flip_vertically: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to decode image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A write-once RGBA8 2D texture, sampled linearly with edge clamping.
pub struct Texture<D: Device> {
    ctx: SharedContext<D>,
    id: TextureId,
    width: u32,
    height: u32,
    origin: String,
}

impl<D: Device> Texture<D> {
    /// Decodes an image file and uploads it.
    ///
    /// The decoded pixels are released as soon as the upload is issued.
    pub fn from_path(
        ctx: &SharedContext<D>,
        path: impl AsRef<Path>,
        options: &TextureOptions,
    ) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let mut decoded = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        if options.flip_vertically {
            decoded = decoded.flipv();
        }
        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();

        let texture = Self::from_rgba8(ctx, width, height, rgba.as_raw(), path.display().to_string())?;
        drop(rgba);
        Ok(texture)
    }

    /// Uploads raw RGBA8 pixels (`width * height * 4` bytes, rows bottom-up).
    #[track_caller]
    pub fn from_rgba8(
        ctx: &SharedContext<D>,
        width: u32,
        height: u32,
        pixels: &[u8],
        origin: impl Into<String>,
    ) -> GpuResult<Self> {
        let id = ctx.create_texture(&TextureDesc { width, height }, pixels)?;
        let origin = origin.into();
        log::debug!("texture {origin}: {width}x{height} as {id}");
        Ok(Self {
            ctx: Rc::clone(ctx),
            id,
            width,
            height,
            origin,
        })
    }

    /// Attaches this texture to unit `slot`, leaving `slot` active.
    ///
    /// The slot must match the sampler index the bound shader reads.
    #[track_caller]
    pub fn bind(&self, slot: u32) -> GpuResult<()> {
        self.ctx.active_texture(slot)?;
        self.ctx.bind_texture(Some(self.id));
        Ok(())
    }

    /// Detaches whatever is bound to the active unit.
    pub fn unbind(&self) {
        self.ctx.bind_texture(None);
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl<D: Device> Drop for Texture<D> {
    fn drop(&mut self) {
        log::trace!("destroying {} ({})", self.id, self.origin);
        let _ = self.ctx.destroy_texture(self.id);
    }
}
