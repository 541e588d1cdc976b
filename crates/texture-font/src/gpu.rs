//! wgpu backing for the glyph atlas.
//!
//! Enabled with the `wgpu` feature. The texture is created once at the atlas's
//! maximum height and only receives sub-region writes afterwards, so a view
//! returned by [`WgpuAtlasTexture::handle`] stays valid for the atlas's
//! lifetime and already holds every glyph looked up before the draw.

use std::sync::Arc;

use tracing::debug;

use crate::atlas::AtlasRect;
use crate::raster::PixelFormat;
use crate::texture::{AtlasPixels, AtlasTexture};

/// Map an atlas pixel format to the matching texture format.
pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Alpha => wgpu::TextureFormat::R8Unorm,
        PixelFormat::LuminanceAlpha => wgpu::TextureFormat::Rg8Unorm,
    }
}

/// A glyph atlas texture living on the GPU.
pub struct WgpuAtlasTexture {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    texture: Option<wgpu::Texture>,
    view: Option<Arc<wgpu::TextureView>>,
    label: String,
}

impl WgpuAtlasTexture {
    /// Create an unallocated texture; the atlas allocates it on construction.
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, label: impl Into<String>) -> Self {
        Self {
            device,
            queue,
            texture: None,
            view: None,
            label: label.into(),
        }
    }

    /// Get the underlying texture, if allocated.
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref()
    }

    /// Get the bind group layout for glyph atlases.
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glyph_atlas_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }
}

impl AtlasTexture for WgpuAtlasTexture {
    type Handle = Option<Arc<wgpu::TextureView>>;

    fn allocate(&mut self, width: u32, height: u32, format: PixelFormat) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        debug!(label = %self.label, width, height, "glyph atlas texture allocated");
        self.texture = Some(texture);
        self.view = Some(Arc::new(view));
    }

    fn upload_region(&mut self, pixels: AtlasPixels<'_>, region: AtlasRect) {
        let Some(texture) = self.texture.as_ref() else {
            return;
        };
        if region.is_empty() {
            return;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            pixels.data,
            wgpu::TexelCopyBufferLayout {
                offset: pixels.offset(region.x, region.y) as u64,
                bytes_per_row: Some(pixels.stride() as u32),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn handle(&self) -> Self::Handle {
        self.view.clone()
    }
}

impl std::fmt::Debug for WgpuAtlasTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuAtlasTexture")
            .field("label", &self.label)
            .field("allocated", &self.texture.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_match_channel_count() {
        assert_eq!(texture_format(PixelFormat::Alpha), wgpu::TextureFormat::R8Unorm);
        assert_eq!(
            texture_format(PixelFormat::LuminanceAlpha),
            wgpu::TextureFormat::Rg8Unorm
        );
    }
}
