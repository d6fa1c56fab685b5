/// Texture trait, texture descriptor, and texture info

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Returns true for depth (and depth/stencil) formats
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT)
    }

    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8_UNORM => 1,
            TextureFormat::R8G8_UNORM => 2,
            TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::D32_FLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Texture usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Texture can be sampled in shaders
    Sampled,
    /// Texture can be used as render target (and blit source)
    RenderTarget,
    /// Texture can be used for both
    SampledAndRenderTarget,
    /// Texture can be used as depth/stencil attachment
    DepthStencil,
    /// Depth/stencil attachment that is also sampled later (shadow maps, G-buffer depth)
    SampledDepthStencil,
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero extent means the window is minimized
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

// ===== TEXTURE DATA =====

/// Data for a single layer of a texture array
#[derive(Debug, Clone)]
pub struct TextureLayerData {
    /// Target layer index (0-based)
    pub layer: u32,
    /// Raw pixel bytes for this layer
    pub data: Vec<u8>,
}

/// Data to upload to a texture at creation time
#[derive(Debug, Clone)]
pub enum TextureData {
    /// Single image data (for simple textures, or layer 0 of an array)
    Single(Vec<u8>),

    /// Per-layer data for array textures.
    /// Only the layers listed are uploaded; others remain uninitialized.
    Layers(Vec<TextureLayerData>),
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name, also used in logs
    pub label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
    /// Number of array layers (1 = simple 2D texture, >1 = texture array)
    pub array_layers: u32,
    /// Optional initial data to upload at creation time
    pub data: Option<TextureData>,
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture.
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub array_layers: u32,
}

impl TextureInfo {
    /// Returns true if this texture is a texture array (array_layers > 1)
    pub fn is_array(&self) -> bool {
        self.array_layers > 1
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

impl From<&TextureDesc> for TextureInfo {
    fn from(desc: &TextureDesc) -> Self {
        Self {
            label: desc.label.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            array_layers: desc.array_layers,
        }
    }
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types.
/// The texture is automatically destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
