/// RenderTarget trait - a single-layer attachment view of a texture

use crate::graphics_device::TextureFormat;

/// Attachment view of one layer of a texture
///
/// The shadow map exposes one render target per cascade layer while being
/// sampled as a whole array.
pub trait RenderTarget: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> TextureFormat;
    /// Array layer this view renders into
    fn layer(&self) -> u32;
}
