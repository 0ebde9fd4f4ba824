//! BLIT image loader for blitbridge
//!
//! Validates the fixed image header, owns the image bytes for the lifetime
//! of a session and exposes the embedded resource blobs.

pub mod assets;
pub mod cartridge;
pub mod header;
pub mod metadata;

// Re-export main types
pub use assets::{Asset, AssetId, AssetRegistry, ResourceEntry};
pub use cartridge::{CartridgeImage, CartridgeLoader};
pub use header::{
    ApiVersion, BlitHeader, DeviceTag, EntryPoint, HeaderDescriptor, BLIT_MAGIC,
    EXTENDED_HEADER_SIZE, HEADER_SIZE,
};
pub use metadata::{GameMetadata, TypeMetadata};
