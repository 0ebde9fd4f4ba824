//! Cartridge image validation and ownership

use crate::header::{self, HeaderDescriptor};
use bb_core::config::BlitDevice;
use bb_core::error::LoaderError;
use tracing::{debug, info};

/// Validates candidate images against the header contract
#[derive(Debug, Clone, Copy)]
pub struct CartridgeLoader {
    image_base: u32,
    expected_device: Option<BlitDevice>,
}

impl CartridgeLoader {
    /// Create a loader for images mapped at `image_base`, accepting any device
    pub fn new(image_base: u32) -> Self {
        Self {
            image_base,
            expected_device: None,
        }
    }

    /// Only accept images tagged for `device`; untagged images are rejected too
    pub fn with_expected_device(mut self, device: Option<BlitDevice>) -> Self {
        self.expected_device = device;
        self
    }

    pub fn image_base(&self) -> u32 {
        self.image_base
    }

    pub fn expected_device(&self) -> Option<BlitDevice> {
        self.expected_device
    }

    /// Validate a candidate image without taking ownership of it
    pub fn validate(&self, image: &[u8]) -> Result<HeaderDescriptor, LoaderError> {
        let descriptor = header::validate(image, self.image_base)?;

        if let Some(expected) = self.expected_device {
            let found = descriptor.device.map(|tag| tag.device_id);
            if found != Some(expected.id()) {
                debug!("Rejecting image tagged {:?}, expected {:?}", found, expected);
                return Err(LoaderError::DeviceMismatch {
                    expected: expected.id(),
                    found,
                });
            }
        }

        Ok(descriptor)
    }

    /// Validate an image and take ownership of its bytes
    pub fn load(&self, bytes: Vec<u8>) -> Result<CartridgeImage, LoaderError> {
        let descriptor = self.validate(&bytes)?;

        info!(
            "Image accepted: {} bytes at 0x{:08x}, owned extent {} bytes",
            bytes.len(),
            self.image_base,
            descriptor.extent_len()
        );

        Ok(CartridgeImage {
            bytes: bytes.into_boxed_slice(),
            descriptor,
        })
    }
}

/// A validated image and the arena its assets borrow from.
///
/// The bytes are never mutated after validation.
#[derive(Debug)]
pub struct CartridgeImage {
    bytes: Box<[u8]>,
    descriptor: HeaderDescriptor,
}

impl CartridgeImage {
    pub fn descriptor(&self) -> &HeaderDescriptor {
        &self.descriptor
    }

    /// Whole physical image, header included
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes of the owned extent `[start, end)`
    pub fn extent(&self) -> &[u8] {
        let d = &self.descriptor;
        &self.bytes[d.offset_of(d.start)..d.offset_of(d.end)]
    }

    /// Bytes at an absolute address range, if it lies inside the owned extent
    pub fn slice(&self, addr: u32, len: u32) -> Option<&[u8]> {
        if !self.descriptor.contains(addr, len) {
            return None;
        }
        let offset = self.descriptor.offset_of(addr);
        Some(&self.bytes[offset..offset + len as usize])
    }

    /// Bytes that follow the owned extent (metadata lives here)
    pub fn trailer(&self) -> &[u8] {
        &self.bytes[self.descriptor.offset_of(self.descriptor.end)..]
    }
}
