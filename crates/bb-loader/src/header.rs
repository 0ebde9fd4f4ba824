//! BLIT image header parser

use bb_core::config::BlitDevice;
use bb_core::error::LoaderError;
use bytemuck::{Pod, Zeroable};
use std::fmt;
use tracing::debug;

/// "BLIT" read as a little-endian u32
pub const BLIT_MAGIC: u32 = 0x54494C42;

/// Size of the fixed image header in bytes
pub const HEADER_SIZE: usize = 24;

/// Size of the header including the device tag that may follow it
pub const EXTENDED_HEADER_SIZE: usize = HEADER_SIZE + DEVICE_TAG_SIZE;

const DEVICE_TAG_SIZE: usize = 8;

/// Raw image header as laid out at offset 0 of the image.
///
/// All fields are little-endian. Entry points and the owned extent are
/// stored relative to the start of the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct BlitHeader {
    pub magic: u32,
    pub render: u32,
    pub tick: u32,
    pub init: u32,
    pub start: u32,
    pub end: u32,
}

impl BlitHeader {
    /// Parse the header from the leading bytes of an image
    pub fn parse(image: &[u8]) -> Result<Self, LoaderError> {
        let found = read_magic(image);
        if image.len() < 4 || found != BLIT_MAGIC {
            return Err(LoaderError::InvalidMagic { found });
        }

        if image.len() < HEADER_SIZE {
            return Err(LoaderError::Truncated { len: image.len() });
        }

        let raw: BlitHeader = bytemuck::pod_read_unaligned(&image[..HEADER_SIZE]);
        Ok(Self {
            magic: u32::from_le(raw.magic),
            render: u32::from_le(raw.render),
            tick: u32::from_le(raw.tick),
            init: u32::from_le(raw.init),
            start: u32::from_le(raw.start),
            end: u32::from_le(raw.end),
        })
    }

    /// Serialize the header in its on-image (little-endian) form
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let le = Self {
            magic: self.magic.to_le(),
            render: self.render.to_le(),
            tick: self.tick.to_le(),
            init: self.init.to_le(),
            start: self.start.to_le(),
            end: self.end.to_le(),
        };
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&le));
        out
    }
}

/// Reads up to four leading bytes as a little-endian word, zero padded
fn read_magic(image: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    let n = image.len().min(4);
    word[..n].copy_from_slice(&image[..n]);
    u32::from_le_bytes(word)
}

/// Payload ABI version required by a tagged image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct RawDeviceTag {
    device_id: u8,
    _pad: [u8; 3],
    api_version_major: u16,
    api_version_minor: u16,
}

/// Device tag that follows the fixed header.
///
/// Only present when the owned extent starts at or after
/// `EXTENDED_HEADER_SIZE`; otherwise those bytes belong to the payload.
/// Legacy images (device id 0) carry no API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTag {
    pub device_id: u8,
    pub api_version: Option<ApiVersion>,
}

impl DeviceTag {
    /// Read the tag of an image whose fixed header is `header`
    pub fn read(image: &[u8], header: &BlitHeader) -> Option<Self> {
        if (header.start as usize) < EXTENDED_HEADER_SIZE || image.len() < EXTENDED_HEADER_SIZE {
            return None;
        }

        let raw: RawDeviceTag =
            bytemuck::pod_read_unaligned(&image[HEADER_SIZE..EXTENDED_HEADER_SIZE]);
        let api_version = (raw.device_id != 0).then(|| ApiVersion {
            major: u16::from_le(raw.api_version_major),
            minor: u16::from_le(raw.api_version_minor),
        });

        Some(Self {
            device_id: raw.device_id,
            api_version,
        })
    }

    /// Known device for this tag, `None` for ids this build does not know
    pub fn device(&self) -> Option<BlitDevice> {
        BlitDevice::from_id(self.device_id)
    }

    /// Serialize the tag in its on-image form
    pub fn to_bytes(&self) -> [u8; DEVICE_TAG_SIZE] {
        let api = self.api_version.unwrap_or(ApiVersion { major: 0, minor: 0 });
        let raw = RawDeviceTag {
            device_id: self.device_id,
            _pad: [0; 3],
            api_version_major: api.major.to_le(),
            api_version_minor: api.minor.to_le(),
        };
        let mut out = [0u8; DEVICE_TAG_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&raw));
        out
    }
}

/// Absolute address of a payload hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(pub u32);

impl EntryPoint {
    pub fn addr(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Validated header with every address resolved against the image base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDescriptor {
    /// Address the image is mapped at
    pub base: u32,
    pub render: EntryPoint,
    pub tick: EntryPoint,
    pub init: EntryPoint,
    /// First address owned by the image
    pub start: u32,
    /// One past the last address owned by the image
    pub end: u32,
    /// Device tag, for images built with the extended header
    pub device: Option<DeviceTag>,
}

impl HeaderDescriptor {
    /// Check the header's extent against the physical image and resolve
    /// all addresses. Entry points wrap like 32-bit address arithmetic.
    pub fn resolve(header: &BlitHeader, image_len: usize, base: u32) -> Result<Self, LoaderError> {
        let invalid = || LoaderError::InvalidBounds {
            start: header.start,
            end: header.end,
            image_len,
        };

        if header.start > header.end || header.end as usize > image_len {
            return Err(invalid());
        }

        let start = base.checked_add(header.start).ok_or_else(invalid)?;
        let end = base.checked_add(header.end).ok_or_else(invalid)?;

        Ok(Self {
            base,
            render: EntryPoint(base.wrapping_add(header.render)),
            tick: EntryPoint(base.wrapping_add(header.tick)),
            init: EntryPoint(base.wrapping_add(header.init)),
            start,
            end,
            device: None,
        })
    }

    /// Size of the owned extent in bytes
    pub fn extent_len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether `[addr, addr + len)` lies inside `[start, end)`
    pub fn contains(&self, addr: u32, len: u32) -> bool {
        let addr = addr as u64;
        addr >= self.start as u64 && addr + len as u64 <= self.end as u64
    }

    /// Image offset of an absolute address that lies inside the extent
    pub fn offset_of(&self, addr: u32) -> usize {
        (addr - self.base) as usize
    }
}

/// Validate a candidate image and produce its descriptor.
///
/// Only inspects `image`; nothing is mapped or copied.
pub fn validate(image: &[u8], base: u32) -> Result<HeaderDescriptor, LoaderError> {
    let header = BlitHeader::parse(image)?;
    let mut descriptor = HeaderDescriptor::resolve(&header, image.len(), base)?;
    descriptor.device = DeviceTag::read(image, &header);

    debug!(
        "BLIT header valid: init={}, tick={}, render={}, extent=[0x{:08x}, 0x{:08x})",
        descriptor.init, descriptor.tick, descriptor.render, descriptor.start, descriptor.end
    );

    Ok(descriptor)
}
