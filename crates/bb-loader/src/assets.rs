//! Embedded resource registry

use crate::cartridge::CartridgeImage;
use bb_core::error::{AssetError, LoaderError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Opaque asset identifier assigned by the build tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the resource table produced alongside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: AssetId,
    /// Absolute address of the first byte
    pub addr: u32,
    pub len: u32,
}

impl ResourceEntry {
    pub fn new(id: u32, addr: u32, len: u32) -> Self {
        Self {
            id: AssetId(id),
            addr,
            len,
        }
    }
}

/// Borrowed view of an asset inside the image arena; cannot outlive the registry
#[derive(Debug, PartialEq, Eq)]
pub struct Asset<'a> {
    id: AssetId,
    addr: u32,
    data: &'a [u8],
}

impl<'a> Asset<'a> {
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Absolute address of the first byte
    pub fn addr(&self) -> u32 {
        self.addr
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    addr: u32,
    offset: usize,
    len: usize,
}

/// Immutable, bounds-checked lookup of the assets embedded in an image
#[derive(Debug)]
pub struct AssetRegistry {
    image: Arc<CartridgeImage>,
    spans: HashMap<AssetId, Span>,
}

impl AssetRegistry {
    /// Build the registry from a resource table.
    ///
    /// Every entry is checked against the image's owned extent; the first
    /// entry that falls outside fails the whole build.
    pub fn build<I>(table: I, image: Arc<CartridgeImage>) -> Result<Self, LoaderError>
    where
        I: IntoIterator<Item = ResourceEntry>,
    {
        let descriptor = *image.descriptor();
        let mut spans = HashMap::new();

        for entry in table {
            if !descriptor.contains(entry.addr, entry.len) {
                return Err(LoaderError::AssetOutOfBounds {
                    id: entry.id.0,
                    addr: entry.addr,
                    len: entry.len,
                    start: descriptor.start,
                    end: descriptor.end,
                });
            }

            let span = Span {
                addr: entry.addr,
                offset: descriptor.offset_of(entry.addr),
                len: entry.len as usize,
            };

            if spans.insert(entry.id, span).is_some() {
                return Err(LoaderError::DuplicateAsset { id: entry.id.0 });
            }

            debug!(
                "Asset {}: 0x{:08x}, {} bytes",
                entry.id, entry.addr, entry.len
            );
        }

        info!("Asset registry built with {} entries", spans.len());

        Ok(Self { image, spans })
    }

    /// Registry for an image that ships no resource table
    pub fn empty(image: Arc<CartridgeImage>) -> Self {
        Self {
            image,
            spans: HashMap::new(),
        }
    }

    /// Look up an asset by id
    pub fn get(&self, id: AssetId) -> Result<Asset<'_>, AssetError> {
        let span = self.spans.get(&id).ok_or(AssetError::NotFound(id.0))?;
        Ok(Asset {
            id,
            addr: span.addr,
            data: &self.image.bytes()[span.offset..span.offset + span.len],
        })
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.spans.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Asset ids in ascending order
    pub fn ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<_> = self.spans.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The image this registry borrows from
    pub fn image(&self) -> &Arc<CartridgeImage> {
        &self.image
    }
}
