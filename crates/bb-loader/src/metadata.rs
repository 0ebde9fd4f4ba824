//! Game metadata block (`BLITMETA` / `BLITTYPE`)
//!
//! The build tooling appends an optional metadata block right after the
//! image's owned extent:
//!
//! ```text
//! "BLITMETA" len:u16 | crc32:u32 datetime[16] title[25] description[129] version[17] author[17]
//!                    | ["BLITTYPE" category[17] url[129] count:u8 filetypes[count][5]]
//!                    | icon/splash image data
//! ```
//!
//! Strings are NUL padded. `len` covers everything after the 10-byte prefix.

use crate::cartridge::CartridgeImage;
use bb_core::error::LoaderError;
use tracing::debug;

const META_MAGIC: &[u8; 8] = b"BLITMETA";
const TYPE_MAGIC: &[u8; 8] = b"BLITTYPE";

/// Size of the fixed metadata record
pub const RAW_METADATA_SIZE: usize = 4 + 16 + 25 + 129 + 17 + 17;

const RAW_TYPE_SIZE: usize = 17 + 129 + 1;
const FILETYPE_SIZE: usize = 5;

/// Parsed metadata block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMetadata {
    pub crc32: u32,
    pub datetime: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub type_info: Option<TypeMetadata>,
    /// Packed icon/splash images, left undecoded
    pub images: Vec<u8>,
}

/// Optional launcher type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMetadata {
    pub category: String,
    pub url: String,
    pub filetypes: Vec<String>,
}

impl GameMetadata {
    /// Parse the metadata block following the image's owned extent.
    ///
    /// Returns `Ok(None)` when no block is present.
    pub fn from_image(image: &CartridgeImage) -> Result<Option<Self>, LoaderError> {
        Self::parse(image.trailer())
    }

    /// Parse a metadata block starting at the `BLITMETA` prefix
    pub fn parse(data: &[u8]) -> Result<Option<Self>, LoaderError> {
        if data.len() < 10 || &data[..8] != META_MAGIC {
            debug!("No metadata block");
            return Ok(None);
        }

        let len = u16::from_le_bytes([data[8], data[9]]) as usize;
        let block = data.get(10..10 + len).ok_or_else(|| {
            LoaderError::InvalidMetadata(format!(
                "block claims {} bytes but only {} follow",
                len,
                data.len() - 10
            ))
        })?;

        if block.len() < RAW_METADATA_SIZE {
            return Err(LoaderError::InvalidMetadata(format!(
                "block is {} bytes, need at least {}",
                block.len(),
                RAW_METADATA_SIZE
            )));
        }

        let mut reader = FieldReader::new(block);
        let crc32 = reader.u32();
        let datetime = reader.string(16);
        let title = reader.string(25);
        let description = reader.string(129);
        let version = reader.string(17);
        let author = reader.string(17);

        let type_info = if reader.remaining().starts_with(TYPE_MAGIC) {
            reader.skip(TYPE_MAGIC.len());
            Some(parse_type(&mut reader)?)
        } else {
            None
        };

        Ok(Some(Self {
            crc32,
            datetime,
            title,
            description,
            version,
            author,
            type_info,
            images: reader.remaining().to_vec(),
        }))
    }
}

fn parse_type(reader: &mut FieldReader<'_>) -> Result<TypeMetadata, LoaderError> {
    if reader.remaining().len() < RAW_TYPE_SIZE {
        return Err(LoaderError::InvalidMetadata(
            "truncated BLITTYPE record".to_string(),
        ));
    }

    let category = reader.string(17);
    let url = reader.string(129);
    let count = reader.u8() as usize;

    if reader.remaining().len() < count * FILETYPE_SIZE {
        return Err(LoaderError::InvalidMetadata(format!(
            "BLITTYPE lists {} filetypes but the block ends early",
            count
        )));
    }

    let filetypes = (0..count).map(|_| reader.string(FILETYPE_SIZE)).collect();

    Ok(TypeMetadata {
        category,
        url,
        filetypes,
    })
}

/// Sequential reader over fixed-size fields; callers check lengths first
struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let field = &self.data[self.pos..self.pos + n];
        self.pos += n;
        field
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn u32(&mut self) -> u32 {
        let b = self.take(4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn string(&mut self, n: usize) -> String {
        let field = self.take(n);
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        String::from_utf8_lossy(&field[..end]).to_string()
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
