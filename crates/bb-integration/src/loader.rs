//! Game loader for BLIT images
//!
//! Reads an image from disk (or memory), validates it, parses the optional
//! metadata block and builds the asset registry from the resource table
//! supplied by the build tooling.

use bb_core::{BridgeError, Config, Result};
use bb_loader::{
    AssetRegistry, CartridgeImage, CartridgeLoader, GameMetadata, HeaderDescriptor, ResourceEntry,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File extension of game images
pub const GAME_EXTENSION: &str = "blit";

/// A validated image ready to be bound and started
#[derive(Debug)]
pub struct LoadedCartridge {
    /// Image arena shared with the registry
    pub image: Arc<CartridgeImage>,
    /// Metadata block, if the image carries a well-formed one
    pub metadata: Option<GameMetadata>,
    pub registry: AssetRegistry,
    /// Source file, when loaded from disk
    pub path: Option<PathBuf>,
}

impl LoadedCartridge {
    pub fn descriptor(&self) -> &HeaderDescriptor {
        self.image.descriptor()
    }

    /// Display name: metadata title, else file stem
    pub fn title(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .map(|m| m.title.as_str())
            .filter(|t| !t.is_empty())
            .or_else(|| self.path.as_deref()?.file_stem()?.to_str())
    }
}

/// Loads game images into validated cartridges
#[derive(Debug, Clone, Copy)]
pub struct GameLoader {
    loader: CartridgeLoader,
}

impl GameLoader {
    pub fn new(image_base: u32) -> Self {
        Self {
            loader: CartridgeLoader::new(image_base),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            loader: CartridgeLoader::new(config.general.image_base)
                .with_expected_device(config.general.expected_device),
        }
    }

    pub fn image_base(&self) -> u32 {
        self.loader.image_base()
    }

    /// Check an image against the header contract without loading it
    pub fn validate(&self, data: &[u8]) -> Result<HeaderDescriptor> {
        Ok(self.loader.validate(data)?)
    }

    /// Load a game from a file path
    pub fn load<P, I>(&self, path: P, resources: I) -> Result<LoadedCartridge>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = ResourceEntry>,
    {
        let path = path.as_ref();
        info!("Loading game: {}", path.display());

        let data = fs::read(path)?;
        let mut cart = self.load_bytes(data, resources)?;
        cart.path = Some(path.to_path_buf());
        Ok(cart)
    }

    /// Load a game from an in-memory image
    pub fn load_bytes<I>(&self, data: Vec<u8>, resources: I) -> Result<LoadedCartridge>
    where
        I: IntoIterator<Item = ResourceEntry>,
    {
        let image = Arc::new(self.loader.load(data)?);

        let metadata = match GameMetadata::from_image(&image) {
            Ok(Some(meta)) => {
                info!("Game: \"{}\" {} by {}", meta.title, meta.version, meta.author);
                Some(meta)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring metadata block: {}", e);
                None
            }
        };

        let registry = AssetRegistry::build(resources, Arc::clone(&image))?;

        Ok(LoadedCartridge {
            image,
            metadata,
            registry,
            path: None,
        })
    }

    /// List the game images in a directory, sorted by path
    pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BridgeError::Config(format!(
                "Games directory {} does not exist",
                dir.display()
            )));
        }

        let mut games = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_game = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(GAME_EXTENSION));
            if is_game && path.is_file() {
                games.push(path);
            }
        }
        games.sort();

        debug!("Found {} games in {}", games.len(), dir.display());
        Ok(games)
    }
}
