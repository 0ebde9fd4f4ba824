//! Error types for the blitbridge runtime

use thiserror::Error;

/// Main error type for the runtime
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Errors raised while validating an image or building its registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Invalid magic: 0x{found:08x} (expected 0x54494c42 \"BLIT\")")]
    InvalidMagic { found: u32 },

    #[error("Invalid bounds: start=0x{start:x}, end=0x{end:x}, image is {image_len} bytes")]
    InvalidBounds { start: u32, end: u32, image_len: usize },

    #[error("Device mismatch: image tagged {found:?}, expected device {expected}")]
    DeviceMismatch { expected: u8, found: Option<u8> },

    #[error("Image truncated: {len} bytes is shorter than the header")]
    Truncated { len: usize },

    #[error("Asset {id} at 0x{addr:08x}+{len} lies outside [0x{start:08x}, 0x{end:08x})")]
    AssetOutOfBounds {
        id: u32,
        addr: u32,
        len: u32,
        start: u32,
        end: u32,
    },

    #[error("Duplicate asset id {id} in resource table")]
    DuplicateAsset { id: u32 },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
}

/// Asset lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(u32),
}

/// Errors raised by the lifecycle invoker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Init fault: {0}")]
    InitFault(String),

    #[error("Runtime fault at tick {tick}: {reason}")]
    RuntimeFault { tick: u32, reason: String },

    #[error("Cannot {op} while {state}")]
    InvalidState { op: &'static str, state: &'static str },

    #[error("Tick id {got} does not follow {last}")]
    NonMonotonicTick { last: u32, got: u32 },

    #[error("Render for tick {got} without a preceding tick call (last ticked {last:?})")]
    RenderBeforeTick { last: Option<u32>, got: u32 },
}

/// Fault reported by a payload hook (bus fault, hard fault, trap...)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookFault(pub String);

impl HookFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, BridgeError>;
