//! File-level pipeline stages:
//! - **discovery**: find candidate images in a directory
//! - **decode**: load and decode images with size limits
//! - **bulk**: tag a whole folder and write sidecars

pub mod bulk;
pub mod decode;
pub mod discovery;

pub use bulk::BulkRunner;
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
