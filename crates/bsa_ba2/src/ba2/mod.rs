//! Chunked archives (`BTDX`), holding either general files or headerless textures.

pub mod read;
pub mod types;

pub use types::{Ba2Header, Ba2Kind, GeneralRecord, TextureChunk, TextureRecord};
