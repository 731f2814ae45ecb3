//! Legacy indexed archives (`BSA\0`), versions 103 to 105.

pub mod read;
pub mod types;

pub use read::BsaLayout;
pub use types::{ArchiveFlags, BsaHeader, LegacyFile, ModernRecord, Variant};
