//! Cover artwork resolution and the on-disk artwork cache.
//!
//! Artwork for a track can come from two places:
//! 1. an image file sitting in the track's directory (`cover.jpg`,
//!    `folder.png`, `albumart*.jpeg`, ...), used by path, never copied;
//! 2. picture bytes embedded in the track's own tags, persisted into the
//!    cache directory under a content-addressed name so identical art is
//!    stored exactly once.
//!
//! Which source wins is a user preference, handled by [`resolver`].
//! User-assigned images also live in the cache directory but under random
//! names, which is how they are told apart from embedded ones.

pub mod directory;
pub mod embedded;
pub mod resolver;

pub use directory::{DirectoryArtCache, find_directory_art};
pub use embedded::{EMBEDDED_MARKER, EmbeddedArtIndex, index_embedded_art, save_embedded_art};
pub use resolver::{ArtCaches, resolve_art};
