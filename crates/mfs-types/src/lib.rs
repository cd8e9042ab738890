//! Foundation types for MFS, the mutable file layer over a content-addressed
//! node graph.
//!
//! Every other MFS crate depends on `mfs-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] -- Content address of an immutable node (BLAKE3 digest plus
//!   the addressing scheme version it was minted under)
//! - [`AddressVersion`] -- Addressing scheme version; anything past `V0`
//!   enables raw leaves for newly written data
//! - [`ContentHasher`] -- Domain-separated BLAKE3 hasher

pub mod error;
pub mod hasher;
pub mod id;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use id::{AddressVersion, NodeId};
