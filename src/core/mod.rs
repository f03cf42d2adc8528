/*!
 * Core Module
 * Fundamental types, limits, error handling and synchronization
 */

pub mod errors;
pub mod id;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use id::{RegistryId, WaitSessionId, WaitableId};
