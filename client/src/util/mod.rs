//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate environment concerns (persistent storage, page
//! navigation) from session and routing logic to improve reuse and
//! testability.

pub mod credentials;
pub mod navigation;
