//! Behavior tests for the prefetch engine.
//!
//! Organized by component: each detector against a scripted host, then
//! the assembled engine's access/fill/feedback paths.



/// Stream detector training, windows, and tier fallback.
pub mod stream;
