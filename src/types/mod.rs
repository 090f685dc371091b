// Kizuna shared type definitions
// Each submodule defines types used across the archive.

pub mod bookmark;
pub mod change_event;
pub mod errors;
pub mod notice;
pub mod settings;
pub mod view;
