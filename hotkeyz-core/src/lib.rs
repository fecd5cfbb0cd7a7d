//! `hotkeyz_core` -- Pure Rust engine for hotkeyz.
//!
//! This crate contains all business logic and no C ABI.
//! It can be consumed by:
//! - `hotkeyz-ffi` (C ABI DLL for ctypes / other languages)
//! - `hotkeyz-cli` (standalone CLI tool)
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`keys`] | Virtual keys, modifier sets, key tokens, sequences and chords |
//! | [`layout`] | Character-to-key mapping (`KeyboardLayout`, `UsLayout`) |
//! | [`parser`] | `<mod+key>` key-spec mini-language |
//! | [`input`] | Keyboard and mouse synthesis (`Synthesizer`) |
//! | [`hotkey`] | Global hotkey registry, trigger queue, key-release waits |
//! | [`window`] | Top-level window lookup and geometry |
//! | [`backend`] | Traits between the engine and the OS |
//! | [`platform`] | Win32 backend (stub elsewhere) |
//! | [`engine`] | `Engine` facade and `EngineConfig` |
//! | [`errors`] | Error enums via `thiserror` |
//! | [`status`] | Stable integer status codes for the C boundary |

pub mod backend;
pub mod engine;
pub mod errors;
pub mod hotkey;
pub mod input;
pub mod keys;
pub mod layout;
pub mod parser;
pub mod platform;
pub mod status;
pub mod window;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineConfig};
pub use errors::HotkeyzError;
