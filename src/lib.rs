//! Redirects GDI font creation to operator-configured typefaces.
//!
//! Built as a `winmm.dll` stand-in: every multimedia export is forwarded to
//! the system library, while `DllMain` patches `CreateFontIndirectW` and
//! `GetStockObject` in `gdi32.dll` so font requests pass through an
//! [`OverrideTable`] first.

pub use error::*;
pub use engine::Engine;
pub use font::{LogFont, RawHandle, LF_FACESIZE};
pub use hook::{Hook, InterceptionRecord, PageAccess};
pub use policy::{FaceMatch, FontPolicy, OverrideMask, OverrideTable, Resolution};
pub use stock::{FontBackend, StockFont, StockFontPolicy};

mod error;
pub mod config;
pub mod engine;
pub mod font;
pub mod hook;
pub mod logging;
pub mod policy;
pub mod stock;
pub mod user_fonts;

#[cfg(windows)]
mod platform;

/// Bytes overwritten at the start of a hooked function.
const PATCH_SIZE: usize = 5;

#[cfg(target_pointer_width = "32")]
const RETURN_JMP_SIZE: usize = 5;

#[cfg(target_pointer_width = "64")]
const RETURN_JMP_SIZE: usize = 14;
