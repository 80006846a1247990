//! Substitute for the stock font objects returned by `GetStockObject`.

use crate::font::{LogFont, RawHandle};
use crate::Result;
use log::{debug, info, warn};
use std::path::Path;

pub const OEM_FIXED_FONT: i32 = 10;
pub const ANSI_FIXED_FONT: i32 = 11;
pub const ANSI_VAR_FONT: i32 = 12;
pub const SYSTEM_FONT: i32 = 13;
pub const DEVICE_DEFAULT_FONT: i32 = 14;
pub const SYSTEM_FIXED_FONT: i32 = 16;
pub const DEFAULT_GUI_FONT: i32 = 17;

pub const STOCK_FONT_CODES: [i32; 7] = [
    OEM_FIXED_FONT,
    ANSI_FIXED_FONT,
    ANSI_VAR_FONT,
    SYSTEM_FONT,
    DEVICE_DEFAULT_FONT,
    SYSTEM_FIXED_FONT,
    DEFAULT_GUI_FONT,
];

pub fn is_stock_font(code: i32) -> bool {
    STOCK_FONT_CODES.contains(&code)
}

/// The platform font services the engine consumes.
pub trait FontBackend {
    /// Creates a font handle; `None` when the platform refuses.
    fn create_font(&self, font: &LogFont) -> Option<RawHandle>;

    /// The current UI message font.
    fn message_font(&self) -> Result<LogFont>;

    /// Registers a font file for this process only, returning the number of
    /// faces added.
    fn add_private_font(&self, path: &Path) -> i32;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StockFontPolicy {
    Disabled,
    UseAmbientFont,
    UseConfiguredFont(LogFont),
}

impl Default for StockFontPolicy {
    fn default() -> Self {
        StockFontPolicy::Disabled
    }
}

/// The one substitute handle, resolved at most once.
#[derive(Debug, Default)]
pub struct StockFont {
    handle: Option<RawHandle>,
}

impl StockFont {
    pub fn resolve<B: FontBackend>(policy: &StockFontPolicy, backend: &B) -> Self {
        let handle = match policy {
            StockFontPolicy::Disabled => None,
            StockFontPolicy::UseAmbientFont => match backend.message_font() {
                Ok(font) => {
                    info!(
                        target: "DllMain",
                        "message font face name = \"{}\"",
                        font.face_name().to_string_lossy()
                    );
                    backend.create_font(&font)
                }
                Err(err) => {
                    warn!(target: "DllMain", "{}", err);
                    None
                }
            },
            StockFontPolicy::UseConfiguredFont(font) => backend.create_font(font),
        };

        Self { handle: handle.filter(|h| !h.is_null()) }
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.handle
    }

    /// Whether [`dispatch`](Self::dispatch) answers `code` itself.
    pub fn substitutes(&self, code: i32) -> bool {
        self.handle.is_some() && is_stock_font(code)
    }

    /// Stock font codes get the substitute when there is one; everything else
    /// goes to `original`.
    pub fn dispatch<F>(&self, code: i32, original: F) -> RawHandle
    where
        F: FnOnce(i32) -> RawHandle,
    {
        match self.handle {
            Some(handle) if self.substitutes(code) => {
                debug!(target: "GetStockObject", "code = {}, substitute = {:#x}", code, handle.0);
                handle
            }
            _ => original(code),
        }
    }
}
