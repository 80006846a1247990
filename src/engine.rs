//! Process-wide state shared by the two replacement entry points.
//!
//! An [`Engine`] is fully built (table, stock font, trampolines) before any
//! target is patched and is never mutated afterwards, so the entry points read
//! it without locking.

use crate::font::{LogFont, RawHandle};
use crate::hook::{Hook, InterceptionRecord, PageAccess};
use crate::policy::OverrideTable;
use crate::stock::StockFont;
use crate::Result;
use log::{info, log_enabled, Level};

#[derive(Debug)]
pub struct Engine {
    table: OverrideTable,
    stock: StockFont,
    create_font: Option<Hook>,
    stock_object: Option<Hook>,
}

impl Engine {
    pub fn new(table: OverrideTable, stock: StockFont) -> Self {
        Self { table, stock, create_font: None, stock_object: None }
    }

    pub fn table(&self) -> &OverrideTable {
        &self.table
    }

    pub fn stock(&self) -> &StockFont {
        &self.stock
    }

    /// Builds the trampoline for the font creation entry point.
    ///
    /// # Safety
    /// See [`Hook::prepare`].
    pub unsafe fn prepare_create_font<A: PageAccess>(&mut self, target: *mut u8, access: &A) -> Result<()> {
        self.create_font = Some(Hook::prepare(target, access)?);
        Ok(())
    }

    /// Builds the trampoline for the stock object entry point. Skipped when no
    /// substitute font was resolved, leaving the target unpatched.
    ///
    /// # Safety
    /// See [`Hook::prepare`].
    pub unsafe fn prepare_stock_object<A: PageAccess>(&mut self, target: *mut u8, access: &A) -> Result<bool> {
        if self.stock.handle().is_none() {
            return Ok(false);
        }
        self.stock_object = Some(Hook::prepare(target, access)?);
        Ok(true)
    }

    pub fn create_font_hook(&self) -> Option<&Hook> {
        self.create_font.as_ref()
    }

    pub fn stock_object_hook(&self) -> Option<&Hook> {
        self.stock_object.as_ref()
    }

    /// Patches every prepared target. Each entry point fails independently;
    /// a failed one keeps its original behavior.
    ///
    /// # Safety
    /// See [`Hook::install`]. The engine must already be reachable from the
    /// replacements, since they may run as soon as the jump is written.
    pub unsafe fn install<A: PageAccess>(
        &self,
        create_font: *const u8,
        stock_object: *const u8,
        access: &A,
    ) -> Vec<(&'static str, Result<InterceptionRecord>)> {
        let mut results = Vec::new();
        if let Some(hook) = &self.stock_object {
            results.push(("GetStockObject", hook.install(stock_object, access)));
        }
        if let Some(hook) = &self.create_font {
            results.push(("CreateFontIndirectW", hook.install(create_font, access)));
        }
        results
    }

    /// Font creation dispatch: rewrite the request, then always delegate.
    pub fn create_font<F>(&self, request: &mut LogFont, original: F) -> RawHandle
    where
        F: FnOnce(&LogFont) -> RawHandle,
    {
        let logging = log_enabled!(target: "CreateFont", Level::Info);
        if logging {
            info!(target: "CreateFont", "{:?}", request);
        }

        let outcome = self.table.resolve(request);
        if logging {
            info!(
                target: "CreateFont",
                "{} -> \"{}\"",
                outcome.as_str(),
                request.face_name().to_string_lossy()
            );
        }

        original(request)
    }

    /// Stock object dispatch.
    pub fn stock_object<F>(&self, code: i32, original: F) -> RawHandle
    where
        F: FnOnce(i32) -> RawHandle,
    {
        self.stock.dispatch(code, original)
    }
}
