//! Win32 glue: page protection, GDI font services, the two replacement entry
//! points and `DllMain`.

use crate::config::{Settings, CONFIG_FILE, FONTS_DIR, LOG_FILE};
use crate::engine::Engine;
use crate::font::{LogFont, RawHandle};
use crate::hook::PageAccess;
use crate::stock::{FontBackend, StockFont};
use crate::user_fonts::load_user_fonts;
use crate::{logging, Error, Result};
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::mem::size_of;
use std::path::{Path, PathBuf};
use widestring::{U16CString, U16Str};
use windows::core::{s, w, PCSTR, PCWSTR};
use windows::Win32::Foundation::{BOOL, HMODULE, HWND, TRUE};
use windows::Win32::Graphics::Gdi::{AddFontResourceExW, CreateFontIndirectW, FR_PRIVATE, LOGFONTW};
use windows::Win32::System::Diagnostics::Debug::FlushInstructionCache;
use windows::Win32::System::LibraryLoader::{
    DisableThreadLibraryCalls,
    GetModuleFileNameW,
    GetModuleHandleW,
    GetProcAddress
};
use windows::Win32::System::Memory::{
    PAGE_PROTECTION_FLAGS,
    VirtualProtect,
    VirtualAlloc,
    PAGE_EXECUTE_READWRITE,
    MEM_COMMIT,
    MEM_RESERVE
};
use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};
use windows::Win32::System::Threading::GetCurrentProcess;
use windows::Win32::UI::WindowsAndMessaging::{
    MessageBoxW,
    SystemParametersInfoW,
    MB_ICONERROR,
    NONCLIENTMETRICSW,
    SPI_GETNONCLIENTMETRICS,
    SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS
};

const _: () = assert!(size_of::<LogFont>() == size_of::<LOGFONTW>());

type CreateFontIndirectWFn = unsafe extern "system" fn(*const LogFont) -> RawHandle;
type GetStockObjectFn = unsafe extern "system" fn(i32) -> RawHandle;

static ENGINE: OnceCell<Engine> = OnceCell::new();

pub struct WinPageAccess;

impl PageAccess for WinPageAccess {
    unsafe fn unprotect(&self, address: *mut u8, len: usize) -> Result<u32> {
        let mut protection = PAGE_PROTECTION_FLAGS::default();
        VirtualProtect(address as *const c_void, len, PAGE_EXECUTE_READWRITE, &mut protection)
            .map_err(|err| Error::PatchFailure {
                address: address as usize,
                reason: err.to_string(),
            })?;
        Ok(protection.0)
    }

    unsafe fn reprotect(&self, address: *mut u8, len: usize, protection: u32) -> Result<()> {
        let mut previous = PAGE_PROTECTION_FLAGS::default();
        VirtualProtect(
            address as *const c_void,
            len,
            PAGE_PROTECTION_FLAGS(protection),
            &mut previous
        )?;
        Ok(())
    }

    fn alloc_executable(&self, len: usize) -> Result<*mut u8> {
        let gateway = unsafe {
            VirtualAlloc(
                None,
                len,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_EXECUTE_READWRITE
            )
        };

        if gateway.is_null() {
            return Err(Error::TrampolineAlloc);
        }
        Ok(gateway as *mut u8)
    }

    unsafe fn flush(&self, address: *const u8, len: usize) {
        let _ = FlushInstructionCache(GetCurrentProcess(), Some(address as *const c_void), len);
    }
}

pub struct GdiBackend;

impl FontBackend for GdiBackend {
    fn create_font(&self, font: &LogFont) -> Option<RawHandle> {
        let handle = unsafe { CreateFontIndirectW(font as *const LogFont as *const LOGFONTW) };
        Some(RawHandle(handle.0 as isize)).filter(|h| !h.is_null())
    }

    fn message_font(&self) -> Result<LogFont> {
        let mut ncm = NONCLIENTMETRICSW {
            cbSize: size_of::<NONCLIENTMETRICSW>() as u32,
            ..Default::default()
        };

        unsafe {
            SystemParametersInfoW(
                SPI_GETNONCLIENTMETRICS,
                ncm.cbSize,
                Some(&mut ncm as *mut NONCLIENTMETRICSW as *mut c_void),
                SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0)
            )
        }
        .map_err(|err| Error::AmbientQuery(err.to_string()))?;

        Ok(unsafe { *(&ncm.lfMessageFont as *const LOGFONTW as *const LogFont) })
    }

    fn add_private_font(&self, path: &Path) -> i32 {
        match U16CString::from_os_str(path.as_os_str()) {
            Ok(name) => unsafe { AddFontResourceExW(PCWSTR(name.as_ptr()), FR_PRIVATE, None) },
            Err(_) => 0,
        }
    }
}

unsafe extern "system" fn create_font_indirect_w(lplf: *const LogFont) -> RawHandle {
    let (engine, hook) = match ENGINE.get().and_then(|e| e.create_font_hook().map(|h| (e, h))) {
        Some(found) => found,
        None => return RawHandle::NULL,
    };
    let original: CreateFontIndirectWFn = hook.original();

    if lplf.is_null() {
        return original(lplf);
    }

    // Rewrite a copy; the caller's descriptor may live in read-only memory.
    let mut request = *lplf;
    engine.create_font(&mut request, |font| original(font))
}

unsafe extern "system" fn get_stock_object(i: i32) -> RawHandle {
    let (engine, hook) = match ENGINE.get().and_then(|e| e.stock_object_hook().map(|h| (e, h))) {
        Some(found) => found,
        None => return RawHandle::NULL,
    };
    let original: GetStockObjectFn = hook.original();

    engine.stock_object(i, |code| original(code))
}

unsafe fn export(module: HMODULE, name: PCSTR) -> Option<*mut u8> {
    GetProcAddress(module, name).map(|f| f as usize as *mut u8)
}

fn module_dir(module: HMODULE) -> Result<PathBuf> {
    let mut buf = vec![0u16; 32768];
    let len = unsafe { GetModuleFileNameW(module, &mut buf) } as usize;
    if len == 0 {
        return Err(windows::core::Error::from_win32().into());
    }

    let path = PathBuf::from(U16Str::from_slice(&buf[..len]).to_os_string());
    Ok(path.parent().map(Path::to_path_buf).unwrap_or_default())
}

fn show_error(message: &str) {
    let text = U16CString::from_str_truncate(message);
    unsafe {
        let _ = MessageBoxW(HWND::default(), PCWSTR(text.as_ptr()), w!("Error"), MB_ICONERROR);
    }
}

fn attach(module: HMODULE) -> Result<()> {
    let dir = module_dir(module)?;
    let config_path = dir.join(CONFIG_FILE);
    let _ = Settings::write_default(&config_path);

    let settings = match Settings::load(&config_path) {
        Ok(settings) => settings,
        Err(err) => {
            show_error(&format!("LoadSettings error.\n{}", err));
            return Ok(());
        }
    };

    if settings.debug {
        if let Err(err) = logging::init(&dir.join(LOG_FILE)) {
            show_error(&format!("Can not open {}.\n{}", LOG_FILE, err));
        }
    }

    let backend = GdiBackend;
    load_user_fonts(&dir.join(FONTS_DIR), &backend);

    let stock = StockFont::resolve(&settings.stock, &backend);
    let mut engine = Engine::new(settings.table, stock);
    info!(target: "DllMain", "{} font overrides", engine.table().len());

    let access = WinPageAccess;
    let gdi32 = unsafe { GetModuleHandleW(w!("gdi32.dll")) }?;
    unsafe {
        if let Some(target) = export(gdi32, s!("GetStockObject")) {
            if let Err(err) = engine.prepare_stock_object(target, &access) {
                warn!(target: "DllMain", "GetStockObject: {}", err);
            }
        }
        if let Some(target) = export(gdi32, s!("CreateFontIndirectW")) {
            if let Err(err) = engine.prepare_create_font(target, &access) {
                warn!(target: "DllMain", "CreateFontIndirectW: {}", err);
            }
        }
    }

    if ENGINE.set(engine).is_err() {
        return Ok(());
    }

    if let Some(engine) = ENGINE.get() {
        let results = unsafe {
            engine.install(
                create_font_indirect_w as usize as *const u8,
                get_stock_object as usize as *const u8,
                &access,
            )
        };
        for (name, result) in results {
            match result {
                Ok(record) => info!(
                    target: "DllMain",
                    "{} hooked at {:#x}, original resumes at {:#x}",
                    name,
                    record.target,
                    record.resume
                ),
                Err(err) => warn!(target: "DllMain", "{} left unhooked: {}", name, err),
            }
        }
    }
    Ok(())
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(module: HMODULE, reason: u32, _reserved: *mut c_void) -> BOOL {
    match reason {
        DLL_PROCESS_ATTACH => {
            let _ = unsafe { DisableThreadLibraryCalls(module) };
            if let Err(err) = attach(module) {
                warn!(target: "DllMain", "{}", err);
            }
        }
        DLL_PROCESS_DETACH => logging::flush(),
        _ => {}
    }

    TRUE
}
