use crate::{Result, Error, PATCH_SIZE, RETURN_JMP_SIZE};
use log::{debug, warn};
use std::convert::TryFrom;
use std::mem::{size_of, transmute_copy};
use std::ptr::copy_nonoverlapping;

/// Memory primitives the interceptor needs from the platform.
pub trait PageAccess {
    /// Makes `len` bytes at `address` writable and returns the protection
    /// that was in effect.
    unsafe fn unprotect(&self, address: *mut u8, len: usize) -> Result<u32>;

    unsafe fn reprotect(&self, address: *mut u8, len: usize, protection: u32) -> Result<()>;

    /// Allocates readable, writable and executable memory that lives until
    /// the process exits.
    fn alloc_executable(&self, len: usize) -> Result<*mut u8>;

    unsafe fn flush(&self, _address: *const u8, _len: usize) {}
}

/// `mov edi, edi; push ebp; mov ebp, esp`. Replaying it verbatim from the
/// trampoline is equivalent to running it in place.
pub const HOT_PATCH_PROLOGUE: [u8; PATCH_SIZE] = [0x8B, 0xFF, 0x55, 0x8B, 0xEC];

/// What a successful patch left behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterceptionRecord {
    pub target: usize,
    pub resume: usize,
    pub protection: u32,
}

/// A near `jmp rel32` placed at `from`.
pub fn rel32_jmp(from: usize, to: usize) -> Result<[u8; PATCH_SIZE]> {
    let disp = to as i128 - (from as i128 + PATCH_SIZE as i128);
    let disp = i32::try_from(disp).map_err(|_| Error::OutOfRange { from, to })?;

    let mut bytes = [0xE9, 0, 0, 0, 0];
    bytes[1..].copy_from_slice(&disp.to_le_bytes());
    Ok(bytes)
}

/// The jump a trampoline uses to get back into the original body.
pub fn return_jmp(from: usize, to: usize) -> Result<Vec<u8>> {
    if cfg!(target_pointer_width = "32") {
        Ok(rel32_jmp(from, to)?.to_vec())
    } else if cfg!(target_pointer_width = "64") {
        let mut jmp_bytes = vec![0xFF, 0x25, 0x00, 0x00, 0x00, 0x00];
        jmp_bytes.extend_from_slice(&(to as u64).to_le_bytes());
        Ok(jmp_bytes)
    } else {
        Err(Error::OutOfRange { from, to })
    }
}

/// An inline hook on a hot-patchable entry point.
///
/// The first [`PATCH_SIZE`] bytes of the target are replaced with a jump to
/// the replacement. The original body stays reachable through a trampoline
/// that replays the overwritten prologue and jumps to `target + PATCH_SIZE`.
/// Hooks are never removed and the trampoline is never freed.
#[derive(Debug)]
pub struct Hook {
    target: usize,
    gateway: usize,
}

impl Hook {
    /// Builds the trampoline without touching the target.
    ///
    /// Only the x86 hot-patch prologue is accepted; any other entry is
    /// refused with [`Error::UnsupportedPrologue`] so it stays unhooked.
    ///
    /// # Safety
    /// `target` must point at least [`PATCH_SIZE`] readable bytes.
    pub unsafe fn prepare<A: PageAccess>(target: *mut u8, access: &A) -> Result<Self> {
        let mut prologue = [0u8; PATCH_SIZE];
        copy_nonoverlapping(target as *const u8, prologue.as_mut_ptr(), PATCH_SIZE);
        if prologue != HOT_PATCH_PROLOGUE {
            return Err(Error::UnsupportedPrologue { address: target as usize, bytes: prologue });
        }

        let gateway = access.alloc_executable(PATCH_SIZE + RETURN_JMP_SIZE)?;
        if gateway.is_null() {
            return Err(Error::TrampolineAlloc);
        }

        copy_nonoverlapping(target as *const u8, gateway, PATCH_SIZE);

        let jmp_bytes = return_jmp(
            gateway as usize + PATCH_SIZE,
            target as usize + PATCH_SIZE,
        )?;
        copy_nonoverlapping(jmp_bytes.as_ptr(), gateway.add(PATCH_SIZE), jmp_bytes.len());
        access.flush(gateway, PATCH_SIZE + jmp_bytes.len());

        debug!(target: "hook", "trampoline for {:#x} at {:#x}", target as usize, gateway as usize);
        Ok(Self { target: target as usize, gateway: gateway as usize })
    }

    /// Redirects the target to `replacement`.
    ///
    /// On `Err` the target bytes are untouched and the function behaves as
    /// before. A failure to restore the old protection after the write is
    /// only logged, since the jump is already live at that point.
    ///
    /// # Safety
    /// No other thread may be executing the first [`PATCH_SIZE`] bytes of the
    /// target while it is written.
    pub unsafe fn install<A: PageAccess>(
        &self,
        replacement: *const u8,
        access: &A,
    ) -> Result<InterceptionRecord> {
        let jmp_bytes = rel32_jmp(self.target, replacement as usize)?;
        let src = self.target as *mut u8;

        let protection = access.unprotect(src, PATCH_SIZE)?;
        copy_nonoverlapping(jmp_bytes.as_ptr(), src, PATCH_SIZE);
        if let Err(err) = access.reprotect(src, PATCH_SIZE, protection) {
            warn!(target: "hook", "{}", err);
        }
        access.flush(src, PATCH_SIZE);

        debug!(
            target: "hook",
            "{:#x} -> {:#x}, resume at {:#x}",
            self.target,
            replacement as usize,
            self.resume()
        );
        Ok(InterceptionRecord { target: self.target, resume: self.resume(), protection })
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// First original instruction after the patched prologue.
    pub fn resume(&self) -> usize {
        self.target + PATCH_SIZE
    }

    pub fn gateway(&self) -> usize {
        self.gateway
    }

    /// The trampoline as a callable of type `F`.
    ///
    /// # Safety
    /// `F` must be a function pointer type with the target's exact signature.
    pub unsafe fn original<F: Copy>(&self) -> F {
        debug_assert_eq!(size_of::<F>(), size_of::<usize>());
        transmute_copy(&self.gateway)
    }
}
