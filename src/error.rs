use std::{io, result};
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot change page protection at {address:#x}: {reason}")]
    PatchFailure { address: usize, reason: String },
    #[error("jump from {from:#x} to {to:#x} does not fit a rel32 displacement")]
    OutOfRange { from: usize, to: usize },
    #[error("entry at {address:#x} starts with {bytes:02x?}, not a hot-patch prologue")]
    UnsupportedPrologue { address: usize, bytes: [u8; 5] },
    #[error("cannot allocate trampoline memory")]
    TrampolineAlloc,
    #[error("ambient font query failed: {0}")]
    AmbientQuery(String),
    #[error("invalid config: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("i/o failed '{0}'")]
    Io(#[from] io::Error),
    #[cfg(windows)]
    #[error("windows api failed '{0}'")]
    Windows(#[from] windows::core::Error),
}
