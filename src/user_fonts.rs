use crate::stock::FontBackend;
use crate::Result;
use log::{info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Regular files directly inside `dir`, sorted. A missing directory is empty.
pub fn font_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

/// Registers every file in `dir` as a private font. Returns how many were
/// accepted; nothing here is fatal.
pub fn load_user_fonts<B: FontBackend>(dir: &Path, backend: &B) -> usize {
    let files = match font_files(dir) {
        Ok(files) => files,
        Err(err) => {
            warn!(target: "LoadUserFonts", "exception: \"{}\"", err);
            return 0;
        }
    };

    let mut loaded = 0;
    for path in files {
        let ret = backend.add_private_font(&path);
        info!(
            target: "LoadUserFonts",
            "filename = \"{}\", ret = {}",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            ret
        );
        if ret > 0 {
            loaded += 1;
        }
    }
    loaded
}
