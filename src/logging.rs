use crate::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Routes `log` records to `path`, one `[target] message` line each.
/// Only the first call in a process takes effect.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let _ = Builder::new()
        .filter_level(LevelFilter::Debug)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.target(), record.args()))
        .target(Target::Pipe(Box::new(file)))
        .try_init();
    Ok(())
}

pub fn flush() {
    log::logger().flush();
}
