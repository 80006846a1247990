use std::env;
use std::fs;

const EXPORTS: &str = "winmm.exports";
const SYSTEM_WINMM: &str = r"C:\Windows\System32\winmm";

fn main() {
    println!("cargo:rerun-if-changed={}", EXPORTS);

    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    if os != "windows" || target_env != "msvc" {
        return;
    }

    let table = fs::read_to_string(EXPORTS).expect("winmm.exports is missing");
    for line in table.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')) {
        let mut fields = line.split_whitespace();
        let (name, ordinal) = match (fields.next(), fields.next()) {
            (Some(name), Some(ordinal)) => (name, ordinal),
            _ => panic!("malformed export line '{}'", line),
        };

        let arg = if fields.next() == Some("noname") {
            format!("/EXPORT:{}={}.#{},@{},NONAME", name, SYSTEM_WINMM, ordinal, ordinal)
        } else {
            format!("/EXPORT:{}={}.{},@{}", name, SYSTEM_WINMM, name, ordinal)
        };
        println!("cargo:rustc-cdylib-link-arg={}", arg);
    }
}
