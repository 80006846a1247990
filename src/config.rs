//! `FontMod.yaml` loading.
//!
//! Values that are present but cannot be read as the expected type are
//! treated as absent, so they never raise an override bit.

use crate::font::LogFont;
use crate::policy::{FaceMatch, FontPolicy, OverrideTable};
use crate::stock::StockFontPolicy;
use crate::Result;
use log::warn;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_FILE: &str = "FontMod.yaml";
pub const LOG_FILE: &str = "FontMod.log";
pub const FONTS_DIR: &str = "fonts";

pub const DEFAULT_CONFIG: &str = include_str!("default.yaml");

/// Everything the engine needs from the configuration file.
#[derive(Debug, Default)]
pub struct Settings {
    pub table: OverrideTable,
    pub stock: StockFontPolicy,
    pub debug: bool,
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawConfig = serde_yaml::from_str(text)?;
        Ok(raw.into_settings())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Writes [`DEFAULT_CONFIG`] to `path` unless a file is already there.
    /// Returns whether it wrote one.
    pub fn write_default(path: &Path) -> Result<bool> {
        match fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                use std::io::Write;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    #[serde(deserialize_with = "in_order")]
    fonts: Vec<(String, Value)>,
    #[serde(rename = "fixGSOFont")]
    fix_gso_font: Option<Value>,
    #[serde(rename = "faceMatch", deserialize_with = "lenient")]
    face_match: Option<FaceMatch>,
    #[serde(deserialize_with = "lenient")]
    debug: Option<bool>,
}

impl RawConfig {
    fn into_settings(self) -> Settings {
        let mut table = OverrideTable::new(self.face_match.unwrap_or_default());
        for (face, value) in self.fonts {
            match RawFont::from_value(value).and_then(|f| f.policy()) {
                Some(policy) => table.insert(&face, policy),
                None => warn!(target: "DllMain", "font \"{}\" has no usable replacement", face),
            }
        }

        let stock = match self.fix_gso_font {
            None => StockFontPolicy::Disabled,
            Some(Value::Mapping(map)) => RawFont::from_value(Value::Mapping(map))
                .and_then(|f| f.descriptor())
                .map(StockFontPolicy::UseConfiguredFont)
                .unwrap_or(StockFontPolicy::Disabled),
            Some(value) => match bool::from_value(&value) {
                Some(true) => StockFontPolicy::UseAmbientFont,
                _ => StockFontPolicy::Disabled,
            },
        };

        Settings { table, stock, debug: self.debug.unwrap_or(false) }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawFont {
    #[serde(deserialize_with = "lenient")]
    replace: Option<String>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    size: Option<i32>,
    #[serde(deserialize_with = "lenient")]
    width: Option<i32>,
    #[serde(deserialize_with = "lenient")]
    weight: Option<i32>,
    #[serde(deserialize_with = "lenient")]
    italic: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    under_line: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    strike_out: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    char_set: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    out_precision: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    clip_precision: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    quality: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    pitch_and_family: Option<u8>,
}

impl RawFont {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Mapping(_) => serde_yaml::from_value(value).ok(),
            _ => None,
        }
    }

    /// `replace` wins over its older spelling `name`.
    fn face(&self) -> Option<&str> {
        self.replace.as_deref().or_else(|| self.name.as_deref())
    }

    fn policy(&self) -> Option<FontPolicy> {
        let mut policy = FontPolicy::new(self.face()?)?;
        if let Some(v) = self.size {
            policy = policy.height(v);
        }
        if let Some(v) = self.width {
            policy = policy.width(v);
        }
        if let Some(v) = self.weight {
            policy = policy.weight(v);
        }
        if let Some(v) = self.italic {
            policy = policy.italic(v);
        }
        if let Some(v) = self.under_line {
            policy = policy.underline(v);
        }
        if let Some(v) = self.strike_out {
            policy = policy.strike_out(v);
        }
        if let Some(v) = self.char_set {
            policy = policy.char_set(v);
        }
        if let Some(v) = self.out_precision {
            policy = policy.out_precision(v);
        }
        if let Some(v) = self.clip_precision {
            policy = policy.clip_precision(v);
        }
        if let Some(v) = self.quality {
            policy = policy.quality(v);
        }
        if let Some(v) = self.pitch_and_family {
            policy = policy.pitch_and_family(v);
        }
        Some(policy)
    }

    /// A full descriptor; unspecified fields are zero.
    fn descriptor(&self) -> Option<LogFont> {
        let face = self.face().filter(|f| !f.is_empty())?;
        let mut font = LogFont::with_face(face);
        font.height = self.size.unwrap_or(0);
        font.width = self.width.unwrap_or(0);
        font.weight = self.weight.unwrap_or(0);
        font.italic = self.italic.unwrap_or(false) as u8;
        font.underline = self.under_line.unwrap_or(false) as u8;
        font.strike_out = self.strike_out.unwrap_or(false) as u8;
        font.char_set = self.char_set.unwrap_or(0);
        font.out_precision = self.out_precision.unwrap_or(0);
        font.clip_precision = self.clip_precision.unwrap_or(0);
        font.quality = self.quality.unwrap_or(0);
        font.pitch_and_family = self.pitch_and_family.unwrap_or(0);
        Some(font)
    }
}

/// A YAML scalar read the forgiving way.
trait Scalar: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

fn parse_scalar<T: FromStr>(value: &Value) -> Option<T> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Scalar for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        parse_scalar(value)
    }
}

impl Scalar for u8 {
    fn from_value(value: &Value) -> Option<Self> {
        parse_scalar(value)
    }
}

impl Scalar for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "y" => Some(true),
                "false" | "no" | "off" | "n" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Scalar for FaceMatch {
    fn from_value(value: &Value) -> Option<Self> {
        let text = String::from_value(value)?;
        match text.trim().to_ascii_lowercase().as_str() {
            "exact" => Some(FaceMatch::Exact),
            "ignorecase" => Some(FaceMatch::IgnoreCase),
            _ => {
                warn!(target: "DllMain", "unknown faceMatch \"{}\", using exact", text);
                None
            }
        }
    }
}

impl Scalar for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Scalar,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::from_value(&value))
}

/// Keeps mapping entries in document order so later duplicates win.
fn in_order<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<(String, Value)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of face names")
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::new();
            while let Some((key, value)) = map.next_entry::<Value, Value>()? {
                match String::from_value(&key) {
                    Some(face) => entries.push((face, value)),
                    None => warn!(target: "DllMain", "ignoring non-scalar font key"),
                }
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(Entries)
}
