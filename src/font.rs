use std::fmt;
use widestring::{U16Str, U16String};

/// Length of the face name buffer, terminator included.
pub const LF_FACESIZE: usize = 32;

/// Opaque GDI object handle as it crosses the patched ABI.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawHandle(pub isize);

impl RawHandle {
    pub const NULL: RawHandle = RawHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A font creation request, laid out exactly like `LOGFONTW` so a caller's
/// pointer can be reinterpreted in place.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LogFont {
    pub height: i32,
    pub width: i32,
    pub escapement: i32,
    pub orientation: i32,
    pub weight: i32,
    pub italic: u8,
    pub underline: u8,
    pub strike_out: u8,
    pub char_set: u8,
    pub out_precision: u8,
    pub clip_precision: u8,
    pub quality: u8,
    pub pitch_and_family: u8,
    pub face_name: [u16; LF_FACESIZE],
}

impl Default for LogFont {
    fn default() -> Self {
        Self {
            height: 0,
            width: 0,
            escapement: 0,
            orientation: 0,
            weight: 0,
            italic: 0,
            underline: 0,
            strike_out: 0,
            char_set: 0,
            out_precision: 0,
            clip_precision: 0,
            quality: 0,
            pitch_and_family: 0,
            face_name: [0; LF_FACESIZE],
        }
    }
}

impl LogFont {
    pub fn with_face(face: &str) -> Self {
        let mut font = Self::default();
        font.set_face_name(U16String::from_str(face).as_ustr());
        font
    }

    /// The face name up to (not including) the first NUL.
    pub fn face_name(&self) -> &U16Str {
        let len = self
            .face_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(LF_FACESIZE);
        U16Str::from_slice(&self.face_name[..len])
    }

    /// Replaces the face name, truncating to `LF_FACESIZE - 1` units so the
    /// buffer always stays NUL-terminated.
    pub fn set_face_name(&mut self, name: &U16Str) {
        let units = name.as_slice();
        let len = units.len().min(LF_FACESIZE - 1);
        self.face_name = [0; LF_FACESIZE];
        self.face_name[..len].copy_from_slice(&units[..len]);
    }
}

impl fmt::Debug for LogFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name = \"{}\", height = {}, width = {}, escapement = {}, \
             orientation = {}, weight = {}, italic = {}, underline = {}, \
             strikeout = {}, charset = {}, outprecision = {}, clipprecision = {}, \
             quality = {}, pitchandfamily = {}",
            self.face_name().to_string_lossy(),
            self.height,
            self.width,
            self.escapement,
            self.orientation,
            self.weight,
            self.italic != 0,
            self.underline != 0,
            self.strike_out != 0,
            self.char_set,
            self.out_precision,
            self.clip_precision,
            self.quality,
            self.pitch_and_family
        )
    }
}
