//! Font override policies and the table they are looked up in.
//!
//! A [`FontPolicy`] always replaces the requested face name; every other field
//! is only written when its bit is present in the policy's [`OverrideMask`].

use crate::font::LogFont;
use bitflags::bitflags;
use std::collections::HashMap;
use widestring::{U16Str, U16String};

bitflags! {
    /// Fields of a [`LogFont`] a policy is allowed to overwrite.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OverrideMask: u32 {
        const HEIGHT = 1 << 1;
        const WIDTH = 1 << 2;
        const WEIGHT = 1 << 3;
        const ITALIC = 1 << 4;
        const UNDERLINE = 1 << 5;
        const STRIKE_OUT = 1 << 6;
        const CHAR_SET = 1 << 7;
        const OUT_PRECISION = 1 << 8;
        const CLIP_PRECISION = 1 << 9;
        const QUALITY = 1 << 10;
        const PITCH_AND_FAMILY = 1 << 11;
    }
}

/// One override rule. Field values are private so they can only be set
/// together with their mask bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontPolicy {
    replacement: U16String,
    mask: OverrideMask,
    height: i32,
    width: i32,
    weight: i32,
    italic: bool,
    underline: bool,
    strike_out: bool,
    char_set: u8,
    out_precision: u8,
    clip_precision: u8,
    quality: u8,
    pitch_and_family: u8,
}

macro_rules! setter {
    ($name:ident, $field:ident, $ty:ty, $bit:ident) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.$field = value;
            self.mask |= OverrideMask::$bit;
            self
        }
    };
}

impl FontPolicy {
    /// A name-only policy. Returns `None` for an empty replacement.
    pub fn new(replacement: &str) -> Option<Self> {
        if replacement.is_empty() {
            return None;
        }

        Some(Self {
            replacement: U16String::from_str(replacement),
            mask: OverrideMask::empty(),
            height: 0,
            width: 0,
            weight: 0,
            italic: false,
            underline: false,
            strike_out: false,
            char_set: 0,
            out_precision: 0,
            clip_precision: 0,
            quality: 0,
            pitch_and_family: 0,
        })
    }

    setter!(height, height, i32, HEIGHT);
    setter!(width, width, i32, WIDTH);
    setter!(weight, weight, i32, WEIGHT);
    setter!(italic, italic, bool, ITALIC);
    setter!(underline, underline, bool, UNDERLINE);
    setter!(strike_out, strike_out, bool, STRIKE_OUT);
    setter!(char_set, char_set, u8, CHAR_SET);
    setter!(out_precision, out_precision, u8, OUT_PRECISION);
    setter!(clip_precision, clip_precision, u8, CLIP_PRECISION);
    setter!(quality, quality, u8, QUALITY);
    setter!(pitch_and_family, pitch_and_family, u8, PITCH_AND_FAMILY);

    pub fn replacement(&self) -> &U16Str {
        &self.replacement
    }

    pub fn mask(&self) -> OverrideMask {
        self.mask
    }

    /// Merges this policy onto `font`: the name always, other fields per mask.
    pub fn apply(&self, font: &mut LogFont) {
        font.set_face_name(&self.replacement);

        let mask = self.mask;
        if mask.contains(OverrideMask::HEIGHT) {
            font.height = self.height;
        }
        if mask.contains(OverrideMask::WIDTH) {
            font.width = self.width;
        }
        if mask.contains(OverrideMask::WEIGHT) {
            font.weight = self.weight;
        }
        if mask.contains(OverrideMask::ITALIC) {
            font.italic = self.italic as u8;
        }
        if mask.contains(OverrideMask::UNDERLINE) {
            font.underline = self.underline as u8;
        }
        if mask.contains(OverrideMask::STRIKE_OUT) {
            font.strike_out = self.strike_out as u8;
        }
        if mask.contains(OverrideMask::CHAR_SET) {
            font.char_set = self.char_set;
        }
        if mask.contains(OverrideMask::OUT_PRECISION) {
            font.out_precision = self.out_precision;
        }
        if mask.contains(OverrideMask::CLIP_PRECISION) {
            font.clip_precision = self.clip_precision;
        }
        if mask.contains(OverrideMask::QUALITY) {
            font.quality = self.quality;
        }
        if mask.contains(OverrideMask::PITCH_AND_FAMILY) {
            font.pitch_and_family = self.pitch_and_family;
        }
    }
}

/// How requested face names are compared against table keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceMatch {
    Exact,
    /// Unicode lowercase folding. Unpaired surrogates are kept as-is, so
    /// malformed names only match themselves.
    IgnoreCase,
}

impl Default for FaceMatch {
    fn default() -> Self {
        FaceMatch::Exact
    }
}

impl FaceMatch {
    fn key(self, name: &U16Str) -> U16String {
        match self {
            FaceMatch::Exact => name.to_owned(),
            FaceMatch::IgnoreCase => {
                let mut key = U16String::new();
                let mut buf = [0u16; 2];
                for unit in char::decode_utf16(name.as_slice().iter().copied()) {
                    match unit {
                        Ok(c) => {
                            for lower in c.to_lowercase() {
                                key.push_slice(lower.encode_utf16(&mut buf));
                            }
                        }
                        Err(err) => key.push_slice([err.unpaired_surrogate()]),
                    }
                }
                key
            }
        }
    }
}

/// Outcome of resolving one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Matched,
    Unmatched,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Matched => "matched",
            Resolution::Unmatched => "unmatched",
        }
    }
}

/// Face name to policy map. Built once, read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct OverrideTable {
    matching: FaceMatch,
    policies: HashMap<U16String, FontPolicy>,
}

impl OverrideTable {
    pub fn new(matching: FaceMatch) -> Self {
        Self { matching, policies: HashMap::new() }
    }

    /// Adds a rule. A later rule for the same key replaces the earlier one.
    pub fn insert(&mut self, face: &str, policy: FontPolicy) {
        let key = self.matching.key(U16String::from_str(face).as_ustr());
        self.policies.insert(key, policy);
    }

    pub fn get(&self, face: &U16Str) -> Option<&FontPolicy> {
        self.policies.get(&self.matching.key(face))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Single pass: one lookup on the requested name, at most one merge. A
    /// replacement that is itself a key is not looked up again.
    pub fn resolve(&self, request: &mut LogFont) -> Resolution {
        match self.get(request.face_name()) {
            Some(policy) => {
                policy.apply(request);
                Resolution::Matched
            }
            None => Resolution::Unmatched,
        }
    }
}
