use fontmod::config::Settings;
use fontmod::hook::rel32_jmp;
use fontmod::stock::{SYSTEM_FONT, STOCK_FONT_CODES};
use fontmod::{
    Engine, Error, FontBackend, FontPolicy, Hook, LogFont, OverrideMask, OverrideTable,
    PageAccess, RawHandle, Resolution, Result, StockFont, StockFontPolicy,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::path::Path;

struct Gdi {
    created: RefCell<Vec<LogFont>>,
}

impl Gdi {
    fn new() -> Self {
        Self { created: RefCell::new(Vec::new()) }
    }
}

impl FontBackend for Gdi {
    fn create_font(&self, font: &LogFont) -> Option<RawHandle> {
        self.created.borrow_mut().push(*font);
        Some(RawHandle(0x4000))
    }

    fn message_font(&self) -> Result<LogFont> {
        Err(Error::AmbientQuery("unsupported".to_string()))
    }

    fn add_private_font(&self, _path: &Path) -> i32 {
        0
    }
}

struct Locked;

impl PageAccess for Locked {
    unsafe fn unprotect(&self, address: *mut u8, _len: usize) -> Result<u32> {
        Err(Error::PatchFailure { address: address as usize, reason: "denied".to_string() })
    }

    unsafe fn reprotect(&self, _address: *mut u8, _len: usize, _protection: u32) -> Result<()> {
        Ok(())
    }

    fn alloc_executable(&self, len: usize) -> Result<*mut u8> {
        Ok(Box::leak(vec![0u8; len].into_boxed_slice()).as_mut_ptr())
    }
}

#[test]
fn height_only_override() {
    let mut table = OverrideTable::default();
    table.insert("Comic Sans MS", FontPolicy::new("Segoe UI").unwrap().height(-14));

    let mut request = LogFont::with_face("Comic Sans MS");
    request.height = -11;
    request.width = 0;

    assert_eq!(table.resolve(&mut request), Resolution::Matched);
    assert_eq!(request.face_name().to_string_lossy(), "Segoe UI");
    assert_eq!(request.height, -14);
    assert_eq!(request.width, 0);
}

#[test]
fn empty_table_records_miss() {
    let table = OverrideTable::default();
    let mut request = LogFont::with_face("Anything");
    request.weight = 700;
    let before = request;

    assert_eq!(table.resolve(&mut request), Resolution::Unmatched);
    assert_eq!(request, before);
}

#[test]
fn configured_stock_font() {
    let settings = Settings::from_yaml("fixGSOFont:\n  replace: Tahoma\n  size: -12\n").unwrap();
    let gdi = Gdi::new();
    let stock = StockFont::resolve(&settings.stock, &gdi);
    let engine = Engine::new(settings.table, stock);

    let created = gdi.created.borrow()[0];
    assert_eq!(created.face_name().to_string_lossy(), "Tahoma");
    assert_eq!(created.height, -12);

    assert_eq!(engine.stock_object(SYSTEM_FONT, |_| RawHandle(1)), RawHandle(0x4000));
    assert_eq!(engine.stock_object(4, |_| RawHandle(1)), RawHandle(1));
}

#[test]
fn ambient_query_failure_means_passthrough() {
    let gdi = Gdi::new();
    let stock = StockFont::resolve(&StockFontPolicy::UseAmbientFont, &gdi);
    for &code in STOCK_FONT_CODES.iter() {
        assert_eq!(stock.dispatch(code, |c| RawHandle(c as isize)), RawHandle(code as isize));
    }
}

#[test]
fn denied_patch_keeps_original_entry() {
    let mut code = [0x8B, 0xFF, 0x55, 0x8B, 0xEC, 0xC3, 0xCC, 0xCC];
    let pristine = code;

    let mut engine = Engine::new(OverrideTable::default(), StockFont::default());
    unsafe { engine.prepare_create_font(code.as_mut_ptr(), &Locked) }.unwrap();

    let replacement = code.as_ptr() as usize + 0x100;
    let results = unsafe { engine.install(replacement as *const u8, replacement as *const u8, &Locked) };

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "CreateFontIndirectW");
    assert!(matches!(results[0].1, Err(Error::PatchFailure { .. })));
    assert_eq!(code, pristine);
}

#[test]
fn foreign_prologue_leaves_entry_unhooked() {
    let mut code = [0x48, 0xFF, 0x25, 0x11, 0x22, 0x33, 0x44, 0xCC];
    let pristine = code;

    let mut engine = Engine::new(OverrideTable::default(), StockFont::default());
    let prepared = unsafe { engine.prepare_create_font(code.as_mut_ptr(), &Locked) };

    assert!(matches!(prepared, Err(Error::UnsupportedPrologue { .. })));
    assert!(engine.create_font_hook().is_none());

    let replacement = code.as_ptr() as usize + 0x100;
    let results = unsafe { engine.install(replacement as *const u8, replacement as *const u8, &Locked) };
    assert!(results.is_empty());
    assert_eq!(code, pristine);
}

#[test]
fn prepared_hook_is_exposed_to_dispatch() {
    let mut code = [0x8B, 0xFF, 0x55, 0x8B, 0xEC, 0xC3, 0xCC, 0xCC];
    let hook = unsafe { Hook::prepare(code.as_mut_ptr(), &Locked) }.unwrap();
    assert_eq!(hook.resume(), code.as_ptr() as usize + 5);
    assert_eq!(rel32_jmp(0, 5).unwrap(), [0xE9, 0, 0, 0, 0]);
}

fn any_request() -> impl Strategy<Value = LogFont> {
    (
        any::<[i32; 5]>(),
        any::<[u8; 8]>(),
        "[A-Za-z ]{1,31}",
    )
        .prop_map(|(ints, bytes, face)| {
            let mut font = LogFont::with_face(&face);
            font.height = ints[0];
            font.width = ints[1];
            font.escapement = ints[2];
            font.orientation = ints[3];
            font.weight = ints[4];
            font.italic = bytes[0];
            font.underline = bytes[1];
            font.strike_out = bytes[2];
            font.char_set = bytes[3];
            font.out_precision = bytes[4];
            font.clip_precision = bytes[5];
            font.quality = bytes[6];
            font.pitch_and_family = bytes[7];
            font
        })
}

fn any_policy() -> impl Strategy<Value = FontPolicy> {
    (
        "[A-Za-z]{1,31}",
        any::<u16>(),
        any::<[i32; 3]>(),
        any::<[bool; 3]>(),
        any::<[u8; 5]>(),
    )
        .prop_map(|(name, bits, ints, flags, bytes)| {
            let mut policy = FontPolicy::new(&name).unwrap();
            let on = |n: u32| bits & (1 << n) != 0;
            if on(1) { policy = policy.height(ints[0]); }
            if on(2) { policy = policy.width(ints[1]); }
            if on(3) { policy = policy.weight(ints[2]); }
            if on(4) { policy = policy.italic(flags[0]); }
            if on(5) { policy = policy.underline(flags[1]); }
            if on(6) { policy = policy.strike_out(flags[2]); }
            if on(7) { policy = policy.char_set(bytes[0]); }
            if on(8) { policy = policy.out_precision(bytes[1]); }
            if on(9) { policy = policy.clip_precision(bytes[2]); }
            if on(10) { policy = policy.quality(bytes[3]); }
            if on(11) { policy = policy.pitch_and_family(bytes[4]); }
            policy
        })
}

proptest! {
    #[test]
    fn unmasked_fields_survive(request in any_request(), policy in any_policy()) {
        let mut table = OverrideTable::default();
        table.insert(&request.face_name().to_string_lossy(), policy.clone());

        let mut font = request;
        prop_assert_eq!(table.resolve(&mut font), Resolution::Matched);
        prop_assert_eq!(font.face_name(), policy.replacement());

        let mask = policy.mask();
        let kept = |bit: OverrideMask| !mask.contains(bit);
        prop_assert_eq!(font.escapement, request.escapement);
        prop_assert_eq!(font.orientation, request.orientation);
        if kept(OverrideMask::HEIGHT) { prop_assert_eq!(font.height, request.height); }
        if kept(OverrideMask::WIDTH) { prop_assert_eq!(font.width, request.width); }
        if kept(OverrideMask::WEIGHT) { prop_assert_eq!(font.weight, request.weight); }
        if kept(OverrideMask::ITALIC) { prop_assert_eq!(font.italic, request.italic); }
        if kept(OverrideMask::UNDERLINE) { prop_assert_eq!(font.underline, request.underline); }
        if kept(OverrideMask::STRIKE_OUT) { prop_assert_eq!(font.strike_out, request.strike_out); }
        if kept(OverrideMask::CHAR_SET) { prop_assert_eq!(font.char_set, request.char_set); }
        if kept(OverrideMask::OUT_PRECISION) { prop_assert_eq!(font.out_precision, request.out_precision); }
        if kept(OverrideMask::CLIP_PRECISION) { prop_assert_eq!(font.clip_precision, request.clip_precision); }
        if kept(OverrideMask::QUALITY) { prop_assert_eq!(font.quality, request.quality); }
        if kept(OverrideMask::PITCH_AND_FAMILY) { prop_assert_eq!(font.pitch_and_family, request.pitch_and_family); }
    }

    #[test]
    fn second_pass_is_stable_when_replacement_is_unmapped(request in any_request(), policy in any_policy()) {
        let key = request.face_name().to_string_lossy();
        prop_assume!(policy.replacement().to_string_lossy() != key);

        let mut table = OverrideTable::default();
        table.insert(&key, policy);

        let mut once = request;
        table.resolve(&mut once);
        let mut twice = once;
        prop_assert_eq!(table.resolve(&mut twice), Resolution::Unmatched);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn misses_are_identity(request in any_request()) {
        let mut table = OverrideTable::default();
        table.insert("\u{1F600}", FontPolicy::new("Segoe UI").unwrap().height(1));

        let mut font = request;
        prop_assert_eq!(table.resolve(&mut font), Resolution::Unmatched);
        prop_assert_eq!(font, request);
    }
}
