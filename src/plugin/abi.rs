//! C ABI shared with plugin images
//!
//! A plugin image exports one static named `mode_host_descriptor` of
//! type `RawModeDescriptor`. Hooks receive a `RawModeInfo` built from the
//! screen's `ModeInfo`; the plugin owns `userdata`, allocating it in
//! `init` and freeing it in `release`.
//!
//! ```ignore
//! #[no_mangle]
//! pub static mode_host_descriptor: RawModeDescriptor = RawModeDescriptor {
//!     abi_version: MODE_ABI_VERSION,
//!     name: c"fire".as_ptr(),
//!     init: Some(init_fire),
//!     step: Some(draw_fire),
//!     ..RawModeDescriptor::EMPTY
//! };
//! ```

use std::ffi::{c_char, c_void, CStr};
use std::ptr;

use crate::modes::{ModeDefaults, ModeInfo, ModeOption, OptionType};

/// ABI revision the host understands
pub const MODE_ABI_VERSION: u32 = 1;

/// Name of the exported descriptor static
pub const MODE_DESCRIPTOR_SYMBOL: &str = "mode_host_descriptor";

pub const OPTION_KIND_STRING: u32 = 0;
pub const OPTION_KIND_FLOAT: u32 = 1;
pub const OPTION_KIND_INT: u32 = 2;
pub const OPTION_KIND_BOOL: u32 = 3;

/// Hook entry point
pub type RawHook = unsafe extern "C" fn(mi: *mut RawModeInfo);

/// Screen data passed to plugin hooks
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawModeInfo {
    pub screen: u32,
    pub width: u32,
    pub height: u32,
    pub delay: i32,
    pub count: i32,
    pub cycles: i32,
    pub size: i32,
    pub ncolors: i32,
    pub saturation: f32,
    pub frame: u64,
    /// 0xAARRGGBB pixels, row-major, `pixel_len` entries
    pub pixels: *mut u32,
    pub pixel_len: usize,
    /// Plugin-owned per-screen state
    pub userdata: *mut c_void,
}

impl RawModeInfo {
    /// Snapshot a screen for one hook call
    ///
    /// The pixel pointer borrows `mi.surface` and is only valid until
    /// `mi` is next touched.
    pub fn from_mode_info(mi: &mut ModeInfo, userdata: *mut c_void) -> Self {
        Self {
            screen: u32::try_from(mi.screen).unwrap_or(u32::MAX),
            width: mi.surface.width,
            height: mi.surface.height,
            delay: mi.run.delay,
            count: mi.run.count,
            cycles: mi.run.cycles,
            size: mi.run.size,
            ncolors: mi.run.color_count,
            saturation: mi.run.saturation,
            frame: mi.frame,
            pixels: mi.surface.pixels.as_mut_ptr(),
            pixel_len: mi.surface.pixels.len(),
            userdata,
        }
    }
}

/// One option table entry
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawModeOption {
    pub flag: *const c_char,
    pub resource: *const c_char,
    pub class: *const c_char,
    pub default: *const c_char,
    pub help: *const c_char,
    /// One of the `OPTION_KIND_*` constants
    pub kind: u32,
}

// Entries only point at immutable static strings.
unsafe impl Sync for RawModeOption {}

/// The exported descriptor
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawModeDescriptor {
    pub abi_version: u32,
    pub name: *const c_char,
    pub description: *const c_char,
    pub init: Option<RawHook>,
    pub step: Option<RawHook>,
    pub release: Option<RawHook>,
    pub refresh: Option<RawHook>,
    pub change: Option<RawHook>,
    /// Reserved
    pub unused: Option<RawHook>,
    pub options: *const RawModeOption,
    pub option_count: usize,
    pub delay: i32,
    pub count: i32,
    pub cycles: i32,
    pub size: i32,
    pub ncolors: i32,
    pub saturation: f32,
}

// The descriptor is immutable static data.
unsafe impl Sync for RawModeDescriptor {}

impl RawModeDescriptor {
    /// All-null descriptor for struct update syntax
    pub const EMPTY: RawModeDescriptor = RawModeDescriptor {
        abi_version: MODE_ABI_VERSION,
        name: ptr::null(),
        description: ptr::null(),
        init: None,
        step: None,
        release: None,
        refresh: None,
        change: None,
        unused: None,
        options: ptr::null(),
        option_count: 0,
        delay: 200_000,
        count: 1,
        cycles: 1,
        size: 1,
        ncolors: 64,
        saturation: 1.0,
    };
}

/// Hook entry points resolved from a descriptor
#[derive(Debug, Clone, Copy)]
pub struct RawHooks {
    pub init: RawHook,
    pub step: Option<RawHook>,
    pub release: Option<RawHook>,
    pub refresh: Option<RawHook>,
    pub change: Option<RawHook>,
}

/// Everything decoded from a valid descriptor
#[derive(Debug, Clone)]
pub struct DecodedDescriptor {
    pub name: String,
    pub description: String,
    pub hooks: RawHooks,
    pub options: Vec<ModeOption>,
    pub defaults: ModeDefaults,
}

/// Read an optional C string field
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn optional_str(ptr: *const c_char, field: &str) -> Result<Option<String>, String> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(|s| Some(s.to_string()))
        .map_err(|_| format!("`{}` is not valid UTF-8", field))
}

/// Read a required C string field
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn required_str(ptr: *const c_char, field: &str) -> Result<String, String> {
    optional_str(ptr, field)?.ok_or_else(|| format!("`{}` is null", field))
}

fn option_kind(kind: u32) -> Result<OptionType, String> {
    match kind {
        OPTION_KIND_STRING => Ok(OptionType::String),
        OPTION_KIND_FLOAT => Ok(OptionType::Float),
        OPTION_KIND_INT => Ok(OptionType::Int),
        OPTION_KIND_BOOL => Ok(OptionType::Bool),
        other => Err(format!("unknown option kind {}", other)),
    }
}

/// Validate and decode an exported descriptor
///
/// Returns a description of the first problem found.
///
/// # Safety
/// Every pointer in `raw` must be null or valid for the lifetime of the
/// image it came from; `options` must point to `option_count` entries.
pub unsafe fn decode_descriptor(raw: &RawModeDescriptor) -> Result<DecodedDescriptor, String> {
    if raw.abi_version != MODE_ABI_VERSION {
        return Err(format!(
            "ABI version mismatch: image={}, host={}",
            raw.abi_version, MODE_ABI_VERSION
        ));
    }

    let name = required_str(raw.name, "name")?;
    if name.is_empty() {
        return Err("`name` is empty".to_string());
    }
    let description = optional_str(raw.description, "description")?.unwrap_or_default();
    let init = raw
        .init
        .ok_or_else(|| "required hook `init` is not exported".to_string())?;

    let options = if raw.option_count == 0 {
        Vec::new()
    } else {
        if raw.options.is_null() {
            return Err(format!("option table is null but holds {} entries", raw.option_count));
        }
        let table = std::slice::from_raw_parts(raw.options, raw.option_count);
        let mut options = Vec::with_capacity(table.len());
        for (i, entry) in table.iter().enumerate() {
            let field = |f: &str| format!("options[{}].{}", i, f);
            let resource = required_str(entry.resource, &field("resource"))?;
            options.push(ModeOption {
                flag: optional_str(entry.flag, &field("flag"))?
                    .unwrap_or_else(|| format!("-{}", resource)),
                class: required_str(entry.class, &field("class"))?,
                default: optional_str(entry.default, &field("default"))?.unwrap_or_default(),
                help: optional_str(entry.help, &field("help"))?.unwrap_or_default(),
                kind: option_kind(entry.kind).map_err(|e| format!("{}: {}", field("kind"), e))?,
                resource,
            });
        }
        options
    };

    Ok(DecodedDescriptor {
        name,
        description,
        hooks: RawHooks {
            init,
            step: raw.step,
            release: raw.release,
            refresh: raw.refresh,
            change: raw.change,
        },
        options,
        defaults: ModeDefaults {
            delay: raw.delay,
            count: raw.count,
            cycles: raw.cycles,
            size: raw.size,
            color_count: raw.ncolors,
            saturation: raw.saturation,
        },
    })
}
