//! Swirl - sample mode plugin
//!
//! Draws a rotating color wheel. Build it and copy the library into a
//! module directory as `swirl.plug`.

use std::ffi::c_void;
use std::ptr;

use mode_host::plugin::abi::{
    RawModeDescriptor, RawModeInfo, RawModeOption, MODE_ABI_VERSION, OPTION_KIND_INT,
};

struct Swirl {
    angle: f32,
    arms: i32,
}

static OPTIONS: [RawModeOption; 1] = [RawModeOption {
    flag: c"-arms".as_ptr(),
    resource: c"arms".as_ptr(),
    class: c"Arms".as_ptr(),
    default: c"3".as_ptr(),
    help: c"number of spiral arms".as_ptr(),
    kind: OPTION_KIND_INT,
}];

#[export_name = "mode_host_descriptor"]
pub static DESCRIPTOR: RawModeDescriptor = RawModeDescriptor {
    abi_version: MODE_ABI_VERSION,
    name: c"swirl".as_ptr(),
    description: c"Shows a rotating color wheel".as_ptr(),
    init: Some(init_swirl),
    step: Some(draw_swirl),
    release: Some(release_swirl),
    refresh: None,
    change: Some(change_swirl),
    unused: None,
    options: OPTIONS.as_ptr(),
    option_count: OPTIONS.len(),
    delay: 20_000,
    count: 3,
    cycles: 1,
    size: 1,
    ncolors: 64,
    saturation: 1.0,
};

unsafe extern "C" fn init_swirl(mi: *mut RawModeInfo) {
    let Some(info) = mi.as_mut() else {
        return;
    };
    let arms = info.count.max(1);
    // Re-init without release keeps the existing state
    match (info.userdata as *mut Swirl).as_mut() {
        Some(swirl) => swirl.arms = arms,
        None => {
            let swirl = Box::new(Swirl { angle: 0.0, arms });
            info.userdata = Box::into_raw(swirl) as *mut c_void;
        }
    }
}

unsafe extern "C" fn draw_swirl(mi: *mut RawModeInfo) {
    let Some(info) = mi.as_mut() else {
        return;
    };
    let Some(swirl) = (info.userdata as *mut Swirl).as_mut() else {
        return;
    };
    if info.pixels.is_null() || info.width == 0 {
        return;
    }

    let pixels = std::slice::from_raw_parts_mut(info.pixels, info.pixel_len);
    let (cx, cy) = (info.width as f32 / 2.0, info.height as f32 / 2.0);
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let x = (i as u32 % info.width) as f32 - cx;
        let y = (i as u32 / info.width) as f32 - cy;
        let turn = (y.atan2(x) * swirl.arms as f32 + swirl.angle).rem_euclid(std::f32::consts::TAU);
        let hue = (turn / std::f32::consts::TAU * 255.0 * info.saturation) as u32;
        *pixel = 0xff00_0000 | (hue << 16) | ((255 - hue) << 8) | 0x40;
    }
    swirl.angle += 0.05 * info.cycles.max(1) as f32;
}

unsafe extern "C" fn change_swirl(mi: *mut RawModeInfo) {
    if let Some(info) = mi.as_mut() {
        if let Some(swirl) = (info.userdata as *mut Swirl).as_mut() {
            swirl.arms = info.count.max(1);
        }
    }
}

unsafe extern "C" fn release_swirl(mi: *mut RawModeInfo) {
    let Some(info) = mi.as_mut() else {
        return;
    };
    if !info.userdata.is_null() {
        drop(Box::from_raw(info.userdata as *mut Swirl));
        info.userdata = ptr::null_mut();
    }
}
