use std::mem::forget;
use std::slice;

use crate::provider::{AlphaType, ThumbnailProvider};

#[repr(C)]
pub struct PictureBuffer {
    /// data in r8g8b8a8 format, null if there is no thumbnail
    data: *const u8,
    /// length of the buffer
    len: usize,
    width: usize,
    height: usize,
    /// 0: unknown, 1: rgb
    alpha_type: u32,
}

impl PictureBuffer {
    fn empty() -> Self {
        PictureBuffer {
            data: std::ptr::null(),
            len: 0,
            width: 0,
            height: 0,
            alpha_type: AlphaType::Unknown as u32,
        }
    }
}

#[no_mangle]
/// Extracts the thumbnail embedded in the G-code `data` and fits it into a `cx`x`cx` box
/// Free the buffer with free_picture_buffer
pub extern "C" fn gcode_thumbnail(data: *const u8, len: usize, cx: u32) -> PictureBuffer {
    if data.is_null() {
        return PictureBuffer::empty();
    }

    let content = unsafe { slice::from_raw_parts(data, len) };
    // get_thumbnail catches panics, nothing unwinds across this boundary
    if let Some(thumbnail) = ThumbnailProvider::new().get_thumbnail(content, cx) {
        let width = thumbnail.picture.width();
        let height = thumbnail.picture.height();

        let boxed_data = thumbnail.picture.into_data().into_boxed_slice();
        let data = boxed_data.as_ptr();
        let len = boxed_data.len();

        // leak the memory owned by boxed_data
        forget(boxed_data);

        return PictureBuffer {
            data,
            len,
            width,
            height,
            alpha_type: thumbnail.alpha as u32,
        };
    }

    PictureBuffer::empty()
}

#[no_mangle]
pub extern "C" fn free_picture_buffer(buffer: PictureBuffer) {
    if buffer.data.is_null() {
        return;
    }

    unsafe {
        let s = slice::from_raw_parts_mut(buffer.data as *mut u8, buffer.len);

        // put the memory back into the box such that is can be freed
        drop(Box::from_raw(s as *mut [u8]));
    }
}
