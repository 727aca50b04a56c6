pub mod ffi;
pub mod parser;
pub mod picture;
pub mod provider;
pub mod scaler;

/// Upper bound for any requested or produced thumbnail dimension
pub const MAX_THUMBNAIL_SIZE: u32 = 10000;
