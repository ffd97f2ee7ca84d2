//! Image payload handling: data-URI decoding and MIME detection.

pub mod data_uri;
pub mod mime_detect;

pub use data_uri::{decode_image_data_uri, encode_image_data_uri, DataUriError, DecodedImage};
pub use mime_detect::{
    data_uri_extension, detect_mime_type, is_inline_safe, mime_for_extension,
};
