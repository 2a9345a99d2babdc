pub mod detector_handle;
pub mod dto;
pub mod image_codec;
pub mod ports;
pub mod services;
