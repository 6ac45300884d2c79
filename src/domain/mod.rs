pub mod base64_bytes;
pub mod errors;
pub mod models;
pub mod ports;
