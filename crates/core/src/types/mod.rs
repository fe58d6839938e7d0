//! Domain types shared across apkforge crates

pub mod fingerprint;
pub mod request;
pub mod toolchain;

pub use fingerprint::{Fingerprint, FINGERPRINT_LEN};
pub use request::{ProcessingOptions, ProcessingRequest};
pub use toolchain::Toolchain;
