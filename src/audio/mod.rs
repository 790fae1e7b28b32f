pub mod classifier;
pub mod decode;
pub mod level;
#[cfg(feature = "mic")]
pub mod mic;
pub mod source;
