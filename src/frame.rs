//! Frame Source: resolves "the current frame" as a byte blob.
//!
//! The capture process (out of scope) overwrites a single file with the
//! latest JPEG. Reading it can fail at any time — before the first capture,
//! or mid-rotation — and the streaming loop must never care, so every
//! failure is absorbed into a fallback blob.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};

/// 1x1 transparent GIF, served until the capture process produces a frame
/// and no fallback image is configured.
const PLACEHOLDER_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

pub struct FrameSource {
    path: PathBuf,
    fallback: Bytes,
}

impl FrameSource {
    /// `fallback_path` is loaded once at startup; if it is absent or
    /// unreadable the built-in placeholder is used instead.
    pub fn new(path: PathBuf, fallback_path: Option<&Path>) -> Self {
        let fallback = match fallback_path {
            Some(p) => match std::fs::read(p) {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    warn!("cannot read fallback image {}: {}, using placeholder", p.display(), e);
                    Bytes::from_static(PLACEHOLDER_GIF)
                }
            },
            None => Bytes::from_static(PLACEHOLDER_GIF),
        };
        Self { path, fallback }
    }

    /// The latest frame, or the fallback blob. Never fails.
    ///
    /// Synchronous on purpose: frames are small, reads are brief, and every
    /// session reads independently with no coordination.
    pub fn latest(&self) -> Bytes {
        match std::fs::read(&self.path) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                debug!("frame read failed ({}), serving fallback", e);
                self.fallback.clone()
            }
        }
    }
}
