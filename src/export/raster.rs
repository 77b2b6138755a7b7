//! The rasterizer port
//!
//! Rasterizing happens off the UI thread. A `Rasterizer` hands back a
//! `PendingRaster` right away; the app loop polls it once per frame until
//! it settles.

use crate::error::{Error, Result};
use crate::view::PaperTree;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Options for one rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Vertical offset compensating the page scroll at export time
    pub scroll_y: f32,
    /// Device pixels per paper point
    pub pixel_ratio: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scroll_y: 0.0,
            pixel_ratio: 1.0,
        }
    }
}

/// An encoded PNG.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// A rasterization that has not been observed to settle yet.
#[derive(Debug)]
pub struct PendingRaster {
    rx: Receiver<Result<EncodedImage>>,
}

impl PendingRaster {
    /// A pending result and the sender that settles it.
    pub fn channel() -> (Sender<Result<EncodedImage>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// A result that is settled from the start.
    pub fn ready(result: Result<EncodedImage>) -> Self {
        let (tx, pending) = Self::channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(result);
        pending
    }

    /// The result, once available.
    ///
    /// A producer that went away without sending settles as a
    /// rasterization failure.
    pub fn try_settle(&self) -> Option<Result<EncodedImage>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Rasterization {
                message: "rasterizer stopped without a result".to_string(),
            })),
        }
    }
}

/// Turns a paper tree into an encoded image.
pub trait Rasterizer {
    fn rasterize(&self, tree: &PaperTree, options: RasterOptions) -> PendingRaster;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> EncodedImage {
        EncodedImage {
            bytes: vec![1, 2, 3],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn test_channel_settles_when_sent() {
        let (tx, pending) = PendingRaster::channel();
        assert!(pending.try_settle().is_none());
        tx.send(Ok(image())).unwrap();
        assert_eq!(pending.try_settle().unwrap().unwrap(), image());
    }

    #[test]
    fn test_ready_is_settled() {
        let pending = PendingRaster::ready(Ok(image()));
        assert!(pending.try_settle().unwrap().is_ok());
    }

    #[test]
    fn test_dropped_sender_is_failure() {
        let (tx, pending) = PendingRaster::channel();
        drop(tx);
        assert!(matches!(
            pending.try_settle(),
            Some(Err(Error::Rasterization { .. }))
        ));
    }

    #[test]
    fn test_debug_hides_bytes() {
        let debug = format!("{:?}", image());
        assert!(debug.contains("bytes: 3"));
    }
}
