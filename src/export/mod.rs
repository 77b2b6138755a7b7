//! PNG export for Typogram
//!
//! Exports render the unscaled paper off the UI thread and save it as a PNG
//! named after the header.
//!
//! # Architecture
//!
//! - `raster.rs` - the `Rasterizer` port and pending results
//! - `software.rs` - `ab_glyph` + `image` rasterizer
//! - `filename.rs` - file names derived from the header
//! - `download.rs` - the `Downloader` port and the folder sink
//! - `pipeline.rs` - transient views, settling and cleanup

pub mod download;
pub mod filename;
pub mod pipeline;
pub mod raster;
pub mod software;

pub use download::{Downloader, FolderDownloader};
pub use filename::png_filename;
pub use pipeline::{ExportOutcome, ExportPipeline};
pub use raster::{EncodedImage, PendingRaster, RasterOptions, Rasterizer};
pub use software::SoftwareRasterizer;
