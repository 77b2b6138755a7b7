//! The export pipeline
//!
//! Each export binds a transient, unscaled preview to the record, mounts it
//! offscreen and hands its tree to the rasterizer. The app loop calls
//! `poll` once per frame; a settled export is downloaded on success and its
//! node is unmounted either way.

use super::download::Downloader;
use super::filename::png_filename;
use super::raster::{PendingRaster, RasterOptions, Rasterizer};
use crate::error::Error;
use crate::gram::Record;
use crate::view::{
    BoundView, NodeId, PaperTransform, PaperTree, Placement, PreviewComposer, PreviewView, Stage,
};
use log::{info, warn};
use std::path::PathBuf;
use std::rc::Rc;

/// How one export ended.
#[derive(Debug)]
pub enum ExportOutcome {
    Downloaded { node: NodeId, path: PathBuf },
    Failed { node: NodeId, error: Error },
}

impl ExportOutcome {
    pub fn node(&self) -> NodeId {
        match self {
            ExportOutcome::Downloaded { node, .. } | ExportOutcome::Failed { node, .. } => *node,
        }
    }

    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Downloaded { .. })
    }
}

struct Job {
    view: PreviewView,
    pending: PendingRaster,
}

/// In-flight exports.
pub struct ExportPipeline {
    jobs: Vec<Job>,
    pixel_ratio: f32,
}

impl ExportPipeline {
    pub fn new(pixel_ratio: f32) -> Self {
        Self {
            jobs: Vec::new(),
            pixel_ratio,
        }
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    /// Start an export of the record's current content.
    ///
    /// `page_scroll` is the vertical scroll offset of the page at the time
    /// of the export. Returns the transient node.
    pub fn export(
        &mut self,
        record: &Rc<Record>,
        stage: &mut Stage,
        rasterizer: &dyn Rasterizer,
        page_scroll: f32,
    ) -> NodeId {
        let node = stage.allocate();
        let view = BoundView::bind(
            record,
            node,
            PreviewComposer {
                transform: PaperTransform::identity(),
            },
        );
        stage.mount(node, Placement::offscreen());

        let options = RasterOptions {
            scroll_y: -page_scroll,
            pixel_ratio: self.pixel_ratio,
        };
        info!("Export {} started at {}x", node, options.pixel_ratio);
        let pending = rasterizer.rasterize(&view.tree(), options);

        self.jobs.push(Job { view, pending });
        node
    }

    /// Finish every export whose rasterization has settled.
    pub fn poll(
        &mut self,
        record: &Record,
        stage: &mut Stage,
        downloader: &dyn Downloader,
    ) -> Vec<ExportOutcome> {
        let mut outcomes = Vec::new();
        let mut i = 0;
        while i < self.jobs.len() {
            let Some(result) = self.jobs[i].pending.try_settle() else {
                i += 1;
                continue;
            };
            let job = self.jobs.remove(i);
            let node = job.view.root();

            let downloaded = result.and_then(|image| {
                let filename = png_filename(&record.header());
                downloader.download(&image, &filename)
            });
            let outcome = match downloaded {
                Ok(path) => {
                    info!("Export {} saved to {}", node, path.display());
                    ExportOutcome::Downloaded { node, path }
                }
                Err(error) => {
                    warn!("Export {} failed: {}", node, error);
                    ExportOutcome::Failed { node, error }
                }
            };

            stage.unmount(node);
            drop(job);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Number of exports still rasterizing.
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Current trees of the transient views, for layout.
    pub fn trees(&self) -> Vec<(NodeId, PaperTree)> {
        self.jobs
            .iter()
            .map(|job| (job.view.root(), job.view.tree()))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::export::raster::EncodedImage;
    use crate::gram::GramPatch;
    use crate::markup::PlainTransform;
    use std::cell::RefCell;
    use std::sync::mpsc::Sender;

    /// A rasterizer whose results the test sends by hand.
    #[derive(Default)]
    struct ManualRasterizer {
        calls: RefCell<Vec<(PaperTree, RasterOptions)>>,
        senders: RefCell<Vec<Sender<Result<EncodedImage>>>>,
    }

    impl ManualRasterizer {
        fn settle(&self, index: usize, result: Result<EncodedImage>) {
            self.senders.borrow()[index].send(result).unwrap();
        }
    }

    impl Rasterizer for ManualRasterizer {
        fn rasterize(&self, tree: &PaperTree, options: RasterOptions) -> PendingRaster {
            let (tx, pending) = PendingRaster::channel();
            self.calls.borrow_mut().push((tree.clone(), options));
            self.senders.borrow_mut().push(tx);
            pending
        }
    }

    /// Keeps downloads in memory.
    #[derive(Default)]
    struct MemoryDownloader {
        files: RefCell<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    impl Downloader for MemoryDownloader {
        fn download(&self, image: &EncodedImage, filename: &str) -> Result<PathBuf> {
            if self.fail {
                return Err(Error::DownloadDirNotFound);
            }
            self.files
                .borrow_mut()
                .push((filename.to_string(), image.bytes.clone()));
            Ok(PathBuf::from(filename))
        }
    }

    fn png() -> EncodedImage {
        EncodedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            width: 600,
            height: 400,
        }
    }

    struct Fixture {
        record: Rc<Record>,
        stage: Stage,
        preview: PreviewView,
        pipeline: ExportPipeline,
        rasterizer: ManualRasterizer,
    }

    fn fixture() -> Fixture {
        let record = Record::new(PlainTransform);
        let mut stage = Stage::new();
        let root = stage.allocate();
        stage.mount(root, Placement::Flow);
        let preview = PreviewView::new(&record, root);
        preview.set_transform(PaperTransform::fitted(0.6, true, 0.8));
        Fixture {
            record,
            stage,
            preview,
            pipeline: ExportPipeline::new(2.0),
            rasterizer: ManualRasterizer::default(),
        }
    }

    #[test]
    fn test_export_mounts_unscaled_offscreen_node() {
        let mut f = fixture();
        let node = f
            .pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 120.0);

        assert_eq!(f.stage.len(), 2);
        assert_eq!(f.stage.placement(node), Some(Placement::offscreen()));

        let calls = f.rasterizer.calls.borrow();
        let (tree, options) = &calls[0];
        assert!(tree.transform.is_identity());
        assert_eq!(options.scroll_y, -120.0);
        assert_eq!(options.pixel_ratio, 2.0);
        assert!(!f.preview.tree().transform.is_identity());
    }

    #[test]
    fn test_success_downloads_and_unmounts() {
        let mut f = fixture();
        let downloader = MemoryDownloader::default();
        let before = f.stage.len();
        let subscribers = f.record.subscriber_count();

        f.record.update(GramPatch::new().header("Hello, World!"));
        f.pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        assert_eq!(f.stage.len(), before + 1);
        assert_eq!(f.record.subscriber_count(), subscribers + 1);

        assert!(f.pipeline.poll(&f.record, &mut f.stage, &downloader).is_empty());
        assert_eq!(f.stage.len(), before + 1);

        f.rasterizer.settle(0, Ok(png()));
        let outcomes = f.pipeline.poll(&f.record, &mut f.stage, &downloader);

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(f.stage.len(), before);
        assert_eq!(f.record.subscriber_count(), subscribers);
        assert_eq!(downloader.files.borrow()[0].0, "Hello--World-.png");
        assert!(f.pipeline.is_idle());
    }

    #[test]
    fn test_rasterization_failure_still_unmounts() {
        let mut f = fixture();
        let downloader = MemoryDownloader::default();
        let before = f.stage.len();

        let node = f
            .pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        f.rasterizer.settle(
            0,
            Err(Error::Rasterization {
                message: "boom".to_string(),
            }),
        );
        let outcomes = f.pipeline.poll(&f.record, &mut f.stage, &downloader);

        assert!(matches!(
            &outcomes[0],
            ExportOutcome::Failed {
                error: Error::Rasterization { .. },
                ..
            }
        ));
        assert_eq!(outcomes[0].node(), node);
        assert_eq!(f.stage.len(), before);
        assert!(!f.stage.is_mounted(node));
        assert!(downloader.files.borrow().is_empty());
    }

    #[test]
    fn test_download_failure_still_unmounts() {
        let mut f = fixture();
        let downloader = MemoryDownloader {
            fail: true,
            ..Default::default()
        };
        let before = f.stage.len();

        f.pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        f.rasterizer.settle(0, Ok(png()));
        let outcomes = f.pipeline.poll(&f.record, &mut f.stage, &downloader);

        assert!(!outcomes[0].is_success());
        assert_eq!(f.stage.len(), before);
    }

    #[test]
    fn test_dropped_rasterizer_counts_as_failure() {
        let mut f = fixture();
        let downloader = MemoryDownloader::default();
        let before = f.stage.len();

        f.pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        f.rasterizer.senders.borrow_mut().clear();
        let outcomes = f.pipeline.poll(&f.record, &mut f.stage, &downloader);

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_success());
        assert_eq!(f.stage.len(), before);
    }

    #[test]
    fn test_concurrent_exports_are_independent() {
        let mut f = fixture();
        let downloader = MemoryDownloader::default();
        let before = f.stage.len();

        let a = f
            .pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        let b = f
            .pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        assert_ne!(a, b);
        assert_eq!(f.stage.len(), before + 2);
        assert_eq!(f.pipeline.pending(), 2);

        // Second settles first
        f.rasterizer.settle(1, Ok(png()));
        let outcomes = f.pipeline.poll(&f.record, &mut f.stage, &downloader);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].node(), b);
        assert!(f.stage.is_mounted(a));

        f.rasterizer.settle(0, Ok(png()));
        let outcomes = f.pipeline.poll(&f.record, &mut f.stage, &downloader);
        assert_eq!(outcomes[0].node(), a);
        assert_eq!(f.stage.len(), before);
        assert_eq!(downloader.files.borrow().len(), 2);
    }

    #[test]
    fn test_filename_uses_header_at_settle_time() {
        let mut f = fixture();
        let downloader = MemoryDownloader::default();

        f.record.update(GramPatch::new().header("Before"));
        f.pipeline
            .export(&f.record, &mut f.stage, &f.rasterizer, 0.0);
        f.record.update(GramPatch::new().header("After"));

        let trees = f.pipeline.trees();
        assert_eq!(trees[0].1.header, "After");

        f.rasterizer.settle(0, Ok(png()));
        f.pipeline.poll(&f.record, &mut f.stage, &downloader);
        assert_eq!(downloader.files.borrow()[0].0, "After.png");
    }
}
