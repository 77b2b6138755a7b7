//! Views bound to the document record
//!
//! A view owns one pure compose function and the render tree it last
//! produced. Binding subscribes the view to the record so every update
//! re-composes the tree; the egui layer draws whatever tree is current.
//!
//! # Architecture
//!
//! - `mod.rs` - the `Compose` trait and `BoundView`
//! - `stage.rs` - mounted roots and layout measurement
//! - `metrics.rs` - paper dimensions shared by the painter and the rasterizer
//! - `preview.rs` - the paper tree and its scale transform
//! - `editor.rs` - the editing form tree

pub mod editor;
pub mod metrics;
pub mod preview;
pub mod stage;

pub use editor::{Control, EditorAction, EditorComposer, EditorForm, EditorView};
pub use metrics::PaperMetrics;
pub use preview::{PaperTransform, PaperTree, PreviewComposer, PreviewView};
pub use stage::{LayoutProbe, NodeId, Placement, Stage};

use crate::gram::{Gram, Record, Subscription};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A pure function from the document (plus the composer's own parameters)
/// to a render tree.
pub trait Compose: 'static {
    type Tree: Clone + PartialEq + fmt::Debug + 'static;

    fn compose(&self, gram: &Gram) -> Self::Tree;
}

struct Bound<C: Compose> {
    composer: C,
    last: Gram,
    tree: C::Tree,
    renders: u64,
}

impl<C: Compose> Bound<C> {
    fn render(&mut self) {
        self.tree = self.composer.compose(&self.last);
        self.renders += 1;
    }
}

/// A composer bound to a record under a fixed root id.
pub struct BoundView<C: Compose> {
    root: NodeId,
    state: Rc<RefCell<Bound<C>>>,
    _subscription: Subscription,
}

impl<C: Compose> BoundView<C> {
    /// Render once from the current snapshot and re-render on every update.
    pub fn bind(record: &Rc<Record>, root: NodeId, composer: C) -> Self {
        let last = record.snapshot();
        let tree = composer.compose(&last);
        let state = Rc::new(RefCell::new(Bound {
            composer,
            last,
            tree,
            renders: 1,
        }));

        let target = Rc::clone(&state);
        let subscription = record.subscribe(move |gram| {
            let mut bound = target.borrow_mut();
            bound.last = gram.clone();
            bound.render();
        });

        Self {
            root,
            state,
            _subscription: subscription,
        }
    }

    /// Root id; unchanged for the lifetime of the view.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Clone of the current tree.
    ///
    /// Callers that go on to update the record should work from this copy so
    /// no borrow of the view is held during the broadcast.
    pub fn tree(&self) -> C::Tree {
        self.state.borrow().tree.clone()
    }

    /// Number of times the tree has been composed.
    pub fn render_count(&self) -> u64 {
        self.state.borrow().renders
    }

    /// Change the composer's own parameters and re-render from the last
    /// snapshot.
    pub fn reconfigure(&self, f: impl FnOnce(&mut C)) {
        let mut bound = self.state.borrow_mut();
        f(&mut bound.composer);
        bound.render();
    }

    /// Read the composer's parameters.
    pub fn composer<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.state.borrow().composer)
    }
}

impl<C: Compose> fmt::Debug for BoundView<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundView")
            .field("root", &self.root)
            .field("renders", &self.render_count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
