//! The stage: the set of view roots currently attached to the window
//!
//! Views get a `NodeId` when they are created and become visible to layout
//! only while mounted. The paper painter records each mounted root's laid
//! out width here, which is what the scale controller measures.

use crate::error::{Error, Result};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Offset used to park a node outside the visible viewport.
pub const OFFSCREEN_OFFSET: f32 = -100_000.0;

/// Stable identity of a view's root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a mounted node is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Laid out in the normal flow of the window
    Flow,
    /// Laid out and painted at an absolute position, typically far outside
    /// the viewport
    Absolute { x: f32, y: f32 },
}

impl Placement {
    pub fn offscreen() -> Self {
        Placement::Absolute {
            x: OFFSCREEN_OFFSET,
            y: OFFSCREEN_OFFSET,
        }
    }

    pub fn is_in_flow(&self) -> bool {
        matches!(self, Placement::Flow)
    }
}

/// Reads the laid out width of a node.
pub trait LayoutProbe {
    /// Unscaled width of `node` as of the last layout pass.
    ///
    /// # Errors
    ///
    /// `Error::NotMounted` when the node is not attached or has not been laid
    /// out since it was attached.
    fn computed_width(&self, node: NodeId) -> Result<f32>;
}

#[derive(Debug, Clone)]
struct MountedNode {
    placement: Placement,
    width: Option<f32>,
}

/// Registry of mounted view roots.
#[derive(Debug, Default)]
pub struct Stage {
    nodes: BTreeMap<NodeId, MountedNode>,
    next_id: u64,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for a new view root.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Attach a node. Re-mounting an attached node only moves it.
    pub fn mount(&mut self, node: NodeId, placement: Placement) {
        debug!("Mounting {} at {:?}", node, placement);
        self.nodes
            .entry(node)
            .and_modify(|n| n.placement = placement)
            .or_insert(MountedNode {
                placement,
                width: None,
            });
    }

    /// Detach a node. Returns `false` if it was not mounted.
    pub fn unmount(&mut self, node: NodeId) -> bool {
        let removed = self.nodes.remove(&node).is_some();
        if removed {
            debug!("Unmounted {}", node);
        }
        removed
    }

    pub fn is_mounted(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn placement(&self, node: NodeId) -> Option<Placement> {
        self.nodes.get(&node).map(|n| n.placement)
    }

    /// Number of mounted nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record the width a layout pass produced. Ignored for detached nodes.
    pub fn record_width(&mut self, node: NodeId, width: f32) {
        if let Some(mounted) = self.nodes.get_mut(&node) {
            mounted.width = Some(width);
        }
    }
}

impl LayoutProbe for Stage {
    fn computed_width(&self, node: NodeId) -> Result<f32> {
        self.nodes
            .get(&node)
            .and_then(|n| n.width)
            .ok_or(Error::NotMounted { node })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
