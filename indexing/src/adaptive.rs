//! Adaptive bin-tree index

use crate::common::{conservative_overlap, indexed_objects, IndexedFrame};
use crate::stats::{BinOccupancy, BinStatistics};
use crate::SceneSpatialIndex;
use lucent3d_core::geometry::{Axis, Box3, Face, Point3, Segment3, CONTAINMENT_EPSILON};
use lucent3d_core::index::SpatialIndexQuery;
use lucent3d_core::object::{ArcObject, ObjectId, SurfacePoint};
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::IndexScratch;
use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;

/// Minimum proportion of a bin's axis extent that must be empty for a
/// carve-out cut to be preferred over a balanced midpoint cut.
const EMPTY_SPACE_CARVEOUT_THRESHOLD: f64 = 0.25;

/// The arena id of the root bin.
const ROOT_BIN: u32 = 0;

/// 3-D index of a scene's objects as a non-uniform rectilinear tree of
/// cuboid bins.
///
/// The binning strategy carves out empty space and splits object-dense bins
/// into sparser sub-bins. Compared to the Cartesian tessellation of
/// [`UniformGridIndex`](crate::UniformGridIndex) the space is in general
/// divided more efficiently: likely (not guaranteed) a lower maximum object
/// count per bin and a lower object density per unit of space for an equal
/// number of bins, so a line traversal meets fewer objects. The uniform grid
/// in turn builds faster and traverses cheaper; the factory compares both on
/// their statistics.
///
/// Bins live in a flat arena addressed by integer ids; neighbor lists and
/// parent/child links are id lists, and the six per-face neighbor lists of
/// every leaf are kept symmetric: if bin A lists B on face F, B lists A on
/// the opposite face.
pub struct AdaptiveBinTreeIndex<'a> {
    scene: &'a Scene,
    minimum_bin_object_count: usize,
    minimum_bin_object_reduction_on_split: usize,
    maximum_bin_tree_depth: usize,
    maximum_leaf_bins: usize,
    split_exclusively_in_xy: bool,
    track_bin_neighbors: bool,
    frame: IndexedFrame,
    bins: Vec<SpatialBin>,
}

impl<'a> AdaptiveBinTreeIndex<'a> {
    /// Create a new, not yet built, `AdaptiveBinTreeIndex` with the default
    /// split parameters.
    ///
    /// * `scene`             - The scene snapshot.
    /// * `maximum_leaf_bins` - Upper bound on the number of leaf bins.
    pub fn new(scene: &'a Scene, maximum_leaf_bins: usize) -> Self {
        Self::with_parameters(scene, 1, 1, 29, maximum_leaf_bins)
    }

    /// Create a new, not yet built, `AdaptiveBinTreeIndex`.
    ///
    /// * `scene`                     - The scene snapshot.
    /// * `minimum_bin_object_count`  - Bins holding at most this many objects
    ///                                 are never split.
    /// * `minimum_bin_object_reduction_on_split` - A split is accepted only
    ///                                 if the smaller child holds at least
    ///                                 this many objects fewer than the bin.
    /// * `maximum_bin_tree_depth`    - Maximum depth of the tree.
    /// * `maximum_leaf_bins`         - Upper bound on the number of leaf bins.
    pub fn with_parameters(
        scene: &'a Scene,
        minimum_bin_object_count: usize,
        minimum_bin_object_reduction_on_split: usize,
        maximum_bin_tree_depth: usize,
        maximum_leaf_bins: usize,
    ) -> Self {
        Self {
            scene,
            minimum_bin_object_count,
            minimum_bin_object_reduction_on_split,
            maximum_bin_tree_depth,
            maximum_leaf_bins,
            split_exclusively_in_xy: false,
            track_bin_neighbors: true,
            frame: IndexedFrame::Camera,
            bins: Vec::new(),
        }
    }

    /// The view-plane variant: bins over the canonical view volume, splits
    /// restricted to the XY plane, and no neighbor tracking (the view-plane
    /// index only ever point-locates).
    ///
    /// * `scene`             - The scene snapshot.
    /// * `maximum_leaf_bins` - Upper bound on the number of leaf bins.
    pub(crate) fn view_plane_variant(scene: &'a Scene, maximum_leaf_bins: usize) -> Self {
        let mut index = Self::new(scene, maximum_leaf_bins);
        index.split_exclusively_in_xy = true;
        index.track_bin_neighbors = false;
        index.frame = IndexedFrame::ViewVolume;
        index
    }

    /// Lazily-produced surface points of objects intersecting the given line
    /// segment, walking the leaf bins along the segment through their
    /// neighbor lists. Requires neighbor tracking.
    ///
    /// * `line`    - The segment, in camera coordinates; its first endpoint
    ///               must lie inside the indexed region.
    /// * `scratch` - Index scratch of the current thread.
    pub fn object_intersections<'s>(
        &'s self,
        line: &Segment3,
        scratch: &'s mut IndexScratch,
    ) -> AdaptiveObjectIntersections<'s, 'a> {
        assert!(
            self.track_bin_neighbors,
            "line traversal requires keeping track of bin neighbors"
        );
        AdaptiveObjectIntersections::new(self, line, scratch)
    }

    pub(crate) fn scene(&self) -> &'a Scene {
        self.scene
    }

    pub(crate) fn is_built(&self) -> bool {
        !self.bins.is_empty()
    }

    pub(crate) fn bin_count(&self) -> usize {
        self.bins.len()
    }

    fn indexed_region(&self) -> Box3 {
        match self.frame {
            IndexedFrame::Camera => *self.scene.bounding_box_in_camera(),
            IndexedFrame::ViewVolume => Box3::canonical(),
        }
    }

    fn object_box(&self, object: &ArcObject) -> Option<Box3> {
        self.frame.object_box(object, self.scene.camera())
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    fn bin_bounds(&self, bin: u32) -> &Box3 {
        &self.bins[bin as usize].bounds
    }

    fn bin_contains(&self, bin: u32, point: &Point3) -> bool {
        self.bins[bin as usize]
            .bounds
            .contains_conservative(point, CONTAINMENT_EPSILON)
    }

    pub(crate) fn is_leaf(&self, bin: u32) -> bool {
        matches!(self.bins[bin as usize].node, BinNode::Leaf { .. })
    }

    pub(crate) fn leaf_objects(&self, bin: u32) -> &[ArcObject] {
        match &self.bins[bin as usize].node {
            BinNode::Leaf { objects, .. } => objects,
            BinNode::Split { .. } => &[],
        }
    }

    pub(crate) fn leaf_objects_mut(&mut self, bin: u32) -> &mut Vec<ArcObject> {
        match &mut self.bins[bin as usize].node {
            BinNode::Leaf { objects, .. } => objects,
            BinNode::Split { .. } => unreachable!("objects are kept in leaf bins only"),
        }
    }

    pub(crate) fn leaf_neighbors_on(&self, bin: u32, side: Face) -> &[u32] {
        match &self.bins[bin as usize].node {
            BinNode::Leaf { neighbors, .. } => neighbors.on(side),
            BinNode::Split { .. } => &[],
        }
    }

    fn neighbors_mut(&mut self, bin: u32) -> &mut BinNeighbors {
        match &mut self.bins[bin as usize].node {
            BinNode::Leaf { neighbors, .. } => neighbors,
            BinNode::Split { .. } => unreachable!("neighbors are kept for leaf bins only"),
        }
    }

    /// Depth-first iterator over the leaf bin ids.
    pub(crate) fn leaf_bins(&self) -> DepthFirstLeafBins<'_, 'a> {
        DepthFirstLeafBins::new(self)
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    fn create_root_bin(&mut self) {
        let bounds = self.indexed_region();
        let objects = indexed_objects(self.scene, &bounds, self.frame);
        self.bins.push(SpatialBin {
            bounds,
            depth_in_tree: 0,
            parent: None,
            node: BinNode::Leaf {
                objects,
                neighbors: BinNeighbors::new(),
            },
        });
    }

    fn split_bin(&mut self, bin: u32) -> bool {
        let (n, depth) = match &self.bins[bin as usize].node {
            BinNode::Leaf { objects, .. } => (objects.len(), self.bins[bin as usize].depth_in_tree),
            BinNode::Split { .. } => return false,
        };
        if n <= self.minimum_bin_object_count || depth >= self.maximum_bin_tree_depth {
            return false;
        }
        let Some(cut) = self.compute_optimal_cut(bin) else {
            return false;
        };
        let (first, second) = self.create_children(bin, &cut);
        let m = self
            .leaf_objects(first)
            .len()
            .min(self.leaf_objects(second).len());
        if n - m < self.minimum_bin_object_reduction_on_split {
            // Unprofitable split: discard the freshly pushed children.
            self.bins.truncate(self.bins.len() - 2);
            return false;
        }
        self.reallocate_neighbors(bin, first, second, cut.axis, cut.coordinate);
        self.bins[bin as usize].node = BinNode::Split {
            axis: cut.axis,
            coordinate: cut.coordinate,
            children: [first, second],
        };
        true
    }

    /// The cut dividing a bin's region, or `None` when the bin's objects give
    /// no usable cluster box.
    ///
    /// By preference large portions of empty space are carved out: if some
    /// side of the cluster box leaves a margin of at least
    /// [`EMPTY_SPACE_CARVEOUT_THRESHOLD`] of the bin extent on that axis, the
    /// cut goes through the cluster boundary on the axis/side with the
    /// largest relative margin. Otherwise the objects are divided evenly at
    /// the midpoint of the cluster box's longest axis.
    fn compute_optimal_cut(&self, bin: u32) -> Option<BinCut> {
        let bounds = *self.bin_bounds(bin);
        let bbox = self.contained_objects_clipped_bounding_box(bin)?;
        if bbox.is_collapsed() {
            return None;
        }
        let st = EMPTY_SPACE_CARVEOUT_THRESHOLD;
        let s_left = bbox.x1() - bounds.x1();
        let s_right = bounds.x2() - bbox.x2();
        let s_bottom = bbox.y1() - bounds.y1();
        let s_top = bounds.y2() - bbox.y2();
        let s_back = bbox.z1() - bounds.z1();
        let s_front = bounds.z2() - bbox.z2();
        let rel = |margin: f64, extent: f64| if extent > 0.0 { margin / extent } else { -1.0 };
        let sx = rel(s_left.max(s_right), bounds.width());
        let sy = rel(s_bottom.max(s_top), bounds.height());
        let sz = if self.split_exclusively_in_xy {
            -1.0
        } else {
            rel(s_back.max(s_front), bounds.depth())
        };
        let cut = if sx >= st && sx >= sy && sx >= sz {
            BinCut::new(
                Axis::X,
                if s_left >= s_right { bbox.x1() } else { bbox.x2() },
            )
        } else if sy >= st && sy >= sx && sy >= sz {
            BinCut::new(
                Axis::Y,
                if s_bottom >= s_top { bbox.y1() } else { bbox.y2() },
            )
        } else if sz >= st {
            BinCut::new(
                Axis::Z,
                if s_back >= s_front { bbox.z1() } else { bbox.z2() },
            )
        } else {
            // Divide the objects evenly along the longest dimension.
            let w = bbox.width();
            let h = bbox.height();
            let d = if self.split_exclusively_in_xy {
                -1.0
            } else {
                bbox.depth()
            };
            if w >= h && w >= d {
                BinCut::new(Axis::X, (bbox.x1() + bbox.x2()) / 2.0)
            } else if h >= w && h >= d {
                BinCut::new(Axis::Y, (bbox.y1() + bbox.y2()) / 2.0)
            } else {
                BinCut::new(Axis::Z, (bbox.z1() + bbox.z2()) / 2.0)
            }
        };
        Some(cut)
    }

    fn contained_objects_clipped_bounding_box(&self, bin: u32) -> Option<Box3> {
        let bounds = *self.bin_bounds(bin);
        let mut bbox: Option<Box3> = None;
        for object in self.leaf_objects(bin) {
            if let Some(object_box) = self.object_box(object) {
                if let Some(clipped) = object_box.intersection(&bounds) {
                    match bbox.as_mut() {
                        Some(b) => b.expand_to_contain(&clipped),
                        None => bbox = Some(clipped),
                    }
                }
            }
        }
        bbox
    }

    /// Create the two child bins of a cut and push them into the arena.
    /// Returns (first, second) where the first child covers the lower side
    /// of the cut axis.
    fn create_children(&mut self, bin: u32, cut: &BinCut) -> (u32, u32) {
        let bounds = *self.bin_bounds(bin);
        let depth = self.bins[bin as usize].depth_in_tree;
        let parent_objects: Vec<ArcObject> = self.leaf_objects(bin).to_vec();
        let mut child_ids = [0u32; 2];
        for (i, id) in child_ids.iter_mut().enumerate() {
            let child_bounds = child_bounds(&bounds, cut, i == 0);
            let objects: Vec<ArcObject> = parent_objects
                .iter()
                .filter(|object| match self.object_box(object) {
                    Some(object_box) => conservative_overlap(&object_box, &child_bounds),
                    None => true,
                })
                .cloned()
                .collect();
            *id = self.bins.len() as u32;
            self.bins.push(SpatialBin {
                bounds: child_bounds,
                depth_in_tree: depth + 1,
                parent: Some(bin),
                node: BinNode::Leaf {
                    objects,
                    neighbors: BinNeighbors::new(),
                },
            });
        }
        (child_ids[0], child_ids[1])
    }

    /// Spread a split bin's six neighbor-face lists over its two children,
    /// keeping the symmetric relation intact: every affected neighbor's
    /// back-reference to the split bin is rewritten to the covering child or,
    /// when the neighbor straddles the cut, split into references to both.
    fn reallocate_neighbors(&mut self, bin: u32, first: u32, second: u32, axis: Axis, c: f64) {
        if !self.track_bin_neighbors {
            return;
        }
        let parent_neighbors = std::mem::take(self.neighbors_mut(bin));
        for side in Face::ALL {
            self.neighbors_mut(first).mark_start(side);
            self.neighbors_mut(second).mark_start(side);
            if side.axis() == axis {
                if side.is_low() {
                    for &neighbor in parent_neighbors.on(side) {
                        self.neighbors_mut(first).push(neighbor);
                        self.neighbors_mut(neighbor).replace(bin, first);
                    }
                    self.neighbors_mut(second).push(first);
                } else {
                    for &neighbor in parent_neighbors.on(side) {
                        self.neighbors_mut(second).push(neighbor);
                        self.neighbors_mut(neighbor).replace(bin, second);
                    }
                    self.neighbors_mut(first).push(second);
                }
            } else {
                for &neighbor in parent_neighbors.on(side) {
                    let neighbor_bounds = *self.bin_bounds(neighbor);
                    if neighbor_bounds.high(axis) <= c {
                        self.neighbors_mut(first).push(neighbor);
                        self.neighbors_mut(neighbor).replace(bin, first);
                    } else if neighbor_bounds.low(axis) >= c {
                        self.neighbors_mut(second).push(neighbor);
                        self.neighbors_mut(neighbor).replace(bin, second);
                    } else {
                        self.neighbors_mut(first).push(neighbor);
                        self.neighbors_mut(second).push(neighbor);
                        self.neighbors_mut(neighbor).replace_with_pair(bin, first, second);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Point location
    // ------------------------------------------------------------------

    /// The leaf bin containing a point, starting the search at an arbitrary
    /// bin: ascends to the first ancestor containing the point, then
    /// descends along the cuts. Returns `None` when the point lies outside
    /// the indexed region.
    ///
    /// Points exactly on a cut are resolved by the per-axis affinity: the
    /// point goes to the lower child when the affinity is the axis's high
    /// face, i.e. the chosen bin is the one the point sits on the named face
    /// of.
    ///
    /// * `start`      - The bin to start from.
    /// * `point`      - The point, in the index's coordinate frame.
    /// * `affinities` - Cut tie-breaking, one face per axis.
    pub(crate) fn find_leaf_bin_containing_from(
        &self,
        start: u32,
        point: &Point3,
        affinities: [Face; 3],
    ) -> Option<u32> {
        let mut bin = start;
        while !self.bin_contains(bin, point) {
            bin = self.bins[bin as usize].parent?;
        }
        loop {
            match &self.bins[bin as usize].node {
                BinNode::Leaf { .. } => return Some(bin),
                BinNode::Split {
                    axis,
                    coordinate,
                    children,
                } => {
                    let c = point[*axis];
                    let go_low = c < *coordinate
                        || (c == *coordinate && affinities[*axis as usize] == Face::high_of(*axis));
                    bin = children[if go_low { 0 } else { 1 }];
                }
            }
        }
    }

    /// The leaf bin containing a point, searched from the root with the
    /// default affinities.
    ///
    /// * `point` - The point, in the index's coordinate frame.
    pub(crate) fn find_leaf_bin_containing(&self, point: &Point3) -> Option<u32> {
        self.find_leaf_bin_containing_from(ROOT_BIN, point, DEFAULT_AFFINITIES)
    }

    fn find_adjacent_bin_containing(
        &self,
        point: &Point3,
        home: Option<u32>,
        side: Face,
    ) -> Option<u32> {
        let home = home?;
        self.leaf_neighbors_on(home, side)
            .iter()
            .copied()
            .find(|&neighbor| self.bin_contains(neighbor, point))
    }
}

/// Default cut affinities: a point on a cut goes to the higher child.
pub(crate) const DEFAULT_AFFINITIES: [Face; 3] = [Face::Left, Face::Bottom, Face::Back];

impl SceneSpatialIndex for AdaptiveBinTreeIndex<'_> {
    fn build_index(&mut self) {
        self.create_root_bin();
        // The root bin is a leaf initially.
        let mut leafs = 1usize;
        let mut queue: VecDeque<u32> = VecDeque::new();
        queue.push_back(ROOT_BIN);
        while leafs < self.maximum_leaf_bins {
            let Some(bin) = queue.pop_front() else {
                break;
            };
            if self.split_bin(bin) {
                // Breadth-first traversal, to balance the bounded-size tree
                // in depth.
                if let BinNode::Split { children, .. } = &self.bins[bin as usize].node {
                    queue.push_back(children[0]);
                    queue.push_back(children[1]);
                }
                leafs += 1; // the bin no longer is a leaf, so -1 + 2
            }
        }
    }

    fn dispose(&mut self) {
        self.bins = Vec::new();
    }

    fn bin_statistics(&self) -> BinStatistics {
        let bins = self
            .leaf_bins()
            .map(|bin| BinOccupancy {
                object_count: self.leaf_objects(bin).len(),
                volume: self.bin_bounds(bin).volume(),
            })
            .collect();
        BinStatistics::new("Adaptive bin-tree index", bins)
    }
}

impl SpatialIndexQuery for AdaptiveBinTreeIndex<'_> {
    fn for_each_intersection(
        &self,
        ray: &Segment3,
        scratch: &mut IndexScratch,
        visit: &mut dyn FnMut(SurfacePoint) -> ControlFlow<()>,
    ) {
        for surface_point in self.object_intersections(ray, scratch) {
            if visit(surface_point).is_break() {
                break;
            }
        }
    }
}

impl fmt::Display for AdaptiveBinTreeIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bin_statistics().fmt(f)
    }
}

/// One bin in the arena: an axis-aligned region that either holds its
/// contained objects (leaf) or a split into two child bins.
struct SpatialBin {
    bounds: Box3,
    depth_in_tree: usize,
    parent: Option<u32>,
    node: BinNode,
}

enum BinNode {
    Leaf {
        objects: Vec<ArcObject>,
        neighbors: BinNeighbors,
    },
    Split {
        axis: Axis,
        coordinate: f64,
        children: [u32; 2],
    },
}

/// A cut through a bin: the axis it divides and the dividing coordinate.
#[derive(Copy, Clone, Debug)]
struct BinCut {
    axis: Axis,
    coordinate: f64,
}

impl BinCut {
    fn new(axis: Axis, coordinate: f64) -> Self {
        Self { axis, coordinate }
    }
}

fn child_bounds(bounds: &Box3, cut: &BinCut, low_side: bool) -> Box3 {
    let c = cut.coordinate;
    let (mut x1, mut x2) = (bounds.x1(), bounds.x2());
    let (mut y1, mut y2) = (bounds.y1(), bounds.y2());
    let (mut z1, mut z2) = (bounds.z1(), bounds.z2());
    match cut.axis {
        Axis::X => {
            if low_side {
                x2 = c;
            } else {
                x1 = c;
            }
        }
        Axis::Y => {
            if low_side {
                y2 = c;
            } else {
                y1 = c;
            }
        }
        Axis::Z => {
            if low_side {
                z2 = c;
            } else {
                z1 = c;
            }
        }
    }
    Box3::new(x1, x2, y1, y2, z1, z2)
}

/// The six face-ordered neighbor lists of a leaf bin, stored as one id
/// vector with per-face start offsets (in `Face::ALL` order).
#[derive(Default)]
struct BinNeighbors {
    bins: Vec<u32>,
    starts: [u32; 6],
}

impl BinNeighbors {
    fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a face's segment at the current end of the list.
    /// Faces must be marked and filled in `Face::ALL` order.
    fn mark_start(&mut self, side: Face) {
        self.starts[side as usize] = self.bins.len() as u32;
    }

    fn push(&mut self, neighbor: u32) {
        self.bins.push(neighbor);
    }

    fn range(&self, side: Face) -> std::ops::Range<usize> {
        let i = side as usize;
        let start = self.starts[i] as usize;
        let end = if i + 1 < self.starts.len() {
            self.starts[i + 1] as usize
        } else {
            self.bins.len()
        };
        start..end
    }

    fn on(&self, side: Face) -> &[u32] {
        &self.bins[self.range(side)]
    }

    fn replace(&mut self, neighbor: u32, replacement: u32) {
        if let Some(i) = self.bins.iter().position(|&b| b == neighbor) {
            self.bins[i] = replacement;
        } else {
            debug_assert!(false, "replaced bin is not a neighbor");
        }
    }

    fn replace_with_pair(&mut self, neighbor: u32, replacement1: u32, replacement2: u32) {
        if let Some(i) = self.bins.iter().position(|&b| b == neighbor) {
            self.bins[i] = replacement1;
            self.bins.insert(i + 1, replacement2);
            for start in self.starts.iter_mut() {
                if *start as usize > i {
                    *start += 1;
                }
            }
        } else {
            debug_assert!(false, "replaced bin is not a neighbor");
        }
    }
}

/// Depth-first iterator over the leaf bins of an [`AdaptiveBinTreeIndex`].
pub(crate) struct DepthFirstLeafBins<'s, 'a> {
    index: &'s AdaptiveBinTreeIndex<'a>,
    stack: Vec<u32>,
}

impl<'s, 'a> DepthFirstLeafBins<'s, 'a> {
    fn new(index: &'s AdaptiveBinTreeIndex<'a>) -> Self {
        let stack = if index.bins.is_empty() {
            Vec::new()
        } else {
            vec![ROOT_BIN]
        };
        let mut it = Self { index, stack };
        it.provision_next_leaf();
        it
    }

    fn provision_next_leaf(&mut self) {
        while let Some(&top) = self.stack.last() {
            match &self.index.bins[top as usize].node {
                BinNode::Leaf { .. } => break,
                BinNode::Split { children, .. } => {
                    self.stack.pop();
                    self.stack.push(children[0]);
                    self.stack.push(children[1]);
                }
            }
        }
    }
}

impl Iterator for DepthFirstLeafBins<'_, '_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let leaf = self.stack.pop()?;
        self.provision_next_leaf();
        Some(leaf)
    }
}

/// Lazy iterator over the surface points a line segment produces against an
/// [`AdaptiveBinTreeIndex`]. Starting in the leaf containing the segment's
/// first endpoint, the traversal repeatedly crosses into the adjacent leaf
/// through the nearest far plane(s), looked up in the neighbor-face lists.
pub struct AdaptiveObjectIntersections<'s, 'a> {
    index: &'s AdaptiveBinTreeIndex<'a>,
    scratch: &'s mut IndexScratch,
    line: Segment3,
    dx: f64,
    dy: f64,
    dz: f64,
    sx: f64,
    sy: f64,
    sz: f64,
    current_bin: Option<u32>,
    current_position: Point3,
    cursor: usize,
}

impl<'s, 'a> AdaptiveObjectIntersections<'s, 'a> {
    fn new(
        index: &'s AdaptiveBinTreeIndex<'a>,
        line: &Segment3,
        scratch: &'s mut IndexScratch,
    ) -> Self {
        scratch.begin_query();
        let p1 = line.p1;
        let p2 = line.p2;
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        let dz = p2.z - p1.z;
        let x_affinity = if dx >= 0.0 { Face::Left } else { Face::Right };
        let y_affinity = if dy >= 0.0 { Face::Bottom } else { Face::Top };
        let z_affinity = if dz >= 0.0 { Face::Back } else { Face::Front };
        let current_bin = if index.is_built() {
            index.find_leaf_bin_containing_from(
                ROOT_BIN,
                &p1,
                [x_affinity, y_affinity, z_affinity],
            )
        } else {
            None
        };
        Self {
            index,
            scratch,
            line: *line,
            dx,
            dy,
            dz,
            sx: dx.signum(),
            sy: dy.signum(),
            sz: dz.signum(),
            current_bin,
            current_position: p1,
            cursor: 0,
        }
    }

    /// Traverse leaf bins along the line until at least one surface point is
    /// buffered or the traversal is exhausted.
    fn provision_intersections(&mut self) -> bool {
        let index = self.index;
        while self.scratch.intersections.is_empty() {
            let Some(bin) = self.current_bin else {
                break;
            };
            let objects = index.leaf_objects(bin);
            if self.cursor < objects.len() {
                let object = &objects[self.cursor];
                self.cursor += 1;
                if self.scratch.visited_objects.insert(ObjectId::of(object)) {
                    if let Some(raytraceable) = object.as_raytraceable() {
                        let before = self.scratch.intersections.len();
                        raytraceable.intersect_with_light_ray(
                            &self.line,
                            index.scene(),
                            &mut self.scratch.intersections,
                        );
                        for sp in &mut self.scratch.intersections[before..] {
                            sp.object.get_or_insert_with(|| object.clone());
                        }
                    }
                }
            } else {
                self.advance_position_to_next_bin();
                self.cursor = 0;
            }
        }
        !self.scratch.intersections.is_empty()
    }

    fn advance_position_to_next_bin(&mut self) {
        let index = self.index;
        let bin = match self.current_bin {
            Some(bin) => bin,
            None => return,
        };
        let bounds = *index.bin_bounds(bin);
        // Parametric distance to the far plane per axis.
        let px = self.current_position.x;
        let rx = if self.dx > 0.0 {
            (bounds.x2() - px) / self.dx
        } else if self.dx < 0.0 {
            (bounds.x1() - px) / self.dx
        } else {
            f64::INFINITY
        };
        let py = self.current_position.y;
        let ry = if self.dy > 0.0 {
            (bounds.y2() - py) / self.dy
        } else if self.dy < 0.0 {
            (bounds.y1() - py) / self.dy
        } else {
            f64::INFINITY
        };
        let pz = self.current_position.z;
        let rz = if self.dz > 0.0 {
            (bounds.z2() - pz) / self.dz
        } else if self.dz < 0.0 {
            (bounds.z1() - pz) / self.dz
        } else {
            f64::INFINITY
        };
        // Closest side(s) hit; simultaneous crossings advance through more
        // than one face.
        let r = rx.min(ry).min(rz);
        self.scratch.crossed_faces.clear();
        let qx = if rx == r {
            self.scratch.crossed_faces.push(if self.dx > 0.0 {
                Face::Right
            } else {
                Face::Left
            });
            if self.dx > 0.0 {
                bounds.x2()
            } else {
                bounds.x1()
            }
        } else {
            px + r * self.dx
        };
        let qy = if ry == r {
            self.scratch.crossed_faces.push(if self.dy > 0.0 {
                Face::Top
            } else {
                Face::Bottom
            });
            if self.dy > 0.0 {
                bounds.y2()
            } else {
                bounds.y1()
            }
        } else {
            py + r * self.dy
        };
        let qz = if rz == r {
            self.scratch.crossed_faces.push(if self.dz > 0.0 {
                Face::Front
            } else {
                Face::Back
            });
            if self.dz > 0.0 {
                bounds.z2()
            } else {
                bounds.z1()
            }
        } else {
            pz + r * self.dz
        };
        // End of the line check.
        let p2 = self.line.p2;
        if qx * self.sx > p2.x * self.sx
            && qy * self.sy > p2.y * self.sy
            && qz * self.sz > p2.z * self.sz
        {
            self.current_bin = None;
        } else {
            self.current_position = Point3::new(qx, qy, qz);
            for i in 0..self.scratch.crossed_faces.len() {
                let side = self.scratch.crossed_faces[i];
                self.current_bin =
                    index.find_adjacent_bin_containing(&self.current_position, self.current_bin, side);
            }
        }
    }
}

impl Iterator for AdaptiveObjectIntersections<'_, '_> {
    type Item = SurfacePoint;

    fn next(&mut self) -> Option<SurfacePoint> {
        loop {
            if let Some(surface_point) = self.scratch.intersections.pop() {
                return Some(surface_point);
            }
            if !self.provision_intersections() {
                return None;
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use lucent3d_core::scratch::ReusableObjectPack;
    use proptest::prelude::*;

    fn built_index(scene: &Scene, max_leaf_bins: usize) -> AdaptiveBinTreeIndex<'_> {
        let mut index = AdaptiveBinTreeIndex::new(scene, max_leaf_bins);
        index.build_index();
        index
    }

    #[test]
    fn build_splits_a_clustered_scene() {
        let scene = test_scene(scattered_spheres(24));
        let index = built_index(&scene, 64);
        let stats = index.bin_statistics();
        assert!(stats.bin_count() > 1);
        assert!(stats.bin_count() <= 64);
        assert!(stats.maximum_objects_per_bin() < 24);
    }

    #[test]
    fn single_object_scene_stays_a_single_leaf() {
        let scene = test_scene(vec![sphere(Point3::new(0.0, 0.0, -8.0), 1.0)]);
        let index = built_index(&scene, 64);
        assert_eq!(index.bin_statistics().bin_count(), 1);
    }

    #[test]
    fn neighbor_lists_stay_symmetric_after_build() {
        let scene = test_scene(scattered_spheres(40));
        let index = built_index(&scene, 128);
        let leafs: Vec<u32> = index.leaf_bins().collect();
        assert!(leafs.len() > 1);
        for &leaf in &leafs {
            for side in Face::ALL {
                for &neighbor in index.leaf_neighbors_on(leaf, side) {
                    assert!(index.is_leaf(neighbor), "neighbor lists reference leafs");
                    let back = index.leaf_neighbors_on(neighbor, side.opposite());
                    assert!(
                        back.contains(&leaf),
                        "bin {leaf} lists {neighbor} on {side:?} but not vice versa"
                    );
                }
            }
        }
    }

    #[test]
    fn every_point_in_the_region_resolves_to_exactly_one_leaf() {
        let scene = test_scene(scattered_spheres(30));
        let index = built_index(&scene, 100);
        let region = *scene.bounding_box_in_camera();
        let mut inside = 0;
        for i in 0..10 {
            for j in 0..10 {
                for k in 0..10 {
                    let point = Point3::new(
                        region.x1() + region.width() * (i as f64 + 0.5) / 10.0,
                        region.y1() + region.height() * (j as f64 + 0.5) / 10.0,
                        region.z1() + region.depth() * (k as f64 + 0.5) / 10.0,
                    );
                    let leaf = index.find_leaf_bin_containing(&point);
                    assert!(leaf.is_some(), "interior point must resolve to a leaf");
                    // Exactly one leaf: the resolved leaf is the only one
                    // containing the point strictly.
                    let containing = index
                        .leaf_bins()
                        .filter(|&b| {
                            let bounds = index.bin_bounds(b);
                            point.x > bounds.x1()
                                && point.x < bounds.x2()
                                && point.y > bounds.y1()
                                && point.y < bounds.y2()
                                && point.z > bounds.z1()
                                && point.z < bounds.z2()
                        })
                        .count();
                    assert!(containing <= 1);
                    inside += 1;
                }
            }
        }
        assert_eq!(inside, 1000);
    }

    #[test]
    fn points_outside_the_region_resolve_to_none() {
        let scene = test_scene(scattered_spheres(10));
        let index = built_index(&scene, 32);
        let region = *scene.bounding_box_in_camera();
        let outside = Point3::new(region.x2() + 1.0, 0.0, region.z1() - 1.0);
        assert!(index.find_leaf_bin_containing(&outside).is_none());
    }

    #[test]
    fn traversal_finds_objects_along_the_segment() {
        let target = sphere(Point3::new(0.0, 0.0, -10.0), 1.0);
        let mut objects = scattered_spheres(20);
        objects.push(target.clone());
        let scene = test_scene(objects);
        let index = built_index(&scene, 64);
        let mut pack = ReusableObjectPack::new();
        let ray = Segment3::new(Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, -14.9));
        let hits: Vec<_> = index.object_intersections(&ray, &mut pack.index).collect();
        assert!(hits
            .iter()
            .any(|sp| sp.object_id() == Some(ObjectId::of(&target))));
    }

    proptest! {
        /// No false negatives: every object a brute-force scan reports for a
        /// segment is also reported by the adaptive index.
        #[test]
        fn traversal_has_no_false_negatives(
            seed in 0u64..32,
            from in interior_point_strategy(),
            to in interior_point_strategy(),
        ) {
            let scene = test_scene(seeded_shapes(seed, 16));
            let index = built_index(&scene, 64);
            let ray = Segment3::new(from, to);
            let expected = brute_force_hits(&scene, &ray);
            let mut pack = ReusableObjectPack::new();
            let found = collect_hit_ids(index.object_intersections(&ray, &mut pack.index));
            for id in expected {
                prop_assert!(found.contains(&id));
            }
        }
    }
}
