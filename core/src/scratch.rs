//! Reusable per-thread objects

use crate::geometry::Face;
use crate::light::LightId;
use crate::object::{ArcObject, ObjectId, SurfacePoint};
use std::collections::{HashMap, HashSet};

/// Collection of objects reusable exclusively within one worker thread.
///
/// Casting millions of rays per frame would otherwise allocate millions of
/// short-lived buffers; every query instead clears and refills the buffers
/// held here. Instances are created once per worker thread and passed down
/// the call chain. Nothing in here is thread-safe, and nothing needs to be:
/// each worker owns its pack exclusively.
pub struct ReusableObjectPack {
    /// Scratch used by spatial index traversal.
    pub index: IndexScratch,

    /// Scratch used by the shading model.
    pub shading: ShadingScratch,
}

impl ReusableObjectPack {
    pub fn new() -> Self {
        Self {
            index: IndexScratch::new(),
            shading: ShadingScratch::new(),
        }
    }

    /// Borrow the index and shading parts independently, so a shading pass
    /// can drive an index traversal while updating its own cache.
    pub fn split_mut(&mut self) -> (&mut IndexScratch, &mut ShadingScratch) {
        (&mut self.index, &mut self.shading)
    }
}

impl Default for ReusableObjectPack {
    fn default() -> Self {
        Self::new()
    }
}

/// Reusable state for spatial index queries.
pub struct IndexScratch {
    /// Surface points produced but not yet consumed by the current query.
    pub intersections: Vec<SurfacePoint>,

    /// Objects already tested during the current query; an object spanning
    /// several bins is tested once.
    pub visited_objects: HashSet<ObjectId>,

    /// Faces crossed when stepping to the next bin; more than one when the
    /// ray crosses several bin planes at once.
    pub crossed_faces: Vec<Face>,

    /// The leaf bin the previous view-plane lookup ended in. Successive
    /// screen samples are spatially coherent, so point location restarts from
    /// here instead of the root.
    pub last_visited_leaf: Option<u32>,
}

impl IndexScratch {
    pub fn new() -> Self {
        Self {
            intersections: Vec::new(),
            visited_objects: HashSet::with_capacity(300),
            crossed_faces: Vec::with_capacity(3),
            last_visited_leaf: None,
        }
    }

    /// Clear the per-query buffers. The last-visited-leaf slot survives
    /// across queries on purpose.
    pub fn begin_query(&mut self) {
        self.intersections.clear();
        self.visited_objects.clear();
        self.crossed_faces.clear();
    }
}

impl Default for IndexScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Reusable state for the shading model.
pub struct ShadingScratch {
    /// Buffer for re-testing a cached obscuring object against a light ray.
    pub probe_hits: Vec<SurfacePoint>,

    /// This thread's obscured-objects cache.
    pub obscured_cache: ObscuredObjectsCache,
}

impl ShadingScratch {
    pub fn new() -> Self {
        Self {
            probe_hits: Vec::new(),
            obscured_cache: ObscuredObjectsCache::new(),
        }
    }
}

impl Default for ShadingScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-thread memoization of shadow test results: for a (shaded object,
/// light source) pair, the object last found to fully obscure the light.
///
/// Bounded in size; on overflow the whole cache is cleared rather than
/// evicting individual entries. A full reset proved cheaper than LRU
/// bookkeeping, and a cleared cache is merely a cache miss.
pub struct ObscuredObjectsCache {
    entries: HashMap<(ObjectId, LightId), ArcObject>,
    max_entries: usize,
}

/// Default capacity of the obscured-objects cache.
const DEFAULT_CACHE_CAPACITY: usize = 100;

impl ObscuredObjectsCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache bounded to `max_entries` pairs.
    ///
    /// * `max_entries` - Maximum number of (object, light) entries.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Record `obscuring_object` as fully obscuring `light_source` from
    /// `obscured_object`.
    ///
    /// * `obscured_object`  - The shaded object.
    /// * `light_source`     - The light source.
    /// * `obscuring_object` - The fully opaque object in between.
    pub fn add_to_cache(
        &mut self,
        obscured_object: ObjectId,
        light_source: LightId,
        obscuring_object: ArcObject,
    ) {
        let key = (obscured_object, light_source);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.entries.clear();
        }
        self.entries.insert(key, obscuring_object);
    }

    /// The object last known to fully obscure `light_source` from
    /// `obscured_object`, if any.
    ///
    /// * `obscured_object` - The shaded object.
    /// * `light_source`    - The light source.
    pub fn obscuring_object(
        &self,
        obscured_object: ObjectId,
        light_source: LightId,
    ) -> Option<&ArcObject> {
        self.entries.get(&(obscured_object, light_source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ObscuredObjectsCache {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
