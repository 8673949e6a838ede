//! Render pass metrics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated over one render pass.
///
/// One instance is created per pass and threaded through the render context;
/// counters are relaxed atomics so worker threads can bump them without
/// coordination.
#[derive(Default)]
pub struct RenderMetrics {
    eye_rays: AtomicU64,
    shadow_ray_traversals: AtomicU64,
    obscured_cache_hits: AtomicU64,
    point_locations: AtomicU64,
    object_intersection_tests: AtomicU64,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_eye_rays(&self) {
        self.eye_rays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_shadow_ray_traversals(&self) {
        self.shadow_ray_traversals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_obscured_cache_hits(&self) {
        self.obscured_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_point_locations(&self) {
        self.point_locations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_object_intersection_tests(&self) {
        self.object_intersection_tests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn eye_rays(&self) -> u64 {
        self.eye_rays.load(Ordering::Relaxed)
    }

    pub fn shadow_ray_traversals(&self) -> u64 {
        self.shadow_ray_traversals.load(Ordering::Relaxed)
    }

    pub fn obscured_cache_hits(&self) -> u64 {
        self.obscured_cache_hits.load(Ordering::Relaxed)
    }

    pub fn point_locations(&self) -> u64 {
        self.point_locations.load(Ordering::Relaxed)
    }

    pub fn object_intersection_tests(&self) -> u64 {
        self.object_intersection_tests.load(Ordering::Relaxed)
    }
}

impl fmt::Display for RenderMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Render metrics {{")?;
        writeln!(f, "\tEye rays: {}", self.eye_rays())?;
        writeln!(f, "\tShadow ray traversals: {}", self.shadow_ray_traversals())?;
        writeln!(f, "\tObscured cache hits: {}", self.obscured_cache_hits())?;
        writeln!(f, "\tPoint locations: {}", self.point_locations())?;
        writeln!(
            f,
            "\tObject intersection tests: {}",
            self.object_intersection_tests()
        )?;
        write!(f, "}}")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = RenderMetrics::new();
        metrics.increment_eye_rays();
        metrics.increment_eye_rays();
        metrics.increment_obscured_cache_hits();
        assert_eq!(metrics.eye_rays(), 2);
        assert_eq!(metrics.obscured_cache_hits(), 1);
        assert_eq!(metrics.shadow_ray_traversals(), 0);
    }
}
