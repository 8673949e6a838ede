//! Uniform grid index

use crate::common::{indexed_objects, IndexedFrame};
use crate::stats::{BinOccupancy, BinStatistics};
use crate::SceneSpatialIndex;
use itertools::iproduct;
use lucent3d_core::geometry::{Box3, Segment3};
use lucent3d_core::index::SpatialIndexQuery;
use lucent3d_core::object::{ArcObject, ObjectId, SurfacePoint};
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::IndexScratch;
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;

/// 3-D index of a scene's objects in camera coordinates, as a Cartesian grid
/// of equally sized cuboid bins.
///
/// Compared to [`AdaptiveBinTreeIndex`](crate::AdaptiveBinTreeIndex) the grid
/// builds faster, traverses cheaper and carries less memory overhead, but
/// divides space less efficiently. The factory builds both and keeps the one
/// with the better statistics.
pub struct UniformGridIndex<'a> {
    scene: &'a Scene,
    x_bins: usize,
    y_bins: usize,
    z_bins: usize,
    index: HashMap<(i32, i32, i32), Vec<ArcObject>>,
    first_bin_box: Box3,
}

impl<'a> UniformGridIndex<'a> {
    /// Create a new, not yet built, `UniformGridIndex`.
    ///
    /// * `scene`  - The scene snapshot.
    /// * `x_bins` - Number of bins along X.
    /// * `y_bins` - Number of bins along Y.
    /// * `z_bins` - Number of bins along Z.
    pub fn new(scene: &'a Scene, x_bins: usize, y_bins: usize, z_bins: usize) -> Self {
        let scene_box = *scene.bounding_box_in_camera();
        let first_bin_box = Box3::new(
            scene_box.x1(),
            scene_box.x1() + scene_box.width() / x_bins as f64,
            scene_box.y1(),
            scene_box.y1() + scene_box.height() / y_bins as f64,
            scene_box.z1(),
            scene_box.z1() + scene_box.depth() / z_bins as f64,
        );
        Self {
            scene,
            x_bins,
            y_bins,
            z_bins,
            index: HashMap::with_capacity(x_bins * y_bins),
            first_bin_box,
        }
    }

    /// Lazily-produced surface points of objects intersecting the given line
    /// segment, via a parametric walk over the grid bins the segment passes
    /// through.
    ///
    /// * `line`    - The segment, in camera coordinates; its first endpoint
    ///               must lie inside the indexed region.
    /// * `scratch` - Index scratch of the current thread.
    pub fn object_intersections<'s>(
        &'s self,
        line: &Segment3,
        scratch: &'s mut IndexScratch,
    ) -> UniformObjectIntersections<'s, 'a> {
        UniformObjectIntersections::new(self, line, scratch)
    }

    fn add_object(&mut self, object: ArcObject) {
        let camera = self.scene.camera();
        match IndexedFrame::Camera.object_box(&object, camera) {
            Some(bbox) => {
                let x1 = self.map_to_x_bin(bbox.x1());
                let x2 = self.map_to_x_bin(bbox.x2());
                let y1 = self.map_to_y_bin(bbox.y1());
                let y2 = self.map_to_y_bin(bbox.y2());
                let z1 = self.map_to_z_bin(bbox.z1());
                let z2 = self.map_to_z_bin(bbox.z2());
                for (xi, yi, zi) in iproduct!(x1..=x2, y1..=y2, z1..=z2) {
                    self.index_object(&object, xi, yi, zi);
                }
            }
            None => {
                // No info on bounds, so the object goes into every bin.
                debug!("Object without bounds is indexed into every grid bin");
                for (xi, yi, zi) in iproduct!(
                    0..self.x_bins as i32,
                    0..self.y_bins as i32,
                    0..self.z_bins as i32
                ) {
                    self.index_object(&object, xi, yi, zi);
                }
            }
        }
    }

    fn index_object(&mut self, object: &ArcObject, xi: i32, yi: i32, zi: i32) {
        self.index
            .entry((xi, yi, zi))
            .or_default()
            .push(object.clone());
    }

    fn map_to_x_bin(&self, x: f64) -> i32 {
        let xi = ((x - self.first_bin_box.x1()) / self.first_bin_box.width()).floor() as i32;
        xi.clamp(0, self.x_bins as i32 - 1)
    }

    fn map_to_y_bin(&self, y: f64) -> i32 {
        let yi = ((y - self.first_bin_box.y1()) / self.first_bin_box.height()).floor() as i32;
        yi.clamp(0, self.y_bins as i32 - 1)
    }

    fn map_to_z_bin(&self, z: f64) -> i32 {
        let zi = ((z - self.first_bin_box.z1()) / self.first_bin_box.depth()).floor() as i32;
        zi.clamp(0, self.z_bins as i32 - 1)
    }

    fn bin_boundary_x(&self, x_bin: i32, x_dir: i32) -> f64 {
        let steps = if x_dir < 0 { x_bin } else { x_bin + 1 };
        self.first_bin_box.x1() + self.first_bin_box.width() * steps as f64
    }

    fn bin_boundary_y(&self, y_bin: i32, y_dir: i32) -> f64 {
        let steps = if y_dir < 0 { y_bin } else { y_bin + 1 };
        self.first_bin_box.y1() + self.first_bin_box.height() * steps as f64
    }

    fn bin_boundary_z(&self, z_bin: i32, z_dir: i32) -> f64 {
        let steps = if z_dir < 0 { z_bin } else { z_bin + 1 };
        self.first_bin_box.z1() + self.first_bin_box.depth() * steps as f64
    }

    fn objects_in_bin(&self, xi: i32, yi: i32, zi: i32) -> Option<&[ArcObject]> {
        self.index.get(&(xi, yi, zi)).map(Vec::as_slice)
    }

    pub(crate) fn scene(&self) -> &'a Scene {
        self.scene
    }
}

impl SceneSpatialIndex for UniformGridIndex<'_> {
    fn build_index(&mut self) {
        let scene_box = *self.scene.bounding_box_in_camera();
        for object in indexed_objects(self.scene, &scene_box, IndexedFrame::Camera) {
            self.add_object(object);
        }
    }

    fn dispose(&mut self) {
        self.index.clear();
    }

    fn bin_statistics(&self) -> BinStatistics {
        let bins = iproduct!(
            0..self.z_bins as i32,
            0..self.y_bins as i32,
            0..self.x_bins as i32
        )
        .map(|(zi, yi, xi)| BinOccupancy {
            object_count: self.objects_in_bin(xi, yi, zi).map_or(0, |objects| objects.len()),
            volume: 1.0,
        })
        .collect();
        BinStatistics::new("Uniform grid index", bins)
    }
}

impl SpatialIndexQuery for UniformGridIndex<'_> {
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

impl fmt::Display for UniformGridIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bin_statistics().fmt(f)
    }
}

/// Lazy iterator over the surface points a line segment produces against a
/// [`UniformGridIndex`]. Bins are visited in order of increasing distance
/// along the segment; each unique object is tested once per query.
pub struct UniformObjectIntersections<'s, 'a> {
    index: &'s UniformGridIndex<'a>,
    scratch: &'s mut IndexScratch,
    line: Segment3,
    x1: f64,
    xd: f64,
    x_dir: i32,
    xi: i32,
    xn: i32,
    x_in: bool,
    tx: f64,
    y1: f64,
    yd: f64,
    y_dir: i32,
    yi: i32,
    yn: i32,
    y_in: bool,
    ty: f64,
    z1: f64,
    zd: f64,
    z_dir: i32,
    zi: i32,
    zn: i32,
    z_in: bool,
    tz: f64,
    current: Option<&'s [ArcObject]>,
    cursor: usize,
    proceed: bool,
}

impl<'s, 'a> UniformObjectIntersections<'s, 'a> {
    fn new(
        index: &'s UniformGridIndex<'a>,
        line: &Segment3,
        scratch: &'s mut IndexScratch,
    ) -> Self {
        scratch.begin_query();
        let p1 = line.p1;
        let p2 = line.p2;
        // X
        let x1 = p1.x;
        let xd = p2.x - x1;
        let x_dir = sign(xd);
        let xi = index.map_to_x_bin(x1);
        let xn = index.x_bins as i32 - 1;
        let x_in = xi >= 0 && xi <= xn;
        // Y
        let y1 = p1.y;
        let yd = p2.y - y1;
        let y_dir = sign(yd);
        let yi = index.map_to_y_bin(y1);
        let yn = index.y_bins as i32 - 1;
        let y_in = yi >= 0 && yi <= yn;
        // Z
        let z1 = p1.z;
        let zd = p2.z - z1;
        let z_dir = sign(zd);
        let zi = index.map_to_z_bin(z1);
        let zn = index.z_bins as i32 - 1;
        let z_in = zi >= 0 && zi <= zn;
        // Parametric positions of the nearest bin boundary per axis.
        let tx = if xd != 0.0 {
            (index.bin_boundary_x(xi, x_dir) - x1) / xd
        } else {
            f64::MAX
        };
        let ty = if yd != 0.0 {
            (index.bin_boundary_y(yi, y_dir) - y1) / yd
        } else {
            f64::MAX
        };
        let tz = if zd != 0.0 {
            (index.bin_boundary_z(zi, z_dir) - z1) / zd
        } else {
            f64::MAX
        };
        let proceed = x_in && y_in && z_in;
        Self {
            index,
            scratch,
            line: *line,
            x1,
            xd,
            x_dir,
            xi,
            xn,
            x_in,
            tx,
            y1,
            yd,
            y_dir,
            yi,
            yn,
            y_in,
            ty,
            z1,
            zd,
            z_dir,
            zi,
            zn,
            z_in,
            tz,
            current: None,
            cursor: 0,
            proceed,
        }
    }

    /// Traverse bins along the line until at least one surface point is
    /// buffered or the traversal is exhausted.
    fn provision_intersections(&mut self) -> bool {
        let index = self.index;
        while self.proceed && self.scratch.intersections.is_empty() {
            if self.current.is_none() && self.x_in && self.y_in && self.z_in {
                if let Some(objects) = index.objects_in_bin(self.xi, self.yi, self.zi) {
                    self.current = Some(objects);
                    self.cursor = 0;
                }
            }
            match self.current {
                Some(objects) if self.cursor < objects.len() => {
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
                }
                _ => {
                    self.current = None;
                    self.advance_to_next_bin();
                }
            }
        }
        !self.scratch.intersections.is_empty()
    }

    fn advance_to_next_bin(&mut self) {
        if self.tx <= self.ty && self.tx <= self.tz {
            self.xi += self.x_dir;
            self.tx = (self.index.bin_boundary_x(self.xi, self.x_dir) - self.x1) / self.xd;
            self.x_in = self.xi >= 0 && self.xi <= self.xn;
            self.proceed = self.proceed && self.x_in;
        } else if self.ty <= self.tx && self.ty <= self.tz {
            self.yi += self.y_dir;
            self.ty = (self.index.bin_boundary_y(self.yi, self.y_dir) - self.y1) / self.yd;
            self.y_in = self.yi >= 0 && self.yi <= self.yn;
            self.proceed = self.proceed && self.y_in;
        } else {
            self.zi += self.z_dir;
            self.tz = (self.index.bin_boundary_z(self.zi, self.z_dir) - self.z1) / self.zd;
            self.z_in = self.zi >= 0 && self.zi <= self.zn;
            self.proceed = self.proceed && self.z_in;
        }
        // The traversal ends once the whole segment has been covered.
        self.proceed = self.proceed && (self.tx <= 1.0 || self.ty <= 1.0 || self.tz <= 1.0);
    }
}

impl Iterator for UniformObjectIntersections<'_, '_> {
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

fn sign(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
