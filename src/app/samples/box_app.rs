//! Box：一个顶点着色的立方体

use bytemuck::Pod;

use crate::app::camera::OrbitCamera;
use crate::app::host::FrameCallbacks;
use crate::core::error::Result;
use crate::core::timer::GameTimer;
use crate::geometry::Submesh;
use crate::gfx::device::{FramePass, GpuDevice};
use crate::math::constants::{PI, QUARTER_PI};
use crate::renderer::frame::{FrameResource, FrameResourceDesc};
use crate::renderer::item::{MeshGeometry, RenderItem};
use crate::renderer::vertex::ColorVertex;

use super::{SampleSettings, Scene};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 0.5, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const YELLOW: [f32; 4] = [1.0, 1.0, 0.0, 1.0];
const CYAN: [f32; 4] = [0.0, 1.0, 1.0, 1.0];
const MAGENTA: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

/// 立方体的 8 个顶点
pub fn box_vertices() -> [ColorVertex; 8] {
    [
        ColorVertex::new([-1.0, -1.0, -1.0], WHITE),
        ColorVertex::new([-1.0, 1.0, -1.0], BLACK),
        ColorVertex::new([1.0, 1.0, -1.0], RED),
        ColorVertex::new([1.0, -1.0, -1.0], GREEN),
        ColorVertex::new([-1.0, -1.0, 1.0], BLUE),
        ColorVertex::new([-1.0, 1.0, 1.0], YELLOW),
        ColorVertex::new([1.0, 1.0, 1.0], CYAN),
        ColorVertex::new([1.0, -1.0, 1.0], MAGENTA),
    ]
}

/// 立方体的 12 个三角形，从外侧看为逆时针
pub const BOX_INDICES: [u32; 36] = [
    0, 1, 2, 0, 2, 3, // -z
    4, 6, 5, 4, 7, 6, // +z
    4, 5, 1, 4, 1, 0, // -x
    3, 2, 6, 3, 6, 7, // +x
    1, 5, 6, 1, 6, 2, // +y
    4, 0, 3, 4, 3, 7, // -y
];

/// 立方体示例
#[derive(Debug)]
pub struct BoxApp {
    scene: Scene,
}

impl BoxApp {
    pub fn new(settings: SampleSettings) -> Self {
        let camera = OrbitCamera::new(1.5 * PI, QUARTER_PI, 5.0).with_zoom(3.0, 15.0, 0.005);
        Self {
            scene: Scene::new(camera, settings),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
}

impl<D: GpuDevice, V: Pod> FrameCallbacks<D, V> for BoxApp {
    fn name(&self) -> &'static str {
        "Box"
    }

    fn init(&mut self, device: &mut D, frame_resources: usize) -> Result<FrameResourceDesc> {
        self.scene.frame_resources = frame_resources;

        let geometry = MeshGeometry::upload(device, "boxGeo", &box_vertices(), &BOX_INDICES)?
            .with_submesh("box", Submesh::new(BOX_INDICES.len() as u32, 0, 0));
        let submesh = geometry.submesh("box")?;
        self.scene.add_geometry(geometry);
        self.scene
            .items
            .push(RenderItem::new("boxGeo", submesh, 0, frame_resources));

        Ok(FrameResourceDesc {
            pass_count: 1,
            object_count: 1,
            ..FrameResourceDesc::default()
        })
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    fn update(&mut self, device: &mut D, frame: &FrameResource<V>, timer: &GameTimer) -> Result<()> {
        self.scene.upload(device, frame, timer)
    }

    fn draw(&mut self, frame: &FrameResource<V>) -> Result<FramePass> {
        self.scene.frame_pass(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn test_box_faces_outward() {
        let vertices = box_vertices();
        for tri in BOX_INDICES.chunks_exact(3) {
            let p = |i: u32| Vector3::from(vertices[i as usize].position);
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let normal = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(&centroid) > 0.0, "triangle {:?} faces inward", tri);
        }
    }

    #[test]
    fn test_box_uses_every_vertex() {
        for v in 0..8u32 {
            assert!(BOX_INDICES.contains(&v));
        }
    }
}
