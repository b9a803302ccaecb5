//! Shapes：多个几何体合并进一对顶点/索引缓冲区
//!
//! 盒子、平面、五对圆柱和球体共用一块几何体，每个物体是一个渲染项，
//! 通过子网格参数选择自己的那段索引。

use bytemuck::Pod;

use crate::app::camera::OrbitCamera;
use crate::app::host::FrameCallbacks;
use crate::core::error::Result;
use crate::core::timer::GameTimer;
use crate::geometry::{concatenate, GeometryGenerator, MeshData, Submesh};
use crate::gfx::device::{FramePass, GpuDevice};
use crate::math::constants::PI;
use crate::math::{matrix, Matrix4};
use crate::renderer::frame::{FrameResource, FrameResourceDesc};
use crate::renderer::item::{MeshGeometry, RenderItem};
use crate::renderer::vertex::ColorVertex;

use super::{SampleSettings, Scene};

const GEOMETRY: &str = "shapeGeo";
const SUBMESHES: [&str; 4] = ["box", "grid", "sphere", "cylinder"];

/// 圆柱 + 球体的行数
pub const COLUMN_ROWS: usize = 5;

/// 渲染项总数：盒子 + 平面 + 每行左右各一个圆柱和球体
pub const SHAPES_ITEM_COUNT: usize = 2 + COLUMN_ROWS * 4;

const DARK_GREEN: [f32; 4] = [0.0, 0.39, 0.0, 1.0];
const FOREST_GREEN: [f32; 4] = [0.13, 0.55, 0.13, 1.0];
const CRIMSON: [f32; 4] = [0.86, 0.08, 0.24, 1.0];
const STEEL_BLUE: [f32; 4] = [0.27, 0.51, 0.71, 1.0];

/// 形状示例
#[derive(Debug)]
pub struct ShapesApp {
    scene: Scene,
}

impl ShapesApp {
    pub fn new(settings: SampleSettings) -> Self {
        let camera = OrbitCamera::new(1.5 * PI, 0.2 * PI, 15.0).with_zoom(5.0, 150.0, 0.05);
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

    /// 每个物体使用统一颜色，合并成一块网格
    fn build_geometry() -> (MeshData, Vec<Submesh>, Vec<[f32; 4]>) {
        let box_mesh = GeometryGenerator::create_box(1.5, 0.5, 1.5, 3);
        let grid = GeometryGenerator::create_grid(20.0, 30.0, 60, 40);
        let sphere = GeometryGenerator::create_sphere(0.5, 20, 20);
        let cylinder = GeometryGenerator::create_cylinder(0.5, 0.3, 3.0, 20, 20);
        let meshes = [&box_mesh, &grid, &sphere, &cylinder];

        let colors = [DARK_GREEN, FOREST_GREEN, CRIMSON, STEEL_BLUE]
            .iter()
            .zip(meshes)
            .flat_map(|(color, mesh)| std::iter::repeat(*color).take(mesh.vertex_count()))
            .collect();

        let (merged, submeshes) = concatenate(&meshes);
        (merged, submeshes, colors)
    }
}

impl<D: GpuDevice, V: Pod> FrameCallbacks<D, V> for ShapesApp {
    fn name(&self) -> &'static str {
        "Shapes"
    }

    fn init(&mut self, device: &mut D, frame_resources: usize) -> Result<FrameResourceDesc> {
        self.scene.frame_resources = frame_resources;

        let (merged, submeshes, colors) = Self::build_geometry();
        let vertices: Vec<ColorVertex> = merged
            .vertices
            .iter()
            .zip(colors)
            .map(|(v, color)| ColorVertex::from_geometry(v, color))
            .collect();
        let mut geometry = MeshGeometry::upload(device, GEOMETRY, &vertices, &merged.indices)?;
        for (name, submesh) in SUBMESHES.iter().zip(submeshes) {
            geometry.draw_args.insert(name.to_string(), submesh);
        }

        let mut placements: Vec<(&str, Matrix4)> = Vec::with_capacity(SHAPES_ITEM_COUNT);
        placements.push((
            "box",
            matrix::translation(0.0, 0.5, 0.0) * matrix::scaling(2.0, 2.0, 2.0),
        ));
        placements.push(("grid", Matrix4::identity()));
        for i in 0..COLUMN_ROWS {
            let z = -10.0 + i as f32 * 5.0;
            placements.push(("cylinder", matrix::translation(-5.0, 1.5, z)));
            placements.push(("cylinder", matrix::translation(5.0, 1.5, z)));
            placements.push(("sphere", matrix::translation(-5.0, 3.5, z)));
            placements.push(("sphere", matrix::translation(5.0, 3.5, z)));
        }

        for (index, (name, world)) in placements.into_iter().enumerate() {
            let submesh = geometry.submesh(name)?;
            self.scene.items.push(
                RenderItem::new(GEOMETRY, submesh, index, frame_resources).with_world(world),
            );
        }
        self.scene.add_geometry(geometry);

        Ok(FrameResourceDesc {
            pass_count: 1,
            object_count: self.scene.items.len(),
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
    use crate::gfx::HeadlessDevice;
    use crate::renderer::vertex::LitVertex;

    #[test]
    fn test_shapes_items() {
        let mut device = HeadlessDevice::new(8, 8, 0);
        let mut app = ShapesApp::new(SampleSettings::default());
        let desc = FrameCallbacks::<_, LitVertex>::init(&mut app, &mut device, 3).unwrap();

        assert_eq!(desc.object_count, SHAPES_ITEM_COUNT);
        assert_eq!(app.scene().items.len(), 22);
        assert!(app.scene().items.iter().all(|i| i.num_frames_dirty == 3));

        let geometry = &app.scene().geometries[GEOMETRY];
        let grid = geometry.submesh("grid").unwrap();
        assert_eq!(grid.index_count, 59 * 39 * 6);
        let sphere = geometry.submesh("sphere").unwrap();
        assert!(sphere.base_vertex > grid.base_vertex);
    }

    #[test]
    fn test_colors_follow_meshes() {
        let (merged, submeshes, colors) = ShapesApp::build_geometry();
        assert_eq!(submeshes.len(), SUBMESHES.len());
        assert_eq!(colors.len(), merged.vertex_count());
        assert_eq!(colors[0], DARK_GREEN);
        assert_eq!(colors[colors.len() - 1], STEEL_BLUE);
    }
}
