//! LitWaves：光照下的山丘和波浪
//!
//! 山丘是静态几何体；波浪只上传索引，顶点每帧由模拟结果写入当前帧资源。

use crate::app::camera::OrbitCamera;
use crate::app::host::FrameCallbacks;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::timer::GameTimer;
use crate::geometry::grid_indices;
use crate::gfx::device::{FramePass, GpuDevice};
use crate::math::constants::{HALF_PI, PI, QUARTER_PI};
use crate::math::utils;
use crate::renderer::constants::Light;
use crate::renderer::frame::{FrameResource, FrameResourceDesc};
use crate::renderer::item::{upload_mesh, Material, MeshGeometry, RenderItem};
use crate::renderer::vertex::LitVertex;
use crate::sim::land::build_hills;

use super::{SampleSettings, Scene, WaterSurface};

const LAND: &str = "landGeo";
const WATER: &str = "waterGeo";

const SUN_THETA: f32 = 1.25 * PI;
const SUN_PHI: f32 = QUARTER_PI;

/// 光照波浪示例
#[derive(Debug)]
pub struct LitWavesApp {
    scene: Scene,
    water: WaterSurface,
}

impl LitWavesApp {
    pub fn new(settings: SampleSettings, simulation: &SimulationConfig) -> Result<Self> {
        let camera = OrbitCamera::new(1.5 * PI, HALF_PI - 0.1, 50.0).with_zoom(5.0, 150.0, 0.2);
        let mut scene = Scene::new(camera, settings);
        scene.ambient_light = [0.25, 0.25, 0.35, 1.0];
        scene.lights.push(Light {
            strength: [1.0, 1.0, 0.9],
            direction: sun_direction().into(),
            ..Light::off()
        });

        Ok(Self {
            scene,
            water: WaterSurface::from_config(simulation)?,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn water(&self) -> &WaterSurface {
        &self.water
    }
}

/// 指向场景的太阳光方向
pub fn sun_direction() -> crate::math::Vector3 {
    -utils::spherical_to_cartesian(1.0, SUN_THETA, SUN_PHI)
}

impl<D: GpuDevice> FrameCallbacks<D, LitVertex> for LitWavesApp {
    fn name(&self) -> &'static str {
        "LitWaves"
    }

    fn init(&mut self, device: &mut D, frame_resources: usize) -> Result<FrameResourceDesc> {
        self.scene.frame_resources = frame_resources;

        let land = upload_mesh(device, &build_hills(), LAND, |v| LitVertex::from(v))?;
        let whole = land.whole();
        let land = land.with_submesh("grid", whole);

        let waves = &self.water.waves;
        let indices = grid_indices(waves.row_count() as u32, waves.column_count() as u32);
        let water = MeshGeometry::upload_dynamic::<LitVertex, _>(
            device,
            WATER,
            waves.vertex_count(),
            &indices,
        )?;
        let whole = water.whole();
        let water = water.with_submesh("grid", whole);

        self.scene.materials = vec![
            Material::new("grass", 0, frame_resources, [0.2, 0.6, 0.2, 1.0], [0.01; 3], 0.125),
            Material::new("water", 1, frame_resources, [0.0, 0.2, 0.6, 1.0], [0.1; 3], 0.0),
        ];
        self.scene.items = vec![
            RenderItem::new(LAND, land.submesh("grid")?, 0, frame_resources).with_material(0),
            RenderItem::new(WATER, water.submesh("grid")?, 1, frame_resources).with_material(1),
        ];
        self.scene.add_geometry(land);
        self.scene.add_geometry(water);

        Ok(FrameResourceDesc {
            pass_count: 1,
            object_count: self.scene.items.len(),
            material_count: self.scene.materials.len(),
            wave_vertex_count: self.water.waves.vertex_count(),
        })
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    fn update(
        &mut self,
        device: &mut D,
        frame: &FrameResource<LitVertex>,
        timer: &GameTimer,
    ) -> Result<()> {
        self.water.advance(timer);
        self.water
            .write_vertices(device, frame, LitVertex::from_vectors)?;
        self.scene.upload(device, frame, timer)
    }

    fn draw(&mut self, frame: &FrameResource<LitVertex>) -> Result<FramePass> {
        self.scene.frame_pass(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::PipelineKind;
    use crate::gfx::HeadlessDevice;

    #[test]
    fn test_sun_points_down() {
        let dir = sun_direction();
        assert!(dir.y < 0.0);
        assert!((dir.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_init_describes_frame_resources() {
        let mut device = HeadlessDevice::new(16, 16, 0);
        let mut app = LitWavesApp::new(SampleSettings::default(), &SimulationConfig::default())
            .unwrap();
        let desc = app.init(&mut device, 3).unwrap();

        assert_eq!(desc.material_count, 2);
        assert_eq!(desc.wave_vertex_count, app.water().waves.vertex_count());
        assert!(app
            .scene()
            .items
            .iter()
            .all(|item| item.pipeline == PipelineKind::Lit));

        for name in [LAND, WATER] {
            let geometry = &app.scene().geometries[name];
            assert_eq!(geometry.submesh("grid").unwrap(), geometry.whole());
        }
    }
}
