//! LandAndWaves：按高度着色的山丘和蓝色波浪

use crate::app::camera::OrbitCamera;
use crate::app::host::FrameCallbacks;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::timer::GameTimer;
use crate::geometry::grid_indices;
use crate::gfx::device::{FramePass, GpuDevice};
use crate::math::constants::{HALF_PI, PI};
use crate::renderer::frame::{FrameResource, FrameResourceDesc};
use crate::renderer::item::{upload_mesh, MeshGeometry, RenderItem};
use crate::renderer::vertex::ColorVertex;
use crate::sim::land::{build_hills, height_color};

use super::{SampleSettings, Scene, WaterSurface};

const LAND: &str = "landGeo";
const WATER: &str = "waterGeo";

/// 波浪颜色
pub const WATER_COLOR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

#[derive(Debug)]
pub struct LandAndWavesApp {
    scene: Scene,
    water: WaterSurface,
}

impl LandAndWavesApp {
    pub fn new(settings: SampleSettings, simulation: &SimulationConfig) -> Result<Self> {
        let camera = OrbitCamera::new(1.5 * PI, HALF_PI - 0.1, 50.0).with_zoom(5.0, 150.0, 0.2);
        Ok(Self {
            scene: Scene::new(camera, settings),
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

impl<D: GpuDevice> FrameCallbacks<D, ColorVertex> for LandAndWavesApp {
    fn name(&self) -> &'static str {
        "LandAndWaves"
    }

    fn init(&mut self, device: &mut D, frame_resources: usize) -> Result<FrameResourceDesc> {
        self.scene.frame_resources = frame_resources;

        let land = upload_mesh(device, &build_hills(), LAND, |v| {
            ColorVertex::from_geometry(v, height_color(v.position[1]))
        })?;
        let whole = land.whole();
        let land = land.with_submesh("grid", whole);

        let waves = &self.water.waves;
        let indices = grid_indices(waves.row_count() as u32, waves.column_count() as u32);
        let water = MeshGeometry::upload_dynamic::<ColorVertex, _>(
            device,
            WATER,
            waves.vertex_count(),
            &indices,
        )?;
        let whole = water.whole();
        let water = water.with_submesh("grid", whole);

        self.scene.items = vec![
            RenderItem::new(LAND, land.submesh("grid")?, 0, frame_resources),
            RenderItem::new(WATER, water.submesh("grid")?, 1, frame_resources),
        ];
        self.scene.add_geometry(land);
        self.scene.add_geometry(water);

        Ok(FrameResourceDesc {
            pass_count: 1,
            object_count: self.scene.items.len(),
            material_count: 0,
            wave_vertex_count: self.water.waves.vertex_count(),
        })
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    fn update(
        &mut self,
        device: &mut D,
        frame: &FrameResource<ColorVertex>,
        timer: &GameTimer,
    ) -> Result<()> {
        self.water.advance(timer);
        self.water.write_vertices(device, frame, |position, _| {
            ColorVertex::new((*position).into(), WATER_COLOR)
        })?;
        self.scene.upload(device, frame, timer)
    }

    fn draw(&mut self, frame: &FrameResource<ColorVertex>) -> Result<FramePass> {
        self.scene.frame_pass(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::PipelineKind;
    use crate::gfx::HeadlessDevice;

    #[test]
    fn test_items_use_color_pipeline() {
        let mut device = HeadlessDevice::new(16, 16, 0);
        let mut app =
            LandAndWavesApp::new(SampleSettings::default(), &SimulationConfig::default()).unwrap();
        let desc = app.init(&mut device, 2).unwrap();

        assert_eq!(desc.material_count, 0);
        assert_eq!(desc.object_count, 2);
        assert!(app
            .scene()
            .items
            .iter()
            .all(|item| item.pipeline == PipelineKind::Color && item.material.is_none()));

        let water = &app.scene().geometries[WATER];
        let grid = water.submesh("grid").unwrap();
        assert_eq!(grid, water.whole());
        assert_eq!(grid.index_count as usize, app.water().waves.triangle_count() * 3);
    }
}
