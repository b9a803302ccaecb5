//! 示例程序
//!
//! - [`BoxApp`]：8 个顶点的彩色立方体
//! - [`ShapesApp`]：盒子、平面和五对圆柱 + 球体，展示渲染项与脏标记
//! - [`LitWavesApp`]：带光照的山丘和波浪
//! - [`LandAndWavesApp`]：按高度着色的山丘和蓝色波浪
//!
//! 各示例共享 [`Scene`]（相机、几何体、渲染项、材质）和
//! [`WaterSurface`]（波浪模拟 + 随机扰动）。

mod box_app;
mod land_and_waves;
mod lit_waves;
mod shapes;

pub use box_app::BoxApp;
pub use land_and_waves::LandAndWavesApp;
pub use lit_waves::LitWavesApp;
pub use shapes::{ShapesApp, SHAPES_ITEM_COUNT};

use std::collections::HashMap;

use bytemuck::Pod;

use crate::app::camera::OrbitCamera;
use crate::core::config::{GraphicsConfig, SimulationConfig};
use crate::core::error::Result;
use crate::core::timer::GameTimer;
use crate::gfx::device::{FramePass, GpuDevice};
use crate::math::Vector3;
use crate::renderer::constants::{Light, PassConstants, PassInputs};
use crate::renderer::frame::FrameResource;
use crate::renderer::item::{self, Material, MeshGeometry, RenderItem};
use crate::sim::{RandomDisturber, Waves};

/// 示例共用的渲染设置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSettings {
    pub clear_color: [f32; 4],
    pub wireframe: bool,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self::from(&GraphicsConfig::default())
    }
}

impl From<&GraphicsConfig> for SampleSettings {
    fn from(config: &GraphicsConfig) -> Self {
        Self {
            clear_color: config.clear_color,
            wireframe: config.wireframe,
        }
    }
}

/// 场景：相机 + 几何体 + 渲染项 + 材质
#[derive(Debug)]
pub struct Scene {
    pub camera: OrbitCamera,
    pub settings: SampleSettings,
    pub geometries: HashMap<String, MeshGeometry>,
    pub items: Vec<RenderItem>,
    pub materials: Vec<Material>,
    pub ambient_light: [f32; 4],
    pub lights: Vec<Light>,
    /// 帧资源数量，新的渲染项和材质以此作为脏计数
    pub frame_resources: usize,
    width: u32,
    height: u32,
}

impl Scene {
    pub fn new(camera: OrbitCamera, settings: SampleSettings) -> Self {
        Self {
            camera,
            settings,
            geometries: HashMap::new(),
            items: Vec::new(),
            materials: Vec::new(),
            ambient_light: [0.0, 0.0, 0.0, 1.0],
            lights: Vec::new(),
            frame_resources: crate::renderer::frame::DEFAULT_FRAME_RESOURCES,
            width: 1,
            height: 1,
        }
    }

    pub fn add_geometry(&mut self, geometry: MeshGeometry) {
        self.geometries.insert(geometry.name.clone(), geometry);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// 本帧的通道常量
    pub fn pass_constants(&self, timer: &GameTimer) -> PassConstants {
        let mut pass = PassConstants::from_inputs(&PassInputs {
            view: self.camera.view(),
            proj: self.camera.proj(self.aspect_ratio()),
            eye: self.camera.eye(),
            width: self.width,
            height: self.height,
            near_z: self.camera.near_z,
            far_z: self.camera.far_z,
            total_time: timer.total_time(),
            delta_time: timer.delta_time(),
        });
        pass.ambient_light = self.ambient_light;
        for (slot, light) in pass.lights.iter_mut().zip(&self.lights) {
            *slot = *light;
        }
        pass
    }

    /// 写入通道常量、脏的物体常量和材质常量
    pub fn upload<D, V>(
        &mut self,
        device: &mut D,
        frame: &FrameResource<V>,
        timer: &GameTimer,
    ) -> Result<()>
    where
        D: GpuDevice + ?Sized,
        V: Pod,
    {
        item::update_object_constants(device, frame, &mut self.items)?;
        item::update_material_constants(device, frame, &mut self.materials)?;
        let pass = self.pass_constants(timer);
        frame.pass_cb.copy_data(device, 0, &pass)
    }

    /// 所有渲染项的绘制命令
    pub fn frame_pass<V: Pod>(&self, frame: &FrameResource<V>) -> Result<FramePass> {
        Ok(FramePass {
            clear_color: self.settings.clear_color,
            wireframe: self.settings.wireframe,
            pass_constants: frame.pass_cb.binding(0)?,
            draws: item::build_draw_commands(&self.items, &self.geometries, &self.materials, frame)?,
        })
    }
}

/// 波浪水面：模拟器 + 随机扰动
#[derive(Debug, Clone)]
pub struct WaterSurface {
    pub waves: Waves,
    pub disturber: RandomDisturber,
}

impl WaterSurface {
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Ok(Self {
            waves: Waves::from_config(config)?,
            disturber: RandomDisturber::from_config(config),
        })
    }

    /// 按计时器推进：先扰动，再按固定步长模拟
    pub fn advance(&mut self, timer: &GameTimer) -> u32 {
        self.disturber.maybe_disturb(&mut self.waves, timer.total_time());
        self.waves.update(timer.delta_time())
    }

    /// 把当前水面转换为顶点并写入帧资源的动态顶点缓冲区
    pub fn write_vertices<D, V, F>(
        &self,
        device: &mut D,
        frame: &FrameResource<V>,
        convert: F,
    ) -> Result<()>
    where
        D: GpuDevice + ?Sized,
        V: Pod,
        F: Fn(&Vector3, &Vector3) -> V,
    {
        let Some(vb) = &frame.waves_vb else {
            return Ok(());
        };
        let vertices: Vec<V> = self
            .waves
            .positions()
            .iter()
            .zip(self.waves.normals())
            .map(|(p, n)| convert(p, n))
            .collect();
        vb.copy_slice(device, 0, &vertices)
    }
}
