//! 用 headless 设备驱动宿主运行各个示例
//!
//! headless 设备在写入仍被 GPU 引用的缓冲区时返回错误，
//! 所以这里跑通即说明帧资源环的同步是正确的。

use wave_render::app::samples::SHAPES_ITEM_COUNT;
use wave_render::app::{
    AppHost, BoxApp, FrameCallbacks, HostOptions, LandAndWavesApp, LitWavesApp, SampleSettings,
    ShapesApp,
};
use wave_render::core::config::SimulationConfig;
use wave_render::gfx::{BufferId, GpuDevice, HeadlessDevice, PipelineKind};
use wave_render::renderer::vertex::{ColorVertex, LitVertex};

fn options(frame_resources: usize) -> HostOptions {
    HostOptions {
        frame_resources,
        fixed_delta_time: Some(1.0 / 60.0),
    }
}

fn read_vertices<V: bytemuck::Pod>(device: &HeadlessDevice, buffer: BufferId, count: usize) -> Vec<V> {
    let bytes = device.buffer_data(buffer).unwrap();
    let stride = std::mem::size_of::<V>();
    bytes[..count * stride]
        .chunks_exact(stride)
        .map(bytemuck::pod_read_unaligned::<V>)
        .collect()
}

#[test]
fn every_sample_runs_without_hazards() {
    let settings = SampleSettings::default();
    let simulation = SimulationConfig::default();

    let samples: Vec<Box<dyn FrameCallbacks<HeadlessDevice, ColorVertex>>> = vec![
        Box::new(BoxApp::new(settings)),
        Box::new(ShapesApp::new(settings)),
        Box::new(LandAndWavesApp::new(settings, &simulation).unwrap()),
    ];
    for callbacks in samples {
        let device = HeadlessDevice::new(320, 240, 2);
        let mut host: AppHost<HeadlessDevice, ColorVertex> =
            AppHost::new(device, options(3), callbacks).unwrap();
        host.run_frames(60).unwrap();
        host.flush().unwrap();
        assert_eq!(host.device().stats().frames_submitted, 60);
        assert_eq!(host.device().in_flight(), 0);
    }

    let device = HeadlessDevice::new(320, 240, 2);
    let app = LitWavesApp::new(settings, &simulation).unwrap();
    let mut host: AppHost<_, LitVertex, LitWavesApp> =
        AppHost::new(device, options(3), Box::new(app)).unwrap();
    host.run_frames(60).unwrap();

    let pass = host.device().last_pass().unwrap();
    assert_eq!(pass.draws.len(), 2);
    assert!(pass
        .draws
        .iter()
        .all(|d| d.pipeline == PipelineKind::Lit && d.material_constants.is_some()));
}

#[test]
fn ring_blocks_when_gpu_falls_behind() {
    let simulation = SimulationConfig::default();

    let device = HeadlessDevice::new(64, 64, 2);
    let app = LitWavesApp::new(SampleSettings::default(), &simulation).unwrap();
    let mut host: AppHost<_, LitVertex, LitWavesApp> =
        AppHost::new(device, options(3), Box::new(app)).unwrap();
    host.run_frames(10).unwrap();
    assert_eq!(host.ring().wait_count(), 0);

    let device = HeadlessDevice::new(64, 64, 5);
    let app = LitWavesApp::new(SampleSettings::default(), &simulation).unwrap();
    let mut host: AppHost<_, LitVertex, LitWavesApp> =
        AppHost::new(device, options(3), Box::new(app)).unwrap();
    host.run_frames(10).unwrap();
    assert!(host.ring().wait_count() > 0);
    // 未完成的提交不会超过环的大小
    assert!(host.device().in_flight() <= 3);
}

#[test]
fn wave_vertices_follow_simulation() {
    let device = HeadlessDevice::new(64, 64, 1);
    let app = LitWavesApp::new(SampleSettings::default(), &SimulationConfig::default()).unwrap();
    let mut host: AppHost<_, LitVertex, LitWavesApp> =
        AppHost::new(device, options(3), Box::new(app)).unwrap();
    host.run_frames(90).unwrap();

    let waves = &host.callbacks().water().waves;
    let vb = host.ring().current().waves_vb.as_ref().unwrap().buffer();
    let vertices: Vec<LitVertex> = read_vertices(host.device(), vb, waves.vertex_count());

    assert_eq!(vertices.len(), waves.vertex_count());
    for (k, vertex) in vertices.iter().enumerate() {
        let p = waves.position(k);
        let n = waves.normal(k);
        assert_eq!(vertex.position, [p.x, p.y, p.z]);
        assert_eq!(vertex.normal, [n.x, n.y, n.z]);
    }
    // 1.5 秒内至少发生过一次扰动
    assert!(vertices.iter().any(|v| v.position[1] != 0.0));
}

#[test]
fn same_seed_renders_same_water() {
    let run = |seed: u64| {
        let simulation = SimulationConfig {
            seed,
            ..SimulationConfig::default()
        };
        let device = HeadlessDevice::new(64, 64, 2);
        let app = LandAndWavesApp::new(SampleSettings::default(), &simulation).unwrap();
        let mut host: AppHost<_, ColorVertex, LandAndWavesApp> =
            AppHost::new(device, options(3), Box::new(app)).unwrap();
        host.run_frames(45).unwrap();
        host.callbacks().water().waves.positions().to_vec()
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn resize_updates_render_target() {
    let device = HeadlessDevice::new(64, 64, 2);
    let mut host: AppHost<_, ColorVertex, BoxApp> =
        AppHost::new(device, options(3), Box::new(BoxApp::new(SampleSettings::default())))
            .unwrap();
    host.run_frames(3).unwrap();
    host.resize(200, 100).unwrap();
    host.run_frames(3).unwrap();

    assert_eq!(host.device().size(), (200, 100));
    assert!((host.callbacks().scene().aspect_ratio() - 2.0).abs() < 1e-6);
}

#[test]
fn shapes_draws_every_item() {
    let device = HeadlessDevice::new(64, 64, 2);
    let mut host: AppHost<_, ColorVertex, ShapesApp> =
        AppHost::new(device, options(3), Box::new(ShapesApp::new(SampleSettings::default())))
            .unwrap();
    host.run_frames(4).unwrap();

    let pass = host.device().last_pass().unwrap();
    assert_eq!(pass.draws.len(), SHAPES_ITEM_COUNT);
    // 物体常量只在前 3 帧写入，之后不再是脏的
    assert!(host.callbacks().scene().items.iter().all(|i| i.num_frames_dirty == 0));
}
