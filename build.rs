/// Build script for WaveRender
///
/// # Shader Strategy:
/// - wgpu: WGSL shaders embedded with `include_str!` and compiled by wgpu at runtime
/// - headless: no shaders, draw calls are only recorded
fn main() {
    // Trigger rebuild if shader files change
    println!("cargo:rerun-if-changed=src/gfx/shaders/color.wgsl");
    println!("cargo:rerun-if-changed=src/gfx/shaders/lit.wgsl");
}
