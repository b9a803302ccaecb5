/// 几何体生成和处理模块
///
/// 提供程序化几何体生成功能，以及顶点定义和网格数据结构。
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构定义
/// - `mesh`: 网格数据和子网格结构
/// - `generator`: 盒子、球体、测地球、圆柱、网格平面生成器
///
/// # 架构设计
///
/// ```text
/// GeometryGenerator
///     ↓
/// MeshData (CPU侧数据)
///     ↓ concatenate
/// 合并后的顶点/索引缓冲区 + Submesh
///     ↓
/// 渲染项（上传到GPU）
/// ```
///
/// # 使用示例
///
/// ```rust
/// use wave_render::geometry::{concatenate, GeometryGenerator};
///
/// let boxed = GeometryGenerator::create_box(1.5, 0.5, 1.5, 3);
/// let grid = GeometryGenerator::create_grid(20.0, 30.0, 60, 40);
/// let (merged, submeshes) = concatenate(&[&boxed, &grid]);
///
/// assert_eq!(submeshes.len(), 2);
/// assert_eq!(merged.vertex_count(), boxed.vertex_count() + grid.vertex_count());
/// ```

pub mod generator;
pub mod mesh;
pub mod vertex;

// 重新导出常用类型
pub use generator::{grid_indices, GeometryGenerator};
pub use mesh::{concatenate, MeshData, Submesh};
pub use vertex::Vertex;
