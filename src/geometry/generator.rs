/// 程序化几何体生成器
///
/// 生成盒子、球体、测地球、圆柱和网格平面。所有三角形都朝外：
/// 从法线方向看过去，顶点按逆时针排列。
///
/// 若需要朝内的三角形（例如把相机放在球体内部模拟天空），需要：
/// 1. 反转索引的环绕顺序或修改剔除模式
/// 2. 反转法线
/// 3. 相应地更新纹理坐标和切线

use super::mesh::MeshData;
use super::vertex::Vertex;
use crate::math::constants::{PI, TAU};
use crate::math::Vector3;

/// 细分次数上限
pub const MAX_SUBDIVISIONS: u32 = 6;

/// 几何体生成器
///
/// 无状态，所有方法都是关联函数。
pub struct GeometryGenerator;

impl GeometryGenerator {
    /// 创建以原点为中心的盒子
    ///
    /// 每个面独立使用 4 个顶点（共 24 个），这样每个面可以有自己的法线和 UV。
    /// `num_subdivisions` 最大为 [`MAX_SUBDIVISIONS`]。
    pub fn create_box(width: f32, height: f32, depth: f32, num_subdivisions: u32) -> MeshData {
        let w2 = 0.5 * width;
        let h2 = 0.5 * height;
        let d2 = 0.5 * depth;

        let v = Vertex::from_components;

        #[rustfmt::skip]
        let vertices = vec![
            // 前面
            v(-w2, -h2, -d2, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            v(-w2, h2, -d2, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            v(w2, h2, -d2, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 0.0),
            v(w2, -h2, -d2, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 1.0),
            // 后面
            v(-w2, -h2, d2, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 1.0),
            v(w2, -h2, d2, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 1.0),
            v(w2, h2, d2, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0),
            v(-w2, h2, d2, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0),
            // 顶面
            v(-w2, h2, -d2, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            v(-w2, h2, d2, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            v(w2, h2, d2, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0),
            v(w2, h2, -d2, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0),
            // 底面
            v(-w2, -h2, -d2, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 1.0),
            v(w2, -h2, -d2, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0),
            v(w2, -h2, d2, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0),
            v(-w2, -h2, d2, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0),
            // 左面
            v(-w2, -h2, d2, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0),
            v(-w2, h2, d2, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0),
            v(-w2, h2, -d2, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0),
            v(-w2, -h2, -d2, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 1.0, 1.0),
            // 右面
            v(w2, -h2, -d2, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0),
            v(w2, h2, -d2, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0),
            v(w2, h2, d2, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0),
            v(w2, -h2, d2, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0),
        ];

        // 每个面两个三角形：(0,1,2) 和 (0,2,3)
        let indices = (0..6u32)
            .flat_map(|face| {
                let b = face * 4;
                [b, b + 1, b + 2, b, b + 2, b + 3]
            })
            .collect();

        let mut mesh = MeshData {
            vertices,
            indices,
            name: Some("box".to_string()),
        };

        for _ in 0..num_subdivisions.min(MAX_SUBDIVISIONS) {
            Self::subdivide(&mut mesh);
        }
        mesh
    }

    /// 创建以原点为中心的 UV 球体
    ///
    /// 从北极开始自上而下逐层生成顶点。两极处纹理坐标会有畸变，
    /// 因为矩形纹理映射到球面时极点没有唯一对应的纹理位置。
    pub fn create_sphere(radius: f32, slice_count: u32, stack_count: u32) -> MeshData {
        assert!(slice_count >= 3 && stack_count >= 2, "sphere needs at least 3 slices and 2 stacks");

        let mut mesh = MeshData::with_name("sphere");

        let top = Vertex::from_components(0.0, radius, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        let bottom =
            Vertex::from_components(0.0, -radius, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);

        mesh.vertices.push(top);

        let phi_step = PI / stack_count as f32;
        let theta_step = TAU / slice_count as f32;

        // 不把两极算作环
        for i in 1..stack_count {
            let phi = i as f32 * phi_step;

            for j in 0..=slice_count {
                let theta = j as f32 * theta_step;

                let position = Vector3::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                );

                // P 对 theta 的偏导
                let tangent = Vector3::new(
                    -radius * phi.sin() * theta.sin(),
                    0.0,
                    radius * phi.sin() * theta.cos(),
                );

                mesh.vertices.push(Vertex::new(
                    position.into(),
                    normalize_or_zero(position).into(),
                    [theta / TAU, phi / PI],
                    normalize_or_zero(tangent).into(),
                ));
            }
        }

        mesh.vertices.push(bottom);

        // 顶部一圈：北极连接第一个环
        for i in 1..=slice_count {
            mesh.indices.extend_from_slice(&[0, i % slice_count + 1, i]);
        }

        // 中间各层，偏移掉北极顶点
        let base_index = 1;
        let ring_vertex_count = slice_count + 1;
        for i in 0..stack_count - 2 {
            for j in 0..slice_count {
                let a = base_index + i * ring_vertex_count + j;
                let b = base_index + (i + 1) * ring_vertex_count + j;
                mesh.indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
            }
        }

        // 底部一圈：南极最后写入
        let south_pole = mesh.vertices.len() as u32 - 1;
        let base_index = south_pole - ring_vertex_count;
        for i in 0..slice_count {
            mesh.indices
                .extend_from_slice(&[south_pole, base_index + i, base_index + i + 1]);
        }

        mesh
    }

    /// 创建测地球：细分二十面体后投影到球面
    ///
    /// 相比 UV 球体，三角形面积更均匀。`num_subdivisions` 最大为 [`MAX_SUBDIVISIONS`]。
    pub fn create_geosphere(radius: f32, num_subdivisions: u32) -> MeshData {
        const X: f32 = 0.525731;
        const Z: f32 = 0.850651;

        let positions: [[f32; 3]; 12] = [
            [-X, 0.0, Z], [X, 0.0, Z],
            [-X, 0.0, -Z], [X, 0.0, -Z],
            [0.0, Z, X], [0.0, Z, -X],
            [0.0, -Z, X], [0.0, -Z, -X],
            [Z, X, 0.0], [-Z, X, 0.0],
            [Z, -X, 0.0], [-Z, -X, 0.0],
        ];

        #[rustfmt::skip]
        let indices: [u32; 60] = [
            1, 4, 0,   4, 9, 0,   4, 5, 9,   8, 5, 4,   1, 8, 4,
            1, 10, 8,  10, 3, 8,  8, 3, 5,   3, 2, 5,   3, 7, 2,
            3, 10, 7,  10, 6, 7,  6, 11, 7,  6, 0, 11,  6, 1, 0,
            10, 1, 6,  11, 0, 9,  2, 11, 9,  5, 2, 9,   11, 2, 7,
        ];

        let mut mesh = MeshData {
            vertices: positions
                .iter()
                .map(|&p| Vertex::new(p, [0.0; 3], [0.0; 2], [0.0; 3]))
                .collect(),
            indices: indices.to_vec(),
            name: Some("geosphere".to_string()),
        };

        for _ in 0..num_subdivisions.min(MAX_SUBDIVISIONS) {
            Self::subdivide(&mut mesh);
        }

        // 投影到球面并重新计算属性
        for vertex in &mut mesh.vertices {
            let n = normalize_or_zero(vertex.position_vec());
            let p = n * radius;

            // 由笛卡尔坐标推回球坐标
            let mut theta = p.z.atan2(p.x);
            if theta < 0.0 {
                theta += TAU;
            }
            let phi = (p.y / radius).clamp(-1.0, 1.0).acos();

            let tangent = Vector3::new(
                -radius * phi.sin() * theta.sin(),
                0.0,
                radius * phi.sin() * theta.cos(),
            );

            vertex.position = p.into();
            vertex.normal = n.into();
            vertex.texcoord = [theta / TAU, phi / PI];
            vertex.tangent = normalize_or_zero(tangent).into();
        }

        mesh
    }

    /// 创建沿 y 轴、以原点为中心的圆柱（含上下底面）
    ///
    /// 顶部半径和底部半径可以不同，从而得到圆台。
    pub fn create_cylinder(
        bottom_radius: f32,
        top_radius: f32,
        height: f32,
        slice_count: u32,
        stack_count: u32,
    ) -> MeshData {
        assert!(slice_count >= 3 && stack_count >= 1, "cylinder needs at least 3 slices and 1 stack");

        let mut mesh = MeshData::with_name("cylinder");

        let stack_height = height / stack_count as f32;
        let radius_step = (top_radius - bottom_radius) / stack_count as f32;
        let ring_count = stack_count + 1;
        let d_theta = TAU / slice_count as f32;

        // 侧面：自底向上逐环生成
        for i in 0..ring_count {
            let y = -0.5 * height + i as f32 * stack_height;
            let r = bottom_radius + i as f32 * radius_step;

            // 每个环的首尾顶点位置重合，但纹理坐标不同
            for j in 0..=slice_count {
                let (s, c) = (j as f32 * d_theta).sin_cos();

                let tangent = Vector3::new(-s, 0.0, c);
                let dr = bottom_radius - top_radius;
                let bitangent = Vector3::new(dr * c, -height, dr * s);
                let normal = normalize_or_zero(tangent.cross(&bitangent));

                mesh.vertices.push(Vertex::new(
                    [r * c, y, r * s],
                    normal.into(),
                    [
                        j as f32 / slice_count as f32,
                        1.0 - i as f32 / stack_count as f32,
                    ],
                    tangent.into(),
                ));
            }
        }

        let ring_vertex_count = slice_count + 1;
        for i in 0..stack_count {
            for j in 0..slice_count {
                let a = i * ring_vertex_count + j;
                let b = (i + 1) * ring_vertex_count + j;
                mesh.indices.extend_from_slice(&[a, b, b + 1, a, b + 1, a + 1]);
            }
        }

        Self::build_cylinder_cap(&mut mesh, top_radius, 0.5 * height, slice_count, true);
        Self::build_cylinder_cap(&mut mesh, bottom_radius, -0.5 * height, slice_count, false);

        mesh
    }

    fn build_cylinder_cap(mesh: &mut MeshData, radius: f32, y: f32, slice_count: u32, top: bool) {
        let base_index = mesh.vertices.len() as u32;
        let height = 2.0 * y.abs();
        let ny = if top { 1.0 } else { -1.0 };
        let d_theta = TAU / slice_count as f32;

        // 环上顶点重复一份，法线和纹理坐标与侧面不同
        for i in 0..=slice_count {
            let (s, c) = (i as f32 * d_theta).sin_cos();
            let x = radius * c;
            let z = radius * s;

            // 按高度缩放纹理坐标，使底面纹理尺寸与底面半径成比例
            let (u, v) = if height > 0.0 {
                (x / height + 0.5, z / height + 0.5)
            } else {
                (0.5, 0.5)
            };

            mesh.vertices.push(Vertex::from_components(
                x, y, z, 0.0, ny, 0.0, 1.0, 0.0, 0.0, u, v,
            ));
        }

        mesh.vertices.push(Vertex::from_components(
            0.0, y, 0.0, 0.0, ny, 0.0, 1.0, 0.0, 0.0, 0.5, 0.5,
        ));
        let center = mesh.vertices.len() as u32 - 1;

        for i in 0..slice_count {
            if top {
                mesh.indices
                    .extend_from_slice(&[center, base_index + i + 1, base_index + i]);
            } else {
                mesh.indices
                    .extend_from_slice(&[center, base_index + i, base_index + i + 1]);
            }
        }
    }

    /// 创建 xz 平面上、以原点为中心的 m×n 顶点网格
    ///
    /// 第 i 行第 j 列顶点的索引为 `i * n + j`，z 随行号递减。
    pub fn create_grid(width: f32, depth: f32, m: u32, n: u32) -> MeshData {
        assert!(m >= 2 && n >= 2, "grid needs at least 2x2 vertices");

        let half_width = 0.5 * width;
        let half_depth = 0.5 * depth;

        let dx = width / (n - 1) as f32;
        let dz = depth / (m - 1) as f32;

        let du = 1.0 / (n - 1) as f32;
        let dv = 1.0 / (m - 1) as f32;

        let mut mesh = MeshData::with_capacity((m * n) as usize, grid_index_count(m, n));
        mesh.name = Some("grid".to_string());

        for i in 0..m {
            let z = half_depth - i as f32 * dz;
            for j in 0..n {
                let x = -half_width + j as f32 * dx;
                mesh.vertices.push(Vertex::new(
                    [x, 0.0, z],
                    [0.0, 1.0, 0.0],
                    [j as f32 * du, i as f32 * dv],
                    [1.0, 0.0, 0.0],
                ));
            }
        }

        mesh.indices = grid_indices(m, n);
        mesh
    }

    /// 把每个三角形细分为四个
    ///
    /// ```text
    ///        v1
    ///        *
    ///       / \
    ///      /   \
    ///   m0*-----*m1
    ///    / \   / \
    ///   /   \ /   \
    ///  *-----*-----*
    /// v0    m2     v2
    /// ```
    pub fn subdivide(mesh: &mut MeshData) {
        let input_vertices = std::mem::take(&mut mesh.vertices);
        let input_indices = std::mem::take(&mut mesh.indices);

        mesh.vertices.reserve(input_indices.len() * 2);
        mesh.indices.reserve(input_indices.len() * 4);

        for (t, triangle) in input_indices.chunks_exact(3).enumerate() {
            let v0 = input_vertices[triangle[0] as usize];
            let v1 = input_vertices[triangle[1] as usize];
            let v2 = input_vertices[triangle[2] as usize];

            let m0 = Self::midpoint(&v0, &v1);
            let m1 = Self::midpoint(&v1, &v2);
            let m2 = Self::midpoint(&v0, &v2);

            mesh.vertices.extend_from_slice(&[v0, v1, v2, m0, m1, m2]);

            let b = t as u32 * 6;
            let pattern: [u32; 12] = [0, 3, 5, 3, 4, 5, 3, 1, 4, 5, 4, 2];
            mesh.indices.extend(pattern.iter().map(|k| b + k));
        }
    }

    /// 两个顶点所有属性的中点
    ///
    /// 线性插值会让单位向量变短，所以法线和切线需要重新归一化。
    pub fn midpoint(v0: &Vertex, v1: &Vertex) -> Vertex {
        let position = 0.5 * (v0.position_vec() + v1.position_vec());
        let normal = normalize_or_zero(0.5 * (v0.normal_vec() + v1.normal_vec()));
        let tangent = normalize_or_zero(0.5 * (v0.tangent_vec() + v1.tangent_vec()));
        let texcoord = [
            0.5 * (v0.texcoord[0] + v1.texcoord[0]),
            0.5 * (v0.texcoord[1] + v1.texcoord[1]),
        ];

        Vertex::new(position.into(), normal.into(), texcoord, tangent.into())
    }
}

/// m×n 网格的索引数量
pub fn grid_index_count(m: u32, n: u32) -> usize {
    ((m - 1) * (n - 1) * 6) as usize
}

/// m×n 顶点网格的三角形索引
///
/// 每个四边形 (i, j) 生成两个三角形：
/// `(i·n+j, i·n+j+1, (i+1)·n+j)` 与 `((i+1)·n+j, i·n+j+1, (i+1)·n+j+1)`。
pub fn grid_indices(m: u32, n: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(grid_index_count(m, n));
    for i in 0..m - 1 {
        for j in 0..n - 1 {
            let a = i * n + j;
            let c = (i + 1) * n + j;
            indices.extend_from_slice(&[a, a + 1, c, c, a + 1, c + 1]);
        }
    }
    indices
}

fn normalize_or_zero(v: Vector3) -> Vector3 {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}
