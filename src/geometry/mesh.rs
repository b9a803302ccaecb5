/// 网格数据结构模块
///
/// 定义CPU侧的网格数据容器，以及多个网格合并到同一对顶点/索引缓冲区时
/// 使用的子网格绘制参数。

use super::vertex::Vertex;

/// 子网格绘制参数
///
/// 多个网格合并进同一个顶点/索引缓冲区后，每个网格对应一组
/// `DrawIndexedInstanced` 风格的参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Submesh {
    /// 索引数量
    pub index_count: u32,

    /// 在合并索引缓冲区中的起始位置
    pub start_index: u32,

    /// 加到每个索引上的顶点偏移
    pub base_vertex: i32,
}

impl Submesh {
    #[inline]
    pub fn new(index_count: u32, start_index: u32, base_vertex: i32) -> Self {
        Self {
            index_count,
            start_index,
            base_vertex,
        }
    }

    /// 覆盖整个网格的子网格
    pub fn whole(mesh: &MeshData) -> Self {
        Self::new(mesh.index_count() as u32, 0, 0)
    }
}

/// CPU侧网格数据
///
/// 所有生成的三角形都朝外（逆时针为正面，右手系）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// 顶点数组
    pub vertices: Vec<Vertex>,

    /// 三角形顶点索引，每3个索引定义一个三角形
    pub indices: Vec<u32>,

    /// 网格名称（可选）
    pub name: Option<String>,
}

impl MeshData {
    /// 创建一个空的网格数据
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个指定名称的空网格数据
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// 创建一个带容量预分配的网格数据
    pub fn with_capacity(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            name: None,
        }
    }

    /// 获取顶点数量
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 获取索引数量
    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 获取三角形数量
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 16 位索引
    ///
    /// 网格顶点数超过 65535 时返回 `None`，避免静默截断。
    pub fn indices16(&self) -> Option<Vec<u16>> {
        if self.vertices.len() > u16::MAX as usize + 1 {
            return None;
        }
        self.indices
            .iter()
            .map(|&i| u16::try_from(i).ok())
            .collect()
    }

    /// 验证网格数据的有效性
    ///
    /// 检查：
    /// - 索引数量是3的倍数（每个三角形3个顶点）
    /// - 所有索引都在有效范围内
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "索引数量必须是3的倍数，当前为: {}",
                self.indices.len()
            ));
        }

        let vertex_count = self.vertices.len() as u32;
        for (i, &index) in self.indices.iter().enumerate() {
            if index >= vertex_count {
                return Err(format!(
                    "索引 {} 处的值 {} 超出顶点范围 (0-{})",
                    i,
                    index,
                    vertex_count.saturating_sub(1)
                ));
            }
        }

        Ok(())
    }
}

/// 把多个网格合并为一对顶点/索引数组
///
/// 返回合并后的网格和每个输入网格对应的子网格参数；
/// 索引保持各自网格内的局部编号，由 `base_vertex` 负责偏移。
pub fn concatenate(meshes: &[&MeshData]) -> (MeshData, Vec<Submesh>) {
    let total_vertices = meshes.iter().map(|m| m.vertex_count()).sum();
    let total_indices = meshes.iter().map(|m| m.index_count()).sum();

    let mut merged = MeshData::with_capacity(total_vertices, total_indices);
    let mut submeshes = Vec::with_capacity(meshes.len());

    for mesh in meshes {
        submeshes.push(Submesh::new(
            mesh.index_count() as u32,
            merged.indices.len() as u32,
            merged.vertices.len() as i32,
        ));
        merged.vertices.extend_from_slice(&mesh.vertices);
        merged.indices.extend_from_slice(&mesh.indices);
    }

    (merged, submeshes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        let mut mesh = MeshData::new();
        mesh.vertices.extend([Vertex::default(); 3]);
        mesh.indices.extend_from_slice(&[0, 1, 2]);
        mesh
    }

    #[test]
    fn test_mesh_data_counts() {
        let mesh = triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_mesh_data_validation_invalid() {
        let mut mesh = MeshData::new();
        mesh.vertices.extend([Vertex::default(); 2]);
        mesh.indices.extend_from_slice(&[0, 1]);
        assert!(mesh.validate().is_err());

        mesh.indices.push(5);
        let result = mesh.validate();
        assert!(result.unwrap_err().contains("超出顶点范围"));
    }

    #[test]
    fn test_indices16() {
        let mesh = triangle();
        assert_eq!(mesh.indices16(), Some(vec![0u16, 1, 2]));

        let mut big = MeshData::new();
        big.vertices.resize(70_000, Vertex::default());
        big.indices.extend_from_slice(&[0, 1, 69_999]);
        assert!(big.indices16().is_none());
    }

    #[test]
    fn test_concatenate() {
        let a = triangle();
        let mut b = triangle();
        b.vertices.push(Vertex::default());
        b.indices.extend_from_slice(&[1, 2, 3]);

        let (merged, submeshes) = concatenate(&[&a, &b]);

        assert_eq!(merged.vertex_count(), 7);
        assert_eq!(merged.index_count(), 9);
        assert_eq!(submeshes[0], Submesh::new(3, 0, 0));
        assert_eq!(submeshes[1], Submesh::new(6, 3, 3));
        assert_eq!(Submesh::whole(&b), Submesh::new(6, 0, 0));
    }
}
