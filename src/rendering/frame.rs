//! CPU-side flattening of a scene graph into draw-ready geometry.
//!
//! Meshes are transformed to world space here (morph targets included), so
//! the GPU side only needs one view-projection matrix and one lighting block.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::scene::{GridHelper, NodeContent, SceneGraph};

/// Grid colour of the two centre lines
const GRID_CENTER_COLOR: [f32; 4] = [0.267, 0.267, 0.267, 1.0];
/// Grid colour of every other line
const GRID_LINE_COLOR: [f32; 4] = [0.533, 0.533, 0.533, 1.0];

/// World-space vertex shared by the mesh and grid pipelines
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// Lights gathered from the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Unit vector pointing from the scene towards the directional light
    pub direction: Vec3,
    /// Directional colour premultiplied by intensity
    pub directional: [f32; 3],
    /// Ambient colour premultiplied by intensity
    pub ambient: [f32; 3],
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            direction: Vec3::Y,
            directional: [0.0; 3],
            ambient: [0.0; 3],
        }
    }
}

/// Everything the GPU needs for one frame
#[derive(Debug, Clone, Default)]
pub struct SceneFrame {
    pub clear_color: [f32; 3],
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Line-list vertices (grid helpers)
    pub lines: Vec<Vertex>,
    pub lighting: Lighting,
}

impl SceneFrame {
    pub fn build(scene: &SceneGraph) -> Self {
        let world = scene.world_matrices();
        let mut frame = SceneFrame {
            clear_color: scene.background,
            ..SceneFrame::default()
        };

        for (id, node) in scene.nodes() {
            let matrix = world[id.index()];
            match &node.content {
                NodeContent::Empty => {}
                NodeContent::Mesh(mesh_id) => {
                    if let Some(mesh) = scene.mesh(*mesh_id) {
                        for primitive in &mesh.primitives {
                            frame.push_primitive(matrix, primitive, &node.morph_weights);
                        }
                    }
                }
                NodeContent::DirectionalLight(light) => {
                    // Shines from the light's position towards the origin
                    let position = matrix.transform_point3(Vec3::ZERO);
                    frame.lighting.direction = position.try_normalize().unwrap_or(Vec3::Y);
                    frame.lighting.directional = light.color.map(|c| c * light.intensity);
                }
                NodeContent::AmbientLight(light) => {
                    frame.lighting.ambient = light.color.map(|c| c * light.intensity);
                }
                NodeContent::Grid(grid) => frame.push_grid(matrix, grid),
            }
        }

        frame
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_primitive(
        &mut self,
        matrix: Mat4,
        primitive: &crate::scene::MeshPrimitive,
        weights: &[f32],
    ) {
        let positions = primitive.morphed_positions(weights);
        let normals = primitive.morphed_normals(weights);
        let normal_matrix = normal_matrix(matrix);
        let base = self.vertices.len() as u32;

        for (i, position) in positions.iter().enumerate() {
            let normal = normals
                .get(i)
                .map(|n| (normal_matrix * Vec3::from_array(*n)).normalize_or_zero())
                .unwrap_or(Vec3::ZERO);
            let color = match primitive.colors.get(i) {
                Some(c) => std::array::from_fn(|k| c[k] * primitive.base_color[k]),
                None => primitive.base_color,
            };
            self.vertices.push(Vertex {
                position: matrix.transform_point3(Vec3::from_array(*position)).to_array(),
                normal: normal.to_array(),
                color,
            });
        }
        self.indices
            .extend(primitive.indices.iter().map(|index| base + index));
    }

    fn push_grid(&mut self, matrix: Mat4, grid: &GridHelper) {
        if grid.divisions == 0 {
            return;
        }
        let half = grid.size / 2.0;
        let step = grid.size / grid.divisions as f32;
        let center = grid.divisions / 2;

        for i in 0..=grid.divisions {
            let k = -half + i as f32 * step;
            let color = if grid.divisions % 2 == 0 && i == center {
                GRID_CENTER_COLOR
            } else {
                GRID_LINE_COLOR
            };
            for (a, b) in [
                (Vec3::new(-half, 0.0, k), Vec3::new(half, 0.0, k)),
                (Vec3::new(k, 0.0, -half), Vec3::new(k, 0.0, half)),
            ] {
                for point in [a, b] {
                    self.lines.push(Vertex {
                        position: matrix.transform_point3(point).to_array(),
                        normal: [0.0, 1.0, 0.0],
                        color,
                    });
                }
            }
        }
    }
}

/// Inverse-transpose of the upper 3x3, falling back to the plain 3x3 when singular
fn normal_matrix(matrix: Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(matrix);
    if linear.determinant().abs() <= f32::EPSILON {
        linear
    } else {
        linear.inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Light, MeshData, MeshPrimitive, MorphTarget, SceneNode, Transform};

    fn triangle() -> MeshPrimitive {
        MeshPrimitive {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            colors: Vec::new(),
            indices: vec![0, 1, 2],
            base_color: [1.0, 0.5, 0.25, 1.0],
            morph_targets: vec![MorphTarget {
                positions: vec![[0.0, 0.0, 2.0]; 3],
                normals: Vec::new(),
            }],
        }
    }

    fn scene_with_triangle(weights: Vec<f32>) -> SceneGraph {
        let mut scene = SceneGraph::new([0.5, 0.5, 0.5]);
        let mesh = scene.add_mesh(MeshData {
            name: None,
            primitives: vec![triangle()],
        });
        let mut node = SceneNode::new(NodeContent::Mesh(mesh))
            .with_transform(Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        node.morph_weights = weights;
        scene.add_node(scene.root(), node).unwrap();
        scene
    }

    #[test]
    fn test_mesh_vertices_are_in_world_space() {
        let frame = SceneFrame::build(&scene_with_triangle(Vec::new()));
        assert_eq!(frame.clear_color, [0.5, 0.5, 0.5]);
        assert_eq!(frame.triangle_count(), 1);
        assert_eq!(frame.vertices[1].position, [11.0, 0.0, 0.0]);
        assert_eq!(frame.vertices[0].color, [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(frame.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_morph_weights_are_blended() {
        let frame = SceneFrame::build(&scene_with_triangle(vec![0.5]));
        assert_eq!(frame.vertices[0].position, [10.0, 0.0, 1.0]);
    }

    #[test]
    fn test_indices_are_offset_per_primitive() {
        let mut scene = scene_with_triangle(Vec::new());
        let mesh = scene.add_mesh(MeshData {
            name: None,
            primitives: vec![triangle()],
        });
        scene
            .add_node(scene.root(), SceneNode::new(NodeContent::Mesh(mesh)))
            .unwrap();
        let frame = SceneFrame::build(&scene);
        assert_eq!(frame.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_lights_and_grid_are_collected() {
        let mut scene = SceneGraph::new([0.0; 3]);
        let root = scene.root();
        scene
            .add_node(
                root,
                SceneNode::new(NodeContent::DirectionalLight(Light {
                    color: [1.0, 1.0, 1.0],
                    intensity: 1.0,
                }))
                .with_transform(Transform::from_translation(Vec3::new(0.0, 2.0, 0.0))),
            )
            .unwrap();
        scene
            .add_node(
                root,
                SceneNode::new(NodeContent::AmbientLight(Light {
                    color: [1.0, 1.0, 1.0],
                    intensity: 0.5,
                })),
            )
            .unwrap();
        scene
            .add_node(
                root,
                SceneNode::new(NodeContent::Grid(GridHelper {
                    size: 10.0,
                    divisions: 2,
                })),
            )
            .unwrap();

        let frame = SceneFrame::build(&scene);
        assert_eq!(frame.lighting.direction, Vec3::Y);
        assert_eq!(frame.lighting.ambient, [0.5, 0.5, 0.5]);
        // Three lines per axis, two vertices each
        assert_eq!(frame.lines.len(), 12);
        assert_eq!(frame.lines[4].color, GRID_CENTER_COLOR);
        assert!(frame.vertices.is_empty());
    }
}
