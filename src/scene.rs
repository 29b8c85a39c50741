//! Scene graph owned by a running session.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A node is always
//! created after its parent, so a single forward pass over the arena visits
//! parents before children (see [`SceneGraph::world_matrices`]).

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use thiserror::Error;

/// Handle to a node in a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to mesh geometry registered with a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u32);

impl MeshId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown parent node {0:?}")]
    UnknownParent(NodeId),

    #[error("fragment root index {root} out of range ({len} nodes)")]
    InvalidFragmentRoot { root: usize, len: usize },
}

/// Local translation / rotation / scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Light colour and strength
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Square line grid on the XZ plane, centred on its node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
}

/// What a node draws or emits
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Empty,
    Mesh(MeshId),
    /// Shines from the node position towards the origin
    DirectionalLight(Light),
    AmbientLight(Light),
    Grid(GridHelper),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub content: NodeContent,
    /// Morph target weights for `NodeContent::Mesh`
    pub morph_weights: Vec<f32>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(content: NodeContent) -> Self {
        Self {
            name: None,
            transform: Transform::IDENTITY,
            content,
            morph_weights: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Per-vertex offsets applied with a morph weight
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
}

/// One indexed triangle list with a single material colour
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Optional per-vertex colours (empty when absent)
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
    pub morph_targets: Vec<MorphTarget>,
}

impl MeshPrimitive {
    /// Positions with morph targets blended in
    pub fn morphed_positions(&self, weights: &[f32]) -> Cow<'_, [[f32; 3]]> {
        blend(&self.positions, weights, self.morph_targets.iter().map(|t| &t.positions))
    }

    /// Normals with morph targets blended in (not renormalised)
    pub fn morphed_normals(&self, weights: &[f32]) -> Cow<'_, [[f32; 3]]> {
        blend(&self.normals, weights, self.morph_targets.iter().map(|t| &t.normals))
    }
}

fn blend<'a>(
    base: &'a [[f32; 3]],
    weights: &[f32],
    deltas: impl Iterator<Item = &'a Vec<[f32; 3]>>,
) -> Cow<'a, [[f32; 3]]> {
    if weights.iter().all(|w| *w == 0.0) {
        return Cow::Borrowed(base);
    }
    let mut out = base.to_vec();
    for (weight, delta) in weights.iter().zip(deltas) {
        if *weight == 0.0 || delta.len() != out.len() {
            continue;
        }
        for (v, d) in out.iter_mut().zip(delta) {
            v[0] += d[0] * weight;
            v[1] += d[1] * weight;
            v[2] += d[2] * weight;
        }
    }
    Cow::Owned(out)
}

/// Geometry shared by every node that references it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub name: Option<String>,
    pub primitives: Vec<MeshPrimitive>,
}

/// A node of a not-yet-inserted [`SceneFragment`]
#[derive(Debug, Clone)]
pub struct FragmentNode {
    pub name: Option<String>,
    pub transform: Transform,
    /// Index into [`SceneFragment::meshes`]
    pub mesh: Option<usize>,
    pub morph_weights: Vec<f32>,
    /// Indices into [`SceneFragment::nodes`]
    pub children: Vec<usize>,
}

impl FragmentNode {
    pub fn new(transform: Transform) -> Self {
        Self {
            name: None,
            transform,
            mesh: None,
            morph_weights: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Detached subtree produced by a model loader
///
/// Node indices are fragment-local; animation clips loaded alongside the
/// fragment target nodes by the same indices.
#[derive(Debug, Clone)]
pub struct SceneFragment {
    pub nodes: Vec<FragmentNode>,
    pub root: usize,
    pub meshes: Vec<MeshData>,
}

impl SceneFragment {
    /// Single node carrying one mesh
    pub fn single_mesh(mesh: MeshData) -> Self {
        let mut node = FragmentNode::new(Transform::IDENTITY);
        node.mesh = Some(0);
        Self {
            nodes: vec![node],
            root: 0,
            meshes: vec![mesh],
        }
    }

    pub fn root_node(&self) -> Option<&FragmentNode> {
        self.nodes.get(self.root)
    }

    pub fn root_node_mut(&mut self) -> Option<&mut FragmentNode> {
        self.nodes.get_mut(self.root)
    }
}

/// Where a fragment ended up after [`SceneGraph::insert_fragment`]
#[derive(Debug, Clone)]
pub struct InsertedFragment {
    pub root: NodeId,
    /// Fragment-local node index to scene node (`None` if unreachable from the root)
    pub nodes: Vec<Option<NodeId>>,
}

impl InsertedFragment {
    pub fn node(&self, fragment_index: usize) -> Option<NodeId> {
        self.nodes.get(fragment_index).copied().flatten()
    }
}

/// Mutable tree of spatial nodes rooted at the "scene" node
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    meshes: Vec<Arc<MeshData>>,
    pub background: [f32; 3],
}

impl SceneGraph {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            nodes: vec![SceneNode::new(NodeContent::Empty).named("scene")],
            meshes: Vec::new(),
            background,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists
        false
    }

    pub fn add_node(&mut self, parent: NodeId, mut node: SceneNode) -> Result<NodeId, SceneError> {
        if parent.index() >= self.nodes.len() {
            return Err(SceneError::UnknownParent(parent));
        }
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(Arc::new(mesh));
        id
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Arc<MeshData>> {
        self.meshes.get(id.index())
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// World matrix of every node, indexed by [`NodeId::index`]
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.matrix();
            let matrix = match node.parent {
                Some(parent) => world[parent.index()] * local,
                None => local,
            };
            world.push(matrix);
        }
        world
    }

    /// Copy a fragment's reachable subtree under `parent`
    pub fn insert_fragment(
        &mut self,
        parent: NodeId,
        fragment: SceneFragment,
    ) -> Result<InsertedFragment, SceneError> {
        if parent.index() >= self.nodes.len() {
            return Err(SceneError::UnknownParent(parent));
        }
        if fragment.root >= fragment.nodes.len() {
            return Err(SceneError::InvalidFragmentRoot {
                root: fragment.root,
                len: fragment.nodes.len(),
            });
        }

        let mesh_ids: Vec<MeshId> = fragment
            .meshes
            .into_iter()
            .map(|mesh| self.add_mesh(mesh))
            .collect();

        let mut mapping: Vec<Option<NodeId>> = vec![None; fragment.nodes.len()];
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack: Vec<(usize, NodeId)> = vec![(fragment.root, parent)];

        while let Some((index, parent_id)) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            let source = &fragment.nodes[index];
            let content = match source.mesh.and_then(|m| mesh_ids.get(m)) {
                Some(mesh) => NodeContent::Mesh(*mesh),
                None => NodeContent::Empty,
            };
            let mut node = SceneNode::new(content).with_transform(source.transform);
            node.name = source.name.clone();
            node.morph_weights = source.morph_weights.clone();
            let id = self.add_node(parent_id, node)?;
            mapping[index] = Some(id);

            // Reverse so children keep their declared order
            for &child in source.children.iter().rev() {
                if child < fragment.nodes.len() && !visited.contains(&child) {
                    stack.push((child, id));
                }
            }
        }

        let root = mapping[fragment.root].ok_or(SceneError::InvalidFragmentRoot {
            root: fragment.root,
            len: fragment.nodes.len(),
        })?;
        Ok(InsertedFragment {
            root,
            nodes: mapping,
        })
    }
}
