//! glTF 2.0 import (`.gltf` + `.bin`, or binary `.glb`).
//!
//! Only the first root node of the default scene is kept; it becomes the
//! fragment root and everything below it is copied. Animation channels that
//! target nodes outside that subtree are dropped.

use std::collections::HashMap;
use std::path::Path;

use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::Property;
use gltf::mesh::Mode;

use super::{LoadError, LoadProgress, LoadedModel, ModelLoader};
use crate::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use crate::scene::{FragmentNode, MeshData, MeshPrimitive, MorphTarget, SceneFragment, Transform};

/// Loads models with the `gltf` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfLoader;

impl ModelLoader for GltfLoader {
    fn load(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<LoadedModel, LoadError> {
        let total = std::fs::metadata(path)
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        progress(LoadProgress {
            loaded_bytes: 0,
            total_bytes: Some(total),
        });

        let (document, buffers, _images) = gltf::import(path).map_err(|source| LoadError::Gltf {
            path: path.to_path_buf(),
            source,
        })?;
        progress(LoadProgress {
            loaded_bytes: total,
            total_bytes: Some(total),
        });

        build_model(path, &document, &buffers)
    }
}

fn build_model(
    path: &Path,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<LoadedModel, LoadError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::NoScene {
            path: path.to_path_buf(),
        })?;
    let primary = scene.nodes().next().ok_or_else(|| LoadError::NoScene {
        path: path.to_path_buf(),
    })?;

    // Pre-order walk of the primary subtree: glTF node index -> fragment index
    let mut order: Vec<gltf::Node> = Vec::new();
    let mut fragment_index: HashMap<usize, usize> = HashMap::new();
    let mut stack = vec![primary];
    while let Some(node) = stack.pop() {
        if fragment_index.contains_key(&node.index()) {
            continue;
        }
        fragment_index.insert(node.index(), order.len());
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
        order.push(node);
    }

    let mut meshes: Vec<MeshData> = Vec::new();
    let mut mesh_index: HashMap<usize, usize> = HashMap::new();
    let mut nodes: Vec<FragmentNode> = Vec::with_capacity(order.len());

    for node in &order {
        let (t, r, s) = node.transform().decomposed();
        let rotation = Quat::from_xyzw(r[0], r[1], r[2], r[3]);
        let transform = Transform {
            translation: Vec3::from_array(t),
            rotation: if rotation.length_squared() > 0.0 {
                rotation.normalize()
            } else {
                Quat::IDENTITY
            },
            scale: Vec3::from_array(s),
        };

        let mut fragment_node = FragmentNode::new(transform);
        fragment_node.name = node.name().map(str::to_string);

        if let Some(mesh) = node.mesh() {
            let index = match mesh_index.get(&mesh.index()) {
                Some(index) => *index,
                None => {
                    let data = read_mesh(path, &mesh, buffers)?;
                    meshes.push(data);
                    mesh_index.insert(mesh.index(), meshes.len() - 1);
                    meshes.len() - 1
                }
            };
            fragment_node.mesh = Some(index);
            fragment_node.morph_weights = node
                .weights()
                .or_else(|| mesh.weights())
                .map(<[f32]>::to_vec)
                .unwrap_or_default();
        }

        fragment_node.children = node
            .children()
            .filter_map(|child| fragment_index.get(&child.index()).copied())
            .collect();
        nodes.push(fragment_node);
    }

    let clips = read_clips(document, buffers, &fragment_index);

    Ok(LoadedModel {
        fragment: SceneFragment {
            nodes,
            root: 0,
            meshes,
        },
        clips,
    })
}

fn read_mesh(
    path: &Path,
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
) -> Result<MeshData, LoadError> {
    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            log::warn!(
                "{}: mesh {} uses {:?} primitives; skipping",
                path.display(),
                mesh.index(),
                primitive.mode()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| LoadError::Invalid {
                path: path.to_path_buf(),
                message: format!("mesh {} primitive has no POSITION attribute", mesh.index()),
            })?
            .collect();
        let indices: Vec<u32> = reader
            .read_indices()
            .map(|i| i.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());
        if let Some(bad) = indices.iter().find(|i| **i as usize >= positions.len()) {
            return Err(LoadError::Invalid {
                path: path.to_path_buf(),
                message: format!("index {} out of range for {} vertices", bad, positions.len()),
            });
        }
        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(normals) => normals.collect(),
            None => vertex_normals(&positions, &indices),
        };
        let colors: Vec<[f32; 4]> = reader
            .read_colors(0)
            .map(|c| c.into_rgba_f32().collect())
            .unwrap_or_default();
        let morph_targets: Vec<MorphTarget> = reader
            .read_morph_targets()
            .map(|(positions, normals, _tangents)| MorphTarget {
                positions: positions.map(|p| p.collect()).unwrap_or_default(),
                normals: normals.map(|n| n.collect()).unwrap_or_default(),
            })
            .collect();

        primitives.push(MeshPrimitive {
            positions,
            normals,
            colors,
            indices,
            base_color: primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor(),
            morph_targets,
        });
    }

    Ok(MeshData {
        name: mesh.name().map(str::to_string),
        primitives,
    })
}

fn read_clips(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    fragment_index: &HashMap<usize, usize>,
) -> Vec<AnimationClip> {
    let mut clips = Vec::new();
    for (anim_index, animation) in document.animations().enumerate() {
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{anim_index}"));

        let mut channels = Vec::new();
        for channel in animation.channels() {
            let target_node = channel.target().node();
            let Some(target) = fragment_index.get(&target_node.index()).copied() else {
                continue;
            };

            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Linear => Interpolation::Linear,
                gltf::animation::Interpolation::Step => Interpolation::Step,
                gltf::animation::Interpolation::CubicSpline => {
                    log::warn!(
                        "animation '{}' uses CubicSpline interpolation; skipping channel (node {})",
                        name,
                        target_node.index()
                    );
                    continue;
                }
            };

            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();

            let values = match (channel.target().property(), outputs) {
                (Property::Translation, ReadOutputs::Translations(v)) => {
                    ChannelValues::Translation(v.map(Vec3::from_array).collect())
                }
                (Property::Scale, ReadOutputs::Scales(v)) => {
                    ChannelValues::Scale(v.map(Vec3::from_array).collect())
                }
                (Property::Rotation, ReadOutputs::Rotations(v)) => ChannelValues::Rotation(
                    v.into_f32()
                        .map(|q| Quat::from_xyzw(q[0], q[1], q[2], q[3]))
                        .collect(),
                ),
                (Property::MorphTargetWeights, ReadOutputs::MorphTargetWeights(v)) => {
                    let weights: Vec<f32> = v.into_f32().collect();
                    let targets = if times.is_empty() {
                        0
                    } else {
                        weights.len() / times.len()
                    };
                    ChannelValues::MorphWeights { weights, targets }
                }
                _ => continue,
            };

            match Channel::new(target, interpolation, times, values) {
                Ok(channel) => channels.push(channel),
                Err(e) => log::warn!("animation '{}': dropping channel: {}", name, e),
            }
        }

        if !channels.is_empty() {
            clips.push(AnimationClip::new(name, channels));
        }
    }
    clips
}

/// Smooth per-vertex normals from indexed triangles
fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (pa, pb, pc) = (
            Vec3::from_array(positions[a]),
            Vec3::from_array(positions[b]),
            Vec3::from_array(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    accum
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Triangle under a parent node, with a one-second translation clip
    fn write_fixture(dir: &Path) -> std::path::PathBuf {
        let mut bin: Vec<u8> = Vec::new();
        for v in [0.0_f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        for i in [0_u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        for t in [0.0_f32, 1.0] {
            bin.extend_from_slice(&t.to_le_bytes());
        }
        for v in [0.0_f32, 1.0, 0.0, 0.0, 3.0, 0.0] {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(bin.len(), 76);
        fs::write(dir.join("fixture.bin"), &bin).unwrap();

        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [
    { "name": "root", "children": [1] },
    { "name": "body", "mesh": 0, "translation": [0.0, 1.0, 0.0] }
  ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1 } ] } ],
  "animations": [ {
    "name": "bob",
    "samplers": [ { "input": 2, "output": 3, "interpolation": "LINEAR" } ],
    "channels": [ { "sampler": 0, "target": { "node": 1, "path": "translation" } } ]
  } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
    { "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
    { "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 },
    { "buffer": 0, "byteOffset": 44, "byteLength": 8 },
    { "buffer": 0, "byteOffset": 52, "byteLength": 24 }
  ],
  "buffers": [ { "byteLength": 76, "uri": "fixture.bin" } ]
}"#;
        let path = dir.join("fixture.gltf");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_loads_primary_fragment_and_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let mut progress: Vec<LoadProgress> = Vec::new();
        let model = GltfLoader
            .load(&path, &mut |p: LoadProgress| progress.push(p))
            .unwrap();

        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].loaded_bytes, progress[1].total_bytes.unwrap());

        let fragment = &model.fragment;
        assert_eq!(fragment.nodes.len(), 2);
        assert_eq!(fragment.root, 0);
        assert_eq!(fragment.nodes[0].children, vec![1]);
        assert_eq!(fragment.nodes[1].mesh, Some(0));
        assert_eq!(fragment.nodes[1].transform.translation, Vec3::new(0.0, 1.0, 0.0));

        let primitive = &fragment.meshes[0].primitives[0];
        assert_eq!(primitive.indices, vec![0, 1, 2]);
        // Generated normals face +Z for a CCW triangle in the XY plane
        assert!((Vec3::from_array(primitive.normals[0]) - Vec3::Z).length() < 1e-6);
        assert_eq!(primitive.base_color, [1.0, 1.0, 1.0, 1.0]);

        assert_eq!(model.clips.len(), 1);
        let clip = &model.clips[0];
        assert_eq!(clip.name, "bob");
        assert_eq!(clip.duration, 1.0);
        assert_eq!(clip.channels[0].target, 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GltfLoader
            .load(&dir.path().join("absent.glb"), &mut |_: LoadProgress| {})
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_malformed_file_is_gltf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        fs::write(&path, "{ not json").unwrap();
        let err = GltfLoader.load(&path, &mut |_: LoadProgress| {}).unwrap_err();
        assert!(matches!(err, LoadError::Gltf { .. }));
    }

    #[test]
    fn test_vertex_normals_fallback_for_degenerate_faces() {
        let normals = vertex_normals(&[[0.0; 3]; 3], &[0, 1, 2]);
        assert_eq!(normals, vec![[0.0, 1.0, 0.0]; 3]);
    }
}
