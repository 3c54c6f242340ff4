use crate::error::{Error, Result};
use crate::geometry::mesh::{fan_triangulate, parse_error};
use crate::geometry::{Mesh, Vertex};
use crate::scene::{Material, Triangle};
use glam::{Mat4, Vec2, Vec3};
use gltf::mesh::Mode;
use std::path::Path;

impl Mesh {
    /// Loads a glTF or GLB file, flattening the default scene's node
    /// hierarchy into world-space triangles. Only buffers are read; images
    /// are never decoded, so missing textures do not fail the load.
    pub fn load_gltf(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::AssetNotFound(path.to_path_buf()));
        }
        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| parse_error(path, e))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .map_err(|e| parse_error(path, e))?;

        let library: Vec<Material> = document
            .materials()
            .map(|m| Material::from_gltf(&m))
            .collect();

        let mut triangles = Vec::new();
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    visit_node(path, &buffers, &node, Mat4::IDENTITY, &mut triangles)?;
                }
            }
            None => log::warn!("{}: document has no scene", path.display()),
        }

        if triangles.is_empty() {
            log::warn!("{}: glTF contains no triangles", path.display());
        }
        log::info!(
            "Loaded glTF {}: {} triangles, {} materials",
            path.display(),
            triangles.len(),
            library.len() + 1
        );
        Ok(Mesh::new(triangles, library))
    }
}

fn visit_node(
    path: &Path,
    buffers: &[gltf::buffer::Data],
    node: &gltf::Node,
    parent: Mat4,
    out: &mut Vec<Triangle>,
) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            read_primitive(path, buffers, &primitive, &world, out)?;
        }
    }
    for child in node.children() {
        visit_node(path, buffers, &child, world, out)?;
    }
    Ok(())
}

fn read_primitive(
    path: &Path,
    buffers: &[gltf::buffer::Data],
    primitive: &gltf::Primitive,
    world: &Mat4,
    out: &mut Vec<Triangle>,
) -> Result<()> {
    let reader = primitive.reader(|buffer| {
        buffers
            .get(buffer.index())
            .map(|data| data.0.as_slice())
    });
    let Some(positions) = reader.read_positions() else {
        log::warn!("{}: primitive without positions skipped", path.display());
        return Ok(());
    };
    let positions: Vec<Vec3> = positions.map(Vec3::from_array).collect();
    let normals: Option<Vec<Vec3>> = reader
        .read_normals()
        .map(|it| it.map(Vec3::from_array).collect());
    let tex_coords: Option<Vec<Vec2>> = reader
        .read_tex_coords(0)
        .map(|it| it.into_f32().map(Vec2::from_array).collect());
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|it| it.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let corners: Vec<[u32; 3]> = match primitive.mode() {
        Mode::Triangles if indices.len() % 3 != 0 => {
            return Err(parse_error(
                path,
                format!("{} indices do not form whole triangles", indices.len()),
            ))
        }
        Mode::TriangleStrip | Mode::TriangleFan if indices.len() < 3 => {
            return Err(parse_error(
                path,
                format!("{:?} primitive with {} indices", primitive.mode(), indices.len()),
            ))
        }
        Mode::Triangles => indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        Mode::TriangleStrip => strip_to_list(&indices),
        Mode::TriangleFan => fan_triangulate(&indices).collect(),
        mode => {
            return Err(Error::UnsupportedTopology {
                path: path.to_path_buf(),
                topology: format!("{mode:?} primitive"),
            })
        }
    };
    let material = primitive.material().index().map_or(0, |i| i as u32 + 1);

    let vertex = |i: u32| -> Result<Vertex> {
        let i = i as usize;
        let position = *positions
            .get(i)
            .ok_or_else(|| parse_error(path, format!("vertex index {i} out of range")))?;
        let normal = normals
            .as_ref()
            .and_then(|n| n.get(i).copied())
            .unwrap_or(Vec3::ZERO);
        let tex_coord = tex_coords
            .as_ref()
            .and_then(|t| t.get(i).copied())
            .unwrap_or(Vec2::ZERO);
        Ok(Vertex::new(position, normal, tex_coord))
    };

    out.reserve(corners.len());
    for [a, b, c] in corners {
        let triangle =
            Triangle::new(vertex(a)?, vertex(b)?, vertex(c)?, material).transformed(world);
        out.push(if normals.is_some() {
            triangle
        } else {
            triangle.with_flat_normal()
        });
    }
    Ok(())
}

/// Strip `i` keeps the winding of the first triangle by swapping on odd `i`.
fn strip_to_list(indices: &[u32]) -> Vec<[u32; 3]> {
    indices
        .windows(3)
        .enumerate()
        .map(|(i, w)| if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[0], w[2], w[1]] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// A one-mesh document: a root node translated by 10 on x whose child
    /// holds the mesh with `transform` applied.
    struct Fixture {
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        indices: Vec<u32>,
        mode: Option<u32>,
        material: bool,
        transform: &'static str,
        extra: &'static str,
    }

    impl Default for Fixture {
        fn default() -> Self {
            Self {
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: None,
                indices: vec![0, 1, 2],
                mode: None,
                material: true,
                transform: r#""scale": [2.0, 2.0, 2.0]"#,
                extra: "",
            }
        }
    }

    impl Fixture {
        fn bin(&self) -> Vec<u8> {
            let mut bytes = bytemuck::cast_slice::<[f32; 3], u8>(&self.positions).to_vec();
            if let Some(normals) = &self.normals {
                bytes.extend_from_slice(bytemuck::cast_slice(normals));
            }
            bytes.extend_from_slice(bytemuck::cast_slice(&self.indices));
            bytes
        }

        fn json(&self, uri: Option<&str>) -> String {
            let n = self.positions.len();
            let mut min = [f32::MAX; 3];
            let mut max = [f32::MIN; 3];
            for p in &self.positions {
                for axis in 0..3 {
                    min[axis] = min[axis].min(p[axis]);
                    max[axis] = max[axis].max(p[axis]);
                }
            }

            let mut attributes = String::from(r#""POSITION": 0"#);
            let mut accessors = vec![format!(
                r#"{{ "bufferView": 0, "componentType": 5126, "count": {n}, "type": "VEC3",
                    "min": {min:?}, "max": {max:?} }}"#
            )];
            let mut views = vec![format!(
                r#"{{ "buffer": 0, "byteOffset": 0, "byteLength": {} }}"#,
                12 * n
            )];
            let mut offset = 12 * n;
            if self.normals.is_some() {
                attributes.push_str(r#", "NORMAL": 1"#);
                accessors.push(format!(
                    r#"{{ "bufferView": 1, "componentType": 5126, "count": {n}, "type": "VEC3" }}"#
                ));
                views.push(format!(
                    r#"{{ "buffer": 0, "byteOffset": {offset}, "byteLength": {} }}"#,
                    12 * n
                ));
                offset += 12 * n;
            }
            let index_view = views.len();
            accessors.push(format!(
                r#"{{ "bufferView": {index_view}, "componentType": 5125, "count": {},
                    "type": "SCALAR" }}"#,
                self.indices.len()
            ));
            views.push(format!(
                r#"{{ "buffer": 0, "byteOffset": {offset}, "byteLength": {} }}"#,
                4 * self.indices.len()
            ));

            let mut primitive = format!(
                r#""attributes": {{ {attributes} }}, "indices": {}"#,
                accessors.len() - 1
            );
            if self.material {
                primitive.push_str(r#", "material": 0"#);
            }
            if let Some(mode) = self.mode {
                primitive.push_str(&format!(r#", "mode": {mode}"#));
            }
            let transform = if self.transform.is_empty() {
                String::new()
            } else {
                format!(", {}", self.transform)
            };
            let buffer = match uri {
                Some(uri) => format!(r#"{{ "byteLength": {}, "uri": "{uri}" }}"#, self.bin().len()),
                None => format!(r#"{{ "byteLength": {} }}"#, self.bin().len()),
            };

            format!(
                r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [
    {{ "translation": [10.0, 0.0, 0.0], "children": [1] }},
    {{ "mesh": 0{transform} }}
  ],
  "meshes": [{{ "primitives": [{{ {primitive} }}] }}],
  "materials": [{{
    "pbrMetallicRoughness": {{
      "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.5, "roughnessFactor": 0.25
    }},
    "emissiveFactor": [0.0, 0.0, 1.0]
  }}],
  "accessors": [{}],
  "bufferViews": [{}],
  "buffers": [{buffer}]{}
}}"#,
                accessors.join(", "),
                views.join(", "),
                self.extra
            )
        }

        fn write_gltf(&self, dir: &Path) -> PathBuf {
            fs::write(dir.join("mesh.bin"), self.bin()).unwrap();
            let path = dir.join("mesh.gltf");
            fs::write(&path, self.json(Some("mesh.bin"))).unwrap();
            path
        }

        fn write_glb(&self, dir: &Path) -> PathBuf {
            let mut json = self.json(None).into_bytes();
            json.resize(json.len().next_multiple_of(4), b' ');
            let mut bin = self.bin();
            bin.resize(bin.len().next_multiple_of(4), 0);
            let total = 12 + 8 + json.len() + 8 + bin.len();

            let mut bytes = Vec::with_capacity(total);
            bytes.extend_from_slice(b"glTF");
            bytes.extend_from_slice(&2u32.to_le_bytes());
            bytes.extend_from_slice(&(total as u32).to_le_bytes());
            bytes.extend_from_slice(&(json.len() as u32).to_le_bytes());
            bytes.extend_from_slice(b"JSON");
            bytes.extend_from_slice(&json);
            bytes.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            bytes.extend_from_slice(b"BIN\0");
            bytes.extend_from_slice(&bin);

            let path = dir.join("mesh.glb");
            fs::write(&path, bytes).unwrap();
            path
        }
    }

    fn load(fixture: &Fixture) -> Result<Mesh> {
        let dir = tempfile::tempdir().unwrap();
        Mesh::load(fixture.write_gltf(dir.path()))
    }

    fn assert_translated_triangle(mesh: &Mesh) {
        assert_eq!(mesh.triangles().len(), 1);
        let t = mesh.triangles()[0];
        assert_eq!(t.material, 1);
        assert_eq!(t.vertices[0].position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(t.vertices[1].position, Vec3::new(12.0, 0.0, 0.0));
        assert_eq!(t.vertices[2].position, Vec3::new(10.0, 2.0, 0.0));
        assert_eq!(t.vertices[0].normal, Vec3::Z);
    }

    #[test]
    fn node_transforms_and_materials() {
        let mesh = load(&Fixture::default()).unwrap();
        assert_translated_triangle(&mesh);
        assert_eq!(mesh.materials().len(), 2);

        let m = mesh.materials()[1];
        assert_eq!(m.albedo, Vec3::X);
        assert_eq!(m.emissive, Vec3::Z);
        assert_eq!(m.specular_chance, 0.5);
        assert_eq!(m.specular_roughness, 0.25);
    }

    #[test]
    fn binary_container() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = Mesh::load(Fixture::default().write_glb(dir.path())).unwrap();
        assert_translated_triangle(&mesh);
        assert_eq!(mesh.materials().len(), 2);
    }

    #[test]
    fn unassigned_primitive_uses_default_material() {
        let mesh = load(&Fixture {
            material: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(mesh.triangles()[0].material, 0);
        assert_eq!(mesh.materials()[0], Material::default());
    }

    #[test]
    fn authored_normals_use_inverse_transpose() {
        let n = Vec3::new(1.0, 1.0, 0.0).normalize().to_array();
        let mesh = load(&Fixture {
            positions: vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 1.0]],
            normals: Some(vec![n; 3]),
            transform: r#""scale": [2.0, 1.0, 1.0]"#,
            ..Default::default()
        })
        .unwrap();
        let t = mesh.triangles()[0];
        let expected = Vec3::new(1.0, 2.0, 0.0).normalize();
        for v in t.vertices {
            assert!(v.normal.abs_diff_eq(expected, 1e-5), "{:?}", v.normal);
        }
        let [a, b, c] = t.positions();
        assert!(t.vertices[0].normal.dot(b - a).abs() < 1e-5);
        assert!(t.vertices[0].normal.dot(c - a).abs() < 1e-5);
    }

    #[test]
    fn strip_keeps_winding() {
        let mesh = load(&Fixture {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            indices: vec![0, 1, 2, 3],
            mode: Some(5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(mesh.triangles().len(), 2);
        for t in mesh.triangles() {
            assert_eq!(t.vertices[0].normal, Vec3::Z);
        }
        assert_eq!(mesh.triangles()[1].vertices[1].position, Vec3::new(12.0, 2.0, 0.0));
    }

    #[test]
    fn fan_shares_first_corner() {
        let mesh = load(&Fixture {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 1.0, 0.0],
                [1.0, 2.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            indices: vec![0, 1, 2, 3, 4],
            mode: Some(6),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(mesh.triangles().len(), 3);
        for t in mesh.triangles() {
            assert_eq!(t.vertices[0].position, Vec3::new(10.0, 0.0, 0.0));
        }
    }

    #[test]
    fn dangling_triangle_index_is_a_parse_error() {
        let err = load(&Fixture {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            indices: vec![0, 1, 2, 3],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }

    #[test]
    fn short_strip_is_a_parse_error() {
        let err = load(&Fixture {
            indices: vec![0, 1],
            mode: Some(5),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }

    #[test]
    fn missing_texture_does_not_fail_the_load() {
        let mesh = load(&Fixture {
            extra: r#", "images": [{ "uri": "missing.png" }]"#,
            ..Default::default()
        })
        .unwrap();
        assert_translated_triangle(&mesh);
    }

    #[test]
    fn points_are_rejected() {
        let err = load(&Fixture {
            mode: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedTopology { .. }));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Mesh::load(dir.path().join("scene.glb")).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound(_)));
    }

    #[test]
    fn strips() {
        assert_eq!(
            strip_to_list(&[0, 1, 2, 3, 4]),
            vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]]
        );
        assert!(strip_to_list(&[0, 1]).is_empty());
    }
}
