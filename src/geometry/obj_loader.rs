use crate::error::{Error, Result};
use crate::geometry::mesh::{fan_triangulate, parse_error, read_asset};
use crate::geometry::{Mesh, Vertex};
use crate::scene::{Material, Triangle};
use glam::{Vec2, Vec3};
use std::io::BufReader;
use std::path::Path;

const BUFFER_ORIGIN: &str = "<memory>";

impl Mesh {
    /// Loads an OBJ file; `mtllib` references resolve next to it.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = read_asset(path)?;
        parse_obj(&source, path.parent(), path)
    }

    /// Parses OBJ text. Without `base_dir` any `mtllib` is reported missing and
    /// the mesh falls back to the default material.
    pub fn load_obj_buf(source: &[u8], base_dir: Option<&Path>) -> Result<Self> {
        parse_obj(source, base_dir, Path::new(BUFFER_ORIGIN))
    }
}

fn parse_obj(source: &[u8], base_dir: Option<&Path>, origin: &Path) -> Result<Mesh> {
    let mut reader = BufReader::new(source);
    let (models, mtl_result) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            single_index: false,
            triangulate: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
        |mtl_path| match base_dir {
            Some(dir) => tobj::load_mtl(dir.join(mtl_path)),
            None => Err(tobj::LoadError::GenericFailure),
        },
    )
    .map_err(|e| parse_error(origin, e))?;

    let library: Vec<Material> = match mtl_result {
        Ok(mtls) => mtls.iter().map(Material::from_mtl).collect(),
        Err(e) => {
            log::warn!(
                "{}: material library unavailable ({e}), using default material",
                origin.display()
            );
            Vec::new()
        }
    };

    let mut triangles = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let material = match mesh.material_id {
            Some(id) if id < library.len() => id as u32 + 1,
            Some(id) => {
                log::warn!(
                    "{}: model `{}` references missing material {id}",
                    origin.display(),
                    model.name
                );
                0
            }
            None => 0,
        };
        let has_normals =
            !mesh.normal_indices.is_empty() && mesh.normal_indices.len() == mesh.indices.len();
        let has_tex_coords =
            !mesh.texcoord_indices.is_empty() && mesh.texcoord_indices.len() == mesh.indices.len();

        let vertex = |k: usize| -> Result<Vertex> {
            let position = fetch::<3>(&mesh.positions, mesh.indices[k])
                .ok_or_else(|| index_error(origin, "position", mesh.indices[k]))?;
            let normal = if has_normals {
                fetch::<3>(&mesh.normals, mesh.normal_indices[k])
                    .ok_or_else(|| index_error(origin, "normal", mesh.normal_indices[k]))?
            } else {
                [0.0; 3]
            };
            let tex_coord = if has_tex_coords {
                fetch::<2>(&mesh.texcoords, mesh.texcoord_indices[k])
                    .ok_or_else(|| index_error(origin, "texcoord", mesh.texcoord_indices[k]))?
            } else {
                [0.0; 2]
            };
            Ok(Vertex::new(
                Vec3::from_array(position),
                Vec3::from_array(normal),
                Vec2::from_array(tex_coord),
            ))
        };

        let arities = if mesh.face_arities.is_empty() {
            if mesh.indices.len() % 3 != 0 {
                return Err(parse_error(
                    origin,
                    format!("model `{}` has a dangling face index", model.name),
                ));
            }
            vec![3; mesh.indices.len() / 3]
        } else {
            mesh.face_arities.clone()
        };

        let mut start = 0;
        for arity in arities {
            let arity = arity as usize;
            if arity < 3 {
                return Err(Error::UnsupportedTopology {
                    path: origin.to_path_buf(),
                    topology: format!("face with {arity} vertices"),
                });
            }
            let end = start + arity;
            if end > mesh.indices.len() {
                return Err(parse_error(origin, "face runs past the index list"));
            }
            let face = (start..end).map(vertex).collect::<Result<Vec<_>>>()?;
            triangles.extend(fan_triangulate(&face).map(|[a, b, c]| {
                let triangle = Triangle::new(a, b, c, material);
                if has_normals {
                    triangle
                } else {
                    triangle.with_flat_normal()
                }
            }));
            start = end;
        }
    }

    if triangles.is_empty() {
        log::warn!("{}: OBJ contains no triangles", origin.display());
    }
    log::info!(
        "Loaded OBJ {}: {} models, {} triangles, {} materials",
        origin.display(),
        models.len(),
        triangles.len(),
        library.len() + 1
    );
    Ok(Mesh::new(triangles, library))
}

fn fetch<const N: usize>(data: &[f32], index: u32) -> Option<[f32; N]> {
    let start = index as usize * N;
    data.get(start..start + N)?.try_into().ok()
}

fn index_error(origin: &Path, kind: &str, index: u32) -> Error {
    parse_error(origin, format!("{kind} index {index} out of range"))
}
