use crate::error::{Error, Result};
use crate::scene::{Material, Triangle};
use std::io::ErrorKind;
use std::path::Path;

/// Flat triangle soup produced by ingestion. `materials()[0]` is always the
/// default material, so triangles without an authored material stay valid.
#[derive(Clone, Debug)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Mesh {
    /// Builds a mesh from already ingested data. `library` holds the authored
    /// materials only; the default is inserted in front of it, so a triangle
    /// using `library[i]` must carry material index `i + 1`.
    pub fn new(triangles: Vec<Triangle>, library: Vec<Material>) -> Self {
        let mut materials = Vec::with_capacity(library.len() + 1);
        materials.push(Material::default());
        materials.extend(library);
        Self {
            triangles,
            materials,
        }
    }

    /// Loads an OBJ, glTF or GLB asset, chosen by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("obj") => Self::load_obj(path),
            Some("gltf") | Some("glb") => Self::load_gltf(path),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn into_parts(self) -> (Vec<Triangle>, Vec<Material>) {
        (self.triangles, self.materials)
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

pub(crate) fn read_asset(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::AssetNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })
}

pub(crate) fn parse_error(path: &Path, reason: impl ToString) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Fan triangulation around the first corner: `(p0, pi, pi+1)` for `i` in `1..n-1`.
pub(crate) fn fan_triangulate<T: Copy>(polygon: &[T]) -> impl Iterator<Item = [T; 3]> + '_ {
    (1..polygon.len().saturating_sub(1)).map(move |i| [polygon[0], polygon[i], polygon[i + 1]])
}
