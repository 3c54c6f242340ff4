use glam::Vec3;

/// Surface description shared by all triangles referencing it by index.
/// Chances and roughness values are in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub albedo: Vec3,
    pub emissive: Vec3,
    /// Probability that a bounce is specular.
    pub specular_chance: f32,
    /// 1 is fully rough.
    pub specular_roughness: f32,
    pub specular_color: Vec3,
    pub ior: f32,
    pub refraction_chance: f32,
    pub refraction_roughness: f32,
    pub refraction_color: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vec3::splat(0.8),
            emissive: Vec3::ZERO,
            specular_chance: 0.02,
            specular_roughness: 0.5,
            specular_color: Vec3::ONE,
            ior: 1.0,
            refraction_chance: 0.0,
            refraction_roughness: 0.0,
            refraction_color: Vec3::ZERO,
        }
    }
}

impl Material {
    pub fn new_lambertian(albedo: Vec3) -> Self {
        Self {
            albedo,
            ..Default::default()
        }
    }

    pub fn new_emissive(albedo: Vec3, emissive: Vec3) -> Self {
        Self {
            albedo,
            emissive,
            ..Default::default()
        }
    }

    pub fn new_metal(albedo: Vec3, roughness: f32) -> Self {
        Self {
            albedo,
            specular_chance: 1.0,
            specular_roughness: roughness.clamp(0.0, 1.0),
            specular_color: albedo,
            ..Default::default()
        }
    }

    pub fn new_dielectric(ior: f32) -> Self {
        Self {
            albedo: Vec3::ONE,
            ior,
            refraction_chance: 1.0,
            refraction_color: Vec3::ONE,
            ..Default::default()
        }
    }

    /// Maps an MTL record onto the path-tracing parameters.
    pub(crate) fn from_mtl(mtl: &tobj::Material) -> Self {
        let mut ret = Self::default();
        if let Some(kd) = mtl.diffuse {
            ret.albedo = Vec3::from_array(kd);
        }
        if let Some(ke) = mtl.unknown_param.get("Ke").and_then(|s| parse_rgb(s)) {
            ret.emissive = ke;
        }
        if let Some(ks) = mtl.specular {
            ret.specular_color = Vec3::from_array(ks);
            if ks.iter().sum::<f32>() > 0.1 {
                ret.specular_chance = 0.1;
            }
        }
        if let Some(ns) = mtl.shininess {
            ret.specular_roughness = (1.0 - ns / 1000.0).clamp(0.01, 1.0);
        }
        if let Some(ni) = mtl.optical_density {
            ret.ior = ni;
        }
        if let Some(d) = mtl.dissolve {
            if d < 1.0 {
                ret.refraction_chance = (1.0 - d).clamp(0.0, 1.0);
                ret.refraction_color = ret.albedo;
            }
        }
        ret
    }

    pub(crate) fn from_gltf(material: &gltf::Material) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();
        let mut ret = Self {
            albedo: Vec3::new(r, g, b),
            emissive: Vec3::from_array(material.emissive_factor()),
            specular_chance: pbr.metallic_factor(),
            specular_roughness: pbr.roughness_factor(),
            ..Default::default()
        };
        if let Some(ior) = material.ior() {
            ret.ior = ior;
        }
        if let Some(transmission) = material.transmission() {
            ret.refraction_chance = transmission.transmission_factor();
            ret.refraction_color = ret.albedo;
        }
        ret
    }
}

fn parse_rgb(s: &str) -> Option<Vec3> {
    let mut it = s.split_whitespace().map(str::parse::<f32>);
    let r = it.next()?.ok()?;
    let g = it.next().and_then(Result::ok).unwrap_or(r);
    let b = it.next().and_then(Result::ok).unwrap_or(r);
    Some(Vec3::new(r, g, b))
}
