use scene_bvh::{gpu, GpuScene, Scene};
use std::env;
use std::process::ExitCode;

fn run(path: &str, upload: bool) -> scene_bvh::Result<()> {
    let mut scene = Scene::load(path)?;
    scene.build_bvh();
    let packed = scene.pack()?;
    let tree = scene.bvh();
    let bounds = tree.root_bounds();
    println!("{path}");
    println!("  triangles: {}", scene.triangle_count());
    println!("  materials: {}", scene.material_count());
    println!(
        "  bvh nodes: {} ({} leaves, depth {})",
        scene.node_count(),
        tree.leaf_count(),
        tree.depth()
    );
    println!("  bounds:    {:?} .. {:?}", bounds.min, bounds.max);
    println!(
        "  bytes:     nodes {} / triangles {} / materials {}",
        packed.node_bytes().len(),
        packed.triangle_bytes().len(),
        packed.material_bytes().len()
    );
    if upload {
        match gpu::headless_device() {
            Some((device, _queue)) => {
                let mut gpu_scene = GpuScene::new();
                gpu_scene.upload(&device, &packed)?;
                println!("  uploaded:  generation {}", gpu_scene.generation());
            }
            None => log::warn!("No GPU adapter available, skipping upload"),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let upload = args.iter().any(|a| a == "--upload");
    let Some(path) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        let program = args.first().map_or("scene_bvh", String::as_str);
        eprintln!("usage: {program} <scene.obj|scene.gltf|scene.glb> [--upload]");
        return ExitCode::from(2);
    };
    match run(path, upload) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
