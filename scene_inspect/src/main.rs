//! Scene inspector
//!
//! Loads a glTF file into a headless scene, prints the node tree and the
//! batched draw plan, then runs a few update/draw frames against host memory
//! and reports what was recorded.
//!
//! ```text
//! scene_inspect <MODEL> [--config <FILE>] [--frames <COUNT>]
//! ```

use anyhow::{bail, Context, Result};
use ash::vk;
use clap::{value_parser, Arg, ArgMatches, Command};
use scene_engine::core::Config;
use scene_engine::ecs::globals::{DrawDirector, GeometryStore};
use scene_engine::foundation::collections::NodeKey;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;

const DEFAULT_FRAMES: &str = "3";

#[derive(Debug)]
struct Args {
    model: String,
    config: Option<String>,
    frames: u64,
}

impl Args {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            model: matches.get_one::<String>("model").cloned().unwrap_or_default(),
            config: matches.get_one::<String>("config").cloned(),
            frames: matches.get_one::<u64>("frames").copied().unwrap_or(3),
        }
    }
}

fn cli() -> Command {
    Command::new("scene_inspect")
        .about("Loads a glTF model into a headless scene and reports its draw plan")
        .arg(
            Arg::new("model")
                .value_name("MODEL")
                .help("Path to a .gltf or .glb file")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Scene configuration (.toml or .ron)"),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .long("frames")
                .value_name("COUNT")
                .help("Number of update/draw frames to run")
                .value_parser(value_parser!(u64))
                .default_value(DEFAULT_FRAMES),
        )
}

fn print_node(scene: &Scene, key: NodeKey, depth: usize) {
    let Some(node) = scene.node(key) else {
        return;
    };
    let components: Vec<&str> = node
        .components()
        .iter()
        .filter_map(|&component| scene.locals().get(component))
        .map(|component| component.name().rsplit("::").next().unwrap_or_default())
        .collect();
    let translation = node.transform.position;
    println!(
        "{:indent$}#{} {} at ({:.2}, {:.2}, {:.2}) [{}]",
        "",
        node.index(),
        node.name.as_deref().unwrap_or("<unnamed>"),
        translation.x,
        translation.y,
        translation.z,
        components.join(", "),
        indent = depth * 2
    );
    for &child in node.children() {
        print_node(scene, child, depth + 1);
    }
}

fn print_draw_plan(scene: &Scene) {
    let Some(director) = scene.global::<DrawDirector>() else {
        println!("No draw director");
        return;
    };
    let geometry = scene.global::<GeometryStore>();
    println!(
        "Draw plan: {} ops, {} instances",
        director.draw_ops().len(),
        director.total_instances()
    );
    for op in director.draw_ops() {
        let name = geometry
            .and_then(|store| store.mesh(op.mesh))
            .map_or("<missing mesh>", |mesh| mesh.name.as_str());
        println!(
            "  {name}: {} instances from transform slot {}",
            op.instance_count(),
            op.transform_offset
        );
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => SceneConfig::load_from_file(path).with_context(|| format!("Failed to load config {path}"))?,
        None => SceneConfig::default(),
    };

    let mut scene = Scene::headless(
        vk::Extent2D {
            width: 1280,
            height: 720,
        },
        config,
    );
    let report = load_gltf(&mut scene, &args.model).with_context(|| format!("Failed to load {}", args.model))?;
    println!("{}: {}", args.model, report.summary());
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }

    println!("Nodes:");
    for &root in scene.root_nodes() {
        print_node(&scene, root, 1);
    }
    print_draw_plan(&scene);

    let mut clock = FrameClock::new();
    let mut commands = CommandLog::new();
    for frame in 0..args.frames {
        scene
            .update(&clock.tick())
            .with_context(|| format!("Update failed on frame {frame}"))?;
        commands.clear();
        scene
            .draw(&clock.render_info(), &mut commands)
            .with_context(|| format!("Draw failed on frame {frame}"))?;
    }
    println!(
        "Last frame: {} commands, {} draws, {} vertex buffer binds",
        commands.commands().len(),
        commands.draw_count(),
        commands.vertex_bind_count()
    );

    let tracker = scene.context().tracker();
    println!(
        "GPU memory: {} allocations, {} bytes",
        tracker.live_count(),
        tracker.live_bytes()
    );

    let context = scene.context().clone();
    scene.cleanup(false);
    let leaks = context.tracker().report_leaks();
    if leaks > 0 {
        bail!("{leaks} allocations outlived the scene");
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init_with_level("info");
    let args = Args::from_matches(&cli().get_matches());
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        let mut full = vec!["scene_inspect"];
        full.extend_from_slice(argv);
        cli().try_get_matches_from(full).map(|matches| Args::from_matches(&matches))
    }

    #[test]
    fn test_defaults_to_three_frames_without_config() {
        let args = parse(&["box.glb"]).unwrap();
        assert_eq!(args.model, "box.glb");
        assert_eq!(args.config, None);
        assert_eq!(args.frames, 3);
    }

    #[test]
    fn test_config_and_frames_are_named() {
        let args = parse(&["box.glb", "--config", "scene.toml", "-f", "10"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("scene.toml"));
        assert_eq!(args.frames, 10);

        let args = parse(&["-c", "scene.ron", "box.glb"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("scene.ron"));
    }

    #[test]
    fn test_malformed_frame_counts_are_rejected() {
        assert!(parse(&["box.glb", "-3"]).is_err());
        assert!(parse(&["box.glb", "--frames", "-3"]).is_err());
        assert!(parse(&["box.glb", "--frames", "many"]).is_err());
        assert!(parse(&[]).is_err());
    }
}
