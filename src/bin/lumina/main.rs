//! Lumina CLI - Offline renders and settings files for the progressive path tracer.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use lumina::prelude::*;

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity {
    Quiet,
    Info,
    Debug,
    Trace,
}

#[cfg(feature = "chrome-trace")]
type TraceGuard = tracing_chrome::FlushGuard;
#[cfg(not(feature = "chrome-trace"))]
type TraceGuard = ();

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = Verbosity::Info;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Debug,
            "-vv" | "--trace" => verbosity = Verbosity::Trace,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            _ => filtered_args.push(arg),
        }
    }

    let _trace_guard = init_tracing(verbosity);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "render" | "r" => RenderArgs::parse(&filtered_args[1..]).and_then(|a| cmd_render(&a, verbosity)),
        "settings" | "s" => cmd_settings(filtered_args.get(1).copied()),
        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: Verbosity) -> Option<TraceGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default_filter = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Info => "info",
        Verbosity::Debug => "lumina=debug,info",
        Verbosity::Trace => "lumina=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    #[cfg(feature = "chrome-trace")]
    if env::var("LUMINA_TRACE").ok().as_deref() == Some("1") {
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .file("trace.json")
            .build();
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(chrome_layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            return None;
        }
        return Some(guard);
    }

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
    None
}

fn print_version() {
    println!(
        "lumina {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("LUMINA_BUILD_DATE"),
        env!("LUMINA_BUILD_TIME")
    );
}

fn print_help() {
    println!("lumina - Progressive Monte Carlo path tracer");
    println!();
    println!("USAGE:");
    println!("    lumina [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    r, render [render options]     Render a scene to PNG");
    println!("    s, settings [file]             Print (or write) default settings as JSON");
    println!("    version                        Show version and build date");
    println!("    h, help                        Show this help");
    println!();
    println!("RENDER OPTIONS:");
    println!("    -o, --output <file>            Output image (default: render.png)");
    println!("    --settings <file>              Load render settings JSON first");
    println!("    --width <n>, --height <n>      Image size");
    println!("    --spp <n>                      Samples per pixel");
    println!("    --bounces <n>                  Max path length");
    println!("    --rr-depth <n>                 Bounces before Russian roulette kicks in");
    println!("    --exposure <f>                 Manual exposure");
    println!("    --auto-exposure [target]       Auto exposure (default target 0.18)");
    println!("    --env <file>                   Equirectangular HDR/EXR environment");
    println!("    --normals                      Render debug normals");
    println!("    --backend <cpu|serial>         Pixel scheduling (default: cpu)");
    println!("    --serial                       Same as --backend serial");
    println!("    --scene <demo|empty>           Built-in scene (default: demo)");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Errors only");
    println!();
    println!("EXAMPLES:");
    println!("    lumina render -o out.png --spp 256");
    println!("    lumina render --env studio.hdr --auto-exposure 0.2");
    println!("    lumina settings my.json && lumina render --settings my.json");
    println!();
    println!("NOTES:");
    println!("    - RUST_LOG overrides the -v/-q filter");
    println!("    - With --features chrome-trace, LUMINA_TRACE=1 writes trace.json");
}

/// Built-in scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneKind {
    Demo,
    Empty,
}

/// Parsed `render` options. `None` means "keep the settings value".
#[derive(Debug)]
struct RenderArgs {
    output: PathBuf,
    settings: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    spp: Option<u32>,
    bounces: Option<u32>,
    rr_depth: Option<u32>,
    exposure: Option<f32>,
    auto_exposure: Option<f32>,
    env: Option<PathBuf>,
    normals: bool,
    backend: Backend,
    scene: SceneKind,
}

impl RenderArgs {
    fn parse(args: &[&str]) -> anyhow::Result<Self> {
        let mut out = Self {
            output: PathBuf::from("render.png"),
            settings: None,
            width: None,
            height: None,
            spp: None,
            bounces: None,
            rr_depth: None,
            exposure: None,
            auto_exposure: None,
            env: None,
            normals: false,
            backend: Backend::Cpu,
            scene: SceneKind::Demo,
        };

        let mut i = 0;
        while i < args.len() {
            let flag = args[i];
            match flag {
                "-o" | "--output" => out.output = PathBuf::from(take_value(args, &mut i, flag)?),
                "--settings" => out.settings = Some(PathBuf::from(take_value(args, &mut i, flag)?)),
                "--width" => out.width = Some(parse_num(flag, take_value(args, &mut i, flag)?)?),
                "--height" => out.height = Some(parse_num(flag, take_value(args, &mut i, flag)?)?),
                "--spp" => out.spp = Some(parse_num(flag, take_value(args, &mut i, flag)?)?),
                "--bounces" => out.bounces = Some(parse_num(flag, take_value(args, &mut i, flag)?)?),
                "--rr-depth" => out.rr_depth = Some(parse_num(flag, take_value(args, &mut i, flag)?)?),
                "--exposure" => out.exposure = Some(parse_num(flag, take_value(args, &mut i, flag)?)?),
                "--auto-exposure" => {
                    // Optional target
                    let target = args.get(i + 1).and_then(|s| s.parse::<f32>().ok());
                    if target.is_some() {
                        i += 1;
                    }
                    out.auto_exposure = Some(target.unwrap_or(0.18));
                }
                "--env" => out.env = Some(PathBuf::from(take_value(args, &mut i, flag)?)),
                "--normals" => out.normals = true,
                "--backend" => out.backend = take_value(args, &mut i, flag)?.parse()?,
                "--serial" => out.backend = Backend::CpuSerial,
                "--scene" => {
                    out.scene = match take_value(args, &mut i, flag)? {
                        "demo" => SceneKind::Demo,
                        "empty" => SceneKind::Empty,
                        other => bail!("unknown scene '{other}' (expected demo or empty)"),
                    }
                }
                other => bail!("unknown render option '{other}'"),
            }
            i += 1;
        }
        Ok(out)
    }

    /// Layer command-line overrides on top of `settings`.
    fn apply(&self, settings: &mut RenderSettings) -> anyhow::Result<()> {
        if self.width.is_some() || self.height.is_some() {
            let w = self.width.unwrap_or(settings.width());
            let h = self.height.unwrap_or(settings.height());
            settings.set_resolution(w, h)?;
        }
        if let Some(spp) = self.spp {
            settings.set_samples_per_pixel(spp);
        }
        if let Some(b) = self.bounces {
            settings.set_max_bounces(b);
        }
        if let Some(d) = self.rr_depth {
            settings.set_russian_roulette_depth(d);
        }
        if let Some(e) = self.exposure {
            settings.set_exposure(e);
        }
        if let Some(target) = self.auto_exposure {
            settings.set_auto_exposure(true, target);
        }
        // Offline: trace the whole budget in one call
        settings.set_progressive(false);
        Ok(())
    }
}

/// Consume the value following `flag`.
fn take_value<'a>(args: &[&'a str], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i).copied().with_context(|| format!("missing value for {flag}"))
}

fn parse_num<T: std::str::FromStr>(flag: &str, s: &str) -> anyhow::Result<T> {
    s.parse::<T>()
        .map_err(|_| anyhow::anyhow!("invalid value '{s}' for {flag}"))
}

fn build_scene(kind: SceneKind, args: &RenderArgs) -> anyhow::Result<Scene> {
    let mut scene = Scene::new();

    if kind == SceneKind::Demo {
        let materials = scene.materials_mut();
        let ground = materials.register_named("ground", Material::gray(0.5));
        let red = materials.register_named("red", Material::new(Vec3::new(0.8, 0.25, 0.2)));
        let blue = materials.register_named("blue", Material::new(Vec3::new(0.2, 0.35, 0.8)));
        let white = materials.register_named("white", Material::gray(0.9));

        let floor = scene.add_sphere(Vec3::new(0.0, -1001.0, 0.0), 1000.0, ground)?;
        let center = scene.add_sphere(Vec3::new(0.0, 0.0, 3.5), 1.0, white)?;
        let left = scene.add_sphere(Vec3::new(-2.2, 0.0, 4.5), 1.0, red)?;
        let right = scene.add_sphere(Vec3::new(2.2, 0.0, 4.5), 1.0, blue)?;
        let pebble = scene.add_sphere(Vec3::new(0.9, -0.6, 2.0), 0.4, red)?;
        for id in [center, left, right] {
            scene.set_parent(id, floor)?;
        }
        scene.set_parent(pebble, center)?;
    }

    if let Some(path) = &args.env {
        let env = EnvironmentMap::load(path).with_context(|| format!("loading environment {}", path.display()))?;
        scene.set_environment(Some(Arc::new(env)));
    }
    scene.set_debug_normals(args.normals);
    Ok(scene)
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<RenderSettings> {
    match path {
        Some(p) => RenderSettings::load(p).with_context(|| format!("loading settings {}", p.display())),
        None => Ok(RenderSettings::default()),
    }
}

fn cmd_render(args: &RenderArgs, verbosity: Verbosity) -> anyhow::Result<()> {
    let mut settings = load_settings(args.settings.as_deref())?;
    args.apply(&mut settings)?;
    let scene = build_scene(args.scene, args)?;

    tracing::info!(
        width = settings.width(),
        height = settings.height(),
        spp = settings.samples_per_pixel(),
        bounces = settings.max_bounces(),
        backend = %args.backend,
        spheres = scene.sphere_count(),
        "rendering"
    );

    let mut tracer = create_path_tracer(args.backend);
    tracer.set_scene(scene);
    tracer.set_settings(settings);
    tracer.set_shader(Some(Arc::new(AlbedoShader)));

    let start = Instant::now();
    let status = tracer.render()?;
    let elapsed = start.elapsed();

    let display = tracer.display();
    let exposure = display.exposure();
    display
        .to_image()
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    if verbosity > Verbosity::Quiet {
        println!(
            "Wrote {} ({}x{}, {} spp, exposure {:.3}) in {:.2?}",
            args.output.display(),
            display.width(),
            display.height(),
            status.frame_count(),
            exposure,
            elapsed
        );
    }
    Ok(())
}

fn cmd_settings(path: Option<&str>) -> anyhow::Result<()> {
    let settings = RenderSettings::default();
    match path {
        Some(p) => {
            settings.save(p).with_context(|| format!("writing {}", p))?;
            println!("Wrote default settings to {}", p);
        }
        None => println!("{}", settings.to_json()?),
    }
    Ok(())
}
