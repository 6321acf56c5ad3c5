use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, anyhow, bail};
use clap::Parser;
use qmlite_engine::{Engine, EngineConfig, LoggingConfig, ObjectRef, Value, init_logging};

#[derive(Parser)]
#[command(name = "qmlite-runner")]
#[command(about = "Load a qmlite document and drive its animations and timers")]
struct Args {
    /// Document to load
    file: PathBuf,

    /// Engine time to simulate, in milliseconds
    #[arg(long, default_value_t = 1000)]
    duration_ms: u64,

    /// Scheduler frequency
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Extra element type, as Name=path/to/Component.qml (repeatable)
    #[arg(long = "component", value_name = "NAME=PATH")]
    components: Vec<String>,

    /// Tick with the wall clock instead of fixed steps
    #[arg(long)]
    realtime: bool,

    /// Print the object tree when done
    #[arg(long)]
    dump: bool,

    /// Log filter, env_logger syntax (defaults to RUST_LOG, then "info")
    #[arg(long)]
    log: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::default();
    if let Some(filter) = &args.log {
        logging = logging.with_filter(filter);
    }
    init_logging(logging);

    let engine = Engine::new(EngineConfig::default().with_fps(args.fps));
    for spec in &args.components {
        let Some((name, path)) = spec.split_once('=') else {
            bail!("--component expects NAME=PATH, got \"{spec}\"");
        };
        let source = fs::read_to_string(path).with_context(|| format!("failed to read component {path}"))?;
        engine
            .register_component(name, &source)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("failed to compile component {name}"))?;
    }

    let root = engine.load_file(&args.file)?;
    log::info!("loaded {} from {}", root.class_name(), args.file.display());

    if args.realtime {
        run_realtime(&engine, args.duration_ms)?;
    } else {
        run_fixed(&engine, args.duration_ms)?;
    }

    if args.dump {
        let mut out = String::new();
        dump(&engine, &root, 0, &mut out);
        print!("{out}");
    }
    Ok(())
}

/// Fixed steps of the configured tick interval; deterministic.
fn run_fixed(engine: &Engine, duration_ms: u64) -> anyhow::Result<()> {
    let step = engine.config().tick_interval_ms();
    let mut now = 0;
    while now < duration_ms {
        now += step;
        engine.tick(now as f64, step as f64).map_err(|e| anyhow!("{e}"))?;
    }
    log::debug!("ran {now} ms in steps of {step} ms");
    Ok(())
}

fn run_realtime(engine: &Engine, duration_ms: u64) -> anyhow::Result<()> {
    let interval = Duration::from_millis(engine.config().tick_interval_ms());
    let end = Duration::from_millis(duration_ms);
    let started = std::time::Instant::now();
    while started.elapsed() < end {
        std::thread::sleep(interval);
        engine.tick_clock().map_err(|e| anyhow!("{e}"))?;
    }
    Ok(())
}

// ── Tree dump ─────────────────────────────────────────────────────────────

/// Lists whose objects are printed as nested nodes.
const NESTED_LISTS: [&str; 3] = ["data", "states", "transitions"];

fn dump(engine: &Engine, obj: &ObjectRef, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match obj.id() {
        Some(id) => out.push_str(&format!("{indent}{} #{id}\n", obj.class_name())),
        None => out.push_str(&format!("{indent}{}\n", obj.class_name())),
    }

    let mut nested = Vec::new();
    for prop in obj.properties() {
        let value = engine.untracked(|| prop.get(engine)).unwrap_or_default();
        match &value {
            Value::Array(_) if NESTED_LISTS.contains(&prop.name()) => {
                nested.extend(value.array_items().unwrap_or_default().iter().filter_map(Value::as_object).cloned());
            }
            Value::Array(_) | Value::Map(_) | Value::Object(_) | Value::Function(_) | Value::Signal(_) | Value::Element(_) => {}
            v => out.push_str(&format!("{indent}  {}: {}\n", prop.name(), display(v))),
        }
    }
    for child in nested {
        dump(engine, &child, depth + 1, out);
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        v => v.to_display_string(),
    }
}
