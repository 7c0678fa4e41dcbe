//! pmx-cli - Tool for inspecting and repairing PMX model files.

use pmx_edit::model::editing::merge_all_duplicate_bones;
use pmx_edit::validator::{KeyTranslator, Severity, SeverityMask};
use pmx_edit::{Model, Settings};
use std::env;
use std::path::Path;

use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level (thread-safe)
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LOG_INFO);

/// Environment variable read by the tracing filter.
const LOG_ENV: &str = "PMX_LOG";

#[inline]
fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

#[inline]
fn set_log_level(level: u8) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

macro_rules! info {
    ($($arg:tt)*) => {
        if log_level() >= LOG_INFO {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        if log_level() >= LOG_DEBUG {
            println!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

/// Route library `tracing` events to stderr.
///
/// `PMX_LOG` wins when set; otherwise the verbosity flags pick the level.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let fallback = match log_level() {
        LOG_QUIET => "off",
        LOG_INFO => "warn",
        LOG_DEBUG => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut config: Option<&str> = None;
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => set_log_level(LOG_DEBUG),
            "-vv" | "--trace" => set_log_level(LOG_TRACE),
            "-q" | "--quiet" => set_log_level(LOG_QUIET),
            "--config" => match iter.next() {
                Some(path) => config = Some(path.as_str()),
                None => fail("--config needs a path"),
            },
            _ => filtered_args.push(arg),
        }
    }

    init_tracing();

    let settings = match config {
        Some(path) => Settings::load(path).unwrap_or_else(|e| fail(&format!("Failed to read {}: {}", path, e))),
        None => Settings::default(),
    };
    debug!("Settings: {:?}", settings);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Info command - show object counts
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: pmx-cli info <file.pmx>");
                std::process::exit(1);
            }
            cmd_info(filtered_args[1]);
        }

        // Validate command - print diagnostics
        "validate" | "check" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: pmx-cli validate <file.pmx> [--severity info|warning|error|fatal]");
                std::process::exit(1);
            }
            let mask = match filtered_args.iter().position(|&s| s == "--severity" || s == "-s") {
                Some(i) => {
                    let value = filtered_args.get(i + 1).copied().unwrap_or_default();
                    match Severity::parse(value) {
                        Some(severity) => SeverityMask::at_least(severity),
                        None => fail(&format!("Unknown severity: {}", value)),
                    }
                }
                None => settings.severity,
            };
            cmd_validate(filtered_args[1], mask);
        }

        // Roundtrip command - load, save and compare
        "roundtrip" | "rt" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: pmx-cli roundtrip <input.pmx> <output.pmx>");
                std::process::exit(1);
            }
            cmd_roundtrip(filtered_args[1], filtered_args[2]);
        }

        // Merge duplicate bones
        "merge-bones" | "mb" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: pmx-cli merge-bones <input.pmx> <output.pmx>");
                std::process::exit(1);
            }
            cmd_merge_bones(filtered_args[1], filtered_args[2]);
        }

        // Help
        "help" | "h" | "-h" | "--help" => print_help(),

        // Default: if file exists, show info; otherwise error
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn print_help() {
    println!("pmx-cli - PMX model toolkit (built {})", env!("PMX_EDIT_BUILD_DATE"));
    println!();
    println!("USAGE:");
    println!("    pmx-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info        <file>                Show version, codec and object counts");
    println!("    check, validate <file> [-s level]    Print validation diagnostics");
    println!("    rt, roundtrip  <in> <out>            Load, save and compare counts");
    println!("    mb, merge-bones <in> <out>           Merge bones sharing a name and save");
    println!("    h, help                              Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose      Show debug output");
    println!("    -vv, --trace       Show trace output (very verbose)");
    println!("    -q, --quiet        Suppress all output");
    println!("    --config <file>    Read settings from a JSON file");
    println!();
    println!("EXAMPLES:");
    println!("    pmx-cli info model.pmx                      # Quick overview");
    println!("    pmx-cli validate model.pmx -s error         # Errors and fatal problems only");
    println!("    pmx-cli roundtrip model.pmx copy.pmx        # Test round-trip");
    println!("    PMX_LOG=debug pmx-cli info model.pmx        # Library logging");
    println!();
    println!("NOTES:");
    println!("    - Passing a .pmx file directly is equivalent to 'info'");
}

fn open(path: &str) -> Model {
    info!("Opening model: {}", path);
    match Model::open(path) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn save(model: &Model, path: &str) {
    if let Err(e) = model.save_to(path) {
        eprintln!("Failed to write {}: {}", path, e);
        std::process::exit(1);
    }
    info!("Wrote {}", path);
}

/// Per-kind object counts
#[derive(Debug, PartialEq, Eq)]
struct ObjectCounts {
    vertices: usize,
    faces: usize,
    textures: usize,
    materials: usize,
    bones: usize,
    constraints: usize,
    morphs: usize,
    labels: usize,
    rigid_bodies: usize,
    joints: usize,
    soft_bodies: usize,
}

impl ObjectCounts {
    fn of(model: &Model) -> Self {
        Self {
            vertices: model.vertices.len(),
            faces: model.vertex_indices.len() / 3,
            textures: model.textures.len(),
            materials: model.materials.len(),
            bones: model.bones.len(),
            constraints: model.constraints.len(),
            morphs: model.morphs.len(),
            labels: model.labels.len(),
            rigid_bodies: model.rigid_bodies.len(),
            joints: model.joints.len(),
            soft_bodies: model.soft_bodies.len(),
        }
    }

    fn print(&self) {
        println!("Objects:");
        println!("  Vertices:     {} ({} faces)", self.vertices, self.faces);
        println!("  Textures:     {}", self.textures);
        println!("  Materials:    {}", self.materials);
        println!("  Bones:        {} ({} IK constraints)", self.bones, self.constraints);
        println!("  Morphs:       {}", self.morphs);
        println!("  Labels:       {}", self.labels);
        println!("  Rigid bodies: {}", self.rigid_bodies);
        println!("  Joints:       {}", self.joints);
        if self.soft_bodies > 0 {
            println!("  Soft bodies:  {}", self.soft_bodies);
        }
    }
}

fn cmd_info(path: &str) {
    let model = open(path);
    debug!("Model parsed successfully");

    println!("Model: {}", path);
    println!("Name: {}", model.name.first());
    println!("Version: {:.1}", model.version);
    println!("Codec: {:?}", model.codec);
    println!("Additional UVs: {}", model.additional_uv_count);
    println!();
    ObjectCounts::of(&model).print();
}

fn cmd_validate(path: &str, mask: SeverityMask) {
    let model = open(path);
    let diagnostics = pmx_edit::validator::Validator::new(mask).validate(&model);

    if diagnostics.is_empty() {
        println!("No problems found");
        return;
    }
    for diagnostic in &diagnostics {
        println!("[{}] {}", diagnostic.severity.as_str(), diagnostic.format(&KeyTranslator));
    }
    println!();
    println!("{} problem(s)", diagnostics.len());
    if diagnostics.iter().any(|d| d.severity >= Severity::Error) {
        std::process::exit(2);
    }
}

fn cmd_roundtrip(input: &str, output: &str) {
    let model = open(input);
    let before = ObjectCounts::of(&model);
    save(&model, output);

    let reread = open(output);
    let after = ObjectCounts::of(&reread);
    if before == after {
        println!("Round-trip OK");
        before.print();
    } else {
        eprintln!("Round-trip mismatch");
        eprintln!("  before: {:?}", before);
        eprintln!("  after:  {:?}", after);
        std::process::exit(1);
    }
}

fn cmd_merge_bones(input: &str, output: &str) {
    let mut model = open(input);
    let removed = match merge_all_duplicate_bones(&mut model) {
        Ok(n) => n,
        Err(e) => fail(&format!("Merge failed: {}", e)),
    };
    println!("Merged {} duplicate bone(s)", removed);
    save(&model, output);
}
