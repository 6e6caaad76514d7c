//! Build script for airwire-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time
//! - Generates the board constants the firmware includes

use std::collections::BTreeSet;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// GPIO count on the RP2040
const GPIO_COUNT: i64 = 30;

/// Largest moving-average window the firmware supports
const MAX_WINDOW: i64 = 32;

fn main() {
    setup_linker();
    let board = validate_config();
    generate_constants(&board);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = out_dir();

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

fn out_dir() -> PathBuf {
    PathBuf::from(env::var("OUT_DIR").unwrap())
}

/// Validated board settings
struct Board {
    sgp30: (String, String),
    si7021: Option<(String, String)>,
    period_ms: i64,
    window: i64,
    sample_wait_ms: i64,
    humidity_compensation: bool,
    baseline: Option<i64>,
}

/// Validate board.toml
fn validate_config() -> Board {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a board.toml configuration file.          ║\n\
            ║  Please create one in the airwire-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();

    for section in ["sgp30", "sampling"] {
        if !matches!(config.get(section), Some(toml::Value::Table(_))) {
            errors.push(format!("Missing [{}] section", section));
        }
    }
    report("Missing required sections in board.toml", &errors);

    let sgp30 = validate_bus(&config, "sgp30", &mut errors);
    let si7021 = match config.get("si7021") {
        Some(_) => validate_bus(&config, "si7021", &mut errors),
        None => None,
    };

    // Every line needs its own GPIO
    let mut used = BTreeSet::new();
    for (scl, sda) in sgp30.iter().chain(si7021.iter()) {
        for pin in [scl, sda] {
            if !used.insert(pin.clone()) {
                errors.push(format!("{} is assigned to more than one line", pin));
            }
        }
    }

    let sampling = config.get("sampling");
    let period_ms = positive_int(sampling, "period_ms", None, &mut errors);
    let window = positive_int(sampling, "window", Some(MAX_WINDOW), &mut errors);
    let sample_wait_ms = positive_int(sampling, "sample_wait_ms", None, &mut errors);

    if sample_wait_ms > 0 && period_ms > 0 && sample_wait_ms <= period_ms {
        errors.push("[sampling] sample_wait_ms must exceed period_ms".to_string());
    }

    let humidity_compensation = match sampling.and_then(|s| s.get("humidity_compensation")) {
        None => true,
        Some(toml::Value::Boolean(b)) => *b,
        Some(_) => {
            errors.push("[sampling] humidity_compensation must be true or false".to_string());
            false
        }
    };

    let baseline = match sampling.and_then(|s| s.get("baseline")) {
        None => None,
        Some(toml::Value::Integer(b)) if *b > 0 && *b <= i64::from(u32::MAX) => Some(*b),
        Some(_) => {
            errors.push("[sampling] baseline must be a non-zero 32-bit value".to_string());
            None
        }
    };

    report("Invalid board configuration", &errors);
    println!("cargo:warning=board.toml validated successfully");

    Board {
        sgp30: sgp30.unwrap_or_default(),
        si7021,
        period_ms,
        window,
        sample_wait_ms,
        humidity_compensation,
        baseline,
    }
}

/// Check one `[bus]` section, returning its (scl, sda) pin names
fn validate_bus(
    config: &toml::Value,
    section: &str,
    errors: &mut Vec<String>,
) -> Option<(String, String)> {
    let table = match config.get(section) {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push(format!("[{}] must be a table", section));
            return None;
        }
        None => return None,
    };

    let mut pin = |key: &str| -> Option<String> {
        match table.get(key) {
            Some(toml::Value::String(s)) if parse_pin(s).is_some() => Some(s.trim().to_string()),
            Some(toml::Value::String(s)) => {
                errors.push(format!(
                    "[{}] {} = \"{}\" is not a GPIO (gpio0-gpio{})",
                    section,
                    key,
                    s,
                    GPIO_COUNT - 1
                ));
                None
            }
            Some(_) => {
                errors.push(format!("[{}] {} must be a string like \"gpio2\"", section, key));
                None
            }
            None => {
                errors.push(format!("[{}] missing '{}'", section, key));
                None
            }
        }
    };

    let scl = pin("scl");
    let sda = pin("sda");
    Some((scl?, sda?))
}

/// Parse "gpioN" or "^gpioN"
fn parse_pin(s: &str) -> Option<i64> {
    let s = s.trim();
    let s = s.strip_prefix('^').unwrap_or(s);
    let n: i64 = s.strip_prefix("gpio")?.parse().ok()?;
    (0..GPIO_COUNT).contains(&n).then_some(n)
}

fn positive_int(
    section: Option<&toml::Value>,
    key: &str,
    max: Option<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    match section.and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(v)) if *v > 0 && max.map_or(*v <= i64::from(u32::MAX), |m| *v <= m) => *v,
        Some(_) => {
            match max {
                Some(m) => errors.push(format!("[sampling] {} must be 1-{}", key, m)),
                None => errors.push(format!("[sampling] {} must be a positive integer", key)),
            }
            0
        }
        None => {
            errors.push(format!("[sampling] missing '{}'", key));
            0
        }
    }
}

/// Fail the build with a boxed list of errors
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write board constants to `$OUT_DIR/board_config.rs`
fn generate_constants(board: &Board) {
    let mut out = String::new();
    out.push_str("// Generated from board.toml by build.rs\n\n");
    out.push_str(&format!("pub const SGP30_SCL: &str = {:?};\n", board.sgp30.0));
    out.push_str(&format!("pub const SGP30_SDA: &str = {:?};\n", board.sgp30.1));
    match &board.si7021 {
        Some((scl, sda)) => out.push_str(&format!(
            "pub const SI7021_PINS: Option<(&str, &str)> = Some(({:?}, {:?}));\n",
            scl, sda
        )),
        None => out.push_str("pub const SI7021_PINS: Option<(&str, &str)> = None;\n"),
    }
    out.push_str(&format!("pub const PERIOD_MS: u32 = {};\n", board.period_ms));
    out.push_str(&format!("pub const WINDOW: u32 = {};\n", board.window));
    out.push_str(&format!("pub const SAMPLE_WAIT_MS: u32 = {};\n", board.sample_wait_ms));
    out.push_str(&format!(
        "pub const HUMIDITY_COMPENSATION: bool = {};\n",
        board.humidity_compensation
    ));
    match board.baseline {
        Some(b) => out.push_str(&format!("pub const BASELINE: Option<u32> = Some({:#x});\n", b)),
        None => out.push_str("pub const BASELINE: Option<u32> = None;\n"),
    }

    fs::write(out_dir().join("board_config.rs"), out).unwrap();
}
