use stackbind::bind::{export, import};
use stackbind::logging::init_dev_logging;
use stackbind::{init_logging, Config, Engine, Value, Vm};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug)]
struct Args {
    scripts: Vec<PathBuf>,
    config: Option<PathBuf>,
    verbose: bool,
}

impl Args {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let prog = args.first().map(String::as_str).unwrap_or("stackbind");

        let mut scripts = Vec::new();
        let mut config = None;
        let mut verbose = false;

        let mut rest = args.iter().skip(1);
        while let Some(arg) = rest.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(Self::usage(prog)),
                "--verbose" | "-v" => verbose = true,
                "--config" => match rest.next() {
                    Some(path) => config = Some(PathBuf::from(path)),
                    None => return Err("--config needs a file argument".to_string()),
                },
                path if !path.starts_with('-') => scripts.push(PathBuf::from(path)),
                opt => return Err(format!("Unknown option: {}\n\n{}", opt, Self::usage(prog))),
            }
        }

        if scripts.is_empty() {
            return Err(Self::usage(prog));
        }

        Ok(Self { scripts, config, verbose })
    }

    fn usage(prog: &str) -> String {
        format!(
            "stackbind - run scripts against natively bound functions\n\n\
            USAGE:\n    {} [OPTIONS] <scripts...>\n\n\
            OPTIONS:\n    \
            -h, --help        Print help information\n    \
            -v, --verbose     Debug logging to stderr\n    \
            --config FILE     Read settings from FILE instead of stackbind.toml\n\n\
            NATIVES:\n    \
            simple(x, y)          x * y + y\n    \
            no_return(x, y, z)    prints its arguments\n    \
            len(s)                character count of s\n\n\
            A script defining a global `main` has it called after loading.",
            prog
        )
    }
}

fn simple(x: i32, y: i32) -> i32 {
    println!("input: ({},{})", x, y);
    x.wrapping_mul(y).wrapping_add(y)
}

fn no_return(x: f32, y: f64, z: &str) {
    println!("input: ({},{},{})", x, y, z);
}

fn len(text: &str) -> i64 {
    text.chars().count() as i64
}

/// Explicit `--config` file, else the nearest `stackbind.toml`
///
/// Runs before logging exists, so failures go back to `main` for stderr.
fn load_config(path: Option<&PathBuf>) -> Result<Config, String> {
    match path.cloned().or_else(Config::find) {
        Some(path) => Config::load(&path).map_err(|e| format!("{}: {}", path.display(), e)),
        None => Ok(Config::default()),
    }
}

fn main() {
    let args = match Args::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let _guard = if args.verbose {
        init_dev_logging()
    } else {
        init_logging(config.logging.to_log_config())
    };

    debug!(scripts = ?args.scripts, config = ?config, "configuration loaded");

    let mut vm = Vm::with_config(config.vm.clone());
    vm.open_libs();
    export::<(i32, i32), _>(&mut vm, "simple", simple);
    export::<(f32, f64, &str), _>(&mut vm, "no_return", no_return);
    export::<(&str,), _>(&mut vm, "len", len);

    let mut failures = 0;
    for script in &args.scripts {
        info!(script = %script.display(), "running script");

        if let Err(e) = vm.load_and_run(script) {
            error!(script = %script.display(), error = %e, "script failed");
            eprintln!("{}", e);
            failures += 1;
            continue;
        }

        if vm.global("main").map_or(false, Value::is_callable) {
            let result = {
                let mut main = import::<(), (), _>(&mut vm, "main");
                main.call(())
            };
            if let Err(e) = result {
                error!(script = %script.display(), error = %e, "main failed");
                eprintln!("{}", e);
                failures += 1;
            }
            // each script gets its own `main`
            vm.push_value(Value::Nil);
            vm.set_global("main");
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
