//! tcl-core - a Tcl-compatible scripting language interpreter
//!
//! Usage:
//!   tcl-core              Start interactive REPL
//!   tcl-core -c "script"  Evaluate a single script
//!   tcl-core script.tcl   Evaluate a script file

use std::env;
use std::fs;
use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tcl_core::host::memory::MemoryHost;
use tcl_core::{Config, Interpreter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"tcl-core {}

USAGE:
    tcl-core                  Start interactive REPL
    tcl-core -c <script>      Evaluate a single script
    tcl-core <script.tcl>     Evaluate a script file
    tcl-core --help           Show this help message
    tcl-core --version        Show version
"#,
        VERSION
    );
}

fn init_logging() {
    let filter = env::var("TCL_CORE_LOG").unwrap_or_else(|_| "tcl_core=warn".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(feature = "config-file")]
fn load_config() -> Config {
    match Config::load("tclrc.toml") {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::debug!(error = %e, "no tclrc.toml found, using built-in defaults");
            Config::default()
        }
    }
}

#[cfg(not(feature = "config-file"))]
fn load_config() -> Config {
    Config::default()
}

fn new_interpreter() -> Interpreter<MemoryHost> {
    Interpreter::new(MemoryHost::new(), load_config())
}

fn run_script(src: &str) -> ExitCode {
    let mut interp = new_interpreter();
    match interp.eval(src) {
        Ok(obj) => {
            let text = interp.host.get_string(&obj);
            if !text.is_empty() {
                println!("{}", text);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(%e, "script evaluation failed");
            eprintln!("tcl-core: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_repl() -> ExitCode {
    let mut interp = new_interpreter();
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("tcl-core: failed to start line editor: {}", e);
            return ExitCode::FAILURE;
        }
    };
    loop {
        match rl.readline("% ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                match interp.eval(&line) {
                    Ok(obj) => {
                        let text = interp.host.get_string(&obj);
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                    }
                    Err(e) => {
                        tracing::debug!(%e, "repl command failed");
                        eprintln!("{}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("tcl-core: readline error: {}", e);
                break;
            }
        }
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    init_logging();
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(|s| s.as_str()) {
        None => run_repl(),
        Some("--help" | "-h") => {
            print_help();
            ExitCode::SUCCESS
        }
        Some("--version" | "-v") => {
            println!("tcl-core {}", VERSION);
            ExitCode::SUCCESS
        }
        Some("-c") => match args.get(1) {
            Some(script) => run_script(script),
            None => {
                eprintln!("tcl-core: -c requires a script argument");
                ExitCode::FAILURE
            }
        },
        Some(path) => match fs::read_to_string(path) {
            Ok(src) => run_script(&src),
            Err(e) => {
                eprintln!("tcl-core: {}: {}", path, e);
                ExitCode::FAILURE
            }
        },
    }
}
