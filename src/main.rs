//!
//! lendportal CLI binary
//! ---------------------
//! One-shot commands or an interactive shell against the equipment-lending
//! portal API. The session persists between runs in the configured session file.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use lendportal::cli::{Shell, HELP};
use lendportal::config::PortalConfig;
use lendportal::portal::Portal;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [flags] <command> [args...]   run one command\n  {program} [flags] --repl                  start the interactive shell\n\nFlags:\n  --api <url>             Backend API base URL (default: $LENDPORTAL_API_URL or http://localhost:8080/api)\n  --session-file <path>   Where the session is kept; 'memory' keeps it for this process only\n  --json                  Print results as JSON instead of tables\n  --repl                  Start interactive mode\n  -h, --help              Show this help\n\n{HELP}"
    );
}

fn main() -> Result<()> {
    // Logs go to stderr so table/JSON output on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "lendportal".to_string() } else { args.remove(0) };

    let mut config = PortalConfig::from_env().context("loading LENDPORTAL_* configuration")?;
    let mut repl = false;
    let mut command: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a URL"); print_usage(&program); std::process::exit(2); }
                config.api_base_url = args[i + 1].clone();
                i += 2; continue;
            }
            "--session-file" => {
                if i + 1 >= args.len() { eprintln!("--session-file requires a path"); print_usage(&program); std::process::exit(2); }
                let p = args[i + 1].trim();
                config.session_file = if p.is_empty() || p.eq_ignore_ascii_case("memory") { None } else { Some(PathBuf::from(p)) };
                i += 2; continue;
            }
            "--json" => { config.json_output = true; i += 1; continue; }
            "--repl" => { repl = true; i += 1; continue; }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            _ => {
                // everything from the first non-flag on is the command
                command.extend(args[i..].iter().cloned());
                break;
            }
        }
    }

    info!(
        target: "lendportal",
        "lendportal starting: RUST_LOG='{}', api='{}', session_file={:?}",
        env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string()),
        config.api_base_url,
        config.session_file
    );

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().context("starting async runtime")?;
    let portal = Portal::bootstrap(config).context("bootstrapping portal")?;
    let shell = Shell::new(portal);

    if !command.is_empty() && !repl {
        let out = rt.block_on(shell.run_args(&command));
        let failed = out.starts_with("error: ");
        if failed { eprintln!("{out}"); } else if !out.is_empty() { println!("{out}"); }
        if failed { std::process::exit(1); }
        return Ok(());
    }

    run_repl(rt, shell)
}

fn run_repl(rt: tokio::runtime::Runtime, shell: Shell) -> Result<()> {
    let mut editor = DefaultEditor::new().context("initializing line editor")?;
    println!("lendportal shell. Type 'help' for commands.");
    loop {
        let prompt = match shell.portal().session().get_role() {
            Ok(Some(role)) => format!("{role} {}> ", shell.portal().navigator().current()),
            _ => "> ".to_string(),
        };
        let line = match editor.readline(&prompt) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        };
        let line = line.trim();
        if line.is_empty() { continue; }
        let _ = editor.add_history_entry(line);
        let up = line.to_ascii_uppercase();
        if up == "EXIT" || up == "QUIT" { break; }
        let out = rt.block_on(shell.run_line(line));
        if !out.is_empty() { println!("{out}"); }
    }
    Ok(())
}
