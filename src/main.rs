//! Armistice text driver.
//!
//! Reads `<session> <player> <command>` lines from stdin and writes one JSON
//! object per event to stdout. Logging goes to stderr; set `RUST_LOG` to
//! see it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::Serialize;

use armistice::config::{Config, CONFIG_ENV};
use armistice::engine::Engine;
use armistice::game::Event;
use armistice::protocol::{parse_line, Line};

#[derive(Serialize)]
struct Envelope<'a> {
    session: &'a str,
    #[serde(flatten)]
    event: &'a Event,
}

#[derive(Serialize)]
struct Failure<'a> {
    session: Option<&'a str>,
    error: String,
}

fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from))
}

fn emit<W: Write>(out: &mut W, value: &impl Serialize) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match config_path() {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };
    let mut engine = match Engine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("reading stdin: {e}");
                break;
            }
        };

        let written = match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(Line::Quit)) => break,
            Ok(Some(Line::Request(req))) => match engine.handle(&req.session, &req.player, req.command) {
                Ok(events) => events.iter().try_for_each(|event| {
                    emit(
                        &mut out,
                        &Envelope {
                            session: &req.session,
                            event,
                        },
                    )
                }),
                Err(e) => emit(
                    &mut out,
                    &Failure {
                        session: Some(&req.session),
                        error: e.to_string(),
                    },
                ),
            },
            Err(e) => emit(
                &mut out,
                &Failure {
                    session: None,
                    error: e.to_string(),
                },
            ),
        };
        if let Err(e) = written {
            log::error!("stdout: {e}");
            break;
        }
    }
}
