use std::ffi::OsStr;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use blisp::config::DEFAULT_MAX_CALL_DEPTH;
use blisp::{tokenize, Config, Error, Evaluator};
use chrono::{DateTime, Local};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

const EXTENSION: &str = "blisp";
const PROMPT: &str = "> ";
const LOG_ENV: &str = "BLISP_LOG";

fn cli() -> Command<'static> {
    Command::new("blisp")
        .about("Runs a blisp script, or starts a REPL when no script is given")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Script to run; the .blisp extension may be left off")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("benchmark")
                .short('b')
                .long("benchmark")
                .help("Print how long reading, tokenizing and evaluating took")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum depth of nested function calls")
                .takes_value(true)
                .value_parser(value_parser!(usize)),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report(err: impl Display) {
    eprintln!("{} {}", "error:".red().bold(), err);
}

/// Appends the script extension when the path lacks it.
fn script_path(path: &Path) -> PathBuf {
    if path.extension() == Some(OsStr::new(EXTENSION)) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}

fn millis(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    (to - from).num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0
}

fn run_file(path: &Path, config: Config, benchmark: bool) -> blisp::Result<()> {
    let path = script_path(path);
    info!(path = %path.display(), "running script");

    let started = Local::now();
    let source = fs::read_to_string(&path).map_err(|e| Error::io(path.clone(), e))?;
    let read = Local::now();
    let tokens = tokenize(&source)?;
    let tokenized = Local::now();

    let mut evaluator = Evaluator::with_config(config);
    let result = evaluator.eval_program(&tokens);
    let evaluated = Local::now();

    if benchmark {
        println!("{} {:.3} ms", "read:".cyan(), millis(started, read));
        println!("{} {:.3} ms", "tokenize:".cyan(), millis(read, tokenized));
        println!("{} {:.3} ms", "evaluate:".cyan(), millis(tokenized, evaluated));
    }

    result.map(|_| ())
}

fn repl(config: Config) -> i32 {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            report(err);
            return 1;
        }
    };
    let mut evaluator = Evaluator::with_config(config);

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());

                match evaluator.run(&line) {
                    Ok(values) => {
                        for value in values {
                            println!("{}", value.literal());
                        }
                    }
                    Err(Error::Exit(code)) => return code,
                    Err(err) => report(err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!(" | Closing...");
                return 0;
            }
            Err(ReadlineError::Eof) => return 0,
            Err(err) => {
                report(err);
                return 1;
            }
        }
    }
}

fn config_from(matches: &ArgMatches) -> Config {
    let max_depth = matches
        .get_one::<usize>("max-depth")
        .copied()
        .unwrap_or(DEFAULT_MAX_CALL_DEPTH);
    Config::default().with_max_call_depth(max_depth)
}

fn main() {
    init_tracing();

    let matches = cli().get_matches();
    let config = config_from(&matches);
    let benchmark = matches.get_one::<bool>("benchmark").copied().unwrap_or(false);

    let code = match matches.get_one::<PathBuf>("file") {
        Some(path) => match run_file(path, config, benchmark) {
            Ok(()) => 0,
            Err(Error::Exit(code)) => code,
            Err(err) => {
                report(&err);
                err.exit_code()
            }
        },
        None => repl(config),
    };

    process::exit(code);
}
