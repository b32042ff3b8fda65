//! `alerthist` command-line tool.
//!
//! ```text
//! alerthist dump   <file> [--pretty]
//! alerthist stats  <file>
//! alerthist check  <file>
//! alerthist record <file> --alert gid:sid:rev:ts [--alert ...] [--batch alerts.json]
//! ```
//!
//! Every command accepts `--config <toml>` (the history file may then be
//! omitted), `--byte-order little|big|native`; `record` also takes
//! `--legacy-order`.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use alerthist::{
    ByteOrder, HistoryConfig, HistoryError, HistoryService, HistoryStore, InsertionPolicy,
    ParseAlertError, RawAlert,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Exit code for command-line usage errors.
pub const EXIT_USAGE: i32 = 2;

/// Install a stderr subscriber filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dump,
    Stats,
    Check,
    Record,
}

#[derive(Debug)]
struct Options {
    command: Command,
    history_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    byte_order: Option<ByteOrder>,
    legacy_order: bool,
    pretty: bool,
    alerts: Vec<RawAlert>,
    batch_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct BucketView<'a> {
    gid: i32,
    sid: i32,
    rev: i32,
    total_count: u32,
    timestamps: &'a [i64],
}

#[derive(Serialize)]
struct DumpView<'a> {
    signatures: usize,
    occurrences: u64,
    buckets: Vec<BucketView<'a>>,
}

/// Run the tool and return the process exit code.
pub fn run_cli<I>(os_args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = OsString>,
{
    let raw: Vec<String> = os_args
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let tail: &[String] = raw.get(1..).unwrap_or_default();

    if tail.is_empty() || tail.iter().any(|a| a == "-h" || a == "--help") {
        let _ = write_help(out);
        return 0;
    }

    let options = match parse_args(tail) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            return EXIT_USAGE;
        }
    };

    match run(&options, out, err) {
        Ok(code) => code,
        Err(error) => report_error(&error, err),
    }
}

fn parse_args(tail: &[String]) -> Result<Options, String> {
    let command = match tail[0].as_str() {
        "dump" => Command::Dump,
        "stats" => Command::Stats,
        "check" => Command::Check,
        "record" => Command::Record,
        other => return Err(format!("unknown command `{other}`")),
    };
    let mut options = Options {
        command,
        history_file: None,
        config_file: None,
        byte_order: None,
        legacy_order: false,
        pretty: false,
        alerts: Vec::new(),
        batch_file: None,
    };

    let mut i = 1;
    while i < tail.len() {
        match tail[i].as_str() {
            "--config" => {
                options.config_file = Some(PathBuf::from(take_value(tail, &mut i, "--config")?));
            }
            "--byte-order" => {
                let text = take_value(tail, &mut i, "--byte-order")?;
                options.byte_order = Some(parse_byte_order(text)?);
            }
            "--alert" if command == Command::Record => {
                let text = take_value(tail, &mut i, "--alert")?;
                let alert = text
                    .parse::<RawAlert>()
                    .map_err(|e: ParseAlertError| e.to_string())?;
                options.alerts.push(alert);
            }
            "--batch" if command == Command::Record => {
                options.batch_file = Some(PathBuf::from(take_value(tail, &mut i, "--batch")?));
            }
            "--legacy-order" if command == Command::Record => options.legacy_order = true,
            "--pretty" if command == Command::Dump => options.pretty = true,
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option `{flag}`"));
            }
            path => {
                if options.history_file.is_some() {
                    return Err(format!("unexpected argument `{path}`"));
                }
                options.history_file = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    if options.history_file.is_none() && options.config_file.is_none() {
        return Err("a history file or --config is required".to_owned());
    }
    if command == Command::Record && options.alerts.is_empty() && options.batch_file.is_none() {
        return Err("record needs at least one --alert or a --batch file".to_owned());
    }
    Ok(options)
}

fn take_value<'a>(tail: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    tail.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires an argument"))
}

fn parse_byte_order(text: &str) -> Result<ByteOrder, String> {
    match text {
        "little" => Ok(ByteOrder::Little),
        "big" => Ok(ByteOrder::Big),
        "native" => Ok(ByteOrder::Native),
        other => Err(format!(
            "invalid byte order `{other}` (expected little, big or native)"
        )),
    }
}

fn resolve_config(options: &Options) -> alerthist::Result<HistoryConfig> {
    let mut config = match &options.config_file {
        Some(path) => HistoryConfig::from_toml_file(path)?,
        None => HistoryConfig::default(),
    };
    if let Some(path) = &options.history_file {
        config.history_file.clone_from(path);
    }
    if let Some(order) = options.byte_order {
        config.byte_order = order;
    }
    if options.legacy_order {
        config.insertion = InsertionPolicy::Legacy;
    }
    debug!(?config, "resolved history configuration");
    Ok(config)
}

fn run(options: &Options, out: &mut dyn Write, err: &mut dyn Write) -> alerthist::Result<i32> {
    let config = resolve_config(options)?;
    if options.command == Command::Check && !config.history_file.exists() {
        let _ = writeln!(
            err,
            "error: no history file at '{}'",
            config.history_file.display()
        );
        return Ok(1);
    }

    let mut service = HistoryService::new(config);
    match options.command {
        Command::Dump => {
            service.ensure_loaded()?;
            write_dump(service.store(), options.pretty, out)?;
        }
        Command::Stats => {
            service.ensure_loaded()?;
            write_stats(service.store(), out)?;
        }
        Command::Check => {
            service.ensure_loaded()?;
            let store = service.store();
            writeln!(
                out,
                "ok: {} signatures, {} occurrences",
                store.len(),
                store.total_occurrences()
            )?;
        }
        Command::Record => {
            let mut batch = options.alerts.clone();
            if let Some(path) = &options.batch_file {
                batch.extend(read_batch(path)?);
            }
            let summary = service.record_alerts(&batch)?;
            writeln!(
                out,
                "recorded {} alerts ({} new signatures, {} total)",
                summary.merged,
                summary.new_buckets,
                service.store().len()
            )?;
        }
    }
    Ok(0)
}

fn read_batch(path: &Path) -> alerthist::Result<Vec<RawAlert>> {
    let text = fs::read_to_string(path).map_err(|source| HistoryError::CannotRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| {
        HistoryError::invalid_config(format!("alert batch '{}': {e}", path.display()))
    })
}

fn write_dump(store: &HistoryStore, pretty: bool, out: &mut dyn Write) -> alerthist::Result<()> {
    let view = DumpView {
        signatures: store.len(),
        occurrences: store.total_occurrences(),
        buckets: store
            .buckets()
            .iter()
            .map(|bucket| {
                let key = bucket.key();
                BucketView {
                    gid: key.generator_id,
                    sid: key.signature_id,
                    rev: key.revision,
                    total_count: bucket.total_count(),
                    timestamps: bucket.timestamps(),
                }
            })
            .collect(),
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&view)
    } else {
        serde_json::to_string(&view)
    }
    .map_err(io::Error::other)?;
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn write_stats(store: &HistoryStore, out: &mut dyn Write) -> io::Result<()> {
    let all = store.buckets().iter().flat_map(|bucket| bucket.timestamps());
    let earliest = all.clone().min();
    let latest = all.max();
    writeln!(out, "signatures:  {}", store.len())?;
    writeln!(out, "occurrences: {}", store.total_occurrences())?;
    if let (Some(earliest), Some(latest)) = (earliest, latest) {
        writeln!(out, "earliest:    {earliest}")?;
        writeln!(out, "latest:      {latest}")?;
    }
    if let Some(busiest) = store.buckets().iter().max_by_key(|bucket| bucket.total_count()) {
        writeln!(
            out,
            "busiest:     {} ({} occurrences)",
            busiest.key(),
            busiest.total_count()
        )?;
    }
    Ok(())
}

fn report_error(error: &HistoryError, err: &mut dyn Write) -> i32 {
    let _ = writeln!(err, "error: {error}");
    if let Some(hint) = error.suggestion() {
        let _ = writeln!(err, "hint: {hint}");
    }
    error.exit_code()
}

fn write_help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "\
alerthist: inspect and update alert history files

USAGE:
    alerthist <COMMAND> [FILE] [OPTIONS]

COMMANDS:
    dump      Print every signature bucket as JSON
    stats     Print signature and occurrence totals
    check     Decode the file and report whether it is well formed
    record    Merge alerts into the file and rewrite it

OPTIONS:
    --config <FILE>        TOML configuration (history_file, byte_order, insertion)
    --byte-order <ORDER>   little (default), big or native
    --pretty               Pretty-print JSON (dump)
    --alert <G:S:R:TS>     Alert to record; repeatable (record)
    --batch <FILE>         JSON array of {{gid, sid, rev, timestamp}} (record)
    --legacy-order         Never insert before a bucket's first occurrence (record)
    -h, --help             Show this help

ENVIRONMENT:
    RUST_LOG               Log filter (default: warn)"
    )
}
