use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use progress_fetch::core::engine::Engine;
use progress_fetch::core::events::FetchEvent;
use progress_fetch::core::model::RequestDescriptor;
use progress_fetch::core::parse::ParsedBody;
use progress_fetch::core::session::FetchSession;
use progress_fetch::i18n::{get_messages, Locale, Messages};
use progress_fetch::logging;
use progress_fetch::plugins::http::cli::HttpCliPlugin;
use progress_fetch::plugins::http::driver::{ClientConfig, HttpDriver};
use progress_fetch::plugins::http::resolver::suggest_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

fn build_cli(http: &HttpCliPlugin) -> Command {
    let get = Command::new("get")
        .about("Fetch one URL, showing byte progress; Ctrl-C aborts")
        .arg(
            Arg::new("url")
                .help("URL to fetch")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("out_dir")
                .long("out-dir")
                .help("Directory for binary bodies")
                .default_value(".")
                .num_args(1),
        );

    let get = http.augment_get_command(get);

    Command::new("progress-fetch")
        .about("Single HTTP retrieval with progress and cancellation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("locale")
                .long("locale")
                .help("Message language (en, zh)")
                .default_value("en")
                .global(true)
                .num_args(1),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log warnings and errors")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(get)
}

enum End {
    Done,
    Aborted,
    Failed(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let http = HttpCliPlugin::new();
    let matches = build_cli(&http).get_matches();

    let locale = matches
        .get_one::<String>("locale")
        .map(|s| Locale::parse(s))
        .unwrap_or_default();
    logging::init_logging(matches.get_flag("quiet"));

    match matches.subcommand() {
        Some(("get", m)) => run_get(&http, m, get_messages(locale)).await,
        _ => Ok(()),
    }
}

async fn run_get(http: &HttpCliPlugin, m: &ArgMatches, msgs: &'static Messages) -> anyhow::Result<()> {
    let raw = m.get_one::<String>("url").context("missing url")?;
    let out_dir: PathBuf = m
        .get_one::<String>("out_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut req = RequestDescriptor::parse(raw).with_context(|| format!("invalid url: {}", raw))?;
    http.apply_request_matches(m, &mut req)?;
    let mut cfg = ClientConfig::default();
    http.apply_client_matches(m, &mut cfg)?;

    tracing::debug!(plugin = http.name(), user_agent = %cfg.user_agent, "client configured");
    let driver = HttpDriver::new(cfg).context("build http client")?;
    let session = FetchSession::new(Engine::new(Arc::new(driver)));

    let url = req.url.clone();
    let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
    let id = session.start(req, Arc::new(tx));
    eprintln!("{}: {} ({})", msgs.started, url, msgs.abort_hint);

    let sty_spin = ProgressStyle::with_template("{spinner:.green} {wide_msg}")?.tick_chars("|/-\\ ");
    let sty_bar = ProgressStyle::with_template(
        "{bar:40.cyan/blue} {percent:>3}% {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
    )?;
    let pb = ProgressBar::new_spinner();
    pb.set_style(sty_spin);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let mut abort_requested = false;
    let end = loop {
        tokio::select! {
            ev = rx.recv() => {
                let Some(ev) = ev else {
                    break End::Failed("event channel closed".to_string());
                };
                if ev.id() != id {
                    continue;
                }
                match ev {
                    FetchEvent::Progress { progress, .. } => match progress.total {
                        Some(t) => {
                            if pb.length() != Some(t) {
                                pb.set_style(sty_bar.clone());
                                pb.set_length(t);
                            }
                            pb.set_position(progress.loaded.min(t));
                        }
                        None => pb.set_message(format!("{} / {}", fmt_bytes(progress.loaded), msgs.total_unknown)),
                    },
                    FetchEvent::Finished { .. } => break End::Done,
                    FetchEvent::Aborted { .. } => break End::Aborted,
                    FetchEvent::Failed { message, .. } => break End::Failed(message),
                }
            }
            _ = tokio::signal::ctrl_c(), if !abort_requested => {
                abort_requested = true;
                session.abort();
            }
        }
    };

    match end {
        End::Done => {
            pb.finish_and_clear();
            let body = session.data().context("download finished without a result")?;
            eprintln!("{}: {}", msgs.finished, url);
            write_body(body, &out_dir, &url, msgs).await
        }
        End::Aborted => {
            pb.abandon();
            eprintln!("{}", msgs.aborted);
            std::process::exit(130);
        }
        End::Failed(message) => {
            pb.abandon();
            anyhow::bail!("{}: {}", msgs.failed, message)
        }
    }
}

async fn write_body(body: ParsedBody, out_dir: &Path, url: &url::Url, msgs: &Messages) -> anyhow::Result<()> {
    match body {
        ParsedBody::Bytes(bytes) => {
            tokio::fs::create_dir_all(out_dir)
                .await
                .with_context(|| format!("create out_dir {}", out_dir.display()))?;
            let path = suggest_path(out_dir, url);
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("{} {} ({})", msgs.saved_to, path.display(), fmt_bytes(bytes.len() as u64));
        }
        ParsedBody::Text(text) => print!("{}", text),
        ParsedBody::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        ParsedBody::Form(pairs) if pairs.is_empty() => println!("{}", msgs.form_empty),
        ParsedBody::Form(pairs) => {
            for (k, v) in pairs {
                println!("{} = {}", k, v);
            }
        }
    }
    Ok(())
}

fn fmt_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.2}GiB", f / GB)
    } else if f >= MB {
        format!("{:.2}MiB", f / MB)
    } else if f >= KB {
        format!("{:.2}KiB", f / KB)
    } else {
        format!("{}B", n)
    }
}
