use crate::core::model::{Reader, RequestDescriptor};
use crate::core::parse::ParseMode;
use crate::plugins::http::driver::ClientConfig;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::time::Duration;

/// Adds the HTTP flags to the `get` subcommand and maps them onto the client config and the
/// request descriptor.
pub struct HttpCliPlugin;

impl HttpCliPlugin {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &'static str {
        "http"
    }

    pub fn augment_get_command(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new("http_header")
                .long("header")
                .help_heading("HTTP")
                .help("Extra HTTP header (repeatable), e.g. --header 'Accept: image/*'")
                .action(ArgAction::Append)
                .num_args(1),
        )
        .arg(
            Arg::new("http_user_agent")
                .long("user-agent")
                .help_heading("HTTP")
                .help("HTTP User-Agent")
                .num_args(1),
        )
        .arg(
            Arg::new("http_timeout_secs")
                .long("timeout-secs")
                .help_heading("HTTP")
                .help("Whole-request timeout in seconds (default: none)")
                .num_args(1),
        )
        .arg(
            Arg::new("http_byte_length")
                .long("byte-length")
                .help_heading("HTTP")
                .help("Expected body size in bytes; overrides the Content-Length header")
                .num_args(1),
        )
        .arg(
            Arg::new("http_parse_as")
                .long("parse-as")
                .help_heading("HTTP")
                .help("Body reader: json, text, bytes (blob) or form; default picks from Content-Type")
                .num_args(1),
        )
        .arg(
            Arg::new("http_require_length")
                .long("require-length")
                .help_heading("HTTP")
                .help("Fail instead of showing indeterminate progress when the size is unknown")
                .action(ArgAction::SetTrue),
        )
    }

    pub fn apply_client_matches(&self, matches: &ArgMatches, cfg: &mut ClientConfig) -> anyhow::Result<()> {
        if let Some(ua) = matches.get_one::<String>("http_user_agent") {
            cfg.user_agent = ua.clone();
        }
        Ok(())
    }

    pub fn apply_request_matches(&self, matches: &ArgMatches, req: &mut RequestDescriptor) -> anyhow::Result<()> {
        if let Some(s) = matches.get_one::<String>("http_timeout_secs") {
            req.options.timeout = Some(Duration::from_secs(s.parse()?));
        }
        if let Some(s) = matches.get_one::<String>("http_byte_length") {
            req.content_length = Some(s.parse()?);
        }
        if let Some(s) = matches.get_one::<String>("http_parse_as") {
            let mode = s.parse::<ParseMode>().map_err(anyhow::Error::msg)?;
            req.reader = Some(Reader::Builtin(mode));
        }
        req.options.require_content_length = matches.get_flag("http_require_length");

        if let Some(values) = matches.get_many::<String>("http_header") {
            for h in values {
                let (k, v) = h
                    .split_once(':')
                    .ok_or_else(|| anyhow::anyhow!("invalid header format: {}", h))?;
                req.options.headers.insert(k.trim().to_string(), v.trim().to_string());
            }
        }

        Ok(())
    }
}

impl Default for HttpCliPlugin {
    fn default() -> Self {
        Self::new()
    }
}
