use crate::application::builders::request_builder::RequestBuilder;
use crate::application::services::HttpRequestService;
use crate::error::{AppError, AppResult};
use crate::infrastructure::body_source::BodySource;
use crate::infrastructure::config::{ConfigOverrides, ConfigStore, DEFAULT_CONFIG_PATH};
use crate::infrastructure::output::render_json;
use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use colored::Colorize;
use std::ffi::OsString;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tracing::debug;

/// Long options that may also be spelled with a single dash.
const SINGLE_DASH_LONGS: &[&str] = &["apikey", "host", "config", "color", "output"];

/// CLI configuration for apicall
#[derive(Parser, Debug)]
#[command(name = "apicall", version)]
#[command(
    about = "Call a JSON API with a stored host and bearer token, pretty-printing the response",
    long_about = None
)]
pub struct Cli {
    /// Request path, appended to the configured host after a '/'
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,

    /// Key of the API; replaces the stored key
    #[arg(long = "apikey", value_name = "KEY", default_value = "", hide_default_value = true)]
    pub api_key: String,

    /// Host to call; replaces the stored host
    #[arg(long, value_name = "URL", default_value = "", hide_default_value = true)]
    pub host: String,

    /// HTTP method to call
    #[arg(short = 'X', long = "request", default_value = "GET")]
    pub method: String,

    /// Data to upload; prefix with '@' to read it from a file
    #[arg(short = 'd', long = "data", default_value = "", hide_default_value = true)]
    pub data: String,

    /// Print the response status and debug logs on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// When to colorize the rendered JSON
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Write the raw response body to a file instead of rendering it
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file holding the host and API key
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Configures `colored` globally and reports whether output is colorized.
    pub fn apply(self) -> bool {
        match self {
            ColorChoice::Always => colored::control::set_override(true),
            ColorChoice::Never => colored::control::set_override(false),
            ColorChoice::Auto if !std::io::stdout().is_terminal() => {
                colored::control::set_override(false)
            }
            ColorChoice::Auto => {}
        }
        colored::control::SHOULD_COLORIZE.should_colorize()
    }
}

/// Rewrites `-apikey`, `-host` and friends (optionally `=value`) to their
/// double-dash form so existing scripts keep working. Stops at `--`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut escaped = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || escaped {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                escaped = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') && is_single_dash_long(rest) => {
                    format!("-{}", text).into()
                }
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(flag: &str) -> bool {
    let name = flag.split_once('=').map_or(flag, |(name, _)| name);
    SINGLE_DASH_LONGS.contains(&name)
}

/// Prints `err` the way the operator should see it: invocation mistakes come
/// with the usage line, everything else as a single `ERROR:` line.
pub fn report_error(err: &AppError) {
    if err.shows_usage() {
        let _ = Cli::command()
            .error(ErrorKind::ValueValidation, err)
            .print();
    } else {
        let colorize = std::io::stderr().is_terminal()
            && colored::control::SHOULD_COLORIZE.should_colorize();
        eprintln!("{}", error_line(err, colorize));
    }
}

fn error_line(err: &AppError, colorize: bool) -> String {
    let line = format!("ERROR: {}", err);
    if colorize { line.red().to_string() } else { line }
}

impl Cli {
    pub fn request_path(&self) -> AppResult<&str> {
        match self.paths.as_slice() {
            [path] => Ok(path),
            others => Err(AppError::usage(format!(
                "expected exactly one request path, got {} args: {:?}",
                others.len(),
                others
            ))),
        }
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            host: self.host.clone(),
        }
    }

    pub async fn run<W: Write>(
        &self,
        store: &ConfigStore,
        request_service: &HttpRequestService,
        colorize: bool,
        out: &mut W,
    ) -> AppResult<()> {
        let path = self.request_path()?;

        let config = store.load_or_init(&self.overrides())?;
        config.ensure_complete()?;
        debug!(?config, path = %store.path().display(), "configuration ready");

        let body = BodySource::resolve(&self.data).await?;

        let request = RequestBuilder::new()
            .method(&self.method)?
            .url(&config.host, path)?
            .api_key(&config.api_key)?
            .body(body)
            .build()?;

        let response = request_service.send_request(request).await?;

        if self.verbose {
            eprintln!("{}", format!("Status: {}", response.status).cyan());
        }

        match &self.output {
            Some(file) => {
                std::fs::write(file, &response.body)
                    .with_context(|| format!("failed to write {}", file.display()))
                    .map_err(AppError::Output)?;
                if self.verbose {
                    eprintln!("Saved response to {}", file.display());
                }
            }
            None => {
                let rendered = render_json(&response.body, colorize)?;
                writeln!(out, "{}", rendered)
                    .context("failed to write to stdout")
                    .map_err(AppError::Output)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::MockHttpClient;
    use crate::domain::entities::{Method, Response};
    use crate::infrastructure::config::Config;
    use hyper::StatusCode;
    use hyper::body::Bytes;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("apicall")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::try_parse_from(normalize_args(argv)).unwrap()
    }

    fn service_returning(status: StatusCode, body: &'static str) -> HttpRequestService {
        let mut client = MockHttpClient::new();
        client.expect_send().times(1).returning(move |_| {
            Ok(Response {
                status,
                body: Bytes::from_static(body.as_bytes()),
            })
        });
        HttpRequestService::new(Box::new(client))
    }

    fn service_never_called() -> HttpRequestService {
        let mut client = MockHttpClient::new();
        client.expect_send().never();
        HttpRequestService::new(Box::new(client))
    }

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join(".config"))
    }

    #[test]
    fn single_dash_long_flags_are_accepted() {
        let cli = parse(&["-apikey", "K", "-host=https://h", "ping"]);
        assert_eq!(cli.api_key, "K");
        assert_eq!(cli.host, "https://h");
        assert_eq!(cli.paths, vec!["ping"]);
    }

    #[test]
    fn defaults_match_flag_table() {
        let cli = parse(&["ping"]);
        assert_eq!(cli.method, "GET");
        assert_eq!(cli.data, "");
        assert_eq!(cli.api_key, "");
        assert_eq!(cli.host, "");
        assert_eq!(cli.config, PathBuf::from(".config"));
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn curl_style_short_flags_parse() {
        let cli = parse(&["-X", "POST", "-d", "@body.json", "items"]);
        assert_eq!(cli.method, "POST");
        assert_eq!(cli.data, "@body.json");
    }

    #[test]
    fn help_flag_short_circuits() {
        let err = Cli::try_parse_from(["apicall", "-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn normalization_leaves_other_args_alone() {
        let argv = ["apicall", "-X", "-v", "--host", "h", "--", "-host"].map(OsString::from);
        let normalized = normalize_args(argv.clone());
        assert_eq!(normalized, argv.to_vec());
    }

    #[test]
    fn request_path_requires_exactly_one() {
        assert!(parse(&[]).request_path().is_err());
        let err = parse(&["extra", "args"]).request_path().unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
        assert!(err.to_string().contains("got 2 args"));
    }

    #[tokio::test]
    async fn first_run_bootstraps_config_and_renders() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut client = MockHttpClient::new();
        client
            .expect_send()
            .withf(|req| {
                req.url.as_str() == "https://h/ping"
                    && req.api_key.bearer() == "Bearer K"
                    && req.method == Method::Get
            })
            .times(1)
            .returning(|_| {
                Ok(Response {
                    status: StatusCode::OK,
                    body: Bytes::from_static(br#"{"ok":true}"#),
                })
            });
        let service = HttpRequestService::new(Box::new(client));
        let mut out = Vec::new();

        parse(&["-apikey", "K", "-host", "https://h", "ping"])
            .run(&store, &service, false, &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"ok\": true\n}\n");
        let saved: Config = serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(saved.host, "https://h");
        assert_eq!(saved.api_key, "K");
    }

    #[tokio::test]
    async fn missing_config_fails_before_network() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut out = Vec::new();

        let err = parse(&["ping"])
            .run(&store, &service_never_called(), false, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Usage(_)));
        assert!(!store.path().exists());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn wrong_arg_count_fails_before_touching_config() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut out = Vec::new();

        let err = parse(&["-apikey", "K", "-host", "https://h", "extra", "args"])
            .run(&store, &service_never_called(), false, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Usage(_)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn missing_body_file_is_reported_before_network() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut out = Vec::new();

        let err = parse(&["-apikey", "K", "-host", "https://h", "-d", "@nope.json", "items"])
            .run(&store, &service_never_called(), false, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Body { .. }));
    }

    #[tokio::test]
    async fn error_status_body_is_still_rendered() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let service = service_returning(StatusCode::NOT_FOUND, r#"{"error":"nf"}"#);
        let mut out = Vec::new();

        parse(&["-apikey", "K", "-host", "https://h", "missing"])
            .run(&store, &service, false, &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"error\": \"nf\"\n}\n"
        );
    }

    #[tokio::test]
    async fn non_json_response_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let service = service_returning(StatusCode::OK, "not json");
        let mut out = Vec::new();

        let err = parse(&["-apikey", "K", "-host", "https://h", "ping"])
            .run(&store, &service, false, &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Result not a JSON => not json"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn output_flag_saves_raw_body() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let target = dir.path().join("response.txt");
        let service = service_returning(StatusCode::OK, "plain text is fine here");
        let mut out = Vec::new();

        parse(&[
            "-apikey",
            "K",
            "-host",
            "https://h",
            "-o",
            target.to_str().unwrap(),
            "report",
        ])
        .run(&store, &service, false, &mut out)
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "plain text is fine here"
        );
        assert!(out.is_empty());
    }

    #[test]
    fn error_line_is_plain_when_stderr_is_not_colorized() {
        colored::control::set_override(true);
        let err = AppError::transport(anyhow::anyhow!("connection refused"));

        assert_eq!(error_line(&err, false), format!("ERROR: {}", err));
        assert!(!error_line(&err, false).contains('\x1b'));
    }
}
