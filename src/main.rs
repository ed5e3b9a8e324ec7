mod application;
mod domain;
mod error;
mod infrastructure;
mod logging;
mod presentation;

use crate::infrastructure::config::ConfigStore;
use crate::infrastructure::http_client::{ClientLimits, HyperHttpClient};
use crate::presentation::cli::{Cli, normalize_args, report_error};
use clap::Parser;

/// apicall: curl for one JSON API
///
/// Remembers the API host and bearer token in a `.config` file in the
/// working directory, sends one request per invocation to `<host>/<path>`,
/// and pretty-prints the JSON that comes back.
#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    if let Err(err) = logging::init_logging(cli.verbose) {
        eprintln!("{}", err);
    }
    let colorize = cli.color.apply();

    let result = match HyperHttpClient::new(ClientLimits::default()) {
        Ok(http_client) => {
            let request_service = http_client.create_request_service();
            let store = ConfigStore::new(&cli.config);
            cli.run(&store, &request_service, colorize, &mut std::io::stdout())
                .await
        }
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        report_error(&err);
        std::process::exit(err.exit_code());
    }
}
