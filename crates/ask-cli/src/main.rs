mod cli;
mod runner;

use cli::{CliError, CliOptions};
use runner::{RunError, run};
use session_core::{ClientConfig, load_dotenv};
use tracing::error;

const DEFAULT_LOG_FILTER: &str = "ask=info,session_core=info";

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(2);
    }

    init_tracing();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load client config");
            std::process::exit(2);
        }
    };

    match run(&options, &config).await {
        Ok(summary) => {
            eprintln!(
                "answered={} failed={} discarded={}",
                summary.answered, summary.failed, summary.discarded
            );
            if summary.has_failures() {
                std::process::exit(1);
            }
        }
        Err(RunError::IngestFailed(message)) => {
            eprintln!("ingestion failed: {message}");
            std::process::exit(1);
        }
        Err(err) => {
            error!(error = %err, "ask run failed");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let json = std::env::var("ASK_LOG_FORMAT")
        .map(|format| format.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.init();
    }
}

fn print_usage() {
    eprintln!(
        "Usage:\n\
         \x20 ask video --url URL [--question Q]...\n\
         \x20 ask document (--pdf PATH | --txt PATH | --file PATH | --text TEXT) [--question Q]... [--transcript-out PATH]\n\
         \n\
         Without --question, questions are read from stdin, one per line.\n\
         \n\
         Environment:\n\
         - ASK_API_BASE_URL      Backend base url (default http://127.0.0.1:8000)\n\
         - ASK_HTTP_TIMEOUT_MS   Request timeout in ms, 0 disables (default 0)\n\
         - ASK_STALE_RESPONSES   discard|apply late answers (default discard)\n\
         - ASK_LOG_FORMAT        Set to json for JSON logs\n\
         \n\
         Exit codes: 0 ok, 1 ingestion or answer failure, 2 usage or setup error"
    );
}
