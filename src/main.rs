use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use http::Method;
use kobetsu_client::config::{config_schema, load_config};
use kobetsu_client::utils::logger::init_logging;
use kobetsu_client::{
    create_store, ApiRequest, AuthenticatedHttpClient, ClientError, LoginRequest, ResponseBody,
    TracingNavigator,
};
use tracing::error;

#[derive(Parser)]
#[command(name = "kobetsu-client", version, about = "Talk to the dispatch-management backend")]
struct Cli {
    /// Path to the YAML configuration.
    #[arg(long, default_value = "./config.yaml")]
    config: PathBuf,

    /// Print the JSON schema of the configuration and exit.
    #[arg(long)]
    schema: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one request, e.g. `request GET /kobetsu --query page=1`.
    Request {
        method: String,
        path: String,
        #[arg(long = "query", value_parser = parse_query_pair)]
        query: Vec<(String, String)>,
        /// JSON request body.
        #[arg(long)]
        body: Option<String>,
        /// Treat the response as binary and write it out raw.
        #[arg(long)]
        blob: bool,
        /// Write the response here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Sign in and store the issued tokens.
    Login { username: String, password: String },
    /// End the session and forget the stored tokens.
    Logout,
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.schema {
        return match config_schema() {
            Ok(schema) => {
                println!("{}", schema);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error rendering schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(command) = cli.command else {
        eprintln!("Nothing to do; see --help");
        return ExitCode::FAILURE;
    };

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let store = match create_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create token store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match AuthenticatedHttpClient::new(&config.client, store, Arc::new(TracingNavigator)) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &AuthenticatedHttpClient, command: Command) -> Result<(), String> {
    match command {
        Command::Request {
            method,
            path,
            query,
            body,
            blob,
            output,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|e| format!("Invalid method: {}", e))?;
            let mut request = ApiRequest::new(method, path);
            request.query = query;
            if let Some(body) = body {
                let value = serde_json::from_str(&body)
                    .map_err(|e| format!("Invalid --body JSON: {}", e))?;
                request = request.json(value);
            }
            if blob {
                request = request.blob();
            }

            let bytes = match client.send(request).await.map_err(describe)? {
                ResponseBody::Json(value) => serde_json::to_vec_pretty(&value)
                    .map_err(|e| format!("Failed to render response: {}", e))?,
                ResponseBody::Blob(bytes) => bytes,
            };
            write_output(output, &bytes)
        }
        Command::Login { username, password } => {
            client
                .login(&LoginRequest::new(username, password))
                .await
                .map_err(describe)?;
            println!("Signed in.");
            Ok(())
        }
        Command::Logout => {
            client.logout().await.map_err(describe)?;
            println!("Signed out.");
            Ok(())
        }
    }
}

fn describe(e: ClientError) -> String {
    if e.is_session_expired() {
        "Session expired; run `kobetsu-client login` again".to_string()
    } else {
        e.to_string()
    }
}

fn write_output(output: Option<PathBuf>, bytes: &[u8]) -> Result<(), String> {
    let result = match output {
        Some(path) => std::fs::write(path, bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).and_then(|_| stdout.write_all(b"\n"))
        }
    };
    result.map_err(|e| format!("Failed to write output: {}", e))
}
