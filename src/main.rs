//! Courier - command-line front end
//!
//! A thin presentation layer: parses arguments, builds drafts, and prints
//! what the workbench returns. All state lives in the library.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

use courier::constants::LOG_FILE_NAME;
use courier::{
    parse_curl, Config, EnvironmentSelection, Execution, NewRequest, RequestDraft, Workbench,
};

#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Compose, send and inspect HTTP requests", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.courier/config.yaml)
    #[arg(short, long, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a request
    Send {
        method: String,
        url: String,
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        output: SendArgs,
    },
    /// Show recent history, newest first
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Send a past request again
    Rerun {
        id: i64,
        #[command(flatten)]
        output: SendArgs,
    },
    /// Parse a cURL command and send it
    Curl {
        command: String,
        /// Print the parsed request instead of sending it
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        output: SendArgs,
    },
    /// Manage environments
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },
    /// Manage templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Manage collections and their saved requests
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
}

#[derive(Args, Debug, Default)]
struct RequestArgs {
    /// Header as "Name: value", repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
    /// Headers as a JSON object; merged under -H values
    #[arg(long)]
    headers_json: Option<String>,
    /// Request body
    #[arg(short, long)]
    data: Option<String>,
    /// Query parameter as "key=value", repeatable
    #[arg(short, long = "query")]
    query: Vec<String>,
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Environment used for {{NAME}} substitution
    #[arg(short, long)]
    env: Option<String>,
    /// Timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,
    /// Print response headers
    #[arg(short, long)]
    include: bool,
}

#[derive(Subcommand, Debug)]
enum EnvAction {
    List,
    Create {
        name: String,
        #[arg(default_value = "{}")]
        variables: String,
    },
    /// Replace an environment's variables
    Set { id: i64, variables: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
    Export,
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    List,
    Save {
        name: String,
        method: String,
        url: String,
        #[command(flatten)]
        request: RequestArgs,
    },
    Send {
        id: i64,
        #[command(flatten)]
        output: SendArgs,
    },
    Delete { id: i64 },
    Export,
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum CollectionAction {
    List,
    Create { name: String },
    Delete { id: i64 },
    AddRequest {
        collection_id: i64,
        name: String,
        method: String,
        url: String,
        #[command(flatten)]
        request: RequestArgs,
    },
    RemoveRequest { id: i64 },
    Send {
        request_id: i64,
        #[command(flatten)]
        output: SendArgs,
    },
}

impl RequestArgs {
    fn header_text(&self) -> Result<String> {
        let mut headers = match &self.headers_json {
            Some(json) => match serde_json::from_str::<Value>(json)
                .context("--headers-json is not valid JSON")?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("--headers-json must be a JSON object"),
            },
            None => Map::new(),
        };
        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("invalid header, expected \"Name: value\": {}", header))?;
            headers.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
        }
        if headers.is_empty() {
            Ok(String::new())
        } else {
            Ok(serde_json::to_string_pretty(&Value::Object(headers))?)
        }
    }

    fn draft(&self, method: &str, url: &str) -> Result<RequestDraft> {
        let mut draft = RequestDraft::new(method, url).with_headers(self.header_text()?);
        if let Some(body) = &self.data {
            draft = draft.with_body(body.clone());
        }
        for pair in &self.query {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("invalid query, expected key=value: {}", pair))?;
            draft = draft.with_param(key, value);
        }
        Ok(draft)
    }

    fn new_request(&self, name: &str, method: &str, url: &str) -> Result<NewRequest> {
        Ok(self.draft(method, url)?.to_new_request(name))
    }
}

impl SendArgs {
    fn selection(&self) -> EnvironmentSelection {
        EnvironmentSelection::from(self.env.as_deref())
    }

    fn apply(&self, mut draft: RequestDraft) -> RequestDraft {
        if let Some(timeout) = self.timeout {
            draft.timeout_seconds = Some(timeout);
        }
        draft
    }
}

/// Initialize logging to file; the guard must outlive the program
fn init_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("create log dir {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(guard)
}

fn print_execution(execution: &Execution, include_headers: bool) {
    let response = &execution.response;
    println!(
        "{} {}  ->  {}  ({:.2}s)",
        execution.request.method,
        execution.request.url,
        response.status_line(),
        response.elapsed_seconds()
    );
    if include_headers {
        println!("{}", response.headers_pretty());
    }
    println!();
    println!("{}", execution.formatted_body);
}

async fn send(workbench: &Workbench, draft: RequestDraft, args: &SendArgs) -> Result<()> {
    let draft = args.apply(draft);
    let execution = workbench.execute_request(&draft, &args.selection()).await?;
    print_execution(&execution, args.include);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let _guard = init_logging(&config)?;

    let workbench = Workbench::from_config(&config)?;

    match cli.command {
        Command::Send {
            method,
            url,
            request,
            output,
        } => {
            send(&workbench, request.draft(&method, &url)?, &output).await?;
        }
        Command::History { limit } => {
            let entries = match limit {
                Some(limit) => workbench.with_store(move |s| s.get_history(limit)).await?,
                None => workbench.recent_history().await?,
            };
            for entry in entries {
                let code = entry
                    .response_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>5}  {}  {:<7} {}  {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.method,
                    code,
                    entry.url
                );
            }
        }
        Command::Rerun { id, output } => {
            let execution = workbench.rerun_history(id, &output.selection()).await?;
            print_execution(&execution, output.include);
        }
        Command::Curl {
            command,
            dry_run,
            output,
        } => {
            let draft = parse_curl(&command)?;
            if dry_run {
                println!("{} {}", draft.method, draft.url);
                if !draft.headers.is_empty() {
                    println!("{}", draft.headers);
                }
                if let Some(body) = &draft.body {
                    println!("{}", body);
                }
            } else {
                send(&workbench, draft, &output).await?;
            }
        }
        Command::Env { action } => match action {
            EnvAction::List => {
                for env in workbench.with_store(|s| s.list_environments()).await? {
                    println!("{:>5}  {}  {}", env.id, env.name, env.variables_json);
                }
            }
            EnvAction::Create { name, variables } => {
                let id = workbench
                    .with_store(move |s| s.create_environment(&name, &variables))
                    .await?;
                println!("Created environment {}", id);
            }
            EnvAction::Set { id, variables } => {
                workbench
                    .with_store(move |s| s.update_environment(id, &variables))
                    .await?;
                println!("Updated environment {}", id);
            }
            EnvAction::Rename { id, name } => {
                workbench
                    .with_store(move |s| s.rename_environment(id, &name))
                    .await?;
                println!("Renamed environment {}", id);
            }
            EnvAction::Delete { id } => {
                workbench.with_store(move |s| s.delete_environment(id)).await?;
                println!("Deleted environment {}", id);
            }
            EnvAction::Export => {
                println!("{}", workbench.with_store(|s| s.export_environments()).await?)
            }
            EnvAction::Import { file } => {
                let json = fs::read_to_string(&file)
                    .with_context(|| format!("read {}", file.display()))?;
                let count = workbench
                    .with_store(move |s| s.import_environments(&json))
                    .await?;
                println!("Imported {} environments", count);
            }
        },
        Command::Template { action } => match action {
            TemplateAction::List => {
                for t in workbench.with_store(|s| s.list_templates()).await? {
                    println!("{:>5}  {:<24} {:<7} {}", t.id, t.name, t.method, t.url);
                }
            }
            TemplateAction::Save {
                name,
                method,
                url,
                request,
            } => {
                let new_request = request.new_request(&name, &method, &url)?;
                let id = workbench
                    .with_store(move |s| s.save_template(&new_request))
                    .await?;
                println!("Saved template {}", id);
            }
            TemplateAction::Send { id, output } => {
                let template = workbench
                    .with_store(move |s| s.get_template(id))
                    .await?
                    .with_context(|| format!("template {} not found", id))?;
                send(&workbench, RequestDraft::from(&template), &output).await?;
            }
            TemplateAction::Delete { id } => {
                workbench.with_store(move |s| s.delete_template(id)).await?;
                println!("Deleted template {}", id);
            }
            TemplateAction::Export => {
                println!("{}", workbench.with_store(|s| s.export_templates()).await?)
            }
            TemplateAction::Import { file } => {
                let json = fs::read_to_string(&file)
                    .with_context(|| format!("read {}", file.display()))?;
                let count = workbench
                    .with_store(move |s| s.import_templates(&json))
                    .await?;
                println!("Imported {} templates", count);
            }
        },
        Command::Collection { action } => match action {
            CollectionAction::List => {
                for collection in workbench.with_store(|s| s.list_collections()).await? {
                    println!("{:>5}  {}", collection.id, collection.name);
                    for r in &collection.requests {
                        println!("       {:>5}  {:<24} {:<7} {}", r.id, r.name, r.method, r.url);
                    }
                }
            }
            CollectionAction::Create { name } => {
                let id = workbench
                    .with_store(move |s| s.create_collection(&name))
                    .await?;
                println!("Created collection {}", id);
            }
            CollectionAction::Delete { id } => {
                let removed = workbench.with_store(move |s| s.delete_collection(id)).await?;
                println!("Deleted collection {} and {} saved requests", id, removed);
            }
            CollectionAction::AddRequest {
                collection_id,
                name,
                method,
                url,
                request,
            } => {
                let new_request = request.new_request(&name, &method, &url)?;
                let id = workbench
                    .with_store(move |s| s.save_request(collection_id, &new_request))
                    .await?;
                println!("Saved request {} in collection {}", id, collection_id);
            }
            CollectionAction::RemoveRequest { id } => {
                workbench.with_store(move |s| s.delete_saved_request(id)).await?;
                println!("Removed saved request {}", id);
            }
            CollectionAction::Send { request_id, output } => {
                let saved = workbench
                    .with_store(move |s| s.get_saved_request(request_id))
                    .await?
                    .with_context(|| format!("saved request {} not found", request_id))?;
                send(&workbench, RequestDraft::from(&saved), &output).await?;
            }
        },
    }

    Ok(())
}
