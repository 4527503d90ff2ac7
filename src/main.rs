use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudlayer::config::Config;
use cloudlayer::error::format_cloud_error;
use cloudlayer::resource::{get_all_resource_keys, get_resource, Attributes};
use cloudlayer::transport::http::HttpTransport;
use cloudlayer::{CloudClient, CloudError, CreateRequest, Filter, Resource};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Normalized resource lifecycle CLI for OpenStack-style clouds
#[derive(Parser, Debug)]
#[command(name = "cloudlayer", version, about, long_about = None)]
struct Args {
    /// Cloud profile from clouds.yaml
    #[arg(short, long)]
    cloud: Option<String>,

    /// Path to clouds.yaml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Endpoint interface (public, internal, admin)
    #[arg(short, long)]
    interface: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the known resource types
    Types,
    /// List resources of one or more types
    List {
        /// Resource types (`networks` or `network`)
        #[arg(required = true)]
        resource: Vec<String>,
        /// Exact-match filter, KEY=VALUE or KEY:=JSON (single type only)
        #[arg(short, long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, Value)>,
    },
    /// Show one resource by name or id
    Get { resource: String, name_or_id: String },
    /// Create a resource
    Create {
        resource: String,
        name: String,
        /// Owning project
        #[arg(long)]
        project_id: Option<String>,
        /// Create as external (networks)
        #[arg(long)]
        external: bool,
        /// Create administratively down
        #[arg(long)]
        disabled: bool,
        /// Provider option, KEY=VALUE or KEY:=JSON
        #[arg(long = "provider", value_parser = parse_key_value)]
        provider: Vec<(String, Value)>,
        /// Extra attribute, KEY=VALUE or KEY:=JSON
        #[arg(short, long = "attr", value_parser = parse_key_value)]
        attrs: Vec<(String, Value)>,
    },
    /// Update attributes of a resource
    Update {
        resource: String,
        name_or_id: String,
        /// Attribute to set, KEY=VALUE or KEY:=JSON
        #[arg(short, long = "attr", value_parser = parse_key_value, required = true)]
        attrs: Vec<(String, Value)>,
    },
    /// Delete a resource by name or id; absent resources are not an error
    Delete { resource: String, name_or_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Parse KEY=VALUE as a string, or KEY:=JSON for typed values
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE or KEY:=JSON, got '{}'", s))?;

    let (key, value) = match key.strip_suffix(':') {
        Some(key) => (
            key,
            serde_json::from_str(value)
                .map_err(|e| format!("invalid JSON value in '{}': {}", s, e))?,
        ),
        None => (key, Value::String(value.to_string())),
    };
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value))
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudlayer started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudlayer").join("cloudlayer.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudlayer").join("cloudlayer.log");
    }
    PathBuf::from("cloudlayer.log")
}

fn render<T: Serialize>(format: OutputFormat, value: &T) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

fn print_output<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    println!("{}", render(format, value)?.trim_end());
    Ok(())
}

fn build_client(args: &Args) -> Result<CloudClient> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let profile = config.profile(args.cloud.as_deref())?;
    let transport = HttpTransport::from_profile(&profile).context("Failed to set up transport")?;

    let interface = args.interface.clone().unwrap_or_else(|| profile.interface.clone());
    Ok(CloudClient::new(Arc::new(transport)).with_interface(&interface))
}

async fn run(args: &Args) -> Result<()> {
    if let Command::Types = args.command {
        let types: Vec<_> = get_all_resource_keys()
            .into_iter()
            .filter_map(get_resource)
            .map(|def| {
                serde_json::json!({
                    "type": def.plural,
                    "display_name": def.display_name,
                    "service": def.service,
                })
            })
            .collect();
        return print_output(args.output, &types);
    }

    let client = build_client(args)?;

    match &args.command {
        Command::Types => Ok(()),
        Command::List { resource, filters } => {
            if resource.len() == 1 {
                let filter: Filter = filters.iter().cloned().collect();
                let filter = (!filter.is_empty()).then_some(filter);
                let items = client.resource(&resource[0])?.list(filter.as_ref()).await?;
                print_output(args.output, &items)
            } else {
                if !filters.is_empty() {
                    anyhow::bail!("--filter applies to a single resource type");
                }
                let names: Vec<&str> = resource.iter().map(String::as_str).collect();
                let listed: BTreeMap<String, Vec<Resource>> =
                    client.list_many(&names).await?.into_iter().collect();
                print_output(args.output, &listed)
            }
        }
        Command::Get {
            resource,
            name_or_id,
        } => match client.resource(resource)?.get(name_or_id, None).await? {
            Some(found) => print_output(args.output, &found),
            None => Err(CloudError::not_found(format!("{} {} not found", resource, name_or_id)).into()),
        },
        Command::Create {
            resource,
            name,
            project_id,
            external,
            disabled,
            provider,
            attrs,
        } => {
            let mut request = CreateRequest::new(name).external(*external);
            if *disabled {
                request = request.admin_state_up(false);
            }
            if let Some(project_id) = project_id {
                request = request.project_id(project_id);
            }
            if !provider.is_empty() {
                request = request.provider(Value::Object(provider.iter().cloned().collect()));
            }
            request.extra = attrs.iter().cloned().collect();

            let created = client.resource(resource)?.create(request).await?;
            print_output(args.output, &created)
        }
        Command::Update {
            resource,
            name_or_id,
            attrs,
        } => {
            let attributes: Attributes = attrs.iter().cloned().collect();
            let updated = client.resource(resource)?.update(name_or_id, attributes).await?;
            print_output(args.output, &updated)
        }
        Command::Delete {
            resource,
            name_or_id,
        } => {
            let deleted = client.resource(resource)?.delete(name_or_id).await?;
            print_output(
                args.output,
                &serde_json::json!({ "name_or_id": name_or_id, "deleted": deleted }),
            )
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(&args).await {
        match err.downcast_ref::<CloudError>() {
            Some(cloud_err) => {
                tracing::error!("{}", cloud_err);
                eprintln!("Error: {}", format_cloud_error(cloud_err));
            }
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
}
