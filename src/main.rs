use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use kagami::config::Config;
use kagami::error::KagamiError;
use kagami::metrics::Metrics;
use kagami::page::{PageLoader, SidecarPageLoader};
use kagami::pipeline::PagePipeline;
use kagami::render::RendererRegistry;
use kagami::router::{RouteTable, Router};

/// Kagami - file-system page router with an incremental page cache
#[derive(Parser, Debug)]
#[command(name = "kagami")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the pages directory and print the route table
    Routes,
    /// Print the route matching a URL as JSON
    Match { url: String },
    /// Scan in build mode and fail on pages that cannot be generated statically
    Check,
    /// Render a URL through the page cache and print the response
    Render {
        url: String,
        /// Number of times to request the URL
        #[arg(short = 'n', long, default_value_t = 1)]
        repeat: u32,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = kagami::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args.command, config).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config, KagamiError> {
    let config = match path {
        Some(path) => Config::from_file(path).map_err(KagamiError::Config)?,
        None => Config::default(),
    };
    config.validate().map_err(KagamiError::Config)?;
    Ok(config)
}

async fn run(command: Command, mut config: Config) -> Result<(), KagamiError> {
    let loader: Arc<dyn PageLoader> = Arc::new(SidecarPageLoader::new());

    match command {
        Command::Routes => {
            let builder = config.routes.builder(loader);
            let table = builder.build().await?;
            print_table(&table);
            println!("{} routes in {}", table.len(), builder.pages_dir().display());
        }
        Command::Match { url } => {
            let router = Router::new(config.routes.builder(loader)).await?;
            match router.match_url(&url) {
                Some(matched) => {
                    let json = serde_json::to_string_pretty(&matched)
                        .map_err(|e| KagamiError::Config(format!("failed to encode match: {}", e)))?;
                    println!("{}", json);
                }
                None => println!("no match"),
            }
        }
        Command::Check => {
            config.routes.build_mode = true;
            let table = config.routes.builder(loader).build().await?;
            println!("ok: {} routes", table.len());
        }
        Command::Render { url, repeat } => {
            let metrics = Arc::new(Metrics::new());
            let router = Router::new(config.routes.builder(loader.clone()))
                .await?
                .with_metrics(metrics.clone());
            let cache = config.cache.build_service().with_metrics(metrics.clone());
            let pipeline = PagePipeline::new(
                Arc::new(router),
                loader,
                Arc::new(RendererRegistry::with_defaults()),
                cache,
                config.cache.default_strategy.clone(),
            )
            .with_metrics(metrics.clone());

            for _ in 0..repeat.max(1) {
                match pipeline.handle(&url).await? {
                    Some(response) => {
                        println!("HTTP {}", response.status);
                        for (name, value) in &response.headers {
                            println!("{}: {}", name, value);
                        }
                        println!();
                        println!("{}", response.body);
                    }
                    None => println!("HTTP 404"),
                }
            }
            pipeline.cache().settle_all().await;
            tracing::debug!(metrics = %metrics.export_prometheus(), "Render finished");
        }
    }

    Ok(())
}

fn print_table(table: &RouteTable) {
    for descriptor in table.descriptors() {
        let marker = if descriptor.is_pre_resolved() { "*" } else { " " };
        println!(
            "{:<10}{} {:<40} {}",
            descriptor.kind.as_str(),
            marker,
            descriptor.pathname,
            descriptor.file_path.display()
        );
    }
}
