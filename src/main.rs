//! cloudrun-manifest CLI
//!
//! Entry point for the `cloudrun-manifest` command-line tool.

use clap::{ArgAction, Parser, Subcommand};
use cloudrun_manifest::config::AppHostingConfig;
use cloudrun_manifest::{
    resolve_resource_kind, Pipeline, PipelineConfig, PipelineError, RenderOptions, ResourceKind,
    ValidationReport,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudrun-manifest")]
#[command(about = "Render Cloud Run manifests from layered apphosting configs", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge, validate and render a manifest
    Render {
        /// Environment config (overlay)
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Base config merged underneath the overlay
        #[arg(long, short = 'b')]
        base: Option<PathBuf>,

        /// Name written to metadata.name
        #[arg(long)]
        service_name: String,

        /// Target region
        #[arg(long)]
        region: String,

        /// Container image reference
        #[arg(long)]
        image: String,

        /// Resource type (service, job, worker)
        #[arg(long, short = 't', default_value = "service")]
        resource_type: String,

        /// Request timeout in seconds (service and worker)
        #[arg(long, default_value_t = 300)]
        timeout: i64,

        /// Manifest output path
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Print the render outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the merged config without rendering
    Validate {
        /// Environment config (overlay)
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Base config merged underneath the overlay
        #[arg(long, short = 'b')]
        base: Option<PathBuf>,

        /// Resource type (service, job, worker)
        #[arg(long, short = 't', default_value = "service")]
        resource_type: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print or write the merged config
    Merge {
        /// Environment config (overlay)
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Base config merged underneath the overlay
        #[arg(long, short = 'b')]
        base: Option<PathBuf>,

        /// Write to this path instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render {
            config,
            base,
            service_name,
            region,
            image,
            resource_type,
            timeout,
            output,
            json,
        } => {
            let options = RenderOptions {
                service_name,
                region,
                image,
                resource_type,
                timeout_seconds: timeout,
                output_path: output,
            };
            run_render(pipeline(config, base), &options, json);
        }
        Commands::Validate {
            config,
            base,
            resource_type,
            json,
        } => {
            run_validate(pipeline(config, base), &resource_type, json);
        }
        Commands::Merge {
            config,
            base,
            output,
        } => {
            run_merge(pipeline(config, base), output);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn pipeline(config_path: PathBuf, base_path: Option<PathBuf>) -> Pipeline {
    Pipeline::new(PipelineConfig {
        config_path,
        base_path,
    })
}

fn fail(err: PipelineError) -> ! {
    eprintln!("Error: {}", err);
    process::exit(err.exit_code());
}

fn run_render(pipeline: Pipeline, options: &RenderOptions, json_output: bool) {
    let outcome = match pipeline.run(options) {
        Ok(outcome) => outcome,
        Err(PipelineError::Validation(report)) => {
            eprintln!("{}", report.to_human());
            process::exit(3);
        }
        Err(e) => fail(e),
    };

    if json_output {
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!(
            "Wrote {} manifest: {} (sha256 {})",
            outcome.kind,
            outcome.output_path.display(),
            outcome.digest
        );
    }
}

fn run_validate(pipeline: Pipeline, resource_type: &str, json_output: bool) {
    let kind = match resolve_resource_kind(resource_type) {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(4);
        }
    };

    let merged = pipeline.merged().unwrap_or_else(|e| fail(e));
    let report = ValidationReport::check(&merged.document, kind);

    if json_output {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("{}", report.to_human());
        if report.is_valid() {
            match AppHostingConfig::from_document(&merged.document) {
                Ok(config) => print_summary(&config, kind),
                Err(e) => fail(e.into()),
            }
        }
    }

    if !report.is_valid() {
        process::exit(3);
    }
}

fn print_summary(config: &AppHostingConfig, kind: ResourceKind) {
    let run = &config.run_config;
    println!();
    println!("  cpu: {}", run.cpu_or_default());
    println!("  memoryMiB: {}", run.memory_mib_or_default());
    match kind {
        ResourceKind::Service | ResourceKind::Worker => {
            println!("  minInstances: {}", run.min_instances_or_default());
            println!("  maxInstances: {}", run.max_instances_or_default());
            if kind == ResourceKind::Service {
                println!("  concurrency: {}", run.concurrency_or_default());
            }
        }
        ResourceKind::Job => {
            println!("  taskCount: {}", run.task_count_or_default());
        }
    }
    if !config.env.is_empty() {
        println!("  env: {} entries", config.env.len());
    }
    if let Some(ref account) = config.service_account {
        println!("  serviceAccount: {}", account);
    }
}

fn run_merge(pipeline: Pipeline, output: Option<PathBuf>) {
    match output {
        Some(path) => match pipeline.write_merged(&path) {
            Ok(_) => println!("Wrote merged config: {}", path.display()),
            Err(e) => fail(e),
        },
        None => {
            let merged = pipeline.merged().unwrap_or_else(|e| fail(e));
            match merged.to_yaml() {
                Ok(yaml) => print!("{}", yaml),
                Err(e) => fail(e.into()),
            }
        }
    }
}
