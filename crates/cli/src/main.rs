//! Pixi Kernel - Main Entry Point
//! Launches Jupyter kernels inside Pixi environments, or a fallback kernel explaining why not

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pixi_kernel_api_http::{HttpServer, HttpServerConfig};
use pixi_kernel_core::application::launch::find_connection_file;
use pixi_kernel_core::application::shell_env::default_environment_name;
use pixi_kernel_core::application::{
    EnvironmentCatalog, KernelProvisioner, LaunchDecision, PixiClient, ProvisionRequest,
    ReadinessRequest, ReadinessVerifier,
};
use pixi_kernel_core::domain::{EnvMap, KernelSpec};
use pixi_kernel_core::port::id_provider::UuidProvider;
use pixi_kernel_core::port::time_provider::SystemTimeProvider;
use pixi_kernel_fallback::{shutdown_channel, ConnectionInfo, FallbackHandler, FallbackKernel};
use pixi_kernel_infra_system::{LaunchMode, SubprocessExecutor, SystemBinaryProbe};

const DEFAULT_LOG_FILTER: &str = "pixi_kernel=info";
const DEFAULT_LANGUAGE: &str = "python";
const DEFAULT_REQUIRED_PACKAGE: &str = "ipykernel";
const CHECK_KERNEL_NAME: &str = "Pixi";

#[derive(Parser)]
#[command(name = "pixi-kernel")]
#[command(about = "Jupyter kernels in Pixi environments", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log format: pretty or json
    #[arg(long, global = true, env = "PIXI_KERNEL_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the environment and start the kernel (used from kernel.json)
    Launch {
        /// Kernel resource directory holding kernel.json
        #[arg(long)]
        resource_dir: PathBuf,

        /// Connection file for the fallback kernel (default: first .json argument)
        #[arg(long)]
        connection_file: Option<PathBuf>,

        /// Keep this process alive and forward signals instead of replacing it
        #[arg(long)]
        managed: bool,

        /// Guest kernel command line (default: argv of kernel.json)
        #[arg(last = true)]
        argv: Vec<String>,
    },

    /// Serve the fallback kernel with a fixed message
    Fallback {
        #[arg(short = 'f', long)]
        connection_file: PathBuf,

        /// Message shown on every execution
        #[arg(short, long)]
        message: String,

        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        language: String,
    },

    /// Check that an environment is ready to host a kernel
    Check {
        /// Environment name (default: PIXI_KERNEL_DEFAULT_ENVIRONMENT or "default")
        #[arg(short, long)]
        environment: Option<String>,

        #[arg(short, long, default_value = DEFAULT_REQUIRED_PACKAGE)]
        required_package: String,

        /// Project directory (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// List the environments of a project
    Envs {
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Run the HTTP management API until Ctrl+C
    Serve,
}

#[derive(Tabled)]
struct EnvRow {
    name: String,
    default: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_format);

    let env: EnvMap = std::env::vars().collect();
    let client = pixi_client();

    match cli.command {
        Commands::Launch {
            resource_dir,
            connection_file,
            managed,
            argv,
        } => {
            let mode = if managed {
                LaunchMode::Managed
            } else {
                LaunchMode::default()
            };
            let code = run_launch(client, env, &resource_dir, connection_file, mode, argv).await?;
            std::process::exit(code);
        }

        Commands::Fallback {
            connection_file,
            message,
            language,
        } => serve_fallback(&connection_file, &message, &language).await?,

        Commands::Check {
            environment,
            required_package,
            cwd,
        } => {
            let environment_name = environment.unwrap_or_else(|| default_environment_name(&env));
            let verifier = ReadinessVerifier::new(client);
            let request = ReadinessRequest {
                environment_name,
                cwd: working_dir(cwd)?,
                env,
                required_package,
                kernel_name: CHECK_KERNEL_NAME.to_string(),
            };

            match verifier.verify(request).await {
                Ok(environment) => {
                    println!("{}", "✓ Environment is ready".green().bold());
                    println!();
                    println!("  {} {}", "Name:".bold(), environment.name);
                    println!("  {} {}", "Prefix:".bold(), environment.prefix.display());
                }
                Err(e) => {
                    println!("{}", "✗ Environment is not ready".red().bold());
                    println!();
                    println!("{}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Envs { cwd } => {
            let catalog = EnvironmentCatalog::new(client);
            let rows: Vec<EnvRow> = catalog
                .list(&working_dir(cwd)?, &env)
                .await
                .into_iter()
                .map(|entry| EnvRow {
                    name: entry.name,
                    default: if entry.default { "✓".to_string() } else { String::new() },
                })
                .collect();

            println!("{}", Table::new(rows));
        }

        Commands::Serve => {
            let config = HttpServerConfig::from_env(&env);
            let server = HttpServer::new(config, client, env);

            info!("Press Ctrl+C to shutdown");
            server
                .serve(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Shutdown signal received. Exiting gracefully...");
                })
                .await
                .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e))?;
        }
    }

    Ok(())
}

/// Initialize logging on stderr; stdout belongs to the kernel
fn init_logging(format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Wire the system adapters into a Pixi client
fn pixi_client() -> Arc<PixiClient> {
    Arc::new(PixiClient::new(
        Arc::new(SystemBinaryProbe::new()),
        Arc::new(SubprocessExecutor::new()),
    ))
}

fn working_dir(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Cannot read the current directory"),
    }
}

/// Start the guest kernel, or the fallback kernel when provisioning fails
///
/// Returns the guest's exit code.
async fn run_launch(
    client: Arc<PixiClient>,
    env: EnvMap,
    resource_dir: &Path,
    connection_file: Option<PathBuf>,
    mode: LaunchMode,
    argv: Vec<String>,
) -> Result<i32> {
    let spec = KernelSpec::from_resource_dir(resource_dir)
        .with_context(|| format!("Invalid kernel resource directory {}", resource_dir.display()))?;
    let language = spec
        .language
        .clone()
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let guest_argv = if argv.is_empty() { spec.argv.clone() } else { argv };

    let provisioner = KernelProvisioner::new(client);
    let decision = provisioner
        .prepare(ProvisionRequest {
            spec,
            argv: guest_argv.clone(),
            cwd: working_dir(None)?,
            env,
        })
        .await;

    match decision {
        LaunchDecision::Kernel(plan) => Ok(pixi_kernel_infra_system::launch(&plan, mode).await?),
        LaunchDecision::Fallback { message } => {
            let connection_file = connection_file
                .or_else(|| find_connection_file(&guest_argv))
                .context("Connection file not found in the kernel command line")?;
            serve_fallback(&connection_file, &message, &language).await?;
            Ok(0)
        }
    }
}

async fn serve_fallback(connection_file: &Path, message: &str, language: &str) -> Result<()> {
    let conn = ConnectionInfo::from_file(connection_file)?;
    let handler = FallbackHandler::new(
        message,
        language,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    );

    let (shutdown_tx, _shutdown_rx) = shutdown_channel();
    let shutdown_tx = Arc::new(shutdown_tx);
    let kernel = FallbackKernel::bind(&conn, handler, shutdown_tx.clone()).await?;

    let on_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            on_signal.shutdown();
        }
    });

    info!(connection_file = %connection_file.display(), "Serving fallback kernel");
    kernel.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_launch_with_guest_argv() {
        let cli = Cli::try_parse_from([
            "pixi-kernel",
            "launch",
            "--resource-dir",
            "/kernels/python-pixi",
            "--",
            "pixi",
            "run",
            "python",
            "-m",
            "ipykernel_launcher",
            "-f",
            "/tmp/kernel-1.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Launch {
                resource_dir,
                connection_file,
                managed,
                argv,
            } => {
                assert_eq!(resource_dir, PathBuf::from("/kernels/python-pixi"));
                assert!(connection_file.is_none());
                assert!(!managed);
                assert_eq!(argv.len(), 7);
                assert_eq!(argv[0], "pixi");
                assert_eq!(argv[6], "/tmp/kernel-1.json");
            }
            _ => panic!("expected launch"),
        }
    }

    #[test]
    fn test_parse_check_defaults() {
        let cli = Cli::try_parse_from(["pixi-kernel", "check"]).unwrap();

        match cli.command {
            Commands::Check {
                environment,
                required_package,
                cwd,
            } => {
                assert!(environment.is_none());
                assert_eq!(required_package, DEFAULT_REQUIRED_PACKAGE);
                assert!(cwd.is_none());
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_fallback_requires_message() {
        assert!(
            Cli::try_parse_from(["pixi-kernel", "fallback", "-f", "/tmp/kernel.json"]).is_err()
        );
    }

    #[tokio::test]
    async fn test_launch_rejects_missing_resource_dir() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_launch(
            pixi_client(),
            EnvMap::new(),
            &dir.path().join("missing"),
            None,
            LaunchMode::default(),
            Vec::new(),
        )
        .await;

        assert!(result.is_err());
    }
}
