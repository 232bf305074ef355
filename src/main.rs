use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use fortunas_infra::assets;
use fortunas_infra::config::StageConfig;
use fortunas_infra::constants;
use fortunas_infra::logging;
use fortunas_infra::stacks;

#[derive(Parser)]
#[command(name = "fortunas-infra")]
#[command(about = "Deployment template synthesizer for fortunasbet.com")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the deployment template for a stage
    Synth {
        /// Stage to synthesize (e.g. testing, production)
        #[arg(long)]
        stage: String,
        /// Directory the template artifact is written into
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },
    /// Print the asset upload passes; with a build dir, verify the partition
    Plan {
        /// Site build output to check against the passes
        #[arg(long)]
        build_dir: Option<PathBuf>,
    },
    /// Resolve, validate and print the configuration for a stage
    Config {
        /// Stage to resolve
        #[arg(long)]
        stage: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { stage, out_dir } => {
            println!("🏗️  Synthesizing stage '{}'...", stage);

            let config = StageConfig::load(&stage)?;
            let span = tracing::info_span!("synth", stage = %stage, domain = %config.domain_name);
            let _enter = span.enter();

            let template = stacks::synthesize(&config)?;
            let artifact = template.write(&out_dir, &stage)?;
            info!("synthesis finished");

            println!("\n📦 Synthesis results for {}:", stage);
            println!("   Domain: {}", config.domain_name);
            println!("   Resources: {}", template.logical_ids().len());
            println!("   Artifact: {}", artifact.display());
        }
        Commands::Plan { build_dir } => {
            println!("🗂  Asset upload passes:");
            for pass in assets::UPLOAD_PASSES {
                println!("\n   {} (Cache-Control: {})", pass.name, pass.cache_control);
                for include in pass.includes {
                    println!("      + {}", include);
                }
                for exclude in pass.excludes {
                    println!("      - {}", exclude);
                }
            }

            if let Some(dir) = build_dir {
                let report = assets::verify_partition(&dir)?;
                if report.is_partition() {
                    println!(
                        "\n✅ {} files, every one classified by exactly one pass",
                        report.files
                    );
                } else {
                    error!(
                        violations = report.violations.len(),
                        "upload passes do not partition the build output"
                    );
                    println!("\n❌ Files not cleanly classified:");
                    for (path, passes) in &report.violations {
                        println!("   - {} (matched by: {:?})", path, passes);
                    }
                    anyhow::bail!("upload passes do not partition {}", dir.display());
                }
            }
        }
        Commands::Config { stage } => {
            if !constants::is_known_stage(&stage) {
                println!(
                    "⚠️  Unknown stage '{}' (known: {})",
                    stage,
                    constants::supported_stages().join(", ")
                );
            }
            let config = StageConfig::load(&stage)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
