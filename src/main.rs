use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::CommandFactory;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};

use readcov_pipeline::cli::{self, Arguments};
use readcov_pipeline::config::defs::{PipelineError, BWA_TAG, SAMTOOLS_TAG};
use readcov_pipeline::pipelines::read_coverage;
use readcov_pipeline::utils::command::{check_versions, LocalRunner};
use readcov_pipeline::utils::system::{check_thread_request, detect_cores_and_load};


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = cli::parse();

    let log_level = if args.quiet {
        LevelFilter::Error
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let ctx = match cli::build_context(&args) {
        Ok(ctx) => ctx,
        Err(PipelineError::Usage(msg)) => {
            Arguments::command().error(ErrorKind::MissingRequiredArgument, msg).exit()
        }
        Err(e) => return Err(e).context("Error processing command line arguments"),
    };

    let (physical_cores, cpu_load) = detect_cores_and_load().await;
    check_thread_request(ctx.threads(), physical_cores, cpu_load);

    let runner = LocalRunner;

    if args.skip_tool_check {
        debug!("Skipping tool check");
    } else if let Err(e) = check_versions(&runner, &[BWA_TAG, SAMTOOLS_TAG]).await {
        error!("Tool check failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = read_coverage::run(&ctx, &runner).await {
        error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    info!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}
