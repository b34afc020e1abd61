use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::context::ExecutionContext;
use crate::config::defs::{PipelineError, BWA_LOG_SUFFIX, COVERAGE_SUFFIX, INDEX_DIR, SAM_EXT};
use crate::utils::command::{bwa, samtools, CommandRunner};
use crate::utils::depth::{parse_depth_file, CoverageTable};
use crate::utils::file::{base_name, is_cached, link_file, sorted_bam_path};
use crate::utils::plotting::plot_coverages;


fn cache_hit(step: &str, path: &Path) -> bool {
    if is_cached(path) {
        info!("[cached] {}: reusing {}", step, path.display());
        return true;
    }
    false
}

/// Index reference gene with bwa index.
///
/// The reference is symlinked into `<work>/indexed_sequence/` first so the
/// index files land in the working directory rather than beside the input.
///
/// # Returns
/// Path of the linked reference, which is also the index prefix for bwa mem.
pub async fn index_reference<R: CommandRunner>(ctx: &ExecutionContext, runner: &R) -> Result<PathBuf, PipelineError> {
    let index_path = ctx.path(&[INDEX_DIR, base_name(ctx.reference_location()).as_str()])?;

    if !cache_hit("index", &index_path) {
        link_file(ctx.reference_location(), &index_path)?;
        runner.run(&bwa::index_args(&index_path)?).await?;
    }

    Ok(index_path)
}

/// Map reads against the indexed reference with bwa mem.
///
/// bwa mem has no option to write its output to a file, so stdout is captured
/// and written to `<work>/<sample>_<reference>.sam`.
pub async fn map_reads<R: CommandRunner>(
    ctx: &ExecutionContext,
    runner: &R,
    indexed_ref: &Path,
) -> Result<PathBuf, PipelineError> {
    let aln_base = format!("{}_{}", ctx.sample_name(), ctx.reference_name());
    let sam_file = ctx.path(&[format!("{}{}", aln_base, SAM_EXT)])?;

    if !cache_hit("align", &sam_file) {
        let result = runner.run(&bwa::mem_args(ctx, indexed_ref)?).await?;
        result.write_stdout(&sam_file)?;
        result.write_stderr(&ctx.path(&[format!("{}{}", aln_base, BWA_LOG_SUFFIX)])?)?;
        debug!("Wrote {} bytes of SAM to {}", result.stdout().len(), sam_file.display());
    }

    Ok(sam_file)
}

/// Sort the alignment on mapping position. Sorting also converts to BAM.
pub async fn sort_alignment<R: CommandRunner>(
    ctx: &ExecutionContext,
    runner: &R,
    sam_file: &Path,
) -> Result<PathBuf, PipelineError> {
    let sorted_file = sorted_bam_path(sam_file);

    if !cache_hit("sort", &sorted_file) {
        // samtools writes the BAM itself via -o
        runner.run(&samtools::sort_args(ctx, sam_file, &sorted_file)?).await?;
    }

    Ok(sorted_file)
}

/// Per-base read coverage over the whole reference (zero-depth positions
/// included). The depth file is cached; parsing it is not.
pub async fn calc_read_coverage<R: CommandRunner>(
    ctx: &ExecutionContext,
    runner: &R,
    aln_file: &Path,
) -> Result<CoverageTable, PipelineError> {
    let coverage_file = ctx.path(&[format!(
        "{}_{}{}",
        ctx.sample_name(),
        ctx.reference_name(),
        COVERAGE_SUFFIX
    )])?;

    if !cache_hit("coverage", &coverage_file) {
        let result = runner.run(&samtools::depth_args(ctx, aln_file)?).await?;
        result.write_stdout(&coverage_file)?;
    }

    let table = parse_depth_file(&coverage_file)?;
    for s in table.summary().into_iter().chain(std::iter::once(table.overall_summary())) {
        info!(
            "{}: {} positions, mean depth {:.2}, max depth {}, breadth {:.1}%",
            s.seq_name,
            s.positions,
            s.mean_depth,
            s.max_depth,
            s.breadth * 100.0
        );
    }
    Ok(table)
}

/// index -> align -> sort -> depth -> plot, strictly in that order.
/// The first failure ends the run; nothing is cleaned up.
pub async fn run<R: CommandRunner>(ctx: &ExecutionContext, runner: &R) -> Result<CoverageTable, PipelineError> {
    info!("Working directory: {}", ctx.directory().display());

    // step 1: index the reference sequence
    let index_path = index_reference(ctx, runner).await?;

    // step 2: map reads and sort the output on position
    let aln_file = map_reads(ctx, runner, &index_path).await?;
    let sorted_aln_file = sort_alignment(ctx, runner, &aln_file).await?;

    // step 3: read coverage on the reference
    let read_coverage = calc_read_coverage(ctx, runner, &sorted_aln_file).await?;

    // step 4: plot
    plot_coverages(ctx, &read_coverage)?;

    Ok(read_coverage)
}
