use std::fmt::Display;
use std::path::Path;

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::context::ExecutionContext;
use crate::config::defs::{PipelineError, PLOT_SIZE, PNG_EXT, SVG_EXT};
use crate::utils::depth::CoverageTable;
use crate::utils::file::ensure_parent_dir;


fn plot_err<E: Display>(e: E) -> PipelineError {
    PipelineError::Plot(e.to_string())
}

/// Plot read coverage for the run described by `ctx` into `ctx.output()`.
pub fn plot_coverages(ctx: &ExecutionContext, coverage: &CoverageTable) -> Result<(), PipelineError> {
    let title = format!(
        "Read coverage on {} in {}",
        ctx.reference_name(),
        ctx.sample_name()
    );
    plot_depths(coverage, &title, ctx.output())?;
    info!("Coverage plot written to {}", ctx.output().display());
    Ok(())
}

/// Line plot of coverage against position, one line per reference sequence.
/// The backend follows the file extension of `output_path` (png or svg).
pub fn plot_depths(coverage: &CoverageTable, title: &str, output_path: &Path) -> Result<(), PipelineError> {
    if coverage.is_empty() {
        return Err(PipelineError::EmptyCoverage);
    }

    let ext = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some(PNG_EXT) => {
            ensure_parent_dir(output_path)?;
            let root = BitMapBackend::new(output_path, PLOT_SIZE).into_drawing_area();
            draw_chart(&root, coverage, title)
        }
        Some(SVG_EXT) => {
            ensure_parent_dir(output_path)?;
            let root = SVGBackend::new(output_path, PLOT_SIZE).into_drawing_area();
            draw_chart(&root, coverage, title)
        }
        _ => Err(PipelineError::UnsupportedFormat(output_path.display().to_string())),
    }
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    coverage: &CoverageTable,
    title: &str,
) -> Result<(), PipelineError> {
    root.fill(&WHITE).map_err(plot_err)?;

    let max_pos = coverage.max_position().max(2);
    let max_depth = coverage.max_coverage().max(1);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1u64..max_pos, 0u32..max_depth + 1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("position")
        .y_desc("coverage")
        .draw()
        .map_err(plot_err)?;

    for (idx, name) in coverage.seq_names().into_iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(coverage.series(name), color.stroke_width(1)))
            .map_err(plot_err)?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
