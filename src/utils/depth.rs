/// Parsing of `samtools depth` output.
///
/// samtools depth output is tab delimited and has 3 columns:
/// 1. Name of reference sequence
/// 2. Position in reference, 1-based
/// 3. Read coverage at position
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::defs::PipelineError;


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRow {
    pub seq_name: String,
    pub position: u64,
    pub coverage: u32,
}

/// Rows in file order. samtools emits positions contiguous and ascending per
/// sequence; that is not re-checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTable {
    rows: Vec<CoverageRow>,
}

impl CoverageTable {
    pub fn rows(&self) -> &[CoverageRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sequence names in order of first appearance.
    pub fn seq_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.seq_name.as_str()) {
                names.push(&row.seq_name);
            }
        }
        names
    }

    /// (position, coverage) points of one sequence.
    pub fn series<'a>(&'a self, seq_name: &'a str) -> impl Iterator<Item = (u64, u32)> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.seq_name == seq_name)
            .map(|r| (r.position, r.coverage))
    }

    pub fn max_position(&self) -> u64 {
        self.rows.iter().map(|r| r.position).max().unwrap_or(0)
    }

    pub fn max_coverage(&self) -> u32 {
        self.rows.iter().map(|r| r.coverage).max().unwrap_or(0)
    }

    pub fn summary(&self) -> Vec<CoverageSummary> {
        self.seq_names()
            .into_iter()
            .map(|name| CoverageSummary::from_depths(name, self.series(name).map(|(_, d)| d)))
            .collect()
    }

    /// Summary over every row of every sequence.
    pub fn overall_summary(&self) -> CoverageSummary {
        CoverageSummary::from_depths("all", self.rows.iter().map(|r| r.coverage))
    }
}

impl FromIterator<CoverageRow> for CoverageTable {
    fn from_iter<I: IntoIterator<Item = CoverageRow>>(iter: I) -> Self {
        CoverageTable { rows: iter.into_iter().collect() }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSummary {
    pub seq_name: String,
    pub positions: u64,
    pub mean_depth: f64,
    pub max_depth: u32,
    /// Fraction of positions with depth > 0
    pub breadth: f64,
}

impl CoverageSummary {
    fn from_depths<I: Iterator<Item = u32>>(seq_name: &str, depths: I) -> Self {
        let (mut positions, mut total, mut covered, mut max_depth) = (0u64, 0u64, 0u64, 0u32);
        for d in depths {
            positions += 1;
            total += d as u64;
            if d > 0 {
                covered += 1;
            }
            max_depth = max_depth.max(d);
        }
        let (mean_depth, breadth) = if positions == 0 {
            (0.0, 0.0)
        } else {
            (total as f64 / positions as f64, covered as f64 / positions as f64)
        };
        CoverageSummary {
            seq_name: seq_name.to_string(),
            positions,
            mean_depth,
            max_depth,
            breadth,
        }
    }
}


fn parse_line(line: &str, line_no: usize) -> Result<CoverageRow, PipelineError> {
    let bad = |message: String| PipelineError::InvalidDepthFormat { line: line_no, message };

    let mut fields = line.split('\t');
    let (seq_name, position, coverage) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(n), Some(p), Some(c), None) => (n, p, c),
        _ => return Err(bad(format!("expected 3 tab-separated columns, got '{}'", line))),
    };

    let position = position
        .trim()
        .parse::<u64>()
        .map_err(|e| bad(format!("position '{}': {}", position, e)))?;
    let coverage = coverage
        .trim()
        .parse::<u32>()
        .map_err(|e| bad(format!("coverage '{}': {}", coverage, e)))?;

    Ok(CoverageRow {
        seq_name: seq_name.to_string(),
        position,
        coverage,
    })
}

/// Parses depth records from any buffered reader. Blank lines are skipped.
pub fn parse_depth<R: BufRead>(reader: R) -> Result<CoverageTable, PipelineError> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Err(e) => Some(Err(PipelineError::from(e))),
            Ok(line) => {
                let line = line.trim_end_matches('\r');
                if line.is_empty() {
                    None
                } else {
                    Some(parse_line(line, i + 1))
                }
            }
        })
        .collect()
}

pub fn parse_depth_file(path: &Path) -> Result<CoverageTable, PipelineError> {
    let file = File::open(path)?;
    parse_depth(BufReader::new(file))
}
