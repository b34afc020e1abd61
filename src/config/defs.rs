use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

// External software
pub const BWA_TAG: &str = "bwa";
pub const SAMTOOLS_TAG: &str = "samtools";

lazy_static! {
    /// Minimum (major, minor) versions; samtools needs `depth --reference`.
    pub static ref TOOL_VERSIONS: HashMap<&'static str, (u32, u32)> = {
        let mut m = HashMap::new();
        m.insert(SAMTOOLS_TAG, (1, 10));
        m.insert(BWA_TAG, (0, 7));

        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BwaSubcommand {
    Index,
    Mem,
}

impl BwaSubcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BwaSubcommand::Index => "index",
            BwaSubcommand::Mem => "mem",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamtoolsSubcommand {
    Sort,
    Depth,
}

impl SamtoolsSubcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamtoolsSubcommand::Sort => "sort",
            SamtoolsSubcommand::Depth => "depth",
        }
    }
}

// Static Filenames
pub const DEFAULT_OUTPUT: &str = "read_coverage.png";
pub const WORK_DIR_NAME: &str = "readcov_pipeline";
pub const INDEX_DIR: &str = "indexed_sequence";

pub const SAM_EXT: &str = ".sam";
pub const SORTED_BAM_SUFFIX: &str = "-sorted.bam";
pub const COVERAGE_SUFFIX: &str = "_cov.txt";
pub const BWA_LOG_SUFFIX: &str = ".bwa.log";

pub const PNG_EXT: &str = "png";
pub const SVG_EXT: &str = "svg";

// Static Parameters
pub const DEFAULT_THREADS: usize = 1;
pub const PLOT_SIZE: (u32, u32) = (1024, 640);


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("invalid command-line argument: {0}")]
    InvalidArgument(String),

    #[error("failed to start {tool}: {error}")]
    ToolSpawn { tool: String, error: String },

    #[error("\n{command}\nreturned non-zero exit code {exit_code}\n*stdout*\n{stdout}\n*stderr*\n{stderr}")]
    ToolExecution {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("{0} not found on PATH")]
    MissingTool(String),

    #[error("could not determine {tool} version: {error}")]
    ToolVersion { tool: String, error: String },

    #[error("malformed depth output at line {line}: {message}")]
    InvalidDepthFormat { line: usize, message: String },

    #[error("no coverage data available for plotting")]
    EmptyCoverage,

    #[error("unsupported plot format: {0}")]
    UnsupportedFormat(String),

    #[error("plot rendering failed: {0}")]
    Plot(String),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
}
