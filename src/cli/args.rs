use std::path::PathBuf;

use clap::Parser;

use crate::config::defs::{DEFAULT_OUTPUT, DEFAULT_THREADS};


/// Plot number of reads mapping to a given gene in fasta format.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "readcov-pipeline", version, about, long_about = None)]
pub struct Arguments {
    #[arg(short = 'q', long = "fastq-file", value_name = "PATH", help = "Sample read file; repeat for paired or multiple files")]
    pub fastq_files: Vec<PathBuf>,

    #[arg(short = 'f', long = "fasta-file", value_name = "PATH", help = "Reference sequence to align against")]
    pub fasta_file: Option<PathBuf>,

    #[arg(short = 't', long, default_value_t = DEFAULT_THREADS, help = "Number of threads [Default: 1]")]
    pub threads: usize,

    #[arg(long, action, conflicts_with = "verbose", help = "Suppress logging output.")]
    pub quiet: bool,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(short = 'w', long = "work-dir", value_name = "PATH", help = "Directory for intermediate files. If not specified, 'readcov_pipeline' under the system temp directory is used.")]
    pub work_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Do not check that bwa and samtools are installed before running")]
    pub skip_tool_check: bool,

    #[arg(default_value = DEFAULT_OUTPUT, help = "Output image (.png or .svg)")]
    pub output: PathBuf,
}
