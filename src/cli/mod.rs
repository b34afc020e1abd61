pub mod args;

use std::path::PathBuf;

use clap::Parser;

pub use args::Arguments;
use crate::config::context::ExecutionContext;
use crate::config::defs::PipelineError;

pub fn parse() -> Arguments {
    Arguments::parse()
}

/// Checks that a sample/reference pair was given and folds the arguments into
/// the run's ExecutionContext.
pub fn build_context(args: &Arguments) -> Result<ExecutionContext, PipelineError> {
    let reference: &PathBuf = match (&args.fasta_file, args.fastq_files.is_empty()) {
        (Some(reference), false) => reference,
        _ => {
            return Err(PipelineError::Usage(
                "You must specify both a fasta and fastq file".to_string(),
            ))
        }
    };

    ExecutionContext::new(
        reference,
        &args.fastq_files,
        &args.output,
        args.threads,
        args.work_dir.as_deref(),
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    #[test]
    fn test_parse_defaults() -> Result<()> {
        let args = Arguments::try_parse_from(["readcov-pipeline", "-q", "a.fq", "-q", "b.fq", "-f", "ref.fa"])?;
        assert_eq!(args.fastq_files, vec![PathBuf::from("a.fq"), PathBuf::from("b.fq")]);
        assert_eq!(args.fasta_file, Some(PathBuf::from("ref.fa")));
        assert_eq!(args.threads, 1);
        assert!(!args.quiet);
        assert_eq!(args.output, PathBuf::from("read_coverage.png"));
        Ok(())
    }

    #[test]
    fn test_parse_output_and_flags() -> Result<()> {
        let args = Arguments::try_parse_from([
            "readcov-pipeline", "-q", "a.fq", "-f", "ref.fa", "-t", "8", "--quiet", "-w", "/tmp/w", "cov.svg",
        ])?;
        assert_eq!(args.threads, 8);
        assert!(args.quiet);
        assert_eq!(args.work_dir, Some(PathBuf::from("/tmp/w")));
        assert_eq!(args.output, PathBuf::from("cov.svg"));
        Ok(())
    }

    #[test]
    fn test_build_context_requires_inputs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reference = dir.path().join("ref.fa");
        fs::write(&reference, ">chr1\nACGT\n")?;

        let no_reads = Arguments::try_parse_from(["readcov-pipeline", "-f", reference.to_str().unwrap()])?;
        assert!(matches!(build_context(&no_reads), Err(PipelineError::Usage(_))));

        let no_reference = Arguments::try_parse_from(["readcov-pipeline", "-q", reference.to_str().unwrap()])?;
        assert!(matches!(build_context(&no_reference), Err(PipelineError::Usage(_))));

        let missing_read = Arguments::try_parse_from([
            "readcov-pipeline", "-f", reference.to_str().unwrap(), "-q", "/nonexistent/reads.fq",
        ])?;
        assert!(matches!(build_context(&missing_read), Err(PipelineError::Usage(_))));
        Ok(())
    }
}
