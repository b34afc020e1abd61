// src/config/context.rs: immutable run parameters

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defs::{PipelineError, WORK_DIR_NAME};
use crate::utils::file::{absolute_path, name_stem};


/// Everything a run needs to know, fixed at construction.
///
/// All paths are absolute. The working directory is not created here; it is
/// created lazily by [`ExecutionContext::path`] the first time a file under
/// it is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    reference_location: PathBuf,
    sample_locations: Vec<PathBuf>,
    output: PathBuf,
    threads: usize,
    directory: PathBuf,
}

impl ExecutionContext {
    /// Builds the context, resolving every path.
    ///
    /// # Arguments
    ///
    /// * `reference` - Reference sequence (FASTA). Must exist.
    /// * `samples` - One or more read files. Each must exist.
    /// * `output` - Plot destination; need not exist yet.
    /// * `threads` - Passed through to the external tools.
    /// * `work_dir` - Working directory override. Defaults to
    ///   `<temp dir>/readcov_pipeline`.
    ///
    /// # Returns
    /// ExecutionContext or a usage error naming the missing input.
    pub fn new(
        reference: &Path,
        samples: &[PathBuf],
        output: &Path,
        threads: usize,
        work_dir: Option<&Path>,
    ) -> Result<Self, PipelineError> {
        if samples.is_empty() {
            return Err(PipelineError::Usage("at least one sample read file is required".to_string()));
        }
        if threads == 0 {
            return Err(PipelineError::Usage("thread count must be at least 1".to_string()));
        }

        let reference_location = fs::canonicalize(reference).map_err(|e| {
            PipelineError::Usage(format!("cannot resolve reference {}: {}", reference.display(), e))
        })?;

        let sample_locations = samples
            .iter()
            .map(|s| {
                fs::canonicalize(s).map_err(|e| {
                    PipelineError::Usage(format!("cannot resolve sample {}: {}", s.display(), e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = absolute_path(output)?;

        let directory = match work_dir {
            Some(dir) => absolute_path(dir)?,
            None => std::env::temp_dir().join(WORK_DIR_NAME),
        };

        Ok(ExecutionContext {
            reference_location,
            sample_locations,
            output,
            threads,
            directory,
        })
    }

    pub fn reference_location(&self) -> &Path {
        &self.reference_location
    }

    pub fn sample_locations(&self) -> &[PathBuf] {
        &self.sample_locations
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Name of the first sample file, cut at the first '.'.
    pub fn sample_name(&self) -> String {
        // new() guarantees at least one sample
        self.sample_locations
            .first()
            .map(|p| name_stem(p))
            .unwrap_or_default()
    }

    /// Name of the reference file, cut at the first '.'.
    pub fn reference_name(&self) -> String {
        name_stem(&self.reference_location)
    }

    /// Joins `local_path` onto the working directory, creates the containing
    /// directory tree and returns the full path.
    pub fn path<P: AsRef<Path>>(&self, local_path: &[P]) -> Result<PathBuf, PipelineError> {
        let mut filepath = self.directory.clone();
        for part in local_path {
            filepath.push(part);
        }
        if let Some(parent) = filepath.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(filepath)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn touch(dir: &Path, name: &str) -> Result<PathBuf> {
        let p = dir.join(name);
        fs::write(&p, "")?;
        Ok(p)
    }

    #[test]
    fn test_context_resolves_paths() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reference = touch(dir.path(), "refB.fasta")?;
        let sample = touch(dir.path(), "sampleA.fastq")?;
        let work = dir.path().join("work");

        let ctx = ExecutionContext::new(
            &reference,
            &[sample.clone()],
            Path::new("plot.png"),
            4,
            Some(&work),
        )?;

        assert_eq!(ctx.reference_location(), fs::canonicalize(&reference)?);
        assert_eq!(ctx.sample_locations(), &[fs::canonicalize(&sample)?]);
        assert!(ctx.output().is_absolute());
        assert_eq!(ctx.threads(), 4);
        assert_eq!(ctx.sample_name(), "sampleA");
        assert_eq!(ctx.reference_name(), "refB");
        // nothing is created until a path is requested
        assert!(!work.exists());
        Ok(())
    }

    #[test]
    fn test_context_path_creates_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reference = touch(dir.path(), "ref.fa")?;
        let sample = touch(dir.path(), "s.fq")?;
        let work = dir.path().join("work");
        let ctx = ExecutionContext::new(&reference, &[sample], Path::new("o.png"), 1, Some(&work))?;

        let p = ctx.path(&["indexed_sequence", "ref.fa"])?;
        assert_eq!(p, ctx.directory().join("indexed_sequence").join("ref.fa"));
        assert!(work.join("indexed_sequence").is_dir());
        assert!(!p.exists());
        Ok(())
    }

    #[test]
    fn test_context_rejects_missing_inputs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reference = touch(dir.path(), "ref.fa")?;

        let no_samples = ExecutionContext::new(&reference, &[], Path::new("o.png"), 1, None);
        assert!(matches!(no_samples, Err(PipelineError::Usage(_))));

        let missing = ExecutionContext::new(
            &dir.path().join("nope.fa"),
            &[reference.clone()],
            Path::new("o.png"),
            1,
            None,
        );
        assert!(matches!(missing, Err(PipelineError::Usage(_))));

        let zero_threads = ExecutionContext::new(&reference, &[reference.clone()], Path::new("o.png"), 0, None);
        assert!(matches!(zero_threads, Err(PipelineError::Usage(_))));
        Ok(())
    }
}
