/// Functions and structs for building command-line arguments and running
/// the external tools.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::defs::{PipelineError, BWA_TAG, SAMTOOLS_TAG, TOOL_VERSIONS};
use crate::utils::file::ensure_parent_dir;


/// One command-line token. Strings, integers and floats are accepted and
/// stringified; anything else has to be converted explicitly and may fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CmdArg {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for CmdArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmdArg::Str(s) => write!(f, "{}", s),
            CmdArg::Int(i) => write!(f, "{}", i),
            // keeps the fractional part: 1.0 -> "1.0", not "1"
            CmdArg::Float(x) => write!(f, "{:?}", x),
        }
    }
}

impl From<&str> for CmdArg {
    fn from(s: &str) -> Self {
        CmdArg::Str(s.to_string())
    }
}

impl From<String> for CmdArg {
    fn from(s: String) -> Self {
        CmdArg::Str(s)
    }
}

impl From<i64> for CmdArg {
    fn from(i: i64) -> Self {
        CmdArg::Int(i)
    }
}

impl From<i32> for CmdArg {
    fn from(i: i32) -> Self {
        CmdArg::Int(i as i64)
    }
}

impl From<u32> for CmdArg {
    fn from(i: u32) -> Self {
        CmdArg::Int(i as i64)
    }
}

impl From<usize> for CmdArg {
    fn from(i: usize) -> Self {
        CmdArg::Int(i as i64)
    }
}

impl From<f64> for CmdArg {
    fn from(x: f64) -> Self {
        CmdArg::Float(x)
    }
}

impl From<f32> for CmdArg {
    fn from(x: f32) -> Self {
        // via the shortest f32 text, so 0.1f32 stays 0.1
        CmdArg::Float(x.to_string().parse::<f64>().unwrap_or(x as f64))
    }
}

impl TryFrom<&Path> for CmdArg {
    type Error = PipelineError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        path.to_str()
            .map(|s| CmdArg::Str(s.to_string()))
            .ok_or_else(|| PipelineError::InvalidArgument(format!("path is not valid UTF-8: {}", path.display())))
    }
}

impl TryFrom<&PathBuf> for CmdArg {
    type Error = PipelineError;

    fn try_from(path: &PathBuf) -> Result<Self, Self::Error> {
        CmdArg::try_from(path.as_path())
    }
}


/// Casts every token to a String. Runs before anything is spawned.
pub fn stringify_args(args: &[CmdArg]) -> Result<Vec<String>, PipelineError> {
    if args.is_empty() {
        return Err(PipelineError::InvalidArgument("empty command".to_string()));
    }
    args.iter()
        .map(|arg| {
            let s = arg.to_string();
            if s.contains('\0') {
                Err(PipelineError::InvalidArgument(format!("token contains a NUL byte: {:?}", s)))
            } else {
                Ok(s)
            }
        })
        .collect()
}

/// Shell-quoted rendering of the command, for logs and error messages.
pub fn command_line(args: &[String]) -> Result<String, PipelineError> {
    shlex::try_join(args.iter().map(String::as_str))
        .map_err(|e| PipelineError::InvalidArgument(e.to_string()))
}


/// Captured output of one external invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl CommandResult {
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        CommandResult { stdout, stderr, exit_code }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn write_stdout(&self, path: &Path) -> Result<(), PipelineError> {
        ensure_parent_dir(path)?;
        std::fs::write(path, &self.stdout)?;
        Ok(())
    }

    pub fn write_stderr(&self, path: &Path) -> Result<(), PipelineError> {
        ensure_parent_dir(path)?;
        std::fs::write(path, &self.stderr)?;
        Ok(())
    }

    /// Turns a non-zero exit into a `ToolExecution` error carrying both streams.
    pub fn check(self, command: &str) -> Result<Self, PipelineError> {
        if self.exit_code != 0 {
            return Err(PipelineError::ToolExecution {
                command: command.to_string(),
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            });
        }
        Ok(self)
    }
}


/// Executes an external program and captures its output.
///
/// `run` fails on a non-zero exit status; `probe` returns whatever the
/// program produced, which the version checks need since some tools exit
/// non-zero when printing usage.
pub trait CommandRunner {
    fn run(&self, args: &[CmdArg]) -> impl Future<Output = Result<CommandResult, PipelineError>> + Send;

    fn probe(&self, args: &[CmdArg]) -> impl Future<Output = Result<CommandResult, PipelineError>> + Send;
}

/// Runs tools as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRunner;

impl LocalRunner {
    async fn capture(args: &[String]) -> Result<CommandResult, PipelineError> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| PipelineError::InvalidArgument("empty command".to_string()))?;

        let output = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => PipelineError::MissingTool(program.clone()),
                _ => PipelineError::ToolSpawn { tool: program.clone(), error: e.to_string() },
            })?;

        // killed by a signal: no code
        let exit_code = output.status.code().unwrap_or(-1);
        Ok(CommandResult::new(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        ))
    }
}

impl CommandRunner for LocalRunner {
    async fn run(&self, args: &[CmdArg]) -> Result<CommandResult, PipelineError> {
        let args = stringify_args(args)?;
        let cmd = command_line(&args)?;
        info!("[running] {}", cmd);

        let rv = Self::capture(&args).await?;
        debug!("{} exited with {}", args[0], rv.exit_code());
        rv.check(&cmd)
    }

    async fn probe(&self, args: &[CmdArg]) -> Result<CommandResult, PipelineError> {
        let args = stringify_args(args)?;
        debug!("[probing] {}", command_line(&args)?);
        Self::capture(&args).await
    }
}


pub mod bwa {
    use std::path::Path;

    use crate::config::context::ExecutionContext;
    use crate::config::defs::{BwaSubcommand, PipelineError, BWA_TAG};
    use super::CmdArg;

    pub fn index_args(index_path: &Path) -> Result<Vec<CmdArg>, PipelineError> {
        Ok(vec![
            BWA_TAG.into(),
            BwaSubcommand::Index.as_str().into(),
            CmdArg::try_from(index_path)?,
        ])
    }

    /// `bwa mem -t <threads> <index> <reads...>`; bwa writes SAM to stdout.
    pub fn mem_args(ctx: &ExecutionContext, index_path: &Path) -> Result<Vec<CmdArg>, PipelineError> {
        let mut args_vec: Vec<CmdArg> = vec![
            BWA_TAG.into(),
            BwaSubcommand::Mem.as_str().into(),
            "-t".into(),
            ctx.threads().into(),
            CmdArg::try_from(index_path)?,
        ];
        for sample in ctx.sample_locations() {
            args_vec.push(CmdArg::try_from(sample)?);
        }
        Ok(args_vec)
    }
}

pub mod samtools {
    use std::path::Path;

    use crate::config::context::ExecutionContext;
    use crate::config::defs::{PipelineError, SamtoolsSubcommand, SAMTOOLS_TAG};
    use super::CmdArg;

    pub fn sort_args(ctx: &ExecutionContext, sam_path: &Path, sorted_path: &Path) -> Result<Vec<CmdArg>, PipelineError> {
        Ok(vec![
            SAMTOOLS_TAG.into(),
            SamtoolsSubcommand::Sort.as_str().into(),
            "--threads".into(),
            ctx.threads().into(),
            "-o".into(),
            CmdArg::try_from(sorted_path)?,
            CmdArg::try_from(sam_path)?,
        ])
    }

    /// `-a` reports every reference position, including zero depth.
    pub fn depth_args(ctx: &ExecutionContext, bam_path: &Path) -> Result<Vec<CmdArg>, PipelineError> {
        Ok(vec![
            SAMTOOLS_TAG.into(),
            SamtoolsSubcommand::Depth.as_str().into(),
            "-a".into(),
            "--reference".into(),
            CmdArg::try_from(ctx.reference_location())?,
            CmdArg::try_from(bam_path)?,
        ])
    }
}


/// Pulls the first `major.minor` pair out of a version string such as
/// `samtools 1.20` or `Version: 0.7.17-r1188`.
pub fn parse_version(text: &str) -> Option<(u32, u32)> {
    text.split_whitespace().find_map(|token| {
        let mut parts = token.split('.');
        let major = parts.next()?.parse::<u32>().ok()?;
        let minor_digits: String = parts.next()?.chars().take_while(|c| c.is_ascii_digit()).collect();
        let minor = minor_digits.parse::<u32>().ok()?;
        Some((major, minor))
    })
}

/// Asks a tool for its version.
///
/// # Arguments
///
/// * `runner` - Backend used to launch the tool.
/// * `tool` - BWA_TAG or SAMTOOLS_TAG.
///
/// # Returns
/// Version string as printed by the tool.
pub async fn check_version<R: CommandRunner>(runner: &R, tool: &str) -> Result<String, PipelineError> {
    let (args, from_stderr): (Vec<CmdArg>, bool) = match tool {
        // bare `bwa` prints usage, including "Version: x.y.z", to stderr and exits 1
        BWA_TAG => (vec![BWA_TAG.into()], true),
        SAMTOOLS_TAG => (vec![SAMTOOLS_TAG.into(), "--version".into()], false),
        _ => {
            return Err(PipelineError::ToolVersion {
                tool: tool.to_string(),
                error: "unknown tool".to_string(),
            })
        }
    };

    let rv = runner.probe(&args).await?;
    let text = if from_stderr { rv.stderr() } else { rv.stdout() };
    let line = text
        .lines()
        .find(|l| if from_stderr { l.starts_with("Version:") } else { l.starts_with(tool) })
        .ok_or_else(|| PipelineError::ToolVersion {
            tool: tool.to_string(),
            error: format!("no version line in output: {}", text.lines().next().unwrap_or("")),
        })?;

    let version = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| PipelineError::ToolVersion {
            tool: tool.to_string(),
            error: format!("invalid version line: {}", line),
        })?
        .to_string();
    Ok(version)
}

/// Verifies every tool is installed. Versions below `TOOL_VERSIONS` only warn.
pub async fn check_versions<R: CommandRunner>(runner: &R, tools: &[&str]) -> Result<(), PipelineError> {
    for &tool in tools {
        let version = check_version(runner, tool).await?;
        info!("Found {} version {}", tool, version);

        let minimum = TOOL_VERSIONS.get(tool).copied();
        match (parse_version(&version), minimum) {
            (Some(found), Some(min)) if found < min => {
                warn!("{} {} is older than the tested minimum {}.{}", tool, version, min.0, min.1);
            }
            (None, Some(_)) => warn!("Could not parse {} version '{}'", tool, version),
            _ => {}
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn sh(script: &str) -> Vec<CmdArg> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn test_stringify_args() -> Result<()> {
        let args: Vec<CmdArg> = vec!["bwa".into(), "-t".into(), 4usize.into(), 0.5f64.into(), (-3i32).into()];
        assert_eq!(stringify_args(&args)?, vec!["bwa", "-t", "4", "0.5", "-3"]);
        Ok(())
    }

    #[test]
    fn test_stringify_floats() -> Result<()> {
        let args: Vec<CmdArg> = vec!["x".into(), 1.0f64.into(), 0.1f32.into(), 2.5f32.into(), (-0.25f64).into()];
        assert_eq!(stringify_args(&args)?, vec!["x", "1.0", "0.1", "2.5", "-0.25"]);
        Ok(())
    }

    #[test]
    fn test_stringify_rejects_bad_tokens() {
        assert!(matches!(stringify_args(&[]), Err(PipelineError::InvalidArgument(_))));
        let nul = vec![CmdArg::from("a\0b")];
        assert!(matches!(stringify_args(&nul), Err(PipelineError::InvalidArgument(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_a_type_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/\xff.sam"));
        assert!(matches!(CmdArg::try_from(path), Err(PipelineError::InvalidArgument(_))));
    }

    #[test]
    fn test_command_line_quotes() -> Result<()> {
        let args = vec!["samtools".to_string(), "depth".to_string(), "my file.bam".to_string()];
        assert_eq!(command_line(&args)?, "samtools depth 'my file.bam'");
        Ok(())
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("samtools 1.20"), Some((1, 20)));
        assert_eq!(parse_version("0.7.17-r1188"), Some((0, 7)));
        assert_eq!(parse_version("1.9"), Some((1, 9)));
        assert!(parse_version("1.9") < Some((1, 10)));
        assert_eq!(parse_version("unknown"), None);
    }

    #[tokio::test]
    async fn test_local_runner_captures_output() -> Result<()> {
        let rv = LocalRunner.run(&sh("echo out; echo err 1>&2")).await?;
        assert_eq!(rv.stdout(), "out\n");
        assert_eq!(rv.stderr(), "err\n");
        assert_eq!(rv.exit_code(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_local_runner_reports_failure() -> Result<()> {
        let err = LocalRunner
            .run(&sh("echo partial; echo broken 1>&2; exit 3"))
            .await
            .expect_err("exit 3 must fail");
        match err {
            PipelineError::ToolExecution { command, exit_code, stdout, stderr } => {
                assert_eq!(command, "sh -c 'echo partial; echo broken 1>&2; exit 3'");
                assert_eq!(exit_code, 3);
                assert_eq!(stdout, "partial\n");
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_keeps_non_zero_exit() -> Result<()> {
        let rv = LocalRunner.probe(&sh("echo usage 1>&2; exit 1")).await?;
        assert_eq!(rv.exit_code(), 1);
        assert_eq!(rv.stderr(), "usage\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = LocalRunner
            .run(&[CmdArg::from("definitely-not-a-real-tool-4711")])
            .await
            .expect_err("missing tool");
        assert!(matches!(err, PipelineError::MissingTool(_)));
    }

    #[test]
    fn test_write_stdout_creates_parent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("out.txt");
        let rv = CommandResult::new("chr1\t1\t5\n".to_string(), "log".to_string(), 0);
        rv.write_stdout(&path)?;
        rv.write_stderr(&path.with_extension("log"))?;
        assert_eq!(std::fs::read_to_string(&path)?, "chr1\t1\t5\n");
        assert_eq!(std::fs::read_to_string(path.with_extension("log"))?, "log");
        Ok(())
    }
}
