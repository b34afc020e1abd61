use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::defs::{SAM_EXT, SORTED_BAM_SUFFIX};


/// Naive sample/reference name: the file name up to its first '.'.
/// `reads/sampleA.R1.fastq.gz` -> `sampleA`
pub fn name_stem(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}

/// Basename of a path as an owned String.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Maps `<name>.sam` to `<name>-sorted.bam` in the same directory.
/// Names without a `.sam` extension just get the suffix appended.
pub fn sorted_bam_path(sam_path: &Path) -> PathBuf {
    let file_name = base_name(sam_path);
    let stem = file_name.strip_suffix(SAM_EXT).unwrap_or(&file_name);
    sam_path.with_file_name(format!("{}{}", stem, SORTED_BAM_SUFFIX))
}

/// Resolves a user supplied path to an absolute one. Existing paths are fully
/// canonicalized (symlinks resolved), missing ones are made absolute against
/// the current directory.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(p) => Ok(p),
        Err(_) => std::path::absolute(path),
    }
}

/// Creates the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// A step's output counts as cached when a regular file (or a link resolving
/// to one) is present. Contents are not checked.
pub fn is_cached(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
pub fn link_file(target: &Path, link: &Path) -> io::Result<()> {
    // is_cached() follows links, so a dangling link from an earlier run can
    // still be sitting here
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
pub fn link_file(target: &Path, link: &Path) -> io::Result<()> {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link)?;
    }
    fs::copy(target, link).map(|_| ())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_stem() {
        assert_eq!(name_stem(Path::new("/data/sampleA.fastq")), "sampleA");
        assert_eq!(name_stem(Path::new("reads/sampleA.R1.fastq.gz")), "sampleA");
        assert_eq!(name_stem(Path::new("refB")), "refB");
        assert_eq!(name_stem(Path::new("/data/.hidden")), "");
    }

    #[test]
    fn test_sorted_bam_path() {
        assert_eq!(
            sorted_bam_path(Path::new("/tmp/run/sample-x.sam")),
            PathBuf::from("/tmp/run/sample-x-sorted.bam")
        );
        // only the extension is rewritten, not a '.sam' inside the directory
        assert_eq!(
            sorted_bam_path(Path::new("/tmp/a.sam.d/s_r.sam")),
            PathBuf::from("/tmp/a.sam.d/s_r-sorted.bam")
        );
        assert_eq!(
            sorted_bam_path(Path::new("/tmp/run/aln")),
            PathBuf::from("/tmp/run/aln-sorted.bam")
        );
    }

    #[test]
    fn test_absolute_path_for_missing_file() -> io::Result<()> {
        let p = absolute_path(Path::new("does_not_exist_yet.png"))?;
        assert!(p.is_absolute());
        assert!(p.ends_with("does_not_exist_yet.png"));
        Ok(())
    }

    #[test]
    fn test_is_cached_and_link_file() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("ref.fasta");
        let link = dir.path().join("sub").join("ref.fasta");
        assert!(!is_cached(&target));

        fs::write(&target, ">chr1\nACGT\n")?;
        ensure_parent_dir(&link)?;
        link_file(&target, &link)?;
        assert!(is_cached(&link));
        assert_eq!(fs::read_to_string(&link)?, ">chr1\nACGT\n");

        // relinking over an existing link works
        link_file(&target, &link)?;
        assert!(is_cached(&link));
        Ok(())
    }
}
