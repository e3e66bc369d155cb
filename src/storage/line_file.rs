//! Synchronous line-oriented file primitives.
//!
//! The append-file backend stores one JSON document per line. This module
//! owns the raw file handling: append a line, read them all, rewrite the
//! file with one line replaced or removed. Rewrites go through a sibling
//! temp file followed by an atomic rename, so a crash mid-rewrite leaves
//! either the old file or the new one, never a torn mix.
//!
//! All functions here block; async callers wrap them in
//! `tokio::task::spawn_blocking`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A line-per-record file on disk.
///
/// The file does not have to exist: reads on a missing file behave as reads
/// of an empty one, and the first append creates it.
#[derive(Clone, Debug)]
pub struct LineFile {
    path: PathBuf,
}

impl LineFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, creating the file if needed.
    pub fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.sync_data()
    }

    /// All lines, in file order. A missing file yields an empty vec.
    pub fn read_lines(&self) -> std::io::Result<Vec<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        BufReader::new(file).lines().collect()
    }

    /// Rewrite the file keeping only lines for which `keep` returns true.
    /// Returns how many lines were dropped.
    pub fn retain_lines(&self, mut keep: impl FnMut(&str) -> bool) -> std::io::Result<usize> {
        let lines = self.read_lines()?;
        let kept: Vec<&String> = lines.iter().filter(|l| keep(l)).collect();
        let dropped = lines.len() - kept.len();
        if dropped > 0 {
            self.rewrite(kept.iter().map(|l| l.as_str()))?;
        }
        Ok(dropped)
    }

    /// Rewrite the file with each line passed through `map`. Lines for which
    /// `map` returns `None` are kept unchanged. Returns how many lines were
    /// replaced.
    pub fn map_lines(&self, mut map: impl FnMut(&str) -> Option<String>) -> std::io::Result<usize> {
        let lines = self.read_lines()?;
        let mut replaced = 0;
        let rewritten: Vec<String> = lines
            .iter()
            .map(|l| match map(l) {
                Some(new) => {
                    replaced += 1;
                    new
                }
                None => l.clone(),
            })
            .collect();
        if replaced > 0 {
            self.rewrite(rewritten.iter().map(|l| l.as_str()))?;
        }
        Ok(replaced)
    }

    /// Truncate the file to zero lines. A missing file is already clear.
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn rewrite<'a>(&self, lines: impl Iterator<Item = &'a str>) -> std::io::Result<()> {
        let tmp = self.path.with_extension("rewrite");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for line in lines {
                writeln!(writer, "{line}")?;
            }
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        fs::rename(&tmp, &self.path)
    }
}
