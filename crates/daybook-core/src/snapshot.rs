use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::task::Task;

/// Reads a JSON Lines task snapshot from `path`, or stdin when `path` is `-`.
#[tracing::instrument(skip(path))]
pub fn load_snapshot(path: &Path) -> anyhow::Result<Vec<Task>> {
    if path.as_os_str() == "-" {
        debug!("reading task snapshot from stdin");
        return read_jsonl(std::io::stdin().lock(), "<stdin>");
    }

    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_jsonl(file, &path.display().to_string())
}

pub fn read_jsonl<R: Read>(reader: R, source: &str) -> anyhow::Result<Vec<Task>> {
    let reader = BufReader::new(reader);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed reading {source}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {source} line {}", idx + 1))?;
        out.push(task);
    }

    debug!(source, count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

pub fn write_jsonl<W: Write>(mut writer: W, tasks: &[Task]) -> anyhow::Result<()> {
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(writer, "{serialized}")?;
    }
    writer.flush()?;
    Ok(())
}
