//! Fault dump persistence.
//!
//! The watcher hands a snapshot of its resize history to a sink when the
//! host raises the configured layout fault; this crate writes that snapshot
//! to disk, one line per row, replacing whatever the previous fault left
//! behind. Write failures are logged and dropped — a dump must never feed
//! an error back into the watcher's callback path.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};

use limn_types::DumpRow;
use limn_watch::DumpSink;

/// Writes each dump as a full rewrite of a single file.
pub struct FileDumpSink {
    path: PathBuf,
}

impl FileDumpSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_rows(&self, rows: &[DumpRow]) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        for row in rows {
            writeln!(out, "{}", row.format_line())?;
        }
        out.flush()
    }
}

impl DumpSink for FileDumpSink {
    fn write_dump(&self, rows: &[DumpRow]) {
        match self.write_rows(rows) {
            Ok(()) => info!(rows = rows.len(), path = %self.path.display(), "fault dump written"),
            Err(err) => error!(%err, path = %self.path.display(), "fault dump write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use limn_types::ElementHandle;

    fn row(path: &str, raw: u64) -> DumpRow {
        DumpRow {
            path: path.to_string(),
            handle: ElementHandle::new(raw).expect("non-zero"),
        }
    }

    #[test]
    fn writes_one_line_per_row_and_truncates_previous_dump() {
        let path = std::env::temp_dir().join(format!(
            "limn-dump-test-{}.txt",
            std::process::id()
        ));
        let sink = FileDumpSink::new(&path);

        sink.write_dump(&[
            row("RootPage/.../Frame", 0xab),
            row("MainPage/Grid", 0x10),
        ]);
        let first = std::fs::read_to_string(&path).expect("dump file readable");
        assert_eq!(first, "RootPage/.../Frame 0xab\nMainPage/Grid 0x10\n");

        sink.write_dump(&[row("MainPage/Grid", 0x10)]);
        let second = std::fs::read_to_string(&path).expect("dump file readable");
        assert_eq!(second, "MainPage/Grid 0x10\n");

        std::fs::remove_file(&path).expect("cleanup");
    }
}
