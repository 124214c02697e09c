use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// The single file a fetch may produce.
///
/// Payloads are written to a hidden `.{name}.*.part` sibling and renamed into
/// place, so the final path either holds a complete payload or does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    path: PathBuf,
}

impl Destination {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn parent(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn temp_prefix(&self) -> String {
        let name = self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "asset".into());
        format!(".{}.", name)
    }

    pub fn ensure_parent(&self) -> io::Result<()> { fs::create_dir_all(self.parent()) }

    /// Contents of an already finalized file, if there is one.
    pub fn read_existing(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes `payload` to a temporary sibling, syncs it, then renames it over the destination.
    pub fn write_atomic(&self, payload: &[u8]) -> io::Result<u64> {
        self.ensure_parent()?;
        let mut tmp = tempfile::Builder::new()
            .prefix(&self.temp_prefix())
            .suffix(".part")
            .tempfile_in(self.parent())?;
        tmp.write_all(payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(payload.len() as u64)
    }

    /// Removes `.part` files left behind for this destination by an interrupted run.
    pub fn sweep_temporaries(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(self.parent()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let prefix = self.temp_prefix();
        let mut removed = 0;
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".part") && entry.path().is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
