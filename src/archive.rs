// Moves published media out of the way so it is not picked again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

/// Move every file into `dir`, creating it if needed. Returns the new paths.
pub fn archive_files(dir: &Path, files: &[&Path]) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut moved = Vec::with_capacity(files.len());
    for &file in files {
        let Some(name) = file.file_name() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file path: {}", file.display()),
            ));
        };
        let dest = dir.join(name);
        move_file(file, &dest)?;
        info!(from = %file.display(), to = %dest.display(), "archived");
        moved.push(dest);
    }
    Ok(moved)
}

/// `rename`, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
