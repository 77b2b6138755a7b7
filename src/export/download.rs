//! Download sinks
//!
//! The desktop sink writes into a folder and never overwrites: a taken name
//! gets a ` (1)`, ` (2)`, ... suffix before the extension, the way browsers
//! name repeated downloads.

use super::raster::EncodedImage;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Highest suffix tried before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Hands an exported image to the user.
pub trait Downloader {
    /// Store `image` under `filename`; returns where it ended up.
    fn download(&self, image: &EncodedImage, filename: &str) -> Result<PathBuf>;
}

/// Writes downloads into a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderDownloader {
    /// Target folder; the platform download folder when unset
    pub directory: Option<PathBuf>,
    /// Open each file with the system viewer after writing it
    pub open_after: bool,
}

impl FolderDownloader {
    pub fn new(directory: Option<PathBuf>, open_after: bool) -> Self {
        Self {
            directory,
            open_after,
        }
    }

    /// The folder files are written to.
    ///
    /// # Errors
    ///
    /// `Error::DownloadDirNotFound` when no folder is configured and the
    /// platform has no download folder.
    pub fn target_dir(&self) -> Result<PathBuf> {
        self.directory
            .clone()
            .or_else(dirs::download_dir)
            .ok_or(Error::DownloadDirNotFound)
    }
}

/// `name (n).ext` for `n > 0`, `name.ext` for `n == 0`.
fn candidate(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    }
}

/// Create `filename` in `dir` without replacing an existing file.
fn write_unique(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    create_unique(dir, filename, |file| file.write_all(bytes))
}

/// Create a fresh file under the first free name and fill it with `write`.
///
/// A file that could not be written completely is removed again.
fn create_unique<W>(dir: &Path, filename: &str, write: W) -> Result<PathBuf>
where
    W: Fn(&mut File) -> io::Result<()>,
{
    for n in 0..=MAX_SUFFIX {
        let path = dir.join(candidate(filename, n));
        let file = OpenOptions::new().write(true).create_new(true).open(&path);
        match file {
            Ok(mut file) => {
                if let Err(source) = write(&mut file) {
                    drop(file);
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("Failed to remove partial file {}: {}", path.display(), e);
                    }
                    return Err(Error::FileWrite { path, source });
                }
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", path.display());
            }
            Err(source) => return Err(Error::FileWrite { path, source }),
        }
    }
    Err(Error::FileWrite {
        path: dir.join(filename),
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free file name"),
    })
}

impl Downloader for FolderDownloader {
    fn download(&self, image: &EncodedImage, filename: &str) -> Result<PathBuf> {
        let dir = self.target_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| Error::FileWrite {
                path: dir.clone(),
                source,
            })?;
        }

        let path = write_unique(&dir, filename, &image.bytes)?;
        info!(
            "Saved {}x{} image to {}",
            image.width,
            image.height,
            path.display()
        );

        if self.open_after {
            if let Err(e) = open::that(&path) {
                warn!("Failed to open exported file: {}", e);
            }
        }
        Ok(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn image(bytes: &[u8]) -> EncodedImage {
        EncodedImage {
            bytes: bytes.to_vec(),
            width: 2,
            height: 1,
        }
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let result = create_unique(dir.path(), "g.png", |file| {
            file.write_all(b"half")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });

        assert!(matches!(result, Err(Error::FileWrite { .. })));
        assert!(!dir.path().join("g.png").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate("gram.png", 0), "gram.png");
        assert_eq!(candidate("gram.png", 2), "gram (2).png");
        assert_eq!(candidate("noext", 1), "noext (1)");
    }

    #[test]
    fn test_writes_into_directory() {
        let dir = TempDir::new().unwrap();
        let sink = FolderDownloader::new(Some(dir.path().to_path_buf()), false);

        let path = sink.download(&image(b"png"), "Hello.png").unwrap();
        assert_eq!(path, dir.path().join("Hello.png"));
        assert_eq!(fs::read(&path).unwrap(), b"png");
    }

    #[test]
    fn test_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let sink = FolderDownloader::new(Some(dir.path().to_path_buf()), false);

        let first = sink.download(&image(b"one"), "g.png").unwrap();
        let second = sink.download(&image(b"two"), "g.png").unwrap();
        let third = sink.download(&image(b"three"), "g.png").unwrap();

        assert_eq!(second, dir.path().join("g (1).png"));
        assert_eq!(third, dir.path().join("g (2).png"));
        assert_eq!(fs::read(first).unwrap(), b"one");
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let sink = FolderDownloader::new(Some(nested.clone()), false);

        let path = sink.download(&image(b"x"), "x.png").unwrap();
        assert!(path.starts_with(&nested));
    }

    #[test]
    fn test_configured_directory_wins() {
        let sink = FolderDownloader::new(Some(PathBuf::from("/somewhere")), false);
        assert_eq!(sink.target_dir().unwrap(), PathBuf::from("/somewhere"));
    }
}
