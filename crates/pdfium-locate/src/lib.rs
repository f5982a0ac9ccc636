//! # pdfium-locate
//!
//! Find a locally installed [PDFium](https://pdfium.googlesource.com/pdfium/)
//! shared library and bind `pdfium-render` to it.
//!
//! The library is the rendering engine's only auxiliary asset. It is always
//! a file on the local filesystem; this crate never reaches out to the
//! network.
//!
//! ## Resolution order
//!
//! 1. An explicit path handed to [`resolve_library`] / [`bind_pdfium`].
//! 2. `PDFIUM_LIB_PATH` — path to an existing pdfium library.
//! 3. The per-user cache directory (see [`pdfium_cache_dir`]).
//! 4. The operating system's library search path
//!    ([`Pdfium::bind_to_system_library`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_locate::{bind_pdfium, resolve_library};
//!
//! let source = resolve_library(None).expect("no pdfium library found");
//! let pdfium = bind_pdfium(&source).expect("bind failed");
//! ```
//!
//! ## Platform support
//!
//! | OS      | Library               |
//! |---------|-----------------------|
//! | macOS   | `libpdfium.dylib`     |
//! | Linux   | `libpdfium.so`        |
//! | Windows | `pdfium.dll`          |
//!
//! ## Environment variable overrides
//!
//! - `PDFIUM_LIB_PATH` — path to an existing pdfium library.
//! - `PDFIUM_CACHE_DIR` — override the default cache directory.

use std::fmt;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// Errors returned by pdfium-locate operations.
#[derive(Error, Debug, Clone)]
pub enum LocateError {
    /// The current OS has no known pdfium library name.
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    /// An explicit path was given but nothing exists there.
    #[error("PDFium library not found at '{path}'")]
    NotFound { path: PathBuf },

    /// `libloading` / `pdfium-render` could not load the library.
    #[error("Failed to bind PDFium from {source_desc}: {reason}")]
    Bind { source_desc: String, reason: String },
}

/// Where the pdfium library was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// A concrete file on disk.
    Path(PathBuf),
    /// Defer to the dynamic loader's search path.
    System,
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::Path(p) => write!(f, "'{}'", p.display()),
            LibrarySource::System => f.write_str("the system library path"),
        }
    }
}

/// Platform file name of the pdfium shared library.
pub fn library_file_name() -> Result<&'static str, LocateError> {
    match std::env::consts::OS {
        "macos" => Ok("libpdfium.dylib"),
        "linux" | "freebsd" | "android" => Ok("libpdfium.so"),
        "windows" => Ok("pdfium.dll"),
        os => Err(LocateError::UnsupportedPlatform { os: os.to_string() }),
    }
}

/// Returns the directory searched for a cached pdfium library.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/pdf-ingest/`
/// - **Linux**: `~/.cache/pdf-ingest/`
/// - **Windows**: `%LOCALAPPDATA%\pdf-ingest\`
///
/// Override by setting `PDFIUM_CACHE_DIR`.
pub fn pdfium_cache_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var("PDFIUM_CACHE_DIR") {
        return PathBuf::from(override_dir);
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("pdf-ingest")
}

/// Resolve the pdfium library location without loading it.
///
/// An explicit path that does not exist is an error rather than a silent
/// fallback: a misconfigured asset path should be visible.
pub fn resolve_library(explicit: Option<&Path>) -> Result<LibrarySource, LocateError> {
    if let Some(path) = explicit {
        return existing(path);
    }

    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        if !env_path.is_empty() {
            return existing(Path::new(&env_path));
        }
    }

    let cached = pdfium_cache_dir().join(library_file_name()?);
    if cached.exists() {
        return Ok(LibrarySource::Path(cached));
    }

    Ok(LibrarySource::System)
}

/// Bind to the library at `source`.
pub fn bind_pdfium(source: &LibrarySource) -> Result<Pdfium, LocateError> {
    let bindings = match source {
        LibrarySource::Path(path) => Pdfium::bind_to_library(path),
        LibrarySource::System => Pdfium::bind_to_system_library(),
    };

    bindings.map(Pdfium::new).map_err(|e| LocateError::Bind {
        source_desc: source.to_string(),
        reason: e.to_string(),
    })
}

fn existing(path: &Path) -> Result<LibrarySource, LocateError> {
    if path.exists() {
        Ok(LibrarySource::Path(path.to_path_buf()))
    } else {
        Err(LocateError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_name_is_known_for_this_platform() {
        let name = library_file_name().expect("current platform should be supported");
        assert!(name.contains("pdfium"));
    }

    #[test]
    fn cache_dir_is_deterministic() {
        let d1 = pdfium_cache_dir();
        let d2 = pdfium_cache_dir();
        assert_eq!(d1, d2);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = resolve_library(Some(Path::new("/definitely/not/libpdfium.so"))).unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
        assert!(err.to_string().contains("/definitely/not"));
    }

    #[test]
    fn explicit_existing_path_wins() {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let source = resolve_library(Some(&manifest)).unwrap();
        assert_eq!(source, LibrarySource::Path(manifest));
    }

    #[test]
    fn source_display() {
        assert_eq!(LibrarySource::System.to_string(), "the system library path");
        assert!(LibrarySource::Path(PathBuf::from("/x/libpdfium.so"))
            .to_string()
            .contains("/x/libpdfium.so"));
    }
}
