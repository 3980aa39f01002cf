//! Archive extraction and package inspection (zip, 7z)
//!
//! A package must carry one content file (`.gro`), one preview image and one
//! metadata text file. The title is the second non-empty `#`-delimited
//! segment of the metadata text; existing packages depend on this exact rule.

use crate::error::{FileRole, ModError, Result};
use chrono::Utc;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// Title used when the metadata file carries no second segment
pub const UNKNOWN_TITLE: &str = "Unknown Mod";

const CONTENT_EXTENSIONS: &[&str] = &["gro"];
const PREVIEW_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const METADATA_EXTENSIONS: &[&str] = &["txt"];

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
    Unknown,
}

impl ArchiveFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "zip" => Self::Zip,
            "7z" => Self::SevenZip,
            _ => Self::Unknown,
        }
    }

    /// Detect format from leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0x50, 0x4B]) {
            Self::Zip
        } else if bytes.starts_with(&[0x37, 0x7A, 0xBC, 0xAF]) {
            Self::SevenZip
        } else {
            Self::Unknown
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::SevenZip => "7z",
            Self::Unknown => "bin",
        }
    }
}

impl FileRole {
    /// Classify a file by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if CONTENT_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileRole::Content)
        } else if PREVIEW_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileRole::Preview)
        } else if METADATA_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileRole::Metadata)
        } else {
            None
        }
    }
}

/// What an extracted (or imported) package contains.
///
/// File paths are relative to the directory that was inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMod {
    pub title: String,
    pub content_file: PathBuf,
    pub preview_file: PathBuf,
    pub metadata_file: PathBuf,
    pub weight: u64,
}

/// Extract `archive` into `scratch_dir` (created if needed) and inspect it.
///
/// The scratch directory is left in place on both success and failure;
/// the caller owns it.
pub fn extract(archive: &Path, format: ArchiveFormat, scratch_dir: &Path) -> Result<ExtractedMod> {
    extract_archive(archive, format, scratch_dir)?;
    inspect_dir(scratch_dir)
}

/// Extract an archive to the destination directory
pub fn extract_archive(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .map_err(|e| ModError::io("Failed to create scratch directory", dest, e))?;

    let format = match format {
        ArchiveFormat::Unknown => {
            let bytes = std::fs::read(archive)
                .map_err(|e| ModError::io("Failed to read archive", archive, e))?;
            ArchiveFormat::sniff(&bytes)
        }
        known => known,
    };

    let name = archive.display().to_string();
    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest).map_err(|e| ModError::Archive {
            name,
            message: format!("{:#}", e),
        }),
        ArchiveFormat::SevenZip => extract_7z(archive, dest).map_err(|e| ModError::Archive {
            name,
            message: format!("{:#}", e),
        }),
        ArchiveFormat::Unknown => Err(ModError::UnsupportedArchive { name }),
    }
}

/// Extract a ZIP archive
fn extract_zip(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    let file = std::fs::File::open(archive).context("Failed to open archive")?;
    let mut zip = zip::ZipArchive::new(file).context("Failed to read ZIP archive")?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let relative = sanitize_path(entry.name());
        if relative.is_empty() {
            continue;
        }
        let outpath = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }
    }

    Ok(())
}

/// Extract a 7z archive
fn extract_7z(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    sevenz_rust::decompress_file(archive, dest).context("Failed to extract 7z archive")?;
    Ok(())
}

/// Sanitize path to prevent directory traversal
fn sanitize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Classify the files under `dir` and read the package metadata.
///
/// Files are visited in name order and the first file per role wins.
pub fn inspect_dir(dir: &Path) -> Result<ExtractedMod> {
    let mut content = None;
    let mut preview = None;
    let mut metadata = None;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let slot = match FileRole::from_path(entry.path()) {
            Some(FileRole::Content) => &mut content,
            Some(FileRole::Preview) => &mut preview,
            Some(FileRole::Metadata) => &mut metadata,
            None => continue,
        };
        if slot.is_none() {
            if let Ok(relative) = entry.path().strip_prefix(dir) {
                *slot = Some(relative.to_path_buf());
            }
        }
    }

    let (content_file, preview_file, metadata_file) = match (content, preview, metadata) {
        (Some(c), Some(p), Some(m)) => (c, p, m),
        (c, p, m) => {
            let missing = [
                (FileRole::Content, c.is_none()),
                (FileRole::Preview, p.is_none()),
                (FileRole::Metadata, m.is_none()),
            ]
            .into_iter()
            .filter_map(|(role, absent)| absent.then_some(role))
            .collect();
            return Err(ModError::MalformedArchive { missing });
        }
    };

    let metadata_path = dir.join(&metadata_file);
    let bytes = std::fs::read(&metadata_path)
        .map_err(|e| ModError::io("Failed to read metadata file", &metadata_path, e))?;
    let title = parse_title(&decode_text(&bytes));

    let content_path = dir.join(&content_file);
    let weight = std::fs::metadata(&content_path)
        .map_err(|e| ModError::io("Failed to stat content file", &content_path, e))?
        .len();

    Ok(ExtractedMod {
        title,
        content_file,
        preview_file,
        metadata_file,
        weight,
    })
}

/// Decode metadata bytes: BOM first, then UTF-8, then Windows-1251.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, _)) = encoding_rs::Encoding::for_bom(bytes) {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::warn!("{} decoding had errors, title may be garbled", encoding.name());
        }
        return decoded.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1251.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Second non-empty `#` segment, trimmed; [`UNKNOWN_TITLE`] when absent.
pub fn parse_title(text: &str) -> String {
    text.split('#')
        .filter(|segment| !segment.is_empty())
        .nth(1)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(UNKNOWN_TITLE)
        .to_string()
}

/// Archive names of the form `<two letters><digits>.<ext>`
static PACKAGE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z]{2}(\d+)\.[a-z0-9]+$").ok());

/// Identifier from an archive name of the form `<two letters><digits>.<ext>`.
///
/// Example: "zz1042.zip" -> "1042"
pub fn mod_id_from_filename(filename: &str) -> Option<String> {
    PACKAGE_NAME
        .as_ref()?
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

static LAST_FALLBACK_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond-timestamp identifier, strictly increasing within the process.
pub fn fallback_mod_id() -> String {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_FALLBACK_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
            Some(now.max(prev + 1))
        })
        .unwrap_or(now - 1);
    now.max(previous + 1).to_string()
}
