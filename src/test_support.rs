//! Fixtures shared by unit tests

use std::io::Write;
use std::path::Path;

/// Write a ZIP archive containing `entries` (name, bytes).
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// Bytes of a complete package: content, preview and metadata.
pub fn package_bytes(content_name: &str, title: &str) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.zip");
    let metadata = format!("#x#{}#y#", title);
    write_zip(
        &path,
        &[
            (content_name, b"content-bytes"),
            ("preview.jpg", b"jpeg"),
            ("readme.txt", metadata.as_bytes()),
        ],
    );
    std::fs::read(&path).unwrap()
}

/// Write a loose package directory (as found by directory import).
pub fn write_package_dir(dir: &Path, content_name: &str, title: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(content_name), b"content-bytes").unwrap();
    std::fs::write(dir.join("preview.jpg"), b"jpeg").unwrap();
    std::fs::write(dir.join("readme.txt"), format!("#x#{}#y#", title)).unwrap();
}
