//! Extension categories used by ranking.
//!
//! Anything not listed here counts as a text/code file and ranks ahead of
//! binaries, media and archives with otherwise equal signals.

// ---------------------------------------------------------------------------
// Extension category constants
// ---------------------------------------------------------------------------

pub const PICTURE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "ico", "heic", "heif", "raw",
    "arw", "cr2", "orf", "raf", "psd", "ai",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "wmv", "webm", "flv", "mpg", "mpeg", "3gp", "3g2",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "aac", "ogg", "oga", "opus", "wma", "m4a", "alac", "aiff",
];

pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "doc", "docx", "odt", "pdf", "pages", "ppt", "pptx", "key", "odp", "xls", "xlsx", "numbers",
    "ods",
];

pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz", "zst", "cab", "iso", "dmg", "nupkg",
    "vsix", "jar", "war",
];

pub const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "msi", "dll", "so", "dylib", "a", "lib", "o", "obj", "pdb", "ilk", "exp", "class",
    "pyc", "pyo", "wasm", "bin", "dat", "db", "sqlite", "cache", "suo", "apk", "ipa", "pkg",
    "ttf", "otf", "woff", "woff2", "eot",
];

const NON_CODE_CATEGORIES: &[&[&str]] = &[
    PICTURE_EXTENSIONS,
    VIDEO_EXTENSIONS,
    AUDIO_EXTENSIONS,
    DOCUMENT_EXTENSIONS,
    ARCHIVE_EXTENSIONS,
    BINARY_EXTENSIONS,
];

/// Returns the extension (without the dot) of a lowercase file name.
pub fn extension_of_name(name: &str) -> Option<&str> {
    let split = name.rfind('.')?;
    if split == 0 || split + 1 >= name.len() {
        return None;
    }
    Some(&name[split + 1..])
}

/// Returns false for known binary, media, document and archive extensions.
///
/// Expects a lowercase file name. Files without an extension count as text.
pub fn is_code_file(file_name_lower: &str) -> bool {
    let Some(extension) = extension_of_name(file_name_lower) else {
        return true;
    };
    !NON_CODE_CATEGORIES
        .iter()
        .any(|category| category.contains(&extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_and_text_files_are_code() {
        for name in ["main.rs", "service2.txt", "readme.md", "makefile", "app.config"] {
            assert!(is_code_file(name), "{name}");
        }
    }

    #[test]
    fn binaries_and_media_are_not_code() {
        for name in ["app.dll", "logo.png", "bundle.zip", "clip.mp4", "report.pdf"] {
            assert!(!is_code_file(name), "{name}");
        }
    }

    #[test]
    fn dotfiles_have_no_extension() {
        assert_eq!(extension_of_name(".gitignore"), None);
        assert_eq!(extension_of_name("trailing."), None);
        assert_eq!(extension_of_name("a.tar.gz"), Some("gz"));
    }
}
