use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use ds_core::content::tags;
use ds_core::ports::ByteSourcePort;
use ds_core::TypeTag;

/// Deferred bytes read from a file when the component asks for them.
///
/// 延迟读取：组件导入时才读取文件内容。
#[derive(Debug, Clone)]
pub struct FileByteSource {
    path: PathBuf,
}

impl FileByteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Type tag implied by the file extension, `public.data` when unknown.
    pub fn type_tag(&self) -> TypeTag {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let tag = match extension.as_str() {
            "txt" | "text" | "md" => tags::UTF8_PLAIN_TEXT,
            "rtf" => tags::RTF,
            "html" | "htm" => "public.html",
            "json" => "public.json",
            "url" | "webloc" => "com.apple.webloc",
            "png" => tags::PNG,
            "jpg" | "jpeg" => tags::JPEG,
            "gif" => "com.compuserve.gif",
            "bmp" => "com.microsoft.bmp",
            "ico" => "com.microsoft.ico",
            "webp" => "org.webmproject.webp",
            "tif" | "tiff" => "public.tiff",
            "pdf" => tags::PDF,
            "vcf" => tags::VCARD,
            "eml" => tags::EMAIL_MESSAGE,
            "zip" => tags::ZIP_ARCHIVE,
            "gz" | "tgz" => "org.gnu.gnu-zip-archive",
            "tar" => "public.tar-archive",
            "7z" => "org.7-zip.7-zip-archive",
            "mp3" => "public.mp3",
            "m4a" => "public.mpeg-4-audio",
            "wav" => "com.microsoft.waveform-audio",
            "flac" => "org.xiph.flac",
            "mp4" | "m4v" => "public.mpeg-4",
            "mov" => "com.apple.quicktime-movie",
            "mkv" => "org.matroska.mkv",
            "docx" => "org.openxmlformats.wordprocessingml.document",
            "xlsx" => "org.openxmlformats.spreadsheetml.sheet",
            "pptx" => "org.openxmlformats.presentationml.presentation",
            "webarchive" => tags::WEB_ARCHIVE,
            _ => tags::DATA,
        };
        TypeTag::from(tag)
    }
}

#[async_trait]
impl ByteSourcePort for FileByteSource {
    async fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.path)
            .await
            .with_context(|| format!("read dropped file failed: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_type_tag_from_extension() {
        assert_eq!(FileByteSource::new("a/Photo.JPG").type_tag().as_str(), tags::JPEG);
        assert_eq!(FileByteSource::new("notes.txt").type_tag().as_str(), tags::UTF8_PLAIN_TEXT);
        assert_eq!(FileByteSource::new("no_extension").type_tag().as_str(), tags::DATA);
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let source = FileByteSource::new(dir.path().join("gone.bin"));

        let err = source.load().await.unwrap_err();
        assert!(format!("{err:#}").contains("gone.bin"));
    }

    #[tokio::test]
    async fn test_reads_file_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(FileByteSource::new(&path).load().await.unwrap(), b"hello");
    }
}
