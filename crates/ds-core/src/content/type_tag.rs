//! Type tags and their conformance families.
//!
//! A tag is whatever identifier the drop source attached to a representation:
//! a UTI (`public.utf8-plain-text`) or a MIME type (`text/plain;charset=utf-8`).
//! Classification never inspects the raw string directly; it asks whether a tag
//! conforms to one of the closed [`TypeFamily`] values.

use serde::{Deserialize, Serialize};

/// Well-known tag identifiers.
/// 常用类型标识。
pub mod tags {
    pub const PLAIN_TEXT: &str = "public.plain-text";
    pub const UTF8_PLAIN_TEXT: &str = "public.utf8-plain-text";
    pub const UTF16_PLAIN_TEXT: &str = "public.utf16-plain-text";
    pub const RTF: &str = "public.rtf";
    pub const FLAT_RTFD: &str = "com.apple.flat-rtfd";
    pub const ATTRIBUTED_STRING: &str = "com.apple.uikit.attributedstring";
    pub const URL: &str = "public.url";
    pub const FILE_URL: &str = "public.file-url";
    pub const IMAGE: &str = "public.image";
    pub const JPEG: &str = "public.jpeg";
    pub const PNG: &str = "public.png";
    pub const PDF: &str = "com.adobe.pdf";
    pub const ZIP_ARCHIVE: &str = "public.zip-archive";
    pub const VCARD: &str = "public.vcard";
    pub const EMAIL_MESSAGE: &str = "public.email-message";
    pub const MAIL_EMAIL: &str = "com.apple.mail.email";
    pub const MAP_ITEM: &str = "com.apple.mapkit.map-item";
    pub const DATA: &str = "public.data";
    pub const FOLDER: &str = "public.folder";
    pub const WEB_ARCHIVE: &str = "com.apple.webarchive";
}

/// Conformance families a tag can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Text,
    PlainText,
    Utf8PlainText,
    Utf16PlainText,
    RichText,
    Url,
    FileUrl,
    Image,
    AudioVisual,
    Movie,
    Audio,
    Pdf,
    Archive,
    Zip,
    VCard,
    EmailMessage,
    MapItem,
    Content,
    Data,
    Folder,
    WebArchive,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `image/png` → (`image`, `png`, charset). None for UTIs.
    fn mime_parts(&self) -> Option<(String, String, Option<String>)> {
        let lower = self.0.to_ascii_lowercase();
        let mut params = lower.split(';');
        let essence = params.next()?.trim();
        let (top, sub) = essence.split_once('/')?;
        let charset = params.find_map(|p| {
            let (k, v) = p.trim().split_once('=')?;
            (k.trim() == "charset").then(|| v.trim().trim_matches('"').to_string())
        });
        Some((top.to_string(), sub.to_string(), charset))
    }

    fn is_uti(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|c| self.0 == *c)
    }

    fn is_mime(&self, candidates: &[&str]) -> bool {
        self.mime_parts()
            .map(|(top, sub, _)| {
                let essence = format!("{top}/{sub}");
                candidates.iter().any(|c| essence == *c)
            })
            .unwrap_or(false)
    }

    fn has_mime_top(&self, top_level: &str) -> bool {
        self.mime_parts()
            .map(|(top, _, _)| top == top_level)
            .unwrap_or(false)
    }

    pub fn conforms_to(&self, family: TypeFamily) -> bool {
        use TypeFamily::*;
        match family {
            Utf8PlainText => {
                self.is_uti(&[tags::UTF8_PLAIN_TEXT, "public.utf8-tab-separated-values-text"])
                    || self.mime_parts().is_some_and(|(top, sub, charset)| {
                        top == "text"
                            && sub == "plain"
                            && charset.as_deref().map_or(true, |c| c == "utf-8" || c == "utf8")
                    })
            }
            Utf16PlainText => {
                self.is_uti(&[tags::UTF16_PLAIN_TEXT, "public.utf16-external-plain-text"])
                    || self.mime_parts().is_some_and(|(top, sub, charset)| {
                        top == "text"
                            && sub == "plain"
                            && charset.as_deref().is_some_and(|c| c.starts_with("utf-16"))
                    })
            }
            PlainText => {
                self.is_uti(&[tags::PLAIN_TEXT])
                    || self.conforms_to(Utf8PlainText)
                    || self.conforms_to(Utf16PlainText)
                    || self.is_mime(&["text/plain"])
            }
            RichText => {
                self.is_uti(&[tags::RTF, "com.apple.rtfd", tags::FLAT_RTFD, tags::ATTRIBUTED_STRING])
                    || self.is_mime(&["text/rtf", "application/rtf"])
            }
            Text => {
                self.is_uti(&[
                    "public.text",
                    "public.html",
                    "public.xml",
                    "public.json",
                    "public.source-code",
                    "public.url-name",
                    tags::VCARD,
                ]) || self.conforms_to(PlainText)
                    || self.conforms_to(RichText)
                    || self.has_mime_top("text")
                    || self.is_mime(&["application/json", "application/xml"])
            }
            FileUrl => self.is_uti(&[tags::FILE_URL]),
            Url => {
                self.is_uti(&[tags::URL, "com.apple.webloc"])
                    || self.conforms_to(FileUrl)
                    || self.is_mime(&["text/uri-list", "text/x-uri"])
            }
            Image => {
                self.is_uti(&[
                    tags::IMAGE,
                    tags::JPEG,
                    tags::PNG,
                    "public.tiff",
                    "public.heic",
                    "public.heif",
                    "com.compuserve.gif",
                    "com.microsoft.bmp",
                    "com.microsoft.ico",
                    "org.webmproject.webp",
                    "public.svg-image",
                    "com.apple.icns",
                ]) || self.0.starts_with("public.image.")
                    || self.has_mime_top("image")
            }
            Movie => {
                self.is_uti(&[
                    "public.movie",
                    "public.video",
                    "public.mpeg-4",
                    "public.avi",
                    "com.apple.quicktime-movie",
                    "org.matroska.mkv",
                ]) || self.has_mime_top("video")
            }
            Audio => {
                self.is_uti(&[
                    "public.audio",
                    "public.mp3",
                    "public.mpeg-4-audio",
                    "public.aiff-audio",
                    "public.aifc-audio",
                    "com.microsoft.waveform-audio",
                    "org.xiph.flac",
                ]) || self.has_mime_top("audio")
            }
            AudioVisual => {
                self.is_uti(&["public.audiovisual-content"])
                    || self.conforms_to(Movie)
                    || self.conforms_to(Audio)
            }
            Pdf => self.is_uti(&[tags::PDF]) || self.is_mime(&["application/pdf"]),
            Zip => {
                self.is_uti(&[tags::ZIP_ARCHIVE, "com.pkware.zip-archive"])
                    || self.is_mime(&["application/zip", "application/x-zip-compressed"])
            }
            Archive => {
                self.is_uti(&[
                    "public.archive",
                    "org.gnu.gnu-zip-archive",
                    "org.gnu.gnu-tar-archive",
                    "public.tar-archive",
                    "org.7-zip.7-zip-archive",
                ]) || self.conforms_to(Zip)
                    || self.is_mime(&[
                        "application/gzip",
                        "application/x-tar",
                        "application/x-7z-compressed",
                    ])
            }
            VCard => self.is_uti(&[tags::VCARD]) || self.is_mime(&["text/vcard", "text/x-vcard"]),
            EmailMessage => {
                self.is_uti(&[tags::EMAIL_MESSAGE, tags::MAIL_EMAIL])
                    || self.is_mime(&["message/rfc822"])
            }
            MapItem => self.is_uti(&[tags::MAP_ITEM]),
            Data => self.is_uti(&[tags::DATA]) || self.is_mime(&["application/octet-stream"]),
            Folder => self.is_uti(&[tags::FOLDER, "public.directory"]),
            WebArchive => self.is_uti(&[tags::WEB_ARCHIVE]),
            Content => {
                self.is_uti(&[
                    "public.content",
                    "public.composite-content",
                    "public.presentation",
                    "public.spreadsheet",
                    "com.microsoft.word.doc",
                    "com.microsoft.excel.xls",
                    "com.microsoft.powerpoint.ppt",
                    tags::WEB_ARCHIVE,
                ]) || self.0.starts_with("org.openxmlformats.")
                    || self.0.starts_with("com.apple.iwork.")
                    || self.0.starts_with("org.oasis-open.opendocument.")
                    || self
                        .mime_parts()
                        .is_some_and(|(top, sub, _)| top == "application" && sub.starts_with("vnd."))
                    || self.is_mime(&["application/msword"])
                    || self.conforms_to(Text)
                    || self.conforms_to(Image)
                    || self.conforms_to(AudioVisual)
                    || self.conforms_to(Pdf)
            }
        }
    }

    /// A more specific image tag such as `public.image.jpeg`.
    pub fn is_image_subtype(&self) -> bool {
        self.0.starts_with("public.image.")
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TypeTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}
