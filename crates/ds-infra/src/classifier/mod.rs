//! Content classification.
//!
//! Bytes are first tried as a keyed-object envelope; on success the decoded
//! object decides the kind (`was_wrapped = true`). Otherwise the bytes are a
//! raw payload and the type tag's conformance families decide, in a fixed
//! order, with a few content sniffs (zip magic, decodable image) up front.
//!
//! 内容分类：先尝试解码归档封装，否则按类型一致性判定原始数据。

pub mod keyed_archive;
pub mod rtf;
pub mod url_payload;
pub mod vcard;

use std::io::Cursor;
use std::sync::Arc;

use ds_core::content::{tags, CollectionShape, ContentKind, ContentMode, Glyph, PriorityRule, TypeFamily, TypeTag};
use ds_core::ports::{
    Classification, ClassificationError, ClassifyOptions, ContentClassifierPort, IconSource, PdfRendererPort,
};
use ds_core::PipelineConfig;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::render::ImageIconRenderer;
use keyed_archive::ArchivedObject;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub struct ContentClassifier {
    icons: ImageIconRenderer,
    pdf: Option<Arc<dyn PdfRendererPort>>,
    pdf_max_edge: u32,
}

impl ContentClassifier {
    pub fn new(icons: ImageIconRenderer, pdf: Option<Arc<dyn PdfRendererPort>>, pdf_max_edge: u32) -> Self {
        Self {
            icons,
            pdf,
            pdf_max_edge,
        }
    }

    pub fn from_config(config: &PipelineConfig, pdf: Option<Arc<dyn PdfRendererPort>>) -> Self {
        Self::new(
            ImageIconRenderer::new(config.icon_box, config.display_scale),
            pdf,
            config.pdf_preview_max_edge,
        )
    }

    fn image_icon(&self, decoded: DynamicImage, mode: ContentMode) -> Option<IconSource> {
        match self.icons.render_image(decoded, mode) {
            Ok(icon) => Some(IconSource::Image(icon)),
            Err(err) => {
                warn!(error = %err, "icon rendering failed");
                None
            }
        }
    }

    fn classify_wrapped(
        &self,
        object: ArchivedObject,
        type_tag: &TypeTag,
        options: ClassifyOptions,
    ) -> Classification {
        match object {
            ArchivedObject::String(text) => {
                let mut c = Classification::new(ContentKind::Text, true, type_tag.clone());
                c.propose_title(text, PriorityRule::WrappedString);
                c.propose_glyph(Glyph::Text, PriorityRule::StandardGlyph);
                c
            }
            ArchivedObject::AttributedString(text) => {
                let mut c = Classification::new(ContentKind::RichText, true, type_tag.clone());
                c.propose_title(text, PriorityRule::AttributedString);
                c.propose_glyph(Glyph::Text, PriorityRule::StandardGlyph);
                c
            }
            ArchivedObject::Color(color) => {
                let mut c = Classification::new(ContentKind::Color, true, type_tag.clone());
                c.propose_title(format!("Color {}", color.hex()), PriorityRule::ColorTitle);
                c.propose_glyph(Glyph::Color, PriorityRule::Fallback);
                c
            }
            ArchivedObject::Image(image_file) => self.classify_wrapped_image(&image_file, type_tag, options),
            ArchivedObject::MapItem => {
                let mut c = Classification::new(ContentKind::MapPlace, true, type_tag.clone());
                c.propose_glyph(Glyph::Map, PriorityRule::MapGlyphWrapped);
                c
            }
            ArchivedObject::Url(url) => {
                let mut c = Classification::new(ContentKind::Url, true, type_tag.clone());
                apply_url(&mut c, &url);
                c
            }
            ArchivedObject::List(count) => {
                let mut c = Classification::new(ContentKind::Collection(CollectionShape::List), true, type_tag.clone());
                c.propose_title(counted(count, "Item", "Items"), PriorityRule::CollectionTitle);
                c.propose_glyph(Glyph::Note, PriorityRule::Fallback);
                c
            }
            ArchivedObject::Map(count) => {
                let mut c = Classification::new(ContentKind::Collection(CollectionShape::Map), true, type_tag.clone());
                c.propose_title(counted(count, "Entry", "Entries"), PriorityRule::CollectionTitle);
                c.propose_glyph(Glyph::Note, PriorityRule::Fallback);
                c
            }
        }
    }

    fn classify_wrapped_image(
        &self,
        image_file: &[u8],
        type_tag: &TypeTag,
        options: ClassifyOptions,
    ) -> Classification {
        let mut c = Classification::new(ContentKind::Image, true, type_tag.clone());
        let Ok(decoded) = image::load_from_memory(image_file) else {
            c.propose_glyph(Glyph::Image, PriorityRule::StandardGlyph);
            return c;
        };

        if options.encode_image {
            let mut jpeg = Vec::new();
            match DynamicImage::ImageRgb8(decoded.to_rgb8()).write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg) {
                Ok(()) => {
                    debug!("re-encoding wrapped image as jpeg");
                    c.was_wrapped = false;
                    c.type_tag = TypeTag::from(tags::JPEG);
                    c.replacement_bytes = Some(jpeg);
                }
                Err(err) => warn!(error = %err, "jpeg re-encode failed, keeping wrapped image"),
            }
        }

        if let Some(icon) = self.image_icon(decoded, ContentMode::Fill) {
            c.propose_icon(icon, PriorityRule::ImageIcon, ContentMode::Fill);
        }
        c
    }

    fn classify_raw(&self, type_tag: &TypeTag, bytes: &[u8]) -> Classification {
        let mut tag = type_tag.clone();
        if (tag.as_str() == tags::FOLDER || tag.as_str() == tags::DATA) && bytes.starts_with(ZIP_MAGIC) {
            tag = TypeTag::from(tags::ZIP_ARCHIVE);
        }
        let mut c = Classification::new(ContentKind::RawData, false, tag.clone());

        if image::guess_format(bytes).is_ok() {
            if let Ok(decoded) = image::load_from_memory(bytes) {
                c.kind = ContentKind::Image;
                if let Some(icon) = self.image_icon(decoded, ContentMode::Fill) {
                    c.propose_icon(icon, PriorityRule::ImageIcon, ContentMode::Fill);
                }
                return c;
            }
        }

        if tag.conforms_to(TypeFamily::VCard) {
            if let Some(contact) = vcard::parse_first(bytes) {
                let accessory = contact.accessory_title();
                if !accessory.is_empty() {
                    c.accessory_title = Some(accessory);
                }
                let photo = contact
                    .photo
                    .as_deref()
                    .and_then(|p| image::load_from_memory(p).ok())
                    .and_then(|img| self.image_icon(img, ContentMode::Circle));
                if let Some(icon) = photo {
                    c.propose_icon(icon, PriorityRule::ContactPhoto, ContentMode::Circle);
                }
            }
            c.propose_glyph(Glyph::Person, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Utf8PlainText) {
            c.kind = ContentKind::Text;
            if let Ok(text) = std::str::from_utf8(bytes) {
                c.propose_title(text, PriorityRule::Utf8Text);
            }
            c.propose_glyph(Glyph::Text, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Utf16PlainText) {
            c.kind = ContentKind::Text;
            if let Some(text) = decode_utf16(bytes) {
                c.propose_title(text, PriorityRule::Utf16Text);
            }
            c.propose_glyph(Glyph::Text, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::EmailMessage) {
            c.propose_glyph(Glyph::Email, PriorityRule::EmailGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::MapItem) {
            c.kind = ContentKind::MapPlace;
            c.propose_glyph(Glyph::Map, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::RichText) {
            c.kind = ContentKind::RichText;
            if let Some(text) = rtf::plain_text(bytes) {
                c.propose_title(text, PriorityRule::RichTextTitle);
            }
            c.propose_glyph(Glyph::Text, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Url) {
            if let Some((url, _)) = url_payload::decode_url(bytes) {
                c.kind = ContentKind::Url;
                apply_url(&mut c, &url);
                return c;
            }
        }

        if tag.conforms_to(TypeFamily::Text) {
            c.kind = ContentKind::Text;
            if let Ok(text) = std::str::from_utf8(bytes) {
                c.propose_title(text, PriorityRule::GenericText);
            }
            c.propose_glyph(Glyph::Text, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Image) {
            c.propose_glyph(Glyph::Image, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Audio) {
            c.propose_glyph(Glyph::Audio, PriorityRule::MediaGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::AudioVisual) {
            c.propose_glyph(Glyph::Movie, PriorityRule::MediaGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Pdf) && self.apply_pdf_preview(&mut c, bytes) {
            return c;
        }

        if tag.conforms_to(TypeFamily::Content) {
            c.propose_glyph(Glyph::Block, PriorityRule::StandardGlyph);
            return c;
        }

        if tag.conforms_to(TypeFamily::Archive) {
            c.propose_glyph(Glyph::Archive, PriorityRule::MediaGlyph);
            return c;
        }

        c.kind = ContentKind::Unknown;
        c.propose_glyph(Glyph::Unknown, PriorityRule::Fallback);
        c
    }

    /// True when a preview was produced.
    fn apply_pdf_preview(&self, c: &mut Classification, bytes: &[u8]) -> bool {
        let Some(renderer) = &self.pdf else {
            return false;
        };
        let preview = match renderer.render_first_page(bytes, self.pdf_max_edge) {
            Ok(Some(preview)) => preview,
            Ok(None) => return false,
            Err(err) => {
                warn!(error = %err, "pdf preview failed");
                return false;
            }
        };
        let Some(pixels) = image::RgbaImage::from_raw(preview.width, preview.height, preview.rgba) else {
            return false;
        };
        let Some(icon) = self.image_icon(DynamicImage::ImageRgba8(pixels), ContentMode::Fill) else {
            return false;
        };
        if let Some(title) = preview.title {
            c.propose_title(title, PriorityRule::PdfDocumentTitle);
        }
        c.propose_icon(icon, PriorityRule::ImageIcon, ContentMode::Fill);
        true
    }
}

impl ContentClassifierPort for ContentClassifier {
    fn classify(
        &self,
        type_tag: &TypeTag,
        bytes: &[u8],
        options: ClassifyOptions,
    ) -> Result<Classification, ClassificationError> {
        if bytes.is_empty() {
            return Err(ClassificationError::Empty);
        }
        if let Some(object) = keyed_archive::decode(bytes) {
            debug!(type_tag = %type_tag, "unwrapped keyed object");
            return Ok(self.classify_wrapped(object, type_tag, options));
        }
        if bytes.starts_with(b"bplist") && keyed_archive::parse_plist(bytes).is_none() {
            return Err(ClassificationError::Corrupt("truncated binary property list".to_string()));
        }
        Ok(self.classify_raw(type_tag, bytes))
    }
}

fn counted(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("1 {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Title, glyph and enrichment request for a url.
fn apply_url(c: &mut Classification, raw: &str) {
    match url::Url::parse(raw) {
        Ok(parsed) if parsed.scheme() == "file" => {
            let name = parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(percent_decode)
                .unwrap_or_else(|| raw.to_string());
            c.propose_title(name, PriorityRule::UrlTitle);
            c.propose_glyph(Glyph::File, PriorityRule::StandardGlyph);
        }
        Ok(parsed) => {
            c.propose_title(raw, PriorityRule::UrlTitle);
            c.propose_glyph(Glyph::Link, PriorityRule::StandardGlyph);
            if matches!(parsed.scheme(), "http" | "https") {
                c.enrichment = Some(parsed.to_string());
            }
        }
        Err(_) => {
            c.propose_title(raw, PriorityRule::UrlTitle);
            c.propose_glyph(Glyph::Link, PriorityRule::StandardGlyph);
        }
    }
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = segment
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, big_endian) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        _ => (bytes, false),
    };
    if body.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::icon::png_fixture;
    use ds_core::content::Priority;
    use keyed_archive::Rgba;

    fn classifier() -> ContentClassifier {
        ContentClassifier::new(ImageIconRenderer::new((256, 256), 1.0), None, 1024)
    }

    fn classify(tag: &str, bytes: &[u8]) -> Classification {
        classifier()
            .classify(&TypeTag::from(tag), bytes, ClassifyOptions::default())
            .unwrap()
    }

    fn glyph(c: &Classification) -> Option<Glyph> {
        match c.icon.as_ref().map(|i| &i.source) {
            Some(IconSource::Glyph(g)) => Some(*g),
            _ => None,
        }
    }

    #[test]
    fn test_wrapped_and_raw_string_recover_same_text() {
        let text = "Grocery list\nmilk, eggs";
        let wrapped = classify(tags::UTF8_PLAIN_TEXT, &keyed_archive::encode_string(text).unwrap());
        assert!(wrapped.was_wrapped);
        assert_eq!(wrapped.kind, ContentKind::Text);
        assert_eq!(wrapped.title.as_ref().unwrap().0, text);
        assert_eq!(wrapped.title.as_ref().unwrap().1, PriorityRule::WrappedString.priority());

        let raw = classify(tags::UTF8_PLAIN_TEXT, text.as_bytes());
        assert!(!raw.was_wrapped);
        assert_eq!(raw.kind, ContentKind::Text);
        assert_eq!(raw.title.as_ref().unwrap().0, text);
        assert_eq!(raw.title.as_ref().unwrap().1, PriorityRule::Utf8Text.priority());
    }

    #[test]
    fn test_utf16_ranks_below_utf8() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let c = classify(tags::UTF16_PLAIN_TEXT, &bytes);
        assert_eq!(c.title, Some(("hi".to_string(), Priority::new(8))));
    }

    #[test]
    fn test_wrapped_color_gets_hex_title() {
        let bytes = keyed_archive::encode_color(Rgba {
            red: 0.0,
            green: 0.0,
            blue: 1.0,
            alpha: 1.0,
        })
        .unwrap();
        let c = classify("com.apple.uikit.color", &bytes);
        assert_eq!(c.kind, ContentKind::Color);
        assert_eq!(c.title.as_ref().unwrap().0, "Color #0000FF");
        assert_eq!(glyph(&c), Some(Glyph::Color));
    }

    #[test]
    fn test_wrapped_list_counts_items() {
        let one = classify("com.example.list", &keyed_archive::encode_string_list(&["a"]).unwrap());
        assert_eq!(one.title.unwrap().0, "1 Item");
        let three = classify("com.example.list", &keyed_archive::encode_string_list(&["a", "b", "c"]).unwrap());
        assert_eq!(three.kind, ContentKind::Collection(CollectionShape::List));
        assert_eq!(three.title.unwrap().0, "3 Items");
    }

    #[test]
    fn test_http_url_requests_enrichment() {
        let c = classify(tags::URL, &url_payload::encode_link_list("https://example.com/a").unwrap());
        assert_eq!(c.kind, ContentKind::Url);
        assert_eq!(c.title.as_ref().unwrap().0, "https://example.com/a");
        assert_eq!(c.enrichment.as_deref(), Some("https://example.com/a"));
        assert_eq!(glyph(&c), Some(Glyph::Link));
    }

    #[test]
    fn test_file_url_is_terminal() {
        let c = classify(tags::FILE_URL, b"file:///Users/me/My%20Report.pdf");
        assert_eq!(c.title.as_ref().unwrap().0, "My Report.pdf");
        assert!(c.enrichment.is_none());
        assert_eq!(glyph(&c), Some(Glyph::File));
    }

    #[test]
    fn test_raw_image_fills_icon() {
        let c = classify(tags::PNG, &png_fixture(600, 300));
        assert_eq!(c.kind, ContentKind::Image);
        let icon = c.icon.unwrap();
        assert_eq!(icon.priority, PriorityRule::ImageIcon.priority());
        assert_eq!(icon.content_mode, ContentMode::Fill);
        match icon.source {
            IconSource::Image(rendered) => assert_eq!((rendered.width, rendered.height), (256, 256)),
            other => panic!("expected image icon, got {other:?}"),
        }
    }

    #[test]
    fn test_wrapped_image_is_reencoded_when_asked() {
        let wrapped = keyed_archive::encode_image(&png_fixture(20, 10)).unwrap();
        let c = classifier()
            .classify(&TypeTag::from(tags::IMAGE), &wrapped, ClassifyOptions { encode_image: true })
            .unwrap();
        assert!(!c.was_wrapped);
        assert_eq!(c.type_tag.as_str(), tags::JPEG);
        let jpeg = c.replacement_bytes.unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let kept = classify(tags::IMAGE, &wrapped);
        assert!(kept.was_wrapped);
        assert!(kept.replacement_bytes.is_none());
    }

    #[test]
    fn test_zip_sniffing_rewrites_generic_tags() {
        let mut zip = ZIP_MAGIC.to_vec();
        zip.extend_from_slice(&[0u8; 32]);
        let c = classify(tags::FOLDER, &zip);
        assert_eq!(c.type_tag.as_str(), tags::ZIP_ARCHIVE);
        assert_eq!(glyph(&c), Some(Glyph::Archive));
        assert_eq!(c.icon.unwrap().priority, PriorityRule::MediaGlyph.priority());
    }

    #[test]
    fn test_vcard_builds_accessory_title() {
        let card = b"BEGIN:VCARD\nN:Doe;Jane;;;\nTITLE:CTO\nORG:Acme\nEND:VCARD\n";
        let c = classify(tags::VCARD, card);
        assert_eq!(c.accessory_title.as_deref(), Some("Jane Doe - CTO, Acme"));
        assert_eq!(glyph(&c), Some(Glyph::Person));
        assert!(c.title.is_none());
    }

    #[test]
    fn test_rich_text_projection() {
        let c = classify(tags::RTF, br"{\rtf1\ansi Hello\par World}");
        assert_eq!(c.kind, ContentKind::RichText);
        assert_eq!(c.title.unwrap(), ("Hello\nWorld".to_string(), PriorityRule::RichTextTitle.priority()));
    }

    #[test]
    fn test_media_and_document_glyphs() {
        assert_eq!(glyph(&classify("public.mpeg-4", b"\0\0\0\x18ftypmp42")), Some(Glyph::Movie));
        assert_eq!(glyph(&classify("public.mp3", b"ID3\x03")), Some(Glyph::Audio));
        assert_eq!(glyph(&classify(tags::PDF, b"%PDF-1.7")), Some(Glyph::Block));
        assert_eq!(glyph(&classify("public.jpeg", b"\xFF\xD8 broken")), Some(Glyph::Image));
        assert_eq!(glyph(&classify(tags::EMAIL_MESSAGE, b"From: a@b")), Some(Glyph::Email));
    }

    #[test]
    fn test_unknown_payload_gets_unknown_glyph() {
        let c = classify("com.example.opaque", b"\x01\x02\x03");
        assert_eq!(c.kind, ContentKind::Unknown);
        assert_eq!(glyph(&c), Some(Glyph::Unknown));
        assert_eq!(c.icon.unwrap().priority.value(), 0);
    }

    #[test]
    fn test_unreadable_bytes_are_errors() {
        let classifier = classifier();
        let tag = TypeTag::from(tags::UTF8_PLAIN_TEXT);
        assert!(matches!(
            classifier.classify(&tag, b"", ClassifyOptions::default()),
            Err(ClassificationError::Empty)
        ));
        assert!(matches!(
            classifier.classify(&tag, b"bplist00\x01garbage", ClassifyOptions::default()),
            Err(ClassificationError::Corrupt(_))
        ));
    }
}
