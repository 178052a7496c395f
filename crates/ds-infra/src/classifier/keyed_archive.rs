//! Legacy keyed-object envelope.
//!
//! Payloads produced by an object archiver: a property list (binary or XML)
//! holding `$archiver`, `$top.root` and a flat `$objects` table that objects
//! reference by UID. Only the handful of classes a drop shelf ever receives are
//! understood; anything else makes [`decode`] return `None` so the bytes are
//! treated as a raw payload.
//!
//! 旧式归档封装的解码与编码。

use std::io::Cursor;

use plist::{Dictionary, Uid, Value};

const ARCHIVER: &str = "NSKeyedArchiver";
const ARCHIVE_VERSION: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    /// `#RRGGBB`, channels clamped to `[0, 1]`.
    pub fn hex(&self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.red),
            channel(self.green),
            channel(self.blue)
        )
    }
}

/// An object recovered from the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchivedObject {
    String(String),
    AttributedString(String),
    Color(Rgba),
    /// Encoded image file bytes found inside the archived image.
    Image(Vec<u8>),
    Url(String),
    MapItem,
    List(usize),
    Map(usize),
}

/// Cheap check for a property list header.
pub fn looks_like_plist(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"bplist") {
        return true;
    }
    let head = &bytes[..bytes.len().min(64)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    head.starts_with("<?xml") || head.starts_with("<plist") || head.starts_with("<!DOCTYPE plist")
}

/// Parses a property list, keyed or not.
pub fn parse_plist(bytes: &[u8]) -> Option<Value> {
    if !looks_like_plist(bytes) {
        return None;
    }
    Value::from_reader(Cursor::new(bytes)).ok()
}

struct Archive<'a> {
    objects: &'a [Value],
}

impl<'a> Archive<'a> {
    fn resolve(&self, value: &'a Value) -> Option<&'a Value> {
        match value {
            Value::Uid(uid) => self.objects.get(uid.get() as usize),
            other => Some(other),
        }
    }

    fn field(&self, dict: &'a Dictionary, key: &str) -> Option<&'a Value> {
        dict.get(key).and_then(|v| self.resolve(v))
    }

    fn class_names(&self, dict: &'a Dictionary) -> Vec<&'a str> {
        let Some(Value::Dictionary(class)) = self.field(dict, "$class") else {
            return Vec::new();
        };
        let mut names: Vec<&str> = class
            .get("$classname")
            .and_then(Value::as_string)
            .into_iter()
            .collect();
        if let Some(Value::Array(chain)) = class.get("$classes") {
            names.extend(chain.iter().filter_map(Value::as_string));
        }
        names
    }

    fn string_at(&self, value: &'a Value) -> Option<String> {
        match self.resolve(value)? {
            Value::String(s) => Some(s.clone()),
            Value::Dictionary(dict) => self
                .field(dict, "NS.string")
                .and_then(Value::as_string)
                .map(str::to_string)
                .or_else(|| {
                    self.field(dict, "NS.bytes")
                        .and_then(Value::as_data)
                        .map(|d| String::from_utf8_lossy(d).into_owned())
                }),
            _ => None,
        }
    }

    fn decode_root(&self, root: &'a Value) -> Option<ArchivedObject> {
        match self.resolve(root)? {
            Value::String(s) if s != "$null" => Some(ArchivedObject::String(s.clone())),
            Value::Dictionary(dict) => self.decode_object(dict),
            _ => None,
        }
    }

    fn decode_object(&self, dict: &'a Dictionary) -> Option<ArchivedObject> {
        let classes = self.class_names(dict);
        let is = |name: &str| classes.iter().any(|c| *c == name);

        if is("NSAttributedString") || is("NSMutableAttributedString") {
            let text = dict.get("NSString").and_then(|v| self.string_at(v))?;
            return Some(ArchivedObject::AttributedString(text));
        }
        if is("NSString") || is("NSMutableString") {
            return dict
                .get("NS.string")
                .and_then(|v| self.string_at(v))
                .map(ArchivedObject::String);
        }
        if is("NSURL") {
            let relative = dict.get("NS.relative").and_then(|v| self.string_at(v))?;
            let base = dict.get("NS.base").and_then(|v| self.string_at(v));
            return Some(ArchivedObject::Url(join_url(base.as_deref(), &relative)));
        }
        if is("UIColor") || is("NSColor") {
            return self.decode_color(dict).map(ArchivedObject::Color);
        }
        if is("UIImage") || is("NSImage") {
            return self.find_image_data(dict, 0).map(ArchivedObject::Image);
        }
        if is("MKMapItem") {
            return Some(ArchivedObject::MapItem);
        }
        if is("NSDictionary") || is("NSMutableDictionary") {
            let count = self.field(dict, "NS.keys").and_then(Value::as_array).map_or(0, Vec::len);
            return Some(ArchivedObject::Map(count));
        }
        if is("NSArray") || is("NSMutableArray") || is("NSSet") || is("NSMutableSet") || is("NSOrderedSet") {
            let count = self.field(dict, "NS.objects").and_then(Value::as_array).map_or(0, Vec::len);
            return Some(ArchivedObject::List(count));
        }
        None
    }

    fn decode_color(&self, dict: &'a Dictionary) -> Option<Rgba> {
        let real = |key: &str| self.field(dict, key).and_then(|v| v.as_real().or_else(|| v.as_signed_integer().map(|i| i as f64)));
        if let (Some(red), Some(green), Some(blue)) = (real("UIRed"), real("UIGreen"), real("UIBlue")) {
            return Some(Rgba {
                red,
                green,
                blue,
                alpha: real("UIAlpha").unwrap_or(1.0),
            });
        }
        if let Some(white) = real("UIWhite") {
            return Some(Rgba {
                red: white,
                green: white,
                blue: white,
                alpha: real("UIAlpha").unwrap_or(1.0),
            });
        }
        // NSRGB / NSWhite hold ASCII floats separated by spaces.
        let floats = |key: &str| -> Option<Vec<f64>> {
            let data = self.field(dict, key)?.as_data()?;
            let text = String::from_utf8_lossy(data);
            let parsed: Vec<f64> = text
                .trim_end_matches('\0')
                .split_whitespace()
                .filter_map(|p| p.parse().ok())
                .collect();
            (!parsed.is_empty()).then_some(parsed)
        };
        if let Some(c) = floats("NSRGB") {
            if c.len() >= 3 {
                return Some(Rgba {
                    red: c[0],
                    green: c[1],
                    blue: c[2],
                    alpha: c.get(3).copied().unwrap_or(1.0),
                });
            }
        }
        if let Some(c) = floats("NSWhite") {
            return Some(Rgba {
                red: c[0],
                green: c[0],
                blue: c[0],
                alpha: c.get(1).copied().unwrap_or(1.0),
            });
        }
        None
    }

    /// First data blob under the image object that looks like an image file.
    fn find_image_data(&self, dict: &'a Dictionary, depth: usize) -> Option<Vec<u8>> {
        if depth > 6 {
            return None;
        }
        for (key, value) in dict.iter() {
            if key == "$class" {
                continue;
            }
            let Some(resolved) = self.resolve(value) else {
                continue;
            };
            match resolved {
                Value::Data(data) if image::guess_format(data).is_ok() => return Some(data.clone()),
                Value::Dictionary(inner) => {
                    if let Some(found) = self.find_image_data(inner, depth + 1) {
                        return Some(found);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(Value::Dictionary(inner)) = self.resolve(item) {
                            if let Some(found) = self.find_image_data(inner, depth + 1) {
                                return Some(found);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}

fn join_url(base: Option<&str>, relative: &str) -> String {
    match base.and_then(|b| url::Url::parse(b).ok()) {
        Some(base) => base
            .join(relative)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| relative.to_string()),
        None => relative.to_string(),
    }
}

/// Decodes a keyed archive. `None` means "not an archive we understand".
pub fn decode(bytes: &[u8]) -> Option<ArchivedObject> {
    let Value::Dictionary(top) = parse_plist(bytes)? else {
        return None;
    };
    if top.get("$archiver").and_then(Value::as_string) != Some(ARCHIVER) {
        return None;
    }
    let objects = top.get("$objects")?.as_array()?;
    let root = top.get("$top")?.as_dictionary()?.get("root")?;
    Archive { objects }.decode_root(root)
}

/// Builds keyed archives for the classes the pipeline writes back.
struct ArchiveBuilder {
    objects: Vec<Value>,
}

impl ArchiveBuilder {
    fn new() -> Self {
        Self {
            objects: vec![Value::String("$null".to_string())],
        }
    }

    fn push(&mut self, value: Value) -> Uid {
        self.objects.push(value);
        Uid::new((self.objects.len() - 1) as u64)
    }

    fn class(&mut self, name: &str) -> Uid {
        let mut class = Dictionary::new();
        class.insert("$classname".to_string(), Value::String(name.to_string()));
        class.insert(
            "$classes".to_string(),
            Value::Array(vec![
                Value::String(name.to_string()),
                Value::String("NSObject".to_string()),
            ]),
        );
        self.push(Value::Dictionary(class))
    }

    fn finish(self, root: Uid) -> anyhow::Result<Vec<u8>> {
        let mut top = Dictionary::new();
        top.insert("root".to_string(), Value::Uid(root));
        let mut archive = Dictionary::new();
        archive.insert("$archiver".to_string(), Value::String(ARCHIVER.to_string()));
        archive.insert("$version".to_string(), Value::Integer(ARCHIVE_VERSION.into()));
        archive.insert("$top".to_string(), Value::Dictionary(top));
        archive.insert("$objects".to_string(), Value::Array(self.objects));
        let mut out = Vec::new();
        Value::Dictionary(archive).to_writer_binary(&mut out)?;
        Ok(out)
    }
}

/// Wraps a string the way the archiver stores a plain `NSString`.
pub fn encode_string(text: &str) -> anyhow::Result<Vec<u8>> {
    let mut builder = ArchiveBuilder::new();
    let root = builder.push(Value::String(text.to_string()));
    builder.finish(root)
}

pub fn encode_url(url: &str) -> anyhow::Result<Vec<u8>> {
    let mut builder = ArchiveBuilder::new();
    let relative = builder.push(Value::String(url.to_string()));
    let class = builder.class("NSURL");
    let mut object = Dictionary::new();
    object.insert("NS.base".to_string(), Value::Uid(Uid::new(0)));
    object.insert("NS.relative".to_string(), Value::Uid(relative));
    object.insert("$class".to_string(), Value::Uid(class));
    let root = builder.push(Value::Dictionary(object));
    builder.finish(root)
}

pub fn encode_color(color: Rgba) -> anyhow::Result<Vec<u8>> {
    let mut builder = ArchiveBuilder::new();
    let class = builder.class("UIColor");
    let mut object = Dictionary::new();
    object.insert("UIRed".to_string(), Value::Real(color.red));
    object.insert("UIGreen".to_string(), Value::Real(color.green));
    object.insert("UIBlue".to_string(), Value::Real(color.blue));
    object.insert("UIAlpha".to_string(), Value::Real(color.alpha));
    object.insert("$class".to_string(), Value::Uid(class));
    let root = builder.push(Value::Dictionary(object));
    builder.finish(root)
}

pub fn encode_image(image_file: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut builder = ArchiveBuilder::new();
    let class = builder.class("UIImage");
    let mut object = Dictionary::new();
    object.insert("UIImageData".to_string(), Value::Data(image_file.to_vec()));
    object.insert("$class".to_string(), Value::Uid(class));
    let root = builder.push(Value::Dictionary(object));
    builder.finish(root)
}

pub fn encode_string_list(items: &[&str]) -> anyhow::Result<Vec<u8>> {
    let mut builder = ArchiveBuilder::new();
    let refs: Vec<Value> = items
        .iter()
        .map(|s| Value::Uid(builder.push(Value::String(s.to_string()))))
        .collect();
    let class = builder.class("NSArray");
    let mut object = Dictionary::new();
    object.insert("NS.objects".to_string(), Value::Array(refs));
    object.insert("$class".to_string(), Value::Uid(class));
    let root = builder.push(Value::Dictionary(object));
    builder.finish(root)
}

/// Writes a plain (non-keyed) binary property list.
pub fn write_plain_plist(value: &Value) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    value.to_writer_binary(&mut out)?;
    Ok(out)
}
