//! Minimal vCard reader: names, job, organisation and an embedded photo.

use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Contact {
    pub given: String,
    pub middle: String,
    pub family: String,
    pub formatted: String,
    pub job_title: String,
    pub organization: String,
    pub photo: Option<Vec<u8>>,
}

impl Contact {
    /// "Given Middle Family - Job, Org", skipping empty parts.
    pub fn accessory_title(&self) -> String {
        let mut name = [self.given.as_str(), self.middle.as_str(), self.family.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            name = self.formatted.clone();
        }
        let job = [self.job_title.as_str(), self.organization.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        [name, job]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

fn unescape(value: &str) -> String {
    value
        .replace("\\n", "\n")
        .replace("\\N", "\n")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}

fn decode_photo(params: &[&str], value: &str) -> Option<Vec<u8>> {
    if let Some(rest) = value.strip_prefix("data:") {
        let (_, payload) = rest.split_once(',')?;
        return STANDARD.decode(payload.trim()).ok();
    }
    let inline = params.iter().any(|p| {
        let p = p.to_ascii_uppercase();
        p == "ENCODING=B" || p == "ENCODING=BASE64" || p == "BASE64"
    });
    if inline {
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        return STANDARD.decode(cleaned).ok();
    }
    None
}

/// Parses the first card in `bytes`. `None` when there is no card.
pub fn parse_first(bytes: &[u8]) -> Option<Contact> {
    let text = String::from_utf8_lossy(bytes);
    let mut contact = Contact::default();
    let mut inside = false;

    for line in unfold(&text) {
        let Some((head, value)) = line.split_once(':') else {
            continue;
        };
        let mut parts = head.split(';');
        let name = parts.next().unwrap_or("").to_ascii_uppercase();
        // group prefix: "item1.TEL"
        let name = name.rsplit('.').next().unwrap_or("").to_string();
        let params: Vec<&str> = parts.collect();

        match name.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VCARD") => inside = true,
            "END" if value.eq_ignore_ascii_case("VCARD") => {
                if inside {
                    return Some(contact);
                }
            }
            _ if !inside => {}
            "N" => {
                let fields: Vec<&str> = value.split(';').collect();
                contact.family = unescape(fields.first().copied().unwrap_or("")).trim().to_string();
                contact.given = unescape(fields.get(1).copied().unwrap_or("")).trim().to_string();
                contact.middle = unescape(fields.get(2).copied().unwrap_or("")).trim().to_string();
            }
            "FN" => contact.formatted = unescape(value).trim().to_string(),
            "TITLE" => contact.job_title = unescape(value).trim().to_string(),
            "ORG" => {
                contact.organization = unescape(value.split(';').next().unwrap_or("")).trim().to_string()
            }
            "PHOTO" if contact.photo.is_none() => contact.photo = decode_photo(&params, value),
            _ => {}
        }
    }
    inside.then_some(contact)
}
