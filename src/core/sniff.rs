//! Content-type detection from leading bytes
//!
//! Implements the WHATWG MIME sniffing rules as a fixed signature table: at most
//! the first [`SNIFF_LEN`] bytes are examined, signatures are tried in order, and
//! the first match wins. Data that matches nothing and contains no binary control
//! bytes is plain text; anything else is `application/octet-stream`.

/// Number of leading bytes examined
pub const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_UTF8: &str = "text/plain; charset=utf-8";

enum Signature {
    /// HTML tag or comment opener, case-insensitive, followed by space or `>`
    Html(&'static [u8]),
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
        content_type: &'static str,
    },
    Exact {
        prefix: &'static [u8],
        content_type: &'static str,
    },
    Mp4,
    Text,
}

const fn exact(prefix: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Exact {
        prefix,
        content_type,
    }
}

const fn masked(
    mask: &'static [u8],
    pattern: &'static [u8],
    content_type: &'static str,
) -> Signature {
    Signature::Masked {
        mask,
        pattern,
        skip_ws: false,
        content_type,
    }
}

const RIFF_MASK: &[u8] = b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF";

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_ws: true,
        content_type: "text/xml; charset=utf-8",
    },
    exact(b"%PDF-", "application/pdf"),
    exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks
    masked(b"\xFF\xFF\x00\x00", b"\xFE\xFF\x00\x00", "text/plain; charset=utf-16be"),
    masked(b"\xFF\xFF\x00\x00", b"\xFF\xFE\x00\x00", "text/plain; charset=utf-16le"),
    masked(b"\xFF\xFF\xFF\x00", b"\xEF\xBB\xBF\x00", TEXT_UTF8),
    // Images
    exact(b"\x00\x00\x01\x00", "image/x-icon"),
    exact(b"\x00\x00\x02\x00", "image/x-icon"),
    exact(b"BM", "image/bmp"),
    exact(b"GIF87a", "image/gif"),
    exact(b"GIF89a", "image/gif"),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WEBPVP",
        "image/webp",
    ),
    exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video
    masked(RIFF_MASK, b"FORM\x00\x00\x00\x00AIFF", "audio/aiff"),
    masked(b"\xFF\xFF\xFF", b"ID3", "audio/mpeg"),
    masked(b"\xFF\xFF\xFF\xFF\xFF", b"OggS\x00", "application/ogg"),
    masked(
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"MThd\x00\x00\x00\x06",
        "audio/midi",
    ),
    masked(RIFF_MASK, b"RIFF\x00\x00\x00\x00AVI ", "video/avi"),
    masked(RIFF_MASK, b"RIFF\x00\x00\x00\x00WAVE", "audio/wave"),
    Signature::Mp4,
    exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts
    exact(b"\x00\x01\x00\x00", "font/ttf"),
    exact(b"OTTO", "font/otf"),
    exact(b"ttcf", "font/collection"),
    exact(b"wOFF", "font/woff"),
    exact(b"wOF2", "font/woff2"),
    // Archives
    exact(b"\x1F\x8B\x08", "application/x-gzip"),
    exact(b"PK\x03\x04", "application/zip"),
    exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    exact(b"\x00\x61\x73\x6D", "application/wasm"),
    Signature::Text,
];

/// Detect the content type of `data`
///
/// Always returns a valid MIME type. Empty input is plain UTF-8 text.
///
/// ```
/// use skystash::core::sniff::detect_content_type;
///
/// assert_eq!(detect_content_type(b"\x89PNG\r\n\x1a\n...."), "image/png");
/// assert_eq!(detect_content_type(b"hello"), "text/plain; charset=utf-8");
/// ```
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data.iter().position(|&b| !is_ws(b)).unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|sig| sig.matches(data, first_non_ws))
        .unwrap_or(OCTET_STREAM)
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Html(tag) => {
                let data = &data[first_non_ws..];
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let same = tag.iter().zip(data).all(|(&t, &d)| {
                    if t.is_ascii_uppercase() {
                        d & 0xDF == t
                    } else {
                        d == t
                    }
                });
                (same && is_tag_terminator(data[tag.len()])).then_some("text/html; charset=utf-8")
            }
            Signature::Masked {
                mask,
                pattern,
                skip_ws,
                content_type,
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                pattern
                    .iter()
                    .zip(mask.iter())
                    .zip(data)
                    .all(|((&p, &m), &d)| d & m == p)
                    .then_some(*content_type)
            }
            Signature::Exact {
                prefix,
                content_type,
            } => data.starts_with(prefix).then_some(*content_type),
            Signature::Mp4 => is_mp4(data).then_some("video/mp4"),
            Signature::Text => data[first_non_ws..]
                .iter()
                .all(|&b| !is_binary(b))
                .then_some(TEXT_UTF8),
        }
    }
}

/// ISO base media file with an `ftyp` box naming an mp4 brand
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    // Offset 12 holds the minor version, not a brand
    (8..box_size)
        .step_by(4)
        .filter(|&start| start != 12)
        .any(|start| &data[start..start + 3] == b"mp4")
}

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | 0x0C | b'\r' | b' ')
}

fn is_tag_terminator(b: u8) -> bool {
    b == b' ' || b == b'>'
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
