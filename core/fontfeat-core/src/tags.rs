/// Four-character OpenType tags, in and out of their human spelling
///
/// Feature tags travel through fontfeat in two costumes: the packed 4-byte
/// `Tag` the font engine hands us, and the plain string the catalog stores
/// and the command line accepts. These helpers move between the two and
/// refuse anything that could never have been a tag in the first place.
///
/// Made with curiosity at FontLab https://www.fontlab.com/
use read_fonts::types::Tag;
use thiserror::Error;

/// Table carrying glyph substitution features (ligatures, alternates).
pub const GSUB: Tag = Tag::new(b"GSUB");
/// Table carrying glyph positioning features (kerning, mark attachment).
pub const GPOS: Tag = Tag::new(b"GPOS");
/// Glyph definition table, the cheap "has OpenType layout" signal.
pub const GDEF: Tag = Tag::new(b"GDEF");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tag must be 1-4 printable ASCII chars: {0:?}")]
    Length(String),
    #[error("tag byte out of range: {0:?}")]
    Byte(String),
}

/// Turns a 1-4 character string such as `"liga"` or `"ss01"` into a `Tag`.
///
/// Short input is padded with spaces, the way OpenType pads
/// three-letter script tags.
pub fn tag4(raw: &str) -> Result<Tag, TagError> {
    if raw.is_empty() || raw.len() > 4 {
        return Err(TagError::Length(raw.to_string()));
    }

    let mut buf = [b' '; 4];
    for (i, byte) in raw.as_bytes().iter().take(4).enumerate() {
        if !(0x20..=0x7E).contains(byte) {
            return Err(TagError::Byte(raw.to_string()));
        }
        buf[i] = *byte;
    }

    Ok(Tag::new(&buf))
}

/// Spells a tag back out as the string stored in the catalog.
pub fn tag_to_string(tag: Tag) -> String {
    String::from_utf8_lossy(&tag.to_be_bytes()).to_string()
}

/// Parse a collection of tag strings, rejecting the first malformed one.
pub fn parse_tag_list(raw: &[String]) -> Result<Vec<Tag>, TagError> {
    raw.iter().map(|s| tag4(s.trim())).collect()
}
