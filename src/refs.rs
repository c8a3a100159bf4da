//! Scripture reference normalization.
//!
//! Turns free-text references ("John 3:16", "Genesis 15", "1 Cor 13:4-7")
//! into a canonical (book code, chapter, optional verse range) triple. Book
//! codes follow the three-letter scheme used by the underlying dataset.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::error::{Result, TheomcpError};

/// A normalized scripture reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRef {
    /// Three-letter book code, e.g. "Gen", "Jhn".
    pub book: String,
    pub chapter: u32,
    pub verse_start: Option<u32>,
    pub verse_end: Option<u32>,
}

impl fmt::Display for NormalizedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.book, self.chapter)?;
        if let Some(start) = self.verse_start {
            write!(f, ":{}", start)?;
            if let Some(end) = self.verse_end {
                write!(f, "-{}", end)?;
            }
        }
        Ok(())
    }
}

/// Parse a free-text reference. Accepts "Book C", "Book C:V" and
/// "Book C:V-V" forms with common book-name abbreviations.
pub fn normalize(reference: &str) -> Result<NormalizedRef> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(TheomcpError::ReferenceNotRecognized(reference.to_string()));
    }

    let re = Regex::new(r"^(\d?\s*[a-zA-Z][a-zA-Z ]*?)\s+(\d+)(?::(\d+)(?:-(\d+))?)?$")
        .expect("Invalid regex pattern");

    let caps = re
        .captures(trimmed)
        .ok_or_else(|| TheomcpError::ReferenceNotRecognized(reference.to_string()))?;

    let book_raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let book = book_code(book_raw)
        .ok_or_else(|| TheomcpError::ReferenceNotRecognized(reference.to_string()))?;

    let chapter: u32 = caps[2]
        .parse()
        .map_err(|_| TheomcpError::ReferenceNotRecognized(reference.to_string()))?;
    let verse_start: Option<u32> = caps.get(3).map(|m| m.as_str().parse()).transpose()
        .map_err(|_| TheomcpError::ReferenceNotRecognized(reference.to_string()))?;
    let verse_end: Option<u32> = caps.get(4).map(|m| m.as_str().parse()).transpose()
        .map_err(|_| TheomcpError::ReferenceNotRecognized(reference.to_string()))?;

    if chapter == 0 {
        return Err(TheomcpError::ReferenceNotRecognized(reference.to_string()));
    }
    if let (Some(start), Some(end)) = (verse_start, verse_end) {
        if end < start {
            return Err(TheomcpError::ReferenceNotRecognized(reference.to_string()));
        }
    }

    Ok(NormalizedRef {
        book: book.to_string(),
        chapter,
        verse_start,
        verse_end,
    })
}

/// Map a book name or common abbreviation to its canonical code.
pub fn book_code(name: &str) -> Option<&'static str> {
    // Collapse interior whitespace so "1  samuel" still matches
    let key = name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let code = match key.as_str() {
        "genesis" | "gen" => "Gen",
        "exodus" | "exod" | "ex" => "Exo",
        "leviticus" | "lev" => "Lev",
        "numbers" | "num" => "Num",
        "deuteronomy" | "deut" | "dt" => "Deu",
        "joshua" | "josh" => "Jos",
        "judges" | "judg" => "Jdg",
        "ruth" => "Rut",
        "1 samuel" | "1samuel" | "1sam" | "1 sam" => "1Sa",
        "2 samuel" | "2samuel" | "2sam" | "2 sam" => "2Sa",
        "1 kings" | "1kings" | "1kgs" | "1 kgs" => "1Ki",
        "2 kings" | "2kings" | "2kgs" | "2 kgs" => "2Ki",
        "1 chronicles" | "1chronicles" | "1chr" | "1 chr" => "1Ch",
        "2 chronicles" | "2chronicles" | "2chr" | "2 chr" => "2Ch",
        "ezra" => "Ezr",
        "nehemiah" | "neh" => "Neh",
        "esther" | "esth" => "Est",
        "job" => "Job",
        "psalms" | "psalm" | "ps" | "psa" => "Psa",
        "proverbs" | "prov" | "pr" => "Pro",
        "ecclesiastes" | "eccl" => "Ecc",
        "song of solomon" | "song" | "sos" => "Sng",
        "isaiah" | "isa" => "Isa",
        "jeremiah" | "jer" => "Jer",
        "lamentations" | "lam" => "Lam",
        "ezekiel" | "ezek" | "eze" => "Ezk",
        "daniel" | "dan" => "Dan",
        "hosea" | "hos" => "Hos",
        "joel" => "Jol",
        "amos" => "Amo",
        "obadiah" | "obad" => "Oba",
        "jonah" => "Jon",
        "micah" | "mic" => "Mic",
        "nahum" | "nah" => "Nam",
        "habakkuk" | "hab" => "Hab",
        "zephaniah" | "zeph" => "Zep",
        "haggai" | "hag" => "Hag",
        "zechariah" | "zech" => "Zec",
        "malachi" | "mal" => "Mal",
        "matthew" | "matt" | "mt" => "Mat",
        "mark" | "mk" => "Mrk",
        "luke" | "lk" => "Luk",
        "john" | "jn" => "Jhn",
        "acts" => "Act",
        "romans" | "rom" => "Rom",
        "1 corinthians" | "1corinthians" | "1cor" | "1 cor" => "1Co",
        "2 corinthians" | "2corinthians" | "2cor" | "2 cor" => "2Co",
        "galatians" | "gal" => "Gal",
        "ephesians" | "eph" => "Eph",
        "philippians" | "phil" | "php" => "Php",
        "colossians" | "col" => "Col",
        "1 thessalonians" | "1thessalonians" | "1thess" | "1 thess" => "1Th",
        "2 thessalonians" | "2thessalonians" | "2thess" | "2 thess" => "2Th",
        "1 timothy" | "1timothy" | "1tim" | "1 tim" => "1Ti",
        "2 timothy" | "2timothy" | "2tim" | "2 tim" => "2Ti",
        "titus" | "tit" => "Tit",
        "philemon" | "phlm" | "phm" => "Phm",
        "hebrews" | "heb" => "Heb",
        "james" | "jas" => "Jas",
        "1 peter" | "1peter" | "1pet" | "1 pet" => "1Pe",
        "2 peter" | "2peter" | "2pet" | "2 pet" => "2Pe",
        "1 john" | "1john" | "1jn" | "1 jn" => "1Jn",
        "2 john" | "2john" | "2jn" | "2 jn" => "2Jn",
        "3 john" | "3john" | "3jn" | "3 jn" => "3Jn",
        "jude" => "Jud",
        "revelation" | "rev" => "Rev",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verse_reference() {
        let r = normalize("John 3:16").unwrap();
        assert_eq!(r.book, "Jhn");
        assert_eq!(r.chapter, 3);
        assert_eq!(r.verse_start, Some(16));
        assert_eq!(r.verse_end, None);
    }

    #[test]
    fn test_chapter_reference() {
        let r = normalize("Genesis 15").unwrap();
        assert_eq!(r.book, "Gen");
        assert_eq!(r.chapter, 15);
        assert_eq!(r.verse_start, None);
    }

    #[test]
    fn test_verse_range() {
        let r = normalize("1 Corinthians 13:4-7").unwrap();
        assert_eq!(r.book, "1Co");
        assert_eq!(r.chapter, 13);
        assert_eq!(r.verse_start, Some(4));
        assert_eq!(r.verse_end, Some(7));
    }

    #[test]
    fn test_numbered_book_without_space() {
        let r = normalize("1Cor 13:4").unwrap();
        assert_eq!(r.book, "1Co");
    }

    #[test]
    fn test_multi_word_book() {
        let r = normalize("Song of Solomon 2:1").unwrap();
        assert_eq!(r.book, "Sng");
        assert_eq!(r.chapter, 2);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(normalize("ROMANS 8").unwrap().book, "Rom");
    }

    #[test]
    fn test_unknown_book() {
        let err = normalize("Hezekiah 3:16").unwrap_err();
        assert!(matches!(err, TheomcpError::ReferenceNotRecognized(_)));
    }

    #[test]
    fn test_garbage_input() {
        for junk in ["", "   ", "3:16", "Genesis", "Genesis fifteen"] {
            assert!(
                normalize(junk).is_err(),
                "expected '{}' to be rejected",
                junk
            );
        }
    }

    #[test]
    fn test_inverted_verse_range_rejected() {
        assert!(normalize("John 3:16-2").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(normalize("John 3:16").unwrap().to_string(), "Jhn 3:16");
        assert_eq!(normalize("Genesis 15").unwrap().to_string(), "Gen 15");
        assert_eq!(
            normalize("1 Cor 13:4-7").unwrap().to_string(),
            "1Co 13:4-7"
        );
    }
}
