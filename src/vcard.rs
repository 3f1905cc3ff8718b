//! Contact-card serialization for generated entries.
//!
//! Cards use a small vCard 3.0 subset: one `BEGIN:VCARD`/`END:VCARD`
//! block per entry with a structured name, a formatted name, a single
//! CELL phone line holding the value, and a UTC revision stamp.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::generator::Entry;
use crate::template::is_valid_value;

/// vCard version emitted and accepted.
pub const VCARD_VERSION: &str = "3.0";

const BEGIN_MARK: &str = "BEGIN:VCARD";
const END_MARK: &str = "END:VCARD";

#[derive(Error, Debug)]
/// Errors that can occur while reading card text or card files.
pub enum VcardError {
    #[error("Line outside a card block: {0}")]
    StrayLine(String),
    #[error("Card block opened inside another card")]
    NestedCard,
    #[error("Card block never terminated")]
    UnterminatedCard,
    #[error("Card {0} has no TEL line")]
    MissingTel(usize),
    #[error("Card {0} has an invalid TEL value: {1}")]
    InvalidTel(usize, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize entries to card text, one card per entry.
///
/// All cards in one call share a single REV stamp.
pub fn to_vcf(entries: &[Entry]) -> String {
    let rev = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let mut out = String::new();

    for entry in entries {
        out.push_str(BEGIN_MARK);
        out.push('\n');
        out.push_str("VERSION:");
        out.push_str(VCARD_VERSION);
        out.push('\n');
        out.push_str(&format!("N:;{};;;\n", entry.name));
        out.push_str(&format!("FN:{}\n", entry.name));
        out.push_str(&format!("TEL;TYPE=CELL:{}\n", entry.value));
        out.push_str(&format!("REV:{rev}\n"));
        out.push_str(END_MARK);
        out.push('\n');
    }

    out
}

/// Parse card text back into entries.
///
/// Entries are renumbered 1-based in card order and come back with
/// `persisted` set, since they originate outside the current batch.
/// Blank lines between cards are tolerated; VERSION, N and REV lines
/// are accepted and ignored.
pub fn from_vcf(text: &str) -> Result<Vec<Entry>, VcardError> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut in_card = false;
    let mut name = String::new();
    let mut tel: Option<String> = None;

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }

        if line == BEGIN_MARK {
            if in_card {
                return Err(VcardError::NestedCard);
            }
            in_card = true;
            name.clear();
            tel = None;
            continue;
        }

        if !in_card {
            return Err(VcardError::StrayLine(line.to_string()));
        }

        if line == END_MARK {
            let card_no = entries.len() + 1;
            let value = tel.take().ok_or(VcardError::MissingTel(card_no))?;
            if !is_valid_value(&value) {
                return Err(VcardError::InvalidTel(card_no, value));
            }
            entries.push(Entry {
                id: card_no.to_string(),
                value,
                name: std::mem::take(&mut name),
                persisted: true,
            });
            in_card = false;
            continue;
        }

        if let Some(rest) = line.strip_prefix("FN:") {
            name = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("TEL") {
            // TEL: or TEL;TYPE=...: keep everything after the colon.
            if let Some((_, number)) = rest.split_once(':') {
                tel = Some(number.to_string());
            }
        }
    }

    if in_card {
        return Err(VcardError::UnterminatedCard);
    }

    Ok(entries)
}

/// Hex SHA-256 fingerprint of serialized card text.
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Write entries to a card file.
pub fn save_vcf(path: &Path, entries: &[Entry]) -> Result<(), VcardError> {
    fs::write(path, to_vcf(entries))?;
    Ok(())
}

/// Read entries from a card file.
pub fn load_vcf(path: &Path) -> Result<Vec<Entry>, VcardError> {
    from_vcf(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn sample_entries() -> Vec<Entry> {
        vec![
            Entry {
                id: "1".to_string(),
                value: "0512345678".to_string(),
                name: "X 1".to_string(),
                persisted: false,
            },
            Entry {
                id: "2".to_string(),
                value: "0587654321".to_string(),
                name: "X 2".to_string(),
                persisted: false,
            },
        ]
    }

    fn tmp_path(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "numpool_vcard_{}_{}_{}",
            std::process::id(),
            ts,
            name
        ))
    }

    #[test]
    fn test_to_vcf_emits_one_card_per_entry() {
        let text = to_vcf(&sample_entries());
        assert_eq!(text.matches(BEGIN_MARK).count(), 2);
        assert_eq!(text.matches(END_MARK).count(), 2);
        assert!(text.contains("VERSION:3.0"));
        assert!(text.contains("N:;X 1;;;"));
        assert!(text.contains("FN:X 1"));
        assert!(text.contains("FN:X 2"));
        assert!(text.contains("TEL;TYPE=CELL:0512345678"));
        assert!(text.contains("TEL;TYPE=CELL:0587654321"));
        assert!(text.contains("\nREV:"));
    }

    #[test]
    fn test_roundtrip_preserves_values_and_names() {
        let parsed = from_vcf(&to_vcf(&sample_entries())).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, "1");
        assert_eq!(parsed[0].value, "0512345678");
        assert_eq!(parsed[0].name, "X 1");
        assert!(parsed[0].persisted);
        assert_eq!(parsed[1].id, "2");
        assert_eq!(parsed[1].value, "0587654321");
    }

    #[test]
    fn test_from_vcf_accepts_plain_tel_crlf_and_blank_lines() {
        let text = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:A\r\nTEL:0500000001\r\nEND:VCARD\r\n\r\nBEGIN:VCARD\r\nTEL;TYPE=CELL:0500000002\r\nEND:VCARD\r\n";
        let parsed = from_vcf(text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].value, "0500000001");
        assert_eq!(parsed[1].value, "0500000002");
        assert_eq!(parsed[1].name, "");
    }

    #[test]
    fn test_from_vcf_rejects_stray_line() {
        assert!(matches!(
            from_vcf("FN:loose\n"),
            Err(VcardError::StrayLine(_))
        ));
    }

    #[test]
    fn test_from_vcf_rejects_nested_and_unterminated() {
        assert!(matches!(
            from_vcf("BEGIN:VCARD\nBEGIN:VCARD\n"),
            Err(VcardError::NestedCard)
        ));
        assert!(matches!(
            from_vcf("BEGIN:VCARD\nFN:A\n"),
            Err(VcardError::UnterminatedCard)
        ));
    }

    #[test]
    fn test_from_vcf_requires_valid_tel() {
        assert!(matches!(
            from_vcf("BEGIN:VCARD\nFN:A\nEND:VCARD\n"),
            Err(VcardError::MissingTel(1))
        ));
        assert!(matches!(
            from_vcf("BEGIN:VCARD\nTEL:12345\nEND:VCARD\n"),
            Err(VcardError::InvalidTel(1, _))
        ));
        assert!(matches!(
            from_vcf("BEGIN:VCARD\nTEL:05123a5678\nEND:VCARD\n"),
            Err(VcardError::InvalidTel(1, _))
        ));
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = digest("BEGIN:VCARD\n");
        let b = digest("BEGIN:VCARD\n");
        let c = digest("BEGIN:VCARD\r\n");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = tmp_path("roundtrip.vcf");
        save_vcf(&path, &sample_entries()).unwrap();

        let loaded = load_vcf(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|e| e.persisted));
        assert_eq!(loaded[0].value, "0512345678");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = tmp_path("missing.vcf");
        assert!(matches!(load_vcf(&path), Err(VcardError::Io(_))));
    }

    #[test]
    fn test_empty_input_yields_no_entries() {
        assert!(from_vcf("").unwrap().is_empty());
        assert_eq!(to_vcf(&[]), "");
    }
}
