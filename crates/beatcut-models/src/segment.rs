//! Segment records, filename sanitization, and natural ordering.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Outcome of one segment slot.
///
/// A record is produced for every slot, including dropped ones (probe or cut
/// failure, degenerate output, or a slot skipped because the grid was already
/// satisfied). Dropped slots carry `produced == 0.0` and no output path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Slot index in the beat grid. Primary sort key for assembly.
    pub index: usize,
    /// Source clip the segment was cut from.
    pub source_clip: PathBuf,
    /// Duration requested from the media engine.
    pub requested: f64,
    /// Duration actually produced, 0.0 if the slot was dropped.
    pub produced: f64,
    /// Path of the produced file, `None` if the slot was dropped.
    pub output: Option<PathBuf>,
}

impl SegmentRecord {
    /// A dropped slot: nothing was produced, the shortfall is carried forward.
    pub fn dropped(index: usize, source_clip: impl Into<PathBuf>, requested: f64) -> Self {
        Self {
            index,
            source_clip: source_clip.into(),
            requested,
            produced: 0.0,
            output: None,
        }
    }

    /// Whether this record contributes a file to the assembly stage.
    pub fn is_kept(&self) -> bool {
        self.output.is_some() && self.produced > 0.0
    }
}

/// Characters stripped from source clip names when building segment names.
const ILLEGAL_NAME_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>', '\''];

/// Sanitize a file name for use in a segment path.
///
/// Each illegal or non-ASCII character in the stem is replaced with `-`; the
/// extension is preserved.
pub fn sanitize_file_name(name: &str) -> String {
    let (stem, ext) = match name.rfind('.') {
        // A leading dot is part of the stem, not an extension separator.
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii() && !ILLEGAL_NAME_CHARS.contains(&c) {
                c
            } else {
                '-'
            }
        })
        .collect();

    format!("{cleaned}{ext}")
}

/// File name for the segment of slot `index` cut from `source`.
///
/// The slot index prefix keeps ordering recoverable from a plain directory
/// listing via [`natural_cmp`].
pub fn segment_file_name(index: usize, source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{index}_{}", sanitize_file_name(&name))
}

/// Numeric-aware string comparison.
///
/// Digit runs compare as integers, so `"10_x"` sorts after `"9_x"` instead of
/// before it. Non-digit runs compare lexically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();

    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let na = take_digits(&mut ca);
                    let nb = take_digits(&mut cb);
                    match cmp_digit_runs(&na, &nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    ca.next();
                    cb.next();
                    match x.cmp(&y) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            run.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    run
}

/// Compare two digit runs numerically without overflowing on long runs.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_illegal_chars_keeps_extension() {
        assert_eq!(sanitize_file_name("clip?*:<>.mp4"), "clip-----.mp4");
    }

    #[test]
    fn test_sanitize_replaces_non_ascii() {
        assert_eq!(sanitize_file_name("víd–eo.mp4"), "v-d-eo.mp4");
    }

    #[test]
    fn test_sanitize_no_extension() {
        assert_eq!(sanitize_file_name("a|b"), "a-b");
    }

    #[test]
    fn test_sanitize_hidden_file_keeps_leading_dot() {
        // A bare leading dot is not an extension separator.
        assert_eq!(sanitize_file_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_segment_file_name() {
        assert_eq!(
            segment_file_name(12, Path::new("/clips/fun:times.mp4")),
            "12_fun-times.mp4"
        );
    }

    #[test]
    fn test_natural_cmp_orders_numbers_numerically() {
        let mut names = vec!["0_a.mp4", "2_c.mp4", "10_b.mp4", "9_d.mp4"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["0_a.mp4", "2_c.mp4", "9_d.mp4", "10_b.mp4"]);
    }

    #[test]
    fn test_natural_cmp_leading_zeros() {
        assert_eq!(natural_cmp("07_a", "7_a"), Ordering::Equal);
        assert_eq!(natural_cmp("007_a", "10_a"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_mixed_text() {
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("a2b", "a10b"), Ordering::Less);
    }

    #[test]
    fn test_record_kept_flag() {
        let dropped = SegmentRecord::dropped(3, "/clips/a.mp4", 4.0);
        assert!(!dropped.is_kept());

        let kept = SegmentRecord {
            index: 3,
            source_clip: PathBuf::from("/clips/a.mp4"),
            requested: 4.0,
            produced: 3.2,
            output: Some(PathBuf::from("/tmp/3_a.mp4")),
        };
        assert!(kept.is_kept());
    }
}
