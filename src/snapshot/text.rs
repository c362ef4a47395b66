//! Legacy text snapshot format
//!
//! ```text
//! key1:value1,key2:value2,
//! zkey:1$a||2$b||,zkey2:7$c||,
//! ```
//!
//! Nothing is escaped. A string value may contain `:` (the first `:` splits
//! key from value) but keys must not contain `:` or `,`, values must not
//! contain `,`, and members must not contain `$`, `||` or `,`. Entries that
//! break these rules are still written, with a warning, and will not restore
//! faithfully. Use the binary format when content is not known to be safe.

use crate::error::{Result, SkipKvError};
use crate::sortedset::Score;

use super::SnapshotImage;

const PAIR_SEP: char = ',';
const KEY_SEP: char = ':';
const SCORE_SEP: char = '$';
const MEMBER_SEP: &str = "||";

pub fn encode(image: &SnapshotImage) -> String {
    let mut out = String::new();

    for (key, value) in &image.strings {
        if unsafe_key(key) || value.contains(PAIR_SEP) || value.contains('\n') {
            tracing::warn!(key = %key, "String entry contains snapshot delimiters");
        }
        out.push_str(key);
        out.push(KEY_SEP);
        out.push_str(value);
        out.push(PAIR_SEP);
    }
    out.push('\n');

    for (key, members) in &image.sorted_sets {
        if unsafe_key(key) {
            tracing::warn!(key = %key, "Sorted set key contains snapshot delimiters");
        }
        out.push_str(key);
        out.push(KEY_SEP);
        for (score, member) in members {
            if unsafe_member(member) {
                tracing::warn!(key = %key, member = %member, "Member contains snapshot delimiters");
            }
            out.push_str(&score.to_string());
            out.push(SCORE_SEP);
            out.push_str(member);
            out.push_str(MEMBER_SEP);
        }
        out.push(PAIR_SEP);
    }

    out
}

pub fn decode(bytes: &[u8]) -> Result<SnapshotImage> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SkipKvError::SnapshotCorrupt(format!("not UTF-8: {}", e)))?;

    let mut lines = text.lines();
    let strings_line = lines.next().unwrap_or_default();
    let sets_line = lines.next().unwrap_or_default();

    let mut image = SnapshotImage::default();

    for pair in strings_line.split(PAIR_SEP).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once(KEY_SEP).ok_or_else(|| {
            SkipKvError::SnapshotCorrupt(format!("string entry without ':': {:?}", pair))
        })?;
        image.strings.push((key.to_string(), value.to_string()));
    }

    for group in sets_line.split(PAIR_SEP).filter(|g| !g.is_empty()) {
        let (key, body) = group.split_once(KEY_SEP).ok_or_else(|| {
            SkipKvError::SnapshotCorrupt(format!("sorted set entry without ':': {:?}", group))
        })?;

        let mut members = Vec::new();
        for entry in body.split(MEMBER_SEP).filter(|e| !e.is_empty()) {
            members.push(decode_member(key, entry)?);
        }
        image.sorted_sets.push((key.to_string(), members));
    }

    Ok(image)
}

fn decode_member(key: &str, entry: &str) -> Result<(Score, String)> {
    let (score, member) = entry.split_once(SCORE_SEP).ok_or_else(|| {
        SkipKvError::SnapshotCorrupt(format!("member of {:?} without '$': {:?}", key, entry))
    })?;
    let score = score.parse::<Score>().map_err(|_| {
        SkipKvError::SnapshotCorrupt(format!("bad score in {:?}: {:?}", key, score))
    })?;
    Ok((score, member.to_string()))
}

fn unsafe_key(key: &str) -> bool {
    key.contains(KEY_SEP) || key.contains(PAIR_SEP) || key.contains('\n')
}

fn unsafe_member(member: &str) -> bool {
    member.contains(SCORE_SEP)
        || member.contains(MEMBER_SEP)
        || member.contains(PAIR_SEP)
        || member.contains('\n')
}
