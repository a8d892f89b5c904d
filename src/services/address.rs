//! Address normalization before addresses are sent to the directions provider

use crate::defaults::MAX_ADDRESS_BLOCKS;

/// Byte length of a `<br>` tag at the start of `lower` (`<br>`, `<br/>`, `<br />`)
fn line_break_len(lower: &str) -> Option<usize> {
    let rest = lower.strip_prefix("<br")?;
    let rest = rest.trim_start_matches(' ');
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    rest.strip_prefix('>')?;
    Some(lower.len() - rest.len() + 1)
}

/// Split on `<br>` tags in any letter case
fn split_line_breaks(address: &str) -> Vec<&str> {
    // ASCII lowercasing keeps byte offsets
    let lower = address.to_ascii_lowercase();
    let mut parts = Vec::new();
    let mut start = 0;

    for (i, _) in lower.match_indices('<') {
        if i < start {
            continue;
        }
        if let Some(len) = line_break_len(&lower[i..]) {
            parts.push(&address[start..i]);
            start = i + len;
        }
    }
    parts.push(&address[start..]);
    parts
}

/// Strip `<br>` line breaks and keep only the first three address blocks.
///
/// Returns `None` for a missing or blank address.
pub fn sanitize_address(address: Option<&str>) -> Option<String> {
    let address = address?;

    let blocks: Vec<&str> = split_line_breaks(address)
        .into_iter()
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .take(MAX_ADDRESS_BLOCKS)
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join(", "))
    }
}
