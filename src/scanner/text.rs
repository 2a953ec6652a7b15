//! Text analysis helpers shared by the detector rules.

use std::sync::LazyLock;

use regex::Regex;

/// Shannon entropy of a string in bits per character.
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let len = s.len() as f64;
    let mut freq = [0_u32; 256];
    for &b in s.as_bytes() {
        freq[b as usize] += 1;
    }
    let mut entropy = 0.0_f64;
    for &count in &freq {
        if count > 0 {
            let p = f64::from(count) / len;
            entropy -= p * p.log2();
        }
    }
    entropy
}

/// Luhn check over the digits of `s`; separators are ignored. Returns false
/// when fewer than 12 digits are present.
pub fn luhn_check(s: &str) -> bool {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 12 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

static URL_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://([A-Za-z0-9][A-Za-z0-9.-]*)").expect("url host regex")
});

/// Hosts that never count as external network use.
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1"];

pub fn is_local_host(host: &str) -> bool {
    LOCAL_HOSTS.iter().any(|l| host.eq_ignore_ascii_case(l))
}

/// Unique non-localhost hostnames referenced by URLs in `content`,
/// in order of first appearance.
pub fn extract_domains(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in URL_HOST_RE.captures_iter(content) {
        let host = capture[1].trim_end_matches('.').to_ascii_lowercase();
        if is_local_host(&host) {
            continue;
        }
        if !seen.contains(&host) {
            seen.push(host);
        }
    }
    seen
}

/// First `max_chars` characters of a line, for issue snippets.
pub fn snippet(line: &str, max_chars: usize) -> String {
    line.chars().take(max_chars).collect()
}
