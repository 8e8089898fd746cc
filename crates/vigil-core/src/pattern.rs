//! Glob patterns over keys
//!
//! `*` matches any run of characters (including none), `?` matches exactly
//! one character. Everything else matches literally.

/// Test whether `key` matches `pattern`
pub fn matches(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();

    let (mut pi, mut ki) = (0usize, 0usize);
    // Position of the last `*` and the key index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ki));
            pi += 1;
        } else if let Some((star, star_ki)) = backtrack {
            pi = star + 1;
            ki = star_ki + 1;
            backtrack = Some((star, star_ki + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}

/// Longest literal prefix of a pattern, used to seek the cursor
pub fn literal_prefix(pattern: &str) -> &str {
    match pattern.find(['*', '?']) {
        Some(idx) => &pattern[..idx],
        None => pattern,
    }
}
