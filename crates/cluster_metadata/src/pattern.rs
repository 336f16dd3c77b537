//! Wildcard matching for alias and index name patterns.

pub const MATCH_ALL: &str = "*";
pub const ALL: &str = "_all";

pub fn is_match_all(pattern: &str) -> bool {
    pattern == MATCH_ALL || pattern == ALL
}

/// Match `name` against `pattern` where `*` matches any run of characters,
/// including none. There are no other metacharacters.
pub fn simple_match(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();
    let (mut p, mut n) = (0, 0);
    // Position of the last `*` seen and the name offset it is matching from.
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star, matched_from)) = backtrack {
            p = star + 1;
            n = matched_from + 1;
            backtrack = Some((star, matched_from + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|b| *b == b'*')
}
