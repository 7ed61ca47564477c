//! Key pattern handling.
//!
//! Callers write glob-style patterns (`user:*`). The secondary index speaks SQL
//! `LIKE`, so patterns are translated before they reach it; the primary cache
//! understands globs natively.

/// Characters removed from keys and patterns before they reach the index.
const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// Glob wildcard accepted from callers.
pub const GLOB_WILDCARD: char = '*';

/// Multi-character wildcard of the SQL `LIKE` operator.
pub const LIKE_WILDCARD: char = '%';

/// Strip quote characters from a key.
pub fn sanitize_key(key: &str) -> String {
    key.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect()
}

/// Returns `true` if the pattern contains the glob wildcard.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(GLOB_WILDCARD)
}

/// Translate a glob pattern into a `LIKE` fragment.
///
/// Quotes are stripped and `*` becomes `%`. The translation is idempotent and
/// leaves plain keys untouched, so exact lookups can share the same path.
pub fn translate_pattern(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .map(|c| if c == GLOB_WILDCARD { LIKE_WILDCARD } else { c })
        .collect()
}

/// Match a key against a Redis-style glob.
///
/// Supports `*`, `?`, character classes (`[abc]`, `[a-z]`, `[^a]`) and
/// backslash escapes.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    glob_match_at(&pattern, &key)
}

fn glob_match_at(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Backtrack point: position of the last '*' and the key index it resumed at.
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                star = Some((p, k));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match_class(pattern, p, key[k]),
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == key[k]).then_some(p + 2),
            Some(c) => (*c == key[k]).then_some(p + 1),
            None => None,
        };

        match step {
            Some(next) => {
                p = next;
                k += 1;
            }
            None => match star {
                Some((star_p, star_k)) => {
                    p = star_p + 1;
                    k = star_k + 1;
                    star = Some((star_p, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Match `c` against the class starting at `pattern[start] == '['`.
/// Returns the pattern index after the class on success.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<usize> {
    let mut i = start + 1;
    let negate = matches!(pattern.get(i), Some('^') | Some('!'));
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    // Unterminated class: treat '[' as a literal.
    if i >= pattern.len() {
        return (c == '[').then_some(start + 1);
    }

    (matched != negate).then_some(i + 1)
}

/// Match a key against a SQL `LIKE` fragment (`%`, `_`, backslash escape).
pub fn like_match(fragment: &str, key: &str) -> bool {
    let glob: String = {
        let mut out = String::with_capacity(fragment.len());
        let mut chars = fragment.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => out.push('*'),
                '_' => out.push('?'),
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push('\\');
                        out.push(next);
                    }
                }
                '*' | '?' | '[' | ']' => {
                    out.push('\\');
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        out
    };
    glob_match(&glob, key)
}
