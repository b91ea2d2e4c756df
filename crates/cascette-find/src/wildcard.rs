//! Search masks
//!
//! Masks use the usual storage wildcards: `*` matches any run of characters
//! (separators included) and `?` matches exactly one. Matching ignores ASCII
//! case and treats `/` and `\` as the same character.

use std::fmt;

/// Compiled search mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    original: String,
    pattern: Vec<MaskToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaskToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

impl Mask {
    /// Compile a mask
    pub fn new(mask: &str) -> Self {
        let mut pattern = Vec::with_capacity(mask.len());
        for ch in mask.chars() {
            let token = match ch {
                '*' => {
                    // Consecutive stars behave like one
                    if pattern.last() == Some(&MaskToken::AnyRun) {
                        continue;
                    }
                    MaskToken::AnyRun
                }
                '?' => MaskToken::AnyOne,
                other => MaskToken::Literal(fold(other)),
            };
            pattern.push(token);
        }
        Self {
            original: mask.to_string(),
            pattern,
        }
    }

    /// Mask text as given
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Whether the mask matches everything, including files without names.
    ///
    /// Only the bare `*` mask qualifies.
    pub fn is_unrestricted(&self) -> bool {
        self.original == crate::UNRESTRICTED_MASK
    }

    /// Check a name against the mask
    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.chars().map(fold).collect();
        let pattern = &self.pattern;

        let (mut p, mut n) = (0usize, 0usize);
        // Position after the last `*` and the name position it resumed from
        let mut backtrack: Option<(usize, usize)> = None;

        while n < name.len() {
            match pattern.get(p) {
                Some(MaskToken::AnyRun) => {
                    backtrack = Some((p + 1, n));
                    p += 1;
                }
                Some(MaskToken::AnyOne) => {
                    p += 1;
                    n += 1;
                }
                Some(MaskToken::Literal(ch)) if *ch == name[n] => {
                    p += 1;
                    n += 1;
                }
                _ => match backtrack {
                    Some((resume, start)) => {
                        p = resume;
                        n = start + 1;
                        backtrack = Some((resume, start + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|token| *token == MaskToken::AnyRun)
    }
}

impl Default for Mask {
    fn default() -> Self {
        Self::new(crate::UNRESTRICTED_MASK)
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn fold(ch: char) -> char {
    match ch {
        '\\' => '/',
        other => other.to_ascii_lowercase(),
    }
}
