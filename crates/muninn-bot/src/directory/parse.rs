//! Display-name parsing.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use muninn_core::error::{BotError, Result};

const BUNDLED_TLDS: &str = include_str!("../../resources/tlds-alpha-by-domain.txt");

/// Allowed top-level domains, lower-cased.
#[derive(Debug, Clone, Default)]
pub struct TldSet {
    tlds: HashSet<String>,
}

impl TldSet {
    /// One TLD per line, case-insensitive. `#` lines and blank lines are skipped.
    pub fn parse(text: &str) -> Self {
        let tlds = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { tlds }
    }

    pub fn bundled() -> Self {
        Self::parse(BUNDLED_TLDS)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("read TLD list {} failed: {e}", path.display())))?;
        Ok(Self::parse(&text))
    }

    pub fn contains(&self, tld: &str) -> bool {
        self.tlds.contains(tld)
    }

    pub fn len(&self) -> usize {
        self.tlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tlds.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tlds: iter.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }
}

/// Contents of non-empty `[...]` groups, leftmost-first, non-overlapping.
/// A group ends at the first `]` after its first character and never spans
/// a line break.
fn bracket_groups(name: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut pos = 0;
    while let Some(rel) = name[pos..].find('[') {
        let start = pos + rel + 1;
        let rest = &name[start..];
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c != '\n' => {}
            _ => {
                pos = start;
                continue;
            }
        }
        let end = chars
            .take_while(|&(_, c)| c != '\n')
            .find(|&(_, c)| c == ']')
            .map(|(i, _)| i);
        match end {
            Some(end) => {
                groups.push(&rest[..end]);
                pos = start + end + 1;
            }
            None => pos = start,
        }
    }
    groups
}

/// Servers declared in a display name.
///
/// Each bracket group is split on `,`, space and `/`. A token counts when it
/// contains a `.`, has a non-empty label before the last `.`, and ends in a
/// known TLD. Tokens are lower-cased.
pub fn parse_name(name: &str, tlds: &TldSet) -> BTreeSet<String> {
    let mut servers = BTreeSet::new();
    for group in bracket_groups(name) {
        for word in group.split([',', ' ', '/']) {
            let word = word.to_lowercase();
            let Some((label, tld)) = word.rsplit_once('.') else {
                continue;
            };
            if label.is_empty() || !tlds.contains(tld) {
                continue;
            }
            servers.insert(word);
        }
    }
    servers
}
