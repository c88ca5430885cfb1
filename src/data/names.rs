//! Team name resolution
//!
//! Schedule feeds and scoreboards rarely agree on team names. A [`NameResolver`]
//! maps an external name onto the canonical name used in the game ledger.

use std::collections::HashMap;

/// Maps an external team name onto a canonical ledger name
pub trait NameResolver {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Exact-name and alias lookup, case-insensitive and whitespace-trimmed
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    names: HashMap<String, String>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl AliasTable {
    /// Canonical names map to themselves; aliases override nothing canonical
    pub fn new<'a>(
        teams: impl IntoIterator<Item = &'a str>,
        aliases: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut names = HashMap::new();
        for (alias, team) in aliases {
            names.insert(normalize(&alias), team.trim().to_string());
        }
        for team in teams {
            names.insert(normalize(team), team.to_string());
        }
        AliasTable { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameResolver for AliasTable {
    fn resolve(&self, name: &str) -> Option<String> {
        self.names.get(&normalize(name)).cloned()
    }
}
