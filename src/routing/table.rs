// Prefix table for the two-level dispatcher
// Immutable after startup, safe for unsynchronized concurrent reads.

/// One prefix mapping; order in the table is dispatch order, most specific
/// prefix first (e.g. `/v1/organizers/finance` before `/v1/organizers`).
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub prefix: String,
    pub group: String,
}

/// Ordered, immutable prefix-to-group table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn with_entry(mut self, prefix: impl Into<String>, group: impl Into<String>) -> Self {
        self.entries.push(RouteEntry {
            prefix: prefix.into(),
            group: group.into(),
        });
        self
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Groups to load for a path, in table order.
    ///
    /// Every entry whose prefix is a literal prefix of the path matches.
    /// When matches nest, an entry shadowed by a more specific matching
    /// prefix is skipped, so `/v1/organizers/finance/123` selects the
    /// finance group but not its `/v1/organizers` ancestor. Entries sharing
    /// one prefix all register; matching is never first-match-wins.
    ///
    /// An empty result means no prefix matched at all; the dispatcher then
    /// falls back to loading every group.
    pub fn matching_groups(&self, path: &str) -> Vec<&str> {
        let matched: Vec<&RouteEntry> = self
            .entries
            .iter()
            .filter(|entry| path.starts_with(&entry.prefix))
            .collect();

        let mut groups = Vec::new();
        for entry in &matched {
            let shadowed = matched.iter().any(|other| {
                other.prefix.len() > entry.prefix.len() && other.prefix.starts_with(&entry.prefix)
            });
            if !shadowed && !groups.contains(&entry.group.as_str()) {
                groups.push(entry.group.as_str());
            }
        }
        groups
    }
}
