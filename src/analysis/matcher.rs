/// Targets resolved to 0-based header offsets, in caller order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnMatches {
    matches: Vec<(String, usize)>,
}

impl ColumnMatches {
    /// Offset matched by `target`, if any.
    pub fn get(&self, target: &str) -> Option<usize> {
        self.matches
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, offset)| *offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.matches.iter().map(|(name, offset)| (name.as_str(), *offset))
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Records `target` unless it is already present; a repeated target keeps its
    /// first position.
    fn insert(&mut self, target: &str, offset: usize) {
        if self.get(target).is_none() {
            self.matches.push((target.to_owned(), offset));
        }
    }
}

/// Resolves each target to the first header containing it, ignoring case and surrounding
/// whitespace. Empty headers and blank targets never match.
pub fn match_columns<H, T>(headers: &[H], targets: &[T]) -> ColumnMatches
where
    H: AsRef<str>,
    T: AsRef<str>,
{
    let headers: Vec<String> = headers
        .iter()
        .map(|header| header.as_ref().trim().to_lowercase())
        .collect();
    let mut matches = ColumnMatches::default();
    for target in targets {
        let target = target.as_ref();
        let needle = target.trim().to_lowercase();
        let offset = if needle.is_empty() {
            None
        } else {
            headers
                .iter()
                .position(|header| !header.is_empty() && header.contains(&needle))
        };
        match offset {
            Some(offset) => matches.insert(target, offset),
            None => log::trace!("No header matches '{}'", target),
        }
    }
    matches
}
