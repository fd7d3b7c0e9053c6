use std::collections::{BTreeMap, BTreeSet, btree_map};

/// Named offsets within a dump.
///
/// Each name is bound to exactly one offset; any number of names may share an
/// offset. Iteration visits offsets in ascending order and, at each offset,
/// names in lexicographic order, which is also the order the encoder writes
/// them in.
///
/// ```rust
/// use sparsehex::LabelTable;
///
/// let mut labels = LabelTable::new();
/// labels.set("start", 0x10);
/// labels.set("entry", 0x10);
/// labels.set("end", 0x40);
///
/// let all: Vec<_> = labels
///     .iter()
///     .map(|(ofs, names)| (ofs, names.iter().map(String::as_str).collect::<Vec<_>>()))
///     .collect();
/// assert_eq!(all, vec![(0x10, vec!["entry", "start"]), (0x40, vec!["end"])]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")
)]
pub struct LabelTable {
    by_name: BTreeMap<String, u64>,
    by_offset: BTreeMap<u64, BTreeSet<String>>,
}

impl LabelTable {
    /// An empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            by_name: BTreeMap::new(),
            by_offset: BTreeMap::new(),
        }
    }

    /// The offset `name` is bound to.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    /// Binds `name` to `offset`, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<String>, offset: u64) {
        let name = name.into();
        match self.by_name.insert(name.clone(), offset) {
            Some(old) if old == offset => return,
            Some(old) => self.unlink(&name, old),
            None => {}
        }
        self.by_offset.entry(offset).or_default().insert(name);
    }

    /// Removes `name`, returning the offset it was bound to.
    pub fn remove(&mut self, name: &str) -> Option<u64> {
        let offset = self.by_name.remove(name)?;
        self.unlink(name, offset);
        Some(offset)
    }

    fn unlink(&mut self, name: &str, offset: u64) {
        if let btree_map::Entry::Occupied(mut names) = self.by_offset.entry(offset) {
            names.get_mut().remove(name);
            if names.get().is_empty() {
                names.remove();
            }
        }
    }

    /// Every name with its offset.
    #[must_use]
    pub fn all(&self) -> &BTreeMap<String, u64> {
        &self.by_name
    }

    /// Number of names in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the table has no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Iterates `(offset, names)` pairs with offsets at or after `offset`.
    pub fn iter_from(&self, offset: u64) -> LabelsFrom<'_> {
        LabelsFrom {
            inner: self.by_offset.range(offset..),
        }
    }

    /// Iterates every `(offset, names)` pair.
    pub fn iter(&self) -> LabelsFrom<'_> {
        self.iter_from(0)
    }

    /// Names bound to exactly `offset`, in sorted order.
    pub fn names_at(&self, offset: u64) -> impl Iterator<Item = &str> + '_ {
        self.by_offset
            .get(&offset)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// The lowest labeled offset at or after `offset`.
    #[must_use]
    pub fn first_offset_from(&self, offset: u64) -> Option<u64> {
        self.by_offset.range(offset..).next().map(|(&ofs, _)| ofs)
    }

    /// The lowest labeled offset strictly after `offset`.
    #[must_use]
    pub fn first_offset_after(&self, offset: u64) -> Option<u64> {
        offset
            .checked_add(1)
            .and_then(|next| self.first_offset_from(next))
    }
}

/// Offset-ordered iterator over a [`LabelTable`], created by
/// [`LabelTable::iter_from`].
#[derive(Debug, Clone)]
pub struct LabelsFrom<'a> {
    inner: btree_map::Range<'a, u64, BTreeSet<String>>,
}

impl<'a> Iterator for LabelsFrom<'a> {
    type Item = (u64, &'a BTreeSet<String>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&ofs, names)| (ofs, names))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a LabelTable {
    type Item = (u64, &'a BTreeSet<String>);
    type IntoIter = LabelsFrom<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: Into<String>> Extend<(S, u64)> for LabelTable {
    fn extend<I: IntoIterator<Item = (S, u64)>>(&mut self, iter: I) {
        for (name, offset) in iter {
            self.set(name, offset);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for LabelTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut labels = Self::new();
        labels.extend(iter);
        labels
    }
}

impl From<BTreeMap<String, u64>> for LabelTable {
    fn from(map: BTreeMap<String, u64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<LabelTable> for BTreeMap<String, u64> {
    fn from(labels: LabelTable) -> Self {
        labels.by_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(labels: &LabelTable, from: u64) -> Vec<(u64, Vec<&str>)> {
        labels
            .iter_from(from)
            .map(|(ofs, names)| (ofs, names.iter().map(String::as_str).collect()))
            .collect()
    }

    #[test]
    fn names_sorted_within_offset() {
        let labels: LabelTable = [("x100b", 0x100), ("x103", 0x103), ("x100", 0x100), ("start", 0)]
            .into_iter()
            .collect();
        assert_eq!(
            pairs(&labels, 0),
            vec![
                (0, vec!["start"]),
                (0x100, vec!["x100", "x100b"]),
                (0x103, vec!["x103"]),
            ]
        );
        assert_eq!(pairs(&labels, 0x101), vec![(0x103, vec!["x103"])]);
        assert!(pairs(&labels, 0x104).is_empty());
    }

    #[test]
    fn set_moves_existing_name() {
        let mut labels = LabelTable::new();
        labels.set("foo", 5);
        labels.set("bar", 5);
        labels.set("foo", 9);
        assert_eq!(labels.get("foo"), Some(9));
        assert_eq!(labels.names_at(5).collect::<Vec<_>>(), vec!["bar"]);
        assert_eq!(labels.names_at(9).collect::<Vec<_>>(), vec!["foo"]);
        assert_eq!(labels.len(), 2);

        labels.set("bar", 9);
        assert_eq!(labels.first_offset_from(0), Some(9));
        assert_eq!(pairs(&labels, 0), vec![(9, vec!["bar", "foo"])]);
    }

    #[test]
    fn set_same_offset_is_noop() {
        let mut labels = LabelTable::new();
        labels.set("foo", 5);
        let before = labels.clone();
        labels.set("foo", 5);
        assert_eq!(labels, before);
    }

    #[test]
    fn remove_drops_empty_offsets() {
        let mut labels: LabelTable = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(labels.remove("a"), Some(1));
        assert_eq!(labels.remove("a"), None);
        assert_eq!(labels.first_offset_from(0), Some(2));
        assert_eq!(labels.names_at(1).count(), 0);
    }

    #[test]
    fn first_offset_after() {
        let labels: LabelTable = [("a", 1), ("b", 2), ("max", u64::MAX)].into_iter().collect();
        assert_eq!(labels.first_offset_after(0), Some(1));
        assert_eq!(labels.first_offset_after(1), Some(2));
        assert_eq!(labels.first_offset_after(2), Some(u64::MAX));
        assert_eq!(labels.first_offset_after(u64::MAX), None);
    }

    #[test]
    fn all_is_name_keyed() {
        let labels: LabelTable = [("b", 2), ("a", 7)].into_iter().collect();
        let map: Vec<_> = labels.all().iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(map, vec![("a", 7), ("b", 2)]);
        assert_eq!(BTreeMap::from(labels.clone()), labels.all().clone());
    }

    #[quickcheck_macros::quickcheck]
    fn iteration_matches_bindings(bindings: Vec<(u8, u16)>) -> bool {
        let labels: LabelTable = bindings
            .iter()
            .map(|&(name, offset)| (format!("n{name}"), u64::from(offset)))
            .collect();
        let mut last = None;
        let mut seen = 0;
        for (offset, names) in &labels {
            if last.is_some_and(|prev| prev >= offset) || names.is_empty() {
                return false;
            }
            last = Some(offset);
            seen += names.len();
            if names.iter().any(|name| labels.get(name) != Some(offset)) {
                return false;
            }
        }
        seen == labels.len()
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_as_name_map() {
        let labels: LabelTable = [("foo", 0x40), ("bar", 0x37)].into_iter().collect();
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"{"bar":55,"foo":64}"#);
        let back: LabelTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, labels);
    }
}
