use http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ClientError;

/// An immutable, ordered list of header fields.
///
/// Names are stored lowercased. Repeated names are kept as separate entries in the
/// order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(HeaderName, HeaderValue)>,
}

/// Value builder of a [`HeaderSet`], nothing is validated before [`build`](Self::build).
///
/// Values are kept as raw bytes, so a set built from a response round-trips through
/// [`HeaderSet::to_builder`] even when a value is not UTF-8.
#[derive(Debug, Clone, Default)]
pub struct HeaderSetBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl HeaderSet {
    pub fn builder() -> HeaderSetBuilder {
        HeaderSetBuilder::default()
    }

    /// Returns all values of `name`, in insertion order
    pub fn get(&self, name: &str) -> Vec<&HeaderValue> {
        self.entries.iter().filter(|(key, _)| key.as_str().eq_ignore_ascii_case(name)).map(|(_, value)| value).collect()
    }

    pub fn first(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.iter().find(|(key, _)| key.as_str().eq_ignore_ascii_case(name)).map(|(_, value)| value)
    }

    /// Returns the first value of `name` if it is visible ascii
    pub fn value(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(|value| value.to_str().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a builder seeded with the entries of this set.
    pub fn to_builder(&self) -> HeaderSetBuilder {
        let entries = self
            .entries
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();
        HeaderSetBuilder { entries }
    }

    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            map.append(name.clone(), value.clone());
        }
        map
    }
}

impl From<HeaderMap> for HeaderSet {
    fn from(map: HeaderMap) -> Self {
        let mut entries = Vec::with_capacity(map.len());
        let mut current = None;
        for (name, value) in map {
            // the map only yields a name with the first of its values
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                entries.push((name.clone(), value));
            }
        }
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl HeaderSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping the existing values of the same name.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((name.into(), value.into().into_bytes()));
        self
    }

    /// Replaces every value of `name` with `value`.
    #[must_use]
    pub fn set(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.remove(&name).add(name, value)
    }

    #[must_use]
    pub fn remove(mut self, name: &str) -> Self {
        self.entries.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    /// Validates every name and value and freezes the set.
    pub fn build(self) -> Result<HeaderSet, ClientError> {
        let entries = self
            .entries
            .into_iter()
            .map(|(name, value)| {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| ClientError::invalid_header(format!("invalid header name {name:?}: {e}")))?;
                let header_value = HeaderValue::from_bytes(&value)
                    .map_err(|e| ClientError::invalid_header(format!("invalid value for header {name}: {e}")))?;
                Ok((header_name, header_value))
            })
            .collect::<Result<_, ClientError>>()?;
        Ok(HeaderSet { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_duplicates() {
        let set = HeaderSet::builder()
            .add("X-Multi", "1")
            .add("content-type", "text/plain")
            .add("x-multi", "2")
            .build()
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("x-multi"), vec!["1", "2"]);
        assert_eq!(set.value("Content-Type"), Some("text/plain"));
        let names: Vec<_> = set.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["x-multi", "content-type", "x-multi"]);
    }

    #[test]
    fn set_and_remove() {
        let set = HeaderSet::builder().add("a", "1").add("b", "2").add("a", "3").set("A", "4").remove("b").build().unwrap();
        assert_eq!(set.get("a"), vec!["4"]);
        assert!(!set.contains("b"));
    }

    #[test]
    fn to_builder_round_trip() {
        let set = HeaderSet::builder().add("a", "1").build().unwrap();
        let extended = set.to_builder().add("b", "2").build().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.to_header_map().get("b").unwrap(), "2");
    }

    #[test]
    fn to_builder_keeps_opaque_values() {
        let mut map = HeaderMap::new();
        map.insert("x-opaque", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let set = HeaderSet::from(map);
        let rebuilt = set.to_builder().add("x-other", "1").build().unwrap();
        assert_eq!(rebuilt.first("x-opaque").unwrap().as_bytes(), b"caf\xe9");
        assert_eq!(rebuilt.value("x-opaque"), None);
    }

    #[test]
    fn from_header_map_keeps_every_value() {
        let mut map = HeaderMap::new();
        map.append("x-multi", HeaderValue::from_static("1"));
        map.append("x-multi", HeaderValue::from_static("2"));
        map.insert("other", HeaderValue::from_static("3"));

        let set = HeaderSet::from(map);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("x-multi"), vec!["1", "2"]);
    }

    #[test]
    fn invalid_entries_fail_build() {
        assert!(matches!(HeaderSet::builder().add("bad name", "v").build(), Err(ClientError::InvalidHeader { .. })));
        assert!(matches!(HeaderSet::builder().add("name", "bad\nvalue").build(), Err(ClientError::InvalidHeader { .. })));
    }
}
