use crate::{Omittable, QueryValue};

/// Merges two ordered mappings, removing every key whose final value is
/// [`Omittable::Omit`].
///
/// Keys from `overrides` win on collision and keep the position they had in
/// `defaults`; new keys are appended in `overrides` order.
pub fn merge_mappings<V: Clone>(
    defaults: &[(String, Omittable<V>)],
    overrides: &[(String, Omittable<V>)],
) -> Vec<(String, V)> {
    let mut merged = defaults.to_vec();
    for (key, value) in overrides {
        upsert(&mut merged, key.clone(), value.clone());
    }
    merged
        .into_iter()
        .filter_map(|(key, value)| value.into_value().map(|value| (key, value)))
        .collect()
}

fn upsert<V>(entries: &mut Vec<(String, V)>, key: String, value: V) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

/// Ordered header map. Names are stored lowercased.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers(Vec<(String, Omittable<String>)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<Omittable<String>>) {
        upsert(
            &mut self.0,
            name.as_ref().to_ascii_lowercase(),
            value.into(),
        );
    }

    /// Builder form of [`Headers::insert`].
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<Omittable<String>>) -> Self {
        self.insert(name, value);
        self
    }

    /// Marks a header for removal, even when a default supplies it.
    pub fn omit(mut self, name: impl AsRef<str>) -> Self {
        self.insert(name, Omittable::Omit);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Omittable<String>> {
        let name = name.to_ascii_lowercase();
        self.0
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn entries(&self) -> &[(String, Omittable<String>)] {
        &self.0
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<Omittable<String>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Headers
where
    K: AsRef<str>,
    V: Into<Omittable<String>>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Ordered query parameter map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query(Vec<(String, Omittable<QueryValue>)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        upsert(&mut self.0, name.into(), Omittable::Value(value.into()));
    }

    /// Builder form of [`Query::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Marks a parameter for removal, even when a default supplies it.
    pub fn omit(mut self, name: impl Into<String>) -> Self {
        upsert(&mut self.0, name.into(), Omittable::Omit);
        self
    }

    /// Overlays `other` on top of this query; `other` wins on collision.
    pub fn extend(&mut self, other: &Query) {
        for (name, value) in &other.0 {
            upsert(&mut self.0, name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Omittable<QueryValue>> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn entries(&self) -> &[(String, Omittable<QueryValue>)] {
        &self.0
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (name, value) in iter {
            query.insert(name, value);
        }
        query
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// How array-valued query parameters are written.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ArrayFormat {
    /// `ids=1,2`
    #[default]
    Comma,
    /// `ids=1&ids=2`
    Repeat,
    /// `ids[]=1&ids[]=2`
    Brackets,
}

/// Flattens merged query parameters into string pairs, dropping nulls.
pub fn serialize_query(params: &[(String, QueryValue)], format: ArrayFormat) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (name, value) in params {
        match value {
            QueryValue::Array(items) => {
                let rendered: Vec<String> = items.iter().filter_map(QueryValue::scalar_string).collect();
                match format {
                    ArrayFormat::Comma => {
                        if !rendered.is_empty() {
                            pairs.push((name.clone(), rendered.join(",")));
                        }
                    }
                    ArrayFormat::Repeat => {
                        pairs.extend(rendered.into_iter().map(|item| (name.clone(), item)));
                    }
                    ArrayFormat::Brackets => {
                        let key = format!("{name}[]");
                        pairs.extend(rendered.into_iter().map(|item| (key.clone(), item)));
                    }
                }
            }
            scalar => {
                if let Some(rendered) = scalar.scalar_string() {
                    pairs.push((name.clone(), rendered));
                }
            }
        }
    }
    pairs
}
