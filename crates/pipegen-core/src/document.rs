//! Structured entries and the merged pipeline document.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Key every entry is identified by.
pub const NAME_KEY: &str = "name";

/// A job, resource, resource type or group after rendering and parsing.
///
/// Keys keep their document order; `name` always comes first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(Mapping);

impl Entry {
    /// Build an entry named `name` followed by the keys of `data`.
    ///
    /// A `name` key inside `data` replaces the value but keeps first position.
    pub fn new(name: impl Into<Value>, data: Mapping) -> Self {
        let mut map = Mapping::with_capacity(data.len() + 1);
        map.insert(Value::from(NAME_KEY), name.into());
        for (key, value) in data {
            map.insert(key, value);
        }
        Self(map)
    }

    /// The entry name, when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.0.keys()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn into_mapping(self) -> Mapping {
        self.0
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get(NAME_KEY) {
            Some(Value::String(name)) => f.write_str(name),
            Some(other) => write!(f, "<{}>", display_value(other)),
            None => f.write_str("<nil>"),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// The merged output of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub groups: Vec<Entry>,
    pub resource_types: Vec<Entry>,
    pub resources: Vec<Entry>,
    pub jobs: Vec<Entry>,
}

impl Document {
    /// Serialize with the top-level keys `groups`, `resource_types`,
    /// `resources` and `jobs`.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Total number of entries across all categories.
    pub fn len(&self) -> usize {
        self.groups.len() + self.resource_types.len() + self.resources.len() + self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a group listing every job and resource name of `document`.
///
/// Entries without a string name are left out.
pub fn world_group(name: &str, document: &Document) -> Entry {
    let names = |entries: &[Entry]| -> Value {
        Value::Sequence(
            entries
                .iter()
                .filter_map(Entry::name)
                .map(Value::from)
                .collect(),
        )
    };

    let mut data = Mapping::new();
    data.insert(Value::from("jobs"), names(&document.jobs));
    data.insert(Value::from("resources"), names(&document.resources));
    Entry::new(name, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Entry {
        Entry::new(name, Mapping::new())
    }

    #[test]
    fn test_entry_name_first() {
        let data: Mapping = serde_yaml::from_str("plan: []\nserial: true\n").unwrap();
        let entry = Entry::new("build", data);
        let keys: Vec<_> = entry.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "plan", "serial"]);
        assert_eq!(entry.name(), Some("build"));
    }

    #[test]
    fn test_data_name_overrides_value_not_position() {
        let data: Mapping = serde_yaml::from_str("plan: []\nname: other\n").unwrap();
        let entry = Entry::new("build", data);
        let keys: Vec<_> = entry.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "plan"]);
        assert_eq!(entry.name(), Some("other"));
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(named("build").to_string(), "build");
        let numeric = Entry::new(Value::from(7), Mapping::new());
        assert_eq!(numeric.name(), None);
        assert_eq!(numeric.to_string(), "<7>");
    }

    #[test]
    fn test_world_group() {
        let document = Document {
            jobs: vec![named("build"), named("test")],
            resources: vec![named("repo"), Entry::new(Value::Null, Mapping::new())],
            groups: vec![named("ignored")],
            ..Default::default()
        };
        let group = world_group("WORLD", &document);
        assert_eq!(group.name(), Some("WORLD"));
        let jobs: Vec<_> = group.get("jobs").unwrap().as_sequence().unwrap().iter().filter_map(Value::as_str).collect();
        assert_eq!(jobs, vec!["build", "test"]);
        let resources = group.get("resources").unwrap().as_sequence().unwrap();
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn test_document_yaml_key_order() {
        let document = Document {
            jobs: vec![named("build")],
            ..Default::default()
        };
        let yaml = document.to_yaml().unwrap();
        let groups = yaml.find("groups:").unwrap();
        let types = yaml.find("resource_types:").unwrap();
        let resources = yaml.find("resources:").unwrap();
        let jobs = yaml.find("jobs:").unwrap();
        assert!(groups < types && types < resources && resources < jobs);
        assert!(yaml.contains("- name: build"));
        assert_eq!(document.len(), 1);
    }
}
