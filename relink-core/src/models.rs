//! Content model structs for sites and content records.

use relink_types::{RecordId, SiteId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown field '{0}': expected 'body' or 'metadata.<path>'")]
    Unknown(String),

    #[error("Metadata path '{0}' does not lead to an object")]
    NotAnObject(String),
}

/// One folder of a site template and the content category stored there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category (record `type`) name, e.g. "resource"
    pub name: String,
    /// Folder relative to the content root, e.g. "resources"
    pub folder: String,
}

/// A site: owner of content records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,

    /// Short name, also the last segment of the site's public URL
    pub name: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Public URL prefix, e.g. "courses/8-01-physics"
    #[serde(default)]
    pub url_path: Option<String>,

    /// Folder→category mapping of the site's template
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl Site {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: SiteId::new(id),
            name: name.into(),
            title: None,
            url_path: None,
            categories: Vec::new(),
        }
    }

    pub fn with_url_path(mut self, url_path: impl Into<String>) -> Self {
        self.url_path = Some(url_path.into());
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, folder: impl Into<String>) -> Self {
        self.categories.push(CategoryConfig {
            name: name.into(),
            folder: folder.into(),
        });
        self
    }

    /// Canonical public URL path of the site, with a leading slash and no trailing slash
    pub fn public_path(&self) -> String {
        let path = self
            .url_path
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .unwrap_or(self.name.as_str());
        format!("/{path}")
    }
}

/// Checksum pair; equal values mean downstream copies are in sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    #[serde(default)]
    pub current: Option<String>,

    #[serde(default)]
    pub last_synced: Option<String>,
}

impl Checksums {
    pub fn is_in_sync(&self) -> bool {
        self.current.is_some() && self.current == self.last_synced
    }
}

/// A field of a record that rules may rewrite
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// The markdown body
    Body,
    /// A string inside the metadata, addressed by dotted path
    Metadata(String),
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "body" || s == "markdown" {
            return Ok(Field::Body);
        }
        match s.strip_prefix("metadata.") {
            Some(path) if !path.is_empty() && path.split('.').all(|p| !p.is_empty()) => {
                Ok(Field::Metadata(path.to_string()))
            }
            _ => Err(FieldError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Body => f.write_str("body"),
            Field::Metadata(path) => write!(f, "metadata.{path}"),
        }
    }
}

/// Parse a list of field names from configuration
pub fn parse_fields(names: &[String]) -> Result<Vec<Field>, FieldError> {
    names.iter().map(|n| n.parse()).collect()
}

/// A single content record of the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Permanent identifier
    pub text_id: RecordId,

    /// Owning site
    pub website: SiteId,

    /// Content category
    #[serde(rename = "type")]
    pub category: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Markdown body
    #[serde(default)]
    pub markdown: Option<String>,

    #[serde(default = "empty_metadata")]
    pub metadata: Value,

    #[serde(default)]
    pub dirpath: Option<String>,

    #[serde(default)]
    pub filename: Option<String>,

    /// Stored asset path for uploaded files
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub checksums: Checksums,

    // Internal: file this record was loaded from
    #[serde(skip)]
    pub(crate) source_path: Option<PathBuf>,
}

fn empty_metadata() -> Value {
    Value::Object(Map::new())
}

impl ContentRecord {
    pub fn new(
        text_id: impl Into<String>,
        website: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            text_id: RecordId::new(text_id),
            website: SiteId::new(website),
            category: category.into(),
            title: None,
            markdown: None,
            metadata: empty_metadata(),
            dirpath: None,
            filename: None,
            file: None,
            checksums: Checksums::default(),
            source_path: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Place the record at `dirpath`/`filename`
    pub fn at(mut self, dirpath: impl Into<String>, filename: impl Into<String>) -> Self {
        self.dirpath = Some(dirpath.into());
        self.filename = Some(filename.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// A string found in the metadata at a dotted path
    pub fn metadata_str(&self, path: &str) -> Option<&str> {
        lookup_dotted(&self.metadata, path).and_then(Value::as_str)
    }

    /// Text of a field, if the record has it and it is a string
    pub fn field_text(&self, field: &Field) -> Option<&str> {
        match field {
            Field::Body => self.markdown.as_deref(),
            Field::Metadata(path) => self.metadata_str(path),
        }
    }

    /// Replace the text of a field
    pub fn set_field_text(&mut self, field: &Field, text: String) -> Result<(), FieldError> {
        match field {
            Field::Body => {
                self.markdown = Some(text);
                Ok(())
            }
            Field::Metadata(path) => set_dotted(&mut self.metadata, path, Value::String(text)),
        }
    }
}

fn lookup_dotted<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

fn set_dotted(value: &mut Value, path: &str, new_value: Value) -> Result<(), FieldError> {
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };

    let mut current = value;
    if let Some(parents) = parents {
        for key in parents.split('.') {
            current = current
                .get_mut(key)
                .ok_or_else(|| FieldError::NotAnObject(path.to_string()))?;
        }
    }

    match current.as_object_mut() {
        Some(object) => {
            object.insert(last.to_string(), new_value);
            Ok(())
        }
        None => Err(FieldError::NotAnObject(path.to_string())),
    }
}
