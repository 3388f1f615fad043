//! Configuration store abstraction.
//!
//! Endpoint profiles are built from a sectioned key-value store. The core only
//! needs string lookups. [`TomlStore`] provides them over a TOML document where
//! every top-level table is a section:
//!
//! ```toml
//! [DEFAULT]
//! RUN_TESTCASE = "EDGE1,EDGE2"
//!
//! [EDGE1]
//! HOST = "sftp.example.com"
//! PORT = 22
//! USERNAME = "loader"
//! PASSWORD = "secret"
//!
//! [EDGE1_LOADER]
//! DELAY = 250
//! DELAY_UNITS = "MilliSeconds"
//! FILE_PREFIX = "CDR"
//! ```
//!
//! [`IniStore`] reads the same layout from an INI file with unquoted values.
//! [`ProfileStore::load`] picks one of the two by file extension.

use std::path::Path;

use ini::Ini;
use toml::{Table, Value};

use crate::error::ConfigError;

/// Read-only access to sectioned configuration fields.
pub trait ConfigStore {
    /// Look up `key` in `section`, rendered as a string.
    fn get_field(&self, section: &str, key: &str) -> Option<String>;

    /// Whether `key` is present in `section`.
    fn has_field(&self, section: &str, key: &str) -> bool {
        self.get_field(section, key).is_some()
    }

    /// Whether `section` exists at all.
    fn has_section(&self, section: &str) -> bool;
}

/// A [`ConfigStore`] backed by a parsed TOML document.
#[derive(Debug, Clone, Default)]
pub struct TomlStore {
    root: Table,
}

impl TomlStore {
    /// Parse a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let root = toml::from_str::<Table>(content).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        Ok(Self { root })
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    fn section(&self, section: &str) -> Option<&Table> {
        self.root.get(section).and_then(Value::as_table)
    }
}

impl ConfigStore for TomlStore {
    fn get_field(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)
            .and_then(|table| table.get(key))
            .and_then(render_value)
    }

    fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }
}

/// A [`ConfigStore`] backed by a parsed INI document.
///
/// Keys placed before the first section header are treated as `[DEFAULT]`.
#[derive(Debug, Clone)]
pub struct IniStore {
    doc: Ini,
}

impl IniStore {
    const DEFAULT_SECTION: &'static str = "DEFAULT";

    /// Parse an INI document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let doc = Ini::load_from_str(content).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        Ok(Self { doc })
    }

    /// Read and parse the INI file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    fn section(&self, section: &str) -> Option<&ini::Properties> {
        self.doc.section(Some(section)).or_else(|| {
            (section == Self::DEFAULT_SECTION)
                .then(|| self.doc.general_section())
                .filter(|props| !props.is_empty())
        })
    }
}

impl ConfigStore for IniStore {
    fn get_field(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)
            .and_then(|props| props.get(key))
            .map(|value| value.trim().to_string())
    }

    fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }
}

/// Either supported profile file format.
#[derive(Debug, Clone)]
pub enum ProfileStore {
    Toml(TomlStore),
    Ini(IniStore),
}

impl ProfileStore {
    /// Load `path` as TOML when it ends in `.toml`, otherwise as INI.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            TomlStore::load(path).map(Self::Toml)
        } else {
            IniStore::load(path).map(Self::Ini)
        }
    }
}

impl ConfigStore for ProfileStore {
    fn get_field(&self, section: &str, key: &str) -> Option<String> {
        match self {
            Self::Toml(store) => store.get_field(section, key),
            Self::Ini(store) => store.get_field(section, key),
        }
    }

    fn has_section(&self, section: &str) -> bool {
        match self {
            Self::Toml(store) => store.has_section(section),
            Self::Ini(store) => store.has_section(section),
        }
    }
}

/// Render a scalar (or an array of scalars, comma-joined) as a plain string.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(dt) => Some(dt.to_string()),
        Value::Array(items) => {
            let rendered: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Table(_) => None,
                    scalar => render_value(scalar),
                })
                .collect();
            rendered.map(|parts| parts.join(","))
        }
        Value::Table(_) => None,
    }
}
