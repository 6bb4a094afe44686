use super::ParameterError;
use crate::shared::is_blank;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_DELIMITER: &str = ",";
pub const DEFAULT_VISIBLE_ITEM_COUNT: u32 = 5;

/// Accepted in YAML either as the snake_case name or the `PT_*` constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParameterType {
    SingleSelect,
    MultiSelect,
    CheckBox,
    Radio,
    TextBox,
    MultiLevelSingleSelect,
    MultiLevelMultiSelect,
}

impl TryFrom<String> for ParameterType {
    type Error = ParameterError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<ParameterType> for String {
    fn from(value: ParameterType) -> Self {
        value.as_str().to_string()
    }
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleSelect => "single_select",
            Self::MultiSelect => "multi_select",
            Self::CheckBox => "check_box",
            Self::Radio => "radio",
            Self::TextBox => "text_box",
            Self::MultiLevelSingleSelect => "multi_level_single_select",
            Self::MultiLevelMultiSelect => "multi_level_multi_select",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParameterError> {
        match raw.trim() {
            "single_select" | "PT_SINGLE_SELECT" => Ok(Self::SingleSelect),
            "multi_select" | "PT_MULTI_SELECT" => Ok(Self::MultiSelect),
            "check_box" | "PT_CHECKBOX" => Ok(Self::CheckBox),
            "radio" | "PT_RADIO" => Ok(Self::Radio),
            "text_box" | "PT_TEXTBOX" => Ok(Self::TextBox),
            "multi_level_single_select" | "PT_MULTI_LEVEL_SINGLE_SELECT" => {
                Ok(Self::MultiLevelSingleSelect)
            }
            "multi_level_multi_select" | "PT_MULTI_LEVEL_MULTI_SELECT" => {
                Ok(Self::MultiLevelMultiSelect)
            }
            other => Err(ParameterError::UnknownType(other.to_string())),
        }
    }

    pub fn is_multi_level(self) -> bool {
        matches!(
            self,
            Self::MultiLevelSingleSelect | Self::MultiLevelMultiSelect
        )
    }
}

/// Selects which slot of a [`ParameterSpec`] a resolution call reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    Value,
    Default,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SshConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Private key material (not a path). Takes priority over `password`.
    #[serde(default)]
    pub private_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub query_url: String,
}

/// The flat set of source fields configured for one slot. Several may be
/// filled in at once; [`SourceSet::active`] applies the precedence rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceSet {
    #[serde(default)]
    pub literal: String,
    #[serde(default)]
    pub property_file: String,
    #[serde(default)]
    pub property_key: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshCredential {
    PrivateKey(String),
    Password(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
    pub credential: SshCredential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    Inline(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSource {
    pub driver: String,
    pub url: String,
    pub user: String,
    pub password: String,
    pub query: QuerySource,
}

/// The one source a slot resolves through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    PropertyFile { location: String, key: String },
    Literal(String),
    Command(String),
    RemoteCommand {
        command: String,
        target: RemoteTarget,
    },
    Database(DatabaseSource),
}

impl ValueSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PropertyFile { .. } => "property_file",
            Self::Literal(_) => "literal",
            Self::Command(_) => "command",
            Self::RemoteCommand { .. } => "remote_command",
            Self::Database(_) => "database",
        }
    }
}

impl SourceSet {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            literal: value.into(),
            ..Self::default()
        }
    }

    /// Picks the highest-precedence source whose selector holds:
    /// property file + key, literal, command (local or remote), database.
    pub fn active(&self) -> Option<ValueSource> {
        if !is_blank(&self.property_file) && !is_blank(&self.property_key) {
            return Some(ValueSource::PropertyFile {
                location: self.property_file.clone(),
                key: self.property_key.clone(),
            });
        }
        if !is_blank(&self.literal) {
            return Some(ValueSource::Literal(self.literal.clone()));
        }
        if !is_blank(&self.command) {
            if is_blank(&self.ssh.host) {
                return Some(ValueSource::Command(self.command.clone()));
            }
            return Some(ValueSource::RemoteCommand {
                command: self.command.clone(),
                target: self.ssh.target(),
            });
        }
        if !is_blank(&self.database.url) {
            return Some(ValueSource::Database(self.database.source()));
        }
        None
    }
}

impl SshConfig {
    pub fn target(&self) -> RemoteTarget {
        let credential = if is_blank(&self.private_key) {
            SshCredential::Password(self.password.clone())
        } else {
            SshCredential::PrivateKey(self.private_key.clone())
        };
        RemoteTarget {
            host: self.host.clone(),
            user: self.user.clone(),
            credential,
        }
    }
}

impl DatabaseConfig {
    pub fn source(&self) -> DatabaseSource {
        let query = if is_blank(&self.query_url) {
            QuerySource::Inline(self.query.clone())
        } else {
            QuerySource::Url(self.query_url.clone())
        };
        DatabaseSource {
            driver: self.driver.clone(),
            url: self.url.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            query,
        }
    }
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(default)]
    pub value: SourceSet,
    #[serde(default)]
    pub default_value: SourceSet,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub quote_value: bool,
    #[serde(default)]
    pub visible_item_count: u32,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameter_type,
            value: SourceSet::default(),
            default_value: SourceSet::default(),
            delimiter: default_delimiter(),
            quote_value: false,
            visible_item_count: DEFAULT_VISIBLE_ITEM_COUNT,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ParameterError> {
        let raw = fs::read_to_string(path).map_err(|source| ParameterError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let spec: Self = serde_yaml::from_str(&raw).map_err(|source| ParameterError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        let spec = spec.normalized();
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ParameterError> {
        let spec: Self = serde_yaml::from_str(raw).map_err(|source| ParameterError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        let spec = spec.normalized();
        spec.validate()?;
        Ok(spec)
    }

    /// Applies load-time defaults: an empty delimiter becomes `","` and a
    /// zero visible item count becomes 5.
    pub fn normalized(mut self) -> Self {
        if self.delimiter.is_empty() {
            self.delimiter = default_delimiter();
        }
        if self.visible_item_count == 0 {
            self.visible_item_count = DEFAULT_VISIBLE_ITEM_COUNT;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if is_blank(&self.name) {
            return Err(ParameterError::Invalid(
                "parameter name must be non-empty".to_string(),
            ));
        }
        if self.parameter_type.is_multi_level() {
            if is_blank(&self.value.property_file) {
                return Err(ParameterError::Invalid(format!(
                    "parameter `{}` is multi-level and requires value.property_file",
                    self.name
                )));
            }
            if self.level_names().is_empty() {
                return Err(ParameterError::Invalid(format!(
                    "parameter `{}` is multi-level and requires level names in value.literal",
                    self.name
                )));
            }
        }
        Ok(())
    }

    pub fn sources(&self, which: Which) -> &SourceSet {
        match which {
            Which::Value => &self.value,
            Which::Default => &self.default_value,
        }
    }

    /// Hierarchy level names for multi-level parameters, taken from the
    /// comma-separated literal value. Trailing empty names are dropped.
    pub fn level_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.value.literal.split(',').collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        names
    }

    pub fn quote(&self, raw: String) -> String {
        if self.quote_value {
            format!("\"{raw}\"")
        } else {
            raw
        }
    }
}

/// A named, resolved value handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

impl ParameterValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
