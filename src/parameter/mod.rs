pub mod error;
pub mod spec;

pub use error::ParameterError;
pub use spec::{
    DatabaseConfig, DatabaseSource, ParameterSpec, ParameterType, ParameterValue, QuerySource,
    RemoteTarget, SourceSet, SshConfig, SshCredential, ValueSource, Which, DEFAULT_DELIMITER,
    DEFAULT_VISIBLE_ITEM_COUNT,
};
