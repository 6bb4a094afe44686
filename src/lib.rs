pub mod app;
pub mod hierarchy;
pub mod parameter;
pub mod resolve;
pub mod selection;
pub mod shared;
pub mod source;
pub mod validate;

pub use hierarchy::{build_choice_hierarchy, ChoiceHierarchy, HierarchyError};
pub use parameter::{ParameterError, ParameterSpec, ParameterType, ParameterValue, Which};
pub use resolve::{resolve, ResolveContext};
pub use selection::{encode_selection, Submission};
pub use source::{Environment, SourceError};
pub use validate::Validation;
