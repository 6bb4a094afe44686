use crate::parameter::ParameterSpec;
use crate::shared::is_blank;
use indexmap::{IndexMap, IndexSet};
use std::fs;
use std::path::Path;

/// Fixed marker placed between the parameter name and the level values of
/// every dropdown id.
pub const DROPDOWN_ID_MARKER: &str = "dropdown MultiLevelMultiSelect 0";

#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("parameter `{0}` has no tab delimited hierarchy file configured")]
    MissingFile(String),
    #[error("failed to read hierarchy file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "multi level tab delimited file {path} must have at least 2 lines (one for the header, \
         and one or more for the data); found {lines}"
    )]
    MisconfiguredHierarchy { path: String, lines: usize },
    #[error("line {line} of {path} has no column {column}")]
    ShortRow {
        path: String,
        line: usize,
        column: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Level {
    column: usize,
    name: String,
}

/// Cascading choice lists keyed by dropdown id, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceHierarchy {
    choices: IndexMap<String, IndexSet<String>>,
}

pub fn dropdown_prefix(parameter_name: &str) -> String {
    format!("{parameter_name} {DROPDOWN_ID_MARKER}")
}

pub fn level_prompt(level_name: &str) -> String {
    format!("Select a {}...", level_name.to_lowercase().replace('_', " "))
}

/// Reads the parameter's tab delimited file and builds its hierarchy. The
/// file is read on every call.
pub fn build_choice_hierarchy(spec: &ParameterSpec) -> Result<ChoiceHierarchy, HierarchyError> {
    let location = &spec.value.property_file;
    if is_blank(location) {
        return Err(HierarchyError::MissingFile(spec.name.clone()));
    }
    let path = Path::new(location);
    let raw = fs::read_to_string(path).map_err(|source| HierarchyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let table = parse_tab_delimited(&raw);
    ChoiceHierarchy::from_table(&spec.name, &spec.level_names(), &table, location)
}

impl ChoiceHierarchy {
    /// Builds the hierarchy from a header row followed by data rows.
    /// `source` only labels errors.
    pub fn from_table<S: AsRef<str>>(
        parameter_name: &str,
        level_names: &[&str],
        table: &[Vec<S>],
        source: &str,
    ) -> Result<Self, HierarchyError> {
        let Some((header, data)) = table.split_first().filter(|_| table.len() >= 2) else {
            return Err(HierarchyError::MisconfiguredHierarchy {
                path: source.to_string(),
                lines: table.len(),
            });
        };

        let levels = level_columns(header, level_names);
        let prefix = dropdown_prefix(parameter_name);
        let mut choices: IndexMap<String, IndexSet<String>> = IndexMap::new();
        choices.insert(prefix.clone(), IndexSet::new());

        for (depth, level) in levels.iter().enumerate() {
            let prompt = level_prompt(&level.name);
            let is_last = depth + 1 == levels.len();

            for (row_index, row) in data.iter().enumerate() {
                let mut prior_id = prefix.clone();
                let mut current_id = prefix.clone();
                let mut value = "";

                for (j, ancestor) in levels[..=depth].iter().enumerate() {
                    let cell = row.get(ancestor.column).map(|c| c.as_ref()).ok_or_else(|| {
                        HierarchyError::ShortRow {
                            path: source.to_string(),
                            line: row_index + 2,
                            column: ancestor.column,
                        }
                    })?;
                    if j < depth {
                        prior_id.push(' ');
                        prior_id.push_str(cell);
                    }
                    current_id.push(' ');
                    current_id.push_str(cell);
                    value = cell;
                }

                if !is_last {
                    choices.entry(current_id).or_default();
                }
                let prior = choices.entry(prior_id).or_default();
                prior.insert(prompt.clone());
                prior.insert(value.to_string());
            }
        }

        Ok(Self { choices })
    }

    pub fn choices(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.choices
    }

    pub fn get(&self, dropdown_id: &str) -> Option<&IndexSet<String>> {
        self.choices.get(dropdown_id)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// All dropdown ids joined with `,`.
    pub fn dropdown_ids(&self) -> String {
        self.choices
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Each dropdown id mapped to its choices joined with `,`.
    pub fn collapsed(&self) -> IndexMap<String, String> {
        self.choices
            .iter()
            .map(|(id, set)| {
                let joined = set.iter().map(String::as_str).collect::<Vec<_>>().join(",");
                (id.clone(), joined)
            })
            .collect()
    }
}

/// Every header column equal to a level name becomes a level, in level
/// name order. A name matching several columns contributes each of them.
fn level_columns<S: AsRef<str>>(header: &[S], level_names: &[&str]) -> Vec<Level> {
    let mut levels = Vec::new();
    for name in level_names {
        for (column, heading) in header.iter().enumerate() {
            if heading.as_ref() == *name {
                levels.push(Level {
                    column,
                    name: (*name).to_string(),
                });
            }
        }
    }
    levels
}

/// Splits tab separated text into rows. Fields may be wrapped in double
/// quotes (a doubled quote inside is a literal quote, and tabs or newlines
/// inside quotes are kept). Blank lines are skipped.
pub fn parse_tab_delimited(raw: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            '\t' => {
                row.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                finish_row(&mut rows, &mut row, &mut field);
                field_started = false;
            }
            other => {
                field.push(other);
                field_started = true;
            }
        }
    }
    finish_row(&mut rows, &mut row, &mut field);
    rows
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    let blank_line = row.is_empty() && field.is_empty();
    row.push(std::mem::take(field));
    let finished = std::mem::take(row);
    if !blank_line {
        rows.push(finished);
    }
}
