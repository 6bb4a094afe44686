use choiceparam::hierarchy::{build_choice_hierarchy, dropdown_prefix, HierarchyError};
use choiceparam::parameter::{ParameterSpec, ParameterType};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn dataset_spec(levels: &str, file: &Path) -> ParameterSpec {
    let mut spec = ParameterSpec::new("DATASET", ParameterType::MultiLevelMultiSelect);
    spec.value.literal = levels.to_string();
    spec.value.property_file = file.display().to_string();
    spec
}

fn members(set: Option<&indexmap::IndexSet<String>>) -> Vec<String> {
    set.map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn builds_three_levels_from_tab_file() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("datasets.tsv");
    fs::write(
        &file,
        "genome\tsource\tfile\tsize\n\
         HG18\tLymphomaA\ta.bam\t10\n\
         HG18\tLymphomaB\tb.bam\t20\n\
         ZZ23\tNeuro\tn.bam\t30\n",
    )
    .expect("write");

    let hierarchy =
        build_choice_hierarchy(&dataset_spec("genome,source,file", &file)).expect("build");
    let prefix = dropdown_prefix("DATASET");

    assert_eq!(
        members(hierarchy.get(&prefix)),
        vec!["Select a genome...", "HG18", "ZZ23"]
    );
    assert_eq!(
        members(hierarchy.get(&format!("{prefix} HG18"))),
        vec!["Select a source...", "LymphomaA", "LymphomaB"]
    );
    assert_eq!(
        members(hierarchy.get(&format!("{prefix} HG18 LymphomaB"))),
        vec!["Select a file...", "b.bam"]
    );
    assert_eq!(
        members(hierarchy.get(&format!("{prefix} ZZ23 Neuro"))),
        vec!["Select a file...", "n.bam"]
    );
    assert!(hierarchy.get(&format!("{prefix} HG18 LymphomaA a.bam")).is_none());
    assert_eq!(
        hierarchy.choices().keys().cloned().collect::<Vec<_>>(),
        vec![
            prefix.clone(),
            format!("{prefix} HG18"),
            format!("{prefix} ZZ23"),
            format!("{prefix} HG18 LymphomaA"),
            format!("{prefix} HG18 LymphomaB"),
            format!("{prefix} ZZ23 Neuro"),
        ]
    );
}

#[test]
fn rebuilding_from_unchanged_file_is_identical() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("datasets.tsv");
    fs::write(
        &file,
        "genome\tsource\nHG18\tLymphomaA\nHG18\tLymphomaB\nHG18\tLymphomaA\n",
    )
    .expect("write");
    let spec = dataset_spec("genome,source", &file);

    let first = build_choice_hierarchy(&spec).expect("first");
    let second = build_choice_hierarchy(&spec).expect("second");
    assert_eq!(first, second);
    assert_eq!(first.dropdown_ids(), second.dropdown_ids());
    assert_eq!(
        members(first.get(&format!("{} HG18", dropdown_prefix("DATASET")))),
        vec!["Select a source...", "LymphomaA", "LymphomaB"]
    );
}

#[test]
fn files_with_fewer_than_two_lines_are_misconfigured() {
    let dir = tempdir().expect("tempdir");
    for (name, body, lines) in [("empty.tsv", "", 0usize), ("header.tsv", "genome\n", 1)] {
        let file = dir.path().join(name);
        fs::write(&file, body).expect("write");
        let err = build_choice_hierarchy(&dataset_spec("genome", &file)).expect_err("short");
        match err {
            HierarchyError::MisconfiguredHierarchy { lines: found, .. } => {
                assert_eq!(found, lines, "{name}")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().expect("tempdir");
    let err = build_choice_hierarchy(&dataset_spec("genome", &dir.path().join("absent.tsv")))
        .expect_err("missing");
    assert!(matches!(err, HierarchyError::Read { .. }));

    let spec = ParameterSpec::new("DATASET", ParameterType::MultiLevelSingleSelect);
    assert!(matches!(
        build_choice_hierarchy(&spec).expect_err("unset"),
        HierarchyError::MissingFile(name) if name == "DATASET"
    ));
}

#[test]
fn level_names_missing_from_header_add_no_levels() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("datasets.tsv");
    fs::write(&file, "genome\tsource\nHG18\tLymphomaA\n").expect("write");

    let hierarchy = build_choice_hierarchy(&dataset_spec("organism", &file)).expect("build");
    assert_eq!(hierarchy.len(), 1);
    assert!(members(hierarchy.get(&dropdown_prefix("DATASET"))).is_empty());
}
