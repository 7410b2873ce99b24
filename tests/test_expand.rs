use bqflatten::{
    expand::{expand_fields, expand_table},
    schema::Field,
};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct ExpandTest {
    name: String,
    schema: String,
    selects: Vec<String>,
    joins: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct ExpandTestData {
    tests: Vec<ExpandTest>,
}

const EXPAND_TESTS_FILE: &str = "tests/expand_tests.toml";

fn normalize_whitespace(clause: &str) -> String {
    clause.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn load_tests() -> ExpandTestData {
    let expand_data_file =
        std::fs::read_to_string(EXPAND_TESTS_FILE).expect("Cannot open expand test cases");
    toml::from_str(&expand_data_file).expect("Cannot parse test cases defined in toml")
}

#[test]
fn test_expand() {
    for test in load_tests().tests {
        println!("Testing expansion: {}", &test.name);
        let schema: Vec<Field> = serde_json::from_str(&test.schema)
            .unwrap_or_else(|err| panic!("Could not parse schema due to: {:?}", err));

        let flattening = expand_table(&schema);

        assert_eq!(flattening.selects, test.selects, "{}", test.name);
        let joins: Vec<String> = flattening
            .joins
            .iter()
            .map(|join| normalize_whitespace(join))
            .collect();
        assert_eq!(joins, test.joins, "{}", test.name);
        assert_eq!(flattening.join_targets().len(), joins.len());
    }
}

#[test]
fn test_expand_is_deterministic() {
    for test in load_tests().tests {
        let schema: Vec<Field> = serde_json::from_str(&test.schema).unwrap();
        assert_eq!(expand_table(&schema), expand_table(&schema));
    }
}

#[test]
fn test_join_clause_layout() {
    let schema: Vec<Field> =
        serde_json::from_str(r#"[{"name": "tags", "type": "STRING", "mode": "REPEATED"}]"#)
            .unwrap();
    let flattening = expand_table(&schema);
    assert_eq!(flattening.joins, vec![" LEFT JOIN\n    t.tags AS tags"]);
}

#[test]
fn test_expand_from_other_parent() {
    let schema: Vec<Field> =
        serde_json::from_str(r#"[{"name": "sku", "type": "STRING"}]"#).unwrap();
    let flattening = expand_fields("items", &schema);
    assert_eq!(flattening.selects, vec!["items.sku AS items_sku"]);
    assert!(flattening.joins.is_empty());
}
