use crate::core::argument::{Argument, Variable};
use crate::core::criterion::Criterion;
use crate::core::document::{Document, JsonDocument};
use crate::core::migration::SpecSerializer;
use crate::core::models::{Element, Inclusion, ResultState};
use crate::core::operation::Operation;
use crate::core::rule_engine::RuleEngine;
use crate::core::spec::Spec;
use crate::storage::database::Database;
use std::fs;
use tempfile::tempdir;

const CONTROLLER: &str = r#"{
    "Tag": [
        {"Name": "TestTag", "Value": 123, "ExternalAccess": "Read/Write", "Constant": false},
        {"Name": "TestPump", "Value": 123, "ExternalAccess": "None", "Constant": true},
        {"Name": "Motor", "Value": 5, "ExternalAccess": "Read Only", "Constant": true}
    ],
    "Program": [
        {"Name": "MainProgram", "Disabled": false, "Routines": [
            {"$type": "Routine", "Name": "MainRoutine", "Type": "RLL"},
            {"$type": "Routine", "Name": "Faults", "Type": "ST"}
        ]},
        {"Name": "Unused", "Disabled": true, "Routines": []}
    ]
}"#;

fn document() -> JsonDocument {
    JsonDocument::from_json_str(CONTROLLER).unwrap()
}

fn states_of(spec: Spec) -> Vec<ResultState> {
    RuleEngine::new()
        .run(&spec, &document())
        .unwrap()
        .verifications
        .iter()
        .map(|v| v.result)
        .collect()
}

#[test]
fn sim_three_tags_two_matching_yield_two_verifications() {
    let spec = Spec::new("Test tags")
        .query(Element::Tag)
        .filter(Inclusion::All, [
            Criterion::new(Element::Tag, "Name", Operation::Containing).arg("Test"),
        ])
        .verify([Criterion::new(Element::Tag, "Value", Operation::EqualTo).arg(123)]);

    let outcome = RuleEngine::new().run(&spec, &document()).unwrap();

    assert_eq!(outcome.found, 3);
    assert_eq!(outcome.verifications.len(), 2);
    assert_eq!(outcome.result, ResultState::Passed);
    assert!(outcome.in_range);
    assert_eq!(outcome.verifications[0].candidate, "Tag 'TestTag'");
    assert_eq!(outcome.evaluations().count(), 2);
}

#[test]
fn sim_aggregation_table() {
    // TestTag 全部通过，TestPump 一个失败，Motor 全部失败
    let criteria = || {
        [
            Criterion::new(Element::Tag, "Value", Operation::EqualTo).arg(123),
            Criterion::new(Element::Tag, "Constant", Operation::IsFalse),
        ]
    };
    let build = |candidates: Inclusion, verifications: Inclusion| {
        Spec::new("Aggregate")
            .query(Element::Tag)
            .verify(criteria())
            .with_inclusion(candidates, verifications)
    };
    let run = |spec: Spec| RuleEngine::new().run(&spec, &document()).unwrap().result;

    assert_eq!(states_of(build(Inclusion::All, Inclusion::All)), vec![
        ResultState::Passed,
        ResultState::Failed,
        ResultState::Failed,
    ]);
    assert_eq!(states_of(build(Inclusion::All, Inclusion::Any)), vec![
        ResultState::Passed,
        ResultState::Passed,
        ResultState::Failed,
    ]);

    assert_eq!(run(build(Inclusion::All, Inclusion::All)), ResultState::Failed);
    assert_eq!(run(build(Inclusion::All, Inclusion::Any)), ResultState::Failed);
    assert_eq!(run(build(Inclusion::Any, Inclusion::All)), ResultState::Passed);
    assert_eq!(run(build(Inclusion::Any, Inclusion::Any)), ResultState::Passed);
}

#[test]
fn sim_error_outranks_failure() {
    let spec = Spec::new("Errors").query(Element::Tag).verify([
        Criterion::new(Element::Tag, "Value", Operation::EqualTo).arg(5),
        Criterion::new(Element::Tag, "Name", Operation::GreaterThan).arg(Argument::List(vec![])),
    ]);
    let outcome = RuleEngine::new().run(&spec, &document()).unwrap();

    assert!(outcome
        .evaluations()
        .filter(|e| e.result == ResultState::Error)
        .all(|e| e.error.is_some()));
    assert_eq!(outcome.result, ResultState::Error);
}

#[test]
fn sim_zero_verifications_report_counts_only() {
    let spec = Spec::new("Counts")
        .query(Element::Program)
        .filter(Inclusion::Any, [
            Criterion::new(Element::Program, "Disabled", Operation::IsFalse),
        ])
        .with_range(Criterion::new(Element::Program, "This", Operation::EqualTo).arg(1));

    let outcome = RuleEngine::new().run(&spec, &document()).unwrap();
    assert_eq!(outcome.result, ResultState::None);
    assert_eq!(outcome.found, 2);
    assert_eq!(outcome.candidates, 1);
    assert!(outcome.in_range);
    assert!(outcome.verifications.is_empty());
}

#[test]
fn sim_nested_collection_criteria() {
    let spec = Spec::new("Routines")
        .query(Element::Program)
        .verify([
            Criterion::new(Element::Program, "Routines", Operation::Any).arg(
                Criterion::new(Element::Routine, "Name", Operation::StartingWith).arg("Main"),
            ),
            Criterion::new(Element::Program, "Routines.Count", Operation::GreaterThanOrEqualTo)
                .arg(Variable::new("MinRoutines", 1)),
        ]);

    assert_eq!(states_of(spec), vec![ResultState::Passed, ResultState::Failed]);
}

#[test]
fn sim_legacy_spec_through_store_and_engine() {
    let dir = tempdir().unwrap();
    let spec_path = dir.path().join("legacy.json");
    fs::write(
        &spec_path,
        r#"{
            "SpecId": "4b4c0e4c-6a4f-4f6e-9b7e-1f3a2d5c6b7a",
            "Name": "Legacy",
            "Element": "Tag",
            "Filters": [{
                "CriterionId": "0f8fad5b-d9cb-469f-a165-70867728950e",
                "Type": "Tag", "Property": "Name", "Operation": "StartsWith",
                "Arguments": [{"Type": "Text", "Value": "Test"}]
            }],
            "Verifications": [{
                "CriterionId": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                "Type": "Tag", "Property": "ExternalAccess", "Operation": "Equal",
                "Arguments": [{"Type": "Text", "Value": "None"}], "Invert": true
            }],
            "Settings": {"FilterInclusion": "All", "VerificationInclusion": "All"}
        }"#,
    )
    .unwrap();

    let raw = fs::read_to_string(&spec_path).unwrap();
    let spec = SpecSerializer::default().deserialize(&raw).unwrap();

    let db = Database::open(&dir.path().join("specs.db")).unwrap();
    db.save_spec("node-1", &spec).unwrap();
    let loaded = db.load_spec("node-1").unwrap().unwrap();
    assert_eq!(loaded, spec);

    let outcome = RuleEngine::new().run(&loaded, &document()).unwrap();
    assert_eq!(outcome.candidates, 2);
    assert_eq!(outcome.result, ResultState::Failed);

    db.save_outcome("node-1", &outcome).unwrap();
    let history = db.load_recent_outcomes("node-1", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result, ResultState::Failed);
}

#[test]
fn sim_document_query_is_native_order() {
    let names: Vec<String> = document()
        .find(Element::Tag)
        .unwrap()
        .iter()
        .map(|t| t.member("Name").to_string())
        .collect();
    assert_eq!(names, vec!["TestTag", "TestPump", "Motor"]);
}
