use proptest::prelude::*;
use quickcrud_core::ParamMap;
use quickcrud_db::fields::{ColumnSpec, SemanticType};
use quickcrud_db::query::FilterCompiler;
use quickcrud_db::registry::EntitySchema;
use quickcrud_db::row::Row;
use quickcrud_db::value::Value;

fn schema() -> EntitySchema {
    EntitySchema::new(
        "test_table",
        vec![
            ColumnSpec::new("primary_key", SemanticType::Int64).primary_key(),
            ColumnSpec::new("int4_value", SemanticType::Int32),
            ColumnSpec::new("text_value", SemanticType::String),
            ColumnSpec::new("bool_value", SemanticType::Boolean),
            ColumnSpec::new("date_value", SemanticType::Date),
        ],
        vec![],
    )
    .unwrap()
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("int4_value____from"),
        Just("int4_value____to"),
        Just("int4_value____list"),
        Just("int4_value____from_____comparison_operator"),
        Just("int4_value____list_____comparison_operator"),
        Just("text_value____str"),
        Just("text_value____str_____matching_pattern"),
        Just("text_value____list"),
        Just("bool_value____list"),
        Just("bool_value____from"),
        Just("date_value____to"),
        Just("ghost____list"),
        Just("limit"),
        Just("offset"),
        Just("order_by_columns"),
    ]
    .prop_map(str::to_string)
}

fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (-5i64..5).prop_map(|n| n.to_string()),
        Just("In".to_string()),
        Just("Not_equal".to_string()),
        Just("Greater_than".to_string()),
        Just("case_insensitive".to_string()),
        Just("true".to_string()),
        Just("2021-07-22".to_string()),
        Just("int4_value: DESC".to_string()),
        "[a-z%_]{0,4}",
    ]
}

fn arb_params() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_key(), arb_literal()), 0..8)
}

fn to_map(pairs: &[(String, String)]) -> ParamMap {
    pairs.iter().cloned().collect()
}

proptest! {
    #[test]
    fn compile_is_deterministic(pairs in arb_params()) {
        let schema = schema();
        let compiler = FilterCompiler::new(&schema);
        let first = compiler.compile(&to_map(&pairs));
        let second = compiler.compile(&to_map(&pairs));
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a.is_ok(), b.is_ok()),
        }
    }

    #[test]
    fn range_and_exclusion_are_conjunctive(
        from in -20i64..20,
        to in -20i64..20,
        excluded in prop::collection::vec(-20i64..20, 1..4),
        cell in -25i64..25,
    ) {
        let schema = schema();
        let mut params = ParamMap::new()
            .with("int4_value____from", from.to_string())
            .with("int4_value____to", to.to_string())
            .with("int4_value____list_____comparison_operator", "Not_equal");
        for value in &excluded {
            params.append("int4_value____list", value.to_string());
        }
        let compiled = FilterCompiler::new(&schema).compile(&params).unwrap();
        let matcher = compiled.filters.matcher().unwrap();

        let row = Row::from_pairs([("primary_key", Value::Int(0)), ("int4_value", Value::Int(cell))]);
        let expected = from <= cell && cell <= to && !excluded.contains(&cell);
        prop_assert_eq!(matcher.matches(&row), expected);
    }

    #[test]
    fn width_checks_follow_the_column_type(n in any::<i64>()) {
        let schema = schema();
        let params = ParamMap::new().with("int4_value____list", n.to_string());
        let fits = i32::try_from(n).is_ok();
        prop_assert_eq!(FilterCompiler::new(&schema).compile(&params).is_ok(), fits);
    }
}
