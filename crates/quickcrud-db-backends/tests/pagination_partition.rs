//! `limit=1` pages over offsets `0..N` reproduce the unpaginated order.

use std::sync::Arc;

use proptest::prelude::*;
use quickcrud_core::ParamMap;
use quickcrud_db::{ColumnSpec, MutationCoordinator, QueryExecutor, Row, SchemaRegistry, SemanticType};
use quickcrud_db_backends::InMemoryExecutor;
use serde_json::json;

fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            "items",
            vec![
                ColumnSpec::new("id", SemanticType::Int64).primary_key(),
                ColumnSpec::new("rank", SemanticType::Int16).nullable(),
                ColumnSpec::new("label", SemanticType::String),
            ],
        )
        .unwrap();
    registry.into_shared()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn check_partition(
    executor: Arc<dyn QueryExecutor>,
    ranks: &[Option<i16>],
    labels: &[String],
    query: &str,
) -> Result<(), TestCaseError> {
    let coordinator = MutationCoordinator::new(registry(), executor);
    coordinator.ensure_entities().await.unwrap();

    let body: Vec<_> = ranks
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(id, (rank, label))| json!({"id": id, "rank": rank, "label": label}))
        .collect();
    coordinator.insert_many("items", &json!(body)).await.unwrap();

    let full = coordinator
        .find_many("items", &ParamMap::parse(query))
        .await
        .unwrap();
    prop_assert_eq!(full.total as usize, ranks.len());

    let mut paged: Vec<Row> = Vec::new();
    for offset in 0..ranks.len() {
        let params = ParamMap::parse(query)
            .with("limit", "1")
            .with("offset", offset.to_string());
        let page = coordinator.find_many("items", &params).await.unwrap();
        prop_assert_eq!(page.total, full.total);
        prop_assert_eq!(page.rows.len(), 1);
        paged.extend(page.rows);
    }
    prop_assert_eq!(paged, full.rows);
    Ok(())
}

fn arb_query() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(""),
        Just("order_by_columns=rank%3A+DESC"),
        Just("order_by_columns=rank%3A+ASC&order_by_columns=label%3A+DESC"),
        Just("order_by_columns=label"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn singleton_pages_partition_the_ordering(
        rows in prop::collection::vec((prop::option::of(-3i16..3), "[ab]{1,2}"), 1..8),
        query in arb_query(),
    ) {
        let (ranks, labels): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let rt = runtime();
        rt.block_on(check_partition(Arc::new(InMemoryExecutor::new()), &ranks, &labels, query))?;
        #[cfg(feature = "sqlite")]
        rt.block_on(check_partition(
            Arc::new(quickcrud_db_backends::SqliteExecutor::memory().unwrap()),
            &ranks,
            &labels,
            query,
        ))?;
    }
}
