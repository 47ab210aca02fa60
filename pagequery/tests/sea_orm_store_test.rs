// Paged queries against a real SQLite database through SeaOrmStore,
// cross-checked against the in-memory store on the same rows.

use pagequery::{
    EntitySchema, FieldType, FilterClause, FilterOperator, PageConfig, PageRequest, PageResponse, QueryError,
    SeaOrmStore, SortOrder, paginate, parse_query_string,
};
use serde_json::Value;

mod common;
use common::{ids, instance, instance_schema, memory_store, setup_test_db};

async fn run(request: PageRequest) -> PageResponse<Value> {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let store = SeaOrmStore::<instance::Entity>::new(db);
    paginate(&store, &instance_schema(), &PageConfig::default(), request)
        .await
        .expect("query should succeed")
}

#[tokio::test]
async fn test_default_page_sorted_by_identity() {
    let page = run(PageRequest::new()).await;
    assert_eq!(page.total_count, 5);
    assert_eq!(ids(&page.result_list), vec![1, 2, 3, 4, 5]);
    assert_eq!((page.offset, page.limit), (0, 20));
}

#[tokio::test]
async fn test_enum_filter_is_case_insensitive() {
    let page = run(PageRequest::new().add_filter("status", FilterOperator::Eq, ["active"])).await;
    assert_eq!(page.total_count, 3);
    assert_eq!(ids(&page.result_list), vec![1, 3, 4]);
}

#[tokio::test]
async fn test_sort_desc_with_identity_tie_break() {
    let request = PageRequest::new().add_sort(SortOrder::desc("replicas")).with_limit(3);
    let first = run(request.clone()).await;
    assert_eq!(first.total_count, 5);
    assert_eq!(ids(&first.result_list), vec![3, 1, 4]);

    let second = run(request.at_offset(3)).await;
    assert_eq!(ids(&second.result_list), vec![2, 5]);
    assert_eq!(second.offset, 3);
}

#[tokio::test]
async fn test_offset_past_end_keeps_total() {
    let page = run(PageRequest::new().with_offset(50)).await;
    assert!(page.result_list.is_empty());
    assert_eq!(page.total_count, 5);
}

#[tokio::test]
async fn test_range_filters_on_integers() {
    let page = run(PageRequest::new()
        .add_filter("replicas", FilterOperator::Ge, ["2"])
        .add_filter("replicas", FilterOperator::Lt, ["5"]))
    .await;
    assert_eq!(ids(&page.result_list), vec![1, 4]);
}

#[tokio::test]
async fn test_and_equalities_intersect() {
    let page = run(PageRequest::new()
        .add_filter("status", FilterOperator::Eq, ["ACTIVE"])
        .add_filter("region", FilterOperator::Eq, ["eu"]))
    .await;
    assert_eq!(page.total_count, 2);
    assert_eq!(ids(&page.result_list), vec![1, 4]);
}

#[tokio::test]
async fn test_same_request_same_order() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let sql = SeaOrmStore::<instance::Entity>::new(db);
    let memory = memory_store();
    let schema = instance_schema();
    let config = PageConfig::default();
    let request = PageRequest::new().add_sort(SortOrder::asc("replicas")).with_limit(4);

    let sql_first = paginate(&sql, &schema, &config, request.clone()).await.unwrap();
    let sql_second = paginate(&sql, &schema, &config, request.clone()).await.unwrap();
    assert_eq!(ids(&sql_first.result_list), ids(&sql_second.result_list));

    let memory_first = paginate(&memory, &schema, &config, request.clone()).await.unwrap();
    let memory_second = paginate(&memory, &schema, &config, request).await.unwrap();
    assert_eq!(ids(&memory_first.result_list), ids(&memory_second.result_list));
    assert_eq!(ids(&sql_first.result_list), ids(&memory_first.result_list));
}

#[tokio::test]
async fn test_renamed_column_filters_and_projects() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let store = SeaOrmStore::<instance::Entity>::new(db).with_column("instanceName", "name");
    let schema = EntitySchema::new("service_instances", "id")
        .field("id", FieldType::Integer)
        .field("instanceName", FieldType::String);

    let page = paginate(
        &store,
        &schema,
        &PageConfig::default(),
        PageRequest::new()
            .add_filter("instanceName", FilterOperator::StartsWith, ["web"])
            .add_fields_included(["instanceName"]),
    )
    .await
    .unwrap();

    assert_eq!(ids(&page.result_list), vec![1, 2]);
    let row = page.result_list[0].as_object().unwrap();
    assert_eq!(row["instanceName"], "web-1");
    assert!(row.get("name").is_none());
    assert!(row.get("status").is_none());
}

#[tokio::test]
async fn test_text_matching_is_case_insensitive() {
    let page = run(PageRequest::new().add_filter("name", FilterOperator::StartsWith, ["WEB"])).await;
    assert_eq!(ids(&page.result_list), vec![1, 2]);

    let page = run(PageRequest::new().add_filter("name", FilterOperator::EndsWith, ["-1"])).await;
    assert_eq!(ids(&page.result_list), vec![1, 3, 5]);
}

#[tokio::test]
async fn test_like_wildcards_are_literal() {
    let page = run(PageRequest::new().add_filter("name", FilterOperator::Contains, ["_"])).await;
    assert_eq!(ids(&page.result_list), vec![4]);

    let page = run(PageRequest::new().add_filter("name", FilterOperator::Contains, ["%"])).await;
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn test_presence_and_membership() {
    let page = run(PageRequest::new().add_clause(FilterClause::presence("region", FilterOperator::NotExists))).await;
    assert_eq!(ids(&page.result_list), vec![3]);

    let page = run(PageRequest::new().add_filter("region", FilterOperator::In, ["eu", "us"])).await;
    assert_eq!(page.total_count, 4);

    let page = run(PageRequest::new().add_filter("status", FilterOperator::NotIn, ["ACTIVE", "DEGRADED"])).await;
    assert_eq!(ids(&page.result_list), vec![2]);
}

#[tokio::test]
async fn test_or_groups_combine_with_and_clauses() {
    let request = PageRequest::new()
        .add_filter("name", FilterOperator::Contains, ["-"])
        .add_or_group(vec![FilterClause::new("status", FilterOperator::Eq, ["DEGRADED"])])
        .add_or_group(vec![FilterClause::new("replicas", FilterOperator::Ge, ["5"])]);
    let page = run(request).await;
    assert_eq!(ids(&page.result_list), vec![3, 5]);
}

#[tokio::test]
async fn test_inclusion_projection_keeps_identity() {
    let page = run(PageRequest::new().add_fields_included(["name"])).await;
    let row = page.result_list[0].as_object().unwrap();
    let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "name"]);
}

#[tokio::test]
async fn test_exclusion_projection() {
    let page = run(PageRequest::new().add_fields_excluded(["region", "replicas"])).await;
    for row in &page.result_list {
        assert!(row.get("region").is_none());
        assert!(row.get("replicas").is_none());
        assert!(row.get("status").is_some());
    }
}

#[tokio::test]
async fn test_unlimited_returns_all_rows() {
    let page = run(PageRequest::new().unlimited().add_sort(SortOrder::asc("name"))).await;
    assert_eq!(page.len(), 5);
    assert_eq!(page.limit, 5);
    assert_eq!(page.result_list[0]["name"], "api-1");
}

#[tokio::test]
async fn test_multi_valued_operator_is_persistence_error() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let store = SeaOrmStore::<instance::Entity>::new(db);
    let schema = instance_schema().multi_valued("region");
    let err = paginate(
        &store,
        &schema,
        &PageConfig::default(),
        PageRequest::new().add_filter("region", FilterOperator::Has, ["eu"]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, QueryError::Persistence(_)));
}

#[tokio::test]
async fn test_backends_agree() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let sql = SeaOrmStore::<instance::Entity>::new(db);
    let memory = memory_store();
    let schema = instance_schema();
    let config = PageConfig::default();

    let queries = [
        "sort[0].field=name&sort[0].order=DESC&limit=2&offset=1",
        "search[0].field=region&search[0].op=EQ&search[0].value=eu",
        "search[0].field=status&search[0].op=EQ&search[0].value=ACTIVE&search[1].field=region&search[1].op=EQ&search[1].value=eu",
        "search[0].field=replicas&search[0].op=LE&search[0].value=2&sort[0].field=status",
        "search[0].field=region&search[0].op=EXISTS&sort[0].field=replicas&limit=3",
        "or[0][0].field=name&or[0][0].op=CONTAINS&or[0][0].value=WORKER&or[1][0].field=status&or[1][0].op=NE&or[1][0].value=ACTIVE",
    ];

    for query in queries {
        let request = parse_query_string(query).unwrap();
        let from_sql = paginate(&sql, &schema, &config, request.clone()).await.unwrap();
        let from_memory = paginate(&memory, &schema, &config, request).await.unwrap();
        assert_eq!(from_sql.total_count, from_memory.total_count, "total for {query}");
        assert_eq!(ids(&from_sql.result_list), ids(&from_memory.result_list), "rows for {query}");
    }
}
