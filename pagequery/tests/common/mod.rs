#![allow(dead_code)]

use axum::{Router, extract::State, routing::get};
use pagequery::{
    ApiError, EntitySchema, FieldType, InMemoryStore, PageConfig, PageQuery, PagedJson, SeaOrmStore, paginate,
};
use sea_orm::{ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use serde_json::{Value, json};
use std::sync::Arc;

pub mod instance {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "service_instances")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        pub status: String,
        pub replicas: i32,
        pub region: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// `(id, name, status, replicas, region)`
pub const INSTANCES: [(i32, &str, &str, i32, Option<&str>); 5] = [
    (1, "web-1", "ACTIVE", 3, Some("eu")),
    (2, "web-2", "INACTIVE", 1, Some("us")),
    (3, "api-1", "ACTIVE", 5, None),
    (4, "worker_1", "ACTIVE", 2, Some("eu")),
    (5, "db-1", "DEGRADED", 1, Some("us")),
];

pub fn instance_schema() -> EntitySchema {
    EntitySchema::new("service_instances", "id")
        .field("id", FieldType::Integer)
        .field("name", FieldType::String)
        .field("status", FieldType::enumeration(["ACTIVE", "INACTIVE", "DEGRADED"]))
        .field("replicas", FieldType::Integer)
        .field("region", FieldType::String)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(instance::Entity)))
        .await?;

    let rows = INSTANCES.iter().map(|&(id, name, status, replicas, region)| instance::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        status: Set(status.to_string()),
        replicas: Set(replicas),
        region: Set(region.map(str::to_string)),
    });
    instance::Entity::insert_many(rows).exec(&db).await?;
    Ok(db)
}

pub fn instance_documents() -> Vec<Value> {
    INSTANCES
        .iter()
        .map(|&(id, name, status, replicas, region)| {
            json!({"id": id, "name": name, "status": status, "replicas": replicas, "region": region})
        })
        .collect()
}

pub fn memory_store() -> InMemoryStore {
    InMemoryStore::new(instance_documents())
}

pub fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|row| row["id"].as_i64()).collect()
}

#[derive(Clone)]
struct AppState {
    store: Arc<SeaOrmStore<instance::Entity>>,
    schema: Arc<EntitySchema>,
    config: PageConfig,
}

async fn list_instances(
    State(state): State<AppState>,
    PageQuery(request): PageQuery,
) -> Result<PagedJson<Value>, ApiError> {
    let page = paginate(state.store.as_ref(), &state.schema, &state.config, request).await?;
    Ok(PagedJson::new("instances", page))
}

pub fn setup_test_app(db: &DatabaseConnection, config: PageConfig) -> Router {
    let state = AppState {
        store: Arc::new(SeaOrmStore::new(db.clone())),
        schema: Arc::new(instance_schema()),
        config,
    };
    Router::new()
        .route("/instances", get(list_instances))
        .with_state(state)
}
