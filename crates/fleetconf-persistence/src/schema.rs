//! Schema bootstrap
//!
//! Creates every table from its entity definition. Used by the server's
//! `init-schema` command and by the test suites running on SQLite.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, sea_query::Index,
};
use tracing::info;

use crate::entity::{
    app_info, app_node, config_resource_value, configuration, configuration_history,
    configuration_publish, configuration_resource_relation, configuration_status, operation_log,
};

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Create all tables and the configuration uniqueness index
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, configuration::Entity).await?;
    create_table(db, &schema, configuration_history::Entity).await?;
    create_table(db, &schema, configuration_resource_relation::Entity).await?;
    create_table(db, &schema, configuration_publish::Entity).await?;
    create_table(db, &schema, configuration_status::Entity).await?;
    create_table(db, &schema, app_info::Entity).await?;
    create_table(db, &schema, app_node::Entity).await?;
    create_table(db, &schema, config_resource_value::Entity).await?;
    create_table(db, &schema, operation_log::Entity).await?;

    let unique_name = Index::create()
        .name("uk_configuration_aid_env_name_format")
        .table(configuration::Entity)
        .col(configuration::Column::Aid)
        .col(configuration::Column::Env)
        .col(configuration::Column::Name)
        .col(configuration::Column::Format)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&unique_name)).await?;

    info!("schema ready on {:?}", backend);
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Database, EntityTrait, Set};

    use super::*;

    #[tokio::test]
    async fn test_create_tables_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        create_tables(&db).await.unwrap();
        create_tables(&db).await.unwrap();

        let app = app_info::ActiveModel {
            aid: Set(1),
            app_name: Set("svc".to_string()),
            govern_port: Set("9090".to_string()),
        }
        .insert(&db)
        .await
        .unwrap();
        assert_eq!(app.aid, 1);

        let found = app_info::Entity::find_by_id(1).one(&db).await.unwrap();
        assert_eq!(found.map(|a| a.app_name), Some("svc".to_string()));
    }

    #[tokio::test]
    async fn test_configuration_unique_index() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        create_tables(&db).await.unwrap();

        let now = sea_orm::prelude::DateTime::default();
        let row = || configuration::ActiveModel {
            aid: Set(1),
            name: Set("app".to_string()),
            content: Set(String::new()),
            format: Set("toml".to_string()),
            env: Set("dev".to_string()),
            zone: Set("wh".to_string()),
            version: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
            published_at: Set(None),
            ..Default::default()
        };

        row().insert(&db).await.unwrap();
        assert!(row().insert(&db).await.is_err());
    }
}
