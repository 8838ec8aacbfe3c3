use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;
use tracing::error;

use models::document;

use crate::errors::ServiceError;
use crate::storage::document::{apply_update, document_id, DocFilter, Document, DocumentCollection};

/// Named document collection stored in the shared `document` table.
pub struct SeaOrmDocumentCollection {
    pub db: DatabaseConnection,
    name: String,
}

impl SeaOrmDocumentCollection {
    pub fn new(db: DatabaseConnection, name: impl Into<String>) -> Self {
        Self { db, name: name.into() }
    }

    async fn row(&self, id: &str) -> Result<Option<document::Model>, ServiceError> {
        document::Entity::find()
            .filter(document::Column::Collection.eq(self.name.as_str()))
            .filter(document::Column::Id.eq(id))
            .one(&self.db)
            .await
            .map_err(|e| db_error(&self.name, "find", e))
    }
}

fn db_error(collection: &str, op: &str, e: sea_orm::DbErr) -> ServiceError {
    error!(%collection, op, error = %e, "document operation failed");
    ServiceError::Persistence(format!("{op} on {collection}: {e}"))
}

fn body_of(model: document::Model) -> Option<Document> {
    match model.body {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[async_trait]
impl DocumentCollection for SeaOrmDocumentCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: Option<&DocFilter>) -> Result<Vec<Document>, ServiceError> {
        let mut query = document::Entity::find().filter(document::Column::Collection.eq(self.name.as_str()));
        if let Some(DocFilter { field, value: Value::String(id) }) = filter {
            if field == "_id" {
                query = query.filter(document::Column::Id.eq(id.as_str()));
            }
        }
        let rows = query
            .order_by_asc(document::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| db_error(&self.name, "find", e))?;
        Ok(rows
            .into_iter()
            .filter_map(body_of)
            .filter(|d| filter.map_or(true, |f| f.matches(d)))
            .collect())
    }

    async fn find_one(&self, filter: &DocFilter) -> Result<Option<Document>, ServiceError> {
        Ok(self.find(Some(filter)).await?.into_iter().next())
    }

    async fn insert_one(&self, doc: Document) -> Result<(), ServiceError> {
        let id = document_id(&doc)
            .ok_or_else(|| ServiceError::Validation("document without _id".into()))?
            .to_string();
        let now = Utc::now().into();
        let am = document::ActiveModel {
            collection: Set(self.name.clone()),
            id: Set(id),
            body: Set(Value::Object(doc)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        am.insert(&self.db).await.map_err(|e| db_error(&self.name, "insert", e))?;
        Ok(())
    }

    async fn update_one(&self, id: &str, set: Document, unset: &[String]) -> Result<bool, ServiceError> {
        let Some(found) = self.row(id).await? else {
            return Ok(false);
        };
        let mut body = match found.body.clone() {
            Value::Object(map) => map,
            _ => Document::new(),
        };
        apply_update(&mut body, set, unset);
        let mut am: document::ActiveModel = found.into();
        am.body = Set(Value::Object(body));
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await.map_err(|e| db_error(&self.name, "update", e))?;
        Ok(true)
    }

    async fn delete_one(&self, id: &str) -> Result<bool, ServiceError> {
        let res = document::Entity::delete_many()
            .filter(document::Column::Collection.eq(self.name.as_str()))
            .filter(document::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| db_error(&self.name, "delete", e))?;
        Ok(res.rows_affected > 0)
    }
}
