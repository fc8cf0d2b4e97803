use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::collection_path::CollectionPath;

/// A generated snippet stored in a user's history collection.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub component: String,
    pub description: String,
    pub code: String,
    /// Assigned by the store at write time. May be absent on records that were
    /// imported or written before a timestamp was resolved.
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: String,
}

/// Document body for a new history record. `id` and `timestamp` are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoryRecord {
    pub component: String,
    pub description: String,
    pub code: String,
    pub user_id: String,
}

impl HistoryRecord {
    pub async fn create(
        pool: &SqlitePool,
        path: &CollectionPath,
        data: &CreateHistoryRecord,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        sqlx::query_as::<_, HistoryRecord>(
            r#"INSERT INTO generated_code (id, app_id, user_id, component, description, code, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, component, description, code, timestamp, user_id"#,
        )
        .bind(&id)
        .bind(path.app_id())
        .bind(path.user_id())
        .bind(&data.component)
        .bind(&data.description)
        .bind(&data.code)
        .bind(timestamp)
        .fetch_one(pool)
        .await
    }

    /// All records in the collection, in storage order. Callers sort.
    pub async fn find_by_collection(
        pool: &SqlitePool,
        path: &CollectionPath,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, HistoryRecord>(
            r#"SELECT id, component, description, code, timestamp, user_id
            FROM generated_code
            WHERE app_id = $1 AND user_id = $2"#,
        )
        .bind(path.app_id())
        .bind(path.user_id())
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_collection(
        pool: &SqlitePool,
        path: &CollectionPath,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM generated_code WHERE app_id = $1 AND user_id = $2",
        )
        .bind(path.app_id())
        .bind(path.user_id())
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn record(user_id: &str, code: &str) -> CreateHistoryRecord {
        CreateHistoryRecord {
            component: "LED".to_string(),
            description: "blink every second".to_string(),
            code: code.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamp() {
        let db = DBService::new_in_memory().await.unwrap();
        let path = CollectionPath::generated_code("app", "alice").unwrap();

        let created = HistoryRecord::create(&db.pool, &path, &record("alice", "void setup() {}"))
            .await
            .unwrap();

        assert!(!created.id.is_empty());
        assert!(created.timestamp.is_some());
        assert_eq!(created.code, "void setup() {}");
        assert_eq!(created.user_id, "alice");
    }

    #[tokio::test]
    async fn find_is_scoped_to_the_collection() {
        let db = DBService::new_in_memory().await.unwrap();
        let alice = CollectionPath::generated_code("app", "alice").unwrap();
        let bob = CollectionPath::generated_code("app", "bob").unwrap();
        let other_app = CollectionPath::generated_code("other", "alice").unwrap();

        HistoryRecord::create(&db.pool, &alice, &record("alice", "a1")).await.unwrap();
        HistoryRecord::create(&db.pool, &alice, &record("alice", "a2")).await.unwrap();
        HistoryRecord::create(&db.pool, &bob, &record("bob", "b1")).await.unwrap();
        HistoryRecord::create(&db.pool, &other_app, &record("alice", "x1")).await.unwrap();

        let mut codes: Vec<String> = HistoryRecord::find_by_collection(&db.pool, &alice)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["a1", "a2"]);
        assert_eq!(
            HistoryRecord::count_by_collection(&db.pool, &bob).await.unwrap(),
            1
        );
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let record = HistoryRecord {
            id: "doc-1".to_string(),
            component: "Servo Motor".to_string(),
            description: "sweep".to_string(),
            code: "#include <Servo.h>".to_string(),
            timestamp: None,
            user_id: "u1".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], "u1");
        assert!(value["timestamp"].is_null());
    }
}
