use async_trait::async_trait;
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;
use shared::Session;

use super::SupabaseClient;
use crate::backend::storage::error::{StorageError, StorageResult};
use crate::backend::storage::traits::{Query, Table, TableStore};

/// PostgREST media type asking for a single JSON object instead of an array
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];

    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{}", value)));
    }

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    params
}

fn id_filter(id: &str) -> [(&'static str, String); 1] {
    [("id", format!("eq.{}", id))]
}

#[async_trait]
impl TableStore for SupabaseClient {
    async fn select(&self, session: &Session, query: &Query) -> StorageResult<Vec<Value>> {
        debug!("GET /rest/v1/{} {:?}", query.table.name(), query);

        let request = self
            .client
            .get(self.rest_url(query.table))
            .query(&query_params(query));
        let response = self.authorized_for(request, session).send().await?;
        let body = Self::check(response).await?.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn select_single(&self, session: &Session, query: &Query) -> StorageResult<Value> {
        debug!("GET /rest/v1/{} (single) {:?}", query.table.name(), query);

        let request = self
            .client
            .get(self.rest_url(query.table))
            .query(&query_params(query))
            .header(ACCEPT, SINGLE_OBJECT);
        let response = self.authorized_for(request, session).send().await?;

        // PostgREST answers 406 when zero (or several) rows match
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(StorageError::NotFound);
        }

        let body = Self::check(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn insert(&self, session: &Session, table: Table, rows: Vec<Value>) -> StorageResult<()> {
        debug!("POST /rest/v1/{} ({} rows)", table.name(), rows.len());

        let request = self
            .client
            .post(self.rest_url(table))
            .header("Prefer", "return=minimal")
            .json(&rows);
        let response = self.authorized_for(request, session).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(
        &self,
        session: &Session,
        table: Table,
        id: &str,
        fields: Value,
    ) -> StorageResult<()> {
        debug!("PATCH /rest/v1/{}?id=eq.{}", table.name(), id);

        let request = self
            .client
            .patch(self.rest_url(table))
            .query(&id_filter(id))
            .header("Prefer", "return=minimal")
            .json(&fields);
        let response = self.authorized_for(request, session).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, session: &Session, table: Table, id: &str) -> StorageResult<()> {
        debug!("DELETE /rest/v1/{}?id=eq.{}", table.name(), id);

        let request = self.client.delete(self.rest_url(table)).query(&id_filter(id));
        let response = self.authorized_for(request, session).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use shared::User;

    fn session() -> Session {
        Session {
            access_token: "token-1".to_string(),
            refresh_token: None,
            user: User {
                id: "user-1".to_string(),
                email: Some("parent@example.com".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_select_sends_filters_order_and_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/visits")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("child_id".into(), "eq.c1".into()),
                Matcher::UrlEncoded("order".into(), "date.desc".into()),
            ]))
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"v1","child_id":"c1","date":"2026-01-02","reason":"Fever"}]"#)
            .expect(1)
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon-key").unwrap();
        let query = Query::from(Table::Visits).eq("child_id", "c1").order("date", false);
        let rows = client.select(&session(), &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["reason"], "Fever");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_select_single_not_acceptable_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/children")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.other".into()))
            .match_header("accept", SINGLE_OBJECT)
            .with_status(406)
            .with_body(
                json!({
                    "code": "PGRST116",
                    "message": "JSON object requested, multiple (or no) rows returned"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon-key").unwrap();
        let query = Query::from(Table::Children).eq("id", "other");
        let result = client.select_single(&session(), &query).await;

        assert!(matches!(result, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_insert_posts_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/children")
            .match_header("prefer", "return=minimal")
            .match_body(Matcher::Json(json!([
                {"user_id": "user-1", "name": "Ada", "dob": "2020-05-20", "allergies": ["Peanuts"]}
            ])))
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon-key").unwrap();
        let row = json!({
            "user_id": "user-1", "name": "Ada", "dob": "2020-05-20", "allergies": ["Peanuts"]
        });
        client.insert(&session(), Table::Children, vec![row]).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_and_delete_target_id() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PATCH", "/rest/v1/doctors")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.d1".into()))
            .match_body(Matcher::PartialJson(json!({"name": "Dr. Who"})))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/rest/v1/doctors")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.d1".into()))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon-key").unwrap();
        client
            .update(&session(), Table::Doctors, "d1", json!({"name": "Dr. Who"}))
            .await
            .unwrap();
        client.delete(&session(), Table::Doctors, "d1").await.unwrap();

        update.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_backend_error_carries_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/visits")
            .with_status(403)
            .with_body(r#"{"code":"42501","message":"new row violates row-level security policy"}"#)
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon-key").unwrap();
        let result = client.insert(&session(), Table::Visits, vec![json!({})]).await;

        match result {
            Err(StorageError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("row-level security"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
