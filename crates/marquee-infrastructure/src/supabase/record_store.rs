//! Generic keyed-record access over the Supabase REST (PostgREST) surface.
//!
//! Every failure is classified into a typed [`StoreErrorKind`] here, at the
//! service boundary, so consumers branch on a tag instead of parsing error
//! message text.

use super::config::SupabaseConfig;
use super::session_handle::SessionHandle;
use marquee_core::error::{StoreError, StoreErrorKind};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// PostgREST media type requesting exactly one JSON object.
const PGRST_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST error code for "zero or many rows where one was requested".
const CODE_NO_SINGLE_ROW: &str = "PGRST116";

/// Postgres error code for "relation does not exist".
const CODE_UNDEFINED_TABLE: &str = "42P01";

/// An equality predicate on a record column.
#[derive(Debug, Clone)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    /// Matches records whose `column` equals `value`.
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

/// Client for the generic keyed record store.
///
/// Requests carry the anon key plus the current session's bearer token (when
/// signed in) so row-level policies evaluate against the caller's identity.
pub struct RecordStore {
    client: Client,
    config: SupabaseConfig,
    session: SessionHandle,
}

impl RecordStore {
    pub fn new(config: SupabaseConfig, session: SessionHandle) -> Self {
        Self {
            client: Client::new(),
            config,
            session,
        }
    }

    /// Selects all records matching the filters.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<T>, StoreError> {
        let request = self
            .authorized(self.client.get(self.rest_url(table)))
            .await
            .query(&query_pairs(filters));
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Selects exactly one record matching the filters.
    ///
    /// Zero matching rows classify as [`StoreErrorKind::NotFound`].
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<T, StoreError> {
        let request = self
            .authorized(self.client.get(self.rest_url(table)))
            .await
            .query(&query_pairs(filters))
            .header(header::ACCEPT, PGRST_OBJECT);
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Inserts a record and returns it as persisted.
    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        row: &impl serde::Serialize,
    ) -> Result<T, StoreError> {
        let request = self
            .authorized(self.client.post(self.rest_url(table)))
            .await
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, PGRST_OBJECT)
            .json(row);
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Patches all records matching the filters and returns them.
    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        patch: &impl serde::Serialize,
        filters: &[Filter],
    ) -> Result<Vec<T>, StoreError> {
        let request = self
            .authorized(self.client.patch(self.rest_url(table)))
            .await
            .query(&query_pairs(filters))
            .header("Prefer", "return=representation")
            .json(patch);
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Deletes all records matching the filters.
    pub async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), StoreError> {
        let request = self
            .authorized(self.client.delete(self.rest_url(table)))
            .await
            .query(&query_pairs(filters));
        self.send(request).await?;
        Ok(())
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .await
            .unwrap_or_else(|| self.config.anon_key.clone());
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await.map_err(|err| {
            StoreError::new(
                StoreErrorKind::Other,
                format!("record store request failed: {err}"),
            )
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_failure(status, &body);
        tracing::debug!("[RecordStore] request failed: {}", err);
        Err(err)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    response.json().await.map_err(|err| {
        StoreError::new(
            StoreErrorKind::Other,
            format!("failed to decode record store response: {err}"),
        )
    })
}

fn query_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_query_pair).collect()
}

/// Error shape returned by the record store service.
#[derive(Deserialize, Default)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Classifies a non-2xx response into a typed store error.
///
/// Error codes are checked before the HTTP status: a missing-single-row
/// response arrives as 406 but means "not found", not "access denied".
fn classify_failure(status: StatusCode, body: &str) -> StoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            trimmed.to_string()
        }
    });

    let kind = if parsed.code.as_deref() == Some(CODE_UNDEFINED_TABLE)
        || message.contains("does not exist")
    {
        StoreErrorKind::SchemaMissing
    } else if parsed.code.as_deref() == Some(CODE_NO_SINGLE_ROW) {
        StoreErrorKind::NotFound
    } else if matches!(status.as_u16(), 401 | 403 | 406) {
        StoreErrorKind::AccessDenied
    } else {
        StoreErrorKind::Other
    };

    let err = StoreError::new(kind, message);
    match parsed.code {
        Some(code) => err.with_code(code),
        None => err,
    }
}
