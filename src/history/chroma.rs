use async_trait::async_trait;
use log::{ info, warn };
use reqwest::header::{ HeaderMap, HeaderValue };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Map, Value as JsonValue };
use tokio::sync::OnceCell;

use crate::cli::Args;
use crate::error::StoreError;
use crate::history::{ HistoryStore, COLLECTION_DESCRIPTION };
use crate::models::chat::{ ChatMessage, HistoryMatch, Role };

/// Chroma over its HTTP API. The collection id is resolved on first use
/// with a get-or-create call and reused afterwards.
pub struct ChromaHistoryStore {
    http: HttpClient,
    collections_url: String,
    collection_name: String,
    resolved_id: OnceCell<String>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [Vec<f32>; 1],
    metadatas: [JsonValue; 1],
    documents: [&'a str; 1],
}

#[derive(Serialize)]
struct QueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: [&'static str; 2],
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, JsonValue>>>>>,
}

impl QueryResponse {
    /// Pairs the first query's documents with their stored roles, keeping
    /// the backend's ranking.
    fn into_matches(self) -> Vec<HistoryMatch> {
        let documents = match self.documents.and_then(|d| d.into_iter().next()) {
            Some(docs) if !docs.is_empty() => docs,
            _ => return Vec::new(),
        };
        let metadatas = self.metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();

        documents
            .into_iter()
            .enumerate()
            .filter_map(|(index, doc)| {
                let content = doc?;
                let role = metadatas
                    .get(index)
                    .and_then(|m| m.as_ref())
                    .and_then(|m| m.get("role"))
                    .and_then(|r| r.as_str())
                    .and_then(|r| r.parse::<Role>().ok());
                match role {
                    Some(role) => Some(HistoryMatch { content, role }),
                    None => {
                        warn!("Skipping history document {} without a usable role", index);
                        None
                    }
                }
            })
            .collect()
    }
}

impl ChromaHistoryStore {
    pub fn new(args: &Args) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = Args::non_empty(&args.vector_secret) {
            headers.insert(
                "x-chroma-token",
                HeaderValue::from_str(&token).map_err(|e|
                    StoreError::Unavailable(format!("Invalid Chroma token: {}", e))
                )?
            );
        }
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            collections_url: collections_url(
                &args.vector_host,
                &args.vector_tenant,
                &args.vector_database
            ),
            collection_name: args.collection.clone(),
            resolved_id: OnceCell::new(),
        })
    }

    async fn collection_id(&self) -> Result<&str, StoreError> {
        let id = self.resolved_id.get_or_try_init(|| async {
            let collection = self.http
                .post(&self.collections_url)
                .json(&create_collection_body(&self.collection_name))
                .send().await?
                .error_for_status()?
                .json::<CollectionResponse>().await
                .map_err(|e| StoreError::Malformed(e.to_string()))?;
            info!("Using Chroma collection '{}' ({})", self.collection_name, collection.id);
            Ok::<String, StoreError>(collection.id)
        }).await?;
        Ok(id.as_str())
    }

    fn collection_url(&self, id: &str, action: &str) -> String {
        format!("{}/{}/{}", self.collections_url, id, action)
    }
}

fn collections_url(host: &str, tenant: &str, database: &str) -> String {
    format!(
        "{}/api/v2/tenants/{}/databases/{}/collections",
        host.trim_end_matches('/'),
        tenant,
        database
    )
}

/// Create-if-missing in one call: Chroma returns the existing collection
/// when the name is taken.
fn create_collection_body(name: &str) -> JsonValue {
    json!({
        "name": name,
        "metadata": { "description": COLLECTION_DESCRIPTION },
        "get_or_create": true,
    })
}

#[async_trait]
impl HistoryStore for ChromaHistoryStore {
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        self.collection_id().await.map(|_| ())
    }

    async fn add(&self, message: &ChatMessage, embedding: Vec<f32>) -> Result<(), StoreError> {
        let id = self.collection_id().await?;
        let req = AddRequest {
            ids: [message.id.as_str()],
            embeddings: [embedding],
            metadatas: [json!({ "role": message.role.as_str(), "timestamp": message.timestamp })],
            documents: [message.content.as_str()],
        };

        self.http.post(self.collection_url(id, "add")).json(&req).send().await?.error_for_status()?;
        Ok(())
    }

    async fn query(&self, embedding: Vec<f32>, k: usize) -> Result<Vec<HistoryMatch>, StoreError> {
        let id = self.collection_id().await?;
        let req = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: k,
            include: ["documents", "metadatas"],
        };

        let resp = self.http
            .post(self.collection_url(id, "query"))
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<QueryResponse>().await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        Ok(resp.into_matches())
    }
}
