//! REST API for vecdocs.
//!
//! One [`VecStore`] is loaded at startup and shared by every handler through
//! [`AppState`]. Handlers that change the store save it to disk before
//! responding.
//!
//! ## Endpoints
//!
//! - `POST /collections` - Create a collection
//! - `GET /collections` - List collection names
//! - `GET /count_collection` - List collection names (bare array)
//! - `DELETE /collections/{name}` - Drop a collection
//! - `GET /collections/{name}/documents` - List documents of a collection
//! - `POST /collections/{name}/documents` - Insert a document
//! - `PUT /collections/{name}/documents/{doc}` - Update a document
//! - `DELETE /collections/{name}/documents/{doc}` - Delete a document
//! - `POST /collections/{name}/search` - Search a collection
//! - `GET /documents/{doc}` - Fetch a document's text
//! - `POST /save` - Save the store
//! - `POST /load` - Reload the store from disk
//!
//! Search answers `{"results": [{"doc_name", "text", "distance"}, ...]}`,
//! nearest first, with `distance` the squared L2 distance. Results are
//! objects rather than `[doc_name, text]` pairs.
//!
//! Errors answer `{"detail": message}`: 400 for bad input (unknown or
//! duplicate names, malformed JSON), 500 for IO, serialization and
//! embedding failures.
//!
//! Embedding and disk IO run on actix's blocking pool via `web::block`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{middleware::NormalizePath, web, App, HttpServer};
//! use vecdocs::server::AppState;
//! use vecdocs::{EmbedderConfig, VecStore};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let store = VecStore::load_or_new("vectordb.bin", EmbedderConfig::default()).unwrap();
//!     let state = web::Data::new(AppState::new(store, "vectordb.bin"));
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .app_data(state.clone())
//!             .wrap(NormalizePath::trim())
//!             .configure(vecdocs::server::config)
//!     })
//!     .bind("0.0.0.0:8000")?
//!     .run()
//!     .await
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

use actix_web::{
    error::{InternalError, JsonPayloadError},
    http::StatusCode,
    web, HttpRequest, HttpResponse, ResponseError,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::{SearchHit, VecStore};
use crate::embed::DEFAULT_DIMENSION;
use crate::error::StoreError;

/// Shared state handed to every handler.
pub struct AppState {
    store: RwLock<VecStore>,
    path: PathBuf,
}

impl AppState {
    /// Wraps `store`, which is saved to and reloaded from `path`.
    pub fn new(store: VecStore, path: impl AsRef<Path>) -> AppState {
        AppState { store: RwLock::new(store), path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_client_error() {
            warn!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

// --- Request structs ---

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_top_n() -> usize {
    5
}

#[derive(Deserialize)]
struct CreateCollectionRequest {
    name: String,
    #[serde(default = "default_dimension")]
    dimension: usize,
}

#[derive(Deserialize)]
struct InsertRequest {
    doc_name: String,
    text: String,
}

#[derive(Deserialize)]
struct UpdateQuery {
    new_text: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRequest {
    new_text: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_top_n")]
    top_n: usize,
}

// --- Response structs ---

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn ok(message: String) -> HttpResponse {
        HttpResponse::Ok().json(MessageResponse { message })
    }
}

/// Error body, `{"detail": message}`.
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl ErrorResponse {
    fn new(detail: impl Into<String>) -> Self {
        ErrorResponse { detail: detail.into() }
    }
}

#[derive(Serialize)]
struct CollectionsResponse {
    count: usize,
    collections: Vec<String>,
}

#[derive(Serialize)]
struct DocumentResponse {
    doc_name: String,
    text: String,
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentResponse>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

// --- Handlers ---

/// Runs store work on the blocking pool. Embedding and file IO both happen in here.
async fn blocking<T, F>(state: web::Data<AppState>, work: F) -> Result<T, StoreError>
where
    F: FnOnce(&AppState) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    web::block(move || work(state.get_ref()))
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e.to_string())))?
}

async fn create_collection(
    state: web::Data<AppState>,
    body: web::Json<CreateCollectionRequest>,
) -> Result<HttpResponse, StoreError> {
    let CreateCollectionRequest { name, dimension } = body.into_inner();
    let message = format!("Collection '{}' created.", name);

    blocking(state, move |state| {
        let mut store = state.store.write();
        store.create_collection(&name, dimension)?;
        store.save(&state.path)
    })
    .await?;

    Ok(MessageResponse::ok(message))
}

async fn list_collections(state: web::Data<AppState>) -> HttpResponse {
    let store = state.store.read();
    let collections = store.collection_names();

    HttpResponse::Ok().json(CollectionsResponse { count: collections.len(), collections })
}

async fn count_collection(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.store.read().collection_names())
}

async fn drop_collection(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let name = path.into_inner();
    let message = format!("Collection '{}' dropped.", name);

    blocking(state, move |state| {
        let mut store = state.store.write();
        store.drop_collection(&name)?;
        store.save(&state.path)
    })
    .await?;

    Ok(MessageResponse::ok(message))
}

async fn list_documents(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let documents = state
        .store
        .read()
        .list_documents(&path)?
        .into_iter()
        .map(|(doc_name, text)| DocumentResponse { doc_name, text })
        .collect();

    Ok(HttpResponse::Ok().json(DocumentsResponse { documents }))
}

async fn insert_document(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<InsertRequest>,
) -> Result<HttpResponse, StoreError> {
    let collection = path.into_inner();
    let InsertRequest { doc_name, text } = body.into_inner();
    let message = format!("Document '{}' inserted into collection '{}'.", doc_name, collection);

    blocking(state, move |state| {
        let mut store = state.store.write();
        store.insert_document(&collection, &doc_name, &text)?;
        store.save(&state.path)
    })
    .await?;

    Ok(MessageResponse::ok(message))
}

/// The new text comes from the `new_text` query parameter or a JSON body.
async fn update_document(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<UpdateQuery>,
    body: Option<web::Json<UpdateRequest>>,
) -> Result<HttpResponse, StoreError> {
    let (collection, doc_name) = path.into_inner();
    let new_text = match (query.into_inner().new_text, body) {
        (Some(text), _) => text,
        (None, Some(body)) => body.into_inner().new_text,
        (None, None) => {
            return Ok(HttpResponse::BadRequest().json(ErrorResponse::new("missing 'new_text'")));
        }
    };
    let message = format!("Document '{}' in collection '{}' updated.", doc_name, collection);

    blocking(state, move |state| {
        let mut store = state.store.write();
        store.update_document(&collection, &doc_name, &new_text)?;
        store.save(&state.path)
    })
    .await?;

    Ok(MessageResponse::ok(message))
}

async fn delete_document(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, StoreError> {
    let (collection, doc_name) = path.into_inner();
    let message = format!("Document '{}' deleted from collection '{}'.", doc_name, collection);

    blocking(state, move |state| {
        let mut store = state.store.write();
        store.delete_document(&collection, &doc_name)?;
        store.save(&state.path)
    })
    .await?;

    Ok(MessageResponse::ok(message))
}

async fn search(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, StoreError> {
    let collection = path.into_inner();
    let SearchRequest { query, top_n } = body.into_inner();

    let results = blocking(state, move |state| state.store.read().search(&collection, &query, top_n)).await?;
    Ok(HttpResponse::Ok().json(SearchResponse { results }))
}

async fn get_document(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let doc_name = path.into_inner();
    let text = state.store.read().get_document(&doc_name)?.to_string();
    Ok(HttpResponse::Ok().json(DocumentResponse { doc_name, text }))
}

async fn save(state: web::Data<AppState>) -> Result<HttpResponse, StoreError> {
    blocking(state, |state| state.store.read().save(&state.path)).await?;
    Ok(MessageResponse::ok("Store saved.".to_string()))
}

/// Replaces the in-memory store with what is on disk. A missing file yields
/// an empty store using the current model configuration.
async fn load(state: web::Data<AppState>) -> Result<HttpResponse, StoreError> {
    blocking(state, |state| {
        let model = state.store.read().model().clone();
        let fresh = VecStore::load_or_new(&state.path, model)?;
        *state.store.write() = fresh;

        info!(path = %state.path.display(), "reloaded store");
        Ok(())
    })
    .await?;

    Ok(MessageResponse::ok("Store loaded.".to_string()))
}

/// Malformed or missing JSON bodies get the same error body as store errors.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()));
    InternalError::from_response(err, response).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error));
    cfg.service(
        web::resource("/collections")
            .route(web::post().to(create_collection))
            .route(web::get().to(list_collections)),
    )
    .service(web::resource("/count_collection").route(web::get().to(count_collection)))
    .service(web::resource("/collections/{name}").route(web::delete().to(drop_collection)))
    .service(
        web::resource("/collections/{name}/documents")
            .route(web::get().to(list_documents))
            .route(web::post().to(insert_document)),
    )
    .service(
        web::resource("/collections/{name}/documents/{doc}")
            .route(web::put().to(update_document))
            .route(web::delete().to(delete_document)),
    )
    .service(web::resource("/collections/{name}/search").route(web::post().to(search)))
    .service(web::resource("/documents/{doc}").route(web::get().to(get_document)))
    .service(web::resource("/save").route(web::post().to(save)))
    .service(web::resource("/load").route(web::post().to(load)));
}
