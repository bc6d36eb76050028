use bytes::Bytes;
use tokio::task;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::id::{generate_id, PasteId};
use crate::index::build_index_html;
use crate::render::{Rendered, Renderer, Variant};
use crate::storage::FileStorage;

/// How many fresh ids an upload may try before giving up on collisions.
const MAX_ID_ATTEMPTS: usize = 4;

pub async fn create(storage: &FileStorage, data: Bytes) -> crate::ApiResult<PasteId> {
    create_with(storage, data, generate_id).await
}

async fn create_with(
    storage: &FileStorage,
    data: Bytes,
    mut next_id: impl FnMut() -> crate::ApiResult<PasteId>,
) -> crate::ApiResult<PasteId> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let key = next_id()?;
        match storage.put_object(&key, data.clone()).await {
            Ok(()) => {
                info!("new paste: key='{key}', size={size}", size = data.len());
                return Ok(key);
            }
            Err(ApiError::IdCollision) => warn!("paste key '{key}' already taken"),
            Err(err) => return Err(err),
        }
    }

    Err(ApiError::IdCollision)
}

pub async fn render(
    storage: &FileStorage,
    renderer: &Renderer,
    key: &str,
    variant: Variant,
    lang: Option<String>,
) -> crate::ApiResult<Rendered> {
    let key = PasteId::parse(key)?;
    let data = storage.get_object(&key).await?;
    debug!("rendering paste '{key}' as {variant:?}");

    let renderer = renderer.clone();
    task::spawn_blocking(move || renderer.render(data, variant, lang.as_deref()))
        .await
        .map_err(ApiError::render)?
}

pub async fn index(storage: &FileStorage, base_url: &str) -> crate::ApiResult<String> {
    let pastes = storage.list_objects().await?;
    let html = build_index_html(base_url, &pastes);
    info!("index rendered with {} pastes", pastes.len());
    Ok(html)
}
