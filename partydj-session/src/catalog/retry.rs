//! Retry-once-on-unauthorized combinator

use std::future::Future;

use super::CatalogError;

/// Run `call`; on `Unauthorized`, run `on_unauthorized` and call once more
///
/// Any other outcome of the first attempt is returned as is. A second
/// `Unauthorized` is returned to the caller.
pub async fn with_auth_retry<T, F, Fut, R, RFut>(
    mut call: F,
    on_unauthorized: R,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<(), CatalogError>>,
{
    match call().await {
        Err(CatalogError::Unauthorized) => {
            tracing::debug!("Catalog call unauthorized, refreshing credentials and retrying");
            on_unauthorized().await?;
            call().await
        }
        other => other,
    }
}
