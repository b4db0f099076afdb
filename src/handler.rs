use serde::Serialize;
use tracing::{error, info};

use crate::analysis::SegmentJoin;
use crate::cdn::Invalidator;
use crate::config::{MAP_CONTENT_TYPE, MAP_KEY, MapConfig};
use crate::loader::{LoadedTracks, load_store};
use crate::render::render_map;
use crate::storage::ObjectStore;

pub const STATUS_OK: u16 = 200;
pub const STATUS_UPLOAD_FAILED: u16 = 500;

/// Outcome of one publish run, shaped like a function-as-a-service reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

/// Rebuild the map from `input`, store it in `output` and purge the cached
/// copy. A failed load produces a map without trails; a failed purge is only
/// logged.
pub async fn publish<I, O, C>(
    input: &I,
    output: &O,
    invalidator: Option<&C>,
    config: &MapConfig,
    join: SegmentJoin,
) -> InvocationResponse
where
    I: ObjectStore,
    O: ObjectStore,
    C: Invalidator,
{
    info!("## CONFIGURATION");
    info!("{config:?}");

    let loaded = match load_store(input, join).await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Failed to load activities: {e}");
            LoadedTracks::default()
        }
    };

    let html = render_map(&loaded, config);

    let location = output.location(MAP_KEY);
    if let Err(e) = output
        .put(MAP_KEY, html.into_bytes(), MAP_CONTENT_TYPE)
        .await
    {
        error!("Error saving HTML file to {location}: {e}");
        return InvocationResponse {
            status_code: STATUS_UPLOAD_FAILED,
            body: format!("Failed to save HTML file: {e}"),
        };
    }
    info!("HTML file successfully saved to {location}");

    match invalidator {
        Some(cdn) => match cdn.invalidate(&[format!("/{MAP_KEY}")]).await {
            Ok(response) => info!("Cache invalidation request created: {response}"),
            Err(e) => error!("Cache invalidation failed: {e}"),
        },
        None => info!("No CDN configured, skipping cache invalidation"),
    }

    InvocationResponse {
        status_code: STATUS_OK,
        body: "HTML file successfully saved to bucket.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case_fields() {
        let response = InvocationResponse {
            status_code: 200,
            body: "ok".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "statusCode": 200, "body": "ok" }));
    }
}
