use serde::Deserialize;

/// Request body for a status update. The status arrives as a plain string
/// and is validated against the known values before anything is written.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
}
