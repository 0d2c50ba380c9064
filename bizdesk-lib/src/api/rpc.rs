//! Remote procedure calls (`POST /rest/v1/rpc/{function}`)

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::execute::read_json;
use super::execute::to_body;
use crate::BizdeskClient;
use crate::error::Error;

impl BizdeskClient {
    /// Calls a stored procedure with named parameters.
    ///
    /// `params` must serialize to a JSON object; pass `&serde_json::json!({})`
    /// for functions without arguments.
    pub async fn rpc<P, T>(&self, function: &str, params: &P) -> Result<T, Error>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.rest_url(&format!("rpc/{function}"));
        let response = self
            .request(Method::POST, &url, None, Some(to_body(params)?))
            .await?;
        read_json(response).await
    }
}
