//! Trello HTTP board client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;

use super::{
    Board, BoardApi, BoardApiError, BoardCredentials, Result, Webhook, WebhookRequest,
    INVALID_ID_SENTINEL,
};

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";

pub struct TrelloClient {
    client: Client,
    base_url: String,
    credentials: BoardCredentials,
}

#[derive(Serialize)]
struct CreateWebhookBody<'a> {
    key: &'a str,
    token: &'a str,
    description: &'a str,
    #[serde(rename = "callbackURL")]
    callback_url: &'a str,
    #[serde(rename = "idModel")]
    id_model: &'a str,
}

impl TrelloClient {
    pub fn new(credentials: BoardCredentials, timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, credentials, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: BoardCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoardApiError::Transport(format!("build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BoardApiError::Transport(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| BoardApiError::Transport(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn a non-success response into the matching error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if body.trim() == INVALID_ID_SENTINEL || status == reqwest::StatusCode::NOT_FOUND {
        return Err(BoardApiError::InvalidId(body.trim().to_string()));
    }
    Err(BoardApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl BoardApi for TrelloClient {
    async fn get_board(&self, reference: &str) -> Result<Board> {
        let url = self.endpoint(&["boards", reference])?;
        tracing::debug!("Looking up board {}", reference);

        let response = self
            .client
            .get(url)
            .query(&[
                ("key", self.credentials.key.as_str()),
                ("token", self.credentials.token.as_str()),
                ("fields", "name,desc"),
            ])
            .send()
            .await?;

        let board: Board = check_status(response).await?.json().await?;
        Ok(board)
    }

    async fn create_webhook(&self, request: &WebhookRequest) -> Result<Webhook> {
        let url = self.endpoint(&["webhooks"])?;
        tracing::debug!("Creating webhook for board {}", request.board_id);

        let body = CreateWebhookBody {
            key: &self.credentials.key,
            token: &self.credentials.token,
            description: &request.description,
            callback_url: &request.callback_url,
            id_model: &request.board_id,
        };

        let response = self.client.post(url).json(&body).send().await?;
        let webhook: Webhook = check_status(response).await?.json().await?;
        Ok(webhook)
    }
}
