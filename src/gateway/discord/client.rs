use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{
    Client, Method, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    config::DiscordConfig,
    error::{DiscordError, DiscordResult},
    models::{ChannelPayload, MessageBody, MessagePayload},
};
use crate::gateway::{ChannelInfo, ChatGateway, GatewayResult, MessageView};

/// Bot client for the Discord REST API.
#[derive(Clone)]
pub struct DiscordGateway {
    client: Client,
    api_base: Arc<str>,
}

impl DiscordGateway {
    /// Build an authenticated client; no request is made until the first call.
    pub fn new(config: DiscordConfig) -> DiscordResult<Self> {
        let mut authorization = HeaderValue::from_str(&format!("Bot {}", config.token))
            .map_err(|_| DiscordError::InvalidToken)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| DiscordError::ClientBuilder { source })?;

        Ok(Self {
            client,
            api_base: Arc::from(config.api_base.trim_end_matches('/')),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.api_base, path))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> DiscordResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| DiscordError::DecodeResponse {
                path: path.to_owned(),
                source,
            })
    }

    async fn fetch_channel(&self, channel_id: &str) -> DiscordResult<Option<ChannelInfo>> {
        let path = format!("channels/{channel_id}");
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|source| DiscordError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let channel: ChannelPayload = Self::decode(response, &path).await?;
                Ok(Some(ChannelInfo {
                    text_based: channel.is_text_based(),
                    id: channel.id,
                }))
            }
            status => Err(DiscordError::RequestStatus { path, status }),
        }
    }

    async fn post_message(&self, channel_id: &str, view: &MessageView) -> DiscordResult<String> {
        let path = format!("channels/{channel_id}/messages");
        let response = self
            .request(Method::POST, &path)
            .json(&MessageBody::from(view))
            .send()
            .await
            .map_err(|source| DiscordError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(DiscordError::RequestStatus {
                path,
                status: response.status(),
            });
        }

        let message: MessagePayload = Self::decode(response, &path).await?;
        debug!(channel_id, message_id = %message.id, "posted lobby message");
        Ok(message.id)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        view: &MessageView,
    ) -> DiscordResult<String> {
        let path = format!("channels/{channel_id}/messages/{message_id}");
        let response = self
            .request(Method::PATCH, &path)
            .json(&MessageBody::from(view))
            .send()
            .await
            .map_err(|source| DiscordError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DiscordError::UnknownMessage {
                message_id: message_id.to_owned(),
            }),
            status if status.is_success() => {
                let message: MessagePayload = Self::decode(response, &path).await?;
                Ok(message.id)
            }
            status => Err(DiscordError::RequestStatus { path, status }),
        }
    }
}

impl ChatGateway for DiscordGateway {
    fn fetch_channel(&self, channel_id: String) -> BoxFuture<'static, GatewayResult<Option<ChannelInfo>>> {
        let gateway = self.clone();
        Box::pin(async move { gateway.fetch_channel(&channel_id).await.map_err(Into::into) })
    }

    fn post_message(&self, channel_id: String, view: MessageView) -> BoxFuture<'static, GatewayResult<String>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway
                .post_message(&channel_id, &view)
                .await
                .map_err(Into::into)
        })
    }

    fn edit_message(
        &self,
        channel_id: String,
        message_id: String,
        view: MessageView,
    ) -> BoxFuture<'static, GatewayResult<String>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway
                .edit_message(&channel_id, &message_id, &view)
                .await
                .map_err(Into::into)
        })
    }
}
