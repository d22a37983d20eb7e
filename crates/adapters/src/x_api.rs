//! X API adapter for publishing tweets

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tweetsmith_domain::{PublishError, PublishReceipt, Publisher};

/// X API publisher for creating posts
pub struct XPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
}

impl XPublisher {
    pub fn new(user_token: SecretString) -> Result<Self, PublishError> {
        Self::with_base_url(user_token, "https://api.twitter.com".to_string())
    }

    pub fn with_base_url(user_token: SecretString, base_url: String) -> Result<Self, PublishError> {
        // Bounded timeout so a hung request cannot stall the dispatch loop
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            user_token,
            base_url,
        })
    }
}

#[derive(Serialize)]
struct CreateTweetRequest {
    text: String,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, PublishError> {
        let request = CreateTweetRequest {
            text: text.to_string(),
        };

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.user_token.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Invalid user token".to_string()));
        }

        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }

        if response.status() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected(body));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Transport(format!(
                "Failed to create tweet ({}): {}",
                status, body
            )));
        }

        let tweet_response: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(PublishReceipt {
            external_id: tweet_response.data.id,
        })
    }
}
