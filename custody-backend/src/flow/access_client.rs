//! Read-only client for the Flow Access REST API.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::ledger::{BlockHeader, ChainEvent, ChainReader, LedgerError};
use super::Identifier;

pub struct AccessClient {
    client: Client,
    base_url: Url,
}

// Access API encodes uint64 values as strings.
#[derive(Debug, Deserialize)]
struct BlockResponse {
    header: BlockHeaderResponse,
}

#[derive(Debug, Deserialize)]
struct BlockHeaderResponse {
    id: String,
    height: String,
}

#[derive(Debug, Deserialize)]
struct BlockEventsResponse {
    block_height: String,
    #[serde(default)]
    events: Vec<EventResponse>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    #[serde(rename = "type")]
    event_type: String,
    transaction_id: String,
    event_index: String,
    payload: String,
}

impl AccessClient {
    pub fn new(base_url: &str) -> Result<Self, LedgerError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LedgerError::Decode(format!("invalid access API url {}: {}", base_url, e)))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.base_url
            .join(path)
            .map_err(|e| LedgerError::Decode(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, LedgerError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LedgerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()))
    }
}

fn parse_u64(field: &str, value: &str) -> Result<u64, LedgerError> {
    value
        .parse::<u64>()
        .map_err(|_| LedgerError::Decode(format!("{} is not a number: {}", field, value)))
}

fn parse_identifier(field: &str, value: &str) -> Result<Identifier, LedgerError> {
    Identifier::from_str(value)
        .map_err(|_| LedgerError::Decode(format!("{} is not an identifier: {}", field, value)))
}

fn decode_event(block_height: u64, raw: EventResponse) -> Result<ChainEvent, LedgerError> {
    let payload_bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.payload.as_bytes())
        .map_err(|e| LedgerError::Decode(format!("event payload is not base64: {}", e)))?;
    let payload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| LedgerError::Decode(format!("event payload is not JSON: {}", e)))?;
    let event_index = raw
        .event_index
        .parse::<u32>()
        .map_err(|_| LedgerError::Decode(format!("event_index is not a number: {}", raw.event_index)))?;

    Ok(ChainEvent {
        event_type: raw.event_type,
        block_height,
        transaction_id: parse_identifier("transaction_id", &raw.transaction_id)?,
        event_index,
        payload,
    })
}

#[async_trait]
impl ChainReader for AccessClient {
    async fn latest_sealed_block(&self) -> Result<BlockHeader, LedgerError> {
        let mut url = self.endpoint("v1/blocks")?;
        url.query_pairs_mut().append_pair("height", "sealed");

        let blocks: Vec<BlockResponse> = self.get_json(url).await?;
        let block = blocks
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::Decode("no sealed block returned".to_string()))?;

        Ok(BlockHeader {
            id: parse_identifier("id", &block.header.id)?,
            height: parse_u64("height", &block.header.height)?,
        })
    }

    async fn events_in_range(
        &self,
        event_type: &str,
        start_height: u64,
        end_height: u64,
    ) -> Result<Vec<ChainEvent>, LedgerError> {
        let mut url = self.endpoint("v1/events")?;
        url.query_pairs_mut()
            .append_pair("type", event_type)
            .append_pair("start_height", &start_height.to_string())
            .append_pair("end_height", &end_height.to_string());

        let blocks: Vec<BlockEventsResponse> = self.get_json(url).await?;

        let mut events = Vec::new();
        for block in blocks {
            let height = parse_u64("block_height", &block.block_height)?;
            for raw in block.events {
                events.push(decode_event(height, raw)?);
            }
        }
        Ok(events)
    }
}
