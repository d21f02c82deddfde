//! Burn detection on L2 and the source of the L1 exit payload.

use crate::abi::{native_withdraw_topic, transfer_topic};
use crate::error::{BridgeError, Result};
use crate::rpc::{LogEntry, ReceiptInfo};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_PROOF_API: &str = "https://proof-generator.polygon.technology/api/v1/matic";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnEvent {
    pub token: Address,
    pub from: Address,
    pub amount: U256,
    /// topic0 of the log the exit proof must point at.
    pub event_signature: B256,
    pub log_index: usize,
}

/// Finds the burn in an L2 receipt: the native `Withdraw` event, else an ERC20 transfer to zero.
pub fn find_burn_log(receipt: &ReceiptInfo, native_token: Address) -> Option<BurnEvent> {
    let withdraw = native_withdraw_topic();
    let native = receipt.logs.iter().enumerate().find_map(|(index, log)| {
        if log.address != native_token || log.topics.first() != Some(&withdraw) {
            return None;
        }
        Some(BurnEvent {
            token: topic_address(log.topics.get(1)?),
            from: topic_address(log.topics.get(2)?),
            amount: first_word(log)?,
            event_signature: withdraw,
            log_index: index,
        })
    });
    if native.is_some() {
        return native;
    }

    let transfer = transfer_topic();
    receipt.logs.iter().enumerate().find_map(|(index, log)| {
        if log.topics.len() != 3 || log.topics[0] != transfer {
            return None;
        }
        if topic_address(&log.topics[2]) != Address::ZERO {
            return None;
        }
        Some(BurnEvent {
            token: log.address,
            from: topic_address(&log.topics[1]),
            amount: first_word(log)?,
            event_signature: transfer,
            log_index: index,
        })
    })
}

fn topic_address(topic: &B256) -> Address {
    Address::from_word(*topic)
}

fn first_word(log: &LogEntry) -> Option<U256> {
    let word: [u8; 32] = log.data.get(..32)?.try_into().ok()?;
    Some(U256::from_be_bytes(word))
}

/// Produces the `exit(bytes)` argument for a burn. `Ok(None)` means not checkpointed yet.
#[async_trait]
pub trait ExitPayloadSource: Send + Sync {
    async fn exit_payload(&self, burn_tx: B256, event_signature: B256) -> Result<Option<Bytes>>;
}

#[derive(Debug, Deserialize)]
struct PayloadResponse {
    result: Option<Bytes>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for a proof generation service.
#[derive(Clone)]
pub struct ProofApiClient {
    base_url: String,
    http: Client,
}

impl ProofApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn payload_url(&self, burn_tx: B256, event_signature: B256) -> String {
        format!(
            "{}/exit-payload/{burn_tx:#x}?eventSignature={event_signature:#x}",
            self.base_url
        )
    }
}

#[async_trait]
impl ExitPayloadSource for ProofApiClient {
    async fn exit_payload(&self, burn_tx: B256, event_signature: B256) -> Result<Option<Bytes>> {
        let failed = |reason: String| BridgeError::ExitProcessingFailed { burn_tx, reason };
        let url = self.payload_url(burn_tx, event_signature);
        tracing::debug!(%url, "requesting exit payload");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| failed(format!("proof service unreachable: {err}")))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .text()
            .await
            .map_err(|err| failed(format!("proof service read failed: {err}")))?;
        interpret_payload(status, &body).map_err(failed)
    }
}

fn interpret_payload(status: StatusCode, body: &str) -> std::result::Result<Option<Bytes>, String> {
    let parsed: Option<PayloadResponse> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|payload| {
            payload
                .message
                .clone()
                .or_else(|| payload.error.as_ref().map(|error| error.to_string()))
        })
        .unwrap_or_else(|| body.to_string());

    if message.to_ascii_lowercase().contains("checkpoint") {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(format!("proof service returned {status}: {message}"));
    }
    match parsed.and_then(|payload| payload.result) {
        Some(payload) if !payload.is_empty() => Ok(Some(payload)),
        _ => Err(format!("proof service returned no payload: {message}")),
    }
}
