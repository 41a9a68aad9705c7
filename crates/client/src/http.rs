//! HTTP Scan Backend
//!
//! `ScanBackend` implementation over the scanning service's JSON API.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use scanlens_core::{AnalysisObject, CoreError, CoreResult, RawScanResult};

use crate::backend::{network_error, parse_http_error, ScanBackend};
use crate::http_client::{build_http_client, ClientOptions};
use crate::sse::SseDecoder;
use crate::types::{
    ApiEnvelope, FileUpload, FramePayloadStream, FullScanSubmission, HashLookupOutcome,
    HashLookupReport,
};

/// Backend talking to the scanning service over HTTP.
pub struct HttpScanBackend {
    client: reqwest::Client,
    base_url: Url,
    options: ClientOptions,
}

impl HttpScanBackend {
    pub fn new(options: ClientOptions) -> CoreResult<Self> {
        let client = build_http_client(&options)?;
        Self::with_client(client, options)
    }

    /// Create with a pre-built client (shared connection pool).
    pub fn with_client(client: reqwest::Client, options: ClientOptions) -> CoreResult<Self> {
        let base_url = parse_base_url(&options.base_url)?;
        Ok(Self {
            client,
            base_url,
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> CoreResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CoreError::config(format!("invalid endpoint {}: {}", path, e)))
    }

    fn endpoint_with_segment(&self, path: &str, segment: &str) -> CoreResult<Url> {
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|_| CoreError::config("base URL cannot carry a path"))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn summary_url(&self, path: &str, uuid: &str) -> CoreResult<Url> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("file_uuid", uuid);
        Ok(url)
    }

    /// Send a bounded request; returns the status and body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder) -> CoreResult<(u16, String)> {
        let response = request
            .timeout(self.options.request_timeout)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;
        if !(200..300).contains(&status) {
            warn!("[HttpBackend] HTTP {} from service", status);
            return Err(parse_http_error(status, &body));
        }
        Ok((status, body))
    }
}

fn parse_base_url(raw: &str) -> CoreResult<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized)
        .map_err(|e| CoreError::config(format!("invalid API base URL {}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(CoreError::config(format!("API base URL {} cannot be a base", raw)));
    }
    Ok(url)
}

fn decode_json(body: &str, what: &str) -> CoreResult<Value> {
    serde_json::from_str(body)
        .map_err(|e| CoreError::protocol(format!("undecodable {} response: {}", what, e)))
}

fn file_part(file: &FileUpload) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.filename.clone())
}

/// Decode an `/vt/upload-quick` body. A miss is a 204 envelope or an absent
/// file object; the inner `found` flag only says whether the service answered
/// from its cache.
fn parse_hash_lookup(body: &str) -> CoreResult<HashLookupOutcome> {
    let envelope: ApiEnvelope<Value> =
        serde_json::from_value(decode_json(body, "hash lookup")?)
            .map_err(|e| CoreError::protocol(format!("malformed hash lookup envelope: {}", e)))?;

    let has_file_object = envelope
        .result
        .as_ref()
        .and_then(|r| r.get("result"))
        .is_some_and(|inner| !inner.is_null());
    if envelope.status == 204 || !has_file_object {
        return Ok(HashLookupOutcome::NotFoundInDatabase {
            message: envelope.message,
        });
    }

    let report: HashLookupReport = serde_json::from_value(envelope.into_result("hash lookup")?)
        .map_err(|e| CoreError::protocol(format!("malformed hash lookup report: {}", e)))?;
    Ok(HashLookupOutcome::Found(report))
}

/// Decode an `/vt/upload-complete` body. `result` is an analysis object when
/// `found`, otherwise the id of the queued analysis.
fn parse_full_scan(body: &str) -> CoreResult<FullScanSubmission> {
    let value = decode_json(body, "full scan")?;
    let nested = value
        .get("result")
        .filter(|inner| inner.get("uuid").is_some())
        .cloned();
    let payload = nested.unwrap_or(value);

    let text = |key: &str| -> CoreResult<String> {
        payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CoreError::protocol(format!("full scan response missing `{}`", key)))
    };
    let uuid = text("uuid")?;
    let filename = text("filename")?;
    let found = payload.get("found").and_then(Value::as_bool).unwrap_or(false);

    let (result, analysis_id) = match payload.get("result") {
        Some(Value::String(id)) => (None, Some(id.clone())),
        Some(obj @ Value::Object(_)) => {
            let analysis: AnalysisObject = serde_json::from_value(obj.clone())
                .map_err(|e| CoreError::protocol(format!("malformed analysis object: {}", e)))?;
            (Some(analysis), None)
        }
        _ => (None, None),
    };

    Ok(FullScanSubmission {
        uuid,
        filename,
        found,
        result,
        analysis_id,
    })
}

/// Decode an `/vt/current-analysis/{uuid}` body, enveloped or bare.
fn parse_analysis(body: &str) -> CoreResult<AnalysisObject> {
    let value = decode_json(body, "analysis")?;
    let nested = value.get("result").filter(|inner| !inner.is_null()).cloned();
    let object = match nested {
        Some(inner) => inner,
        None if value.get("attributes").is_some() => value,
        None => return Err(CoreError::protocol("analysis response carried no result")),
    };
    serde_json::from_value(object)
        .map_err(|e| CoreError::protocol(format!("malformed analysis object: {}", e)))
}

/// Decode a `/files/select` response. An empty or null result is `NotFound`.
fn parse_selection(status: u16, body: &str, uuid: &str) -> CoreResult<RawScanResult> {
    if status == 204 || body.trim().is_empty() {
        return Err(CoreError::not_found(format!("no stored result for {}", uuid)));
    }
    let value = decode_json(body, "selection")?;
    match value.get("result") {
        None | Some(Value::Null) => Err(CoreError::not_found(format!(
            "no stored result for {}",
            uuid
        ))),
        Some(result) => RawScanResult::from_value(result.clone()),
    }
}

fn parse_summary(body: &str) -> CoreResult<String> {
    let envelope: ApiEnvelope<String> = serde_json::from_value(decode_json(body, "summary")?)
        .map_err(|e| CoreError::protocol(format!("malformed summary envelope: {}", e)))?;
    envelope.into_result("summary")
}

struct FrameStreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

fn frame_payloads(body: BoxStream<'static, reqwest::Result<Bytes>>) -> FramePayloadStream {
    let state = FrameStreamState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(network_error(e)), state));
                }
                None => {
                    if state.decoder.has_pending() {
                        debug!("[HttpBackend] Discarding incomplete event at end of stream");
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl ScanBackend for HttpScanBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit_hash_lookup(&self, file: &FileUpload) -> CoreResult<HashLookupOutcome> {
        info!("[HttpBackend] Hash lookup for {} ({} bytes)", file.filename, file.len());
        let form = reqwest::multipart::Form::new().part("file", file_part(file));
        let (_, body) = self
            .send(self.client.post(self.endpoint("vt/upload-quick")?).multipart(form))
            .await?;
        parse_hash_lookup(&body)
    }

    async fn submit_full_scan(&self, file: &FileUpload) -> CoreResult<FullScanSubmission> {
        info!("[HttpBackend] Full scan for {} ({} bytes)", file.filename, file.len());
        let mut form = reqwest::multipart::Form::new().part("file", file_part(file));
        if let Some(password) = &file.password {
            form = form.text("password", password.clone());
        }
        let (_, body) = self
            .send(self.client.post(self.endpoint("vt/upload-complete")?).multipart(form))
            .await?;
        parse_full_scan(&body)
    }

    async fn fetch_analysis(&self, uuid: &str) -> CoreResult<AnalysisObject> {
        debug!("[HttpBackend] Fetching analysis {}", uuid);
        let url = self.endpoint_with_segment("vt/current-analysis", uuid)?;
        let (_, body) = self.send(self.client.get(url)).await?;
        parse_analysis(&body)
    }

    async fn fetch_by_uuid(&self, uuid: &str) -> CoreResult<RawScanResult> {
        debug!("[HttpBackend] Selecting stored result {}", uuid);
        let request = self
            .client
            .post(self.endpoint("files/select")?)
            .json(&serde_json::json!({ "uuid": uuid }));
        let (status, body) = self.send(request).await?;
        parse_selection(status, &body, uuid)
    }

    async fn request_summary(&self, uuid: &str) -> CoreResult<String> {
        info!("[HttpBackend] Requesting summary for {}", uuid);
        let url = self.summary_url("ai/summarise", uuid)?;
        let (_, body) = self.send(self.client.post(url)).await?;
        parse_summary(&body)
    }

    async fn open_summary_stream(&self, uuid: &str) -> CoreResult<FramePayloadStream> {
        let url = self.summary_url("ai/summarise/stream", uuid)?;
        info!("[HttpBackend] Opening summary stream {}", url);

        // No request timeout: a stream stays open until the server ends it.
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            warn!("[HttpBackend] Summary stream rejected with HTTP {}", status);
            return Err(parse_http_error(status, &body));
        }

        Ok(frame_payloads(response.bytes_stream().boxed()))
    }
}
