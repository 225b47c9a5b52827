//! Orchestration API client.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_core::stream::BoxStream;
use futures_core::Stream;
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use traind_resources::{DerivedWorkload, TrainingJob, WorkloadKind};

use crate::error::ApiError;
use crate::types::{NodeCapacity, NodeList, TrainingJobList, WatchEvent, WatchEventType};

/// Client for the orchestration API's typed REST interfaces.
pub struct OrchestrationClient {
    client: reqwest::Client,
    watch_client: reqwest::Client,
    base_url: String,
}

impl OrchestrationClient {
    /// Create a new client against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        // Watch responses stay open for as long as the subscription lives,
        // so the streaming client carries no overall request timeout.
        let watch_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            watch_client,
            base_url,
        }
    }

    fn jobs_url(&self, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!("{}/v1/namespaces/{}/trainingjobs", self.base_url, ns),
            None => format!("{}/v1/trainingjobs", self.base_url),
        }
    }

    /// List training jobs, namespace-scoped or across all namespaces.
    pub async fn list_training_jobs(
        &self,
        namespace: Option<&str>,
    ) -> Result<TrainingJobList, ApiError> {
        let url = self.jobs_url(namespace);
        debug!(url = %url, "Listing training jobs");

        let response = error_for_status(self.client.get(&url).send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::ShapeViolation(format!("training job list: {e}")))
    }

    /// Open a watch subscription over training jobs, resuming from
    /// `resource_version`.
    ///
    /// The returned stream yields one decoded event per JSON line of the
    /// response body and ends when the server closes the subscription. It
    /// owns the response body and borrows nothing from the client.
    pub async fn watch_training_jobs(
        &self,
        namespace: Option<&str>,
        resource_version: &str,
    ) -> Result<BoxStream<'static, Result<WatchEvent, ApiError>>, ApiError> {
        let url = self.jobs_url(namespace);
        debug!(url = %url, resource_version, "Opening training job watch");

        let response = error_for_status(
            self.watch_client
                .get(&url)
                .query(&[("watch", "true"), ("resource_version", resource_version)])
                .send()
                .await?,
        )
        .await?;

        Ok(decode_watch_lines(response.bytes_stream().boxed()).boxed())
    }

    /// Create a derived workload, keyed by its deterministic name.
    ///
    /// HTTP 409 maps to [`ApiError::Conflict`].
    pub async fn create_workload(&self, workload: &DerivedWorkload) -> Result<(), ApiError> {
        let collection = match workload.kind {
            WorkloadKind::Replicated => "replicated-workloads",
            WorkloadKind::Batch => "batch-workloads",
        };
        let url = format!(
            "{}/v1/namespaces/{}/{}",
            self.base_url, workload.metadata.namespace, collection
        );
        debug!(
            url = %url,
            name = %workload.metadata.name,
            "Creating derived workload"
        );

        let response = self.client.post(&url).json(workload).send().await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(ApiError::Conflict {
                kind: workload.kind,
                namespace: workload.metadata.namespace.clone(),
                name: workload.metadata.name.clone(),
            });
        }

        error_for_status(response).await?;
        Ok(())
    }

    /// List cluster nodes with their capacity accounting.
    pub async fn list_nodes(&self) -> Result<Vec<NodeCapacity>, ApiError> {
        let url = format!("{}/v1/nodes", self.base_url);

        let response = error_for_status(self.client.get(&url).send().await?).await?;
        let body = response.bytes().await?;
        let list: NodeList = serde_json::from_slice(&body)
            .map_err(|e| ApiError::ShapeViolation(format!("node list: {e}")))?;
        Ok(list.items)
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(ApiError::Api { status, message })
}

#[derive(Deserialize)]
struct RawWatchEvent {
    #[serde(rename = "type")]
    event_type: WatchEventType,
    object: serde_json::Value,
}

fn decode_frame(line: &[u8]) -> Result<RawWatchEvent, ApiError> {
    serde_json::from_slice(line)
        .map_err(|e| ApiError::ShapeViolation(format!("watch event frame: {e}")))
}

fn decode_object(raw: RawWatchEvent) -> Result<WatchEvent, ApiError> {
    let object: TrainingJob = serde_json::from_value(raw.object)
        .map_err(|e| ApiError::ShapeViolation(format!("watch object is not a training job: {e}")))?;
    Ok(WatchEvent {
        event_type: raw.event_type,
        object,
    })
}

fn decode_event(line: &[u8]) -> Result<WatchEvent, ApiError> {
    decode_object(decode_frame(line)?)
}

fn take_line(buf: &mut BytesMut) -> Option<Bytes> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let mut line = buf.split_to(pos + 1);
    line.truncate(pos);
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    Some(line.freeze())
}

/// Frame a chunked response body into JSON lines and decode each one.
fn decode_watch_lines<S>(body: S) -> impl Stream<Item = Result<WatchEvent, ApiError>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    stream::unfold(
        (body, BytesMut::new(), false),
        |(mut body, mut buf, mut done)| async move {
            loop {
                while let Some(line) = take_line(&mut buf) {
                    if line.is_empty() {
                        // Keep-alive blank line.
                        continue;
                    }
                    return Some((decode_event(&line), (body, buf, done)));
                }

                if done {
                    if buf.is_empty() {
                        return None;
                    }
                    // Final line arrived without a trailing newline. A tail
                    // that is not a parseable frame was cut off mid-line by
                    // the peer; end the stream so the caller reconnects
                    // instead of reading the fragment as a bad object.
                    let line = buf.split().freeze();
                    return match decode_frame(&line) {
                        Ok(raw) => Some((decode_object(raw), (body, buf, done))),
                        Err(_) => {
                            debug!("Discarding truncated trailing watch line");
                            None
                        }
                    };
                }

                match body.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        done = true;
                        return Some((Err(ApiError::Transport(e)), (body, buf, done)));
                    }
                    None => done = true,
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use futures_util::StreamExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use traind_resources::{PodTemplate, ResourceRequests, WorkloadMeta};

    use super::*;

    fn workload(kind: WorkloadKind, name: &str) -> DerivedWorkload {
        DerivedWorkload {
            kind,
            metadata: WorkloadMeta {
                name: name.to_string(),
                namespace: "ml".to_string(),
                labels: BTreeMap::new(),
            },
            replicas: 1,
            completions: (kind == WorkloadKind::Batch).then_some(1),
            template: PodTemplate {
                image: "img".to_string(),
                resources: ResourceRequests {
                    cpu: 1.0,
                    memory_bytes: 1 << 30,
                },
            },
        }
    }

    const JOB_JSON: &str = r#"{
        "metadata": {"name": "bert", "namespace": "ml", "uid": "u1", "resource_version": "5"},
        "spec": {
            "coordinator": {"replicas": 1, "image": "img", "resources": {"cpu": 1.0, "memory_bytes": 1}},
            "aggregator": {"replicas": 3, "image": "img", "resources": {"cpu": 1.0, "memory_bytes": 1}},
            "worker": {"parallelism": 8, "completions": 8, "image": "img", "resources": {"cpu": 1.0, "memory_bytes": 1}}
        }
    }"#;

    #[tokio::test]
    async fn test_list_training_jobs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/namespaces/ml/trainingjobs"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(r#"{{"resource_version": "42", "items": [{JOB_JSON}]}}"#),
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        let list = client.list_training_jobs(Some("ml")).await.unwrap();

        assert_eq!(list.resource_version, "42");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].metadata.name, "bert");
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_conflict_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/namespaces/ml/replicated-workloads"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        let err = client
            .create_workload(&workload(WorkloadKind::Replicated, "bert-coordinator"))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        match err {
            ApiError::Conflict { name, namespace, .. } => {
                assert_eq!(name, "bert-coordinator");
                assert_eq!(namespace, "ml");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_routes_batch_workloads_separately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/namespaces/ml/batch-workloads"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        client
            .create_workload(&workload(WorkloadKind::Batch, "bert-worker"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_failure_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/namespaces/ml/replicated-workloads"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        let err = client
            .create_workload(&workload(WorkloadKind::Replicated, "bert-coordinator"))
            .await
            .unwrap_err();

        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_watch_decodes_json_lines() {
        let job: serde_json::Value = serde_json::from_str(JOB_JSON).unwrap();
        let added = serde_json::json!({"type": "added", "object": job.clone()}).to_string();
        let deleted = serde_json::json!({"type": "deleted", "object": job}).to_string();
        // Blank keep-alive line between events.
        let body = format!("{added}\n\n{deleted}\n");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/trainingjobs"))
            .and(query_param("watch", "true"))
            .and(query_param("resource_version", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        let stream = client.watch_training_jobs(None, "42").await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 2);
        let first = events[0].as_ref().unwrap();
        assert_eq!(first.event_type, WatchEventType::Added);
        assert_eq!(first.object.metadata.name, "bert");
        assert_eq!(
            events[1].as_ref().unwrap().event_type,
            WatchEventType::Deleted
        );
    }

    #[tokio::test]
    async fn test_watch_drops_line_truncated_by_disconnect() {
        let job: serde_json::Value = serde_json::from_str(JOB_JSON).unwrap();
        let added = serde_json::json!({"type": "added", "object": job}).to_string();
        // The second event is cut mid-object, as when the connection drops;
        // the fragment must not surface as a malformed object.
        let truncated = &added[..added.len() / 2];
        let body = format!("{added}\n{truncated}");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/trainingjobs"))
            .and(query_param("watch", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        let stream = client.watch_training_jobs(None, "0").await.unwrap();
        let events: Vec<_> = stream.collect().await;

        // The complete event comes through; the stream then just ends, which
        // sends the consumer back to relist and re-watch.
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());
    }

    #[tokio::test]
    async fn test_watch_rejects_malformed_object() {
        let body = r#"{"type": "added", "object": {"metadata": {"name": "x"}}}"#;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/trainingjobs"))
            .and(query_param("watch", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = OrchestrationClient::new(server.uri());
        let stream = client.watch_training_jobs(None, "0").await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Err(ApiError::ShapeViolation(_))
        ));
    }
}
