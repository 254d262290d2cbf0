//! The command processor: translates inbound external messages into domain
//! commands, dispatches them into the internal bus, and correlates the
//! eventual responses back to time-bounded traces.
//!
//! One processor per connection; the mapper registry is shared read-only and
//! the correlation cache is owned per instance, so no locking is needed.
//! Faults local to one message never affect other messages or the processor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::bridge::bus::{CommandBus, Receipt};
use crate::core::time::Clock;
use crate::mapping::{MapperInput, MapperRegistry};
use crate::messaging::correlation::{CorrelationCache, Trace};
use crate::messaging::inbound::ExternalMessage;
use crate::messaging::protocol::{
    CommandResponse, DomainCommand, DomainError, Envelope, TranslationError,
    CANONICAL_CONTENT_TYPE,
};

/// Everything a processor reacts to.
#[derive(Debug)]
pub enum ProcessorMsg {
    /// One message from the external transport. The receipt is sent exactly
    /// once on path exit, regardless of translation outcome, so the transport
    /// can mark the message consumed and avoid re-delivery storms.
    Inbound {
        message: ExternalMessage,
        ack: oneshot::Sender<Receipt>,
    },
    /// A response delivered back through the internal bus.
    Response(CommandResponse),
    /// A domain error from downstream; converted to the generic
    /// error-response shape and handled like an ordinary response.
    Error(DomainError),
    /// An unexpected failure surfaced by the hosting runtime; logged only.
    Failure { context: String },
}

/// Running processor handle.
pub struct ProcessorHandle {
    pub tx: mpsc::UnboundedSender<ProcessorMsg>,
    pub join: JoinHandle<()>,
}

pub struct CommandProcessor<C: Clock> {
    registry: Arc<MapperRegistry>,
    bus: CommandBus,
    target_path: String,
    authorization_subject: Option<String>,
    traces: CorrelationCache,
    clock: C,
}

impl<C: Clock> CommandProcessor<C> {
    pub fn new(
        registry: Arc<MapperRegistry>,
        bus: CommandBus,
        target_path: impl Into<String>,
        authorization_subject: Option<String>,
        trace_ttl: Duration,
        clock: C,
    ) -> Self {
        Self {
            registry,
            bus,
            target_path: target_path.into(),
            authorization_subject,
            traces: CorrelationCache::new(trace_ttl),
            clock,
        }
    }

    /// Install the eviction listener on the owned correlation cache.
    pub fn set_eviction_listener(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.traces.set_eviction_listener(listener);
    }

    pub fn spawn(self) -> ProcessorHandle {
        let (tx, inbox) = mpsc::unbounded_channel();
        let join = tokio::spawn(self.run(inbox));
        ProcessorHandle { tx, join }
    }

    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<ProcessorMsg>) {
        while let Some(msg) = inbox.recv().await {
            match msg {
                ProcessorMsg::Inbound { message, ack } => {
                    self.handle_inbound(message);
                    // Unconditional receipt, including on translation failure.
                    let _ = ack.send(Receipt);
                }
                ProcessorMsg::Response(response) => self.handle_response(response),
                ProcessorMsg::Error(error) => {
                    tracing::info!(
                        "got domain error '{}' while command was processed: {}",
                        error.code,
                        error.message
                    );
                    self.handle_response(error.to_error_response());
                }
                ProcessorMsg::Failure { context } => {
                    tracing::error!("got an unexpected failure: {}", context);
                }
            }
        }
    }

    fn handle_inbound(&mut self, message: ExternalMessage) {
        let command = match self.translate(&message) {
            Ok(command) => command,
            Err(err) => {
                // Already acknowledged by the caller; a silent drop from the
                // transport's point of view, logged for observability.
                tracing::info!("dropping untranslatable message: {}", err);
                return;
            }
        };
        // The correlation entry must be visible before the dispatch, so a
        // response can never arrive and find no entry.
        self.trace_command(&command);
        tracing::info!("publishing '{}' to '{}'", command.command_type, self.target_path);
        if let Err(err) = self.bus.send(&self.target_path, command, true) {
            tracing::error!("internal bus dispatch failed: {}", err);
        }
    }

    fn translate(&self, message: &ExternalMessage) -> Result<DomainCommand, TranslationError> {
        message.body.check_bound()?;
        let content_type = message.content_type().unwrap_or_default();
        let envelope = if content_type.eq_ignore_ascii_case(CANONICAL_CONTENT_TYPE) {
            Envelope::from_json_str(message.body.as_utf8()?.as_ref())?
        } else if let Some(mapper) = self.registry.get(content_type) {
            let input = MapperInput {
                content_type,
                body: &message.body,
                headers: &message.headers,
            };
            mapper
                .map_inbound(&input)
                .map_err(|source| TranslationError::Mapper {
                    content_type: content_type.to_string(),
                    source,
                })?
        } else {
            // Best-effort fallback, not a hard failure.
            tracing::warn!(
                "no payload mapper for content-type '{}', trying to interpret as canonical envelope",
                content_type
            );
            Envelope::from_json_str(message.body.as_utf8()?.as_ref())?
        };
        Ok(DomainCommand::from_envelope(
            envelope,
            &message.headers,
            self.authorization_subject.as_deref(),
        ))
    }

    fn trace_command(&mut self, command: &DomainCommand) {
        if let Some(correlation_id) = command.correlation_id() {
            let now = self.clock.now();
            let trace = Trace::begin(
                format!("roundtrip.{}", command.command_type),
                correlation_id,
                now,
            );
            self.traces.insert_at(correlation_id.to_string(), trace, now);
        }
    }

    fn handle_response(&mut self, response: CommandResponse) {
        if response.is_error() {
            tracing::info!(
                "received error response for '{}' (status {})",
                response.topic,
                response.status
            );
        } else {
            tracing::debug!(
                "received response for '{}' (status {})",
                response.topic,
                response.status
            );
        }
        let Some(correlation_id) = response.correlation_id().map(str::to_string) else {
            return;
        };
        let now = self.clock.now();
        match self.traces.remove_at(&correlation_id, now) {
            Some(trace) => trace.finish(now),
            None => {
                // Expired or never recorded; recoverable either way.
                tracing::info!("trace missing for response with correlation-id '{}'", correlation_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::SystemClock;
    use crate::mapping::engines::{CANONICAL_JSON, WRAPPED_JSON};
    use crate::mapping::{EngineCatalog, MappingContext};
    use crate::messaging::inbound::{MessageBody, MAX_BINARY_BODY_BYTES};
    use crate::messaging::protocol::HEADER_CORRELATION_ID;
    use std::collections::HashMap;

    fn registry() -> Arc<MapperRegistry> {
        let catalog = EngineCatalog::with_builtins();
        Arc::new(MapperRegistry::from_contexts(
            &catalog,
            &[
                MappingContext {
                    content_type: "application/custom".into(),
                    mapping_engine: CANONICAL_JSON.into(),
                    options: HashMap::new(),
                },
                MappingContext {
                    content_type: "application/sensor+json".into(),
                    mapping_engine: WRAPPED_JSON.into(),
                    options: [("topic", "sensors/env"), ("path", "/readings")]
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
            ],
        ))
    }

    fn processor() -> (
        CommandProcessor<SystemClock>,
        mpsc::UnboundedReceiver<crate::bridge::bus::BusSend>,
    ) {
        let (bus, bus_rx) = CommandBus::channel();
        let processor = CommandProcessor::new(
            registry(),
            bus,
            "/bridge/commands",
            Some("bridge:amqp".into()),
            Duration::from_secs(300),
            SystemClock,
        );
        (processor, bus_rx)
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn mapped_message_carries_inbound_headers() {
        let (mut processor, mut bus_rx) = processor();
        let message = ExternalMessage::new(
            headers(&[
                ("content-type", "application/sensor+json"),
                (HEADER_CORRELATION_ID, "abc-1"),
            ]),
            MessageBody::text(r#"{"temp":21.5}"#),
        );
        processor.handle_inbound(message);
        let send = bus_rx.try_recv().unwrap();
        assert_eq!(send.target, "/bridge/commands");
        assert!(send.at_least_once);
        assert_eq!(send.command.topic, "sensors/env");
        assert_eq!(send.command.correlation_id(), Some("abc-1"));
        assert_eq!(send.command.payload["temp"], 21.5);
        // Correlation entry recorded before dispatch.
        assert_eq!(processor.traces.len(), 1);
    }

    #[test]
    fn canonical_content_type_skips_mapping() {
        let (mut processor, mut bus_rx) = processor();
        let message = ExternalMessage::new(
            headers(&[("content-type", CANONICAL_CONTENT_TYPE)]),
            MessageBody::text(r#"{"topic":"t/1","path":"/attrs","value":{"a":1}}"#),
        );
        processor.handle_inbound(message);
        let send = bus_rx.try_recv().unwrap();
        assert_eq!(send.command.topic, "t/1");
        // No correlation id on the message, so no trace was recorded.
        assert!(processor.traces.is_empty());
    }

    #[test]
    fn unmapped_content_type_falls_back_to_canonical_parse() {
        let (mut processor, mut bus_rx) = processor();
        let message = ExternalMessage::new(
            headers(&[("content-type", "application/unmapped")]),
            MessageBody::text(r#"{"topic":"t/2","path":"/"}"#),
        );
        processor.handle_inbound(message);
        assert_eq!(bus_rx.try_recv().unwrap().command.topic, "t/2");
    }

    #[test]
    fn untranslatable_message_is_dropped_without_dispatch() {
        let (mut processor, mut bus_rx) = processor();
        let message = ExternalMessage::new(
            headers(&[("content-type", "application/unmapped")]),
            MessageBody::text("definitely not an envelope"),
        );
        processor.handle_inbound(message);
        assert!(bus_rx.try_recv().is_err());
        assert!(processor.traces.is_empty());
    }

    #[test]
    fn oversize_binary_body_is_dropped_without_dispatch() {
        let (mut processor, mut bus_rx) = processor();
        let message = ExternalMessage::new(
            headers(&[
                ("content-type", "application/custom"),
                (HEADER_CORRELATION_ID, "big-1"),
            ]),
            MessageBody::Binary {
                data: bytes::Bytes::from_static(b"small"),
                declared_len: MAX_BINARY_BODY_BYTES + 1,
            },
        );
        processor.handle_inbound(message);
        assert!(bus_rx.try_recv().is_err());
        assert!(processor.traces.is_empty());
    }

    #[test]
    fn matched_response_closes_the_trace_once() {
        let (mut processor, mut bus_rx) = processor();
        processor.handle_inbound(ExternalMessage::new(
            headers(&[
                ("content-type", "application/sensor+json"),
                (HEADER_CORRELATION_ID, "abc-1"),
            ]),
            MessageBody::text("{}"),
        ));
        let _ = bus_rx.try_recv().unwrap();
        assert_eq!(processor.traces.len(), 1);

        let response = CommandResponse {
            topic: "sensors/env".into(),
            path: "/readings".into(),
            status: 204,
            headers: headers(&[(HEADER_CORRELATION_ID, "abc-1")]),
            payload: serde_json::Value::Null,
        };
        processor.handle_response(response.clone());
        assert!(processor.traces.is_empty());
        // A duplicate response logs "trace missing" and must not fail.
        processor.handle_response(response);
        assert!(processor.traces.is_empty());
    }

    #[test]
    fn domain_error_is_handled_as_error_response() {
        let (mut processor, mut bus_rx) = processor();
        processor.handle_inbound(ExternalMessage::new(
            headers(&[
                ("content-type", "application/sensor+json"),
                (HEADER_CORRELATION_ID, "err-1"),
            ]),
            MessageBody::text("{}"),
        ));
        let _ = bus_rx.try_recv().unwrap();
        let error = DomainError {
            code: "things:thing.notfound".into(),
            status: 404,
            message: "no such thing".into(),
            headers: headers(&[(HEADER_CORRELATION_ID, "err-1")]),
        };
        processor.handle_response(error.to_error_response());
        assert!(processor.traces.is_empty());
    }
}
