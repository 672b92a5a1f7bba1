//! Pipeline transport boundary
//!
//! The harmonization core never does I/O; surrounding stages pull one
//! payload at a time, hand records through the core, and push the
//! result onward. [`Transport`] is that boundary. Real transports
//! (message queues, sockets) live outside this crate; the in-memory
//! implementation here backs tests and demos.

use std::collections::VecDeque;

use crate::error::{HarmonizeError, Result};

/// One-at-a-time payload transport between pipeline stages.
///
/// A payload returned by `receive` stays in flight until `acknowledge`
/// is called; `forward` hands a payload to the next stage.
pub trait Transport {
    /// Pull the next payload, or `None` when the queue is drained
    fn receive(&mut self) -> Result<Option<String>>;

    /// Confirm the in-flight payload was fully processed
    fn acknowledge(&mut self) -> Result<()>;

    /// Hand a payload to the next stage
    fn forward(&mut self, payload: String) -> Result<()>;
}

/// Queue-backed transport for tests and single-process pipelines
#[derive(Debug, Default)]
pub struct MemoryTransport {
    incoming: VecDeque<String>,
    outgoing: VecDeque<String>,
    in_flight: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the incoming queue
    pub fn push_incoming(&mut self, payload: impl Into<String>) {
        self.incoming.push_back(payload.into());
    }

    /// Drain everything forwarded so far
    pub fn drain_outgoing(&mut self) -> Vec<String> {
        self.outgoing.drain(..).collect()
    }

    /// The payload received but not yet acknowledged, if any
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }
}

impl Transport for MemoryTransport {
    fn receive(&mut self) -> Result<Option<String>> {
        if self.in_flight.is_some() {
            return Err(HarmonizeError::Transport(
                "previous payload not yet acknowledged".to_string(),
            ));
        }
        self.in_flight = self.incoming.pop_front();
        Ok(self.in_flight.clone())
    }

    fn acknowledge(&mut self) -> Result<()> {
        self.in_flight
            .take()
            .map(|_| ())
            .ok_or_else(|| HarmonizeError::Transport("nothing to acknowledge".to_string()))
    }

    fn forward(&mut self, payload: String) -> Result<()> {
        self.outgoing.push_back(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::MessageFactory;
    use crate::harmonization::Harmonization;

    #[test]
    fn test_receive_acknowledge_cycle() {
        let mut transport = MemoryTransport::new();
        transport.push_incoming("one");
        transport.push_incoming("two");

        assert_eq!(transport.receive().unwrap().as_deref(), Some("one"));
        assert!(transport.receive().is_err());
        transport.acknowledge().unwrap();

        assert_eq!(transport.receive().unwrap().as_deref(), Some("two"));
        transport.acknowledge().unwrap();

        assert_eq!(transport.receive().unwrap(), None);
        assert!(transport.acknowledge().is_err());
    }

    #[test]
    fn test_stage_round_trip() {
        let harmonization = Harmonization::default_config().unwrap();
        let factory = MessageFactory::new(harmonization.clone());

        let event = crate::event::Event::from_flat(
            harmonization,
            [("source.ip", "198.51.100.7"), ("source.tor_node", "false")],
        )
        .unwrap();

        let mut transport = MemoryTransport::new();
        transport.push_incoming(MessageFactory::serialize(&event).unwrap());

        // A minimal enrichment stage: flip the tor flag and forward
        let raw = transport.receive().unwrap().unwrap();
        let mut record = factory.deserialize(&raw).unwrap().into_record();
        record.update("source.tor_node", "true", false).unwrap();
        transport.forward(MessageFactory::serialize(&record).unwrap()).unwrap();
        transport.acknowledge().unwrap();

        let forwarded = transport.drain_outgoing();
        assert_eq!(forwarded.len(), 1);
        let rebuilt = factory.deserialize(&forwarded[0]).unwrap().into_event().unwrap();
        assert_eq!(rebuilt.get("source.tor_node").unwrap(), "true");
        assert_eq!(rebuilt.get("source.ip").unwrap(), "198.51.100.7");
    }
}
