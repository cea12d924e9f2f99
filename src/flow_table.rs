use std::collections::HashMap;

use log::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::flow::{Flow, FlowOutcome};
use crate::flow_key::FlowKey;
use crate::packet::{PacketView, IPPROTO_TCP, IPPROTO_UDP};
use crate::sink::Sink;

/// Owns the live set of flows keyed by canonical 5-tuple, dispatches packets
/// to them in O(1), and hands completed or stale flows to a [`Sink`].
pub struct FlowTable {
    config: Config,
    flows: HashMap<FlowKey, Flow>,
    next_id: u64,
}

impl FlowTable {
    pub fn new(config: Config) -> Self {
        FlowTable {
            config,
            flows: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn export_and_remove(&mut self, key: &FlowKey, sink: &mut dyn Sink) -> Result<usize> {
        if let Some(mut flow) = self.flows.remove(key) {
            if let Some(record) = flow.export()? {
                sink.write(&record)?;
                return Ok(1);
            }
        }
        Ok(0)
    }

    /// Feed one packet into the table, creating a flow on first sight of its
    /// key. Returns the number of records written as a side effect (0 or 1).
    pub fn ingest(&mut self, pkt: &PacketView, sink: &mut dyn Sink) -> Result<usize> {
        if pkt.proto != IPPROTO_TCP && pkt.proto != IPPROTO_UDP {
            debug!("dropping packet with unsupported protocol {}", pkt.proto);
            return Ok(0);
        }

        let key = FlowKey::from_packet(pkt);

        if !self.flows.contains_key(&key) {
            let id = self.next_id();
            self.flows.insert(key, Flow::new(pkt, id));
            return Ok(0);
        }

        let outcome = {
            let flow = self.flows.get_mut(&key).expect("checked above");
            flow.add(pkt, &self.config)
        };

        match outcome {
            FlowOutcome::Accepted => Ok(0),
            FlowOutcome::Terminated => self.export_and_remove(&key, sink),
            FlowOutcome::Expired => {
                let emitted = self.export_and_remove(&key, sink)?;
                let id = self.next_id();
                self.flows.insert(key, Flow::new(pkt, id));
                Ok(emitted)
            }
        }
    }

    /// Evict and (if valid) export every flow that has been idle longer than
    /// `config.flow_timeout` as of `now`. Returns the number of records
    /// written.
    pub fn sweep(&mut self, now: f64, sink: &mut dyn Sink) -> Result<usize> {
        let stale: Vec<FlowKey> = self
            .flows
            .iter()
            .filter(|(_, flow)| now - flow.last_time() > self.config.flow_timeout)
            .map(|(key, _)| *key)
            .collect();

        let mut emitted = 0;
        for key in stale {
            emitted += self.export_and_remove(&key, sink)?;
        }
        Ok(emitted)
    }

    /// Export every remaining valid flow and clear the table. Called at
    /// end-of-stream.
    pub fn drain(&mut self, sink: &mut dyn Sink) -> Result<usize> {
        let keys: Vec<FlowKey> = self.flows.keys().copied().collect();
        let mut emitted = 0;
        for key in keys {
            emitted += self.export_and_remove(&key, sink)?;
        }
        if !self.flows.is_empty() {
            warn!("flow table not empty after drain");
        }
        Ok(emitted)
    }
}
