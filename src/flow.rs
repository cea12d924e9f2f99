use std::net::Ipv4Addr;

use log::debug;

use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::packet::{PacketView, IPPROTO_TCP, IPPROTO_UDP, TCP_PSH, TCP_URG};
use crate::record::{round_to_micros, FlowRecord};
use crate::stats::RunningStats;
use crate::tcp_state::{Direction, TcpStateMachine};

/// Result of feeding one packet to a [`Flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The packet was absorbed; the flow continues.
    Accepted,
    /// The packet closed the flow (TCP, both halves reached `Closed`).
    Terminated,
    /// The packet arrived too long after the flow's last activity; the
    /// caller should export/evict this flow and retry the packet as a new
    /// one under the same key.
    Expired,
}

/// One bidirectional conversation, keyed by the canonical 5-tuple.
///
/// Every counter here is updated incrementally as packets arrive — nothing
/// per-packet is buffered, so a `Flow`'s memory footprint never grows with
/// its packet count or lifetime.
pub struct Flow {
    id: u64,
    srcip: Ipv4Addr,
    srcport: u16,
    dstip: Ipv4Addr,
    dstport: u16,
    proto: u8,
    dscp: u8,

    total_fpackets: u64,
    total_fvolume: u64,
    total_bpackets: u64,
    total_bvolume: u64,

    fpktl: RunningStats,
    bpktl: RunningStats,
    fiat: RunningStats,
    biat: RunningStats,
    active: RunningStats,
    idle: RunningStats,

    fpsh_cnt: u64,
    bpsh_cnt: u64,
    furg_cnt: u64,
    burg_cnt: u64,

    total_fhlen: u64,
    total_bhlen: u64,

    first_time: f64,
    flast: f64,
    blast: f64,
    active_start: f64,

    first_srcip: Ipv4Addr,

    valid: bool,
    has_udp_data: bool,
    tcp: Option<TcpStateMachine>,

    exported: bool,
}

impl Flow {
    /// Construct a new flow from its first packet.
    pub fn new(pkt: &PacketView, id: u64) -> Self {
        let hlen = pkt.header_len() as u64;
        let tcp = if pkt.proto == IPPROTO_TCP {
            Some(TcpStateMachine::new())
        } else {
            None
        };
        let mut flow = Flow {
            id,
            srcip: pkt.srcip,
            srcport: pkt.srcport,
            dstip: pkt.dstip,
            dstport: pkt.dstport,
            proto: pkt.proto,
            dscp: pkt.dscp,

            total_fpackets: 1,
            total_fvolume: pkt.len as u64,
            total_bpackets: 0,
            total_bvolume: 0,

            fpktl: RunningStats::with_first(pkt.len as f64),
            bpktl: RunningStats::new(),
            fiat: RunningStats::new(),
            biat: RunningStats::new(),
            active: RunningStats::new(),
            idle: RunningStats::new(),

            fpsh_cnt: if pkt.flag_set(TCP_PSH) { 1 } else { 0 },
            bpsh_cnt: 0,
            furg_cnt: if pkt.flag_set(TCP_URG) { 1 } else { 0 },
            burg_cnt: 0,

            total_fhlen: hlen,
            total_bhlen: 0,

            first_time: pkt.time,
            flast: pkt.time,
            blast: 0.0,
            active_start: pkt.time,

            first_srcip: pkt.srcip,

            valid: false,
            has_udp_data: false,
            tcp,

            exported: false,
        };
        flow.update_status(pkt);
        flow
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Timestamp of the most recent packet seen in either direction.
    pub fn last_time(&self) -> f64 {
        if self.blast == 0.0 {
            self.flast
        } else if self.flast == 0.0 {
            self.blast
        } else {
            self.flast.max(self.blast)
        }
    }

    fn is_forward(&self, pkt: &PacketView) -> bool {
        pkt.srcip == self.first_srcip
    }

    /// Feed one packet to the flow.
    pub fn add(&mut self, pkt: &PacketView, config: &Config) -> FlowOutcome {
        let now = pkt.time;
        let last = self.last_time();
        let diff = now - last;

        if diff > config.flow_timeout {
            return FlowOutcome::Expired;
        }
        if now < last {
            debug!("flow {}: ignoring reordered packet ({} < {})", self.id, now, last);
            return FlowOutcome::Accepted;
        }

        let pdir = if self.is_forward(pkt) {
            Direction::Forward
        } else {
            Direction::Backward
        };

        if diff > config.idle_threshold {
            self.idle.push(diff);
            self.active.push(last - self.active_start);
            self.flast = 0.0;
            self.blast = 0.0;
            self.active_start = now;
        }

        let len = pkt.len as f64;
        let hlen = pkt.header_len() as u64;

        match pdir {
            Direction::Forward => {
                self.fpktl.push(len);
                self.total_fpackets += 1;
                self.total_fvolume += pkt.len as u64;
                self.total_fhlen += hlen;
                if self.flast > 0.0 {
                    self.fiat.push(now - self.flast);
                }
                if pkt.proto == IPPROTO_TCP {
                    if pkt.flag_set(TCP_PSH) {
                        self.fpsh_cnt += 1;
                    }
                    if pkt.flag_set(TCP_URG) {
                        self.furg_cnt += 1;
                    }
                }
                self.flast = now;
            }
            Direction::Backward => {
                if self.blast == 0.0 && self.dscp == 0 {
                    self.dscp = pkt.dscp;
                }
                self.bpktl.push(len);
                self.total_bpackets += 1;
                self.total_bvolume += pkt.len as u64;
                self.total_bhlen += hlen;
                if self.blast > 0.0 {
                    self.biat.push(now - self.blast);
                }
                if pkt.proto == IPPROTO_TCP {
                    if pkt.flag_set(TCP_PSH) {
                        self.bpsh_cnt += 1;
                    }
                    if pkt.flag_set(TCP_URG) {
                        self.burg_cnt += 1;
                    }
                }
                self.blast = now;
            }
        }

        self.update_status(pkt);

        if self.proto == IPPROTO_TCP {
            if let Some(tcp) = &self.tcp {
                if tcp.both_closed() {
                    return FlowOutcome::Terminated;
                }
            }
        }
        FlowOutcome::Accepted
    }

    fn update_status(&mut self, pkt: &PacketView) {
        match pkt.proto {
            IPPROTO_UDP => {
                if self.valid {
                    return;
                }
                if pkt.len > 8 {
                    self.has_udp_data = true;
                }
                if self.has_udp_data && self.total_bpackets > 0 {
                    self.valid = true;
                }
            }
            IPPROTO_TCP => {
                let pdir = if self.is_forward(pkt) {
                    Direction::Forward
                } else {
                    Direction::Backward
                };
                if let Some(tcp) = &mut self.tcp {
                    if !self.valid && tcp.cstate == crate::tcp_state::TcpHalfState::Established && pkt.has_payload() {
                        self.valid = true;
                    }
                    tcp.update(pkt.flags, pdir);
                }
            }
            _ => {
                debug!("flow {}: unsupported protocol {}", self.id, pkt.proto);
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Finalize the flow and produce its exported record.
    ///
    /// Consuming `&mut self` plus the `exported` guard makes a double export
    /// a logic error rather than silently double-counting the final active
    /// burst; callers that mis-use it get `FlowError::Internal` instead of a
    /// corrupted record.
    pub fn export(&mut self) -> Result<Option<FlowRecord>> {
        if !self.valid {
            return Ok(None);
        }
        if self.exported {
            return Err(FlowError::Internal(format!(
                "flow {} exported more than once",
                self.id
            )));
        }
        self.exported = true;

        let last = self.last_time();
        self.active.push(last - self.active_start);

        if self.total_fpackets == 0 {
            return Err(FlowError::Internal(format!(
                "flow {} has no forward packets at export",
                self.id
            )));
        }
        let duration = last - self.first_time;
        if duration <= 0.0 {
            return Err(FlowError::Internal(format!(
                "flow {} has non-positive duration at export",
                self.id
            )));
        }
        if self.active.count() == 0 {
            return Err(FlowError::Internal(format!(
                "flow {} has zero active segments at export",
                self.id
            )));
        }

        let mean_bpktl = if self.total_bpackets > 0 {
            self.bpktl.mean()
        } else {
            -1.0
        };

        let active_count = self.active.count();
        let sflow_fpackets = self.total_fpackets / active_count;
        let sflow_fbytes = self.total_fvolume / active_count;
        let sflow_bpackets = self.total_bpackets / active_count;
        let sflow_bbytes = self.total_bvolume / active_count;

        Ok(Some(FlowRecord {
            srcip: self.srcip.to_string(),
            srcport: self.srcport,
            dstip: self.dstip.to_string(),
            dstport: self.dstport,
            proto: self.proto,

            total_fpackets: self.total_fpackets,
            total_fvolume: self.total_fvolume,
            total_bpackets: self.total_bpackets,
            total_bvolume: self.total_bvolume,

            min_fpktl: self.fpktl.min() as i64,
            mean_fpktl: self.fpktl.mean() as i64,
            max_fpktl: self.fpktl.max() as i64,
            std_fpktl: self.fpktl.stddev() as i64,

            min_bpktl: self.bpktl.min() as i64,
            mean_bpktl: mean_bpktl as i64,
            max_bpktl: self.bpktl.max() as i64,
            std_bpktl: self.bpktl.stddev() as i64,

            min_fiat: round_to_micros(self.fiat.min()),
            mean_fiat: round_to_micros(self.fiat.mean()),
            max_fiat: round_to_micros(self.fiat.max()),
            std_fiat: round_to_micros(self.fiat.stddev()),

            min_biat: round_to_micros(self.biat.min()),
            mean_biat: round_to_micros(self.biat.mean()),
            max_biat: round_to_micros(self.biat.max()),
            std_biat: round_to_micros(self.biat.stddev()),

            duration: round_to_micros(duration),

            min_active: round_to_micros(self.active.min()),
            mean_active: round_to_micros(self.active.mean()),
            max_active: round_to_micros(self.active.max()),
            std_active: round_to_micros(self.active.stddev()),

            min_idle: round_to_micros(self.idle.min()),
            mean_idle: round_to_micros(self.idle.mean()),
            max_idle: round_to_micros(self.idle.max()),
            std_idle: round_to_micros(self.idle.stddev()),

            sflow_fpackets,
            sflow_fbytes,
            sflow_bpackets,
            sflow_bbytes,

            fpsh_cnt: self.fpsh_cnt,
            bpsh_cnt: self.bpsh_cnt,
            furg_cnt: self.furg_cnt,
            burg_cnt: self.burg_cnt,

            total_fhlen: self.total_fhlen,
            total_bhlen: self.total_bhlen,
        }))
    }
}
