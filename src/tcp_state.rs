use crate::packet::{TCP_ACK, TCP_FIN, TCP_RST, TCP_SYN};

/// Direction tag used by the state machine: `"f"`/`"b"` in the original
/// implementation, a two-variant enum here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// State of one half of a TCP connection.
///
/// Two independent instances exist per TCP flow: the client half watches
/// events in the forward direction, the server half watches the backward
/// direction. Both observe every TCP packet in the flow, each asking only
/// "did *my* side originate this" via the `dir == pdir` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpHalfState {
    Start,
    Syn,
    SynAck,
    Established,
    Fin,
    Closed,
}

impl TcpHalfState {
    /// Advance this half's state given the packet's flags, this half's
    /// watched direction (`dir`), and the direction the current packet
    /// actually traveled in (`pdir`).
    ///
    /// RST and FIN are checked ahead of the per-state table, matching the
    /// original's unconditional-close / fin-observed-in-own-direction rules.
    /// Any input not covered by the table below leaves the state unchanged.
    pub fn transition(self, flags: u8, dir: Direction, pdir: Direction) -> TcpHalfState {
        let set = |flag: u8| flags & flag == flag;

        if set(TCP_RST) {
            return TcpHalfState::Closed;
        }
        if set(TCP_FIN) && dir == pdir {
            return TcpHalfState::Fin;
        }
        match self {
            TcpHalfState::Start => {
                if set(TCP_SYN) && dir == pdir {
                    TcpHalfState::Syn
                } else {
                    self
                }
            }
            TcpHalfState::Syn => {
                if set(TCP_SYN) && set(TCP_ACK) && dir != pdir {
                    TcpHalfState::SynAck
                } else {
                    self
                }
            }
            TcpHalfState::SynAck => {
                if set(TCP_ACK) && dir == pdir {
                    TcpHalfState::Established
                } else {
                    self
                }
            }
            TcpHalfState::Established => self,
            TcpHalfState::Fin => {
                if set(TCP_ACK) && dir != pdir {
                    TcpHalfState::Closed
                } else {
                    self
                }
            }
            TcpHalfState::Closed => self,
        }
    }
}

/// The two half-connection state machines tracked per TCP flow.
#[derive(Debug, Clone, Copy)]
pub struct TcpStateMachine {
    /// Watches activity initiated by the flow's forward side.
    pub cstate: TcpHalfState,
    /// Watches activity initiated by the flow's backward side.
    pub sstate: TcpHalfState,
}

impl TcpStateMachine {
    pub fn new() -> Self {
        TcpStateMachine {
            cstate: TcpHalfState::Start,
            sstate: TcpHalfState::Start,
        }
    }

    pub fn update(&mut self, flags: u8, pdir: Direction) {
        self.cstate = self.cstate.transition(flags, Direction::Forward, pdir);
        self.sstate = self.sstate.transition(flags, Direction::Backward, pdir);
    }

    pub fn both_closed(&self) -> bool {
        self.cstate == TcpHalfState::Closed && self.sstate == TcpHalfState::Closed
    }
}

impl Default for TcpStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_to_syn_on_own_direction_syn() {
        let s = TcpHalfState::Start;
        assert_eq!(
            s.transition(TCP_SYN, Direction::Forward, Direction::Forward),
            TcpHalfState::Syn
        );
    }

    #[test]
    fn start_ignores_syn_from_other_direction() {
        let s = TcpHalfState::Start;
        assert_eq!(
            s.transition(TCP_SYN, Direction::Forward, Direction::Backward),
            TcpHalfState::Start
        );
    }

    #[test]
    fn syn_to_synack_requires_other_direction() {
        let s = TcpHalfState::Syn;
        assert_eq!(
            s.transition(TCP_SYN | TCP_ACK, Direction::Forward, Direction::Backward),
            TcpHalfState::SynAck
        );
        assert_eq!(
            s.transition(TCP_SYN | TCP_ACK, Direction::Forward, Direction::Forward),
            TcpHalfState::Syn
        );
    }

    #[test]
    fn synack_to_established_on_own_ack() {
        let s = TcpHalfState::SynAck;
        assert_eq!(
            s.transition(TCP_ACK, Direction::Forward, Direction::Forward),
            TcpHalfState::Established
        );
    }

    #[test]
    fn established_has_no_transition() {
        let s = TcpHalfState::Established;
        assert_eq!(
            s.transition(TCP_ACK | TCP_PSH_PLACEHOLDER, Direction::Forward, Direction::Forward),
            TcpHalfState::Established
        );
    }

    const TCP_PSH_PLACEHOLDER: u8 = 0x08;

    #[test]
    fn fin_to_closed_requires_other_direction_ack() {
        let s = TcpHalfState::Fin;
        assert_eq!(
            s.transition(TCP_ACK, Direction::Forward, Direction::Backward),
            TcpHalfState::Closed
        );
        assert_eq!(
            s.transition(TCP_ACK, Direction::Forward, Direction::Forward),
            TcpHalfState::Fin
        );
    }

    #[test]
    fn closed_is_terminal() {
        let s = TcpHalfState::Closed;
        assert_eq!(
            s.transition(TCP_SYN, Direction::Forward, Direction::Forward),
            TcpHalfState::Closed
        );
    }

    #[test]
    fn rst_closes_unconditionally_from_any_state() {
        for s in [
            TcpHalfState::Start,
            TcpHalfState::Syn,
            TcpHalfState::SynAck,
            TcpHalfState::Established,
            TcpHalfState::Fin,
        ] {
            assert_eq!(
                s.transition(TCP_RST, Direction::Backward, Direction::Forward),
                TcpHalfState::Closed
            );
        }
    }

    #[test]
    fn fin_observed_only_in_own_direction() {
        let s = TcpHalfState::Established;
        assert_eq!(
            s.transition(TCP_FIN, Direction::Forward, Direction::Forward),
            TcpHalfState::Fin
        );
        assert_eq!(
            s.transition(TCP_FIN, Direction::Backward, Direction::Forward),
            TcpHalfState::Established
        );
    }

    #[test]
    fn full_handshake_and_teardown_closes_both_halves() {
        // sstate only ever leaves a state on a packet carrying SYN or FIN of
        // its own, so it tracks one step behind cstate throughout: it reaches
        // Established only via a second SYN-bearing exchange, and Closed
        // only via its own FIN, not the mere sight of cstate closing. A full
        // four-way teardown is the shortest sequence that closes both.
        let mut fsm = TcpStateMachine::new();
        // A (forward) SYN
        fsm.update(TCP_SYN, Direction::Forward);
        // B (backward) SYN+ACK
        fsm.update(TCP_SYN | TCP_ACK, Direction::Backward);
        // A ACK
        fsm.update(TCP_ACK, Direction::Forward);
        assert_eq!(fsm.cstate, TcpHalfState::Established);
        assert_eq!(fsm.sstate, TcpHalfState::Syn);
        // A FIN+ACK
        fsm.update(TCP_FIN | TCP_ACK, Direction::Forward);
        assert_eq!(fsm.cstate, TcpHalfState::Fin);
        // B ACK
        fsm.update(TCP_ACK, Direction::Backward);
        assert_eq!(fsm.cstate, TcpHalfState::Closed);
        assert_eq!(fsm.sstate, TcpHalfState::Syn);
        // B FIN+ACK
        fsm.update(TCP_FIN | TCP_ACK, Direction::Backward);
        assert_eq!(fsm.sstate, TcpHalfState::Fin);
        // A ACK
        fsm.update(TCP_ACK, Direction::Forward);
        assert!(fsm.both_closed());
    }
}
