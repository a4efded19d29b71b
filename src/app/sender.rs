//! Rate-paced sender
//!
//! Sends fixed-size payloads on one TCP socket, spaced so that the average
//! offered load matches a target data rate. The loop is feedback free: each
//! send schedules the next one `packet_size * 8 / rate` later until the
//! configured count is reached. What actually goes on the wire is decided by
//! the transport underneath.

use std::any::Any;

use serde::Serialize;
use tracing::{debug, trace};

use super::application::{AppError, Application};
use super::env::AppEnv;
use crate::net::DataRate;
use crate::proto::{Payload, SockAddr, SocketId};
use crate::sim::{EventId, SimTime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderState {
    #[default]
    Idle,
    Running,
    /// Terminal.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderConfig {
    pub socket: SocketId,
    pub peer: SockAddr,
    pub packet_size: u32,
    pub packet_count: u32,
    pub data_rate: DataRate,
}

/// Gap between two sends: `packet_size * 8 / rate`, rounded to the nearest nanosecond.
pub fn pacing_interval(packet_size: u32, rate: DataRate) -> SimTime {
    let bps = rate.bps() as u128;
    if bps == 0 {
        return SimTime::MAX;
    }
    let bit_ns = packet_size as u128 * 8 * 1_000_000_000;
    let ns = (bit_ns + bps / 2) / bps;
    SimTime(u64::try_from(ns).unwrap_or(u64::MAX))
}

#[derive(Debug)]
pub struct RateLimitedSender {
    name: String,
    cfg: Option<SenderConfig>,
    state: SenderState,
    /// the one outstanding send timer
    send_event: Option<EventId>,
    socket_open: bool,
    packets_sent: u32,
    bytes_accepted: u64,
    first_tx: Option<SimTime>,
    last_tx: Option<SimTime>,
}

impl RateLimitedSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cfg: None,
            state: SenderState::Idle,
            send_event: None,
            socket_open: false,
            packets_sent: 0,
            bytes_accepted: 0,
            first_tx: None,
            last_tx: None,
        }
    }

    /// Store the parameters. No other side effect; call before activation.
    pub fn configure(
        &mut self,
        socket: SocketId,
        peer: SockAddr,
        packet_size: u32,
        packet_count: u32,
        data_rate: DataRate,
    ) {
        self.cfg = Some(SenderConfig {
            socket,
            peer,
            packet_size,
            packet_count,
            data_rate,
        });
    }

    pub fn config(&self) -> Option<&SenderConfig> {
        self.cfg.as_ref()
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn packets_sent(&self) -> u32 {
        self.packets_sent
    }

    /// Bytes the socket took into its send buffer, summed over all sends.
    pub fn bytes_accepted(&self) -> u64 {
        self.bytes_accepted
    }

    pub fn pending_event(&self) -> Option<EventId> {
        self.send_event
    }

    pub fn is_socket_open(&self) -> bool {
        self.socket_open
    }

    pub fn first_tx(&self) -> Option<SimTime> {
        self.first_tx
    }

    pub fn last_tx(&self) -> Option<SimTime> {
        self.last_tx
    }

    /// Send one payload, then reschedule while below the packet count.
    ///
    /// The count is checked after the send, so a count of 0 still sends once.
    pub(crate) fn send_packet(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError> {
        self.send_event = None;
        if self.state != SenderState::Running {
            trace!(name = %self.name, state = ?self.state, "not running, send skipped");
            return Ok(());
        }
        let cfg = self.cfg.ok_or(AppError::NotConfigured)?;

        let now = env.now();
        let accepted = env.send(cfg.socket, Payload::with_size(cfg.packet_size))?;
        self.packets_sent = self.packets_sent.saturating_add(1);
        self.bytes_accepted += accepted as u64;
        self.first_tx.get_or_insert(now);
        self.last_tx = Some(now);
        trace!(
            name = %self.name,
            now = %now,
            sent = self.packets_sent,
            accepted,
            "packet sent"
        );

        if self.packets_sent < cfg.packet_count {
            self.schedule_tx(env);
        } else {
            debug!(name = %self.name, now = %now, sent = self.packets_sent, "packet count reached");
        }
        Ok(())
    }

    /// Arm the next send one pacing interval from now. Does nothing unless running.
    pub(crate) fn schedule_tx(&mut self, env: &mut dyn AppEnv) {
        if self.state != SenderState::Running {
            return;
        }
        let Some(cfg) = self.cfg else {
            return;
        };
        if let Some(stale) = self.send_event.take() {
            env.cancel(stale);
        }
        let gap = pacing_interval(cfg.packet_size, cfg.data_rate);
        self.send_event = Some(env.schedule(gap));
    }
}

impl Application for RateLimitedSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError> {
        let cfg = self.cfg.ok_or(AppError::NotConfigured)?;
        if self.state != SenderState::Idle {
            return Err(AppError::InvalidState(self.state));
        }
        if cfg.data_rate.bps() == 0 {
            return Err(AppError::ZeroDataRate);
        }

        self.state = SenderState::Running;
        self.packets_sent = 0;
        let local = env.bind(cfg.socket)?;
        self.socket_open = true;
        env.connect(cfg.socket, cfg.peer)?;
        debug!(
            name = %self.name,
            %local,
            peer = %cfg.peer,
            rate = %cfg.data_rate,
            interval = %pacing_interval(cfg.packet_size, cfg.data_rate),
            "sender activated"
        );
        self.send_packet(env)
    }

    fn deactivate(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError> {
        self.state = SenderState::Stopped;
        if let Some(id) = self.send_event.take() {
            if env.is_pending(id) {
                env.cancel(id);
            }
        }
        if self.socket_open {
            self.socket_open = false;
            if let Some(cfg) = self.cfg {
                env.close(cfg.socket)?;
            }
        }
        Ok(())
    }

    fn on_timer(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError> {
        self.send_packet(env)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
