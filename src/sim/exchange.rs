//! The frame exchange procedures.
//!
//! Every exchange involves the sender, one or more receivers and the
//! medium, so the procedures operate on the whole runtime. They run
//! inside the log scope of the node whose event is handled.

use tracing::{debug, trace, warn};

use super::{CarrierSense, GetSendSlot, Receive, WifiSim};
use crate::{
    logger,
    mac::{
        Destination, DropReason, ExchangeKind, FrameExchange, FrameKind, LinkFrame, MacAddress,
        WifiState, ACK_SIZE, CTS_SIZE, MAX_FRAME_SIZE, RTS_SIZE,
    },
    medium::{Signal, Transfer},
    phy::tx_duration,
    runtime::{self, Runtime},
    time::{Duration, SimTime},
};

type Rt = Runtime<WifiSim>;

pub(super) fn enqueue(rt: &mut Rt, node: MacAddress, frame: LinkFrame) {
    trace!("enqueue {frame}");
    let mac = rt.app.mac_mut(node);
    let dropped = mac.enqueue(frame);
    let idle = mac.is_online() && mac.current().is_none();

    for (frame, reason) in dropped {
        drop_frame(rt, node, frame, reason);
    }
    if idle {
        send_next_frame(rt, node);
    }
}

pub(super) fn drop_frame(rt: &mut Rt, node: MacAddress, frame: LinkFrame, reason: DropReason) {
    if reason == DropReason::LinkDrop {
        rt.app.metrics.unicast_dropped += 1;
    }
    rt.app.metrics.record_drop(reason);
    rt.app.inbox.drop_frame(node, frame, reason);
}

/// Moves on to the next frame of the queue that has a link.
fn send_next_frame(rt: &mut Rt, node: MacAddress) {
    loop {
        let dropped = rt.app.mac_mut(node).advance();
        for (frame, reason) in dropped {
            drop_frame(rt, node, frame, reason);
        }

        if rt.app.mac(node).current().is_none() {
            trace!("outbound queue is empty");
            return;
        }
        if send_current(rt, node) {
            return;
        }
    }
}

/// Starts a new attempt of the current frame. Returns `false` if the
/// frame was dropped instead.
fn send_current(rt: &mut Rt, node: MacAddress) -> bool {
    let id = rt.app.next_exchange_id();
    let entry = rt.app.mac_mut(node).start_exchange(id);
    let exchange = FrameExchange::new(id, entry.frame.clone(), entry.enqueued);

    if exchange.frame.size() >= MAX_FRAME_SIZE {
        warn!(
            "frame {} exceeds the maximum frame size of {MAX_FRAME_SIZE} bytes",
            exchange.frame
        );
    }

    if let Destination::Unicast(receiver) = exchange.destination {
        if !rt.app.medium.has_link(node, receiver) {
            debug!("no link to {receiver}");
            if let Some(frame) = rt.app.mac_mut(node).clear_current() {
                drop_frame(rt, node, frame, DropReason::NoLink);
            }
            return false;
        }
    }

    try_get_send_slot(rt, node, exchange);
    true
}

fn try_get_send_slot(rt: &mut Rt, node: MacAddress, exchange: FrameExchange) {
    let mac = rt.app.mac_mut(node);
    let (epoch, end) = runtime::with_rng(|rng| mac.begin_slot_acquisition(rng));
    trace!("waiting for a send slot at {end} for {}", exchange.id);
    rt.add_event(
        GetSendSlot {
            node,
            epoch,
            exchange,
        },
        end,
    );
}

pub(super) fn on_send_slot(rt: &mut Rt, node: MacAddress, epoch: u64, exchange: FrameExchange) {
    let now = SimTime::now();
    let mac = rt.app.mac_mut(node);
    if !mac.claim_slot(epoch) {
        trace!("ignoring outdated send slot of {}", exchange.id);
        return;
    }
    if !mac.is_online() {
        warn!("cannot acquire a send slot while offline");
        return;
    }

    // panics if the medium is busy at a due backoff end
    let end = mac.dcf.backoff_end();
    if end > now {
        let epoch = mac.defer_slot();
        trace!("backoff was extended to {end}");
        rt.add_event(
            GetSendSlot {
                node,
                epoch,
                exchange,
            },
            end,
        );
        return;
    }

    assert_eq!(
        end, now,
        "backoff of {node} ended in the past, the send slot was not claimed in time"
    );
    mac.dcf.stop_backoff();

    let kind = mac.exchange_kind(&exchange.frame);
    debug!("acquired send slot for {} ({kind:?})", exchange.frame);
    match kind {
        ExchangeKind::Broadcast => send_broadcast(rt, node, exchange),
        ExchangeKind::DirectUnicast => send_direct_unicast(rt, node, exchange),
        ExchangeKind::RtsCtsUnicast => send_rts_cts_unicast(rt, node, exchange),
    }
}

fn send_broadcast(rt: &mut Rt, node: MacAddress, mut exchange: FrameExchange) {
    let now = SimTime::now();
    let mac = rt.app.mac_mut(node);
    let mode = mac.rate.broadcast_data_mode();
    let (preamble, tx_power) = (mac.preamble(), mac.tx_power_dbm());
    let size = exchange.frame.size();
    let duration = tx_duration(size, mode, preamble);

    exchange.data_mode = Some(mode);
    exchange.data_duration = duration;
    mac.dcf.notify_tx(duration);
    debug!("broadcasting {} in {mode} for {duration:?}", exchange.frame);

    for neighbor in rt.app.medium.neighbors(node) {
        let peer = rt.app.mac_mut(neighbor);
        let reachable = peer.is_online() && !peer.dcf.is_tx_or_rx();
        if reachable {
            peer.dcf.notify_rx(duration);
        }
        rt.add_event(
            Receive {
                node: neighbor,
                exchange: exchange.clone(),
                dropped: !reachable,
            },
            now + duration,
        );
    }

    register_transfer(
        rt,
        Signal::new(node, now, duration, tx_power),
        Transfer {
            exchange: exchange.id,
            mode,
            preamble,
            size,
        },
    );
    rt.app
        .energy
        .send(node, duration, FrameKind::Data(size), true);

    rt.app.metrics.broadcast_sent += 1;
    rt.app.metrics.broadcast_bytes_sent += u64::from(exchange.frame.payload_size);

    // there is no acknowledgement to wait for
    successful_transmitted(rt, node, &exchange);
}

fn send_direct_unicast(rt: &mut Rt, node: MacAddress, mut exchange: FrameExchange) {
    let now = SimTime::now();
    let receiver = exchange.receiver();
    let peer = rt.app.mac(receiver);
    let reachable = peer.is_online() && !peer.dcf.is_tx_or_rx();

    let mac = rt.app.mac_mut(node);
    let (preamble, tx_power, sifs) = (mac.preamble(), mac.tx_power_dbm(), mac.dcf.sifs());
    let data_mode = mac.rate.unicast_data_mode(receiver);
    let ack_mode = mac.rate.ack_mode(data_mode);

    let size = exchange.frame.size();
    let payload = exchange.frame.payload_size;
    let data_duration = tx_duration(size, data_mode, preamble);
    let ack_duration = tx_duration(ACK_SIZE, ack_mode, preamble);
    let total = data_duration + sifs + ack_duration;

    exchange.data_mode = Some(data_mode);
    exchange.ack_mode = Some(ack_mode);
    exchange.data_duration = data_duration;
    exchange.ack_duration = ack_duration;
    debug!(
        "sending {} in {data_mode} for {data_duration:?}, ack in {ack_mode}",
        exchange.frame
    );

    register_transfer(
        rt,
        Signal::new(node, now, data_duration, tx_power),
        Transfer {
            exchange: exchange.id,
            mode: data_mode,
            preamble,
            size,
        },
    );
    rt.app
        .energy
        .send(node, data_duration, FrameKind::Data(size), false);
    rt.app.mac_mut(node).dcf.notify_tx(total);
    update_neighbors_nav(rt, node, total);

    if reachable {
        rt.app.mac_mut(receiver).dcf.notify_rx(total);
    } else {
        debug!("receiver {receiver} is busy or offline");
    }
    rt.add_event(
        Receive {
            node: receiver,
            exchange,
            dropped: !reachable,
        },
        now + data_duration,
    );

    rt.app.metrics.unicast_sent += 1;
    rt.app.metrics.unicast_bytes_sent += u64::from(payload);
}

fn send_rts_cts_unicast(rt: &mut Rt, node: MacAddress, mut exchange: FrameExchange) {
    let now = SimTime::now();
    let receiver = exchange.receiver();
    let peer = rt.app.mac(receiver);
    let (peer_state, peer_online) = (peer.state(), peer.is_online());
    let peer_tx_power = peer.tx_power_dbm();

    let mac = rt.app.mac_mut(node);
    let (preamble, tx_power) = (mac.preamble(), mac.tx_power_dbm());
    let (sifs, cts_timeout) = (mac.dcf.sifs(), mac.dcf.cts_timeout());
    let rts_mode = mac.rate.rts_mode(receiver);
    let rts_duration = tx_duration(RTS_SIZE, rts_mode, preamble);

    if peer_state != WifiState::Idle || !peer_online {
        debug!("no cts from {receiver} ({peer_state}), waiting for the cts timeout");
        update_neighbors_nav(rt, node, cts_timeout);
        rt.app.mac_mut(node).rate.report_rts_failed(receiver);
        send_rts(rt, node, Signal::new(node, now, rts_duration, tx_power));

        rt.app.mac_mut(node).dcf.notify_cts_timeout();
        rt.app.metrics.cts_timeouts += 1;
        unsuccessful_transmitted(rt, node, &exchange);
        return;
    }

    let cts_mode = mac.rate.cts_mode(rts_mode);
    let cts_snr = rt.app.medium.snr(receiver, node, cts_mode, tx_power);

    let mac = rt.app.mac_mut(node);
    mac.rate.report_rts_ok(receiver, cts_snr);
    let data_mode = mac.rate.unicast_data_mode(receiver);
    let ack_mode = mac.rate.ack_mode(data_mode);

    let size = exchange.frame.size();
    let payload = exchange.frame.payload_size;
    let cts_duration = tx_duration(CTS_SIZE, cts_mode, preamble);
    let data_duration = tx_duration(size, data_mode, preamble);
    let ack_duration = tx_duration(ACK_SIZE, ack_mode, preamble);

    let cts_start = now + rts_duration + sifs;
    let data_start = cts_start + cts_duration + sifs;
    let total = rts_duration + sifs + cts_duration + sifs + data_duration + sifs + ack_duration;

    exchange.data_mode = Some(data_mode);
    exchange.ack_mode = Some(ack_mode);
    exchange.data_duration = data_duration;
    exchange.ack_duration = ack_duration;
    debug!(
        "sending {} with rts in {rts_mode}, cts in {cts_mode}, data in {data_mode}",
        exchange.frame
    );

    mac.dcf.notify_tx(total);
    rt.app.mac_mut(receiver).dcf.notify_rx(total);
    update_neighbors_nav(rt, node, cts_timeout);
    update_neighbors_nav(rt, receiver, total);

    register_transfer(
        rt,
        Signal::new(node, data_start, data_duration, tx_power),
        Transfer {
            exchange: exchange.id,
            mode: data_mode,
            preamble,
            size,
        },
    );
    send_rts(rt, node, Signal::new(node, now, rts_duration, tx_power));
    register_interference(
        rt,
        Signal::new(receiver, cts_start, cts_duration, peer_tx_power),
    );

    let energy = &mut rt.app.energy;
    energy.send(receiver, cts_duration, FrameKind::Cts, false);
    energy.receive(node, cts_duration, FrameKind::Cts, false, true);
    energy.send(node, data_duration, FrameKind::Data(size), false);

    rt.add_event(
        Receive {
            node: receiver,
            exchange,
            dropped: false,
        },
        data_start + data_duration,
    );

    rt.app.metrics.unicast_sent += 1;
    rt.app.metrics.unicast_bytes_sent += u64::from(payload);
}

/// Puts an RTS on the air, overheard by all idle neighbors.
fn send_rts(rt: &mut Rt, node: MacAddress, signal: Signal) {
    let duration = signal.duration();
    rt.app.energy.send(node, duration, FrameKind::Rts, false);
    for neighbor in rt.app.medium.neighbors(node) {
        let peer = rt.app.mac(neighbor);
        if peer.is_online() && peer.state() == WifiState::Idle {
            rt.app
                .energy
                .receive(neighbor, duration, FrameKind::Rts, false, true);
        }
    }
    register_interference(rt, signal);
}

/// Sets the NAV of all neighbors of `node` that are neither sending
/// nor receiving.
fn update_neighbors_nav(rt: &mut Rt, node: MacAddress, duration: Duration) {
    for neighbor in rt.app.medium.neighbors(node) {
        let peer = rt.app.mac_mut(neighbor);
        if !peer.dcf.is_tx_or_rx() {
            peer.dcf.notify_nav(duration);
        }
    }
}

fn register_transfer(rt: &mut Rt, signal: Signal, transfer: Transfer) {
    rt.app.medium.add_transfer(signal, transfer);
    schedule_carrier_sense(rt, signal);
}

fn register_interference(rt: &mut Rt, signal: Signal) {
    rt.app.medium.add_interference(signal);
    schedule_carrier_sense(rt, signal);
}

fn schedule_carrier_sense(rt: &mut Rt, signal: Signal) {
    let duration = signal.duration();
    if signal.start == SimTime::now() {
        notify_carrier_sense(rt, signal.source, duration);
    } else {
        rt.add_event(
            CarrierSense {
                source: signal.source,
                duration,
            },
            signal.start,
        );
    }
}

pub(super) fn notify_carrier_sense(rt: &mut Rt, source: MacAddress, duration: Duration) {
    for node in rt.app.medium.carrier_sense_neighbors(source) {
        rt.app.mac_mut(node).dcf.notify_cca(duration);
    }
}

pub(super) fn on_receive(rt: &mut Rt, node: MacAddress, exchange: FrameExchange, dropped: bool) {
    let sender = exchange.sender;
    if dropped {
        trace!("{} did not reach this node", exchange.frame);
        logger::scoped(sender, || unsuccessful_transmitted(rt, sender, &exchange));
        return;
    }

    if !rt.app.mac(node).is_online() {
        if !exchange.is_broadcast() {
            drop_frame(
                rt,
                node,
                exchange.frame.clone(),
                DropReason::ReceivingMacOffline,
            );
        }
        logger::scoped(sender, || unsuccessful_transmitted(rt, sender, &exchange));
        return;
    }

    handle_received(rt, node, &exchange);
}

fn handle_received(rt: &mut Rt, node: MacAddress, exchange: &FrameExchange) {
    let sender = exchange.sender;
    let mode = exchange.mode();
    let size = exchange.frame.size();
    let broadcast = exchange.is_broadcast();

    let mac = rt.app.mac_mut(node);
    // the own signal covers the whole reception
    let collided = mac.dcf.tx_start().is_some() && mac.dcf.tx_start() == mac.dcf.rx_start();
    let success = if collided {
        debug!("{} collided with an own transmission", exchange.frame);
        mac.dcf.increase_cw();
        false
    } else {
        let per = rt.app.medium.packet_error_rate(exchange.id, node);
        let success = runtime::random::<f64>() > per;
        trace!("packet error rate of {} is {per:.6}", exchange.id);
        rt.app.energy.receive(
            node,
            exchange.data_duration,
            FrameKind::Data(size),
            broadcast,
            success,
        );
        success
    };

    if !success {
        debug!("failed to receive {}", exchange.frame);
        rt.app.mac_mut(node).dcf.notify_rx_drop();
        rt.app.metrics.rx_drops += 1;
        logger::scoped(sender, || unsuccessful_transmitted(rt, sender, exchange));
        return;
    }

    rt.app.inbox.deliver(node, exchange.frame.clone());
    logger::scoped(sender, || successful_transmitted(rt, sender, exchange));

    let mac = rt.app.mac(node);
    let (tx_power, sifs) = (mac.tx_power_dbm(), mac.dcf.sifs());
    let snr = rt.app.medium.snr(sender, node, mode, tx_power);
    rt.app.mac_mut(node).rate.report_rx_ok(sender, snr);

    if broadcast {
        return;
    }

    let ack = Signal::new(node, SimTime::now() + sifs, exchange.ack_duration, tx_power);
    register_interference(rt, ack);
    rt.app
        .energy
        .send(node, exchange.ack_duration, FrameKind::Ack, false);

    let origin = rt.app.mac(sender);
    if origin.is_online() && origin.state() == WifiState::Idle {
        rt.app
            .energy
            .receive(sender, exchange.ack_duration, FrameKind::Ack, false, true);
    }
}

/// The exchange reached (one of) its receivers.
fn successful_transmitted(rt: &mut Rt, sender: MacAddress, exchange: &FrameExchange) {
    let id = exchange.id;
    let payload = u64::from(exchange.frame.payload_size);

    let mac = rt.app.mac_mut(sender);
    let known = mac.ack_cache.contains(&id);
    mac.dcf.reset_cw();

    if exchange.is_broadcast() && known {
        rt.app.metrics.broadcast_received += 1;
        rt.app.metrics.broadcast_bytes_received += payload;
    } else if !exchange.is_broadcast() && !known {
        rt.app.metrics.unicast_received += 1;
        rt.app.metrics.unicast_bytes_received += payload;
        rt.app.metrics.queue_delay += exchange.queue_delay;
    }

    if known {
        return;
    }

    let mac = rt.app.mac_mut(sender);
    mac.ack_cache.put(id);
    let current = mac.is_current_exchange(id);
    let tx_power = mac.tx_power_dbm();

    if let Destination::Unicast(receiver) = exchange.destination {
        let ack_mode = exchange.ack_mode.unwrap_or_else(|| exchange.mode());
        let snr = rt.app.medium.snr(receiver, sender, ack_mode, tx_power);
        rt.app.mac_mut(sender).rate.report_data_ok(receiver, snr);
        debug!("{} acknowledged by {receiver}", exchange.frame);
    }

    if current {
        send_next_frame(rt, sender);
    }
}

/// The exchange failed at (one of) its receivers.
fn unsuccessful_transmitted(rt: &mut Rt, sender: MacAddress, exchange: &FrameExchange) {
    let id = exchange.id;
    let mac = rt.app.mac_mut(sender);

    if !mac.ack_cache.contains(&id) {
        mac.ack_cache.put(id);
        let current = mac.is_current_exchange(id);
        match exchange.destination {
            Destination::Unicast(receiver) if current => retry_or_drop(rt, sender, receiver),
            Destination::Unicast(_) => trace!("ignoring the failure of outdated {id}"),
            Destination::Broadcast => {
                if current {
                    send_next_frame(rt, sender);
                }
            }
        }
    }

    if exchange.is_broadcast() {
        rt.app.metrics.broadcast_dropped += 1;
    }
}

fn retry_or_drop(rt: &mut Rt, sender: MacAddress, receiver: MacAddress) {
    let mac = rt.app.mac_mut(sender);
    if mac.register_failure() {
        debug!(
            "retransmission {}/{} to {receiver}",
            mac.retry_count(),
            mac.max_retransmissions()
        );
        mac.rate.report_data_failed(receiver);
        rt.app.metrics.unicast_resent += 1;
        if !send_current(rt, sender) {
            send_next_frame(rt, sender);
        }
    } else {
        mac.rate.report_final_data_failed(receiver);
        if let Some(frame) = mac.clear_current() {
            drop_frame(rt, sender, frame, DropReason::LinkDrop);
        }
        send_next_frame(rt, sender);
    }
}
