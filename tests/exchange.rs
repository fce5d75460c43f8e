use des_wifi::{
    mac::{Destination, DropReason, MacConfig},
    prelude::*,
    sim::SetOnline,
};
use serial_test::serial;

mod common;
use common::*;

fn rts_config() -> MacConfig {
    MacConfig {
        rts_cts_threshold: 500,
        ..MacConfig::default()
    }
}

#[test]
#[serial]
fn rts_cts_exchange_delivers_once() {
    let medium = ScriptedMedium::full_mesh(&[1, 2]);
    let air = medium.log();
    let mut rt = runtime(sim_with(medium, &[1, 2], &rts_config()));
    schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 1000);

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.unicast_sent, 1);
    assert_eq!(sim.metrics.unicast_received, 1);
    assert_eq!(sim.metrics.unicast_resent, 0);
    assert_eq!(sim.metrics.cts_timeouts, 0);
    assert_eq!(sim.metrics.unicast_bytes_received, 1000);
    assert_eq!(sim.metrics.queue_delay, Duration::ZERO);

    let delivered = sim.inbox.delivered_to(addr(2)).collect::<Vec<_>>();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].frame.payload_size, 1000);
    assert!(sim.inbox.drops().is_empty());

    let sender = sim.node(addr(1)).unwrap();
    assert_eq!(sender.dcf().cw(), sender.dcf().params().cw_min);
    assert!(sender.current().is_none());

    // rts and data by the sender, cts and ack by the receiver
    assert_eq!(sim.energy().stats(addr(1)).tx_frames, 2);
    assert_eq!(sim.energy().stats(addr(1)).rx_frames, 1);
    assert_eq!(sim.energy().stats(addr(2)).tx_frames, 2);
    assert_eq!(sim.energy().stats(addr(2)).rx_frames, 1);

    let air = air.borrow();
    assert_eq!(air.transfers.len(), 1);
    assert_eq!(air.interference.len(), 3);
    let (data, _) = air.transfers[0];
    let rts = air.interference[0];
    let cts = air.interference[1];
    assert_eq!(rts.source, addr(1));
    assert_eq!(cts.source, addr(2));
    assert!(rts.end < cts.start);
    assert!(cts.end < data.start);
}

#[test]
#[serial]
fn small_frames_skip_rts() {
    let medium = ScriptedMedium::full_mesh(&[1, 2]);
    let air = medium.log();
    let mut rt = runtime(sim_with(medium, &[1, 2], &rts_config()));
    schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 100);

    let (sim, _, _) = rt.run().unwrap();
    assert_eq!(sim.metrics.unicast_received, 1);

    // data and ack only
    let air = air.borrow();
    assert_eq!(air.transfers.len(), 1);
    assert_eq!(air.interference.len(), 1);
    assert_eq!(air.interference[0].source, addr(2));
}

#[test]
#[serial]
fn offline_receiver_causes_link_drop() {
    let config = MacConfig::default();
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]),
        &[1, 2],
        &config,
    ));
    rt.add_event(
        SetOnline {
            node: addr(2),
            online: false,
        },
        SimTime::ZERO,
    );
    let id = schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 200);

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.unicast_sent, u64::from(config.max_retransmissions) + 1);
    assert_eq!(sim.metrics.unicast_resent, u64::from(config.max_retransmissions));
    assert_eq!(sim.metrics.unicast_received, 0);
    assert_eq!(sim.metrics.unicast_dropped, 1);
    assert_eq!(sim.metrics.dropped(DropReason::LinkDrop), 1);

    let drops = sim.inbox.drops_at(addr(1)).collect::<Vec<_>>();
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].frame.id, id);
    assert_eq!(drops[0].reason, DropReason::LinkDrop);
    assert!(sim.inbox.deliveries().is_empty());

    let sender = sim.node(addr(1)).unwrap();
    assert_eq!(sender.dcf().cw(), sender.dcf().params().cw_max);
    assert!(sender.current().is_none());
}

#[test]
#[serial]
fn offline_receiver_times_out_rts() {
    let config = rts_config();
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]),
        &[1, 2],
        &config,
    ));
    rt.add_event(
        SetOnline {
            node: addr(2),
            online: false,
        },
        SimTime::ZERO,
    );
    schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 1000);

    let (sim, _, _) = rt.run().unwrap();

    let attempts = u64::from(config.max_retransmissions) + 1;
    assert_eq!(sim.metrics.cts_timeouts, attempts);
    assert_eq!(sim.metrics.unicast_sent, 0);
    assert_eq!(sim.metrics.unicast_resent, attempts - 1);
    assert_eq!(sim.metrics.dropped(DropReason::LinkDrop), 1);

    // only rts frames were sent
    let stats = sim.energy().stats(addr(1));
    assert_eq!(stats.tx_frames as u64, attempts);
}

#[test]
#[serial]
fn lossy_link_retries_and_drops() {
    let config = MacConfig::default();
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]).with_per(1.0),
        &[1, 2],
        &config,
    ));
    schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 200);

    let (sim, _, _) = rt.run().unwrap();

    let attempts = u64::from(config.max_retransmissions) + 1;
    assert_eq!(sim.metrics.rx_drops, attempts);
    assert_eq!(sim.metrics.unicast_sent, attempts);
    assert_eq!(sim.metrics.dropped(DropReason::LinkDrop), 1);

    let receiver = sim.energy().stats(addr(2));
    assert_eq!(receiver.rx_frames as u64, attempts);
    assert_eq!(receiver.rx_failures as u64, attempts);
    assert_eq!(receiver.tx_frames, 0);
}

#[test]
#[serial]
fn broadcast_reaches_every_neighbor() {
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2, 3, 4]),
        &[1, 2, 3, 4],
        &MacConfig::default(),
    ));
    schedule_frame(&mut rt, start(), addr(1), Destination::Broadcast, 100);

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.broadcast_sent, 1);
    assert_eq!(sim.metrics.broadcast_received, 3);
    assert_eq!(sim.metrics.broadcast_dropped, 0);
    assert_eq!(sim.metrics.broadcast_bytes_sent, 100);
    assert_eq!(sim.metrics.broadcast_bytes_received, 300);

    for node in [2, 3, 4] {
        assert_eq!(sim.inbox.delivered_to(addr(node)).count(), 1);
    }
    assert_eq!(sim.inbox.delivered_to(addr(1)).count(), 0);
    // no acknowledgements
    assert_eq!(sim.energy().stats(addr(1)).rx_frames, 0);
}

#[test]
#[serial]
fn broadcast_to_offline_neighbor_is_dropped() {
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2, 3]),
        &[1, 2, 3],
        &MacConfig::default(),
    ));
    rt.add_event(
        SetOnline {
            node: addr(3),
            online: false,
        },
        SimTime::ZERO,
    );
    schedule_frame(&mut rt, start(), addr(1), Destination::Broadcast, 100);

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.broadcast_received, 1);
    assert_eq!(sim.metrics.broadcast_dropped, 1);
    assert_eq!(sim.inbox.delivered_to(addr(2)).count(), 1);
    assert_eq!(sim.inbox.delivered_to(addr(3)).count(), 0);
}

#[test]
#[serial]
fn missing_link_drops_frame_and_continues() {
    let medium = ScriptedMedium::full_mesh(&[1, 2, 3]).without_link(1, 3);
    let mut rt = runtime(sim_with(medium, &[1, 2, 3], &MacConfig::default()));
    let lost = schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(3)), 100);
    let sent = schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 100);

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.dropped(DropReason::NoLink), 1);
    assert_eq!(sim.metrics.unicast_dropped, 0);
    assert_eq!(sim.inbox.drops()[0].frame.id, lost);
    assert_eq!(sim.inbox.drops()[0].reason, DropReason::NoLink);

    let delivered = sim.inbox.delivered_to(addr(2)).collect::<Vec<_>>();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].frame.id, sent);
}

#[test]
#[serial]
fn offline_sender_rejects_frames() {
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]),
        &[1, 2],
        &MacConfig::default(),
    ));
    rt.add_event(
        SetOnline {
            node: addr(1),
            online: false,
        },
        SimTime::ZERO,
    );
    for _ in 0..3 {
        schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 100);
    }
    rt.add_event(
        SetOnline {
            node: addr(1),
            online: true,
        },
        start() + Duration::from_millis(1),
    );
    let after = schedule_frame(
        &mut rt,
        start() + Duration::from_millis(2),
        addr(1),
        Destination::Unicast(addr(2)),
        100,
    );

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.dropped(DropReason::SendingMacOffline), 3);
    assert_eq!(sim.metrics.unicast_sent, 1);
    let delivered = sim.inbox.delivered_to(addr(2)).collect::<Vec<_>>();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].frame.id, after);
}

#[test]
#[serial]
fn full_queue_rejects_frames() {
    let config = MacConfig {
        max_queue_length: 2,
        ..MacConfig::default()
    };
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]),
        &[1, 2],
        &config,
    ));
    for _ in 0..5 {
        schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 100);
    }

    let (sim, _, _) = rt.run().unwrap();

    // one frame becomes current, two wait in the queue
    assert_eq!(sim.metrics.dropped(DropReason::QueueFull), 2);
    assert_eq!(sim.metrics.unicast_received, 3);
    let ids = sim
        .inbox
        .delivered_to(addr(2))
        .map(|d| d.frame.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![0, 1, 2]);

    // the first frame is sent right away, the others wait for it
    assert!(sim.metrics.queue_delay > Duration::ZERO);
    assert_eq!(sim.metrics.mean_queue_delay(), sim.metrics.queue_delay / 3);
}

#[test]
#[serial]
fn simultaneous_backoffs_collide_then_recover() {
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]),
        &[1, 2],
        &MacConfig::default(),
    ));
    schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 200);
    schedule_frame(&mut rt, start(), addr(2), Destination::Unicast(addr(1)), 200);

    let (sim, _, _) = rt.run().unwrap();

    // node 2 sends while receiving from node 1, both attempts fail
    assert_eq!(sim.metrics.rx_drops, 1);
    assert_eq!(sim.metrics.unicast_resent, 2);
    assert_eq!(sim.metrics.unicast_received, 2);
    assert_eq!(sim.inbox.delivered_to(addr(1)).count(), 1);
    assert_eq!(sim.inbox.delivered_to(addr(2)).count(), 1);
    assert!(sim.inbox.drops().is_empty());

    for node in sim.nodes() {
        assert_eq!(node.dcf().cw(), node.dcf().params().cw_min);
        assert!(node.current().is_none());
    }
}

#[test]
#[serial]
fn receiver_going_offline_mid_frame_drops_it() {
    let config = MacConfig::default();
    let mut rt = runtime(sim_with(
        ScriptedMedium::full_mesh(&[1, 2]),
        &[1, 2],
        &config,
    ));
    let id = schedule_frame(&mut rt, start(), addr(1), Destination::Unicast(addr(2)), 1000);
    rt.add_event(
        SetOnline {
            node: addr(2),
            online: false,
        },
        start() + Duration::from_micros(1_000),
    );

    let (sim, _, _) = rt.run().unwrap();

    assert_eq!(sim.metrics.dropped(DropReason::ReceivingMacOffline), 1);
    let at_receiver = sim.inbox.drops_at(addr(2)).collect::<Vec<_>>();
    assert_eq!(at_receiver.len(), 1);
    assert_eq!(at_receiver[0].frame.id, id);
    assert_eq!(at_receiver[0].reason, DropReason::ReceivingMacOffline);

    // the retries find the receiver offline until the retry limit
    assert_eq!(sim.metrics.unicast_sent, u64::from(config.max_retransmissions) + 1);
    assert_eq!(sim.metrics.dropped(DropReason::LinkDrop), 1);
    let at_sender = sim.inbox.drops_at(addr(1)).collect::<Vec<_>>();
    assert_eq!(at_sender.len(), 1);
    assert_eq!(at_sender[0].frame.id, id);
    assert_eq!(at_sender[0].reason, DropReason::LinkDrop);
    assert!(sim.inbox.deliveries().is_empty());
}
