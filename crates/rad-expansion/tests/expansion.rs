//! Bus-master access and REU transfers against the simulated port.

use c64_sim::{BootingTarget, ScriptedTarget, SimClock, SimulatedC64};
use rad_core::{BusSynchronizer, Observable, Value};
use rad_expansion::{
    Controller, ControllerConfig, ExpansionChannel, ExpansionError, ExpansionRegion,
    TransferCommand, TransferType,
};

fn synchronizer(c64: &mut SimulatedC64) -> BusSynchronizer<&mut SimulatedC64, SimClock> {
    let clock = c64.clock();
    BusSynchronizer::new(c64, clock, c64_sim::timing())
}

fn channel(size_kb: u32) -> ExpansionChannel {
    ExpansionChannel::new(ExpansionRegion::new(size_kb).expect("region"))
}

#[test]
fn single_bytes_round_trip_across_the_address_space() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(1);
    channel.attach(&mut sync);

    let addresses = [0x0000, 0x00FF, 0x0400, 0x7FFF, 0xC000, 0xFFFF];
    for (i, &address) in addresses.iter().enumerate() {
        ExpansionChannel::synchronize(&mut sync);
        channel.write(&mut sync, address, 0x40 + i as u8);
    }
    for (i, &address) in addresses.iter().enumerate() {
        ExpansionChannel::synchronize(&mut sync);
        assert_eq!(channel.read(&mut sync, address), 0x40 + i as u8);
    }
    assert_eq!(channel.query("writes"), Some(Value::U64(6)));

    assert_eq!(c64.peek(0x7FFF), 0x43);
    assert!(c64.violations().is_empty());
}

#[test]
fn stash_copies_c64_memory_into_the_region() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    for i in 0..16u16 {
        c64.poke(0xC000 + i, 0xA0 ^ i as u8);
    }
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(4);
    channel.attach(&mut sync);

    let status = channel
        .execute(
            &mut sync,
            TransferCommand::new(TransferType::Stash, 0xC000, 0x100, 16),
        )
        .expect("in range");
    assert_eq!(status.bytes, 16);
    assert_eq!(status.next_c64_address, 0xC010);
    assert_eq!(status.next_region_offset, 0x110);
    assert!(!status.verify_error);

    let expected: Vec<u8> = (0..16u8).map(|i| 0xA0 ^ i).collect();
    assert_eq!(channel.region().slice(0x100, 16).expect("slice"), expected);
}

#[test]
fn fetch_writes_the_region_into_c64_memory() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(64);
    channel
        .region_mut()
        .load(0xF000, b"RAD EXPANSION")
        .expect("in range");
    channel.attach(&mut sync);

    channel
        .execute(
            &mut sync,
            TransferCommand::new(TransferType::Fetch, 0x0400, 0xF000, 13),
        )
        .expect("in range");

    let copied: Vec<u8> = (0x0400..0x040D).map(|a| c64.peek(a)).collect();
    assert_eq!(copied, b"RAD EXPANSION");
    assert!(c64.violations().is_empty());
}

#[test]
fn fixed_c64_address_streams_to_a_register() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(1);
    channel.region_mut().load(0, &[1, 5, 9, 15]).expect("in range");
    channel.attach(&mut sync);

    let mut command = TransferCommand::new(TransferType::Fetch, 0xD418, 0, 4);
    command.fix_c64 = true;
    let status = channel.execute(&mut sync, command).expect("in range");
    assert_eq!(status.next_c64_address, 0xD418);

    assert_eq!(c64.dac_samples().collect::<Vec<_>>(), [1, 5, 9, 15]);
}

#[test]
fn swap_exchanges_both_sides() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    c64.poke(0x2000, 0x11);
    c64.poke(0x2001, 0x22);
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(1);
    channel.region_mut().load(0x10, &[0xAA, 0xBB]).expect("in range");
    channel.attach(&mut sync);

    channel
        .execute(&mut sync, TransferCommand::new(TransferType::Swap, 0x2000, 0x10, 2))
        .expect("in range");
    assert_eq!(channel.region().slice(0x10, 2).expect("slice"), [0x11, 0x22]);

    assert_eq!((c64.peek(0x2000), c64.peek(0x2001)), (0xAA, 0xBB));
}

#[test]
fn verify_stops_at_first_difference() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    for (i, value) in [3u8, 1, 4, 1, 5, 9].into_iter().enumerate() {
        c64.poke(0x3000 + i as u16, value);
    }
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(1);
    channel.region_mut().load(0, &[3, 1, 4, 7, 5, 9]).expect("in range");
    channel.attach(&mut sync);

    let status = channel
        .execute(&mut sync, TransferCommand::new(TransferType::Verify, 0x3000, 0, 6))
        .expect("in range");
    assert!(status.verify_error);
    assert_eq!(status.bytes, 4);
    assert_eq!(status.next_c64_address, 0x3004);
}

#[test]
fn out_of_range_is_rejected_before_the_bus_is_touched() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    let time = c64.time().clone();
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(1);
    channel.attach(&mut sync);

    let before = time.now();
    let result = channel.execute(
        &mut sync,
        TransferCommand::new(TransferType::Stash, 0x0800, 1020, 8),
    );
    assert_eq!(
        result,
        Err(ExpansionError::OutOfRange {
            offset: 1020,
            len: 8,
            size: 1024
        })
    );
    assert_eq!(time.now(), before);
    assert_eq!(channel.query("reads"), Some(Value::U64(0)));
}

#[test]
fn transfers_need_the_bus() {
    let mut c64 = SimulatedC64::new(ScriptedTarget::idle());
    let mut sync = synchronizer(&mut c64);
    let mut channel = channel(1);

    let command = TransferCommand::new(TransferType::Stash, 0, 0, 1);
    assert_eq!(
        channel.execute(&mut sync, command),
        Err(ExpansionError::NotAttached)
    );

    channel.attach(&mut sync);
    assert!(channel.execute(&mut sync, command).is_ok());
    channel.detach(&mut sync);
    assert!(!channel.is_attached());
    assert!(!c64.dma_low());
}

#[test]
fn controller_reaches_memory_after_boot() {
    let mut c64 = SimulatedC64::new(BootingTarget::new());
    let clock = c64.clock();
    let config = ControllerConfig {
        timing_override: c64_sim::timing().into(),
        ..ControllerConfig::default()
    };
    let mut controller = Controller::new(&mut c64, clock, config).expect("controller");
    controller.boot().expect("target running");

    controller.poke(0x0801, 0x42).expect("attached");
    assert_eq!(controller.peek(0x0801).expect("attached"), 0x42);

    controller
        .channel_mut()
        .region_mut()
        .load(0x1_0000, &[0xDE, 0xAD])
        .expect("in range");
    let status = controller
        .execute(TransferCommand::new(TransferType::Fetch, 0xC000, 0x1_0000, 2))
        .expect("in range");
    assert_eq!(status.next_region_offset, 0x1_0002);

    assert_eq!((c64.peek(0xC000), c64.peek(0xC001)), (0xDE, 0xAD));
    assert!(c64.violations().is_empty());
}
