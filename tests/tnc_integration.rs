//! Integration tests for the TNC core
//!
//! These tests verify end-to-end behavior including:
//! - Port bring-up from hardware profiles
//! - Sample routing under both routing policies
//! - Host commands reaching the right port
//! - Transmit framing in loopback through the HDLC decoder

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use fx25_tnc::config::Config;
use fx25_tnc::hdlc::decoder::decode_frame;
use fx25_tnc::hdlc::encoder::{encode_frame_to_vec, FrameStats};
use fx25_tnc::hdlc::fcs::{crc16_x25, fcs_bytes};
use fx25_tnc::hdlc::protocol::WordWidth;
use fx25_tnc::hdlc::queue::TxReceiver;
use fx25_tnc::hw::adc::ReaderSampleSource;
use fx25_tnc::hw::gpio::{PinMode, SimulatedGpio};
use fx25_tnc::hw::profile::{HardwareProfile, HardwareVariant, PortProfile};
use fx25_tnc::tnc::port::{ChannelAccess, PortControlBlock};
use fx25_tnc::tnc::router::{Demodulator, RoutingPolicy, SampleRouter};
use fx25_tnc::tnc::system::{TncSettings, TncSystem};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Demodulator that records every (port, magnitude) it is handed
    #[derive(Clone, Default)]
    pub struct Recorder {
        pub hits: Arc<Mutex<Vec<(usize, i32)>>>,
    }

    impl Recorder {
        pub fn hits(&self) -> Vec<(usize, i32)> {
            self.hits.lock().unwrap().clone()
        }
    }

    impl Demodulator for Recorder {
        fn demodulate(&mut self, port: &PortControlBlock, magnitude: i32) {
            self.hits.lock().unwrap().push((port.index(), magnitude));
        }
    }

    /// Port table with no GPIO lines, one port per listed channel
    pub fn bare_profile(channels: &[u8], routing: RoutingPolicy) -> HardwareProfile {
        HardwareProfile {
            name: "bare".to_string(),
            ports: channels
                .iter()
                .map(|&adc_channel| PortProfile {
                    adc_channel,
                    cdt_led: None,
                    ptt_pin: None,
                    status_led: None,
                    channel_access: Default::default(),
                })
                .collect(),
            routing,
            disabled_pins: vec![],
        }
    }

    pub fn init(profile: &HardwareProfile) -> (Arc<TncSystem>, Vec<TxReceiver>) {
        let (system, receivers) =
            TncSystem::init(profile, &TncSettings::default(), Arc::new(SimulatedGpio::new())).unwrap();
        (Arc::new(system), receivers)
    }

    pub fn router(system: &Arc<TncSystem>, recorder: &Recorder, samples: &[u16]) -> SampleRouter {
        let raw: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        SampleRouter::new(
            system.clone(),
            Box::new(recorder.clone()),
            Box::new(ReaderSampleSource::new(Cursor::new(raw))),
            64,
        )
    }

    /// Concatenate queue items into one byte stream
    pub fn stream(items: &[bytes::Bytes]) -> Vec<u8> {
        items.iter().flat_map(|item| item.iter().copied()).collect()
    }
}

use helpers::*;

// ============================================================================
// Sample Routing
// ============================================================================

#[test]
fn test_eight_port_round_robin_burst() {
    let (system, _rx) = init(&bare_profile(&[0, 1, 2, 3, 4, 5, 6, 7], RoutingPolicy::ChannelTag));
    let recorder = Recorder::default();

    let mut samples = Vec::new();
    for round in 0..40u16 {
        for channel in 0..8u16 {
            samples.push((channel << 12) | (round * 8 + channel));
        }
    }

    let mut router = router(&system, &recorder, &samples);
    let mut routed = 0;
    while routed < samples.len() {
        routed += router.poll();
    }

    let hits = recorder.hits();
    assert_eq!(hits.len(), 320);

    for port in 0..8usize {
        let seen: Vec<i32> = hits.iter().filter(|(p, _)| *p == port).map(|&(_, m)| m).collect();
        let expected: Vec<i32> = (0..40).map(|round| round * 8 + port as i32).collect();
        assert_eq!(seen, expected, "port {}", port);
    }
    assert_eq!(router.stats().dropped, 0);
}

#[test]
fn test_unrouted_channels_are_dropped() {
    let profile = HardwareVariant::Fx25TncR3.profile();
    let (system, _rx) = init(&profile);
    let recorder = Recorder::default();

    // Channels 1 and 2 are unused on this board; 8..15 are outside the table
    let samples = [0x1001, 0x2002, 0x0003, 0x8004, 0xF005, 0x7006];
    let mut router = router(&system, &recorder, &samples);
    router.poll();

    assert_eq!(recorder.hits(), vec![(0, 3), (3, 6)]);
    assert_eq!(router.stats().dropped, 4);
}

#[test]
fn test_single_port_codec_routing() {
    let profile = HardwareVariant::M5StickCAudio.profile();
    let (system, _rx) = init(&profile);
    let recorder = Recorder::default();

    let samples = [0x0000, 0x0001, 0xFFFF, 0x8000, 0x7FFF];
    let mut router = router(&system, &recorder, &samples);
    assert_eq!(router.poll(), 5);

    assert_eq!(
        recorder.hits(),
        vec![(0, 32768), (0, 32769), (0, 32767), (0, 0), (0, 65535)]
    );
}

#[test]
fn test_routing_policies_are_independent() {
    let words = [0x0123, 0x9123];

    let tagged = Recorder::default();
    let (system, _rx) = init(&bare_profile(&[0], RoutingPolicy::ChannelTag));
    router(&system, &tagged, &words).poll();
    assert_eq!(tagged.hits(), vec![(0, 0x123)]);

    let single = Recorder::default();
    let (system, _rx) = init(&bare_profile(&[0], RoutingPolicy::SinglePort { port: 0, offset: 0 }));
    router(&system, &single, &words).poll();
    assert_eq!(single.hits(), vec![(0, 0x0123), (0, 0x9123u16 as i16 as i32)]);
}

// ============================================================================
// Bring-up and Host Commands
// ============================================================================

#[test]
fn test_generic_board_bring_up() {
    let gpio = Arc::new(SimulatedGpio::new());
    let profile = HardwareProfile::builtin("generic").unwrap();
    let (system, receivers) = TncSystem::init(&profile, &TncSettings::default(), gpio.clone()).unwrap();

    assert_eq!(system.ports().len(), 6);
    assert_eq!(receivers.len(), 6);

    // Shared active-high CDT LED, off
    assert_eq!(gpio.mode(2), Some(PinMode::PushPull));
    assert_eq!(gpio.level(2), Some(false));

    for pin in [23, 22, 21, 19, 18, 5] {
        assert_eq!(gpio.level(pin), Some(false), "PTT GPIO {} should idle low", pin);
    }

    for (index, port) in system.ports().iter().enumerate() {
        assert_eq!(port.kiss_type(), (index as u8) << 4);
        assert_eq!(port.channel_access(), ChannelAccess::default());
    }
}

#[test]
fn test_config_to_running_system() {
    let config = Config::from_toml(
        r#"
[hardware]
variant = "m5atom"

[kiss]
persistence_p = 127

[transmit]
word_bits = 8
queue_capacity = 16
"#,
    )
    .unwrap();

    let profile = config.hardware.resolve().unwrap();
    let (system, receivers) =
        TncSystem::init(&profile, &config.tnc_settings(), Arc::new(SimulatedGpio::new())).unwrap();

    assert_eq!(system.ports()[1].channel_access().persistence_p, 127);
    assert_eq!(system.ports()[1].tx_queue().capacity(), 16);

    system.handle_kiss(0x10, &[0x00]).unwrap();
    let items = receivers[1].drain();
    assert_eq!(stream(&items), vec![0x7E, 0x00, 0x78, 0xF0, 0x7E]);
    assert_eq!(items.len(), 5);
    assert!(receivers[0].try_recv().is_none());
}

#[test]
fn test_kiss_overrides_are_per_port() {
    let (system, _rx) = init(&bare_profile(&[0, 1, 2], RoutingPolicy::ChannelTag));

    system.handle_kiss(0x21, &[100]).unwrap();
    system.handle_kiss(0x25, &[1]).unwrap();

    assert_eq!(system.ports()[2].channel_access().tx_delay, 100);
    assert!(system.ports()[2].channel_access().full_duplex);
    assert_eq!(system.ports()[0].channel_access(), ChannelAccess::default());
    assert_eq!(system.ports()[1].channel_access(), ChannelAccess::default());
}

// ============================================================================
// Transmit Loopback
// ============================================================================

#[test]
fn test_ax25_ui_frame_loopback_all_widths() {
    // APRS UI frame: APRS <- N0CALL, UI, no layer 3, payload ">test"
    let mut frame = Vec::new();
    for (call, ssid) in [("APRS  ", 0x60u8), ("N0CALL", 0x61u8)] {
        frame.extend(call.bytes().map(|c| c << 1));
        frame.push(ssid);
    }
    frame.extend([0x03, 0xF0]);
    frame.extend(b">test");

    for width in [WordWidth::Bits8, WordWidth::Bits16, WordWidth::Bits32] {
        let settings = TncSettings { word_width: width, ..TncSettings::default() };
        let (system, receivers) = TncSystem::init(
            &bare_profile(&[0], RoutingPolicy::ChannelTag),
            &settings,
            Arc::new(SimulatedGpio::new()),
        )
        .unwrap();
        let stats: FrameStats = system.ports()[0].send_frame(&frame).unwrap();

        let items = receivers[0].drain();
        assert_eq!(items.len(), stats.queue_items);
        assert_eq!(decode_frame(&stream(&items)).unwrap(), frame, "width {:?}", width);

        let direct = encode_frame_to_vec(&frame, width);
        assert_eq!(decode_frame(&stream(&direct)).unwrap(), frame, "width {:?}", width);
    }
}

#[test]
fn test_blocking_queue_with_slow_consumer() {
    let profile = bare_profile(&[0], RoutingPolicy::ChannelTag);
    let settings = TncSettings { queue_capacity: 2, word_width: WordWidth::Bits8, ..TncSettings::default() };
    let (system, mut receivers) =
        TncSystem::init(&profile, &settings, Arc::new(SimulatedGpio::new())).unwrap();
    let receiver = receivers.remove(0);

    let consumer = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        while let Some(word) = receiver.recv() {
            std::thread::sleep(std::time::Duration::from_micros(50));
            bytes.extend_from_slice(&word);
        }
        bytes
    });

    let payload: Vec<u8> = (0..=255u8).collect();
    system.ports()[0].send_frame(&payload).unwrap();
    drop(system);

    let bytes = consumer.join().unwrap();
    assert_eq!(decode_frame(&bytes).unwrap(), payload);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn word_width() -> impl Strategy<Value = WordWidth> {
        prop_oneof![
            Just(WordWidth::Bits8),
            Just(WordWidth::Bits16),
            Just(WordWidth::Bits32),
        ]
    }

    /// Bits after the start flag, LSB first
    fn body_bits(items: &[bytes::Bytes]) -> Vec<bool> {
        items[1..]
            .iter()
            .flat_map(|item| item.iter().copied())
            .flat_map(|byte| (0..8).map(move |i| (byte >> i) & 1 == 1))
            .collect()
    }

    /// Remove stuffed zeros from a stuffed bit sequence
    fn destuff(bits: &[bool]) -> Vec<bool> {
        let mut out = Vec::new();
        let mut run = 0;
        let mut skip = false;
        for &bit in bits {
            if skip {
                skip = false;
                run = 0;
                continue;
            }
            out.push(bit);
            run = if bit { run + 1 } else { 0 };
            if run == 5 {
                skip = true;
            }
        }
        out
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            payload in prop::collection::vec(any::<u8>(), 1..400),
            width in word_width()
        ) {
            let items = encode_frame_to_vec(&payload, width);
            prop_assert_eq!(decode_frame(&stream(&items)).unwrap(), payload);
        }

        #[test]
        fn destuffed_body_is_payload_and_fcs(
            payload in prop::collection::vec(any::<u8>(), 1..200),
            width in word_width()
        ) {
            let items = encode_frame_to_vec(&payload, width);
            prop_assert_eq!(&items[0][..], &[0x7E]);

            let bits = body_bits(&items);
            let body_len = (payload.len() + 2) * 8;
            let destuffed = destuff(&bits);

            let mut expected = payload.clone();
            expected.extend(fcs_bytes(crc16_x25(&payload)));
            let expected_bits: Vec<bool> = expected
                .iter()
                .flat_map(|&byte| (0..8).map(move |i| (byte >> i) & 1 == 1))
                .collect();

            prop_assert_eq!(&destuffed[..body_len], &expected_bits[..]);
        }

        #[test]
        fn no_six_ones_inside_stuffed_body(
            payload in prop::collection::vec(any::<u8>(), 1..200),
            width in word_width()
        ) {
            let items = encode_frame_to_vec(&payload, width);
            let bits = body_bits(&items);

            // Walk the stuffed bits until the whole payload and FCS are consumed
            let body_len = (payload.len() + 2) * 8;
            let mut consumed = 0;
            let mut run = 0;
            for &bit in &bits {
                if consumed == body_len {
                    break;
                }
                if run == 5 {
                    prop_assert!(!bit, "bit after five ones must be a stuffed zero");
                    run = 0;
                    continue;
                }
                consumed += 1;
                run = if bit { run + 1 } else { 0 };
            }
            prop_assert_eq!(consumed, body_len);
        }

        #[test]
        fn channel_tags_reach_exactly_one_port(
            samples in prop::collection::vec(any::<u16>(), 1..256)
        ) {
            let (system, _rx) = init(&bare_profile(&[0, 3, 6, 7, 4, 5], RoutingPolicy::ChannelTag));
            let recorder = Recorder::default();
            let mut router = SampleRouter::new(
                system.clone(),
                Box::new(recorder.clone()),
                Box::new(ReaderSampleSource::new(Cursor::new(Vec::new()))),
                16,
            );

            let routed = router.dispatch(&samples);
            let hits = recorder.hits();
            prop_assert_eq!(hits.len(), routed);

            let expected: Vec<(usize, i32)> = samples
                .iter()
                .filter_map(|&s| {
                    system.port_for_channel((s >> 12) as usize)
                        .map(|port| (port.index(), (s & 0x0FFF) as i32))
                })
                .collect();
            prop_assert_eq!(hits, expected);
        }
    }

    #[test]
    fn empty_payload_enqueues_nothing() {
        for width in [WordWidth::Bits8, WordWidth::Bits16, WordWidth::Bits32] {
            assert!(encode_frame_to_vec(&[], width).is_empty());
        }

        let (system, receivers) = init(&bare_profile(&[0], RoutingPolicy::ChannelTag));
        let stats = system.ports()[0].send_frame(&[]).unwrap();
        assert_eq!(stats, FrameStats::default());
        assert!(receivers[0].try_recv().is_none());
    }
}
