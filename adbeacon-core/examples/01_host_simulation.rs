//! Host Simulation Example
//!
//! Runs the full node loop on a desktop against simulated hardware: an IMU
//! that rests, walks, then fidgets ambiguously, a toy energy-based
//! classifier, and a radio that prints what it would put on air.
//!
//! ## What You'll Learn
//!
//! - Implementing the capability traits for your own board
//! - Driving `NodeContext::tick` from a sampling loop
//! - Feeding radio callbacks through the SPSC event channel
//! - Using the debug console
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_host_simulation
//! ```

use adbeacon_core::{
    classifier::ClassProbabilities,
    console,
    handoff::{PayloadSnapshot, RadioEvent, RadioEventChannel},
    time::MockTimeSource,
    AdvertisingConfig, BatteryGauge, Classifier, FeatureVector, MotionSample, MotionSource,
    NodeConfig, NodeContext, RadioAdvertiser, RadioError, SensorError, StatusPacket, TickOutcome,
    TimeSource,
};

/// Phases of the simulated day, in samples at 50 Hz
const PHASES: &[(&str, usize)] = &[("rest", 500), ("walk", 500), ("fidget", 500), ("rest", 750)];

/// IMU that follows the phase script
struct SimulatedImu {
    tick: usize,
    seed: u32,
}

impl SimulatedImu {
    fn phase(&self) -> &'static str {
        let mut start = 0;
        for &(name, len) in PHASES {
            if self.tick < start + len {
                return name;
            }
            start += len;
        }
        "rest"
    }

    fn noise(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        ((self.seed >> 16) & 0x7fff) as f32 / 32_767.0 - 0.5
    }
}

impl MotionSource for SimulatedImu {
    fn read(&mut self) -> nb::Result<MotionSample, SensorError> {
        let t = self.tick as f32 / 50.0;
        let amplitude = match self.phase() {
            "walk" => 0.6,
            "fidget" => 0.15 + 0.15 * (t * 0.7).sin(),
            _ => 0.01,
        };
        self.tick += 1;

        let bounce = (t * 2.0 * core::f32::consts::PI * 1.8).sin() * amplitude;
        Ok(MotionSample::new(
            [self.noise() * amplitude, self.noise() * amplitude, 1.0 + bounce],
            [self.noise() * 40.0 * amplitude, 0.0, 0.0],
        ))
    }
}

/// Maps accelerometer range to (still, walking, other)
struct EnergyClassifier;

impl Classifier for EnergyClassifier {
    fn num_classes(&self) -> usize {
        3
    }

    fn classify(&self, features: &FeatureVector) -> ClassProbabilities {
        let energy = (features.magnitude_range() / 1.2).clamp(0.0, 1.0);
        let still = (1.0 - 2.0 * energy).max(0.0);
        let walking = (2.0 * energy - 1.0).max(0.0);
        let other = 1.0 - still - walking;

        let mut probs = ClassProbabilities::new();
        for p in [still, walking, other] {
            let _ = probs.push(p);
        }
        probs
    }
}

/// Radio that logs reconfigurations
#[derive(Default)]
struct ConsoleRadio {
    payloads: u32,
}

impl RadioAdvertiser for ConsoleRadio {
    fn apply_config(&mut self, config: &AdvertisingConfig) -> Result<(), RadioError> {
        println!(
            "  radio: interval {} ms ({} units), {} dBm",
            config.interval_ms,
            config.interval_units(),
            config.tx_power.dbm()
        );
        Ok(())
    }

    fn set_payload(&mut self, _payload: &[u8]) -> Result<(), RadioError> {
        self.payloads += 1;
        Ok(())
    }
}

struct Battery;

impl BatteryGauge for Battery {
    fn percent(&self) -> u8 {
        93
    }
}

fn main() {
    println!("AdBeacon Host Simulation");
    println!("========================\n");

    let config = NodeConfig::default();
    let mut node = match NodeContext::new(config) {
        Ok(node) => node,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return;
        }
    };

    let mut imu = SimulatedImu { tick: 0, seed: 42 };
    let mut radio = ConsoleRadio::default();
    let clock = MockTimeSource::new(0);
    let snapshot = PayloadSnapshot::new();
    let mut channel: RadioEventChannel<32> = RadioEventChannel::new();
    let (mut radio_callback, mut radio_events) = channel.split();

    let total: usize = PHASES.iter().map(|(_, len)| len).sum();
    let mut phase = "";
    for _ in 0..total {
        if imu.phase() != phase {
            phase = imu.phase();
            println!("[{:>6} ms] phase: {}", clock.now(), phase);
        }

        match node.tick(&mut imu, &EnergyClassifier, &mut radio, &Battery, &clock) {
            TickOutcome::Window(report) => {
                snapshot.publish(&report.packet.encode());
                if let Some(t) = report.transition {
                    println!(
                        "[{:>6} ms] {} -> {} (score {:.3}, held {} ms)",
                        t.at,
                        t.from.name(),
                        t.to.name(),
                        t.score,
                        t.time_in_previous_ms
                    );
                }
            }
            TickOutcome::Degraded(err) => println!("[{:>6} ms] degraded: {err}", clock.now()),
            TickOutcome::Idle | TickOutcome::Sampled => {}
        }

        // The radio stack would raise this from its own context
        if let Some(config) = node.advertising() {
            if clock.now() % config.interval_ms as u64 == 0 {
                radio_callback.send(RadioEvent::AdvertisingSent);
            }
        }
        node.service_radio_events(&mut radio_events);

        clock.advance(20);
    }

    println!("\nConsole");
    println!("-------");
    for command in ["status", "dump", "thresh 0.35 0.65", "bogus"] {
        println!("> {command}");
        println!("{}", console::execute(&mut node, command));
    }

    if let Some(bytes) = snapshot.read() {
        println!("\nLast payload: {}", hex(&bytes));
        if let Ok(packet) = StatusPacket::decode(&bytes) {
            println!("Decoded:      {packet:?}");
        }
    }

    let counters = node.counters();
    println!("\nResidency (ms): {:?}", counters.residency_ms);
    println!(
        "Advertising events: {} reported, {} estimated; {} payload updates",
        counters.adv_events,
        node.estimated_adv_events(),
        radio.payloads
    );
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
