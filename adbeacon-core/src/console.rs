//! Debug Console
//!
//! Line-oriented diagnostics over a serial channel. Test rigs parse these
//! replies, so their format is stable:
//!
//! ```text
//! > status
//! state=Uncertain score=0.412 uncertainty=0.480 volatility=0.254 interval_ms=500
//! > thresh 0.35 0.65
//! ok q_in=0.300 q_out=0.350 a_in=0.650 a_out=0.600
//! > dump
//! windows=42 transitions=3 classifier_errors=0 starvation=0 overruns=0 radio_errors=0 applied=3 deferred=1 superseded=0 seq=42 adv_events=310
//! > reboot
//! err unknown command
//! ```
//!
//! `thresh <low> <high>` moves the quiet exit and active entry thresholds
//! and keeps both hysteresis widths; `thresh <q_in> <q_out> <a_in> <a_out>`
//! sets all four. A rejected threshold set leaves the old one in place.

use core::fmt::Write;

use heapless::String;

use crate::errors::ConfigError;
use crate::node::NodeContext;
use crate::state::Thresholds;

/// Reply capacity (bytes)
pub const REPLY_CAPACITY: usize = 256;

/// One console reply line, without terminator
pub type ConsoleReply = String<REPLY_CAPACITY>;

/// Execute one command line against the node
pub fn execute(node: &mut NodeContext, line: &str) -> ConsoleReply {
    let mut reply = ConsoleReply::new();
    let mut words = line.split_whitespace();

    // Replies are bounded by REPLY_CAPACITY; overflow only truncates
    let _ = match words.next() {
        Some("status") => status(node, &mut reply),
        Some("dump") => dump(node, &mut reply),
        Some("thresh") => {
            let mut args = [0.0f32; 4];
            let mut count = 0;
            let mut parsed = true;
            for word in words {
                match (args.get_mut(count), word.parse::<f32>()) {
                    (Some(slot), Ok(value)) => {
                        *slot = value;
                        count += 1;
                    }
                    _ => {
                        parsed = false;
                        break;
                    }
                }
            }
            if !parsed || !(count == 2 || count == 4) {
                reply.push_str("err usage: thresh <low> <high> | thresh <q_in> <q_out> <a_in> <a_out>").map_err(|_| core::fmt::Error)
            } else {
                thresh(node, &args[..count], &mut reply)
            }
        }
        _ => reply.push_str("err unknown command").map_err(|_| core::fmt::Error),
    };

    reply
}

fn status(node: &NodeContext, out: &mut ConsoleReply) -> core::fmt::Result {
    let metrics = node.last_metrics();
    write!(
        out,
        "state={} score={:.3} uncertainty={:.3} volatility={:.3} interval_ms={}",
        node.state().name(),
        metrics.context_score,
        metrics.uncertainty,
        metrics.volatility,
        node.advertising().map_or(0, |config| config.interval_ms),
    )
}

fn dump(node: &NodeContext, out: &mut ConsoleReply) -> core::fmt::Result {
    let counters = node.counters();
    let stats = node.controller().stats();
    write!(
        out,
        "windows={} transitions={} classifier_errors={} starvation={} overruns={} radio_errors={} \
         applied={} deferred={} superseded={} seq={} adv_events={}",
        counters.windows,
        node.machine().transition_count(),
        counters.classifier_errors,
        counters.starvation_events,
        counters.deadline_overruns,
        counters.radio_errors,
        stats.applied,
        stats.deferred,
        stats.superseded,
        node.next_sequence(),
        counters.adv_events,
    )
}

fn thresh(node: &mut NodeContext, args: &[f32], out: &mut ConsoleReply) -> core::fmt::Result {
    let current = node.machine().thresholds();

    let requested = match *args {
        [low, high] => Thresholds {
            quiet_in: low - (current.quiet_out - current.quiet_in),
            quiet_out: low,
            active_in: high,
            active_out: high - (current.active_in - current.active_out),
        },
        [quiet_in, quiet_out, active_in, active_out] => Thresholds {
            quiet_in,
            quiet_out,
            active_in,
            active_out,
        },
        _ => return out.write_str("err usage: thresh <low> <high>"),
    };

    match node.set_thresholds(requested) {
        Ok(()) => {
            log_info!("console set thresholds {:?}", requested);
            write!(
                out,
                "ok q_in={:.3} q_out={:.3} a_in={:.3} a_out={:.3}",
                requested.quiet_in, requested.quiet_out, requested.active_in, requested.active_out,
            )
        }
        Err(ConfigError::InvalidThresholds { reason }) => write!(out, "err {}", reason),
        Err(err) => write!(out, "err {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeConfig;

    fn node() -> NodeContext {
        NodeContext::new(NodeConfig::default()).unwrap()
    }

    #[test]
    fn status_format() {
        let mut node = node();
        let reply = execute(&mut node, "status");
        assert_eq!(
            reply.as_str(),
            "state=Quiet score=0.000 uncertainty=0.000 volatility=0.000 interval_ms=0"
        );
    }

    #[test]
    fn thresh_two_args_keeps_widths() {
        let mut node = node();
        let reply = execute(&mut node, "thresh 0.4 0.8");
        assert_eq!(reply.as_str(), "ok q_in=0.350 q_out=0.400 a_in=0.800 a_out=0.750");

        let t = node.machine().thresholds();
        assert!((t.quiet_in - 0.35).abs() < 1e-6);
        assert!((t.active_out - 0.75).abs() < 1e-6);
        assert_eq!(node.config().theta_a_in, 0.8);
    }

    #[test]
    fn thresh_four_args() {
        let mut node = node();
        let reply = execute(&mut node, "thresh 0.1 0.2 0.9 0.8");
        assert_eq!(reply.as_str(), "ok q_in=0.100 q_out=0.200 a_in=0.900 a_out=0.800");
    }

    #[test]
    fn thresh_rejects_inverted_bands() {
        let mut node = node();
        let reply = execute(&mut node, "thresh 0.7 0.5");
        assert!(reply.starts_with("err "), "{}", reply);
        assert_eq!(node.machine().thresholds(), Thresholds::default());

        let reply = execute(&mut node, "thresh 0.5");
        assert!(reply.starts_with("err usage"));
        let reply = execute(&mut node, "thresh a b");
        assert!(reply.starts_with("err usage"));
    }

    #[test]
    fn dump_format() {
        let mut node = node();
        let reply = execute(&mut node, "dump");
        assert_eq!(
            reply.as_str(),
            "windows=0 transitions=0 classifier_errors=0 starvation=0 overruns=0 radio_errors=0 \
             applied=0 deferred=0 superseded=0 seq=0 adv_events=0"
        );
    }

    #[test]
    fn unknown_command() {
        let mut node = node();
        assert_eq!(execute(&mut node, "reboot").as_str(), "err unknown command");
        assert_eq!(execute(&mut node, "   ").as_str(), "err unknown command");
    }
}
