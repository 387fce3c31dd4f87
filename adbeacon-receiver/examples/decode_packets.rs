//! Decode a scan log into JSON lines
//!
//! Input lines are `<received_at_ms>,<manufacturer data hex>`, read from the
//! file named on the command line or from stdin. Records go to stdout, the
//! link summary to stderr.
//!
//! ```bash
//! cargo run -p adbeacon-receiver --example decode_packets -- scan.csv > records.jsonl
//! ```

use std::fs::File;
use std::io::{self, BufReader};

use adbeacon_receiver::{Receiver, ReceiverResult};

fn main() -> ReceiverResult<()> {
    let mut receiver = Receiver::new();
    let stdout = io::stdout().lock();

    let written = match std::env::args().nth(1) {
        Some(path) => receiver.process_stream(BufReader::new(File::open(path)?), stdout)?,
        None => receiver.process_stream(io::stdin().lock(), stdout)?,
    };

    let summary = receiver.summary();
    eprintln!("{written} records, {} malformed", summary.stats.malformed);
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
