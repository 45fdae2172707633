//! Stereo alignment helper. Checks that both webcam URLs load, then keeps
//! fetching the pair so the cameras can be adjusted against fresh images.

// Example:
// RUST_LOG=info cargo run --bin align -- http://cam-left/snap.jpg http://cam-right/snap.jpg
// RUST_LOG=info cargo run --bin align

use clap::Parser;
use sonarbox::{
    align::{AlignPoller, HttpSource},
    args::AlignArgs,
};

use log::{error, info};
use std::{process::exit, thread::sleep, time::Duration};

fn main() {
    env_logger::init();
    let args = AlignArgs::parse();

    let (left_url, right_url) = args.urls();
    let source = HttpSource::new(Duration::from_millis(args.timeout_ms));
    let mut poller = AlignPoller::new(source, left_url, right_url);

    if let Err((side, e)) = poller.check() {
        error!("Error loading {} image: {}", side, e);
        exit(1);
    }

    let interval = Duration::from_millis(args.interval_ms);
    let mut fetched = 0;
    while args.cycles.map_or(true, |n| fetched < n) {
        sleep(interval);
        let loaded = poller.poll();
        fetched += 1;
        info!("Pair {}: {} of 2 images loaded", fetched, loaded);
    }
}
