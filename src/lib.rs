//! sonarbox is a small bench toolkit built around a three channel
//! ultrasonic sonar controller that hangs off a serial line.
//!
//! The `sonar` binary opens the port, wakes the controller up, powers its
//! transducers on and then polls the three range channels forever, showing
//! the distances as a live bar graph, writing them to the log, or recording
//! them to a file. With `--dummy` it talks to a simulated controller
//! instead, see [dummy_sonar].
//!
//! The protocol is a plain half duplex ASCII exchange, documented on
//! [session]. Readings flow out of a [session::SonarSession] into a
//! [sink::ReadingSink].
//!
//! The other two binaries are unrelated bench helpers: `align` keeps
//! fetching a left/right webcam image pair while a stereo rig is lined up
//! (see [align]), and `primes` is a naive prime counting microbenchmark
//! (see [primes]).

#![warn(missing_docs)]
pub mod align;
pub mod args;
pub mod channel;
pub mod command;
pub mod config;
pub mod dummy_sonar;
pub mod gui;
pub mod primes;
pub mod reading;
pub mod reply_decoder;
pub mod session;
pub mod sink;
