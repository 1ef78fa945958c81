//! An emulated Roku media player
//!
//! Makes the host discoverable and controllable as if it were a Roku:
//! SSDP discovery (via [`roku_ssdp`]) plus an HTTP server speaking
//! enough of Roku's External Control Protocol (ECP) for control hubs
//! and phone apps to send it key presses. Decoded key events are passed
//! to whatever observers are registered with the [`Service`].
//!
//! Everything runs in one thread from a non-blocking poll loop: see
//! [`Service::poll_cycle`] and the `emulated-roku` binary.
//!
//! ```no_run
//! # use emulated_roku::*;
//! let mut service = Service::new(
//!     Config::default(),
//!     netif::HostNetwork,
//!     roku_ssdp::MioBinder,
//! );
//! service.subscribe(Box::new(|action: KeyAction, key: &str| {
//!     println!("{action} {key}");
//! }));
//! loop {
//!     let now = std::time::Instant::now();
//!     service.poll_cycle(now);
//!     std::thread::sleep(service.next_wakeup(now));
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod dispatcher;
pub mod ecp;
pub mod identity;
pub mod netif;
pub mod readiness;
mod service;

pub use config::Config;
pub use dispatcher::{Callback, Dispatcher, KeyAction, KeyEvent};
pub use identity::DeviceIdentity;
pub use readiness::{NetworkState, ReadinessGate};
pub use service::{
    Service, HTTP_TOKEN, IN_FLIGHT_POLL_INTERVAL, MAX_DATAGRAMS_PER_CYCLE,
    READINESS_POLL_INTERVAL, SSDP_TOKEN,
};
