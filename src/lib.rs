//! Platform radio layer bridging a Thread stack to an IEEE 802.15.4
//! hard-MAC co-processor.
//!
//! The co-processor owns the MAC layer: framing on the air, CSMA-CA,
//! retries and AES-CCM* encryption all happen on the far side of a
//! serialized command channel. What remains on the host, and what this
//! crate implements, is the translation and coordination layer in between:
//!
//! * [`ieee802154::codec`] converts bit-exactly between the stack's
//!   PHY-level PDUs and the co-processor's MCPS-DATA parameter sets,
//! * [`intransit`] tracks submitted transmissions so asynchronous confirms
//!   find their originating submission,
//! * [`rendezvous`] and [`rx_slot`] serialize the transport's worker thread
//!   into the stack's single-threaded main loop,
//! * [`tables`] keeps the co-processor's device and key tables in step with
//!   the stack's neighbor set and key rotation,
//! * [`scan`] and [`device_cache`] drive scans and sleepy-child liveness,
//! * [`radio`] ties it all together behind the platform API.
//!
//! The bootstrap creates one [`radio::Radio`] from its two collaborators
//! (a [`mac::MacSap`] implementation talking to the co-processor and the
//! [`stack::Stack`]), registers the [`radio::MacEventHandler`] with the
//! transport's worker thread, and calls
//! [`radio::Radio::process_drivers`] once per iteration of its poll loop.

pub mod device_cache;
pub mod error;
pub mod ieee802154;
pub mod intransit;
pub mod mac;
pub mod radio;
pub mod rendezvous;
pub mod rx_slot;
pub mod scan;
pub mod stack;
pub mod tables;
