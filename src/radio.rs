//! Platform radio façade
//!
//! [`Radio`] is the surface the stack's main loop calls into; every method
//! runs on the main thread. Asynchronous co-processor events enter through
//! [`MacEventHandler`] on the transport's worker thread and are serialized
//! into the main loop by the rendezvous: the worker decodes and posts a job,
//! [`Radio::process_drivers`] drains one job per poll iteration and runs it
//! against the main-thread state. The stack therefore never observes its
//! callbacks racing its own loop.
//!
//! A single instance is created by the bootstrap and passed by borrow to all
//! platform operations; nothing in here lives at process scope.

use std::any::Any;
use std::fmt;
use std::process;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::device_cache::DeviceCache;
use crate::error::Error;
use crate::ieee802154::codec::{self, TxAction};
use crate::ieee802154::pib::{Pib, BEACON_PAYLOAD_SIZE};
use crate::ieee802154::{MAX_CHANNEL, MAX_PHY_PACKET_SIZE, MIN_CHANNEL};
use crate::intransit::InTransitTable;
use crate::mac::types::{
    BeaconNotifyIndication, DataConfirm, DataIndication, DeviceDescriptor, ScanConfirm,
    ScanRequest, ScanType, SecSpec,
};
use crate::mac::{HwAttr, MacSap, PibAttr, Status, LQI_MODE_ENERGY_DETECT};
use crate::rendezvous::{Rendezvous, Waker};
use crate::rx_slot::RxSlot;
use crate::scan::{
    self, ActiveScanCallback, EnergyScanCallback, EnergyScanResult, ScanContext, ScanState,
};
use crate::stack::Stack;
use crate::tables::{TableSync, DEFAULT_KEY_SOURCE};

/// Reference to any data selected by the transmitting caller
///
/// The same reference is passed back in the transmit-done callback, allowing
/// the caller to match completions with submissions.
pub type TxContext = &'static (dyn Any + Send + Sync);

const NO_CONTEXT: TxContext = &();

/// Capability bit: the hard-MAC times out missing acknowledgments itself
pub const CAPS_ACK_TIMEOUT: u8 = 1 << 0;

/// Power control attribute values for the low-power hook
const POWER_AWAKE: [u8; 5] = [0x00, 0, 0, 0, 0];
const POWER_DOWN: [u8; 5] = [0x0A, 0, 0, 0, 0];

/// Poll retries while the command channel reports a transport failure
const MAX_POLL_RETRIES: u8 = 10;

/// PHY-level PDU exchanged with the stack
///
/// The buffer holds the MAC frame exactly as a sniffer would capture it:
/// MHR, payload, then reserved space for the MIC and FCS which only ever
/// exist on the air.
#[derive(Clone, Copy)]
pub struct RadioPacket {
    /// Frame octets; only the first `length` bytes are meaningful
    pub psdu: [u8; MAX_PHY_PACKET_SIZE],
    /// Total frame length including the reserved footer
    pub length: u8,
    /// Channel the frame was received on or is to be sent on
    pub channel: u8,
    /// Link quality of the received frame
    pub lqi: u8,
    /// Power estimate in dBm
    pub power: i8,
    /// False queues the frame for indirect transmission to a sleepy child
    pub direct: bool,
    /// Caller reference routed to the transmit-done callback
    pub context: TxContext,
}

impl PartialEq for RadioPacket {
    fn eq(&self, other: &Self) -> bool {
        self.psdu() == other.psdu()
            && self.length == other.length
            && self.channel == other.channel
            && self.lqi == other.lqi
            && self.power == other.power
            && self.direct == other.direct
            && std::ptr::eq(self.context, other.context)
    }
}

impl RadioPacket {
    /// Create an empty packet
    pub fn new() -> Self {
        Self {
            psdu: [0; MAX_PHY_PACKET_SIZE],
            length: 0,
            channel: 0,
            lqi: 0,
            power: 0,
            direct: true,
            context: NO_CONTEXT,
        }
    }

    /// The meaningful part of the frame buffer
    pub fn psdu(&self) -> &[u8] {
        &self.psdu[..self.length as usize]
    }
}

impl Default for RadioPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RadioPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioPacket")
            .field("psdu", &self.psdu())
            .field("channel", &self.channel)
            .field("lqi", &self.lqi)
            .field("power", &self.power)
            .field("direct", &self.direct)
            .finish()
    }
}

/// The state of the radio FSM
///
/// Mutated on the main thread only; worker events reach it through posted
/// jobs, which also run on the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disabled,
    Sleep,
    Receive,
    Transmit,
}

/// Main-thread state shared with the posted jobs
pub(crate) struct Core {
    state: State,
    pib: Pib,
    transmit_packet: RadioPacket,
    scan: ScanState,
    tables: TableSync,
    device_cache: DeviceCache,
}

/// Configuration consumed by [`Radio::new`]
pub struct RadioConfig {
    /// EUI-64 persisted by the bootstrap, if one is stored
    ///
    /// When absent an address is generated once from `random` and stays
    /// stable for the life of the process; persisting it across boots is the
    /// bootstrap's duty.
    pub eui64: Option<[u8; 8]>,
    /// Platform random source
    pub random: fn() -> u16,
    /// Hook waking the main loop's poll, typically a self-pipe write
    pub wake: Option<Waker>,
    /// Drive the co-processor's power modes from enable and disable
    pub use_low_power_modes: bool,
}

/// Platform radio bridging the stack to the hard-MAC co-processor
pub struct Radio {
    core: Core,
    mac: Arc<dyn MacSap>,
    stack: Arc<dyn Stack>,
    intransit: Arc<InTransitTable>,
    rx_slot: Arc<RxSlot>,
    jobs: Arc<Rendezvous<Core>>,
    use_low_power_modes: bool,
}

impl Radio {
    /// Initialize the radio and bring the co-processor to its defaults
    ///
    /// Resets the MAC and applies the platform defaults: security on, seven
    /// frame retries, five CSMA backoffs, maximum backoff exponent four, the
    /// Thread default key source, energy-detect LQI and a ninety second
    /// indirect transaction timeout.
    pub fn new(
        mac: Arc<dyn MacSap>,
        stack: Arc<dyn Stack>,
        config: RadioConfig,
    ) -> Result<Self, Error> {
        let jobs = Arc::new(Rendezvous::new());
        if let Some(wake) = config.wake {
            jobs.set_waker(wake);
        }

        let mut pib = Pib::new();
        pib.set_eui64(
            config
                .eui64
                .unwrap_or_else(|| generate_eui64(config.random)),
        );

        let radio = Self {
            core: Core {
                state: State::Disabled,
                pib,
                transmit_packet: RadioPacket::new(),
                scan: ScanState::Idle,
                tables: TableSync::new(),
                device_cache: DeviceCache::new(),
            },
            mac,
            stack,
            intransit: Arc::new(InTransitTable::new()),
            rx_slot: Arc::new(RxSlot::new()),
            jobs,
            use_low_power_modes: config.use_low_power_modes,
        };

        radio.apply_defaults()?;

        Ok(radio)
    }

    fn apply_defaults(&self) -> Result<(), Error> {
        mac_result(self.mac.mlme_reset(true))?;
        mac_result(self.mac.mlme_set(PibAttr::SecurityEnabled, 0, &[1]))?;
        // TODO: lower to 3 per the Thread spec once the stack retries on
        // its own
        mac_result(self.mac.mlme_set(PibAttr::MaxFrameRetries, 0, &[7]))?;
        mac_result(self.mac.mlme_set(PibAttr::MaxCsmaBackoffs, 0, &[5]))?;
        mac_result(self.mac.mlme_set(PibAttr::MaxBe, 0, &[4]))?;
        mac_result(
            self.mac
                .mlme_set(PibAttr::DefaultKeySource, 0, &DEFAULT_KEY_SOURCE),
        )?;
        mac_result(self.mac.hwme_set(HwAttr::LqiMode, &[LQI_MODE_ENERGY_DETECT]))?;
        // Indirect transactions wait ~90 seconds before expiring
        mac_result(self.mac.mlme_set(
            PibAttr::TransactionPersistenceTime,
            0,
            &0x16E3u16.to_le_bytes(),
        ))
    }

    /// Handle for the transport's worker thread to feed events into
    pub fn event_handler(&self) -> MacEventHandler {
        MacEventHandler {
            mac: Arc::clone(&self.mac),
            stack: Arc::clone(&self.stack),
            intransit: Arc::clone(&self.intransit),
            rx_slot: Arc::clone(&self.rx_slot),
            jobs: Arc::clone(&self.jobs),
        }
    }

    /// Run at most one worker-posted job
    ///
    /// Called by the main loop once per poll iteration. Returns whether a
    /// job ran.
    pub fn process_drivers(&mut self) -> bool {
        self.jobs.run_one(&mut self.core)
    }

    /// Transition the radio out of Disabled
    pub fn enable(&mut self) -> Result<(), Error> {
        match self.core.state {
            State::Disabled | State::Sleep => {
                self.core.state = State::Sleep;
                if self.use_low_power_modes {
                    mac_result(self.mac.hwme_set(HwAttr::PowerCon, &POWER_AWAKE))?;
                }
                Ok(())
            }
            _ => Err(Error::Busy),
        }
    }

    /// Transition the radio into Disabled
    pub fn disable(&mut self) -> Result<(), Error> {
        match self.core.state {
            State::Disabled | State::Sleep => {
                self.core.state = State::Disabled;
                if self.use_low_power_modes {
                    mac_result(self.mac.hwme_set(HwAttr::PowerCon, &POWER_DOWN))?;
                }
                Ok(())
            }
            _ => Err(Error::Busy),
        }
    }

    /// No-op: rx-on-when-idle already drives the hard-MAC's power state
    pub fn sleep(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Keep the receiver enabled while no operation is in progress
    pub fn set_rx_on_when_idle(&mut self, enabled: bool) -> Result<(), Error> {
        mac_result(
            self.mac
                .mlme_set(PibAttr::RxOnWhenIdle, 0, &[enabled as u8]),
        )
    }

    /// Enable the receiver on the given channel
    pub fn receive(&mut self, channel: u8) -> Result<(), Error> {
        if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&channel) {
            return Err(Error::Abort);
        }

        match self.core.state {
            State::Sleep | State::Receive => {
                self.core.state = State::Receive;
                self.set_channel(channel);
                Ok(())
            }
            _ => Err(Error::Busy),
        }
    }

    /// Buffer the stack fills before calling [`Radio::transmit`]
    pub fn transmit_buffer(&mut self) -> &mut RadioPacket {
        &mut self.core.transmit_packet
    }

    /// Submit the transmit buffer to the co-processor
    ///
    /// Data frames are queued as MCPS-DATA.requests and complete through the
    /// asynchronous confirm; a data-request MAC command is executed as a
    /// synchronous MLME-POLL and completes before this method returns. The
    /// co-processor encrypts and assigns the sequence number itself.
    pub fn transmit(&mut self, context: TxContext) -> Result<(), Error> {
        match self.core.state {
            State::Receive | State::Transmit => {}
            _ => return Err(Error::Busy),
        }

        self.core.transmit_packet.context = context;
        let action = codec::encode(&self.core.transmit_packet)?;
        let channel = self.core.transmit_packet.channel;
        self.set_channel(channel);

        match action {
            TxAction::Data(mut request) => {
                let handle = self
                    .intransit
                    .allocate(&self.core.transmit_packet)
                    .map_err(|_| Error::Busy)?;
                request.msdu_handle = handle;
                debug_assert!(self.intransit.peek(handle).is_some());

                self.core.state = State::Transmit;
                let status = self.mac.mcps_data_request(&request);
                if !status.is_success() {
                    warn!("MCPS-DATA.request rejected: {:?}", status);
                    let _ = self.intransit.take(handle);
                    self.core.state = State::Receive;
                    return Err(Error::Failed);
                }

                Ok(())
            }
            TxAction::Poll { dst, security } => {
                self.core.state = State::Transmit;

                let mut status = self.mac.mlme_poll(&dst, [0, 0], &security);
                let mut attempt = 0;
                while status == Status::SystemFailure && attempt < MAX_POLL_RETRIES {
                    attempt += 1;
                    warn!("poll failed, retry #{}", attempt);
                    status = self.mac.mlme_poll(&dst, [0, 0], &security);
                }

                self.core.state = State::Receive;
                match status {
                    Status::Success => self.stack.transmit_done(context, true, Ok(())),
                    Status::NoData => self.stack.transmit_done(context, false, Ok(())),
                    other => {
                        warn!("MLME-POLL failed: {:?}", other);
                        self.stack.transmit_done(context, false, Err(Error::NoAck));
                    }
                }

                Ok(())
            }
        }
    }

    /// Set the PAN id on the co-processor
    pub fn set_pan_id(&mut self, pan_id: u16) -> Result<(), Error> {
        mac_result(self.mac.mlme_set(PibAttr::PanId, 0, &pan_id.to_le_bytes()))
    }

    /// Set the short address on the co-processor
    pub fn set_short_address(&mut self, address: u16) -> Result<(), Error> {
        mac_result(
            self.mac
                .mlme_set(PibAttr::ShortAddress, 0, &address.to_le_bytes()),
        )
    }

    /// Set the extended address on the co-processor
    pub fn set_extended_address(&mut self, address: &[u8; 8]) -> Result<(), Error> {
        mac_result(self.mac.mlme_set(PibAttr::IeeeAddress, 0, address))
    }

    /// Place the network name into the advertised beacon payload
    pub fn set_network_name(&mut self, name: &[u8]) -> Result<(), Error> {
        self.core.pib.set_network_name(name);
        self.write_beacon_payload()
    }

    /// Place the extended PAN id into the advertised beacon payload
    pub fn set_extended_pan_id(&mut self, ext_pan_id: &[u8; 8]) -> Result<(), Error> {
        self.core.pib.set_extended_pan_id(ext_pan_id);
        self.write_beacon_payload()
    }

    fn write_beacon_payload(&self) -> Result<(), Error> {
        mac_result(
            self.mac
                .mlme_set(PibAttr::BeaconPayload, 0, self.core.pib.beacon_payload()),
        )?;
        mac_result(self.mac.mlme_set(
            PibAttr::BeaconPayloadLength,
            0,
            &[BEACON_PAYLOAD_SIZE as u8],
        ))
    }

    /// The device's EUI-64
    pub fn ieee_eui64(&self) -> [u8; 8] {
        *self.core.pib.eui64()
    }

    /// Promiscuous mode, read from the co-processor on the first query
    pub fn promiscuous(&mut self) -> Result<bool, Error> {
        if let Some(enabled) = self.core.pib.promiscuous() {
            return Ok(enabled);
        }

        let value = mac_value(self.mac.mlme_get(PibAttr::PromiscuousMode, 0))?;
        let enabled = value.first().is_some_and(|byte| *byte != 0);
        self.core.pib.set_promiscuous(enabled);
        Ok(enabled)
    }

    /// Write promiscuous mode through to the co-processor
    pub fn set_promiscuous(&mut self, enabled: bool) -> Result<(), Error> {
        mac_result(
            self.mac
                .mlme_set(PibAttr::PromiscuousMode, 0, &[enabled as u8]),
        )?;
        self.core.pib.set_promiscuous(enabled);
        Ok(())
    }

    /// Noise floor estimate from the last observed frame, in dBm
    pub fn noise_floor(&self) -> i8 {
        self.core.pib.noise_floor()
    }

    /// Capabilities of this radio
    pub fn caps(&self) -> u8 {
        CAPS_ACK_TIMEOUT
    }

    /// Start an active scan streaming beacons to `callback`
    ///
    /// A channel mask of 0 scans channels 11..=26. Results are delivered
    /// under the rendezvous; a final `None` marks completion.
    pub fn active_scan(
        &mut self,
        channel_mask: u32,
        duration_ms: u16,
        callback: ActiveScanCallback,
        context: ScanContext,
    ) -> Result<(), Error> {
        if self.core.scan.in_progress() {
            return Err(Error::Busy);
        }

        let duration = scan::duration_to_exponent(duration_ms, ScanType::Active);
        debug!("active scan: {} ms, duration exponent {}", duration_ms, duration);

        let request = ScanRequest {
            scan_type: ScanType::Active,
            scan_channels: scan::effective_channel_mask(channel_mask),
            scan_duration: duration,
            security: SecSpec::default(),
        };
        if !self.mac.mlme_scan(&request).is_success() {
            return Err(Error::Busy);
        }

        self.core.scan = ScanState::Active { callback, context };
        Ok(())
    }

    /// Start an energy scan streaming per-channel maxima to `callback`
    pub fn energy_scan(
        &mut self,
        channel_mask: u32,
        duration_ms: u16,
        callback: EnergyScanCallback,
        context: ScanContext,
    ) -> Result<(), Error> {
        if self.core.scan.in_progress() {
            return Err(Error::Busy);
        }

        let duration = scan::duration_to_exponent(duration_ms, ScanType::Energy);
        debug!("energy scan: {} ms, duration exponent {}", duration_ms, duration);

        let mask = scan::effective_channel_mask(channel_mask);
        let request = ScanRequest {
            scan_type: ScanType::Energy,
            scan_channels: mask,
            scan_duration: duration,
            security: SecSpec::default(),
        };
        if !self.mac.mlme_scan(&request).is_success() {
            return Err(Error::Busy);
        }

        self.core.scan = ScanState::Energy {
            callback,
            context,
            mask,
        };
        Ok(())
    }

    /// True while an active scan is in flight
    pub fn is_active_scan_in_progress(&self) -> bool {
        matches!(self.core.scan, ScanState::Active { .. })
    }

    /// True while an energy scan is in flight
    pub fn is_energy_scan_in_progress(&self) -> bool {
        matches!(self.core.scan, ScanState::Energy { .. })
    }

    /// React to stack state changes by resynchronizing the co-processor
    pub fn state_changed(&mut self, flags: u32) {
        let channel = self.core.pib.channel();
        self.core
            .tables
            .state_changed(flags, self.mac.as_ref(), self.stack.as_ref(), channel);
    }

    /// Report whether a neighbor advanced its frame counter since the last
    /// query
    ///
    /// Re-reads the co-processor's device table to refresh the activity
    /// cache. `ext_address` is in network byte order.
    pub fn is_device_active(&mut self, ext_address: [u8; 8]) -> bool {
        let mut descriptors = Vec::new();
        for index in 0..self.core.tables.device_count() {
            match self.mac.mlme_get(PibAttr::DeviceTable, index) {
                Ok(bytes) => match DeviceDescriptor::from_bytes(&bytes) {
                    Ok(descriptor) => descriptors.push(descriptor),
                    Err(_) => warn!("malformed device table entry {}", index),
                },
                Err(status) => warn!("device table read {} failed: {:?}", index, status),
            }
        }

        self.core.device_cache.refresh(descriptors.iter());
        self.core.device_cache.is_active(ext_address)
    }

    /// Reset the MAC on the way out; pending handles are forgotten
    pub fn stop(&mut self) {
        info!("resetting and stopping radio");
        let status = self.mac.mlme_reset(true);
        if !status.is_success() {
            warn!("MLME-RESET failed: {:?}", status);
        }
    }

    fn set_channel(&mut self, channel: u8) {
        if self.core.pib.channel() == channel {
            return;
        }

        let status = self
            .mac
            .mlme_set(PibAttr::PhyCurrentChannel, 0, &[channel]);
        if !status.is_success() {
            warn!("selecting channel {} failed: {:?}", channel, status);
        }
        self.core.pib.set_channel(channel);
    }
}

/// Worker-side entry points for the co-processor transport
///
/// Cloneable so the transport can hand it to its callback registrations. All
/// methods may block: an indication blocks while the receive slot is full
/// and every event blocks while a previous job is still undrained, which is
/// the backpressure the serialized transport expects.
#[derive(Clone)]
pub struct MacEventHandler {
    mac: Arc<dyn MacSap>,
    stack: Arc<dyn Stack>,
    intransit: Arc<InTransitTable>,
    rx_slot: Arc<RxSlot>,
    jobs: Arc<Rendezvous<Core>>,
}

impl MacEventHandler {
    /// MCPS-DATA.indication: decode, stage in the receive slot, hand off
    pub fn mcps_data_indication(&self, indication: &DataIndication) {
        if !self.stack.is_up() {
            return;
        }

        let packet = match codec::decode(indication) {
            Ok(packet) => packet,
            // Malformed indications are logged by the codec and must never
            // poison the receive slot
            Err(_) => return,
        };

        self.rx_slot.put(packet);

        let rx_slot = Arc::clone(&self.rx_slot);
        let stack = Arc::clone(&self.stack);
        self.jobs.post(Box::new(move |core| {
            rx_slot.consume(|packet| {
                packet.channel = core.pib.channel();
                core.pib.set_noise_floor(packet.power);
                core.state = State::Receive;
                stack.receive_done(packet, Ok(()));
            });
        }));
    }

    /// MCPS-DATA.confirm: route the outcome back to the submitter
    pub fn mcps_data_confirm(&self, confirm: &DataConfirm) {
        if !self.stack.is_up() {
            return;
        }

        let confirm = *confirm;
        let intransit = Arc::clone(&self.intransit);
        let stack = Arc::clone(&self.stack);
        self.jobs.post(Box::new(move |core| {
            let packet = match intransit.take(confirm.msdu_handle) {
                Ok(packet) => packet,
                Err(_) => {
                    warn!("confirm for unknown handle {}", confirm.msdu_handle);
                    return;
                }
            };

            let result = match confirm.status {
                Status::Success => Ok(()),
                Status::ChannelAccessFailure => Err(Error::ChannelAccessFailure),
                // Expired and overflowed transactions provoke a retry at a
                // higher layer, the same as a missing acknowledgment
                Status::NoAck | Status::TransactionOverflow | Status::TransactionExpired => {
                    Err(Error::NoAck)
                }
                _ => Err(Error::Abort),
            };
            if result.is_err() {
                warn!("MCPS-DATA.confirm error: {:#04x}", confirm.status.raw());
            }

            core.state = State::Receive;
            stack.transmit_done(packet.context, false, result);
        }));
    }

    /// MLME-BEACON-NOTIFY.indication: stream one active scan result
    pub fn mlme_beacon_notify_indication(&self, indication: &BeaconNotifyIndication) {
        if !self.stack.is_up() {
            return;
        }

        let Some(result) = scan::parse_beacon(indication) else {
            return;
        };

        self.jobs.post(Box::new(move |core| {
            if let ScanState::Active { callback, context } = core.scan {
                core.pib.set_noise_floor(result.rssi);
                callback(Some(&result), context);
            }
        }));
    }

    /// MLME-SCAN.confirm: finish the scan and restore the channel
    pub fn mlme_scan_confirm(&self, confirm: &ScanConfirm) {
        if !self.stack.is_up() {
            return;
        }
        if confirm.status == Status::ScanInProgress {
            return;
        }

        let confirm = confirm.clone();
        let mac = Arc::clone(&self.mac);
        self.jobs.post(Box::new(move |core| {
            match std::mem::replace(&mut core.scan, ScanState::Idle) {
                ScanState::Idle => {}
                ScanState::Active { callback, context } => {
                    callback(None, context);
                    restore_channel(mac.as_ref(), core.pib.channel());
                }
                ScanState::Energy {
                    callback,
                    context,
                    mut mask,
                } => {
                    for sample in &confirm.result_list {
                        match scan::take_lowest_channel(&mut mask) {
                            Some(channel) => {
                                let result = EnergyScanResult {
                                    channel,
                                    max_rssi: *sample as i8,
                                };
                                callback(Some(&result), context);
                            }
                            None => {
                                warn!("energy sample without a channel left in the mask");
                                break;
                            }
                        }
                    }
                    callback(None, context);
                    restore_channel(mac.as_ref(), core.pib.channel());
                }
            }
        }));
    }

    /// Unhandled co-processor frames, surfaced for debugging
    pub fn generic_dispatch(&self, frame: &[u8]) {
        debug!("unhandled co-processor frame: {:02x?}", frame);
    }

    /// Fatal transport failure; there is no recovery
    pub fn driver_failed(&self, error_code: i32) -> ! {
        error!("driver failed with error {}", error_code);
        process::abort();
    }
}

fn mac_result(status: Status) -> Result<(), Error> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Failed)
    }
}

fn mac_value<T>(result: Result<T, Status>) -> Result<T, Error> {
    result.map_err(|status| {
        warn!("MLME-GET failed: {:?}", status);
        Error::Failed
    })
}

fn restore_channel(mac: &dyn MacSap, channel: u8) {
    if channel == 0 {
        // No channel was ever selected
        return;
    }

    let status = mac.mlme_set(PibAttr::PhyCurrentChannel, 0, &[channel]);
    if !status.is_success() {
        warn!("restoring channel {} failed: {:?}", channel, status);
    }
}

fn generate_eui64(random: fn() -> u16) -> [u8; 8] {
    let mut eui64 = [0; 8];
    for chunk in eui64.chunks_exact_mut(2) {
        chunk.copy_from_slice(&random().to_le_bytes());
    }
    eui64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::types::{AddrMode, FullAddr, PanDescriptor};
    use crate::mac::MockMacSap;
    use crate::stack::{MockStack, CHANGED_ROLE};
    use crate::stack::Role;
    use mockall::predicate::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn mac_with_defaults() -> MockMacSap {
        let mut mac = MockMacSap::new();
        mac.expect_mlme_reset().returning(|_| Status::Success);
        mac.expect_mlme_set().returning(|_, _, _| Status::Success);
        mac.expect_hwme_set().returning(|_, _| Status::Success);
        mac
    }

    fn stack_up() -> MockStack {
        let mut stack = MockStack::new();
        stack.expect_is_up().return_const(true);
        stack
    }

    fn config() -> RadioConfig {
        RadioConfig {
            eui64: Some([1, 2, 3, 4, 5, 6, 7, 8]),
            random: || 0x1234,
            wake: None,
            use_low_power_modes: false,
        }
    }

    fn radio_with(mac: MockMacSap, stack: MockStack) -> Radio {
        Radio::new(Arc::new(mac), Arc::new(stack), config()).unwrap()
    }

    fn receiving_radio(mac: MockMacSap, stack: MockStack) -> Radio {
        let mut radio = radio_with(mac, stack);
        radio.enable().unwrap();
        radio.receive(11).unwrap();
        radio
    }

    /// PDU of end-to-end scenario "short-address data TX with ack"
    fn short_data_psdu() -> Vec<u8> {
        vec![
            0x61, 0x88, // FCF 0x8861
            0x07, // SeqNum
            0xCE, 0xFA, // Dst Pan Id 0xFACE
            0x01, 0x00, // Dst Addr
            0x02, 0x00, // Src Addr
            0xAA, 0xBB, 0xCC, // Payload
            0x00, 0x00, // MFR space
        ]
    }

    fn load_transmit_buffer(radio: &mut Radio, psdu: &[u8]) {
        let packet = radio.transmit_buffer();
        packet.psdu[..psdu.len()].copy_from_slice(psdu);
        packet.length = psdu.len() as u8;
        packet.channel = 11;
        packet.direct = true;
    }

    fn confirm(handle: u8, status: Status) -> DataConfirm {
        DataConfirm {
            msdu_handle: handle,
            timestamp: 0,
            status,
        }
    }

    fn short_indication() -> DataIndication {
        DataIndication {
            src: FullAddr::short([0xEF, 0xBE], [0x02, 0x00]),
            dst: FullAddr::short([0xEF, 0xBE], [0x01, 0x00]),
            msdu: vec![0x11, 0x22],
            mpdu_link_quality: 0xC8,
            dsn: 0x5E,
            timestamp: 0,
            security: SecSpec::default(),
        }
    }

    #[test]
    fn test_state_gating_of_enable_disable_and_receive() {
        let mut radio = radio_with(mac_with_defaults(), MockStack::new());

        // Disabled: receive and transmit are rejected
        assert_eq!(radio.receive(11), Err(Error::Busy));
        assert_eq!(radio.transmit(NO_CONTEXT), Err(Error::Busy));

        assert_eq!(radio.enable(), Ok(()));
        assert_eq!(radio.enable(), Ok(())); // Sleep -> Sleep
        assert_eq!(radio.receive(11), Ok(()));
        assert_eq!(radio.receive(12), Ok(())); // channel change stays legal

        // Receive is not idle: the radio cannot sleep or disable
        assert_eq!(radio.disable(), Err(Error::Busy));
        assert_eq!(radio.enable(), Err(Error::Busy));
    }

    #[test]
    fn test_receive_validates_the_channel() {
        let mut radio = radio_with(mac_with_defaults(), MockStack::new());
        radio.enable().unwrap();
        assert_eq!(radio.receive(10), Err(Error::Abort));
        assert_eq!(radio.receive(27), Err(Error::Abort));
    }

    #[test]
    fn test_transmit_submits_data_request_and_routes_confirm() {
        static CONTEXT: u32 = 7;
        let mut mac = mac_with_defaults();
        mac.expect_mcps_data_request()
            .withf(|request| {
                request.src_addr_mode == AddrMode::Short
                    && request.dst == FullAddr::short([0xCE, 0xFA], [0x01, 0x00])
                    && request.tx_options == 0x01
                    && request.msdu == [0xAA, 0xBB, 0xCC]
                    && request.msdu_handle != 0
            })
            .times(1)
            .returning(|_| Status::Success);

        let mut stack = stack_up();
        stack
            .expect_transmit_done()
            .withf(|context, ack, result| {
                context.downcast_ref::<u32>() == Some(&7) && !*ack && result.is_ok()
            })
            .times(1)
            .return_const(());

        let mut radio = receiving_radio(mac, stack);
        load_transmit_buffer(&mut radio, &short_data_psdu());
        assert_eq!(radio.transmit(&CONTEXT), Ok(()));

        // The confirm completes the transmission through the rendezvous
        let handler = radio.event_handler();
        handler.mcps_data_confirm(&confirm(1, Status::Success));
        assert!(radio.process_drivers());

        // The record was removed and the radio is receiving again
        assert!(radio.intransit.is_empty());
        assert_eq!(radio.receive(11), Ok(()));
    }

    #[test]
    fn test_confirm_statuses_map_to_platform_errors() {
        for (status, expected) in [
            (Status::ChannelAccessFailure, Error::ChannelAccessFailure),
            (Status::NoAck, Error::NoAck),
            (Status::TransactionOverflow, Error::NoAck),
            (Status::TransactionExpired, Error::NoAck),
            (Status::InvalidParameter, Error::Abort),
        ] {
            let mut mac = mac_with_defaults();
            mac.expect_mcps_data_request().returning(|_| Status::Success);

            let mut stack = stack_up();
            stack
                .expect_transmit_done()
                .withf(move |_, ack, result| !*ack && *result == Err(expected))
                .times(1)
                .return_const(());

            let mut radio = receiving_radio(mac, stack);
            load_transmit_buffer(&mut radio, &short_data_psdu());
            radio.transmit(NO_CONTEXT).unwrap();

            radio
                .event_handler()
                .mcps_data_confirm(&confirm(1, status));
            assert!(radio.process_drivers());
        }
    }

    #[test]
    fn test_two_in_flight_transmissions_do_not_cross_over() {
        static FIRST: u32 = 1;
        static SECOND: u32 = 2;

        let handles = Arc::new(Mutex::new(Vec::new()));
        let mut mac = mac_with_defaults();
        {
            let handles = Arc::clone(&handles);
            mac.expect_mcps_data_request()
                .times(2)
                .returning(move |request| {
                    handles.lock().unwrap().push(request.msdu_handle);
                    Status::Success
                });
        }

        let completions = Arc::new(Mutex::new(Vec::new()));
        let mut stack = stack_up();
        {
            let completions = Arc::clone(&completions);
            stack
                .expect_transmit_done()
                .times(2)
                .returning(move |context, _, result| {
                    assert!(result.is_ok());
                    completions
                        .lock()
                        .unwrap()
                        .push(*context.downcast_ref::<u32>().unwrap());
                });
        }

        let mut radio = receiving_radio(mac, stack);

        load_transmit_buffer(&mut radio, &short_data_psdu());
        radio.transmit(&FIRST).unwrap();
        load_transmit_buffer(&mut radio, &short_data_psdu());
        radio.transmit(&SECOND).unwrap();

        let assigned = handles.lock().unwrap().clone();
        assert_eq!(assigned.len(), 2);
        assert_ne!(assigned[0], assigned[1]);

        // Confirm in reverse order; each context follows its own handle
        let handler = radio.event_handler();
        handler.mcps_data_confirm(&confirm(assigned[1], Status::Success));
        assert!(radio.process_drivers());
        handler.mcps_data_confirm(&confirm(assigned[0], Status::Success));
        assert!(radio.process_drivers());

        assert_eq!(*completions.lock().unwrap(), vec![SECOND, FIRST]);
    }

    #[test]
    fn test_confirm_with_unknown_handle_is_dropped() {
        let stack = stack_up();
        // transmit_done must not be called
        let mut radio = receiving_radio(mac_with_defaults(), stack);

        radio
            .event_handler()
            .mcps_data_confirm(&confirm(9, Status::Success));
        assert!(radio.process_drivers());
    }

    #[test]
    fn test_transmit_rejects_unsupported_frames() {
        let mut radio = receiving_radio(mac_with_defaults(), MockStack::new());

        // beacon frame type
        load_transmit_buffer(&mut radio, &[0x00, 0x80, 0x07, 0xCE, 0xFA, 0x00, 0x00]);
        assert_eq!(radio.transmit(NO_CONTEXT), Err(Error::Abort));
    }

    #[test]
    fn test_data_request_command_polls_synchronously() {
        static CONTEXT: u32 = 21;
        let mut mac = mac_with_defaults();
        mac.expect_mlme_poll()
            .withf(|dst, interval, security| {
                dst.mode == AddrMode::Short && *interval == [0, 0] && !security.is_secured()
            })
            .times(1)
            .returning(|_, _, _| Status::Success);

        let mut stack = stack_up();
        stack
            .expect_transmit_done()
            .withf(|context, ack, result| {
                context.downcast_ref::<u32>() == Some(&21) && *ack && result.is_ok()
            })
            .times(1)
            .return_const(());

        let mut radio = receiving_radio(mac, stack);
        load_transmit_buffer(
            &mut radio,
            &[
                0x63, 0x88, // FCF: command, ack request, PAN compression
                0x07, 0xCE, 0xFA, 0x01, 0x00, 0x02, 0x00, // addressing
                0x04, // data request command
                0x00, 0x00, // MFR space
            ],
        );
        assert_eq!(radio.transmit(&CONTEXT), Ok(()));

        // The poll completed synchronously; the radio is receiving again
        assert_eq!(radio.receive(11), Ok(()));
    }

    #[test]
    fn test_poll_transport_failures_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut mac = mac_with_defaults();
        {
            let calls = Arc::clone(&calls);
            mac.expect_mlme_poll().returning(move |_, _, _| {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Status::SystemFailure
                } else {
                    Status::NoData
                }
            });
        }

        let mut stack = stack_up();
        stack
            .expect_transmit_done()
            .withf(|_, ack, result| !*ack && result.is_ok())
            .times(1)
            .return_const(());

        let mut radio = receiving_radio(mac, stack);
        load_transmit_buffer(
            &mut radio,
            &[
                0x63, 0x88, 0x07, 0xCE, 0xFA, 0x01, 0x00, 0x02, 0x00, 0x04, 0x00, 0x00,
            ],
        );
        radio.transmit(NO_CONTEXT).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_indication_reaches_the_stack_through_the_slot() {
        let mut stack = stack_up();
        stack
            .expect_receive_done()
            .withf(|packet, result| {
                result.is_ok()
                    && packet.channel == 11
                    && packet.length == 13
                    && packet.psdu()[0..2] == [0x41, 0x88]
                    && packet.psdu()[3..5] == [0xEF, 0xBE]
                    && packet.psdu()[5..7] == [0x01, 0x00]
                    && packet.psdu()[7..9] == [0x02, 0x00]
                    && packet.psdu()[9..11] == [0x11, 0x22]
            })
            .times(1)
            .return_const(());

        let mut radio = receiving_radio(mac_with_defaults(), stack);
        let handler = radio.event_handler();

        handler.mcps_data_indication(&short_indication());
        assert!(radio.process_drivers());

        // LQI 0xC8 -> -28 dBm becomes the new noise floor
        assert_eq!(radio.noise_floor(), -28);
        assert!(radio.rx_slot.is_empty());
    }

    #[test]
    fn test_indications_are_dropped_while_the_interface_is_down() {
        let mut stack = MockStack::new();
        stack.expect_is_up().return_const(false);

        let radio = radio_with(mac_with_defaults(), stack);
        let handler = radio.event_handler();

        handler.mcps_data_indication(&short_indication());
        handler.mcps_data_confirm(&confirm(1, Status::Success));
        assert!(radio.rx_slot.is_empty());
    }

    #[test]
    fn test_second_indication_blocks_until_the_first_drains() {
        let mut stack = stack_up();
        stack.expect_receive_done().times(2).return_const(());

        let mut radio = receiving_radio(mac_with_defaults(), stack);
        let handler = radio.event_handler();
        let delivered = Arc::new(AtomicBool::new(false));

        handler.mcps_data_indication(&short_indication());

        let worker = {
            let handler = handler.clone();
            let delivered = Arc::clone(&delivered);
            thread::spawn(move || {
                handler.mcps_data_indication(&short_indication());
                delivered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!delivered.load(Ordering::SeqCst));

        // Draining the first frame lets the worker hand over the second
        assert!(radio.process_drivers());
        worker.join().unwrap();
        assert!(delivered.load(Ordering::SeqCst));
        while !radio.process_drivers() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(radio.rx_slot.is_empty());
    }

    #[test]
    fn test_active_scan_streams_results_then_null() {
        static RESULTS: AtomicUsize = AtomicUsize::new(0);
        static COMPLETED: AtomicUsize = AtomicUsize::new(0);
        fn callback(result: Option<&scan::ActiveScanResult>, _context: ScanContext) {
            match result {
                Some(result) => {
                    assert_eq!(result.pan_id, 0xFACE);
                    RESULTS.fetch_add(1, Ordering::SeqCst);
                }
                None => {
                    COMPLETED.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let mut mac = mac_with_defaults();
        mac.expect_mlme_scan()
            .withf(|request| {
                request.scan_type == ScanType::Active
                    && request.scan_channels == ((1 << 15) | (1 << 20))
                    && request.scan_duration == 3
            })
            .times(1)
            .returning(|_| Status::Success);

        let mut radio = receiving_radio(mac, stack_up());
        let mask = (1 << 15) | (1 << 20);
        assert_eq!(radio.active_scan(mask, 200, callback, &()), Ok(()));
        assert!(radio.is_active_scan_in_progress());
        // a second scan of either kind is refused
        assert_eq!(radio.active_scan(mask, 200, callback, &()), Err(Error::Busy));

        let handler = radio.event_handler();
        let beacon = BeaconNotifyIndication {
            bsn: 1,
            pan_descriptor: PanDescriptor {
                coord: FullAddr::ext([0xCE, 0xFA], [1, 2, 3, 4, 5, 6, 7, 8]),
                logical_channel: 15,
                link_quality: 0xC8,
                security: SecSpec::default(),
            },
            sdu: {
                let mut sdu = vec![0u8; 32];
                sdu[0] = 3;
                sdu[1] = 0x91;
                sdu
            },
        };

        handler.mlme_beacon_notify_indication(&beacon);
        assert!(radio.process_drivers());
        handler.mlme_beacon_notify_indication(&beacon);
        assert!(radio.process_drivers());

        handler.mlme_scan_confirm(&ScanConfirm {
            status: Status::Success,
            scan_type: ScanType::Active,
            unscanned_channels: 0,
            result_list: Vec::new(),
        });
        assert!(radio.process_drivers());

        assert_eq!(RESULTS.load(Ordering::SeqCst), 2);
        assert_eq!(COMPLETED.load(Ordering::SeqCst), 1);
        assert!(!radio.is_active_scan_in_progress());
    }

    #[test]
    fn test_energy_scan_pairs_samples_with_channels() {
        static RESULTS: Mutex<Vec<(u8, i8)>> = Mutex::new(Vec::new());
        static COMPLETED: AtomicUsize = AtomicUsize::new(0);
        fn callback(result: Option<&EnergyScanResult>, _context: ScanContext) {
            match result {
                Some(result) => RESULTS
                    .lock()
                    .unwrap()
                    .push((result.channel, result.max_rssi)),
                None => {
                    COMPLETED.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let mut mac = mac_with_defaults();
        mac.expect_mlme_scan()
            .withf(|request| request.scan_type == ScanType::Energy)
            .times(1)
            .returning(|_| Status::Success);

        let mut radio = receiving_radio(mac, stack_up());
        let mask = (1 << 13) | (1 << 24);
        assert_eq!(radio.energy_scan(mask, 0, callback, &()), Ok(()));
        assert!(radio.is_energy_scan_in_progress());

        radio.event_handler().mlme_scan_confirm(&ScanConfirm {
            status: Status::Success,
            scan_type: ScanType::Energy,
            unscanned_channels: 0,
            result_list: vec![0xD0, 0xB0],
        });
        assert!(radio.process_drivers());

        assert_eq!(
            *RESULTS.lock().unwrap(),
            vec![(13, 0xD0u8 as i8), (24, 0xB0u8 as i8)]
        );
        assert_eq!(COMPLETED.load(Ordering::SeqCst), 1);
        assert!(!radio.is_energy_scan_in_progress());
    }

    #[test]
    fn test_role_change_starts_coordinator_operation() {
        let mut mac = mac_with_defaults();
        mac.expect_mlme_start()
            .withf(|request| {
                request.pan_id == 0xFACE
                    && request.logical_channel == 11
                    && request.beacon_order == 15
                    && request.superframe_order == 15
                    && request.pan_coordinator
            })
            .times(1)
            .returning(|_| Status::Success);

        let mut stack = MockStack::new();
        stack.expect_role().return_const(Role::Router);
        stack.expect_pan_id().return_const(0xFACEu16);
        // A role change also rebuilds the tables
        stack.expect_key_sequence().return_const(5u32);
        stack.expect_child().returning(|_| None);
        stack.expect_router_neighbors().returning(|_| Vec::new());
        stack
            .expect_mac_key()
            .returning(|sequence| [sequence as u8; 16]);

        let mut radio = radio_with(mac, stack);
        radio.enable().unwrap();
        radio.receive(11).unwrap();
        radio.state_changed(CHANGED_ROLE);
    }

    #[test]
    fn test_device_activity_round_trip() {
        let mut mac = mac_with_defaults();
        // Synchronizer rebuild: one child, so one device table entry
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&counter);
            mac.expect_mlme_get()
                .with(eq(PibAttr::DeviceTable), eq(0u8))
                .returning(move |_, _| {
                    let descriptor = DeviceDescriptor {
                        pan_id: [0xCE, 0xFA],
                        short_address: [0x01, 0x04],
                        ext_address: [8, 7, 6, 5, 4, 3, 2, 1],
                        frame_counter: counter.fetch_add(1, Ordering::SeqCst) as u32,
                        exempt: false,
                    };
                    Ok(descriptor.to_bytes().to_vec())
                });
        }

        let mut stack = stack_up();
        stack.expect_role().return_const(Role::Router);
        stack.expect_pan_id().return_const(0xFACEu16);
        stack.expect_key_sequence().return_const(5u32);
        stack.expect_child().returning(|index| {
            (index == 0).then_some(crate::stack::Neighbor {
                ext_address: [1, 2, 3, 4, 5, 6, 7, 8],
                rloc16: 0x0401,
            })
        });
        stack.expect_router_neighbors().returning(|_| Vec::new());
        stack.expect_mac_key().returning(|sequence| [sequence as u8; 16]);

        let mut radio = radio_with(mac, stack);
        radio.state_changed(crate::stack::CHANGED_CHILD_ADDED);

        // First query inserts the device: no delta yet
        assert!(!radio.is_device_active([1, 2, 3, 4, 5, 6, 7, 8]));
        // The mocked counter advances per refresh: now there is a delta
        assert!(radio.is_device_active([1, 2, 3, 4, 5, 6, 7, 8]));
        // Unknown devices are inactive
        assert!(!radio.is_device_active([9, 9, 9, 9, 9, 9, 9, 9]));
    }

    #[test]
    fn test_promiscuous_mode_is_cached() {
        let mut mac = mac_with_defaults();
        mac.expect_mlme_get()
            .with(eq(PibAttr::PromiscuousMode), eq(0u8))
            .times(1)
            .returning(|_, _| Ok(vec![1]));

        let mut radio = radio_with(mac, MockStack::new());
        assert_eq!(radio.promiscuous(), Ok(true));
        // Served from the cache: no second MLME-GET
        assert_eq!(radio.promiscuous(), Ok(true));

        assert_eq!(radio.set_promiscuous(false), Ok(()));
        assert_eq!(radio.promiscuous(), Ok(false));
    }

    #[test]
    fn test_eui64_is_stable_and_respects_persisted_value() {
        let radio = radio_with(mac_with_defaults(), MockStack::new());
        assert_eq!(radio.ieee_eui64(), [1, 2, 3, 4, 5, 6, 7, 8]);

        let mut generated_config = config();
        generated_config.eui64 = None;
        let radio = Radio::new(
            Arc::new(mac_with_defaults()),
            Arc::new(MockStack::new()),
            generated_config,
        )
        .unwrap();
        let eui64 = radio.ieee_eui64();
        assert_eq!(eui64, [0x34, 0x12, 0x34, 0x12, 0x34, 0x12, 0x34, 0x12]);
        assert_eq!(radio.ieee_eui64(), eui64);
    }

    #[test]
    fn test_beacon_payload_writes_carry_name_and_ext_pan_id() {
        let writes = Arc::new(Mutex::new(Vec::new()));

        let mut mac = MockMacSap::new();
        mac.expect_mlme_reset().returning(|_| Status::Success);
        mac.expect_hwme_set().returning(|_, _| Status::Success);
        {
            let writes = Arc::clone(&writes);
            mac.expect_mlme_set().returning(move |attr, _, value| {
                writes.lock().unwrap().push((attr, value.to_vec()));
                Status::Success
            });
        }

        let mut radio = radio_with(mac, MockStack::new());
        radio
            .core
            .pib
            .set_extended_pan_id(&[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(radio.set_network_name(b"MyHome"), Ok(()));

        let writes = writes.lock().unwrap();
        let payload = writes
            .iter()
            .find(|(attr, _)| *attr == PibAttr::BeaconPayload)
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(payload.len(), 32);
        assert_eq!(payload[0], 3);
        assert_eq!(&payload[2..8], b"MyHome");
        assert_eq!(payload[18..26], [8, 7, 6, 5, 4, 3, 2, 1]);

        let length = writes
            .iter()
            .find(|(attr, _)| *attr == PibAttr::BeaconPayloadLength)
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(length, vec![32]);
    }

    #[test]
    fn test_failed_sync_commands_surface_as_failed() {
        let mut mac = MockMacSap::new();
        mac.expect_mlme_reset().returning(|_| Status::Success);
        mac.expect_hwme_set().returning(|_, _| Status::Success);
        mac.expect_mlme_set().returning(|attr, _, _| {
            if attr == PibAttr::PanId {
                Status::InvalidParameter
            } else {
                Status::Success
            }
        });

        let mut radio = radio_with(mac, MockStack::new());
        assert_eq!(radio.set_pan_id(0xFACE), Err(Error::Failed));
    }

    #[test]
    fn test_stop_resets_the_mac() {
        let mut mac = MockMacSap::new();
        mac.expect_mlme_reset()
            .with(eq(true))
            .times(2) // init and stop
            .returning(|_| Status::Success);
        mac.expect_mlme_set().returning(|_, _, _| Status::Success);
        mac.expect_hwme_set().returning(|_, _| Status::Success);

        let mut radio = radio_with(mac, MockStack::new());
        radio.stop();
    }

    #[test]
    fn test_caps_advertise_ack_timeout() {
        let radio = radio_with(mac_with_defaults(), MockStack::new());
        assert_eq!(radio.caps(), CAPS_ACK_TIMEOUT);
    }
}
