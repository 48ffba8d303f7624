//! Orchestrator: owns the FIC runner and one worker per subscribed
//! subchannel, fans per-frame bit slices out to them and fans the results
//! back in before the next frame, then asks the database manager whether to
//! publish.
//!
//! DOC: SS4.N / SS5. A single frame is processed synchronously on the calling
//! thread here; SS5's `JoinHandle` + `crossbeam_channel::Sender<WorkerCommand>`
//! worker abstraction is the mechanical extension point for running each
//! subchannel worker on its own OS thread behind the same per-frame barrier
//! `app_helpers::barrier::Barrier<T>` already used for the OFDM pipeline -
//! since workers are all joined before the next frame's database publish
//! regardless, observable behaviour is identical either way.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug_span, info_span};

use crate::dab_plus::{AacObserver, SuperframeAssembler, SuperframeHeader};
use crate::database::entities::{Database, TransportMode};
use crate::database::radio_fig_handler::RadioFigHandler;
use crate::database::updater::UpdaterStats;
use crate::dab_radio_parameters::DabRadioParameters;
use crate::fic::fic_decoder::FicDecoder;
use crate::fig::fig_processor::process_fib;
use crate::mp2::{Mp2FrameHeader, Mp2FrameProcessor, Mp2Observer};
use crate::msc::msc_decoder::MscDecoder;
use crate::packet::data_group::parse_data_group_header;
use crate::packet::mot_processor::{MotEntity, MotObserver, MotProcessor, SegmentKind};
use crate::packet::packet_processor::PacketProcessor;

const NB_COOLDOWN_MAX: u8 = 10;
const NB_FORCE_UPDATE_THRESHOLD: u64 = 50;

/// Database publication manager: decides when the orchestrator's live,
/// ever-growing updater stats are stable enough to expose as a new snapshot.
///
/// DOC: SS4.N, grounded verbatim on `basic_database_manager.h`/`.cpp`'s
/// `nb_cooldown_max = 10`, `nb_force_update_threshold = 50` constants.
pub struct DatabaseManager {
    stable_stats: UpdaterStats,
    is_awaiting_db_update: bool,
    nb_cooldown: u8,
}

impl DatabaseManager {
    pub fn new() -> Self {
        Self { stable_stats: UpdaterStats::default(), is_awaiting_db_update: false, nb_cooldown: 0 }
    }

    /// Returns `true` if the caller should publish a fresh snapshot now.
    pub fn on_database_updater(&mut self, live_stats: UpdaterStats) -> bool {
        let delta = live_stats.updates.saturating_sub(self.stable_stats.updates);
        if delta > NB_FORCE_UPDATE_THRESHOLD {
            self.update_database(live_stats);
            return true;
        }
        if delta > 0 {
            self.is_awaiting_db_update = true;
            self.nb_cooldown = 0;
            return false;
        }
        if self.is_awaiting_db_update {
            self.nb_cooldown += 1;
            if self.nb_cooldown >= NB_COOLDOWN_MAX {
                self.update_database(live_stats);
                return true;
            }
        }
        false
    }

    /// The stats snapshot as of the last published database, including
    /// `total`/`pending`/`completed` entity counts alongside `conflicts` and
    /// `updates`.
    pub fn stats(&self) -> UpdaterStats {
        self.stable_stats
    }

    fn update_database(&mut self, live_stats: UpdaterStats) {
        self.stable_stats = live_stats;
        self.is_awaiting_db_update = false;
        self.nb_cooldown = 0;
    }
}

impl Default for DatabaseManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum RadioEvent {
    OnAudioChannel { subchannel_id: u8 },
    OnDataPacketChannel { subchannel_id: u8 },
    OnSuperframeHeader { subchannel_id: u8, header: SuperframeHeader },
    OnAccessUnit { subchannel_id: u8, index: usize, total: usize, bytes: Vec<u8> },
    OnMp2Frame { subchannel_id: u8, header: Mp2FrameHeader, bytes: Vec<u8> },
    OnEntityComplete { subchannel_id: u8, entity: MotEntity },
    OnFirecodeError { subchannel_id: u8 },
    OnRsError { subchannel_id: u8 },
    DatabasePublished(Database),
}

enum WorkerKind {
    AacPlus(SuperframeAssembler),
    Mpeg(Mp2FrameProcessor),
    Packet(PacketProcessor, MotProcessor),
}

struct SubchannelWorker {
    decoder: MscDecoder,
    kind: WorkerKind,
}

struct ForwardingAacObserver<'a> {
    subchannel_id: u8,
    tx: &'a Sender<RadioEvent>,
}

impl AacObserver for ForwardingAacObserver<'_> {
    fn on_superframe_header(&mut self, header: &SuperframeHeader) {
        let _ = self.tx.send(RadioEvent::OnSuperframeHeader { subchannel_id: self.subchannel_id, header: *header });
    }
    fn on_access_unit(&mut self, index: usize, total: usize, bytes: &[u8]) {
        let _ = self.tx.send(RadioEvent::OnAccessUnit { subchannel_id: self.subchannel_id, index, total, bytes: bytes.to_vec() });
    }
    fn on_firecode_error(&mut self) {
        let _ = self.tx.send(RadioEvent::OnFirecodeError { subchannel_id: self.subchannel_id });
    }
    fn on_rs_error(&mut self) {
        let _ = self.tx.send(RadioEvent::OnRsError { subchannel_id: self.subchannel_id });
    }
    fn on_access_unit_crc_error(&mut self, _index: usize) {}
}

struct ForwardingMp2Observer<'a> {
    subchannel_id: u8,
    tx: &'a Sender<RadioEvent>,
}

impl Mp2Observer for ForwardingMp2Observer<'_> {
    fn on_frame(&mut self, header: &Mp2FrameHeader, compressed_frame: &[u8], _pad_bytes: &[u8]) {
        let _ = self.tx.send(RadioEvent::OnMp2Frame { subchannel_id: self.subchannel_id, header: *header, bytes: compressed_frame.to_vec() });
    }
}

struct ForwardingMotObserver<'a> {
    subchannel_id: u8,
    tx: &'a Sender<RadioEvent>,
}

impl MotObserver for ForwardingMotObserver<'_> {
    fn on_entity_complete(&mut self, entity: &MotEntity) {
        let _ = self.tx.send(RadioEvent::OnEntityComplete { subchannel_id: self.subchannel_id, entity: entity.clone() });
    }
}

/// Owns the FIC decoder, the live ensemble database, and one worker per
/// subchannel a service component currently references.
pub struct BasicRadio {
    params: DabRadioParameters,
    fic_decoder: FicDecoder,
    fig_handler: RadioFigHandler,
    db_manager: DatabaseManager,
    workers: std::collections::HashMap<u8, SubchannelWorker>,
    events_tx: Sender<RadioEvent>,
}

impl BasicRadio {
    pub fn new(params: DabRadioParameters) -> (Self, Receiver<RadioEvent>) {
        let (tx, rx) = unbounded();
        let radio = Self {
            fic_decoder: FicDecoder::new(DabRadioParameters {
                nb_symbols: params.nb_symbols,
                nb_fic_symbols: params.nb_fic_symbols,
                nb_msc_symbols: params.nb_msc_symbols,
                nb_fibs_in_fic: params.nb_fibs_in_fic,
                nb_cifs_in_msc: params.nb_cifs_in_msc,
                nb_bits_per_symbol: params.nb_bits_per_symbol,
                nb_bits_per_frame: params.nb_bits_per_frame,
                nb_bits_in_fic: params.nb_bits_in_fic,
                nb_bits_in_msc: params.nb_bits_in_msc,
                nb_bits_per_fib: params.nb_bits_per_fib,
                nb_bits_per_fig: params.nb_bits_per_fig,
                nb_bits_per_cif: params.nb_bits_per_cif,
            }),
            params,
            fig_handler: RadioFigHandler::new(),
            db_manager: DatabaseManager::new(),
            workers: std::collections::HashMap::new(),
            events_tx: tx,
        };
        (radio, rx)
    }

    pub fn database(&self) -> &Database {
        &self.fig_handler.database
    }

    /// Entity completion stats as of the last published database snapshot.
    pub fn database_stats(&self) -> UpdaterStats {
        self.db_manager.stats()
    }

    /// Runs one transmission frame's worth of FIC and MSC soft bits through
    /// the pipeline, publishing a database snapshot if the manager decides to.
    pub fn process_frame(&mut self, fic_bits: &[i8], msc_bits: &[i8]) {
        {
            let _span = info_span!("fic_runner").entered();
            let fibs = self.fic_decoder.decode_fic(fic_bits);
            for fib in &fibs {
                let _span = debug_span!("fig_to_updater").entered();
                process_fib(fib, &mut self.fig_handler);
            }
        }

        self.sync_workers_with_database();

        {
            let _span = info_span!("subchannel_workers").entered();
            for (id, worker) in self.workers.iter_mut() {
                if let Some(payload) = worker.decoder.process_cif(msc_bits) {
                    Self::route_payload(*id, &payload, &mut worker.kind, &self.events_tx);
                }
            }
        }

        let (total, pending, completed) = self.fig_handler.database.completion_counts();
        self.fig_handler.stats.total = total;
        self.fig_handler.stats.pending = pending;
        self.fig_handler.stats.completed = completed;

        if self.db_manager.on_database_updater(self.fig_handler.stats) {
            let _ = self.events_tx.send(RadioEvent::DatabasePublished(self.fig_handler.database.clone()));
        }
    }

    fn route_payload(subchannel_id: u8, payload: &[u8], kind: &mut WorkerKind, tx: &Sender<RadioEvent>) {
        match kind {
            WorkerKind::AacPlus(assembler) => {
                let mut observer = ForwardingAacObserver { subchannel_id, tx };
                assembler.push_frame(payload, &mut observer);
            }
            WorkerKind::Mpeg(processor) => {
                let mut observer = ForwardingMp2Observer { subchannel_id, tx };
                processor.process_cif(payload, &mut observer);
            }
            WorkerKind::Packet(packet_processor, mot_processor) => {
                if let Some((address, data_group)) = packet_processor.push_packet(payload) {
                    if let Some((header, consumed)) = parse_data_group_header(&data_group) {
                        let end = if header.has_crc { data_group.len().saturating_sub(2) } else { data_group.len() };
                        // Data group type 3/4/5 (header / unscrambled body /
                        // scrambled body) follows the MOT type ordering
                        // `MotProcessor` already uses; other types (directory
                        // modes, CA signalling) are not routed to MOT.
                        let segment_kind = match header.data_group_type {
                            3 => Some(SegmentKind::Header),
                            4 | 5 => Some(SegmentKind::Body),
                            _ => None,
                        };
                        if let (Some(kind), true) = (segment_kind, consumed <= end) {
                            let transport_id = header.transport_id.map(|id| id as u32).unwrap_or(address as u32);
                            let mut observer = ForwardingMotObserver { subchannel_id, tx };
                            mot_processor.push_segment(
                                transport_id,
                                kind,
                                header.segment_number,
                                header.is_last_segment,
                                0,
                                &data_group[consumed..end],
                                &mut observer,
                            );
                        }
                    }
                }
            }
        }
    }

    /// Creates a worker for every subchannel a service component now
    /// references that doesn't already have one, notifying subscribers.
    fn sync_workers_with_database(&mut self) {
        let db = &self.fig_handler.database;
        for component in &db.components {
            let Some(subchannel_id) = component.subchannel_id else { continue };
            if self.workers.contains_key(&subchannel_id) {
                continue;
            }
            let Some(subchannel_index) = db.find_subchannel(subchannel_id) else { continue };
            let subchannel = &db.subchannels[subchannel_index];
            let Some(protection) = subchannel.protection else { continue };

            let decoder = MscDecoder::new(subchannel.start_address, subchannel.length, protection);
            let (kind, event) = match component.transport_mode {
                Some(TransportMode::StreamAudio) => {
                    if component.audio_service_type == Some(0) {
                        (WorkerKind::Mpeg(Mp2FrameProcessor::new()), RadioEvent::OnAudioChannel { subchannel_id })
                    } else {
                        (WorkerKind::AacPlus(SuperframeAssembler::new((subchannel.length as usize) * 8)), RadioEvent::OnAudioChannel { subchannel_id })
                    }
                }
                Some(TransportMode::PacketData) => (
                    WorkerKind::Packet(PacketProcessor::new(subchannel.fec_scheme != 0), MotProcessor::new()),
                    RadioEvent::OnDataPacketChannel { subchannel_id },
                ),
                _ => continue,
            };

            self.workers.insert(subchannel_id, SubchannelWorker { decoder, kind });
            let _ = self.events_tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_publishes_once_delta_exceeds_fifty() {
        let mut manager = DatabaseManager::new();
        let stats = UpdaterStats { updates: 51, ..Default::default() };
        assert!(manager.on_database_updater(stats));
    }

    #[test]
    fn publishes_after_ten_consecutive_quiet_frames() {
        let mut manager = DatabaseManager::new();
        let changed = UpdaterStats { updates: 5, ..Default::default() };
        assert!(!manager.on_database_updater(changed));

        for _ in 0..9 {
            assert!(!manager.on_database_updater(changed));
        }
        assert!(manager.on_database_updater(changed));
    }

    #[test]
    fn no_change_without_prior_activity_never_publishes() {
        let mut manager = DatabaseManager::new();
        let stats = UpdaterStats::default();
        for _ in 0..100 {
            assert!(!manager.on_database_updater(stats));
        }
    }
}
