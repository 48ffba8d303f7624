//! Ensemble database entity types.
//!
//! Cyclic references between service, component and subchannel in the original
//! `DAB_Database` are modelled here as owning `Vec<T>` inside a single
//! [`super::Database`], with integer keys; lookups return indices, never
//! references, so reconfiguration is just a vector reset.

/// Whether a subchannel/service-component uses equal or unequal error protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    Uep { table_index: u8 },
    Eep { level: u8, is_type_b: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    StreamAudio,
    StreamData,
    PacketData,
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::StreamAudio
    }
}

#[derive(Debug, Default, Clone)]
pub struct Ensemble {
    pub dirty: u32,
    pub reference: u16,
    pub country_id: u8,
    pub extended_country_code: u8,
    pub label: Option<String>,
    pub nb_services: u8,
    pub reconfiguration_count: u16,
    pub local_time_offset_half_hours: i8,
    pub international_table_id: u8,
}

pub const ENSEMBLE_DIRTY_COUNTRY_ID: u32 = 1 << 0;
pub const ENSEMBLE_DIRTY_REFERENCE: u32 = 1 << 1;
pub const ENSEMBLE_DIRTY_EXTENDED_COUNTRY_CODE: u32 = 1 << 2;
pub const ENSEMBLE_DIRTY_LOCAL_TIME_OFFSET: u32 = 1 << 3;
pub const ENSEMBLE_DIRTY_RECONFIGURATION_COUNT: u32 = 1 << 4;
pub const ENSEMBLE_REQUIRED: u32 =
    ENSEMBLE_DIRTY_COUNTRY_ID | ENSEMBLE_DIRTY_REFERENCE | ENSEMBLE_DIRTY_EXTENDED_COUNTRY_CODE;

#[derive(Debug, Default, Clone)]
pub struct Service {
    pub dirty: u32,
    pub reference: u32,
    pub country_id: u8,
    pub extended_country_code: u8,
    pub label: Option<String>,
    pub programme_type: u8,
    pub language_id: u8,
    pub closed_caption_id: u8,
}

pub const SERVICE_DIRTY_COUNTRY_ID: u32 = 1 << 0;
pub const SERVICE_REQUIRED: u32 = SERVICE_DIRTY_COUNTRY_ID;

#[derive(Debug, Clone)]
pub struct ServiceComponent {
    pub dirty: u32,
    pub service_reference: u32,
    pub component_id: u8,
    pub subchannel_id: Option<u8>,
    pub global_id: Option<u32>,
    pub transport_mode: Option<TransportMode>,
    pub audio_service_type: Option<u8>,
    pub data_service_type: Option<u8>,
    pub label: Option<String>,
    /// Raw transport-mode byte carried by FIG 0/8's short/long form definition;
    /// distinct from `transport_mode`, which is derived from FIG 0/2.
    pub global_definition: Option<u8>,
    pub user_applications: Vec<(u16, Vec<u8>)>,
}

impl Default for ServiceComponent {
    fn default() -> Self {
        Self {
            dirty: 0,
            service_reference: 0,
            component_id: 0,
            subchannel_id: None,
            global_id: None,
            transport_mode: None,
            audio_service_type: None,
            data_service_type: None,
            label: None,
            global_definition: None,
            user_applications: Vec::new(),
        }
    }
}

pub const COMPONENT_DIRTY_SERVICE_REFERENCE: u32 = 1 << 0;
pub const COMPONENT_DIRTY_COMPONENT_ID: u32 = 1 << 1;
pub const COMPONENT_DIRTY_SUBCHANNEL_ID: u32 = 1 << 2;
pub const COMPONENT_DIRTY_AUDIO_SERVICE_TYPE: u32 = 1 << 3;
pub const COMPONENT_DIRTY_DATA_SERVICE_TYPE: u32 = 1 << 4;
pub const COMPONENT_DIRTY_TRANSPORT_MODE: u32 = 1 << 5;
pub const COMPONENT_REQUIRED_AUDIO: u32 =
    COMPONENT_DIRTY_SERVICE_REFERENCE | COMPONENT_DIRTY_COMPONENT_ID | COMPONENT_DIRTY_SUBCHANNEL_ID | COMPONENT_DIRTY_AUDIO_SERVICE_TYPE;
pub const COMPONENT_REQUIRED_DATA: u32 =
    COMPONENT_DIRTY_SERVICE_REFERENCE | COMPONENT_DIRTY_COMPONENT_ID | COMPONENT_DIRTY_SUBCHANNEL_ID | COMPONENT_DIRTY_DATA_SERVICE_TYPE;

#[derive(Debug, Default, Clone)]
pub struct Subchannel {
    pub dirty: u32,
    pub id: u8,
    pub start_address: u16,
    pub length: u16,
    pub is_uep: bool,
    pub protection: Option<ProtectionKind>,
    pub fec_scheme: u8,
    pub is_ca_applied: bool,
}

pub const SUBCHANNEL_DIRTY_START_ADDRESS: u32 = 1 << 0;
pub const SUBCHANNEL_DIRTY_LENGTH: u32 = 1 << 1;
pub const SUBCHANNEL_DIRTY_IS_UEP: u32 = 1 << 2;
pub const SUBCHANNEL_DIRTY_PROTECTION: u32 = 1 << 3;
pub const SUBCHANNEL_REQUIRED: u32 =
    SUBCHANNEL_DIRTY_START_ADDRESS | SUBCHANNEL_DIRTY_LENGTH | SUBCHANNEL_DIRTY_IS_UEP | SUBCHANNEL_DIRTY_PROTECTION;

#[derive(Debug, Default, Clone)]
pub struct LinkService {
    pub dirty: u32,
    pub link_service_number: u16,
    pub service_reference: u32,
    pub is_active: bool,
    pub is_hard_linked: bool,
    pub is_international: bool,
}

pub const LINK_SERVICE_DIRTY_SERVICE_REFERENCE: u32 = 1 << 0;
pub const LINK_SERVICE_REQUIRED: u32 = LINK_SERVICE_DIRTY_SERVICE_REFERENCE;

#[derive(Debug, Default, Clone)]
pub struct FrequencyService {
    pub dirty: u32,
    pub link_service_number: u16,
    pub frequencies: Vec<u32>,
}

pub const FREQUENCY_SERVICE_DIRTY_LSN: u32 = 1 << 0;
pub const FREQUENCY_SERVICE_DIRTY_FREQUENCY: u32 = 1 << 1;
pub const FM_DRM_SERVICE_REQUIRED: u32 = FREQUENCY_SERVICE_DIRTY_LSN | FREQUENCY_SERVICE_DIRTY_FREQUENCY;
pub const AMSS_SERVICE_REQUIRED: u32 = FREQUENCY_SERVICE_DIRTY_FREQUENCY;

impl FrequencyService {
    /// Insert-if-unique: expected cardinality is small (a handful of alternate
    /// frequencies), so a linear scan is used rather than a `HashSet`.
    pub fn add_frequency(&mut self, frequency: u32) {
        if !self.frequencies.contains(&frequency) {
            self.frequencies.push(frequency);
        }
        self.dirty |= FREQUENCY_SERVICE_DIRTY_FREQUENCY;
    }
}

#[derive(Debug, Default, Clone)]
pub struct OtherEnsemble {
    pub dirty: u32,
    pub ensemble_reference: u16,
    pub frequency: u32,
    pub is_continuous_output: Option<bool>,
}

pub const OTHER_ENSEMBLE_DIRTY_FREQUENCY: u32 = 1 << 0;
pub const OTHER_ENSEMBLE_REQUIRED: u32 = OTHER_ENSEMBLE_DIRTY_FREQUENCY;

/// FIG 0/10's decoded calendar date plus time-of-day, kept as the last value
/// seen rather than dirty-tracked: a transmitter re-sends this continuously
/// and every re-send is a legitimate update, never a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentDateTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hours: u8,
    pub minutes: u8,
}

/// Owns every entity vector for one ensemble. Lookups are by index, not pointer,
/// so the borrow checker is always satisfied and a reconfiguration is just a
/// `Vec::clear` (or full replace).
#[derive(Debug, Default, Clone)]
pub struct Database {
    pub ensemble: Ensemble,
    pub services: Vec<Service>,
    pub components: Vec<ServiceComponent>,
    pub subchannels: Vec<Subchannel>,
    pub link_services: Vec<LinkService>,
    pub fm_services: Vec<FrequencyService>,
    pub drm_services: Vec<FrequencyService>,
    pub amss_services: Vec<FrequencyService>,
    pub other_ensembles: Vec<OtherEnsemble>,
    pub current_date_time: Option<CurrentDateTime>,
}

impl Database {
    pub fn find_service(&self, reference: u32) -> Option<usize> {
        self.services.iter().position(|s| s.reference == reference)
    }

    pub fn find_component(&self, service_reference: u32, component_id: u8) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.service_reference == service_reference && c.component_id == component_id)
    }

    pub fn find_subchannel(&self, id: u8) -> Option<usize> {
        self.subchannels.iter().position(|s| s.id == id)
    }

    /// Invariant 8: every service-component's subchannel must actually exist.
    pub fn is_consistent(&self) -> bool {
        self.components.iter().all(|c| match c.subchannel_id {
            None => true,
            Some(id) => self.find_subchannel(id).is_some(),
        })
    }

    /// `(total, pending, completed)` entity counts across every tracked
    /// entity, including the ensemble itself. `UpdaterStats` only keeps
    /// running aggregate counters, not the entity list, so this is
    /// recomputed from the live vectors each time it's needed.
    pub fn completion_counts(&self) -> (u64, u64, u64) {
        let mut total = 1u64;
        let mut completed = self.ensemble.is_complete() as u64;
        for service in &self.services {
            total += 1;
            completed += service.is_complete() as u64;
        }
        for component in &self.components {
            total += 1;
            completed += component.is_complete() as u64;
        }
        for subchannel in &self.subchannels {
            total += 1;
            completed += subchannel.is_complete() as u64;
        }
        for link_service in &self.link_services {
            total += 1;
            completed += link_service.is_complete() as u64;
        }
        for other in &self.other_ensembles {
            total += 1;
            completed += other.is_complete() as u64;
        }
        (total, total - completed, completed)
    }

    /// Clears every entity's dirty mask without touching the values already
    /// recorded. Invoked when FIG 0/7's reconfiguration count changes: a
    /// transmitter reconfiguration means the next re-announcement of a field
    /// is a fresh update, not a conflict with the pre-reconfiguration value.
    pub fn reset_all_dirty_masks(&mut self) {
        self.ensemble.dirty = 0;
        for service in &mut self.services {
            service.dirty = 0;
        }
        for component in &mut self.components {
            component.dirty = 0;
        }
        for subchannel in &mut self.subchannels {
            subchannel.dirty = 0;
        }
        for link_service in &mut self.link_services {
            link_service.dirty = 0;
        }
        for service in self.fm_services.iter_mut().chain(self.drm_services.iter_mut()).chain(self.amss_services.iter_mut()) {
            service.dirty = 0;
        }
        for other in &mut self.other_ensembles {
            other.dirty = 0;
        }
    }
}
