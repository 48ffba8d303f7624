//! Idempotent-on-equal-value field setters with dirty-bit tracking.
//!
//! Every setter follows the same template: if the field's dirty bit is already
//! set, a disagreeing value is a conflict (counted, never overwritten); a
//! matching value is a silent no-op; otherwise the value is accepted and the
//! field's dirty bit is raised.

use super::entities::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NoChange,
    Conflict,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UpdaterStats {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    pub conflicts: u64,
    pub updates: u64,
}

/// Sets `*current` to `value` unless `dirty & flag` is already raised, in which
/// case a disagreeing value is counted as a conflict and never overwrites.
pub fn update_field<T: PartialEq>(current: &mut T, dirty: &mut u32, flag: u32, value: T, stats: &mut UpdaterStats) -> UpdateOutcome
where
    T: Default,
{
    if *dirty & flag != 0 {
        if *current == value {
            UpdateOutcome::NoChange
        } else {
            stats.conflicts += 1;
            UpdateOutcome::Conflict
        }
    } else {
        *dirty |= flag;
        *current = value;
        stats.updates += 1;
        UpdateOutcome::Updated
    }
}

impl Ensemble {
    pub fn set_country_id(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.country_id, &mut self.dirty, ENSEMBLE_DIRTY_COUNTRY_ID, value, stats)
    }
    pub fn set_reference(&mut self, value: u16, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.reference, &mut self.dirty, ENSEMBLE_DIRTY_REFERENCE, value, stats)
    }
    /// Extended country code `0x00` is treated as "not present" and is a no-op,
    /// not a conflict; see `UNSET_EXTENDED_COUNTRY_CODE`.
    pub fn set_extended_country_code(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        if value == super::radio_fig_handler::UNSET_EXTENDED_COUNTRY_CODE {
            return UpdateOutcome::NoChange;
        }
        update_field(&mut self.extended_country_code, &mut self.dirty, ENSEMBLE_DIRTY_EXTENDED_COUNTRY_CODE, value, stats)
    }
    pub fn set_local_time_offset_half_hours(&mut self, value: i8, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.local_time_offset_half_hours, &mut self.dirty, ENSEMBLE_DIRTY_LOCAL_TIME_OFFSET, value, stats)
    }
    /// Unlike the other ensemble setters this one is never a hard conflict: a
    /// transmitter is allowed to bump its reconfiguration count at any time, so
    /// a disagreeing value just re-raises the dirty bit against the new value
    /// instead of counting against `stats.conflicts`. The caller (FIG 0/7's
    /// handler) is responsible for snapshotting the rest of the database
    /// before calling this when the count actually changes.
    pub fn set_reconfiguration_count(&mut self, value: u16, stats: &mut UpdaterStats) -> bool {
        let was_set = self.dirty & ENSEMBLE_DIRTY_RECONFIGURATION_COUNT != 0;
        let changed = was_set && self.reconfiguration_count != value;
        self.dirty |= ENSEMBLE_DIRTY_RECONFIGURATION_COUNT;
        self.reconfiguration_count = value;
        stats.updates += 1;
        changed
    }
    pub fn is_complete(&self) -> bool {
        self.dirty & ENSEMBLE_REQUIRED == ENSEMBLE_REQUIRED
    }
}

impl Service {
    pub fn set_country_id(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.country_id, &mut self.dirty, SERVICE_DIRTY_COUNTRY_ID, value, stats)
    }
    pub fn is_complete(&self) -> bool {
        self.dirty & SERVICE_REQUIRED == SERVICE_REQUIRED
    }
}

impl ServiceComponent {
    pub fn set_service_reference(&mut self, value: u32, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.service_reference, &mut self.dirty, COMPONENT_DIRTY_SERVICE_REFERENCE, value, stats)
    }
    pub fn set_component_id(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.component_id, &mut self.dirty, COMPONENT_DIRTY_COMPONENT_ID, value, stats)
    }
    pub fn set_subchannel_id(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        let mut current = self.subchannel_id.unwrap_or_default();
        let outcome = update_field(&mut current, &mut self.dirty, COMPONENT_DIRTY_SUBCHANNEL_ID, value, stats);
        self.subchannel_id = Some(current);
        outcome
    }
    pub fn set_audio_service_type(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        let mut current = self.audio_service_type.unwrap_or_default();
        let outcome = update_field(&mut current, &mut self.dirty, COMPONENT_DIRTY_AUDIO_SERVICE_TYPE, value, stats);
        self.audio_service_type = Some(current);
        outcome
    }
    pub fn set_data_service_type(&mut self, value: u8, stats: &mut UpdaterStats) -> UpdateOutcome {
        let mut current = self.data_service_type.unwrap_or_default();
        let outcome = update_field(&mut current, &mut self.dirty, COMPONENT_DIRTY_DATA_SERVICE_TYPE, value, stats);
        self.data_service_type = Some(current);
        outcome
    }
    pub fn set_transport_mode(&mut self, value: TransportMode, stats: &mut UpdaterStats) -> UpdateOutcome {
        let mut current = self.transport_mode.unwrap_or(value);
        let outcome = update_field(&mut current, &mut self.dirty, COMPONENT_DIRTY_TRANSPORT_MODE, value, stats);
        self.transport_mode = Some(current);
        outcome
    }
    pub fn is_complete(&self) -> bool {
        self.dirty & COMPONENT_REQUIRED_AUDIO == COMPONENT_REQUIRED_AUDIO || self.dirty & COMPONENT_REQUIRED_DATA == COMPONENT_REQUIRED_DATA
    }
}

impl Subchannel {
    pub fn set_start_address(&mut self, value: u16, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.start_address, &mut self.dirty, SUBCHANNEL_DIRTY_START_ADDRESS, value, stats)
    }
    pub fn set_length(&mut self, value: u16, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.length, &mut self.dirty, SUBCHANNEL_DIRTY_LENGTH, value, stats)
    }
    /// Cascaded as a side effect of whichever protection-specific setter runs
    /// first, matching `SetIsUEP` being invoked from `OnSubchannel_1_Short/_Long`.
    pub fn set_is_uep(&mut self, value: bool, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.is_uep, &mut self.dirty, SUBCHANNEL_DIRTY_IS_UEP, value, stats)
    }
    pub fn set_protection(&mut self, value: ProtectionKind, stats: &mut UpdaterStats) -> UpdateOutcome {
        let is_uep = matches!(value, ProtectionKind::Uep { .. });
        self.set_is_uep(is_uep, stats);
        let mut current = self.protection.unwrap_or(value);
        let outcome = update_field(&mut current, &mut self.dirty, SUBCHANNEL_DIRTY_PROTECTION, value, stats);
        self.protection = Some(current);
        outcome
    }
    pub fn is_complete(&self) -> bool {
        self.dirty & SUBCHANNEL_REQUIRED == SUBCHANNEL_REQUIRED
    }
}

impl LinkService {
    pub fn set_service_reference(&mut self, value: u32, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.service_reference, &mut self.dirty, LINK_SERVICE_DIRTY_SERVICE_REFERENCE, value, stats)
    }
    pub fn is_complete(&self) -> bool {
        self.dirty & LINK_SERVICE_REQUIRED == LINK_SERVICE_REQUIRED
    }
}

impl FrequencyService {
    pub fn set_link_service_number(&mut self, value: u16, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.link_service_number, &mut self.dirty, FREQUENCY_SERVICE_DIRTY_LSN, value, stats)
    }
}

impl OtherEnsemble {
    pub fn set_frequency(&mut self, value: u32, stats: &mut UpdaterStats) -> UpdateOutcome {
        update_field(&mut self.frequency, &mut self.dirty, OTHER_ENSEMBLE_DIRTY_FREQUENCY, value, stats)
    }
    pub fn is_complete(&self) -> bool {
        self.dirty & OTHER_ENSEMBLE_REQUIRED == OTHER_ENSEMBLE_REQUIRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_never_overwrites() {
        let mut stats = UpdaterStats::default();
        let mut ensemble = Ensemble::default();
        assert_eq!(ensemble.set_country_id(5, &mut stats), UpdateOutcome::Updated);
        assert_eq!(ensemble.set_country_id(5, &mut stats), UpdateOutcome::NoChange);
        assert_eq!(ensemble.set_country_id(6, &mut stats), UpdateOutcome::Conflict);
        assert_eq!(ensemble.country_id, 5);
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.updates, 1);
    }

    #[test]
    fn unset_extended_country_code_is_a_no_op() {
        let mut stats = UpdaterStats::default();
        let mut ensemble = Ensemble::default();
        assert_eq!(ensemble.set_extended_country_code(0x00, &mut stats), UpdateOutcome::NoChange);
        assert_eq!(stats.updates, 0);
        assert_eq!(stats.conflicts, 0);
    }

    #[test]
    fn completeness_tracks_required_mask() {
        let mut stats = UpdaterStats::default();
        let mut ensemble = Ensemble::default();
        assert!(!ensemble.is_complete());
        ensemble.set_country_id(1, &mut stats);
        ensemble.set_reference(0x1234, &mut stats);
        assert!(!ensemble.is_complete());
        ensemble.set_extended_country_code(0xE1, &mut stats);
        assert!(ensemble.is_complete());
    }
}
