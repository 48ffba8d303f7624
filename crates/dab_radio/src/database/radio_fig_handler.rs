//! Adapts decoded FIG fields into ensemble database updater calls.
//!
//! This is the one handler that must run synchronously, in-line, on the FIC
//! decoding thread: FIG order within a FIB matters for some extensions (e.g. a
//! protection-kind setter must run before completeness is re-checked), so it is
//! a plain trait-object call (`Box<dyn FigHandler + Send>`), not a channel.

use crate::database::entities::{Database, FrequencyService, ProtectionKind, Service, ServiceComponent, TransportMode};
use crate::database::updater::UpdaterStats;
use crate::fig::fig_handler::{DateTime, FigHandler, ServiceIdentifier};

/// Extended country code `0x00` is documented by the original as "unset". Some
/// transmitters legitimately use `0x00` for Europe; exposed as a named constant
/// so a deployment can override the policy without touching parse logic.
pub const UNSET_EXTENDED_COUNTRY_CODE: u8 = 0x00;

pub struct RadioFigHandler {
    pub database: Database,
    pub stats: UpdaterStats,
}

impl RadioFigHandler {
    pub fn new() -> Self {
        Self { database: Database::default(), stats: UpdaterStats::default() }
    }

    fn service_mut(&mut self, reference: u32) -> &mut Service {
        if self.database.find_service(reference).is_none() {
            self.database.services.push(Service { reference, ..Default::default() });
        }
        let index = self.database.find_service(reference).unwrap();
        &mut self.database.services[index]
    }

    fn component_mut(&mut self, service_reference: u32, component_id: u8) -> &mut ServiceComponent {
        if self.database.find_component(service_reference, component_id).is_none() {
            self.database.components.push(ServiceComponent { service_reference, component_id, ..Default::default() });
        }
        let index = self.database.find_component(service_reference, component_id).unwrap();
        &mut self.database.components[index]
    }

    fn subchannel_mut(&mut self, id: u8) -> &mut crate::database::entities::Subchannel {
        if self.database.find_subchannel(id).is_none() {
            self.database.subchannels.push(crate::database::entities::Subchannel { id, ..Default::default() });
        }
        let index = self.database.find_subchannel(id).unwrap();
        &mut self.database.subchannels[index]
    }

    fn link_service_mut(&mut self, link_service_number: u16) -> &mut crate::database::entities::LinkService {
        if !self.database.link_services.iter().any(|l| l.link_service_number == link_service_number) {
            self.database.link_services.push(crate::database::entities::LinkService { link_service_number, ..Default::default() });
        }
        let index = self.database.link_services.iter().position(|l| l.link_service_number == link_service_number).unwrap();
        &mut self.database.link_services[index]
    }

    fn fm_service_mut(&mut self, lsn: u16) -> &mut FrequencyService {
        if let Some(pos) = self.database.fm_services.iter().position(|s| s.link_service_number == lsn) {
            &mut self.database.fm_services[pos]
        } else {
            self.database.fm_services.push(FrequencyService { link_service_number: lsn, ..Default::default() });
            self.database.fm_services.last_mut().unwrap()
        }
    }
}

impl Default for RadioFigHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FigHandler for RadioFigHandler {
    fn on_ensemble_1_id(&mut self, country_id: u8, reference: u16) {
        self.database.ensemble.set_country_id(country_id, &mut self.stats);
        self.database.ensemble.set_reference(reference, &mut self.stats);
    }

    fn on_ensemble_2_country(&mut self, extended_country_code: u8) {
        self.database.ensemble.set_extended_country_code(extended_country_code, &mut self.stats);
    }

    fn on_ensemble_2_local_time_offset(&mut self, half_hours: i8) {
        self.database.ensemble.set_local_time_offset_half_hours(half_hours, &mut self.stats);
    }

    fn on_ensemble_2_service_country(&mut self, service: ServiceIdentifier) {
        let component = self.service_mut(service.reference);
        component.set_country_id(service.country_id, &mut self.stats);
    }

    fn on_ensemble_3_label(&mut self, label: String, _charset_id: u8) {
        self.database.ensemble.label = Some(label);
    }

    fn on_subchannel_1_short(&mut self, subchannel_id: u8, start_address: u16, table_switch: bool, table_index: u8) {
        let subchannel = self.subchannel_mut(subchannel_id);
        subchannel.set_start_address(start_address, &mut self.stats);
        let _ = table_switch;
        subchannel.set_protection(ProtectionKind::Uep { table_index }, &mut self.stats);
    }

    fn on_subchannel_1_long(&mut self, subchannel_id: u8, start_address: u16, _option: u8, protection_level: u8, subchannel_size: u16) {
        let subchannel = self.subchannel_mut(subchannel_id);
        subchannel.set_start_address(start_address, &mut self.stats);
        subchannel.set_length(subchannel_size, &mut self.stats);
        subchannel.set_protection(ProtectionKind::Eep { level: protection_level, is_type_b: false }, &mut self.stats);
    }

    fn on_subchannel_2_fec(&mut self, subchannel_id: u8, fec_scheme: u8) {
        self.subchannel_mut(subchannel_id).fec_scheme = fec_scheme;
    }

    fn on_service_1_programme_type(&mut self, service_reference: u32, international_table_id: u8, programme_type: u8) {
        let service = self.service_mut(service_reference);
        service.programme_type = programme_type;
        let _ = international_table_id;
    }

    fn on_service_2_label(&mut self, service_reference: u32, label: String, _charset_id: u8) {
        self.service_mut(service_reference).label = Some(label);
    }

    fn on_service_component_1_stream_audio_type(&mut self, service_reference: u32, component_id: u8, subchannel_id: u8, audio_service_type: u8) {
        let component = self.component_mut(service_reference, component_id);
        component.set_service_reference(service_reference, &mut self.stats);
        component.set_component_id(component_id, &mut self.stats);
        component.set_subchannel_id(subchannel_id, &mut self.stats);
        component.set_audio_service_type(audio_service_type, &mut self.stats);
        component.set_transport_mode(TransportMode::StreamAudio, &mut self.stats);
    }

    fn on_service_component_1_stream_data_type(&mut self, service_reference: u32, component_id: u8, subchannel_id: u8, data_service_type: u8) {
        let component = self.component_mut(service_reference, component_id);
        component.set_service_reference(service_reference, &mut self.stats);
        component.set_component_id(component_id, &mut self.stats);
        component.set_subchannel_id(subchannel_id, &mut self.stats);
        component.set_data_service_type(data_service_type, &mut self.stats);
        component.set_transport_mode(TransportMode::StreamData, &mut self.stats);
    }

    fn on_service_component_1_packet_data_type(&mut self, service_reference: u32, component_id: u8, global_id: u16) {
        let component = self.component_mut(service_reference, component_id);
        component.set_service_reference(service_reference, &mut self.stats);
        component.set_component_id(component_id, &mut self.stats);
        component.global_id = Some(global_id as u32);
        component.set_transport_mode(TransportMode::PacketData, &mut self.stats);
    }

    fn on_service_component_2_stream_conditional_access(&mut self, subchannel_id: u8, is_ca_applied: bool) {
        self.subchannel_mut(subchannel_id).is_ca_applied = is_ca_applied;
    }

    fn on_service_component_3_short_language(&mut self, subchannel_id: u8, language_id: u8) {
        let owner = self
            .database
            .components
            .iter()
            .find(|c| c.subchannel_id == Some(subchannel_id))
            .map(|c| c.service_reference);
        if let Some(service_reference) = owner {
            self.service_mut(service_reference).language_id = language_id;
        }
    }

    fn on_service_component_3_long_language(&mut self, global_id: u16, language_id: u8) {
        let owner = self
            .database
            .components
            .iter()
            .find(|c| c.global_id == Some(global_id as u32))
            .map(|c| c.service_reference);
        if let Some(service_reference) = owner {
            self.service_mut(service_reference).language_id = language_id;
        }
    }

    fn on_service_component_4_short_definition(&mut self, service_reference: u32, component_id: u8, transport_mode: u8) {
        self.component_mut(service_reference, component_id).global_definition = Some(transport_mode);
    }

    fn on_service_component_4_long_definition(&mut self, service_reference: u32, component_id: u8, transport_mode: u8) {
        self.component_mut(service_reference, component_id).global_definition = Some(transport_mode);
    }

    fn on_service_component_5_user_application(&mut self, global_id: u16, user_application_type: u16, data: Vec<u8>) {
        let owner = self.database.components.iter().position(|c| c.global_id == Some(global_id as u32));
        if let Some(index) = owner {
            self.database.components[index].user_applications.push((user_application_type, data));
        }
    }

    fn on_service_component_6_label(&mut self, service_reference: u32, component_id: u8, label: String, _charset_id: u8) {
        self.component_mut(service_reference, component_id).label = Some(label);
    }

    fn on_service_linkage_1_lsn_only(&mut self, link_service_number: u16, is_active: bool, is_hard: bool, is_international: bool) {
        if self.database.link_services.iter().any(|l| l.link_service_number == link_service_number) {
            return;
        }
        self.database.link_services.push(crate::database::entities::LinkService {
            link_service_number,
            is_active,
            is_hard_linked: is_hard,
            is_international,
            ..Default::default()
        });
    }

    fn on_service_linkage_1_service_id(&mut self, link_service_number: u16, service: ServiceIdentifier) {
        self.link_service_mut(link_service_number).set_service_reference(service.reference, &mut self.stats);
    }

    fn on_service_linkage_1_rds_pi_id(&mut self, link_service_number: u16, rds_pi: u16) {
        self.link_service_mut(link_service_number).set_service_reference(rds_pi as u32, &mut self.stats);
    }

    fn on_service_linkage_1_drm_id(&mut self, link_service_number: u16, drm_id: u32) {
        self.link_service_mut(link_service_number).set_service_reference(drm_id, &mut self.stats);
    }

    fn on_configuration_information_1(&mut self, nb_services: u8, reconfiguration_count: u16) {
        self.database.ensemble.nb_services = nb_services;
        if self.database.ensemble.set_reconfiguration_count(reconfiguration_count, &mut self.stats) {
            self.database.reset_all_dirty_masks();
        }
    }

    fn on_frequency_information_1_rds_pi(&mut self, rds_pi: u16, frequency_hz: u32) {
        self.fm_service_mut(rds_pi).add_frequency(frequency_hz);
    }

    fn on_frequency_information_1_drm(&mut self, drm_id: u32, frequency_hz: u32) {
        let lsn = (drm_id & 0xFFFF) as u16;
        if let Some(pos) = self.database.drm_services.iter().position(|s| s.link_service_number == lsn) {
            self.database.drm_services[pos].add_frequency(frequency_hz);
        } else {
            let mut service = FrequencyService { link_service_number: lsn, ..Default::default() };
            service.add_frequency(frequency_hz);
            self.database.drm_services.push(service);
        }
    }

    fn on_frequency_information_1_amss(&mut self, amss_id: u32, frequency_hz: u32) {
        let lsn = (amss_id & 0xFFFF) as u16;
        if let Some(pos) = self.database.amss_services.iter().position(|s| s.link_service_number == lsn) {
            self.database.amss_services[pos].add_frequency(frequency_hz);
        } else {
            let mut service = FrequencyService { link_service_number: lsn, ..Default::default() };
            service.add_frequency(frequency_hz);
            self.database.amss_services.push(service);
        }
    }

    fn on_other_ensemble_1_service(&mut self, ensemble_reference: u16, _service: ServiceIdentifier) {
        if let Some(pos) = self.database.other_ensembles.iter().position(|o| o.ensemble_reference == ensemble_reference) {
            let _ = pos;
        } else {
            self.database.other_ensembles.push(crate::database::entities::OtherEnsemble { ensemble_reference, ..Default::default() });
        }
    }

    fn on_date_time_1(&mut self, datetime: DateTime) {
        let date = dab_core::modified_julian_date::mjd_to_ymd(datetime.mjd as i64);
        self.database.current_date_time = Some(crate::database::entities::CurrentDateTime {
            year: date.year,
            month: date.month,
            day: date.day,
            hours: datetime.hours,
            minutes: datetime.minutes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subchannel_and_component_stay_consistent() {
        let mut handler = RadioFigHandler::new();
        handler.on_subchannel_1_long(3, 10, 0, 1, 24);
        handler.on_service_component_1_stream_audio_type(0x4001, 0, 3, 0);
        assert!(handler.database.is_consistent());
        assert_eq!(handler.database.subchannels.len(), 1);
        assert_eq!(handler.database.components.len(), 1);
    }

    #[test]
    fn conflicting_country_id_is_a_conflict_not_an_overwrite() {
        let mut handler = RadioFigHandler::new();
        handler.on_ensemble_1_id(1, 0x100);
        handler.on_ensemble_1_id(2, 0x100);
        assert_eq!(handler.database.ensemble.country_id, 1);
        assert_eq!(handler.stats.conflicts, 1);
    }
}
