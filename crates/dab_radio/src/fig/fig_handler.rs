//! The FIG handler interface: one default-implemented (no-op) method per FIG
//! type/extension call, named identically to the original `fig_handler_interface.h`.
//! A test (or a partial observer) can implement just the methods it cares about.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceIdentifier {
    pub country_id: u8,
    pub reference: u32,
    pub extended_country_code: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub mjd: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: Option<u8>,
    pub milliseconds: Option<u16>,
}

pub trait FigHandler {
    fn on_ensemble_1_id(&mut self, _country_id: u8, _reference: u16) {}
    fn on_ensemble_2_country(&mut self, _extended_country_code: u8) {}
    fn on_ensemble_2_local_time_offset(&mut self, _half_hours: i8) {}
    fn on_ensemble_2_service_country(&mut self, _service: ServiceIdentifier) {}
    fn on_ensemble_3_label(&mut self, _label: String, _charset_id: u8) {}

    fn on_subchannel_1_short(&mut self, _subchannel_id: u8, _start_address: u16, _table_switch: bool, _table_index: u8) {}
    fn on_subchannel_1_long(&mut self, _subchannel_id: u8, _start_address: u16, _option: u8, _protection_level: u8, _subchannel_size: u16) {}
    fn on_subchannel_2_fec(&mut self, _subchannel_id: u8, _fec_scheme: u8) {}

    fn on_service_1_programme_type(&mut self, _service_reference: u32, _international_table_id: u8, _programme_type: u8) {}
    fn on_service_2_label(&mut self, _service_reference: u32, _label: String, _charset_id: u8) {}

    fn on_service_component_1_stream_audio_type(&mut self, _service_reference: u32, _component_id: u8, _subchannel_id: u8, _audio_service_type: u8) {}
    fn on_service_component_1_stream_data_type(&mut self, _service_reference: u32, _component_id: u8, _subchannel_id: u8, _data_service_type: u8) {}
    fn on_service_component_1_packet_data_type(&mut self, _service_reference: u32, _component_id: u8, _global_id: u16) {}
    fn on_service_component_2_packet_data_type(&mut self, _global_id: u16, _append: bool) {}
    fn on_service_component_2_stream_conditional_access(&mut self, _subchannel_id: u8, _is_ca_applied: bool) {}
    fn on_service_component_3_short_language(&mut self, _subchannel_id: u8, _language_id: u8) {}
    fn on_service_component_3_long_language(&mut self, _global_id: u16, _language_id: u8) {}
    fn on_service_component_4_short_definition(&mut self, _service_reference: u32, _component_id: u8, _transport_mode: u8) {}
    fn on_service_component_4_long_definition(&mut self, _service_reference: u32, _component_id: u8, _transport_mode: u8) {}
    fn on_service_component_5_user_application(&mut self, _global_id: u16, _user_application_type: u16, _data: Vec<u8>) {}
    fn on_service_component_6_label(&mut self, _service_reference: u32, _component_id: u8, _label: String, _charset_id: u8) {}

    fn on_service_linkage_1_lsn_only(&mut self, _link_service_number: u16, _is_active: bool, _is_hard: bool, _is_international: bool) {}
    fn on_service_linkage_1_service_id(&mut self, _link_service_number: u16, _service: ServiceIdentifier) {}
    fn on_service_linkage_1_rds_pi_id(&mut self, _link_service_number: u16, _rds_pi: u16) {}
    fn on_service_linkage_1_drm_id(&mut self, _link_service_number: u16, _drm_id: u32) {}

    fn on_configuration_information_1(&mut self, _nb_services: u8, _reconfiguration_count: u16) {}
    fn on_date_time_1(&mut self, _datetime: DateTime) {}

    fn on_frequency_information_1_ensemble(&mut self, _ensemble_reference: u16, _frequency_hz: u32, _is_continuous_output: bool) {}
    fn on_frequency_information_1_rds_pi(&mut self, _rds_pi: u16, _frequency_hz: u32) {}
    fn on_frequency_information_1_drm(&mut self, _drm_id: u32, _frequency_hz: u32) {}
    fn on_frequency_information_1_amss(&mut self, _amss_id: u32, _frequency_hz: u32) {}

    fn on_other_ensemble_1_service(&mut self, _ensemble_reference: u16, _service: ServiceIdentifier) {}
}
