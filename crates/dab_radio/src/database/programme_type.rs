//! DAB programme-type tables (ETSI TS 101 756 Table 12 and its North American
//! RBDS-aligned counterpart), selected per-ensemble by international table id.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DabProgrammeLabel {
    pub long_label: &'static str,
    pub short_label: &'static str,
}

macro_rules! pty {
    ($long:expr, $short:expr) => {
        DabProgrammeLabel { long_label: $long, short_label: $short }
    };
}

/// International table id 0 (ETSI default table).
pub static DAB_PROGRAMME_TYPE_TABLE_0: &[DabProgrammeLabel] = &[
    pty!("None", "None"),
    pty!("News", "News"),
    pty!("Current Affairs", "Affairs"),
    pty!("Information", "Info"),
    pty!("Sport", "Sport"),
    pty!("Education", "Educate"),
    pty!("Drama", "Drama"),
    pty!("Culture", "Culture"),
    pty!("Science", "Science"),
    pty!("Varied", "Varied"),
    pty!("Pop Music", "Pop Mus"),
    pty!("Rock Music", "Rock Mus"),
    pty!("Easy Listening Music", "Easy Mus"),
    pty!("Light Classical", "Lt Class"),
    pty!("Serious Classical", "Classics"),
    pty!("Other Music", "Other Mus"),
    pty!("Weather/meteorology", "Weather"),
    pty!("Finance/Business", "Finance"),
    pty!("Children's programmes", "Children"),
    pty!("Social Affairs", "Social"),
    pty!("Religion", "Religion"),
    pty!("Phone In", "Phone In"),
    pty!("Travel", "Travel"),
    pty!("Leisure", "Leisure"),
    pty!("Jazz Music", "Jazz"),
    pty!("Country Music", "Country"),
    pty!("National Music", "Nat Mus"),
    pty!("Oldies Music", "Oldies"),
    pty!("Folk Music", "Folk Mus"),
];

/// International table id 1 (North American RBDS-aligned variant).
pub static DAB_PROGRAMME_TYPE_TABLE_1: &[DabProgrammeLabel] = &[
    pty!("None", "None"),
    pty!("News", "News"),
    pty!("Information", "Info"),
    pty!("Sports", "Sports"),
    pty!("Talk", "Talk"),
    pty!("Rock", "Rock"),
    pty!("Classic Rock", "Cls Rock"),
    pty!("Adult Hits", "Adlt Hit"),
    pty!("Soft Rock", "Soft Rck"),
    pty!("Top 40", "Top 40"),
    pty!("Country", "Country"),
    pty!("Oldies", "Oldies"),
    pty!("Soft", "Soft"),
    pty!("Nostalgia", "Nostalgia"),
    pty!("Jazz", "Jazz"),
    pty!("Classical", "Classical"),
    pty!("Rhythm and Blues", "R & B"),
    pty!("Soft Rhythm and Blues", "Soft R&B"),
    pty!("Language", "Language"),
    pty!("Religious Music", "Rel Mus"),
    pty!("Religious Talk", "Rel Talk"),
    pty!("Personality", "Persnlty"),
    pty!("Public", "Public"),
    pty!("College", "College"),
];

/// Bounds-checked lookup; returns `None` outside the table's range rather than
/// panicking, per the core's never-panic policy.
pub fn lookup(international_table_id: u8, programme_type: u8) -> Option<DabProgrammeLabel> {
    let table = match international_table_id {
        0 => DAB_PROGRAMME_TYPE_TABLE_0,
        1 => DAB_PROGRAMME_TYPE_TABLE_1,
        _ => return None,
    };
    table.get(programme_type as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s10() {
        assert_eq!(lookup(0, 1).unwrap().long_label, "News");
        assert_eq!(lookup(0, 0).unwrap().long_label, "None");
    }

    #[test]
    fn out_of_range_is_none_not_a_panic() {
        assert_eq!(lookup(0, 255), None);
        assert_eq!(lookup(5, 0), None);
    }
}
