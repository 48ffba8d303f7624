/// The four transmission modes defined by ETSI EN 300 401.
///
/// Each mode trades off FFT resolution against symbol duration, which in turn
/// determines how well a receiver tolerates Doppler spread versus multipath delay
/// spread. Mode I is the most common for terrestrial VHF Band III broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DabTransmissionMode {
    I,
    II,
    III,
    IV,
}
