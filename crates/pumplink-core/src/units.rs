//! Unit Conversion Functions
//!
//! The firmware works in psi; the host application displays and stores
//! pressure in MPa.

/// Convert psi to MPa
pub fn psi_to_mpa(psi: f64) -> f64 {
    psi * 0.006894757293168361
}

/// Convert MPa to psi
pub fn mpa_to_psi(mpa: f64) -> f64 {
    mpa / 0.006894757293168361
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psi_mpa_conversion() {
        assert!((psi_to_mpa(2000.0) - 13.78951).abs() < 0.001);
        assert!((psi_to_mpa(6000.0) - 41.36854).abs() < 0.001);
        assert!((mpa_to_psi(13.78951) - 2000.0).abs() < 0.01);
    }

    #[test]
    fn test_round_trip() {
        let psi = 4321.0;
        assert!((mpa_to_psi(psi_to_mpa(psi)) - psi).abs() < 1e-9);
    }
}
