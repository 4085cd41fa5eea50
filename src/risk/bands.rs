use crate::config::RiskBand;

/// Band for `score`: the highest-threshold band whose `min_score` the score
/// meets. Scores below every threshold land in the lowest band.
///
/// Returns `None` only for an empty band list.
pub fn assign_band(score: f64, bands: &[RiskBand]) -> Option<&str> {
    let met = bands
        .iter()
        .filter(|band| score >= band.min_score)
        .max_by(|a, b| a.min_score.total_cmp(&b.min_score));
    met.or_else(|| {
        bands
            .iter()
            .min_by(|a, b| a.min_score.total_cmp(&b.min_score))
    })
    .map(|band| band.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_bands;

    #[test]
    fn boundary_scores_take_the_band_they_meet() {
        let bands = default_bands();
        assert_eq!(assign_band(80.0, &bands), Some("P0"));
        assert_eq!(assign_band(79.999, &bands), Some("P1"));
        assert_eq!(assign_band(65.0, &bands), Some("P1"));
        assert_eq!(assign_band(50.0, &bands), Some("P2"));
        assert_eq!(assign_band(0.0, &bands), Some("P3"));
        assert_eq!(assign_band(100.0, &bands), Some("P0"));
    }

    #[test]
    fn order_of_bands_does_not_matter() {
        let mut bands = default_bands();
        bands.reverse();
        assert_eq!(assign_band(66.0, &bands), Some("P1"));
    }

    #[test]
    fn below_all_thresholds_uses_lowest_band() {
        let bands = vec![RiskBand::new("hot", 50.0), RiskBand::new("warm", 10.0)];
        assert_eq!(assign_band(3.0, &bands), Some("warm"));
        assert_eq!(assign_band(3.0, &[]), None);
    }
}
