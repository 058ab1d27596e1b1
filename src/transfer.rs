use crate::enums::TransferPreset;

/// One intensity band of a preset: constant color, opacity ramping linearly
/// from `opacity_lo` at `lo` to `opacity_hi` at `hi`.
struct Segment {
    lo: f32,
    hi: f32,
    color: [f32; 3],
    opacity_lo: f32,
    opacity_hi: f32,
}

const BONE: &[Segment] = &[
    Segment {
        lo: 100.0,
        hi: 300.0,
        color: [0.75, 0.55, 0.45],
        opacity_lo: 0.0,
        opacity_hi: 0.08,
    },
    Segment {
        lo: 300.0,
        hi: 1500.0,
        color: [0.95, 0.92, 0.85],
        opacity_lo: 0.08,
        opacity_hi: 0.85,
    },
    Segment {
        lo: 1500.0,
        hi: f32::INFINITY,
        color: [1.0, 1.0, 0.98],
        opacity_lo: 0.85,
        opacity_hi: 0.85,
    },
];

const SOFT_TISSUE: &[Segment] = &[
    Segment {
        lo: -100.0,
        hi: -20.0,
        color: [0.85, 0.75, 0.4],
        opacity_lo: 0.0,
        opacity_hi: 0.05,
    },
    Segment {
        lo: -20.0,
        hi: 150.0,
        color: [0.8, 0.45, 0.35],
        opacity_lo: 0.05,
        opacity_hi: 0.35,
    },
    Segment {
        lo: 150.0,
        hi: 300.0,
        color: [0.9, 0.8, 0.75],
        opacity_lo: 0.35,
        opacity_hi: 0.5,
    },
];

const LUNG: &[Segment] = &[
    Segment {
        lo: -1000.0,
        hi: -700.0,
        color: [0.45, 0.6, 0.75],
        opacity_lo: 0.0,
        opacity_hi: 0.12,
    },
    Segment {
        lo: -700.0,
        hi: -300.0,
        color: [0.7, 0.75, 0.8],
        opacity_lo: 0.12,
        opacity_hi: 0.3,
    },
];

const ANGIO: &[Segment] = &[
    Segment {
        lo: 150.0,
        hi: 400.0,
        color: [0.85, 0.15, 0.1],
        opacity_lo: 0.0,
        opacity_hi: 0.5,
    },
    Segment {
        lo: 400.0,
        hi: 1200.0,
        color: [1.0, 0.35, 0.25],
        opacity_lo: 0.5,
        opacity_hi: 0.9,
    },
];

impl TransferPreset {
    fn segments(self) -> &'static [Segment] {
        match self {
            TransferPreset::Bone => BONE,
            TransferPreset::SoftTissue => SOFT_TISSUE,
            TransferPreset::Lung => LUNG,
            TransferPreset::Angio => ANGIO,
        }
    }

    /// RGBA contribution for a physical intensity. Pure lookup; intensities
    /// outside every band contribute nothing.
    pub fn sample(self, intensity: f32) -> [f32; 4] {
        for segment in self.segments() {
            if intensity >= segment.lo && intensity < segment.hi {
                let t = if segment.hi.is_finite() {
                    (intensity - segment.lo) / (segment.hi - segment.lo)
                } else {
                    0.0
                };
                let opacity = segment.opacity_lo.mul_add(1.0 - t, segment.opacity_hi * t);
                return [segment.color[0], segment.color[1], segment.color[2], opacity];
            }
        }
        [0.0, 0.0, 0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bone_is_transparent_below_threshold() {
        assert_eq!(TransferPreset::Bone.sample(0.0)[3], 0.0);
        assert_eq!(TransferPreset::Bone.sample(99.9)[3], 0.0);
    }

    #[test]
    fn bone_opacity_ramps_up_through_dense_band() {
        let low = TransferPreset::Bone.sample(350.0)[3];
        let high = TransferPreset::Bone.sample(1400.0)[3];
        assert!(low < high);
        assert!(high <= 0.85 + 1e-6);
    }

    #[test]
    fn bone_holds_terminal_opacity_above_last_band() {
        assert!((TransferPreset::Bone.sample(5000.0)[3] - 0.85).abs() < 1e-6);
    }

    #[test]
    fn lung_covers_negative_intensities_only() {
        assert!(TransferPreset::Lung.sample(-800.0)[3] > 0.0);
        assert_eq!(TransferPreset::Lung.sample(0.0)[3], 0.0);
    }

    #[test]
    fn angio_starts_at_contrast_threshold() {
        assert_eq!(TransferPreset::Angio.sample(100.0)[3], 0.0);
        assert!(TransferPreset::Angio.sample(300.0)[3] > 0.0);
    }

    #[test]
    fn opacity_is_continuous_at_band_joins() {
        for preset in [
            TransferPreset::Bone,
            TransferPreset::SoftTissue,
            TransferPreset::Lung,
            TransferPreset::Angio,
        ] {
            for segment in preset.segments().windows(2) {
                let below = preset.sample(segment[0].hi - 1e-3)[3];
                let above = preset.sample(segment[1].lo + 1e-3)[3];
                assert!((below - above).abs() < 1e-2);
            }
        }
    }
}
