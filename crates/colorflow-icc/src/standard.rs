//! Built-in RGB profiles.

use crate::{IccError, IccResult, Profile};
use lcms2::{CIExyY, CIExyYTRIPLE, Profile as LcmsProfile, ToneCurve};

/// Standard RGB color spaces that can be synthesized without a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardProfile {
    /// IEC 61966-2-1 sRGB.
    Srgb,
    /// sRGB primaries, linear transfer.
    LinearSrgb,
    /// Adobe RGB (1998).
    AdobeRgb,
    /// Display P3.
    DisplayP3,
    /// ITU-R BT.2020, gamma 2.4.
    Rec2020,
    /// ACES AP1 / ACEScg, linear.
    AcesCg,
}

impl StandardProfile {
    /// Every standard profile.
    pub const ALL: [StandardProfile; 6] = [
        StandardProfile::Srgb,
        StandardProfile::LinearSrgb,
        StandardProfile::AdobeRgb,
        StandardProfile::DisplayP3,
        StandardProfile::Rec2020,
        StandardProfile::AcesCg,
    ];

    /// Option-friendly name.
    pub fn name(self) -> &'static str {
        match self {
            StandardProfile::Srgb => "srgb",
            StandardProfile::LinearSrgb => "linear-srgb",
            StandardProfile::AdobeRgb => "adobe-rgb",
            StandardProfile::DisplayP3 => "display-p3",
            StandardProfile::Rec2020 => "rec2020",
            StandardProfile::AcesCg => "acescg",
        }
    }

    /// Parses a name produced by [`StandardProfile::name`], ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Creates the profile.
    pub fn to_profile(self) -> IccResult<Profile> {
        let (white, primaries, gamma) = match self {
            StandardProfile::Srgb => return Ok(Profile::srgb()),
            StandardProfile::LinearSrgb => (D65, SRGB_PRIMARIES, 1.0),
            StandardProfile::AdobeRgb => (D65, xyy_triple([0.64, 0.33, 0.21, 0.71, 0.15, 0.06]), 2.2),
            StandardProfile::DisplayP3 => (D65, xyy_triple([0.68, 0.32, 0.265, 0.69, 0.15, 0.06]), 2.2),
            StandardProfile::Rec2020 => (D65, xyy_triple([0.708, 0.292, 0.17, 0.797, 0.131, 0.046]), 2.4),
            StandardProfile::AcesCg => (ACES_WHITE, xyy_triple([0.713, 0.293, 0.165, 0.83, 0.128, 0.044]), 1.0),
        };
        let curve = ToneCurve::new(gamma);
        let inner = LcmsProfile::new_rgb(&white, &primaries, &[&curve, &curve, &curve])
            .map_err(|e| IccError::CreateFailed(format!("{}: {e}", self.name())))?;
        Ok(Profile { inner })
    }
}

impl std::fmt::Display for StandardProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const D65: CIExyY = CIExyY {
    x: 0.3127,
    y: 0.3290,
    Y: 1.0,
};

// Approximately D60.
const ACES_WHITE: CIExyY = CIExyY {
    x: 0.32168,
    y: 0.33767,
    Y: 1.0,
};

const SRGB_PRIMARIES: CIExyYTRIPLE = xyy_triple([0.64, 0.33, 0.30, 0.60, 0.15, 0.06]);

/// Red, green and blue chromaticities as `[rx, ry, gx, gy, bx, by]`.
const fn xyy_triple(c: [f64; 6]) -> CIExyYTRIPLE {
    CIExyYTRIPLE {
        Red: CIExyY {
            x: c[0],
            y: c[1],
            Y: 1.0,
        },
        Green: CIExyY {
            x: c[2],
            y: c[3],
            Y: 1.0,
        },
        Blue: CIExyY {
            x: c[4],
            y: c[5],
            Y: 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_standards_are_rgb() {
        for standard in StandardProfile::ALL {
            let profile = standard.to_profile().unwrap();
            assert!(profile.is_rgb(), "{standard} should be RGB");
        }
    }

    #[test]
    fn test_parse_names() {
        for standard in StandardProfile::ALL {
            assert_eq!(StandardProfile::parse(standard.name()), Some(standard));
        }
        assert_eq!(StandardProfile::parse(" ACEScg "), Some(StandardProfile::AcesCg));
        assert_eq!(StandardProfile::parse("prophoto"), None);
    }
}
