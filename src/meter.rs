use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MetronomeError;

/// Time signatures the metronome can count in.
///
/// The beat count is what the scheduler cycles through; the denominator is
/// display metadata only (6/8 still clicks six equal beats).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Meter {
    /// 3/4 (waltz)
    ThreeFour,
    /// 4/4 (common time)
    #[default]
    FourFour,
    /// 5/4
    FiveFour,
    /// 6/8 (compound duple)
    SixEight,
}

impl Meter {
    pub const ALL: [Meter; 4] = [
        Meter::ThreeFour,
        Meter::FourFour,
        Meter::FiveFour,
        Meter::SixEight,
    ];

    /// Number of clicks per measure (numerator)
    pub fn beats_per_measure(self) -> u8 {
        match self {
            Meter::ThreeFour => 3,
            Meter::FourFour => 4,
            Meter::FiveFour => 5,
            Meter::SixEight => 6,
        }
    }

    /// Note value that gets one beat (4 = quarter, 8 = eighth)
    pub fn denominator(self) -> u8 {
        match self {
            Meter::SixEight => 8,
            _ => 4,
        }
    }

    /// Compound meters group beats in threes
    pub fn is_compound(self) -> bool {
        matches!(self, Meter::SixEight)
    }

    /// Look a meter up by its beat count.
    pub fn from_beats(beats: u8) -> Result<Self, MetronomeError> {
        match beats {
            3 => Ok(Meter::ThreeFour),
            4 => Ok(Meter::FourFour),
            5 => Ok(Meter::FiveFour),
            6 => Ok(Meter::SixEight),
            other => Err(MetronomeError::UnsupportedMeter(other)),
        }
    }

    /// The meter after this one, wrapping around (for a single "cycle" key).
    pub fn next(self) -> Self {
        match self {
            Meter::ThreeFour => Meter::FourFour,
            Meter::FourFour => Meter::FiveFour,
            Meter::FiveFour => Meter::SixEight,
            Meter::SixEight => Meter::ThreeFour,
        }
    }
}

impl TryFrom<u8> for Meter {
    type Error = MetronomeError;

    fn try_from(beats: u8) -> Result<Self, Self::Error> {
        Meter::from_beats(beats)
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure(), self.denominator())
    }
}
