//! ECG lead identifiers
//!
//! Covers the standard 12-lead set plus the right-sided and posterior leads used on
//! pediatric tracings (V3R, V4R, V7).
//!
//! **Panel Layout**:
//! A printed 12-lead ECG is laid out as four columns of simultaneously recorded panels:
//! - Column 0: I, II, III
//! - Column 1: aVR, aVL, aVF
//! - Column 2: V1, V2, V3 (and V3R, V4R on pediatric layouts)
//! - Column 3: V4, V5, V6 (and V7)
//!
//! Leads sharing a column were recorded over the same time span, so they must share one
//! time origin after pixel-to-time conversion.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Number of printed panel columns on a standard layout
pub const NUM_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lead {
    I,
    II,
    III,
    #[serde(rename = "aVR")]
    AVR,
    #[serde(rename = "aVL")]
    AVL,
    #[serde(rename = "aVF")]
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V3R,
    V4R,
    V7,
}

impl Lead {
    /// Standard 12 leads in conventional print order
    pub const STANDARD: [Lead; 12] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    /// Printed panel column this lead belongs to
    pub fn column(&self) -> usize {
        match self {
            Lead::I | Lead::II | Lead::III => 0,
            Lead::AVR | Lead::AVL | Lead::AVF => 1,
            Lead::V1 | Lead::V2 | Lead::V3 | Lead::V3R | Lead::V4R => 2,
            Lead::V4 | Lead::V5 | Lead::V6 | Lead::V7 => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lead::I => "I",
            Lead::II => "II",
            Lead::III => "III",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
            Lead::V3R => "V3R",
            Lead::V4R => "V4R",
            Lead::V7 => "V7",
        }
    }
}

impl Display for Lead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unable to parse \"{value}\" as a Lead"))]
pub struct ParseLeadError {
    value: String,
}

impl FromStr for Lead {
    type Err = ParseLeadError;

    /// Parses lead labels case-insensitively ("avr", "aVR" and "AVR" are all accepted)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lead = match s.trim().to_ascii_uppercase().as_str() {
            "I" => Lead::I,
            "II" => Lead::II,
            "III" => Lead::III,
            "AVR" => Lead::AVR,
            "AVL" => Lead::AVL,
            "AVF" => Lead::AVF,
            "V1" => Lead::V1,
            "V2" => Lead::V2,
            "V3" => Lead::V3,
            "V4" => Lead::V4,
            "V5" => Lead::V5,
            "V6" => Lead::V6,
            "V3R" => Lead::V3R,
            "V4R" => Lead::V4R,
            "V7" => Lead::V7,
            _ => {
                return Err(ParseLeadError {
                    value: s.to_string(),
                })
            }
        };
        Ok(lead)
    }
}
