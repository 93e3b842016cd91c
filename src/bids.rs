//! BIDS filename key grammar
//!
//! GRE acquisitions are identified purely by `key-value` segments in the
//! filename: `part-mag` / `part-phase` select the modality and `echo-<n>`
//! carries the 1-based echo number (leading zeros allowed). All matching is
//! case-insensitive.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::OnceLock;

use regex::Regex;

/// The `echo-` key as it appears in BIDS names
pub const ECHO_KEY: &str = "echo-";

fn echo_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)echo-(\d*)").expect("echo pattern is valid"))
}

/// The three inputs a conversion needs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modality {
    /// `*part-mag*.nii[.gz]`
    Magnitude,
    /// `*part-phase*.nii[.gz]`
    Phase,
    /// `*part-mag*.json`
    Sidecar,
}

impl Modality {
    /// Filename key that selects this modality
    pub fn part_key(self) -> &'static str {
        match self {
            Modality::Magnitude | Modality::Sidecar => "part-mag",
            Modality::Phase => "part-phase",
        }
    }

    /// File extension family for this modality
    pub fn extension(self) -> Extension {
        match self {
            Modality::Magnitude | Modality::Phase => Extension::Nifti,
            Modality::Sidecar => Extension::Json,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modality::Magnitude => "magnitude",
            Modality::Phase => "phase",
            Modality::Sidecar => "JSON sidecar",
        })
    }
}

/// Extension families recognised by the scanner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extension {
    /// `.nii` or `.nii.gz`
    Nifti,
    /// `.json`
    Json,
}

impl Extension {
    /// Check a filename against this extension, ignoring case
    pub fn matches(self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        match self {
            Extension::Nifti => lower.ends_with(".nii") || lower.ends_with(".nii.gz"),
            Extension::Json => lower.ends_with(".json"),
        }
    }
}

/// 1-based echo number parsed from an `echo-<digits>` key
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EchoIndex(NonZeroU32);

impl EchoIndex {
    pub fn new(index: u32) -> Option<Self> {
        NonZeroU32::new(index).map(EchoIndex)
    }

    /// Parse the first `echo-<digits>` key in a filename.
    ///
    /// Returns `None` when there is no key, no digits, or the number is zero.
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = echo_pattern().captures(file_name)?;
        let digits = caps.get(1)?.as_str();
        digits.parse::<u32>().ok().and_then(EchoIndex::new)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Zero-based slot in an echo-ordered buffer
    pub fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for EchoIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True when the name contains the literal `echo-` key (any case)
pub fn has_echo_key(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().contains(ECHO_KEY)
}

/// Filename with the `echo-<n>` segment removed, lowercased.
///
/// Two files of the same acquisition share this key.
pub fn acquisition_key(file_name: &str) -> String {
    echo_pattern()
        .replace_all(file_name, "")
        .to_ascii_lowercase()
}
