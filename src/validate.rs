//! Route selection and multi-echo validation
//!
//! A directory with exactly one magnitude, phase and sidecar file is used as-is.
//! Anything else is treated as a multi-echo acquisition and must pass:
//! - echo-key filter (files without `echo-` are dropped)
//! - single-acquisition check (names agree once the echo key is removed)
//! - magnitude/phase echo count agreement
//! - contiguous echo numbering `1..=N`, which also fixes the merge order

use std::path::Path;

use log::{debug, info, warn};

use crate::bids::{acquisition_key, has_echo_key, Modality};
use crate::error::{ConvertError, Result};
use crate::scan::{FileEntry, FileList};

/// Raw scan results for the three modalities
#[derive(Clone, Debug)]
pub struct Discovered {
    pub magnitude: FileList,
    pub phase: FileList,
    pub sidecars: FileList,
}

/// Conversion path chosen from the discovered file counts
#[derive(Clone, Debug)]
pub enum Route {
    /// One file of each kind; outputs are the inputs, no merge
    SingleEcho {
        magnitude: FileEntry,
        phase: FileEntry,
        sidecar: FileEntry,
    },
    /// Anything with more than one file of a kind
    MultiEcho(Discovered),
}

/// Files ordered so that `files[i]` holds echo `i + 1`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EchoSeries {
    modality: Modality,
    files: Vec<FileEntry>,
}

impl EchoSeries {
    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn first(&self) -> Option<&FileEntry> {
        self.files.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.files.iter()
    }
}

/// Output of a successful multi-echo validation
#[derive(Clone, Debug)]
pub struct ValidatedEchoes {
    pub magnitude: EchoSeries,
    pub phase: EchoSeries,
    /// Sidecars sorted by echo number
    pub sidecars: Vec<FileEntry>,
}

/// Pick the single- or multi-echo route.
///
/// Fails with [`ConvertError::MissingInput`] if any modality has no files.
pub fn select_route(dir: &Path, discovered: Discovered) -> Result<Route> {
    for (modality, list) in [
        (Modality::Magnitude, &discovered.magnitude),
        (Modality::Phase, &discovered.phase),
        (Modality::Sidecar, &discovered.sidecars),
    ] {
        if list.is_empty() {
            return Err(ConvertError::MissingInput {
                modality,
                dir: dir.to_path_buf(),
            });
        }
    }

    let Discovered {
        mut magnitude,
        mut phase,
        mut sidecars,
    } = discovered;

    if magnitude.len() == 1 && phase.len() == 1 && sidecars.len() == 1 {
        info!("single-echo input detected");
        // each list holds exactly one entry
        return Ok(Route::SingleEcho {
            magnitude: magnitude.remove(0),
            phase: phase.remove(0),
            sidecar: sidecars.remove(0),
        });
    }

    info!(
        "multi-echo input detected ({} magnitude, {} phase, {} sidecar files)",
        magnitude.len(),
        phase.len(),
        sidecars.len()
    );
    Ok(Route::MultiEcho(Discovered {
        magnitude,
        phase,
        sidecars,
    }))
}

/// Drop entries without an `echo-` key; fail if none remain.
pub fn filter_echo_key(list: FileList, modality: Modality) -> Result<FileList> {
    let total = list.len();
    let kept: FileList = list
        .into_iter()
        .filter(|entry| {
            let keep = has_echo_key(&entry.file_name());
            if !keep {
                debug!("ignoring {} without echo key: {}", modality, entry.file_name());
            }
            keep
        })
        .collect();

    if kept.is_empty() {
        return Err(ConvertError::NoEchoKey { modality });
    }
    info!("{}: {} of {} files carry an echo key", modality, kept.len(), total);
    Ok(kept)
}

/// Check every entry shares the first entry's acquisition key (case-insensitive).
pub fn check_single_acquisition(list: &[FileEntry], modality: Modality) -> Result<()> {
    let Some((first, rest)) = list.split_first() else {
        return Ok(());
    };
    let first_name = first.file_name();
    let reference = acquisition_key(&first_name);

    for entry in rest {
        let name = entry.file_name();
        if acquisition_key(&name) != reference {
            return Err(ConvertError::MixedAcquisition {
                modality,
                first: first_name,
                second: name,
            });
        }
    }
    info!("{}: all files belong to one acquisition", modality);
    Ok(())
}

/// Place each entry at `slot[echo - 1]`.
///
/// Every echo in `1..=N` (N = number of entries) must appear exactly once.
pub fn order_by_echo(list: FileList, modality: Modality) -> Result<EchoSeries> {
    let n = list.len();
    let mut slots: Vec<Option<FileEntry>> = vec![None; n];
    let mut found = Vec::with_capacity(n);
    let mut complete = true;

    for entry in &list {
        let echo = entry.echo.ok_or_else(|| ConvertError::MalformedEchoKey {
            file: entry.file_name(),
        })?;
        found.push(echo.get());
        match slots.get_mut(echo.slot()) {
            Some(slot) if slot.is_none() => *slot = Some(entry.clone()),
            _ => complete = false,
        }
    }

    if !complete || slots.iter().any(Option::is_none) {
        found.sort_unstable();
        return Err(ConvertError::EchoIndexGap {
            modality,
            expected: n,
            found,
        });
    }

    Ok(EchoSeries {
        modality,
        files: slots.into_iter().flatten().collect(),
    })
}

/// Run the full multi-echo validation on scan results.
pub fn validate_multi_echo(discovered: Discovered) -> Result<ValidatedEchoes> {
    let magnitude = filter_echo_key(discovered.magnitude, Modality::Magnitude)?;
    check_single_acquisition(&magnitude, Modality::Magnitude)?;

    let phase = filter_echo_key(discovered.phase, Modality::Phase)?;
    check_single_acquisition(&phase, Modality::Phase)?;

    let mut sidecars = filter_echo_key(discovered.sidecars, Modality::Sidecar)?;
    check_single_acquisition(&sidecars, Modality::Sidecar)?;

    if magnitude.len() != phase.len() {
        return Err(ConvertError::CountMismatch {
            magnitude: magnitude.len(),
            phase: phase.len(),
        });
    }

    let magnitude = order_by_echo(magnitude, Modality::Magnitude)?;
    let phase = order_by_echo(phase, Modality::Phase)?;

    if let Some(bad) = sidecars.iter().find(|entry| entry.echo.is_none()) {
        return Err(ConvertError::MalformedEchoKey {
            file: bad.file_name(),
        });
    }
    sidecars.sort_by_key(|entry| entry.echo);
    if sidecars.len() != magnitude.len() {
        warn!(
            "{} sidecar(s) for {} echoes; echo times follow sidecar order",
            sidecars.len(),
            magnitude.len()
        );
    }

    info!("validated {} echoes", magnitude.len());
    Ok(ValidatedEchoes {
        magnitude,
        phase,
        sidecars,
    })
}
