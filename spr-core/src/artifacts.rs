//! Renames instrument-exported curve images so each channel's picture carries
//! the compound solution label and the run it came from.
//!
//! The instrument names images `<channel>-<anything>.png`. Each file is paired
//! with the kinetics row of the same channel and renamed to
//! `<solution>_<raw data file>_<NN>_<channel>.png`, where `NN` is a random
//! number in 10..=98 drawn once per directory so a re-run of the same compound
//! on the same day does not reuse names.

use crate::domain::{Channel, ImageKind, KineticsRow};
use crate::error::{Result, SprError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageArtifact {
    pub channel: Channel,
    pub file_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    pub disambiguator: u8,
    /// New file name owned by each channel.
    pub renamed: BTreeMap<Channel, String>,
    /// Images whose channel has no kinetics row; left untouched.
    pub unmatched_files: Vec<String>,
}

/// Random value in 10..=98.
pub fn random_disambiguator() -> Result<u8> {
    let mut buf = [0u8; 2];
    getrandom::getrandom(&mut buf)?;
    Ok(10 + (u16::from_le_bytes(buf) % 89) as u8)
}

fn channel_prefix(file_name: &str) -> Option<Channel> {
    let prefix = file_name.split('-').next()?.trim();
    prefix.parse::<i64>().ok().and_then(|n| Channel::new(n).ok())
}

fn is_png(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// PNG files directly inside `dir`, ascending by channel.
pub fn scan_images(dir: &Path) -> Result<Vec<ImageArtifact>> {
    if !dir.is_dir() {
        return Err(SprError::input(dir, "image directory not found"));
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| SprError::input(dir, e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !is_png(&file_name) {
            continue;
        }
        let channel = channel_prefix(&file_name).ok_or_else(|| {
            SprError::input(
                dir,
                format!("image '{file_name}' does not start with a channel number"),
            )
        })?;
        found.push(ImageArtifact { channel, file_name });
    }
    found.sort_by(|a, b| a.channel.cmp(&b.channel).then(a.file_name.cmp(&b.file_name)));
    if let Some(w) = found.windows(2).find(|w| w[0].channel == w[1].channel) {
        return Err(SprError::input(
            dir,
            format!(
                "channel {} has more than one image ('{}', '{}')",
                w[0].channel, w[0].file_name, w[1].file_name
            ),
        ));
    }
    Ok(found)
}

pub fn artifact_name(
    solution: &str,
    raw_data_file: &str,
    disambiguator: u8,
    channel: Channel,
) -> String {
    format!("{solution}_{raw_data_file}_{disambiguator}_{channel}.png")
}

/// Renames decided for one directory but not yet carried out.
#[derive(Clone, Debug)]
pub struct RenamePlan {
    dir: PathBuf,
    kind: ImageKind,
    moves: Vec<(String, String)>,
    outcome: RenameOutcome,
}

/// Works out the new name of every image in `dir` that has a kinetics row on
/// the same channel. Nothing on disk changes.
pub fn plan_renames(
    dir: &Path,
    kind: ImageKind,
    kinetics: &[KineticsRow],
    raw_data_file: &str,
    disambiguator: u8,
) -> Result<RenamePlan> {
    let images = scan_images(dir)?;
    let solutions: BTreeMap<Channel, &str> = kinetics
        .iter()
        .map(|r| (r.channel, r.solution.as_str()))
        .collect();

    let mut outcome = RenameOutcome {
        disambiguator,
        ..RenameOutcome::default()
    };
    let mut moves = Vec::with_capacity(images.len());
    for img in images {
        match solutions.get(&img.channel) {
            Some(solution) => {
                let new_name = artifact_name(solution, raw_data_file, disambiguator, img.channel);
                if new_name != img.file_name && dir.join(&new_name).exists() {
                    return Err(SprError::input(
                        dir,
                        format!("refusing to overwrite existing image '{new_name}'"),
                    ));
                }
                outcome.renamed.insert(img.channel, new_name.clone());
                moves.push((img.file_name, new_name));
            }
            None => {
                tracing::warn!(
                    kind = %kind,
                    channel = %img.channel,
                    file = %img.file_name,
                    "image has no kinetics row on its channel; left unchanged"
                );
                outcome.unmatched_files.push(img.file_name);
            }
        }
    }

    Ok(RenamePlan {
        dir: dir.to_path_buf(),
        kind,
        moves,
        outcome,
    })
}

impl RenamePlan {
    /// Names the images will carry once the plan is applied.
    pub fn outcome(&self) -> &RenameOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> RenameOutcome {
        self.outcome
    }

    /// Carries out every rename. A failure part way undoes the ones already done.
    pub fn apply(&self) -> Result<()> {
        for (done, (from, to)) in self.moves.iter().enumerate() {
            if let Err(e) = std::fs::rename(self.dir.join(from), self.dir.join(to)) {
                self.undo(&self.moves[..done]);
                return Err(e.into());
            }
            tracing::debug!(kind = %self.kind, %from, %to, "image renamed");
        }

        if self.moves.is_empty() {
            tracing::warn!(kind = %self.kind, dir = %self.dir.display(), "no images renamed");
        } else {
            tracing::info!(kind = %self.kind, count = self.moves.len(), "images renamed");
        }
        Ok(())
    }

    /// Puts every image back under its instrument name.
    pub fn revert(&self) {
        self.undo(&self.moves);
    }

    fn undo(&self, moves: &[(String, String)]) {
        for (from, to) in moves.iter().rev() {
            if let Err(e) = std::fs::rename(self.dir.join(to), self.dir.join(from)) {
                tracing::error!(
                    kind = %self.kind,
                    %from,
                    %to,
                    error = %e,
                    "could not restore image name"
                );
            }
        }
    }
}

/// Plans and applies the renames for one directory.
pub fn rename_images(
    dir: &Path,
    kind: ImageKind,
    kinetics: &[KineticsRow],
    raw_data_file: &str,
    disambiguator: u8,
) -> Result<RenameOutcome> {
    let plan = plan_renames(dir, kind, kinetics, raw_data_file, disambiguator)?;
    plan.apply()?;
    Ok(plan.into_outcome())
}
