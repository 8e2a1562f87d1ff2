//! Upload shape rules for paired geometry files.
//!
//! Geometry arrives as pairs sharing a base file name: one step-format body
//! (`.stp` / `.step`) and one companion mesh (`.obj`). A batch is checked as
//! a whole before anything is written, so a rejected batch never leaves a
//! half-paired record behind.

use std::collections::HashMap;
use std::path::Path;

use crate::error::CoreError;

/// Accepted geometry file extensions (compared case-insensitively).
pub const ACCEPTED_EXTENSIONS: &[&str] = &["stp", "step", "obj"];

/// Default per-file size ceiling (1 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1 << 20;

/// Which half of a geometry pair a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryFormat {
    /// 3-D step-format body.
    Step,
    /// Companion visual mesh.
    Mesh,
}

impl GeometryFormat {
    /// Classify a file by its extension.
    pub fn from_file_name(file_name: &str) -> Result<Self, CoreError> {
        match extension(file_name).as_deref() {
            Some("stp") | Some("step") => Ok(Self::Step),
            Some("obj") => Ok(Self::Mesh),
            Some(other) => Err(CoreError::Validation(format!(
                "The provided file format is not allowed: .{other}"
            ))),
            None => Err(CoreError::Validation(format!(
                "File '{file_name}' has no extension"
            ))),
        }
    }
}

/// Lower-cased extension without the dot.
pub fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// File name stripped of directories and of its final extension.
///
/// `part.stp` and `part.obj` share the base name `part`.
pub fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Display name given to a CAD file record paired under `base`.
pub fn display_name(base: &str) -> String {
    format!("{base}.stp")
}

/// Name and size of one uploaded part, as seen by batch validation.
#[derive(Debug, Clone, Copy)]
pub struct PartMeta<'a> {
    pub file_name: &'a str,
    pub size: u64,
}

/// Validate the shape of a whole upload batch.
///
/// Rejects an empty batch, an odd part count, any part over
/// `max_file_bytes`, any extension outside [`ACCEPTED_EXTENSIONS`], and a
/// batch in which some base name lacks exactly one step body and one mesh.
pub fn validate_batch(parts: &[PartMeta<'_>], max_file_bytes: u64) -> Result<(), CoreError> {
    if parts.is_empty() {
        return Err(CoreError::Validation("Select a file(s) to upload".into()));
    }

    if parts.len() % 2 != 0 {
        return Err(CoreError::Validation(
            "Each STEP file must be uploaded with its corresponding obj file".into(),
        ));
    }

    let mut halves: HashMap<&str, (u32, u32)> = HashMap::new();

    for part in parts {
        if part.size > max_file_bytes {
            return Err(CoreError::Validation(format!(
                "The uploaded file is too big: {}. Files must be at most {max_file_bytes} bytes",
                part.file_name
            )));
        }

        let format = GeometryFormat::from_file_name(part.file_name)?;
        let entry = halves.entry(base_name(part.file_name)).or_default();
        match format {
            GeometryFormat::Step => entry.0 += 1,
            GeometryFormat::Mesh => entry.1 += 1,
        }
    }

    if let Some((base, _)) = halves.iter().find(|(_, counts)| **counts != (1, 1)) {
        return Err(CoreError::Validation(format!(
            "Unbalanced: '{base}' must be uploaded as exactly one STEP file and one obj file"
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
