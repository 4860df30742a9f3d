use serde::Serialize;
use std::path::PathBuf;

/// One session folder found at `rig/mouse/session` depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub mouse_id: String,
    pub session_name: String,
    pub rig: String,
    pub folder: PathBuf,
    /// Days since the session folder was last modified.
    pub folder_age: f64,
    pub exists_in_catalog: bool,
    pub size_mb: f64,
    pub ok_to_delete: bool,
    /// Subfolders with their own age limit. Empty when the whole dataset is deletable.
    pub subfolders: Vec<SubfolderDecision>,
}

impl Dataset {
    pub fn deletable_subfolders(&self) -> impl Iterator<Item = &SubfolderDecision> {
        self.subfolders.iter().filter(|s| s.ok_to_delete)
    }

    /// True when the cleanup pass has something to remove for this dataset.
    pub fn has_work(&self) -> bool {
        self.ok_to_delete || self.deletable_subfolders().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubfolderDecision {
    pub name: String,
    pub path: PathBuf,
    pub age_days: f64,
    pub age_limit_days: u32,
    pub size_mb: f64,
    pub ok_to_delete: bool,
}
