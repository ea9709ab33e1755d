use std::{
    fs,
    path::{Path, PathBuf},
};

use ethers::{abi::Abi, types::Bytes};
use serde::Deserialize;

use crate::framework::DeploymentFailure;

const BUILD_INFO_DIR: &str = "build-info";

/// Compiler output for a single contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn load(path: &Path) -> Result<Self, DeploymentFailure> {
        let invalid = |reason: String| DeploymentFailure::InvalidArtifact {
            path: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let artifact: Artifact =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        if artifact.bytecode.is_empty() {
            return Err(invalid(format!(
                "{} has no bytecode and is not deployable",
                artifact.contract_name
            )));
        }
        Ok(artifact)
    }
}

/// A directory of compiled artifacts, laid out as `contracts/<Name>.sol/<Name>.json`.
#[derive(Debug, Clone)]
pub struct Artifacts {
    root: PathBuf,
}

impl Artifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn find(&self, name: &str) -> Result<PathBuf, DeploymentFailure> {
        let conventional = self
            .root
            .join("contracts")
            .join(format!("{name}.sol"))
            .join(format!("{name}.json"));
        if conventional.is_file() {
            return Ok(conventional);
        }

        let file_name = format!("{name}.json");
        search(&self.root, &file_name)
            .ok_or_else(|| DeploymentFailure::ContractNotFound(name.to_string()))
    }

    pub fn load(&self, name: &str) -> Result<Artifact, DeploymentFailure> {
        let path = self.find(name)?;
        log::debug!("artifact for {} at {}", name, path.display());
        Artifact::load(&path)
    }
}

fn search(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<(PathBuf, fs::FileType)> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            // does not follow symlinks, so linked directories are never entered
            let file_type = entry.file_type().ok()?;
            Some((entry.path(), file_type))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut subdirs = Vec::new();
    for (path, file_type) in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_type.is_dir() {
            if name != BUILD_INFO_DIR {
                subdirs.push(path);
            }
        } else if name == file_name {
            return Some(path);
        }
    }

    subdirs.iter().find_map(|d| search(d, file_name))
}
