//! JSON-file-backed directory standing in for external user/group storage.
//!
//! Calmux only consumes the collaborator traits; this file provides the
//! minimum implementation needed to run the binary end-to-end. Real
//! deployments would back these traits with an actual identity service.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use calmux_core::config::DirectoryConfig;
use calmux_core::types::{GroupId, UserId};
use calmux_service::{
    AuthVerifier, GroupCatalog, GroupEntry, IdentityDirectory, IdentityProfile, ServiceResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub profile: IdentityProfile,
    /// Bearer tokens accepted for this user.
    #[serde(default)]
    pub tokens: Vec<String>,
    /// Shared-link access keys, by resource path.
    #[serde(default)]
    pub access_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub alias: String,
    pub label: String,
    /// Filename of the stored document under the configured ics directory.
    #[serde(default)]
    pub static_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

/// In-memory directory loaded once at startup.
pub struct FileDirectory {
    users: HashMap<UserId, UserRecord>,
    tokens: HashMap<String, UserId>,
    groups_by_id: HashMap<GroupId, GroupRecord>,
    groups_by_alias: HashMap<String, GroupRecord>,
    ics_dir: PathBuf,
}

impl FileDirectory {
    /// ## Summary
    /// Loads the directory from the configured JSON file.
    ///
    /// ## Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(config: &DirectoryConfig) -> anyhow::Result<Arc<Self>> {
        let raw = std::fs::read_to_string(&config.users_file)
            .with_context(|| format!("reading directory file {}", config.users_file))?;
        let file: DirectoryFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing directory file {}", config.users_file))?;

        Ok(Arc::new(Self::from_file(
            file,
            Path::new(&config.ics_dir),
        )))
    }

    #[must_use]
    pub fn from_file(file: DirectoryFile, ics_dir: &Path) -> Self {
        let mut tokens = HashMap::new();
        for user in &file.users {
            for token in &user.tokens {
                tokens.insert(token.clone(), user.profile.id);
            }
        }

        Self {
            users: file
                .users
                .into_iter()
                .map(|u| (u.profile.id, u))
                .collect(),
            tokens,
            groups_by_id: file
                .groups
                .iter()
                .map(|g| (g.id, g.clone()))
                .collect(),
            groups_by_alias: file
                .groups
                .into_iter()
                .map(|g| (g.alias.clone(), g))
                .collect(),
            ics_dir: ics_dir.to_path_buf(),
        }
    }

    fn entry_for(&self, record: &GroupRecord) -> GroupEntry {
        GroupEntry {
            id: record.id,
            label: record.label.clone(),
            static_path: record
                .static_file
                .as_ref()
                .map(|file| self.ics_dir.join(file)),
        }
    }
}

#[async_trait]
impl IdentityDirectory for FileDirectory {
    async fn resolve(&self, user: UserId) -> ServiceResult<Option<IdentityProfile>> {
        Ok(self.users.get(&user).map(|u| u.profile.clone()))
    }

    async fn schedule_key(
        &self,
        user: UserId,
        resource_path: &str,
    ) -> ServiceResult<Option<String>> {
        Ok(self
            .users
            .get(&user)
            .and_then(|u| u.access_keys.get(resource_path))
            .cloned())
    }
}

#[async_trait]
impl GroupCatalog for FileDirectory {
    async fn resolve(&self, group: GroupId) -> ServiceResult<Option<GroupEntry>> {
        Ok(self.groups_by_id.get(&group).map(|g| self.entry_for(g)))
    }

    async fn resolve_alias(&self, alias: &str) -> ServiceResult<Option<GroupEntry>> {
        Ok(self.groups_by_alias.get(alias).map(|g| self.entry_for(g)))
    }
}

#[async_trait]
impl AuthVerifier for FileDirectory {
    async fn verify(&self, token: &str) -> ServiceResult<Option<UserId>> {
        Ok(self.tokens.get(token).copied())
    }
}
