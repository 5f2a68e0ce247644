//! Policy gate consulted before each command. A user resolves to a role
//! (falling back to `default_role`), and a role names the commands it may
//! run. Unknown users with no default role are denied.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrongroomError};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PolicyFile {
    #[serde(default)]
    pub users: HashMap<String, String>,
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub default_role: Option<String>,
}

impl PolicyFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|err| StrongroomError::PolicyParse(err.to_string()))
    }

    pub fn is_allowed(&self, user: &str, command: &str) -> bool {
        let role = match self.users.get(user).or(self.default_role.as_ref()) {
            Some(role) => role,
            None => return false,
        };

        self.roles
            .get(role)
            .map(|commands| commands.iter().any(|c| c == command))
            .unwrap_or(false)
    }
}

/// `SUDO_USER` if set, else the OS login name of the running process.
pub fn current_user() -> String {
    if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        if !sudo_user.is_empty() {
            return sudo_user;
        }
    }

    nix::unistd::User::from_uid(nix::unistd::Uid::current())
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| "unknown".to_string())
}
