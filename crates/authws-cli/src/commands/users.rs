//! Local directory listing.

use std::path::Path;

use authws_model::LocalIdentity;
use authws_storage::JsonDirectoryFile;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::UsersArgs;
use crate::config::OutputFormat;
use crate::output::output;
use crate::CliConfig;

/// Identity representation for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct UserDisplay {
    /// Identity ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// External ID.
    pub idnumber: String,
    /// Email address.
    pub email: String,
    /// First name.
    #[tabled(rename = "First Name")]
    pub first_name: String,
    /// Last name.
    #[tabled(rename = "Last Name")]
    pub last_name: String,
    /// Auth method.
    pub auth: String,
    /// Whether the identity is suspended.
    pub suspended: bool,
}

impl From<LocalIdentity> for UserDisplay {
    fn from(identity: LocalIdentity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            idnumber: identity.idnumber,
            email: identity.email,
            first_name: identity.first_name,
            last_name: identity.last_name,
            auth: identity.auth_method,
            suspended: identity.suspended,
        }
    }
}

/// Selects the identities to list.
#[must_use]
pub fn select(identities: Vec<LocalIdentity>, args: &UsersArgs) -> Vec<UserDisplay> {
    let mut selected: Vec<UserDisplay> = identities
        .into_iter()
        .filter(|u| !u.deleted)
        .filter(|u| args.suspended || !u.suspended)
        .filter(|u| args.auth.as_deref().map_or(true, |auth| u.auth_method == auth))
        .map(UserDisplay::from)
        .collect();
    selected.sort_by_key(|u| u.id);
    selected
}

/// Runs the users command.
pub fn run_users(
    args: &UsersArgs,
    config: &CliConfig,
    directory_arg: Option<&Path>,
    output_format: OutputFormat,
) -> crate::CliResult<()> {
    let file = JsonDirectoryFile::new(config.effective_directory(directory_arg));
    let identities = file.load()?.state().identities;
    output(&select(identities, args), output_format)
}
