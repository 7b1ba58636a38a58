use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::Path;
use tokio::fs;

fn default_token_param() -> SmolStr {
    SmolStr::new_inline("authenticity_token")
}

fn default_header_name() -> SmolStr {
    SmolStr::new_inline("x-csrf-token")
}

fn default_true() -> bool {
    true
}

/// Which actions (request paths, when used through the tower layer) are verified at all
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ActionFilter {
    #[default]
    All,
    Only {
        actions: Vec<SmolStr>,
    },
    Except {
        actions: Vec<SmolStr>,
    },
}

impl ActionFilter {
    #[must_use]
    pub fn applies_to(&self, action: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only { actions } => actions.iter().any(|candidate| candidate == action),
            Self::Except { actions } => !actions.iter().any(|candidate| candidate == action),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Name of the form/query parameter carrying the masked token
    #[serde(default = "default_token_param")]
    pub request_forgery_protection_token: SmolStr,

    /// Global switch. Usually only turned off inside of test harnesses
    #[serde(default = "default_true")]
    pub allow_forgery_protection: bool,

    /// Header consulted when the parameter is absent
    #[serde(default = "default_header_name")]
    pub header_name: SmolStr,

    #[serde(default)]
    pub filter: ActionFilter,
}

impl Configuration {
    pub async fn load<P>(path: P) -> eyre::Result<Self>
    where
        P: AsRef<Path>,
    {
        let content = fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> eyre::Result<Self> {
        toml::from_str(content).map_err(eyre::Report::from)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            request_forgery_protection_token: default_token_param(),
            allow_forgery_protection: true,
            header_name: default_header_name(),
            filter: ActionFilter::default(),
        }
    }
}
