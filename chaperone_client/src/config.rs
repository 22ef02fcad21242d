use std::path::PathBuf;

use chaperone_core::{DEFAULT_ADMIN, DEFAULT_PROGRAM_ID, GuideId};
use solana_sdk::pubkey::Pubkey;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URL: &str = "https://plum-tough-mongoose-147.mypinata.cloud";
pub const DEFAULT_WEBSITE_URL: &str = "https://chaperoneme.app";
pub const DEFAULT_MINT_LEDGER: &str = "chaperone-mints.json";

/// Endpoints and well-known addresses a client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    pub program_id: Pubkey,
    /// Wallet allowed to review submissions and mint verification tokens
    pub admin: Pubkey,
    pub pinata_jwt: Option<String>,
    pub pinata_api_url: String,
    pub gateway_url: String,
    /// Public site hosting guide profile pages
    pub website_url: String,
    pub mint_ledger_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            program_id: DEFAULT_PROGRAM_ID,
            admin: DEFAULT_ADMIN,
            pinata_jwt: None,
            pinata_api_url: DEFAULT_PINATA_API_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            website_url: DEFAULT_WEBSITE_URL.to_string(),
            mint_ledger_path: PathBuf::from(DEFAULT_MINT_LEDGER),
        }
    }
}

impl Config {
    /// Public profile page of a guide, the target of a verification stamp.
    pub fn profile_url(&self, id: &GuideId) -> String {
        format!("{}/guides/{}", self.website_url.trim_end_matches('/'), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_devnet_deployment() {
        let config = Config::default();
        assert_eq!(config.program_id.to_string(), "E7N3tt6G96BLoD6vXVhztDaD1mGpDEm533jjxKErVaKk");
        assert_eq!(config.admin.to_string(), "GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92");
        assert!(config.pinata_jwt.is_none());
    }

    #[test]
    fn profile_url_embeds_guide_id() {
        let config = Config {
            website_url: "https://guides.example/".into(),
            ..Config::default()
        };
        let id = GuideId::new(DEFAULT_ADMIN, 3);
        assert_eq!(
            config.profile_url(&id),
            format!("https://guides.example/guides/{DEFAULT_ADMIN}-3")
        );
    }
}
