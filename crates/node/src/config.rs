// node/src/config.rs
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: String,
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub lottery: LotteryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub listen_addr: SocketAddr,
    pub max_peers: usize,
    pub bootstrap_peers: Vec<String>,
    /// Port used for local-network broadcast discovery
    pub broadcast_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to the JSON key file (see `ember-node keygen`)
    pub key_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryConfig {
    pub enabled: bool,
    /// The pool must hold strictly more than this many transactions
    pub min_pool_len: usize,
    /// At least this many stakers must have pledged
    pub min_stakers: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            network: NetworkConfig {
                listen_addr: "0.0.0.0:44824".parse().unwrap(),
                max_peers: 32,
                bootstrap_peers: vec![],
                broadcast_port: 44824,
            },
            wallet: WalletConfig {
                key_path: "./data/keys/node.json".into(),
            },
            lottery: LotteryConfig {
                enabled: true,
                min_pool_len: 2,
                min_stakers: 2,
            },
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.lottery.enabled);
        assert_eq!(config.lottery.min_pool_len, 2);
        assert_eq!(config.lottery.min_stakers, 2);
        assert_eq!(config.network.max_peers, 32);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = NodeConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.listen_addr, config.network.listen_addr);
        assert_eq!(parsed.wallet.key_path, config.wallet.key_path);
    }
}
