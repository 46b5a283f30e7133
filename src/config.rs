use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub route: Route,
    #[serde(default)]
    pub nameserver: Nameserver,
    #[serde(default)]
    pub proxy: Proxy,
    #[serde(default)]
    pub captive: Captive,
    #[serde(default)]
    pub edge: Edge,
    #[serde(default)]
    pub mesh: Mesh,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).with_context(|| "serializing config")
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    /// Wall-clock budget per probe task; 0 disables it.
    pub overall_timeout_ms: u64,
    pub output_format: String,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            overall_timeout_ms: 0,
            output_format: "text".into(),
        }
    }
}
impl Global {
    pub fn overall_timeout(&self) -> Option<Duration> {
        (self.overall_timeout_ms > 0).then(|| ms(self.overall_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub ping_count: u32,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
}
impl Default for Route {
    fn default() -> Self {
        Self {
            ping_count: 3,
            ping_interval_ms: 200,
            ping_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Nameserver {
    pub resolv_conf_path: String,
    pub reference_domain: String,
    pub query_timeout_ms: u64,
    pub port: u16,
    pub ping_count: u32,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub public_resolvers: Vec<String>,
}
impl Default for Nameserver {
    fn default() -> Self {
        Self {
            resolv_conf_path: "/etc/resolv.conf".into(),
            reference_domain: "apple.com.".into(),
            query_timeout_ms: 3000,
            port: 53,
            ping_count: 3,
            ping_interval_ms: 200,
            ping_timeout_ms: 3000,
            public_resolvers: vec![
                "1.1.1.1".into(),
                "1.1.1.2".into(),
                "8.8.8.8".into(),
                "8.8.4.4".into(),
            ],
        }
    }
}
impl Nameserver {
    pub fn query_timeout(&self) -> Duration {
        ms(self.query_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Proxy {
    pub api_port: u16,
    pub api_timeout_ms: u64,
    pub fake_ip_heuristic: bool,
    pub fake_ip_range: String,
    pub probe_domain: String,
    pub lookup_timeout_ms: u64,
}
impl Default for Proxy {
    fn default() -> Self {
        Self {
            api_port: 9090,
            api_timeout_ms: 2000,
            fake_ip_heuristic: true,
            fake_ip_range: "198.18.0.0/15".into(),
            probe_domain: "this.domain.does.not.exist.".into(),
            lookup_timeout_ms: 3000,
        }
    }
}
impl Proxy {
    pub fn api_timeout(&self) -> Duration {
        ms(self.api_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        ms(self.lookup_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Captive {
    pub url: String,
    pub expected_status: u16,
    pub timeout_ms: u64,
}
impl Default for Captive {
    fn default() -> Self {
        Self {
            url: "http://connectivitycheck.gstatic.com/generate_204".into(),
            expected_status: 204,
            timeout_ms: 5000,
        }
    }
}
impl Captive {
    pub fn timeout(&self) -> Duration {
        ms(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Edge {
    pub url: String,
    pub timeout_ms: u64,
}
impl Default for Edge {
    fn default() -> Self {
        Self {
            url: "https://www.cloudflare.com/cdn-cgi/trace".into(),
            timeout_ms: 5000,
        }
    }
}
impl Edge {
    pub fn timeout(&self) -> Duration {
        ms(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mesh {
    pub command: String,
    pub status_timeout_ms: u64,
}
impl Default for Mesh {
    fn default() -> Self {
        Self {
            command: "tailscale".into(),
            status_timeout_ms: 3000,
        }
    }
}
impl Mesh {
    pub fn status_timeout(&self) -> Duration {
        ms(self.status_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
