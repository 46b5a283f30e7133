use super::types::{PingSpec, PingStats};
use crate::error::ProbeError;
use regex::Regex;
use std::net::IpAddr;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

static COUNTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) packets transmitted, (\d+) (?:packets )?received").expect("Invalid ping count regex")
});

static RTT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"= ([\d.]+)/([\d.]+)/([\d.]+)").expect("Invalid rtt regex"));

/// Runs the platform `ping` binary so no raw-socket privileges are needed.
#[derive(Debug, Clone)]
pub struct SystemPing {
    exe: String,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self { exe: "ping".into() }
    }
}

impl SystemPing {
    pub async fn run(&self, host: IpAddr, spec: &PingSpec) -> Result<PingStats, ProbeError> {
        let deadline_secs = spec.timeout.as_secs_f64().ceil().max(1.0) as u64;
        let interval = format!("{:.1}", spec.interval.as_secs_f64().max(0.2));

        let mut cmd = Command::new(&self.exe);
        cmd.arg("-n")
            .arg("-c")
            .arg(spec.count.max(1).to_string())
            .arg("-i")
            .arg(&interval);
        if cfg!(target_os = "linux") {
            cmd.arg("-w").arg(deadline_secs.to_string());
        } else {
            cmd.arg("-t").arg(deadline_secs.to_string());
        }
        cmd.arg(host.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("ping {} count={} deadline={}s", host, spec.count, deadline_secs);

        // The child is killed on drop if it overstays its own deadline.
        let hard_limit = spec.timeout + Duration::from_secs(1);
        let output = tokio::time::timeout(hard_limit, cmd.output())
            .await
            .map_err(|_| ProbeError::transport(format!("ping {host} timed out after {hard_limit:?}")))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_ping_output(&stdout) {
            Some(stats) => Ok(stats),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ProbeError::transport(format!(
                    "ping {host} failed ({}): {}",
                    output.status,
                    stderr.trim()
                )))
            }
        }
    }
}

/// Reads the summary lines shared by iputils and BSD ping:
/// `3 packets transmitted, 2 received` and `min/avg/max/... = a/b/c/d ms`.
pub fn parse_ping_output(stdout: &str) -> Option<PingStats> {
    let caps = COUNTS.captures(stdout)?;
    let transmitted: u32 = caps[1].parse().ok()?;
    let received: u32 = caps[2].parse().ok()?;

    let mut stats = PingStats {
        transmitted,
        received,
        ..Default::default()
    };

    if let Some(caps) = RTT.captures(stdout) {
        stats.min = millis_f64(&caps[1])?;
        stats.avg = millis_f64(&caps[2])?;
        stats.max = millis_f64(&caps[3])?;
    }
    Some(stats)
}

fn millis_f64(s: &str) -> Option<Duration> {
    let v: f64 = s.parse().ok()?;
    Some(Duration::from_micros((v * 1000.0).round() as u64))
}
