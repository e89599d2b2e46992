use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use log::warn;
use serde::Deserialize;
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tokio::process::{Child, Command};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("node io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chain init failed with {status}: {stderr}")]
    InitFailed { status: ExitStatus, stderr: String },
}

/// Parameters the external node binary is initialized with.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Node binary, resolved via `PATH` unless an absolute path is given.
    pub node_bin: String,
    pub chain_id: String,
    pub covenant_quorum: u32,
    /// Hex-encoded covenant public keys.
    pub covenant_pks: Vec<String>,
    pub slashing_addr: String,
    /// Hex-encoded base BTC header the chain starts from.
    pub base_header: String,
    #[serde(default = "NodeConfig::default_confirmation_depth")]
    pub btc_confirmation_depth: u32,
    #[serde(default = "NodeConfig::default_finalization_timeout")]
    pub btc_finalization_timeout: u32,
    #[serde(default = "NodeConfig::default_epoch_interval")]
    pub epoch_interval: u32,
}

impl NodeConfig {
    fn default_confirmation_depth() -> u32 {
        2
    }

    fn default_finalization_timeout() -> u32 {
        4
    }

    fn default_epoch_interval() -> u32 {
        5
    }
}

/// A single chain node running as an external process, scoped to a temporary
/// working directory.
///
/// [`NodeHandler::shutdown`] stops the node and removes the directory. If the
/// handler is dropped without an explicit shutdown the child is still killed
/// (`kill_on_drop`) and the directory still removed (`TempDir` drop), so no
/// exit path leaks a process or a directory.
pub struct NodeHandler {
    base_dir: Option<TempDir>,
    node_data_dir: PathBuf,
    start_cmd: Command,
    child: Option<Child>,
    pid_file: Option<PathBuf>,
}

impl NodeHandler {
    /// Initialize a fresh single-node chain in a temporary directory and
    /// prepare the start command. Nothing is spawned yet.
    ///
    /// A failed init run removes the directory and surfaces the captured
    /// stderr of the node binary.
    pub async fn init(conf: &NodeConfig) -> Result<NodeHandler, NodeError> {
        let base_dir = tempfile::Builder::new().prefix("staker-testenv-").tempdir()?;

        // base_dir is dropped (and thus removed) on every early return below.
        let init_out = Command::new(&conf.node_bin)
            .arg("testnet")
            .arg("--v=1")
            .arg(format!("--output-dir={}", base_dir.path().display()))
            .arg("--starting-ip-address=192.168.10.2")
            .arg("--keyring-backend=test")
            .arg(format!("--chain-id={}", conf.chain_id))
            .arg(format!("--btc-finalization-timeout={}", conf.btc_finalization_timeout))
            .arg(format!("--btc-confirmation-depth={}", conf.btc_confirmation_depth))
            .arg("--btc-network=regtest")
            .arg(format!("--slashing-address={}", conf.slashing_addr))
            .arg(format!("--btc-base-header={}", conf.base_header))
            .arg("--additional-sender-account")
            .arg(format!("--covenant-quorum={}", conf.covenant_quorum))
            .arg(format!("--epoch-interval={}", conf.epoch_interval))
            .arg(format!("--covenant-pks={}", conf.covenant_pks.join(",")))
            .output()
            .await?;
        if !init_out.status.success() {
            return Err(NodeError::InitFailed {
                status: init_out.status,
                stderr: String::from_utf8_lossy(&init_out.stderr).into_owned(),
            });
        }

        let bin_name = Path::new(&conf.node_bin)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| conf.node_bin.clone());
        let node_data_dir = base_dir.path().join("node0").join(&bin_name);

        let log_file = std::fs::File::create(base_dir.path().join("node.log"))?;
        let mut start_cmd = Command::new(&conf.node_bin);
        start_cmd
            .arg("start")
            .arg(format!("--home={}", node_data_dir.display()))
            .arg("--log_level=debug")
            .stdout(Stdio::from(log_file))
            .kill_on_drop(true);

        Ok(NodeHandler {
            base_dir: Some(base_dir),
            node_data_dir,
            start_cmd,
            child: None,
            pid_file: None,
        })
    }

    /// Spawn the node process and record its pid next to the data dir.
    /// A start failure cleans the working directory up before returning.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        match self.try_start().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.cleanup().await;
                Err(e)
            }
        }
    }

    async fn try_start(&mut self) -> Result<(), NodeError> {
        let child = self.start_cmd.spawn()?;
        if let (Some(pid), Some(dir)) = (child.id(), self.base_dir.as_ref()) {
            let pid_path = dir.path().join("node.pid");
            fs::write(&pid_path, format!("{}\n", pid)).await?;
            self.pid_file = Some(pid_path);
        }
        self.child = Some(child);
        Ok(())
    }

    /// Kill the node process and wait for it to exit. No-op if the node was
    /// never started or failed to start.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
        }
        Ok(())
    }

    /// Stop the node and remove its working directory.
    pub async fn shutdown(&mut self) -> Result<(), NodeError> {
        self.stop().await?;
        self.cleanup().await;
        Ok(())
    }

    /// Data directory of the initialized node (`<base>/node0/<bin>`).
    pub fn node_data_dir(&self) -> &Path {
        &self.node_data_dir
    }

    async fn cleanup(&mut self) {
        if let Some(pid_file) = self.pid_file.take() {
            if let Err(e) = fs::remove_file(&pid_file).await {
                warn!(target: "testenv", "unable to remove pid file {}: {}", pid_file.display(), e);
            }
        }
        if let Some(dir) = self.base_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(target: "testenv", "cannot remove dir {}: {}", path.display(), e);
            }
        }
    }
}
