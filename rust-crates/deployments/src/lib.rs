use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub contract_address: String,
    pub chain_id: u64,
    pub network_url: String,
    #[serde(default)]
    pub token_symbol: Option<String>,
    #[serde(default)]
    pub deployment_block: Option<u64>,
}

impl DeploymentRecord {
    pub fn is_for_chain(&self, chain_id: u64) -> bool {
        self.chain_id == chain_id
    }
}

/// Deployment record file for one network key, e.g.
/// `.deployments/sepolia/deployments.json`.
#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(network: &str) -> Result<Self> {
        Self::with_root(DEPLOYMENTS_ROOT, network)
    }

    pub fn with_root(root: impl AsRef<Path>, network: &str) -> Result<Self> {
        let path = ensure_store(root.as_ref(), network)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }

    pub fn save(&self, record: DeploymentRecord) -> Result<()> {
        write_record(&self.path, &record)
    }
}

pub fn ensure_structure<'a>(
    root: impl AsRef<Path>,
    networks: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    for network in networks {
        let _ = ensure_store(root.as_ref(), network)?;
    }
    Ok(())
}

/// Contract addresses recorded under `root`, keyed by network. Networks with
/// no record file, or an empty one, are left out. Nothing is created.
pub fn recorded_addresses<'a>(
    root: impl AsRef<Path>,
    networks: impl IntoIterator<Item = &'a str>,
) -> Result<HashMap<String, DeploymentRecord>> {
    let mut table = HashMap::new();
    for network in networks {
        let path = store_path(root.as_ref(), network)?;
        if !path.exists() {
            continue;
        }
        if let Some(record) = read_record(&path)
            .with_context(|| format!("Failed to load deployment for {network}"))?
        {
            table.insert(network.to_string(), record);
        }
    }
    Ok(table)
}

fn store_path(root: &Path, network: &str) -> Result<PathBuf> {
    if network.is_empty() || network.contains(['/', '\\', '.']) {
        return Err(anyhow!("Invalid network key for deployments: {network:?}"));
    }
    Ok(root.join(network).join(DEPLOYMENTS_FILE))
}

fn ensure_store(root: &Path, network: &str) -> Result<PathBuf> {
    let file_path = store_path(root, network)?;
    if !root.exists() {
        fs::create_dir_all(root).with_context(|| {
            format!("Failed to create deployments directory {}", root.display())
        })?;
    }

    let network_dir = root.join(network);
    if !network_dir.exists() {
        fs::create_dir_all(&network_dir).with_context(|| {
            format!("Failed to create {} directory", network_dir.display())
        })?;
    }

    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                network, file_path
            )
        })?;
        file.write_all(b"").with_context(|| {
            format!("Failed to initialize deployment record file for {}", network)
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.is_empty() || data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}

fn write_record(path: impl AsRef<Path>, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .context("Failed to serialize deployment record")?;
    fs::write(path.as_ref(), json).context("Failed to write deployment record")?;
    Ok(())
}

pub fn record_deployment(
    root: impl AsRef<Path>,
    network: &str,
    chain_id: u64,
    contract_address: impl AsRef<str>,
    network_url: impl AsRef<str>,
    token_symbol: Option<impl AsRef<str>>,
) -> Result<()> {
    let store = DeploymentStore::with_root(root, network)?;
    let record = DeploymentRecord {
        deployed_at: Utc::now().to_rfc3339(),
        contract_address: contract_address.as_ref().to_string(),
        chain_id,
        network_url: network_url.as_ref().to_string(),
        token_symbol: token_symbol.map(|symbol| symbol.as_ref().to_string()),
        deployment_block: None,
    };
    store.save(record)
}
