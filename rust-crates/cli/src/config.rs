use alloy::primitives::Address;
use betting_session::{
    ChainRegistry,
    ContractAddressTable,
    registry::{
        DEFAULT_LOCAL_RPC_URL,
        LOCAL,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::path::Path;
use tracing::{
    debug,
    warn,
};

/// Builtin catalog plus a local node, with `rpc_url` overriding the
/// endpoints of `network`.
pub fn build_registry(network: &str, rpc_url: Option<&str>) -> Result<ChainRegistry> {
    let local_url = match (network, rpc_url) {
        (LOCAL, Some(url)) => url,
        _ => DEFAULT_LOCAL_RPC_URL,
    };
    let registry =
        ChainRegistry::builtin().with_network(ChainRegistry::local_network(local_url));
    let Some(url) = rpc_url else {
        return Ok(registry);
    };
    let mut descriptor = registry
        .describe_network(network)
        .map_err(|err| eyre!(err))?
        .clone();
    descriptor.rpc_urls = vec![url.to_string()];
    Ok(registry.with_network(descriptor))
}

/// Contract addresses from the deployment records under `root`. A record
/// whose chain id does not match the catalog is ignored. `override_address`
/// wins for `network`.
pub fn load_addresses(
    registry: &ChainRegistry,
    root: &Path,
    network: &str,
    override_address: Option<&str>,
) -> Result<ContractAddressTable> {
    let keys: Vec<&str> = registry.keys().collect();
    let records = deployments::recorded_addresses(root, keys.iter().copied())
        .map_err(|err| eyre!(err))
        .wrap_err("loading deployment records")?;

    let mut table = ContractAddressTable::new();
    for (key, record) in records {
        let descriptor = registry.describe_network(&key).map_err(|err| eyre!(err))?;
        if !record.is_for_chain(descriptor.chain_id) {
            warn!(
                network = %key,
                recorded = record.chain_id,
                expected = descriptor.chain_id,
                "deployment record is for another chain, ignoring"
            );
            continue;
        }
        let address: Address = record
            .contract_address
            .parse()
            .wrap_err_with(|| format!("invalid contract address recorded for {key}"))?;
        debug!(network = %key, %address, "loaded deployment record");
        table.insert(&key, address);
    }

    if let Some(raw) = override_address {
        let address: Address = raw
            .parse()
            .wrap_err_with(|| format!("invalid --contract address '{raw}'"))?;
        table.insert(network, address);
    }
    Ok(table)
}
