use alloy::signers::local::{
    MnemonicBuilder,
    PrivateKeySigner,
    coins_bip39::English,
};
use betting_session::rpc_wallet::{
    ApprovalRequest,
    WalletPrompt,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use std::{
    fs,
    io::{
        BufRead,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".ethereum").join("keystore"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

/// Keystore files in `dir`, named by file stem. Hidden files are skipped.
pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let entry = entry.wrap_err("Failed to read keystore entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        if name.starts_with('.') {
            continue;
        }
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Keystore '{name}' not found in {}", dir.to_string_lossy()))
}

/// Turn decrypted keystore contents into a signer. Accepts a raw 32-byte
/// secret key or a BIP-39 phrase (first account of the default path).
pub fn signer_from_secret(name: &str, secret: &[u8]) -> Result<PrivateKeySigner> {
    if let Ok(signer) = PrivateKeySigner::from_slice(secret) {
        return Ok(signer);
    }

    if let Ok(mnemonic) = std::str::from_utf8(secret) {
        let word_count = mnemonic.split_whitespace().count();
        if word_count >= 12 {
            return MnemonicBuilder::<English>::default()
                .phrase(mnemonic.trim())
                .index(0u32)?
                .build()
                .wrap_err_with(|| format!("Failed to derive key from keystore '{name}'"));
        }
    }

    Err(eyre!("Keystore '{name}' contained unsupported key material"))
}

pub fn unlock_wallet(descriptor: &WalletDescriptor) -> Result<PrivateKeySigner> {
    let prompt = format!("Enter password for keystore '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read keystore password")?;

    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for keystore '{}'", descriptor.name))?;

    signer_from_secret(&descriptor.name, &secret)
}

/// Terminal stand-in for the wallet's popups: a password prompt to unlock
/// and a yes/no question for everything else.
pub struct TerminalPrompt {
    descriptor: WalletDescriptor,
    assume_yes: bool,
}

impl TerminalPrompt {
    pub fn new(descriptor: WalletDescriptor, assume_yes: bool) -> Self {
        Self {
            descriptor,
            assume_yes,
        }
    }
}

impl WalletPrompt for TerminalPrompt {
    fn unlock(&self) -> Option<PrivateKeySigner> {
        match unlock_wallet(&self.descriptor) {
            Ok(signer) => Some(signer),
            Err(err) => {
                warn!(wallet = %self.descriptor.name, %err, "unlock failed");
                eprintln!("{err}");
                None
            }
        }
    }

    fn approve(&self, request: &ApprovalRequest) -> bool {
        if self.assume_yes {
            return true;
        }
        let question = match request {
            ApprovalRequest::SwitchChain { chain_id, name } => {
                format!("Switch wallet to {name} (chain {chain_id})?")
            }
            ApprovalRequest::AddChain { chain_id, name } => {
                format!("Add {name} (chain {chain_id}) to the wallet?")
            }
            ApprovalRequest::Transaction { to, summary } => {
                format!("Send transaction to {to}: {summary}?")
            }
        };
        print!("{question} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn list_wallets__sorts_by_name_and_skips_dirs() {
        // given
        let dir = TempDir::new("keystore").unwrap();
        fs::write(dir.path().join("bob.json"), b"{}").unwrap();
        fs::write(dir.path().join("alice.json"), b"{}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        // when
        let wallets = list_wallets(dir.path()).unwrap();

        // then
        let names: Vec<_> = wallets.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(find_wallet(dir.path(), "carol").is_err());
    }

    #[test]
    fn signer_from_secret__accepts_raw_key() {
        let secret = [0x11u8; 32];
        let signer = signer_from_secret("dev", &secret).unwrap();
        assert_eq!(
            signer.address(),
            PrivateKeySigner::from_slice(&secret).unwrap().address()
        );
        assert!(signer_from_secret("dev", b"short").is_err());
    }
}
