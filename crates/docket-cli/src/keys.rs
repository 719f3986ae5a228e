//! # Key Files
//!
//! Key loading for `sign`/`verify` and the `keygen` subcommand.
//!
//! The default private key lives at `~/.docket/id_ed25519.json` with its
//! public half next to it as `id_ed25519.pub.json`. Paths starting with
//! `~/` are expanded against `$HOME`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use docket_crypto::{KeyPair, PrivateKey, PublicKey};

use crate::io::encode;
use crate::GlobalOpts;

/// Default private key path, before `~` expansion.
pub const DEFAULT_KEY_FILE: &str = "~/.docket/id_ed25519.json";

/// Arguments for `keygen`.
#[derive(Args, Debug, Default)]
pub struct KeygenArgs {
    /// Private key output path; `-` prints the private key to stdout.
    /// The public key is written next to it with a `.pub.json` suffix.
    pub outfile: Option<PathBuf>,
}

/// Expand a leading `~/`.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = std::env::var_os("HOME").ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(rest))
}

/// `id_ed25519.json` → `id_ed25519.pub.json`.
pub fn public_path(private: &Path) -> PathBuf {
    let name = private
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".json").unwrap_or(&name);
    private.with_file_name(format!("{stem}.pub.json"))
}

pub fn default_private_path() -> Result<PathBuf> {
    expand_home(Path::new(DEFAULT_KEY_FILE))
}

pub fn default_public_path() -> Result<PathBuf> {
    Ok(public_path(&default_private_path()?))
}

pub fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let path = expand_home(path)?;
    let data = std::fs::read(&path).with_context(|| format!("reading key {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("decoding key {}", path.display()))
}

pub fn load_public_key(path: &Path) -> Result<PublicKey> {
    let path = expand_home(path)?;
    let data = std::fs::read(&path).with_context(|| format!("reading key {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("decoding key {}", path.display()))
}

/// Signing key for long-running modes: the file named by `DOCKET_KEY`, or
/// a fresh key.
pub fn service_key() -> Result<PrivateKey> {
    match std::env::var_os("DOCKET_KEY") {
        Some(path) => load_private_key(Path::new(&path)),
        None => {
            let key = PrivateKey::generate();
            tracing::info!(kid = %key.kid(), "generated signing key");
            Ok(key)
        }
    }
}

/// Generate a key pair and write both halves.
pub fn run_keygen(args: &KeygenArgs, opts: &GlobalOpts, stdout: &mut dyn Write) -> Result<()> {
    let pair = KeyPair::generate();
    let private = encode(&pair.private, opts.indent)?;
    let public = encode(&pair.public, opts.indent)?;

    let path = match &args.outfile {
        Some(p) if p == Path::new("-") => {
            stdout.write_all(&private)?;
            return Ok(());
        }
        Some(p) => expand_home(p)?,
        None => default_private_path()?,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let pub_path = public_path(&path);
    if !opts.force {
        for target in [&path, &pub_path] {
            if target.exists() {
                bail!("target {:?} exists", target.display().to_string());
            }
        }
    }
    write_key(&path, &private, 0o600, opts.force)?;
    write_key(&pub_path, &public, 0o644, opts.force)?;
    tracing::info!(kid = %pair.public.kid(), path = %path.display(), "key pair written");
    Ok(())
}

fn write_key(path: &Path, data: &[u8], mode: u32, overwrite: bool) -> Result<()> {
    let mut open = OpenOptions::new();
    open.write(true);
    if overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    let mut file = open
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_path_from_private() {
        assert_eq!(
            public_path(Path::new("/k/id_ed25519.json")),
            PathBuf::from("/k/id_ed25519.pub.json")
        );
        assert_eq!(public_path(Path::new("key")), PathBuf::from("key.pub.json"));
    }

    #[test]
    fn plain_paths_are_not_expanded() {
        assert_eq!(expand_home(Path::new("a/b.json")).unwrap(), PathBuf::from("a/b.json"));
    }

    #[test]
    fn keygen_writes_both_halves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("id.json");
        let args = KeygenArgs {
            outfile: Some(path.clone()),
        };
        run_keygen(&args, &GlobalOpts::default(), &mut std::io::sink()).unwrap();

        let private = load_private_key(&path).unwrap();
        let public = load_public_key(&dir.path().join("keys").join("id.pub.json")).unwrap();
        assert_eq!(private.public_key(), public);

        let err = run_keygen(&args, &GlobalOpts::default(), &mut std::io::sink()).unwrap_err();
        assert!(err.to_string().contains("exists"));

        let forced = GlobalOpts {
            force: true,
            ..Default::default()
        };
        run_keygen(&args, &forced, &mut std::io::sink()).unwrap();
        assert_ne!(load_private_key(&path).unwrap().kid(), private.kid());
    }

    #[test]
    fn keygen_to_stdout() {
        let mut out = Vec::new();
        let args = KeygenArgs {
            outfile: Some(PathBuf::from("-")),
        };
        run_keygen(&args, &GlobalOpts::default(), &mut out).unwrap();
        let key: PrivateKey = serde_json::from_slice(&out).unwrap();
        assert!(!key.kid().is_nil());
    }
}
