//! Wallet key generator for stakestay development and testing.
//!
//! Generates an ed25519 wallet key, saves its seed to a file and prints the
//! derived wallet address. It can also sign a challenge message with an
//! existing key so the login handshake can be driven by hand.
//!
//! Usage:
//!   cargo run --bin stakestay-keygen [output-dir]
//!   cargo run --bin stakestay-keygen sign <key-file> <message>

use color_eyre::eyre::{bail, WrapErr};
use stakestay::WalletKey;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const KEY_FILE: &str = "wallet.secret";

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("sign") => {
            let (Some(key_file), Some(message)) = (args.get(1), args.get(2)) else {
                bail!("usage: stakestay-keygen sign <key-file> <message>");
            };
            sign(Path::new(key_file), message)
        }
        Some(dir) => generate(PathBuf::from(dir)),
        None => generate(env::current_dir().wrap_err("Failed to get current directory")?),
    }
}

fn generate(output_dir: PathBuf) -> color_eyre::Result<()> {
    println!("Wallet Key Generator for stakestay\n");

    fs::create_dir_all(&output_dir).wrap_err("Failed to create output directory")?;

    let key_path = output_dir.join(KEY_FILE);
    if key_path.exists() {
        bail!("{} already exists, refusing to overwrite", key_path.display());
    }

    let key = WalletKey::generate();
    fs::write(&key_path, key.secret_hex()).wrap_err("Failed to write secret key")?;

    println!("Secret key saved to: {}", key_path.display());
    println!("  WARNING: Keep this file secure! It controls the wallet.");
    println!("\nWallet address: {}", key.address());
    Ok(())
}

fn sign(key_file: &Path, message: &str) -> color_eyre::Result<()> {
    let key = WalletKey::from_file(key_file)
        .wrap_err_with(|| format!("Failed to load key from {}", key_file.display()))?;
    // Challenge messages travel with literal "\n" escapes on the command line.
    let message = message.replace("\\n", "\n");
    println!("address:   {}", key.address());
    println!("signature: {}", key.sign(&message));
    Ok(())
}
