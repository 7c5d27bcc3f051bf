use anyhow::Result;
use bwvpn_config::FileConfig;

pub fn handle_profiles(config: &FileConfig) -> Result<()> {
    if config.profiles.is_empty() {
        println!("No profiles configured");
        return Ok(());
    }

    for (name, profile) in &config.profiles {
        println!(
            "{name}\t{}\t{}\t{}",
            profile.item_id,
            profile.connection.as_deref().unwrap_or("-"),
            profile.credential
        );
    }
    Ok(())
}
