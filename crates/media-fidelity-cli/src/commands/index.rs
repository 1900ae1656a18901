//! Tree index command.

use std::path::Path;

use anyhow::{Context, Result};
use media_fidelity::{IndexRule, Modality, SuffixPattern, TreeIndex};

pub fn run(root: &Path, modalities: &[Modality], derived_suffix: Option<&str>) -> Result<()> {
    let pattern = derived_suffix
        .map(SuffixPattern::new)
        .transpose()
        .with_context(|| format!("Invalid derived suffix '{}'", derived_suffix.unwrap_or("")))?;

    for &modality in modalities {
        let rule = match derived_suffix {
            Some(_) => IndexRule::derived(modality, pattern.as_ref()),
            None => IndexRule::source(modality),
        };
        let index = TreeIndex::build(root, &rule);

        println!("{} index of {}", modality, root.display());
        for (key, entry) in &index.entries {
            println!("  {:<40} {}", key.as_str(), entry.display_path());
        }
        println!(
            "{} indexed, {} skipped, {} collisions",
            index.len(),
            index.skipped,
            index.collisions.len()
        );
        for collision in &index.collisions {
            println!(
                "  {}: kept {}, replaced {}",
                collision.key,
                collision.kept.display(),
                collision.replaced.display()
            );
        }
        println!();
    }

    Ok(())
}
