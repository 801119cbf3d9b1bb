//! Read-only regulatory rule packs.
//!
//! Rule files are JSON arrays grouped by directory:
//! `{root}/{country}/common/*.json` plus `{root}/{country}/{category}/*.json`,
//! with an extra region level for GCC: `{root}/gcc/{region}/…`. Packs are
//! loaded lazily, cached, and never mutated.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::types::{Rule, RulePack};

const CACHE_CAPACITY: u64 = 256;
const CACHE_TTL: Duration = Duration::from_secs(60 * 30);

pub struct RuleRepository {
    root: PathBuf,
    cache: moka::future::Cache<String, Arc<RulePack>>,
}

impl std::fmt::Debug for RuleRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRepository")
            .field("root", &self.root)
            .finish()
    }
}

impl RuleRepository {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache: moka::future::Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// The rule pack for `(country, region?, category)`. Missing directories
    /// yield an empty pack; the audit proceeds with generic guidance rather
    /// than failing.
    pub async fn get(
        &self,
        country: &str,
        region: Option<&str>,
        category: &str,
    ) -> Arc<RulePack> {
        let key = format!(
            "{}|{}|{}",
            country.to_ascii_lowercase(),
            region.unwrap_or("").to_ascii_lowercase(),
            category.to_ascii_lowercase()
        );
        self.cache
            .get_with(key, self.load(country, region, category))
            .await
    }

    async fn load(&self, country: &str, region: Option<&str>, category: &str) -> Arc<RulePack> {
        let country_key = country.trim().to_ascii_lowercase();
        let category_key = category.trim().to_ascii_lowercase();

        // GCC packs carry an extra region level under the country directory.
        let base = if country_key == "gcc" {
            match region.map(|r| r.trim().to_ascii_lowercase()).filter(|r| !r.is_empty()) {
                Some(region_key) => self.root.join(&country_key).join(region_key),
                None => self.root.join(&country_key),
            }
        } else {
            self.root.join(&country_key)
        };

        let mut rules = Vec::new();
        for dir in [base.join("common"), base.join(&category_key)] {
            load_dir(&dir, &mut rules).await;
        }

        if rules.is_empty() {
            warn!(
                country,
                region = region.unwrap_or(""),
                category,
                root = %self.root.display(),
                "no rule files found; auditing with an empty pack"
            );
        } else {
            debug!(
                country,
                category,
                count = rules.len(),
                "rule pack loaded"
            );
        }

        Arc::new(RulePack {
            country: country.to_string(),
            region: region.map(|r| r.to_string()),
            category: category.to_string(),
            rules,
        })
    }
}

async fn load_dir(dir: &Path, out: &mut Vec<Rule>) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return, // absent directory is normal
    };

    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    // Ordinal stability: files contribute rules in name order.
    files.sort();

    for path in files {
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), "failed to read rule file: {e}");
                continue;
            }
        };
        match serde_json::from_str::<Vec<Rule>>(&contents) {
            Ok(mut rules) => {
                let rel = path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                for rule in rules.iter_mut() {
                    if rule.jurisdiction_path.is_empty() {
                        rule.jurisdiction_path = rel.clone();
                    }
                }
                out.extend(rules);
            }
            Err(e) => warn!(path = %path.display(), "invalid rule file skipped: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rules(dir: &Path, name: &str, rules: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), rules).unwrap();
    }

    #[tokio::test]
    async fn loads_common_and_category_rules_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_rules(
            &root.join("india/common"),
            "01_general.json",
            r#"[{"id":"IN-GEN-1","regulation":"Consumer Protection Act 2019","title":"No misleading claims"}]"#,
        );
        write_rules(
            &root.join("india/healthcare"),
            "01_dmr.json",
            r#"[{"id":"IN-DMR-1","regulation":"Drugs and Magic Remedies Act 1954","section":"Sec 3","title":"No cure claims for listed conditions"}]"#,
        );

        let repo = RuleRepository::new(root.to_path_buf());
        let pack = repo.get("India", None, "healthcare").await;
        assert_eq!(pack.rules.len(), 2);
        assert_eq!(pack.rules[0].id, "IN-GEN-1");
        assert_eq!(pack.rules[1].id, "IN-DMR-1");
        assert_eq!(pack.rules[1].section.as_deref(), Some("Sec 3"));
    }

    #[tokio::test]
    async fn gcc_region_level_is_honored() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_rules(
            &root.join("gcc/uae/common"),
            "rules.json",
            r#"[{"id":"UAE-1","regulation":"UAE Advertising Standards","title":"Prior approval for health ads"}]"#,
        );

        let repo = RuleRepository::new(root.to_path_buf());
        let pack = repo.get("GCC", Some("UAE"), "healthcare").await;
        assert_eq!(pack.rules.len(), 1);
        assert_eq!(pack.rules[0].id, "UAE-1");
    }

    #[tokio::test]
    async fn missing_directory_yields_empty_pack() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = RuleRepository::new(tmp.path().to_path_buf());
        let pack = repo.get("Atlantis", None, "finance").await;
        assert!(pack.rules.is_empty());
    }

    #[tokio::test]
    async fn invalid_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_rules(&root.join("india/common"), "broken.json", "{not json");
        write_rules(
            &root.join("india/common"),
            "ok.json",
            r#"[{"id":"IN-1","regulation":"ASCI Code","title":"Honest representation"}]"#,
        );

        let repo = RuleRepository::new(root.to_path_buf());
        let pack = repo.get("india", None, "general").await;
        assert_eq!(pack.rules.len(), 1);
    }
}
