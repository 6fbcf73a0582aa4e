//! Document references: direct paths, or fuzzy match on page titles.

use std::path::Path;

use tracing::debug;

use canonic_shared::{Candidate, EXACT_SCORE, EntityType};

use super::{Collector, Generated, SearchContext, is_document_path};
use crate::similarity::token_set_ratio;

pub async fn generate(mention: &str, ctx: &SearchContext<'_>) -> Generated {
    let mut out = Collector::default();

    // Explicit paths are taken as-is, whether or not the page exists yet.
    if is_document_path(mention) {
        let path = mention.trim();
        out.push(Candidate::new(EntityType::Wiki, path, page_title(path), EXACT_SCORE));
        return out.finish();
    }

    let Some(org) = ctx.org else {
        return out.finish();
    };

    let needle = mention.to_lowercase();
    match ctx.documents.list_paths(org).await {
        Ok(paths) => {
            for path in paths {
                let title = page_title(&path);
                let score = token_set_ratio(&needle, &title.to_lowercase());
                if score >= ctx.settings.fuzzy_threshold {
                    out.push(Candidate::new(EntityType::Wiki, path, title, score));
                }
            }
        }
        Err(e) => out.fail("wiki", mention, e),
    }

    debug!(mention, org, found = out.candidates().len(), "wiki search");
    out.finish()
}

/// File stem with underscores read as spaces.
fn page_title(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().replace('_', " "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testing::Fixture;

    #[tokio::test]
    async fn direct_path_is_exact_without_listing() {
        let fx = Fixture::load();
        let found = generate(" hr/new_onboarding.md ", &fx.ctx("")).await.expect("generate");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id, "hr/new_onboarding.md");
        assert_eq!(found[0].display_name, "new onboarding");
        assert_eq!(found[0].score, EXACT_SCORE);
    }

    #[tokio::test]
    async fn title_match_returns_relative_path() {
        let fx = Fixture::load();
        let found = generate("Leave Policy wiki", &fx.ctx("")).await.expect("generate");

        let hit = found
            .iter()
            .find(|c| c.object_id == "hr/leave_policy.md")
            .expect("leave policy page");
        assert_eq!(hit.display_name, "leave policy");
        assert!(hit.score >= 60.0);
    }

    #[tokio::test]
    async fn no_org_means_no_search() {
        let fx = Fixture::load();
        let mut ctx = fx.ctx("");
        ctx.org = None;
        assert!(generate("leave policy", &ctx).await.expect("generate").is_empty());
    }
}
