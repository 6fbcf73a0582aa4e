//! Case-insensitive substring search over projects, customers, and employees.

use tracing::debug;

use canonic_directory::{
    Company, EmployeeQuery, NamedRecord, ProjectQuery, load_full_customers, search_all_employees,
    search_all_projects,
};
use canonic_shared::{Candidate, EntityType};

use super::{CONTACT_SCORE, Collector, Generated, STANDARD_SCORE, SearchContext};
use crate::fuzzy_cache::FuzzyCache;

pub async fn generate(mention: &str, ctx: &SearchContext<'_>, cache: &mut FuzzyCache) -> Generated {
    let needle = mention.trim().to_lowercase();
    let cap = ctx.settings.standard_result_cap;
    let mut out = Collector::default();
    if needle.is_empty() {
        return out.finish();
    }

    match search_all_projects(ctx.directory, &ProjectQuery::everything(), Some(&needle)).await {
        Ok(projects) => out.extend(projects.iter().take(cap).map(|p| standard(EntityType::Project, p))),
        Err(e) => out.fail("standard", mention, e),
    }

    match customers(ctx, cache).await {
        Ok(companies) => out.extend(match_customers(&companies, &needle, cap)),
        Err(e) => out.fail("standard", mention, e),
    }

    let query = EmployeeQuery {
        query: Some(needle.clone()),
    };
    match search_all_employees(ctx.directory, &query).await {
        Ok(employees) => {
            out.extend(employees.iter().take(cap).map(|e| standard(EntityType::Employee, e)))
        }
        Err(e) => out.fail("standard", mention, e),
    }

    debug!(mention, found = out.candidates().len(), "standard search");
    out.finish()
}

/// Full customer records for this task, loading and caching them on first use.
async fn customers(
    ctx: &SearchContext<'_>,
    cache: &mut FuzzyCache,
) -> canonic_shared::Result<Vec<Company>> {
    if let Some(cached) = cache.customers_for(ctx.task_id) {
        return Ok(cached.to_vec());
    }
    let loaded = load_full_customers(ctx.directory).await?;
    cache.store_customers(ctx.task_id, loaded.clone());
    Ok(loaded)
}

fn match_customers(companies: &[Company], needle: &str, cap: usize) -> Vec<Candidate> {
    let mut found = Vec::new();
    for company in companies {
        if company.name.to_lowercase().contains(needle) {
            found.push(standard(EntityType::Customer, company));
        }
        if let Some(contact) = company.contact() {
            if contact.to_lowercase().contains(needle) {
                found.push(
                    Candidate::new(
                        EntityType::Customer,
                        &company.id,
                        format!("{contact} ({})", company.name),
                        CONTACT_SCORE,
                    )
                    .with_data(company.to_value()),
                );
            }
        }
    }
    found.truncate(cap);
    found
}

fn standard(kind: EntityType, record: &impl NamedRecord) -> Candidate {
    Candidate::new(kind, record.id(), record.name(), STANDARD_SCORE).with_data(record.to_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testing::Fixture;
    use canonic_directory::{InMemoryDirectory, Operation};
    use std::path::Path;

    #[tokio::test]
    async fn substring_hits_across_collections() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        let found = generate("Roof", &fx.ctx(""), &mut cache).await.expect("generate");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id, "proj_roof_coating");
        assert_eq!(found[0].score, STANDARD_SCORE);
    }

    #[tokio::test]
    async fn contact_name_scores_higher() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        let found = generate("ingrid", &fx.ctx(""), &mut cache).await.expect("generate");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_type, EntityType::Customer);
        assert_eq!(found[0].object_id, "cust_nordic");
        assert_eq!(found[0].score, CONTACT_SCORE);
        assert_eq!(found[0].display_name, "Ingrid Larsen (Nordic Paints AB)");
    }

    #[tokio::test]
    async fn employees_are_capped() {
        let mut fx = Fixture::load();
        fx.settings.standard_result_cap = 1;
        let mut cache = FuzzyCache::new();
        let found = generate("luca", &fx.ctx(""), &mut cache).await.expect("generate");

        let employees: Vec<_> = found
            .iter()
            .filter(|c| c.entity_type == EntityType::Employee)
            .collect();
        assert_eq!(employees.len(), 1);
    }

    #[tokio::test]
    async fn customers_are_loaded_once_per_task() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        cache.reset_for_task("task-1");

        generate("alpine", &fx.ctx(""), &mut cache).await.expect("first");
        let listed = fx.directory.calls(Operation::ListCustomers);
        generate("harbor", &fx.ctx(""), &mut cache).await.expect("second");

        assert_eq!(fx.directory.calls(Operation::ListCustomers), listed);
        assert!(cache.customers_for("task-1").is_some());
    }

    #[tokio::test]
    async fn failed_employee_search_keeps_other_hits() {
        let dir = InMemoryDirectory::load(Path::new("../../../fixtures/directory"))
            .expect("fixture")
            .failing(Operation::SearchEmployees);
        let fx = Fixture::load().with_directory(dir);
        let mut cache = FuzzyCache::new();

        let err = generate("warehouse", &fx.ctx(""), &mut cache).await.unwrap_err();
        assert_eq!(err.partial.len(), 1);
        assert_eq!(err.partial[0].object_id, "proj_warehouse");
    }
}
