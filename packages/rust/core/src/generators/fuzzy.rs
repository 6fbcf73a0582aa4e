//! Last-resort similarity search over cached directory pools.
//!
//! Categories are searched in a fixed order (projects, customers, employees,
//! customer contacts) and each pool is loaded lazily, so a perfect match in
//! an early category spares the later, more expensive loads.

use tracing::debug;

use canonic_directory::{
    EmployeeQuery, NamedRecord, ProjectQuery, load_full_customers, search_all_employees,
    search_all_projects,
};
use canonic_shared::{Candidate, EXACT_SCORE, EntityType, Result};

use super::{Collector, Generated, SearchContext};
use crate::fuzzy_cache::FuzzyCache;
use crate::similarity::{normalize, token_set_ratio};

pub async fn generate(mention: &str, ctx: &SearchContext<'_>, cache: &mut FuzzyCache) -> Generated {
    cache.reset_for_task(ctx.task_id);

    let needle = normalize(mention);
    let threshold = ctx.settings.fuzzy_threshold;
    let mut out = Collector::default();

    match load_projects(ctx, cache).await {
        Ok(()) => {
            let pool = cache.projects().unwrap_or_default();
            if scan(EntityType::Project, pool, &needle, threshold, &mut out) {
                return done(mention, out);
            }
        }
        Err(e) => out.fail("fuzzy", mention, e),
    }

    match load_customers(ctx, cache).await {
        Ok(()) => {
            let pool = cache.customers_for(ctx.task_id).unwrap_or_default();
            if scan(EntityType::Customer, pool, &needle, threshold, &mut out) {
                return done(mention, out);
            }
        }
        Err(e) => out.fail("fuzzy", mention, e),
    }

    match load_employees(ctx, cache).await {
        Ok(()) => {
            let pool = cache.employees().unwrap_or_default();
            if scan(EntityType::Employee, pool, &needle, threshold, &mut out) {
                return done(mention, out);
            }
        }
        Err(e) => out.fail("fuzzy", mention, e),
    }

    // Contacts reuse whatever customer pool is loaded.
    for company in cache.customers_for(ctx.task_id).unwrap_or_default() {
        let Some(contact) = company.contact() else {
            continue;
        };
        let score = token_set_ratio(&needle, &normalize(contact));
        if score >= threshold {
            out.push(
                Candidate::new(
                    EntityType::Customer,
                    &company.id,
                    format!("{contact} ({})", company.name),
                    score,
                )
                .with_data(company.to_value()),
            );
            if score >= EXACT_SCORE {
                break;
            }
        }
    }

    done(mention, out)
}

fn done(mention: &str, out: Collector) -> Generated {
    debug!(mention, found = out.candidates().len(), "fuzzy search");
    out.finish()
}

/// Score every record's name against `needle`. Returns `true` once a
/// perfect match was pushed.
fn scan<R: NamedRecord>(
    kind: EntityType,
    pool: &[R],
    needle: &str,
    threshold: f64,
    out: &mut Collector,
) -> bool {
    for record in pool {
        let score = token_set_ratio(needle, &normalize(record.name()));
        if score < threshold {
            continue;
        }
        out.push(
            Candidate::new(kind, record.id(), record.name(), score).with_data(record.to_value()),
        );
        if score >= EXACT_SCORE {
            return true;
        }
    }
    false
}

async fn load_projects(ctx: &SearchContext<'_>, cache: &mut FuzzyCache) -> Result<()> {
    if cache.projects().is_none() {
        let projects = search_all_projects(ctx.directory, &ProjectQuery::everything(), None).await?;
        debug!(count = projects.len(), "cached projects");
        cache.set_projects(projects);
    }
    Ok(())
}

async fn load_customers(ctx: &SearchContext<'_>, cache: &mut FuzzyCache) -> Result<()> {
    if cache.customers_for(ctx.task_id).is_none() {
        let customers = load_full_customers(ctx.directory).await?;
        debug!(count = customers.len(), "cached customers");
        cache.store_customers(ctx.task_id, customers);
    }
    Ok(())
}

async fn load_employees(ctx: &SearchContext<'_>, cache: &mut FuzzyCache) -> Result<()> {
    if cache.employees().is_none() {
        let employees = search_all_employees(ctx.directory, &EmployeeQuery::default()).await?;
        debug!(count = employees.len(), "cached employees");
        cache.set_employees(employees);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testing::Fixture;
    use canonic_directory::{InMemoryDirectory, Operation};
    use std::path::Path;

    #[tokio::test]
    async fn perfect_project_match_skips_later_categories() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        let found = generate("roof-coating", &fx.ctx(""), &mut cache).await.expect("generate");

        assert_eq!(found.last().map(|c| c.object_id.as_str()), Some("proj_roof_coating"));
        assert_eq!(found.last().map(|c| c.score), Some(EXACT_SCORE));
        assert_eq!(fx.directory.calls(Operation::ListCustomers), 0);
        assert_eq!(fx.directory.calls(Operation::SearchEmployees), 0);
    }

    #[tokio::test]
    async fn near_miss_employee_name() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        let found = generate("Jon Smith", &fx.ctx(""), &mut cache).await.expect("generate");

        let hit = found
            .iter()
            .find(|c| c.object_id == "emp_042")
            .expect("jonathan smith candidate");
        assert!(hit.score > 70.0 && hit.score < EXACT_SCORE);
    }

    #[tokio::test]
    async fn contact_names_are_searched_last() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        let found = generate("Jonas Weber", &fx.ctx(""), &mut cache).await.expect("generate");

        let contact = found.last().expect("contact candidate");
        assert_eq!(contact.object_id, "cust_alpine");
        assert_eq!(contact.score, EXACT_SCORE);
        assert_eq!(contact.display_name, "Jonas Weber (Alpine Builders GmbH)");
    }

    #[tokio::test]
    async fn pools_load_once_per_task() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();

        generate("zzz", &fx.ctx(""), &mut cache).await.expect("first");
        let listed = fx.directory.calls(Operation::ListCustomers);
        let searched = fx.directory.calls(Operation::SearchEmployees);
        assert!(listed > 0);
        generate("qqq", &fx.ctx(""), &mut cache).await.expect("second");

        assert_eq!(fx.directory.calls(Operation::ListCustomers), listed);
        assert_eq!(fx.directory.calls(Operation::SearchEmployees), searched);
        assert_eq!(cache.task_id(), Some("task-1"));
    }

    #[tokio::test]
    async fn customers_from_standard_search_survive_fuzzy_reset() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        cache.reset_for_task("task-1");

        crate::generators::standard::generate("alpine", &fx.ctx(""), &mut cache)
            .await
            .expect("standard");
        let listed = fx.directory.calls(Operation::ListCustomers);
        assert!(listed > 0);

        generate("Jonas Weber", &fx.ctx(""), &mut cache).await.expect("fuzzy");
        assert_eq!(fx.directory.calls(Operation::ListCustomers), listed);
        assert!(cache.customers_for("task-1").is_some());
    }

    #[tokio::test]
    async fn failed_pool_is_reported_and_not_cached() {
        let dir = InMemoryDirectory::load(Path::new("../../../fixtures/directory"))
            .expect("fixture")
            .failing(Operation::SearchProjects);
        let fx = Fixture::load().with_directory(dir);
        let mut cache = FuzzyCache::new();

        let err = generate("Sara Kovac", &fx.ctx(""), &mut cache).await.unwrap_err();
        assert!(err.partial.iter().any(|c| c.object_id == "emp_200"));
        assert!(cache.projects().is_none());
    }
}
