//! Treat the mention as a literal id in every directory collection.

use tracing::debug;

use canonic_directory::NamedRecord;
use canonic_shared::{Candidate, EXACT_SCORE, EntityType};

use super::{Collector, Generated, SearchContext};

pub async fn generate(mention: &str, ctx: &SearchContext<'_>) -> Generated {
    let id = mention.trim();
    let mut out = Collector::default();

    match ctx.directory.get_employee(id).await {
        Ok(Some(employee)) => out.push(exact(EntityType::Employee, &employee)),
        Ok(None) => {}
        Err(e) => out.fail("exact_id", mention, e),
    }
    match ctx.directory.get_project(id).await {
        Ok(Some(project)) => out.push(exact(EntityType::Project, &project)),
        Ok(None) => {}
        Err(e) => out.fail("exact_id", mention, e),
    }
    match ctx.directory.get_customer(id).await {
        Ok(Some(company)) => out.push(exact(EntityType::Customer, &company)),
        Ok(None) => {}
        Err(e) => out.fail("exact_id", mention, e),
    }

    debug!(mention, found = out.candidates().len(), "exact id lookup");
    out.finish()
}

fn exact(kind: EntityType, record: &impl NamedRecord) -> Candidate {
    Candidate::new(kind, record.id(), record.name(), EXACT_SCORE).with_data(record.to_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testing::Fixture;
    use canonic_directory::{InMemoryDirectory, Operation};
    use std::path::Path;

    #[tokio::test]
    async fn employee_id_resolves_exactly() {
        let fx = Fixture::load();
        let found = generate("BwFV_151", &fx.ctx("")).await.expect("generate");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_type, EntityType::Employee);
        assert_eq!(found[0].object_id, "BwFV_151");
        assert_eq!(found[0].score, EXACT_SCORE);
        assert_eq!(found[0].display_name, "Marta Bianchi");
        assert_eq!(
            found[0].data.as_ref().and_then(|d| d["department"].as_str()),
            Some("Quality & HSE")
        );
    }

    #[tokio::test]
    async fn unknown_id_is_empty_ok() {
        let fx = Fixture::load();
        assert!(generate("nope_1", &fx.ctx("")).await.expect("generate").is_empty());
    }

    #[tokio::test]
    async fn one_failing_collection_does_not_block_others() {
        let dir = InMemoryDirectory::load(Path::new("../../../fixtures/directory"))
            .expect("fixture")
            .failing(Operation::GetEmployee);
        let fx = Fixture::load().with_directory(dir);

        let err = generate("proj_marine", &fx.ctx("")).await.unwrap_err();
        assert_eq!(err.partial.len(), 1);
        assert_eq!(err.partial[0].entity_type, EntityType::Project);
        assert_eq!(fx.directory.calls(Operation::GetCustomer), 1);
    }
}
