//! Drive paged directory operations to exhaustion.
//!
//! The store does not advertise its maximum page size, so [`paginate_all`]
//! discovers one: start small, double while pages are accepted, and once a
//! size is rejected after a success, bisect between the last accepted and the
//! rejected size and lock the result.

use std::future::Future;

use tracing::{debug, warn};

use canonic_shared::{CanonicError, Result};

use crate::records::{Company, CompanyBrief, EmployeeBrief, ProjectBrief};
use crate::{Directory, EmployeeQuery, Page, ProjectQuery};

/// First page size tried.
pub const INITIAL_PAGE_LIMIT: usize = 2;

/// Fetch every item from a paged operation.
///
/// Stops when a page returns fewer items than requested. Fails with
/// [`CanonicError::PaginationBroken`] if even a page of one is rejected; any
/// other error is returned as-is.
pub async fn paginate_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut offset = 0;
    let mut working = 0;
    let mut limit = INITIAL_PAGE_LIMIT;
    let mut locked = false;

    loop {
        match fetch(Page { offset, limit }).await {
            Ok(batch) => {
                let received = batch.len();
                items.extend(batch);
                working = limit;

                if received < limit {
                    break;
                }
                offset += received;

                if !locked {
                    limit *= 2;
                }
            }
            Err(e) if e.is_page_limit() => {
                if limit == 1 {
                    return Err(CanonicError::PaginationBroken);
                }

                if working > 0 && limit > working {
                    if !locked {
                        debug!(working, rejected = limit, "page limit found, narrowing");
                    }
                    locked = true;
                    limit = (working + (limit - working) / 2).max(working);
                } else {
                    // Nothing accepted yet, or a previously accepted size is now refused.
                    working = 0;
                    limit = (limit / 2).max(1);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(items)
}

/// Every customer summary.
pub async fn list_all_customers(dir: &dyn Directory) -> Result<Vec<CompanyBrief>> {
    paginate_all(move |page| dir.list_customers_page(page)).await
}

/// Every project matching the server-side filters, then narrowed locally to
/// those whose id or name contains `substring` (case-insensitive).
pub async fn search_all_projects(
    dir: &dyn Directory,
    query: &ProjectQuery,
    substring: Option<&str>,
) -> Result<Vec<ProjectBrief>> {
    let projects = paginate_all(move |page| dir.search_projects_page(query, page)).await?;

    let needle = substring.map(str::to_lowercase).filter(|s| !s.is_empty());
    Ok(match needle {
        Some(needle) => projects
            .into_iter()
            .filter(|p| {
                p.id.to_lowercase().contains(&needle) || p.name.to_lowercase().contains(&needle)
            })
            .collect(),
        None => projects,
    })
}

/// Every employee summary matching `query`.
pub async fn search_all_employees(
    dir: &dyn Directory,
    query: &EmployeeQuery,
) -> Result<Vec<EmployeeBrief>> {
    paginate_all(move |page| dir.search_employees_page(query, page)).await
}

/// Full customer records, one `get_customer` per listed customer.
///
/// The listing lacks contact details, hence the per-customer fetch. A
/// customer that fails to load is skipped; a failed listing is an error.
pub async fn load_full_customers(dir: &dyn Directory) -> Result<Vec<Company>> {
    let briefs = list_all_customers(dir).await?;
    let mut customers = Vec::with_capacity(briefs.len());

    for brief in briefs {
        match dir.get_customer(&brief.id).await {
            Ok(Some(company)) => customers.push(company),
            Ok(None) => debug!(customer = %brief.id, "listed customer not found"),
            Err(e) => warn!(customer = %brief.id, error = %e, "failed to load customer"),
        }
    }

    Ok(customers)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_fake(total: usize, max: usize) -> (Result<Vec<usize>>, Vec<usize>) {
        let data: Vec<usize> = (0..total).collect();
        let mut seen = Vec::new();
        let result = paginate_all(|page: Page| {
            seen.push(page.limit);
            let outcome = if page.limit > max {
                Err(CanonicError::PageLimitExceeded { limit: page.limit })
            } else {
                Ok(data.iter().skip(page.offset).take(page.limit).copied().collect())
            };
            async move { outcome }
        })
        .await;
        (result, seen)
    }

    #[tokio::test]
    async fn discovers_and_locks_limit() {
        let (result, seen) = run_fake(7, 5).await;
        assert_eq!(result.expect("paginate"), (0..7).collect::<Vec<_>>());
        assert_eq!(seen, vec![2, 4, 8, 6, 5]);
    }

    #[tokio::test]
    async fn halves_before_first_success() {
        let (result, seen) = run_fake(3, 1).await;
        assert_eq!(result.expect("paginate"), vec![0, 1, 2]);
        assert_eq!(seen, vec![2, 1, 2, 1, 1, 1]);
    }

    #[tokio::test]
    async fn empty_listing_takes_one_call() {
        let (result, seen) = run_fake(0, 10).await;
        assert!(result.expect("paginate").is_empty());
        assert_eq!(seen, vec![2]);
    }

    #[tokio::test]
    async fn rejecting_page_of_one_is_broken() {
        let (result, seen) = run_fake(5, 0).await;
        assert!(matches!(result, Err(CanonicError::PaginationBroken)));
        assert_eq!(seen, vec![2, 1]);
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let result: Result<Vec<u8>> = paginate_all(|_page| async {
            Err(CanonicError::Transport("connection refused".into()))
        })
        .await;
        assert!(matches!(result, Err(CanonicError::Transport(_))));
    }
}
