mod common;

use std::sync::Arc;

use common::{
    CountingProblemRepository, FixedHitsIndex, client_for, memory_index, seed_problems, setup_db,
};
use probmark_core::domain::PageRequest;
use probmark_server::config::FailurePolicy;
use probmark_server::repository::{ProblemRecord, SeaOrmProblemRepository};
use probmark_server::search::{IndexSync, ProblemSearch};

fn ids(items: &[ProblemRecord]) -> Vec<i32> {
    items.iter().map(|p| p.id.into_inner()).collect()
}

#[tokio::test]
async fn results_follow_index_rank_not_primary_key_order() {
    let db = setup_db().await;
    let repo = SeaOrmProblemRepository::new(db);
    seed_problems(&repo, 10, "anything").await;
    let client = client_for(
        Arc::new(FixedHitsIndex::new(vec![7, 3, 9], 3)),
        FailurePolicy::FailClosed,
    );
    let search = ProblemSearch::new(client, Arc::new(repo));

    let page = PageRequest::new(1, 10).expect("page");
    let results = search.search("anything", page).await.expect("search");

    assert_eq!(ids(&results.items), vec![7, 3, 9]);
    assert_eq!(results.total, 3);
}

#[tokio::test]
async fn zero_matches_skip_the_store() {
    let db = setup_db().await;
    let repo = Arc::new(CountingProblemRepository::new(SeaOrmProblemRepository::new(db)));
    let client = client_for(
        Arc::new(FixedHitsIndex::new(Vec::new(), 0)),
        FailurePolicy::FailClosed,
    );
    let search = ProblemSearch::new(client, repo.clone());

    let page = PageRequest::new(1, 10).expect("page");
    let results = search.search("nothing", page).await.expect("search");

    assert!(results.items.is_empty());
    assert_eq!(results.total, 0);
    assert_eq!(repo.fetches(), 0);
}

#[tokio::test]
async fn matches_are_fetched_in_one_store_query() {
    let db = setup_db().await;
    let inner = SeaOrmProblemRepository::new(db);
    seed_problems(&inner, 3, "dp").await;
    let repo = Arc::new(CountingProblemRepository::new(inner));
    let client = client_for(
        Arc::new(FixedHitsIndex::new(vec![2, 1], 2)),
        FailurePolicy::FailClosed,
    );
    let search = ProblemSearch::new(client, repo.clone());

    let page = PageRequest::new(1, 10).expect("page");
    let results = search.search("dp", page).await.expect("search");

    assert_eq!(ids(&results.items), vec![2, 1]);
    assert_eq!(repo.fetches(), 1);
}

#[tokio::test]
async fn drifted_ids_are_omitted_but_total_is_kept() {
    let db = setup_db().await;
    let repo = SeaOrmProblemRepository::new(db);
    seed_problems(&repo, 2, "dp").await;
    let client = client_for(
        Arc::new(FixedHitsIndex::new(vec![2, 99, 1], 3)),
        FailurePolicy::FailClosed,
    );
    let search = ProblemSearch::new(client, Arc::new(repo));

    let page = PageRequest::new(1, 10).expect("page");
    let results = search.search("dp", page).await.expect("search");

    assert_eq!(ids(&results.items), vec![2, 1]);
    assert_eq!(results.total, 3);
    assert_eq!(results.last_page(), 1);
}

#[tokio::test]
async fn pages_through_memory_index_results() {
    let db = setup_db().await;
    let repo = Arc::new(SeaOrmProblemRepository::new(db));
    seed_problems(&repo, 12, "dp").await;
    let client = client_for(memory_index(), FailurePolicy::FailClosed);
    IndexSync::new(client.clone())
        .reindex_problems(repo.as_ref(), 5)
        .await
        .expect("reindex");
    let search = ProblemSearch::new(client, repo);

    let page = PageRequest::new(3, 5).expect("page");
    let results = search.search("dp", page).await.expect("search");

    assert_eq!(results.total, 12);
    assert_eq!(results.items.len(), 2);
    assert_eq!(results.last_page(), 3);
    assert_eq!(results.next_page(), None);
    assert_eq!(results.prev_page(), Some(2));
    // Equal scores rank by ascending id.
    assert_eq!(ids(&results.items), vec![11, 12]);
}
