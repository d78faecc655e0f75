//! Property-Based Tests for search pagination

use proptest::prelude::*;
use std::collections::HashSet;

use crate::models::Hotel;
use crate::search::{MemoryIndex, SearchIndex};

fn hotels_strategy() -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["Sheraton", "Hilton", "Westin", "Sheraton Grand"]),
            0u8..=10,
        ),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(name, rating)| (name.to_string(), f64::from(rating) / 2.0))
            .collect()
    })
}

async fn build(rows: &[(String, f64)]) -> MemoryIndex<Hotel> {
    let index = MemoryIndex::new();
    for (i, (name, rating)) in rows.iter().enumerate() {
        index
            .index(Hotel {
                id: Some(format!("{:03}", i + 1)),
                name: name.clone(),
                rating: *rating,
                ..Default::default()
            })
            .await
            .unwrap();
    }
    index
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Consecutive pages never overlap, never exceed the limit and together
    // reproduce the full result list.
    #[test]
    fn prop_pages_are_disjoint_and_bounded(
        rows in hotels_strategy(),
        limit in 1usize..7,
        query in prop::sample::select(vec!["*", "sheraton", "grand hilton", "westin"]),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (all, pages) = rt.block_on(async {
            let index = build(&rows).await;
            let all = index.search(query, usize::MAX, 0).await.unwrap();
            let mut pages = Vec::new();
            let mut offset = 0;
            loop {
                let page = index.search(query, limit, offset).await.unwrap();
                if page.is_empty() {
                    break;
                }
                offset += limit;
                pages.push(page);
            }
            (all, pages)
        });

        let mut seen = HashSet::new();
        let mut concatenated = Vec::new();
        for page in &pages {
            prop_assert!(page.len() <= limit);
            for hotel in page {
                prop_assert!(seen.insert(hotel.id.clone()), "duplicate {:?}", hotel.id);
                concatenated.push(hotel.clone());
            }
        }
        prop_assert_eq!(concatenated, all);
    }

    // Ratings never increase within a group of equally relevant results.
    #[test]
    fn prop_match_all_is_sorted_by_rank_then_id(rows in hotels_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let all = rt.block_on(async { build(&rows).await.search("*", usize::MAX, 0).await.unwrap() });

        prop_assert_eq!(all.len(), rows.len());
        for pair in all.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.rating > b.rating || (a.rating == b.rating && a.id < b.id));
        }
    }
}
